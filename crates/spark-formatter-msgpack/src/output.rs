use bytes::Bytes;
use serde::Serialize;
use spark_formatters::{
    FormatterError, MediaTypeCollection, ModelType, OutputFormatter, OutputFormatterWriteContext,
    RequestAborted, ResponseBody, async_trait, select_media_type, write_cancellable,
};
use tracing::{debug, trace};

use crate::codec::MessagePackCodec;
use crate::config::CodecConfig;
use crate::options::{MessagePackOptions, defaults};

/// 把结果值编码为 MessagePack 写入响应体的输出格式化器。
///
/// # 逻辑解析（How）
/// - 协商：声明类型优先，缺省时按值的运行时类型在注册表中查找；声明与值都为空时接受，写出 `nil`；
/// - 写出：整体编码后分块写入响应流，块之间观察请求取消信号。
///
/// # 契约说明（What）
/// - 编码失败以 [`FormatterError::Serialization`] 返回，宿主应映射为不含格式细节的 500；
/// - 客户端中途断开时返回 [`FormatterError::Cancelled`]，已写出的字节数随错误返回。
#[derive(Clone, Debug)]
pub struct MessagePackOutputFormatter {
    codec: MessagePackCodec,
    supported_media_types: MediaTypeCollection,
}

impl MessagePackOutputFormatter {
    /// 按配置构造。
    pub fn new(options: &MessagePackOptions) -> Self {
        Self {
            codec: options.build_codec(),
            supported_media_types: options.effective_media_types(),
        }
    }

    /// 直接以编解码配置构造，使用默认注册表与默认媒体类型。
    pub fn from_codec(config: CodecConfig) -> Self {
        Self {
            codec: MessagePackCodec::with_config(config),
            supported_media_types: defaults::media_types(),
        }
    }

    /// 使用中的编解码器。
    pub fn codec(&self) -> &MessagePackCodec {
        &self.codec
    }

    /// 编码具体类型；失败时不触碰响应流。
    pub fn encode_value<T>(&self, value: &T) -> Result<Bytes, FormatterError>
    where
        T: Serialize + ?Sized,
    {
        self.codec
            .encode(value)
            .map_err(|err| FormatterError::serialization(std::any::type_name::<T>(), err))
    }

    /// 把已编码的负载分块写入 `body`，返回写出的字节数。
    pub async fn write_encoded(
        &self,
        payload: &[u8],
        body: ResponseBody<'_>,
        request_aborted: &RequestAborted,
    ) -> Result<usize, FormatterError> {
        write_payload(body, payload, request_aborted).await
    }
}

async fn write_payload(
    body: ResponseBody<'_>,
    payload: &[u8],
    request_aborted: &RequestAborted,
) -> Result<usize, FormatterError> {
    trace!(bytes = payload.len(), "writing MessagePack response body");
    let result = write_cancellable(body, payload, request_aborted).await;
    if let Err(FormatterError::Cancelled { written }) = &result {
        debug!(
            written = *written,
            total = payload.len(),
            "MessagePack response write cancelled by client"
        );
    }
    result
}

#[async_trait]
impl OutputFormatter for MessagePackOutputFormatter {
    fn supported_media_types(&self) -> &MediaTypeCollection {
        &self.supported_media_types
    }

    fn can_write_type(&self, object_type: Option<&ModelType>) -> bool {
        self.codec.can_serialize(object_type)
    }

    fn resolve_object_type(&self, ctx: &OutputFormatterWriteContext<'_>) -> Option<ModelType> {
        self.codec.resolve_model_type(ctx.object_type(), ctx.object())
    }

    fn can_write_result(&self, ctx: &mut OutputFormatterWriteContext<'_>) -> bool {
        let Some(selected) = select_media_type(&self.supported_media_types, ctx.content_type())
        else {
            return false;
        };
        let writable = match (self.resolve_object_type(ctx), ctx.object()) {
            (Some(object_type), _) => self.can_write_type(Some(&object_type)),
            (None, None) => self.can_write_type(None),
            (None, Some(_)) => false,
        };
        if writable {
            ctx.set_content_type(Some(selected));
        }
        writable
    }

    async fn write_response_body(
        &self,
        ctx: &mut OutputFormatterWriteContext<'_>,
    ) -> Result<(), FormatterError> {
        let declared = ctx.object_type().copied();
        let payload = self
            .codec
            .encode_erased(declared.as_ref(), ctx.object())
            .map_err(|err| {
                let type_name = declared.map(|model_type| model_type.name()).unwrap_or("null");
                FormatterError::serialization(type_name, err)
            })?;
        let request_aborted = ctx.request_aborted().clone();
        write_payload(ctx.body(), &payload, &request_aborted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_formatters::MediaType;

    trait Shape: Send + Sync {}

    struct Unregistered;

    #[test]
    fn accepts_registered_types_and_null() {
        let formatter = MessagePackOutputFormatter::new(&MessagePackOptions::new());
        let mut sink = Vec::new();

        let value = 10_i32;
        let mut ctx =
            OutputFormatterWriteContext::new(Some(ModelType::of::<i32>()), Some(&value), &mut sink);
        assert!(formatter.can_write_result(&mut ctx));
        assert_eq!(
            ctx.content_type().map(MediaType::as_str),
            Some("application/x-msgpack")
        );
        drop(ctx);

        let mut ctx = OutputFormatterWriteContext::new(None, None, &mut sink);
        assert!(formatter.can_write_result(&mut ctx));
        drop(ctx);

        let mut ctx = OutputFormatterWriteContext::new(
            Some(ModelType::contract::<dyn Shape>()),
            Some(&value),
            &mut sink,
        );
        assert!(!formatter.can_write_result(&mut ctx));
        drop(ctx);

        let unknown = Unregistered;
        let mut ctx = OutputFormatterWriteContext::new(None, Some(&unknown), &mut sink);
        assert!(!formatter.can_write_result(&mut ctx));
    }

    #[test]
    fn honours_candidate_content_type() {
        let formatter = MessagePackOutputFormatter::new(&MessagePackOptions::new());
        let mut sink = Vec::new();
        let value = String::from("x");
        let mut ctx = OutputFormatterWriteContext::new(None, Some(&value), &mut sink);

        ctx.set_content_type(Some(MediaType::new("application/msgpack")));
        assert!(formatter.can_write_result(&mut ctx));
        assert_eq!(
            ctx.content_type().map(MediaType::as_str),
            Some("application/msgpack")
        );

        ctx.set_content_type(Some(MediaType::new("application/json")));
        assert!(!formatter.can_write_result(&mut ctx));
    }

    #[tokio::test]
    async fn null_value_is_written_as_nil() {
        let formatter = MessagePackOutputFormatter::from_codec(CodecConfig::default());
        let mut sink = Vec::new();
        let mut ctx = OutputFormatterWriteContext::new(None, None, &mut sink);
        formatter.write_response_body(&mut ctx).await.expect("written");
        drop(ctx);
        assert_eq!(sink, [0xc0]);
    }

    #[tokio::test]
    async fn cancelled_request_stops_writing() {
        let formatter = MessagePackOutputFormatter::from_codec(CodecConfig::default());
        let aborted = RequestAborted::new();
        aborted.cancel();
        let value = vec![String::from("payload"); 64];
        let mut sink = Vec::new();
        let mut ctx = OutputFormatterWriteContext::new(
            Some(ModelType::of::<Vec<String>>()),
            Some(&value),
            &mut sink,
        )
        .with_request_aborted(aborted);

        let err = formatter
            .write_response_body(&mut ctx)
            .await
            .expect_err("cancelled");
        assert!(matches!(err, FormatterError::Cancelled { written: 0 }));
        assert_eq!(err.status_hint(), 499);
    }

    #[tokio::test]
    async fn mismatched_declaration_is_a_serialization_error() {
        let formatter = MessagePackOutputFormatter::from_codec(CodecConfig::default());
        let value = "text";
        let mut sink = Vec::new();
        let mut ctx =
            OutputFormatterWriteContext::new(Some(ModelType::of::<i32>()), Some(&value), &mut sink);
        let err = formatter
            .write_response_body(&mut ctx)
            .await
            .expect_err("mismatch");
        assert_eq!(err.code(), "spark.formatters.serialization_failed");
    }
}
