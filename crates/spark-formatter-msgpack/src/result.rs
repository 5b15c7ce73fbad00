use serde::Serialize;
use spark_formatters::{
    ActionContext, ActionResult, FormatterError, MediaTypeCollection, OutputFormatter,
    async_trait, select_media_type,
};

use crate::config::CodecConfig;
use crate::output::MessagePackOutputFormatter;

/// 绕过内容协商、直接以 MessagePack 写出的动作结果。
///
/// # 契约说明（What）
/// - 内容类型在默认集合（`application/x-msgpack`、`application/msgpack`）内选取：上下文没有候选时
///   取首个，有候选时按 [`select_media_type`] 匹配，匹配失败返回 [`FormatterError::NotAcceptable`]；
/// - 不做 `can_serialize` 判定，`T: Serialize` 即可写出；
/// - 值为 `None` 时只写响应头，响应体为空；
/// - 先编码、后提交响应头：编码失败返回 [`FormatterError::Serialization`]，状态码与内容类型保持原样；
/// - 响应头已发送时返回 [`FormatterError::ResponseStarted`]，不做任何修改。
#[derive(Clone, Debug)]
pub struct MessagePackResult<T> {
    value: Option<T>,
    status: Option<u16>,
    formatter: MessagePackOutputFormatter,
}

impl<T> MessagePackResult<T>
where
    T: Serialize,
{
    /// 使用默认编解码配置。
    pub fn new(value: Option<T>) -> Self {
        Self::with_codec(value, CodecConfig::default())
    }

    /// 使用指定的编解码配置。
    pub fn with_codec(value: Option<T>, config: CodecConfig) -> Self {
        Self {
            value,
            status: None,
            formatter: MessagePackOutputFormatter::from_codec(config),
        }
    }

    /// 指定状态码；缺省时保留响应头上的现有值。
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// 待写出的值。
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// 显式指定的状态码。
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// 编码使用的配置。
    pub fn codec_config(&self) -> &CodecConfig {
        self.formatter.codec().config()
    }

    /// 响应可能使用的内容类型，无候选时使用首个。
    pub fn content_types(&self) -> &MediaTypeCollection {
        self.formatter.supported_media_types()
    }
}

#[async_trait]
impl<T> ActionResult for MessagePackResult<T>
where
    T: Serialize + Send + Sync,
{
    async fn execute_result(&self, ctx: &mut ActionContext<'_>) -> Result<(), FormatterError> {
        if ctx.response().has_started() {
            return Err(FormatterError::ResponseStarted);
        }

        let Some(content_type) = select_media_type(self.content_types(), ctx.content_type())
        else {
            return Err(FormatterError::not_acceptable(
                std::any::type_name::<T>(),
                ctx.content_type(),
            ));
        };
        let payload = match &self.value {
            Some(value) => Some(self.formatter.encode_value(value)?),
            None => None,
        };

        let response = ctx.response();
        if let Some(status) = self.status {
            response.set_status(status);
        }
        response.set_content_type(Some(content_type));
        response.mark_started();

        let Some(payload) = payload else {
            return Ok(());
        };
        let request_aborted = ctx.request_aborted().clone();
        self.formatter
            .write_encoded(&payload, ctx.body(), &request_aborted)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessagePackCodec;
    use crate::config::FieldLayout;
    use serde::Deserialize;
    use spark_formatters::{MediaType, ResponseHead};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        station: String,
        celsius: f32,
    }

    #[tokio::test]
    async fn writes_value_with_primary_content_type() {
        let result = MessagePackResult::new(Some(10_i32)).with_status(201);
        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink);
        result.execute_result(&mut ctx).await.expect("executed");
        drop(ctx);

        assert_eq!(head.status(), 201);
        assert_eq!(
            head.content_type().map(|media| media.as_str()),
            Some("application/x-msgpack")
        );
        assert!(head.has_started());
        assert_eq!(MessagePackCodec::default().decode::<i32>(&sink).expect("decode"), Some(10));
    }

    #[tokio::test]
    async fn absent_value_writes_empty_body() {
        let result = MessagePackResult::<i32>::new(None);
        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink);
        result.execute_result(&mut ctx).await.expect("executed");
        drop(ctx);

        assert!(sink.is_empty());
        assert_eq!(head.status(), 200);
        assert!(head.content_type().is_some());
    }

    #[tokio::test]
    async fn unregistered_struct_is_written_with_explicit_codec() {
        let config = CodecConfig::new().with_field_layout(FieldLayout::Array);
        let reading = Reading {
            station: "Bergen".into(),
            celsius: 7.5,
        };
        let result = MessagePackResult::with_codec(Some(reading), config.clone());
        assert_eq!(result.codec_config(), &config);

        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink);
        result.execute_result(&mut ctx).await.expect("executed");
        drop(ctx);

        let decoded = MessagePackCodec::with_config(config)
            .decode::<Reading>(&sink)
            .expect("decode");
        assert_eq!(decoded.as_ref(), result.value());
    }

    #[tokio::test]
    async fn started_response_is_rejected() {
        let result = MessagePackResult::new(Some("late"));
        let mut head = ResponseHead::new();
        head.mark_started();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink);

        let err = result.execute_result(&mut ctx).await.expect_err("started");
        assert!(matches!(err, FormatterError::ResponseStarted));
        drop(ctx);
        assert!(sink.is_empty());
    }

    struct Faulty;

    impl Serialize for Faulty {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("sensor offline"))
        }
    }

    #[tokio::test]
    async fn encode_failure_leaves_head_uncommitted() {
        let result = MessagePackResult::new(Some(Faulty)).with_status(201);
        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink);

        let err = result.execute_result(&mut ctx).await.expect_err("encode fails");
        assert_eq!(err.code(), "spark.formatters.serialization_failed");
        drop(ctx);

        assert!(!head.has_started());
        assert_eq!(head.status(), 200);
        assert!(head.content_type().is_none());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn candidate_content_type_is_honoured() {
        let result = MessagePackResult::new(Some(3_u8));
        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink)
            .with_content_type(Some(MediaType::new("application/msgpack")));
        result.execute_result(&mut ctx).await.expect("executed");
        drop(ctx);

        assert_eq!(
            head.content_type().map(MediaType::as_str),
            Some("application/msgpack")
        );
    }

    #[tokio::test]
    async fn unsupported_candidate_is_not_acceptable() {
        let result = MessagePackResult::new(Some(3_u8)).with_status(202);
        let mut head = ResponseHead::new();
        let mut sink = Vec::new();
        let mut ctx = ActionContext::new(&mut head, &mut sink)
            .with_content_type(Some(MediaType::new("application/json")));

        let err = result.execute_result(&mut ctx).await.expect_err("rejected");
        assert_eq!(err.status_hint(), 406);
        drop(ctx);
        assert!(!head.has_started());
        assert_eq!(head.status(), 200);
    }
}
