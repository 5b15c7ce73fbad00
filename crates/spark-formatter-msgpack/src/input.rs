use spark_formatters::{
    BoundModel, FormatterError, InputFormatter, InputFormatterContext, InputFormatterResult,
    MediaTypeCollection, ModelError, ModelType, async_trait,
};
use tracing::debug;

use crate::codec::MessagePackCodec;
use crate::error::CodecError;
use crate::options::{MessagePackOptions, defaults};

/// 把 MessagePack 请求体绑定为模型的输入格式化器。
///
/// # 逻辑解析（How）
/// 1. 协商：`Content-Type` 缺省或落在支持集合内，且目标类型已登记；
/// 2. 读取完整请求体，零长度时按绑定点要求返回 `NoValue` 或登记的默认值；
/// 3. 解码失败（含尾随字节、超限）写入一条键为空串的模型错误并返回 `Failure`，请求管线继续运行。
///
/// # 契约说明（What）
/// - 构造后不可变，可在任意数量的并发请求间共享；
/// - IO 失败以 [`FormatterError::Io`] 返回，不计入模型错误。
#[derive(Clone, Debug)]
pub struct MessagePackInputFormatter {
    codec: MessagePackCodec,
    supported_media_types: MediaTypeCollection,
    allow_exception_messages: bool,
}

impl MessagePackInputFormatter {
    /// 按配置构造。
    pub fn new(options: &MessagePackOptions) -> Self {
        Self {
            codec: options.build_codec(),
            supported_media_types: options.effective_media_types(),
            allow_exception_messages: options.allow_input_formatter_exception_messages(),
        }
    }

    /// 使用中的编解码器。
    pub fn codec(&self) -> &MessagePackCodec {
        &self.codec
    }

    /// 是否向客户端暴露解码器的详细错误。
    pub fn allows_exception_messages(&self) -> bool {
        self.allow_exception_messages
    }

    fn model_error(&self, err: CodecError) -> ModelError {
        let message = if self.allow_exception_messages {
            err.to_string()
        } else {
            defaults::GENERIC_INPUT_ERROR.to_owned()
        };
        ModelError::new(message).with_cause(err)
    }
}

#[async_trait]
impl InputFormatter for MessagePackInputFormatter {
    fn supported_media_types(&self) -> &MediaTypeCollection {
        &self.supported_media_types
    }

    fn can_read_type(&self, model_type: Option<&ModelType>) -> bool {
        self.codec.can_serialize(model_type)
    }

    async fn read(
        &self,
        ctx: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult, FormatterError> {
        let model_type = *ctx.model_type();
        let bytes = self.codec.read_body(ctx.body()).await?;

        if bytes.is_empty() {
            if !ctx.treat_empty_input_as_default() {
                return Ok(InputFormatterResult::NoValue);
            }
            log_input_success(&model_type);
            return Ok(InputFormatterResult::Success(BoundModel::from(
                self.codec.default_for(&model_type),
            )));
        }

        match self.codec.decode_erased(&bytes, &model_type) {
            Ok(model) => {
                log_input_success(&model_type);
                Ok(InputFormatterResult::Success(BoundModel::from(model)))
            }
            Err(err) if err.is_malformed_input() => {
                debug!(
                    event_id = 1,
                    event = "msgpack_input_exception",
                    type_name = model_type.name(),
                    code = err.code(),
                    "MessagePack input formatter threw an exception: {err}"
                );
                let error = self.model_error(err);
                ctx.model_state().add_model_error("", error);
                Ok(InputFormatterResult::Failure)
            }
            Err(err) => Err(FormatterError::serialization(model_type.name(), err)),
        }
    }
}

fn log_input_success(model_type: &ModelType) {
    debug!(
        event_id = 2,
        event = "msgpack_input_success",
        type_name = model_type.name(),
        "MessagePack input formatter succeeded, deserializing to type '{}'",
        model_type.name()
    );
}
