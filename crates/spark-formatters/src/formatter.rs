use async_trait::async_trait;

use crate::context::{InputFormatterContext, OutputFormatterWriteContext};
use crate::error::FormatterError;
use crate::media::{MediaType, MediaTypeCollection};
use crate::model::{BoundModel, ModelType};

/// 输入格式化器的结果。
#[derive(Debug)]
pub enum InputFormatterResult {
    /// 成功绑定；`BoundModel` 可能为空（按默认值处理且类型无默认值）。
    Success(BoundModel),
    /// 请求体为空且调用点不要求默认值，目标保持未设置。
    NoValue,
    /// 请求体无法解析，错误已写入 `ModelState`。
    Failure,
}

impl InputFormatterResult {
    /// 是否失败。
    pub fn has_error(&self) -> bool {
        matches!(self, Self::Failure)
    }

    /// 是否设置了模型（包括空模型）。
    pub fn is_model_set(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// 取出模型；`NoValue`/`Failure` 返回 `None`。
    pub fn into_model(self) -> Option<BoundModel> {
        match self {
            Self::Success(model) => Some(model),
            Self::NoValue | Self::Failure => None,
        }
    }
}

/// `InputFormatter` 把请求体转换为类型化的模型，是宿主协商管线的对象层扩展点。
///
/// # 行为逻辑（How）
/// - `can_read` 的默认实现先比对 `Content-Type`（为空视为接受），再调用 `can_read_type`；
/// - `read` 读取完整请求体并返回 [`InputFormatterResult`]。
///
/// # 契约说明（What）
/// - 实现必须无状态或只读共享，满足 `Send + Sync + 'static`；
/// - 请求体格式错误必须转化为 `ModelState` 中的错误并返回 `Failure`，不得作为 `Err` 返回；
/// - `Err` 只用于 IO 等与请求内容无关的失败。
#[async_trait]
pub trait InputFormatter: Send + Sync + 'static {
    /// 可读取的媒体类型。
    fn supported_media_types(&self) -> &MediaTypeCollection;

    /// 是否能把请求体还原为 `model_type`。
    fn can_read_type(&self, model_type: Option<&ModelType>) -> bool {
        let _ = model_type;
        true
    }

    /// 协商：是否接受本次请求。
    fn can_read(&self, ctx: &InputFormatterContext<'_>) -> bool {
        let media_ok = match ctx.content_type() {
            None => true,
            Some(content_type) => self.supported_media_types().accepts(content_type),
        };
        media_ok && self.can_read_type(Some(ctx.model_type()))
    }

    /// 读取并解码请求体。
    async fn read(
        &self,
        ctx: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult, FormatterError>;
}

/// `OutputFormatter` 把结果值写入响应体。
///
/// 默认 `can_write_result` 会在上下文已带候选内容类型时检查它是否在支持集合内，
/// 并在选中后把上下文的内容类型收敛为具体值。
#[async_trait]
pub trait OutputFormatter: Send + Sync + 'static {
    /// 可写出的媒体类型。
    fn supported_media_types(&self) -> &MediaTypeCollection;

    /// 是否能写出该类型。
    fn can_write_type(&self, object_type: Option<&ModelType>) -> bool {
        let _ = object_type;
        true
    }

    /// 本次结果使用的类型：声明类型优先。
    fn resolve_object_type(&self, ctx: &OutputFormatterWriteContext<'_>) -> Option<ModelType> {
        ctx.object_type().copied()
    }

    /// 协商：是否写出本次结果。
    fn can_write_result(&self, ctx: &mut OutputFormatterWriteContext<'_>) -> bool {
        let Some(selected) = select_media_type(self.supported_media_types(), ctx.content_type())
        else {
            return false;
        };
        let object_type = self.resolve_object_type(ctx);
        if !self.can_write_type(object_type.as_ref()) {
            return false;
        }
        ctx.set_content_type(Some(selected));
        true
    }

    /// 写出响应体。
    async fn write_response_body(
        &self,
        ctx: &mut OutputFormatterWriteContext<'_>,
    ) -> Result<(), FormatterError>;
}

/// 在支持集合内为候选内容类型选出具体的响应类型。
///
/// - 无候选：集合中的首个类型；
/// - 通配候选（如 `application/*`）：集合中第一个落在其范围内的类型；
/// - 具体候选：被集合接受时原样返回（保留其参数）。
pub fn select_media_type(
    supported: &MediaTypeCollection,
    candidate: Option<&MediaType>,
) -> Option<MediaType> {
    match candidate {
        None => supported.first().cloned(),
        Some(candidate) if candidate.has_wildcard() => supported.first_within(candidate).cloned(),
        Some(candidate) => supported.accepts(candidate).then(|| candidate.clone()),
    }
}
