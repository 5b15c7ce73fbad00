use std::any::Any;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::cancellation::RequestAborted;
use crate::media::MediaType;
use crate::model::ModelType;
use crate::model_state::ModelState;

/// 请求体读取流。
pub type RequestBody<'a> = &'a mut (dyn AsyncRead + Unpin + Send);
/// 响应体写入流。
pub type ResponseBody<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// 输入格式化器的单次调用上下文。
///
/// # 契约说明（What）
/// - 上下文由宿主拥有，格式化器仅在一次 `read` 调用期间借用，调用结束后不得保留任何引用；
/// - `model_state` 只允许追加错误；
/// - `treat_empty_input_as_default` 由绑定点决定：`false` 时空请求体报告 `NoValue`。
pub struct InputFormatterContext<'a> {
    model_name: String,
    content_type: Option<MediaType>,
    model_type: ModelType,
    body: RequestBody<'a>,
    model_state: &'a mut ModelState,
    treat_empty_input_as_default: bool,
}

impl<'a> InputFormatterContext<'a> {
    /// 构造上下文。
    pub fn new(
        model_name: impl Into<String>,
        model_type: ModelType,
        body: RequestBody<'a>,
        model_state: &'a mut ModelState,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            content_type: None,
            model_type,
            body,
            model_state,
            treat_empty_input_as_default: false,
        }
    }

    /// 设置请求声明的 `Content-Type`。
    pub fn with_content_type(mut self, content_type: Option<MediaType>) -> Self {
        self.content_type = content_type;
        self
    }

    /// 设置空请求体的处理方式。
    pub fn with_treat_empty_input_as_default(mut self, value: bool) -> Self {
        self.treat_empty_input_as_default = value;
        self
    }

    /// 绑定目标名称。
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 请求声明的内容类型。
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// 目标模型类型。
    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    /// 请求体。
    pub fn body(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        &mut *self.body
    }

    /// 校验错误收集器。
    pub fn model_state(&mut self) -> &mut ModelState {
        &mut *self.model_state
    }

    /// 空请求体是否按默认值处理。
    pub fn treat_empty_input_as_default(&self) -> bool {
        self.treat_empty_input_as_default
    }
}

/// 输出格式化器的单次调用上下文。
///
/// `object_type` 是声明类型；为空时格式化器可以退而使用 `object` 的运行时类型。
/// `content_type` 在协商阶段由宿主填入候选值，选中后即为最终响应类型。
pub struct OutputFormatterWriteContext<'a> {
    content_type: Option<MediaType>,
    object_type: Option<ModelType>,
    object: Option<&'a (dyn Any + Send + Sync)>,
    body: ResponseBody<'a>,
    request_aborted: RequestAborted,
}

impl<'a> OutputFormatterWriteContext<'a> {
    /// 构造上下文。
    pub fn new(
        object_type: Option<ModelType>,
        object: Option<&'a (dyn Any + Send + Sync)>,
        body: ResponseBody<'a>,
    ) -> Self {
        Self {
            content_type: None,
            object_type,
            object,
            body,
            request_aborted: RequestAborted::new(),
        }
    }

    /// 指定请求取消信号。
    pub fn with_request_aborted(mut self, request_aborted: RequestAborted) -> Self {
        self.request_aborted = request_aborted;
        self
    }

    /// 设置候选/最终内容类型。
    pub fn set_content_type(&mut self, content_type: Option<MediaType>) {
        self.content_type = content_type;
    }

    /// 当前内容类型。
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// 声明类型。
    pub fn object_type(&self) -> Option<&ModelType> {
        self.object_type.as_ref()
    }

    /// 待写出的值。
    pub fn object(&self) -> Option<&'a (dyn Any + Send + Sync)> {
        self.object
    }

    /// 响应体。
    pub fn body(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        &mut *self.body
    }

    /// 取消信号。
    pub fn request_aborted(&self) -> &RequestAborted {
        &self.request_aborted
    }
}
