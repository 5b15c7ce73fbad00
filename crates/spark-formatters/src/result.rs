use async_trait::async_trait;

use crate::cancellation::RequestAborted;
use crate::context::ResponseBody;
use crate::error::FormatterError;
use crate::media::MediaType;

/// 响应头中格式化器关心的部分。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    status: u16,
    content_type: Option<MediaType>,
    has_started: bool,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            has_started: false,
        }
    }
}

impl ResponseHead {
    /// 状态码 200、无内容类型、尚未发送的响应头。
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    pub fn set_content_type(&mut self, content_type: Option<MediaType>) {
        self.content_type = content_type;
    }

    /// 响应头是否已经发送给客户端。
    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// 标记响应头已发送；之后不能再修改状态码与内容类型。
    pub fn mark_started(&mut self) {
        self.has_started = true;
    }
}

/// 动作结果执行时可用的响应视图。
///
/// `content_type` 是宿主按 `Accept` 协商出的候选类型，为空表示客户端没有偏好。
pub struct ActionContext<'a> {
    response: &'a mut ResponseHead,
    body: ResponseBody<'a>,
    content_type: Option<MediaType>,
    request_aborted: RequestAborted,
}

impl<'a> ActionContext<'a> {
    pub fn new(response: &'a mut ResponseHead, body: ResponseBody<'a>) -> Self {
        Self {
            response,
            body,
            content_type: None,
            request_aborted: RequestAborted::new(),
        }
    }

    /// 指定候选内容类型。
    pub fn with_content_type(mut self, content_type: Option<MediaType>) -> Self {
        self.content_type = content_type;
        self
    }

    /// 指定请求取消信号。
    pub fn with_request_aborted(mut self, request_aborted: RequestAborted) -> Self {
        self.request_aborted = request_aborted;
        self
    }

    pub fn response(&mut self) -> &mut ResponseHead {
        &mut *self.response
    }

    pub fn body(&mut self) -> ResponseBody<'_> {
        &mut *self.body
    }

    /// 候选内容类型。
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    pub fn request_aborted(&self) -> &RequestAborted {
        &self.request_aborted
    }
}

/// 绕过协商、直接写出响应的结果对象。
///
/// 实现应在修改响应头前检查 [`ResponseHead::has_started`]，已发送时返回
/// [`FormatterError::ResponseStarted`]；编码失败时保持响应头不变，宿主仍可改写为 500。
#[async_trait]
pub trait ActionResult: Send + Sync {
    async fn execute_result(&self, ctx: &mut ActionContext<'_>) -> Result<(), FormatterError>;
}
