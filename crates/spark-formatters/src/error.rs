//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义格式化管线对宿主暴露的失败语义，每个变体对应一个稳定错误码与建议的 HTTP 状态；
//! - 请求体格式错误**不**在此出现：它被格式化器记录进 [`ModelState`](crate::ModelState)，
//!   由宿主走标准的“模型无效”分支。
//!
//! ## 设计要求（What）
//! - 派生 `thiserror::Error`，保留底层 `source()` 链；
//! - `status_hint` 只给出建议值，最终响应由宿主决定。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::media::MediaType;

/// 格式化管线错误域。
#[derive(Debug, Error)]
pub enum FormatterError {
    /// 没有输入格式化器能够读取该请求体。
    #[error("no input formatter accepts content type `{content_type}` for `{model_type}`")]
    UnsupportedMediaType {
        content_type: String,
        model_type: &'static str,
    },

    /// 没有输出格式化器能够满足客户端的 `Accept` 或格式令牌。
    #[error("no output formatter can write `{object_type}` as any of [{accepted}]")]
    NotAcceptable {
        object_type: Cow<'static, str>,
        accepted: String,
    },

    /// `?format=` 指定的令牌没有映射。
    #[error("format `{format}` has no media type mapping")]
    UnknownFormat { format: String },

    /// 读写请求或响应体时的 IO 失败。
    #[error("body i/o failed: {0}")]
    Io(#[from] io::Error),

    /// 写出过程中请求被取消。
    #[error("response write cancelled after {written} bytes")]
    Cancelled { written: usize },

    /// 已通过协商的类型在编码阶段失败，属于内部不一致。
    #[error("failed to serialize `{type_name}`")]
    Serialization {
        type_name: Cow<'static, str>,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// 响应头已经发出，无法再设置内容类型或写入结果。
    #[error("response has already started; cannot execute result")]
    ResponseStarted,
}

impl FormatterError {
    /// 包装编码失败。
    pub fn serialization(
        type_name: impl Into<Cow<'static, str>>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            type_name: type_name.into(),
            source: Box::new(source),
        }
    }

    /// 构造 `NotAcceptable`，将候选媒体类型拼接为可读列表。
    pub fn not_acceptable<'a>(
        object_type: impl Into<Cow<'static, str>>,
        accepted: impl IntoIterator<Item = &'a MediaType>,
    ) -> Self {
        let accepted = accepted
            .into_iter()
            .map(MediaType::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self::NotAcceptable {
            object_type: object_type.into(),
            accepted,
        }
    }

    /// 稳定错误码，用于日志与指标聚合。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType { .. } => "spark.formatters.unsupported_media_type",
            Self::NotAcceptable { .. } => "spark.formatters.not_acceptable",
            Self::UnknownFormat { .. } => "spark.formatters.unknown_format",
            Self::Io(_) => "spark.formatters.io",
            Self::Cancelled { .. } => "spark.formatters.cancelled",
            Self::Serialization { .. } => "spark.formatters.serialization_failed",
            Self::ResponseStarted => "spark.formatters.response_started",
        }
    }

    /// 建议的 HTTP 状态码。
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::UnsupportedMediaType { .. } => 415,
            Self::NotAcceptable { .. } => 406,
            Self::UnknownFormat { .. } => 404,
            Self::Cancelled { .. } => 499,
            Self::Io(_) | Self::Serialization { .. } | Self::ResponseStarted => 500,
        }
    }
}
