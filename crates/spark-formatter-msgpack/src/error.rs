use thiserror::Error;

/// MessagePack 编解码错误域。
///
/// # 契约说明（What）
/// - [`CodecError::is_malformed_input`] 为真的变体源于客户端提交的数据，输入格式化器会把它们转化为
///   模型校验错误；
/// - 其余变体表示注册或调用方式与类型不一致，属于服务端缺陷，向上传播为 500 类错误；
/// - `Display` 文本即“详细错误信息”，只有在显式允许时才会暴露给客户端。
#[derive(Debug, Error)]
pub enum CodecError {
    /// 字节流不是目标类型的合法 MessagePack 表示。
    #[error("MessagePack payload is not a valid `{type_name}`: {source}")]
    Malformed {
        type_name: &'static str,
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// 一个完整值之后仍有剩余字节。
    #[error("MessagePack payload for `{type_name}` has {trailing} trailing bytes after offset {consumed}")]
    TrailingBytes {
        type_name: &'static str,
        consumed: usize,
        trailing: usize,
    },

    /// 请求体超过配置的上限。
    #[error("MessagePack payload exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    /// 编码失败。
    #[error("failed to encode `{type_name}` as MessagePack: {source}")]
    Encode {
        type_name: &'static str,
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// 类型未在注册表中登记。
    #[error("type `{type_name}` is not registered for MessagePack")]
    Unregistered { type_name: &'static str },

    /// 声明类型与实际值的类型不一致。
    #[error("value does not match the declared type `{expected}`")]
    TypeMismatch { expected: &'static str },
}

impl CodecError {
    /// 是否属于客户端提交了格式错误的数据。
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::TrailingBytes { .. } | Self::BodyTooLarge { .. }
        )
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "spark.formatter.msgpack.malformed",
            Self::TrailingBytes { .. } => "spark.formatter.msgpack.trailing_bytes",
            Self::BodyTooLarge { .. } => "spark.formatter.msgpack.body_too_large",
            Self::Encode { .. } => "spark.formatter.msgpack.encode_failed",
            Self::Unregistered { .. } => "spark.formatter.msgpack.unregistered_type",
            Self::TypeMismatch { .. } => "spark.formatter.msgpack.type_mismatch",
        }
    }
}
