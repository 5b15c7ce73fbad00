use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// 单条模型校验错误。
///
/// `cause` 保留触发错误的底层异常，只用于服务端诊断；是否把它的文本暴露给客户端由
/// 各格式化器在写入 `message` 时决定。
#[derive(Clone)]
pub struct ModelError {
    message: String,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ModelError {
    /// 仅携带消息的错误。
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// 面向客户端的消息。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 底层原因。
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelError")
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

/// 请求级别的模型校验错误收集器，由宿主持有。
///
/// 键为空字符串表示错误作用于整个请求体而非某个字段。
#[derive(Debug, Default)]
pub struct ModelState {
    entries: IndexMap<String, Vec<ModelError>>,
}

impl ModelState {
    /// 创建空收集器。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条错误。
    pub fn add_model_error(&mut self, key: impl Into<String>, error: ModelError) {
        self.entries.entry(key.into()).or_default().push(error);
    }

    /// 是否没有任何错误。
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// 错误总数。
    pub fn error_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// 指定键下的错误。
    pub fn errors(&self, key: &str) -> &[ModelError] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// 按插入顺序遍历 `(键, 错误)`。
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelError)> {
        self.entries
            .iter()
            .flat_map(|(key, errors)| errors.iter().map(move |error| (key.as_str(), error)))
    }

    /// 清空。
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("broken body")
        }
    }

    impl StdError for Broken {}

    #[test]
    fn collects_errors_per_key() {
        let mut state = ModelState::new();
        assert!(state.is_valid());

        state.add_model_error("", ModelError::new("bad").with_cause(Broken));
        state.add_model_error("name", ModelError::new("required"));

        assert_eq!(state.error_count(), 2);
        assert_eq!(state.errors("").len(), 1);
        assert_eq!(
            state.errors("").first().and_then(ModelError::cause).map(ToString::to_string),
            Some("broken body".to_owned())
        );
        assert!(state.errors("missing").is_empty());
    }
}
