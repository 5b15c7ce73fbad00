use serde::{Deserialize, Serialize};

/// 结构体字段的线上布局。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// 以字段名为键的 map，跨语言对端无需知道字段顺序。
    #[default]
    Map,
    /// 按声明顺序的数组，体积更小但要求两端结构一致。
    Array,
}

/// 编解码器配置。
///
/// 解码同时接受 map 与数组两种结构体布局，`field_layout` 只影响编码。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// 编码结构体时使用的布局。
    pub field_layout: FieldLayout,
    /// 请求体字节上限，超出视为格式错误；`None` 表示不限制。
    pub max_body_bytes: Option<usize>,
}

impl CodecConfig {
    /// 默认配置：map 布局，不限制大小。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定字段布局。
    pub fn with_field_layout(mut self, field_layout: FieldLayout) -> Self {
        self.field_layout = field_layout;
        self
    }

    /// 指定请求体上限。
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }
}
