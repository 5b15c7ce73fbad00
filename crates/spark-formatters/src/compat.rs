use serde::{Deserialize, Deserializer};

/// 应用声明的兼容版本，决定未显式配置的开关取何默认值。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum CompatibilityVersion {
    /// 最早的行为基线。
    #[serde(rename = "2.0")]
    V2_0,
    /// 起始于此版本的新默认值。
    #[serde(rename = "2.1")]
    V2_1,
    /// 始终跟随最新默认值。
    #[default]
    #[serde(rename = "latest")]
    Latest,
}

/// 兼容开关：显式配置的值优先，否则使用由兼容版本推导的默认值。
///
/// # 契约说明（What）
/// - `set` 记录显式值，之后 `apply_default` 不再生效；
/// - 反序列化时读到的值视为显式配置，缺省字段保持未配置。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompatibilitySwitch<T> {
    configured: Option<T>,
    default: T,
}

impl<T: Copy> CompatibilitySwitch<T> {
    /// 以给定默认值创建。
    pub fn new(default: T) -> Self {
        Self {
            configured: None,
            default,
        }
    }

    /// 当前生效值。
    pub fn value(&self) -> T {
        self.configured.unwrap_or(self.default)
    }

    /// 显式设置。
    pub fn set(&mut self, value: T) {
        self.configured = Some(value);
    }

    /// 是否显式设置过。
    pub fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// 更新默认值；不影响显式配置。
    pub fn apply_default(&mut self, default: T) {
        self.default = default;
    }
}

impl<'de, T> Deserialize<'de> for CompatibilitySwitch<T>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|configured| Self {
            configured,
            default: T::default(),
        })
    }
}
