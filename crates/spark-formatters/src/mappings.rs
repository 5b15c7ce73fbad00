use std::collections::HashMap;

use crate::media::MediaType;

/// 格式令牌（如 `?format=msgpack` 中的 `msgpack`）到媒体类型的映射表。
///
/// 令牌比较大小写不敏感，并允许带前导 `.`（`.msgpack` 与 `msgpack` 等价）。
#[derive(Clone, Debug, Default)]
pub struct FormatterMappings {
    map: HashMap<String, MediaType>,
}

impl FormatterMappings {
    /// 空映射表。
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(format: &str) -> String {
        format.trim().trim_start_matches('.').to_ascii_lowercase()
    }

    /// 查询令牌对应的媒体类型。
    pub fn get_media_type_mapping_for_format(&self, format: &str) -> Option<&MediaType> {
        self.map.get(&Self::normalize(format))
    }

    /// 设置映射，覆盖已有值。
    ///
    /// 通配符媒体类型无法作为响应的 `Content-Type`，因此被拒绝并返回 `false`。
    pub fn set_media_type_mapping_for_format(
        &mut self,
        format: &str,
        media_type: MediaType,
    ) -> bool {
        let key = Self::normalize(format);
        if key.is_empty() || media_type.has_wildcard() {
            return false;
        }
        self.map.insert(key, media_type);
        true
    }

    /// 删除映射。
    pub fn clear_media_type_mapping_for_format(&mut self, format: &str) -> bool {
        self.map.remove(&Self::normalize(format)).is_some()
    }
}
