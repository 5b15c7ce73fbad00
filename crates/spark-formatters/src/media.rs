use std::borrow::Cow;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// `MediaType` 以 IANA `type/subtype` 约定描述请求或响应体的表示形式。
///
/// # 逻辑解析（How）
/// - 内部保存原始字符串（可能带 `; charset=...` 等参数），比较时只看 `type/subtype` 部分；
/// - `type`/`subtype` 比较大小写不敏感，`*` 作为通配符仅在 [`MediaType::is_subset_of`] 的右侧生效。
///
/// # 契约说明（What）
/// - **前置条件**：调用方传入的值应满足 `type/subtype` 格式；缺少 `/` 时整个值视为 `type`，`subtype` 为空；
/// - **后置条件**：`Eq`/`Hash` 基于原始字符串，集合去重语义与配置中的书写保持一致。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(Cow<'static, str>);

impl MediaType {
    /// 创建新的媒体类型。
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self(value.into())
    }

    /// 返回原始字符串。
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 去掉参数后的 `type/subtype`。
    pub fn essence(&self) -> &str {
        match self.0.split_once(';') {
            Some((essence, _)) => essence.trim(),
            None => self.0.trim(),
        }
    }

    fn parts(&self) -> (&str, &str) {
        let essence = self.essence();
        match essence.split_once('/') {
            Some((ty, subtype)) => (ty.trim(), subtype.trim()),
            None => (essence, ""),
        }
    }

    /// 判断 `self` 是否落在 `other` 描述的范围内。
    ///
    /// `other` 可以携带通配符（`*/*`、`application/*`），`self` 中的通配符按字面比较。
    pub fn is_subset_of(&self, other: &MediaType) -> bool {
        let (ty, subtype) = self.parts();
        let (other_ty, other_subtype) = other.parts();
        (other_ty == "*" || ty.eq_ignore_ascii_case(other_ty))
            && (other_subtype == "*" || subtype.eq_ignore_ascii_case(other_subtype))
    }

    /// 是否包含通配符。
    pub fn has_wildcard(&self) -> bool {
        let (ty, subtype) = self.parts();
        ty == "*" || subtype == "*"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for MediaType {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// 去重且保持插入顺序的媒体类型集合。
///
/// 格式映射注册依赖“插入顺序的第一个”，因此不能使用无序集合。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTypeCollection {
    items: IndexSet<MediaType>,
}

impl MediaTypeCollection {
    /// 创建空集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加媒体类型；已存在时返回 `false` 且保持原位置。
    pub fn insert(&mut self, media_type: impl Into<MediaType>) -> bool {
        self.items.insert(media_type.into())
    }

    /// 移除指定媒体类型。
    pub fn remove(&mut self, media_type: &MediaType) -> bool {
        self.items.shift_remove(media_type)
    }

    /// 清空集合。
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// 集合是否为空。
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 元素数量。
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 按插入顺序遍历。
    pub fn iter(&self) -> impl Iterator<Item = &MediaType> {
        self.items.iter()
    }

    /// 插入顺序的第一个元素。
    pub fn first(&self) -> Option<&MediaType> {
        self.items.first()
    }

    /// 是否精确包含某个值（按原始字符串比较）。
    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.items.contains(media_type)
    }

    /// 请求声明的 `content_type` 是否被集合中的任一项接纳。
    pub fn accepts(&self, content_type: &MediaType) -> bool {
        self.items
            .iter()
            .any(|supported| content_type.is_subset_of(supported))
    }

    /// 在集合中找到第一个满足客户端 `accept` 范围的具体媒体类型。
    pub fn first_within(&self, accept: &MediaType) -> Option<&MediaType> {
        self.items
            .iter()
            .find(|supported| supported.is_subset_of(accept))
    }
}

impl<M> FromIterator<M> for MediaTypeCollection
where
    M: Into<MediaType>,
{
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MediaTypeCollection {
    type Item = &'a MediaType;
    type IntoIter = indexmap::set::Iter<'a, MediaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
