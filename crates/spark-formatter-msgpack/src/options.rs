use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spark_formatters::{CompatibilitySwitch, CompatibilityVersion, MediaType, MediaTypeCollection};

use crate::codec::MessagePackCodec;
use crate::config::CodecConfig;
use crate::registry::TypeRegistry;

/// 默认取值。
pub mod defaults {
    use spark_formatters::{MediaType, MediaTypeCollection};

    /// 首选媒体类型。
    pub const APPLICATION_X_MSGPACK: &str = "application/x-msgpack";
    /// 备选媒体类型。
    pub const APPLICATION_MSGPACK: &str = "application/msgpack";
    /// `?format=` 使用的令牌。
    pub const MEDIA_TYPE_FORMAT: &str = "msgpack";
    /// 输入格式化器的通用错误文本。
    pub const GENERIC_INPUT_ERROR: &str = "The input was not valid.";

    /// 按优先级排列的默认媒体类型集合。
    pub fn media_types() -> MediaTypeCollection {
        [
            MediaType::new(APPLICATION_X_MSGPACK),
            MediaType::new(APPLICATION_MSGPACK),
        ]
        .into_iter()
        .collect()
    }
}

/// MessagePack 格式化器配置。
///
/// # 设计背景（Why）
/// - 启动期通过 `add_msgpack_formatters_with` 的回调累积修改，`build` 阶段一次性交给格式化器；
/// - 格式化器构造时复制所需字段，之后修改本对象不会影响已注册的实例。
///
/// # 契约说明（What）
/// - `supported_media_types` 保持插入顺序，首个元素即响应默认使用的类型；为空时格式化器回落到
///   [`defaults::media_types`]，但不会注册格式令牌映射；
/// - `allow_input_formatter_exception_messages` 为兼容开关：显式设置优先，否则由兼容版本决定
///   （`2.0` 为 `false`，`2.1` 及以后为 `true`）；
/// - 可由 TOML 等配置源反序列化，缺省字段取默认值；注册表不参与反序列化。
///
/// # 风险提示（Trade-offs）
/// - 打开详细错误信息会把解码器的诊断文本（字段名、偏移量）回显给客户端。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MessagePackOptions {
    supported_media_types: MediaTypeCollection,
    media_type_format: String,
    codec: CodecConfig,
    allow_input_formatter_exception_messages: CompatibilitySwitch<bool>,
    #[serde(skip)]
    registry: Arc<TypeRegistry>,
}

impl Default for MessagePackOptions {
    fn default() -> Self {
        Self {
            supported_media_types: defaults::media_types(),
            media_type_format: defaults::MEDIA_TYPE_FORMAT.to_owned(),
            codec: CodecConfig::default(),
            allow_input_formatter_exception_messages: CompatibilitySwitch::new(false),
            registry: Arc::default(),
        }
    }
}

impl MessagePackOptions {
    /// 默认配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 支持的媒体类型。
    pub fn supported_media_types(&self) -> &MediaTypeCollection {
        &self.supported_media_types
    }

    /// 可变的媒体类型集合。
    pub fn supported_media_types_mut(&mut self) -> &mut MediaTypeCollection {
        &mut self.supported_media_types
    }

    /// 格式化器实际使用的集合：配置为空时回落到默认集合。
    pub fn effective_media_types(&self) -> MediaTypeCollection {
        if self.supported_media_types.is_empty() {
            defaults::media_types()
        } else {
            self.supported_media_types.clone()
        }
    }

    /// 首个配置的媒体类型。
    pub fn primary_media_type(&self) -> Option<&MediaType> {
        self.supported_media_types.first()
    }

    /// 格式令牌。
    pub fn media_type_format(&self) -> &str {
        &self.media_type_format
    }

    pub fn set_media_type_format(&mut self, format: impl Into<String>) {
        self.media_type_format = format.into();
    }

    /// 编解码配置。
    pub fn codec(&self) -> &CodecConfig {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut CodecConfig {
        &mut self.codec
    }

    /// 是否把解码器的详细错误写入模型校验错误。
    pub fn allow_input_formatter_exception_messages(&self) -> bool {
        self.allow_input_formatter_exception_messages.value()
    }

    /// 显式设置，优先于兼容版本推导的默认值。
    pub fn set_allow_input_formatter_exception_messages(&mut self, allow: bool) {
        self.allow_input_formatter_exception_messages.set(allow);
    }

    /// 应用兼容版本对应的默认值。
    pub fn apply_compatibility(&mut self, version: CompatibilityVersion) {
        self.allow_input_formatter_exception_messages
            .apply_default(version >= CompatibilityVersion::V2_1);
    }

    /// 类型注册表。
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// 登记可序列化类型，空请求体按默认值处理时得到空模型。
    pub fn register_type<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register::<T>();
        self
    }

    /// 登记可序列化类型及其默认值。
    pub fn register_type_with_default<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register_default::<T>();
        self
    }

    /// 替换整个注册表。
    pub fn set_registry(&mut self, registry: TypeRegistry) {
        self.registry = Arc::new(registry);
    }

    /// 以当前配置构造编解码器。
    pub fn build_codec(&self) -> MessagePackCodec {
        MessagePackCodec::new(self.codec.clone(), Arc::clone(&self.registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldLayout;
    use spark_formatters::ModelType;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Order {
        id: u64,
    }

    #[test]
    fn defaults_match_documented_values() {
        let options = MessagePackOptions::new();
        let media: Vec<_> = options
            .supported_media_types()
            .iter()
            .map(MediaType::as_str)
            .collect();
        assert_eq!(media, ["application/x-msgpack", "application/msgpack"]);
        assert_eq!(options.media_type_format(), "msgpack");
        assert!(!options.allow_input_formatter_exception_messages());
    }

    #[test]
    fn compatibility_version_decides_unless_configured() {
        let mut legacy = MessagePackOptions::new();
        legacy.apply_compatibility(CompatibilityVersion::V2_0);
        assert!(!legacy.allow_input_formatter_exception_messages());

        let mut current = MessagePackOptions::new();
        current.apply_compatibility(CompatibilityVersion::V2_1);
        assert!(current.allow_input_formatter_exception_messages());

        let mut explicit = MessagePackOptions::new();
        explicit.set_allow_input_formatter_exception_messages(false);
        explicit.apply_compatibility(CompatibilityVersion::Latest);
        assert!(!explicit.allow_input_formatter_exception_messages());
    }

    #[test]
    fn empty_media_types_fall_back_for_formatters() {
        let mut options = MessagePackOptions::new();
        options.supported_media_types_mut().clear();
        assert!(options.primary_media_type().is_none());
        assert_eq!(options.effective_media_types().len(), 2);
    }

    #[test]
    fn registration_does_not_leak_into_built_codecs() {
        let mut options = MessagePackOptions::new();
        let before = options.build_codec();
        options.register_type::<Order>();
        assert!(!before.can_serialize(Some(&ModelType::of::<Order>())));
        assert!(options.build_codec().can_serialize(Some(&ModelType::of::<Order>())));
    }

    #[test]
    fn loads_from_toml() {
        let options: MessagePackOptions = toml::from_str(
            r#"
            supported_media_types = ["application/vnd.demo+msgpack"]
            media_type_format = "mp"
            allow_input_formatter_exception_messages = false

            [codec]
            field_layout = "array"
            max_body_bytes = 65536
            "#,
        )
        .expect("valid toml");

        assert_eq!(
            options.primary_media_type().map(MediaType::as_str),
            Some("application/vnd.demo+msgpack")
        );
        assert_eq!(options.media_type_format(), "mp");
        assert_eq!(options.codec().field_layout, FieldLayout::Array);
        assert_eq!(options.codec().max_body_bytes, Some(65536));

        let mut options = options;
        options.apply_compatibility(CompatibilityVersion::Latest);
        assert!(!options.allow_input_formatter_exception_messages());
        assert!(options.registry().contains(&ModelType::of::<i32>()));
    }
}
