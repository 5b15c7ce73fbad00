use spark_formatters::{FormatterBuilder, FormatterMappings, FormatterOptions, OptionsSource};
use tracing::debug;

use crate::input::MessagePackInputFormatter;
use crate::options::MessagePackOptions;
use crate::output::MessagePackOutputFormatter;

/// MessagePack 装配步骤在 [`FormatterBuilder`] 中的去重键。
pub const SETUP_KEY: &str = "spark.formatters.msgpack";

/// 为 [`FormatterBuilder`] 增加 MessagePack 注册入口。
///
/// # 契约说明（What）
/// - 多次调用只注册一个输入格式化器与一个输出格式化器；
/// - `add_msgpack_formatters_with` 的回调全部保留，`build` 时按注册顺序作用于同一个
///   [`MessagePackOptions`]，随后再应用兼容版本推导的默认值；
/// - 格式令牌映射“先到先得”：宿主或其他扩展已映射同一令牌时保持原值。
pub trait MessagePackBuilderExt {
    /// 注册 MessagePack 输入/输出格式化器。
    fn add_msgpack_formatters(&mut self) -> &mut Self;

    /// 注册格式化器并追加一个配置回调。
    fn add_msgpack_formatters_with<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut MessagePackOptions) + Send + Sync + 'static;
}

impl MessagePackBuilderExt for FormatterBuilder {
    fn add_msgpack_formatters(&mut self) -> &mut Self {
        self.try_add_setup(SETUP_KEY, configure_formatters);
        self
    }

    fn add_msgpack_formatters_with<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut MessagePackOptions) + Send + Sync + 'static,
    {
        self.configure::<MessagePackOptions, _>(configure);
        self.add_msgpack_formatters()
    }
}

fn configure_formatters(options: &mut FormatterOptions, source: &OptionsSource<'_>) {
    let mut msgpack = source.get::<MessagePackOptions>();
    msgpack.apply_compatibility(source.compatibility_version());

    options
        .output_formatters_mut()
        .push(MessagePackOutputFormatter::new(&msgpack));
    options
        .input_formatters_mut()
        .push(MessagePackInputFormatter::new(&msgpack));
    configure_media_type_format(options.formatter_mappings_mut(), &msgpack);
}

/// 把格式令牌映射到首个支持的媒体类型；返回是否新增了映射。
///
/// 已存在映射或支持集合为空时不做修改。
pub fn configure_media_type_format(
    mappings: &mut FormatterMappings,
    options: &MessagePackOptions,
) -> bool {
    let format = options.media_type_format();
    if let Some(existing) = mappings.get_media_type_mapping_for_format(format) {
        debug!(
            format,
            existing = existing.as_str(),
            "format token already mapped; keeping existing media type"
        );
        return false;
    }
    let Some(media_type) = options.primary_media_type() else {
        debug!(format, "no supported media type; format token left unmapped");
        return false;
    };
    let added = mappings.set_media_type_mapping_for_format(format, media_type.clone());
    if added {
        debug!(format, media_type = media_type.as_str(), "format token mapped");
    }
    added
}
