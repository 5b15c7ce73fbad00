use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::compat::CompatibilityVersion;
use crate::options::FormatterOptions;

type Configure = Box<dyn Fn(&mut dyn Any) + Send + Sync>;
type FormatterStep = Box<dyn Fn(&mut FormatterOptions, &OptionsSource<'_>) + Send + Sync>;

/// 启动期注册入口：收集格式化器的配置回调与扩展模块的装配步骤。
///
/// # 设计背景（Why）
/// - 各格式扩展（MessagePack 等）以扩展 trait 的形式挂到 builder 上，注册时只登记步骤，`build` 时统一执行；
/// - 扩展自身的选项类型通过 `configure::<O>` 累积回调，`build` 阶段以 `O::default()` 为起点依次应用。
///
/// # 契约说明（What）
/// - `try_add_setup` 以键去重：同一扩展多次注册只保留第一次的装配步骤；
/// - `configure_formatters` 与装配步骤按注册顺序执行；
/// - `build` 不消耗 builder，可重复调用，每次产出独立的 [`FormatterOptions`]。
pub struct FormatterBuilder {
    compatibility_version: CompatibilityVersion,
    configurators: HashMap<TypeId, Vec<Configure>>,
    setup_keys: HashSet<&'static str>,
    steps: Vec<FormatterStep>,
}

impl Default for FormatterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterBuilder")
            .field("compatibility_version", &self.compatibility_version)
            .field("setups", &self.setup_keys)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl FormatterBuilder {
    /// 空 builder，兼容版本为 [`CompatibilityVersion::Latest`]。
    pub fn new() -> Self {
        Self {
            compatibility_version: CompatibilityVersion::default(),
            configurators: HashMap::new(),
            setup_keys: HashSet::new(),
            steps: Vec::new(),
        }
    }

    /// 设置兼容版本。
    pub fn set_compatibility_version(&mut self, version: CompatibilityVersion) -> &mut Self {
        self.compatibility_version = version;
        self
    }

    /// 当前兼容版本。
    pub fn compatibility_version(&self) -> CompatibilityVersion {
        self.compatibility_version
    }

    /// 为扩展选项类型 `O` 追加配置回调。
    pub fn configure<O, F>(&mut self, configure: F) -> &mut Self
    where
        O: Any,
        F: Fn(&mut O) + Send + Sync + 'static,
    {
        let erased: Configure = Box::new(move |options: &mut dyn Any| {
            if let Some(options) = options.downcast_mut::<O>() {
                configure(options);
            }
        });
        self.configurators
            .entry(TypeId::of::<O>())
            .or_default()
            .push(erased);
        self
    }

    /// 直接配置 [`FormatterOptions`]，与装配步骤按注册顺序交错执行。
    pub fn configure_formatters<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut FormatterOptions) + Send + Sync + 'static,
    {
        self.steps
            .push(Box::new(move |options, _source| configure(options)));
        self
    }

    /// 以 `key` 去重登记装配步骤；返回是否为首次登记。
    pub fn try_add_setup<F>(&mut self, key: &'static str, setup: F) -> bool
    where
        F: Fn(&mut FormatterOptions, &OptionsSource<'_>) + Send + Sync + 'static,
    {
        if !self.setup_keys.insert(key) {
            return false;
        }
        self.steps.push(Box::new(setup));
        true
    }

    /// 是否已登记某个装配步骤。
    pub fn has_setup(&self, key: &str) -> bool {
        self.setup_keys.contains(key)
    }

    /// 执行所有步骤，产出格式化器配置。
    pub fn build(&self) -> FormatterOptions {
        let source = OptionsSource { builder: self };
        let mut options = FormatterOptions::new();
        for step in &self.steps {
            step(&mut options, &source);
        }
        options
    }
}

/// 装配步骤读取扩展选项的视图。
pub struct OptionsSource<'a> {
    builder: &'a FormatterBuilder,
}

impl OptionsSource<'_> {
    /// 以 `O::default()` 为起点依次应用所有 `configure::<O>` 回调。
    pub fn get<O>(&self) -> O
    where
        O: Any + Default,
    {
        let mut options = O::default();
        if let Some(configurators) = self.builder.configurators.get(&TypeId::of::<O>()) {
            for configure in configurators {
                configure(&mut options);
            }
        }
        options
    }

    /// 应用声明的兼容版本。
    pub fn compatibility_version(&self) -> CompatibilityVersion {
        self.builder.compatibility_version
    }
}
