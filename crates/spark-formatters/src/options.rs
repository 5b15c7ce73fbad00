use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::formatter::{InputFormatter, OutputFormatter};
use crate::mappings::FormatterMappings;

struct Entry<F: ?Sized> {
    formatter: Arc<F>,
    concrete: Arc<dyn Any + Send + Sync>,
    concrete_type: TypeId,
    name: &'static str,
}

impl<F: ?Sized> Clone for Entry<F> {
    fn clone(&self) -> Self {
        Self {
            formatter: Arc::clone(&self.formatter),
            concrete: Arc::clone(&self.concrete),
            concrete_type: self.concrete_type,
            name: self.name,
        }
    }
}

/// 有序的格式化器列表；协商时按顺序选出第一个接受的实现。
///
/// 除对象层引用外还保留具体类型，便于配置阶段按类型查找或去重。
pub struct FormatterCollection<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

impl<F: ?Sized> Default for FormatterCollection<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> Clone for FormatterCollection<F> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for FormatterCollection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.name))
            .finish()
    }
}

impl<F: ?Sized> FormatterCollection<F> {
    /// 数量。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按注册顺序遍历对象层引用。
    pub fn iter(&self) -> impl Iterator<Item = &Arc<F>> {
        self.entries.iter().map(|entry| &entry.formatter)
    }

    /// 具体类型为 `T` 的实例数量。
    pub fn count_of<T: Any>(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.concrete_type == TypeId::of::<T>())
            .count()
    }

    /// 第一个具体类型为 `T` 的实例。
    pub fn find<T: Any>(&self) -> Option<&T> {
        self.entries
            .iter()
            .find_map(|entry| entry.concrete.downcast_ref::<T>())
    }

    /// 移除所有具体类型为 `T` 的实例，返回移除数量。
    pub fn remove_all<T: Any>(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.concrete_type != TypeId::of::<T>());
        before - self.entries.len()
    }
}

impl FormatterCollection<dyn InputFormatter> {
    /// 追加输入格式化器。
    pub fn push<T: InputFormatter>(&mut self, formatter: T) {
        let concrete = Arc::new(formatter);
        self.entries.push(Entry {
            formatter: concrete.clone() as Arc<dyn InputFormatter>,
            concrete: concrete as Arc<dyn Any + Send + Sync>,
            concrete_type: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        });
    }
}

impl FormatterCollection<dyn OutputFormatter> {
    /// 追加输出格式化器。
    pub fn push<T: OutputFormatter>(&mut self, formatter: T) {
        let concrete = Arc::new(formatter);
        self.entries.push(Entry {
            formatter: concrete.clone() as Arc<dyn OutputFormatter>,
            concrete: concrete as Arc<dyn Any + Send + Sync>,
            concrete_type: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        });
    }
}

/// 宿主的格式化器配置：输入/输出格式化器列表与格式令牌映射。
///
/// 由 [`FormatterBuilder::build`](crate::FormatterBuilder::build) 在启动时产出，之后只读共享。
#[derive(Clone, Debug, Default)]
pub struct FormatterOptions {
    input_formatters: FormatterCollection<dyn InputFormatter>,
    output_formatters: FormatterCollection<dyn OutputFormatter>,
    formatter_mappings: FormatterMappings,
}

impl FormatterOptions {
    /// 空配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入格式化器。
    pub fn input_formatters(&self) -> &FormatterCollection<dyn InputFormatter> {
        &self.input_formatters
    }

    /// 可变输入格式化器。
    pub fn input_formatters_mut(&mut self) -> &mut FormatterCollection<dyn InputFormatter> {
        &mut self.input_formatters
    }

    /// 输出格式化器。
    pub fn output_formatters(&self) -> &FormatterCollection<dyn OutputFormatter> {
        &self.output_formatters
    }

    /// 可变输出格式化器。
    pub fn output_formatters_mut(&mut self) -> &mut FormatterCollection<dyn OutputFormatter> {
        &mut self.output_formatters
    }

    /// 格式令牌映射。
    pub fn formatter_mappings(&self) -> &FormatterMappings {
        &self.formatter_mappings
    }

    /// 可变格式令牌映射。
    pub fn formatter_mappings_mut(&mut self) -> &mut FormatterMappings {
        &mut self.formatter_mappings
    }
}
