use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use spark_formatters::{ErasedModel, ModelType};

use crate::codec::{decode_typed, encode_typed};
use crate::config::CodecConfig;
use crate::error::CodecError;

type EncodeFn = fn(&(dyn Any + Send + Sync), &CodecConfig) -> Result<Vec<u8>, CodecError>;
type DecodeFn = fn(&[u8], &CodecConfig) -> Result<ErasedModel, CodecError>;
type DefaultFn = fn() -> ErasedModel;

/// 单个具体类型的擦除编解码入口。
///
/// # 逻辑解析（How）
/// - 注册时为 `T` 单态化出一组函数指针：编码前以 `downcast_ref` 还原类型，解码后装箱为 [`ErasedModel`]；
/// - 有 `Default` 的类型额外记录默认值工厂，供空请求体按默认值处理时使用。
#[derive(Clone, Copy)]
pub struct TypeBinding {
    model_type: ModelType,
    encode: EncodeFn,
    decode: DecodeFn,
    default: Option<DefaultFn>,
}

impl TypeBinding {
    fn of<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            model_type: ModelType::of::<T>(),
            encode: encode_erased::<T>,
            decode: decode_erased::<T>,
            default: None,
        }
    }

    /// 绑定对应的模型类型。
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// 编码擦除后的值。
    pub fn encode(
        &self,
        value: &(dyn Any + Send + Sync),
        config: &CodecConfig,
    ) -> Result<Vec<u8>, CodecError> {
        (self.encode)(value, config)
    }

    /// 解码为擦除后的值。
    pub fn decode(&self, bytes: &[u8], config: &CodecConfig) -> Result<ErasedModel, CodecError> {
        (self.decode)(bytes, config)
    }

    /// 默认值；未登记默认值时为 `None`。
    pub fn default_value(&self) -> Option<ErasedModel> {
        self.default.map(|factory| factory())
    }
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("model_type", &self.model_type)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

fn encode_erased<T>(
    value: &(dyn Any + Send + Sync),
    config: &CodecConfig,
) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + Send + Sync + 'static,
{
    let typed = value
        .downcast_ref::<T>()
        .ok_or(CodecError::TypeMismatch {
            expected: type_name::<T>(),
        })?;
    encode_typed(typed, config)
}

fn decode_erased<T>(bytes: &[u8], config: &CodecConfig) -> Result<ErasedModel, CodecError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value: T = decode_typed(bytes, config)?;
    Ok(Box::new(value))
}

fn default_erased<T>() -> ErasedModel
where
    T: Default + Send + Sync + 'static,
{
    Box::new(T::default())
}

/// 启动期登记的可序列化类型表，是 `can_serialize` 判定的唯一依据。
///
/// # 设计背景（Why）
/// - Rust 没有运行时反射，无法对任意 `TypeId` 询问“能否序列化”；改为在启动时显式登记；
/// - 抽象契约（`dyn Trait`）永远不会出现在表中，因此天然被拒绝。
///
/// # 契约说明（What）
/// - [`TypeRegistry::default`] 预置常用基础类型及 `serde_json::Value`（开放的“任意对象”类型）；
/// - [`TypeRegistry::empty`] 不含任何类型，适合需要白名单的场景；
/// - 重复登记同一类型时后者覆盖前者。
#[derive(Clone)]
pub struct TypeRegistry {
    bindings: HashMap<TypeId, TypeBinding>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin();
        registry
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .bindings
            .values()
            .map(|binding| binding.model_type.name())
            .collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

impl TypeRegistry {
    /// 不含任何类型的注册表。
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// 登记类型；空请求体按默认值处理时得到空模型。
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.bindings
            .insert(TypeId::of::<T>(), TypeBinding::of::<T>());
        self
    }

    /// 登记类型并记录 `T::default()` 作为空请求体的默认值。
    pub fn register_default<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        let binding = TypeBinding {
            default: Some(default_erased::<T>),
            ..TypeBinding::of::<T>()
        };
        self.bindings.insert(TypeId::of::<T>(), binding);
        self
    }

    /// 按模型类型查找。抽象契约永远查不到。
    pub fn binding(&self, model_type: &ModelType) -> Option<&TypeBinding> {
        if model_type.is_abstract() {
            return None;
        }
        self.bindings.get(&model_type.type_id())
    }

    /// 按值的运行时类型查找。
    pub fn binding_for_value(&self, value: &(dyn Any + Send + Sync)) -> Option<&TypeBinding> {
        let value: &dyn Any = value;
        self.bindings.get(&value.type_id())
    }

    /// 是否登记了 `model_type`。
    pub fn contains(&self, model_type: &ModelType) -> bool {
        self.binding(model_type).is_some()
    }

    /// 已登记的类型数量。
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn register_builtin(&mut self) {
        self.register_default::<()>()
            .register_default::<bool>()
            .register_default::<i8>()
            .register_default::<i16>()
            .register_default::<i32>()
            .register_default::<i64>()
            .register_default::<u8>()
            .register_default::<u16>()
            .register_default::<u32>()
            .register_default::<u64>()
            .register_default::<f32>()
            .register_default::<f64>()
            .register_default::<char>()
            .register_default::<String>()
            .register_default::<Vec<u8>>()
            .register_default::<Vec<i32>>()
            .register_default::<Vec<i64>>()
            .register_default::<Vec<f64>>()
            .register_default::<Vec<String>>()
            .register_default::<Option<bool>>()
            .register_default::<Option<i32>>()
            .register_default::<Option<i64>>()
            .register_default::<Option<f64>>()
            .register_default::<Option<String>>()
            .register_default::<serde_json::Value>();
    }
}
