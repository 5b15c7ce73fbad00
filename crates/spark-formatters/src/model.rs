use std::any::{Any, TypeId};
use std::fmt;

/// 模型类型的形态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// 具备确定布局的具体类型（原始类型、结构体、枚举、集合、`Option` 包装）。
    Concrete,
    /// 只有行为契约、没有具体布局的类型，在 Rust 中对应 `dyn Trait`。
    Abstract,
}

/// `ModelType` 是宿主在绑定请求体或输出结果时传递给格式化器的类型描述符。
///
/// # 设计背景（Why）
/// - 格式化器以对象层（`dyn InputFormatter`）注册，无法在签名里携带泛型参数，
///   因此以 `TypeId` + 名称 + 形态的组合在运行时描述目标类型；
/// - 抽象契约通过 `ModelType::contract::<dyn Trait>()` 显式声明，格式化器据此拒绝无法还原的类型。
///
/// # 契约说明（What）
/// - `type_id` 与 `name` 均来自 `std::any`，同一类型在进程内稳定；
/// - 相等性只比较 `type_id` 与 `kind`，`name` 仅用于日志与诊断。
#[derive(Clone, Copy)]
pub struct ModelType {
    type_id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl ModelType {
    /// 描述具体类型 `T`。
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// 描述抽象契约（通常是 `dyn Trait`）。
    pub fn contract<T: ?Sized + Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Abstract,
        }
    }

    /// 类型标识。
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 完整类型名。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 类型形态。
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// 是否为抽象契约。
    pub fn is_abstract(&self) -> bool {
        self.kind == TypeKind::Abstract
    }

    /// 判断 `T` 是否就是当前描述的类型。
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.kind == other.kind
    }
}

impl Eq for ModelType {}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 类型擦除后的模型值，供对象层格式化器在宿主与业务代码之间传递。
pub type ErasedModel = Box<dyn Any + Send + Sync>;

/// 绑定完成后的模型。
///
/// `None` 表示成功绑定但值为空（例如空请求体按默认值处理、且该类型没有默认值）。
#[derive(Debug, Default)]
pub struct BoundModel(Option<ErasedModel>);

impl BoundModel {
    /// 包装已解码的值。
    pub fn new(value: ErasedModel) -> Self {
        Self(Some(value))
    }

    /// 空模型。
    pub fn absent() -> Self {
        Self(None)
    }

    /// 是否携带值。
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// 以借用方式访问具体类型。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }

    /// 取出具体类型；类型不匹配时原样返回。
    pub fn downcast<T: Any>(self) -> Result<Option<T>, Self> {
        match self.0 {
            None => Ok(None),
            Some(value) => match value.downcast::<T>() {
                Ok(typed) => Ok(Some(*typed)),
                Err(value) => Err(Self(Some(value))),
            },
        }
    }

    /// 以擦除形态借用。
    pub fn as_erased(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.0.as_deref()
    }

    /// 取出擦除后的值。
    pub fn into_inner(self) -> Option<ErasedModel> {
        self.0
    }
}

impl From<Option<ErasedModel>> for BoundModel {
    fn from(value: Option<ErasedModel>) -> Self {
        Self(value)
    }
}
