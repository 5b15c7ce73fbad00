use std::any::{Any, type_name};
use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use spark_formatters::{ErasedModel, ModelType};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{CodecConfig, FieldLayout};
use crate::error::CodecError;
use crate::registry::{TypeBinding, TypeRegistry};

/// MessagePack 的 `nil` 编码。
pub const NIL: u8 = 0xc0;

/// 按配置的字段布局编码单个值。
pub(crate) fn encode_typed<T>(value: &T, config: &CodecConfig) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    let encoded = match config.field_layout {
        FieldLayout::Map => rmp_serde::to_vec_named(value),
        FieldLayout::Array => rmp_serde::to_vec(value),
    };
    encoded.map_err(|source| CodecError::Encode {
        type_name: type_name::<T>(),
        source,
    })
}

/// 解码恰好一个完整值。
///
/// 超过 `max_body_bytes` 或在值之后仍有剩余字节均视为格式错误。
pub(crate) fn decode_typed<T>(bytes: &[u8], config: &CodecConfig) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    if let Some(limit) = config.max_body_bytes
        && bytes.len() > limit
    {
        return Err(CodecError::BodyTooLarge { limit });
    }

    let mut cursor = Cursor::new(bytes);
    let value = rmp_serde::from_read(&mut cursor).map_err(|source| CodecError::Malformed {
        type_name: type_name::<T>(),
        source,
    })?;

    let consumed = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    if consumed < bytes.len() {
        return Err(CodecError::TrailingBytes {
            type_name: type_name::<T>(),
            consumed,
            trailing: bytes.len() - consumed,
        });
    }
    Ok(value)
}

/// 编解码适配器：在 `rmp-serde` 之上提供类型判定、擦除编解码与请求体读取。
///
/// # 设计背景（Why）
/// - 输入/输出格式化器与独立动作结果共享同一套规则（布局、上限、空体语义），集中于此避免分叉；
/// - 注册表以 `Arc` 共享，格式化器构造后即与配置对象解耦。
///
/// # 逻辑解析（How）
/// - `can_serialize`：未知类型（`None`）放行，抽象契约拒绝，其余查注册表；
/// - `decode_erased`：零长度输入返回 `Ok(None)`，与格式错误严格区分；
/// - `encode_erased`：空值写出单字节 `nil`，否则按声明类型、再按运行时类型查找绑定。
///
/// # 契约说明（What）
/// - 所有方法均为纯函数或只读访问，可跨线程共享；
/// - 格式错误的详细文本由 [`CodecError`] 的 `Display` 提供，底层 `rmp-serde` 错误保留在 `source()`。
#[derive(Clone, Debug, Default)]
pub struct MessagePackCodec {
    config: CodecConfig,
    registry: Arc<TypeRegistry>,
}

impl MessagePackCodec {
    /// 以配置与注册表构造。
    pub fn new(config: CodecConfig, registry: Arc<TypeRegistry>) -> Self {
        Self { config, registry }
    }

    /// 使用默认注册表。
    pub fn with_config(config: CodecConfig) -> Self {
        Self::new(config, Arc::default())
    }

    /// 编解码配置。
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// 共享的类型注册表。
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// 能否在 `model_type` 上执行编解码。
    pub fn can_serialize(&self, model_type: Option<&ModelType>) -> bool {
        match model_type {
            None => true,
            Some(model_type) if model_type.is_abstract() => false,
            Some(model_type) => self.registry.contains(model_type),
        }
    }

    /// 声明类型优先，否则按值的运行时类型解析模型类型。
    pub fn resolve_model_type(
        &self,
        declared: Option<&ModelType>,
        value: Option<&(dyn Any + Send + Sync)>,
    ) -> Option<ModelType> {
        declared.copied().or_else(|| {
            value
                .and_then(|value| self.registry.binding_for_value(value))
                .map(TypeBinding::model_type)
        })
    }

    /// 编码具体类型的值，不经过注册表。
    pub fn encode<T>(&self, value: &T) -> Result<Bytes, CodecError>
    where
        T: Serialize + ?Sized,
    {
        encode_typed(value, &self.config).map(Bytes::from)
    }

    /// 解码具体类型；零长度输入返回 `Ok(None)`。
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<Option<T>, CodecError>
    where
        T: DeserializeOwned,
    {
        if bytes.is_empty() {
            return Ok(None);
        }
        decode_typed(bytes, &self.config).map(Some)
    }

    /// 编码擦除后的值。
    pub fn encode_erased(
        &self,
        declared: Option<&ModelType>,
        value: Option<&(dyn Any + Send + Sync)>,
    ) -> Result<Bytes, CodecError> {
        let Some(value) = value else {
            return Ok(Bytes::from_static(&[NIL]));
        };
        let binding = match declared {
            Some(model_type) => self.registry.binding(model_type).ok_or(
                CodecError::Unregistered {
                    type_name: model_type.name(),
                },
            )?,
            None => self
                .registry
                .binding_for_value(value)
                .ok_or(CodecError::Unregistered {
                    type_name: "<unknown runtime type>",
                })?,
        };
        binding.encode(value, &self.config).map(Bytes::from)
    }

    /// 解码为擦除后的值；零长度输入返回 `Ok(None)`。
    pub fn decode_erased(
        &self,
        bytes: &[u8],
        model_type: &ModelType,
    ) -> Result<Option<ErasedModel>, CodecError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let binding = self
            .registry
            .binding(model_type)
            .ok_or(CodecError::Unregistered {
                type_name: model_type.name(),
            })?;
        binding.decode(bytes, &self.config).map(Some)
    }

    /// `model_type` 登记的默认值。
    pub fn default_for(&self, model_type: &ModelType) -> Option<ErasedModel> {
        self.registry
            .binding(model_type)
            .and_then(TypeBinding::default_value)
    }

    /// 读取完整请求体。
    ///
    /// 配置了上限时最多读取 `limit + 1` 字节，超限判定留给解码阶段。
    pub async fn read_body(
        &self,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> std::io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match self.config.max_body_bytes {
            Some(limit) => {
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                body.take(cap).read_to_end(&mut buffer).await?;
            }
            None => {
                body.read_to_end(&mut buffer).await?;
            }
        }
        Ok(buffer)
    }
}
