//! # spark-formatters
//!
//! ## 教案意图（Why）
//! - **职责定位**：定义宿主与各格式扩展之间的窄接口：媒体类型、模型类型描述、输入/输出格式化器、
//!   校验错误收集器、格式令牌映射与启动期注册入口；
//! - **架构价值**：格式扩展（如 `spark-formatter-msgpack`）只依赖本 crate，不感知路由、控制器分发
//!   或依赖注入容器；
//! - **团队协作**：宿主侧只需实现上下文构造与 [`FormatterPipeline`] 的调用点，即可接入任意格式。
//!
//! ## 使用方式（How）
//! 1. 启动期创建 [`FormatterBuilder`]，由各扩展通过扩展 trait 登记装配步骤；
//! 2. `build` 产出 [`FormatterOptions`]，交给 [`FormatterPipeline`] 只读共享；
//! 3. 每个请求构造 [`InputFormatterContext`] / [`OutputFormatterWriteContext`]，借给格式化器一次调用。
//!
//! ## 契约说明（What）
//! - 请求体格式错误写入 [`ModelState`]，不会以 `Err` 形式逃逸；
//! - 其余失败统一为 [`FormatterError`]，附带稳定错误码与建议状态码；
//! - 所有格式化器满足 `Send + Sync + 'static`，可在多线程运行时并发使用。
//!
//! ## 风险提示（Trade-offs）
//! - 运行时类型信息只有 [`ModelType`] 描述的 `TypeId` 与名称，能否序列化由各格式扩展自行登记判断。

pub mod builder;
pub mod cancellation;
pub mod compat;
pub mod context;
pub mod error;
pub mod formatter;
pub mod io;
pub mod mappings;
pub mod media;
pub mod model;
pub mod model_state;
pub mod options;
pub mod pipeline;
pub mod result;

pub use builder::{FormatterBuilder, OptionsSource};
pub use cancellation::RequestAborted;
pub use compat::{CompatibilitySwitch, CompatibilityVersion};
pub use context::{InputFormatterContext, OutputFormatterWriteContext, RequestBody, ResponseBody};
pub use error::FormatterError;
pub use formatter::{InputFormatter, InputFormatterResult, OutputFormatter, select_media_type};
pub use io::write_cancellable;
pub use mappings::FormatterMappings;
pub use media::{MediaType, MediaTypeCollection};
pub use model::{BoundModel, ErasedModel, ModelType, TypeKind};
pub use model_state::{ModelError, ModelState};
pub use options::{FormatterCollection, FormatterOptions};
pub use pipeline::{FormatterPipeline, ResponseNegotiation};
pub use result::{ActionContext, ActionResult, ResponseHead};

/// 便于在异步 trait 实现中直接引用宏。
pub use async_trait::async_trait;
