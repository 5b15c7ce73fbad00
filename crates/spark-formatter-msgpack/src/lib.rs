//! `spark-formatter-msgpack` 为 `spark-formatters` 协商管线提供 MessagePack 请求/响应体格式化器。
//!
//! # 教案背景（Why）
//! - 让宿主在不改动路由与控制器的前提下，以 MessagePack 作为文本格式之外的二进制替代表示；
//! - 编码细节交给 `rmp-serde`，本 crate 只负责“能否处理某类型”的判定、与请求/响应流的对接，
//!   以及把客户端提交的错误数据转化为可恢复的模型校验错误。
//!
//! # 使用概览（How）
//! - 启动期调用 [`MessagePackBuilderExt::add_msgpack_formatters`]（或带配置回调的
//!   `add_msgpack_formatters_with`），并通过 [`MessagePackOptions::register_type`] 登记业务类型；
//! - `FormatterBuilder::build` 后，输入/输出格式化器各一个出现在格式化器列表中，
//!   `?format=msgpack` 映射到首选媒体类型 `application/x-msgpack`；
//! - 需要绕过协商时直接返回 [`MessagePackResult`]。
//!
//! # 合约说明（What）
//! - 抽象契约（`ModelType::contract::<dyn Trait>()`）永远不被接受；未登记的具体类型同样被拒绝；
//! - 空请求体与格式错误严格区分：前者按绑定点要求给出 `NoValue` 或默认值，后者记录一条模型错误；
//! - 输出格式化器对空值写出 `nil`（`0xc0`），[`MessagePackResult`] 对空值写出空响应体。
//!
//! # 风险提示与后续（Trade-offs）
//! - 响应在写出前整体编码到内存，超大响应应在业务层分页；
//! - 类型判定依赖启动期登记，遗漏登记的类型会在协商阶段被拒绝（415/406），而非运行时报错。

mod codec;
mod config;
mod error;
mod input;
mod options;
mod output;
mod registry;
mod result;
mod setup;

pub use crate::codec::{MessagePackCodec, NIL};
pub use crate::config::{CodecConfig, FieldLayout};
pub use crate::error::CodecError;
pub use crate::input::MessagePackInputFormatter;
pub use crate::options::{MessagePackOptions, defaults};
pub use crate::output::MessagePackOutputFormatter;
pub use crate::registry::{TypeBinding, TypeRegistry};
pub use crate::result::MessagePackResult;
pub use crate::setup::{MessagePackBuilderExt, SETUP_KEY, configure_media_type_format};
