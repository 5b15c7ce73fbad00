//! # pipeline 模块说明
//!
//! ## 角色定位（Why）
//! - 宿主在模型绑定与结果写出两处调用格式化器；此模块给出最小但完整的协商顺序，
//!   便于格式扩展在没有完整 HTTP 栈的情况下端到端验证；
//! - 路由、控制器分发等外部协作者只需提供上下文与候选媒体类型。
//!
//! ## 行为逻辑（How）
//! - 读取：按注册顺序选出第一个 `can_read` 为真的输入格式化器；
//! - 写出：`?format=` 令牌优先，其次是 `Accept` 列表，最后不带候选（由格式化器选择首选类型）；
//!   对每个候选依次询问所有输出格式化器，第一个接受者负责写出。
//!
//! ## 风险提示（Trade-offs）
//! - `Accept` 的 `q` 权重不在此解析，调用方应按优先级排好顺序再传入。

use tracing::debug;

use crate::context::{InputFormatterContext, OutputFormatterWriteContext};
use crate::error::FormatterError;
use crate::formatter::InputFormatterResult;
use crate::media::MediaType;
use crate::options::FormatterOptions;

/// 写出阶段的协商输入。
#[derive(Clone, Debug, Default)]
pub struct ResponseNegotiation {
    format: Option<String>,
    accept: Vec<MediaType>,
}

impl ResponseNegotiation {
    /// 无任何偏好。
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询参数中的格式令牌。
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// 按优先级排列的 `Accept` 媒体类型。
    pub fn with_accept<I, M>(mut self, accept: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MediaType>,
    {
        self.accept = accept.into_iter().map(Into::into).collect();
        self
    }

    /// 格式令牌。
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// `Accept` 候选列表。
    pub fn accept(&self) -> &[MediaType] {
        &self.accept
    }
}

/// 基于 [`FormatterOptions`] 的协商执行器。
#[derive(Clone, Debug)]
pub struct FormatterPipeline {
    options: FormatterOptions,
}

impl FormatterPipeline {
    /// 以启动期产出的配置构造。
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }

    /// 底层配置。
    pub fn options(&self) -> &FormatterOptions {
        &self.options
    }

    /// 选择输入格式化器并读取请求体。
    ///
    /// # 契约说明（What）
    /// - 没有格式化器接受时返回 [`FormatterError::UnsupportedMediaType`]；
    /// - 请求体格式错误表现为 `Ok(InputFormatterResult::Failure)`，错误已记入 `ModelState`。
    pub async fn read_request_body(
        &self,
        ctx: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult, FormatterError> {
        let Some(formatter) = self
            .options
            .input_formatters()
            .iter()
            .find(|formatter| formatter.can_read(ctx))
        else {
            return Err(FormatterError::UnsupportedMediaType {
                content_type: ctx
                    .content_type()
                    .map(|content_type| content_type.as_str().to_owned())
                    .unwrap_or_default(),
                model_type: ctx.model_type().name(),
            });
        };
        formatter.read(ctx).await
    }

    /// 协商并写出响应体，返回最终的响应内容类型。
    ///
    /// # 契约说明（What）
    /// - 未映射的格式令牌返回 [`FormatterError::UnknownFormat`]；
    /// - 所有候选都无人接受时返回 [`FormatterError::NotAcceptable`]；
    /// - 返回 `None` 仅当选中的格式化器既未收敛内容类型也没有声明任何媒体类型。
    pub async fn write_response(
        &self,
        negotiation: &ResponseNegotiation,
        ctx: &mut OutputFormatterWriteContext<'_>,
    ) -> Result<Option<MediaType>, FormatterError> {
        let candidates: Vec<Option<MediaType>> = match negotiation.format() {
            Some(format) => {
                let media_type = self
                    .options
                    .formatter_mappings()
                    .get_media_type_mapping_for_format(format)
                    .cloned()
                    .ok_or_else(|| FormatterError::UnknownFormat {
                        format: format.to_owned(),
                    })?;
                vec![Some(media_type)]
            }
            None if negotiation.accept().is_empty() => vec![None],
            None => negotiation.accept().iter().cloned().map(Some).collect(),
        };

        for candidate in &candidates {
            for formatter in self.options.output_formatters().iter() {
                ctx.set_content_type(candidate.clone());
                if !formatter.can_write_result(ctx) {
                    continue;
                }
                let selected = ctx
                    .content_type()
                    .cloned()
                    .or_else(|| candidate.clone())
                    .or_else(|| formatter.supported_media_types().first().cloned());
                debug!(
                    content_type = selected.as_ref().map(MediaType::as_str),
                    "output formatter selected"
                );
                formatter.write_response_body(ctx).await?;
                return Ok(selected);
            }
        }

        let object_type = ctx
            .object_type()
            .map(|object_type| object_type.name())
            .unwrap_or("null");
        Err(FormatterError::not_acceptable(
            object_type,
            candidates.iter().flatten(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tracing_test::traced_test;

    use super::*;
    use crate::builder::FormatterBuilder;
    use crate::formatter::OutputFormatter;
    use crate::media::MediaTypeCollection;
    use crate::model::ModelType;

    struct Silent {
        media_types: MediaTypeCollection,
    }

    #[async_trait]
    impl OutputFormatter for Silent {
        fn supported_media_types(&self) -> &MediaTypeCollection {
            &self.media_types
        }

        async fn write_response_body(
            &self,
            _ctx: &mut OutputFormatterWriteContext<'_>,
        ) -> Result<(), FormatterError> {
            Ok(())
        }
    }

    fn pipeline() -> FormatterPipeline {
        let mut builder = FormatterBuilder::new();
        builder.configure_formatters(|options| {
            options.output_formatters_mut().push(Silent {
                media_types: ["text/csv"].into_iter().collect(),
            });
        });
        FormatterPipeline::new(builder.build())
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_selected_content_type() {
        let pipeline = pipeline();
        let value = 1_u8;
        let mut sink = Vec::new();
        let mut ctx =
            OutputFormatterWriteContext::new(Some(ModelType::of::<u8>()), Some(&value), &mut sink);

        let selected = pipeline
            .write_response(&ResponseNegotiation::new(), &mut ctx)
            .await
            .expect("written");
        assert_eq!(selected.as_ref().map(MediaType::as_str), Some("text/csv"));
        assert!(logs_contain("output formatter selected"));
        assert!(logs_contain("text/csv"));
    }

    #[tokio::test]
    #[traced_test]
    async fn nothing_is_logged_when_no_formatter_accepts() {
        let pipeline = pipeline();
        let value = 1_u8;
        let mut sink = Vec::new();
        let mut ctx =
            OutputFormatterWriteContext::new(Some(ModelType::of::<u8>()), Some(&value), &mut sink);

        let err = pipeline
            .write_response(&ResponseNegotiation::new().with_accept(["application/json"]), &mut ctx)
            .await
            .expect_err("not acceptable");
        assert_eq!(err.status_hint(), 406);
        assert!(!logs_contain("output formatter selected"));
    }
}
