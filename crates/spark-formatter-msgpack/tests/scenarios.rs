//! 通过 `FormatterPipeline` 驱动的端到端场景。
//!
//! # 教案式说明
//! - **Why**：格式化器单独正确不代表接入宿主后正确，协商顺序、模型错误与响应类型需要一起验证；
//! - **How**：以 `FormatterBuilder` 注册 MessagePack 扩展并登记业务类型，再用内存缓冲模拟请求与响应体；
//! - **What**：覆盖整数回显、空请求体、格式错误后的恢复、结构体响应、`?format=` 令牌，
//!   以及两种空值约定（`nil` 与空响应体）写出后再读回的结果。

use serde::{Deserialize, Serialize};
use spark_formatter_msgpack::{MessagePackBuilderExt, MessagePackCodec, MessagePackResult};
use spark_formatters::{
    ActionContext, ActionResult, FormatterBuilder, FormatterError, FormatterPipeline,
    InputFormatterContext, InputFormatterResult, MediaType, ModelState, ModelType,
    OutputFormatterWriteContext, ResponseHead, ResponseNegotiation,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SimpleModel {
    id: i32,
    name: String,
}

fn pipeline() -> FormatterPipeline {
    let mut builder = FormatterBuilder::new();
    builder.add_msgpack_formatters_with(|options| {
        options
            .register_type::<SimpleModel>()
            .register_type::<Option<SimpleModel>>();
    });
    FormatterPipeline::new(builder.build())
}

/// 模拟一次 POST：返回绑定结果与收集到的模型错误。
async fn post(
    pipeline: &FormatterPipeline,
    mut body: &[u8],
    model_type: ModelType,
) -> (Result<InputFormatterResult, FormatterError>, ModelState) {
    let mut state = ModelState::new();
    let mut ctx = InputFormatterContext::new("", model_type, &mut body, &mut state)
        .with_content_type(Some(MediaType::new("application/x-msgpack")));
    let result = pipeline.read_request_body(&mut ctx).await;
    drop(ctx);
    (result, state)
}

/// 模拟响应写出：返回协商出的内容类型与响应体字节。
async fn respond<T>(
    pipeline: &FormatterPipeline,
    negotiation: &ResponseNegotiation,
    value: &T,
) -> (Option<MediaType>, Vec<u8>)
where
    T: Send + Sync + 'static,
{
    let mut sink = Vec::new();
    let mut ctx = OutputFormatterWriteContext::new(Some(ModelType::of::<T>()), Some(value), &mut sink);
    let selected = pipeline
        .write_response(negotiation, &mut ctx)
        .await
        .expect("response written");
    drop(ctx);
    (selected, sink)
}

#[tokio::test]
async fn integer_round_trips_through_post_and_response() {
    let pipeline = pipeline();
    let codec = MessagePackCodec::default();
    let request = codec.encode(&10_i32).expect("encode");

    let (result, state) = post(&pipeline, &request, ModelType::of::<i32>()).await;
    assert!(state.is_valid());
    let model = result
        .expect("read")
        .into_model()
        .and_then(|model| model.downcast::<i32>().ok())
        .flatten()
        .expect("integer model");

    let negotiation = ResponseNegotiation::new().with_accept(["application/x-msgpack"]);
    let (content_type, body) = respond(&pipeline, &negotiation, &model).await;
    assert_eq!(
        content_type.as_ref().map(MediaType::as_str),
        Some("application/x-msgpack")
    );
    assert_eq!(codec.decode::<i32>(&body).expect("decode"), Some(10));
}

#[tokio::test]
async fn empty_body_for_optional_model_leaves_it_unset() {
    let pipeline = pipeline();
    let (result, state) = post(&pipeline, &[], ModelType::of::<Option<SimpleModel>>()).await;
    let result = result.expect("read");
    assert!(matches!(result, InputFormatterResult::NoValue));
    assert!(!result.is_model_set());
    assert!(state.is_valid());
}

#[tokio::test]
async fn malformed_body_is_reported_and_pipeline_recovers() {
    let pipeline = pipeline();
    let codec = MessagePackCodec::default();
    let valid = codec
        .encode(&SimpleModel {
            id: 7,
            name: "seven".into(),
        })
        .expect("encode");

    let mut scrambled = valid.to_vec();
    scrambled.reverse();
    let truncated = &valid[..valid.len() / 2];

    for bad in [scrambled.as_slice(), truncated] {
        let (result, state) = post(&pipeline, bad, ModelType::of::<SimpleModel>()).await;
        let result = result.expect("malformed input never escapes as an error");
        assert!(result.has_error());
        assert!(!state.is_valid());
        assert_eq!(state.error_count(), 1);
        assert_eq!(state.errors("").len(), 1);
    }

    let (result, state) = post(&pipeline, &valid, ModelType::of::<SimpleModel>()).await;
    assert!(state.is_valid());
    let model = result.expect("read").into_model().expect("model");
    assert_eq!(
        model.downcast_ref::<SimpleModel>(),
        Some(&SimpleModel {
            id: 7,
            name: "seven".into()
        })
    );
}

#[tokio::test]
async fn struct_response_uses_primary_media_type() {
    let pipeline = pipeline();
    let value = SimpleModel {
        id: 1,
        name: "forecast".into(),
    };

    let (content_type, body) = respond(&pipeline, &ResponseNegotiation::new(), &value).await;
    assert_eq!(
        content_type.as_ref().map(MediaType::as_str),
        Some("application/x-msgpack")
    );
    let decoded = MessagePackCodec::default()
        .decode::<SimpleModel>(&body)
        .expect("decode");
    assert_eq!(decoded, Some(value));
}

#[tokio::test]
async fn format_token_selects_msgpack() {
    let pipeline = pipeline();
    let value = String::from("sunny");
    let negotiation = ResponseNegotiation::new().with_format("msgpack");
    let (content_type, body) = respond(&pipeline, &negotiation, &value).await;
    assert_eq!(
        content_type.as_ref().map(MediaType::as_str),
        Some("application/x-msgpack")
    );
    assert_eq!(
        MessagePackCodec::default()
            .decode::<String>(&body)
            .expect("decode")
            .as_deref(),
        Some("sunny")
    );
}

#[tokio::test]
async fn unregistered_type_is_unsupported() {
    #[derive(Serialize, Deserialize)]
    struct Secret {
        token: String,
    }

    let pipeline = pipeline();
    let (result, state) = post(&pipeline, &[0x80], ModelType::of::<Secret>()).await;
    let err = result.expect_err("no formatter accepts");
    assert_eq!(err.status_hint(), 415);
    assert!(state.is_valid());

    let secret = Secret {
        token: "hidden".into(),
    };
    let mut sink = Vec::new();
    let mut ctx =
        OutputFormatterWriteContext::new(Some(ModelType::of::<Secret>()), Some(&secret), &mut sink);
    let err = pipeline
        .write_response(&ResponseNegotiation::new(), &mut ctx)
        .await
        .expect_err("not acceptable");
    assert_eq!(err.status_hint(), 406);
}

#[tokio::test]
async fn null_written_by_formatter_reads_back_as_none() {
    let pipeline = pipeline();
    let value: Option<String> = None;
    let (content_type, body) = respond(&pipeline, &ResponseNegotiation::new(), &value).await;
    assert_eq!(
        content_type.as_ref().map(MediaType::as_str),
        Some("application/x-msgpack")
    );
    assert_eq!(body, [spark_formatter_msgpack::NIL]);

    let (result, state) = post(&pipeline, &body, ModelType::of::<Option<String>>()).await;
    assert!(state.is_valid());
    let result = result.expect("read");
    assert!(result.is_model_set());
    let decoded = result
        .into_model()
        .and_then(|model| model.downcast::<Option<String>>().ok());
    assert_eq!(decoded, Some(Some(None)));
}

#[tokio::test]
async fn empty_action_result_reads_back_as_no_value() {
    let pipeline = pipeline();
    let result = MessagePackResult::<SimpleModel>::new(None);
    let mut head = ResponseHead::new();
    let mut body = Vec::new();
    let mut ctx = ActionContext::new(&mut head, &mut body);
    result.execute_result(&mut ctx).await.expect("executed");
    drop(ctx);
    assert!(body.is_empty());

    let (read, state) = post(&pipeline, &body, ModelType::of::<Option<SimpleModel>>()).await;
    assert!(matches!(read.expect("read"), InputFormatterResult::NoValue));
    assert!(state.is_valid());
}
