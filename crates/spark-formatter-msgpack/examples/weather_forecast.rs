//! 天气预报示例：启动期注册 MessagePack 格式化器，并模拟一次 `GET /weather_forecast?format=msgpack`。
//!
//! 运行：`RUST_LOG=debug cargo run -p spark-formatter-msgpack --example weather_forecast`

use std::error::Error;

use serde::{Deserialize, Serialize};
use spark_formatter_msgpack::{MessagePackBuilderExt, MessagePackCodec};
use spark_formatters::{
    CompatibilityVersion, FormatterBuilder, FormatterPipeline, InputFormatterContext, MediaType,
    ModelState, ModelType, OutputFormatterWriteContext, ResponseNegotiation,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WeatherForecast {
    day_offset: u32,
    temperature_c: i32,
    summary: Option<String>,
}

impl WeatherForecast {
    fn temperature_f(&self) -> i32 {
        32 + self.temperature_c * 9 / 5
    }
}

fn forecasts() -> Vec<WeatherForecast> {
    (1..=5_u32)
        .map(|day_offset| {
            let temperature_c = (day_offset as i32 * 17) % 75 - 20;
            WeatherForecast {
                day_offset,
                temperature_c,
                summary: Some(SUMMARIES[(day_offset as usize * 3) % SUMMARIES.len()].to_owned()),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    let mut builder = FormatterBuilder::new();
    builder
        .set_compatibility_version(CompatibilityVersion::V2_1)
        .add_msgpack_formatters_with(|options| {
            options.register_type::<Vec<WeatherForecast>>();
            options.register_type::<WeatherForecast>();
        });
    let pipeline = FormatterPipeline::new(builder.build());

    // GET /weather_forecast?format=msgpack
    let forecast = forecasts();
    let mut response = Vec::new();
    let mut ctx = OutputFormatterWriteContext::new(
        Some(ModelType::of::<Vec<WeatherForecast>>()),
        Some(&forecast),
        &mut response,
    );
    let content_type = pipeline
        .write_response(&ResponseNegotiation::new().with_format("msgpack"), &mut ctx)
        .await?;
    drop(ctx);
    tracing::info!(
        content_type = content_type.as_ref().map(MediaType::as_str),
        bytes = response.len(),
        "forecast encoded"
    );

    let decoded: Vec<WeatherForecast> = MessagePackCodec::default()
        .decode(&response)?
        .unwrap_or_default();
    for day in &decoded {
        println!(
            "+{}d {:>4}°C {:>4}°F {}",
            day.day_offset,
            day.temperature_c,
            day.temperature_f(),
            day.summary.as_deref().unwrap_or("-")
        );
    }

    // POST 一个被截断的请求体：错误进入模型状态，管线继续服务。
    let mut body: &[u8] = &response[..response.len() / 3];
    let mut state = ModelState::new();
    let mut ctx =
        InputFormatterContext::new("", ModelType::of::<Vec<WeatherForecast>>(), &mut body, &mut state)
            .with_content_type(Some(MediaType::new("application/msgpack")));
    let result = pipeline.read_request_body(&mut ctx).await?;
    drop(ctx);
    for (key, error) in state.iter() {
        println!("model error [{key:?}]: {}", error.message());
    }
    println!("binding failed: {}", result.has_error());

    Ok(())
}
