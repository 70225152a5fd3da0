use serde::Deserialize;
use serde_json::json;

use agentry::agent::{ReactAgent, RunConfig, SchemaProvider, StructuredOutput, WeatherTool};
use agentry::checkpoint::MemorySaver;
use agentry::JsonSchema;

#[derive(Debug, Deserialize)]
struct WeatherReport {
    conditions: String,
}

impl SchemaProvider for WeatherReport {
    fn schema() -> JsonSchema {
        JsonSchema {
            name: "WeatherReport".to_string(),
            description: Some("Weather conditions for the asked-about city".to_string()),
            schema: json!({
                "type": "object",
                "properties": {
                    "conditions": { "type": "string" }
                },
                "required": ["conditions"]
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let agent = ReactAgent::builder()
        .model_spec("anthropic:claude-3-7-sonnet-latest")
        .temperature(0.0)
        .tool(WeatherTool)
        .checkpointer(MemorySaver::new())
        .response_format::<WeatherReport>()
        .build()?;

    let config = RunConfig::thread("1");
    let report: WeatherReport = agent
        .invoke_typed("what is the weather in Chicago", &config)
        .await?;

    println!("response: {:?}", report);

    Ok(())
}
