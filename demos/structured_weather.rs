use serde::Deserialize;
use serde_json::json;

use agentry::agent::{ReactAgent, RunConfig, SchemaProvider, WeatherTool};
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

    let reply = agent
        .invoke("what is the weather in Chicago", &RunConfig::thread("1"))
        .await?;

    println!("final text: {}", reply.final_text);
    if let Some(structured) = &reply.structured_response {
        println!("structured: {}", structured);
    }

    let report: WeatherReport = reply.structured_as()?;
    println!("conditions: {}", report.conditions);

    Ok(())
}
