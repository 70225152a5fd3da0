use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolExecutor, ToolResult};
use crate::models::ToolFunction;

/// Stub weather lookup. Stands in for a real data source and never
/// contacts any external service.
pub struct WeatherTool;

/// Pure formatting: the city is inserted verbatim, with no validation.
pub fn get_weather(city: &str) -> String {
    format!("It's always sunny in {}!", city)
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    async fn execute(&self, arguments: &str) -> Result<ToolResult, Box<dyn std::error::Error>> {
        let args: Value = serde_json::from_str(arguments)?;
        let city = args["city"].as_str().ok_or("Missing city")?;

        Ok(ToolResult::Success(json!({
            "city": city,
            "report": get_weather(city),
        })))
    }

    fn definition(&self) -> ToolFunction {
        ToolFunction {
            name: "get_weather".to_string(),
            description: Some("Get weather for a given city".to_string()),
            parameters: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "The city to look up, e.g. Chicago"
                    }
                },
                "required": ["city"]
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_embeds_the_city_verbatim() {
        assert_eq!(get_weather("Chicago"), "It's always sunny in Chicago!");
        assert_eq!(
            get_weather("San Francisco, CA"),
            "It's always sunny in San Francisco, CA!"
        );
    }

    #[test]
    fn empty_city_is_degenerate_but_deterministic() {
        assert_eq!(get_weather(""), "It's always sunny in !");
    }

    #[test]
    fn repeated_calls_are_identical() {
        assert_eq!(get_weather("Oslo"), get_weather("Oslo"));
    }

    #[tokio::test]
    async fn executor_reads_the_city_argument() {
        let result = WeatherTool
            .execute(r#"{"city": "Chicago"}"#)
            .await
            .unwrap();
        match result {
            ToolResult::Success(value) => {
                assert_eq!(value["report"], "It's always sunny in Chicago!");
            }
            ToolResult::Error(e) => panic!("unexpected error: {}", e),
        }
    }

    #[tokio::test]
    async fn missing_city_is_an_argument_error() {
        assert!(WeatherTool.execute("{}").await.is_err());
    }
}
