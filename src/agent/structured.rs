use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::models::JsonSchema;

use super::agent::{AgentError, ReactAgent, Result, RunConfig};

/// Trait for types that describe their own response schema.
pub trait SchemaProvider {
    fn schema() -> JsonSchema;
}

/// Extension trait for invoking an agent and getting a typed response.
///
/// The agent must have been built with `response_format::<T>()` (or an
/// equivalent schema); otherwise there is no structured response to decode.
#[async_trait]
pub trait StructuredOutput {
    async fn invoke_typed<T>(&self, input: &str, config: &RunConfig) -> Result<T>
    where
        T: DeserializeOwned + SchemaProvider + Send;
}

#[async_trait]
impl StructuredOutput for ReactAgent {
    async fn invoke_typed<T>(&self, input: &str, config: &RunConfig) -> Result<T>
    where
        T: DeserializeOwned + SchemaProvider + Send,
    {
        let reply = self.invoke(input, config).await?;
        reply.structured_as()
    }
}

impl AgentError {
    pub fn is_structured_decode(&self) -> bool {
        matches!(self, AgentError::StructuredDecode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentReply;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct WeatherReport {
        conditions: String,
    }

    impl SchemaProvider for WeatherReport {
        fn schema() -> JsonSchema {
            JsonSchema {
                name: "WeatherReport".to_string(),
                description: None,
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

    #[test]
    fn reply_decodes_into_the_schema_type() {
        let reply = AgentReply {
            messages: Vec::new(),
            final_text: "It's always sunny in Chicago!".to_string(),
            structured_response: Some(json!({"conditions": "It's always sunny in Chicago!"})),
        };

        let report: WeatherReport = reply.structured_as().unwrap();
        assert_eq!(report.conditions, "It's always sunny in Chicago!");
    }

    #[test]
    fn missing_structured_response_is_a_decode_error() {
        let reply = AgentReply {
            messages: Vec::new(),
            final_text: "plain text".to_string(),
            structured_response: None,
        };

        let err = reply.structured_as::<WeatherReport>().unwrap_err();
        assert!(err.is_structured_decode());
    }

    #[test]
    fn mismatched_shape_is_a_decode_error() {
        let reply = AgentReply {
            messages: Vec::new(),
            final_text: String::new(),
            structured_response: Some(json!({"temperature": 21})),
        };

        assert!(reply.structured_as::<WeatherReport>().is_err());
    }
}
