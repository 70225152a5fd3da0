pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use std::sync::Arc;

use crate::error::{AiError, Result};
use crate::traits::CompletionProvider;

/// Splits a `provider:model` spec into its two halves.
///
/// A spec without a provider prefix is rejected so that a bare model name
/// never silently picks a provider.
pub fn parse_model_spec(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once(':') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(AiError::ConfigurationError {
            message: format!(
                "model spec '{}' is not of the form 'provider:model'",
                spec
            ),
        }),
    }
}

/// Resolves a `provider:model` spec (e.g. `anthropic:claude-3-7-sonnet-latest`)
/// into a provider client and the model name to request. API keys come from
/// the environment.
pub fn init_chat_model(spec: &str) -> Result<(Arc<dyn CompletionProvider>, String)> {
    let (provider, model) = parse_model_spec(spec)?;

    let client: Arc<dyn CompletionProvider> = match provider {
        "anthropic" => Arc::new(AnthropicProvider::from_env()?),
        "openai" => Arc::new(OpenAIProvider::from_env()?),
        other => {
            return Err(AiError::ConfigurationError {
                message: format!("unknown provider '{}'", other),
            })
        }
    };

    Ok((client, model.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_spec_splits_on_first_colon() {
        let (provider, model) = parse_model_spec("anthropic:claude-3-7-sonnet-latest").unwrap();
        assert_eq!(provider, "anthropic");
        assert_eq!(model, "claude-3-7-sonnet-latest");
    }

    #[test]
    fn bare_model_name_is_rejected() {
        assert!(parse_model_spec("gpt-4o").is_err());
        assert!(parse_model_spec(":gpt-4o").is_err());
        assert!(parse_model_spec("openai:").is_err());
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = init_chat_model("cohere:command-r").unwrap_err();
        assert!(matches!(err, AiError::ConfigurationError { .. }));
    }
}
