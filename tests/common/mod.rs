#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use agentry::{
    AiError, Choice, CompletionProvider, CompletionRequest, CompletionResponse, FunctionCall,
    Message, Result, StreamChunk, ToolCall, ToolType, Usage,
};

pub fn simple_request(model: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages: vec![
            Message::system("You are a helpful assistant."),
            Message::user("Say 'Hello, World!' and nothing else."),
        ],
        temperature: Some(0.0),
        max_tokens: Some(20),
        stream: Some(false),
        top_p: None,
        stop: None,
        tools: None,
        tool_choice: None,
        response_format: None,
    }
}

pub fn text_response(id: &str, text: &str) -> CompletionResponse {
    CompletionResponse {
        id: id.to_string(),
        model: "scripted".to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(text),
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

pub fn tool_call_response(id: &str, call_id: &str, name: &str, arguments: &str) -> CompletionResponse {
    CompletionResponse {
        id: id.to_string(),
        model: "scripted".to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message {
                role: agentry::Role::Assistant,
                content: None,
                tool_calls: Some(vec![ToolCall {
                    id: call_id.to_string(),
                    r#type: ToolType::Function,
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                    },
                }]),
                tool_call_id: None,
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// Provider that replays a fixed sequence of responses and records every
/// request it was sent.
#[derive(Debug)]
pub struct ScriptedProvider {
    responses: Mutex<Vec<CompletionResponse>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(mut responses: Vec<CompletionResponse>) -> Self {
        // Popped from the back, so store in reverse.
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_log(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("response script poisoned")
            .pop()
            .ok_or(AiError::MalformedResponse {
                message: "scripted provider ran out of responses".to_string(),
            })
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>> {
        let _ = request;
        Err(AiError::InvalidRequest {
            message: "scripted provider does not stream".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &'static str {
        "scripted"
    }

    fn available_models(&self) -> Vec<&'static str> {
        vec!["scripted"]
    }
}
