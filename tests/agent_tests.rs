mod common;

use serde::Deserialize;
use serde_json::json;

use agentry::agent::{
    AgentError, ReactAgent, RunConfig, SchemaProvider, StructuredOutput, WeatherTool,
};
use agentry::checkpoint::{Checkpointer, MemorySaver};
use agentry::{JsonSchema, Role};

use common::{tool_call_response, text_response, ScriptedProvider};

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

#[tokio::test]
async fn react_loop_runs_tool_then_answers() {
    let provider = ScriptedProvider::new(vec![
        tool_call_response("r1", "call_1", "get_weather", r#"{"city": "Chicago"}"#),
        text_response("r2", "It's always sunny in Chicago!"),
    ]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .tool(WeatherTool)
        .build()
        .unwrap();

    let reply = agent
        .invoke("what is the weather in Chicago", &RunConfig::new())
        .await
        .unwrap();

    assert_eq!(reply.final_text, "It's always sunny in Chicago!");
    assert!(reply.structured_response.is_none());

    // user, assistant tool call, tool result, final assistant answer
    assert_eq!(reply.messages.len(), 4);
    assert_eq!(reply.messages[2].role, Role::Tool);
    assert_eq!(reply.messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert!(reply.messages[2]
        .text()
        .unwrap()
        .contains("It's always sunny in Chicago!"));

    // Second round trip must replay the tool exchange to the model.
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].tools.is_some());
    assert_eq!(requests[1].messages.len(), 3);
}

#[tokio::test]
async fn thread_transcripts_accumulate_in_the_checkpointer() {
    let saver = MemorySaver::new();
    let provider = ScriptedProvider::new(vec![
        text_response("r1", "Noted."),
        text_response("r2", "You asked about Chicago."),
    ]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .checkpointer(saver.clone())
        .build()
        .unwrap();

    let config = RunConfig::thread("1");
    agent
        .invoke("what is the weather in Chicago", &config)
        .await
        .unwrap();
    let reply = agent.invoke("what did I ask about?", &config).await.unwrap();

    // user + assistant from the first turn, then the second pair.
    assert_eq!(reply.messages.len(), 4);
    let stored = saver.get("1").await.unwrap().unwrap();
    assert_eq!(stored.len(), 4);

    // The second request carried the restored history.
    let requests = requests.lock().unwrap();
    assert_eq!(requests[1].messages.len(), 3);
    assert!(requests[1].messages[0]
        .text()
        .unwrap()
        .contains("Chicago"));
}

#[tokio::test]
async fn separate_threads_do_not_share_history() {
    let saver = MemorySaver::new();
    let provider = ScriptedProvider::new(vec![
        text_response("r1", "a"),
        text_response("r2", "b"),
    ]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .checkpointer(saver.clone())
        .build()
        .unwrap();

    agent
        .invoke("first thread", &RunConfig::thread("1"))
        .await
        .unwrap();
    agent
        .invoke("second thread", &RunConfig::thread("2"))
        .await
        .unwrap();

    assert_eq!(saver.get("1").await.unwrap().unwrap().len(), 2);
    assert_eq!(saver.get("2").await.unwrap().unwrap().len(), 2);

    // Each invocation saw only its own user message.
    let requests = requests.lock().unwrap();
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[1].messages.len(), 1);
}

#[tokio::test]
async fn without_a_checkpointer_the_thread_id_is_ignored() {
    let provider = ScriptedProvider::new(vec![
        text_response("r1", "a"),
        text_response("r2", "b"),
    ]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .build()
        .unwrap();

    let config = RunConfig::thread("1");
    agent.invoke("one", &config).await.unwrap();
    agent.invoke("two", &config).await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests[1].messages.len(), 1);
}

#[tokio::test]
async fn system_prompt_leads_every_request() {
    let provider = ScriptedProvider::new(vec![text_response("r1", "hi")]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .system_prompt("You are terse.")
        .build()
        .unwrap();

    agent.invoke("hello", &RunConfig::new()).await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[0].messages[0].text(), Some("You are terse."));
}

#[tokio::test]
async fn unknown_tool_calls_fail_the_invocation() {
    let provider = ScriptedProvider::new(vec![tool_call_response(
        "r1",
        "call_1",
        "get_stock_price",
        r#"{"ticker": "ACME"}"#,
    )]);

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .tool(WeatherTool)
        .build()
        .unwrap();

    let err = agent
        .invoke("what is ACME trading at?", &RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Tool(_)));
}

#[tokio::test]
async fn runaway_tool_loops_hit_the_iteration_cap() {
    let provider = ScriptedProvider::new(vec![
        tool_call_response("r1", "c1", "get_weather", r#"{"city": "Chicago"}"#),
        tool_call_response("r2", "c2", "get_weather", r#"{"city": "Chicago"}"#),
        tool_call_response("r3", "c3", "get_weather", r#"{"city": "Chicago"}"#),
    ]);

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .tool(WeatherTool)
        .max_iterations(2)
        .build()
        .unwrap();

    let err = agent
        .invoke("what is the weather in Chicago", &RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Config(_)));
}

#[tokio::test]
async fn structured_response_is_coerced_after_the_loop() {
    let saver = MemorySaver::new();
    let provider = ScriptedProvider::new(vec![
        tool_call_response("r1", "call_1", "get_weather", r#"{"city": "Chicago"}"#),
        text_response("r2", "It's always sunny in Chicago!"),
        text_response("r3", r#"{"conditions": "It's always sunny in Chicago!"}"#),
    ]);
    let requests = provider.request_log();

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .tool(WeatherTool)
        .checkpointer(saver.clone())
        .response_format::<WeatherReport>()
        .build()
        .unwrap();

    let reply = agent
        .invoke("what is the weather in Chicago", &RunConfig::thread("1"))
        .await
        .unwrap();

    let structured = reply.structured_response.as_ref().unwrap();
    assert_eq!(structured["conditions"], "It's always sunny in Chicago!");

    let report: WeatherReport = reply.structured_as().unwrap();
    assert_eq!(report.conditions, "It's always sunny in Chicago!");

    // The coercion exchange stays out of the persisted thread.
    assert_eq!(saver.get("1").await.unwrap().unwrap().len(), 4);

    // The coercion request carried the schema instruction, without tools.
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    let coercion = &requests[2];
    assert!(coercion.tools.is_none());
    assert!(coercion
        .messages
        .last()
        .unwrap()
        .text()
        .unwrap()
        .contains("JSON object"));
}

#[tokio::test]
async fn invoke_typed_decodes_the_schema_type() {
    let provider = ScriptedProvider::new(vec![
        text_response("r1", "It's always sunny in Chicago!"),
        text_response("r2", r#"{"conditions": "It's always sunny in Chicago!"}"#),
    ]);

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .response_format::<WeatherReport>()
        .build()
        .unwrap();

    let report: WeatherReport = agent
        .invoke_typed("what is the weather in Chicago", &RunConfig::new())
        .await
        .unwrap();
    assert_eq!(report.conditions, "It's always sunny in Chicago!");
}

#[tokio::test]
async fn unparseable_structured_reply_is_an_error() {
    let provider = ScriptedProvider::new(vec![
        text_response("r1", "It's always sunny in Chicago!"),
        text_response("r2", "sorry, I cannot do JSON today"),
    ]);

    let agent = ReactAgent::builder()
        .provider(provider)
        .model("scripted")
        .response_format::<WeatherReport>()
        .build()
        .unwrap();

    let err = agent
        .invoke("what is the weather in Chicago", &RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::StructuredDecode(_)));
}
