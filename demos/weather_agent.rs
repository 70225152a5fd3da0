use agentry::agent::{ReactAgent, RunConfig, WeatherTool};
use agentry::checkpoint::MemorySaver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let agent = ReactAgent::builder()
        .model_spec("anthropic:claude-3-7-sonnet-latest")
        .system_prompt("You are a weather assistant. Use the get_weather tool for lookups.")
        .temperature(0.0)
        .tool(WeatherTool)
        .checkpointer(MemorySaver::new())
        .build()?;

    let config = RunConfig::thread("demo");

    println!("User: what is the weather in Chicago");
    let reply = agent.invoke("what is the weather in Chicago", &config).await?;
    println!("Assistant: {}\n", reply.final_text);

    // Same thread, so the agent sees the earlier exchange.
    println!("User: and what did I just ask you about?");
    let reply = agent
        .invoke("and what did I just ask you about?", &config)
        .await?;
    println!("Assistant: {}", reply.final_text);

    Ok(())
}
