pub mod base;
pub mod weather;

pub use base::{FunctionTool, ToolExecutor, ToolRegistry, ToolResult};
pub use weather::{get_weather, WeatherTool};
