use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ToolError;

pub const SERVER_NAME: &str = "geocalc-mcp-math";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OperandsRequest {
    #[schemars(description = "left hand side operand")]
    pub a: i64,
    #[schemars(description = "right hand side operand")]
    pub b: i64,
}

fn render(value: impl std::fmt::Display) -> String {
    format!("Result: {}", value)
}

fn overflow(op: &str, a: i64, b: i64) -> ToolError {
    ToolError::InvalidArgument(format!("{op}({a}, {b}) overflows a 64-bit integer"))
}

pub fn add(a: i64, b: i64) -> crate::error::Result<String> {
    a.checked_add(b).map(render).ok_or_else(|| overflow("add", a, b))
}

pub fn subtract(a: i64, b: i64) -> crate::error::Result<String> {
    a.checked_sub(b).map(render).ok_or_else(|| overflow("subtract", a, b))
}

pub fn multiply(a: i64, b: i64) -> crate::error::Result<String> {
    a.checked_mul(b).map(render).ok_or_else(|| overflow("multiply", a, b))
}

/// Real division, even for integer operands: `divide(7, 2)` is `"Result: 3.5"`
/// and `divide(4, 2)` is `"Result: 2.0"`.
pub fn divide(a: i64, b: i64) -> crate::error::Result<String> {
    if b == 0 {
        return Err(ToolError::InvalidArgument("Cannot divide by zero.".to_string()));
    }
    // Debug keeps the fractional part on whole quotients
    Ok(format!("Result: {:?}", a as f64 / b as f64))
}

#[derive(Debug, Clone)]
pub struct MathServer {
    pub(crate) tool_router: ToolRouter<Self>,
}

impl Default for MathServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl MathServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Add two numbers")]
    pub fn add(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<String, String> {
        tracing::debug!(a, b, "add");
        self::add(a, b).map_err(|e| e.to_string())
    }

    #[tool(description = "Subtract two numbers")]
    pub fn subtract(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<String, String> {
        tracing::debug!(a, b, "subtract");
        self::subtract(a, b).map_err(|e| e.to_string())
    }

    #[tool(description = "Multiply two numbers")]
    pub fn multiply(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<String, String> {
        tracing::debug!(a, b, "multiply");
        self::multiply(a, b).map_err(|e| e.to_string())
    }

    #[tool(description = "Divide two numbers")]
    pub fn divide(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<String, String> {
        tracing::debug!(a, b, "divide");
        self::divide(a, b).map_err(|e| {
            tracing::warn!(a, b, "rejected division: {}", e);
            e.to_string()
        })
    }
}

#[tool_handler]
impl ServerHandler for MathServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Simple math operations server: add, subtract, multiply and divide two integers."
                    .into(),
            ),
            ..Default::default()
        }
    }
}
