//! The tool contract shared by the assistant adapter's four handlers (§4.11).

use async_trait::async_trait;
use serde_json::Value;

/// A callable exposed to an AI-assistant tool protocol: a name, a JSON argument
/// schema, and an async call. Connector crates implement this for external
/// services (arXiv, Wikipedia); the assistant adapter implements it for the
/// four search/graph handlers.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool name, as advertised to the calling assistant.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does and when to call it.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's expected arguments.
    fn args_schema(&self) -> Value;

    /// Invoke the tool with already-parsed JSON arguments.
    async fn call(&self, args: Value) -> crate::error::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "returns its input unchanged"
        }
        fn args_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn call(&self, args: Value) -> crate::error::Result<Value> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn tool_can_be_invoked_through_the_trait_object() {
        let tool: Box<dyn Tool> = Box::new(EchoTool);
        let out = tool.call(serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(out, serde_json::json!({"x": 1}));
        assert_eq!(tool.name(), "echo");
    }
}
