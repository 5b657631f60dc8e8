pub mod output;
pub mod send_message;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::bus::OutboundSink;
use output::BoundedOutput;

/// Outcome code returned by every tool call alongside its output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    InvalidArgument,
    NoMemory,
    Dispatch(DispatchCode),
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

/// Why the outbound queue refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchCode {
    QueueFull,
    QueueClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

pub fn builtin_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: "send_message".to_string(),
            description: "Send a text message to a chat on one of the connected channels"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "channel": {
                        "type": "string",
                        "enum": ["telegram", "websocket", "feishu"],
                        "description": "The channel to deliver the message on"
                    },
                    "chat_id": {
                        "type": "string",
                        "description": "Destination chat identifier within the channel"
                    },
                    "text": {
                        "type": "string",
                        "description": "The message body"
                    }
                },
                "required": ["channel", "chat_id", "text"]
            }),
        },
    }]
}

/// Run a built-in tool by name on its raw JSON arguments.
pub fn execute_builtin_tool(
    tool_name: &str,
    input: &str,
    output: &mut BoundedOutput,
    sink: &dyn OutboundSink,
) -> Status {
    match tool_name {
        "send_message" => {
            let status = send_message::execute(input, output, sink);
            info!("Tool '{}' finished: {:?}", tool_name, status);
            status
        }
        _ => {
            warn!("Unknown built-in tool: {}", tool_name);
            output.set_line(format_args!("Error: unknown tool '{}'", tool_name));
            Status::InvalidArgument
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageBus;

    #[test]
    fn test_definitions_list_send_message() {
        let defs = builtin_tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].function.name, "send_message");
        assert_eq!(
            defs[0].function.parameters["required"],
            json!(["channel", "chat_id", "text"])
        );

        let wire = serde_json::to_value(&defs[0]).unwrap();
        assert_eq!(wire["type"], "function");
    }

    #[tokio::test]
    async fn test_execute_routes_send_message() {
        let (bus, mut rx) = MessageBus::new(2);
        let mut out = BoundedOutput::with_capacity(128);
        let status = execute_builtin_tool(
            "send_message",
            r#"{"channel":"feishu","chat_id":"oc_9","text":"ping"}"#,
            &mut out,
            &bus,
        );

        assert!(status.is_ok());
        assert_eq!(out.as_str(), "OK: message sent to feishu chat_id=oc_9 (4 bytes)");
        assert_eq!(rx.recv().await.unwrap().content, "ping");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (bus, _rx) = MessageBus::new(1);
        let mut out = BoundedOutput::with_capacity(128);
        let status = execute_builtin_tool("read_file", "{}", &mut out, &bus);

        assert_eq!(status, Status::InvalidArgument);
        assert_eq!(out.as_str(), "Error: unknown tool 'read_file'");
    }
}
