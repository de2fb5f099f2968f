//! Host-side data model and the line-delimited JSON framing used to talk to the host.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Model selection as the host reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(rename = "modelID", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message header. Only the keys this crate reads or writes are typed; the
/// rest (timestamps, usage, paths, summaries) stay as the host sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "modelID", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "tool")]
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTime {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    pub status: ToolStatus,
    #[serde(default)]
    pub input: Value,
    pub output: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metadata: Value,
    pub time: ToolTime,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A finished tool invocation attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPart {
    pub id: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "messageID")]
    pub message_id: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    #[serde(rename = "callID")]
    pub call_id: String,
    pub tool: String,
    pub state: ToolState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parts we build are typed. Every part read from the host stays opaque, so
/// earlier history goes back exactly as it came in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Tool(ToolPart),
    Other(Value),
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Part::Other)
    }
}

impl Part {
    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            Part::Tool(tool) => Some(tool),
            Part::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub info: MessageInfo,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInput {
    pub command: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub messages: Vec<Message>,
}

/// One hook invocation sent by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook")]
pub enum Request {
    #[serde(rename = "config")]
    Config { config: Value },
    #[serde(rename = "command.execute.before")]
    CommandExecuteBefore { input: CommandInput },
    #[serde(rename = "experimental.chat.messages.transform")]
    MessagesTransform {
        #[serde(default)]
        input: TransformInput,
        output: TransformOutput,
    },
}

/// Reply to a single request, tagged with the same hook name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook")]
pub enum Response {
    #[serde(rename = "config")]
    Config { config: Value },
    #[serde(rename = "command.execute.before")]
    CommandExecuteBefore {
        handled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentinel: Option<String>,
    },
    #[serde(rename = "experimental.chat.messages.transform")]
    MessagesTransform { messages: Vec<Message> },
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug)]
pub enum ProtocolError {
    Disconnect,
    Io(std::io::Error),
    Decode(serde_json::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Disconnect => write!(f, "host closed the hook stream"),
            ProtocolError::Io(e) => write!(f, "io error: {e}"),
            ProtocolError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Serialize a frame as a single JSON line and flush it.
pub async fn write_frame_to_stream<W: AsyncWrite + Unpin, T: Serialize>(
    sink: &mut W,
    frame: &T,
) -> eyre::Result<()> {
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    sink.write_all(&line).await?;
    sink.flush().await?;
    Ok(())
}

/// Read the next non-blank line and decode it.
/// A decode failure consumes the offending line so the caller can keep reading.
pub async fn read_frame_from_stream<R, T>(
    stream: &mut R,
    line: &mut String,
) -> std::result::Result<T, ProtocolError>
where
    R: AsyncBufRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    loop {
        line.clear();
        let n = stream.read_line(line).await.map_err(ProtocolError::Io)?;
        if n == 0 {
            return Err(ProtocolError::Disconnect);
        }
        if line.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(line.trim_end()).map_err(ProtocolError::Decode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_keeps_unknown_fields_and_parts() {
        let raw = json!({
            "info": {
                "id": "msg_1",
                "sessionID": "ses_1",
                "role": "user",
                "agent": "build",
                "model": { "providerID": "openai", "modelID": "gpt-4.1" },
                "time": { "created": 10, "completed": 11 },
                "tokens": { "input": 5, "cache": { "read": 1 } },
                "cost": 0,
                "summary": { "diffs": [] }
            },
            "parts": [
                { "id": "prt_1", "type": "text", "text": "hello" },
                { "id": "prt_2", "type": "tool", "tool": "bash", "state": { "status": "running" } }
            ]
        });
        let message: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(message.info.role, Role::User);
        assert_eq!(message.info.agent.as_deref(), Some("build"));
        assert!(message.info.extra.contains_key("summary"));
        assert_eq!(message.info.model.as_ref().and_then(|m| m.model_id.as_deref()), Some("gpt-4.1"));
        assert!(message.parts.iter().all(|p| p.as_tool().is_none()));

        let back = serde_json::to_value(&message).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn host_tool_part_passes_through_verbatim() {
        let raw = json!({
            "id": "prt_1",
            "sessionID": "ses_1",
            "messageID": "msg_1",
            "type": "tool",
            "callID": "call_1",
            "tool": "bash",
            "state": {
                "status": "completed",
                "output": "done",
                "title": "ls",
                "time": { "start": 1, "end": 2, "compacted": 3 },
                "attachments": []
            }
        });
        let part: Part = serde_json::from_value(raw.clone()).unwrap();
        assert!(part.as_tool().is_none());
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);
    }

    #[test]
    fn built_tool_part_serializes_flat() {
        let part = Part::Tool(ToolPart {
            id: "prt_1".to_string(),
            session_id: "ses_1".to_string(),
            message_id: "msg_1".to_string(),
            kind: ToolKind::Tool,
            call_id: "call_1".to_string(),
            tool: "user_instructions".to_string(),
            state: ToolState {
                status: ToolStatus::Completed,
                input: json!({}),
                output: "done".to_string(),
                title: "user_instructions".to_string(),
                metadata: json!({}),
                time: ToolTime { start: 1, end: 2 },
                extra: Map::new(),
            },
            extra: Map::new(),
        });
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({
                "id": "prt_1",
                "sessionID": "ses_1",
                "messageID": "msg_1",
                "type": "tool",
                "callID": "call_1",
                "tool": "user_instructions",
                "state": {
                    "status": "completed",
                    "input": {},
                    "output": "done",
                    "title": "user_instructions",
                    "metadata": {},
                    "time": { "start": 1, "end": 2 }
                }
            })
        );
    }

    #[test]
    fn request_tags() {
        let line = r#"{"hook":"command.execute.before","input":{"command":"aa","sessionID":"ses_1","arguments":" on "}}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        match request {
            Request::CommandExecuteBefore { input } => {
                assert_eq!(input.command, "aa");
                assert_eq!(input.session_id, "ses_1");
                assert_eq!(input.arguments, " on ");
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let line = r#"{"hook":"experimental.chat.messages.transform","output":{"messages":[]}}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        assert!(matches!(
            request,
            Request::MessagesTransform { input, output } if input.model.is_none() && output.messages.is_empty()
        ));
    }

    #[test]
    fn handled_response_carries_sentinel_only_when_set() {
        let handled = Response::CommandExecuteBefore {
            handled: true,
            sentinel: Some("__AA_COMMAND_HANDLED__".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&handled).unwrap(),
            json!({ "hook": "command.execute.before", "handled": true, "sentinel": "__AA_COMMAND_HANDLED__" })
        );
        let passed = Response::CommandExecuteBefore {
            handled: false,
            sentinel: None,
        };
        assert_eq!(
            serde_json::to_value(&passed).unwrap(),
            json!({ "hook": "command.execute.before", "handled": false })
        );
    }

    #[tokio::test]
    async fn framing_skips_blank_lines_and_reports_eof() {
        let input = b"\n{\"hook\":\"config\",\"config\":{}}\n\nnot json\n".to_vec();
        let mut reader = tokio::io::BufReader::new(&input[..]);
        let mut line = String::new();

        let first: Request = read_frame_from_stream(&mut reader, &mut line).await.unwrap();
        assert_eq!(first, Request::Config { config: json!({}) });

        let second = read_frame_from_stream::<_, Request>(&mut reader, &mut line).await;
        assert!(matches!(second, Err(ProtocolError::Decode(_))));

        let third = read_frame_from_stream::<_, Request>(&mut reader, &mut line).await;
        assert!(matches!(third, Err(ProtocolError::Disconnect)));
    }

    #[tokio::test]
    async fn frames_are_newline_terminated() {
        let mut sink: Vec<u8> = Vec::new();
        write_frame_to_stream(&mut sink, &Response::Config { config: json!({ "a": 1 }) })
            .await
            .unwrap();
        assert_eq!(sink, b"{\"hook\":\"config\",\"config\":{\"a\":1}}\n");
    }
}
