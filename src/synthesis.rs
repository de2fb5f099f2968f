//! Fabricates the `user_instructions` tool record that carries the standing
//! instruction into every model call.
//!
//! Two shapes exist. Most models get a synthetic assistant message that answers
//! the latest user message with one completed tool call. Some model families
//! handle a trailing assistant message poorly; for those the tool part is
//! appended directly onto the user message when it is the last one.
use serde_json::{Map, Value, json};

use crate::instruction::wrap;
use crate::protocol::{
    Message, MessageInfo, ModelRef, Part, Role, ToolKind, ToolPart, ToolState, ToolStatus, ToolTime,
};

pub const TOOL_NAME: &str = "user_instructions";
pub const ID_PREFIX: &str = "usin";

const INLINE_MODEL_MARKERS: &[&str] = &["deepseek", "kimi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionTarget {
    /// Append the tool part to the triggering user message.
    InlineAppend,
    /// Push a new assistant message holding the tool part.
    SyntheticMessage,
}

/// Where an injection landed. Handy for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub target: InjectionTarget,
    pub message_id: String,
    pub call_id: String,
}

/// Pick the injection shape from provider and model ids (case-insensitive substring match).
pub fn classify(provider_id: Option<&str>, model_id: Option<&str>) -> InjectionTarget {
    let matches = |id: Option<&str>| {
        id.map(|s| s.to_lowercase())
            .is_some_and(|s| INLINE_MODEL_MARKERS.iter().any(|m| s.contains(*m)))
    };
    if matches(provider_id) || matches(model_id) {
        InjectionTarget::InlineAppend
    } else {
        InjectionTarget::SyntheticMessage
    }
}

/// Index of the most recent user message.
pub fn find_trigger(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(|m| m.info.role == Role::User)
}

/// Fresh `usin_<uuid-v7>` token.
pub fn generate_id() -> String {
    format!("{ID_PREFIX}_{}", uuid::Uuid::now_v7().simple())
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn tool_part(session_id: &str, message_id: &str, token: &str, output: String, now: i64) -> Part {
    Part::Tool(ToolPart {
        id: format!("{token}-p"),
        session_id: session_id.to_string(),
        message_id: message_id.to_string(),
        kind: ToolKind::Tool,
        call_id: format!("{token}-c"),
        tool: TOOL_NAME.to_string(),
        state: ToolState {
            status: ToolStatus::Completed,
            input: json!({
                "metadata": {
                    "synthetic": true,
                    "who_can_use_this_tool": "user_only",
                },
            }),
            output,
            title: TOOL_NAME.to_string(),
            metadata: json!({ "remaining_usage_quota_for_this_tool": 0 }),
            time: ToolTime {
                start: now,
                end: now,
            },
            extra: Default::default(),
        },
        extra: Default::default(),
    })
}

/// Bookkeeping keys the host expects on an assistant message: empty usage, zero cost.
fn assistant_bookkeeping(now: i64) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("path".to_string(), json!({ "cwd": "/", "root": "/" }));
    extra.insert("time".to_string(), json!({ "created": now }));
    extra.insert("cost".to_string(), json!(0));
    extra.insert(
        "tokens".to_string(),
        json!({
            "input": 0,
            "output": 0,
            "reasoning": 0,
            "cache": { "read": 0, "write": 0 },
        }),
    );
    extra
}

fn synthetic_message(
    trigger: &MessageInfo,
    fallback_model: Option<&ModelRef>,
    token: &str,
    output: String,
    now: i64,
) -> Message {
    let model = trigger.model.as_ref().or(fallback_model);
    let info = MessageInfo {
        id: token.to_string(),
        session_id: trigger.session_id.clone(),
        role: Role::Assistant,
        agent: trigger.agent.clone(),
        model: None,
        parent_id: Some(trigger.id.clone()),
        model_id: model.and_then(|m| m.model_id.clone()),
        provider_id: model.and_then(|m| m.provider_id.clone()),
        mode: trigger.agent.clone(),
        extra: assistant_bookkeeping(now),
    };
    let parts = vec![tool_part(&trigger.session_id, token, token, output, now)];
    Message { info, parts }
}

/// Insert the instruction record for the latest user message.
/// `active_model` is the model the host is about to call, if it said so.
pub fn inject(
    messages: &mut Vec<Message>,
    active_model: Option<&ModelRef>,
    instruction: &str,
    now: i64,
) -> Option<Injection> {
    let trigger = find_trigger(messages)?;
    let token = generate_id();
    let call_id = format!("{token}-c");

    let model = active_model.or(messages[trigger].info.model.as_ref());
    let target = classify(
        model.and_then(|m| m.provider_id.as_deref()),
        model.and_then(|m| m.model_id.as_deref()),
    );
    let is_last = trigger + 1 == messages.len();

    if target == InjectionTarget::InlineAppend && is_last {
        let user = &mut messages[trigger];
        let part = tool_part(&user.info.session_id, &user.info.id, &token, wrap(instruction), now);
        user.parts.push(part);
        tracing::info!(
            message_id = %user.info.id,
            call_id = %call_id,
            "tool: appended user_instructions part inline"
        );
        return Some(Injection {
            target,
            message_id: user.info.id.clone(),
            call_id,
        });
    }

    let message = synthetic_message(
        &messages[trigger].info,
        active_model,
        &token,
        instruction.to_string(),
        now,
    );
    messages.push(message);
    tracing::info!(
        message_id = %token,
        call_id = %call_id,
        parent_id = %messages[trigger].info.id,
        total_messages = messages.len(),
        "tool: injected synthetic user_instructions message"
    );
    Some(Injection {
        target: InjectionTarget::SyntheticMessage,
        message_id: token,
        call_id,
    })
}
