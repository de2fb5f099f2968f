//! Registration record: the three host hooks over one shared state.
use serde_json::{Value, json};
use std::sync::Arc;

use crate::command::{self, COMMAND_NAME, CommandOutcome};
use crate::instruction::InstructionStore;
use crate::notify::AnyNotifier;
use crate::protocol::{CommandInput, Message, TransformInput};
use crate::synthesis;
use crate::toggle::Toggle;

/// Value the host adapter raises to stop its default command pipeline.
pub const COMMAND_HANDLED_SENTINEL: &str = "__AA_COMMAND_HANDLED__";

pub const COMMAND_DESCRIPTION: &str =
    "Manage user instruction (display, update, restore, or toggle with -o/on/off)";

/// Everything the hooks share. Owned by the plugin and lent out per hook call.
#[derive(Debug)]
pub struct PluginState {
    pub store: InstructionStore,
    pub toggle: Toggle,
}

impl PluginState {
    pub fn new(store: InstructionStore, toggle: Toggle) -> Self {
        Self { store, toggle }
    }
}

pub struct Plugin {
    state: PluginState,
    notifier: Arc<dyn AnyNotifier>,
}

impl Plugin {
    pub fn new(state: PluginState, notifier: Arc<dyn AnyNotifier>) -> Self {
        Self { state, notifier }
    }

    pub fn state(&self) -> &PluginState {
        &self.state
    }

    /// `config` hook: register the `/aa` command, keeping any others.
    pub fn configure(&self, config: &mut Value) {
        let Some(root) = config.as_object_mut() else {
            tracing::warn!("hook: config is not an object, leaving it alone");
            return;
        };
        let commands = root.entry("command").or_insert_with(|| json!({}));
        if !commands.is_object() {
            *commands = json!({});
        }
        if let Some(commands) = commands.as_object_mut() {
            commands.insert(
                COMMAND_NAME.to_string(),
                json!({ "template": "", "description": COMMAND_DESCRIPTION }),
            );
        }
        tracing::debug!("hook: registered /{COMMAND_NAME}");
    }

    /// `command.execute.before` hook.
    pub async fn command_execute_before(&mut self, input: &CommandInput) -> CommandOutcome {
        command::execute(&mut self.state, self.notifier.as_ref(), input).await
    }

    /// `experimental.chat.messages.transform` hook.
    pub fn transform_messages(&mut self, input: &TransformInput, messages: &mut Vec<Message>) {
        if !self.state.toggle.get() {
            tracing::debug!("hook: plugin disabled, skipping tool injection");
            return;
        }
        if synthesis::find_trigger(messages).is_none() {
            tracing::debug!(message_count = messages.len(), "hook: no user message to answer");
            return;
        }

        tracing::debug!(message_count = messages.len(), "hook: processing messages.transform");
        let instruction = self.state.store.load();
        let injected = synthesis::inject(
            messages,
            input.model.as_ref(),
            &instruction,
            synthesis::now_ms(),
        );
        if let Some(injection) = injected {
            tracing::debug!(
                kind = ?injection.target,
                message_id = %injection.message_id,
                call_id = %injection.call_id,
                "hook: instruction injected"
            );
        }
    }
}
