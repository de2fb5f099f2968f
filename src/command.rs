//! The `/aa` slash-command: show, restore, toggle, or replace the instruction.
use eyre::Result;

use crate::instruction::{DEFAULT_INSTRUCTION, extract};
use crate::notify::AnyNotifier;
use crate::plugin::PluginState;
use crate::protocol::CommandInput;
use crate::toggle::status_label;

pub const COMMAND_NAME: &str = "aa";

/// What the host should do after the command hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command was ours and is fully handled; skip the default pipeline.
    Handled,
    /// Not our command; let the host carry on.
    NotMine,
}

/// Parsed `/aa` argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AaCommand {
    Show,
    Restore,
    Toggle,
    On,
    Off,
    Set(String),
}

impl AaCommand {
    pub fn parse(arguments: &str) -> Self {
        let args = arguments.trim();
        match args {
            "" => AaCommand::Show,
            "-r" | "--restore" => AaCommand::Restore,
            "-o" => AaCommand::Toggle,
            "on" => AaCommand::On,
            "off" => AaCommand::Off,
            _ => AaCommand::Set(args.to_string()),
        }
    }
}

fn help_text(enabled: bool, current: &str) -> String {
    format!(
        concat!(
            "Ask Away Commands:\n",
            "  /aa                  Show this help and current instruction\n",
            "  /aa prompt goes here Set custom instruction\n",
            "  /aa -r, --restore    Restore default instruction\n",
            "  /aa -o               Toggle instruction injection\n",
            "  /aa on | off         Enable or disable instruction injection\n",
            "\n",
            "Status: {}\n",
            "\n",
            "Current instruction:\n",
            "{}"
        ),
        status_label(enabled),
        extract(current)
    )
}

/// Apply the command to the shared state and produce the reply text.
pub fn dispatch(state: &mut PluginState, command: &AaCommand) -> Result<String> {
    match command {
        AaCommand::Show => {
            let current = state.store.load();
            Ok(help_text(state.toggle.get(), &current))
        }
        AaCommand::Restore => {
            state.store.save(DEFAULT_INSTRUCTION)?;
            Ok(format!(
                "Instruction restored to default:\n\n{}",
                extract(DEFAULT_INSTRUCTION)
            ))
        }
        AaCommand::Toggle => Ok(status_label(state.toggle.toggle()).to_string()),
        AaCommand::On => Ok(status_label(state.toggle.set(true)).to_string()),
        AaCommand::Off => Ok(status_label(state.toggle.set(false)).to_string()),
        AaCommand::Set(text) => {
            state.store.save(text)?;
            Ok(format!("Instruction updated to:\n\n{}", extract(text)))
        }
    }
}

/// Handle one `command.execute.before` invocation.
/// Sends exactly one notice for every `/aa` call, including failed ones.
pub async fn execute(
    state: &mut PluginState,
    notifier: &dyn AnyNotifier,
    input: &CommandInput,
) -> CommandOutcome {
    if input.command != COMMAND_NAME {
        return CommandOutcome::NotMine;
    }

    let command = AaCommand::parse(&input.arguments);
    tracing::info!(session = %input.session_id, ?command, "command: dispatching /aa");

    let reply = match dispatch(state, &command) {
        Ok(reply) => reply,
        Err(error) => {
            tracing::error!(%error, "command: /aa failed");
            format!("Error: {error}")
        }
    };

    if let Err(error) = notifier.send_ignored(&input.session_id, &reply).await {
        tracing::warn!(session = %input.session_id, %error, "command: reply was not delivered");
    }

    CommandOutcome::Handled
}
