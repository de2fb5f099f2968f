//! Durable storage for the single standing instruction, with its envelope format.
use eyre::Result;
use std::path::{Path, PathBuf};

const ENVELOPE_PREFIX: &str = "how_to_yield_back:\"";
const ENVELOPE_SUFFIX: &str = "\"";

/// Instruction shipped with the plugin, already in envelope form.
pub const DEFAULT_INSTRUCTION: &str = concat!(
    "how_to_yield_back:\"",
    "After completing user request or reached a stopping point, ",
    "YOU MUST ALWAYS USE THE QUESTION TOOL TO HAND THE CONVERSATION BACK TO THE USER. ",
    "The question tool allows for great user experience and allows you to drive some of the process ",
    "with your suggestions, ultimately, steering the user towards the most critical points in need of resolution. ",
    "When using the question tool, produce logical, may I say intelligent questions, ",
    "in regards of the most pressing matters. ",
    "Use the question tool PROPERLY: be mindful of the expected payload and use all of the question tool ",
    "capabilities to the fullest extent possible. ",
    "Always remember that the user is in control of the conversation and your role is to assist them ",
    "in achieving their goals effectively.",
    "\"",
);

/// Return the inner content when `raw` is in envelope form, `raw` itself otherwise.
pub fn extract(raw: &str) -> &str {
    raw.strip_prefix(ENVELOPE_PREFIX)
        .and_then(|rest| rest.strip_suffix(ENVELOPE_SUFFIX))
        .unwrap_or(raw)
}

/// Whether `raw` already carries the envelope.
pub fn is_wrapped(raw: &str) -> bool {
    raw.len() > ENVELOPE_PREFIX.len()
        && raw.starts_with(ENVELOPE_PREFIX)
        && raw.ends_with(ENVELOPE_SUFFIX)
}

/// Put `text` into the envelope unless it is already there.
pub fn wrap(text: &str) -> String {
    if is_wrapped(text) {
        text.to_string()
    } else {
        format!("{ENVELOPE_PREFIX}{text}{ENVELOPE_SUFFIX}")
    }
}

/// Location of the instruction file under the host's config directory.
pub fn default_instruction_path(home: &Path) -> PathBuf {
    home.join(".config").join("opencode").join("aa-instruction.txt")
}

/// File-backed instruction with a write-through cache.
#[derive(Debug)]
pub struct InstructionStore {
    path: PathBuf,
    cached: Option<String>,
}

impl InstructionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current instruction as stored. Falls back to the default, persisting it,
    /// whenever the file cannot be read or holds nothing.
    pub fn load(&mut self) -> String {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }

        let loaded = match std::fs::read_to_string(&self.path) {
            Ok(content) if !content.trim().is_empty() => content.trim().to_string(),
            Ok(_) => {
                tracing::debug!(path = %self.path.display(), "store: instruction file is empty");
                self.persist_default()
            }
            Err(error) => {
                tracing::debug!(
                    path = %self.path.display(),
                    %error,
                    "store: instruction file unreadable, using default"
                );
                self.persist_default()
            }
        };

        self.cached = Some(loaded.clone());
        loaded
    }

    /// Replace the instruction on disk and in the cache.
    pub fn save(&mut self, text: &str) -> Result<()> {
        let wrapped = wrap(text);
        write_creating_parents(&self.path, &wrapped)?;
        tracing::info!(path = %self.path.display(), bytes = wrapped.len(), "store: instruction saved");
        self.cached = Some(wrapped);
        Ok(())
    }

    fn persist_default(&self) -> String {
        if let Err(error) = write_creating_parents(&self.path, DEFAULT_INSTRUCTION) {
            tracing::warn!(
                path = %self.path.display(),
                %error,
                "store: could not persist default instruction"
            );
        }
        DEFAULT_INSTRUCTION.to_string()
    }
}

fn write_creating_parents(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
