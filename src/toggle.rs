//! Whether instruction injection is active for this process.

/// In-memory on/off switch; starts from the configured default on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    enabled: bool,
}

impl Toggle {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn get(&self) -> bool {
        self.enabled
    }

    /// Flip and return the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn set(&mut self, enabled: bool) -> bool {
        self.enabled = enabled;
        self.enabled
    }
}

/// Status word shown to the user.
pub fn status_label(enabled: bool) -> &'static str {
    if enabled { "ENABLED" } else { "DISABLED" }
}
