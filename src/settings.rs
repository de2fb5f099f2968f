//! Runtime configuration, read once from the environment.
use std::path::{Path, PathBuf};

use crate::instruction::default_instruction_path;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4096";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub instruction_path: PathBuf,
    /// Debug log file; `None` turns logging off.
    pub log_path: Option<PathBuf>,
    pub enabled_at_start: bool,
    pub server_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(|key| std::env::var(key).ok(), &cwd)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, cwd: &Path) -> Self {
        let home = lookup("HOME")
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("USERPROFILE"))
            .unwrap_or_default();

        let log_enabled = lookup("OPENCODE_AA_LOG")
            .map(|v| matches!(v.as_str(), "1" | "true"))
            .unwrap_or(false);

        let enabled_at_start = lookup("OPENCODE_AA_ENABLED")
            .map(|v| v.trim().to_lowercase())
            .map(|v| !matches!(v.as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        let server_url = lookup("OPENCODE_AA_SERVER_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Self {
            instruction_path: default_instruction_path(Path::new(&home)),
            log_path: log_enabled.then(|| cwd.join(".logs").join("user-instructions.log")),
            enabled_at_start,
            server_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned(), Path::new("/work"))
    }

    #[test]
    fn defaults() {
        let s = settings(&[("HOME", "/home/ada")]);
        assert_eq!(
            s.instruction_path,
            PathBuf::from("/home/ada/.config/opencode/aa-instruction.txt")
        );
        assert_eq!(s.log_path, None);
        assert!(s.enabled_at_start);
        assert_eq!(s.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn home_falls_back_to_userprofile() {
        let s = settings(&[("USERPROFILE", "/users/ada")]);
        assert_eq!(
            s.instruction_path,
            PathBuf::from("/users/ada/.config/opencode/aa-instruction.txt")
        );
    }

    #[test]
    fn log_flag_accepts_only_one_and_true() {
        for (value, want) in [("1", true), ("true", true), ("yes", false), ("TRUE", false), ("0", false)] {
            let s = settings(&[("OPENCODE_AA_LOG", value)]);
            assert_eq!(s.log_path.is_some(), want, "{value:?}");
        }
        let s = settings(&[("OPENCODE_AA_LOG", "1")]);
        assert_eq!(s.log_path, Some(PathBuf::from("/work/.logs/user-instructions.log")));
    }

    #[test]
    fn startup_state_can_be_disabled() {
        for value in ["0", "false", "OFF", " no "] {
            assert!(!settings(&[("OPENCODE_AA_ENABLED", value)]).enabled_at_start, "{value:?}");
        }
        assert!(settings(&[("OPENCODE_AA_ENABLED", "1")]).enabled_at_start);
    }

    #[test]
    fn server_url_override() {
        let s = settings(&[("OPENCODE_AA_SERVER_URL", " http://localhost:9000 ")]);
        assert_eq!(s.server_url, "http://localhost:9000");
    }
}
