//! Path constants for configuration, offset and log files.

use std::path::{Path, PathBuf};

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lyricflow";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the per-song offset file
pub const OFFSETS_FILE_NAME: &str = "offsets.json";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "lyricflow.log";

/// Get the configuration directory path (~/.config/lyricflow/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lyricflow/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Directory for offsets and logs: next to `config_file` when one is given,
/// otherwise ~/.config/lyricflow/
#[must_use]
pub fn state_dir(config_file: Option<&Path>) -> PathBuf {
    match config_file.map(Path::parent) {
        Some(Some(parent)) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => config_dir(),
    }
}

/// Get the per-song offset file path (offsets.json in [`state_dir`])
#[must_use]
pub fn offsets_path(config_file: Option<&Path>) -> PathBuf {
    state_dir(config_file).join(OFFSETS_FILE_NAME)
}

/// Get the log file path (lyricflow.log in [`state_dir`])
#[must_use]
pub fn log_file_path(config_file: Option<&Path>) -> PathBuf {
    state_dir(config_file).join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations() {
        assert_eq!(state_dir(None), config_dir());
        assert_eq!(offsets_path(None), config_dir().join("offsets.json"));
        assert_eq!(log_file_path(None), config_dir().join("lyricflow.log"));
    }

    #[test]
    fn test_locations_follow_config_file() {
        let config = Path::new("/tmp/karaoke/custom.toml");
        assert_eq!(offsets_path(Some(config)), PathBuf::from("/tmp/karaoke/offsets.json"));
        assert_eq!(log_file_path(Some(config)), PathBuf::from("/tmp/karaoke/lyricflow.log"));
    }

    #[test]
    fn test_bare_config_file_name_uses_current_dir() {
        assert_eq!(
            offsets_path(Some(Path::new("custom.toml"))),
            PathBuf::from("./offsets.json")
        );
    }
}
