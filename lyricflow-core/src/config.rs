use crate::error::{CoreError, Result};
use crate::parser::{ParseMode, DEFAULT_PLAIN_TEXT_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyricFlowConfig {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub mode: ParseModeKind,
    #[serde(default = "default_plain_text_interval")]
    pub plain_text_interval_secs: f64,
}

const fn default_plain_text_interval() -> f64 {
    DEFAULT_PLAIN_TEXT_INTERVAL_SECS
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: ParseModeKind::default(),
            plain_text_interval_secs: default_plain_text_interval(),
        }
    }
}

impl ParserConfig {
    /// Parse mode with the configured plain-text interval
    #[must_use]
    pub const fn parse_mode(&self) -> ParseMode {
        self.mode.with_interval(self.plain_text_interval_secs)
    }
}

/// Parse mode as named in the config file and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseModeKind {
    #[default]
    Timestamped,
    PlainText,
    Auto,
}

impl ParseModeKind {
    #[must_use]
    pub const fn with_interval(self, interval: f64) -> ParseMode {
        match self {
            Self::Timestamped => ParseMode::Timestamped,
            Self::PlainText => ParseMode::PlainText { interval },
            Self::Auto => ParseMode::Auto { interval },
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamped => "timestamped",
            Self::PlainText => "plain_text",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ParseModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseModeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "timestamped" => Ok(Self::Timestamped),
            "plain_text" | "plain" => Ok(Self::PlainText),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown parse mode '{other}' (expected timestamped, plain_text or auto)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How often the host feeds the playback position to the engine
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Size of one offset nudge
    #[serde(default = "default_offset_step")]
    pub offset_step_secs: f64,
    /// Position jump treated as a seek rather than drift
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold_secs: f64,
    /// Re-evaluate the active cue immediately after an offset change
    #[serde(default)]
    pub resync_on_offset_change: bool,
    /// Seed the offset from an `[offset:]` tag when none is stored
    #[serde(default)]
    pub apply_offset_tag: bool,
}

const fn default_tick_interval() -> u64 {
    250
}

const fn default_offset_step() -> f64 {
    0.5
}

const fn default_seek_threshold() -> f64 {
    2.0
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            offset_step_secs: default_offset_step(),
            seek_threshold_secs: default_seek_threshold(),
            resync_on_offset_change: false,
            apply_offset_tag: false,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_lines_before")]
    pub lines_before: usize,
    #[serde(default = "default_lines_after")]
    pub lines_after: usize,
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

const fn default_lines_before() -> usize {
    1
}

const fn default_lines_after() -> usize {
    2
}

const fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lines_before: default_lines_before(),
            lines_after: default_lines_after(),
            show_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to lyricflow.log next to the config file
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

impl LyricFlowConfig {
    /// Get the configuration directory path (~/.config/lyricflow/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricflow/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from `path` (or the default location), writing the
    /// template first if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written, read, parsed,
    /// or holds invalid values.
    pub fn load_or_create(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(Self::config_path, Path::to_path_buf);

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            // Write template config
            fs::write(&config_path, CONFIG_TEMPLATE)?;
            info!("Created config template at {:?}", config_path);
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or holds invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every numeric setting is usable
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        require_positive(
            "parser.plain_text_interval_secs",
            self.parser.plain_text_interval_secs,
        )?;
        require_positive("sync.offset_step_secs", self.sync.offset_step_secs)?;
        require_positive("sync.seek_threshold_secs", self.sync.seek_threshold_secs)?;
        if self.sync.tick_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "sync.tick_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::ConfigInvalid {
            message: format!("{field} must be a positive number, got {value}"),
        })
    }
}

const CONFIG_TEMPLATE: &str = r##"# LyricFlow Configuration
# ~/.config/lyricflow/config.toml

[parser]
# How lyric lines become cues: "timestamped", "plain_text" or "auto"
# "auto" estimates times only when the lyrics carry no timestamps at all
mode = "timestamped"
# Spacing between estimated cues for untimed lyrics
plain_text_interval_secs = 5.0

[sync]
# How often the playback position is checked
tick_interval_ms = 250
# Size of one offset nudge
offset_step_secs = 0.5
# Position jumps larger than this are reported as seeks
seek_threshold_secs = 2.0
# Re-check the active line right after changing the offset
resync_on_offset_change = false
# Use the lyrics file's [offset:] tag when no offset was saved for the song
apply_offset_tag = false

[display]
lines_before = 1
lines_after = 2
show_timestamps = true

[logging]
# Overridden by RUST_LOG when set
level = "info"
# Also write logs to lyricflow.log next to this file
file = false
"##;
