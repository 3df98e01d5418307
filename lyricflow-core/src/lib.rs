pub mod config;
pub mod cue;
pub mod error;
pub mod offsets;
pub mod parser;
pub mod paths;
pub mod playback;
pub mod session;
pub mod sync;
pub mod time;

pub use config::{
    DisplayConfig, LoggingConfig, LyricFlowConfig, ParseModeKind, ParserConfig, SyncConfig,
};
pub use cue::{Cue, CueSequence, DEFAULT_CUE_SECS};
pub use error::{CoreError, Result};
pub use offsets::{JsonOffsetStore, MemoryOffsetStore, OffsetStore};
pub use parser::{
    parse_cues, CueParser, LyricsMetadata, ParseMode, ParsedLyrics,
    DEFAULT_PLAIN_TEXT_INTERVAL_SECS,
};
pub use paths::{
    config_dir, config_path, log_file_path, offsets_path, state_dir, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME, LOG_FILE_NAME, OFFSETS_FILE_NAME,
};
pub use playback::{MediaClock, PlaybackState};
pub use session::LyricsSession;
pub use sync::{CueChange, CueObserver, ObserverId, SyncEngine, SyncPhase, SyncState};
pub use time::{format_timestamp, secs_to_duration};
