use clap::{ArgGroup, Parser, Subcommand};
use lyricflow_core::ParseModeKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lyricflow")]
#[command(about = "Parse timestamped lyrics and follow them in time with playback", version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file to use instead of ~/.config/lyricflow/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a lyrics file and print its cues
    Parse {
        /// Lyrics file
        file: PathBuf,
        /// Parse mode (timestamped, plain_text, auto)
        #[arg(long)]
        mode: Option<ParseModeKind>,
        /// Seconds between estimated cues for untimed lyrics
        #[arg(long)]
        interval: Option<f64>,
        /// Print cues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play a lyrics file against a simulated clock
    Play {
        /// Lyrics file
        file: PathBuf,
        /// Starting position in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        /// Track length in seconds (defaults to the lyrics' length)
        #[arg(long)]
        duration: Option<f64>,
        /// Set and remember the sync offset for this file
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<f64>,
        /// Parse mode (timestamped, plain_text, auto)
        #[arg(long)]
        mode: Option<ParseModeKind>,
    },
    /// Show or change the remembered sync offset of a lyrics file
    #[command(group(ArgGroup::new("change").args(["adjust", "set", "later", "earlier", "reset"])))]
    Offset {
        /// Lyrics file
        file: PathBuf,
        /// Shift the offset by this many seconds
        #[arg(long, allow_hyphen_values = true)]
        adjust: Option<f64>,
        /// Set the offset to this many seconds
        #[arg(long, allow_hyphen_values = true)]
        set: Option<f64>,
        /// Show lyrics one step later
        #[arg(long)]
        later: bool,
        /// Show lyrics one step earlier
        #[arg(long)]
        earlier: bool,
        /// Forget the offset
        #[arg(long)]
        reset: bool,
    },
}

/// What the `offset` subcommand should do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetAction {
    Show,
    Adjust(f64),
    Set(f64),
    Step { later: bool },
    Reset,
}

impl OffsetAction {
    #[must_use]
    #[allow(clippy::fn_params_excessive_bools)]
    pub const fn from_flags(
        adjust: Option<f64>,
        set: Option<f64>,
        later: bool,
        earlier: bool,
        reset: bool,
    ) -> Self {
        if let Some(delta) = adjust {
            Self::Adjust(delta)
        } else if let Some(offset) = set {
            Self::Set(offset)
        } else if later || earlier {
            Self::Step { later }
        } else if reset {
            Self::Reset
        } else {
            Self::Show
        }
    }
}
