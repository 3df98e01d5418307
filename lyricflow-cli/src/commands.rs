use crate::cli::OffsetAction;
use crate::player::{self, PlayOutcome, PlayerCommand, PlayerOptions};
use crate::render::ConsoleRenderer;
use lyricflow_core::{
    paths, CueParser, CueSequence, JsonOffsetStore, LyricFlowConfig, LyricsMetadata,
    LyricsSession, OffsetStore, ParseModeKind, PlaybackState, Result, DEFAULT_CUE_SECS,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Loaded config and the file it came from
#[derive(Debug, Clone)]
pub struct Context {
    pub config: LyricFlowConfig,
    pub config_file: Option<PathBuf>,
}

impl Context {
    #[must_use]
    pub const fn new(config: LyricFlowConfig, config_file: Option<PathBuf>) -> Self {
        Self {
            config,
            config_file,
        }
    }

    /// Offsets live next to the config file in use
    fn open_offsets(&self) -> Result<JsonOffsetStore> {
        JsonOffsetStore::open(paths::offsets_path(self.config_file.as_deref()))
    }
}

/// Arguments of `lyricflow play`
#[derive(Debug, Clone)]
pub struct PlayArgs {
    pub file: PathBuf,
    pub start: f64,
    pub duration: Option<f64>,
    pub offset: Option<f64>,
    pub mode: Option<ParseModeKind>,
}

/// `lyricflow parse`
pub fn parse(
    config: &LyricFlowConfig,
    file: &Path,
    mode: Option<ParseModeKind>,
    interval: Option<f64>,
    json: bool,
) -> Result<()> {
    let lyrics = fs::read_to_string(file)?;
    let parsed = parser_for(config, mode, interval).parse_document(&lyrics);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed.cues)?);
        return Ok(());
    }

    print!("{}", describe_metadata(&parsed.metadata));
    for (index, cue) in parsed.cues.iter().enumerate() {
        println!("{index:>4}  {:<11} {}", cue.display_timestamp(), cue.text);
    }
    info!("{} cue(s) in {}", parsed.cues.len(), file.display());
    Ok(())
}

/// `lyricflow play`
///
/// Returns at once when the file holds no lyric lines.
pub async fn play(
    context: &Context,
    args: &PlayArgs,
    commands: mpsc::Receiver<PlayerCommand>,
    cancel_token: &CancellationToken,
) -> Result<PlayOutcome> {
    let config = &context.config;
    let lyrics = fs::read_to_string(&args.file)?;

    let mut session = LyricsSession::new(
        parser_for(config, args.mode, None),
        context.open_offsets()?,
    )
    .with_offset_tag(config.sync.apply_offset_tag);
    session.subscribe(ConsoleRenderer::stdout(config.display.clone()));
    session.load_song(song_id(&args.file)?, &lyrics);

    if session.engine().cues().is_empty() {
        warn!("No lyric lines found in {}", args.file.display());
        return Ok(PlayOutcome::Finished);
    }

    let length = args
        .duration
        .or_else(|| track_length(session.engine().cues(), session.metadata()));
    let mut clock = PlaybackState::new(true, args.start, length);

    if let Some(offset) = args.offset {
        let offset = session.set_offset(offset)?;
        info!("Offset set to {}s", offset);
        if config.sync.resync_on_offset_change {
            session.tick(clock.interpolated_position());
        }
    }

    player::run(
        &mut session,
        &mut clock,
        commands,
        PlayerOptions::from_config(&config.sync),
        cancel_token,
    )
    .await
}

/// `lyricflow offset`
pub fn offset(context: &Context, file: &Path, action: OffsetAction) -> Result<()> {
    let config = &context.config;
    let lyrics = fs::read_to_string(file)?;

    let mut session = LyricsSession::new(parser_for(config, None, None), context.open_offsets()?)
        .with_offset_tag(config.sync.apply_offset_tag);
    session.load_song(song_id(file)?, &lyrics);

    let offset = apply_offset_action(&mut session, action, config.sync.offset_step_secs)?;
    println!("{}: offset {:+.2}s", file.display(), offset);
    Ok(())
}

/// Apply `action` to the loaded song, returning the resulting offset
pub fn apply_offset_action<S: OffsetStore>(
    session: &mut LyricsSession<S>,
    action: OffsetAction,
    step: f64,
) -> Result<f64> {
    match action {
        OffsetAction::Show => Ok(session.engine().offset()),
        OffsetAction::Adjust(delta) => session.adjust_offset(delta),
        OffsetAction::Set(offset) => session.set_offset(offset),
        OffsetAction::Step { later: true } => session.adjust_offset(step),
        OffsetAction::Step { later: false } => session.adjust_offset(-step),
        OffsetAction::Reset => {
            session.reset_offset()?;
            Ok(session.engine().offset())
        }
    }
}

/// Parser from config, with command line overrides
#[must_use]
pub fn parser_for(
    config: &LyricFlowConfig,
    mode: Option<ParseModeKind>,
    interval: Option<f64>,
) -> CueParser {
    let kind = mode.unwrap_or(config.parser.mode);
    let interval = interval.unwrap_or(config.parser.plain_text_interval_secs);
    CueParser::with_mode(kind.with_interval(interval))
}

/// Track length for playback: the `[length:]` tag, else the end of the last cue
#[must_use]
pub fn track_length(cues: &CueSequence, metadata: &LyricsMetadata) -> Option<f64> {
    metadata.length.or_else(|| {
        cues.as_slice()
            .last()
            .map(|cue| cue.time + cue.duration.unwrap_or(DEFAULT_CUE_SECS))
    })
}

/// Offsets are remembered per canonical file path
fn song_id(file: &Path) -> Result<String> {
    Ok(fs::canonicalize(file)?.display().to_string())
}

fn describe_metadata(metadata: &LyricsMetadata) -> String {
    let fields = [
        ("Title", metadata.title.as_deref()),
        ("Artist", metadata.artist.as_deref()),
        ("Album", metadata.album.as_deref()),
        ("Author", metadata.author.as_deref()),
        ("Creator", metadata.creator.as_deref()),
    ];

    let mut out = String::new();
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    if let Some(offset) = metadata.offset_secs() {
        let _ = writeln!(out, "Offset tag: {offset:+}s");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricflow_core::{MemoryOffsetStore, ParseMode};

    #[test]
    fn test_parser_for_overrides() {
        let config = LyricFlowConfig::default();
        assert_eq!(parser_for(&config, None, None).mode(), ParseMode::Timestamped);
        assert_eq!(
            parser_for(&config, Some(ParseModeKind::PlainText), Some(2.0)).mode(),
            ParseMode::PlainText { interval: 2.0 }
        );
        assert_eq!(
            parser_for(&config, Some(ParseModeKind::Auto), None).mode(),
            ParseMode::Auto { interval: 5.0 }
        );
    }

    #[test]
    fn test_track_length() {
        let parser = CueParser::new();

        let parsed = parser.parse_document("[length:03:15]\n[00:10]Line");
        assert_eq!(track_length(&parsed.cues, &parsed.metadata), Some(195.0));

        let parsed = parser.parse_document("[00:10]Line\n[00:20]Last");
        assert_eq!(track_length(&parsed.cues, &parsed.metadata), Some(25.0));

        let parsed = parser.parse_document("");
        assert_eq!(track_length(&parsed.cues, &parsed.metadata), None);
    }

    #[test]
    fn test_apply_offset_actions() {
        let mut session = LyricsSession::new(CueParser::new(), MemoryOffsetStore::new());
        session.load_song("song", "[00:10]Line");

        assert_eq!(apply_offset_action(&mut session, OffsetAction::Show, 0.5).unwrap(), 0.0);
        assert_eq!(
            apply_offset_action(&mut session, OffsetAction::Step { later: true }, 0.5).unwrap(),
            0.5
        );
        assert_eq!(
            apply_offset_action(&mut session, OffsetAction::Adjust(-2.0), 0.5).unwrap(),
            -1.5
        );
        assert_eq!(session.store().get("song"), Some(-1.5));
        assert_eq!(
            apply_offset_action(&mut session, OffsetAction::Step { later: false }, 0.5).unwrap(),
            -2.0
        );
        assert_eq!(
            apply_offset_action(&mut session, OffsetAction::Set(3.0), 0.5).unwrap(),
            3.0
        );
        assert_eq!(apply_offset_action(&mut session, OffsetAction::Reset, 0.5).unwrap(), 0.0);
        assert_eq!(session.store().get("song"), None);
    }

    #[tokio::test]
    async fn test_play_without_cues_returns() {
        let dir = std::env::temp_dir().join(format!("lyricflow-play-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("untimed.lrc");
        fs::write(&file, "[ti:Instrumental]\nno timestamps here\n").unwrap();

        let context = Context::new(LyricFlowConfig::default(), Some(dir.join("config.toml")));
        let args = PlayArgs {
            file,
            start: 0.0,
            duration: None,
            offset: Some(1.0),
            mode: None,
        };
        let (_tx, commands) = mpsc::channel(1);

        let outcome = play(&context, &args, commands, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, PlayOutcome::Finished);
        assert!(!dir.join("offsets.json").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_offsets_follow_config_file() {
        let dir = std::env::temp_dir().join(format!("lyricflow-offset-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("song.lrc");
        fs::write(&file, "[00:10]Line").unwrap();

        let context = Context::new(LyricFlowConfig::default(), Some(dir.join("config.toml")));
        offset(&context, &file, OffsetAction::Set(0.75)).unwrap();

        let store = JsonOffsetStore::open(dir.join("offsets.json")).unwrap();
        assert_eq!(store.get(&song_id(&file).unwrap()), Some(0.75));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_describe_metadata() {
        let parsed = CueParser::new().parse_document("[ti:Song]\n[ar:Band]\n[offset:-250]");
        assert_eq!(
            describe_metadata(&parsed.metadata),
            "Title: Song\nArtist: Band\nOffset tag: -0.25s\n"
        );
    }
}
