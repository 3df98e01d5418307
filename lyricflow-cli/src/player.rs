//! Drives a lyrics session from a playback clock until the track ends.
//!
//! While playing, commands typed on stdin control the clock and the offset:
//! `p` pauses or resumes, `s SECS` seeks, `+`/`-` nudge the offset by one
//! step and `q` quits.

use lyricflow_core::{
    secs_to_duration, LyricsSession, MediaClock, OffsetStore, PlaybackState, Result, SyncConfig,
};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A command typed while playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    TogglePause,
    Seek(f64),
    Nudge { later: bool },
    Quit,
}

impl FromStr for PlayerCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("p" | "pause"), None, None) => Ok(Self::TogglePause),
            (Some("s" | "seek"), Some(position), None) => position
                .parse::<f64>()
                .map(Self::Seek)
                .map_err(|_| format!("invalid seek position '{position}'")),
            (Some("+" | "later"), None, None) => Ok(Self::Nudge { later: true }),
            (Some("-" | "earlier"), None, None) => Ok(Self::Nudge { later: false }),
            (Some("q" | "quit"), None, None) => Ok(Self::Quit),
            _ => Err(format!(
                "unknown command '{}' (p, s SECS, +, -, q)",
                s.trim()
            )),
        }
    }
}

/// Timing and offset settings for a playback run
#[derive(Debug, Clone, Copy)]
pub struct PlayerOptions {
    pub tick_interval: Duration,
    pub seek_threshold: Duration,
    pub offset_step: f64,
    pub resync_on_offset_change: bool,
}

impl PlayerOptions {
    #[must_use]
    pub fn from_config(sync: &SyncConfig) -> Self {
        Self {
            tick_interval: sync.tick_interval(),
            seek_threshold: secs_to_duration(sync.seek_threshold_secs),
            offset_step: sync.offset_step_secs,
            resync_on_offset_change: sync.resync_on_offset_change,
        }
    }
}

/// How a playback run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Finished,
    Stopped,
}

/// Forward command lines from `input` until it closes or nobody listens.
/// Unrecognized lines are logged and skipped.
pub async fn read_commands<R>(input: R, commands: mpsc::Sender<PlayerCommand>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match line.parse::<PlayerCommand>() {
                Ok(command) => {
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read command: {}", e);
                break;
            }
        }
    }
}

/// Tick `session` from `clock` until the track ends, a quit command arrives
/// or `cancel_token` fires.
///
/// # Errors
///
/// Returns an error if a nudged offset cannot be persisted.
pub async fn run<S: OffsetStore>(
    session: &mut LyricsSession<S>,
    clock: &mut PlaybackState,
    mut commands: mpsc::Receiver<PlayerCommand>,
    options: PlayerOptions,
    cancel_token: &CancellationToken,
) -> Result<PlayOutcome> {
    info!("Starting playback at {:.2}s", clock.interpolated_position());

    let mut interval = tokio::time::interval(options.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut commands_open = true;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Playback stopped at {:.2}s", clock.interpolated_position());
                return Ok(PlayOutcome::Stopped);
            }
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => {
                        if !apply_command(session, clock, command, &options)? {
                            info!("Playback stopped at {:.2}s", clock.interpolated_position());
                            return Ok(PlayOutcome::Stopped);
                        }
                    }
                    None => commands_open = false,
                }
            }
            _ = interval.tick() => {
                let position = clock.interpolated_position();
                session.tick(position);

                if clock.has_ended() {
                    info!("Reached end of track at {:.2}s", position);
                    return Ok(PlayOutcome::Finished);
                }
            }
        }
    }
}

/// Apply one command. Returns `false` when playback should stop.
fn apply_command<S: OffsetStore>(
    session: &mut LyricsSession<S>,
    clock: &mut PlaybackState,
    command: PlayerCommand,
    options: &PlayerOptions,
) -> Result<bool> {
    let before = clock.clone();

    match command {
        PlayerCommand::TogglePause => {
            if clock.is_playing {
                clock.pause();
            } else {
                clock.play();
            }
            if before.playback_state_changed(clock) {
                let verb = if clock.is_playing { "Resumed" } else { "Paused" };
                info!("{} at {:.2}s", verb, clock.interpolated_position());
            }
        }
        PlayerCommand::Seek(position) => {
            clock.seek(position);
            if before.seek_occurred(clock, options.seek_threshold) {
                info!("Seek to {:.2}s", clock.position);
            } else {
                debug!("Small position change to {:.2}s", clock.position);
            }
            session.tick(clock.interpolated_position());
        }
        PlayerCommand::Nudge { later } => {
            let delta = if later {
                options.offset_step
            } else {
                -options.offset_step
            };
            let offset = session.adjust_offset(delta)?;
            info!("Offset now {:+.2}s", offset);
            if options.resync_on_offset_change {
                session.tick(clock.interpolated_position());
            }
        }
        PlayerCommand::Quit => return Ok(false),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricflow_core::{CueChange, CueParser, CueSequence, MemoryOffsetStore};
    use std::cell::RefCell;
    use std::rc::Rc;

    const OPTIONS: PlayerOptions = PlayerOptions {
        tick_interval: Duration::from_millis(250),
        seek_threshold: Duration::from_secs(2),
        offset_step: 0.5,
        resync_on_offset_change: false,
    };

    fn session_with_log(
        lyrics: &str,
    ) -> (LyricsSession<MemoryOffsetStore>, Rc<RefCell<Vec<Option<usize>>>>) {
        let mut session = LyricsSession::new(CueParser::new(), MemoryOffsetStore::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session.subscribe(move |change: CueChange, _: &CueSequence| {
            sink.borrow_mut().push(change.current);
        });
        session.load_song("test", lyrics);
        (session, log)
    }

    async fn queued(commands: &[PlayerCommand]) -> mpsc::Receiver<PlayerCommand> {
        let (tx, rx) = mpsc::channel(commands.len().max(1));
        for command in commands {
            tx.send(*command).await.unwrap();
        }
        rx
    }

    #[test]
    fn test_parse_player_commands() {
        assert_eq!("p".parse(), Ok(PlayerCommand::TogglePause));
        assert_eq!(" seek 42.5 ".parse(), Ok(PlayerCommand::Seek(42.5)));
        assert_eq!("+".parse(), Ok(PlayerCommand::Nudge { later: true }));
        assert_eq!("earlier".parse(), Ok(PlayerCommand::Nudge { later: false }));
        assert_eq!("q".parse(), Ok(PlayerCommand::Quit));
        assert!("s".parse::<PlayerCommand>().is_err());
        assert!("s abc".parse::<PlayerCommand>().is_err());
        assert!("p now".parse::<PlayerCommand>().is_err());
        assert!("dance".parse::<PlayerCommand>().is_err());
    }

    #[tokio::test]
    async fn test_read_commands_skips_bad_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        read_commands(&b"p\n\nbogus\ns 10\nq\n"[..], tx).await;

        let mut received = Vec::new();
        while let Some(command) = rx.recv().await {
            received.push(command);
        }
        assert_eq!(
            received,
            vec![
                PlayerCommand::TogglePause,
                PlayerCommand::Seek(10.0),
                PlayerCommand::Quit
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeks_until_end_of_track() {
        let (mut session, log) = session_with_log("[00:10]One\n[00:20]Two");
        let mut clock = PlaybackState::new(true, 0.0, Some(30.0));
        let commands = queued(&[
            PlayerCommand::Seek(15.0),
            PlayerCommand::Seek(25.0),
            PlayerCommand::Seek(30.0),
        ])
        .await;

        let outcome = run(
            &mut session,
            &mut clock,
            commands,
            OPTIONS,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PlayOutcome::Finished);
        assert_eq!(*log.borrow(), vec![Some(0), Some(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_then_quit() {
        let (mut session, _log) = session_with_log("[00:10]One");
        let mut clock = PlaybackState::new(true, 5.0, Some(30.0));
        let commands = queued(&[PlayerCommand::TogglePause, PlayerCommand::Quit]).await;

        let outcome = run(
            &mut session,
            &mut clock,
            commands,
            OPTIONS,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PlayOutcome::Stopped);
        assert!(!clock.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nudges_are_remembered() {
        let (mut session, _log) = session_with_log("[00:10]One");
        let mut clock = PlaybackState::new(false, 0.0, Some(30.0));
        let commands = queued(&[
            PlayerCommand::Nudge { later: true },
            PlayerCommand::Nudge { later: true },
            PlayerCommand::Nudge { later: false },
            PlayerCommand::Quit,
        ])
        .await;

        run(
            &mut session,
            &mut clock,
            commands,
            OPTIONS,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(session.engine().offset(), 0.5);
        assert_eq!(session.store().get("test"), Some(0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_commands_keep_playing() {
        let (mut session, log) = session_with_log("[00:03]One");
        let mut clock = PlaybackState::new(true, 5.0, Some(5.0));
        let commands = queued(&[]).await;

        let outcome = run(
            &mut session,
            &mut clock,
            commands,
            OPTIONS,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PlayOutcome::Finished);
        assert_eq!(*log.borrow(), vec![Some(0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled() {
        let (mut session, _log) = session_with_log("[00:00]One");
        let mut clock = PlaybackState::new(true, 0.0, None);
        let (_tx, commands) = mpsc::channel(1);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        let outcome = run(&mut session, &mut clock, commands, OPTIONS, &token)
            .await
            .unwrap();

        assert_eq!(outcome, PlayOutcome::Stopped);
        assert_eq!(session.engine().active_index(), Some(0));
    }
}
