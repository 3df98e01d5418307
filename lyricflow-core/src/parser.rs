//! Cue parser for timestamped lyric text.
//!
//! Each line may start with one or more timestamp tokens. A token is tried
//! against the accepted notations most specific first:
//!
//! 1. `[MM:SS.f]`, `[MM:SS.ff]`, `[MM:SS.fff]` (fraction right-padded to
//!    milliseconds)
//! 2. `[HH:MM:SS]` or bare `HH:MM:SS` followed by `|`, whitespace or end of line
//! 3. `[MM:SS]`
//!
//! Bare tokens start a line and chain only through `|` (`00:00:03|00:00:04|`);
//! bracketed tokens chain only with bracketed tokens.
//!
//! Lines without a leading timestamp are dropped unless the parser runs in a
//! plain-text mode. Known LRC ID tags such as `[ar:Artist]` are collected into
//! [`LyricsMetadata`] and never become cues. Other `[word:...]` lines, like a
//! `[Chorus: Artist]` header, are ordinary text.

use crate::cue::{Cue, CueSequence};
use tracing::{debug, trace, warn};

/// Spacing between estimated cues when lyrics carry no timing at all.
pub const DEFAULT_PLAIN_TEXT_INTERVAL_SECS: f64 = 5.0;

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// How lines are turned into cues
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParseMode {
    /// Only lines with a leading timestamp become cues
    #[default]
    Timestamped,
    /// Every non-blank line becomes a cue at `index * interval` seconds
    PlainText { interval: f64 },
    /// Timestamped, falling back to plain text when no line carries a timestamp
    Auto { interval: f64 },
}

impl ParseMode {
    fn sanitized(self) -> Self {
        match self {
            Self::Timestamped => Self::Timestamped,
            Self::PlainText { interval } => Self::PlainText {
                interval: sanitize_interval(interval),
            },
            Self::Auto { interval } => Self::Auto {
                interval: sanitize_interval(interval),
            },
        }
    }
}

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricsMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    /// Creator of the lyrics file (`[by:]`)
    pub creator: Option<String>,
    /// Track length in seconds
    pub length: Option<f64>,
    /// `[offset:]` tag in milliseconds. Recorded only, never applied to cues.
    pub offset_ms: Option<i64>,
}

impl LyricsMetadata {
    /// Offset tag in seconds, usable directly as a sync offset (positive
    /// values show lyrics later).
    #[must_use]
    pub fn offset_secs(&self) -> Option<f64> {
        self.offset_ms
            .and_then(|ms| i32::try_from(ms).ok())
            .map(|ms| f64::from(ms) / 1000.0)
    }

    /// Record a known ID tag. Returns `false` for anything else.
    fn apply_tag(&mut self, tag: &str, value: &str) -> bool {
        let value = value.trim();
        match tag.to_ascii_lowercase().as_str() {
            "ti" => self.title = Some(value.to_string()),
            "ar" => self.artist = Some(value.to_string()),
            "al" => self.album = Some(value.to_string()),
            "au" => self.author = Some(value.to_string()),
            "by" => self.creator = Some(value.to_string()),
            "length" => self.length = parse_timestamp(value).map(millis_to_secs),
            "offset" => self.offset_ms = value.parse::<i64>().ok(),
            _ => return false,
        }
        true
    }
}

/// Cues together with the metadata found while parsing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLyrics {
    pub metadata: LyricsMetadata,
    pub cues: CueSequence,
}

/// Parser turning raw lyric text into a [`CueSequence`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CueParser {
    mode: ParseMode,
}

impl CueParser {
    /// Create a parser that only accepts timestamped lines
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: ParseMode::Timestamped,
        }
    }

    /// Create a parser with an explicit mode.
    ///
    /// A non-finite or non-positive interval is replaced by
    /// [`DEFAULT_PLAIN_TEXT_INTERVAL_SECS`].
    #[must_use]
    pub fn with_mode(mode: ParseMode) -> Self {
        Self {
            mode: mode.sanitized(),
        }
    }

    /// Create a parser that estimates cue times for untimed lyrics
    #[must_use]
    pub fn plain_text(interval: f64) -> Self {
        Self::with_mode(ParseMode::PlainText { interval })
    }

    #[must_use]
    pub const fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parse lyric text into a cue sequence. Never fails; unrecognized lines
    /// only shrink the result.
    #[must_use]
    pub fn parse(&self, input: &str) -> CueSequence {
        self.parse_document(input).cues
    }

    /// Parse lyric text into cues plus any LRC ID tags
    #[must_use]
    pub fn parse_document(&self, input: &str) -> ParsedLyrics {
        let mut metadata = LyricsMetadata::default();
        let mut cues = Vec::new();
        let mut untimed = Vec::new();

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((tag, value)) = parse_id_tag(line) {
                if metadata.apply_tag(tag, value) {
                    continue;
                }
                trace!("Not a known ID tag: {:?}", line);
            }

            if matches!(self.mode, ParseMode::PlainText { .. }) {
                untimed.push(line);
                continue;
            }

            if let Some(parsed) = parse_timed_line(line) {
                cues.extend(parsed);
            } else {
                trace!("Dropping line without timestamp: {:?}", line);
                untimed.push(line);
            }
        }

        let cues = match self.mode {
            ParseMode::PlainText { interval } => estimate_cues(&untimed, interval),
            ParseMode::Auto { interval } if cues.is_empty() && !untimed.is_empty() => {
                debug!(
                    "No timestamps found, estimating times for {} line(s) at {}s intervals",
                    untimed.len(),
                    interval
                );
                estimate_cues(&untimed, interval)
            }
            _ => {
                if !untimed.is_empty() {
                    debug!("Dropped {} line(s) without a timestamp", untimed.len());
                }
                cues
            }
        };

        let cues = CueSequence::from_cues(cues);
        debug!("Parsed {} cue(s)", cues.len());

        ParsedLyrics { metadata, cues }
    }
}

/// Parse timestamped lyric text with the default parser
#[must_use]
pub fn parse_cues(input: &str) -> CueSequence {
    CueParser::new().parse(input)
}

/// Parse an ID tag like `[ti:Title]` or `[ar:Artist]`
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let content = line.strip_prefix('[')?;
    let end = content.find(']')?;
    let (tag, value) = content[..end].split_once(':')?;

    // Timestamps have numeric leading fields; tags are alphabetic
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((tag, value))
}

/// Parse a lyric line like `[00:12.34]Hello`, `[00:05][00:15]Chorus` or
/// `00:01:05|Line A`, producing one cue per leading timestamp.
fn parse_timed_line(line: &str) -> Option<Vec<Cue>> {
    let mut stamps: Vec<(u64, &str)> = Vec::new();
    let mut rest = line;
    // Open at line start, then only while bare tokens are joined by `|`
    let mut bare_allowed = true;

    loop {
        let candidate = rest.trim_start();

        let (millis, raw, after, bare) = if let Some(inner) = candidate.strip_prefix('[') {
            if bare_allowed && !stamps.is_empty() {
                break;
            }
            let Some(end) = inner.find(']') else {
                break;
            };
            let token = &inner[..end];
            let Some(millis) = parse_timestamp(token) else {
                break;
            };
            (millis, token, &inner[end + 1..], false)
        } else if bare_allowed {
            let Some((millis, token, after)) = parse_bare_timestamp(candidate) else {
                break;
            };
            (millis, token, after, true)
        } else {
            break;
        };

        stamps.push((millis, raw));
        let piped = after.strip_prefix('|');
        bare_allowed = bare && piped.is_some();
        rest = piped.unwrap_or(after);
    }

    if stamps.is_empty() {
        return None;
    }

    let text = rest.trim();
    Some(
        stamps
            .into_iter()
            .map(|(millis, raw)| Cue::new(millis_to_secs(millis), text).with_raw_timestamp(raw))
            .collect(),
    )
}

/// Unbracketed `HH:MM:SS` token, terminated by `|`, whitespace or end of line
fn parse_bare_timestamp(s: &str) -> Option<(u64, &str, &str)> {
    let end = s
        .find(|c: char| c == '|' || c.is_whitespace())
        .unwrap_or(s.len());
    let token = &s[..end];
    let millis = parse_hours_minutes_seconds(token)?;
    Some((millis, token, &s[end..]))
}

/// Parse the inside of a timestamp token into milliseconds
fn parse_timestamp(token: &str) -> Option<u64> {
    let token = token.trim();
    parse_fractional_minutes_seconds(token)
        .or_else(|| parse_hours_minutes_seconds(token))
        .or_else(|| parse_minutes_seconds(token))
}

/// `MM:SS.f`, `MM:SS.ff` or `MM:SS.fff`
fn parse_fractional_minutes_seconds(token: &str) -> Option<u64> {
    let (minutes, rest) = token.split_once(':')?;
    let (seconds, fraction) = rest.split_once('.')?;
    to_millis(0, minutes, seconds, Some(fraction))
}

/// `HH:MM:SS`, optionally with a fraction on the seconds
fn parse_hours_minutes_seconds(token: &str) -> Option<u64> {
    let mut parts = token.splitn(3, ':');
    let hours = digits(parts.next()?)?;
    let minutes = parts.next()?;
    let rest = parts.next()?;
    match rest.split_once('.') {
        Some((seconds, fraction)) => to_millis(hours, minutes, seconds, Some(fraction)),
        None => to_millis(hours, minutes, rest, None),
    }
}

/// `MM:SS`
fn parse_minutes_seconds(token: &str) -> Option<u64> {
    let (minutes, seconds) = token.split_once(':')?;
    to_millis(0, minutes, seconds, None)
}

fn to_millis(hours: u64, minutes: &str, seconds: &str, fraction: Option<&str>) -> Option<u64> {
    let minutes = digits(minutes)?;
    let seconds = digits(seconds)?;
    let fraction = match fraction {
        Some(f) => fraction_millis(f)?,
        None => 0,
    };

    hours
        .checked_mul(MILLIS_PER_HOUR)?
        .checked_add(minutes.checked_mul(MILLIS_PER_MINUTE)?)?
        .checked_add(seconds.checked_mul(MILLIS_PER_SECOND)?)?
        .checked_add(fraction)
}

/// Unsigned decimal field; rejects signs, whitespace and empty input
fn digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// 1-3 fractional digits, right-padded to milliseconds (`5` -> 500)
fn fraction_millis(fraction: &str) -> Option<u64> {
    let value = digits(fraction)?;
    match fraction.len() {
        1 => Some(value * 100),
        2 => Some(value * 10),
        3 => Some(value),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

fn estimate_cues(lines: &[&str], interval: f64) -> Vec<Cue> {
    lines
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let slot = u32::try_from(index).map_or(f64::MAX, f64::from);
            Cue::new(slot * interval, *text).with_duration(interval)
        })
        .collect()
}

fn sanitize_interval(interval: f64) -> f64 {
    if interval.is_finite() && interval > 0.0 {
        interval
    } else {
        warn!(
            "Invalid plain-text interval {}, using {}s",
            interval, DEFAULT_PLAIN_TEXT_INTERVAL_SECS
        );
        DEFAULT_PLAIN_TEXT_INTERVAL_SECS
    }
}
