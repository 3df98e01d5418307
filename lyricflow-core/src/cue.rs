//! Cue model shared by the parser and the sync engine.

use crate::time::format_timestamp;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Write;

/// Assumed length of a cue when neither its own duration nor a following cue
/// bounds it.
pub const DEFAULT_CUE_SECS: f64 = 5.0;

/// A single timestamped lyric unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    /// Start time in seconds from track start
    pub time: f64,
    /// Display text
    pub text: String,
    /// Timestamp token as written in the source, without brackets or pipe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<String>,
    /// Authored or estimated length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Cue {
    /// Create a cue. Negative and `NaN` times are clamped to zero.
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time: sanitize_time(time),
            text: text.into(),
            raw_timestamp: None,
            duration: None,
        }
    }

    /// Attach the original timestamp token
    #[must_use]
    pub fn with_raw_timestamp(mut self, raw: impl Into<String>) -> Self {
        self.raw_timestamp = Some(raw.into());
        self
    }

    /// Attach a duration in seconds
    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Timestamp for display: the raw token if one was kept, otherwise the
    /// formatted start time.
    #[must_use]
    pub fn display_timestamp(&self) -> String {
        self.raw_timestamp
            .clone()
            .unwrap_or_else(|| format_timestamp(self.time))
    }
}

/// Ordered, immutable list of cues for one song.
///
/// Cues are always stored in non-decreasing `time` order. Cues sharing a
/// timestamp keep the order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CueSequence {
    cues: Vec<Cue>,
}

impl CueSequence {
    /// Create an empty sequence
    #[must_use]
    pub const fn new() -> Self {
        Self { cues: Vec::new() }
    }

    /// Build a sequence from cues in any order (stable sort by time)
    #[must_use]
    pub fn from_cues(mut cues: Vec<Cue>) -> Self {
        for cue in &mut cues {
            cue.time = sanitize_time(cue.time);
        }
        cues.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
        Self { cues }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Cue] {
        &self.cues
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Cue> {
        self.cues
    }

    /// Index of the cue active at `time`: the greatest index whose start time
    /// is `<= time`. Among cues sharing a timestamp the last one wins.
    ///
    /// Returns `None` when `time` precedes every cue, the sequence is empty,
    /// or `time` is `NaN`.
    #[must_use]
    pub fn active_index_at(&self, time: f64) -> Option<usize> {
        if time.is_nan() {
            return None;
        }
        self.cues
            .partition_point(|cue| cue.time <= time)
            .checked_sub(1)
    }

    /// Cues around `index` for display, `before` lines above and `after`
    /// lines below. With no active cue the window starts at the first cue.
    #[must_use]
    pub fn visible_window(&self, index: Option<usize>, before: usize, after: usize) -> &[Cue] {
        if self.cues.is_empty() {
            return &[];
        }
        let current = index.unwrap_or(0).min(self.cues.len() - 1);
        let start = current.saturating_sub(before);
        let end = current.saturating_add(after).saturating_add(1).min(self.cues.len());
        &self.cues[start..end]
    }

    /// Progress through the cue at `index` (0.0 to 1.0).
    ///
    /// The cue ends at its own duration if it has one, otherwise at the next
    /// cue's start, otherwise [`DEFAULT_CUE_SECS`] after it starts.
    #[must_use]
    pub fn progress(&self, index: usize, time: f64) -> f64 {
        let Some(cue) = self.cues.get(index) else {
            return 0.0;
        };
        if time.is_nan() || time < cue.time {
            return 0.0;
        }

        let end = cue
            .duration
            .map(|d| cue.time + d)
            .or_else(|| self.cues.get(index + 1).map(|next| next.time))
            .unwrap_or(cue.time + DEFAULT_CUE_SECS);

        if time >= end {
            return 1.0;
        }

        ((time - cue.time) / (end - cue.time)).clamp(0.0, 1.0)
    }

    /// Serialize back to `[MM:SS.cc]text` lines
    #[must_use]
    pub fn to_lrc(&self) -> String {
        let mut out = String::new();
        for cue in &self.cues {
            let _ = writeln!(out, "[{}]{}", format_timestamp(cue.time), cue.text);
        }
        out
    }
}

impl From<Vec<Cue>> for CueSequence {
    fn from(cues: Vec<Cue>) -> Self {
        Self::from_cues(cues)
    }
}

impl FromIterator<Cue> for CueSequence {
    fn from_iter<I: IntoIterator<Item = Cue>>(iter: I) -> Self {
        Self::from_cues(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CueSequence {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

/// `f64::max` returns the non-NaN operand, so this maps both NaN and
/// negatives to zero.
fn sanitize_time(time: f64) -> f64 {
    time.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(times: &[f64]) -> CueSequence {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| Cue::new(t, format!("Line {i}")))
            .collect()
    }

    #[test]
    fn test_from_cues_sorts_stably() {
        let seq = CueSequence::from_cues(vec![
            Cue::new(20.0, "c"),
            Cue::new(10.0, "a"),
            Cue::new(10.0, "b"),
            Cue::new(5.0, "first"),
        ]);
        let texts: Vec<_> = seq.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "a", "b", "c"]);
    }

    #[test]
    fn test_invalid_times_clamped() {
        let seq = CueSequence::from_cues(vec![
            Cue {
                time: f64::NAN,
                text: "nan".to_string(),
                raw_timestamp: None,
                duration: None,
            },
            Cue::new(-3.0, "negative"),
            Cue::new(1.0, "one"),
        ]);
        assert_eq!(seq.get(0).unwrap().time, 0.0);
        assert_eq!(seq.get(1).unwrap().time, 0.0);
        assert_eq!(seq.get(2).unwrap().text, "one");
    }

    #[test]
    fn test_active_index_boundaries() {
        let seq = sequence(&[10.0, 20.0]);
        assert_eq!(seq.active_index_at(9.999), None);
        assert_eq!(seq.active_index_at(10.0), Some(0));
        assert_eq!(seq.active_index_at(19.999), Some(0));
        assert_eq!(seq.active_index_at(20.0), Some(1));
        assert_eq!(seq.active_index_at(1000.0), Some(1));
    }

    #[test]
    fn test_active_index_ties_pick_last() {
        let seq = sequence(&[0.0, 5.0, 10.0, 10.0, 15.0]);
        assert_eq!(seq.active_index_at(10.0), Some(3));
        assert_eq!(seq.active_index_at(12.0), Some(3));
    }

    #[test]
    fn test_active_index_non_finite() {
        let seq = sequence(&[0.0, 10.0]);
        assert_eq!(seq.active_index_at(f64::NAN), None);
        assert_eq!(seq.active_index_at(f64::NEG_INFINITY), None);
        assert_eq!(seq.active_index_at(f64::INFINITY), Some(1));
        assert_eq!(seq.active_index_at(-1.0), None);
    }

    #[test]
    fn test_active_index_empty() {
        assert_eq!(CueSequence::new().active_index_at(50.0), None);
    }

    #[test]
    fn test_visible_window() {
        let seq = sequence(&[5.0, 10.0, 15.0, 20.0, 25.0]);

        let window = seq.visible_window(Some(1), 1, 1);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].text, "Line 0");
        assert_eq!(window[2].text, "Line 2");

        let window = seq.visible_window(Some(4), 1, 3);
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].text, "Line 4");

        let window = seq.visible_window(None, 2, 1);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].text, "Line 0");
    }

    #[test]
    fn test_visible_window_empty() {
        assert!(CueSequence::new().visible_window(Some(3), 1, 1).is_empty());
    }

    #[test]
    fn test_progress_uses_next_cue() {
        let seq = sequence(&[10.0, 15.0]);
        assert_eq!(seq.progress(0, 8.0), 0.0);
        assert_eq!(seq.progress(0, 10.0), 0.0);
        assert!((seq.progress(0, 12.5) - 0.5).abs() < 1e-9);
        assert_eq!(seq.progress(0, 15.0), 1.0);
        assert_eq!(seq.progress(0, 20.0), 1.0);
    }

    #[test]
    fn test_progress_prefers_duration() {
        let seq = CueSequence::from_cues(vec![
            Cue::new(0.0, "a").with_duration(2.0),
            Cue::new(10.0, "b"),
        ]);
        assert!((seq.progress(0, 1.0) - 0.5).abs() < 1e-9);
        assert_eq!(seq.progress(0, 3.0), 1.0);
    }

    #[test]
    fn test_progress_last_cue_default_length() {
        let seq = sequence(&[10.0]);
        assert!((seq.progress(0, 12.5) - 0.5).abs() < 1e-9);
        assert_eq!(seq.progress(3, 12.5), 0.0);
    }

    #[test]
    fn test_display_timestamp() {
        let raw = Cue::new(62.5, "Hello").with_raw_timestamp("01:02.500");
        assert_eq!(raw.display_timestamp(), "01:02.500");

        let formatted = Cue::new(62.5, "Hello");
        assert_eq!(formatted.display_timestamp(), "01:02.50");
    }

    #[test]
    fn test_to_lrc() {
        let seq = CueSequence::from_cues(vec![Cue::new(15.0, "First"), Cue::new(62.5, "Second")]);
        assert_eq!(seq.to_lrc(), "[00:15.00]First\n[01:02.50]Second\n");
    }

    #[test]
    fn test_serialize_skips_missing_fields() {
        let seq = CueSequence::from_cues(vec![Cue::new(1.0, "a")]);
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, r#"[{"time":1.0,"text":"a"}]"#);
    }
}
