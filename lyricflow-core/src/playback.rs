use std::time::{Duration, Instant};

/// Read-only view of a media source's playback position.
///
/// This is all the sync engine's host needs from a player: no transport
/// controls are assumed.
pub trait MediaClock {
    /// Current playback position in seconds
    fn position(&self) -> f64;

    /// Track length in seconds, if known
    fn duration(&self) -> Option<f64>;

    /// Whether playback has reached the end of a track of known length
    fn has_ended(&self) -> bool {
        self.duration().is_some_and(|d| self.position() >= d)
    }
}

/// Playback state of a media source, interpolated between updates
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Whether media is currently playing
    pub is_playing: bool,
    /// Position in seconds at `updated_at`
    pub position: f64,
    /// Total track length in seconds
    pub duration: Option<f64>,
    /// When this state was last updated (for interpolation)
    pub updated_at: Instant,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: 0.0,
            duration: None,
            updated_at: Instant::now(),
        }
    }
}

impl PlaybackState {
    /// Create a new playback state
    #[must_use]
    pub fn new(is_playing: bool, position: f64, duration: Option<f64>) -> Self {
        Self {
            is_playing,
            position: sanitize_position(position),
            duration,
            updated_at: Instant::now(),
        }
    }

    /// Get interpolated position based on time elapsed since last update
    #[must_use]
    pub fn interpolated_position(&self) -> f64 {
        if !self.is_playing {
            return self.position;
        }

        let interpolated = self.position + self.updated_at.elapsed().as_secs_f64();

        // Clamp to track duration
        match self.duration {
            Some(duration) => interpolated.min(duration),
            None => interpolated,
        }
    }

    /// Start or resume playback from the current position
    pub fn play(&mut self) {
        if !self.is_playing {
            self.updated_at = Instant::now();
            self.is_playing = true;
        }
    }

    /// Pause playback, freezing the interpolated position
    pub fn pause(&mut self) {
        if self.is_playing {
            self.position = self.interpolated_position();
            self.updated_at = Instant::now();
            self.is_playing = false;
        }
    }

    /// Jump to `position` seconds, clamped to the track
    pub fn seek(&mut self, position: f64) {
        let position = sanitize_position(position);
        self.position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.updated_at = Instant::now();
    }

    /// Check if playback state changed (playing <-> paused)
    #[must_use]
    pub const fn playback_state_changed(&self, other: &Self) -> bool {
        self.is_playing != other.is_playing
    }

    /// Check if a seek occurred (position jumped unexpectedly)
    #[must_use]
    pub fn seek_occurred(&self, other: &Self, threshold: Duration) -> bool {
        // Calculate expected position based on elapsed time
        let expected = self.interpolated_position();
        let actual = other.position;

        // If the difference is larger than threshold, a seek occurred
        (actual - expected).abs() > threshold.as_secs_f64()
    }
}

impl MediaClock for PlaybackState {
    fn position(&self) -> f64 {
        self.interpolated_position()
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }
}

fn sanitize_position(position: f64) -> f64 {
    if position.is_finite() {
        position.max(0.0)
    } else {
        0.0
    }
}
