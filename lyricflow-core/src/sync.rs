//! Playback synchronization: maps playback time onto the active cue.
//!
//! The engine is synchronous and single-threaded. Hosts feed it the current
//! playback position on every tick; observers hear about each change of the
//! active cue exactly once.

use crate::cue::{Cue, CueSequence};
use std::fmt;
use tracing::{debug, trace, warn};

/// Transition of the active cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueChange {
    /// Previously active cue, `None` if no cue had started
    pub previous: Option<usize>,
    /// Newly active cue, `None` if the adjusted time precedes every cue
    pub current: Option<usize>,
}

/// Receives active cue changes from a [`SyncEngine`].
///
/// Implemented for any `FnMut(CueChange, &CueSequence)` closure.
pub trait CueObserver {
    fn on_active_cue_changed(&mut self, change: CueChange, cues: &CueSequence);
}

impl<F> CueObserver for F
where
    F: FnMut(CueChange, &CueSequence),
{
    fn on_active_cue_changed(&mut self, change: CueChange, cues: &CueSequence) {
        self(change, cues);
    }
}

/// Handle returned by [`SyncEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Whether the engine has any cues to track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing loaded (or an empty sequence); every tick reports `None`
    Idle,
    /// Tracking an active index over a non-empty sequence
    Active,
}

/// Cue sequence, offset and last reported index for the loaded song
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    cues: CueSequence,
    offset: f64,
    active: Option<usize>,
}

impl SyncState {
    /// Fresh state for `cues` with a zero offset and no active cue
    #[must_use]
    pub const fn new(cues: CueSequence) -> Self {
        Self {
            cues,
            offset: 0.0,
            active: None,
        }
    }

    #[must_use]
    pub const fn cues(&self) -> &CueSequence {
        &self.cues
    }

    /// Seconds subtracted from playback time before lookup
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Last reported active index
    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        if self.cues.is_empty() {
            SyncPhase::Idle
        } else {
            SyncPhase::Active
        }
    }

    /// Index active at `current_time` under the current offset.
    ///
    /// Depends only on the cues, the offset and `current_time`; the last
    /// reported index plays no part.
    #[must_use]
    pub fn resolve(&self, current_time: f64) -> Option<usize> {
        self.cues.active_index_at(current_time - self.offset)
    }
}

/// Engine that tracks the active cue for a stream of playback times
pub struct SyncEngine {
    state: SyncState,
    observers: Vec<(ObserverId, Box<dyn CueObserver>)>,
    next_observer_id: u64,
}

impl SyncEngine {
    /// Create an idle engine with no cues loaded
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SyncState::default(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Register an observer for active cue changes
    pub fn subscribe(&mut self, observer: impl CueObserver + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Replace the cues, reset the offset to zero and clear the active cue.
    ///
    /// Loading does not notify observers; the next [`tick`](Self::tick)
    /// reports from a clean `None`.
    pub fn load(&mut self, cues: CueSequence) {
        debug!("Loaded {} cue(s), offset reset", cues.len());
        self.state = SyncState::new(cues);
    }

    /// Replace the cues and clear the active cue, keeping the current offset
    pub fn load_preserving_offset(&mut self, cues: CueSequence) {
        debug!(
            "Loaded {} cue(s), keeping offset {}s",
            cues.len(),
            self.state.offset
        );
        let offset = self.state.offset;
        self.state = SyncState::new(cues);
        self.state.offset = offset;
    }

    /// Drop the loaded cues and return to [`SyncPhase::Idle`]
    pub fn clear(&mut self) {
        self.load(CueSequence::new());
    }

    /// Evaluate the active cue at `current_time` (seconds).
    ///
    /// Observers are notified once if the index differs from the last
    /// reported one. Negative and `NaN` times resolve to `None`.
    pub fn tick(&mut self, current_time: f64) -> Option<usize> {
        let current = self.state.resolve(current_time);
        let previous = self.state.active;

        if current != previous {
            trace!(
                "Active cue {:?} -> {:?} at {}s",
                previous,
                current,
                current_time
            );
            self.state.active = current;
            let change = CueChange { previous, current };
            for (_, observer) in &mut self.observers {
                observer.on_active_cue_changed(change, &self.state.cues);
            }
        }

        current
    }

    /// Shift the offset by `delta` seconds. Takes effect on the next tick.
    ///
    /// Non-finite results are ignored; returns whether the offset was applied.
    pub fn adjust_offset(&mut self, delta: f64) -> bool {
        let offset = self.state.offset + delta;
        if offset.is_finite() {
            self.state.offset = offset;
            true
        } else {
            warn!("Ignoring offset adjustment by {}s", delta);
            false
        }
    }

    /// Set the offset to `offset` seconds. Takes effect on the next tick.
    ///
    /// Non-finite values are ignored; returns whether the offset was applied.
    pub fn set_offset(&mut self, offset: f64) -> bool {
        if offset.is_finite() {
            self.state.offset = offset;
            true
        } else {
            warn!("Ignoring non-finite offset {}", offset);
            false
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SyncState {
        &self.state
    }

    #[must_use]
    pub const fn cues(&self) -> &CueSequence {
        self.state.cues()
    }

    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.state.offset()
    }

    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.state.active_index()
    }

    #[must_use]
    pub fn active_cue(&self) -> Option<&Cue> {
        self.state.active.and_then(|i| self.state.cues.get(i))
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.state.phase()
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}
