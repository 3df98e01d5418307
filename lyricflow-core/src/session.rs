//! A song's lyrics session: parser, sync engine and offset memory together.

use crate::cue::CueSequence;
use crate::error::Result;
use crate::offsets::OffsetStore;
use crate::parser::{CueParser, LyricsMetadata};
use crate::sync::{CueObserver, ObserverId, SyncEngine};
use tracing::info;

/// Lyrics for the currently loaded song.
///
/// Loading a song resets the offset to zero and then restores any offset the
/// store remembers for that song. Offset changes are written back to the
/// store immediately but, like the engine's, only take effect on the next
/// [`tick`](Self::tick).
#[derive(Debug)]
pub struct LyricsSession<S> {
    parser: CueParser,
    engine: SyncEngine,
    store: S,
    song_id: Option<String>,
    metadata: LyricsMetadata,
    apply_offset_tag: bool,
}

impl<S: OffsetStore> LyricsSession<S> {
    #[must_use]
    pub fn new(parser: CueParser, store: S) -> Self {
        Self {
            parser,
            engine: SyncEngine::new(),
            store,
            song_id: None,
            metadata: LyricsMetadata::default(),
            apply_offset_tag: false,
        }
    }

    /// Seed the offset from an `[offset:]` tag when the store has no entry
    #[must_use]
    pub fn with_offset_tag(mut self, apply: bool) -> Self {
        self.apply_offset_tag = apply;
        self
    }

    /// Parse `lyrics` and load them as song `song_id`
    pub fn load_song(&mut self, song_id: impl Into<String>, lyrics: &str) -> &CueSequence {
        let song_id = song_id.into();
        let parsed = self.parser.parse_document(lyrics);

        self.engine.load(parsed.cues);

        let offset = self.store.get(&song_id).or_else(|| {
            if self.apply_offset_tag {
                parsed.metadata.offset_secs()
            } else {
                None
            }
        });
        if let Some(offset) = offset {
            self.engine.set_offset(offset);
        }

        info!(
            "Loaded {} with {} cue(s), offset {}s",
            song_id,
            self.engine.cues().len(),
            self.engine.offset()
        );

        self.song_id = Some(song_id);
        self.metadata = parsed.metadata;
        self.engine.cues()
    }

    /// Drop the current song
    pub fn unload(&mut self) {
        self.engine.clear();
        self.song_id = None;
        self.metadata = LyricsMetadata::default();
    }

    /// Evaluate the active cue at `current_time` seconds
    pub fn tick(&mut self, current_time: f64) -> Option<usize> {
        self.engine.tick(current_time)
    }

    /// Shift the offset by `delta` seconds and remember it for this song.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset store cannot persist the new value.
    pub fn adjust_offset(&mut self, delta: f64) -> Result<f64> {
        if self.engine.adjust_offset(delta) {
            self.persist_offset()?;
        }
        Ok(self.engine.offset())
    }

    /// Set the offset to `offset` seconds and remember it for this song.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset store cannot persist the new value.
    pub fn set_offset(&mut self, offset: f64) -> Result<f64> {
        if self.engine.set_offset(offset) {
            self.persist_offset()?;
        }
        Ok(self.engine.offset())
    }

    /// Return the offset to zero and forget the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset store cannot persist the removal.
    pub fn reset_offset(&mut self) -> Result<()> {
        self.engine.set_offset(0.0);
        if let Some(song_id) = &self.song_id {
            self.store.remove(song_id)?;
        }
        Ok(())
    }

    /// Register an observer for active cue changes
    pub fn subscribe(&mut self, observer: impl CueObserver + 'static) -> ObserverId {
        self.engine.subscribe(observer)
    }

    #[must_use]
    pub const fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    #[must_use]
    pub fn song_id(&self) -> Option<&str> {
        self.song_id.as_deref()
    }

    #[must_use]
    pub const fn metadata(&self) -> &LyricsMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn persist_offset(&mut self) -> Result<()> {
        match &self.song_id {
            Some(song_id) => self.store.set(song_id, self.engine.offset()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offsets::MemoryOffsetStore;
    use crate::sync::CueChange;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SONG_A: &str = "[ti:Song A]\n[00:10]One\n[00:20]Two";
    const SONG_B: &str = "[offset:1500]\n[00:05]Three";

    fn session() -> LyricsSession<MemoryOffsetStore> {
        LyricsSession::new(CueParser::new(), MemoryOffsetStore::new())
    }

    #[test]
    fn test_load_song() {
        let mut session = session();
        let cues = session.load_song("a", SONG_A);
        assert_eq!(cues.len(), 2);
        assert_eq!(session.song_id(), Some("a"));
        assert_eq!(session.metadata().title.as_deref(), Some("Song A"));
        assert_eq!(session.tick(10.0), Some(0));
    }

    #[test]
    fn test_offset_remembered_per_song() {
        let mut session = session();
        session.load_song("a", SONG_A);
        assert_eq!(session.adjust_offset(0.5).unwrap(), 0.5);
        assert_eq!(session.adjust_offset(0.5).unwrap(), 1.0);
        assert_eq!(session.store().get("a"), Some(1.0));

        session.load_song("b", SONG_B);
        assert_eq!(session.engine().offset(), 0.0);

        session.load_song("a", SONG_A);
        assert_eq!(session.engine().offset(), 1.0);
        assert_eq!(session.tick(10.5), None);
        assert_eq!(session.tick(11.0), Some(0));
    }

    #[test]
    fn test_offset_waits_for_tick() {
        let mut session = session();
        session.load_song("a", SONG_A);
        assert_eq!(session.tick(10.2), Some(0));
        session.set_offset(0.5).unwrap();
        assert_eq!(session.engine().active_index(), Some(0));
        assert_eq!(session.tick(10.2), None);
    }

    #[test]
    fn test_reset_offset_forgets() {
        let mut session = session();
        session.load_song("a", SONG_A);
        session.set_offset(-2.0).unwrap();
        session.reset_offset().unwrap();
        assert_eq!(session.engine().offset(), 0.0);
        assert_eq!(session.store().get("a"), None);
    }

    #[test]
    fn test_offset_tag_seeds_when_enabled() {
        let mut session = session().with_offset_tag(true);
        session.load_song("b", SONG_B);
        assert_eq!(session.engine().offset(), 1.5);

        let mut session = self::session();
        session.load_song("b", SONG_B);
        assert_eq!(session.engine().offset(), 0.0);
    }

    #[test]
    fn test_stored_offset_beats_tag() {
        let mut store = MemoryOffsetStore::new();
        store.set("b", -0.25).unwrap();
        let mut session = LyricsSession::new(CueParser::new(), store).with_offset_tag(true);
        session.load_song("b", SONG_B);
        assert_eq!(session.engine().offset(), -0.25);
    }

    #[test]
    fn test_rejected_offset_not_persisted() {
        let mut session = session();
        session.load_song("a", SONG_A);
        assert_eq!(session.set_offset(f64::NAN).unwrap(), 0.0);
        assert_eq!(session.adjust_offset(f64::INFINITY).unwrap(), 0.0);
        assert_eq!(session.store().get("a"), None);

        session.set_offset(0.5).unwrap();
        session.adjust_offset(f64::NEG_INFINITY).unwrap();
        assert_eq!(session.store().get("a"), Some(0.5));
    }

    #[test]
    fn test_unload() {
        let mut session = session();
        session.load_song("a", SONG_A);
        session.unload();
        assert_eq!(session.song_id(), None);
        assert_eq!(session.tick(15.0), None);

        // No song: offset changes are not persisted anywhere
        session.adjust_offset(1.0).unwrap();
        assert_eq!(session.store().get("a"), None);
    }

    #[test]
    fn test_observers_survive_song_changes() {
        let mut session = session();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        session.subscribe(move |change: CueChange, _: &CueSequence| {
            sink.borrow_mut().push(change.current);
        });

        session.load_song("a", SONG_A);
        session.tick(20.0);
        session.load_song("b", SONG_B);
        session.tick(5.0);

        assert_eq!(*changes.borrow(), vec![Some(1), Some(0)]);
    }
}
