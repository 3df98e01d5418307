use lyricflow_core::{CueChange, CueObserver, CueSequence, DisplayConfig};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Prints the lines around the active cue each time it changes
pub struct ConsoleRenderer<W = io::Stdout> {
    display: DisplayConfig,
    out: W,
}

impl ConsoleRenderer {
    #[must_use]
    pub fn stdout(display: DisplayConfig) -> Self {
        Self::new(display, io::stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub const fn new(display: DisplayConfig, out: W) -> Self {
        Self { display, out }
    }
}

impl<W: Write> CueObserver for ConsoleRenderer<W> {
    fn on_active_cue_changed(&mut self, change: CueChange, cues: &CueSequence) {
        let frame = render_frame(cues, change.current, &self.display);
        // A closed stdout is not worth stopping playback for
        let _ = writeln!(self.out, "{frame}");
        let _ = self.out.flush();
    }
}

/// Render the display window around `active`.
///
/// The active line is marked with `>`. Before the first cue starts the
/// window shows the upcoming lines with nothing marked.
#[must_use]
pub fn render_frame(cues: &CueSequence, active: Option<usize>, display: &DisplayConfig) -> String {
    let active_cue = active.and_then(|index| cues.get(index));
    let mut frame = String::new();

    for cue in cues.visible_window(active, display.lines_before, display.lines_after) {
        let marker = if active_cue.is_some_and(|a| std::ptr::eq(a, cue)) {
            '>'
        } else {
            ' '
        };
        if display.show_timestamps {
            let _ = writeln!(frame, "{marker} {}  {}", cue.display_timestamp(), cue.text);
        } else {
            let _ = writeln!(frame, "{marker} {}", cue.text);
        }
    }

    frame
}
