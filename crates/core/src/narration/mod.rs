use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timeline::Scheduler;

/// Fixed voice clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NarrationCue {
    Startup,
    Instructions,
    CameraStarted,
    PageAdded,
    AlreadyAdded,
    CodeNotRecognized,
    NoCodeFound,
    PageDeleted,
    CameraStopped,
    ArrivedHome,
    CameraUnavailable,
}

impl NarrationCue {
    /// Pause before the clip starts.
    pub fn delay_seconds(self) -> f32 {
        match self {
            NarrationCue::Startup => 0.1,
            NarrationCue::Instructions => 0.5,
            NarrationCue::ArrivedHome => 0.8,
            _ => 0.3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NarrationCue::Startup => "startup",
            NarrationCue::Instructions => "instructions",
            NarrationCue::CameraStarted => "camera-started",
            NarrationCue::PageAdded => "page-added",
            NarrationCue::AlreadyAdded => "already-added",
            NarrationCue::CodeNotRecognized => "code-not-recognized",
            NarrationCue::NoCodeFound => "no-code-found",
            NarrationCue::PageDeleted => "page-deleted",
            NarrationCue::CameraStopped => "camera-stopped",
            NarrationCue::ArrivedHome => "arrived-home",
            NarrationCue::CameraUnavailable => "camera-unavailable",
        }
    }
}

/// Per-product audio families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCategory {
    /// Spoken product name, played when a page comes into view.
    Name,
    /// Usage instructions for the product.
    Manual,
}

impl AudioCategory {
    pub fn delay_seconds(self) -> f32 {
        match self {
            AudioCategory::Name => 0.8,
            AudioCategory::Manual => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationRequest {
    Cue(NarrationCue),
    Named {
        scan_code: String,
        category: AudioCategory,
    },
}

/// Audio playback backend.
pub trait NarrationSink {
    fn play_cue(&mut self, cue: NarrationCue);

    fn play_named_audio(&mut self, scan_code: &str, category: AudioCategory);

    /// Whether a clip is currently audible.
    fn is_playing(&self) -> bool;

    fn tick(&mut self, _dt: f32) {}
}

/// Sink that plays nothing.
#[derive(Debug, Default)]
pub struct SilentSink;

impl NarrationSink for SilentSink {
    fn play_cue(&mut self, _cue: NarrationCue) {}

    fn play_named_audio(&mut self, _scan_code: &str, _category: AudioCategory) {}

    fn is_playing(&self) -> bool {
        false
    }
}

/// Fire-and-forget front end for the narration sink that applies start
/// delays and tracks whether narration is in progress.
pub struct Narrator {
    sink: Box<dyn NarrationSink>,
    pending: Scheduler<NarrationRequest>,
}

impl Narrator {
    pub fn new(sink: Box<dyn NarrationSink>) -> Self {
        Self {
            sink,
            pending: Scheduler::new(),
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(SilentSink))
    }

    pub fn cue(&mut self, cue: NarrationCue) {
        self.pending
            .schedule(cue.delay_seconds(), NarrationRequest::Cue(cue));
    }

    pub fn named(&mut self, scan_code: &str, category: AudioCategory) {
        self.pending.schedule(
            category.delay_seconds(),
            NarrationRequest::Named {
                scan_code: scan_code.to_string(),
                category,
            },
        );
    }

    /// True while a request is waiting for its delay or the sink is playing.
    pub fn is_playing(&self) -> bool {
        !self.pending.is_empty() || self.sink.is_playing()
    }

    pub fn tick(&mut self, dt: f32) {
        self.sink.tick(dt);
        for request in self.pending.tick(dt) {
            tracing::debug!(?request, "narration");
            match request {
                NarrationRequest::Cue(cue) => self.sink.play_cue(cue),
                NarrationRequest::Named {
                    scan_code,
                    category,
                } => self.sink.play_named_audio(&scan_code, category),
            }
        }
    }
}

impl fmt::Debug for Narrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Narrator")
            .field("pending", &self.pending.len())
            .field("sink_playing", &self.sink.is_playing())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn cues_play_after_their_delay() {
        let sink = RecordingSink::default();
        let mut narrator = Narrator::new(Box::new(sink.clone()));

        narrator.cue(NarrationCue::ArrivedHome);
        narrator.cue(NarrationCue::PageDeleted);
        assert!(narrator.is_playing());

        narrator.tick(0.4);
        assert_eq!(sink.cues(), vec![NarrationCue::PageDeleted]);

        narrator.tick(0.5);
        assert_eq!(
            sink.cues(),
            vec![NarrationCue::PageDeleted, NarrationCue::ArrivedHome]
        );
        assert!(!narrator.is_playing());
    }

    #[test]
    fn tracks_sink_playback() {
        let sink = RecordingSink::with_clip_seconds(1.0);
        let mut narrator = Narrator::new(Box::new(sink.clone()));

        narrator.named("4901234567894", AudioCategory::Name);
        narrator.tick(0.8);
        assert_eq!(sink.played.borrow().len(), 1);
        assert!(narrator.is_playing());

        narrator.tick(1.0);
        assert!(!narrator.is_playing());
    }
}
