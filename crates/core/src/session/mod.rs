//! Top-level coordinator.

use std::collections::VecDeque;
use std::fmt;

use crate::assets::ContentLookup;
use crate::carousel::{CarouselOutcome, CarouselStore};
use crate::config::SessionConfig;
use crate::detection::{DetectionEvent, DetectionSession, StartGate, StartOutcome};
use crate::gesture::{GestureClassifier, GestureContext, GestureEvent, InputFrame};
use crate::narration::{AudioCategory, NarrationCue, Narrator};
use crate::timeline::Countdown;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub gestures: Vec<GestureEvent>,
    pub detection: Vec<DetectionEvent>,
    /// The carousel released its transition guard this tick.
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPage {
    content_id: String,
    scan_code: String,
}

pub struct SessionOrchestrator {
    classifier: GestureClassifier,
    detection: DetectionSession,
    carousel: CarouselStore,
    lookup: Box<dyn ContentLookup>,
    narrator: Narrator,
    warmup: Countdown,
    pending_pages: VecDeque<PendingPage>,
}

impl SessionOrchestrator {
    pub fn new(
        config: &SessionConfig,
        classifier: GestureClassifier,
        detection: DetectionSession,
        carousel: CarouselStore,
        lookup: Box<dyn ContentLookup>,
        mut narrator: Narrator,
    ) -> Self {
        narrator.cue(NarrationCue::Startup);
        Self {
            classifier,
            detection,
            carousel,
            lookup,
            narrator,
            warmup: Countdown::new(config.warmup_seconds),
            pending_pages: VecDeque::new(),
        }
    }

    pub fn carousel(&self) -> &CarouselStore {
        &self.carousel
    }

    pub fn detection(&self) -> &DetectionSession {
        &self.detection
    }

    pub fn is_warming_up(&self) -> bool {
        !self.warmup.is_finished()
    }

    /// Gesture gating derived from the state before this tick's input.
    fn gesture_context(&self) -> GestureContext {
        GestureContext {
            gated: self.is_warming_up()
                || self.carousel.is_transitioning()
                || self.detection.is_animating_transition(),
            capture_active: self.detection.is_active(),
            on_home_page: self.carousel.current_index() == 0,
        }
    }

    pub fn tick(&mut self, frame: &InputFrame) -> TickReport {
        let context = self.gesture_context();
        let gestures = self.classifier.classify(frame, context);
        for gesture in &gestures {
            self.apply_gesture(*gesture);
        }

        self.warmup.tick(frame.dt);
        self.narrator.tick(frame.dt);
        let settled = self.carousel.tick(frame.dt);
        let detection = self.detection.tick(frame.dt);
        for event in &detection {
            self.apply_detection(event);
        }
        self.flush_pending_pages();

        TickReport {
            gestures,
            detection,
            settled,
        }
    }

    /// The capture button on the home page.
    pub fn press_camera_button(&mut self) -> StartOutcome {
        self.start_capture()
    }

    /// Plays the usage instructions of the page in view, if it has any.
    pub fn request_manual(&mut self) {
        if let Some(code) = self.carousel.current_scan_code() {
            let code = code.to_string();
            self.narrator.named(&code, AudioCategory::Manual);
        }
    }

    /// Stops any capture and frees pooled frame buffers.
    pub fn shutdown(&mut self) {
        let drained = self.detection.shutdown();
        tracing::info!(drained, "session shut down");
    }

    fn apply_gesture(&mut self, gesture: GestureEvent) {
        tracing::debug!(?gesture, "gesture");
        let current = self.carousel.current_index();
        match gesture {
            GestureEvent::SwipeRight => {
                if current > 0 {
                    self.go_to(current - 1);
                }
            }
            GestureEvent::SwipeLeft => {
                if current + 1 < self.carousel.total_pages() {
                    self.go_to(current + 1);
                }
            }
            GestureEvent::ScrollHome => {
                if self.detection.is_active() || self.narrator.is_playing() {
                    return;
                }
                if current == 0 {
                    self.narrator.cue(NarrationCue::Instructions);
                } else {
                    self.go_to(0);
                }
            }
            GestureEvent::ScrollDetect => {
                if self.detection.is_active() {
                    if self.detection.stop() {
                        self.narrator.cue(NarrationCue::CameraStopped);
                    }
                } else {
                    self.start_capture();
                }
            }
            GestureEvent::RequestDelete => self.delete_current(),
        }
    }

    fn start_capture(&mut self) -> StartOutcome {
        self.detection.start(StartGate {
            carousel_transitioning: self.carousel.is_transitioning(),
            narration_playing: self.narrator.is_playing(),
        })
    }

    fn go_to(&mut self, target: usize) {
        if self.carousel.navigate(target) != CarouselOutcome::Applied {
            return;
        }
        if target == 0 {
            self.narrator.cue(NarrationCue::ArrivedHome);
        } else if let Some(code) = self.carousel.current_scan_code() {
            let code = code.to_string();
            self.narrator.named(&code, AudioCategory::Name);
        }
    }

    fn delete_current(&mut self) {
        match self.carousel.request_delete() {
            Ok(CarouselOutcome::Deleted { .. }) => self.narrator.cue(NarrationCue::PageDeleted),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "page deleted but snapshot not saved");
                self.narrator.cue(NarrationCue::PageDeleted);
            }
        }
    }

    fn apply_detection(&mut self, event: &DetectionEvent) {
        match event {
            DetectionEvent::Streaming => self.narrator.cue(NarrationCue::CameraStarted),
            DetectionEvent::Recognized(code) => self.resolve_scan(code),
            DetectionEvent::NotRecognized { attempt: 1 } => {
                self.narrator.cue(NarrationCue::NoCodeFound)
            }
            DetectionEvent::Failed(_) => self.narrator.cue(NarrationCue::CameraUnavailable),
            DetectionEvent::FrameCaptured
            | DetectionEvent::NotRecognized { .. }
            | DetectionEvent::Stopped => {}
        }
    }

    fn resolve_scan(&mut self, scan_code: &str) {
        let Some(content_id) = self.lookup.lookup(scan_code) else {
            tracing::info!(scan_code, "scan code not in catalog");
            self.narrator.cue(NarrationCue::CodeNotRecognized);
            return;
        };

        let queued = self
            .pending_pages
            .iter()
            .any(|page| page.scan_code == scan_code || page.content_id == content_id);
        if queued
            || self.carousel.contains_scan_code(scan_code)
            || self.carousel.contains_content(&content_id)
        {
            tracing::info!(scan_code, %content_id, "content already has a page");
            self.narrator.cue(NarrationCue::AlreadyAdded);
            return;
        }

        self.narrator.cue(NarrationCue::PageAdded);
        self.pending_pages.push_back(PendingPage {
            content_id,
            scan_code: scan_code.to_string(),
        });
    }

    /// Appends recognized pages once the carousel guard is free.
    fn flush_pending_pages(&mut self) {
        while !self.carousel.is_transitioning() {
            let Some(page) = self.pending_pages.pop_front() else {
                return;
            };
            let Some(content) = self.lookup.instantiate(&page.content_id) else {
                tracing::warn!(content_id = %page.content_id, "content failed to instantiate");
                continue;
            };
            match self.carousel.append(content, Some(page.scan_code)) {
                Ok(CarouselOutcome::Applied) => {}
                Ok(outcome) => tracing::debug!(?outcome, "recognized page not appended"),
                Err(err) => tracing::warn!(%err, "page added but snapshot not saved"),
            }
        }
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.detection.stop();
    }
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("carousel", &self.carousel)
            .field("detection", &self.detection)
            .field("narrator", &self.narrator)
            .field("warming_up", &self.is_warming_up())
            .field("pending_pages", &self.pending_pages.len())
            .finish()
    }
}
