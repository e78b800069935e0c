//! Camera lifecycle and capture scheduling.

use std::fmt;

use crate::config::DetectionConfig;
use crate::pool::{BufferPool, FrameBuffer, Pooled};
use crate::timeline::{Countdown, PlaybackClock};
use crate::Result;

/// Camera hardware.
pub trait Camera {
    fn start(&mut self) -> Result<()>;

    /// Whether the hardware is delivering frames after `start`.
    fn is_ready(&self) -> bool {
        true
    }

    /// Copies the current frame into `frame`.
    fn capture(&mut self, frame: &mut FrameBuffer) -> Result<()>;

    fn stop(&mut self);
}

/// Barcode decoding pipeline. The pool lends working buffers for
/// intermediate images.
pub trait FrameDecoder {
    fn decode(
        &mut self,
        frame: &FrameBuffer,
        scratch: &mut BufferPool<FrameBuffer>,
    ) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPhase {
    Idle,
    /// Fading in and waiting for the hardware.
    Starting,
    /// Camera live, capture timer running.
    Streaming,
    /// Capture timer elapsed and the frame is being grabbed. Held only
    /// inside the tick that grabs it; no tick ends in this phase.
    CaptureScheduled,
    /// Frame handed to the decoder.
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionEvent {
    Streaming,
    FrameCaptured,
    Recognized(String),
    NotRecognized { attempt: u32 },
    Stopped,
    Failed(String),
}

/// Why `start` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejection {
    AlreadyActive,
    FadeInProgress,
    CoolingDown,
    CarouselBusy,
    NarrationPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Rejected(StartRejection),
}

/// Conditions outside the session that block a new capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartGate {
    pub carousel_transitioning: bool,
    pub narration_playing: bool,
}

pub struct DetectionSession {
    config: DetectionConfig,
    camera: Box<dyn Camera>,
    decoder: Box<dyn FrameDecoder>,
    pool: BufferPool<FrameBuffer>,
    phase: DetectionPhase,
    clock: PlaybackClock,
    fade: Option<Countdown>,
    capture: Option<Countdown>,
    pending_frame: Option<Pooled<FrameBuffer>>,
    camera_started: bool,
    cooldown_until: Option<f32>,
    attempts: u32,
}

impl DetectionSession {
    pub fn new(
        config: DetectionConfig,
        camera: Box<dyn Camera>,
        decoder: Box<dyn FrameDecoder>,
    ) -> Self {
        let (width, height) = (config.frame_width, config.frame_height);
        Self {
            config,
            camera,
            decoder,
            pool: BufferPool::with_factory(move || FrameBuffer::with_size(width, height)),
            phase: DetectionPhase::Idle,
            clock: PlaybackClock::default(),
            fade: None,
            capture: None,
            pending_frame: None,
            camera_started: false,
            cooldown_until: None,
            attempts: 0,
        }
    }

    pub fn phase(&self) -> DetectionPhase {
        self.phase
    }

    /// Any phase other than `Idle`.
    pub fn is_active(&self) -> bool {
        self.phase != DetectionPhase::Idle
    }

    /// Camera fade lock, held while the preview fades in or out.
    pub fn is_animating_transition(&self) -> bool {
        self.fade.is_some()
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooldown_until
            .is_some_and(|until| self.clock.time_seconds < until)
    }

    pub fn pool(&self) -> &BufferPool<FrameBuffer> {
        &self.pool
    }

    pub fn start(&mut self, gate: StartGate) -> StartOutcome {
        let rejection = if self.is_active() {
            Some(StartRejection::AlreadyActive)
        } else if self.is_animating_transition() {
            Some(StartRejection::FadeInProgress)
        } else if self.is_cooling_down() {
            Some(StartRejection::CoolingDown)
        } else if gate.carousel_transitioning {
            Some(StartRejection::CarouselBusy)
        } else if gate.narration_playing {
            Some(StartRejection::NarrationPlaying)
        } else {
            None
        };
        if let Some(reason) = rejection {
            tracing::debug!(?reason, "capture start rejected");
            return StartOutcome::Rejected(reason);
        }

        tracing::info!("starting capture session");
        self.phase = DetectionPhase::Starting;
        self.fade = Some(Countdown::new(self.config.fade_in_seconds));
        self.attempts = 0;
        StartOutcome::Started
    }

    /// Cancels the session from any phase and fades the preview out.
    /// Returns `false` when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.shut_down();
        tracing::info!("capture session stopped");
        true
    }

    /// Stops any session and frees every pooled buffer. Returns the number of
    /// buffers released.
    pub fn shutdown(&mut self) -> usize {
        self.stop();
        self.pool.drain()
    }

    /// Advances timers and drives the state machine.
    pub fn tick(&mut self, dt: f32) -> Vec<DetectionEvent> {
        self.clock.advance(dt);
        let mut events = Vec::new();

        let fade_done = self.fade.as_mut().is_some_and(|fade| fade.tick(dt));
        // The fade-in is released by `enter_streaming`, every other fade here.
        if fade_done && self.phase != DetectionPhase::Starting {
            self.fade = None;
        }

        match self.phase {
            DetectionPhase::Idle | DetectionPhase::CaptureScheduled => {}
            DetectionPhase::Starting => {
                if self.fade.as_ref().is_some_and(Countdown::is_finished) {
                    self.enter_streaming(&mut events);
                }
            }
            DetectionPhase::Streaming => {
                if self.capture.as_mut().is_some_and(|capture| capture.tick(dt)) {
                    self.capture = None;
                    self.phase = DetectionPhase::CaptureScheduled;
                    self.take_snapshot(&mut events);
                }
            }
            DetectionPhase::Processing => self.process_frame(&mut events),
        }
        events
    }

    fn enter_streaming(&mut self, events: &mut Vec<DetectionEvent>) {
        if !self.camera_started {
            if let Err(err) = self.camera.start() {
                self.fail(err.to_string(), events);
                return;
            }
            self.camera_started = true;
        }
        if !self.camera.is_ready() {
            return;
        }
        tracing::info!("camera streaming");
        self.phase = DetectionPhase::Streaming;
        self.fade = Some(Countdown::new(self.config.reveal_seconds));
        self.capture = Some(Countdown::new(self.config.first_capture_delay_seconds));
        events.push(DetectionEvent::Streaming);
    }

    fn take_snapshot(&mut self, events: &mut Vec<DetectionEvent>) {
        let mut frame = self.pool.acquire();
        frame.ensure_size(self.config.frame_width, self.config.frame_height);
        match self.camera.capture(&mut frame) {
            Ok(()) => {
                self.pending_frame = Some(frame);
                self.phase = DetectionPhase::Processing;
                events.push(DetectionEvent::FrameCaptured);
            }
            Err(err) => {
                self.return_frame(frame);
                self.fail(err.to_string(), events);
            }
        }
    }

    fn process_frame(&mut self, events: &mut Vec<DetectionEvent>) {
        let Some(frame) = self.pending_frame.take() else {
            self.rearm();
            return;
        };
        let decoded = self.decoder.decode(&frame, &mut self.pool);
        self.return_frame(frame);

        match decoded {
            Ok(Some(code)) if !code.is_empty() => {
                tracing::info!(code = %code, "code recognized");
                self.shut_down();
                self.cooldown_until = Some(self.clock.time_seconds + self.config.cooldown_seconds);
                events.push(DetectionEvent::Recognized(code));
            }
            Ok(_) => {
                self.attempts += 1;
                tracing::debug!(attempt = self.attempts, "no code in frame, retrying");
                self.rearm();
                events.push(DetectionEvent::NotRecognized {
                    attempt: self.attempts,
                });
            }
            Err(err) => self.fail(err.to_string(), events),
        }
    }

    fn rearm(&mut self) {
        self.phase = DetectionPhase::Streaming;
        self.capture = Some(Countdown::new(self.config.retry_delay_seconds));
    }

    fn fail(&mut self, reason: String, events: &mut Vec<DetectionEvent>) {
        tracing::warn!(%reason, "capture session failed");
        self.shut_down();
        events.push(DetectionEvent::Failed(reason));
        events.push(DetectionEvent::Stopped);
    }

    fn shut_down(&mut self) {
        self.capture = None;
        if let Some(frame) = self.pending_frame.take() {
            self.return_frame(frame);
        }
        self.camera.stop();
        self.camera_started = false;
        self.phase = DetectionPhase::Idle;
        self.fade = Some(Countdown::new(self.config.fade_out_seconds));
    }

    fn return_frame(&mut self, frame: Pooled<FrameBuffer>) {
        if let Err(err) = self.pool.release(frame) {
            tracing::warn!(%err, "frame buffer not returned to pool");
        }
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        self.pool.drain();
    }
}

impl fmt::Debug for DetectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionSession")
            .field("phase", &self.phase)
            .field("fading", &self.fade.is_some())
            .field("cooldown_until", &self.cooldown_until)
            .field("attempts", &self.attempts)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::CatalogError;

    #[derive(Debug, Default)]
    pub struct CameraLog {
        pub starts: u32,
        pub stops: u32,
        pub captures: u32,
        pub ready: bool,
        pub fail_start: bool,
        pub fail_capture: bool,
    }

    /// Camera whose behaviour and call counts are shared with the test.
    #[derive(Clone)]
    pub struct FakeCamera(pub Rc<RefCell<CameraLog>>);

    impl FakeCamera {
        pub fn new() -> Self {
            Self(Rc::new(RefCell::new(CameraLog {
                ready: true,
                ..Default::default()
            })))
        }
    }

    impl Camera for FakeCamera {
        fn start(&mut self) -> Result<()> {
            let mut log = self.0.borrow_mut();
            if log.fail_start {
                return Err(CatalogError::CameraUnavailable("no device".to_string()));
            }
            log.starts += 1;
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.0.borrow().ready
        }

        fn capture(&mut self, frame: &mut FrameBuffer) -> Result<()> {
            let mut log = self.0.borrow_mut();
            if log.fail_capture {
                return Err(CatalogError::CameraUnavailable("frame dropped".to_string()));
            }
            log.captures += 1;
            frame.pixels.fill(0x7F);
            Ok(())
        }

        fn stop(&mut self) {
            self.0.borrow_mut().stops += 1;
        }
    }

    /// Decoder that answers from a script; an exhausted script decodes
    /// nothing.
    #[derive(Clone, Default)]
    pub struct ScriptedDecoder(pub Rc<RefCell<VecDeque<String>>>);

    impl ScriptedDecoder {
        pub fn with_results(results: &[&str]) -> Self {
            Self(Rc::new(RefCell::new(
                results.iter().map(|result| result.to_string()).collect(),
            )))
        }
    }

    impl FrameDecoder for ScriptedDecoder {
        fn decode(
            &mut self,
            frame: &FrameBuffer,
            scratch: &mut BufferPool<FrameBuffer>,
        ) -> Result<Option<String>> {
            let mut gray = scratch.acquire();
            gray.ensure_size(frame.width, frame.height);
            scratch.release(gray)?;
            Ok(self.0.borrow_mut().pop_front())
        }
    }

    /// Decoder whose pipeline always errors after touching its scratch pool.
    pub struct BrokenDecoder;

    impl FrameDecoder for BrokenDecoder {
        fn decode(
            &mut self,
            frame: &FrameBuffer,
            scratch: &mut BufferPool<FrameBuffer>,
        ) -> Result<Option<String>> {
            let mut gray = scratch.acquire();
            gray.ensure_size(frame.width, frame.height);
            scratch.release(gray)?;
            Err("decoder crashed".into())
        }
    }
}
