//! Input scripts for replaying a session without camera or audio hardware.
//!
//! A script is a JSON file listing input steps. Each step is fed to the
//! orchestrator `repeat` times with the script's fixed frame delta:
//!
//! ```json
//! {
//!   "dt": 0.05,
//!   "decode_results": ["", "4901234567894"],
//!   "steps": [
//!     { "repeat": 20 },
//!     { "touches": [{ "phase": "began", "x": 0, "y": 1000 }] },
//!     { "touches": [{ "phase": "moved", "x": 0, "y": 200 }] },
//!     { "touches": [{ "phase": "ended", "x": 0, "y": 200 }] },
//!     { "repeat": 140 }
//!   ]
//! }
//! ```

use std::collections::VecDeque;
use std::path::Path;

use scan_carousel_core::{
    AudioCategory, BufferPool, Camera, FrameBuffer, FrameDecoder, InputFrame, NarrationCue,
    NarrationSink, Result, TouchPhase, TouchSample,
};
use serde::Deserialize;

fn default_dt() -> f32 {
    1.0 / 60.0
}

fn default_clip_seconds() -> f32 {
    1.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Answers handed out by the decoder, one per captured frame. An empty
    /// string is a frame without a readable code.
    #[serde(default)]
    pub decode_results: Vec<String>,
    /// Simulated length of every narration clip.
    #[serde(default = "default_clip_seconds")]
    pub clip_seconds: f32,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn total_ticks(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.repeat)).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Step {
    pub repeat: u32,
    pub touches: Vec<ScriptTouch>,
    pub motion_magnitude: f32,
    /// Press the capture button before the first tick of this step.
    pub camera_button: bool,
    /// Ask for the current page's instructions before the first tick.
    pub manual: bool,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            repeat: 1,
            touches: Vec::new(),
            motion_magnitude: 0.0,
            camera_button: false,
            manual: false,
        }
    }
}

impl Step {
    pub fn frame(&self, dt: f32) -> InputFrame {
        InputFrame {
            dt,
            touches: self
                .touches
                .iter()
                .map(|touch| TouchSample::new(touch.phase, touch.x, touch.y))
                .collect(),
            motion_magnitude: self.motion_magnitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptTouch {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

/// Camera that produces a flat grey frame on every capture.
#[derive(Debug, Default)]
pub struct ScriptedCamera {
    running: bool,
    captures: u64,
}

impl Camera for ScriptedCamera {
    fn start(&mut self) -> Result<()> {
        self.running = true;
        tracing::debug!("scripted camera started");
        Ok(())
    }

    fn capture(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        if !self.running {
            return Err("capture requested from a stopped camera".into());
        }
        self.captures += 1;
        frame.pixels.fill(0x80);
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            tracing::debug!(captures = self.captures, "scripted camera stopped");
        }
        self.running = false;
    }
}

/// Decoder that answers from the script's `decode_results`.
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    results: VecDeque<String>,
}

impl ScriptedDecoder {
    pub fn new(results: Vec<String>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn decode(
        &mut self,
        frame: &FrameBuffer,
        scratch: &mut BufferPool<FrameBuffer>,
    ) -> Result<Option<String>> {
        // Luma pass into a pooled working buffer, as a real decoder would.
        let mut luma = scratch.acquire();
        luma.ensure_size(frame.width, frame.height);
        for (dst, src) in luma
            .pixels
            .chunks_exact_mut(FrameBuffer::CHANNELS)
            .zip(frame.pixels.chunks_exact(FrameBuffer::CHANNELS))
        {
            let y = (u16::from(src[0]) * 3 + u16::from(src[1]) * 4 + u16::from(src[2])) / 8;
            dst[..3].fill(y as u8);
            dst[3] = src[3];
        }
        scratch.release(luma)?;
        Ok(self.results.pop_front())
    }
}

/// Narration sink that logs each clip and holds `is_playing` for a fixed
/// clip length.
#[derive(Debug)]
pub struct LogSink {
    clip_seconds: f32,
    remaining: f32,
}

impl LogSink {
    pub fn new(clip_seconds: f32) -> Self {
        Self {
            clip_seconds,
            remaining: 0.0,
        }
    }
}

impl NarrationSink for LogSink {
    fn play_cue(&mut self, cue: NarrationCue) {
        tracing::info!(cue = cue.as_str(), "narration");
        self.remaining = self.clip_seconds;
    }

    fn play_named_audio(&mut self, scan_code: &str, category: AudioCategory) {
        tracing::info!(scan_code, ?category, "narration");
        self.remaining = self.clip_seconds;
    }

    fn is_playing(&self) -> bool {
        self.remaining > 0.0
    }

    fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_default_to_a_single_idle_tick() {
        let script: Script = serde_json::from_str(
            r#"{ "steps": [{}, { "repeat": 3, "motion_magnitude": 60.0 }] }"#,
        )
        .unwrap();

        assert_eq!(script.total_ticks(), 4);
        assert_eq!(script.steps[0].frame(script.dt), InputFrame::idle(1.0 / 60.0));
        assert_eq!(script.steps[1].frame(0.1), InputFrame::motion(0.1, 60.0));
    }

    #[test]
    fn touches_become_samples() {
        let step: Step =
            serde_json::from_str(r#"{ "touches": [{ "phase": "moved", "x": 3, "y": 4 }] }"#)
                .unwrap();

        assert_eq!(
            step.frame(0.05),
            InputFrame::touch(0.05, TouchPhase::Moved, 3.0, 4.0)
        );
    }

    #[test]
    fn decoder_hands_out_results_in_order() {
        let mut decoder = ScriptedDecoder::new(vec![String::new(), "42".to_string()]);
        let mut pool = BufferPool::<FrameBuffer>::new();
        let frame = FrameBuffer::with_size(4, 2);

        assert_eq!(decoder.decode(&frame, &mut pool).unwrap(), Some(String::new()));
        assert_eq!(
            decoder.decode(&frame, &mut pool).unwrap(),
            Some("42".to_string())
        );
        assert_eq!(decoder.decode(&frame, &mut pool).unwrap(), None);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn log_sink_holds_for_clip_length() {
        let mut sink = LogSink::new(1.0);
        sink.play_cue(NarrationCue::Startup);
        sink.tick(0.6);
        assert!(sink.is_playing());
        sink.tick(0.6);
        assert!(!sink.is_playing());
    }
}
