//! Core library for the scan carousel.
//!
//! A horizontally scrolling set of product pages driven by touch gestures,
//! device shakes and a barcode camera. Every subsystem is advanced from a
//! single `tick` on the caller's thread; hardware, audio and storage sit
//! behind traits so the whole session can be replayed deterministically.

pub mod assets;
pub mod carousel;
pub mod config;
pub mod detection;
pub mod error;
pub mod gesture;
pub mod narration;
pub mod pool;
pub mod scene;
pub mod session;
pub mod timeline;

pub use assets::{CatalogEntry, ContentCatalog, ContentLookup};
pub use carousel::{
    CarouselOutcome, CarouselStore, JsonFileStore, MemoryStore, Page, PageRecord, PageSnapshot,
    SnapshotStore,
};
pub use config::{AppConfig, CarouselConfig, DetectionConfig, GestureConfig, SessionConfig};
pub use detection::{
    Camera, DetectionEvent, DetectionPhase, DetectionSession, FrameDecoder, StartGate,
    StartOutcome, StartRejection,
};
pub use error::{CatalogError, Result};
pub use gesture::{GestureClassifier, GestureContext, GestureEvent, InputFrame, TouchPhase, TouchSample};
pub use narration::{AudioCategory, NarrationCue, NarrationSink, Narrator, SilentSink};
pub use pool::{BufferPool, FrameBuffer, Pooled, Reusable};
pub use scene::{ContentDescriptor, ContentInstance};
pub use session::{SessionOrchestrator, TickReport};
pub use timeline::{Countdown, Easing, PlaybackClock, ScheduledEvent, Scheduler, Tween};
