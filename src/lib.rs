//! Facecloak - obscure faces in captured photos before they leave the device.
//!
//! A capture is handed to [`ObfuscationOrchestrator::obfuscate`], which finds
//! faces with the neural backend when a model is available, drops
//! low-confidence candidates, and runs a blur schedule over every accepted
//! region. The result reports whether anything was actually obscured so the
//! caller never claims a photo is protected when it is not.
//!
//! # Modules
//!
//! - [`buffer`]: RGBA pixel buffers and region access
//! - [`region`]: face regions and bounds clamping
//! - [`detection`]: neural and heuristic detection backends
//! - [`model`]: one-shot face model lifecycle
//! - [`gate`]: per-backend confidence thresholds
//! - [`blur`]: the obfuscation schedule and its fallback
//! - [`orchestrator`]: the pipeline and its busy guard
//! - [`capture`] / [`output`]: still-image sources and JPEG sinks for the CLI

pub mod blur;
pub mod buffer;
pub mod capture;
pub mod config;
pub mod detection;
pub mod gate;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod region;

pub use blur::{Applied, BlurEngine, BlurError, ObfuscationPass};
pub use buffer::{BufferError, PixelBuffer};
pub use config::Config;
pub use detection::{BackendKind, DetectionBackend, FaceModel};
pub use gate::ConfidenceGate;
pub use model::{BackendState, ModelManager, ModelSource};
pub use orchestrator::{CaptureBusy, ObfuscationOrchestrator, ObfuscationResult, Phase};
pub use region::{FaceRegion, RegionExpander};
