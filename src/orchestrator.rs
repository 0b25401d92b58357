use crate::blur::{Applied, BlurEngine};
use crate::buffer::PixelBuffer;
use crate::config::Config;
use crate::gate::ConfidenceGate;
use crate::model::ModelManager;
use crate::region::RegionExpander;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Where the current call is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Detecting,
    Filtering,
    Transforming,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Detecting,
            2 => Self::Filtering,
            3 => Self::Transforming,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Detecting => 1,
            Self::Filtering => 2,
            Self::Transforming => 3,
        }
    }
}

/// Outcome of one obfuscation call
#[derive(Debug)]
pub struct ObfuscationResult {
    /// The caller's buffer, with every accepted face region obscured
    pub buffer: PixelBuffer,
    /// False means no region was obscured; callers must not claim the photo is protected
    pub any_region_transformed: bool,
}

/// Returned when a capture is submitted while another one is still being processed.
///
/// Carries the submitted buffer back unmodified so the caller can retry.
#[derive(Debug, Error)]
#[error("capture busy: an obfuscation is already in progress, try again once it completes")]
pub struct CaptureBusy {
    pub buffer: PixelBuffer,
}

/// Resets the phase to `Idle` however the call ends
struct PhaseGuard<'a>(&'a AtomicU8);

impl PhaseGuard<'_> {
    fn enter(&self, phase: Phase) {
        tracing::trace!("Obfuscation phase -> {:?}", phase);
        self.0.store(phase.as_u8(), Ordering::Release);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(Phase::Idle.as_u8(), Ordering::Release);
    }
}

/// Runs the face-obfuscation pipeline for one capture session.
///
/// model manager -> detection backend -> confidence gate -> region expander -> blur engine
pub struct ObfuscationOrchestrator {
    models: Arc<ModelManager>,
    gate: ConfidenceGate,
    expander: RegionExpander,
    engine: BlurEngine,
    in_flight: Mutex<()>,
    phase: AtomicU8,
}

impl ObfuscationOrchestrator {
    pub fn new(models: Arc<ModelManager>, config: &Config) -> Self {
        Self {
            models,
            gate: ConfidenceGate::new(&config.gate),
            expander: RegionExpander::new(),
            engine: BlurEngine::new(&config.obfuscation),
            in_flight: Mutex::new(()),
            phase: AtomicU8::new(Phase::Idle.as_u8()),
        }
    }

    /// Orchestrator backed by the process-wide model manager
    pub fn from_config(config: &Config) -> Self {
        Self::new(ModelManager::shared(&config.model), config)
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Start loading the face model ahead of the first capture
    pub fn warm_up(&self) {
        // The handle is not needed; `obfuscate` awaits the same load.
        drop(self.models.preload());
    }

    /// Obscure every face found in `buffer`.
    ///
    /// A call made while another one on this orchestrator is still running is
    /// rejected with [`CaptureBusy`] rather than queued. Detection and
    /// transform failures never surface as errors; they show up as
    /// `any_region_transformed == false` or as fewer transformed regions.
    pub async fn obfuscate(&self, buffer: PixelBuffer) -> Result<ObfuscationResult, CaptureBusy> {
        let Ok(_session) = self.in_flight.try_lock() else {
            tracing::warn!("Capture busy, rejecting obfuscation request");
            return Err(CaptureBusy { buffer });
        };

        let span = tracing::info_span!(
            "obfuscate",
            width = buffer.width(),
            height = buffer.height()
        );
        Ok(self.run(buffer).instrument(span).await)
    }

    async fn run(&self, mut buffer: PixelBuffer) -> ObfuscationResult {
        let phase = PhaseGuard(&self.phase);
        phase.enter(Phase::Detecting);

        self.models.initialize().await;
        let backend = self.models.backend();
        let kind = backend.kind();

        let candidates = match backend.detect(&buffer).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!("{} detection failed, treating as no faces: {:#}", kind, err);
                Vec::new()
            }
        };
        tracing::info!("{} backend found {} candidate region(s)", kind, candidates.len());

        phase.enter(Phase::Filtering);
        let accepted = self.gate.filter(candidates, kind);
        let regions = self.expander.expand_all(&accepted, &buffer);

        if regions.is_empty() {
            tracing::info!("No face region to obfuscate");
            return ObfuscationResult {
                buffer,
                any_region_transformed: false,
            };
        }

        phase.enter(Phase::Transforming);
        let mut transformed = 0usize;
        for region in &regions {
            match self.engine.obfuscate(&mut buffer, region) {
                Ok(Applied::Schedule) => transformed += 1,
                Ok(Applied::Fallback) => {
                    tracing::warn!(
                        "Region {},{} {}x{} obscured with fallback blur",
                        region.x,
                        region.y,
                        region.width,
                        region.height
                    );
                    transformed += 1;
                }
                Err(err) => tracing::error!(
                    "Region {},{} {}x{} left untouched: {}",
                    region.x,
                    region.y,
                    region.width,
                    region.height,
                    err
                ),
            }
        }

        tracing::info!("Obfuscated {}/{} face region(s)", transformed, regions.len());

        ObfuscationResult {
            buffer,
            any_region_transformed: transformed > 0,
        }
    }
}
