//! Face model lifecycle.
//!
//! The manager loads the neural backend at most once per process. Whatever
//! the outcome, it is final: a model that failed to load is not retried and
//! every later capture uses the heuristic backend.

use crate::config::ModelConfig;
use crate::detection::{DetectionBackend, FaceModel, HeuristicBackend, NeuralBackend, OnnxFaceModel};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

static SHARED: OnceLock<Arc<ModelManager>> = OnceLock::new();

/// Lifecycle of the neural backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Loading,
    Ready,
    Unavailable,
}

impl BackendState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Unavailable,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Loading => 1,
            Self::Ready => 2,
            Self::Unavailable => 3,
        }
    }
}

/// Where face model weights come from
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Load the model, doing any heavy work off the async threads
    async fn load(&self) -> Result<Box<dyn FaceModel>>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// Loads an [`OnnxFaceModel`] from disk on the blocking pool
pub struct OnnxModelSource {
    path: PathBuf,
    config: ModelConfig,
}

impl OnnxModelSource {
    pub fn new(path: PathBuf, config: ModelConfig) -> Self {
        Self { path, config }
    }
}

#[async_trait]
impl ModelSource for OnnxModelSource {
    async fn load(&self) -> Result<Box<dyn FaceModel>> {
        let path = self.path.clone();
        let config = self.config.clone();

        let model = tokio::task::spawn_blocking(move || OnnxFaceModel::new(&path, &config))
            .await
            .context("model loading task failed")??;

        Ok(Box::new(model))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Owns the process-wide choice between the neural and heuristic backends.
pub struct ModelManager {
    source: Option<Arc<dyn ModelSource>>,
    padding: i32,
    state: AtomicU8,
    load_attempts: AtomicUsize,
    neural: OnceCell<Option<Arc<dyn DetectionBackend>>>,
    heuristic: Arc<dyn DetectionBackend>,
}

impl ModelManager {
    /// Manager for `source`; `None` means no model is configured and the
    /// first initialization settles on `Unavailable`.
    pub fn new(source: Option<Arc<dyn ModelSource>>, padding: i32) -> Self {
        Self {
            source,
            padding,
            state: AtomicU8::new(BackendState::Uninitialized.as_u8()),
            load_attempts: AtomicUsize::new(0),
            neural: OnceCell::new(),
            heuristic: Arc::new(HeuristicBackend::new()),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        let source = config.path.clone().map(|path| {
            Arc::new(OnnxModelSource::new(path, config.clone())) as Arc<dyn ModelSource>
        });
        Self::new(source, config.padding)
    }

    /// The process-wide manager. The configuration of the first caller wins.
    pub fn shared(config: &ModelConfig) -> Arc<ModelManager> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::from_config(config))))
    }

    pub fn state(&self) -> BackendState {
        BackendState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: BackendState) {
        tracing::debug!("Face model state -> {:?}", state);
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// How many times a load was actually started
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Acquire)
    }

    /// Load the neural backend unless that already happened.
    ///
    /// Concurrent callers share one in-flight load; once settled this returns
    /// immediately. Returns whether the neural backend is usable. Failures
    /// are logged and encoded in the state, never returned.
    pub async fn initialize(&self) -> bool {
        self.neural.get_or_init(|| self.load()).await.is_some()
    }

    /// Start initialization in the background so it can settle before the first capture
    pub fn preload(self: &Arc<Self>) -> JoinHandle<bool> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.initialize().await })
    }

    async fn load(&self) -> Option<Arc<dyn DetectionBackend>> {
        self.set_state(BackendState::Loading);
        self.load_attempts.fetch_add(1, Ordering::AcqRel);

        let Some(source) = self.source.clone() else {
            tracing::info!("No face model configured, using heuristic backend");
            self.set_state(BackendState::Unavailable);
            return None;
        };

        let origin = source.describe();
        tracing::info!("Loading face model from {}", origin);

        // Spawned so that a panicking loader surfaces as a JoinError
        let loaded = tokio::spawn(async move { source.load().await })
            .await
            .context("face model loader panicked")
            .and_then(|result| result);

        match loaded {
            Ok(model) => {
                tracing::info!("Face model {} ready", origin);
                self.set_state(BackendState::Ready);
                Some(Arc::new(NeuralBackend::new(model, self.padding)))
            }
            Err(err) => {
                tracing::warn!(
                    "Face model {} failed to load: {:#}. Using heuristic backend for the rest of the process",
                    origin,
                    err
                );
                self.set_state(BackendState::Unavailable);
                None
            }
        }
    }

    /// Backend to use right now, chosen by the current state
    pub fn backend(&self) -> Arc<dyn DetectionBackend> {
        match (self.state(), self.neural.get()) {
            (BackendState::Ready, Some(Some(neural))) => Arc::clone(neural),
            _ => Arc::clone(&self.heuristic),
        }
    }
}
