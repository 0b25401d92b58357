mod convolve;
mod pixelate;

pub use convolve::{box_blur, gaussian_blur, gaussian_kernel};
pub use pixelate::{dark_overlay, pixelate};

use crate::buffer::{BufferError, PixelBuffer};
use crate::config::ObfuscationConfig;
use crate::region::FaceRegion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of the irreversible region transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObfuscationPass {
    /// Separable Gaussian blur, sigma = radius / 3
    Gaussian { radius: u32 },
    /// Replace each block with its mean colour
    Pixelate { block: u32 },
    /// Flat colour composited over the region
    Overlay {
        color: [u8; 3],
        fill_alpha: f32,
        global_alpha: f32,
    },
}

impl ObfuscationPass {
    /// blur -> pixelate -> blur -> pixelate -> blur -> dark overlay
    pub fn reference_schedule() -> Vec<Self> {
        vec![
            Self::Gaussian { radius: 25 },
            Self::Pixelate { block: 12 },
            Self::Gaussian { radius: 20 },
            Self::Pixelate { block: 16 },
            Self::Gaussian { radius: 15 },
            Self::Overlay {
                color: [0, 0, 0],
                fill_alpha: 0.7,
                global_alpha: 0.5,
            },
        ]
    }

    fn validate(&self) -> Result<(), BlurError> {
        let reason = match *self {
            Self::Gaussian { radius: 0 } => "radius must be at least 1",
            Self::Pixelate { block: 0 } => "block size must be at least 1",
            Self::Overlay {
                fill_alpha,
                global_alpha,
                ..
            } if !unit_interval(fill_alpha) || !unit_interval(global_alpha) => {
                "alpha values must lie in [0, 1]"
            }
            _ => return Ok(()),
        };
        Err(BlurError::InvalidPass {
            pass: *self,
            reason,
        })
    }

    /// Reject a pass that is a different kind from `reference`, or weaker
    /// than half of it.
    fn check_strength(&self, reference: &Self) -> Result<(), BlurError> {
        let reason = match (*self, *reference) {
            (Self::Gaussian { radius }, Self::Gaussian { radius: floor }) if radius.saturating_mul(2) < floor => {
                "radius too small to hide a face"
            }
            (Self::Pixelate { block }, Self::Pixelate { block: floor }) if block.saturating_mul(2) < floor => {
                "block size too small to hide a face"
            }
            (
                Self::Overlay {
                    fill_alpha,
                    global_alpha,
                    ..
                },
                Self::Overlay {
                    fill_alpha: floor_fill,
                    global_alpha: floor_global,
                    ..
                },
            ) if fill_alpha * global_alpha * 2.0 < floor_fill * floor_global => "overlay too faint",
            (Self::Gaussian { .. }, Self::Gaussian { .. })
            | (Self::Pixelate { .. }, Self::Pixelate { .. })
            | (Self::Overlay { .. }, Self::Overlay { .. }) => return Ok(()),
            _ => "pass out of order",
        };
        Err(BlurError::InvalidPass {
            pass: *self,
            reason,
        })
    }

    fn apply(&self, patch: &mut PixelBuffer) {
        match *self {
            Self::Gaussian { radius } => gaussian_blur(patch, radius),
            Self::Pixelate { block } => pixelate(patch, block),
            Self::Overlay {
                color,
                fill_alpha,
                global_alpha,
            } => dark_overlay(patch, color, fill_alpha, global_alpha),
        }
    }
}

fn unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[derive(Debug, Error, PartialEq)]
pub enum BlurError {
    #[error("obfuscation schedule is empty")]
    EmptySchedule,

    #[error("invalid pass {pass:?}: {reason}")]
    InvalidPass {
        pass: ObfuscationPass,
        reason: &'static str,
    },

    #[error("obfuscation schedule has {actual} passes, expected {expected}")]
    ScheduleLength { expected: usize, actual: usize },

    #[error("fallback blur needs a positive radius and pass count (radius {radius}, passes {passes})")]
    InvalidFallback { radius: u32, passes: u32 },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Which transform ended up in the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The full multi-pass schedule
    Schedule,
    /// The box blur used after the schedule failed
    Fallback,
}

/// Applies the obfuscation schedule to regions of a frame, in place.
#[derive(Debug, Clone)]
pub struct BlurEngine {
    passes: Vec<ObfuscationPass>,
    fallback_radius: u32,
    fallback_passes: u32,
}

impl Default for BlurEngine {
    fn default() -> Self {
        Self::new(&ObfuscationConfig::default())
    }
}

impl BlurEngine {
    pub fn new(config: &ObfuscationConfig) -> Self {
        Self {
            passes: config.passes.clone(),
            fallback_radius: config.fallback_radius,
            fallback_passes: config.fallback_passes,
        }
    }

    pub fn passes(&self) -> &[ObfuscationPass] {
        &self.passes
    }

    /// Irreversibly obscure `region` of `buffer`.
    ///
    /// The schedule runs on a copy of the region and is written back only when
    /// every pass succeeded; otherwise the untouched region gets the box blur
    /// fallback. A configured schedule must keep the blur/pixelate/overlay
    /// order and at least half the strength of each reference pass, or it is
    /// treated as failed. An error means the region was left as it was.
    pub fn obfuscate(&self, buffer: &mut PixelBuffer, region: &FaceRegion) -> Result<Applied, BlurError> {
        let _span = tracing::debug_span!(
            "obfuscate_region",
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height
        )
        .entered();

        match self.apply_schedule(buffer, region) {
            Ok(()) => Ok(Applied::Schedule),
            Err(err) => {
                tracing::warn!(
                    "Multi-pass obfuscation failed for region {},{} {}x{}: {}; falling back to box blur",
                    region.x,
                    region.y,
                    region.width,
                    region.height,
                    err
                );
                self.apply_fallback(buffer, region)?;
                Ok(Applied::Fallback)
            }
        }
    }

    fn apply_schedule(&self, buffer: &mut PixelBuffer, region: &FaceRegion) -> Result<(), BlurError> {
        if self.passes.is_empty() {
            return Err(BlurError::EmptySchedule);
        }
        let reference = ObfuscationPass::reference_schedule();
        if self.passes.len() != reference.len() {
            return Err(BlurError::ScheduleLength {
                expected: reference.len(),
                actual: self.passes.len(),
            });
        }
        for (pass, floor) in self.passes.iter().zip(&reference) {
            pass.validate()?;
            pass.check_strength(floor)?;
        }

        let mut patch = buffer.read_region(region)?;
        for (index, pass) in self.passes.iter().enumerate() {
            tracing::debug!("Pass {}/{}: {:?}", index + 1, self.passes.len(), pass);
            pass.apply(&mut patch);
        }
        buffer.write_region(region.x, region.y, &patch)?;

        Ok(())
    }

    fn apply_fallback(&self, buffer: &mut PixelBuffer, region: &FaceRegion) -> Result<(), BlurError> {
        if self.fallback_radius == 0 || self.fallback_passes == 0 {
            return Err(BlurError::InvalidFallback {
                radius: self.fallback_radius,
                passes: self.fallback_passes,
            });
        }

        let mut patch = buffer.read_region(region)?;
        for _ in 0..self.fallback_passes {
            box_blur(&mut patch, self.fallback_radius);
        }
        buffer.write_region(region.x, region.y, &patch)?;

        Ok(())
    }
}
