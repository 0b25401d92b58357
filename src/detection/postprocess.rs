use crate::region::FaceRegion;
use anyhow::Result;
use std::cmp::Ordering;

/// Maximum number of rows kept before non-maximum suppression
const TOP_K: usize = 5_000;

/// Box in frame coordinates before it is snapped to whole pixels
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Snap outwards to whole pixels so no part of the face is lost
    fn into_region(self) -> FaceRegion {
        let x0 = self.x.floor();
        let y0 = self.y.floor();
        let x1 = (self.x + self.width).ceil();
        let y1 = (self.y + self.height).ceil();
        FaceRegion::new(
            x0 as i32,
            y0 as i32,
            (x1 - x0) as i32,
            (y1 - y0) as i32,
            self.score,
        )
    }
}

/// Decode detector output rows into face regions in frame coordinates.
///
/// Accepts `[N, C]` or `[1, N, C]` with `C >= 5`: columns 0-3 hold the box
/// (x, y, width, height) in model input space and the last column the score.
/// Columns in between (landmarks) are ignored. Scores are reported as the
/// model produced them, clamped into [0, 1]; thresholding happens later.
pub fn decode_rows(
    shape: &[i64],
    data: &[f32],
    scale_x: f32,
    scale_y: f32,
    nms_threshold: f32,
) -> Result<Vec<FaceRegion>> {
    let (rows, cols) = match shape {
        [rows, cols] => (*rows, *cols),
        [1, rows, cols] => (*rows, *cols),
        other => anyhow::bail!(
            "face model output must have shape [N, C] or [1, N, C] (got {:?})",
            other
        ),
    };
    anyhow::ensure!(
        cols >= 5,
        "face model output needs at least 5 columns per row (got {})",
        cols
    );
    anyhow::ensure!(rows >= 0, "face model output has a negative row count");

    let (rows, cols) = (rows as usize, cols as usize);
    anyhow::ensure!(
        data.len() == rows * cols,
        "face model output holds {} values, expected {}",
        data.len(),
        rows * cols
    );

    let mut candidates: Vec<Candidate> = data
        .chunks_exact(cols)
        .filter_map(|row| {
            let score = row[cols - 1];
            let candidate = Candidate {
                x: row[0] * scale_x,
                y: row[1] * scale_y,
                width: row[2] * scale_x,
                height: row[3] * scale_y,
                score: score.clamp(0.0, 1.0),
            };
            let finite = row[..4].iter().all(|v| v.is_finite()) && score.is_finite();
            (finite && candidate.width > 0.0 && candidate.height > 0.0).then_some(candidate)
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(TOP_K);

    if nms_threshold > 0.0 && candidates.len() > 1 {
        candidates = non_max_suppression(candidates, nms_threshold);
    }

    Ok(candidates.into_iter().map(Candidate::into_region).collect())
}

fn non_max_suppression(candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| candidate.iou(k) <= threshold) {
            kept.push(candidate);
        }
    }
    kept
}
