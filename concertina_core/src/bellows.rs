//! Bellows direction: which way the two concertina faces are moving.
//!
//! The raw distance between the two bellows anchors is smoothed by a
//! [`ScalarEstimator`], and the trend of the smoothed value (shrinking,
//! growing, unchanged) selects the direction.

use serde::{Deserialize, Serialize};

use crate::estimator::ScalarEstimator;

/// Which way the bellows are moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BellowsDirection {
    /// No measurable motion.
    #[default]
    Stable,
    /// Faces moving toward each other.
    PushIn,
    /// Faces moving apart.
    PullOut,
}

impl BellowsDirection {
    pub fn name(self) -> &'static str {
        match self {
            BellowsDirection::Stable  => "stable",
            BellowsDirection::PushIn  => "push in",
            BellowsDirection::PullOut => "pull out",
        }
    }
}

/// Classify one step of the filtered distance series by exact comparison.
///
/// `filtered < previous` is `PushIn`, `filtered > previous` is `PullOut`,
/// equality is `Stable`.
pub fn classify(filtered: f32, previous: f32) -> BellowsDirection {
    classify_with_band(filtered, previous, 0.0)
}

/// Like [`classify`], but changes no larger than `band` count as `Stable`.
///
/// With `band == 0.0` this is exactly [`classify`].
pub fn classify_with_band(filtered: f32, previous: f32, band: f32) -> BellowsDirection {
    let delta = filtered - previous;
    if delta < -band {
        BellowsDirection::PushIn
    } else if delta > band {
        BellowsDirection::PullOut
    } else {
        BellowsDirection::Stable
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BellowsTracker
// ════════════════════════════════════════════════════════════════════════════

/// Owns the smoothing filter, the previous filtered distance and the
/// current direction.  Call [`update`](Self::update) once per tracked tick.
#[derive(Clone, Debug)]
pub struct BellowsTracker {
    estimator: ScalarEstimator,
    previous:  Option<f32>,
    direction: BellowsDirection,
    band:      f32,
}

impl BellowsTracker {
    pub fn new(estimator: ScalarEstimator, band: f32) -> Self {
        BellowsTracker {
            estimator,
            previous:  None,
            direction: BellowsDirection::Stable,
            band:      band.max(0.0),
        }
    }

    /// Feed the raw anchor distance for this tick.
    ///
    /// Returns `Some(direction)` when the direction changed, `None` otherwise.
    /// The first sample only seeds the previous value.
    pub fn update(&mut self, raw_distance: f32) -> Option<BellowsDirection> {
        let filtered = self.estimator.update(raw_distance);
        let previous = match self.previous.replace(filtered) {
            Some(p) => p,
            None    => return None,
        };

        let next = classify_with_band(filtered, previous, self.band);
        if next == self.direction {
            return None;
        }
        log::debug!(
            "bellows {} → {} (filtered {:.4}, previous {:.4})",
            self.direction.name(), next.name(), filtered, previous
        );
        self.direction = next;
        Some(next)
    }

    pub fn direction(&self) -> BellowsDirection { self.direction }

    /// Most recent filtered distance, if any sample has been seen.
    pub fn filtered_distance(&self) -> Option<f32> { self.previous }

    /// Forget all history: filter state, previous value and direction.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.previous  = None;
        self.direction = BellowsDirection::Stable;
    }
}

impl Default for BellowsTracker {
    fn default() -> Self {
        Self::new(ScalarEstimator::new(), 0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
