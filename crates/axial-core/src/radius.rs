//! Radius mask and multi-metric depth vector.
//!
//! A traversal node is inside the radius iff every active limit is satisfied,
//! so the kernel carries all metric accumulations simultaneously in a
//! [`DepthVector`] and tests them against the [`RadiusMask`] as one record.

use serde::{Deserialize, Serialize};

/// Metric used to order the traversal queue and to report depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DistanceMode {
    Straight = 0,
    Walking = 1,
    Steps = 2,
    Angular = 3,
    Axmeter = 4,
    /// No ordering metric requested; traversal degenerates to BFS.
    Undefined = 5,
    /// Custom per-line weights.
    Weights = 6,
}

impl DistanceMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Straight),
            1 => Some(Self::Walking),
            2 => Some(Self::Steps),
            3 => Some(Self::Angular),
            4 => Some(Self::Axmeter),
            5 => Some(Self::Undefined),
            6 => Some(Self::Weights),
            _ => None,
        }
    }
}

/// Which entities an analysis iterates as origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OriginType {
    Points = 0,
    Junctions = 1,
    Lines = 2,
    PointGroups = 3,
}

impl OriginType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Points),
            1 => Some(Self::Junctions),
            2 => Some(Self::Lines),
            3 => Some(Self::PointGroups),
            _ => None,
        }
    }
}

/// Cumulative depth along a path, all metrics at once.
///
/// `straight` is special: it is the direct Euclidean distance from the origin
/// to the node under evaluation, not an accumulation, and is filled in at
/// scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthVector {
    pub straight: f64,
    pub walking: f64,
    pub steps: u32,
    /// Accumulated turn angle in degrees.
    pub angular: f64,
    /// Accumulated steps × meters.
    pub axmeter: f64,
    /// Accumulated custom weight.
    pub weight: f64,
}

impl DepthVector {
    /// Value of the metric used for queue ordering.
    pub fn metric(&self, mode: DistanceMode) -> f64 {
        match mode {
            DistanceMode::Straight => self.straight,
            DistanceMode::Walking => self.walking,
            DistanceMode::Steps | DistanceMode::Undefined => self.steps as f64,
            DistanceMode::Angular => self.angular,
            DistanceMode::Axmeter => self.axmeter,
            DistanceMode::Weights => self.weight,
        }
    }
}

// Active-limit bits of the radius mask.
const MASK_STRAIGHT: u32 = 1;
const MASK_WALKING: u32 = 2;
const MASK_STEPS: u32 = 4;
const MASK_ANGULAR: u32 = 8;
const MASK_AXMETER: u32 = 16;
const MASK_WEIGHTS: u32 = 32;

/// Set of active metric limits with one scalar per active tag.
///
/// The default mask has no limits; any subset may be combined and all active
/// limits must hold (AND semantics).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RadiusMask {
    mask: u32,
    straight: f64,
    walking: f64,
    steps: u32,
    angular: f64,
    axmeter: f64,
    weights: f64,
}

impl RadiusMask {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_straight(mut self, limit: f64) -> Self {
        self.mask |= MASK_STRAIGHT;
        self.straight = limit;
        self
    }

    pub fn with_walking(mut self, limit: f64) -> Self {
        self.mask |= MASK_WALKING;
        self.walking = limit;
        self
    }

    pub fn with_steps(mut self, limit: u32) -> Self {
        self.mask |= MASK_STEPS;
        self.steps = limit;
        self
    }

    pub fn with_angular(mut self, limit_degrees: f64) -> Self {
        self.mask |= MASK_ANGULAR;
        self.angular = limit_degrees;
        self
    }

    pub fn with_axmeter(mut self, limit: f64) -> Self {
        self.mask |= MASK_AXMETER;
        self.axmeter = limit;
        self
    }

    pub fn with_weights(mut self, limit: f64) -> Self {
        self.mask |= MASK_WEIGHTS;
        self.weights = limit;
        self
    }

    /// Rebuild from raw FFI fields. Unknown mask bits are a caller error.
    pub fn from_raw(
        mask: u32,
        straight: f64,
        walking: f64,
        steps: u32,
        angular: f64,
        axmeter: f64,
        weights: f64,
    ) -> Option<Self> {
        if mask
            & !(MASK_STRAIGHT | MASK_WALKING | MASK_STEPS | MASK_ANGULAR | MASK_AXMETER | MASK_WEIGHTS)
            != 0
        {
            return None;
        }
        Some(Self {
            mask,
            straight,
            walking,
            steps,
            angular,
            axmeter,
            weights,
        })
    }

    pub fn has_straight(&self) -> bool {
        self.mask & MASK_STRAIGHT != 0
    }

    pub fn has_walking(&self) -> bool {
        self.mask & MASK_WALKING != 0
    }

    pub fn has_steps(&self) -> bool {
        self.mask & MASK_STEPS != 0
    }

    pub fn has_angular(&self) -> bool {
        self.mask & MASK_ANGULAR != 0
    }

    pub fn has_axmeter(&self) -> bool {
        self.mask & MASK_AXMETER != 0
    }

    pub fn has_weights(&self) -> bool {
        self.mask & MASK_WEIGHTS != 0
    }

    pub fn straight_limit(&self) -> Option<f64> {
        self.has_straight().then_some(self.straight)
    }

    pub fn walking_limit(&self) -> Option<f64> {
        self.has_walking().then_some(self.walking)
    }

    pub fn steps_limit(&self) -> Option<u32> {
        self.has_steps().then_some(self.steps)
    }

    pub fn angular_limit(&self) -> Option<f64> {
        self.has_angular().then_some(self.angular)
    }

    pub fn axmeter_limit(&self) -> Option<f64> {
        self.has_axmeter().then_some(self.axmeter)
    }

    pub fn weights_limit(&self) -> Option<f64> {
        self.has_weights().then_some(self.weights)
    }

    pub fn is_unlimited(&self) -> bool {
        self.mask == 0
    }

    /// Limit for the given routing metric, when one is active.
    pub fn limit_for(&self, mode: DistanceMode) -> Option<f64> {
        match mode {
            DistanceMode::Straight => self.straight_limit(),
            DistanceMode::Walking => self.walking_limit(),
            DistanceMode::Steps | DistanceMode::Undefined => {
                self.steps_limit().map(|s| s as f64)
            }
            DistanceMode::Angular => self.angular_limit(),
            DistanceMode::Axmeter => self.axmeter_limit(),
            DistanceMode::Weights => self.weights_limit(),
        }
    }

    /// All active limits satisfied? Small slack absorbs float accumulation
    /// noise on the continuous metrics.
    pub fn admits(&self, depth: &DepthVector) -> bool {
        const EPS: f64 = 1e-9;
        if self.has_straight() && depth.straight > self.straight + EPS {
            return false;
        }
        if self.has_walking() && depth.walking > self.walking + EPS {
            return false;
        }
        if self.has_steps() && depth.steps > self.steps {
            return false;
        }
        if self.has_angular() && depth.angular > self.angular + EPS {
            return false;
        }
        if self.has_axmeter() && depth.axmeter > self.axmeter + EPS {
            return false;
        }
        if self.has_weights() && depth.weight > self.weights + EPS {
            return false;
        }
        true
    }

    /// Does `self` only tighten `other`? (Every active limit in `self` is
    /// also active in `other` with a value ≤ it, or `other` is unlimited on
    /// that axis.)
    pub fn is_subset_of(&self, other: &RadiusMask) -> bool {
        fn axis(a: Option<f64>, b: Option<f64>) -> bool {
            match (a, b) {
                (_, None) => true,
                (None, Some(_)) => false,
                (Some(x), Some(y)) => x <= y,
            }
        }
        axis(self.straight_limit(), other.straight_limit())
            && axis(self.walking_limit(), other.walking_limit())
            && axis(
                self.steps_limit().map(|s| s as f64),
                other.steps_limit().map(|s| s as f64),
            )
            && axis(self.angular_limit(), other.angular_limit())
            && axis(self.axmeter_limit(), other.axmeter_limit())
            && axis(self.weights_limit(), other.weights_limit())
    }
}
