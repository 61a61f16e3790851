//! Generator configuration
//!
//! A plain serde record; reading it from disk is the caller's job. Every
//! range check happens in [`GeneratorConfig::validate`] before generation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::ConfigError;
use crate::pacing::{ControlPoint, CustomCurve, PacingCurve};

/// Hard limits on the configurable room count
pub const ROOMS_LOWER_LIMIT: u32 = 10;
pub const ROOMS_UPPER_LIMIT: u32 = 300;

/// Largest accepted pacing variance; larger values are clamped
pub const MAX_VARIANCE: f64 = 0.3;

/// Inclusive bounds on the final room count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for RoomBounds {
    fn default() -> Self {
        Self { min: 20, max: 40 }
    }
}

impl RoomBounds {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min as usize && count <= self.max as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Branching {
    /// Advisory target; growth does not steer towards it
    pub average: f64,
    /// Maximum connectors per room, within 2..=5
    pub max: u8,
}

impl Default for Branching {
    fn default() -> Self {
        Self {
            average: 2.5,
            max: 4,
        }
    }
}

/// A named key. One key loop is inserted per distinct name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub name: String,
    /// Accepted for compatibility; only the presence of the name matters
    #[serde(default = "default_key_count")]
    pub count: u32,
}

fn default_key_count() -> u32 {
    1
}

impl KeySpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            count: 1,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CurveKind {
    Linear,
    #[default]
    SCurve,
    Exponential,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub curve: CurveKind,
    /// Random spread added to each room's difficulty, clamped to [0, 0.3]
    pub variance: f64,
    pub steepness: f64,
    pub exponent: f64,
    pub custom_points: Vec<ControlPoint>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            curve: CurveKind::SCurve,
            variance: 0.1,
            steepness: 10.0,
            exponent: 2.0,
            custom_points: Vec::new(),
        }
    }
}

impl PacingConfig {
    /// Variance clamped to the accepted range
    pub fn effective_variance(&self) -> f64 {
        if self.variance.is_finite() {
            self.variance.clamp(0.0, MAX_VARIANCE)
        } else {
            0.0
        }
    }

    /// Build the configured curve
    pub fn curve(&self) -> Result<PacingCurve, ConfigError> {
        match self.curve {
            CurveKind::Linear => Ok(PacingCurve::Linear),
            CurveKind::SCurve => {
                if !(self.steepness.is_finite() && self.steepness > 0.0) {
                    return Err(ConfigError::Steepness(self.steepness));
                }
                Ok(PacingCurve::SCurve {
                    steepness: self.steepness,
                })
            }
            CurveKind::Exponential => {
                if !(self.exponent.is_finite() && self.exponent > 0.0) {
                    return Err(ConfigError::Exponent(self.exponent));
                }
                Ok(PacingCurve::Exponential {
                    exponent: self.exponent,
                })
            }
            CurveKind::Custom => Ok(PacingCurve::Custom(CustomCurve::new(
                self.custom_points.clone(),
            )?)),
        }
    }
}

/// Everything a synthesis call needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 0 means derive one from the wall clock
    pub seed: u64,
    pub rooms: RoomBounds,
    pub branching: Branching,
    /// Chance that an optional branch hides a secret room, within [0, 0.3]
    pub secret_density: f64,
    /// Validated but not consumed by the growth rules
    pub optional_ratio: f64,
    pub keys: Vec<KeySpec>,
    pub pacing: PacingConfig,
    pub themes: Vec<String>,
    /// Attempt budget for the retry loop
    pub max_attempts: u32,
    /// Consecutive soft rule failures tolerated before an attempt is abandoned
    pub max_consecutive_rule_failures: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rooms: RoomBounds::default(),
            branching: Branching::default(),
            secret_density: 0.1,
            optional_ratio: 0.2,
            keys: Vec::new(),
            pacing: PacingConfig::default(),
            themes: vec!["default".to_string()],
            max_attempts: 10,
            max_consecutive_rule_failures: 256,
        }
    }
}

impl GeneratorConfig {
    /// Distinct key names in first-seen order
    pub fn key_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.keys
            .iter()
            .filter(|k| seen.insert(k.name.as_str()))
            .map(|k| k.name.clone())
            .collect()
    }

    /// Check every field; nothing is generated from an invalid config
    pub fn validate(&self) -> Result<(), ConfigError> {
        let RoomBounds { min, max } = self.rooms;
        if min < ROOMS_LOWER_LIMIT || max > ROOMS_UPPER_LIMIT || min > max {
            return Err(ConfigError::RoomBounds {
                min,
                max,
                lo: ROOMS_LOWER_LIMIT,
                hi: ROOMS_UPPER_LIMIT,
            });
        }

        if !(2..=5).contains(&self.branching.max) {
            return Err(ConfigError::BranchingMax(self.branching.max));
        }
        let avg = self.branching.average;
        if !(avg.is_finite() && avg > 0.0) {
            return Err(ConfigError::BranchingAverage(avg));
        }

        if !(0.0..=0.3).contains(&self.secret_density) {
            return Err(ConfigError::SecretDensity(self.secret_density));
        }
        if !(0.1..=0.4).contains(&self.optional_ratio) {
            return Err(ConfigError::OptionalRatio(self.optional_ratio));
        }

        if self.keys.iter().any(|k| k.name.trim().is_empty()) {
            return Err(ConfigError::EmptyKeyName);
        }
        let keys = self.key_names().len();
        // Core trio plus a key room and a locked room per key
        let needed = 3 + 2 * keys as u32;
        if needed > max {
            return Err(ConfigError::TooManyKeys { keys, needed, max });
        }

        if self.themes.is_empty() {
            return Err(ConfigError::NoThemes);
        }
        let mut seen = BTreeSet::new();
        for theme in &self.themes {
            if theme.trim().is_empty() || !seen.insert(theme.as_str()) {
                return Err(ConfigError::InvalidTheme(theme.clone()));
            }
        }

        self.pacing.curve()?;

        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit("max_attempts"));
        }
        if self.max_consecutive_rule_failures == 0 {
            return Err(ConfigError::ZeroLimit("max_consecutive_rule_failures"));
        }
        Ok(())
    }
}
