//! Tunable delays, auto-scroll bands and class names.
//!
//! Defaults reproduce the stock behaviour; a host can override any subset
//! from JSON since every section is `#[serde(default)]`.
use crate::errors::ReconcilerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timings: Timings,
    pub auto_scroll: AutoScroll,
    pub classes: ClassNames,
}

/// Delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Re-adding the moved class after a FLIP offset was applied.
    pub move_class_delay: u64,
    /// Releasing a FLIP offset back to zero.
    pub move_reset_delay: u64,
    /// Dropping the deleted class from an element created into a live list.
    pub fade_in_delay: u64,
    /// Flagging a pinned element as deleted.
    pub leave_class_delay: u64,
    /// Post-patch pass that revives retained elements still flagged deleted.
    pub settle_delay: u64,
    /// Resetting the dragged element's top after release.
    pub release_reset_delay: u64,
    /// Press-and-hold time before a drag starts.
    pub hold_delay: u64,
    /// Auto-scroll period while dragging.
    pub scroll_tick: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            move_class_delay: 5,
            move_reset_delay: 10,
            fade_in_delay: 15,
            leave_class_delay: 5,
            settle_delay: 5,
            release_reset_delay: 20,
            hold_delay: 325,
            scroll_tick: 10,
        }
    }
}

/// Viewport bands (fractions of the viewport height) that trigger scrolling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScroll {
    pub upper_band: f64,
    pub lower_band: f64,
    /// Largest scroll step per tick, reached at the viewport edge.
    pub max_step: f64,
}

impl Default for AutoScroll {
    fn default() -> Self {
        AutoScroll { upper_band: 0.2, lower_band: 0.8, max_step: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    pub moved: String,
    pub deleted: String,
    pub dragging: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        ClassNames {
            moved: "moved-item".to_string(),
            deleted: "deleted-item".to_string(),
            dragging: "drag-item".to_string(),
        }
    }
}

impl Config {
    pub fn from_json_str(source: &str) -> Result<Self, ReconcilerError> {
        let config: Config = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcilerError> {
        let bands = &self.auto_scroll;
        if !(0.0..=1.0).contains(&bands.upper_band) || !(0.0..=1.0).contains(&bands.lower_band) {
            return Err(ReconcilerError::Config(
                "auto-scroll bands must be fractions between 0 and 1".into(),
            ));
        }
        if bands.upper_band >= bands.lower_band {
            return Err(ReconcilerError::Config(format!(
                "upper band {} must lie above lower band {}",
                bands.upper_band, bands.lower_band
            )));
        }
        if self.timings.scroll_tick == 0 {
            return Err(ReconcilerError::Config("scroll_tick must be positive".into()));
        }
        Ok(())
    }
}
