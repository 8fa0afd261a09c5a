//! Centralized balance and tuning defaults for Ruinseeker exploration logic.
//!
//! Catalog JSON may override the reward and hidden-roll values; everything
//! else here is fixed game math.

// Experience rewards -------------------------------------------------------
pub(crate) const EXP_NORMAL_DISCOVERY: u32 = 25;
pub(crate) const EXP_HIDDEN_DISCOVERY: u32 = 50;
pub(crate) const EXP_FIRST_TIME_BONUS: u32 = 30;
pub(crate) const EXP_EXPLORATION_BONUS: u32 = 15;
pub(crate) const EXP_REPEAT_FRACTION: f64 = 0.10;

// Level table --------------------------------------------------------------
pub(crate) const MIN_LEVEL: u32 = 1;
pub(crate) const DEFAULT_MAX_ITEM_SLOTS: u32 = 3;

// Hidden discovery rolls ---------------------------------------------------
pub(crate) const HIDDEN_CHANCE_BEGINNER: f64 = 0.05;
pub(crate) const HIDDEN_CHANCE_ADVANCED: f64 = 0.15;
pub(crate) const HIDDEN_CHANCE_MASTER: f64 = 0.35;

// Ruin weights -------------------------------------------------------------
pub(crate) const DEFAULT_DISCOVER_PROBABILITY: f64 = 1.0;

// Exploration depth classification ----------------------------------------
pub(crate) const EXPLORATION_MODERATE_WEIGHT: f64 = 4.0;
pub(crate) const EXPLORATION_DEEP_WEIGHT: f64 = 7.0;

// RNG stream tags ----------------------------------------------------------
pub(crate) const DISCOVERY_STREAM_TAG: &[u8] = b"ruinseeker.discovery";

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
