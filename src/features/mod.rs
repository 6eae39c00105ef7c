//! Feature engineering module
//!
//! Provides technical indicators and the feature table builder.

mod builder;
mod indicators;

pub use builder::{FeatureBuilder, FeatureRow, FeatureTable};
pub use indicators::*;
