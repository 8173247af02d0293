//! Evidence-based company scoring and claim citation matching for investment diligence.

pub mod citations;
pub mod config;
pub mod error;
pub mod evidence;
pub mod providers;
pub mod scoring;
pub mod segmentation;
pub mod service;
pub mod telemetry;
pub(crate) mod text;
