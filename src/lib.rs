//! Reader, Raman-shift converter and plotter for Andor SIF spectra.

pub mod data;
pub mod render;
pub mod viewer;

pub use data::axis::AxisKind;
pub use data::error::{SifError, SpectrumError};
pub use data::export::JsonOptions;
pub use data::model::{Metadata, MetadataValue};
pub use data::spectrum::Spectrum;
pub use render::{RenderConfig, RenderError};
