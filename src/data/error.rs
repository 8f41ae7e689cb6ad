//! Error types for decoding and working with spectra.

use thiserror::Error;

use super::axis::AxisParseError;
use crate::render::RenderError;

/// Errors raised while decoding a SIF file.
#[derive(Error, Debug)]
pub enum SifError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The magic line is missing.
    #[error("not a SIF file: missing 'Andor Technology Multi-Channel File' header")]
    NotSif,

    /// The header ended before the named field could be read.
    #[error("unexpected end of file while reading {0}")]
    UnexpectedEof(&'static str),

    /// A header token could not be interpreted.
    #[error("invalid value for {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },

    /// The pixel block is shorter than the header announces.
    #[error("pixel data truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// No usable wavelength calibration in the metadata.
    #[error("no wavelength calibration found in metadata")]
    MissingCalibration,
}

/// Errors raised by [`Spectrum`](super::spectrum::Spectrum) operations.
#[derive(Error, Debug)]
pub enum SpectrumError {
    /// An array handed to the constructor has the wrong dimensionality.
    #[error("{field} must be {expected}, got {found}")]
    Type {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A metadata key needed by an operation is absent.
    #[error("metadata key '{0}' not found")]
    MissingKey(String),

    /// A metadata value has an unusable type.
    #[error("metadata key '{key}' holds a non-numeric value: {value}")]
    InvalidMetadata { key: String, value: String },

    #[error(
        "Cannot convert to Raman shift. 'RamanExWavelength' key not found in the spectrum's info"
    )]
    RamanUnavailable,

    #[error("Raman conversion failed - empty array")]
    EmptyRamanAxis,

    #[error("Shape mismatch: ramans {ramans:?} vs counts {counts:?}")]
    ShapeMismatch {
        ramans: Vec<usize>,
        counts: Vec<usize>,
    },

    #[error(transparent)]
    InvalidAxis(#[from] AxisParseError),

    #[error("frame {index} out of range ({frames} frames)")]
    FrameOutOfRange { index: usize, frames: usize },

    #[error("decode error: {0}")]
    Sif(#[from] SifError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for spectrum operations.
pub type Result<T> = std::result::Result<T, SpectrumError>;
