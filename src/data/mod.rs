/// Data layer: SIF decoding, the spectrum model and its exports.
///
/// Architecture:
/// ```text
///      .sif
///        │
///        ▼
///   ┌──────────┐
///   │   sif     │  header + f32 pixels → (Array3, Metadata)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ calibration  │  polynomial → wavelength axis
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Spectrum  │  axis conversion, info tables, plot, export
///   └──────────┘
/// ```

pub mod axis;
pub mod calibration;
pub mod error;
pub mod export;
pub mod info;
pub mod model;
pub mod sample;
pub mod sif;
pub mod spectrum;
