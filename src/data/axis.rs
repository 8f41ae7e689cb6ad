use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use thiserror::Error;

/// nm⁻¹ → cm⁻¹
pub const NM_TO_WAVENUMBER: f64 = 1e7;

/// Metadata key holding the excitation laser wavelength in nm.
pub const RAMAN_EX_WAVELENGTH: &str = "RamanExWavelength";

pub const WAVELENGTH_ALIASES: [&str; 3] = ["wavelengths", "lambda", "wvl"];
pub const RAMAN_ALIASES: [&str; 3] = ["raman", "ramans", "rams"];

// ---------------------------------------------------------------------------
// AxisKind – which x-axis a plot uses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisKind {
    #[default]
    Wavelength,
    RamanShift,
}

impl AxisKind {
    pub fn label(self) -> &'static str {
        match self {
            AxisKind::Wavelength => "Wavelength (nm)",
            AxisKind::RamanShift => "Raman shift (cm⁻¹)",
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Wavelength => write!(f, "wavelengths"),
            AxisKind::RamanShift => write!(f, "raman"),
        }
    }
}

/// Keyword that matches neither alias set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Invalid axis keyword: '{keyword}'. Allowed keywords are: {{{}}}, {{{}}}",
    WAVELENGTH_ALIASES.join(", "),
    RAMAN_ALIASES.join(", ")
)]
pub struct AxisParseError {
    pub keyword: String,
}

impl FromStr for AxisKind {
    type Err = AxisParseError;

    /// Case-insensitive match against the two alias sets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if WAVELENGTH_ALIASES.contains(&lower.as_str()) {
            Ok(AxisKind::Wavelength)
        } else if RAMAN_ALIASES.contains(&lower.as_str()) {
            Ok(AxisKind::RamanShift)
        } else {
            Err(AxisParseError {
                keyword: s.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Raman shift
// ---------------------------------------------------------------------------

/// Raman shift in cm⁻¹ for every wavelength (nm), given the excitation
/// wavelength (nm): `(1/λ₀ − 1/λ) × 1e7`.
pub fn raman_shift(wavelengths: &Array1<f64>, excitation_nm: f64) -> Array1<f64> {
    let inv_ex = 1.0 / excitation_nm;
    wavelengths.mapv(|wl| (inv_ex - 1.0 / wl) * NM_TO_WAVENUMBER)
}
