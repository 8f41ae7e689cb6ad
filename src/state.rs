use std::path::{Path, PathBuf};

use ndarray::Array1;
use rusty_sif::{AxisKind, RenderConfig, Spectrum, SpectrumError};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded acquisition (None until user opens a file).
    pub spectrum: Option<Spectrum>,

    /// Unit of the x-axis.
    pub axis: AxisKind,

    /// Frame shown in the plot.
    pub frame: usize,

    /// Show the timestamp table under the metadata.
    pub show_timestamps: bool,

    /// Show the tile table (ignored while timestamps are shown).
    pub show_tiles: bool,

    /// Resolution of saved PNG charts.
    pub dpi: u32,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            spectrum: None,
            axis: AxisKind::Wavelength,
            frame: 0,
            show_timestamps: false,
            show_tiles: false,
            dpi: RenderConfig::default().dpi,
            status_message: None,
        }
    }
}

impl AppState {
    /// Decode `path` and make it the current spectrum.
    pub fn load(&mut self, path: &Path) {
        match Spectrum::read_sif(path) {
            Ok(spectrum) => self.set_spectrum(spectrum),
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn set_spectrum(&mut self, spectrum: Spectrum) {
        self.spectrum = Some(spectrum);
        self.axis = AxisKind::Wavelength;
        self.frame = 0;
        self.status_message = None;
    }

    /// Switch the x-axis, computing the Raman shift on first use.
    pub fn set_axis(&mut self, axis: AxisKind) {
        let Some(spectrum) = self.spectrum.as_mut() else {
            return;
        };
        if axis == AxisKind::RamanShift && spectrum.ramans().is_none() {
            if let Err(e) = spectrum.convert_xaxis_unit() {
                let e = match e {
                    SpectrumError::MissingKey(_) => SpectrumError::RamanUnavailable,
                    other => other,
                };
                log::warn!("{e}");
                self.status_message = Some(e.to_string());
                return;
            }
        }
        self.axis = axis;
        self.status_message = None;
    }

    /// Values for the current x-axis.
    pub fn x_values(&self) -> Option<&Array1<f64>> {
        let spectrum = self.spectrum.as_ref()?;
        match self.axis {
            AxisKind::Wavelength => Some(spectrum.wavelengths()),
            AxisKind::RamanShift => spectrum.ramans(),
        }
    }

    /// Save the current trace as `<file>_.png` without opening a window.
    pub fn save_png(&mut self) -> Option<PathBuf> {
        let spectrum = self.spectrum.as_mut()?;
        let config = RenderConfig::default().headless().with_dpi(self.dpi);
        let keyword = self.axis.to_string();
        match spectrum.plot_sif(&keyword, &config) {
            Ok(Some(path)) => {
                self.status_message = Some(format!("{} saved", path.display()));
                Some(path)
            }
            Ok(None) => {
                self.status_message =
                    Some("Only single-frame, single-row acquisitions can be saved".to_string());
                None
            }
            Err(e) => {
                log::error!("Failed to save chart: {e}");
                self.status_message = Some(format!("Error: {e}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use rusty_sif::Metadata;

    fn state_with(excitation: Option<f64>) -> AppState {
        let mut info = Metadata::new();
        if let Some(ex) = excitation {
            info.insert("RamanExWavelength", ex);
        }
        let spectrum = Spectrum::new(
            "trace.sif",
            Array::zeros((1, 1, 3)).into_dyn(),
            Array::linspace(540.0, 560.0, 3).into_dyn(),
            Array::zeros(1).into_dyn(),
            Some(info),
        )
        .unwrap();
        let mut state = AppState::default();
        state.set_spectrum(spectrum);
        state
    }

    #[test]
    fn raman_axis_is_computed_on_demand() {
        let mut state = state_with(Some(532.0));
        state.set_axis(AxisKind::RamanShift);
        assert_eq!(state.axis, AxisKind::RamanShift);
        assert_eq!(state.x_values().map(|x| x.len()), Some(3));
        assert!(state.status_message.is_none());
    }

    #[test]
    fn raman_axis_without_excitation_keeps_wavelength() {
        let mut state = state_with(None);
        state.set_axis(AxisKind::RamanShift);
        assert_eq!(state.axis, AxisKind::Wavelength);
        let msg = state.status_message.unwrap();
        assert!(msg.contains("RamanExWavelength"));
    }
}
