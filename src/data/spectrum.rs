use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ndarray::{s, Array1, Array2, Array3, ArrayD, ArrayView1, Ix1, Ix3};

use super::axis::{self, AxisKind, RAMAN_EX_WAVELENGTH};
use super::calibration;
use super::error::{Result, SpectrumError};
use super::info::{format_table, info_sections, TABLE_HEADERS};
use super::model::Metadata;
use super::sif;
use crate::render::{self, LineChart, RenderConfig};
use crate::viewer;

// ---------------------------------------------------------------------------
// Spectrum – one decoded acquisition
// ---------------------------------------------------------------------------

/// A decoded acquisition: counts, wavelength axis, timestamps and header.
#[derive(Debug, Clone)]
pub struct Spectrum {
    filename: String,
    /// (frame, image row, spectral pixel)
    data: Array3<f32>,
    wavelengths: Array1<f64>,
    timestamps: Array1<i64>,
    /// Raman shift axis, absent until [`Spectrum::convert_xaxis_unit`] runs.
    ramans: Option<Array1<f64>>,
    info: Metadata,
}

impl Spectrum {
    /// Build a spectrum from raw arrays.
    ///
    /// `data` must be 3-D, `wavelengths` and `timestamps` 1-D.
    pub fn new(
        filename: impl Into<String>,
        data: ArrayD<f32>,
        wavelengths: ArrayD<f64>,
        timestamps: ArrayD<i64>,
        info: Option<Metadata>,
    ) -> Result<Self> {
        let data_ndim = data.ndim();
        let data = data.into_dimensionality::<Ix3>().map_err(|_| {
            type_error("data", "a 3-dimensional array", format!("{data_ndim}-dimensional array"))
        })?;
        Ok(Self {
            filename: filename.into(),
            data,
            wavelengths: into_1d(wavelengths, "wavelengths")?,
            timestamps: into_1d(timestamps, "timestamps")?,
            ramans: None,
            info: info.unwrap_or_default(),
        })
    }

    /// Decode a SIF file, derive its wavelength axis and timestamps.
    pub fn read_sif(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (data, info) = sif::decode(path)?;
        let wavelengths = calibration::extract_calibration_for_width(&info, data.shape()[2])?;
        let timestamps: Array1<i64> = info
            .with_prefix("timestamp")
            .filter_map(|(_, v)| v.as_i64())
            .collect();

        log::info!(
            "loaded {} with shape {:?} ({} wavelengths, {} timestamps)",
            path.display(),
            data.shape(),
            wavelengths.len(),
            timestamps.len()
        );

        Self::new(
            path.to_string_lossy(),
            data.into_dyn(),
            wavelengths.into_dyn(),
            timestamps.into_dyn(),
            Some(info),
        )
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn wavelengths(&self) -> &Array1<f64> {
        &self.wavelengths
    }

    pub fn timestamps(&self) -> &Array1<i64> {
        &self.timestamps
    }

    pub fn ramans(&self) -> Option<&Array1<f64>> {
        self.ramans.as_ref()
    }

    pub fn info(&self) -> &Metadata {
        &self.info
    }

    /// Number of frames in the acquisition.
    pub fn frames(&self) -> usize {
        self.data.shape()[0]
    }

    /// Per-frame wavelength axes, when the header carries them.
    pub fn frame_calibrations(&self) -> Result<Option<Array2<f64>>> {
        Ok(calibration::extract_frame_calibrations(
            &self.info,
            self.data.shape()[2],
        )?)
    }

    // -- Metadata display --

    /// Print the metadata tables to stdout.
    pub fn show_pretty_info(&self, suppress_timestamps: bool, suppress_tiles: bool) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = self.write_pretty_info(&mut lock, suppress_timestamps, suppress_tiles) {
            log::error!("failed to print metadata: {e}");
        }
    }

    /// [`Spectrum::show_pretty_info`] with timestamps and tiles hidden.
    pub fn show_default_info(&self) {
        self.show_pretty_info(true, true);
    }

    pub fn write_pretty_info<W: Write>(
        &self,
        out: &mut W,
        suppress_timestamps: bool,
        suppress_tiles: bool,
    ) -> io::Result<()> {
        let sections = info_sections(&self.info, suppress_timestamps, suppress_tiles);
        writeln!(out, "{}", format_table(&sections.main, TABLE_HEADERS))?;
        if let Some(extra) = &sections.extra {
            writeln!(out, "{}", format_table(extra, TABLE_HEADERS))?;
        }
        Ok(())
    }

    // -- Axis conversion --

    /// Compute the Raman shift axis from `RamanExWavelength` and cache it.
    pub fn convert_xaxis_unit(&mut self) -> Result<&Array1<f64>> {
        let value = self
            .info
            .get(RAMAN_EX_WAVELENGTH)
            .ok_or_else(|| SpectrumError::MissingKey(RAMAN_EX_WAVELENGTH.to_string()))?;
        let excitation = value.as_f64().ok_or_else(|| SpectrumError::InvalidMetadata {
            key: RAMAN_EX_WAVELENGTH.to_string(),
            value: value.to_string(),
        })?;
        let ramans = self.ramans.insert(axis::raman_shift(&self.wavelengths, excitation));
        Ok(ramans)
    }

    // -- Plotting --

    /// The counts of a single-frame, single-row acquisition.
    pub fn single_trace(&self) -> Option<ArrayView1<'_, f32>> {
        match self.data.shape() {
            [1, 1, _] => Some(self.data.slice(s![0, 0, ..])),
            _ => None,
        }
    }

    /// `<filename minus its last 4 characters>_.png`
    pub fn output_png_path(&self) -> PathBuf {
        let keep = self.filename.chars().count().saturating_sub(4);
        let stem: String = self.filename.chars().take(keep).collect();
        PathBuf::from(format!("{stem}_.png"))
    }

    /// Resolve the x-axis for `kind`, converting to Raman shift on demand.
    pub fn x_axis(&mut self, kind: AxisKind) -> Result<Array1<f64>> {
        let trace_len = self.data.shape()[2];
        match kind {
            AxisKind::Wavelength => Ok(self.wavelengths.clone()),
            AxisKind::RamanShift => {
                if self.ramans.as_ref().map_or(true, |r| r.is_empty()) {
                    if let Err(e) = self.convert_xaxis_unit() {
                        return Err(match e {
                            SpectrumError::MissingKey(_) => SpectrumError::RamanUnavailable,
                            other => other,
                        });
                    }
                }
                let ramans = match &self.ramans {
                    Some(r) if !r.is_empty() => r,
                    _ => return Err(SpectrumError::EmptyRamanAxis),
                };
                if ramans.len() != trace_len {
                    return Err(SpectrumError::ShapeMismatch {
                        ramans: ramans.shape().to_vec(),
                        counts: vec![trace_len],
                    });
                }
                Ok(ramans.clone())
            }
        }
    }

    /// Plot the single trace against the axis named by `axis` and save it as
    /// a PNG next to the source file.
    ///
    /// Multi-frame or multi-row acquisitions are skipped and return
    /// `Ok(None)`.
    pub fn plot_sif(&mut self, axis: &str, config: &RenderConfig) -> Result<Option<PathBuf>> {
        let counts: Vec<f64> = match self.single_trace() {
            Some(trace) => trace.iter().map(|&c| f64::from(c)).collect(),
            None => {
                log::debug!(
                    "skipping plot of {}: shape {:?} is not a single trace",
                    self.filename,
                    self.data.shape()
                );
                return Ok(None);
            }
        };

        let kind: AxisKind = axis.parse()?;
        let x = self.x_axis(kind)?;
        let x = x.to_vec();
        let chart = LineChart {
            x: &x,
            y: &counts,
            x_label: kind.label(),
        };

        let path = self.output_png_path();
        render::save_line_chart(&chart, &path, config)?;
        println!("{} saved", path.display());

        if config.show {
            viewer::show_chart(&self.filename, &x, &counts, kind.label(), &config.y_label)?;
        }
        Ok(Some(path))
    }
}

fn type_error(field: &'static str, expected: &'static str, found: String) -> SpectrumError {
    SpectrumError::Type {
        field,
        expected,
        found,
    }
}

fn into_1d<T>(array: ArrayD<T>, field: &'static str) -> Result<Array1<T>> {
    let ndim = array.ndim();
    array
        .into_dimensionality::<Ix1>()
        .map_err(|_| type_error(field, "a 1-dimensional array", format!("{ndim}-dimensional array")))
}
