//! JSON, CSV and text summaries of a [`Spectrum`].

use std::fmt::Write as _;
use std::io::Write;

use ndarray::Axis;
use serde::Serialize;

use super::error::{Result, SpectrumError};
use super::model::{Metadata, MetadataValue};
use super::spectrum::Spectrum;

/// What goes into [`Spectrum::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct JsonOptions {
    pub include_metadata: bool,
    pub include_calibration: bool,
    pub include_data: bool,
    pub pretty: bool,
    /// Frames to export, 0 for all.
    pub max_frames: usize,
    /// Spectral pixels per row, 0 for all.
    pub max_data_points: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_calibration: true,
            include_data: false,
            pretty: true,
            max_frames: 0,
            max_data_points: 0,
        }
    }
}

impl JsonOptions {
    pub fn metadata_only() -> Self {
        Self {
            include_calibration: false,
            ..Self::default()
        }
    }

    pub fn full_data() -> Self {
        Self {
            include_data: true,
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct Dimensions {
    frames: usize,
    height: usize,
    width: usize,
}

#[derive(Serialize)]
struct CalibrationJson<'a> {
    wavelengths: &'a [f64],
    #[serde(skip_serializing_if = "Option::is_none")]
    ramans: Option<&'a [f64]>,
    /// One wavelength row per frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<Vec<f64>>>,
}

#[derive(Serialize)]
struct SpectrumJson<'a> {
    filename: &'a str,
    dimensions: Dimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration: Option<CalibrationJson<'a>>,
    timestamps: &'a [i64],
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<Vec<Vec<f32>>>>,
}

fn limit(requested: usize, available: usize) -> usize {
    if requested == 0 {
        available
    } else {
        requested.min(available)
    }
}

impl Spectrum {
    /// Serialize the acquisition to a JSON string.
    pub fn to_json(&self, options: &JsonOptions) -> Result<String> {
        let (frames, height, width) = self.data().dim();

        let data = options.include_data.then(|| {
            let n_frames = limit(options.max_frames, frames);
            let n_points = limit(options.max_data_points, width);
            self.data()
                .axis_iter(Axis(0))
                .take(n_frames)
                .map(|frame| {
                    frame
                        .rows()
                        .into_iter()
                        .map(|row| row.iter().take(n_points).copied().collect::<Vec<f32>>())
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        });

        let wavelengths = self.wavelengths().as_slice();
        let calibration = match (options.include_calibration, wavelengths) {
            (true, Some(wavelengths)) => Some(CalibrationJson {
                wavelengths,
                ramans: self.ramans().and_then(|r| r.as_slice()),
                frames: self
                    .frame_calibrations()?
                    .map(|cal| cal.rows().into_iter().map(|row| row.to_vec()).collect()),
            }),
            _ => None,
        };

        let doc = SpectrumJson {
            filename: self.filename(),
            dimensions: Dimensions {
                frames,
                height,
                width,
            },
            metadata: options.include_metadata.then(|| self.info()),
            calibration,
            timestamps: self.timestamps().as_slice().unwrap_or(&[]),
            frames: data,
        };

        let json = if options.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(json)
    }

    /// Write one frame as CSV, one row per spectral pixel.
    pub fn write_frame_csv<W: Write>(&self, frame: usize, writer: W) -> Result<()> {
        let frames = self.frames();
        if frame >= frames {
            return Err(SpectrumError::FrameOutOfRange {
                index: frame,
                frames,
            });
        }
        let image = self.data().index_axis(Axis(0), frame);
        let ramans = self.ramans();

        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec!["wavelength_nm".to_string()];
        if ramans.is_some() {
            header.push("raman_shift_cm-1".to_string());
        }
        header.extend((0..image.nrows()).map(|r| format!("row_{r}")));
        csv.write_record(&header)?;

        for (p, column) in image.axis_iter(Axis(1)).enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(
                self.wavelengths()
                    .get(p)
                    .map_or_else(String::new, f64::to_string),
            );
            if let Some(ramans) = ramans {
                record.push(ramans.get(p).map_or_else(String::new, f64::to_string));
            }
            record.extend(column.iter().map(f32::to_string));
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Short human-readable description of the acquisition.
    pub fn summary(&self) -> String {
        let info = self.info();
        let text = |key: &str| {
            info.get(key)
                .map_or_else(|| "unknown".to_string(), MetadataValue::to_string)
        };
        let shape = self.data().shape();

        let mut out = String::new();
        let _ = writeln!(out, "File:        {}", self.filename());
        let _ = writeln!(out, "Detector:    {}", text("DetectorType"));
        let _ = writeln!(out, "SIF version: {}", text("SifVersion"));
        let _ = writeln!(out, "Frames:      {}", shape[0]);
        let _ = writeln!(out, "Image:       {} x {}", shape[2], shape[1]);
        let _ = writeln!(out, "Exposure:    {} s", text("ExposureTime"));
        let _ = writeln!(out, "Temperature: {} C", text("DetectorTemperature"));
        let wl = self.wavelengths();
        if let (Some(first), Some(last)) = (wl.first(), wl.last()) {
            let _ = writeln!(out, "Wavelength:  {first:.2} - {last:.2} nm");
        }
        match self.frame_calibrations() {
            Ok(Some(cal)) => {
                for (f, row) in cal.rows().into_iter().enumerate() {
                    if let (Some(first), Some(last)) = (row.first(), row.last()) {
                        let _ = writeln!(out, "  frame {}:   {first:.2} - {last:.2} nm", f + 1);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("per-frame calibration unavailable: {e}"),
        }
        if let Some(ex) = info.get("RamanExWavelength") {
            let _ = writeln!(out, "Excitation:  {ex} nm");
        }
        out
    }
}
