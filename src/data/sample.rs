//! Synthetic SIF files.
//!
//! Writes the same header layout [`sif::decode_bytes`](super::sif::decode_bytes)
//! reads, which is enough to exercise the full read → convert → plot path
//! without vendor software.

use std::io::Write;
use std::path::Path;

use super::sif::SIF_MAGIC;

/// A fabricated acquisition, encoded with [`SampleAcquisition::to_sif_bytes`].
#[derive(Debug, Clone)]
pub struct SampleAcquisition {
    /// Selects the spectrograph/gate block written after the shutter times.
    pub version: i64,
    /// 65540 puts the coefficients on their own line, anything else on the
    /// version line.
    pub calb_version: i64,
    /// Write the `1` data-offset flag followed by one line per frame.
    pub frame_flag_lines: bool,
    /// Sub-images stacked vertically in each frame, each `height` rows tall.
    pub subimages: usize,
    pub detector_type: String,
    pub original_filename: String,
    pub user_text: String,
    pub spectrograph: String,
    pub frames: usize,
    pub height: usize,
    pub width: usize,
    /// Polynomial wavelength coefficients, lowest order first.
    pub calibration: Vec<f64>,
    pub raman_ex_wavelength: Option<f64>,
    pub exposure_time: f64,
    pub temperature: f64,
    pub timestamps: Vec<i64>,
    /// `frames * subimages * height * width` counts, frame-major.
    pub counts: Vec<f32>,
}

impl SampleAcquisition {
    /// Single frame, single row Raman acquisition with a linear calibration
    /// starting just above the excitation line.
    pub fn raman(counts: Vec<f32>, excitation_nm: f64) -> Self {
        Self {
            version: 65567,
            calb_version: 65540,
            frame_flag_lines: false,
            subimages: 1,
            detector_type: "DU420_BEX2_DD".to_string(),
            original_filename: "C:\\data\\sample.sif".to_string(),
            user_text: String::new(),
            spectrograph: "SR-303i".to_string(),
            frames: 1,
            height: 1,
            width: counts.len(),
            calibration: vec![excitation_nm + 2.0, 0.1, 0.0, 0.0],
            raman_ex_wavelength: Some(excitation_nm),
            exposure_time: 1.0,
            temperature: -60.0,
            timestamps: vec![0],
            counts,
        }
    }

    pub fn to_sif_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(2048 + self.counts.len() * 4);
        out.extend_from_slice(SIF_MAGIC);
        out.extend_from_slice(b"65538 1\n");

        // Acquisition settings
        push(&mut out, format!("{} 0 0 1 1700000000 {} ", self.version, self.temperature));
        out.extend_from_slice(&[b' '; 10]);
        push(
            &mut out,
            format!(
                "0 {exp} {exp} {exp} 1 ",
                exp = self.exposure_time
            ),
        );
        out.extend_from_slice(b"\0 ");
        push(&mut out, "0 0.00001 0 1 0 0 0 0 ".to_string());
        push(&mut out, "0 ".repeat(16));
        push(&mut out, "500 0 0\n".to_string());

        // Detector
        push(&mut out, format!("{}\n", self.detector_type));
        push(
            &mut out,
            format!(
                "{} {} {} {} \n",
                self.width,
                self.height,
                self.original_filename.len(),
                self.original_filename
            ),
        );
        push(
            &mut out,
            format!("65538 {} {}\n", self.user_text.len(), self.user_text),
        );
        out.extend_from_slice(b"65538 ");
        out.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, b' ']);
        push(&mut out, "0 0\n".to_string());

        self.push_version_block(&mut out);

        // Calibration
        let coefs: Vec<String> = self.calibration.iter().map(f64::to_string).collect();
        if self.calb_version == 65540 {
            push(&mut out, "65540 \n".to_string());
            push(&mut out, format!("{}\n", coefs.join(" ")));
        } else {
            push(&mut out, format!("{} {}\n", self.calb_version, coefs.join(" ")));
        }
        push(&mut out, "0 1 0 0\n".to_string());
        push(&mut out, format!("{}\n", self.raman_ex_wavelength.unwrap_or(0.0)));
        push(&mut out, "0\n0\n0\n".to_string());

        for axis in ["Wavelength", "Counts", "Pixel number"] {
            push(&mut out, format!("{} {}", axis.len(), axis));
        }

        // Geometry
        let total_height = self.height * self.subimages;
        let image_len = self.width * total_height;
        push(
            &mut out,
            format!(
                "65541 1 {total_height} {w} 1 {frames} {subimages} {total} {image_len}\n",
                w = self.width,
                frames = self.frames,
                subimages = self.subimages,
                total = image_len * self.frames,
            ),
        );
        for _ in 0..self.subimages {
            push(
                &mut out,
                format!("65538 1 {} {} 1 1 1\n", self.height, self.width),
            );
        }
        for f in 0..self.frames {
            let ts = self.timestamps.get(f).copied().unwrap_or(f as i64 * 1_000);
            push(&mut out, format!("{ts}\n"));
        }
        if self.frame_flag_lines {
            out.extend_from_slice(b"1\n");
            push(&mut out, "0\n".repeat(self.frames));
        } else {
            out.extend_from_slice(b"0\n");
        }

        for value in &self.counts {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Lines between the shutter times and the calibration, by version.
    fn push_version_block(&self, out: &mut Vec<u8>) {
        let filler = |n: usize| "0\n".repeat(n);
        match self.version {
            65548..=65557 => push(out, filler(2)),
            65558 => push(out, filler(5)),
            65559 | 65564 => {
                push(out, filler(8));
                push(out, format!("65539 {}\n", self.spectrograph));
            }
            65565 => push(out, filler(15)),
            v if v > 65565 => {
                push(out, filler(8));
                push(out, format!("65539 {}\n", self.spectrograph));
                push(out, "0\n".to_string());
                push(out, "0 0 0 1 0 0 0 0\n".to_string());
                push(out, filler(8));
            }
            _ => {}
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.to_sif_bytes())
    }
}

fn push(out: &mut Vec<u8>, text: String) {
    out.extend_from_slice(text.as_bytes());
}
