//! Decoder for Andor SIF ("Andor Technology Multi-Channel File") acquisitions.
//!
//! The header is a mix of space separated text tokens, whole lines and
//! length-prefixed strings; the pixel block that follows is little-endian
//! `f32`, laid out frame by frame, row by row.

use std::path::Path;

use ndarray::Array3;

use super::error::SifError;
use super::model::{Metadata, MetadataValue, Tile};

pub const SIF_MAGIC: &[u8] = b"Andor Technology Multi-Channel File\n";

/// SIF version whose data-offset flag `1` is followed by one line per frame.
const VERSION_FRAME_FLAG_LINES: i64 = 65567;

type Result<T> = std::result::Result<T, SifError>;

/// Decode a SIF file into `(frames, height, width)` counts and its metadata.
pub fn decode(path: impl AsRef<Path>) -> Result<(Array3<f32>, Metadata)> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    decode_bytes(&bytes)
}

/// Decode an in-memory SIF file.
pub fn decode_bytes(bytes: &[u8]) -> Result<(Array3<f32>, Metadata)> {
    let mut reader = HeaderReader::new(bytes);
    let header = read_header(&mut reader)?;
    let data = read_pixels(bytes, &header)?;
    Ok((data, header.info))
}

// ---------------------------------------------------------------------------
// Header cursor
// ---------------------------------------------------------------------------

struct HeaderReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(SifError::UnexpectedEof(field))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn skip(&mut self, n: usize, field: &'static str) -> Result<()> {
        self.take(n, field).map(|_| ())
    }

    /// Next token delimited by a space or newline. Leading delimiters are
    /// skipped, the trailing one is consumed.
    fn token(&mut self, field: &'static str) -> Result<&'a [u8]> {
        while matches!(self.buf.get(self.pos), Some(b' ' | b'\n')) {
            self.pos += 1;
        }
        let start = self.pos;
        while let Some(&b) = self.buf.get(self.pos) {
            if b == b' ' || b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(SifError::UnexpectedEof(field));
        }
        let tok = &self.buf[start..self.pos];
        if self.pos < self.buf.len() {
            self.pos += 1;
        }
        Ok(tok)
    }

    fn skip_tokens(&mut self, n: usize, field: &'static str) -> Result<()> {
        for _ in 0..n {
            self.token(field)?;
        }
        Ok(())
    }

    fn int(&mut self, field: &'static str) -> Result<i64> {
        let tok = self.token(field)?;
        parse_token(tok, field)
    }

    fn float(&mut self, field: &'static str) -> Result<f64> {
        let tok = self.token(field)?;
        parse_token(tok, field)
    }

    /// Rest of the current line without the newline (and a trailing `\r`).
    fn line(&mut self, field: &'static str) -> Result<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return Err(SifError::UnexpectedEof(field));
        }
        let rest = &self.buf[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Ok(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn line_str(&mut self, field: &'static str) -> Result<String> {
        Ok(String::from_utf8_lossy(self.line(field)?).trim().to_string())
    }

    fn skip_lines(&mut self, n: usize, field: &'static str) -> Result<()> {
        for _ in 0..n {
            self.line(field)?;
        }
        Ok(())
    }

    /// `<length> <bytes>` string.
    fn string(&mut self, field: &'static str) -> Result<String> {
        let len = self.int(field)?;
        let len = usize::try_from(len).map_err(|_| SifError::InvalidField {
            field,
            value: len.to_string(),
        })?;
        let raw = self.take(len, field)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn skip_spaces(&mut self) {
        while matches!(self.buf.get(self.pos), Some(b' ' | b'\n')) {
            self.pos += 1;
        }
    }
}

fn parse_token<T: std::str::FromStr>(tok: &[u8], field: &'static str) -> Result<T> {
    let text = String::from_utf8_lossy(tok);
    text.trim().parse().map_err(|_| SifError::InvalidField {
        field,
        value: text.into_owned(),
    })
}

// ---------------------------------------------------------------------------
// Header layout
// ---------------------------------------------------------------------------

struct Header {
    info: Metadata,
    frames: usize,
    height: usize,
    width: usize,
    data_offset: usize,
}

fn read_header(r: &mut HeaderReader<'_>) -> Result<Header> {
    let mut info = Metadata::new();

    if !r.buf.starts_with(SIF_MAGIC) {
        return Err(SifError::NotSif);
    }
    r.skip(SIF_MAGIC.len(), "magic")?;
    r.line("file flags")?;

    // Line 3: acquisition settings
    let version = r.int("SifVersion")?;
    info.insert("SifVersion", version);
    r.skip_tokens(3, "SifVersion")?;
    info.insert("ExperimentTime", r.int("ExperimentTime")?);
    info.insert("DetectorTemperature", r.float("DetectorTemperature")?);
    r.skip(10, "DetectorTemperature")?;
    r.token("ExposureTime")?;
    info.insert("ExposureTime", r.float("ExposureTime")?);
    info.insert("CycleTime", r.float("CycleTime")?);
    info.insert("AccumulatedCycleTime", r.float("AccumulatedCycleTime")?);
    info.insert("AccumulatedCycles", r.int("AccumulatedCycles")?);
    r.skip(2, "AccumulatedCycles")?;
    info.insert("StackCycleTime", r.float("StackCycleTime")?);
    info.insert("PixelReadoutTime", r.float("PixelReadoutTime")?);
    r.skip_tokens(2, "GainDAC")?;
    info.insert("GainDAC", r.float("GainDAC")?);
    r.skip_tokens(2, "GateWidth")?;
    let mut gate_width = r.float("GateWidth")?;
    r.skip_tokens(16, "GratingBlaze")?;
    let grating_blaze = r.float("GratingBlaze")?;
    r.line("GratingBlaze")?;

    // Detector
    info.insert("DetectorType", r.line_str("DetectorType")?);
    let det_w = r.int("DetectorDimensions")?;
    let det_h = r.int("DetectorDimensions")?;
    info.insert("DetectorDimensions", MetadataValue::IntList(vec![det_w, det_h]));
    info.insert("OriginalFilename", r.string("OriginalFilename")?);
    r.skip(2, "OriginalFilename")?;

    r.int("user_text")?;
    let user_text = r.string("user_text")?;
    r.skip(1, "user_text")?;

    r.int("ShutterTime")?;
    r.skip(8, "ShutterTime")?;
    let shutter = vec![r.float("ShutterTime")?, r.float("ShutterTime")?];
    info.insert("ShutterTime", MetadataValue::FloatList(shutter));

    let mut spectrograph = None;
    match version {
        65548..=65557 => r.skip_lines(2, "version block")?,
        65558 => r.skip_lines(5, "version block")?,
        65559 | 65564 => {
            r.skip_lines(8, "version block")?;
            spectrograph = second_word(r.line("spectrograph")?);
        }
        65565 => r.skip_lines(15, "version block")?,
        v if v > 65565 => {
            r.skip_lines(8, "version block")?;
            spectrograph = second_word(r.line("spectrograph")?);
            r.line("GateGain")?;
            r.skip_tokens(3, "GateGain")?;
            info.insert("GateGain", r.float("GateGain")?);
            r.skip_tokens(2, "GateDelay")?;
            info.insert("GateDelay", r.float("GateDelay")? * 1e-12);
            gate_width = r.float("GateWidth")? * 1e-12;
            r.skip_lines(8, "version block")?;
        }
        _ => {}
    }
    info.insert("GateWidth", gate_width);
    info.insert("GratingBlaze", grating_blaze);
    if let Some(name) = &spectrograph {
        info.insert("spectrograph", name.as_str());
    }

    // Calibration
    let calb_version = r.int("SifCalbVersion")?;
    info.insert("SifCalbVersion", calb_version);
    if calb_version == 65540 {
        r.line("SifCalbVersion")?;
    }
    let coefficients = parse_coefficients(r.line("Calibration_data")?, "Calibration_data")?;
    info.insert("Calibration_data", MetadataValue::FloatList(coefficients));
    r.line("calibration (legacy)")?;
    let raman_line = r.line_str("RamanExWavelength")?;
    match raman_line.split_whitespace().next().map(str::parse::<f64>) {
        Some(Ok(wl)) if wl.is_finite() && wl > 0.0 => {
            info.insert("RamanExWavelength", wl);
        }
        _ => log::debug!("no Raman excitation wavelength in header ({raman_line:?})"),
    }
    r.skip_lines(3, "RamanExWavelength")?;

    info.insert("FrameAxis", r.string("FrameAxis")?);
    info.insert("DataType", r.string("DataType")?);
    info.insert("ImageAxis", r.string("ImageAxis")?);

    // Image geometry
    r.int("ImageArea")?;
    let x0 = r.int("ImageArea")?;
    let y1 = r.int("ImageArea")?;
    let x1 = r.int("ImageArea")?;
    let y0 = r.int("ImageArea")?;
    info.insert("ImageArea", MetadataValue::IntList(vec![x0, y1, x1, y0]));
    let frames = r.int("NumberOfFrames")?;
    let subimages = r.int("NumberOfSubImages")?;
    info.insert("NumberOfFrames", frames);
    info.insert("NumberOfSubImages", subimages);
    info.insert("TotalLength", r.int("TotalLength")?);
    info.insert("ImageLength", r.int("ImageLength")?);
    let frames = to_count(frames, "NumberOfFrames")?;
    let subimages = to_count(subimages, "NumberOfSubImages")?;

    let mut width = 0;
    let mut height: usize = 0;
    for _ in 0..subimages {
        r.int("FrameArea")?;
        let area = r.line("FrameArea")?;
        let fields: Vec<i64> = String::from_utf8_lossy(area)
            .split_whitespace()
            .take(6)
            .map(|tok| parse_token(tok.as_bytes(), "FrameArea"))
            .collect::<Result<_>>()?;
        let [sx0, sy1, sx1, sy0, ybin, xbin] = fields[..] else {
            return Err(SifError::InvalidField {
                field: "FrameArea",
                value: String::from_utf8_lossy(area).into_owned(),
            });
        };
        if xbin <= 0 || ybin <= 0 {
            return Err(SifError::InvalidField {
                field: "FrameArea",
                value: format!("binning {xbin}x{ybin}"),
            });
        }
        width = binned_span(sx0, sx1, xbin)?;
        height = height
            .checked_add(binned_span(sy0, sy1, ybin)?)
            .ok_or_else(|| frame_area_error(format!("total height overflows after {height}")))?;
        info.insert("xbin", xbin);
        info.insert("ybin", ybin);
    }

    r.skip_spaces();
    for f in 0..frames {
        let line = r.line_str("timestamp")?;
        let ts: i64 = parse_token(line.as_bytes(), "timestamp")?;
        info.insert(format!("timestamp_of_{f}"), ts);
    }

    let mut data_offset = r.pos;
    let flag_line = r.line("data offset flag").map(|l| String::from_utf8_lossy(l).trim().to_string());
    match flag_line.as_deref() {
        Ok("0") => data_offset = r.pos,
        Ok("1") if version == VERSION_FRAME_FLAG_LINES => {
            r.skip_lines(frames, "frame flags")?;
            data_offset = r.pos;
        }
        _ => {}
    }

    let frame_bytes = pixel_bytes(1, height, width)?;
    let expected = pixel_bytes(frames, height, width)?;
    let available = r.buf.len().saturating_sub(data_offset);
    if available < expected {
        return Err(SifError::Truncated {
            expected,
            found: available,
        });
    }
    let tiles = (0..frames)
        .map(|frame| Tile {
            frame,
            offset: (data_offset + frame * frame_bytes) as u64,
            width,
            height,
        })
        .collect();
    info.insert("tile", MetadataValue::Tiles(tiles));

    extract_user_text(&mut info, &user_text);
    info.insert("user_text", user_text);

    log::debug!(
        "SIF v{version}: {frames} frame(s) of {height}x{width}, data at byte {data_offset}"
    );

    Ok(Header {
        info,
        frames,
        height,
        width,
        data_offset,
    })
}

fn read_pixels(bytes: &[u8], header: &Header) -> Result<Array3<f32>> {
    let expected = pixel_bytes(header.frames, header.height, header.width)?;
    let available = bytes.len().saturating_sub(header.data_offset);
    if available < expected {
        return Err(SifError::Truncated {
            expected,
            found: available,
        });
    }
    let block = &bytes[header.data_offset..header.data_offset + expected];
    let values: Vec<f32> = block
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Array3::from_shape_vec((header.frames, header.height, header.width), values).map_err(|e| {
        SifError::InvalidField {
            field: "ImageLength",
            value: e.to_string(),
        }
    })
}

/// Pixels along one axis of a sub-image: `(1 + hi - lo) / bin`.
fn binned_span(lo: i64, hi: i64, bin: i64) -> Result<usize> {
    let span = hi
        .checked_sub(lo)
        .and_then(|d| d.checked_add(1))
        .ok_or_else(|| frame_area_error(format!("{lo}..{hi}")))?;
    to_count(span / bin, "FrameArea")
}

/// Size in bytes of `frames` images of `height` x `width` `f32` pixels.
fn pixel_bytes(frames: usize, height: usize, width: usize) -> Result<usize> {
    frames
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
        .ok_or_else(|| frame_area_error(format!("{frames} x {height} x {width} pixels")))
}

fn frame_area_error(value: String) -> SifError {
    SifError::InvalidField {
        field: "FrameArea",
        value,
    }
}

fn to_count(value: i64, field: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| SifError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn second_word(line: &[u8]) -> Option<String> {
    String::from_utf8_lossy(line)
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

fn parse_coefficients(line: &[u8], field: &'static str) -> Result<Vec<f64>> {
    String::from_utf8_lossy(line)
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(|tok| parse_token(tok.as_bytes(), field))
        .collect()
}

/// Pulls `Calibration data for frame N: c0,c1,...` lines out of the user
/// text as `Calibration_data_for_frame_N`.
fn extract_user_text(info: &mut Metadata, user_text: &str) {
    const PREFIX: &str = "Calibration data for frame ";
    for line in user_text.lines() {
        let Some(rest) = line.trim().strip_prefix(PREFIX) else {
            continue;
        };
        let Some((frame, coefs)) = rest.split_once(':') else {
            continue;
        };
        let Ok(frame) = frame.trim().parse::<usize>() else {
            continue;
        };
        match parse_coefficients(coefs.as_bytes(), "Calibration_data_for_frame") {
            Ok(values) => {
                info.insert(
                    format!("Calibration_data_for_frame_{frame}"),
                    MetadataValue::FloatList(values),
                );
            }
            Err(e) => log::warn!("ignoring calibration for frame {frame}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::SampleAcquisition;

    #[test]
    fn decodes_sample_header_and_pixels() {
        let sample = SampleAcquisition::raman(vec![1.0, 2.0, 3.0, 4.0], 532.0);
        let (data, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();

        assert_eq!(data.shape(), &[1, 1, 4]);
        assert_eq!(data[[0, 0, 3]], 4.0);
        assert_eq!(info.get("SifVersion"), Some(&MetadataValue::Integer(65567)));
        assert_eq!(info.get("DetectorType").and_then(MetadataValue::as_str), Some("DU420_BEX2_DD"));
        assert_eq!(info.get("RamanExWavelength").and_then(MetadataValue::as_f64), Some(532.0));
        assert_eq!(info.get("NumberOfFrames"), Some(&MetadataValue::Integer(1)));
        assert_eq!(info.get("xbin"), Some(&MetadataValue::Integer(1)));
        assert_eq!(info.get("FrameAxis").and_then(MetadataValue::as_str), Some("Wavelength"));
        assert!(info.contains_key("timestamp_of_0"));
        assert!(matches!(info.get("tile"), Some(MetadataValue::Tiles(t)) if t.len() == 1));
    }

    #[test]
    fn decodes_multiple_frames_in_order() {
        let mut sample = SampleAcquisition::raman(vec![0.0; 3], 785.0);
        sample.frames = 3;
        sample.counts = (0..9).map(|v| v as f32).collect();
        sample.timestamps = vec![0, 1_000, 2_000];
        let (data, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();

        assert_eq!(data.shape(), &[3, 1, 3]);
        assert_eq!(data[[2, 0, 0]], 6.0);
        let stamps: Vec<i64> = info
            .with_prefix("timestamp")
            .filter_map(|(_, v)| v.as_i64())
            .collect();
        assert_eq!(stamps, [0, 1_000, 2_000]);
    }

    #[test]
    fn missing_raman_wavelength_is_omitted() {
        let mut sample = SampleAcquisition::raman(vec![1.0; 8], 532.0);
        sample.raman_ex_wavelength = None;
        let (_, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();
        assert!(!info.contains_key("RamanExWavelength"));
    }

    #[test]
    fn frame_calibrations_come_from_user_text() {
        let mut sample = SampleAcquisition::raman(vec![1.0; 4], 532.0);
        sample.user_text =
            "Calibration data for frame 1: 500.0,0.1,0,0\nCalibration data for frame 2: 501,0.1\n"
                .to_string();
        let (_, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();
        assert_eq!(
            info.get("Calibration_data_for_frame_2"),
            Some(&MetadataValue::FloatList(vec![501.0, 0.1]))
        );
    }

    #[test]
    fn rejects_foreign_files() {
        let err = decode_bytes(b"\x89PNG\r\n\x1a\n not a spectrum").unwrap_err();
        assert!(matches!(err, SifError::NotSif));
    }

    #[test]
    fn reports_truncated_pixel_data() {
        let sample = SampleAcquisition::raman(vec![1.0; 16], 532.0);
        let mut bytes = sample.to_sif_bytes();
        bytes.truncate(bytes.len() - 6);
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SifError::Truncated { expected: 64, found: 58 }));
    }

    #[test]
    fn reports_truncated_header() {
        let sample = SampleAcquisition::raman(vec![1.0; 4], 532.0);
        let bytes = sample.to_sif_bytes();
        let err = decode_bytes(&bytes[..200]).unwrap_err();
        assert!(matches!(
            err,
            SifError::UnexpectedEof(_) | SifError::InvalidField { .. }
        ));
    }

    fn replace_once(bytes: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
        let at = bytes
            .windows(from.len())
            .position(|w| w == from)
            .expect("pattern present");
        [&bytes[..at], to, &bytes[at + from.len()..]].concat()
    }

    #[test]
    fn oversized_frame_area_is_an_invalid_field() {
        let sample = SampleAcquisition::raman(vec![1.0; 4], 532.0);
        let bytes = replace_once(
            &sample.to_sif_bytes(),
            b"65538 1 1 4 1 1 1\n",
            b"65538 1 1 9223372036854775806 1 1 1\n",
        );
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SifError::InvalidField { field: "FrameArea", .. }));
    }

    #[test]
    fn frame_area_larger_than_the_file_is_truncated() {
        let sample = SampleAcquisition::raman(vec![1.0; 4], 532.0);
        let bytes = replace_once(
            &sample.to_sif_bytes(),
            b"65538 1 1 4 1 1 1\n",
            b"65538 1 1 1099511627776 1 1 1\n",
        );
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SifError::Truncated { found: 16, .. }));
    }

    #[test]
    fn decodes_every_version_block() {
        for (version, spectrograph) in [
            (65540, None),
            (65550, None),
            (65558, None),
            (65559, Some("SR-303i")),
            (65564, Some("SR-303i")),
            (65565, None),
            (65567, Some("SR-303i")),
        ] {
            let mut sample = SampleAcquisition::raman(vec![1.0, 2.0, 3.0], 532.0);
            sample.version = version;
            let (data, info) = decode_bytes(&sample.to_sif_bytes())
                .unwrap_or_else(|e| panic!("version {version}: {e}"));
            assert_eq!(data[[0, 0, 2]], 3.0, "version {version}");
            assert_eq!(
                info.get("spectrograph").and_then(MetadataValue::as_str),
                spectrograph,
                "version {version}"
            );
            assert_eq!(info.contains_key("GateGain"), version > 65565, "version {version}");
            assert_eq!(
                info.get("RamanExWavelength").and_then(MetadataValue::as_f64),
                Some(532.0),
                "version {version}"
            );
        }
    }

    #[test]
    fn coefficients_on_the_calibration_version_line() {
        let mut sample = SampleAcquisition::raman(vec![1.0; 4], 532.0);
        sample.calb_version = 65539;
        let (_, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();
        assert_eq!(info.get("SifCalbVersion"), Some(&MetadataValue::Integer(65539)));
        assert_eq!(
            info.get("Calibration_data"),
            Some(&MetadataValue::FloatList(vec![534.0, 0.1, 0.0, 0.0]))
        );
    }

    #[test]
    fn frame_flag_lines_are_skipped_before_pixels() {
        let mut sample = SampleAcquisition::raman(vec![0.0; 2], 532.0);
        sample.frames = 3;
        sample.frame_flag_lines = true;
        sample.counts = (0..6).map(|v| v as f32).collect();
        let (data, info) = decode_bytes(&sample.to_sif_bytes()).unwrap();
        assert_eq!(data.shape(), &[3, 1, 2]);
        assert_eq!(data[[0, 0, 0]], 0.0);
        assert_eq!(data[[2, 0, 1]], 5.0);
        let Some(MetadataValue::Tiles(tiles)) = info.get("tile") else {
            panic!("tile list missing");
        };
        assert_eq!(tiles[1].offset - tiles[0].offset, 8);
    }

    #[test]
    fn sub_image_heights_are_summed() {
        let mut sample = SampleAcquisition::raman(vec![0.0; 3], 532.0);
        sample.subimages = 2;
        sample.counts = (0..6).map(|v| v as f32).collect();
        let (data, _) = decode_bytes(&sample.to_sif_bytes()).unwrap();
        assert_eq!(data.shape(), &[1, 2, 3]);
        assert_eq!(data[[0, 1, 0]], 3.0);
    }
}
