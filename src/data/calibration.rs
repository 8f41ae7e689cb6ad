use ndarray::{Array1, Array2};

use super::error::SifError;
use super::model::{Metadata, MetadataValue};

/// Wavelength axis of the acquisition, as wide as the header's image area.
///
/// Uses the global `Calibration_data` polynomial; when that is absent or all
/// zero, falls back to the first per-frame calibration. An uncalibrated file
/// (only zero coefficients) yields an all-zero axis.
pub fn extract_calibration(info: &Metadata) -> Result<Array1<f64>, SifError> {
    extract_calibration_for_width(info, calibration_width(info)?)
}

/// [`extract_calibration`] evaluated over `width` pixels.
pub fn extract_calibration_for_width(
    info: &Metadata,
    width: usize,
) -> Result<Array1<f64>, SifError> {
    let global = info
        .get("Calibration_data")
        .and_then(MetadataValue::as_f64_list);
    let frame_one = info
        .get("Calibration_data_for_frame_1")
        .and_then(MetadataValue::as_f64_list);

    let coefficients = match (global, frame_one) {
        (Some(c), _) if has_signal(&c) => c,
        (_, Some(c)) if has_signal(&c) => c,
        (Some(c), _) | (None, Some(c)) => {
            log::warn!("no wavelength calibration available, using a zero axis");
            c
        }
        (None, None) => return Err(SifError::MissingCalibration),
    };
    Ok(evaluate_polynomial(&coefficients, width))
}

/// One wavelength row per frame over `width` pixels, from
/// `Calibration_data_for_frame_N`.
///
/// Returns `None` when the file carries no per-frame calibration.
pub fn extract_frame_calibrations(
    info: &Metadata,
    width: usize,
) -> Result<Option<Array2<f64>>, SifError> {
    if !info.contains_key("Calibration_data_for_frame_1") {
        return Ok(None);
    }
    let frames = info
        .get("NumberOfFrames")
        .and_then(MetadataValue::as_i64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(1);

    let mut out = Array2::zeros((frames, width));
    for (f, mut row) in out.rows_mut().into_iter().enumerate() {
        let key = format!("Calibration_data_for_frame_{}", f + 1);
        let coefficients = info
            .get(&key)
            .and_then(MetadataValue::as_f64_list)
            .ok_or(SifError::MissingCalibration)?;
        row.assign(&evaluate_polynomial(&coefficients, width));
    }
    Ok(Some(out))
}

/// `Σ c_j p^j` for the 1-based pixel positions `p = 1..=width`.
pub fn evaluate_polynomial(coefficients: &[f64], width: usize) -> Array1<f64> {
    Array1::from_iter((1..=width).map(|p| {
        let x = p as f64;
        coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }))
}

fn has_signal(coefficients: &[f64]) -> bool {
    coefficients.iter().any(|c| *c != 0.0)
}

/// Number of spectral pixels: the image area divided by the horizontal
/// binning, or the raw detector width when the area is unknown.
fn calibration_width(info: &Metadata) -> Result<usize, SifError> {
    let from_area = info
        .get("ImageArea")
        .and_then(MetadataValue::as_i64_list)
        .and_then(|area| match area {
            [x0, _, x1, _] => Some(1 + x1 - x0),
            _ => None,
        })
        .map(|span| {
            let xbin = info
                .get("xbin")
                .and_then(MetadataValue::as_i64)
                .filter(|b| *b > 0)
                .unwrap_or(1);
            span / xbin
        });
    let width = from_area.or_else(|| {
        info.get("DetectorDimensions")
            .and_then(MetadataValue::as_i64_list)
            .and_then(|dims| dims.first().copied())
    });
    match width {
        Some(w) if w > 0 => Ok(w as usize),
        Some(w) => Err(SifError::InvalidField {
            field: "ImageArea",
            value: w.to_string(),
        }),
        None => Err(SifError::MissingCalibration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn info_with(coefs: Vec<f64>, width: i64) -> Metadata {
        let mut info = Metadata::new();
        info.insert("DetectorDimensions", MetadataValue::IntList(vec![width, 1]));
        info.insert("Calibration_data", MetadataValue::FloatList(coefs));
        info
    }

    #[test]
    fn polynomial_uses_one_based_pixels() {
        let wl = evaluate_polynomial(&[500.0, 0.5, 0.01], 3);
        assert_abs_diff_eq!(wl[0], 500.51, epsilon = 1e-9);
        assert_abs_diff_eq!(wl[1], 501.04, epsilon = 1e-9);
        assert_abs_diff_eq!(wl[2], 501.59, epsilon = 1e-9);
    }

    #[test]
    fn global_calibration_spans_detector_width() {
        let wl = extract_calibration(&info_with(vec![400.0, 1.0, 0.0, 0.0], 1024)).unwrap();
        assert_eq!(wl.len(), 1024);
        assert_abs_diff_eq!(wl[1023], 1424.0, epsilon = 1e-9);
    }

    #[test]
    fn image_area_and_binning_set_the_width() {
        let mut info = info_with(vec![400.0, 1.0], 1024);
        info.insert("ImageArea", MetadataValue::IntList(vec![1, 1, 512, 1]));
        info.insert("xbin", 2i64);
        assert_eq!(extract_calibration(&info).unwrap().len(), 256);
    }

    #[test]
    fn zero_coefficients_fall_back_to_frame_one() {
        let mut info = info_with(vec![0.0; 4], 4);
        info.insert(
            "Calibration_data_for_frame_1",
            MetadataValue::FloatList(vec![600.0, 1.0]),
        );
        let wl = extract_calibration(&info).unwrap();
        assert_abs_diff_eq!(wl[0], 601.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_coefficients_give_a_zero_axis() {
        let wl = extract_calibration(&info_with(vec![0.0; 4], 16)).unwrap();
        assert_eq!(wl.len(), 16);
        assert!(wl.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn missing_calibration_is_an_error() {
        let mut info = Metadata::new();
        info.insert("DetectorDimensions", MetadataValue::IntList(vec![16, 1]));
        let err = extract_calibration(&info).unwrap_err();
        assert!(matches!(err, SifError::MissingCalibration));
    }

    #[test]
    fn explicit_width_overrides_image_area() {
        let mut info = info_with(vec![400.0, 1.0], 1024);
        info.insert("ImageArea", MetadataValue::IntList(vec![1, 1, 512, 1]));
        let wl = extract_calibration_for_width(&info, 100).unwrap();
        assert_eq!(wl.len(), 100);
        assert_abs_diff_eq!(wl[99], 500.0, epsilon = 1e-9);
    }

    #[test]
    fn per_frame_calibrations_fill_rows() {
        let mut info = info_with(vec![0.0], 2);
        info.insert("NumberOfFrames", 2i64);
        info.insert("Calibration_data_for_frame_1", MetadataValue::FloatList(vec![500.0, 1.0]));
        info.insert("Calibration_data_for_frame_2", MetadataValue::FloatList(vec![510.0, 1.0]));
        let cal = extract_frame_calibrations(&info, 2).unwrap().unwrap();
        assert_eq!(cal.shape(), &[2, 2]);
        assert_abs_diff_eq!(cal[[1, 1]], 512.0, epsilon = 1e-9);
        assert!(extract_frame_calibrations(&info_with(vec![1.0], 2), 2).unwrap().is_none());
    }
}
