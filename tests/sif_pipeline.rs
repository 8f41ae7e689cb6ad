use approx::assert_abs_diff_eq;
use rusty_sif::data::sample::SampleAcquisition;
use rusty_sif::{JsonOptions, RenderConfig, Spectrum, SpectrumError};

fn peak_counts(width: usize) -> Vec<f32> {
    (0..width)
        .map(|p| {
            let d = p as f32 - width as f32 / 2.0;
            100.0 + 1000.0 * (-d * d / 20.0).exp()
        })
        .collect()
}

fn test_config() -> RenderConfig {
    RenderConfig::default().headless().with_dpi(20)
}

#[test]
fn reads_calibrated_single_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.sif");
    SampleAcquisition::raman(peak_counts(64), 532.0)
        .write(&path)
        .unwrap();

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    assert_eq!(spectrum.data().shape(), &[1, 1, 64]);
    assert_eq!(spectrum.timestamps().len(), 1);
    assert_abs_diff_eq!(spectrum.wavelengths()[0], 534.1, epsilon = 1e-9);
    assert!(spectrum.ramans().is_none());

    let ramans = spectrum.convert_xaxis_unit().unwrap().clone();
    assert_eq!(ramans.len(), 64);
    assert_abs_diff_eq!(
        ramans[0],
        (1.0 / 532.0 - 1.0 / 534.1) * 1e7,
        epsilon = 1e-6
    );
}

#[test]
fn plots_wavelength_and_raman_next_to_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.sif");
    SampleAcquisition::raman(peak_counts(64), 532.0)
        .write(&path)
        .unwrap();
    let expected = dir.path().join("trace_.png");

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    let saved = spectrum.plot_sif("lambda", &test_config()).unwrap();
    assert_eq!(saved.as_deref(), Some(expected.as_path()));
    assert!(expected.exists());
    std::fs::remove_file(&expected).unwrap();

    let saved = spectrum.plot_sif("RAMS", &test_config()).unwrap();
    assert_eq!(saved.as_deref(), Some(expected.as_path()));
    let image = image::open(&expected).unwrap();
    assert!(image.width() > 0 && image.height() > 0);
    assert!(spectrum.ramans().is_some());
}

#[test]
fn multi_frame_acquisitions_are_not_plotted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kinetic.sif");
    let mut sample = SampleAcquisition::raman(peak_counts(50).repeat(2), 785.0);
    sample.width = 50;
    sample.frames = 2;
    sample.timestamps = vec![0, 250];
    sample.write(&path).unwrap();

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    assert_eq!(spectrum.data().shape(), &[2, 1, 50]);
    assert_eq!(spectrum.timestamps().to_vec(), vec![0, 250]);
    assert!(spectrum.plot_sif("raman", &test_config()).unwrap().is_none());
    assert!(!dir.path().join("kinetic_.png").exists());
}

#[test]
fn raman_plot_without_excitation_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.sif");
    let mut sample = SampleAcquisition::raman(peak_counts(32), 532.0);
    sample.raman_ex_wavelength = None;
    sample.write(&path).unwrap();

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    let err = spectrum.plot_sif("raman", &test_config()).unwrap_err();
    assert!(matches!(err, SpectrumError::RamanUnavailable));
    assert!(!dir.path().join("plain_.png").exists());
}

#[test]
fn exports_json_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.sif");
    SampleAcquisition::raman(peak_counts(16), 633.0)
        .write(&path)
        .unwrap();
    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    spectrum.convert_xaxis_unit().unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&spectrum.to_json(&JsonOptions::full_data()).unwrap()).unwrap();
    assert_eq!(json["metadata"]["RamanExWavelength"], 633.0);
    assert_eq!(json["calibration"]["ramans"].as_array().unwrap().len(), 16);
    assert_eq!(json["frames"][0][0].as_array().unwrap().len(), 16);

    let csv_path = dir.path().join("trace.csv");
    let file = std::fs::File::create(&csv_path).unwrap();
    spectrum.write_frame_csv(0, file).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        ["wavelength_nm", "raman_shift_cm-1", "row_0"]
    );
    assert_eq!(reader.records().count(), 16);
}

#[test]
fn uncalibrated_files_still_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.sif");
    let mut sample = SampleAcquisition::raman(peak_counts(8), 532.0);
    sample.calibration = vec![0.0; 4];
    sample.raman_ex_wavelength = None;
    sample.write(&path).unwrap();

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    assert_eq!(spectrum.wavelengths().len(), 8);
    assert!(spectrum.wavelengths().iter().all(|&wl| wl == 0.0));
    assert!(spectrum.summary().contains("Wavelength:  0.00 - 0.00 nm"));
    let err = spectrum.plot_sif("raman", &test_config()).unwrap_err();
    assert!(matches!(err, SpectrumError::RamanUnavailable));
}

#[test]
fn wavelength_axis_follows_the_pixel_block_width() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cropped.sif");
    let bytes = SampleAcquisition::raman(peak_counts(4), 532.0).to_sif_bytes();
    let from: &[u8] = b"65541 1 1 4 1 1 1 4 4\n";
    let to: &[u8] = b"65541 1 1 8 1 1 1 4 4\n";
    let at = bytes
        .windows(from.len())
        .position(|w| w == from)
        .unwrap();
    let patched = [&bytes[..at], to, &bytes[at + from.len()..]].concat();
    std::fs::write(&path, patched).unwrap();

    let mut spectrum = Spectrum::read_sif(&path).unwrap();
    assert_eq!(spectrum.data().shape(), &[1, 1, 4]);
    assert_eq!(spectrum.wavelengths().len(), 4);
    let saved = spectrum.plot_sif("raman", &test_config()).unwrap();
    assert!(saved.is_some());
}
