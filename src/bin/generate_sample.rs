//! Write a synthetic Raman acquisition as a SIF file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rusty_sif::data::axis::NM_TO_WAVENUMBER;
use rusty_sif::data::sample::SampleAcquisition;

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic Raman SIF file")]
struct Args {
    /// Output file
    #[arg(default_value = "sample_data/raman.sif")]
    output: PathBuf,

    /// Excitation laser wavelength in nm
    #[arg(long, default_value_t = 532.0)]
    excitation: f64,

    /// Number of frames (plots need exactly one)
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Spectral pixels per row
    #[arg(long, default_value_t = 1024)]
    width: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Polystyrene-like bands: (shift cm⁻¹, width cm⁻¹, amplitude counts)
const PEAKS: [(f64, f64, f64); 5] = [
    (620.0, 6.0, 1800.0),
    (1001.0, 4.0, 9000.0),
    (1031.0, 5.0, 2500.0),
    (1602.0, 6.0, 3500.0),
    (2904.0, 12.0, 4200.0),
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// splitmix64 with a Box-Muller normal sampler.
struct SimpleRng(u64);

impl SimpleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng(args.seed);

    let mut sample = SampleAcquisition::raman(Vec::new(), args.excitation);
    let calibration = sample.calibration.clone();
    let counts: Vec<f32> = (0..args.frames)
        .flat_map(|_| 1..=args.width)
        .map(|pixel| {
            let p = pixel as f64;
            let wl: f64 = calibration.iter().rev().fold(0.0, |acc, c| acc * p + c);
            let shift = (1.0 / args.excitation - 1.0 / wl) * NM_TO_WAVENUMBER;
            let signal: f64 = PEAKS
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(shift, mu, sigma, amp))
                .sum();
            (300.0 + signal + rng.gauss(0.0, 25.0)) as f32
        })
        .collect();

    sample.width = args.width;
    sample.frames = args.frames;
    sample.timestamps = (0..args.frames as i64).map(|f| f * 1_000_000).collect();
    sample.counts = counts;

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    sample
        .write(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Wrote {} ({} frame(s), {} pixels, excitation {} nm)",
        args.output.display(),
        args.frames,
        args.width,
        args.excitation
    );
    Ok(())
}
