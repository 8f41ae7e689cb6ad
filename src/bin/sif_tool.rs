//! Command line access to SIF files: metadata dump, PNG plot and export.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusty_sif::{JsonOptions, RenderConfig, Spectrum};

#[derive(Parser)]
#[command(name = "sif-tool")]
#[command(author, version, about = "Inspect, plot and export Andor SIF spectra", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header metadata as a table
    Info {
        /// Input SIF file
        input: PathBuf,

        /// Also print the frame timestamps
        #[arg(long)]
        timestamps: bool,

        /// Also print the tile list (ignored with --timestamps)
        #[arg(long)]
        tiles: bool,
    },

    /// Plot a single-trace acquisition to `<file>_.png`
    Plot {
        /// Input SIF file
        input: PathBuf,

        /// x-axis keyword: wavelengths/lambda/wvl or raman/ramans/rams
        #[arg(short, long, default_value = "wavelengths")]
        axis: String,

        /// Output resolution
        #[arg(long, default_value = "500")]
        dpi: u32,

        /// Do not open the interactive window
        #[arg(long)]
        no_show: bool,
    },

    /// Export to JSON and/or CSV
    Export {
        /// Input SIF file
        input: PathBuf,

        /// JSON output path
        #[arg(long)]
        json: Option<PathBuf>,

        /// CSV output path for one frame
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Frame written to CSV
        #[arg(long, default_value = "0")]
        frame: usize,

        /// Include pixel data in the JSON
        #[arg(long)]
        full: bool,
    },
}

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose, cli.quiet)),
    )
    .init();

    match cli.command {
        Commands::Info {
            input,
            timestamps,
            tiles,
        } => {
            let spectrum = read(&input)?;
            print!("{}", spectrum.summary());
            println!();
            if timestamps || tiles {
                spectrum.show_pretty_info(!timestamps, !tiles);
            } else {
                spectrum.show_default_info();
            }
        }

        Commands::Plot {
            input,
            axis,
            dpi,
            no_show,
        } => {
            let mut spectrum = read(&input)?;
            let config = RenderConfig {
                show: !no_show,
                ..RenderConfig::default().with_dpi(dpi)
            };
            let saved = spectrum
                .plot_sif(&axis, &config)
                .with_context(|| format!("plotting {}", input.display()))?;
            if saved.is_none() {
                log::warn!(
                    "{} holds {:?} (frames, rows, pixels); only single traces are plotted",
                    input.display(),
                    spectrum.data().shape()
                );
            }
        }

        Commands::Export {
            input,
            json,
            csv,
            frame,
            full,
        } => {
            let mut spectrum = read(&input)?;
            if spectrum.convert_xaxis_unit().is_err() {
                log::info!("no Raman excitation wavelength, exporting wavelengths only");
            }

            if let Some(path) = json {
                let options = if full {
                    JsonOptions::full_data()
                } else {
                    JsonOptions::default()
                };
                let text = spectrum.to_json(&options)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("{} saved", path.display());
            }

            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                spectrum
                    .write_frame_csv(frame, BufWriter::new(file))
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("{} saved", path.display());
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<Spectrum> {
    Spectrum::read_sif(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filter() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(2, false), "debug");
        assert_eq!(log_filter(5, false), "trace");
        assert_eq!(log_filter(3, true), "error");
    }

    #[test]
    fn cli_parses_plot_flags() {
        let cli = Cli::try_parse_from(["sif-tool", "plot", "a.sif", "--axis", "raman", "--dpi", "100", "--no-show"])
            .unwrap();
        match cli.command {
            Commands::Plot { axis, dpi, no_show, .. } => {
                assert_eq!(axis, "raman");
                assert_eq!(dpi, 100);
                assert!(no_show);
            }
            _ => panic!("expected plot"),
        }
    }
}
