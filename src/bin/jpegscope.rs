//! jpegscope CLI - inspect baseline JPEG streams stage by stage.
//!
//! Decodes a baseline JPEG to planar samples, interleaved RGB, or the
//! intermediate coefficient/residual domains, and prints stream geometry.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use jpegscope_rs::{BaselineDecoder, DecodeBackend, DecodeOutput, Image, JpegError};

/// Baseline JPEG inspection decoder
#[derive(Parser)]
#[command(name = "jpegscope")]
#[command(version)]
#[command(about = "Decode baseline JPEG streams and inspect intermediate stages", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegscope info -i image.jpg
    jpegscope decode -i image.jpg -o image.ppm -f rgb
    jpegscope decode -i image.jpg -o planes.yuv -f yuv
    jpegscope decode -i image.jpg -o coef.bin -f coef

jpegscope accepts only 8-bit non-hierarchical baseline JPEG files.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a baseline JPEG to samples or intermediate stages
    #[command(visible_alias = "d")]
    Decode {
        /// Input JPEG file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output stage to produce
        #[arg(short, long, default_value = "yuv", value_enum)]
        format: OutputFormat,
    },

    /// Display frame geometry and sampling information
    #[command(visible_alias = "i")]
    Info {
        /// Input JPEG file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Planar 8-bit samples, concatenated plane by plane
    Yuv,
    /// Interleaved RGB written as a binary PPM
    Rgb,
    /// De-quantized coefficients, little-endian i16 per plane
    Coef,
    /// Post-transform residuals, little-endian i16 per plane
    Dct,
}

impl From<OutputFormat> for DecodeOutput {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yuv => DecodeOutput::Planar,
            OutputFormat::Rgb => DecodeOutput::Rgb,
            OutputFormat::Coef => DecodeOutput::Coefficients,
            OutputFormat::Dct => DecodeOutput::Residual,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Decode { input, output, format } => decode(&input, &output, format),
        Commands::Info { input } => info(&input),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_decode(
    backend: &mut dyn DecodeBackend,
    out: DecodeOutput,
) -> Result<Image, JpegError> {
    let header = backend.read_header()?;
    let mut img = Image::allocate(&header)?;
    backend.decode_image(&mut img, out)?;
    Ok(img)
}

fn decode(input: &PathBuf, output: &PathBuf, format: OutputFormat) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("cannot read {}: {e}", input.display()))?;
    let mut backend = BaselineDecoder::new(&data);
    let img = run_decode(&mut backend, format.into()).map_err(|e| e.to_string())?;
    let mut file =
        fs::File::create(output).map_err(|e| format!("cannot create {}: {e}", output.display()))?;
    let io_err = |e: std::io::Error| format!("cannot write {}: {e}", output.display());
    match format {
        OutputFormat::Yuv => {
            for plane in &img.planes {
                file.write_all(&plane.data).map_err(io_err)?;
            }
        }
        OutputFormat::Rgb => {
            write!(file, "P6\n{} {}\n255\n", img.width, img.height).map_err(io_err)?;
            file.write_all(&img.pixels).map_err(io_err)?;
        }
        OutputFormat::Coef | OutputFormat::Dct => {
            for plane in &img.planes {
                for &c in &plane.coef {
                    file.write_all(&c.to_le_bytes()).map_err(io_err)?;
                }
            }
        }
    }
    Ok(())
}

fn info(input: &PathBuf) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("cannot read {}: {e}", input.display()))?;
    let mut backend = BaselineDecoder::new(&data);
    let header = backend.read_header().map_err(|e| e.to_string())?;
    println!("{} x {}, {}-bit, {} component(s)", header.width, header.height, header.bits, header.ncomps);
    for (i, c) in header.components[..header.ncomps].iter().enumerate() {
        println!(
            "  component {i}: sampling {}x{}, {}x{} blocks",
            c.hsamp, c.vsamp, c.hblocks, c.vblocks
        );
    }
    Ok(())
}
