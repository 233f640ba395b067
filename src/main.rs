use anyhow::{Context, Result};
use log::{info, warn};
use memmap2::Mmap;
use pixform::Error;
use std::env;
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

enum Mode {
    PngToJpeg,
    JpegToPng,
}

struct Args {
    input: String,
    output: String,
    quality: u8,
}

fn parse_args(argv: &[String]) -> Result<Args> {
    if argv.len() < 2 {
        return Err(Error::ArgumentError(
            "usage: pixform <input> <output> [-q|--quality <1-100>]".into(),
        )
        .into());
    }

    let input = argv[0].clone();
    let output = argv[1].clone();
    let mut quality = 50u8;

    let mut i = 2;
    while i < argv.len() {
        match argv[i].as_str() {
            "-q" | "--quality" => {
                let value = argv
                    .get(i + 1)
                    .ok_or_else(|| Error::ArgumentError("missing value for quality flag".into()))?;
                let parsed: i64 = value
                    .parse()
                    .map_err(|_| Error::ArgumentError(format!("invalid quality value '{}'", value)))?;
                if !(1..=100).contains(&parsed) {
                    return Err(
                        Error::ArgumentError("quality must be between 1 and 100".into()).into(),
                    );
                }
                quality = parsed as u8;
                i += 2;
            }
            unknown => {
                warn!("ignoring unknown argument '{}'", unknown);
                i += 1;
            }
        }
    }

    Ok(Args {
        input,
        output,
        quality,
    })
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|&candidate| e == candidate)
        })
        .unwrap_or(false)
}

fn detect_mode(input: &str, output: &str) -> Result<Mode> {
    if has_extension(input, &["png"]) && has_extension(output, &["jpg", "jpeg"]) {
        Ok(Mode::PngToJpeg)
    } else if has_extension(input, &["jpg", "jpeg"]) && has_extension(output, &["png"]) {
        Ok(Mode::JpegToPng)
    } else {
        Err(Error::ArgumentError(
            "could not determine conversion mode from extensions \
             (supported: .png -> .jpg/.jpeg, .jpg/.jpeg -> .png)"
                .into(),
        )
        .into())
    }
}

fn run() -> Result<()> {
    let argv: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&argv)?;
    let mode = detect_mode(&args.input, &args.output)?;

    let file = File::open(&args.input)
        .with_context(|| format!("could not open input file '{}'", args.input))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("could not map input file '{}'", args.input))?;

    let start = Instant::now();
    let output_bytes = match mode {
        Mode::PngToJpeg => {
            info!("converting {} -> {} at quality {}", args.input, args.output, args.quality);
            pixform::png_to_jpeg(&mmap, args.quality)?
        }
        Mode::JpegToPng => {
            info!("converting {} -> {}", args.input, args.output);
            pixform::jpeg_to_png(&mmap)?
        }
    };

    // The output file only comes into existence once the whole pipeline
    // has succeeded; a failed conversion leaves nothing behind.
    std::fs::write(&args.output, &output_bytes)
        .with_context(|| format!("could not write output file '{}'", args.output))?;

    info!(
        "wrote {} bytes to {} in {:.3}s",
        output_bytes.len(),
        args.output,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
