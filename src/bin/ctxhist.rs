// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger;
use image::GrayImage;
use log::{info, warn};

use context_histogram::dataset::{nickname, SequenceAxis};
use context_histogram::image_funcs::{load_image, load_sequence};
use context_histogram::kernel::{kernel_by_name, set_kernel};
use context_histogram::{context_histogram, BinParams, FeatureArray, RadiusSet};

/// Computes multi-radius context histogram features of an image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Path of the image to process.
    #[arg(short, long)]
    input: String,

    /// Further images stacked onto the input as extra channels.
    #[arg(short, long, value_delimiter = ',')]
    sequence: Vec<String>,

    /// Directory where one PNG per feature plane is written.
    #[arg(short, long)]
    output: Option<String>,

    /// Square half-widths, strictly increasing.
    #[arg(short, long, value_delimiter = ',', default_value = "3,4")]
    radii: Vec<u32>,

    /// Number of histogram bins per channel.
    #[arg(short, long, default_value_t = 4)]
    nbins: usize,

    /// Lower end of the histogram value range.
    #[arg(long, default_value_t = 0.0)]
    range_lo: f32,

    /// Upper end of the histogram value range.
    #[arg(long, default_value_t = 1.0)]
    range_hi: f32,

    /// Rescale samples to [0, 1] before binning.
    #[arg(long, default_value_t = false)]
    normalize: std::primitive::bool,

    /// Histogram kernel: scalar or row-sum.
    #[arg(short, long, default_value = "row-sum")]
    kernel: String,

    /// Print the feature vector of pixel "y,x".
    #[arg(short, long)]
    probe: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let kernel = kernel_by_name(&args.kernel).unwrap_or_else(|| {
        panic!("Unknown kernel '{}'; use scalar or row-sum", args.kernel);
    });
    set_kernel(kernel);
    let radii = RadiusSet::new(args.radii.clone()).unwrap_or_else(|e| {
        panic!("Bad --radii {:?}: {}", args.radii, e);
    });
    let params = BinParams::new(args.nbins, (args.range_lo, args.range_hi))
        .unwrap_or_else(|e| panic!("Bad binning: {}", e));

    let mut samples = if args.sequence.is_empty() {
        load_image(&args.input)
    } else {
        let mut paths = vec![args.input.clone()];
        paths.extend(args.sequence.iter().cloned());
        load_sequence(&paths, SequenceAxis::Channel)
    }.unwrap_or_else(|e| panic!("Could not load '{}': {}", args.input, e));
    if args.normalize {
        samples = samples.normalized();
    }
    let (height, width, channels) = samples.shape();
    info!("Loaded {} as {}x{}x{}", nickname(&args.input), height, width, channels);

    let start = Instant::now();
    let features = context_histogram(&radii, &samples, &params)
        .unwrap_or_else(|e| panic!("Context histogram failed: {}", e));
    let elapsed = start.elapsed();
    info!("{} features per pixel in {:?}", features.shape().2, elapsed);
    if height * width > 0 {
        info!("{}ms per megapixel",
              elapsed.as_secs_f64() * 1000.0 / ((width * height) as f64 / 1000000.0));
    }

    if let Some(probe) = &args.probe {
        match parse_probe(probe) {
            Some((y, x)) if y < height && x < width => {
                let segment = channels * params.nbins();
                for (i, radius) in radii.as_slice().iter().enumerate() {
                    info!("({}, {}) radius {}: {:?}", y, x, radius,
                          &features.pixel(y, x)[i * segment..(i + 1) * segment]);
                }
            },
            _ => warn!("Ignoring probe '{}' outside {}x{} image", probe, height, width),
        }
    }
    if let Some(output) = &args.output {
        write_planes(&features, output, &nickname(&args.input));
    }
}

fn parse_probe(probe: &str) -> Option<(usize, usize)> {
    let (y, x) = probe.split_once(',')?;
    Some((y.trim().parse().ok()?, x.trim().parse().ok()?))
}

// Each plane is stretched so its largest count maps to 255.
fn write_planes(features: &FeatureArray, output: &str, stem: &str) {
    let output_metadata = fs::metadata(output).unwrap_or_else(|e| {
        panic!("Output dir '{}' does not exist? {:?}", output, e);
    });
    assert!(output_metadata.is_dir(), "Output '{}' must be a directory", output);
    let (height, width, depth) = features.shape();
    for k in 0..depth {
        let plane = features.plane(k);
        let max = plane.iter().copied().max().unwrap_or(0).max(1);
        let pixels = plane.iter().map(|&v| (v as u64 * 255 / max as u64) as u8).collect();
        let img = GrayImage::from_raw(width as u32, height as u32, pixels).unwrap();
        let mut path = PathBuf::from(output);
        path.push(format!("{}_{:03}.png", stem, k));
        if let Err(e) = img.save(&path) {
            warn!("Could not write {:?}: {:?}", path, e);
        }
    }
    info!("Wrote {} feature planes to {}", depth, output);
}
