// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GrayImage, ImageReader, RgbImage};
use log::{debug, info};

use crate::dataset::SequenceAxis;
use crate::error::{invalid, Error, Result};

/// Row-major (H, W, C) array of samples. Channels of a pixel are stored
/// contiguously. Callers supply it and it is never mutated by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleArray {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl SampleArray {
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<f32>)
               -> Result<Self> {
        if channels == 0 {
            return Err(invalid("sample array needs at least one channel"));
        }
        if data.len() != height * width * channels {
            return Err(invalid(format!(
                "data length {} does not match shape {}x{}x{}",
                data.len(), height, width, channels)));
        }
        Ok(SampleArray{height, width, channels, data})
    }

    /// Accepts `(H, W)` (one channel) or `(H, W, C)`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        match *shape {
            [height, width] => Self::new(height, width, 1, data),
            [height, width, channels] => Self::new(height, width, channels, data),
            _ => Err(invalid(format!(
                "expected 2 spatial dimensions plus optional channel, got shape {:?}",
                shape))),
        }
    }

    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        SampleArray{height, width, channels,
                    data: vec![0.0; height * width * channels]}
    }

    /// Samples scaled from u8 to [0, 1].
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        SampleArray{height: height as usize, width: width as usize,
                    channels: 1, data}
    }

    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        SampleArray{height: height as usize, width: width as usize,
                    channels: 3, data}
    }

    /// Color images become 3 channels, everything else one luma channel.
    /// Values are normalized to [0, 1] by the `image` crate's float
    /// conversions.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if image.color().has_color() {
            let rgb = image.to_rgb32f();
            SampleArray{height, width, channels: 3, data: rgb.into_raw()}
        } else {
            let luma = image.to_luma32f();
            SampleArray{height, width, channels: 1, data: luma.into_raw()}
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// (H, W, C).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
        self.data[(y * self.width + x) * self.channels + c]
    }

    /// All channels of pixel (y, x).
    #[inline]
    pub fn pixel(&self, y: usize, x: usize) -> &[f32] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Rescales all samples linearly so the minimum maps to 0 and the
    /// maximum to 1. A constant array maps to all zeros.
    pub fn normalized(&self) -> SampleArray {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in &self.data {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let span = hi - lo;
        let data = if span > 0.0 {
            self.data.iter().map(|&v| (v - lo) / span).collect()
        } else {
            vec![0.0; self.data.len()]
        };
        SampleArray{data, ..*self}
    }
}

/// Reads an image file in any format the `image` crate decodes.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<SampleArray> {
    let load_start = Instant::now();
    let path = path.as_ref();
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let samples = SampleArray::from_dynamic(&img);
    debug!("Loaded {:?} ({}x{}x{}) in {:?}", path,
           samples.height, samples.width, samples.channels,
           load_start.elapsed());
    Ok(samples)
}

/// Concatenates the channels of same-sized arrays, in order.
pub fn stack_channels(arrays: &[SampleArray]) -> Result<SampleArray> {
    let first = arrays.first().ok_or_else(|| invalid("nothing to stack"))?;
    let (height, width) = (first.height, first.width);
    for a in arrays {
        if a.height != height || a.width != width {
            return Err(Error::DatasetConstraint(format!(
                "cannot stack {}x{} image onto {}x{} sequence",
                a.height, a.width, height, width)));
        }
    }
    let channels: usize = arrays.iter().map(|a| a.channels).sum();
    let mut data = Vec::with_capacity(height * width * channels);
    for y in 0..height {
        for x in 0..width {
            for a in arrays {
                data.extend_from_slice(a.pixel(y, x));
            }
        }
    }
    Ok(SampleArray{height, width, channels, data})
}

/// Loads a list of 2D images and stacks them along `axis`. Only channel
/// stacking yields data this engine accepts.
pub fn load_sequence<P: AsRef<Path>>(paths: &[P], axis: SequenceAxis)
                                     -> Result<SampleArray> {
    if axis != SequenceAxis::Channel {
        return Err(Error::DatasetConstraint(format!(
            "sequence axis '{}' would produce a volume; only 'c' stacks 2D images",
            axis.key())));
    }
    let arrays = paths.iter().map(load_image).collect::<Result<Vec<_>>>()?;
    let stacked = stack_channels(&arrays)?;
    info!("Stacked {} images into {}x{}x{}", arrays.len(),
          stacked.height, stacked.width, stacked.channels);
    Ok(stacked)
}
