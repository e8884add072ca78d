//! Texture compression for meshpress
//!
//! Decodes a texture, shrinks it to fit a bounding box while keeping its
//! aspect ratio, and re-encodes it in the format named by the output path.
//! JPEG output honours the lossy quality setting; PNG output is written with
//! the strongest lossless compression instead.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{self, CompressionType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use meshpress_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Quality used when the caller does not choose one
pub const DEFAULT_QUALITY: u8 = 40;

/// Bounding box used when the caller does not choose one
pub const DEFAULT_MAX_SIZE: (u32, u32) = (1024, 1024);

/// Parameters for [`compress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    /// Lossy quality in 1..=100, lower gives smaller files
    pub quality: u8,
    /// Largest allowed `(width, height)`; images are never enlarged
    pub max_size: (u32, u32),
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl TextureOptions {
    pub fn new(quality: u8, max_size: (u32, u32)) -> Self {
        Self { quality, max_size }
    }

    /// Reject settings no encoder can honour
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidData(format!(
                "texture quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        if self.max_size.0 == 0 || self.max_size.1 == 0 {
            return Err(Error::InvalidData(format!(
                "texture bounds must be non-zero, got {}x{}",
                self.max_size.0, self.max_size.1
            )));
        }
        Ok(())
    }
}

/// Outcome of a successful [`compress`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureReport {
    /// Decoded `(width, height)`
    pub original: (u32, u32),
    /// Written `(width, height)`
    pub output: (u32, u32),
    pub bytes_written: u64,
}

impl TextureReport {
    pub fn was_resized(&self) -> bool {
        self.original != self.output
    }
}

/// Dimensions of `width x height` scaled to fit inside `max_size`.
///
/// Only shrinks. The scale is `min(max_w / width, max_h / height)`, each side
/// is rounded and kept in `1..=bound`.
pub fn fit_within(width: u32, height: u32, max_size: (u32, u32)) -> (u32, u32) {
    let (max_w, max_h) = max_size;
    if width <= max_w && height <= max_h {
        return (width, height);
    }

    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Decode `input`, fit it within `options.max_size` and write it to `output`.
///
/// The output format follows the extension of `output`. Decoding failures
/// are [`Error::ImageDecode`]; an unknown extension or any failure while
/// encoding or writing is [`Error::ImageWrite`].
pub fn compress<P, Q>(input: P, output: Q, options: &TextureOptions) -> Result<TextureReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();
    options.validate()?;

    let img = decode(input)?;
    let original = (img.width(), img.height());
    let (width, height) = fit_within(original.0, original.1, options.max_size);

    let img = if (width, height) == original {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    encode(&img, output, options.quality)?;

    let bytes_written = std::fs::metadata(output)
        .map(|m| m.len())
        .map_err(|e| image_write_error(output, e))?;

    Ok(TextureReport {
        original,
        output: (width, height),
        bytes_written,
    })
}

/// Decode an image, guessing the format from its content before its extension
pub fn decode(path: &Path) -> Result<DynamicImage> {
    let decode_error = |e: &dyn std::fmt::Display| Error::ImageDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    ImageReader::open(path)
        .map_err(|e| decode_error(&e))?
        .with_guessed_format()
        .map_err(|e| decode_error(&e))?
        .decode()
        .map_err(|e| decode_error(&e))
}

fn image_write_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::ImageWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn encode(img: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let format = ImageFormat::from_path(path).map_err(|e| image_write_error(path, e))?;
    if !format.writing_enabled() {
        return Err(image_write_error(
            path,
            format!("no encoder available for {format:?}"),
        ));
    }

    let file = File::create(path).map_err(|e| image_write_error(path, e))?;
    let mut writer = BufWriter::new(file);

    let encoded = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        }
        ImageFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut writer,
            CompressionType::Best,
            png::FilterType::Adaptive,
        )),
        other => img.write_to(&mut writer, other),
    };
    encoded.map_err(|e| image_write_error(path, e))?;

    writer.flush().map_err(|e| image_write_error(path, e))
}
