//! Local pixel transforms: unweighted grayscale and 90° clockwise rotation.
//!
//! Both decode the handle into an RGBA raster, operate in memory, and
//! re-encode in the source's format. Formats the encoder cannot write fall
//! back to PNG.

use std::io::Cursor;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};

use crate::{error::TransformError, handle::ImageHandle};

/// Which transform a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Grayscale,
    Rotate,
}

impl TransformKind {
    pub fn apply(self, source: &ImageHandle) -> Result<ImageHandle, TransformError> {
        match self {
            TransformKind::Grayscale => grayscale(source),
            TransformKind::Rotate => rotate_clockwise(source),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransformKind::Grayscale => "grayscale",
            TransformKind::Rotate => "rotate",
        }
    }
}

pub fn grayscale(source: &ImageHandle) -> Result<ImageHandle, TransformError> {
    let mut raster = decode(source)?;
    average_channels(&mut raster);
    encode_like(source, &raster)
}

pub fn rotate_clockwise(source: &ImageHandle) -> Result<ImageHandle, TransformError> {
    let raster = decode(source)?;
    let rotated = imageops::rotate90(&raster);
    encode_like(source, &rotated)
}

/// Replaces R, G and B with their rounded mean; alpha is left alone.
pub fn average_channels(raster: &mut RgbaImage) {
    for pixel in raster.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        let avg = ((sum + 1) / 3) as u8;
        pixel.0[0] = avg;
        pixel.0[1] = avg;
        pixel.0[2] = avg;
    }
}

fn decode(source: &ImageHandle) -> Result<RgbaImage, TransformError> {
    let decoded = image::load_from_memory(source.bytes()).map_err(TransformError::Decode)?;
    Ok(decoded.to_rgba8())
}

fn encode_like(source: &ImageHandle, raster: &RgbaImage) -> Result<ImageHandle, TransformError> {
    let format = match source.format() {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => format,
        _ => ImageFormat::Png,
    };

    let rgba = DynamicImage::ImageRgba8(raster.clone());
    let bytes = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => encode(&DynamicImage::ImageRgb8(rgba.to_rgb8()), format)?,
        _ => encode(&rgba, format)?,
    };

    Ok(ImageHandle::new(source.name(), format.to_mime_type(), bytes))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .map_err(TransformError::Encode)?;
    Ok(out.into_inner())
}

pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, TransformError> {
    encode(&DynamicImage::ImageRgba8(raster.clone()), ImageFormat::Png)
}

/// Width and height of an encoded handle, if it decodes.
pub fn dimensions(handle: &ImageHandle) -> Option<(u32, u32)> {
    image::load_from_memory(handle.bytes())
        .ok()
        .map(|image| (image.width(), image.height()))
}

#[cfg(test)]
#[path = "tests/transform_tests.rs"]
mod tests;
