//! Downsampling of submitted images so request payloads stay small.
//!
//! The service accepts arbitrary sizes but billing and latency scale with the
//! payload, so anything larger than the configured box (default 640×480) is
//! scaled down with a smooth filter before compression. Images already inside
//! the box pass through untouched.

use image::{RgbImage, imageops::FilterType};

use crate::{
    data::{ImageBuffer, PixelFormat},
    error::AnnotateError,
};

/// Target size for an image that exceeds the box, or `None` if it already
/// fits. Width-constrained first; if the resulting height still exceeds the
/// box, the height constraint wins instead. Aspect ratio is preserved.
pub(crate) fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> Option<(u32, u32)> {
    if width <= max_w && height <= max_h {
        return None;
    }
    let mut w = max_w as f32;
    let mut h = height as f32 * w / width as f32;
    if h > max_h as f32 {
        h = max_h as f32;
        w = width as f32 * h / height as f32;
    }
    Some((w.round().max(1.0) as u32, h.round().max(1.0) as u32))
}

/// Normalize any supported pixel format into an RGB image. BGR sources get
/// their channels swapped; RGBA sources drop alpha.
pub(crate) fn to_rgb_image(image: &ImageBuffer) -> Result<RgbImage, AnnotateError> {
    if image.data.len() != image.expected_len() {
        return Err(AnnotateError::InvalidImage(format!(
            "{}x{} {:?} buffer holds {} bytes, expected {}",
            image.width,
            image.height,
            image.format,
            image.data.len(),
            image.expected_len()
        )));
    }

    let rgb = match image.format {
        PixelFormat::Rgb8 => image.data.clone(),
        PixelFormat::Bgr8 => {
            let mut data = image.data.clone();
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            data
        }
        PixelFormat::Rgba8 => image
            .data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
    };

    RgbImage::from_raw(image.width, image.height, rgb).ok_or_else(|| {
        AnnotateError::InvalidImage(format!(
            "failed to assemble {}x{} RGB image",
            image.width, image.height
        ))
    })
}

/// Scale `image` down to fit within `max_w` × `max_h`, preserving aspect
/// ratio. Uses Catmull-Rom resampling; returns the input unchanged when it
/// already fits.
pub fn downsample(
    image: ImageBuffer,
    max_w: u32,
    max_h: u32,
) -> Result<ImageBuffer, AnnotateError> {
    let Some((width, height)) = fit_within(image.width, image.height, max_w, max_h) else {
        return Ok(image);
    };

    let rgb = to_rgb_image(&image)?;
    let resized = image::imageops::resize(&rgb, width, height, FilterType::CatmullRom);
    Ok(ImageBuffer::new(
        resized.into_raw(),
        width,
        height,
        PixelFormat::Rgb8,
    ))
}
