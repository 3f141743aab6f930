//! Request construction: PNG compression, base64 payload, JSON body.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use serde_json::json;

use crate::{config::FeatureSet, data::ImageBuffer, error::AnnotateError, preprocess};

/// Compress an image to PNG. Non-RGB sources are normalized first.
pub fn compress_png(image: &ImageBuffer) -> Result<Vec<u8>, AnnotateError> {
    let rgb = preprocess::to_rgb_image(image)?;
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Build the annotate request body around already-compressed image bytes:
///
/// ```json
/// {"requests":[{"image":{"content":"<base64>"},
///   "features":[{"type":"LABEL_DETECTION","maxResults":3}, ...]}]}
/// ```
///
/// Feature order follows the set's stable iteration order, so the output is
/// deterministic for a given configuration.
pub fn build_request(compressed: &[u8], features: &FeatureSet) -> String {
    let feature_list: Vec<_> = features
        .iter()
        .map(|(kind, max_results)| json!({"type": kind.as_str(), "maxResults": max_results}))
        .collect();
    json!({
        "requests": [{
            "image": {"content": STANDARD.encode(compressed)},
            "features": feature_list,
        }]
    })
    .to_string()
}
