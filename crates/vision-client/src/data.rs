use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Layout of the raw bytes inside an [`ImageBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Raw pixel image handed to the worker by an image source.
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl ImageBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    pub(crate) fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

/// Ordered polygon locating an annotated region; vertex order defines winding.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct LabelAnnotation {
    pub mid: String,
    pub description: String,
    pub score: f32,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub locale: String,
    pub description: String,
    pub bounding_poly: BoundingPoly,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoAnnotation {
    pub mid: String,
    pub description: String,
    pub score: f32,
    pub bounding_poly: BoundingPoly,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkAnnotation {
    pub mid: String,
    pub description: String,
    pub score: f32,
    pub bounding_poly: BoundingPoly,
    pub locations: Vec<LatLng>,
}

/// Named 3D position on a detected face (eye, nose tip, ...).
#[derive(Clone, Debug, Default, Serialize)]
pub struct FaceLandmark {
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Categorical confidence reported by the service for face attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    /// Unrecognized strings fall back to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "VERY_UNLIKELY" => Likelihood::VeryUnlikely,
            "UNLIKELY" => Likelihood::Unlikely,
            "POSSIBLE" => Likelihood::Possible,
            "LIKELY" => Likelihood::Likely,
            "VERY_LIKELY" => Likelihood::VeryLikely,
            _ => Likelihood::Unknown,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnnotation {
    pub bounding_poly: BoundingPoly,
    pub fd_bounding_poly: BoundingPoly,
    pub landmarks: Vec<FaceLandmark>,
    pub roll_angle: f32,
    pub pan_angle: f32,
    pub tilt_angle: f32,
    pub detection_confidence: f32,
    pub landmarking_confidence: f32,
    pub joy_likelihood: Likelihood,
    pub sorrow_likelihood: Likelihood,
    pub anger_likelihood: Likelihood,
    pub surprise_likelihood: Likelihood,
    pub under_exposed_likelihood: Likelihood,
    pub blurred_likelihood: Likelihood,
    pub headwear_likelihood: Likelihood,
}

/// Everything extracted from one annotated image. `width`/`height` are the
/// processed (possibly downsampled) dimensions, not the submitted ones. Any
/// sequence may be empty.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationResult {
    pub width: u32,
    pub height: u32,
    pub label_annotations: Vec<LabelAnnotation>,
    pub text_annotations: Vec<TextAnnotation>,
    pub logo_annotations: Vec<LogoAnnotation>,
    pub landmark_annotations: Vec<LandmarkAnnotation>,
    pub face_annotations: Vec<FaceAnnotation>,
}

pub(crate) type SharedResult = Arc<Mutex<Option<AnnotationResult>>>;
