//! Background client for a remote image-annotation HTTP API.
//!
//! A producer hands raw pixel buffers to an [`AnnotationWorker`]; a single
//! worker thread downsamples each image, serializes it into the vision API's
//! JSON request schema, POSTs it, parses the response, and publishes the most
//! recent result for lock-free reads. Neither side ever blocks on the other.
//!
//! The crate is split into focused submodules:
//! - `config`: feature set and worker configuration.
//! - `data`: image buffer and annotation domain model.
//! - `preprocess`: bounding-box downsampling.
//! - `encode`: PNG compression, base64 payload, JSON request body.
//! - `transport`: blocking HTTP(S) POST behind the `Transport` trait.
//! - `parse`: tolerant parsing of the response envelope.
//! - `worker`: queue, cycle loop, latest-result slot, observer hooks.

pub use config::{AnnotatorConfig, FeatureKind, FeatureSet};
pub use data::{
    AnnotationResult, BoundingPoly, FaceAnnotation, FaceLandmark, ImageBuffer, LabelAnnotation,
    LandmarkAnnotation, LatLng, Likelihood, LogoAnnotation, PixelFormat, TextAnnotation, Vertex,
};
pub use encode::{build_request, compress_png};
pub use error::AnnotateError;
pub use parse::parse_response;
pub use preprocess::downsample;
pub use transport::{HttpReply, HttpTransport, Transport};
pub use worker::{AnnotationWorker, CycleObserver};

mod config;
mod data;
mod encode;
mod error;
mod parse;
mod preprocess;
mod transport;
mod worker;
