//! Tolerant parsing of the annotation service's response envelope.
//!
//! The schema is deep and almost everything in it is optional, so the parser
//! walks `serde_json::Value` with defaulting accessors instead of rigid
//! deserialize structs: a missing or null field yields an empty value, never
//! an error. Only bytes that fail to parse as JSON at all are an error.

use serde_json::Value;

use crate::{
    data::{
        AnnotationResult, BoundingPoly, FaceAnnotation, FaceLandmark, LabelAnnotation,
        LandmarkAnnotation, LatLng, Likelihood, LogoAnnotation, TextAnnotation, Vertex,
    },
    error::AnnotateError,
};

/// Parse the `{"responses":[...]}` envelope. `width`/`height` are the
/// processed image dimensions recorded on the result.
///
/// When the array holds several response objects only the last one is kept
/// (replace, not merge). An absent or empty array yields `None`; the worker
/// then leaves the previously published result in place.
pub fn parse_response(
    body: &[u8],
    width: u32,
    height: u32,
) -> Result<Option<AnnotationResult>, AnnotateError> {
    let document: Value = serde_json::from_slice(body)?;

    let mut latest = None;
    for response in items(&document, "responses") {
        let mut result = AnnotationResult {
            width,
            height,
            ..AnnotationResult::default()
        };

        for entry in items(response, "labelAnnotations") {
            result.label_annotations.push(LabelAnnotation {
                mid: string(entry, "mid"),
                description: string(entry, "description"),
                score: float(entry, "score"),
            });
        }
        for entry in items(response, "textAnnotations") {
            result.text_annotations.push(TextAnnotation {
                locale: string(entry, "locale"),
                description: string(entry, "description"),
                bounding_poly: bounding_poly(entry, "boundingPoly"),
            });
        }
        for entry in items(response, "logoAnnotations") {
            result.logo_annotations.push(LogoAnnotation {
                mid: string(entry, "mid"),
                description: string(entry, "description"),
                score: float(entry, "score"),
                bounding_poly: bounding_poly(entry, "boundingPoly"),
            });
        }
        for entry in items(response, "landmarkAnnotations") {
            result.landmark_annotations.push(LandmarkAnnotation {
                mid: string(entry, "mid"),
                description: string(entry, "description"),
                score: float(entry, "score"),
                bounding_poly: bounding_poly(entry, "boundingPoly"),
                locations: locations(entry),
            });
        }
        for entry in items(response, "faceAnnotations") {
            result.face_annotations.push(face(entry));
        }

        latest = Some(result);
    }

    Ok(latest)
}

fn face(entry: &Value) -> FaceAnnotation {
    let landmarks = items(entry, "landmarks")
        .map(|lm| {
            let position = lm.get("position");
            FaceLandmark {
                kind: string(lm, "type"),
                x: position.map(|p| float(p, "x")).unwrap_or_default(),
                y: position.map(|p| float(p, "y")).unwrap_or_default(),
                z: position.map(|p| float(p, "z")).unwrap_or_default(),
            }
        })
        .collect();

    FaceAnnotation {
        bounding_poly: bounding_poly(entry, "boundingPoly"),
        fd_bounding_poly: bounding_poly(entry, "fdBoundingPoly"),
        landmarks,
        roll_angle: float(entry, "rollAngle"),
        pan_angle: float(entry, "panAngle"),
        tilt_angle: float(entry, "tiltAngle"),
        detection_confidence: float(entry, "detectionConfidence"),
        landmarking_confidence: float(entry, "landmarkingConfidence"),
        joy_likelihood: likelihood(entry, "joyLikelihood"),
        sorrow_likelihood: likelihood(entry, "sorrowLikelihood"),
        anger_likelihood: likelihood(entry, "angerLikelihood"),
        surprise_likelihood: likelihood(entry, "surpriseLikelihood"),
        under_exposed_likelihood: likelihood(entry, "underExposedLikelihood"),
        blurred_likelihood: likelihood(entry, "blurredLikelihood"),
        headwear_likelihood: likelihood(entry, "headwearLikelihood"),
    }
}

/// `entry[key]["vertices"]` as a polygon; absent key means empty polygon.
fn bounding_poly(entry: &Value, key: &str) -> BoundingPoly {
    let vertices = entry
        .get(key)
        .map(|poly| {
            items(poly, "vertices")
                .map(|vertex| Vertex {
                    x: float(vertex, "x"),
                    y: float(vertex, "y"),
                })
                .collect()
        })
        .unwrap_or_default();
    BoundingPoly { vertices }
}

/// `entry["locations"][i]["latLng"]`; absent key means no coordinates.
fn locations(entry: &Value) -> Vec<LatLng> {
    items(entry, "locations")
        .map(|location| {
            let lat_lng = location.get("latLng");
            LatLng {
                latitude: lat_lng.map(|l| double(l, "latitude")).unwrap_or_default(),
                longitude: lat_lng.map(|l| double(l, "longitude")).unwrap_or_default(),
            }
        })
        .collect()
}

fn items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|array| array.iter())
        .into_iter()
        .flatten()
}

fn string(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn float(value: &Value, key: &str) -> f32 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default() as f32
}

fn double(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn likelihood(value: &Value, key: &str) -> Likelihood {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(Likelihood::from_label)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_only_response_leaves_other_kinds_empty() {
        let body = br#"{"responses":[{"labelAnnotations":[
            {"mid":"/m/01yrx","description":"cat","score":0.9}
        ]}]}"#;
        let result = parse_response(body, 640, 512).unwrap().unwrap();
        assert_eq!(result.width, 640);
        assert_eq!(result.height, 512);
        assert_eq!(result.label_annotations.len(), 1);
        assert_eq!(result.label_annotations[0].description, "cat");
        assert_eq!(result.label_annotations[0].mid, "/m/01yrx");
        assert!((result.label_annotations[0].score - 0.9).abs() < 1e-6);
        assert!(result.text_annotations.is_empty());
        assert!(result.logo_annotations.is_empty());
        assert!(result.landmark_annotations.is_empty());
        assert!(result.face_annotations.is_empty());
    }

    #[test]
    fn missing_fields_default_instead_of_erroring() {
        let body = br#"{"responses":[{
            "labelAnnotations":[{}],
            "textAnnotations":[{"description":"STOP"}],
            "landmarkAnnotations":[{"description":"tower"}]
        }]}"#;
        let result = parse_response(body, 100, 100).unwrap().unwrap();
        assert_eq!(result.label_annotations[0].mid, "");
        assert_eq!(result.label_annotations[0].score, 0.0);
        assert_eq!(result.text_annotations[0].locale, "");
        assert!(result.text_annotations[0].bounding_poly.vertices.is_empty());
        assert!(result.landmark_annotations[0].locations.is_empty());
    }

    #[test]
    fn last_response_object_wins() {
        let body = br#"{"responses":[
            {"labelAnnotations":[{"description":"first"}]},
            {"labelAnnotations":[{"description":"second"}]}
        ]}"#;
        let merged = parse_response(body, 10, 10).unwrap().unwrap();

        let only_second = br#"{"responses":[{"labelAnnotations":[{"description":"second"}]}]}"#;
        let second = parse_response(only_second, 10, 10).unwrap().unwrap();

        assert_eq!(merged.label_annotations.len(), 1);
        assert_eq!(
            merged.label_annotations[0].description,
            second.label_annotations[0].description
        );
    }

    #[test]
    fn empty_or_absent_responses_yield_none() {
        assert!(parse_response(br#"{"responses":[]}"#, 10, 10).unwrap().is_none());
        assert!(parse_response(br#"{}"#, 10, 10).unwrap().is_none());
    }

    #[test]
    fn unparsable_bytes_are_the_only_parse_error() {
        assert!(matches!(
            parse_response(b"not json at all", 10, 10),
            Err(AnnotateError::Parse(_))
        ));
    }

    #[test]
    fn bounding_poly_vertices_keep_their_order() {
        let body = br#"{"responses":[{"textAnnotations":[{"boundingPoly":{"vertices":[
            {"x":1,"y":2},{"x":3,"y":4},{"x":5},{"y":6}
        ]}}]}]}"#;
        let result = parse_response(body, 10, 10).unwrap().unwrap();
        let vertices = &result.text_annotations[0].bounding_poly.vertices;
        assert_eq!(
            vertices,
            &vec![
                Vertex { x: 1.0, y: 2.0 },
                Vertex { x: 3.0, y: 4.0 },
                Vertex { x: 5.0, y: 0.0 },
                Vertex { x: 0.0, y: 6.0 },
            ]
        );
    }

    #[test]
    fn landmark_locations_parse_lat_lng_pairs() {
        let body = br#"{"responses":[{"landmarkAnnotations":[{
            "description":"colosseum","score":0.8,
            "locations":[{"latLng":{"latitude":41.89,"longitude":12.49}}]
        }]}]}"#;
        let result = parse_response(body, 10, 10).unwrap().unwrap();
        let landmark = &result.landmark_annotations[0];
        assert_eq!(landmark.locations.len(), 1);
        assert!((landmark.locations[0].latitude - 41.89).abs() < 1e-9);
        assert!((landmark.locations[0].longitude - 12.49).abs() < 1e-9);
    }

    #[test]
    fn faces_parse_pose_landmarks_and_likelihoods() {
        let body = br#"{"responses":[{"faceAnnotations":[{
            "boundingPoly":{"vertices":[{"x":10,"y":10},{"x":90,"y":10}]},
            "fdBoundingPoly":{"vertices":[{"x":20,"y":20}]},
            "landmarks":[{"type":"LEFT_EYE","position":{"x":30.5,"y":40.5,"z":-0.5}}],
            "rollAngle":1.5,"panAngle":-2.0,"tiltAngle":0.25,
            "detectionConfidence":0.98,"landmarkingConfidence":0.75,
            "joyLikelihood":"VERY_LIKELY","sorrowLikelihood":"VERY_UNLIKELY",
            "angerLikelihood":"UNLIKELY","surpriseLikelihood":"POSSIBLE",
            "underExposedLikelihood":"LIKELY","blurredLikelihood":"GIBBERISH"
        }]}]}"#;
        let result = parse_response(body, 10, 10).unwrap().unwrap();
        let face = &result.face_annotations[0];
        assert_eq!(face.bounding_poly.vertices.len(), 2);
        assert_eq!(face.fd_bounding_poly.vertices.len(), 1);
        assert_eq!(face.landmarks[0].kind, "LEFT_EYE");
        assert!((face.landmarks[0].z - -0.5).abs() < 1e-6);
        assert!((face.roll_angle - 1.5).abs() < 1e-6);
        assert_eq!(face.joy_likelihood, Likelihood::VeryLikely);
        assert_eq!(face.surprise_likelihood, Likelihood::Possible);
        // Unknown strings and absent keys both fall back to Unknown.
        assert_eq!(face.blurred_likelihood, Likelihood::Unknown);
        assert_eq!(face.headwear_likelihood, Likelihood::Unknown);
    }
}
