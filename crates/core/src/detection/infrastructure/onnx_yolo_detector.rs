/// YOLO-pose face detector using ONNX Runtime via `ort`.
///
/// Decodes the file, letterboxes it, runs inference and keeps the single
/// most confident face after NMS, with its five keypoints as landmarks.
use std::path::Path;

use image::RgbImage;

use crate::detection::domain::face_detector::{
    DetectError, DetectionOptions, FaceDetection, FaceDetector,
};
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::face_box::FaceBox;
use crate::storage::infrastructure::image_loader::{load_image, sharpen_for_detection};

use super::execution_provider::preferred_execution_providers;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoints per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO-pose ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path) -> Result<Self, DetectError> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}x{input_size})",
            model_path.display()
        );
        Ok(Self {
            session,
            input_size,
        })
    }

    fn infer(
        &mut self,
        image: &RgbImage,
        confidence: f64,
    ) -> Result<Vec<RawDetection>, DetectError> {
        let (input_tensor, letterbox) = letterbox(image, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_output(data, &shape, confidence, &letterbox)?;
        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        path: &Path,
        options: &DetectionOptions,
    ) -> Result<Option<FaceDetection>, DetectError> {
        let loaded = load_image(path, options.apply_rotation)?;

        // Boxes are found on a sharpened copy; the caller gets the original pixels.
        let input = if options.sharpen {
            sharpen_for_detection(&loaded.image).to_rgb8()
        } else {
            loaded.image.to_rgb8()
        };

        let faces = self.infer(&input, options.confidence_threshold)?;
        log::debug!("{}: {} face(s) above threshold", path.display(), faces.len());

        Ok(best_face(faces).map(|(face_box, landmarks)| FaceDetection {
            face_box,
            landmarks,
            image: loaded.image,
            metadata: loaded.metadata,
        }))
    }
}

/// Picks the most confident detection. Input is NMS output, already sorted.
fn best_face(faces: Vec<RawDetection>) -> Option<(FaceBox, FaceLandmarks)> {
    faces
        .into_iter()
        .next()
        .map(|d| (d.face_box, FaceLandmarks::new(d.keypoints)))
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// How a source image was placed inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize an image to `target_size` × `target_size` as an NCHW float32 tensor.
fn letterbox(image: &RgbImage, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let (src_w, src_h) = image.dimensions();
    let target = target_size as f64;

    let scale = (target / src_w as f64).min(target / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).min(target_size);
    let new_h = ((src_h as f64 * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 grey padding, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    // Nearest-neighbour resize straight into the padded region
    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as u32).min(src_h - 1);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as u32).min(src_w - 1);
            let pixel = image.get_pixel(src_x, src_y);
            let (ty, tx) = ((pad_y + y) as usize, (pad_x + x) as usize);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = pixel.0[c] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    face_box: FaceBox,
    /// Invisible keypoints stay at (0, 0).
    keypoints: [(f64, f64); 5],
}

/// Decodes rows of `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
///
/// YOLO emits `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; both are accepted.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    letterbox: &Letterbox,
) -> Result<Vec<RawDetection>, DetectError> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err(format!("YOLO output too short for shape {shape:?}").into());
    }
    if num_feats < 5 {
        return Ok(Vec::new());
    }

    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = at(i, 4);
        if conf < confidence {
            continue;
        }

        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let (x1, y1) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);

        let mut keypoints = [(0.0f64, 0.0f64); 5];
        if num_feats >= 5 + NUM_KEYPOINT_VALUES {
            for (k, point) in keypoints.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if at(i, base + 2) >= KEYPOINT_CONF_THRESH {
                    *point = letterbox.to_source(at(i, base), at(i, base + 1));
                }
            }
        }

        dets.push(RawDetection {
            face_box: FaceBox {
                x1,
                y1,
                x2,
                y2,
                confidence: conf,
            },
            keypoints,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.face_box
            .confidence
            .partial_cmp(&a.face_box.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && dets[i].face_box.iou(&dets[j].face_box) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        pad_x: 0,
        pad_y: 0,
    };

    fn raw(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> RawDetection {
        RawDetection {
            face_box: FaceBox {
                x1,
                y1,
                x2,
                y2,
                confidence,
            },
            keypoints: [(0.0, 0.0); 5],
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, content 640x320, pad_y 160
        let img = RgbImage::from_pixel(200, 100, image::Rgb([128, 128, 128]));
        let (tensor, lb) = letterbox(&img, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 160));
    }

    #[test]
    fn test_letterbox_square_image() {
        let img = RgbImage::new(100, 100);
        let (_, lb) = letterbox(&img, 640);
        assert_relative_eq!(lb.scale, 6.4, epsilon = 0.01);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 0));
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let img = RgbImage::from_pixel(100, 50, image::Rgb([255, 255, 255]));
        let (tensor, lb) = letterbox(&img, 640);

        let (y, x) = (lb.pad_y as usize + 1, lb.pad_x as usize + 1);
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_maps_back_to_source() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        assert_eq!(lb.to_source(100.0, 140.0), (50.0, 50.0));
    }

    #[test]
    fn test_parse_output_row_major_with_keypoints() {
        // One detection, 20 features: box, conf, 5 × (x, y, conf)
        let mut row = vec![50.0, 60.0, 20.0, 40.0, 0.9];
        for k in 0..5 {
            let conf = if k == 4 { 0.1 } else { 0.8 };
            row.extend_from_slice(&[40.0 + k as f32, 50.0, conf]);
        }
        // Layout is inferred from which axis is longer, so pad with empty rows
        let mut data = row;
        data.resize(25 * 20, 0.0);
        let dets = parse_output(&data, &[1, 25, 20], 0.3, &IDENTITY).unwrap();

        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!((d.face_box.x1, d.face_box.y1), (40.0, 40.0));
        assert_eq!((d.face_box.x2, d.face_box.y2), (60.0, 80.0));
        assert_eq!(d.keypoints[0], (40.0, 50.0));
        // Low-confidence keypoint stays invisible
        assert_eq!(d.keypoints[4], (0.0, 0.0));
    }

    #[test]
    fn test_parse_output_transposed_layout() {
        // Six detections × 5 features, stored feature-major: [1, 5, 6]
        #[rustfmt::skip]
        let data = [
            10.0, 100.0, 0.0, 0.0, 0.0, 0.0, // cx
            10.0, 100.0, 0.0, 0.0, 0.0, 0.0, // cy
            4.0, 4.0, 0.0, 0.0, 0.0, 0.0, // w
            4.0, 4.0, 0.0, 0.0, 0.0, 0.0, // h
            0.2, 0.7, 0.0, 0.0, 0.0, 0.0, // conf
        ];
        let dets = parse_output(&data, &[1, 5, 6], 0.3, &IDENTITY).unwrap();
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].face_box.confidence, 0.7, epsilon = 1e-6);
        assert_eq!(dets[0].face_box.x1, 98.0);
    }

    #[test]
    fn test_parse_output_rejects_bad_shape() {
        assert!(parse_output(&[0.0; 4], &[4], 0.3, &IDENTITY).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.8),
            raw(5.0, 5.0, 105.0, 105.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].face_box.confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![
            raw(0.0, 0.0, 50.0, 50.0, 0.9),
            raw(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_best_face_takes_most_confident() {
        let mut dets = vec![
            raw(0.0, 0.0, 50.0, 50.0, 0.4),
            raw(200.0, 200.0, 250.0, 250.0, 0.95),
        ];
        let (face_box, _) = best_face(nms(&mut dets, NMS_IOU_THRESH)).unwrap();
        assert_eq!(face_box.x1, 200.0);
    }

    #[test]
    fn test_best_face_none_when_empty() {
        assert!(best_face(Vec::new()).is_none());
    }
}
