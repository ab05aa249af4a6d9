use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::cropping::domain::crop_dispatch::crop_face;
use crate::cropping::domain::crop_geometry::CropGeometry;
use crate::cropping::infrastructure::landmark_crop_geometry::LandmarkCropGeometry;
use crate::detection::domain::face_detector::FaceDetection;
use crate::finishing::infrastructure::aspect_ratio_cropper::apply_aspect_ratio;
use crate::finishing::infrastructure::filters::apply_filter;
use crate::pipeline::batch_options::FinishOptions;
use crate::shared::constants::OUTPUT_PREFIX;
use crate::shared::errors::ImageFailure;
use crate::shared::image_metadata::ImageMetadata;
use crate::storage::domain::image_writer::ImageWriter;
use crate::storage::infrastructure::image_file_writer::ImageFileWriter;

/// Extensions the writer cannot encode; such outputs are saved as PNG.
const REENCODE_AS_PNG: &[&str] = &["heic", "heif"];

/// Crop, aspect ratio, filter and save for one detected face.
///
/// Holds only shared, immutable collaborators so a single instance can be
/// used from every finishing worker at once.
pub struct Finisher {
    geometry: Arc<dyn CropGeometry>,
    writer: Arc<dyn ImageWriter>,
}

impl Finisher {
    pub fn new(geometry: Arc<dyn CropGeometry>, writer: Arc<dyn ImageWriter>) -> Self {
        Self { geometry, writer }
    }

    /// Produces the finished pixels without touching the filesystem.
    pub fn render(
        &self,
        face: &FaceDetection,
        options: &FinishOptions,
    ) -> Result<DynamicImage, ImageFailure> {
        let cropped = crop_face(&*self.geometry, face, &options.crop).ok_or(
            ImageFailure::CropFailed {
                style: options.crop.style,
            },
        )?;

        let shaped = match options.aspect_ratio {
            Some(ratio) => apply_aspect_ratio(&cropped, ratio),
            None => cropped,
        };
        if shaped.width() == 0 || shaped.height() == 0 {
            return Err(ImageFailure::Finishing(
                "image is empty after aspect-ratio adjustment".into(),
            ));
        }

        Ok(apply_filter(&shaped, options.filter, options.intensity))
    }

    pub fn save(
        &self,
        path: &Path,
        image: &DynamicImage,
        metadata: &ImageMetadata,
    ) -> Result<(), ImageFailure> {
        self.writer
            .write(path, image, metadata)
            .map_err(|e| ImageFailure::Finishing(format!("saving {}: {e}", path.display())))
    }

    /// Renders `face` and writes it into `output_dir`, returning the written path.
    pub fn finish(
        &self,
        filename: &str,
        face: &FaceDetection,
        options: &FinishOptions,
        output_dir: &Path,
    ) -> Result<PathBuf, ImageFailure> {
        let image = self.render(face, options)?;
        let path = output_dir.join(output_file_name(filename));
        self.save(&path, &image, &face.metadata)?;
        Ok(path)
    }
}

impl Default for Finisher {
    fn default() -> Self {
        Self::new(
            Arc::new(LandmarkCropGeometry::new()),
            Arc::new(ImageFileWriter::new()),
        )
    }
}

/// `cropped_<filename>`, with `.png` appended when the writer cannot encode
/// the input's format. The full input name is kept so outputs stay unique.
pub fn output_file_name(filename: &str) -> String {
    let name = Path::new(filename);
    let reencode = name
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| REENCODE_AS_PNG.contains(&e.to_ascii_lowercase().as_str()));

    if reencode {
        format!("{OUTPUT_PREFIX}{filename}.png")
    } else {
        format!("{OUTPUT_PREFIX}{filename}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cropping::domain::crop_style::CropStyle;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::finishing::domain::image_filter::FilterKind;
    use crate::shared::face_box::FaceBox;
    use rstest::rstest;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingWriter {
        written: Mutex<Vec<(PathBuf, u32, u32)>>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageWriter for RecordingWriter {
        fn write(
            &self,
            path: &Path,
            image: &DynamicImage,
            _metadata: &ImageMetadata,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), image.width(), image.height()));
            Ok(())
        }
    }

    struct FailingWriter;

    impl ImageWriter for FailingWriter {
        fn write(
            &self,
            _path: &Path,
            _image: &DynamicImage,
            _metadata: &ImageMetadata,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("disk full".into())
        }
    }

    fn frontal_face() -> FaceDetection {
        FaceDetection {
            face_box: FaceBox {
                x1: 100.0,
                y1: 100.0,
                x2: 300.0,
                y2: 300.0,
                confidence: 0.9,
            },
            landmarks: FaceLandmarks::new([
                (160.0, 160.0),
                (240.0, 160.0),
                (200.0, 200.0),
                (170.0, 250.0),
                (230.0, 250.0),
            ]),
            image: DynamicImage::new_rgb8(400, 600),
            metadata: ImageMetadata::upright(400, 600),
        }
    }

    fn finisher_with(writer: Arc<dyn ImageWriter>) -> Finisher {
        Finisher::new(Arc::new(LandmarkCropGeometry::new()), writer)
    }

    #[rstest]
    #[case("img1.jpg", "cropped_img1.jpg")]
    #[case("photo.PNG", "cropped_photo.PNG")]
    #[case("phone.heic", "cropped_phone.heic.png")]
    #[case("phone.HEIC", "cropped_phone.HEIC.png")]
    fn test_output_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(output_file_name(input), expected);
    }

    #[test]
    fn test_output_names_unique_across_formats() {
        let names = ["a.heic", "a.png", "a.jpg"].map(output_file_name);
        assert_eq!(names, ["cropped_a.heic.png", "cropped_a.png", "cropped_a.jpg"]);
    }

    #[test]
    fn test_render_auto_crop() {
        let finisher = finisher_with(Arc::new(RecordingWriter::new()));
        let out = finisher
            .render(&frontal_face(), &FinishOptions::default())
            .unwrap();
        assert_eq!((out.width(), out.height()), (320, 360));
    }

    #[test]
    fn test_render_applies_aspect_ratio_before_filter() {
        let finisher = finisher_with(Arc::new(RecordingWriter::new()));
        let options = FinishOptions {
            aspect_ratio: Some(1.0),
            filter: FilterKind::Sepia,
            intensity: 100,
            ..FinishOptions::default()
        };
        let out = finisher.render(&frontal_face(), &options).unwrap();
        assert_eq!((out.width(), out.height()), (320, 320));
    }

    #[test]
    fn test_render_reports_crop_failure_with_style() {
        let finisher = finisher_with(Arc::new(RecordingWriter::new()));
        let mut options = FinishOptions::default();
        options.crop.style = CropStyle::Profile;
        options.crop.use_profile = false;

        let err = finisher.render(&frontal_face(), &options).unwrap_err();
        assert_eq!(
            err,
            ImageFailure::CropFailed {
                style: CropStyle::Profile
            }
        );
    }

    #[test]
    fn test_finish_writes_prefixed_name() {
        let writer = Arc::new(RecordingWriter::new());
        let finisher = finisher_with(writer.clone());
        let out_dir = Path::new("/out");

        let path = finisher
            .finish("img1.jpg", &frontal_face(), &FinishOptions::default(), out_dir)
            .unwrap();

        assert_eq!(path, out_dir.join("cropped_img1.jpg"));
        let written = writer.written.lock().unwrap();
        assert_eq!(written.as_slice(), &[(path.clone(), 320, 360)]);
    }

    #[test]
    fn test_finish_maps_writer_error() {
        let finisher = finisher_with(Arc::new(FailingWriter));
        let err = finisher
            .finish("a.jpg", &frontal_face(), &FinishOptions::default(), Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, ImageFailure::Finishing(msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_default_finisher_saves_to_disk() {
        let tmp = TempDir::new().unwrap();
        let path = Finisher::default()
            .finish("face.png", &frontal_face(), &FinishOptions::default(), tmp.path())
            .unwrap();
        let saved = image::open(path).unwrap();
        assert_eq!((saved.width(), saved.height()), (320, 360));
    }
}
