use crate::shared::face_box::CropRect;

/// Parses a user-supplied aspect ratio (width / height).
///
/// Accepts `"W:H"` or a plain number. Empty, `none`, `null` and anything
/// unparsable or non-positive mean "no adjustment".
pub fn parse_aspect_ratio(input: &str) -> Option<f64> {
    let s = input.trim().to_lowercase();
    if s.is_empty() || s == "none" || s == "null" {
        return None;
    }

    let ratio = match s.split_once(':') {
        Some((w, h)) => w.trim().parse::<f64>().ok()? / h.trim().parse::<f64>().ok()?,
        None => s.parse::<f64>().ok()?,
    };
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

/// Largest centred rectangle of `ratio` that fits a `width` × `height` image.
pub fn aspect_crop_rect(width: u32, height: u32, ratio: f64) -> Option<CropRect> {
    if width == 0 || height == 0 || !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }

    let (crop_w, crop_h) = if (width as f64 / height as f64) > ratio {
        // Wider than the target: keep full height.
        let w = ((height as f64 * ratio).round() as u32).clamp(1, width);
        (w, height)
    } else {
        let h = ((width as f64 / ratio).round() as u32).clamp(1, height);
        (width, h)
    };

    Some(CropRect {
        x: (width - crop_w) / 2,
        y: (height - crop_h) / 2,
        width: crop_w,
        height: crop_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case("4:5", 0.8)]
    #[case(" 16 : 9 ", 16.0 / 9.0)]
    #[case("1.5", 1.5)]
    #[case("1", 1.0)]
    fn test_parse_valid(#[case] input: &str, #[case] expected: f64) {
        assert_relative_eq!(parse_aspect_ratio(input).unwrap(), expected, epsilon = 1e-9);
    }

    #[rstest]
    #[case("")]
    #[case("None")]
    #[case("null")]
    #[case("abc")]
    #[case("4:")]
    #[case("4:0")]
    #[case("-1")]
    #[case("0")]
    fn test_parse_means_no_adjustment(#[case] input: &str) {
        assert_eq!(parse_aspect_ratio(input), None);
    }

    #[test]
    fn test_square_source_to_portrait() {
        let rect = aspect_crop_rect(100, 100, 0.75).unwrap();
        assert_eq!(
            rect,
            CropRect {
                x: 12,
                y: 0,
                width: 75,
                height: 100
            }
        );
    }

    #[test]
    fn test_tall_source_to_square() {
        let rect = aspect_crop_rect(300, 800, 1.0).unwrap();
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 250,
                width: 300,
                height: 300
            }
        );
    }

    #[test]
    fn test_matching_ratio_keeps_everything() {
        let rect = aspect_crop_rect(300, 400, 0.75).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 300, 400));
    }

    #[test]
    fn test_extreme_ratio_never_collapses() {
        let rect = aspect_crop_rect(10, 10, 1000.0).unwrap();
        assert_eq!(rect.width, 10);
        assert_eq!(rect.height, 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(aspect_crop_rect(0, 10, 1.0).is_none());
        assert!(aspect_crop_rect(10, 10, 0.0).is_none());
        assert!(aspect_crop_rect(10, 10, f64::NAN).is_none());
    }
}
