#[cfg(test)]
mod tests {
    use super::super::*;
    use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn measurements(format: FileFormat, size_bytes: u64, width: u32, height: u32) -> LogoMeasurements {
        LogoMeasurements {
            format,
            size_bytes,
            width,
            height,
            unique_colors: 4,
            edge_density: 0.05,
        }
    }

    fn logo_png(width: u32, height: u32) -> Vec<u8> {
        let img: RgbaImage = ImageBuffer::from_fn(width, height, |x, y| {
            let cx = x as i32 - width as i32 / 2;
            let cy = y as i32 - height as i32 / 2;
            if cx * cx + cy * cy < (width as i32 / 4).pow(2) {
                Rgba([200, 20, 40, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_gif_is_rejected_outright() {
        let file = FileDescriptor::new("anim.gif", "image/gif", logo_png(300, 300));
        let result = validate_logo(&file, &QualityThresholds::default());
        assert!(!result.is_valid);
        assert_eq!(result.score, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Invalid file format"));
        assert!(result.warnings.is_empty());
        assert_eq!(result.metrics.file_type, "image/gif");
        assert_eq!(result.metrics.width, None);
    }

    #[test]
    fn test_format_tags_accepted() {
        let allowed = QualityThresholds::default().allowed_formats;
        assert_eq!(FileFormat::from_declared("image/png", &allowed), Some(FileFormat::Png));
        assert_eq!(FileFormat::from_declared("IMAGE/JPEG", &allowed), Some(FileFormat::Jpeg));
        assert_eq!(FileFormat::from_declared("image/jpg", &allowed), Some(FileFormat::Jpeg));
        assert_eq!(FileFormat::from_declared("png", &allowed), Some(FileFormat::Png));
        assert_eq!(FileFormat::from_declared("image/webp", &allowed), None);
        assert_eq!(FileFormat::from_declared("", &allowed), None);
    }

    #[test]
    fn test_oversized_file_is_hard_error() {
        let m = measurements(FileFormat::Png, 6 * 1024 * 1024, 1000, 1000);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("File too large (6.00MB)"));
    }

    #[test]
    fn test_large_file_is_warning_only() {
        let m = measurements(FileFormat::Png, 3 * 1024 * 1024, 2000, 2000);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert!(result.is_valid);
        assert!(result.warnings[0].starts_with("Large file size"));
        // -10 size, -15 efficiency (0.79 KB/1000px), +5 png
        assert_eq!(result.score, 80);
    }

    #[test]
    fn test_small_dimensions_rejected() {
        let m = measurements(FileFormat::Png, 5_000, 100, 100);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Dimensions too small (100x100)")));
    }

    #[test]
    fn test_large_dimensions_rejected() {
        let m = measurements(FileFormat::Png, 500_000, 3000, 400);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Dimensions too large (3000x400)"));
    }

    #[test]
    fn test_clean_png_scores_full_marks() {
        let m = measurements(FileFormat::Png, 20_000, 400, 400);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert!(result.is_valid);
        assert_eq!(result.score, 100);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_jpeg_warns_without_penalty() {
        let m = measurements(FileFormat::Jpeg, 20_000, 400, 400);
        let result = score_measurements("image/jpeg", &m, &QualityThresholds::default());
        assert!(result.is_valid);
        assert_eq!(result.score, 100);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("JPEG format"));
    }

    #[test]
    fn test_color_count_bands() {
        let t = QualityThresholds::default();
        let mut m = measurements(FileFormat::Png, 1, 400, 400);
        let cases = [(150usize, 20), (100, 10), (51, 10), (50, 5), (21, 5), (20, 0)];
        for (count, penalty) in cases {
            m.unique_colors = count;
            let ev = check_color_count(Evaluation::start("image/png"), &m, &t);
            assert_eq!(100 - ev.score, penalty, "count {}", count);
        }
    }

    #[test]
    fn test_edge_density_bands() {
        let t = QualityThresholds::default();
        let mut m = measurements(FileFormat::Png, 1, 400, 400);
        let cases = [(0.6, 30), (0.55, 15), (0.41, 15), (0.40, 5), (0.26, 5), (0.25, 0)];
        for (density, penalty) in cases {
            m.edge_density = density;
            let ev = check_edge_density(Evaluation::start("image/png"), &m, &t);
            assert_eq!(100 - ev.score, penalty, "density {}", density);
        }
    }

    #[test]
    fn test_many_warnings_and_low_score_reject() {
        let m = LogoMeasurements {
            format: FileFormat::Jpeg,
            size_bytes: 3 * 1024 * 1024,
            width: 1000,
            height: 1000,
            unique_colors: 150,
            edge_density: 0.6,
        };
        let result = score_measurements("image/jpeg", &m, &QualityThresholds::default());
        // 100 - 10 - 15 - 20 - 30
        assert_eq!(result.score, 25);
        assert!(!result.is_valid);
        assert_eq!(result.confidence, Confidence::LikelyNot);
        assert_eq!(
            result.errors,
            vec!["Multiple quality indicators suggest this is not a logo".to_string()]
        );
    }

    #[test]
    fn test_low_score_alone_does_not_reject() {
        // Same signals on a PNG: 100 - 10 - 15 - 20 - 30 + 5 = 30, not below 30
        let m = LogoMeasurements {
            format: FileFormat::Png,
            size_bytes: 3 * 1024 * 1024,
            width: 1000,
            height: 1000,
            unique_colors: 150,
            edge_density: 0.6,
        };
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert_eq!(result.score, 30);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let m = LogoMeasurements {
            format: FileFormat::Jpeg,
            size_bytes: 9 * 1024 * 1024,
            width: 100,
            height: 3000,
            unique_colors: 500,
            edge_density: 0.9,
        };
        let result = score_measurements("image/jpeg", &m, &QualityThresholds::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(100), Confidence::High);
        assert_eq!(Confidence::from_score(80), Confidence::High);
        assert_eq!(Confidence::from_score(79), Confidence::Likely);
        assert_eq!(Confidence::from_score(60), Confidence::Likely);
        assert_eq!(Confidence::from_score(40), Confidence::Borderline);
        assert_eq!(Confidence::from_score(20), Confidence::LikelyNot);
        assert_eq!(Confidence::from_score(19), Confidence::Low);
    }

    #[test]
    fn test_validate_logo_on_real_png() {
        let file = FileDescriptor::new("mark.png", "image/png", logo_png(300, 300));
        let result = validate_logo(&file, &QualityThresholds::default());
        assert!(result.is_valid, "{:?}", result);
        assert_eq!(result.metrics.width, Some(300));
        assert_eq!(result.metrics.height, Some(300));
        assert!(result.metrics.unique_colors.unwrap() >= 2);
        assert!(result.metrics.edge_density.unwrap() < 0.25);
    }

    #[test]
    fn test_undecodable_bytes_measure_as_zero() {
        let file = FileDescriptor::new("broken.png", "image/png", vec![0u8; 64]);
        let result = validate_logo(&file, &QualityThresholds::default());
        assert!(!result.is_valid);
        assert_eq!(result.metrics.width, Some(0));
        assert_eq!(result.metrics.unique_colors, Some(0));
        assert_eq!(result.metrics.edge_density, Some(0.0));
        assert!(result.errors.iter().any(|e| e.starts_with("Dimensions too small")));
    }

    #[test]
    fn test_error_message_joins() {
        let m = measurements(FileFormat::Png, 6 * 1024 * 1024, 100, 100);
        let result = score_measurements("image/png", &m, &QualityThresholds::default());
        assert_eq!(result.errors.len(), 2);
        assert!(result.error_message().contains("MB. Dimensions too small"));
    }
}
