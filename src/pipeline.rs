//! Screenshot pipeline: navigate, capture, resize and clip
//!
//! Given a session page, the pipeline navigates to the target URL, waits for
//! the configured load state, captures a raw screenshot into a temporary
//! file, then scales it to the target width preserving aspect ratio and
//! clips anything taller than the height ceiling before encoding the final
//! PNG. The temporary file never survives the call.

use crate::{
    create_temp_file, validate_url, LoadState, PageHandle, ScreenshotOptions, TempFileGuard,
    ThumbnailError, WorkerConfig,
};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

pub struct ScreenshotPipeline {
    navigation_timeout: Duration,
    load_state: LoadState,
    full_page: bool,
}

impl ScreenshotPipeline {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            load_state: config.load_state,
            full_page: config.full_page_capture,
        }
    }

    /// Capture `url` and write a `target_width` x (at most `max_height`)
    /// PNG to `output_path`.
    pub async fn capture(
        &self,
        page: &dyn PageHandle,
        url: &str,
        target_width: u32,
        max_height: u32,
        output_path: &Path,
    ) -> Result<(), ThumbnailError> {
        validate_url(url).map_err(|e| ThumbnailError::Navigation(format!("{url}: {e}")))?;

        page.navigate(url, self.navigation_timeout).await?;

        // The readiness signal can stay silent forever on a wedged page;
        // bound it here so a stuck wait cannot hold the session open past
        // the navigation budget.
        match timeout(
            self.navigation_timeout,
            page.wait_for_load_state(self.load_state),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ThumbnailError::Navigation(format!(
                    "load state wait timed out after {:?}: {url}",
                    self.navigation_timeout
                )))
            }
        }
        debug!("Loaded {}", url);

        let temp_file = TempFileGuard::new(create_temp_file("thumbnail-", ".png"));
        page.screenshot(&ScreenshotOptions {
            path: temp_file.path().to_path_buf(),
            full_page: self.full_page,
        })
        .await?;
        debug!("Saved raw screenshot: {}", temp_file.path().display());

        let img = image::open(temp_file.path())?;
        debug!("Screenshot is {}x{}", img.width(), img.height());

        let thumbnail = scale_and_clip(&img, target_width, max_height)?;
        debug!("Thumbnail is {}x{}", thumbnail.width(), thumbnail.height());

        thumbnail.save_with_format(output_path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Resize `img` to `target_width` preserving aspect ratio, then clip to
/// `max_height` when the scaled height exceeds it.
///
/// The scaled height is truncated, not rounded. Output dimensions are
/// observable downstream, so the truncation must stay. The clip is a
/// top-left crop of the already-resized raster, not a second resize.
pub fn scale_and_clip(
    img: &DynamicImage,
    target_width: u32,
    max_height: u32,
) -> Result<DynamicImage, ThumbnailError> {
    let width = img.width();
    let height = img.height();
    if width == 0 {
        return Err(ThumbnailError::ImageProcessing(
            "captured image has zero width".to_string(),
        ));
    }

    let target_height = (height as f64 / width as f64 * target_width as f64) as u32;
    let resized = img.resize_exact(target_width, target_height, FilterType::Triangle);

    if target_height > max_height {
        Ok(resized.crop_imm(0, 0, target_width, max_height))
    } else {
        Ok(resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_scale_without_clip() {
        // 1280x1600 at width 400 scales to 400x500, under the 600 ceiling.
        let img = gradient_image(1280, 1600);
        let out = scale_and_clip(&img, 400, 600).unwrap();
        assert_eq!(out.width(), 400);
        assert_eq!(out.height(), 500);
    }

    #[test]
    fn test_scale_with_clip() {
        // 800x2000 at width 100 scales to 100x250, clipped to 100x100.
        let img = gradient_image(800, 2000);
        let out = scale_and_clip(&img, 100, 100).unwrap();
        assert_eq!(out.width(), 100);
        assert_eq!(out.height(), 100);
    }

    #[test]
    fn test_scaled_height_truncates() {
        // 1000x999 at width 100: 99.9 truncates to 99 where rounding
        // would give 100.
        let img = gradient_image(1000, 999);
        let out = scale_and_clip(&img, 100, 500).unwrap();
        assert_eq!(out.height(), 99);
    }

    #[test]
    fn test_clip_is_crop_not_rescale() {
        let img = gradient_image(200, 600);
        let unclipped = scale_and_clip(&img, 100, 1000).unwrap();
        assert_eq!(unclipped.height(), 300);

        let clipped = scale_and_clip(&img, 100, 120).unwrap();
        assert_eq!(clipped.height(), 120);

        // The clipped raster must equal the top rows of the unclipped one.
        let expected = unclipped.crop_imm(0, 0, 100, 120);
        assert_eq!(clipped.to_rgba8().as_raw(), expected.to_rgba8().as_raw());
    }

    #[test]
    fn test_square_viewport_capture() {
        let img = gradient_image(960, 960);
        let out = scale_and_clip(&img, 100, 100).unwrap();
        assert_eq!((out.width(), out.height()), (100, 100));
    }

    #[test]
    fn test_zero_width_fails_fast() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(0, 10));
        let err = scale_and_clip(&img, 100, 100).unwrap_err();
        assert!(matches!(err, ThumbnailError::ImageProcessing(_)));
    }
}
