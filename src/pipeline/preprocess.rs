//! Image preprocessing: turn a rendered page into a clean, binarised image
//! the recognition engine can read.
//!
//! Three stages, each a pure function over the buffer, applied in order by
//! [`preprocess_page`]:
//!
//! 1. **Grayscale** — drops chrominance. Coloured page backgrounds are the
//!    single most common cause of garbage recognition output when this step
//!    is skipped.
//! 2. **Adaptive thresholding** — per-pixel cutoff against a Gaussian-weighted
//!    local mean (window 11, offset 2). A global threshold fails on pages
//!    with uneven illumination or background gradients; a local one does not.
//! 3. **Non-local-means denoising** (strength 10, template 7, search 21) —
//!    suppresses the speckle that thresholding introduces, without blurring
//!    character edges the way a Gaussian or median filter would.
//!
//! No resizing, cropping, or deskewing happens here.
//!
//! The denoiser uses one summed-area table per search offset, so its cost is
//! O(pixels × search²) rather than O(pixels × search² × template²).

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Local neighbourhood edge length for adaptive thresholding.
pub const THRESHOLD_WINDOW: u32 = 11;
/// Constant subtracted from the local mean before comparison.
pub const THRESHOLD_OFFSET: i16 = 2;
/// Non-local-means filter strength.
pub const DENOISE_STRENGTH: f32 = 10.0;
/// Patch edge length used to compare neighbourhoods.
pub const DENOISE_TEMPLATE: u32 = 7;
/// Search window edge length for candidate patches.
pub const DENOISE_SEARCH: u32 = 21;

/// Run the full preprocessing chain on a rendered page.
///
/// The input buffer is never mutated; a new binary-valued image is returned.
/// Errors are returned as a plain detail string; the orchestrator attaches
/// the page number.
pub fn preprocess_page(image: &DynamicImage) -> Result<GrayImage, String> {
    if image.width() == 0 || image.height() == 0 {
        return Err(format!(
            "cannot preprocess {}x{} image",
            image.width(),
            image.height()
        ));
    }

    let gray = to_grayscale(image);
    let binary = adaptive_threshold(&gray, THRESHOLD_WINDOW, THRESHOLD_OFFSET);
    let denoised = denoise(&binary, DENOISE_STRENGTH, DENOISE_TEMPLATE, DENOISE_SEARCH);
    Ok(binarize(&denoised))
}

/// Reduce to a single luminance channel.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Adaptive thresholding against a Gaussian-weighted local mean.
///
/// A pixel becomes white when it is brighter than its neighbourhood mean
/// minus `offset`, black otherwise. The Gaussian sigma follows the standard
/// kernel-size relation `0.3·((w−1)/2 − 1) + 0.8`, which is 2.0 for an
/// 11-pixel window.
pub fn adaptive_threshold(gray: &GrayImage, window: u32, offset: i16) -> GrayImage {
    let sigma = 0.3 * ((window.max(3) - 1) as f32 * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma);

    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y).0[0] as i16 - offset;
        let value = if pixel.0[0] as i16 > threshold { 255u8 } else { 0u8 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Non-local-means denoising.
///
/// For each pixel, every candidate inside the `search` window is weighted by
/// how similar its `template`-sized patch is to the pixel's own patch
/// (`exp(−meanSquaredDiff / strength²)`), and the result is the weighted
/// average of candidate values. The pixel's own weight is capped at the
/// maximum candidate weight, so an isolated speckle cannot out-vote the
/// candidates around it.
///
/// Patch distances are computed via one summed-area table per search offset.
/// The output is grayscale; callers wanting a binary image re-threshold it
/// (see [`binarize`]).
pub fn denoise(src: &GrayImage, strength: f32, template: u32, search: u32) -> GrayImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }

    let w = width as i64;
    let h = height as i64;
    let t_radius = (template / 2) as i64;
    let s_radius = (search / 2) as i64;
    let inv_h2 = 1.0 / (strength * strength);
    let n = (width * height) as usize;

    let mut weight_sum = vec![0.0f32; n];
    let mut value_sum = vec![0.0f32; n];
    let mut max_weight = vec![0.0f32; n];

    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, w - 1) as u32;
        let cy = y.clamp(0, h - 1) as u32;
        src.get_pixel(cx, cy).0[0] as f32
    };

    let stride = (w + 1) as usize;
    let mut table = vec![0.0f64; stride * (h + 1) as usize];

    for dy in -s_radius..=s_radius {
        for dx in -s_radius..=s_radius {
            if dx == 0 && dy == 0 {
                continue;
            }

            // Summed-area table of squared differences for this offset.
            for y in 0..h {
                let mut row_sum = 0.0f64;
                for x in 0..w {
                    let d = (at(x, y) - at(x + dx, y + dy)) as f64;
                    row_sum += d * d;
                    let idx = (y + 1) as usize * stride + (x + 1) as usize;
                    table[idx] = row_sum + table[idx - stride];
                }
            }

            for y in 0..h {
                for x in 0..w {
                    let x1 = (x - t_radius).max(0) as usize;
                    let y1 = (y - t_radius).max(0) as usize;
                    let x2 = ((x + t_radius + 1).min(w)) as usize;
                    let y2 = ((y + t_radius + 1).min(h)) as usize;
                    let area = ((x2 - x1) * (y2 - y1)) as f64;

                    let patch_sum = table[y2 * stride + x2] - table[y1 * stride + x2]
                        - table[y2 * stride + x1]
                        + table[y1 * stride + x1];
                    let dist = (patch_sum / area) as f32;
                    let weight = (-dist * inv_h2).exp();

                    let idx = (y * w + x) as usize;
                    weight_sum[idx] += weight;
                    value_sum[idx] += weight * at(x + dx, y + dy);
                    if weight > max_weight[idx] {
                        max_weight[idx] = weight;
                    }
                }
            }
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let own = at(x, y);
            let center_weight = max_weight[idx];
            let total = weight_sum[idx] + center_weight;
            let value = if total <= f32::EPSILON {
                own
            } else {
                (value_sum[idx] + center_weight * own) / total
            };
            out.put_pixel(x as u32, y as u32, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Snap a grayscale image back to strict black/white at the midpoint.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel.0[0] >= 128 { 255u8 } else { 0u8 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}
