//! Non-local means denoising for single-channel images.
//!
//! Every pixel is replaced by a weighted average of the pixels in its search
//! window, weighted by how similar the surrounding template patches are:
//! `w = exp(-mean_sq_patch_diff / h^2)`. Patches use replicated borders, so
//! every patch covers the full template area.
//!
//! The image is split into horizontal bands processed in parallel. Within a
//! band, patch distances for one search offset come from integer box sums
//! (a vertical running sum, then a horizontal sliding window), and weights
//! are read from a table indexed by the integer mean squared difference.

use image::GrayImage;
use rayon::prelude::*;

/// Output rows handled by one worker.
const BAND_ROWS: usize = 32;
const MAX_MEAN_SQ_DIFF: usize = 255 * 255;

struct Params {
    template_radius: usize,
    search_radius: isize,
    weights: Vec<f32>,
}

pub fn non_local_means(
    img: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let w = width as usize;
    let h = height as usize;
    let params = Params {
        template_radius: (template_window / 2) as usize,
        search_radius: (search_window / 2) as isize,
        weights: weight_table(strength),
    };

    let src = img.as_raw();
    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(w * BAND_ROWS)
        .enumerate()
        .for_each(|(band, rows)| denoise_band(src, w, h, band * BAND_ROWS, rows, &params));

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| img.clone())
}

fn weight_table(strength: f32) -> Vec<f32> {
    let h_sq = (strength * strength).max(f32::MIN_POSITIVE);
    (0..=MAX_MEAN_SQ_DIFF)
        .map(|d| (-(d as f32) / h_sq).exp())
        .collect()
}

fn denoise_band(src: &[u8], w: usize, h: usize, y_start: usize, out: &mut [u8], params: &Params) {
    let band_h = out.len() / w;
    let tr = params.template_radius;
    let sr = params.search_radius;
    let t = 2 * tr + 1;
    let area = (t * t) as u64;
    let ext_w = w + 2 * tr;
    let ext_h = band_h + 2 * tr;

    let mut diff = vec![0u32; ext_h * ext_w];
    let mut columns = vec![0u32; band_h * ext_w];
    let mut weight_sum = vec![0f32; band_h * w];
    let mut value_sum = vec![0f32; band_h * w];

    for dy in -sr..=sr {
        for dx in -sr..=sr {
            // Squared differences over the band plus a template-radius margin
            for ey in 0..ext_h {
                let yy = (y_start + ey) as isize - tr as isize;
                let row = clamp_index(yy, h) * w;
                let shifted = clamp_index(yy + dy, h) * w;
                let line = &mut diff[ey * ext_w..(ey + 1) * ext_w];
                for (ex, cell) in line.iter_mut().enumerate() {
                    let xx = ex as isize - tr as isize;
                    let d = src[row + clamp_index(xx, w)] as i32
                        - src[shifted + clamp_index(xx + dx, w)] as i32;
                    *cell = (d * d) as u32;
                }
            }

            // Vertical template sums, one running row per output row
            for ex in 0..ext_w {
                columns[ex] = (0..t).map(|k| diff[k * ext_w + ex]).sum();
            }
            for by in 1..band_h {
                for ex in 0..ext_w {
                    columns[by * ext_w + ex] = columns[(by - 1) * ext_w + ex]
                        + diff[(by + t - 1) * ext_w + ex]
                        - diff[(by - 1) * ext_w + ex];
                }
            }

            for by in 0..band_h {
                let shifted = clamp_index((y_start + by) as isize + dy, h) * w;
                let col = &columns[by * ext_w..(by + 1) * ext_w];
                let mut ssd: u64 = col[..t].iter().map(|&c| c as u64).sum();

                for x in 0..w {
                    let mean = ((ssd / area) as usize).min(MAX_MEAN_SQ_DIFF);
                    let weight = params.weights[mean];
                    let idx = by * w + x;
                    weight_sum[idx] += weight;
                    value_sum[idx] +=
                        weight * src[shifted + clamp_index(x as isize + dx, w)] as f32;

                    if x + t < ext_w {
                        ssd = ssd + col[x + t] as u64 - col[x] as u64;
                    }
                }
            }
        }
    }

    for (idx, pixel) in out.iter_mut().enumerate() {
        let value = if weight_sum[idx] > 0.0 {
            value_sum[idx] / weight_sum[idx]
        } else {
            src[y_start * w + idx] as f32
        };
        *pixel = value.round().clamp(0.0, 255.0) as u8;
    }
}

fn clamp_index(value: isize, len: usize) -> usize {
    value.clamp(0, len as isize - 1) as usize
}
