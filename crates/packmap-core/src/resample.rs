use image::{Rgba, RgbaImage};

/// Produces a reduced-resolution copy of a layer for one LOD.
pub trait Resampler {
    /// Resamples `src` to exactly `width x height`.
    fn resample(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage;
}

/// Area-averaging ("box") downsampler.
///
/// Every output pixel is the coverage-weighted mean of the source pixels under
/// its footprint, so non-integer ratios (e.g. 301 px -> 150 px) weight the
/// partially covered edge pixels fractionally. Colour channels are averaged
/// with alpha premultiplied, so fully transparent pixels do not bleed their
/// RGB into neighbours.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxResampler;

impl Resampler for BoxResampler {
    fn resample(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        let (sw, sh) = src.dimensions();
        if width == 0 || height == 0 || sw == 0 || sh == 0 {
            return RgbaImage::new(width, height);
        }
        if (sw, sh) == (width, height) {
            return src.clone();
        }
        let xs = box_taps(sw, width);
        let ys = box_taps(sh, height);

        // horizontal pass, premultiplied
        let ow = width as usize;
        let mut rows: Vec<[f32; 4]> = vec![[0.0; 4]; ow * sh as usize];
        for y in 0..sh {
            let row = &mut rows[y as usize * ow..(y as usize + 1) * ow];
            for (out, taps) in row.iter_mut().zip(&xs) {
                let mut acc = [0.0f32; 4];
                for &(sx, w) in taps {
                    let p = src.get_pixel(sx, y).0;
                    let a = p[3] as f32;
                    acc[0] += p[0] as f32 * a * w;
                    acc[1] += p[1] as f32 * a * w;
                    acc[2] += p[2] as f32 * a * w;
                    acc[3] += a * w;
                }
                *out = acc;
            }
        }

        // vertical pass
        let mut out = RgbaImage::new(width, height);
        for (oy, taps) in ys.iter().enumerate() {
            for ox in 0..ow {
                let mut acc = [0.0f32; 4];
                for &(sy, w) in taps {
                    let p = rows[sy as usize * ow + ox];
                    for c in 0..4 {
                        acc[c] += p[c] * w;
                    }
                }
                out.put_pixel(ox as u32, oy as u32, unpremultiply(acc));
            }
        }
        out
    }
}

/// Source taps `(index, weight)` for each output sample along one axis.
/// Weights of each output sample sum to 1.
fn box_taps(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let start = i as f64 * scale;
            let end = ((i + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);
            let mut taps = Vec::with_capacity((last - first) as usize);
            for s in first..last {
                let cover = ((s + 1) as f64).min(end) - (s as f64).max(start);
                if cover > 0.0 {
                    taps.push((s, cover));
                }
            }
            let total: f64 = taps.iter().map(|&(_, w)| w).sum();
            taps.into_iter()
                .map(|(s, w)| (s, (w / total) as f32))
                .collect()
        })
        .collect()
}

fn unpremultiply(acc: [f32; 4]) -> Rgba<u8> {
    let a = acc[3];
    let alpha = a.round().clamp(0.0, 255.0) as u8;
    // colour of a pixel that rounds to fully transparent is dropped
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let ch = |v: f32| (v / a).round().clamp(0.0, 255.0) as u8;
    Rgba([ch(acc[0]), ch(acc[1]), ch(acc[2]), alpha])
}

/// Size of the LOD raster for subsample factor `lod` (`floor(dim / lod)`).
pub fn lod_dimensions(width: u32, height: u32, lod: u32) -> (u32, u32) {
    if lod <= 1 {
        (width, height)
    } else {
        (width / lod, height / lod)
    }
}
