#![allow(dead_code)]

use image::{DynamicImage, Rgba, RgbaImage};
use packmap_core::{INDEX_ENTRY_SIZE, LayerImage};

/// Four layers filled with one distinct opaque colour each.
pub fn solid_layers(w: u32, h: u32) -> Vec<LayerImage> {
    (0..4u8)
        .map(|z| LayerImage {
            key: format!("layer_{z}"),
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, solid_color(z))),
        })
        .collect()
}

pub fn solid_color(z: u8) -> Rgba<u8> {
    Rgba([z * 60, 100, 200, 255])
}

/// Four layers whose pixels encode their own coordinates, so crops can be
/// checked against the source.
pub fn gradient_layers(w: u32, h: u32) -> Vec<LayerImage> {
    (0..4u8)
        .map(|z| LayerImage {
            key: format!("layer_{z}"),
            image: DynamicImage::ImageRgba8(gradient(w, h, z)),
        })
        .collect()
}

pub fn gradient(w: u32, h: u32, z: u8) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, z, 255]))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub lod: u32,
    pub z: u32,
    pub tile_x: u32,
    pub tile_y: u32,
    pub w: u32,
    pub h: u32,
    pub rel_offset: u64,
    pub len: u32,
}

#[derive(Debug, Clone)]
pub struct Parsed {
    pub magic: [u8; 8],
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub tile_px: u32,
    pub lods: Vec<u32>,
    pub tiles_x_full: u32,
    pub tiles_y_full: u32,
    pub num_layers: u32,
    pub index_offset: u64,
    pub data_offset: u64,
    pub header_len: usize,
    pub entries: Vec<ParsedEntry>,
}

fn u32_at(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(b[off..off + 4].try_into().unwrap())
}

fn u64_at(b: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(b[off..off + 8].try_into().unwrap())
}

/// Test-side parser of the container bytes.
pub fn parse(bytes: &[u8]) -> Parsed {
    let magic: [u8; 8] = bytes[0..8].try_into().unwrap();
    let num_lods = u32_at(bytes, 24) as usize;
    let lods = (0..num_lods).map(|i| u32_at(bytes, 28 + 4 * i)).collect();
    let p = 28 + 4 * num_lods;
    let index_offset = u64_at(bytes, p + 12);
    let data_offset = u64_at(bytes, p + 20);
    let count = if data_offset > index_offset {
        ((data_offset - index_offset) / INDEX_ENTRY_SIZE) as usize
    } else {
        0
    };
    let entries = (0..count)
        .map(|i| {
            let o = index_offset as usize + i * INDEX_ENTRY_SIZE as usize;
            ParsedEntry {
                lod: u32_at(bytes, o),
                z: u32_at(bytes, o + 4),
                tile_x: u32_at(bytes, o + 8),
                tile_y: u32_at(bytes, o + 12),
                w: u32_at(bytes, o + 16),
                h: u32_at(bytes, o + 20),
                rel_offset: u64_at(bytes, o + 24),
                len: u32_at(bytes, o + 32),
            }
        })
        .collect();
    Parsed {
        magic,
        version: u32_at(bytes, 8),
        width: u32_at(bytes, 12),
        height: u32_at(bytes, 16),
        tile_px: u32_at(bytes, 20),
        lods,
        tiles_x_full: u32_at(bytes, p),
        tiles_y_full: u32_at(bytes, p + 4),
        num_layers: u32_at(bytes, p + 8),
        index_offset,
        data_offset,
        header_len: p + 28,
        entries,
    }
}

pub fn payload<'a>(bytes: &'a [u8], parsed: &Parsed, e: &ParsedEntry) -> &'a [u8] {
    let start = (parsed.data_offset + e.rel_offset) as usize;
    &bytes[start..start + e.len as usize]
}

pub fn decode_png(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png).expect("decode png")
}

/// Unique scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("packmap_{}_{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
