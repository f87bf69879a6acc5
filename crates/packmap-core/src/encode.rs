use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::Result;

/// A tile payload and the pixel size it decodes to.
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Lossless tile codec. The packer treats the payload as opaque bytes.
///
/// Implementations must be `Sync` so tiles can be encoded from worker threads
/// when the `parallel` feature is on.
pub trait LosslessEncoder: Sync {
    fn encode(&self, tile: &RgbaImage) -> Result<EncodedTile>;
}

/// RGBA8 PNG at maximum compression.
#[derive(Debug, Clone, Copy)]
pub struct PngTileEncoder {
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngTileEncoder {
    fn default() -> Self {
        Self {
            compression: CompressionType::Best,
            filter: FilterType::Adaptive,
        }
    }
}

impl LosslessEncoder for PngTileEncoder {
    fn encode(&self, tile: &RgbaImage) -> Result<EncodedTile> {
        let (width, height) = tile.dimensions();
        let mut bytes = Vec::new();
        PngEncoder::new_with_quality(&mut bytes, self.compression, self.filter).write_image(
            tile.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(EncodedTile {
            bytes,
            width,
            height,
        })
    }
}
