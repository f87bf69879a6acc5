use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Identity of a stored tile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// LOD subsample factor.
    pub lod: u32,
    /// Layer index.
    pub z: u32,
    pub tile_x: u32,
    pub tile_y: u32,
}

/// An encoded tile whose position in the data section is not yet known.
#[derive(Debug, Clone)]
pub struct TileRecord {
    pub key: TileKey,
    /// Pixel size of the encoded crop (smaller than `tile_px` at edges).
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub payload: Vec<u8>,
}

/// Persisted metadata for one tile: 36 bytes in the index table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileIndexEntry {
    pub key: TileKey,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Offset relative to the start of the data section.
    pub rel_offset: u64,
    pub byte_length: u32,
}

impl TileIndexEntry {
    /// One past the last payload byte, relative to the data section.
    pub fn end(&self) -> u64 {
        self.rel_offset + self.byte_length as u64
    }
}

/// Raster size and tile grid of one LOD, computed without encoding anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LodPlan {
    pub lod: u32,
    pub width: u32,
    pub height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl LodPlan {
    /// Tiles per layer at this LOD.
    pub fn tiles_per_layer(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }
}

/// Per-LOD totals of a finished pack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LodSummary {
    pub plan: LodPlan,
    /// Tiles across all layers.
    pub tiles: usize,
    /// Encoded payload bytes across all layers.
    pub payload_bytes: u64,
}

/// Outcome of a successful pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSummary {
    pub width: u32,
    pub height: u32,
    pub num_layers: usize,
    pub tile_px: u32,
    pub lods: Vec<u32>,
    pub entries: usize,
    pub index_offset: u64,
    pub data_offset: u64,
    pub file_size: u64,
    pub per_lod: Vec<LodSummary>,
}

impl PackSummary {
    /// Returns a human-readable summary line.
    pub fn summary(&self) -> String {
        format!(
            "Source size: {} x {} | Layers (Z): {} | Tile: {} | LODs: {:?} | Entries: {}",
            self.width, self.height, self.num_layers, self.tile_px, self.lods, self.entries,
        )
    }

    /// Total size of the data section.
    pub fn data_bytes(&self) -> u64 {
        self.file_size.saturating_sub(self.data_offset)
    }
}
