//! Container layout (little-endian throughout):
//!
//! - Header: `magic[8] version:u32 width:u32 height:u32 tile_px:u32
//!   num_lods:u32 lods[num_lods]:u32 tiles_x_full:u32 tiles_y_full:u32
//!   num_layers:u32 index_offset:u64 data_offset:u64`
//! - Index table: one [`INDEX_ENTRY_SIZE`]-byte record per tile
//! - Data section: tile payloads back to back, in index order

use std::io::{Seek, SeekFrom, Write};

use crate::config::ContainerFormat;
use crate::error::{AtlasError, Result};
use crate::model::{TileIndexEntry, TileRecord};
use crate::partition::tiles_along;

/// Size of one index record.
pub const INDEX_ENTRY_SIZE: u64 = 36;

/// Header bytes that do not depend on the LOD count.
pub const HEADER_FIXED_SIZE: u64 = 56;

/// Fixed header of an atlas container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub tile_px: u32,
    pub lods: Vec<u32>,
    /// Tile grid of the base (LOD 1) raster.
    pub tiles_x_full: u32,
    pub tiles_y_full: u32,
    pub num_layers: u32,
    /// Start of the index table; 0 until patched.
    pub index_offset: u64,
    /// Start of the data section; 0 until patched.
    pub data_offset: u64,
}

impl AtlasHeader {
    /// Header for a `width x height` base raster with both offsets unset.
    pub fn new(
        format: &ContainerFormat,
        width: u32,
        height: u32,
        tile_px: u32,
        lods: &[u32],
    ) -> Result<Self> {
        if tile_px == 0 {
            return Err(AtlasError::InvalidTileSize);
        }
        let num_layers = u32::try_from(format.num_layers).map_err(|_| {
            AtlasError::InvalidConfig(format!("layer count {} out of range", format.num_layers))
        })?;
        Ok(Self {
            magic: format.magic,
            version: format.version,
            width,
            height,
            tile_px,
            lods: lods.to_vec(),
            tiles_x_full: tiles_along(width, tile_px),
            tiles_y_full: tiles_along(height, tile_px),
            num_layers,
            index_offset: 0,
            data_offset: 0,
        })
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> u64 {
        HEADER_FIXED_SIZE + 4 * self.lods.len() as u64
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&self.magic);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.tile_px.to_le_bytes());
        buf.extend_from_slice(&(self.lods.len() as u32).to_le_bytes());
        for lod in &self.lods {
            buf.extend_from_slice(&lod.to_le_bytes());
        }
        buf.extend_from_slice(&self.tiles_x_full.to_le_bytes());
        buf.extend_from_slice(&self.tiles_y_full.to_le_bytes());
        buf.extend_from_slice(&self.num_layers.to_le_bytes());
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&self.data_offset.to_le_bytes());
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Copy with both offsets zeroed, as written before they are known.
    pub fn placeholder(&self) -> Self {
        Self {
            index_offset: 0,
            data_offset: 0,
            ..self.clone()
        }
    }

    /// Rewrites the two trailing offset fields of a header that starts at
    /// `header_start`, leaving the stream positioned after them.
    pub fn patch_offsets<W: Write + Seek>(&self, writer: &mut W, header_start: u64) -> Result<()> {
        writer.seek(SeekFrom::Start(header_start + self.encoded_len() - 16))?;
        writer.write_all(&self.index_offset.to_le_bytes())?;
        writer.write_all(&self.data_offset.to_le_bytes())?;
        Ok(())
    }
}

/// Serializes one index record.
pub fn encode_index_entry(entry: &TileIndexEntry) -> [u8; INDEX_ENTRY_SIZE as usize] {
    let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
    buf[0..4].copy_from_slice(&entry.key.lod.to_le_bytes());
    buf[4..8].copy_from_slice(&entry.key.z.to_le_bytes());
    buf[8..12].copy_from_slice(&entry.key.tile_x.to_le_bytes());
    buf[12..16].copy_from_slice(&entry.key.tile_y.to_le_bytes());
    buf[16..20].copy_from_slice(&entry.pixel_width.to_le_bytes());
    buf[20..24].copy_from_slice(&entry.pixel_height.to_le_bytes());
    buf[24..32].copy_from_slice(&entry.rel_offset.to_le_bytes());
    buf[32..36].copy_from_slice(&entry.byte_length.to_le_bytes());
    buf
}

/// Assigns data-section offsets in production order: each tile starts where
/// the previous one ends, the first at 0.
pub fn resolve_offsets(records: &[TileRecord]) -> Result<Vec<TileIndexEntry>> {
    let mut cursor = 0u64;
    let mut entries = Vec::with_capacity(records.len());
    for rec in records {
        let byte_length =
            u32::try_from(rec.payload.len()).map_err(|_| AtlasError::PayloadTooLarge {
                lod: rec.key.lod,
                z: rec.key.z,
                tile_x: rec.key.tile_x,
                tile_y: rec.key.tile_y,
                len: rec.payload.len(),
            })?;
        entries.push(TileIndexEntry {
            key: rec.key,
            pixel_width: rec.pixel_width,
            pixel_height: rec.pixel_height,
            rel_offset: cursor,
            byte_length,
        });
        cursor += byte_length as u64;
    }
    Ok(entries)
}

/// A fully materialized container: header, resolved index, payloads.
#[derive(Debug, Clone)]
pub struct AtlasContainer {
    pub header: AtlasHeader,
    pub entries: Vec<TileIndexEntry>,
    payloads: Vec<Vec<u8>>,
}

impl AtlasContainer {
    /// Resolves offsets for `records` (kept in the given order) and fills in
    /// the header's `index_offset`/`data_offset` for a header written at 0.
    pub fn new(mut header: AtlasHeader, records: Vec<TileRecord>) -> Result<Self> {
        let entries = resolve_offsets(&records)?;
        header.index_offset = header.encoded_len();
        header.data_offset = header.index_offset + INDEX_ENTRY_SIZE * entries.len() as u64;
        let payloads = records.into_iter().map(|r| r.payload).collect();
        Ok(Self {
            header,
            entries,
            payloads,
        })
    }

    /// Total bytes the container occupies.
    pub fn file_size(&self) -> u64 {
        self.header.data_offset + self.entries.last().map_or(0, TileIndexEntry::end)
    }

    pub fn payload(&self, i: usize) -> Option<&[u8]> {
        self.payloads.get(i).map(Vec::as_slice)
    }

    /// Single forward pass with final offsets. Works on append-only sinks.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write_to(writer)?;
        self.write_index(writer)?;
        self.write_data(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the header with zeroed offsets, then index and data, then seeks
    /// back and patches the offsets with the positions actually observed.
    ///
    /// The header is written at the sink's current position. Returns the
    /// header as patched on disk.
    pub fn write_patched<W: Write + Seek>(&self, writer: &mut W) -> Result<AtlasHeader> {
        let header_start = writer.stream_position()?;
        self.header.placeholder().write_to(writer)?;
        self.finish_patched(writer, header_start)
    }

    /// Second half of [`write_patched`](Self::write_patched): expects a
    /// placeholder header at `header_start` and the sink positioned right
    /// after it. Returns the header as patched on disk.
    pub fn finish_patched<W: Write + Seek>(
        &self,
        writer: &mut W,
        header_start: u64,
    ) -> Result<AtlasHeader> {
        let mut header = self.header.placeholder();
        header.index_offset = writer.stream_position()?;
        self.write_index(writer)?;
        header.data_offset = writer.stream_position()?;
        debug_assert_eq!(
            header.data_offset - header.index_offset,
            INDEX_ENTRY_SIZE * self.entries.len() as u64
        );
        self.write_data(writer)?;
        let end = writer.stream_position()?;

        header.patch_offsets(writer, header_start)?;
        writer.seek(SeekFrom::Start(end))?;
        writer.flush()?;
        Ok(header)
    }

    fn write_index<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.entries {
            writer.write_all(&encode_index_entry(entry))?;
        }
        Ok(())
    }

    fn write_data<W: Write>(&self, writer: &mut W) -> Result<()> {
        for payload in &self.payloads {
            writer.write_all(payload)?;
        }
        Ok(())
    }
}
