use serde_json::{Value, json};

use crate::container::{AtlasContainer, AtlasHeader, INDEX_ENTRY_SIZE};
use crate::model::TileIndexEntry;

/// Serialize the header and the full tile index as a JSON manifest
/// `{ header, tiles }`, with absolute payload offsets alongside the relative
/// ones. Meant as a human/tooling-readable sidecar to the binary container.
pub fn to_json_index(header: &AtlasHeader, entries: &[TileIndexEntry]) -> Value {
    let tiles: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "lod": e.key.lod,
                "z": e.key.z,
                "tileX": e.key.tile_x,
                "tileY": e.key.tile_y,
                "w": e.pixel_width,
                "h": e.pixel_height,
                "relOffset": e.rel_offset,
                "offset": header.data_offset + e.rel_offset,
                "length": e.byte_length,
            })
        })
        .collect();
    json!({
        "header": {
            "magic": String::from_utf8_lossy(&header.magic).trim_end_matches('\0'),
            "version": header.version,
            "width": header.width,
            "height": header.height,
            "tilePx": header.tile_px,
            "lods": &header.lods,
            "tilesXFull": header.tiles_x_full,
            "tilesYFull": header.tiles_y_full,
            "numLayers": header.num_layers,
            "indexOffset": header.index_offset,
            "dataOffset": header.data_offset,
            "entrySize": INDEX_ENTRY_SIZE,
        },
        "tiles": tiles,
    })
}

/// [`to_json_index`] for a materialized container.
pub fn container_to_json(container: &AtlasContainer) -> Value {
    to_json_index(&container.header, &container.entries)
}
