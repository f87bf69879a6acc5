//! Core library for packing layered rasters into a tiled, multi-LOD atlas container.
//!
//! - Partitioner: `TileGrid` walks an image in row-major `tile_px` cells, truncating edge tiles
//! - Writer: `AtlasWriter::pack` downsamples each layer per LOD, tiles, encodes (PNG by default),
//!   resolves contiguous payload offsets, and writes header + index table + data section
//! - Codecs sit behind the `Resampler` and `LosslessEncoder` traits
//!
//! Quick example:
//! ```ignore
//! use packmap_core::{AtlasConfig, pack_layer_files};
//! # fn main() -> anyhow::Result<()> {
//! let cfg = AtlasConfig::builder().tile_px(256).lods([1, 2, 4]).build();
//! let paths = ["world_plane0.png", "world_plane1.png", "world_plane2.png", "world_plane3.png"];
//! let summary = pack_layer_files(&paths, "atlas_bg.atlas".as_ref(), cfg)?;
//! println!("entries: {}", summary.entries);
//! # Ok(()) }
//! ```

pub mod config;
pub mod container;
pub mod encode;
pub mod error;
pub mod export;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod resample;

pub use config::*;
pub use container::*;
pub use encode::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use partition::*;
pub use pipeline::*;
pub use resample::*;

/// Convenience prelude for common types and functions.
/// Importing `packmap_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, ContainerFormat, parse_lods};
    pub use crate::container::{AtlasContainer, AtlasHeader, INDEX_ENTRY_SIZE};
    pub use crate::encode::{EncodedTile, LosslessEncoder, PngTileEncoder};
    pub use crate::error::{AtlasError, Result};
    pub use crate::model::{LodPlan, PackSummary, TileIndexEntry, TileKey};
    pub use crate::partition::{TileBounds, TileGrid};
    pub use crate::resample::{BoxResampler, Resampler};
    pub use crate::{AtlasWriter, LayerImage, pack_layer_files, plan_lods};
}
