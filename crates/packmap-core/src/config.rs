use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

/// LOD subsample factors accepted by the container format.
pub const ALLOWED_LODS: [u32; 3] = [1, 2, 4];

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_PX: u32 = 256;

/// Fixed values that identify the on-disk format.
///
/// Passed to the writer at construction; the writer never reads them from
/// anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerFormat {
    /// 8-byte tag at offset 0.
    pub magic: [u8; 8],
    /// Version readers must match exactly.
    pub version: u32,
    /// Number of co-registered layers every container holds.
    pub num_layers: usize,
}

impl ContainerFormat {
    pub const STANDARD: ContainerFormat = ContainerFormat {
        magic: *b"ATLSv1\x00\x00",
        version: 2,
        num_layers: 4,
    };
}

impl Default for ContainerFormat {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Packing configuration.
///   - `tile_px` applies unchanged to every LOD raster
///   - `lods` order is the on-disk order of tiles; it is never sorted
///   - `parallel` only has an effect with the `parallel` cargo feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Tile edge length in pixels.
    #[serde(default = "default_tile_px")]
    pub tile_px: u32,
    /// LOD subsample factors, in output order.
    #[serde(default = "default_lods")]
    pub lods: Vec<u32>,
    /// Encode the tiles of one (LOD, layer) pair in parallel.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            tile_px: default_tile_px(),
            lods: default_lods(),
            parallel: false,
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `tile_px` is zero
    /// - `lods` is empty
    /// - any LOD is outside [`ALLOWED_LODS`]
    pub fn validate(&self) -> Result<()> {
        if self.tile_px == 0 {
            return Err(AtlasError::InvalidTileSize);
        }
        if self.lods.is_empty() {
            return Err(AtlasError::EmptyLods);
        }
        if let Some(&bad) = self.lods.iter().find(|l| !ALLOWED_LODS.contains(l)) {
            return Err(AtlasError::InvalidLod(bad));
        }
        Ok(())
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

/// Parses a comma-separated LOD list such as `"1,2,4"` or `" 2 , 4"`.
///
/// Empty items are skipped. Values are checked against [`ALLOWED_LODS`] and the
/// result must not be empty. Order and duplicates are kept as written.
pub fn parse_lods(s: &str) -> Result<Vec<u32>> {
    let mut lods = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let v: u32 = part
            .parse()
            .map_err(|_| AtlasError::InvalidConfig(format!("invalid LOD value: {part:?}")))?;
        if !ALLOWED_LODS.contains(&v) {
            return Err(AtlasError::InvalidLod(v));
        }
        lods.push(v);
    }
    if lods.is_empty() {
        return Err(AtlasError::EmptyLods);
    }
    Ok(lods)
}

fn default_tile_px() -> u32 {
    DEFAULT_TILE_PX
}
fn default_lods() -> Vec<u32> {
    ALLOWED_LODS.to_vec()
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn tile_px(mut self, v: u32) -> Self {
        self.cfg.tile_px = v;
        self
    }
    pub fn lods(mut self, v: impl Into<Vec<u32>>) -> Self {
        self.cfg.lods = v.into();
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}
