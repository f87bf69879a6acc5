use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid LOD {0}: LOD values must be a subset of 1,2,4")]
    InvalidLod(u32),
    #[error("At least one LOD required")]
    EmptyLods,
    #[error("Tile size must be greater than zero")]
    InvalidTileSize,
    #[error("Missing required input: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Expected {expected} source layers, got {actual}")]
    LayerCountMismatch { expected: usize, actual: usize },
    #[error(
        "All source layers must match in size. z0 is {}x{}, but {path} is {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    LayerSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
        path: String,
    },
    #[error("Tile payload too large for the index (lod {lod}, z {z}, tile {tile_x},{tile_y}): {len} bytes")]
    PayloadTooLarge {
        lod: u32,
        z: u32,
        tile_x: u32,
        tile_y: u32,
        len: usize,
    },
    #[error("Encoding error: {0}")]
    Encode(String),
}

impl AtlasError {
    /// True for errors caused by bad settings rather than bad inputs or I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::InvalidLod(_) | Self::EmptyLods | Self::InvalidTileSize
        )
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
