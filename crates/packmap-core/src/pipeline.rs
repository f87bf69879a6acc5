use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader, RgbaImage, imageops};
use tracing::{debug, info, instrument, trace};

use crate::config::{AtlasConfig, ContainerFormat};
use crate::container::{AtlasContainer, AtlasHeader};
use crate::encode::{EncodedTile, LosslessEncoder, PngTileEncoder};
use crate::error::{AtlasError, Result};
use crate::model::{LodPlan, LodSummary, PackSummary, TileKey, TileRecord};
use crate::partition::{TileBounds, TileGrid};
use crate::resample::{BoxResampler, Resampler, lod_dimensions};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One decoded source layer (key + image). The key is usually the file path
/// and is only used in error messages.
pub struct LayerImage {
    pub key: String,
    pub image: DynamicImage,
}

/// Layers that passed validation, normalized to RGBA and ready to tile.
pub struct PreparedLayers {
    layers: Vec<RgbaImage>,
    width: u32,
    height: u32,
}

impl PreparedLayers {
    /// Shared base (LOD 1) size of every layer.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Packs a fixed set of layers into a tiled multi-LOD container.
///
/// The writer holds only immutable settings; every call to [`pack`](Self::pack)
/// runs Validate -> Accumulate -> Resolve Offsets -> Serialize from scratch.
pub struct AtlasWriter<R = BoxResampler, E = PngTileEncoder> {
    format: ContainerFormat,
    config: AtlasConfig,
    resampler: R,
    encoder: E,
}

impl AtlasWriter {
    /// Standard container format with the box resampler and PNG tiles.
    pub fn new(config: AtlasConfig) -> Self {
        Self::with_parts(
            ContainerFormat::STANDARD,
            config,
            BoxResampler,
            PngTileEncoder::default(),
        )
    }
}

impl<R: Resampler, E: LosslessEncoder> AtlasWriter<R, E> {
    pub fn with_parts(format: ContainerFormat, config: AtlasConfig, resampler: R, encoder: E) -> Self {
        Self {
            format,
            config,
            resampler,
            encoder,
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn format(&self) -> &ContainerFormat {
        &self.format
    }

    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Validates the configuration and the layer set, and normalizes every
    /// layer to RGBA. Nothing is written.
    ///
    /// The first layer's size is authoritative; any other size fails with
    /// [`AtlasError::LayerSizeMismatch`].
    pub fn prepare(&self, layers: Vec<LayerImage>) -> Result<PreparedLayers> {
        self.config.validate()?;
        if layers.len() != self.format.num_layers {
            return Err(AtlasError::LayerCountMismatch {
                expected: self.format.num_layers,
                actual: layers.len(),
            });
        }
        let mut out = Vec::with_capacity(layers.len());
        let mut dims: Option<(u32, u32)> = None;
        for layer in layers {
            let rgba = layer.image.into_rgba8();
            let actual = rgba.dimensions();
            match dims {
                None => dims = Some(actual),
                Some(expected) if expected != actual => {
                    return Err(AtlasError::LayerSizeMismatch {
                        expected,
                        actual,
                        path: layer.key,
                    });
                }
                Some(_) => {}
            }
            out.push(rgba);
        }
        let (width, height) = dims.unwrap_or((0, 0));
        Ok(PreparedLayers {
            layers: out,
            width,
            height,
        })
    }

    #[instrument(skip_all)]
    /// Validates `layers`, then writes the container to a seekable `sink`.
    ///
    /// The header goes out first with zeroed offsets; after the index and data
    /// section are written the sink is rewound to patch them. On error the
    /// sink may hold a partial container whose offsets are still 0.
    pub fn pack<W: Write + Seek>(&self, layers: Vec<LayerImage>, sink: &mut W) -> Result<PackSummary> {
        let prepared = self.prepare(layers)?;
        self.write(prepared, sink)
    }

    #[instrument(skip_all)]
    /// Writes already validated layers to a seekable `sink`.
    pub fn write<W: Write + Seek>(&self, prepared: PreparedLayers, sink: &mut W) -> Result<PackSummary> {
        let header = self.header_for(&prepared)?;
        let header_start = sink.stream_position()?;
        header.write_to(sink)?;

        let records = self.accumulate(&prepared)?;
        // base layers are not needed past this point
        drop(prepared);

        let container = AtlasContainer::new(header, records)?;
        let on_disk = container.finish_patched(sink, header_start)?;
        let summary = self.summarize(&container, &on_disk)?;
        info!(entries = summary.entries, "{}", summary.summary());
        Ok(summary)
    }

    #[instrument(skip_all)]
    /// Like [`pack`](Self::pack) but for append-only sinks: offsets are
    /// resolved in memory first and the container is emitted in one forward
    /// pass. Produces the same bytes as `pack`.
    pub fn pack_stream<W: Write>(&self, layers: Vec<LayerImage>, sink: &mut W) -> Result<PackSummary> {
        let container = self.build(self.prepare(layers)?)?;
        container.write_to(sink)?;
        let summary = self.summarize(&container, &container.header)?;
        info!(entries = summary.entries, "{}", summary.summary());
        Ok(summary)
    }

    /// Encodes every tile and resolves offsets without writing anything.
    pub fn build(&self, prepared: PreparedLayers) -> Result<AtlasContainer> {
        let header = self.header_for(&prepared)?;
        let records = self.accumulate(&prepared)?;
        AtlasContainer::new(header, records)
    }

    /// Raster size and tile grid of every configured LOD, in output order.
    pub fn plan(&self, width: u32, height: u32) -> Result<Vec<LodPlan>> {
        plan_lods(width, height, &self.config)
    }

    fn header_for(&self, prepared: &PreparedLayers) -> Result<AtlasHeader> {
        AtlasHeader::new(
            &self.format,
            prepared.width,
            prepared.height,
            self.config.tile_px,
            &self.config.lods,
        )
    }

    /// LOD outer, layer next, row-major tiles inner. This order is the on-disk
    /// order of both the index and the data section.
    fn accumulate(&self, prepared: &PreparedLayers) -> Result<Vec<TileRecord>> {
        let plans = self.plan(prepared.width, prepared.height)?;
        let total: usize = plans.iter().map(|p| p.tiles_per_layer()).sum::<usize>() * prepared.len();
        let mut records = Vec::with_capacity(total);

        for plan in &plans {
            let grid = TileGrid::new(plan.width, plan.height, self.config.tile_px)?;
            for (z, base) in prepared.layers.iter().enumerate() {
                let raster: Cow<'_, RgbaImage> = if plan.lod == 1 {
                    Cow::Borrowed(base)
                } else {
                    Cow::Owned(self.resampler.resample(base, plan.width, plan.height))
                };
                let tiles = self.encode_tiles(&raster, &grid)?;
                debug!(
                    lod = plan.lod,
                    z,
                    width = plan.width,
                    height = plan.height,
                    tiles = tiles.len(),
                    "encoded layer"
                );
                for (bounds, tile) in grid.iter().zip(tiles) {
                    records.push(TileRecord {
                        key: TileKey {
                            lod: plan.lod,
                            z: z as u32,
                            tile_x: bounds.tile_x,
                            tile_y: bounds.tile_y,
                        },
                        pixel_width: tile.width,
                        pixel_height: tile.height,
                        payload: tile.bytes,
                    });
                }
            }
        }
        Ok(records)
    }

    /// Encodes the tiles of one LOD raster, returned in `grid` order.
    fn encode_tiles(&self, raster: &RgbaImage, grid: &TileGrid) -> Result<Vec<EncodedTile>> {
        let encoder = &self.encoder;
        let encode_one = |b: TileBounds| -> Result<EncodedTile> {
            let crop = imageops::crop_imm(raster, b.x0, b.y0, b.width(), b.height()).to_image();
            let tile = encoder.encode(&crop)?;
            trace!(
                tile_x = b.tile_x,
                tile_y = b.tile_y,
                w = tile.width,
                h = tile.height,
                bytes = tile.bytes.len(),
                "tile"
            );
            Ok(tile)
        };

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                let bounds: Vec<TileBounds> = grid.iter().collect();
                // indexed collect keeps row-major order
                let results: Vec<Result<EncodedTile>> =
                    bounds.into_par_iter().map(encode_one).collect();
                return results.into_iter().collect();
            }
        }

        grid.iter().map(encode_one).collect()
    }

    /// Totals for `container` as written, `on_disk` carrying the offsets the
    /// sink actually received.
    pub fn summarize(
        &self,
        container: &AtlasContainer,
        on_disk: &AtlasHeader,
    ) -> Result<PackSummary> {
        let header = &container.header;
        let plans = self.plan(header.width, header.height)?;
        let num_layers = self.format.num_layers;
        let mut per_lod = Vec::with_capacity(plans.len());
        let mut rest = container.entries.as_slice();
        for plan in plans {
            let tiles = plan.tiles_per_layer() * num_layers;
            let (chunk, tail) = rest.split_at(tiles.min(rest.len()));
            rest = tail;
            per_lod.push(LodSummary {
                plan,
                tiles,
                payload_bytes: chunk.iter().map(|e| e.byte_length as u64).sum(),
            });
        }
        let data_len = container.entries.last().map_or(0, |e| e.end());
        Ok(PackSummary {
            width: header.width,
            height: header.height,
            num_layers,
            tile_px: header.tile_px,
            lods: header.lods.clone(),
            entries: container.entries.len(),
            index_offset: on_disk.index_offset,
            data_offset: on_disk.data_offset,
            file_size: on_disk.data_offset + data_len,
            per_lod,
        })
    }
}

/// Raster size and tile grid per LOD, in the order of `cfg.lods`.
///
/// Fails like [`AtlasConfig::validate`] on a bad tile size or LOD list.
pub fn plan_lods(width: u32, height: u32, cfg: &AtlasConfig) -> Result<Vec<LodPlan>> {
    cfg.validate()?;
    cfg.lods
        .iter()
        .map(|&lod| {
            let (w, h) = lod_dimensions(width, height, lod);
            let grid = TileGrid::new(w, h, cfg.tile_px)?;
            Ok(LodPlan {
                lod,
                width: w,
                height: h,
                tiles_x: grid.tiles_x(),
                tiles_y: grid.tiles_y(),
            })
        })
        .collect()
}

/// Decodes one layer from disk. Decoder size limits are disabled so very
/// large source maps load.
pub fn load_layer(path: &Path) -> Result<LayerImage> {
    if !path.is_file() {
        return Err(AtlasError::MissingInput(path.to_path_buf()));
    }
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.no_limits();
    let image = reader.decode()?;
    Ok(LayerImage {
        key: path.to_string_lossy().replace('\\', "/"),
        image,
    })
}

/// Reads a layer's pixel size from its file header without decoding pixels.
pub fn layer_dimensions(path: &Path) -> Result<(u32, u32)> {
    if !path.is_file() {
        return Err(AtlasError::MissingInput(path.to_path_buf()));
    }
    Ok(ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?)
}

/// Checks that every path exists, then decodes them in order.
pub fn load_layers<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LayerImage>> {
    if let Some(missing) = paths.iter().map(AsRef::as_ref).find(|p| !p.is_file()) {
        return Err(AtlasError::MissingInput(missing.to_path_buf()));
    }
    paths.iter().map(|p| load_layer(p.as_ref())).collect()
}

#[instrument(skip_all, fields(out = %out_path.display()))]
/// Loads `paths`, validates them, and writes the container to `out_path`.
///
/// The output file is only created once every check has passed; an existing
/// file is truncated and rewritten from scratch.
pub fn pack_layer_files<P: AsRef<Path>>(
    paths: &[P],
    out_path: &Path,
    cfg: AtlasConfig,
) -> Result<PackSummary> {
    let writer = AtlasWriter::new(cfg);
    writer.config().validate()?;
    if paths.len() != writer.format().num_layers {
        return Err(AtlasError::LayerCountMismatch {
            expected: writer.format().num_layers,
            actual: paths.len(),
        });
    }
    let prepared = writer.prepare(load_layers(paths)?)?;
    let mut sink = BufWriter::new(File::create(out_path)?);
    let summary = writer.write(prepared, &mut sink)?;
    sink.flush()?;
    info!(out = %out_path.display(), "wrote atlas");
    Ok(summary)
}

/// Conventional input file names: `<dir>/world_plane{z}.png`.
pub fn conventional_layer_paths(dir: &Path, num_layers: usize) -> Vec<PathBuf> {
    (0..num_layers)
        .map(|z| dir.join(format!("world_plane{z}.png")))
        .collect()
}

/// Conventional output artifact name.
pub const DEFAULT_OUTPUT_NAME: &str = "atlas_bg.atlas";
