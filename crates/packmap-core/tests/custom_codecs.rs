mod common;

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbaImage;
use packmap_core::prelude::*;

/// Stores raw RGBA bytes, so payload sizes are predictable.
struct RawEncoder;

impl LosslessEncoder for RawEncoder {
    fn encode(&self, tile: &RgbaImage) -> packmap_core::Result<EncodedTile> {
        Ok(EncodedTile {
            bytes: tile.as_raw().clone(),
            width: tile.width(),
            height: tile.height(),
        })
    }
}

#[derive(Default)]
struct CountingResampler {
    calls: AtomicUsize,
}

impl Resampler for CountingResampler {
    fn resample(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        self.calls.fetch_add(1, Ordering::Relaxed);
        BoxResampler.resample(src, width, height)
    }
}

#[test]
fn raw_encoder_payloads_match_tile_area() {
    let cfg = AtlasConfig::builder().tile_px(64).lods([1, 2]).build();
    let writer = AtlasWriter::with_parts(ContainerFormat::STANDARD, cfg, BoxResampler, RawEncoder);
    let mut sink = Cursor::new(Vec::new());
    let summary = writer
        .pack(common::gradient_layers(100, 70), &mut sink)
        .expect("pack");

    let bytes = sink.into_inner();
    let parsed = common::parse(&bytes);
    assert_eq!(parsed.entries.len(), summary.entries);
    for e in &parsed.entries {
        assert_eq!(e.len, e.w * e.h * 4);
    }
    // Data section of a raw container is every layer at every LOD, uncompressed.
    let expected: u64 = 4 * (100 * 70 + 50 * 35) * 4;
    assert_eq!(summary.data_bytes(), expected);

    let first = &parsed.entries[0];
    let raw = common::payload(&bytes, &parsed, first);
    assert_eq!(&raw[..4], &[0, 0, 0, 255]);
}

#[test]
fn base_lod_is_not_resampled() {
    let cfg = AtlasConfig::builder().tile_px(32).lods([1, 2, 4]).build();
    let writer = AtlasWriter::with_parts(
        ContainerFormat::STANDARD,
        cfg,
        CountingResampler::default(),
        RawEncoder,
    );
    writer
        .pack(common::solid_layers(64, 64), &mut Cursor::new(Vec::new()))
        .expect("pack");
    assert_eq!(writer_calls(&writer), 8);
}

fn writer_calls(writer: &AtlasWriter<CountingResampler, RawEncoder>) -> usize {
    writer.resampler().calls.load(Ordering::Relaxed)
}

#[test]
fn custom_format_changes_magic_and_layer_count() {
    let format = ContainerFormat {
        magic: *b"TESTv1\0\0",
        version: 7,
        num_layers: 2,
    };
    let cfg = AtlasConfig::builder().tile_px(16).lods([1]).build();
    let writer = AtlasWriter::with_parts(format, cfg, BoxResampler, RawEncoder);
    let mut layers = common::solid_layers(16, 16);
    layers.truncate(2);
    let mut sink = Cursor::new(Vec::new());
    writer.pack(layers, &mut sink).expect("pack");

    let parsed = common::parse(sink.get_ref());
    assert_eq!(&parsed.magic, b"TESTv1\0\0");
    assert_eq!(parsed.version, 7);
    assert_eq!(parsed.num_layers, 2);
    assert_eq!(parsed.entries.len(), 2);
}
