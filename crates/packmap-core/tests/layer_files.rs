mod common;

use packmap_core::prelude::*;
use packmap_core::{DEFAULT_OUTPUT_NAME, conventional_layer_paths, layer_dimensions, load_layers};

fn write_layers(dir: &std::path::Path, count: usize, w: u32, h: u32) -> Vec<std::path::PathBuf> {
    let paths = conventional_layer_paths(dir, 4);
    for (z, p) in paths.iter().take(count).enumerate() {
        common::gradient(w, h, z as u8).save(p).expect("save layer");
    }
    paths
}

#[test]
fn pack_files_round_trip() {
    let dir = common::scratch_dir("round_trip");
    let paths = write_layers(&dir, 4, 300, 300);
    assert!(paths[3].ends_with("world_plane3.png"));
    let out = dir.join(DEFAULT_OUTPUT_NAME);

    let cfg = AtlasConfig::builder().tile_px(256).lods([1, 2]).build();
    let summary = pack_layer_files(&paths, &out, cfg).expect("pack");

    let bytes = std::fs::read(&out).expect("read atlas");
    assert_eq!(bytes.len() as u64, summary.file_size);
    let parsed = common::parse(&bytes);
    assert_eq!(parsed.entries.len(), 20);
    assert_eq!(parsed.data_offset, summary.data_offset);

    assert_eq!(layer_dimensions(&paths[0]).unwrap(), (300, 300));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rerun_overwrites_from_scratch() {
    let dir = common::scratch_dir("rerun");
    let paths = write_layers(&dir, 4, 64, 64);
    let out = dir.join(DEFAULT_OUTPUT_NAME);
    std::fs::write(&out, vec![0xAB; 1 << 16]).unwrap();

    let cfg = AtlasConfig::builder().tile_px(32).lods([1]).build();
    let summary = pack_layer_files(&paths, &out, cfg).expect("pack");
    assert_eq!(std::fs::metadata(&out).unwrap().len(), summary.file_size);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_is_reported_before_output() {
    let dir = common::scratch_dir("missing");
    let paths = write_layers(&dir, 3, 16, 16);
    let out = dir.join(DEFAULT_OUTPUT_NAME);

    let err = pack_layer_files(&paths, &out, AtlasConfig::default()).unwrap_err();
    match err {
        AtlasError::MissingInput(p) => assert!(p.ends_with("world_plane3.png")),
        other => panic!("Expected MissingInput, got {other:?}"),
    }
    assert!(!out.exists());
    assert!(matches!(
        load_layers(&paths),
        Err(AtlasError::MissingInput(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn wrong_path_count_creates_no_file() {
    let dir = common::scratch_dir("count");
    let paths = write_layers(&dir, 4, 16, 16);
    let out = dir.join(DEFAULT_OUTPUT_NAME);

    let err = pack_layer_files(&paths[..3], &out, AtlasConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        AtlasError::LayerCountMismatch {
            expected: 4,
            actual: 3
        }
    ));
    assert!(!out.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn size_mismatch_creates_no_file() {
    let dir = common::scratch_dir("size");
    let paths = write_layers(&dir, 4, 16, 16);
    common::gradient(20, 16, 1).save(&paths[1]).unwrap();
    let out = dir.join(DEFAULT_OUTPUT_NAME);

    let err = pack_layer_files(&paths, &out, AtlasConfig::default()).unwrap_err();
    match err {
        AtlasError::LayerSizeMismatch {
            expected,
            actual,
            path,
        } => {
            assert_eq!(expected, (16, 16));
            assert_eq!(actual, (20, 16));
            assert!(path.ends_with("world_plane1.png"));
        }
        other => panic!("Expected LayerSizeMismatch, got {other:?}"),
    }
    assert!(!out.exists());
    let _ = std::fs::remove_dir_all(&dir);
}
