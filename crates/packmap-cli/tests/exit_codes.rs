use std::path::PathBuf;
use std::process::Command;

fn packmap() -> Command {
    Command::new(env!("CARGO_BIN_EXE_packmap"))
}

fn empty_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("packmap_cli_{}_{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn bad_lods_exit_with_config_status() {
    let dir = empty_dir("bad_lods");
    let status = packmap()
        .args(["-q", "--lods", "1,3", "--dir"])
        .arg(&dir)
        .status()
        .expect("run packmap");
    assert_eq!(status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_tile_exits_with_config_status() {
    let dir = empty_dir("zero_tile");
    let status = packmap()
        .args(["-q", "--tile", "0", "--dir"])
        .arg(&dir)
        .status()
        .expect("run packmap");
    assert_eq!(status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn bad_yaml_lods_exit_with_config_status() {
    let dir = empty_dir("bad_yaml");
    let cfg = dir.join("packmap.yaml");
    std::fs::write(&cfg, "lods: \"2,5\"\n").expect("write yaml");
    let status = packmap()
        .args(["-q", "--config"])
        .arg(&cfg)
        .arg("--dir")
        .arg(&dir)
        .status()
        .expect("run packmap");
    assert_eq!(status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_layers_exit_with_failure_status() {
    let dir = empty_dir("missing");
    let status = packmap()
        .args(["-q", "--progress", "false", "--dir"])
        .arg(&dir)
        .status()
        .expect("run packmap");
    assert_eq!(status.code(), Some(1));
    assert!(!dir.join("atlas_bg.atlas").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
