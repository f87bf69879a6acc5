use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use packmap_core::{
    AtlasConfig, AtlasError, AtlasWriter, ContainerFormat, DEFAULT_OUTPUT_NAME, LayerImage,
    conventional_layer_paths, layer_dimensions, load_layer, parse_lods, plan_lods,
};
use serde::Deserialize;
use tracing::{error, info};

/// Exit status for a bad tile size or LOD list.
const EXIT_CONFIG: u8 = 2;
/// Exit status for a missing layer input (and any other failure).
const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "packmap",
    about = "Pack world_plane{0..3}.png layers into a tiled, lossless multi-LOD .atlas container",
    version,
    author
)]
struct Cli {
    // Layout
    /// Tile size in pixels
    #[arg(long, default_value_t = packmap_core::DEFAULT_TILE_PX, help_heading = "Layout")]
    tile: u32,
    /// LOD subsamples to include, in output order (ex. 4 or 2,4 or 1,2,4)
    #[arg(long, default_value = "1,2,4", help_heading = "Layout")]
    lods: String,
    /// Encode tiles in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    parallel: bool,

    // Input/Output
    /// Directory holding world_plane{0..3}.png (defaults to the program's directory)
    #[arg(long, help_heading = "Input/Output")]
    dir: Option<PathBuf>,
    /// Output file name, relative to --dir
    #[arg(short, long, default_value = DEFAULT_OUTPUT_NAME, help_heading = "Input/Output")]
    output: PathBuf,
    /// YAML config file path (overrides tile/lods/parallel)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Export
    /// Export the pack summary (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Export the tile index as a JSON manifest to this file
    #[arg(long, help_heading = "Export")]
    export_index: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: report the per-LOD tile grid without encoding or writing
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,

    /// Show a progress bar while loading layers
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<AtlasError>() {
        Some(err) if err.is_configuration() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = resolve_config(cli).context("Invalid --lods/--tile")?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let dir = match &cli.dir {
        Some(d) => d.clone(),
        None => program_dir()?,
    };
    let format = ContainerFormat::STANDARD;
    let paths = conventional_layer_paths(&dir, format.num_layers);
    let out_path = dir.join(&cli.output);

    if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
        return Err(AtlasError::MissingInput(missing.clone()).into());
    }

    if cli.dry_run {
        let (width, height) = layer_dimensions(&paths[0])?;
        let plans = plan_lods(width, height, &cfg)?;
        let mut entries = 0usize;
        for plan in &plans {
            let tiles = plan.tiles_per_layer() * format.num_layers;
            entries += tiles;
            println!(
                "lod={} raster={}x{} grid={}x{} tiles={}",
                plan.lod, plan.width, plan.height, plan.tiles_x, plan.tiles_y, tiles
            );
        }
        println!(
            "source={}x{} layers={} tile={} entries={}",
            width, height, format.num_layers, cfg.tile_px, entries
        );
        return Ok(());
    }

    let layers = load_layers_with_progress(&paths, cli.progress && !cli.quiet)?;
    info!(count = layers.len(), "loaded layers");

    let writer = AtlasWriter::new(cfg);
    let prepared = writer.prepare(layers)?;
    let container = writer.build(prepared)?;

    let file =
        File::create(&out_path).with_context(|| format!("create {}", out_path.display()))?;
    let mut sink = BufWriter::new(file);
    let on_disk = container
        .write_patched(&mut sink)
        .with_context(|| format!("write {}", out_path.display()))?;
    sink.flush()
        .with_context(|| format!("write {}", out_path.display()))?;

    let summary = writer.summarize(&container, &on_disk)?;
    info!(?out_path, "Wrote atlas");
    info!("{}", summary.summary());

    if let Some(stats_path) = &cli.export_stats {
        fs::write(stats_path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    if let Some(index_path) = &cli.export_index {
        let value = packmap_core::to_json_index(&on_disk, &container.entries);
        fs::write(index_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", index_path.display()))?;
        info!(?index_path, "index exported");
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> packmap_core::Result<AtlasConfig> {
    let mut cfg = AtlasConfig {
        tile_px: cli.tile,
        lods: parse_lods(&cli.lods)?,
        parallel: cli.parallel,
    };
    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .map_err(|e| AtlasError::InvalidConfig(format!("read {}: {e}", path.display())))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .map_err(|e| AtlasError::InvalidConfig(format!("{}: {e}", path.display())))?;
        cfg = y.into_atlas_config(cfg)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Directory containing the running executable.
fn program_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("locate program")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn load_layers_with_progress(paths: &[PathBuf], progress: bool) -> anyhow::Result<Vec<LayerImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        let layer = load_layer(p).with_context(|| format!("load {}", p.display()))?;
        list.push(layer);
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

/// LODs in a YAML file may be written as `"1,2"` or as `[1, 2]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlLods {
    Text(String),
    List(Vec<u32>),
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    tile_px: Option<u32>,
    lods: Option<YamlLods>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> packmap_core::Result<AtlasConfig> {
        if let Some(v) = self.tile_px {
            cfg.tile_px = v;
        }
        if let Some(v) = self.lods {
            cfg.lods = match v {
                YamlLods::Text(s) => parse_lods(&s)?,
                YamlLods::List(l) => l,
            };
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}
