use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use sprite_atlas_core::prelude::*;
use sprite_atlas_core::runtime::SliceGeometry;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Settings file looked up inside the input directory when `--config` is absent.
const SETTINGS_FILE: &str = "atlas.json";

#[derive(Parser, Debug)]
#[command(
    name = "sprite-atlas",
    about = "Pack a folder of sprites into a single sheet and sprite directory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a directory of images into an .atlas package
    Pack(PackArgs),
    /// Compute placements only and print them as JSON
    Layout(LayoutArgs),
    /// Load a package on a headless device and list its sprites
    Inspect(InspectArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Input directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output package path
    #[arg(short, long, default_value = "out.atlas", help_heading = "Input/Output")]
    out: PathBuf,
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    layout: LayoutOptions,

    /// Sampling mode stored in the package: nearest | linear | trilinear
    #[arg(long, value_parser = parse_filter, help_heading = "Sheet")]
    filter: Option<FilterMode>,
    /// Keep source colours as they are (sources already premultiplied)
    #[arg(long, default_value_t = false, help_heading = "Sheet")]
    no_premultiply: bool,

    /// Export pack stats as JSON to a file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Dry run: build the sheet and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    /// Input directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    layout: LayoutOptions,
}

#[derive(Parser, Debug, Clone)]
struct InspectArgs {
    /// Package to load
    file: PathBuf,
    /// Print the listing as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Settings file (YAML or JSON); defaults to <input>/atlas.json when present
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct LayoutOptions {
    /// Transparent pixels between sprites
    #[arg(long, help_heading = "Layout")]
    padding: Option<u32>,
    /// Transparent pixels around the sheet
    #[arg(long, help_heading = "Layout")]
    margin: Option<u32>,
    /// Round the sheet up to a square power of two
    #[arg(long, action=ArgAction::Set, help_heading = "Layout")]
    pow2: Option<bool>,
    /// Downscale sources wider than this (0 = unbounded)
    #[arg(long, help_heading = "Layout")]
    max_sprite_width: Option<u32>,
    /// Downscale sources taller than this (0 = unbounded)
    #[arg(long, help_heading = "Layout")]
    max_sprite_height: Option<u32>,
    /// Largest sheet edge the packer may grow to
    #[arg(long, help_heading = "Layout")]
    max_canvas: Option<u32>,
}

impl LayoutOptions {
    fn apply(&self, cfg: &mut AtlasConfig) {
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.margin {
            cfg.margin = v;
        }
        if let Some(v) = self.pow2 {
            cfg.power_of_two = v;
        }
        if let Some(v) = self.max_sprite_width {
            cfg.max_sprite_width = v;
        }
        if let Some(v) = self.max_sprite_height {
            cfg.max_sprite_height = v;
        }
        if let Some(v) = self.max_canvas {
            cfg.max_canvas = v;
        }
    }
}

fn parse_filter(s: &str) -> Result<FilterMode, String> {
    s.parse()
        .map_err(|_| format!("unknown filter mode '{s}' (expected nearest|linear|trilinear)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pack(args) => run_pack(args, progress),
        Commands::Layout(args) => run_layout(args, progress),
        Commands::Inspect(args) => run_inspect(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = load_settings(&cli.input, cli.source.config.as_deref())?;
    cli.layout.apply(&mut cfg);
    if let Some(mode) = cli.filter {
        cfg.filter_mode = mode;
    }
    if cli.no_premultiply {
        cfg.premultiply_alpha = false;
    }
    cfg.validate()?;
    debug!(?cfg, "resolved settings");

    let paths = gather_paths(&cli.input, &cli.source.include, &cli.source.exclude)?;
    if paths.is_empty() {
        anyhow::bail!("no images found under {}", cli.input.display());
    }
    let inputs = load_images_with_progress(&paths, &cfg, show_progress)?;
    info!(count = inputs.len(), "loaded input images");

    let build = build_atlas(inputs, &cfg)
        .with_context(|| format!("pack {}", cli.input.display()))?;
    let stats = build.stats();

    if let Some(stats_path) = &cli.export_stats {
        if !cli.dry_run {
            fs::write(stats_path, stats_json(&stats)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        }
    }

    if cli.dry_run {
        println!(
            "sprites={} sliced={} sheet={}x{} used_area={} occupancy={:.2}%",
            stats.num_sprites,
            stats.num_sliced,
            stats.sheet_width,
            stats.sheet_height,
            stats.used_area,
            stats.occupancy * 100.0
        );
        return Ok(());
    }

    if let Some(dir) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    build
        .save(&cli.out)
        .with_context(|| format!("write {}", cli.out.display()))?;
    info!(
        out = ?cli.out,
        sprites = stats.num_sprites,
        width = stats.sheet_width,
        height = stats.sheet_height,
        "atlas written"
    );
    Ok(())
}

fn stats_json(stats: &PackStats) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(stats)?)
}

fn run_layout(cli: &LayoutArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = load_settings(&cli.input, cli.source.config.as_deref())?;
    cli.layout.apply(&mut cfg);

    let paths = gather_paths(&cli.input, &cli.source.include, &cli.source.exclude)?;
    if paths.is_empty() {
        anyhow::bail!("no images found under {}", cli.input.display());
    }
    let inputs = load_images_with_progress(&paths, &cfg, show_progress)?;
    let sizes: Vec<(String, u32, u32)> = inputs
        .into_iter()
        .map(|i| {
            let (w, h) = i.image.dimensions();
            (i.key, w, h)
        })
        .collect();
    let placement = pack_layout(sizes, &cfg)
        .with_context(|| format!("layout {}", cli.input.display()))?;
    println!("{}", serde_json::to_string_pretty(&placement)?);
    Ok(())
}

fn run_inspect(cli: &InspectArgs) -> anyhow::Result<()> {
    let (ctx, device) = GraphicsContext::headless();
    let atlas = Atlas::from_path(&ctx, &cli.file)
        .with_context(|| format!("load {}", cli.file.display()))?;
    let sheet = atlas.sheet_size();

    let mut rows = Vec::with_capacity(atlas.len());
    for name in atlas.sprite_names() {
        let Some(sprite) = atlas.sprite(name) else {
            continue;
        };
        let rect = sprite.source_uv().to_pixels(sheet);
        let (border, quads) = match sprite {
            Sprite::Sliced(s) => {
                let geometry = SliceGeometry::generate(s.source(), s.size());
                (Some(s.border()), geometry.quad_count())
            }
            Sprite::Simple(_) => (None, 1),
        };
        rows.push(serde_json::json!({
            "name": name,
            "kind": sprite.kind(),
            "rect": rect,
            "border": border,
            "quads": quads,
        }));
    }

    if cli.json {
        let value = serde_json::json!({
            "origin": atlas.origin(),
            "width": sheet.x as u32,
            "height": sheet.y as u32,
            "filter_mode": atlas.filter_mode(),
            "sprites": rows,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{} {}x{} {:?} sprites={} buffers={}",
            atlas.origin(),
            sheet.x,
            sheet.y,
            atlas.filter_mode(),
            atlas.len(),
            device.live_buffers()
        );
        for row in &rows {
            println!("  {row}");
        }
    }
    atlas.dispose()?;
    Ok(())
}

/// Resolves the settings file: an explicit `--config` must load, the
/// directory default is optional.
fn load_settings(input: &Path, explicit: Option<&Path>) -> anyhow::Result<AtlasConfig> {
    let mut cfg = AtlasConfig::default();
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let candidate = input.join(SETTINGS_FILE);
            candidate.is_file().then_some(candidate)
        }
    };
    if let Some(path) = path {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read settings {}", path.display()))?;
        let file: SettingsFile = serde_yaml::from_str(&text)
            .with_context(|| format!("parse settings {}", path.display()))?;
        info!(settings = ?path, "using settings file");
        file.apply(&mut cfg)?;
    }
    Ok(cfg)
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    padding: Option<u32>,
    margin: Option<u32>,
    no_pre_multiply: Option<bool>,
    no_power_of_two: Option<bool>,
    max_sprite_width: Option<u32>,
    max_sprite_height: Option<u32>,
    max_canvas: Option<u32>,
    filter_mode: Option<FilterSetting>,
}

/// `filterMode` is written either as its stored integer or by name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilterSetting {
    Code(i32),
    Name(String),
}

impl SettingsFile {
    fn apply(self, cfg: &mut AtlasConfig) -> anyhow::Result<()> {
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.margin {
            cfg.margin = v;
        }
        if let Some(v) = self.no_pre_multiply {
            cfg.premultiply_alpha = !v;
        }
        if let Some(v) = self.no_power_of_two {
            cfg.power_of_two = !v;
        }
        if let Some(v) = self.max_sprite_width {
            cfg.max_sprite_width = v;
        }
        if let Some(v) = self.max_sprite_height {
            cfg.max_sprite_height = v;
        }
        if let Some(v) = self.max_canvas {
            cfg.max_canvas = v;
        }
        match self.filter_mode {
            Some(FilterSetting::Code(c)) => {
                cfg.filter_mode = FilterMode::from_i32(c)
                    .with_context(|| format!("unknown filterMode {c}"))?;
            }
            Some(FilterSetting::Name(n)) => {
                cfg.filter_mode = parse_filter(&n).map_err(anyhow::Error::msg)?;
            }
            None => {}
        }
        Ok(())
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globs(include)?;
    let exc_set = build_globs(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("scan {}", path.display()))?;
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn build_globs(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

fn load_images_with_progress(
    paths: &[PathBuf],
    cfg: &AtlasConfig,
    progress: bool,
) -> anyhow::Result<Vec<InputImage>> {
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
        let input = InputImage::load(p, cfg).with_context(|| format!("load {}", p.display()))?;
        list.push(input);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_keys_map_onto_config() {
        let file: SettingsFile = serde_yaml::from_str(
            r#"{"padding": 2, "noPreMultiply": true, "noPowerOfTwo": true,
                "maxSpriteWidth": 128, "filterMode": 2}"#,
        )
        .unwrap();
        let mut cfg = AtlasConfig::default();
        file.apply(&mut cfg).unwrap();
        assert_eq!(cfg.padding, 2);
        assert!(!cfg.premultiply_alpha);
        assert!(!cfg.power_of_two);
        assert_eq!(cfg.max_sprite_size(), (128, u32::MAX));
        assert_eq!(cfg.filter_mode, FilterMode::Trilinear);
    }

    #[test]
    fn yaml_settings_accept_filter_names() {
        let file: SettingsFile = serde_yaml::from_str("margin: 3\nfilterMode: linear\n").unwrap();
        let mut cfg = AtlasConfig::default();
        file.apply(&mut cfg).unwrap();
        assert_eq!(cfg.margin, 3);
        assert_eq!(cfg.filter_mode, FilterMode::Linear);

        let bad: SettingsFile = serde_yaml::from_str("filterMode: 9").unwrap();
        assert!(bad.apply(&mut AtlasConfig::default()).is_err());
    }

    #[test]
    fn explicit_flags_win_over_the_settings_file() {
        let file: SettingsFile =
            serde_yaml::from_str(r#"{"padding": 2, "margin": 5, "noPowerOfTwo": true}"#).unwrap();
        let mut cfg = AtlasConfig::default();
        file.apply(&mut cfg).unwrap();
        let flags = LayoutOptions {
            padding: Some(0),
            pow2: Some(true),
            ..Default::default()
        };
        flags.apply(&mut cfg);
        assert_eq!(cfg.padding, 0);
        assert_eq!(cfg.margin, 5);
        assert!(cfg.power_of_two);
    }

    #[test]
    fn directory_settings_are_optional() {
        let dir = std::env::temp_dir().join(format!("sprite-atlas-cli-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(load_settings(&dir, None).unwrap(), AtlasConfig::default());

        fs::write(dir.join(SETTINGS_FILE), r#"{"padding": 4}"#).unwrap();
        assert_eq!(load_settings(&dir, None).unwrap().padding, 4);
        assert!(load_settings(&dir, Some(&dir.join("missing.yaml"))).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn exported_stats_mirror_pack_stats() {
        let stats = PackStats {
            num_sprites: 5,
            num_sliced: 1,
            sheet_width: 128,
            sheet_height: 128,
            sheet_area: 128 * 128,
            used_area: 6464,
            occupancy: 6464.0 / 16384.0,
        };
        let text = stats_json(&stats).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["num_sprites"], 5);
        assert_eq!(value["num_sliced"], 1);
        assert_eq!(value["sheet_area"], 16384);
        assert_eq!(value["used_area"], 6464);
        assert_eq!(value["occupancy"], stats.occupancy);
    }

    #[test]
    fn globs_filter_candidates() {
        let exclude = build_globs(&["**/ignored/**".into()]).unwrap();
        let include = build_globs(&["**/*.png".into()]).unwrap();
        assert!(should_skip(
            Path::new("in/ignored/a.png"),
            include.as_ref(),
            exclude.as_ref()
        ));
        assert!(should_skip(Path::new("in/a.jpg"), include.as_ref(), exclude.as_ref()));
        assert!(!should_skip(Path::new("in/a.png"), include.as_ref(), exclude.as_ref()));
        assert!(is_image(Path::new("A.PNG")));
        assert!(!is_image(Path::new("atlas.json")));
    }
}
