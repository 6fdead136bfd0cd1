use crate::codec::encode_directory;
use crate::compositing::{ComposePolicy, Sheet, compose_sheet};
use crate::config::AtlasConfig;
use crate::container::write_package;
use crate::error::{AtlasError, Result};
use crate::model::{Module, PackStats, Placement, SpriteDefinition, SpriteDirectory, parse_color};
use crate::packer::pack_modules;
use crate::sidecar::{Sidecar, load_sidecar};
use glam::Vec2;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// A decoded source image ready to be packed (key + pixels + sidecar).
#[derive(Debug, Clone)]
pub struct InputImage {
    pub key: String,
    pub image: RgbaImage,
    pub sidecar: Sidecar,
}

impl InputImage {
    pub fn new(key: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            key: key.into(),
            image,
            sidecar: Sidecar::default(),
        }
    }

    pub fn with_sidecar(mut self, sidecar: Sidecar) -> Self {
        self.sidecar = sidecar;
        self
    }

    /// Decodes `path`, downscales it to the configured maximum sprite size and
    /// reads its sidecar. The key is the file stem.
    pub fn load(path: &Path, cfg: &AtlasConfig) -> Result<Self> {
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                AtlasError::InvalidInput(format!("no usable file name: {}", path.display()))
            })?
            .to_string();
        let image = image::open(path)
            .map_err(|source| AtlasError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (max_w, max_h) = cfg.max_sprite_size();
        let image = downscale(image, max_w, max_h);
        let sidecar = load_sidecar(path)?;
        Ok(Self {
            key,
            image,
            sidecar,
        })
    }
}

/// Shrinks `image` to fit within `max_w × max_h`, keeping its aspect ratio.
/// Images that already fit are returned untouched.
pub fn downscale(image: RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w <= max_w && h <= max_h {
        return image;
    }
    let scale = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let nw = ((w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let nh = ((h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    debug!(from_w = w, from_h = h, to_w = nw, to_h = nh, "downscaling sprite");
    imageops::resize(&image, nw, nh, FilterType::Triangle)
}

/// Everything produced by one build: the sheet, its sprite directory and the
/// placement they were derived from.
#[derive(Debug, Clone)]
pub struct AtlasBuild {
    pub sheet: Sheet,
    pub directory: SpriteDirectory,
    pub placement: Placement,
}

impl AtlasBuild {
    pub fn stats(&self) -> PackStats {
        PackStats::new(self.sheet.width(), self.sheet.height(), &self.directory)
    }

    /// Serializes the package (`atlas.bin` + `sheet.png`) into `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut dir = Vec::new();
        encode_directory(&self.directory, &mut dir)?;
        let png = self.sheet.encode_png()?;
        write_package(writer, &dir, &png)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.write_to(Vec::new())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        self.write_to(file)?;
        Ok(())
    }
}

/// Bound on the padded placement so the final sheet stays within `max_canvas`.
fn placement_limit(cfg: &AtlasConfig) -> u32 {
    cfg.max_canvas
        .saturating_sub(cfg.margin.saturating_mul(2))
        .saturating_add(cfg.padding)
}

fn check_sidecar(input: &InputImage) -> Result<()> {
    let size = Vec2::new(input.image.width() as f32, input.image.height() as f32);
    let sc = &input.sidecar;
    if !sc.border.is_zero() && !sc.border.fits(size) {
        return Err(AtlasError::InvalidInput(format!(
            "sprite '{}': border {:?} does not fit {}x{}",
            input.key,
            sc.border.to_array(),
            size.x,
            size.y
        )));
    }
    if parse_color(&sc.color).is_none() {
        return Err(AtlasError::InvalidInput(format!(
            "sprite '{}': invalid color '{}'",
            input.key, sc.color
        )));
    }
    Ok(())
}

/// Packs `inputs` into one sheet and its sprite directory.
///
/// Notes:
/// - Modules are ordered by padded area, largest first (stable for ties).
/// - Sprite positions include the sheet margin; sizes exclude padding.
/// - Duplicate keys are rejected since the directory is keyed by name.
#[instrument(skip_all)]
pub fn build_atlas(inputs: Vec<InputImage>, cfg: &AtlasConfig) -> Result<AtlasBuild> {
    cfg.validate()?;
    if inputs.is_empty() {
        return Err(AtlasError::Empty);
    }
    let start = Instant::now();

    let mut seen = HashSet::new();
    for input in &inputs {
        if !seen.insert(input.key.as_str()) {
            return Err(AtlasError::InvalidInput(format!(
                "duplicate sprite name '{}'",
                input.key
            )));
        }
        let (w, h) = input.image.dimensions();
        if w == 0 || h == 0 {
            return Err(AtlasError::InvalidInput(format!(
                "sprite '{}' is empty",
                input.key
            )));
        }
        check_sidecar(input)?;
    }

    let modules: Vec<Module> = inputs
        .iter()
        .enumerate()
        .map(|(i, inp)| {
            let (w, h) = inp.image.dimensions();
            Module::new(i, inp.key.clone(), w, h, cfg.padding)
        })
        .collect();
    let placement = pack_modules(modules, placement_limit(cfg))?;

    let images: Vec<&RgbaImage> = inputs.iter().map(|i| &i.image).collect();
    let policy = ComposePolicy {
        margin: cfg.margin,
        power_of_two: cfg.power_of_two,
        premultiply: cfg.premultiply_alpha,
    };
    let sheet = compose_sheet(&placement, &images, cfg.padding, &policy)?;

    let m = cfg.margin as f32;
    let sprites = placement
        .modules
        .iter()
        .map(|module| {
            let sc = &inputs[module.id].sidecar;
            let def = SpriteDefinition {
                position: Vec2::new(module.x as f32 + m, module.y as f32 + m),
                size: Vec2::new(module.width as f32, module.height as f32),
                origin: sc.origin,
                border: sc.border,
                tile_x: sc.tile_x,
                tile_y: sc.tile_y,
                hollow: sc.hollow,
                color: sc.color.clone(),
            };
            (module.key.clone(), def)
        })
        .collect();
    let directory = SpriteDirectory {
        filter_mode: cfg.filter_mode,
        sprites,
    };

    let build = AtlasBuild {
        sheet,
        directory,
        placement,
    };
    let stats = build.stats();
    info!(
        sprites = stats.num_sprites,
        sliced = stats.num_sliced,
        width = stats.sheet_width,
        height = stats.sheet_height,
        occupancy = stats.occupancy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "atlas built"
    );
    Ok(build)
}

/// Packs sizes without compositing pixel data.
/// Inputs are (key, width, height); the placement lists modules in packing order.
pub fn pack_layout<K: Into<String>>(
    inputs: Vec<(K, u32, u32)>,
    cfg: &AtlasConfig,
) -> Result<Placement> {
    cfg.validate()?;
    if inputs.is_empty() {
        return Err(AtlasError::Empty);
    }
    let modules = inputs
        .into_iter()
        .enumerate()
        .map(|(i, (k, w, h))| {
            let key: String = k.into();
            if w == 0 || h == 0 {
                return Err(AtlasError::InvalidInput(format!("sprite '{key}' is empty")));
            }
            Ok(Module::new(i, key, w, h, cfg.padding))
        })
        .collect::<Result<Vec<_>>>()?;
    pack_modules(modules, placement_limit(cfg))
}
