use super::context::{GpuTexture, GraphicsContext};
use super::device::{SamplerState, ShaderKind, TextureDesc};
use super::slice::{SliceSource, SlicedSprite};
use super::sprite::{
    SharedGeometry, SimpleSprite, Sprite, SpriteMaterial, SpriteVariant, UvRect, push_quad,
};
use crate::codec::decode_directory;
use crate::config::FilterMode;
use crate::container::read_package;
use crate::error::{AtlasError, FormatError, Result};
use crate::model::SpriteDirectory;
use glam::{Vec2, Vec4};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A loaded atlas: one sheet texture and the sprites cut from it.
///
/// Simple sprites share one vertex/index buffer pair and differ only in the
/// index range they draw. Sliced sprites carry their own buffers.
#[derive(Debug)]
pub struct Atlas {
    origin: String,
    filter_mode: FilterMode,
    material: Arc<SpriteMaterial>,
    shared: Option<Arc<SharedGeometry>>,
    sprites: HashMap<String, Sprite>,
    /// Sprite names in directory order.
    order: Vec<String>,
}

impl Atlas {
    /// Loads a package file. The path becomes the atlas origin.
    pub fn from_path(ctx: &GraphicsContext, path: &Path) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Self::from_reader(ctx, file, path.display().to_string())
    }

    pub fn from_reader<R: Read>(
        ctx: &GraphicsContext,
        reader: R,
        origin: impl Into<String>,
    ) -> Result<Self> {
        let origin = origin.into();
        ctx.ensure_current()?;
        let entries = read_package(reader, origin.clone())?;
        Self::from_parts(ctx, &entries.directory, &entries.sheet, origin)
    }

    pub fn from_bytes(
        ctx: &GraphicsContext,
        bytes: &[u8],
        origin: impl Into<String>,
    ) -> Result<Self> {
        Self::from_reader(ctx, bytes, origin)
    }

    #[instrument(skip_all, fields(origin = %origin))]
    fn from_parts(
        ctx: &GraphicsContext,
        directory: &[u8],
        sheet_png: &[u8],
        origin: String,
    ) -> Result<Self> {
        let directory = decode_directory(directory).map_err(|e| e.in_atlas(origin.clone()))?;
        let sheet = image::load_from_memory(sheet_png)
            .map_err(|e| FormatError::InvalidSheet(e.to_string()).in_atlas(origin.clone()))?
            .to_rgba8();
        validate(&directory, &origin)?;

        let desc = TextureDesc {
            width: sheet.width(),
            height: sheet.height(),
            sampler: SamplerState::from(directory.filter_mode),
        };
        let texture = GpuTexture::new(ctx, &desc, sheet.as_raw())?;
        let shader = ctx.shader(ShaderKind::PositionColorUv)?;
        let material = Arc::new(SpriteMaterial {
            ctx: ctx.clone(),
            texture,
            shader,
        });
        let sheet_size = material.sheet_size();

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut simple = Vec::new();
        let mut sliced = Vec::new();
        for (name, def) in &directory.sprites {
            // colours were checked by `validate`
            let tint = def.tint().unwrap_or(Vec4::ONE);
            if def.is_sliced() {
                let src = SliceSource::new(def, sheet_size, tint);
                sliced.push((name.clone(), src, def.size));
                continue;
            }
            let uv = UvRect::from_pixels(def.position, def.size, sheet_size);
            let base = vertices.len() as u32;
            let index_offset = indices.len() as u32;
            vertices.extend_from_slice(&SimpleSprite::quad(def.size, def.origin, uv, tint));
            push_quad(&mut indices, base, base + 1, base + 2, base + 3);
            simple.push((name.clone(), index_offset, def.size, def.origin, uv));
        }

        let shared = if simple.is_empty() {
            None
        } else {
            Some(Arc::new(SharedGeometry::upload(ctx, &vertices, &indices)?))
        };

        let mut sprites = HashMap::with_capacity(directory.len());
        if let Some(geometry) = &shared {
            for (name, index_offset, size, origin, uv) in simple {
                let sprite = SimpleSprite {
                    name: name.clone(),
                    material: Arc::clone(&material),
                    geometry: Arc::clone(geometry),
                    index_offset,
                    index_count: 6,
                    size,
                    origin,
                    uv,
                };
                sprites.insert(name, Sprite::Simple(sprite));
            }
        }
        for (name, src, size) in sliced {
            let sprite = SlicedSprite::new(name.clone(), Arc::clone(&material), src, size)?;
            sprites.insert(name, Sprite::Sliced(sprite));
        }

        info!(
            sprites = sprites.len(),
            width = desc.width,
            height = desc.height,
            filter = ?directory.filter_mode,
            "atlas loaded"
        );
        Ok(Self {
            origin,
            filter_mode: directory.filter_mode,
            material,
            shared,
            sprites,
            order: directory.sprites.into_iter().map(|(n, _)| n).collect(),
        })
    }

    /// Where the atlas was loaded from; used in error messages.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn material(&self) -> &Arc<SpriteMaterial> {
        &self.material
    }

    /// Sheet size in pixels.
    pub fn sheet_size(&self) -> Vec2 {
        self.material.sheet_size()
    }

    /// Buffers shared by the simple sprites, if there are any.
    pub fn shared_geometry(&self) -> Option<&Arc<SharedGeometry>> {
        self.shared.as_ref()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    /// Sprite names in the order they were packed.
    pub fn sprite_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Borrows the stored sprite without cloning.
    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.get(name)
    }

    /// Returns a handle to `name`. Sliced sprites are cloned with their own
    /// buffers so each caller can resize independently.
    pub fn get_sprite(&self, name: &str) -> Result<Sprite> {
        let sprite = self.sprites.get(name).ok_or_else(|| AtlasError::NotFound {
            name: name.to_string(),
            atlas: self.origin.clone(),
        })?;
        sprite.try_clone()
    }

    /// Like [`get_sprite`](Self::get_sprite), but also requires the sprite to
    /// be a `T`.
    pub fn get_sprite_as<T: SpriteVariant>(&self, name: &str) -> Result<T> {
        let stored = self.sprites.get(name).ok_or_else(|| AtlasError::NotFound {
            name: name.to_string(),
            atlas: self.origin.clone(),
        })?;
        // check the kind before cloning so a mismatch allocates nothing
        let actual = stored.kind();
        if T::KIND != Sprite::KIND && T::KIND != actual {
            return Err(AtlasError::WrongKind {
                name: name.to_string(),
                atlas: self.origin.clone(),
                expected: T::KIND,
                actual,
            });
        }
        T::from_sprite(stored.try_clone()?).map_err(|s| AtlasError::WrongKind {
            name: name.to_string(),
            atlas: self.origin.clone(),
            expected: T::KIND,
            actual: s.kind(),
        })
    }

    /// Releases every device resource now, on the owning thread.
    pub fn dispose(self) -> Result<()> {
        self.material.context().ensure_current()?;
        debug!(origin = %self.origin, "disposing atlas");
        drop(self);
        Ok(())
    }
}

/// Per-sprite checks that the codec cannot make on its own.
fn validate(dir: &SpriteDirectory, origin: &str) -> Result<()> {
    for (name, def) in &dir.sprites {
        let bad_size = !def.size.is_finite() || def.size.x < 0.0 || def.size.y < 0.0;
        if bad_size || (def.is_sliced() && !def.border.fits(def.size)) {
            return Err(FormatError::InvalidBorder {
                sprite: name.clone(),
                border: def.border.to_array(),
                size: def.size.to_array(),
            }
            .in_atlas(origin));
        }
        if def.tint().is_none() {
            return Err(FormatError::InvalidColor {
                sprite: name.clone(),
                value: def.color.clone(),
            }
            .in_atlas(origin));
        }
    }
    Ok(())
}
