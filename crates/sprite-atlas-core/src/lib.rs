//! Core library for building and loading sprite atlases.
//!
//! - Packing: a greedy anchor-graph packer (`packer`) places every sprite on one sheet
//! - Building: `build_atlas` composites the sheet and writes the binary sprite directory
//! - Loading: `runtime::Atlas` reads a package back and hands out drawable sprites,
//!   including resizable 9-slice sprites
//!
//! Quick example:
//! ```ignore
//! use sprite_atlas_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let cfg = AtlasConfig::builder().padding(2).build();
//! let inputs = vec![
//!     InputImage::load("button.png".as_ref(), &cfg)?,
//!     InputImage::load("panel.png".as_ref(), &cfg)?,
//! ];
//! let bytes = build_atlas(inputs, &cfg)?.to_bytes()?;
//!
//! let (ctx, _device) = GraphicsContext::headless();
//! let atlas = Atlas::from_bytes(&ctx, &bytes, "ui.atlas")?;
//! let mut panel = atlas.get_sprite_as::<SlicedSprite>("panel")?;
//! panel.resize(glam::Vec2::new(300.0, 120.0))?;
//! # Ok(()) }
//! ```

pub mod codec;
pub mod compositing;
pub mod config;
pub mod container;
pub mod error;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod runtime;
pub mod sidecar;

pub use config::*;
pub use error::*;
pub use model::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `sprite_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, FilterMode};
    pub use crate::error::{AtlasError, FormatError};
    pub use crate::model::{Border, PackStats, Placement, SpriteDefinition, SpriteDirectory};
    pub use crate::runtime::{
        Atlas, Drawable, GraphicsContext, HeadlessDevice, SimpleSprite, SlicedSprite, Sprite,
    };
    pub use crate::sidecar::Sidecar;
    pub use crate::{AtlasBuild, InputImage, build_atlas, pack_layout};
}
