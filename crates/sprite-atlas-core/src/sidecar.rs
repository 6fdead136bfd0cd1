//! Optional per-image `<image file>.meta` JSON sidecars.

use crate::error::{AtlasError, Result};
use crate::model::{Border, DEFAULT_COLOR};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
enum Vec2Repr {
    Array([f32; 2]),
    Object(Vec2Object),
}

/// `{"x":..,"y":..}`; the capitalised keys are how vector structs are
/// written by the authoring tools.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct Vec2Object {
    #[serde(default, alias = "X")]
    x: f32,
    #[serde(default, alias = "Y")]
    y: f32,
}

impl From<Vec2Repr> for Vec2 {
    fn from(v: Vec2Repr) -> Self {
        match v {
            Vec2Repr::Array([x, y]) => Vec2::new(x, y),
            Vec2Repr::Object(o) => Vec2::new(o.x, o.y),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
enum BorderRepr {
    Array([f32; 4]),
    Named(BorderObject),
    Components(Vec4Object),
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct BorderObject {
    #[serde(default, alias = "Left")]
    left: f32,
    #[serde(default, alias = "Top")]
    top: f32,
    #[serde(default, alias = "Right")]
    right: f32,
    #[serde(default, alias = "Bottom")]
    bottom: f32,
}

/// A border written as a four-component vector: x, y, z, w map to left,
/// top, right, bottom.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct Vec4Object {
    #[serde(default, alias = "X")]
    x: f32,
    #[serde(default, alias = "Y")]
    y: f32,
    #[serde(default, alias = "Z")]
    z: f32,
    #[serde(default, alias = "W")]
    w: f32,
}

impl From<BorderRepr> for Border {
    fn from(b: BorderRepr) -> Self {
        match b {
            BorderRepr::Array([l, t, r, b]) => Border::new(l, t, r, b),
            BorderRepr::Named(o) => Border::new(o.left, o.top, o.right, o.bottom),
            BorderRepr::Components(v) => Border::new(v.x, v.y, v.z, v.w),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSidecar {
    #[serde(alias = "Origin")]
    origin: Option<Vec2Repr>,
    #[serde(alias = "Border")]
    border: Option<BorderRepr>,
    #[serde(default, alias = "TileX")]
    tile_x: bool,
    #[serde(default, alias = "TileY")]
    tile_y: bool,
    #[serde(default, alias = "Hollow")]
    hollow: bool,
    #[serde(alias = "Color")]
    color: Option<String>,
}

/// Authoring metadata that seeds a sprite's definition before packing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sidecar {
    pub origin: Vec2,
    pub border: Border,
    pub tile_x: bool,
    pub tile_y: bool,
    pub hollow: bool,
    pub color: String,
}

impl Default for Sidecar {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            border: Border::ZERO,
            tile_x: false,
            tile_y: false,
            hollow: false,
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

impl From<RawSidecar> for Sidecar {
    fn from(raw: RawSidecar) -> Self {
        Self {
            origin: raw.origin.map(Vec2::from).unwrap_or(Vec2::ZERO),
            border: raw.border.map(Border::from).unwrap_or(Border::ZERO),
            tile_x: raw.tile_x,
            tile_y: raw.tile_y,
            hollow: raw.hollow,
            color: raw.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        }
    }
}

impl Sidecar {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawSidecar>(text).map(Sidecar::from)
    }
}

/// Path of the sidecar belonging to `image`: the full file name plus `.meta`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut s = image.as_os_str().to_owned();
    s.push(".meta");
    PathBuf::from(s)
}

/// Reads the sidecar next to `image`, or defaults when there is none.
pub fn load_sidecar(image: &Path) -> Result<Sidecar> {
    let path = sidecar_path(image);
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Sidecar::default()),
        Err(e) => return Err(e.into()),
    };
    Sidecar::from_json(&text).map_err(|source| AtlasError::Sidecar { path, source })
}
