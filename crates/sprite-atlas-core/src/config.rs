use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sheet sampling mode stored in the sprite directory as `filterMode:int32`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Nearest for both magnification and minification.
    #[default]
    Nearest,
    /// Linear for both.
    Linear,
    /// Linear magnification, mipmapped linear minification.
    Trilinear,
}

impl FilterMode {
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
            Self::Trilinear => 2,
        }
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Nearest),
            1 => Some(Self::Linear),
            2 => Some(Self::Trilinear),
            _ => None,
        }
    }
}

impl FromStr for FilterMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "0" => Ok(Self::Nearest),
            "linear" | "1" => Ok(Self::Linear),
            "trilinear" | "2" => Ok(Self::Trilinear),
            _ => Err(()),
        }
    }
}

/// Largest canvas edge the packer will grow to unless configured otherwise.
pub const DEFAULT_MAX_CANVAS: u32 = 8192;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasConfig {
    /// Pixels reserved to the right of and below every sprite.
    pub padding: u32,
    /// Transparent pixels around the whole sheet.
    pub margin: u32,
    /// Round the sheet up to a square power-of-two.
    pub power_of_two: bool,
    /// Downscale sources wider than this (0 = unbounded), keeping aspect.
    #[serde(default)]
    pub max_sprite_width: u32,
    /// Downscale sources taller than this (0 = unbounded), keeping aspect.
    #[serde(default)]
    pub max_sprite_height: u32,
    /// Hard limit on the packed canvas edge.
    #[serde(default = "default_max_canvas")]
    pub max_canvas: u32,
    #[serde(default)]
    pub filter_mode: FilterMode,
    /// Premultiply the composed sheet. Turn off when sources already are.
    #[serde(default = "default_premultiply")]
    pub premultiply_alpha: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            padding: 0,
            margin: 0,
            power_of_two: true,
            max_sprite_width: 0,
            max_sprite_height: 0,
            max_canvas: default_max_canvas(),
            filter_mode: FilterMode::default(),
            premultiply_alpha: default_premultiply(),
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `max_canvas` is zero
    /// - margins or padding alone would exceed the canvas limit
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_canvas == 0 {
            return Err(AtlasError::InvalidConfig("max_canvas must be non-zero".into()));
        }
        let reserved = self
            .margin
            .saturating_mul(2)
            .saturating_add(self.padding.saturating_add(1));
        if reserved > self.max_canvas {
            return Err(AtlasError::InvalidConfig(format!(
                "margin ({}) * 2 + padding ({}) leaves no space within max_canvas ({})",
                self.margin, self.padding, self.max_canvas
            )));
        }
        Ok(())
    }

    /// Per-axis downscale bounds; zero means unbounded.
    pub fn max_sprite_size(&self) -> (u32, u32) {
        let w = if self.max_sprite_width == 0 {
            u32::MAX
        } else {
            self.max_sprite_width
        };
        let h = if self.max_sprite_height == 0 {
            u32::MAX
        } else {
            self.max_sprite_height
        };
        (w, h)
    }
}

fn default_max_canvas() -> u32 {
    DEFAULT_MAX_CANVAS
}
fn default_premultiply() -> bool {
    true
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn margin(mut self, v: u32) -> Self {
        self.cfg.margin = v;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.cfg.power_of_two = v;
        self
    }
    pub fn max_sprite_size(mut self, w: u32, h: u32) -> Self {
        self.cfg.max_sprite_width = w;
        self.cfg.max_sprite_height = h;
        self
    }
    pub fn max_canvas(mut self, v: u32) -> Self {
        self.cfg.max_canvas = v;
        self
    }
    pub fn filter_mode(mut self, v: FilterMode) -> Self {
        self.cfg.filter_mode = v;
        self
    }
    pub fn premultiply_alpha(mut self, v: bool) -> Self {
        self.cfg.premultiply_alpha = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

impl AtlasConfig {
    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}
