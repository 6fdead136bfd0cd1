use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::FilterMode;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// Returns true if the point lies inside the half-open rectangle.
    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
    /// Returns true if the two rectangles share a non-empty area.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x >= other.right()
            || other.x >= self.right()
            || self.y >= other.bottom()
            || other.y >= self.bottom())
    }
}

/// 9-slice insets in pixels, in (left, top, right, bottom) order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Border {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Border {
    pub const ZERO: Border = Border::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// A zero border marks a simple (non-sliced) sprite.
    pub fn is_zero(&self) -> bool {
        self.left == 0.0 && self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0
    }

    /// Insets must be non-negative and leave a non-empty middle on both axes.
    pub fn fits(&self, size: Vec2) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right >= 0.0
            && self.bottom >= 0.0
            && self.left + self.right < size.x
            && self.top + self.bottom < size.y
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// Per-sprite record stored in the packaged sprite directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpriteDefinition {
    /// Top-left of the sprite on the sheet, in pixels.
    pub position: Vec2,
    /// Sprite size in pixels.
    pub size: Vec2,
    /// Normalized pivot; multiplied by the drawn size.
    pub origin: Vec2,
    pub border: Border,
    pub tile_x: bool,
    pub tile_y: bool,
    /// Omit the middle region of a sliced sprite.
    pub hollow: bool,
    /// Baked tint, `#AARRGGBB`.
    pub color: String,
}

impl Default for SpriteDefinition {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            origin: Vec2::ZERO,
            border: Border::ZERO,
            tile_x: false,
            tile_y: false,
            hollow: false,
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

pub const DEFAULT_COLOR: &str = "#FFFFFFFF";

/// Parses `#AARRGGBB` (or `#RRGGBB`, opaque) into normalized RGBA.
pub fn parse_color(s: &str) -> Option<Vec4> {
    let hex = s.strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (a, r, g, b) = match hex.len() {
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        6 => (0xff, byte(0)?, byte(2)?, byte(4)?),
        _ => return None,
    };
    Some(Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0)
}

impl SpriteDefinition {
    pub fn is_sliced(&self) -> bool {
        !self.border.is_zero()
    }

    /// Baked tint as normalized RGBA, if the stored colour is well formed.
    pub fn tint(&self) -> Option<Vec4> {
        parse_color(&self.color)
    }

    /// Pixel rectangle on the sheet.
    pub fn pixel_rect(&self) -> Rect {
        Rect::new(
            self.position.x as u32,
            self.position.y as u32,
            self.size.x as u32,
            self.size.y as u32,
        )
    }
}

/// The decoded contents of `atlas.bin`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteDirectory {
    pub filter_mode: FilterMode,
    /// Sprites in packing order.
    pub sprites: Vec<(String, SpriteDefinition)>,
}

impl SpriteDirectory {
    pub fn get(&self, name: &str) -> Option<&SpriteDefinition> {
        self.sprites
            .iter()
            .find_map(|(k, d)| (k == name).then_some(d))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// A padded placeable rectangle wrapping one source image during packing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    /// Index of the source image in the input order.
    pub id: usize,
    pub key: String,
    /// Source pixel dimensions (without padding).
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    /// Assigned top-left after packing.
    pub x: u32,
    pub y: u32,
}

impl Module {
    pub fn new(id: usize, key: impl Into<String>, width: u32, height: u32, padding: u32) -> Self {
        Self {
            id,
            key: key.into(),
            width,
            height,
            padding,
            x: 0,
            y: 0,
        }
    }

    pub fn padded_width(&self) -> u32 {
        self.width + self.padding
    }

    pub fn padded_height(&self) -> u32 {
        self.height + self.padding
    }

    pub fn padded_area(&self) -> u64 {
        (self.padded_width() as u64) * (self.padded_height() as u64)
    }

    /// Padded rectangle at the assigned position.
    pub fn padded_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.padded_width(), self.padded_height())
    }

    /// Unpadded content rectangle at the assigned position.
    pub fn content_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Result of a packing run: canvas size and positioned modules in packing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub modules: Vec<Module>,
}

/// Statistics about packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    /// Total number of sprites packed.
    pub num_sprites: usize,
    pub num_sliced: usize,
    pub sheet_width: u32,
    pub sheet_height: u32,
    /// Sheet area in pixels.
    pub sheet_area: u64,
    /// Sum of sprite areas (unpadded).
    pub used_area: u64,
    /// Occupancy ratio: used_area / sheet_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl PackStats {
    pub fn new(sheet_width: u32, sheet_height: u32, directory: &SpriteDirectory) -> Self {
        let sheet_area = (sheet_width as u64) * (sheet_height as u64);
        let used_area = directory
            .sprites
            .iter()
            .map(|(_, d)| d.pixel_rect().area())
            .sum::<u64>();
        let occupancy = if sheet_area > 0 {
            used_area as f64 / sheet_area as f64
        } else {
            0.0
        };
        Self {
            num_sprites: directory.len(),
            num_sliced: directory.sprites.iter().filter(|(_, d)| d.is_sliced()).count(),
            sheet_width,
            sheet_height,
            sheet_area,
            used_area,
            occupancy,
        }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sprites: {} ({} sliced), Sheet: {}x{}, Occupancy: {:.2}%",
            self.num_sprites,
            self.num_sliced,
            self.sheet_width,
            self.sheet_height,
            self.occupancy * 100.0,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.sheet_area.saturating_sub(self.used_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_argb() {
        let c = parse_color("#80FF0000").unwrap();
        assert_eq!(c.x, 1.0);
        assert_eq!(c.y, 0.0);
        assert!((c.w - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(parse_color("#00ff00").unwrap(), Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn color_rejects_garbage() {
        for bad in ["", "FFFFFFFF", "#FFF", "#GGFFFFFF", "#FFFFFFFFF", "#+1FFFFFF"] {
            assert!(parse_color(bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn border_fit_is_strict() {
        let size = Vec2::new(32.0, 32.0);
        assert!(Border::uniform(4.0).fits(size));
        assert!(!Border::new(16.0, 0.0, 16.0, 0.0).fits(size));
        assert!(!Border::new(-1.0, 0.0, 0.0, 0.0).fits(size));
    }

    #[test]
    fn rect_intersection_is_half_open() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.intersects(&Rect::new(10, 0, 5, 5)));
        assert!(a.intersects(&Rect::new(9, 9, 5, 5)));
        assert!(!a.contains_point(10, 0));
    }
}
