use crate::error::{AtlasError, Result};
use crate::model::Placement;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Canvas policy applied when turning a placement into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposePolicy {
    pub margin: u32,
    pub power_of_two: bool,
    pub premultiply: bool,
}

impl Default for ComposePolicy {
    fn default() -> Self {
        Self {
            margin: 0,
            power_of_two: true,
            premultiply: true,
        }
    }
}

/// A composed atlas sheet.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub image: RgbaImage,
    /// Set once the colour channels have been multiplied by alpha.
    pub premultiplied: bool,
}

impl Sheet {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Premultiplies the sheet in place. Does nothing if already done.
    pub fn premultiply(&mut self) {
        if self.premultiplied {
            return;
        }
        premultiply_rgba(&mut self.image);
        self.premultiplied = true;
    }

    /// Encodes the sheet as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| AtlasError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Smallest power of two `>= v` (1 for 0).
pub fn next_pow2(mut v: u32) -> u32 {
    if v <= 1 {
        return 1;
    }
    v -= 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v + 1
}

/// Final sheet dimensions for a placement.
///
/// The trailing padding of the right-most and bottom-most modules is dropped,
/// the margin is added on both sides, and with `power_of_two` both sides are
/// rounded up and the larger one is used for a square sheet.
pub fn sheet_size(placement: &Placement, padding: u32, policy: &ComposePolicy) -> (u32, u32) {
    let tight_w = placement.width.saturating_sub(padding).max(1);
    let tight_h = placement.height.saturating_sub(padding).max(1);
    let w = tight_w + policy.margin * 2;
    let h = tight_h + policy.margin * 2;
    if policy.power_of_two {
        let side = next_pow2(w).max(next_pow2(h));
        (side, side)
    } else {
        (w, h)
    }
}

/// Copies the whole of `src` into `canvas` with its top-left at (dx, dy).
/// Pixels falling outside the canvas are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    for (x, y, px) in src.enumerate_pixels() {
        let (tx, ty) = (dx + x, dy + y);
        if tx < cw && ty < ch {
            canvas.put_pixel(tx, ty, *px);
        }
    }
}

/// Multiplies colour channels by alpha, rounding like an 8-bit blend unit.
pub fn premultiply_rgba(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = px[3] as u32;
        let a = a + (a >= 128) as u32;
        for c in 0..3 {
            px[c] = ((a * px[c] as u32 + 128) >> 8) as u8;
        }
    }
}

/// Blits every module of `placement` onto a transparent canvas.
///
/// `images[m.id]` is the pixel source for module `m`. Modules are drawn in
/// packing order at `(x + margin, y + margin)`.
pub fn compose_sheet(
    placement: &Placement,
    images: &[&RgbaImage],
    padding: u32,
    policy: &ComposePolicy,
) -> Result<Sheet> {
    let (w, h) = sheet_size(placement, padding, policy);
    let mut canvas = RgbaImage::new(w, h);
    for m in &placement.modules {
        let src = images.get(m.id).copied().ok_or_else(|| {
            AtlasError::InvalidInput(format!("no image for module '{}' (id {})", m.key, m.id))
        })?;
        if src.dimensions() != (m.width, m.height) {
            return Err(AtlasError::InvalidInput(format!(
                "module '{}' is {}x{} but its image is {}x{}",
                m.key,
                m.width,
                m.height,
                src.width(),
                src.height()
            )));
        }
        blit_rgba(src, &mut canvas, m.x + policy.margin, m.y + policy.margin);
    }
    let mut sheet = Sheet {
        image: canvas,
        premultiplied: false,
    };
    if policy.premultiply {
        sheet.premultiply();
    }
    debug!(width = w, height = h, premultiplied = sheet.premultiplied, "composed sheet");
    Ok(sheet)
}
