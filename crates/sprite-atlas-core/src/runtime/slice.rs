//! 9-slice geometry.
//!
//! Local space is y-up with the pivot (`origin * size`) at the origin. The
//! source rectangle is split by the border into a 4×4 grid of positions
//! `xs`/`ys` and matching texture coordinates `us`/`vs`:
//!
//! ```text
//!   ys[3] +----+--------+----+   vs[3] = top of the source rect
//!         | TL |  top   | TR |
//!   ys[2] +----+--------+----+
//!         |left| middle |rgt |
//!   ys[1] +----+--------+----+
//!         | BL | bottom | BR |
//!   ys[0] +----+--------+----+   vs[0] = bottom of the source rect
//!       xs[0] xs[1]   xs[2] xs[3]
//! ```
//!
//! The corners are emitted first as vertices 0..16 (BL, BR, TR, TL, each in
//! BL, BR, TR, TL order). Stretched edges and the stretched middle only add
//! indices over those sixteen vertices. Tiled spans add fresh vertices per
//! tile, and the last tile of a span samples only as many texels as it covers.

use super::context::GpuBuffer;
use super::device::BufferKind;
use super::sprite::{Drawable, SpriteMaterial, UvRect, Vertex, pivot_bounds, push_quad};
use crate::error::{AtlasError, Result};
use crate::model::{Border, SpriteDefinition};
use glam::{Mat4, Vec2, Vec4};
use std::sync::Arc;
use tracing::trace;

// Corner vertex indices, named by position in the 4x4 grid (column, row).
const BL_INNER: u32 = 2; // (1,1)
const BR_INNER: u32 = 7; // (2,1)
const TR_INNER: u32 = 8; // (2,2)
const TL_INNER: u32 = 13; // (1,2)

/// Everything about a sliced sprite that does not depend on its drawn size.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSource {
    /// Natural size in pixels.
    pub natural: Vec2,
    pub origin: Vec2,
    pub border: Border,
    pub tile_x: bool,
    pub tile_y: bool,
    pub hollow: bool,
    pub tint: Vec4,
    /// Whole source rectangle.
    pub outer: UvRect,
    /// Source rectangle inset by the border.
    pub inner: UvRect,
    /// Size of one sheet pixel in UV units.
    pub texel: Vec2,
}

impl SliceSource {
    pub fn new(def: &SpriteDefinition, sheet: Vec2, tint: Vec4) -> Self {
        let b = def.border;
        let outer = UvRect::from_pixels(def.position, def.size, sheet);
        let inner = UvRect::from_pixels(
            def.position + Vec2::new(b.left, b.top),
            def.size - Vec2::new(b.left + b.right, b.top + b.bottom),
            sheet,
        );
        Self {
            natural: def.size,
            origin: def.origin,
            border: b,
            tile_x: def.tile_x,
            tile_y: def.tile_y,
            hollow: def.hollow,
            tint,
            outer,
            inner,
            texel: Vec2::ONE / sheet,
        }
    }

    /// Number of tiles needed to draw at `size`; axes that stretch count once.
    pub fn tile_count(&self, size: Vec2) -> f64 {
        let mid = self.middle().max(Vec2::ONE);
        let span = |extent: f32, a: f32, b: f32, step: f32| {
            (((extent - a - b).max(0.0) as f64) / step as f64).ceil().max(1.0)
        };
        let x = if self.tile_x {
            span(size.x, self.border.left, self.border.right, mid.x)
        } else {
            1.0
        };
        let y = if self.tile_y {
            span(size.y, self.border.bottom, self.border.top, mid.y)
        } else {
            1.0
        };
        x * y
    }

    /// Natural size of the middle region, which is also the tile size.
    pub fn middle(&self) -> Vec2 {
        Vec2::new(
            self.natural.x - self.border.left - self.border.right,
            self.natural.y - self.border.top - self.border.bottom,
        )
    }
}

/// CPU-side vertices and indices of a sliced sprite at one size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl SliceGeometry {
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    fn quad(&mut self, x: [f32; 2], y: [f32; 2], u: [f32; 2], v: [f32; 2], tint: Vec4) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[
            Vertex::new(Vec2::new(x[0], y[0]), tint, Vec2::new(u[0], v[0])),
            Vertex::new(Vec2::new(x[1], y[0]), tint, Vec2::new(u[1], v[0])),
            Vertex::new(Vec2::new(x[1], y[1]), tint, Vec2::new(u[1], v[1])),
            Vertex::new(Vec2::new(x[0], y[1]), tint, Vec2::new(u[0], v[1])),
        ]);
        push_quad(&mut self.indices, base, base + 1, base + 2, base + 3);
    }

    /// Builds the geometry of `src` drawn at `size`.
    pub fn generate(src: &SliceSource, size: Vec2) -> Self {
        let b = src.border;
        let pivot = src.origin * size;
        let xs = [
            -pivot.x,
            -pivot.x + b.left,
            -pivot.x + size.x - b.right,
            -pivot.x + size.x,
        ];
        let ys = [
            -pivot.y,
            -pivot.y + b.bottom,
            -pivot.y + size.y - b.top,
            -pivot.y + size.y,
        ];
        let us = [src.outer.u0, src.inner.u0, src.inner.u1, src.outer.u1];
        let vs = [
            src.outer.v_bottom,
            src.inner.v_bottom,
            src.inner.v_top,
            src.outer.v_top,
        ];
        let tint = src.tint;
        let mut g = SliceGeometry::default();

        let cell = |i: usize, j: usize| {
            (
                [xs[i], xs[i + 1]],
                [ys[j], ys[j + 1]],
                [us[i], us[i + 1]],
                [vs[j], vs[j + 1]],
            )
        };
        for (i, j) in [(0, 0), (2, 0), (2, 2), (0, 2)] {
            let (x, y, u, v) = cell(i, j);
            g.quad(x, y, u, v, tint);
        }

        if !src.tile_x {
            push_quad(&mut g.indices, 1, 4, BR_INNER, BL_INNER);
            push_quad(&mut g.indices, TL_INNER, TR_INNER, 11, 14);
        }
        if !src.tile_y {
            push_quad(&mut g.indices, BR_INNER, 6, 9, TR_INNER);
            push_quad(&mut g.indices, 3, BL_INNER, TL_INNER, 12);
        }
        if !src.hollow && !src.tile_x && !src.tile_y {
            push_quad(&mut g.indices, BL_INNER, BR_INNER, TR_INNER, TL_INNER);
        }

        let mid = src.middle().max(Vec2::ONE);
        let x_tiles = Tiles::new(xs[1], xs[2], mid.x, us[1], us[2], src.texel.x);
        let y_tiles = Tiles::new(ys[1], ys[2], mid.y, vs[1], vs[2], -src.texel.y);

        if src.tile_x {
            for (x, u) in x_tiles.clone() {
                g.quad(x, [ys[0], ys[1]], u, [vs[0], vs[1]], tint);
                g.quad(x, [ys[2], ys[3]], u, [vs[2], vs[3]], tint);
                if !src.hollow && !src.tile_y {
                    g.quad(x, [ys[1], ys[2]], u, [vs[1], vs[2]], tint);
                }
            }
        }
        if src.tile_y {
            for (y, v) in y_tiles {
                g.quad([xs[0], xs[1]], y, [us[0], us[1]], v, tint);
                g.quad([xs[2], xs[3]], y, [us[2], us[3]], v, tint);
                if src.hollow {
                    continue;
                }
                if src.tile_x {
                    for (x, u) in x_tiles.clone() {
                        g.quad(x, y, u, v, tint);
                    }
                } else {
                    g.quad([xs[1], xs[2]], y, [us[1], us[2]], v, tint);
                }
            }
        }
        g
    }
}

/// Steps over `[start, end)` in `step`-sized tiles, yielding each tile's
/// span and the texture coordinates it samples. A full tile maps to
/// `[t0, t1]`; a shorter final tile maps to `t0 + len * texel`.
#[derive(Debug, Clone)]
struct Tiles {
    pos: f32,
    end: f32,
    step: f32,
    t0: f32,
    t1: f32,
    texel: f32,
}

impl Tiles {
    fn new(start: f32, end: f32, step: f32, t0: f32, t1: f32, texel: f32) -> Self {
        Self {
            pos: start,
            end,
            step,
            t0,
            t1,
            texel,
        }
    }
}

impl Iterator for Tiles {
    type Item = ([f32; 2], [f32; 2]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let start = self.pos;
        let stop = (start + self.step).min(self.end);
        if stop <= start {
            // the step vanished below f32 precision at this position
            self.pos = self.end;
            return None;
        }
        let len = stop - start;
        let far = if len >= self.step {
            self.t1
        } else {
            self.t0 + len * self.texel
        };
        self.pos = stop;
        Some(([start, stop], [self.t0, far]))
    }
}

/// Upper bound on the middle tiles a resize may generate.
pub const MAX_TILES: u32 = 65_536;

/// A resizable 9-slice sprite with its own vertex and index buffers.
#[derive(Debug)]
pub struct SlicedSprite {
    name: String,
    material: Arc<SpriteMaterial>,
    source: SliceSource,
    size: Vec2,
    vertices: GpuBuffer,
    indices: GpuBuffer,
    index_count: u32,
    vertex_count: u32,
}

impl SlicedSprite {
    /// Allocates buffers and uploads the geometry for `size`.
    pub fn new(
        name: impl Into<String>,
        material: Arc<SpriteMaterial>,
        source: SliceSource,
        size: Vec2,
    ) -> Result<Self> {
        let ctx = material.context().clone();
        let mut sprite = Self {
            name: name.into(),
            vertices: GpuBuffer::new(&ctx, BufferKind::Vertex)?,
            indices: GpuBuffer::new(&ctx, BufferKind::Index)?,
            material,
            source,
            size,
            index_count: 0,
            vertex_count: 0,
        };
        sprite.rebuild()?;
        Ok(sprite)
    }

    fn rebuild(&mut self) -> Result<()> {
        let geometry = SliceGeometry::generate(&self.source, self.size);
        self.vertices.upload(bytemuck::cast_slice(&geometry.vertices))?;
        self.indices.upload(bytemuck::cast_slice(&geometry.indices))?;
        self.vertex_count = geometry.vertices.len() as u32;
        self.index_count = geometry.indices.len() as u32;
        trace!(
            sprite = %self.name,
            width = self.size.x,
            height = self.size.y,
            quads = geometry.quad_count(),
            "sliced geometry uploaded"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SliceSource {
        &self.source
    }

    pub fn border(&self) -> Border {
        self.source.border
    }

    pub fn material(&self) -> &Arc<SpriteMaterial> {
        &self.material
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertices
    }

    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Regenerates and re-uploads the geometry. Same size is a no-op.
    pub fn resize(&mut self, size: Vec2) -> Result<()> {
        if size == self.size {
            return Ok(());
        }
        if !size.is_finite() || size.x < 0.0 || size.y < 0.0 {
            return Err(AtlasError::InvalidInput(format!(
                "sprite '{}': invalid size {}x{}",
                self.name, size.x, size.y
            )));
        }
        let tiles = self.source.tile_count(size);
        if tiles > MAX_TILES as f64 {
            return Err(AtlasError::InvalidInput(format!(
                "sprite '{}': {}x{} needs {tiles} tiles (limit {MAX_TILES})",
                self.name, size.x, size.y
            )));
        }
        self.material.context().ensure_current()?;
        self.size = size;
        self.rebuild()
    }

    /// Same material and size, new buffers.
    pub fn clone_sprite(&self) -> Result<SlicedSprite> {
        SlicedSprite::new(
            self.name.clone(),
            Arc::clone(&self.material),
            self.source.clone(),
            self.size,
        )
    }
}

impl Drawable for SlicedSprite {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn bounds(&self) -> (Vec2, Vec2) {
        pivot_bounds(self.size, self.source.origin)
    }

    fn draw(&self, transform: &Mat4) -> Result<()> {
        self.material
            .draw(&self.vertices, &self.indices, 0, self.index_count, transform)
    }

    fn resize(&mut self, size: Vec2) -> Result<()> {
        SlicedSprite::resize(self, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(border: Border, tile_x: bool, tile_y: bool, hollow: bool) -> SliceSource {
        let def = SpriteDefinition {
            position: Vec2::new(8.0, 16.0),
            size: Vec2::new(32.0, 32.0),
            border,
            tile_x,
            tile_y,
            hollow,
            ..Default::default()
        };
        SliceSource::new(&def, Vec2::new(128.0, 128.0), Vec4::ONE)
    }

    #[test]
    fn tiles_cover_span_with_partial_tail() {
        let tiles: Vec<_> = Tiles::new(0.0, 10.0, 4.0, 0.25, 0.5, 1.0 / 64.0).collect();
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0], ([0.0, 4.0], [0.25, 0.5]));
        assert_eq!(tiles[2].0, [8.0, 10.0]);
        assert!((tiles[2].1[1] - (0.25 + 2.0 / 64.0)).abs() < 1e-6);
    }

    #[test]
    fn tiles_stop_when_the_step_is_lost_to_precision() {
        let tiles: Vec<_> =
            Tiles::new(16_777_216.0, 16_777_220.0, 1.0, 0.0, 1.0, 1.0 / 64.0).take(8).collect();
        assert!(tiles.len() < 8, "{tiles:?}");
        assert!(tiles.iter().all(|(x, _)| x[1] > x[0]));
    }

    #[test]
    fn tile_count_follows_tiled_axes() {
        let src = source(Border::uniform(4.0), true, false, false);
        // 56 px over 24 px tiles
        assert_eq!(src.tile_count(Vec2::splat(64.0)), 3.0);
        assert_eq!(src.tile_count(Vec2::new(8.0, 1e9)), 1.0);
        let both = source(Border::uniform(4.0), true, true, false);
        assert_eq!(both.tile_count(Vec2::splat(64.0)), 9.0);
        let stretched = source(Border::uniform(4.0), false, false, false);
        assert_eq!(stretched.tile_count(Vec2::splat(1e9)), 1.0);
    }

    #[test]
    fn empty_span_yields_nothing() {
        assert_eq!(Tiles::new(5.0, 5.0, 4.0, 0.0, 1.0, 0.1).count(), 0);
        assert_eq!(Tiles::new(6.0, 5.0, 4.0, 0.0, 1.0, 0.1).count(), 0);
    }

    #[test]
    fn corners_come_first_in_fixed_order() {
        let src = source(Border::uniform(4.0), false, false, false);
        let g = SliceGeometry::generate(&src, Vec2::splat(64.0));
        assert_eq!(g.vertices.len(), 16);
        let p = |i: usize| Vec2::new(g.vertices[i].position[0], g.vertices[i].position[1]);
        assert_eq!(p(0), Vec2::new(0.0, 0.0));
        assert_eq!(p(5), Vec2::new(64.0, 0.0));
        assert_eq!(p(10), Vec2::new(64.0, 64.0));
        assert_eq!(p(15), Vec2::new(0.0, 64.0));
        assert_eq!(p(BL_INNER as usize), Vec2::new(4.0, 4.0));
        assert_eq!(p(TR_INNER as usize), Vec2::new(60.0, 60.0));
    }

    #[test]
    fn hollow_drops_only_the_middle() {
        let src = source(Border::uniform(4.0), false, false, true);
        let g = SliceGeometry::generate(&src, Vec2::splat(64.0));
        assert_eq!(g.quad_count(), 8);
    }

    #[test]
    fn pivot_shifts_every_vertex() {
        let mut src = source(Border::uniform(4.0), false, false, false);
        src.origin = Vec2::splat(0.5);
        let g = SliceGeometry::generate(&src, Vec2::new(40.0, 20.0));
        assert_eq!(g.vertices[0].position, [-20.0, -10.0, 0.0]);
        assert_eq!(g.vertices[10].position, [20.0, 10.0, 0.0]);
    }
}
