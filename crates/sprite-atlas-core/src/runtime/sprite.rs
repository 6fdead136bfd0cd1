use super::context::{GpuBuffer, GpuTexture, GraphicsContext};
use super::device::{BufferKind, DrawCall, ShaderId};
use super::slice::SlicedSprite;
use crate::error::Result;
use crate::model::Rect;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};
use std::sync::Arc;

/// Interleaved position/colour/uv vertex, nine floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(pos: Vec2, color: Vec4, uv: Vec2) -> Self {
        Self {
            position: [pos.x, pos.y, 0.0],
            color: color.to_array(),
            uv: uv.to_array(),
        }
    }
}

/// Appends the two triangles of quad `a b c d` (counter-clockwise).
pub(crate) fn push_quad(indices: &mut Vec<u32>, a: u32, b: u32, c: u32, d: u32) {
    indices.extend_from_slice(&[a, b, c, c, d, a]);
}

/// Texture coordinates of a pixel rectangle on the sheet.
///
/// `v_top` is the smaller `v`: it maps the rectangle's top row, which sits at
/// the top of the y-up local quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub u1: f32,
    pub v_top: f32,
    pub v_bottom: f32,
}

impl UvRect {
    pub fn from_pixels(position: Vec2, size: Vec2, sheet: Vec2) -> Self {
        Self {
            u0: position.x / sheet.x,
            u1: (position.x + size.x) / sheet.x,
            v_top: position.y / sheet.y,
            v_bottom: (position.y + size.y) / sheet.y,
        }
    }

    pub fn contains(&self, uv: Vec2) -> bool {
        const EPS: f32 = 1e-6;
        uv.x >= self.u0 - EPS
            && uv.x <= self.u1 + EPS
            && uv.y >= self.v_top - EPS
            && uv.y <= self.v_bottom + EPS
    }

    /// The pixel rectangle these coordinates were cut from.
    pub fn to_pixels(&self, sheet: Vec2) -> Rect {
        let px = |v: f32, extent: f32| (v * extent).round() as u32;
        let x = px(self.u0, sheet.x);
        let y = px(self.v_top, sheet.y);
        Rect::new(x, y, px(self.u1, sheet.x) - x, px(self.v_bottom, sheet.y) - y)
    }
}

/// The texture and program every sprite of an atlas draws with.
#[derive(Debug)]
pub struct SpriteMaterial {
    pub(crate) ctx: GraphicsContext,
    pub(crate) texture: GpuTexture,
    pub(crate) shader: ShaderId,
}

impl SpriteMaterial {
    pub fn context(&self) -> &GraphicsContext {
        &self.ctx
    }

    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    /// Sheet size in pixels.
    pub fn sheet_size(&self) -> Vec2 {
        let (w, h) = self.texture.size();
        Vec2::new(w as f32, h as f32)
    }

    pub(crate) fn draw(
        &self,
        vertices: &GpuBuffer,
        indices: &GpuBuffer,
        index_offset: u32,
        index_count: u32,
        transform: &Mat4,
    ) -> Result<()> {
        self.ctx.ensure_current()?;
        self.ctx.device().draw_indexed(&DrawCall {
            shader: self.shader,
            texture: self.texture.id(),
            vertex_buffer: vertices.id(),
            index_buffer: indices.id(),
            index_offset,
            index_count,
            transform: *transform,
        })
    }
}

/// The vertex/index buffer pair holding every simple sprite of an atlas.
#[derive(Debug)]
pub struct SharedGeometry {
    pub vertices: GpuBuffer,
    pub indices: GpuBuffer,
}

impl SharedGeometry {
    pub(crate) fn upload(
        ctx: &GraphicsContext,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Self> {
        let vb = GpuBuffer::new(ctx, BufferKind::Vertex)?;
        vb.upload(bytemuck::cast_slice(vertices))?;
        let ib = GpuBuffer::new(ctx, BufferKind::Index)?;
        ib.upload(bytemuck::cast_slice(indices))?;
        Ok(Self {
            vertices: vb,
            indices: ib,
        })
    }
}

/// Anything that can be placed in the world and drawn.
pub trait Drawable {
    /// Current drawn size in local units.
    fn size(&self) -> Vec2;

    /// Local-space bounds `(min, max)` with the pivot at the origin.
    fn bounds(&self) -> (Vec2, Vec2);

    fn draw(&self, transform: &Mat4) -> Result<()>;

    /// Changes the drawn size. Simple sprites keep their natural size.
    fn resize(&mut self, size: Vec2) -> Result<()>;
}

/// Pivot-relative bounds of a `size` quad with normalized `origin`.
pub(crate) fn pivot_bounds(size: Vec2, origin: Vec2) -> (Vec2, Vec2) {
    let pivot = origin * size;
    (-pivot, size - pivot)
}

/// A fixed-size sprite drawn from a slice of the atlas' shared buffers.
#[derive(Debug, Clone)]
pub struct SimpleSprite {
    pub(crate) name: String,
    pub(crate) material: Arc<SpriteMaterial>,
    pub(crate) geometry: Arc<SharedGeometry>,
    pub(crate) index_offset: u32,
    pub(crate) index_count: u32,
    pub(crate) size: Vec2,
    pub(crate) origin: Vec2,
    pub(crate) uv: UvRect,
}

impl SimpleSprite {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this sprite's indices inside the shared index buffer.
    pub fn index_range(&self) -> (u32, u32) {
        (self.index_offset, self.index_count)
    }

    pub fn uv(&self) -> UvRect {
        self.uv
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn material(&self) -> &Arc<SpriteMaterial> {
        &self.material
    }

    pub fn geometry(&self) -> &Arc<SharedGeometry> {
        &self.geometry
    }

    /// The four vertices of the quad, in local space.
    pub(crate) fn quad(size: Vec2, origin: Vec2, uv: UvRect, tint: Vec4) -> [Vertex; 4] {
        let (min, max) = pivot_bounds(size, origin);
        [
            Vertex::new(Vec2::new(min.x, min.y), tint, Vec2::new(uv.u0, uv.v_bottom)),
            Vertex::new(Vec2::new(max.x, min.y), tint, Vec2::new(uv.u1, uv.v_bottom)),
            Vertex::new(Vec2::new(max.x, max.y), tint, Vec2::new(uv.u1, uv.v_top)),
            Vertex::new(Vec2::new(min.x, max.y), tint, Vec2::new(uv.u0, uv.v_top)),
        ]
    }
}

impl Drawable for SimpleSprite {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn bounds(&self) -> (Vec2, Vec2) {
        pivot_bounds(self.size, self.origin)
    }

    fn draw(&self, transform: &Mat4) -> Result<()> {
        self.material.draw(
            &self.geometry.vertices,
            &self.geometry.indices,
            self.index_offset,
            self.index_count,
            transform,
        )
    }

    fn resize(&mut self, _size: Vec2) -> Result<()> {
        Ok(())
    }
}

/// A sprite handed out by an atlas.
#[derive(Debug)]
pub enum Sprite {
    Simple(SimpleSprite),
    Sliced(SlicedSprite),
}

impl Sprite {
    pub fn name(&self) -> &str {
        match self {
            Sprite::Simple(s) => s.name(),
            Sprite::Sliced(s) => s.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Sprite::Simple(_) => SimpleSprite::KIND,
            Sprite::Sliced(_) => SlicedSprite::KIND,
        }
    }

    pub fn is_sliced(&self) -> bool {
        matches!(self, Sprite::Sliced(_))
    }

    /// Texture coordinates of the whole source rectangle.
    pub fn source_uv(&self) -> UvRect {
        match self {
            Sprite::Simple(s) => s.uv(),
            Sprite::Sliced(s) => s.source().outer,
        }
    }

    /// A new handle to the same sprite. Sliced sprites get their own buffers.
    pub fn try_clone(&self) -> Result<Sprite> {
        Ok(match self {
            Sprite::Simple(s) => Sprite::Simple(s.clone()),
            Sprite::Sliced(s) => Sprite::Sliced(s.clone_sprite()?),
        })
    }
}

impl Drawable for Sprite {
    fn size(&self) -> Vec2 {
        match self {
            Sprite::Simple(s) => s.size(),
            Sprite::Sliced(s) => s.size(),
        }
    }

    fn bounds(&self) -> (Vec2, Vec2) {
        match self {
            Sprite::Simple(s) => s.bounds(),
            Sprite::Sliced(s) => s.bounds(),
        }
    }

    fn draw(&self, transform: &Mat4) -> Result<()> {
        match self {
            Sprite::Simple(s) => s.draw(transform),
            Sprite::Sliced(s) => s.draw(transform),
        }
    }

    fn resize(&mut self, size: Vec2) -> Result<()> {
        match self {
            Sprite::Simple(s) => s.resize(size),
            Sprite::Sliced(s) => s.resize(size),
        }
    }
}

/// Types [`Atlas::get_sprite_as`](super::Atlas::get_sprite_as) can return.
pub trait SpriteVariant: Sized {
    const KIND: &'static str;

    /// Unwraps the variant, handing the sprite back if it is another kind.
    fn from_sprite(sprite: Sprite) -> std::result::Result<Self, Sprite>;
}

impl SpriteVariant for Sprite {
    const KIND: &'static str = "sprite";

    fn from_sprite(sprite: Sprite) -> std::result::Result<Self, Sprite> {
        Ok(sprite)
    }
}

impl SpriteVariant for SimpleSprite {
    const KIND: &'static str = "simple";

    fn from_sprite(sprite: Sprite) -> std::result::Result<Self, Sprite> {
        match sprite {
            Sprite::Simple(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl SpriteVariant for SlicedSprite {
    const KIND: &'static str = "sliced";

    fn from_sprite(sprite: Sprite) -> std::result::Result<Self, Sprite> {
        match sprite {
            Sprite::Sliced(s) => Ok(s),
            other => Err(other),
        }
    }
}
