//! Loading packages and drawing their sprites.
//!
//! Everything here talks to a [`GraphicsDevice`] through a
//! [`GraphicsContext`], which pins device work to the thread that created it.
//! [`HeadlessDevice`] is an in-memory device for tests and tooling.

pub mod atlas;
pub mod context;
pub mod device;
pub mod headless;
pub mod slice;
pub mod sprite;

pub use atlas::Atlas;
pub use context::{ContextError, GpuBuffer, GpuTexture, GraphicsContext, ShaderCache};
pub use device::{
    BufferId, BufferKind, DrawCall, Filter, GraphicsDevice, MinFilter, SamplerState, ShaderId,
    ShaderKind, TextureDesc, TextureId,
};
pub use headless::{BufferRecord, HeadlessDevice, TextureRecord};
pub use slice::{MAX_TILES, SliceGeometry, SliceSource, SlicedSprite};
pub use sprite::{
    Drawable, SharedGeometry, SimpleSprite, Sprite, SpriteMaterial, SpriteVariant, UvRect, Vertex,
};

use std::sync::Arc;

impl GraphicsContext {
    /// A context over a fresh [`HeadlessDevice`], bound to the calling thread.
    ///
    /// Returns the device too so callers can inspect what was uploaded.
    pub fn headless() -> (Self, Arc<HeadlessDevice>) {
        let device = Arc::new(HeadlessDevice::new());
        let ctx = GraphicsContext::new(device.clone());
        (ctx, device)
    }
}
