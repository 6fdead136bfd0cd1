use super::device::{
    BufferId, BufferKind, GraphicsDevice, ShaderId, ShaderKind, TextureDesc, TextureId,
};
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("There is no active graphics context")]
    NoContext,
    #[error("graphics context is owned by thread {owner:?}, used from {current:?}")]
    WrongThread { owner: ThreadId, current: ThreadId },
}

/// Compiled programs, one per kind, for the lifetime of a context.
#[derive(Debug, Default)]
pub struct ShaderCache {
    programs: HashMap<ShaderKind, ShaderId>,
}

impl ShaderCache {
    pub fn get(&self, kind: ShaderKind) -> Option<ShaderId> {
        self.programs.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    fn get_or_compile(
        &mut self,
        kind: ShaderKind,
        device: &dyn GraphicsDevice,
    ) -> Result<ShaderId> {
        if let Some(id) = self.get(kind) {
            return Ok(id);
        }
        let id = device.compile_shader(kind)?;
        debug!(?kind, ?id, "compiled shader");
        self.programs.insert(kind, id);
        Ok(id)
    }
}

struct ContextShared {
    device: Arc<dyn GraphicsDevice>,
    owner: ThreadId,
    active: AtomicBool,
    shaders: Mutex<ShaderCache>,
}

/// Handle to a graphics device bound to the thread that created it.
///
/// Clones share the device, the thread binding and the shader cache.
#[derive(Clone)]
pub struct GraphicsContext {
    shared: Arc<ContextShared>,
}

impl fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("owner", &self.shared.owner)
            .field("active", &self.is_active())
            .finish()
    }
}

impl GraphicsContext {
    /// Binds `device` to the calling thread.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            shared: Arc::new(ContextShared {
                device,
                owner: thread::current().id(),
                active: AtomicBool::new(true),
                shaders: Mutex::new(ShaderCache::default()),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Fails unless the context is still active and this is its thread.
    pub fn ensure_current(&self) -> std::result::Result<(), ContextError> {
        if !self.is_active() {
            return Err(ContextError::NoContext);
        }
        let current = thread::current().id();
        if current != self.shared.owner {
            return Err(ContextError::WrongThread {
                owner: self.shared.owner,
                current,
            });
        }
        Ok(())
    }

    /// Marks the context as gone. Later device work fails with `NoContext`.
    pub fn release(&self) {
        self.shared.active.store(false, Ordering::Release);
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.shared.device.as_ref()
    }

    /// Returns the cached program for `kind`, compiling it on first use.
    pub fn shader(&self, kind: ShaderKind) -> Result<ShaderId> {
        self.ensure_current()?;
        let mut cache = self
            .shared
            .shaders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get_or_compile(kind, self.device())
    }

    pub fn cached_shaders(&self) -> usize {
        self.shared
            .shaders
            .lock()
            .map(|c| c.len())
            .unwrap_or_default()
    }
}

/// A device buffer deleted when dropped.
#[derive(Debug)]
pub struct GpuBuffer {
    ctx: GraphicsContext,
    id: BufferId,
    kind: BufferKind,
}

impl GpuBuffer {
    pub fn new(ctx: &GraphicsContext, kind: BufferKind) -> Result<Self> {
        ctx.ensure_current()?;
        let id = ctx.device().create_buffer(kind)?;
        Ok(Self {
            ctx: ctx.clone(),
            id,
            kind,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn upload(&self, data: &[u8]) -> Result<()> {
        self.ctx.ensure_current()?;
        self.ctx.device().upload_buffer(self.id, data)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        match self.ctx.ensure_current() {
            Ok(()) => self.ctx.device().delete_buffer(self.id),
            Err(e) => warn!(id = self.id.0, error = %e, "leaking buffer"),
        }
    }
}

/// A device texture deleted when dropped.
#[derive(Debug)]
pub struct GpuTexture {
    ctx: GraphicsContext,
    id: TextureId,
    width: u32,
    height: u32,
}

impl GpuTexture {
    pub fn new(ctx: &GraphicsContext, desc: &TextureDesc, rgba: &[u8]) -> Result<Self> {
        ctx.ensure_current()?;
        let id = ctx.device().create_texture(desc, rgba)?;
        Ok(Self {
            ctx: ctx.clone(),
            id,
            width: desc.width,
            height: desc.height,
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        match self.ctx.ensure_current() {
            Ok(()) => self.ctx.device().delete_texture(self.id),
            Err(e) => warn!(id = self.id.0, error = %e, "leaking texture"),
        }
    }
}
