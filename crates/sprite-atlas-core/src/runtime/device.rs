use crate::config::FilterMode;
use crate::error::Result;
use glam::Mat4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Origin(Filter),
    Mipmap { mipmap: Filter, texel: Filter },
}

impl Default for MinFilter {
    fn default() -> Self {
        Self::Origin(Filter::Nearest)
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub min_filter: MinFilter,
    pub mag_filter: Filter,
}

impl SamplerState {
    pub fn mipmapped(&self) -> bool {
        matches!(self.min_filter, MinFilter::Mipmap { .. })
    }
}

impl From<FilterMode> for SamplerState {
    fn from(mode: FilterMode) -> Self {
        match mode {
            FilterMode::Nearest => SamplerState {
                min_filter: MinFilter::Origin(Filter::Nearest),
                mag_filter: Filter::Nearest,
            },
            FilterMode::Linear => SamplerState {
                min_filter: MinFilter::Origin(Filter::Linear),
                mag_filter: Filter::Linear,
            },
            FilterMode::Trilinear => SamplerState {
                min_filter: MinFilter::Mipmap {
                    mipmap: Filter::Linear,
                    texel: Filter::Linear,
                },
                mag_filter: Filter::Linear,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub sampler: SamplerState,
}

/// BufferKind defines a type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// `u32` indices, six per quad.
    Index,
    /// Interleaved position/colour/uv vertices.
    Vertex,
}

/// Built-in programs a device must be able to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Textured, per-vertex tinted geometry (`Vertex` layout).
    PositionColorUv,
}

/// One indexed triangle-list draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub shader: ShaderId,
    pub texture: TextureId,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    /// First index to read, in indices (not bytes).
    pub index_offset: u32,
    pub index_count: u32,
    pub transform: Mat4,
}

/// The graphics backend the runtime draws through.
///
/// Implementations only need to be called from the thread that owns the
/// context; [`GraphicsContext`](super::GraphicsContext) checks that before
/// every call.
pub trait GraphicsDevice: Send + Sync {
    fn create_texture(&self, desc: &TextureDesc, rgba: &[u8]) -> Result<TextureId>;
    fn delete_texture(&self, id: TextureId);
    fn create_buffer(&self, kind: BufferKind) -> Result<BufferId>;
    /// Replaces the whole contents of the buffer.
    fn upload_buffer(&self, id: BufferId, data: &[u8]) -> Result<()>;
    fn delete_buffer(&self, id: BufferId);
    fn compile_shader(&self, kind: ShaderKind) -> Result<ShaderId>;
    fn draw_indexed(&self, call: &DrawCall) -> Result<()>;
}
