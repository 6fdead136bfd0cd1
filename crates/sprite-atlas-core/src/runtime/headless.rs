//! A [`GraphicsDevice`] that keeps everything in memory.
//!
//! Used by the tests and by `sprite-atlas inspect`; it records every texture,
//! buffer upload and draw so callers can read them back.

use super::device::{
    BufferId, BufferKind, DrawCall, GraphicsDevice, SamplerState, ShaderId, ShaderKind,
    TextureDesc, TextureId,
};
use crate::error::{AtlasError, Result};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub sampler: SamplerState,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    pub kind: BufferKind,
    pub data: Vec<u8>,
    /// Number of uploads since creation.
    pub uploads: usize,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    textures: BTreeMap<u32, TextureRecord>,
    buffers: BTreeMap<u32, BufferRecord>,
    shaders: Vec<ShaderKind>,
    draws: Vec<DrawCall>,
}

impl State {
    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: Mutex<State>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn texture(&self, id: TextureId) -> Option<TextureRecord> {
        self.state().textures.get(&id.0).cloned()
    }

    pub fn buffer(&self, id: BufferId) -> Option<BufferRecord> {
        self.state().buffers.get(&id.0).cloned()
    }

    pub fn live_textures(&self) -> usize {
        self.state().textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state().buffers.len()
    }

    pub fn compiled_shaders(&self) -> Vec<ShaderKind> {
        self.state().shaders.clone()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state().draws.clone()
    }

    pub fn clear_draws(&self) {
        self.state().draws.clear();
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&self, desc: &TextureDesc, rgba: &[u8]) -> Result<TextureId> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if rgba.len() != expected {
            return Err(AtlasError::Device(format!(
                "texture {}x{} needs {expected} bytes, got {}",
                desc.width,
                desc.height,
                rgba.len()
            )));
        }
        let mut st = self.state();
        let id = st.alloc();
        st.textures.insert(
            id,
            TextureRecord {
                width: desc.width,
                height: desc.height,
                sampler: desc.sampler,
                rgba: rgba.to_vec(),
            },
        );
        Ok(TextureId(id))
    }

    fn delete_texture(&self, id: TextureId) {
        self.state().textures.remove(&id.0);
    }

    fn create_buffer(&self, kind: BufferKind) -> Result<BufferId> {
        let mut st = self.state();
        let id = st.alloc();
        st.buffers.insert(
            id,
            BufferRecord {
                kind,
                data: Vec::new(),
                uploads: 0,
            },
        );
        Ok(BufferId(id))
    }

    fn upload_buffer(&self, id: BufferId, data: &[u8]) -> Result<()> {
        let mut st = self.state();
        let buf = st
            .buffers
            .get_mut(&id.0)
            .ok_or_else(|| AtlasError::Device(format!("unknown buffer {}", id.0)))?;
        buf.data.clear();
        buf.data.extend_from_slice(data);
        buf.uploads += 1;
        Ok(())
    }

    fn delete_buffer(&self, id: BufferId) {
        self.state().buffers.remove(&id.0);
    }

    fn compile_shader(&self, kind: ShaderKind) -> Result<ShaderId> {
        let mut st = self.state();
        st.shaders.push(kind);
        let id = st.alloc();
        Ok(ShaderId(id))
    }

    fn draw_indexed(&self, call: &DrawCall) -> Result<()> {
        let mut st = self.state();
        if !st.textures.contains_key(&call.texture.0) {
            return Err(AtlasError::Device(format!("unknown texture {}", call.texture.0)));
        }
        let unknown = |id: BufferId| AtlasError::Device(format!("unknown buffer {}", id.0));
        let index_bytes = st
            .buffers
            .get(&call.index_buffer.0)
            .map(|b| b.data.len())
            .ok_or_else(|| unknown(call.index_buffer))?;
        if !st.buffers.contains_key(&call.vertex_buffer.0) {
            return Err(unknown(call.vertex_buffer));
        }
        let end = (call.index_offset as usize + call.index_count as usize) * 4;
        if end > index_bytes {
            return Err(AtlasError::Device(format!(
                "draw reads indices up to byte {end}, buffer holds {index_bytes}"
            )));
        }
        st.draws.push(*call);
        Ok(())
    }
}
