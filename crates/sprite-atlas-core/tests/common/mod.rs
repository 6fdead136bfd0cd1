#![allow(dead_code)]

use glam::Vec2;
use image::{ImageFormat, Rgba, RgbaImage};
use sprite_atlas_core::codec::encode_directory;
use sprite_atlas_core::container::write_package;
use sprite_atlas_core::prelude::*;
use std::io::Cursor;

pub const ORIGIN: &str = "ui.atlas";

pub fn sprite(x: f32, y: f32, w: f32, h: f32) -> SpriteDefinition {
    SpriteDefinition {
        position: Vec2::new(x, y),
        size: Vec2::new(w, h),
        ..Default::default()
    }
}

/// Three simple sprites followed by two sliced ones on a 64x64 sheet.
pub fn directory() -> SpriteDirectory {
    SpriteDirectory {
        filter_mode: FilterMode::Linear,
        sprites: vec![
            ("dot".into(), sprite(0.0, 0.0, 8.0, 8.0)),
            (
                "gem".into(),
                SpriteDefinition {
                    origin: Vec2::splat(0.5),
                    color: "#80FF0000".into(),
                    ..sprite(8.0, 0.0, 16.0, 16.0)
                },
            ),
            ("star".into(), sprite(24.0, 0.0, 8.0, 8.0)),
            (
                "panel".into(),
                SpriteDefinition {
                    border: Border::uniform(4.0),
                    ..sprite(0.0, 32.0, 32.0, 32.0)
                },
            ),
            (
                "strip".into(),
                SpriteDefinition {
                    border: Border::new(4.0, 0.0, 4.0, 0.0),
                    tile_x: true,
                    ..sprite(32.0, 32.0, 32.0, 16.0)
                },
            ),
        ],
    }
}

pub fn sheet_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8 * 4, y as u8 * 4, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn package_with(dir: &SpriteDirectory, sheet: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::new();
    encode_directory(dir, &mut encoded).unwrap();
    write_package(Vec::new(), &encoded, sheet).unwrap()
}

pub fn package() -> Vec<u8> {
    package_with(&directory(), &sheet_png(64, 64))
}

/// Reads an index buffer back as `u32`s.
pub fn indices(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Reads a vertex buffer back.
pub fn vertices(data: &[u8]) -> Vec<sprite_atlas_core::runtime::Vertex> {
    data.chunks_exact(std::mem::size_of::<sprite_atlas_core::runtime::Vertex>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}
