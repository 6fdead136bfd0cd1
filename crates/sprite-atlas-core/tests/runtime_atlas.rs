mod common;

use common::{ORIGIN, indices, package, package_with, sheet_png, vertices};
use glam::{Mat4, Vec2};
use sprite_atlas_core::prelude::*;
use sprite_atlas_core::model::Rect;
use sprite_atlas_core::runtime::{Filter, MAX_TILES, MinFilter, ShaderKind};

fn load() -> (Atlas, GraphicsContext, std::sync::Arc<HeadlessDevice>) {
    let (ctx, device) = GraphicsContext::headless();
    let atlas = Atlas::from_bytes(&ctx, &package(), ORIGIN).expect("load");
    (atlas, ctx, device)
}

#[test]
fn loads_every_sprite_in_order() {
    let (atlas, ctx, device) = load();
    assert_eq!(atlas.len(), 5);
    assert_eq!(atlas.origin(), ORIGIN);
    assert_eq!(
        atlas.sprite_names().collect::<Vec<_>>(),
        ["dot", "gem", "star", "panel", "strip"]
    );
    assert_eq!(atlas.sheet_size(), Vec2::splat(64.0));
    assert_eq!(device.live_textures(), 1);
    assert_eq!(device.compiled_shaders(), vec![ShaderKind::PositionColorUv]);
    assert_eq!(ctx.cached_shaders(), 1);

    let tex = device.texture(atlas.material().texture().id()).unwrap();
    assert_eq!((tex.width, tex.height), (64, 64));
    assert_eq!(tex.sampler.mag_filter, Filter::Linear);
    assert_eq!(tex.sampler.min_filter, MinFilter::Origin(Filter::Linear));
}

#[test]
fn trilinear_mode_mipmaps_the_sheet() {
    let (ctx, device) = GraphicsContext::headless();
    let dir = SpriteDirectory {
        filter_mode: FilterMode::Trilinear,
        ..common::directory()
    };
    let atlas = Atlas::from_bytes(&ctx, &package_with(&dir, &sheet_png(64, 64)), ORIGIN).unwrap();
    let tex = device.texture(atlas.material().texture().id()).unwrap();
    assert!(tex.sampler.mipmapped());
}

#[test]
fn second_atlas_reuses_the_cached_shader() {
    let (a, ctx, device) = load();
    let b = Atlas::from_bytes(&ctx, &package(), "other.atlas").expect("load");
    assert_eq!(a.material().shader(), b.material().shader());
    assert_eq!(device.compiled_shaders().len(), 1);
}

#[test]
fn simple_sprites_share_one_buffer_pair() {
    let (atlas, _ctx, device) = load();
    let shared = atlas.shared_geometry().expect("simple sprites present");
    // shared pair plus one pair per sliced sprite
    assert_eq!(device.live_buffers(), 6);

    let mut ranges = Vec::new();
    for name in ["dot", "gem", "star"] {
        let s = atlas.get_sprite_as::<SimpleSprite>(name).unwrap();
        assert_eq!(s.geometry().vertices.id(), shared.vertices.id());
        ranges.push(s.index_range());
    }
    assert_eq!(ranges, [(0, 6), (6, 6), (12, 6)]);

    let idx = indices(&device.buffer(shared.indices.id()).unwrap().data);
    assert_eq!(idx.len(), 18);
    assert_eq!(&idx[6..12], &[4, 5, 6, 6, 7, 4]);
    assert_eq!(vertices(&device.buffer(shared.vertices.id()).unwrap().data).len(), 12);
}

#[test]
fn simple_quad_honours_pivot_and_tint() {
    let (atlas, _ctx, device) = load();
    let gem = atlas.get_sprite_as::<SimpleSprite>("gem").unwrap();
    assert_eq!(gem.bounds(), (Vec2::splat(-8.0), Vec2::splat(8.0)));
    assert_eq!(gem.size(), Vec2::splat(16.0));

    let shared = atlas.shared_geometry().unwrap();
    let verts = vertices(&device.buffer(shared.vertices.id()).unwrap().data);
    let quad = &verts[4..8];
    assert_eq!(quad[0].position, [-8.0, -8.0, 0.0]);
    assert_eq!(quad[2].position, [8.0, 8.0, 0.0]);
    assert_eq!(quad[0].color[0], 1.0);
    assert!((quad[0].color[3] - 128.0 / 255.0).abs() < 1e-6);
    // bottom-left samples the bottom row of the source rect
    assert_eq!(quad[0].uv, [8.0 / 64.0, 16.0 / 64.0]);
    assert_eq!(quad[2].uv, [24.0 / 64.0, 0.0]);

    let rect = atlas.sprite("gem").unwrap().source_uv().to_pixels(atlas.sheet_size());
    assert_eq!(rect, Rect::new(8, 0, 16, 16));
}

#[test]
fn sliced_sprites_get_their_own_buffers() {
    let (atlas, _ctx, device) = load();
    let panel = atlas.get_sprite_as::<SlicedSprite>("panel").unwrap();
    assert_eq!(panel.border(), Border::uniform(4.0));
    assert_eq!(panel.size(), Vec2::splat(32.0));
    assert_eq!(panel.vertex_count(), 16);
    assert_eq!(panel.index_count(), 54);
    let shared = atlas.shared_geometry().unwrap();
    assert_ne!(panel.vertex_buffer().id(), shared.vertices.id());
    let data = device.buffer(panel.index_buffer().id()).unwrap().data;
    assert_eq!(indices(&data).len(), 54);
}

#[test]
fn unknown_names_report_name_and_origin() {
    let (atlas, _ctx, _device) = load();
    let err = atlas.get_sprite("missing").unwrap_err();
    assert!(matches!(err, AtlasError::NotFound { .. }));
    let msg = err.to_string();
    assert!(msg.contains("missing") && msg.contains(ORIGIN), "{msg}");
    assert!(!atlas.contains("missing"));
}

#[test]
fn wrong_kind_is_reported() {
    let (atlas, _ctx, device) = load();
    let buffers = device.live_buffers();
    match atlas.get_sprite_as::<SlicedSprite>("dot") {
        Err(AtlasError::WrongKind {
            name,
            atlas: origin,
            expected,
            actual,
        }) => {
            assert_eq!(name, "dot");
            assert_eq!(origin, ORIGIN);
            assert_eq!((expected, actual), ("sliced", "simple"));
        }
        other => panic!("expected WrongKind, got {other:?}"),
    }
    assert!(matches!(
        atlas.get_sprite_as::<SimpleSprite>("panel"),
        Err(AtlasError::WrongKind { .. })
    ));
    // a failed lookup allocates nothing
    assert_eq!(device.live_buffers(), buffers);

    let any = atlas.get_sprite_as::<Sprite>("panel").unwrap();
    assert!(any.is_sliced());
    assert_eq!(any.kind(), "sliced");
}

#[test]
fn sliced_clones_resize_independently() {
    let (atlas, _ctx, device) = load();
    let mut a = atlas.get_sprite_as::<SlicedSprite>("strip").unwrap();
    let b = atlas.get_sprite_as::<SlicedSprite>("strip").unwrap();
    assert_ne!(a.vertex_buffer().id(), b.vertex_buffer().id());
    let before = device.buffer(b.vertex_buffer().id()).unwrap();

    a.resize(Vec2::new(200.0, 16.0)).unwrap();
    assert_eq!(a.size(), Vec2::new(200.0, 16.0));
    assert!(a.vertex_count() > b.vertex_count());
    assert_eq!(b.size(), Vec2::new(32.0, 16.0));
    assert_eq!(device.buffer(b.vertex_buffer().id()).unwrap(), before);

    // the stored sprite is untouched too
    let fresh = atlas.get_sprite("strip").unwrap();
    assert_eq!(fresh.size(), Vec2::new(32.0, 16.0));
}

#[test]
fn resize_to_same_size_skips_the_upload() {
    let (atlas, _ctx, device) = load();
    let mut panel = atlas.get_sprite_as::<SlicedSprite>("panel").unwrap();
    let id = panel.vertex_buffer().id();
    let uploads = device.buffer(id).unwrap().uploads;
    panel.resize(Vec2::splat(32.0)).unwrap();
    assert_eq!(device.buffer(id).unwrap().uploads, uploads);
    panel.resize(Vec2::splat(48.0)).unwrap();
    assert_eq!(device.buffer(id).unwrap().uploads, uploads + 1);

    assert!(matches!(
        panel.resize(Vec2::new(f32::NAN, 1.0)),
        Err(AtlasError::InvalidInput(_))
    ));
    assert!(matches!(
        panel.resize(Vec2::new(-1.0, 1.0)),
        Err(AtlasError::InvalidInput(_))
    ));
}

#[test]
fn oversized_tiling_is_refused() {
    let (atlas, _ctx, device) = load();
    let mut strip = atlas.get_sprite_as::<SlicedSprite>("strip").unwrap();
    let id = strip.vertex_buffer().id();
    let uploads = device.buffer(id).unwrap().uploads;

    // 24 px middle tiles; 24 * MAX_TILES + borders is the widest accepted size
    let widest = 24.0 * MAX_TILES as f32 + 8.0;
    assert!(matches!(
        strip.resize(Vec2::new(widest + 24.0, 16.0)),
        Err(AtlasError::InvalidInput(_))
    ));
    assert!(matches!(
        strip.resize(Vec2::new(4.0e8, 16.0)),
        Err(AtlasError::InvalidInput(_))
    ));
    assert_eq!(strip.size(), Vec2::new(32.0, 16.0));
    assert_eq!(device.buffer(id).unwrap().uploads, uploads);

    strip.resize(Vec2::new(widest, 16.0)).unwrap();
    assert_eq!(strip.size().x, widest);

    // stretched axes never tile, however large
    let mut panel = atlas.get_sprite_as::<SlicedSprite>("panel").unwrap();
    panel.resize(Vec2::splat(1.0e9)).unwrap();
    assert_eq!(panel.vertex_count(), 16);
}

#[test]
fn simple_resize_keeps_natural_size() {
    let (atlas, _ctx, _device) = load();
    let mut dot = atlas.get_sprite("dot").unwrap();
    dot.resize(Vec2::splat(100.0)).unwrap();
    assert_eq!(dot.size(), Vec2::splat(8.0));
}

#[test]
fn draws_issue_the_right_ranges() {
    let (atlas, _ctx, device) = load();
    let transform = Mat4::from_translation(glam::Vec3::new(10.0, 20.0, 0.0));
    let star = atlas.get_sprite("star").unwrap();
    star.draw(&transform).unwrap();
    let panel = atlas.get_sprite("panel").unwrap();
    panel.draw(&Mat4::IDENTITY).unwrap();

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!((draws[0].index_offset, draws[0].index_count), (12, 6));
    assert_eq!(draws[0].transform, transform);
    assert_eq!(draws[0].texture, atlas.material().texture().id());
    assert_eq!((draws[1].index_offset, draws[1].index_count), (0, 54));
    assert_eq!(draws[1].shader, atlas.material().shader());
}

#[test]
fn all_sliced_atlas_has_no_shared_geometry() {
    let (ctx, device) = GraphicsContext::headless();
    let dir = SpriteDirectory {
        filter_mode: FilterMode::Nearest,
        sprites: common::directory()
            .sprites
            .into_iter()
            .filter(|(_, d)| d.is_sliced())
            .collect(),
    };
    let atlas = Atlas::from_bytes(&ctx, &package_with(&dir, &sheet_png(64, 64)), ORIGIN).unwrap();
    assert!(atlas.shared_geometry().is_none());
    assert_eq!(device.live_buffers(), 4);
}

#[test]
fn from_path_uses_the_path_as_origin() {
    let path = std::env::temp_dir().join(format!("sprite-atlas-{}-load.atlas", std::process::id()));
    std::fs::write(&path, package()).unwrap();
    let (ctx, _device) = GraphicsContext::headless();
    let atlas = Atlas::from_path(&ctx, &path).expect("load");
    assert_eq!(atlas.origin(), path.display().to_string());
    let err = atlas.get_sprite("nope").unwrap_err().to_string();
    assert!(err.contains(&path.display().to_string()));
    let _ = std::fs::remove_file(&path);
}
