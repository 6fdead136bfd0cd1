use glam::Vec2;
use sprite_atlas_core::codec::{decode_directory, encode_directory, write_str};
use sprite_atlas_core::prelude::*;

fn def(x: f32, y: f32, w: f32, h: f32) -> SpriteDefinition {
    SpriteDefinition {
        position: Vec2::new(x, y),
        size: Vec2::new(w, h),
        ..Default::default()
    }
}

fn corpus() -> SpriteDirectory {
    let mut sprites = vec![
        ("pixel".to_string(), def(0.0, 0.0, 1.0, 1.0)),
        ("odd".to_string(), def(3.0, 5.0, 17.0, 9.0)),
        (
            "pivot".to_string(),
            SpriteDefinition {
                origin: Vec2::new(0.5, 1.0),
                color: "#80FF8000".into(),
                ..def(20.0, 0.0, 12.0, 12.0)
            },
        ),
        ("ünïcode ✓".to_string(), def(40.0, 40.0, 2.0, 3.0)),
    ];
    for (i, (tx, ty, hollow)) in [
        (false, false, false),
        (true, false, false),
        (false, true, true),
        (true, true, true),
    ]
    .into_iter()
    .enumerate()
    {
        sprites.push((
            format!("panel{i}"),
            SpriteDefinition {
                border: Border::new(4.0, 3.0, 2.0, 1.0),
                tile_x: tx,
                tile_y: ty,
                hollow,
                ..def(64.0 + 32.0 * i as f32, 0.0, 24.0, 20.0)
            },
        ));
    }
    SpriteDirectory {
        filter_mode: FilterMode::Trilinear,
        sprites,
    }
}

fn encode(dir: &SpriteDirectory) -> Vec<u8> {
    let mut out = Vec::new();
    encode_directory(dir, &mut out).expect("encode");
    out
}

fn header(mode: i32, count: i32) -> Vec<u8> {
    let mut out = mode.to_le_bytes().to_vec();
    out.extend_from_slice(&count.to_le_bytes());
    out
}

#[test]
fn directory_survives_encode_decode() {
    let dir = corpus();
    let decoded = decode_directory(&encode(&dir)).expect("decode");
    assert_eq!(decoded, dir);
    let names: Vec<&str> = decoded.sprites.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names[0], "pixel");
    assert_eq!(names.last().copied(), Some("panel3"));
}

#[test]
fn empty_directory_is_eight_bytes() {
    let dir = SpriteDirectory::default();
    let bytes = encode(&dir);
    assert_eq!(bytes, header(0, 0));
    assert_eq!(decode_directory(&bytes).expect("decode"), dir);
}

#[test]
fn record_layout_is_little_endian() {
    let dir = SpriteDirectory {
        filter_mode: FilterMode::Linear,
        sprites: vec![("ab".into(), def(1.0, 2.0, 3.0, 4.0))],
    };
    let bytes = encode(&dir);
    let mut expected = header(1, 1);
    expected.extend_from_slice(&[2, b'a', b'b']);
    for v in [1.0f32, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0] {
        expected.extend_from_slice(&v.to_le_bytes());
    }
    expected.extend_from_slice(&[0, 0, 0]);
    write_str(&mut expected, "#FFFFFFFF").unwrap();
    assert_eq!(bytes, expected);
}

#[test]
fn every_truncation_is_rejected() {
    let bytes = encode(&corpus());
    for len in 0..bytes.len() {
        assert!(
            decode_directory(&bytes[..len]).is_err(),
            "prefix of {len} bytes decoded"
        );
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = encode(&corpus());
    bytes.extend_from_slice(&[0, 0]);
    assert_eq!(decode_directory(&bytes), Err(FormatError::TrailingBytes(2)));
}

#[test]
fn bad_header_values_are_rejected() {
    assert_eq!(
        decode_directory(&header(7, 0)),
        Err(FormatError::UnknownFilterMode(7))
    );
    assert_eq!(
        decode_directory(&header(0, -1)),
        Err(FormatError::NegativeCount(-1))
    );
    // a huge count over a short body fails without allocating for it
    assert!(matches!(
        decode_directory(&header(0, i32::MAX)),
        Err(FormatError::Truncated(_))
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    let dir = SpriteDirectory {
        filter_mode: FilterMode::Nearest,
        sprites: vec![
            ("twin".into(), def(0.0, 0.0, 1.0, 1.0)),
            ("twin".into(), def(1.0, 0.0, 1.0, 1.0)),
        ],
    };
    assert_eq!(
        decode_directory(&encode(&dir)),
        Err(FormatError::DuplicateSprite("twin".into()))
    );
}

#[test]
fn invalid_utf8_name_is_rejected() {
    let mut bytes = header(0, 1);
    bytes.extend_from_slice(&[2, 0xff, 0xfe]);
    bytes.extend_from_slice(&[0u8; 43]);
    assert_eq!(decode_directory(&bytes), Err(FormatError::InvalidUtf8));
}
