// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! End-to-end band extraction tests over synthesized JPEG inputs.

use jpeg2dct::{Error, ExtractOptions, PlaneCount, extract_bands, extract_bands_from_file};
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

fn rgb_noise(width: u16, height: u16) -> Vec<u8> {
    let mut rng = XorShiftRng::seed_from_u64(0x6a70_6567);
    (0..width as usize * height as usize * 3)
        .map(|_| rng.random())
        .collect()
}

fn encode_rgb(width: u16, height: u16, sampling: SamplingFactor, quality: u8) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut encoder = Encoder::new(&mut encoded, quality);
    encoder.set_sampling_factor(sampling);
    encoder
        .encode(&rgb_noise(width, height), width, height, ColorType::Rgb)
        .unwrap();
    encoded
}

fn encode_gray(width: u16, height: u16, quality: u8) -> Vec<u8> {
    let samples: Vec<u8> = (0..width as usize * height as usize)
        .map(|i| ((i * 31) % 256) as u8)
        .collect();
    let mut encoded = Vec::new();
    let encoder = Encoder::new(&mut encoded, quality);
    encoder
        .encode(&samples, width, height, ColorType::Luma)
        .unwrap();
    encoded
}

#[test]
fn canonical_color_image_shapes() {
    let encoded = encode_rgb(512, 512, SamplingFactor::F_2_2, 75);
    let bands = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    assert_eq!(bands.len(), 3);

    let luma = bands[0].band();
    assert!(!bands[0].is_synthesized());
    assert_eq!((luma.height_blocks(), luma.width_blocks()), (64, 64));
    assert_eq!(luma.coefficients().len(), 64 * 64 * 64);

    for chroma in &bands[1..] {
        assert!(!chroma.is_synthesized());
        let band = chroma.band();
        assert_eq!((band.height_blocks(), band.width_blocks()), (32, 32));
        assert_eq!(band.coefficients().len(), 32 * 32 * 64);
    }
}

#[test]
fn canonical_odd_dimensions_round_up() {
    let encoded = encode_rgb(17, 9, SamplingFactor::F_2_2, 80);
    let bands = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    let luma = bands[0].band();
    assert_eq!((luma.height_blocks(), luma.width_blocks()), (2, 3));
    let chroma = bands[1].band();
    assert_eq!((chroma.height_blocks(), chroma.width_blocks()), (1, 2));
}

#[test]
fn grayscale_placeholders_are_zero_filled() {
    let encoded = encode_gray(100, 100, 85);
    let bands = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    assert_eq!(bands.len(), 3);
    assert!(!bands[0].is_synthesized());
    assert_eq!(bands[0].band().height_blocks(), 13);
    assert_eq!(bands[0].band().width_blocks(), 13);
    for plane in &bands[1..] {
        assert!(plane.is_synthesized());
        let band = plane.band();
        assert_eq!((band.height_blocks(), band.width_blocks()), (7, 7));
        assert!(band.coefficients().iter().all(|&c| c == 0));
    }
}

#[test]
fn grayscale_single_plane_request() {
    let encoded = encode_gray(8, 8, 90);
    let bands = extract_bands(
        &encoded,
        ExtractOptions {
            planes: PlaneCount::One,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(bands.len(), 1);
    let band = bands[0].band();
    assert_eq!((band.height_blocks(), band.width_blocks()), (1, 1));
    assert_eq!(band.coefficients().len(), 64);
}

#[test_log::test]
fn irregular_444_layout_is_transcoded() {
    let encoded = encode_rgb(100, 70, SamplingFactor::F_1_1, 95);
    let bands = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    assert_eq!(bands.len(), 3);

    // Plane 0 keeps the full-resolution block grid.
    let luma = bands[0].band();
    assert!(!bands[0].is_synthesized());
    assert_eq!((luma.height_blocks(), luma.width_blocks()), (9, 13));

    // Chroma comes back at the canonical half resolution.
    for chroma in &bands[1..] {
        assert!(!chroma.is_synthesized());
        let band = chroma.band();
        assert_eq!((band.height_blocks(), band.width_blocks()), (5, 7));
    }
}

#[test_log::test]
fn irregular_422_layout_is_transcoded() {
    let encoded = encode_rgb(64, 64, SamplingFactor::F_2_1, 90);
    let bands = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    let luma = bands[0].band();
    assert_eq!((luma.height_blocks(), luma.width_blocks()), (8, 8));
    let chroma = bands[1].band();
    assert_eq!((chroma.height_blocks(), chroma.width_blocks()), (4, 4));
}

#[test]
fn extraction_is_idempotent() {
    let encoded = encode_rgb(96, 64, SamplingFactor::F_2_2, 70);
    let options = ExtractOptions {
        normalized: true,
        planes: PlaneCount::Three,
    };
    let first = extract_bands(&encoded, options).unwrap();
    let second = extract_bands(&encoded, options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn restart_markers_do_not_change_coefficients() {
    let pixels = rgb_noise(64, 48);
    let encode = |restart: Option<u16>| {
        let mut encoded = Vec::new();
        let mut encoder = Encoder::new(&mut encoded, 75);
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        if let Some(interval) = restart {
            encoder.set_restart_interval(interval);
        }
        encoder.encode(&pixels, 64, 48, ColorType::Rgb).unwrap();
        encoded
    };

    let plain = extract_bands(&encode(None), ExtractOptions::default()).unwrap();
    let restarted = extract_bands(&encode(Some(4)), ExtractOptions::default()).unwrap();
    assert_eq!(plain, restarted);
}

#[test]
fn malformed_inputs_error_without_panicking() {
    assert!(extract_bands(&[], ExtractOptions::default()).is_err());
    assert!(extract_bands(b"definitely not a jpeg", ExtractOptions::default()).is_err());

    let valid = encode_rgb(64, 64, SamplingFactor::F_2_2, 75);
    // Truncated mid-header.
    assert!(extract_bands(&valid[..20], ExtractOptions::default()).is_err());
    // Truncated mid-scan.
    assert!(extract_bands(&valid[..valid.len() / 2], ExtractOptions::default()).is_err());
}

#[test]
fn progressive_color_matches_baseline_coefficients() {
    // Progressive encoding reorganizes the entropy-coded data without
    // touching the quantized coefficients, so both encodes of the same
    // pixels must extract identically.
    let pixels = rgb_noise(64, 48);
    let encode = |progressive: bool| {
        let mut encoded = Vec::new();
        let mut encoder = Encoder::new(&mut encoded, 80);
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        encoder.set_progressive(progressive);
        encoder.encode(&pixels, 64, 48, ColorType::Rgb).unwrap();
        encoded
    };

    let baseline = extract_bands(&encode(false), ExtractOptions::default()).unwrap();
    let progressive = extract_bands(&encode(true), ExtractOptions::default()).unwrap();
    assert_eq!(baseline, progressive);
}

#[test]
fn progressive_grayscale_matches_baseline_coefficients() {
    let samples: Vec<u8> = (0..100usize * 70).map(|i| ((i * 31) % 256) as u8).collect();
    let encode = |progressive: bool| {
        let mut encoded = Vec::new();
        let mut encoder = Encoder::new(&mut encoded, 85);
        encoder.set_progressive(progressive);
        encoder.encode(&samples, 100, 70, ColorType::Luma).unwrap();
        encoded
    };

    let baseline = extract_bands(&encode(false), ExtractOptions::default()).unwrap();
    let progressive = extract_bands(&encode(true), ExtractOptions::default()).unwrap();
    assert_eq!(baseline, progressive);
    assert_eq!(progressive[0].band().height_blocks(), 9);
    assert_eq!(progressive[0].band().width_blocks(), 13);
}

#[test]
fn file_entry_point_matches_buffer_entry_point() {
    let encoded = encode_rgb(48, 32, SamplingFactor::F_2_2, 75);
    let path = std::env::temp_dir().join("jpeg2dct_extract_test.jpg");
    std::fs::write(&path, &encoded).unwrap();

    let from_file = extract_bands_from_file(&path, ExtractOptions::default()).unwrap();
    let from_buffer = extract_bands(&encoded, ExtractOptions::default()).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(from_file, from_buffer);
}

#[test]
fn missing_file_is_an_io_error() {
    let missing = std::env::temp_dir().join("jpeg2dct_no_such_file.jpg");
    assert!(matches!(
        extract_bands_from_file(&missing, ExtractOptions::default()),
        Err(Error::Io(_))
    ));
}
