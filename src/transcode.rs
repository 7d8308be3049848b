// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Sampling-layout inspection and normalization.
//!
//! Coefficient extraction assumes the canonical 2×2/1×1/1×1 chroma
//! subsampling layout. Color images with any other layout are forced
//! through a pixel-domain round trip: decode, re-encode at quality 100
//! with canonical sampling, then re-parse the re-encoded bytes.

use std::sync::Once;

use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use tracing::warn;

use crate::decode::Decoder;
use crate::error::Result;
use crate::headers::FrameHeader;

/// Quality used for the normalization re-encode. Near-lossless, but the
/// resulting coefficients are requantized rather than copied bit-exact.
const TRANSCODE_QUALITY: u8 = 100;

static LAYOUT_DIAGNOSTIC: Once = Once::new();

/// Whether the image has a single plane.
pub fn is_grayscale(frame: &FrameHeader) -> bool {
    frame.components.len() == 1
}

/// Whether the image uses the canonical layout: luma sampled at (2,2)
/// and both chroma planes at (1,1).
pub fn is_canonical_h2v2(frame: &FrameHeader) -> bool {
    frame.components.len() == 3
        && frame.components[0].h_samp == 2
        && frame.components[0].v_samp == 2
        && frame.components[1].h_samp == 1
        && frame.components[1].v_samp == 1
        && frame.components[2].h_samp == 1
        && frame.components[2].v_samp == 1
}

/// Rebuilds `decoder` around a canonically-subsampled re-encode of its
/// image.
///
/// The intermediate sample buffer and the re-encoded bytes live only for
/// the duration of this call; the returned decoder owns a fresh copy of
/// the transcoded stream and has its header parsed.
pub fn normalize_layout(decoder: Decoder) -> Result<Decoder> {
    LAYOUT_DIAGNOSTIC.call_once(|| {
        warn!(
            "non-canonical JPEG sampling layout encountered; transcoding to \
             2x2/1x1/1x1 at quality 100, which may impact performance \
             (reported once per process)"
        );
    });

    let frame = decoder.frame();
    let (width, height) = (frame.width, frame.height);
    let samples = decoder.decode_pixels()?;

    // Grayscale never reaches this path and two-component frames are
    // rejected at parse, so the image is 3-plane YCbCr: re-encode it
    // with 4:2:0 sampling.
    let mut encoded = Vec::new();
    let mut encoder = Encoder::new(&mut encoded, TRANSCODE_QUALITY);
    encoder.set_sampling_factor(SamplingFactor::F_2_2);
    encoder.encode(&samples, width, height, ColorType::Ycbcr)?;
    drop(samples);

    Decoder::new(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Component;

    fn frame(factors: &[(u8, u8)]) -> FrameHeader {
        let components = factors
            .iter()
            .enumerate()
            .map(|(i, &(h_samp, v_samp))| Component {
                id: i as u8 + 1,
                h_samp,
                v_samp,
                quant_idx: 0,
            })
            .collect::<Vec<_>>();
        let max_h_samp = components.iter().map(|c| c.h_samp).max().unwrap();
        let max_v_samp = components.iter().map(|c| c.v_samp).max().unwrap();
        FrameHeader {
            width: 64,
            height: 64,
            precision: 8,
            progressive: false,
            components,
            max_h_samp,
            max_v_samp,
            mcus_wide: 64usize.div_ceil(max_h_samp as usize * 8),
            mcus_tall: 64usize.div_ceil(max_v_samp as usize * 8),
        }
    }

    #[test]
    fn grayscale_is_single_plane() {
        assert!(is_grayscale(&frame(&[(1, 1)])));
        assert!(!is_grayscale(&frame(&[(2, 2), (1, 1), (1, 1)])));
    }

    #[test]
    fn canonical_requires_h2v2_luma_and_h1v1_chroma() {
        assert!(is_canonical_h2v2(&frame(&[(2, 2), (1, 1), (1, 1)])));
        // 4:4:4
        assert!(!is_canonical_h2v2(&frame(&[(1, 1), (1, 1), (1, 1)])));
        // 4:2:2
        assert!(!is_canonical_h2v2(&frame(&[(2, 1), (1, 1), (1, 1)])));
        // odd chroma factors
        assert!(!is_canonical_h2v2(&frame(&[(2, 2), (2, 1), (1, 1)])));
        // grayscale never reaches the canonicality check
        assert!(!is_canonical_h2v2(&frame(&[(1, 1)])));
    }
}
