// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Extraction of quantized DCT coefficients from JPEG images.
//!
//! This crate reads the frequency-domain representation stored inside a
//! JPEG file directly, without reconstructing pixels. Baseline sequential
//! and Huffman progressive streams are supported. The result is one
//! band per color plane: a flat buffer of `i16` coefficients laid out as
//! `height_blocks × width_blocks × 64`, with the 64 per-block values in
//! natural (raster) order. Bands can optionally be dequantized by the
//! image's own quantization tables.
//!
//! Images whose chroma subsampling differs from the 2×2/1×1/1×1 layout
//! are first transcoded through a pixel-domain round trip at quality 100,
//! so their coefficients are a near-lossless approximation of the
//! original ones rather than a bit-exact copy. See
//! [`extract_bands`](extract::extract_bands) for details.

#![deny(unsafe_code)]
pub mod bit_reader;
pub mod decode;
pub mod error;
pub mod extract;
pub mod headers;
pub mod huffman;
pub mod idct;
pub mod markers;
pub mod scan;
pub mod transcode;

pub use error::{Error, Result};
pub use extract::{
    Band, ExtractOptions, PlaneBand, PlaneCount, extract_bands, extract_bands_from_file,
};

/// Spatial size of a DCT block along one axis.
pub const BLOCK_DIM: usize = 8;
/// Number of coefficients in one DCT block.
pub const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
