// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Band extraction: the coefficient copy loop and the per-plane
//! assembly around it.

use std::path::Path;

use tracing::debug;

use crate::BLOCK_SIZE;
use crate::decode::Decoder;
use crate::error::Result;
use crate::transcode::{is_canonical_h2v2, is_grayscale, normalize_layout};

/// The extracted coefficients of one color plane.
///
/// `coefficients` holds `height_blocks × width_blocks` blocks in row-major
/// order, 64 values per block in natural (raster) order. The buffer is
/// freshly allocated per call and exclusively owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    coefficients: Vec<i16>,
    height_blocks: usize,
    width_blocks: usize,
}

impl Band {
    pub fn coefficients(&self) -> &[i16] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<i16> {
        self.coefficients
    }

    pub fn height_blocks(&self) -> usize {
        self.height_blocks
    }

    pub fn width_blocks(&self) -> usize {
        self.width_blocks
    }

    /// Number of coefficients per block; always 64.
    pub fn block_depth(&self) -> usize {
        BLOCK_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// A returned plane: either read from the image or synthesized because
/// the image has fewer planes than requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneBand {
    Present(Band),
    Synthesized(Band),
}

impl PlaneBand {
    pub fn band(&self) -> &Band {
        match self {
            PlaneBand::Present(band) | PlaneBand::Synthesized(band) => band,
        }
    }

    pub fn into_band(self) -> Band {
        match self {
            PlaneBand::Present(band) | PlaneBand::Synthesized(band) => band,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, PlaneBand::Synthesized(_))
    }
}

/// How many planes to return, independent of the image's plane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneCount {
    One,
    Three,
}

impl PlaneCount {
    fn count(self) -> usize {
        match self {
            PlaneCount::One => 1,
            PlaneCount::Three => 3,
        }
    }
}

/// Extraction configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Multiply each coefficient by its quantization-table entry.
    pub normalized: bool,
    /// Number of planes to return.
    pub planes: PlaneCount,
}

impl Default for ExtractOptions {
    fn default() -> ExtractOptions {
        ExtractOptions {
            normalized: false,
            planes: PlaneCount::Three,
        }
    }
}

/// Extracts the quantized DCT coefficients of `data`.
///
/// Returns exactly 1 or 3 bands, per `options.planes`. When three planes
/// are requested from a grayscale image, planes 1 and 2 are zero-filled
/// [`PlaneBand::Synthesized`] bands sized at half the luma block grid
/// (rounded up), matching the chroma geometry of 2×2/1×1/1×1 subsampling.
///
/// Color images with a non-canonical subsampling layout are transcoded
/// through a quality-100 pixel round trip first; their coefficients are
/// therefore requantized approximations of the originals.
pub fn extract_bands(data: &[u8], options: ExtractOptions) -> Result<Vec<PlaneBand>> {
    let mut decoder = Decoder::new(data)?;
    let frame = decoder.frame();
    if !is_grayscale(frame) && !is_canonical_h2v2(frame) {
        decoder = normalize_layout(decoder)?;
    }

    debug!(
        planes = decoder.frame().components.len(),
        requested = options.planes.count(),
        normalized = options.normalized,
        "extracting coefficient bands"
    );

    let mut bands = Vec::with_capacity(options.planes.count());
    for plane in 0..options.planes.count() {
        bands.push(extract_plane(&decoder, plane, options.normalized)?);
    }
    Ok(bands)
}

/// Extracts bands from a JPEG file on disk. See [`extract_bands`].
pub fn extract_bands_from_file(
    path: impl AsRef<Path>,
    options: ExtractOptions,
) -> Result<Vec<PlaneBand>> {
    let data = std::fs::read(path)?;
    extract_bands(&data, options)
}

/// Copies one plane's coefficients out of its grid, or synthesizes a
/// placeholder when the plane does not exist in the image.
fn extract_plane(decoder: &Decoder, plane: usize, normalized: bool) -> Result<PlaneBand> {
    let frame = decoder.frame();
    if plane >= frame.components.len() {
        return Ok(PlaneBand::Synthesized(placeholder_band(decoder)));
    }

    let height_blocks = frame.height_in_blocks(plane);
    let width_blocks = frame.width_in_blocks(plane);
    let table = decoder.quant_table(frame.components[plane].quant_idx)?;
    let grid = &decoder.coefficients()[plane];

    let mut coefficients = Vec::with_capacity(height_blocks * width_blocks * BLOCK_SIZE);
    for row in 0..height_blocks {
        for col in 0..width_blocks {
            let block = grid.block(row, col);
            if normalized {
                // Truncating to i16 on overflow matches the C `short`
                // arithmetic of the reference pipelines.
                coefficients.extend(
                    block
                        .iter()
                        .zip(table.values.iter())
                        .map(|(&coeff, &scale)| (coeff as i32 * scale as i32) as i16),
                );
            } else {
                coefficients.extend_from_slice(block);
            }
        }
    }

    Ok(PlaneBand::Present(Band {
        coefficients,
        height_blocks,
        width_blocks,
    }))
}

/// A zero-filled stand-in for a missing chroma plane, sized at half the
/// luma block grid (rounded up) in both dimensions.
fn placeholder_band(decoder: &Decoder) -> Band {
    let frame = decoder.frame();
    let height_blocks = frame.height_in_blocks(0).div_ceil(2);
    let width_blocks = frame.width_in_blocks(0).div_ceil(2);
    Band {
        coefficients: vec![0; height_blocks * width_blocks * BLOCK_SIZE],
        height_blocks,
        width_blocks,
    }
}
