// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Floating-point 8×8 inverse DCT.
//!
//! Only used on the transcode path, where images with a non-canonical
//! sampling layout take a full pixel-domain round trip; precision and
//! simplicity matter more than throughput here.

use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::{BLOCK_DIM, BLOCK_SIZE};

/// cos((2x + 1) u π / 16), indexed `[x][u]`.
fn cos_table() -> &'static [[f32; BLOCK_DIM]; BLOCK_DIM] {
    static TABLE: OnceLock<[[f32; BLOCK_DIM]; BLOCK_DIM]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0; BLOCK_DIM]; BLOCK_DIM];
        for (x, row) in table.iter_mut().enumerate() {
            for (u, entry) in row.iter_mut().enumerate() {
                *entry = ((2 * x + 1) as f32 * u as f32 * PI / 16.0).cos();
            }
        }
        table
    })
}

const INV_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;

fn idct_1d(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let cos = cos_table();
    for x in 0..BLOCK_DIM {
        let mut sum = 0.0;
        for u in 0..BLOCK_DIM {
            let cu = if u == 0 { INV_SQRT_2 } else { 1.0 };
            sum += cu * input[u] * cos[x][u];
        }
        output[x] = 0.5 * sum;
    }
}

/// In-place inverse DCT of one block in natural (raster) order.
pub fn idct_8x8(block: &mut [f32; BLOCK_SIZE]) {
    let mut row_in = [0.0f32; BLOCK_DIM];
    let mut row_out = [0.0f32; BLOCK_DIM];
    for y in 0..BLOCK_DIM {
        row_in.copy_from_slice(&block[y * BLOCK_DIM..(y + 1) * BLOCK_DIM]);
        idct_1d(&row_in, &mut row_out);
        block[y * BLOCK_DIM..(y + 1) * BLOCK_DIM].copy_from_slice(&row_out);
    }
    for x in 0..BLOCK_DIM {
        for y in 0..BLOCK_DIM {
            row_in[y] = block[y * BLOCK_DIM + x];
        }
        idct_1d(&row_in, &mut row_out);
        for y in 0..BLOCK_DIM {
            block[y * BLOCK_DIM + x] = row_out[y];
        }
    }
}
