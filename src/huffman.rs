// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman decoding for JPEG entropy-coded scans (ITU-T T.81,
//! F.2.2).

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

pub const MAX_HUFFMAN_BITS: usize = 16;

/// A Huffman table as defined by a DHT segment: the number of codes of
/// each length, plus the symbol assigned to each code in code order.
#[derive(Debug, Clone)]
pub struct HuffmanSpec {
    pub counts: [u8; MAX_HUFFMAN_BITS],
    pub symbols: Vec<u8>,
}

/// Decode tables derived from a [`HuffmanSpec`].
///
/// Uses the per-length min/max code ranges of T.81 F.2.2.3: a code is
/// extended one bit at a time until it falls inside the valid range for
/// its length.
pub struct HuffmanTable {
    min_code: [i32; MAX_HUFFMAN_BITS + 1],
    max_code: [i32; MAX_HUFFMAN_BITS + 1],
    val_offset: [i32; MAX_HUFFMAN_BITS + 1],
    symbols: Vec<u8>,
}

impl HuffmanTable {
    pub fn build(spec: &HuffmanSpec) -> Result<HuffmanTable> {
        let mut min_code = [0i32; MAX_HUFFMAN_BITS + 1];
        let mut max_code = [-1i32; MAX_HUFFMAN_BITS + 1];
        let mut val_offset = [0i32; MAX_HUFFMAN_BITS + 1];

        let mut code: i32 = 0;
        let mut k: usize = 0;
        for len in 1..=MAX_HUFFMAN_BITS {
            let n = spec.counts[len - 1] as i32;
            if n > 0 {
                val_offset[len] = k as i32;
                min_code[len] = code;
                code += n;
                k += n as usize;
                max_code[len] = code - 1;
            }
            // The canonical code space of this length must not overflow.
            if code > (1 << len) {
                return Err(Error::InvalidHuffmanTable);
            }
            code <<= 1;
        }
        if k != spec.symbols.len() {
            return Err(Error::InvalidHuffmanTable);
        }

        Ok(HuffmanTable {
            min_code,
            max_code,
            val_offset,
            symbols: spec.symbols.clone(),
        })
    }

    /// Decodes the next symbol from `reader`.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let mut code: i32 = 0;
        for len in 1..=MAX_HUFFMAN_BITS {
            code = (code << 1) | reader.read_bit()? as i32;
            if code <= self.max_code[len] {
                let index = self.val_offset[len] + (code - self.min_code[len]);
                return Ok(self.symbols[index as usize]);
            }
        }
        Err(Error::BadHuffmanCode)
    }
}

/// Sign-extends a magnitude-coded value of `size` bits (T.81 F.2.2.1,
/// the EXTEND procedure).
pub fn extend_sign(value: u16, size: u8) -> i16 {
    if size == 0 {
        return 0;
    }
    if (value as i32) < (1 << (size - 1)) {
        (value as i32 - (1 << size) + 1) as i16
    } else {
        value as i16
    }
}
