// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Parsing of JPEG header segments: SOF, DQT, DHT, SOS and DRI.
//!
//! Quantization tables and coefficient blocks are kept in natural
//! (raster) order; the zigzag ordering of the wire format is undone at
//! parse time, the same convention libjpeg uses in memory.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::huffman::{HuffmanSpec, MAX_HUFFMAN_BITS};
use crate::markers::Marker;
use crate::{BLOCK_DIM, BLOCK_SIZE};

/// Maps a zigzag position to its natural (raster) block position.
#[rustfmt::skip]
pub const ZIGZAG_TO_NATURAL: [usize; BLOCK_SIZE] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// One color component as declared by SOF.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub quant_idx: u8,
}

/// Frame-level state parsed from a SOF segment.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub width: u16,
    pub height: u16,
    pub precision: u8,
    /// True for SOF2 frames, whose coefficients arrive over several
    /// spectral-selection / successive-approximation scans.
    pub progressive: bool,
    pub components: Vec<Component>,
    pub max_h_samp: u8,
    pub max_v_samp: u8,
    /// Number of MCU columns in an interleaved scan.
    pub mcus_wide: usize,
    /// Number of MCU rows in an interleaved scan.
    pub mcus_tall: usize,
}

impl FrameHeader {
    /// True block-grid width of component `ci`, without MCU padding.
    /// This matches libjpeg's `width_in_blocks` and is the width reported
    /// on extracted bands.
    pub fn width_in_blocks(&self, ci: usize) -> usize {
        let c = &self.components[ci];
        (self.width as usize * c.h_samp as usize)
            .div_ceil(self.max_h_samp as usize * BLOCK_DIM)
    }

    /// True block-grid height of component `ci`, without MCU padding.
    pub fn height_in_blocks(&self, ci: usize) -> usize {
        let c = &self.components[ci];
        (self.height as usize * c.v_samp as usize)
            .div_ceil(self.max_v_samp as usize * BLOCK_DIM)
    }

    /// Block-grid width of component `ci` padded to a whole number of MCUs,
    /// the size at which scan data stores the component.
    pub fn padded_width_in_blocks(&self, ci: usize) -> usize {
        self.mcus_wide * self.components[ci].h_samp as usize
    }

    /// Block-grid height of component `ci` padded to a whole number of MCUs.
    pub fn padded_height_in_blocks(&self, ci: usize) -> usize {
        self.mcus_tall * self.components[ci].v_samp as usize
    }
}

/// Parses a SOF segment body (after the length field).
///
/// Baseline sequential frames (SOF0, and SOF1 which shares the scan
/// structure) and Huffman progressive frames (SOF2) are accepted;
/// `marker` is used to reject everything else with the SOF number in the
/// diagnostic.
pub fn parse_sof(marker: Marker, body: &[u8]) -> Result<FrameHeader> {
    let progressive = match marker {
        Marker::Sof0 | Marker::Sof1 => false,
        Marker::Sof2 => true,
        _ => {
            return Err(Error::UnsupportedFrameType(
                marker.sof_index().unwrap_or(0),
            ));
        }
    };
    if body.len() < 6 {
        return Err(Error::UnexpectedEof);
    }
    let precision = body[0];
    if precision != 8 {
        return Err(Error::UnsupportedPrecision(precision));
    }
    let height = BigEndian::read_u16(&body[1..3]);
    let width = BigEndian::read_u16(&body[3..5]);
    if width == 0 || height == 0 {
        return Err(Error::InvalidImageSize(width, height));
    }
    // One plane (grayscale) or three (YCbCr). Two-component frames are
    // legal JPEG but have no band layout here, and four or more exceed
    // the three-plane output model.
    let num_components = body[5];
    if !matches!(num_components, 1 | 3) {
        return Err(Error::UnsupportedComponentCount(num_components));
    }
    let num_components = num_components as usize;
    if body.len() < 6 + num_components * 3 {
        return Err(Error::UnexpectedEof);
    }

    let mut components = Vec::with_capacity(num_components);
    let mut max_h_samp = 0u8;
    let mut max_v_samp = 0u8;
    for i in 0..num_components {
        let entry = &body[6 + i * 3..9 + i * 3];
        let h_samp = entry[1] >> 4;
        let v_samp = entry[1] & 0x0F;
        if !(1..=4).contains(&h_samp) || !(1..=4).contains(&v_samp) {
            return Err(Error::InvalidSamplingFactors(h_samp, v_samp));
        }
        let quant_idx = entry[2];
        if quant_idx > 3 {
            return Err(Error::InvalidQuantTableId(quant_idx));
        }
        max_h_samp = max_h_samp.max(h_samp);
        max_v_samp = max_v_samp.max(v_samp);
        components.push(Component {
            id: entry[0],
            h_samp,
            v_samp,
            quant_idx,
        });
    }

    let mcus_wide = (width as usize).div_ceil(max_h_samp as usize * BLOCK_DIM);
    let mcus_tall = (height as usize).div_ceil(max_v_samp as usize * BLOCK_DIM);

    Ok(FrameHeader {
        width,
        height,
        precision,
        progressive,
        components,
        max_h_samp,
        max_v_samp,
        mcus_wide,
        mcus_tall,
    })
}

/// A dequantization table in natural order.
#[derive(Debug, Clone)]
pub struct QuantTable {
    pub values: [u16; BLOCK_SIZE],
}

/// Parses a DQT segment body, which may define several tables.
pub fn parse_dqt(body: &[u8], tables: &mut [Option<QuantTable>; 4]) -> Result<()> {
    let mut pos = 0;
    while pos < body.len() {
        let pq_tq = body[pos];
        let precision = pq_tq >> 4;
        let id = pq_tq & 0x0F;
        if id > 3 {
            return Err(Error::InvalidQuantTableId(id));
        }
        if precision > 1 {
            return Err(Error::InvalidQuantTablePrecision(precision));
        }
        pos += 1;
        let entry_size = if precision == 1 { 2 } else { 1 };
        if body.len() < pos + BLOCK_SIZE * entry_size {
            return Err(Error::UnexpectedEof);
        }
        let mut values = [0u16; BLOCK_SIZE];
        for k in 0..BLOCK_SIZE {
            let value = if precision == 1 {
                BigEndian::read_u16(&body[pos + 2 * k..])
            } else {
                body[pos + k] as u16
            };
            values[ZIGZAG_TO_NATURAL[k]] = value;
        }
        tables[id as usize] = Some(QuantTable { values });
        pos += BLOCK_SIZE * entry_size;
    }
    Ok(())
}

/// Parses a DHT segment body into DC and AC table specs.
pub fn parse_dht(
    body: &[u8],
    dc: &mut [Option<HuffmanSpec>; 4],
    ac: &mut [Option<HuffmanSpec>; 4],
) -> Result<()> {
    let mut pos = 0;
    while pos < body.len() {
        if body.len() < pos + 1 + MAX_HUFFMAN_BITS {
            return Err(Error::UnexpectedEof);
        }
        let tc_th = body[pos];
        let class = tc_th >> 4;
        let id = tc_th & 0x0F;
        if class > 1 || id > 3 {
            return Err(Error::InvalidHuffmanTableId(id));
        }
        pos += 1;
        let mut counts = [0u8; MAX_HUFFMAN_BITS];
        counts.copy_from_slice(&body[pos..pos + MAX_HUFFMAN_BITS]);
        pos += MAX_HUFFMAN_BITS;
        let total: usize = counts.iter().map(|&n| n as usize).sum();
        if total > 256 || body.len() < pos + total {
            return Err(Error::InvalidHuffmanTable);
        }
        let symbols = body[pos..pos + total].to_vec();
        pos += total;
        let spec = HuffmanSpec { counts, symbols };
        if class == 0 {
            dc[id as usize] = Some(spec);
        } else {
            ac[id as usize] = Some(spec);
        }
    }
    Ok(())
}

/// One component's table selectors within a scan.
#[derive(Debug, Clone)]
pub struct ScanComponent {
    /// Index into [`FrameHeader::components`].
    pub comp_idx: usize,
    pub dc_tbl: u8,
    pub ac_tbl: u8,
}

/// Scan-level state parsed from a SOS segment.
#[derive(Debug, Clone)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    /// First zigzag index of the spectral band.
    pub ss: u8,
    /// Last zigzag index of the spectral band.
    pub se: u8,
    /// Successive-approximation high bit (0 on a first pass).
    pub ah: u8,
    /// Successive-approximation low bit.
    pub al: u8,
}

/// Parses a SOS segment body against an already-parsed frame header.
///
/// Baseline scans must cover the full 0..=63 band with no successive
/// approximation. Progressive scans are checked against the T.81 G.1.1.1
/// rules: DC and AC bands never mix, AC bands are single-component, and a
/// refinement pass moves the approximation down exactly one bit.
pub fn parse_sos(body: &[u8], frame: &FrameHeader) -> Result<ScanHeader> {
    if body.is_empty() {
        return Err(Error::InvalidScanHeader);
    }
    let num_components = body[0] as usize;
    if num_components == 0 || num_components > frame.components.len() {
        return Err(Error::InvalidScanHeader);
    }
    if body.len() < 1 + num_components * 2 + 3 {
        return Err(Error::UnexpectedEof);
    }

    let mut components = Vec::with_capacity(num_components);
    for i in 0..num_components {
        let id = body[1 + i * 2];
        let tables = body[2 + i * 2];
        let comp_idx = frame
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::InvalidScanComponent(id))?;
        let dc_tbl = tables >> 4;
        let ac_tbl = tables & 0x0F;
        if dc_tbl > 3 || ac_tbl > 3 {
            return Err(Error::InvalidHuffmanTableId(tables));
        }
        components.push(ScanComponent {
            comp_idx,
            dc_tbl,
            ac_tbl,
        });
    }

    let tail = &body[1 + num_components * 2..];
    let (ss, se, ah_al) = (tail[0], tail[1], tail[2]);
    let (ah, al) = (ah_al >> 4, ah_al & 0x0F);
    if frame.progressive {
        if se > 63 || ss > se {
            return Err(Error::InvalidScanHeader);
        }
        // A DC scan carries only index 0; AC bands start past it and are
        // never interleaved.
        if ss == 0 && se != 0 {
            return Err(Error::InvalidScanHeader);
        }
        if ss > 0 && num_components != 1 {
            return Err(Error::InvalidScanHeader);
        }
        if al > 13 || !(ah == 0 || ah == al + 1) {
            return Err(Error::InvalidScanHeader);
        }
    } else if ss != 0 || se != 63 || ah_al != 0 {
        return Err(Error::InvalidScanHeader);
    }

    Ok(ScanHeader {
        components,
        ss,
        se,
        ah,
        al,
    })
}

/// Parses a DRI segment body; returns the restart interval in MCUs.
pub fn parse_dri(body: &[u8]) -> Result<u16> {
    if body.len() < 2 {
        return Err(Error::UnexpectedEof);
    }
    Ok(BigEndian::read_u16(body))
}
