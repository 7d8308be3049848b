// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The per-extraction decode context.
//!
//! A [`Decoder`] walks the whole stream on construction, entropy-decoding
//! every scan between SOS and EOI into per-component coefficient grids.
//! Baseline images carry one scan; progressive images accumulate their
//! grids over many. A decoder is built fresh for every extraction call
//! and replaced wholesale when the layout normalizer transcodes an image,
//! so no decode state is ever shared between calls.

use byteorder::{BigEndian, ByteOrder};
use num_traits::FromPrimitive;
use tracing::debug;

use crate::error::{Error, Result};
use crate::headers::{FrameHeader, QuantTable, parse_dht, parse_dqt, parse_dri, parse_sof, parse_sos};
use crate::huffman::HuffmanSpec;
use crate::idct::idct_8x8;
use crate::markers::Marker;
use crate::scan::{CoeffGrid, decode_scan};
use crate::{BLOCK_DIM, BLOCK_SIZE};

/// A fully entropy-decoded JPEG, ready for coefficient or pixel access.
pub struct Decoder {
    frame: FrameHeader,
    quant: [Option<QuantTable>; 4],
    grids: Vec<CoeffGrid>,
}

impl Decoder {
    /// Parses and entropy-decodes `data`, through every scan up to EOI.
    ///
    /// Tables defined between scans (progressive streams routinely emit a
    /// DHT per scan) take effect for the scans that follow them.
    pub fn new(data: &[u8]) -> Result<Decoder> {
        let mut quant: [Option<QuantTable>; 4] = [None, None, None, None];
        let mut dc_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        let mut ac_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        let mut frame: Option<FrameHeader> = None;
        let mut grids: Option<Vec<CoeffGrid>> = None;
        let mut restart_interval = 0u16;
        let mut scans = 0usize;

        if data.len() < 2 {
            return Err(Error::UnexpectedEof);
        }
        if data[0] != 0xFF || data[1] != 0xD8 {
            return Err(Error::InvalidSignature(data[0], data[1]));
        }

        let mut pos = 2;
        loop {
            if pos + 2 > data.len() {
                return Err(Error::UnexpectedEof);
            }
            if data[pos] != 0xFF {
                return Err(Error::InvalidMarker(data[pos]));
            }
            // Fill bytes: any number of 0xFF may precede a marker.
            while pos < data.len() && data[pos] == 0xFF {
                pos += 1;
            }
            if pos >= data.len() {
                return Err(Error::UnexpectedEof);
            }
            let code = data[pos];
            pos += 1;
            let marker = Marker::from_u8(code).ok_or(Error::InvalidMarker(code))?;

            if !marker.has_segment() {
                if marker == Marker::Eoi {
                    break;
                }
                continue;
            }

            if pos + 2 > data.len() {
                return Err(Error::UnexpectedEof);
            }
            let length = BigEndian::read_u16(&data[pos..]) as usize;
            if length < 2 || pos + length > data.len() {
                return Err(Error::InvalidSegmentLength { marker, length });
            }
            let body = &data[pos + 2..pos + length];
            pos += length;

            match marker {
                Marker::Dqt => parse_dqt(body, &mut quant)?,
                Marker::Dht => parse_dht(body, &mut dc_specs, &mut ac_specs)?,
                Marker::Dri => restart_interval = parse_dri(body)?,
                Marker::Sos => {
                    let frame = frame.as_ref().ok_or(Error::MissingFrameHeader)?;
                    let scan = parse_sos(body, frame)?;
                    let grids = grids.get_or_insert_with(|| {
                        (0..frame.components.len())
                            .map(|ci| {
                                CoeffGrid::new(
                                    frame.padded_width_in_blocks(ci),
                                    frame.padded_height_in_blocks(ci),
                                )
                            })
                            .collect()
                    });
                    pos = decode_scan(
                        data,
                        pos,
                        frame,
                        &scan,
                        &dc_specs,
                        &ac_specs,
                        restart_interval,
                        grids,
                    )?;
                    scans += 1;
                }
                // Arithmetic coding conditioning implies an
                // arithmetic-coded scan.
                Marker::Dac => return Err(Error::UnsupportedArithmeticCoding),
                _ if marker.sof_index().is_some() => {
                    frame = Some(parse_sof(marker, body)?);
                }
                // APPn, COM and the rest carry no state we need.
                _ => {}
            }
        }

        let frame = frame.ok_or(Error::MissingFrameHeader)?;
        let grids = grids.ok_or(Error::MissingScanHeader)?;
        debug!(
            width = frame.width,
            height = frame.height,
            components = frame.components.len(),
            progressive = frame.progressive,
            scans,
            restart_interval,
            "decoded JPEG stream"
        );

        Ok(Decoder {
            frame,
            quant,
            grids,
        })
    }

    pub fn frame(&self) -> &FrameHeader {
        &self.frame
    }

    /// Dequantization table for table id `idx`.
    pub fn quant_table(&self, idx: u8) -> Result<&QuantTable> {
        self.quant[idx as usize]
            .as_ref()
            .ok_or(Error::MissingQuantTable(idx))
    }

    /// The decoded coefficient grids, one per frame component.
    pub fn coefficients(&self) -> &[CoeffGrid] {
        &self.grids
    }

    /// Renders the image to interleaved 8-bit samples, one byte per
    /// component per pixel, top-to-bottom.
    ///
    /// No color conversion is applied: a YCbCr image yields YCbCr
    /// samples. Chroma planes are upsampled by sample replication. Only
    /// the transcode path uses this.
    pub fn decode_pixels(&self) -> Result<Vec<u8>> {
        let planes = self.render_planes()?;

        let width = self.frame.width as usize;
        let height = self.frame.height as usize;
        let num_components = self.frame.components.len();
        let max_h = self.frame.max_h_samp as usize;
        let max_v = self.frame.max_v_samp as usize;

        let mut samples = vec![0u8; width * height * num_components];
        for y in 0..height {
            for x in 0..width {
                for (ci, comp) in self.frame.components.iter().enumerate() {
                    let plane = &planes[ci];
                    let sx = x * comp.h_samp as usize / max_h;
                    let sy = y * comp.v_samp as usize / max_v;
                    samples[(y * width + x) * num_components + ci] = plane.samples[sy * plane.width + sx];
                }
            }
        }
        Ok(samples)
    }

    /// Dequantizes and inverse-transforms every block of every component
    /// into its own sample plane (at the component's subsampled
    /// resolution, padded to whole blocks).
    fn render_planes(&self) -> Result<Vec<Plane>> {
        let mut planes = Vec::with_capacity(self.frame.components.len());
        for (ci, comp) in self.frame.components.iter().enumerate() {
            let table = self.quant_table(comp.quant_idx)?;
            let grid = &self.grids[ci];
            let plane_width = grid.blocks_wide() * BLOCK_DIM;
            let plane_height = grid.blocks_tall() * BLOCK_DIM;
            let mut samples = vec![0u8; plane_width * plane_height];

            let mut block = [0.0f32; BLOCK_SIZE];
            for row in 0..grid.blocks_tall() {
                for col in 0..grid.blocks_wide() {
                    let coeffs = grid.block(row, col);
                    for k in 0..BLOCK_SIZE {
                        block[k] = coeffs[k] as f32 * table.values[k] as f32;
                    }
                    idct_8x8(&mut block);
                    for y in 0..BLOCK_DIM {
                        let dst = (row * BLOCK_DIM + y) * plane_width + col * BLOCK_DIM;
                        for x in 0..BLOCK_DIM {
                            let sample = block[y * BLOCK_DIM + x] + 128.0;
                            samples[dst + x] = sample.round().clamp(0.0, 255.0) as u8;
                        }
                    }
                }
            }
            planes.push(Plane {
                width: plane_width,
                samples,
            });
        }
        Ok(planes)
    }
}

struct Plane {
    width: usize,
    samples: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends a length-framed segment.
    fn seg(out: &mut Vec<u8>, marker: u8, body: &[u8]) {
        out.extend_from_slice(&[0xFF, marker]);
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
    }

    fn dqt_all_ones() -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend(std::iter::repeat_n(1u8, 64));
        body
    }

    /// A DHT body for one table from its per-length counts and symbols.
    fn dht(class_id: u8, counts: &[u8], symbols: &[u8]) -> Vec<u8> {
        let mut body = vec![class_id];
        let mut full = [0u8; 16];
        full[..counts.len()].copy_from_slice(counts);
        body.extend_from_slice(&full);
        body.extend_from_slice(symbols);
        body
    }

    fn sos(comps: &[(u8, u8)], ss: u8, se: u8, ah_al: u8) -> Vec<u8> {
        let mut body = vec![comps.len() as u8];
        for &(id, tables) in comps {
            body.extend_from_slice(&[id, tables]);
        }
        body.extend_from_slice(&[ss, se, ah_al]);
        body
    }

    /// A 8x8 color image sent as three consecutive single-component
    /// baseline scans. Every block is all-zero: the DC size-0 symbol is
    /// the single-bit code 0, as is the AC end-of-block symbol, so each
    /// scan's entropy data is the two bits 00.
    #[test]
    fn multi_scan_baseline_stream() {
        let mut data = vec![0xFF, 0xD8];
        seg(&mut data, 0xDB, &dqt_all_ones());
        seg(
            &mut data,
            0xC0,
            &[8, 0, 8, 0, 8, 3, 1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0],
        );
        seg(&mut data, 0xC4, &dht(0x00, &[1], &[0x00]));
        seg(&mut data, 0xC4, &dht(0x10, &[1], &[0x00]));
        for comp_id in 1..=3u8 {
            seg(&mut data, 0xDA, &sos(&[(comp_id, 0x00)], 0, 63, 0));
            data.push(0x00);
        }
        data.extend_from_slice(&[0xFF, 0xD9]);

        let decoder = Decoder::new(&data).unwrap();
        assert_eq!(decoder.frame().components.len(), 3);
        let grids = decoder.coefficients();
        assert_eq!(grids.len(), 3);
        for grid in grids {
            assert_eq!((grid.blocks_tall(), grid.blocks_wide()), (1, 1));
            assert!(grid.block(0, 0).iter().all(|&c| c == 0));
        }
    }

    /// A 8x8 grayscale progressive image exercising all four scan types.
    ///
    /// Scan 1 (DC first, Al=1) sends a DC difference of 1: with the DC
    /// table mapping the 1-bit code 0 to size 1, its data is the bits
    /// 0 1, stored as coefficient 1 << 1 = 2. Scan 2 (DC refinement,
    /// Al=0) sends the raw bit 1, lifting the DC value to 3. Scan 3 (AC
    /// first, Al=1) places +1 at zigzag index 1 (code 0 for run 0 /
    /// size 1, sign bit 1), then ends the band (code 10 for EOB0); the
    /// coefficient lands as 2. Scan 4 (AC refinement, Al=0) opens with
    /// EOB0 and hands that coefficient the correction bit 1, lifting it
    /// to 3. Trailing bits of every scan are padding.
    #[test]
    fn progressive_successive_approximation_stream() {
        let mut data = vec![0xFF, 0xD8];
        seg(&mut data, 0xDB, &dqt_all_ones());
        seg(&mut data, 0xC2, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]);
        seg(&mut data, 0xC4, &dht(0x00, &[1], &[0x01]));
        seg(&mut data, 0xC4, &dht(0x10, &[1, 1], &[0x01, 0x00]));

        seg(&mut data, 0xDA, &sos(&[(1, 0x00)], 0, 0, 0x01));
        data.push(0b0100_0000);
        seg(&mut data, 0xDA, &sos(&[(1, 0x00)], 0, 0, 0x10));
        data.push(0b1000_0000);
        seg(&mut data, 0xDA, &sos(&[(1, 0x00)], 1, 63, 0x01));
        data.push(0b0110_0000);
        seg(&mut data, 0xDA, &sos(&[(1, 0x00)], 1, 63, 0x10));
        data.push(0b1010_0000);
        data.extend_from_slice(&[0xFF, 0xD9]);

        let decoder = Decoder::new(&data).unwrap();
        assert!(decoder.frame().progressive);
        let block = decoder.coefficients()[0].block(0, 0);
        assert_eq!(block[0], 3);
        assert_eq!(block[1], 3);
        assert!(block[2..].iter().all(|&c| c == 0));
    }

    #[test]
    fn missing_scan_is_an_error() {
        let mut data = vec![0xFF, 0xD8];
        seg(&mut data, 0xC0, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        assert!(matches!(
            Decoder::new(&data),
            Err(Error::MissingScanHeader)
        ));
    }
}
