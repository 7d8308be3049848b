// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Entropy decoding of scans into per-component coefficient grids.
//!
//! A baseline scan delivers whole blocks; a progressive frame spreads
//! them over several scans, each a spectral-selection band at one
//! successive-approximation bit (T.81 G.2). All scan types accumulate
//! into the same [`CoeffGrid`]s, which store blocks in natural order.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::headers::{FrameHeader, ScanHeader, ZIGZAG_TO_NATURAL};
use crate::huffman::{HuffmanSpec, HuffmanTable, extend_sign};
use crate::BLOCK_SIZE;

/// The quantized coefficients of one component, stored block by block in
/// natural order, padded to whole MCUs.
pub struct CoeffGrid {
    blocks_wide: usize,
    blocks_tall: usize,
    coeffs: Vec<i16>,
}

impl CoeffGrid {
    pub(crate) fn new(blocks_wide: usize, blocks_tall: usize) -> CoeffGrid {
        CoeffGrid {
            blocks_wide,
            blocks_tall,
            coeffs: vec![0; blocks_wide * blocks_tall * BLOCK_SIZE],
        }
    }

    pub fn blocks_wide(&self) -> usize {
        self.blocks_wide
    }

    pub fn blocks_tall(&self) -> usize {
        self.blocks_tall
    }

    /// The 64 coefficients of one block, in natural order.
    pub fn block(&self, row: usize, col: usize) -> &[i16] {
        debug_assert!(row < self.blocks_tall && col < self.blocks_wide);
        let start = (row * self.blocks_wide + col) * BLOCK_SIZE;
        &self.coeffs[start..start + BLOCK_SIZE]
    }

    fn block_mut(&mut self, row: usize, col: usize) -> &mut [i16] {
        debug_assert!(row < self.blocks_tall && col < self.blocks_wide);
        let start = (row * self.blocks_wide + col) * BLOCK_SIZE;
        &mut self.coeffs[start..start + BLOCK_SIZE]
    }
}

/// What one scan contributes to the coefficient grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    /// Full blocks, DC and AC in one pass.
    Baseline,
    /// DC coefficients at approximation bit `al`.
    DcFirst,
    /// One DC correction bit per block.
    DcRefine,
    /// A fresh AC spectral band at approximation bit `al`.
    AcFirst,
    /// Correction bits and newly nonzero coefficients for an AC band.
    AcRefine,
}

impl ScanKind {
    fn of(frame: &FrameHeader, scan: &ScanHeader) -> ScanKind {
        if !frame.progressive {
            ScanKind::Baseline
        } else if scan.ss == 0 {
            if scan.ah == 0 { ScanKind::DcFirst } else { ScanKind::DcRefine }
        } else if scan.ah == 0 {
            ScanKind::AcFirst
        } else {
            ScanKind::AcRefine
        }
    }

    fn needs_dc(self) -> bool {
        matches!(self, ScanKind::Baseline | ScanKind::DcFirst)
    }

    fn needs_ac(self) -> bool {
        matches!(self, ScanKind::Baseline | ScanKind::AcFirst | ScanKind::AcRefine)
    }
}

struct ScanTables {
    dc: Vec<Option<HuffmanTable>>,
    ac: Vec<Option<HuffmanTable>>,
}

impl ScanTables {
    /// Builds the tables a scan of kind `kind` will consume. A DC
    /// refinement scan reads raw bits only and may legally reference
    /// tables that were never defined.
    fn build(
        scan: &ScanHeader,
        kind: ScanKind,
        dc_specs: &[Option<HuffmanSpec>; 4],
        ac_specs: &[Option<HuffmanSpec>; 4],
    ) -> Result<ScanTables> {
        let mut dc = Vec::with_capacity(scan.components.len());
        let mut ac = Vec::with_capacity(scan.components.len());
        for sc in &scan.components {
            dc.push(if kind.needs_dc() {
                let spec = dc_specs[sc.dc_tbl as usize]
                    .as_ref()
                    .ok_or(Error::MissingHuffmanTable { class: 0, id: sc.dc_tbl })?;
                Some(HuffmanTable::build(spec)?)
            } else {
                None
            });
            ac.push(if kind.needs_ac() {
                let spec = ac_specs[sc.ac_tbl as usize]
                    .as_ref()
                    .ok_or(Error::MissingHuffmanTable { class: 1, id: sc.ac_tbl })?;
                Some(HuffmanTable::build(spec)?)
            } else {
                None
            });
        }
        Ok(ScanTables { dc, ac })
    }

    fn dc(&self, sci: usize, scan: &ScanHeader) -> Result<&HuffmanTable> {
        self.dc[sci].as_ref().ok_or(Error::MissingHuffmanTable {
            class: 0,
            id: scan.components[sci].dc_tbl,
        })
    }

    fn ac(&self, sci: usize, scan: &ScanHeader) -> Result<&HuffmanTable> {
        self.ac[sci].as_ref().ok_or(Error::MissingHuffmanTable {
            class: 1,
            id: scan.components[sci].ac_tbl,
        })
    }
}

/// Entropy state carried across the blocks of one scan.
struct ScanState {
    dc_pred: Vec<i32>,
    /// Remaining blocks of the current end-of-band run (AC scans only).
    eobrun: u32,
}

/// Decodes one block of a baseline scan into `block` (natural order),
/// updating the DC predictor for its component.
fn decode_block(
    reader: &mut BitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    dc_pred: &mut i32,
    block: &mut [i16],
) -> Result<()> {
    let dc_size = dc_table.decode(reader)?;
    if dc_size > 11 {
        return Err(Error::BadHuffmanCode);
    }
    if dc_size > 0 {
        let bits = reader.read_bits(dc_size)?;
        *dc_pred += extend_sign(bits, dc_size) as i32;
    }
    block[0] = (*dc_pred).clamp(i16::MIN as i32, i16::MAX as i32) as i16;

    let mut k = 1;
    while k < BLOCK_SIZE {
        let run_size = ac_table.decode(reader)?;
        let run = (run_size >> 4) as usize;
        let size = run_size & 0x0F;
        if size == 0 {
            if run == 15 {
                // ZRL: sixteen zero coefficients.
                k += 16;
                continue;
            }
            // EOB: the rest of the block is zero.
            break;
        }
        k += run;
        if k >= BLOCK_SIZE {
            return Err(Error::BadHuffmanCode);
        }
        let bits = reader.read_bits(size)?;
        block[ZIGZAG_TO_NATURAL[k]] = extend_sign(bits, size);
        k += 1;
    }
    Ok(())
}

/// First DC pass: the predicted DC value, stored shifted up by `al`.
fn decode_dc_first(
    reader: &mut BitReader,
    dc_table: &HuffmanTable,
    dc_pred: &mut i32,
    al: u8,
    block: &mut [i16],
) -> Result<()> {
    let dc_size = dc_table.decode(reader)?;
    if dc_size > 11 {
        return Err(Error::BadHuffmanCode);
    }
    if dc_size > 0 {
        let bits = reader.read_bits(dc_size)?;
        *dc_pred += extend_sign(bits, dc_size) as i32;
    }
    block[0] = ((*dc_pred).clamp(i16::MIN as i32, i16::MAX as i32) as i16) << al;
    Ok(())
}

/// DC refinement pass: one raw bit per block, setting bit `al`.
fn decode_dc_refine(reader: &mut BitReader, al: u8, block: &mut [i16]) -> Result<()> {
    if reader.read_bit()? != 0 {
        block[0] |= 1 << al;
    }
    Ok(())
}

/// First AC pass over the band `ss..=se`: like baseline AC coding, but
/// the EOB symbols carry a run length covering whole blocks.
fn decode_ac_first(
    reader: &mut BitReader,
    ac_table: &HuffmanTable,
    scan: &ScanHeader,
    eobrun: &mut u32,
    block: &mut [i16],
) -> Result<()> {
    if *eobrun > 0 {
        *eobrun -= 1;
        return Ok(());
    }

    let (ss, se, al) = (scan.ss as usize, scan.se as usize, scan.al);
    let mut k = ss;
    while k <= se {
        let run_size = ac_table.decode(reader)?;
        let run = (run_size >> 4) as usize;
        let size = run_size & 0x0F;
        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            // EOBn: this band and the next 2^run - 1 + extra are all zero.
            *eobrun = 1 << run;
            if run > 0 {
                *eobrun += reader.read_bits(run as u8)? as u32;
            }
            *eobrun -= 1;
            return Ok(());
        }
        k += run;
        if k > se {
            return Err(Error::BadHuffmanCode);
        }
        let bits = reader.read_bits(size)?;
        block[ZIGZAG_TO_NATURAL[k]] = ((extend_sign(bits, size) as i32) << al) as i16;
        k += 1;
    }
    Ok(())
}

/// AC refinement pass (T.81 figure G.7): correction bits for
/// already-nonzero coefficients, interleaved with newly nonzero ones.
fn decode_ac_refine(
    reader: &mut BitReader,
    ac_table: &HuffmanTable,
    scan: &ScanHeader,
    eobrun: &mut u32,
    block: &mut [i16],
) -> Result<()> {
    let (ss, se, al) = (scan.ss as usize, scan.se as usize, scan.al);
    let p1 = 1i16 << al;
    let m1 = -(1i16 << al);

    // Reads a correction bit for a coefficient that is already nonzero.
    // A set bit moves the magnitude up by one step at bit `al`, once.
    fn correct(reader: &mut BitReader, coeff: &mut i16, p1: i16, m1: i16) -> Result<()> {
        if reader.read_bit()? != 0 && (*coeff & p1) == 0 {
            *coeff += if *coeff >= 0 { p1 } else { m1 };
        }
        Ok(())
    }

    let mut k = ss;
    if *eobrun == 0 {
        while k <= se {
            let run_size = ac_table.decode(reader)?;
            let mut run = (run_size >> 4) as i32;
            let size = run_size & 0x0F;
            let mut new_val = 0i16;
            if size != 0 {
                if size != 1 {
                    return Err(Error::BadHuffmanCode);
                }
                new_val = if reader.read_bit()? != 0 { p1 } else { m1 };
            } else if run != 15 {
                *eobrun = 1 << run;
                if run > 0 {
                    *eobrun += reader.read_bits(run as u8)? as u32;
                }
                break;
            }
            // Advance over `run` zero-history coefficients (16 for ZRL),
            // handing a correction bit to every nonzero one passed.
            loop {
                if k > se {
                    if new_val != 0 {
                        return Err(Error::BadHuffmanCode);
                    }
                    break;
                }
                let pos = ZIGZAG_TO_NATURAL[k];
                if block[pos] != 0 {
                    correct(reader, &mut block[pos], p1, m1)?;
                } else {
                    run -= 1;
                    if run < 0 {
                        break;
                    }
                }
                k += 1;
            }
            if new_val != 0 {
                block[ZIGZAG_TO_NATURAL[k]] = new_val;
            }
            k += 1;
        }
    }
    if *eobrun > 0 {
        // Inside an end-of-band run the remaining nonzero coefficients of
        // the band still receive correction bits.
        while k <= se {
            let pos = ZIGZAG_TO_NATURAL[k];
            if block[pos] != 0 {
                correct(reader, &mut block[pos], p1, m1)?;
            }
            k += 1;
        }
        *eobrun -= 1;
    }
    Ok(())
}

fn decode_unit(
    kind: ScanKind,
    reader: &mut BitReader,
    tables: &ScanTables,
    scan: &ScanHeader,
    sci: usize,
    state: &mut ScanState,
    block: &mut [i16],
) -> Result<()> {
    match kind {
        ScanKind::Baseline => decode_block(
            reader,
            tables.dc(sci, scan)?,
            tables.ac(sci, scan)?,
            &mut state.dc_pred[sci],
            block,
        ),
        ScanKind::DcFirst => decode_dc_first(
            reader,
            tables.dc(sci, scan)?,
            &mut state.dc_pred[sci],
            scan.al,
            block,
        ),
        ScanKind::DcRefine => decode_dc_refine(reader, scan.al, block),
        ScanKind::AcFirst => {
            decode_ac_first(reader, tables.ac(sci, scan)?, scan, &mut state.eobrun, block)
        }
        ScanKind::AcRefine => {
            decode_ac_refine(reader, tables.ac(sci, scan)?, scan, &mut state.eobrun, block)
        }
    }
}

/// Decodes the entropy-coded data of one scan into `grids` (indexed by
/// frame component), accumulating over whatever earlier scans left there.
///
/// `scan_start` is the byte offset of the first entropy-coded byte, right
/// after the SOS segment. Returns the offset of the first byte after the
/// scan, where the next marker begins.
pub fn decode_scan(
    data: &[u8],
    scan_start: usize,
    frame: &FrameHeader,
    scan: &ScanHeader,
    dc_specs: &[Option<HuffmanSpec>; 4],
    ac_specs: &[Option<HuffmanSpec>; 4],
    restart_interval: u16,
    grids: &mut [CoeffGrid],
) -> Result<usize> {
    let kind = ScanKind::of(frame, scan);
    let tables = ScanTables::build(scan, kind, dc_specs, ac_specs)?;
    let mut reader = BitReader::new(data, scan_start);
    let mut state = ScanState {
        dc_pred: vec![0i32; scan.components.len()],
        eobrun: 0,
    };

    if scan.components.len() == 1 {
        // Non-interleaved scan: one block per MCU, iterated over the
        // component's own (unpadded) block grid (T.81 A.2.2). The restart
        // interval counts blocks here.
        let ci = scan.components[0].comp_idx;
        let rows = frame.height_in_blocks(ci);
        let cols = frame.width_in_blocks(ci);
        let mut blocks_done = 0usize;
        for row in 0..rows {
            for col in 0..cols {
                maybe_restart(&mut reader, restart_interval, blocks_done, &mut state)?;
                decode_unit(
                    kind,
                    &mut reader,
                    &tables,
                    scan,
                    0,
                    &mut state,
                    grids[ci].block_mut(row, col),
                )?;
                blocks_done += 1;
            }
        }
        return Ok(reader.position());
    }

    let mut mcus_done = 0usize;
    for mcu_row in 0..frame.mcus_tall {
        for mcu_col in 0..frame.mcus_wide {
            maybe_restart(&mut reader, restart_interval, mcus_done, &mut state)?;
            for (sci, sc) in scan.components.iter().enumerate() {
                let comp = &frame.components[sc.comp_idx];
                for v in 0..comp.v_samp as usize {
                    for h in 0..comp.h_samp as usize {
                        let row = mcu_row * comp.v_samp as usize + v;
                        let col = mcu_col * comp.h_samp as usize + h;
                        decode_unit(
                            kind,
                            &mut reader,
                            &tables,
                            scan,
                            sci,
                            &mut state,
                            grids[sc.comp_idx].block_mut(row, col),
                        )?;
                    }
                }
            }
            mcus_done += 1;
        }
    }
    Ok(reader.position())
}

fn maybe_restart(
    reader: &mut BitReader,
    restart_interval: u16,
    units_done: usize,
    state: &mut ScanState,
) -> Result<()> {
    if restart_interval == 0 || units_done == 0 || units_done % restart_interval as usize != 0 {
        return Ok(());
    }
    reader.expect_restart()?;
    state.dc_pred.fill(0);
    state.eobrun = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_blocks_are_disjoint() {
        let mut grid = CoeffGrid::new(3, 2);
        grid.block_mut(0, 0)[0] = 7;
        grid.block_mut(1, 2)[63] = -7;
        assert_eq!(grid.block(0, 0)[0], 7);
        assert_eq!(grid.block(0, 1)[0], 0);
        assert_eq!(grid.block(1, 2)[63], -7);
    }

    #[test]
    fn scan_kind_classification() {
        let frame = |progressive| FrameHeader {
            width: 8,
            height: 8,
            precision: 8,
            progressive,
            components: vec![],
            max_h_samp: 1,
            max_v_samp: 1,
            mcus_wide: 1,
            mcus_tall: 1,
        };
        let scan = |ss, se, ah, al| ScanHeader {
            components: vec![],
            ss,
            se,
            ah,
            al,
        };
        assert_eq!(ScanKind::of(&frame(false), &scan(0, 63, 0, 0)), ScanKind::Baseline);
        assert_eq!(ScanKind::of(&frame(true), &scan(0, 0, 0, 1)), ScanKind::DcFirst);
        assert_eq!(ScanKind::of(&frame(true), &scan(0, 0, 1, 0)), ScanKind::DcRefine);
        assert_eq!(ScanKind::of(&frame(true), &scan(1, 63, 0, 1)), ScanKind::AcFirst);
        assert_eq!(ScanKind::of(&frame(true), &scan(1, 63, 1, 0)), ScanKind::AcRefine);
    }
}
