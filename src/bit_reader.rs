// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};

/// Reads bits from an entropy-coded JPEG segment.
///
/// JPEG scan data is MSB-first and byte-stuffed: a literal 0xFF data byte
/// is stored as 0xFF 0x00. A 0xFF followed by anything else is a marker
/// and terminates the entropy-coded segment; reading past it fails with
/// [`Error::UnexpectedEof`]. Restart markers are consumed explicitly via
/// [`BitReader::expect_restart`], never as data.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_buf: u32,
    bits_in_buf: usize,
}

impl Debug for BitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitReader{{ pos: {}/{}, bits_in_buf: {} }}",
            self.pos,
            self.data.len(),
            self.bits_in_buf
        )
    }
}

impl<'a> BitReader<'a> {
    /// Constructs a BitReader over `data`, starting at byte offset `start`.
    pub fn new(data: &'a [u8], start: usize) -> BitReader<'a> {
        BitReader {
            data,
            pos: start,
            bit_buf: 0,
            bits_in_buf: 0,
        }
    }

    /// Fetches the next data byte, undoing byte stuffing. Stops at markers.
    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(Error::UnexpectedEof)?;
        if byte != 0xFF {
            self.pos += 1;
            return Ok(byte);
        }
        match self.data.get(self.pos + 1) {
            Some(0x00) => {
                self.pos += 2;
                Ok(0xFF)
            }
            // A marker inside the scan: no more entropy-coded data here.
            _ => Err(Error::UnexpectedEof),
        }
    }

    /// Reads `count` bits (at most 16), MSB first.
    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!(count <= 16);
        while self.bits_in_buf < count as usize {
            let byte = self.next_byte()?;
            self.bit_buf = (self.bit_buf << 8) | byte as u32;
            self.bits_in_buf += 8;
        }
        self.bits_in_buf -= count as usize;
        let value = (self.bit_buf >> self.bits_in_buf) as u16 & ((1u32 << count) - 1) as u16;
        Ok(value)
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<u8> {
        Ok(self.read_bits(1)? as u8)
    }

    /// Byte offset of the next unread byte. Buffered bits all come from
    /// bytes before this offset, so after a scan's last coded bit this is
    /// the offset of the trailing marker.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Discards buffered bits so the next read starts on a byte boundary.
    pub fn align_to_byte(&mut self) {
        self.bit_buf = 0;
        self.bits_in_buf = 0;
    }

    /// Consumes a restart marker (FFD0..FFD7) at the current byte position.
    pub fn expect_restart(&mut self) -> Result<()> {
        self.align_to_byte();
        let hi = *self.data.get(self.pos).ok_or(Error::UnexpectedEof)?;
        let lo = *self.data.get(self.pos + 1).ok_or(Error::UnexpectedEof)?;
        if hi != 0xFF || !crate::markers::Marker::is_restart(lo) {
            return Err(Error::ExpectedRestartMarker(hi, lo));
        }
        self.pos += 2;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_reads() {
        let mut br = BitReader::new(&[0b1011_0001, 0b0100_0000], 0);
        assert_eq!(br.read_bit().unwrap(), 1);
        assert_eq!(br.read_bits(3).unwrap(), 0b011);
        assert_eq!(br.read_bits(6).unwrap(), 0b0001_01);
        assert!(br.read_bits(16).is_err());
    }

    #[test]
    fn unstuffs_ff00() {
        let mut br = BitReader::new(&[0xFF, 0x00, 0xAB], 0);
        assert_eq!(br.read_bits(8).unwrap(), 0xFF);
        assert_eq!(br.read_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn stops_at_marker() {
        let mut br = BitReader::new(&[0x12, 0xFF, 0xD9], 0);
        assert_eq!(br.read_bits(8).unwrap(), 0x12);
        assert!(matches!(br.read_bit(), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn restart_marker_consumed_on_byte_boundary() {
        let mut br = BitReader::new(&[0b1000_0000, 0xFF, 0xD2, 0x55], 0);
        assert_eq!(br.read_bit().unwrap(), 1);
        br.expect_restart().unwrap();
        assert_eq!(br.read_bits(8).unwrap(), 0x55);
    }

    #[test]
    fn restart_marker_mismatch() {
        let mut br = BitReader::new(&[0xFF, 0xD9], 0);
        assert!(matches!(
            br.expect_restart(),
            Err(Error::ExpectedRestartMarker(0xFF, 0xD9))
        ));
    }
}
