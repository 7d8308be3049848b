// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unexpected end of JPEG stream")]
    UnexpectedEof,
    #[error("Invalid signature {0:02x}{1:02x}, expected ffd8")]
    InvalidSignature(u8, u8),
    #[error("Invalid marker byte {0:02x}")]
    InvalidMarker(u8),
    #[error("Invalid length {length} for {marker:?} segment")]
    InvalidSegmentLength { marker: crate::markers::Marker, length: usize },
    #[error("Unsupported frame type SOF{0}: only baseline and progressive Huffman frames are supported")]
    UnsupportedFrameType(u8),
    #[error("Arithmetic-coded streams are not supported")]
    UnsupportedArithmeticCoding,
    #[error("Unsupported sample precision: {0} bits")]
    UnsupportedPrecision(u8),
    #[error("Unsupported component count: {0}")]
    UnsupportedComponentCount(u8),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(u16, u16),
    #[error("Invalid sampling factors {0}x{1}")]
    InvalidSamplingFactors(u8, u8),
    #[error("Invalid quantization table id {0}")]
    InvalidQuantTableId(u8),
    #[error("Invalid quantization table precision code {0}")]
    InvalidQuantTablePrecision(u8),
    #[error("Missing quantization table {0}")]
    MissingQuantTable(u8),
    #[error("Invalid Huffman table id {0}")]
    InvalidHuffmanTableId(u8),
    #[error("Missing Huffman table (class {class}, id {id})")]
    MissingHuffmanTable { class: u8, id: u8 },
    #[error("Invalid Huffman table definition")]
    InvalidHuffmanTable,
    #[error("Invalid Huffman code in entropy-coded data")]
    BadHuffmanCode,
    #[error("Invalid scan header")]
    InvalidScanHeader,
    #[error("Scan references component {0} not present in frame")]
    InvalidScanComponent(u8),
    #[error("Expected restart marker, found {0:02x}{1:02x}")]
    ExpectedRestartMarker(u8, u8),
    #[error("Missing SOF segment before SOS")]
    MissingFrameHeader,
    #[error("Missing SOS segment")]
    MissingScanHeader,
    #[error("Re-encoding failed: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
