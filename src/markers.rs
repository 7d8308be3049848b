// Copyright (c) the jpeg2dct Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! JPEG marker codes (ITU-T T.81, table B.1).

use num_derive::FromPrimitive;

/// Second byte of a JPEG marker.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    Sof0 = 0xC0,
    Sof1 = 0xC1,
    Sof2 = 0xC2,
    Sof3 = 0xC3,
    Dht = 0xC4,
    Sof5 = 0xC5,
    Sof6 = 0xC6,
    Sof7 = 0xC7,
    Jpg = 0xC8,
    Sof9 = 0xC9,
    Sof10 = 0xCA,
    Sof11 = 0xCB,
    Dac = 0xCC,
    Sof13 = 0xCD,
    Sof14 = 0xCE,
    Sof15 = 0xCF,
    Rst0 = 0xD0,
    Rst1 = 0xD1,
    Rst2 = 0xD2,
    Rst3 = 0xD3,
    Rst4 = 0xD4,
    Rst5 = 0xD5,
    Rst6 = 0xD6,
    Rst7 = 0xD7,
    Soi = 0xD8,
    Eoi = 0xD9,
    Sos = 0xDA,
    Dqt = 0xDB,
    Dnl = 0xDC,
    Dri = 0xDD,
    Dhp = 0xDE,
    Exp = 0xDF,
    App0 = 0xE0,
    App1 = 0xE1,
    App2 = 0xE2,
    App3 = 0xE3,
    App4 = 0xE4,
    App5 = 0xE5,
    App6 = 0xE6,
    App7 = 0xE7,
    App8 = 0xE8,
    App9 = 0xE9,
    App10 = 0xEA,
    App11 = 0xEB,
    App12 = 0xEC,
    App13 = 0xED,
    App14 = 0xEE,
    App15 = 0xEF,
    Jpg0 = 0xF0,
    Jpg13 = 0xFD,
    Com = 0xFE,
    Tem = 0x01,
}

impl Marker {
    /// Whether this marker is followed by a length-prefixed segment body.
    pub fn has_segment(self) -> bool {
        !matches!(
            self,
            Marker::Soi
                | Marker::Eoi
                | Marker::Tem
                | Marker::Rst0
                | Marker::Rst1
                | Marker::Rst2
                | Marker::Rst3
                | Marker::Rst4
                | Marker::Rst5
                | Marker::Rst6
                | Marker::Rst7
        )
    }

    /// SOF number for frame markers (`Sof0` -> 0, ...), used in diagnostics.
    pub fn sof_index(self) -> Option<u8> {
        let code = self as u8;
        match self {
            Marker::Sof0
            | Marker::Sof1
            | Marker::Sof2
            | Marker::Sof3
            | Marker::Sof5
            | Marker::Sof6
            | Marker::Sof7
            | Marker::Sof9
            | Marker::Sof10
            | Marker::Sof11
            | Marker::Sof13
            | Marker::Sof14
            | Marker::Sof15 => Some(code - 0xC0),
            _ => None,
        }
    }

    /// Whether `byte` encodes one of the RST0..RST7 markers.
    pub fn is_restart(byte: u8) -> bool {
        (0xD0..=0xD7).contains(&byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn classify_bytes() {
        assert_eq!(Marker::from_u8(0xD8), Some(Marker::Soi));
        assert_eq!(Marker::from_u8(0xC0), Some(Marker::Sof0));
        assert_eq!(Marker::from_u8(0xE1), Some(Marker::App1));
        assert_eq!(Marker::from_u8(0x00), None);
        assert_eq!(Marker::from_u8(0xFF), None);
    }

    #[test]
    fn segment_framing() {
        assert!(Marker::Dqt.has_segment());
        assert!(Marker::Sos.has_segment());
        assert!(!Marker::Soi.has_segment());
        assert!(!Marker::Rst3.has_segment());
        assert!(Marker::is_restart(0xD5));
        assert!(!Marker::is_restart(0xD8));
    }

    #[test]
    fn sof_indices() {
        assert_eq!(Marker::Sof0.sof_index(), Some(0));
        assert_eq!(Marker::Sof2.sof_index(), Some(2));
        assert_eq!(Marker::Sof15.sof_index(), Some(15));
        assert_eq!(Marker::Dht.sof_index(), None);
    }
}
