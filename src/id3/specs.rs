use crate::common::error::{Result, TagError};

/// Text encoding markers used in ID3v2 text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf16Be = 2,
    Utf8 = 3,
}

impl Encoding {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Encoding::Latin1),
            1 => Ok(Encoding::Utf16),
            2 => Ok(Encoding::Utf16Be),
            3 => Ok(Encoding::Utf8),
            _ => Err(TagError::UnsupportedEncoding(b)),
        }
    }

    /// Encoding used for non-ASCII text when nothing else is preferred.
    pub fn default_for_version(version: u8) -> Self {
        if version >= 4 {
            Encoding::Utf8
        } else {
            Encoding::Utf16
        }
    }

    /// UTF-16BE and UTF-8 markers were introduced with ID3v2.4.
    pub fn is_legal_for(self, version: u8) -> bool {
        match self {
            Encoding::Latin1 | Encoding::Utf16 => true,
            Encoding::Utf16Be | Encoding::Utf8 => version >= 4,
        }
    }

    /// Whether `text` survives a round trip through this encoding.
    pub fn can_encode(self, text: &str) -> bool {
        match self {
            Encoding::Latin1 => text.chars().all(|c| (c as u32) <= 0xFF),
            Encoding::Utf16 | Encoding::Utf16Be | Encoding::Utf8 => true,
        }
    }
}

/// Decode text bytes (without the marker byte) using `encoding`.
pub fn decode_text(data: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Latin1 => data.iter().map(|&b| b as char).collect(),
        Encoding::Utf16 => {
            let (decoder, start) = match data {
                [0xFF, 0xFE, ..] => (encoding_rs::UTF_16LE, 2),
                [0xFE, 0xFF, ..] => (encoding_rs::UTF_16BE, 2),
                // Missing BOM: assume little-endian like most writers
                _ => (encoding_rs::UTF_16LE, 0),
            };
            let (text, _) = decoder.decode_without_bom_handling(&data[start..]);
            text.into_owned()
        }
        Encoding::Utf16Be => {
            let (text, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(data);
            text.into_owned()
        }
        Encoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Encode text to bytes (without the marker byte).
/// Latin-1 replaces unrepresentable characters with `?`.
pub fn encode_text(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Latin1 => text
            .chars()
            .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
            .collect(),
        Encoding::Utf16 => {
            let mut out = Vec::with_capacity(2 + text.len() * 2);
            out.extend_from_slice(&[0xFF, 0xFE]); // BOM (LE)
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        Encoding::Utf16Be => text
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect(),
        Encoding::Utf8 => text.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_respects_bom() {
        let le = [0xFF, 0xFE, b'h', 0, b'i', 0];
        let be = [0xFE, 0xFF, 0, b'h', 0, b'i'];
        assert_eq!(decode_text(&le, Encoding::Utf16), "hi");
        assert_eq!(decode_text(&be, Encoding::Utf16), "hi");
        assert_eq!(decode_text(&[b'h', 0], Encoding::Utf16), "h");
    }

    #[test]
    fn latin1_maps_high_bytes() {
        assert_eq!(decode_text(&[b'S', 0xE9, b'n'], Encoding::Latin1), "Sén");
        assert_eq!(encode_text("Sén", Encoding::Latin1), vec![b'S', 0xE9, b'n']);
        assert_eq!(encode_text("日", Encoding::Latin1), vec![b'?']);
    }

    #[test]
    fn legality_and_capability() {
        assert!(!Encoding::Utf8.is_legal_for(3));
        assert!(Encoding::Utf8.is_legal_for(4));
        assert!(Encoding::Latin1.can_encode("Café"));
        assert!(!Encoding::Latin1.can_encode("東京"));
        assert!(matches!(
            Encoding::from_byte(7),
            Err(TagError::UnsupportedEncoding(7))
        ));
    }
}
