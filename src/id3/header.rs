use byteorder::{BigEndian, ByteOrder};

use crate::common::error::{Result, TagError};

/// Length of the fixed ID3v2 header (and of the optional v2.4 footer).
pub const HEADER_LEN: usize = 10;

/// Largest value a 4-byte syncsafe integer can hold (28 bits).
pub const MAX_SYNCSAFE: u32 = 0x0FFF_FFFF;

/// Syncsafe integer encoding used in ID3v2 tags.
/// Each byte uses only 7 bits (MSB is always 0).
pub struct BitPaddedInt;

impl BitPaddedInt {
    /// Decode an integer where each byte carries `bits` significant bits
    /// (7 for syncsafe, 8 for plain big-endian).
    pub fn decode(data: &[u8], bits: u8) -> u32 {
        let mask = (1u32 << bits) - 1;
        data.iter()
            .fold(0u32, |acc, &b| (acc << bits) | (b as u32 & mask))
    }

    pub fn syncsafe(data: &[u8]) -> u32 {
        Self::decode(data, 7)
    }

    /// Encode `value` as a 4-byte syncsafe integer.
    /// Callers must check `value <= MAX_SYNCSAFE` first.
    pub fn encode_syncsafe(value: u32) -> [u8; 4] {
        [
            ((value >> 21) & 0x7F) as u8,
            ((value >> 14) & 0x7F) as u8,
            ((value >> 7) & 0x7F) as u8,
            (value & 0x7F) as u8,
        ]
    }

    /// True if no byte has its high bit set.
    pub fn is_syncsafe(data: &[u8]) -> bool {
        data.iter().all(|&b| b & 0x80 == 0)
    }
}

/// ID3v2 header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagFlags {
    pub unsynchronisation: bool,
    pub extended: bool,
    pub experimental: bool,
    pub footer: bool,
    /// v2.2 only: the whole tag is compressed with an undefined scheme.
    pub compressed_v22: bool,
}

impl TagFlags {
    fn from_byte(b: u8, major: u8) -> Self {
        TagFlags {
            unsynchronisation: b & 0x80 != 0,
            extended: major >= 3 && b & 0x40 != 0,
            experimental: major >= 3 && b & 0x20 != 0,
            footer: major == 4 && b & 0x10 != 0,
            compressed_v22: major == 2 && b & 0x40 != 0,
        }
    }
}

/// Parsed ID3v2 header (10 bytes at offset 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    pub version: (u8, u8), // (major, revision), e.g. (4, 0) for ID3v2.4
    pub flags: TagFlags,
    pub size: u32, // Tag size excluding header and footer
}

impl TagHeader {
    /// Parse the header from the start of `data`.
    ///
    /// Returns [`TagError::NoHeader`] when the `ID3` magic is absent, which
    /// callers treat as "untagged" rather than a failure.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN || &data[0..3] != b"ID3" {
            return Err(TagError::NoHeader);
        }

        let major = data[3];
        let revision = data[4];
        if !(2..=4).contains(&major) || revision == 0xFF {
            return Err(TagError::UnsupportedTagVersion(format!(
                "ID3v2.{}.{}",
                major, revision
            )));
        }

        let size_bytes = &data[6..10];
        if !BitPaddedInt::is_syncsafe(size_bytes) {
            return Err(TagError::MalformedHeader(
                "tag size is not a syncsafe integer".into(),
            ));
        }

        Ok(TagHeader {
            version: (major, revision),
            flags: TagFlags::from_byte(data[5], major),
            size: BitPaddedInt::syncsafe(size_bytes),
        })
    }

    /// Full tag length on disk: header, body and optional footer.
    /// The audio payload starts at this offset.
    pub fn tag_len(&self) -> usize {
        let mut len = HEADER_LEN + self.size as usize;
        if self.flags.footer {
            len += HEADER_LEN;
        }
        len
    }

    /// Render a header for a freshly written tag (revision 0, no flags).
    pub fn render(major: u8, size: u32) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..3].copy_from_slice(b"ID3");
        out[3] = major;
        out[6..10].copy_from_slice(&BitPaddedInt::encode_syncsafe(size));
        out
    }
}

/// Length of the extended header at the start of the tag body, including
/// its own size field.
pub fn extended_header_len(body: &[u8], major: u8) -> Result<usize> {
    if body.len() < 4 {
        return Err(TagError::MalformedHeader("extended header truncated".into()));
    }
    let len = if major == 4 {
        BitPaddedInt::syncsafe(&body[0..4]) as usize
    } else {
        // v2.3 size excludes the 4-byte size field itself
        BigEndian::read_u32(&body[0..4]) as usize + 4
    };
    if len > body.len() {
        return Err(TagError::MalformedHeader("extended header overruns tag".into()));
    }
    Ok(len)
}

/// Determine the bits-per-byte of v2.4 frame sizes.
///
/// Some encoders (notably iTunes) write plain integers where v2.4 requires
/// syncsafe ones. Walk the frame sequence under both interpretations and keep
/// whichever reaches further through the body; ties go to syncsafe.
pub fn determine_bpi(frames: &[u8]) -> u8 {
    fn walk(data: &[u8], bits: u8) -> (usize, bool) {
        let mut pos = 0usize;
        let mut count = 0usize;
        while pos + HEADER_LEN <= data.len() {
            let id = &data[pos..pos + 4];
            if !id.iter().all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
                // Reached padding (or garbage); clean if it is all zeros
                return (count, data[pos..].iter().all(|&b| b == 0));
            }
            let size = BitPaddedInt::decode(&data[pos + 4..pos + 8], bits) as usize;
            let next = pos + HEADER_LEN + size;
            if next > data.len() {
                return (count, false);
            }
            count += 1;
            pos = next;
        }
        (count, pos == data.len() || data[pos..].iter().all(|&b| b == 0))
    }

    let (syncsafe_frames, syncsafe_clean) = walk(frames, 7);
    let (normal_frames, normal_clean) = walk(frames, 8);

    if normal_clean && !syncsafe_clean {
        return 8;
    }
    if normal_clean == syncsafe_clean && normal_frames > syncsafe_frames {
        return 8;
    }
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncsafe_encoding_matches_reference_values() {
        assert_eq!(BitPaddedInt::encode_syncsafe(257), [0, 0, 2, 1]);
        assert_eq!(BitPaddedInt::syncsafe(&[0, 0, 2, 1]), 257);
        assert_eq!(BitPaddedInt::encode_syncsafe(MAX_SYNCSAFE), [0x7F; 4]);
        assert_eq!(BitPaddedInt::decode(&[0, 0, 1, 0], 8), 256);
    }

    #[test]
    fn parse_rejects_missing_magic() {
        assert!(matches!(
            TagHeader::parse(b"\xFF\xFB\x90\x00\x00\x00\x00\x00\x00\x00"),
            Err(TagError::NoHeader)
        ));
        assert!(matches!(TagHeader::parse(b"ID3"), Err(TagError::NoHeader)));
    }

    #[test]
    fn parse_rejects_future_versions() {
        let data = b"ID3\x05\x00\x00\x00\x00\x00\x00";
        assert!(matches!(
            TagHeader::parse(data),
            Err(TagError::UnsupportedTagVersion(_))
        ));
    }

    #[test]
    fn parse_rejects_non_syncsafe_size() {
        let data = b"ID3\x04\x00\x00\x00\x00\x80\x00";
        assert!(matches!(
            TagHeader::parse(data),
            Err(TagError::MalformedHeader(_))
        ));
    }

    #[test]
    fn footer_counts_towards_tag_len() {
        let header = TagHeader::parse(b"ID3\x04\x00\x10\x00\x00\x00\x20").unwrap();
        assert!(header.flags.footer);
        assert_eq!(header.size, 32);
        assert_eq!(header.tag_len(), 52);
    }

    #[test]
    fn render_then_parse() {
        let raw = TagHeader::render(3, 1000);
        let header = TagHeader::parse(&raw).unwrap();
        assert_eq!(header.version, (3, 0));
        assert_eq!(header.size, 1000);
        assert_eq!(header.flags, TagFlags::default());
    }

    #[test]
    fn bpi_detects_itunes_plain_sizes() {
        // Frame with a 200-byte payload: plain size 0x000000C8 is not syncsafe
        let mut body = Vec::new();
        body.extend_from_slice(b"TIT2");
        body.extend_from_slice(&200u32.to_be_bytes());
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&[b'a'; 200]);
        body.extend_from_slice(&[0; 16]);
        assert_eq!(determine_bpi(&body), 8);

        let mut body = Vec::new();
        body.extend_from_slice(b"TIT2");
        body.extend_from_slice(&BitPaddedInt::encode_syncsafe(200));
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&[b'a'; 200]);
        assert_eq!(determine_bpi(&body), 7);
    }
}
