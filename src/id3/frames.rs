use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::common::error::{Result, TagError};
use crate::id3::header::{BitPaddedInt, MAX_SYNCSAFE};
use crate::id3::specs::{self, Encoding};

/// Length of a v2.3/v2.4 frame header.
pub const FRAME_HEADER_LEN: usize = 10;
/// Length of a v2.2 frame header.
pub const V22_FRAME_HEADER_LEN: usize = 6;

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit()
}

/// A 4-character frame identifier matching `[A-Z0-9]{4}`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId([u8; 4]);

impl FrameId {
    pub const ARTIST: FrameId = FrameId(*b"TPE1");
    pub const TITLE: FrameId = FrameId(*b"TIT2");
    pub const ALBUM: FrameId = FrameId(*b"TALB");

    /// For ids known at compile time; `id` must match `[A-Z0-9]{4}`.
    pub(crate) const fn from_static(id: &[u8; 4]) -> Self {
        FrameId(*id)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [a, b, c, d] if bytes.iter().all(|&x| is_id_byte(x)) => Some(FrameId([*a, *b, *c, *d])),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Validated as ASCII on construction
        std::str::from_utf8(&self.0).unwrap_or("XXXX")
    }

    /// Standard text information frames: `T***` except the user-defined `TXXX`.
    pub fn is_text(&self) -> bool {
        self.0[0] == b'T' && &self.0 != b"TXXX"
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.as_str())
    }
}

/// The two frame flag bytes, kept exactly as read.
/// Bit meanings differ between v2.3 and v2.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(pub u16);

impl FrameFlags {
    pub const V24_UNSYNCHRONISED: u16 = 0x0002;

    pub fn compressed(self, version: u8) -> bool {
        match version {
            4 => self.0 & 0x0008 != 0,
            3 => self.0 & 0x0080 != 0,
            _ => false,
        }
    }

    pub fn encrypted(self, version: u8) -> bool {
        match version {
            4 => self.0 & 0x0004 != 0,
            3 => self.0 & 0x0040 != 0,
            _ => false,
        }
    }

    pub fn unsynchronised(self, version: u8) -> bool {
        version == 4 && self.0 & Self::V24_UNSYNCHRONISED != 0
    }

    /// A 4-byte decompressed-size field precedes the payload.
    pub fn has_data_length(self, version: u8) -> bool {
        match version {
            4 => self.0 & 0x0001 != 0,
            // v2.3 compressed frames always carry it
            3 => self.0 & 0x0080 != 0,
            _ => false,
        }
    }

    /// Grouping identity byte precedes the payload.
    pub fn grouped(self, version: u8) -> bool {
        match version {
            4 => self.0 & 0x0040 != 0,
            3 => self.0 & 0x0020 != 0,
            _ => false,
        }
    }

    /// True if the stored payload is not the plain frame content.
    pub fn transforms_payload(self, version: u8) -> bool {
        self.compressed(version)
            || self.encrypted(version)
            || self.unsynchronised(version)
            || self.has_data_length(version)
            || self.grouped(version)
    }
}

/// A text information frame decoded into a value.
///
/// `payload` holds the exact bytes that will be written: the bytes read from
/// disk until [`TextFrame::set_value`] re-encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    id: FrameId,
    flags: FrameFlags,
    encoding: Encoding,
    value: String,
    payload: Vec<u8>,
}

impl TextFrame {
    pub fn new(id: FrameId, value: &str, encoding: Encoding) -> Self {
        TextFrame {
            id,
            flags: FrameFlags::default(),
            encoding,
            value: value.to_string(),
            payload: encode_text_payload(value, encoding),
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: &str, encoding: Encoding) {
        self.encoding = encoding;
        self.value = value.to_string();
        self.payload = encode_text_payload(value, encoding);
    }
}

/// A frame kept as opaque bytes: unknown types, unsupported encodings and
/// frames whose flags transform the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub id: FrameId,
    pub flags: FrameFlags,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(TextFrame),
    Raw(RawFrame),
}

impl Frame {
    pub fn id(&self) -> FrameId {
        match self {
            Frame::Text(f) => f.id,
            Frame::Raw(f) => f.id,
        }
    }

    pub fn flags(&self) -> FrameFlags {
        match self {
            Frame::Text(f) => f.flags,
            Frame::Raw(f) => f.flags,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Frame::Text(f) => &f.payload,
            Frame::Raw(f) => &f.payload,
        }
    }

    pub fn as_text(&self) -> Option<&TextFrame> {
        match self {
            Frame::Text(f) => Some(f),
            Frame::Raw(_) => None,
        }
    }

    fn into_parts(self) -> (FrameId, FrameFlags, Vec<u8>) {
        match self {
            Frame::Text(f) => (f.id, f.flags, f.payload),
            Frame::Raw(f) => (f.id, f.flags, f.payload),
        }
    }

    /// Mark a v2.4 frame as unsynchronised, for tags whose header flag
    /// applies unsynchronisation to every frame. The stored bytes are kept
    /// so the frame is written back exactly as read.
    pub fn into_unsynchronised(self) -> Frame {
        let (id, flags, payload) = self.into_parts();
        Frame::Raw(RawFrame {
            id,
            flags: FrameFlags(flags.0 | FrameFlags::V24_UNSYNCHRONISED),
            payload,
        })
    }

    /// The same frame under another id, payload and flags unchanged.
    pub fn with_id(self, new_id: FrameId) -> Frame {
        match self {
            Frame::Text(mut f) => {
                f.id = new_id;
                Frame::Text(f)
            }
            Frame::Raw(mut f) => {
                f.id = new_id;
                Frame::Raw(f)
            }
        }
    }

    /// Classify a frame read from disk.
    fn classify(id: FrameId, flags: FrameFlags, payload: Vec<u8>, version: u8) -> Frame {
        if !id.is_text() || flags.transforms_payload(version) {
            return Frame::Raw(RawFrame { id, flags, payload });
        }
        let encoding = match payload.first() {
            None => Ok(Encoding::Latin1),
            Some(&b) => Encoding::from_byte(b),
        };
        match encoding {
            Ok(encoding) => {
                let value = decode_text_payload(&payload).unwrap_or_default();
                Frame::Text(TextFrame {
                    id,
                    flags,
                    encoding,
                    value,
                    payload,
                })
            }
            Err(e) => {
                log::warn!("Keeping {} frame opaque: {}", id, e);
                Frame::Raw(RawFrame { id, flags, payload })
            }
        }
    }
}

// ---- Text payloads ----

/// Decode a text frame payload: marker byte, then text in that encoding.
/// Trailing NULs are stripped; NUL-separated values are joined with `/`.
pub fn decode_text_payload(payload: &[u8]) -> Result<String> {
    let Some((&marker, text)) = payload.split_first() else {
        return Ok(String::new());
    };
    let encoding = Encoding::from_byte(marker)?;
    let decoded = specs::decode_text(text, encoding);
    let trimmed = decoded.trim_end_matches('\0');
    if trimmed.contains('\0') {
        Ok(trimmed
            .split('\0')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/"))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn encode_text_payload(text: &str, encoding: Encoding) -> Vec<u8> {
    let mut data = vec![encoding as u8];
    data.extend_from_slice(&specs::encode_text(text, encoding));
    data
}

// ---- Frame headers ----

/// Decode one v2.3/v2.4 frame starting at `offset`.
///
/// `size_bits` is 7 for syncsafe v2.4 sizes and 8 otherwise. Returns the frame
/// and the number of bytes consumed. [`TagError::MalformedFrame`] marks the
/// start of padding or the end of usable data.
pub fn decode_frame(data: &[u8], offset: usize, version: u8, size_bits: u8) -> Result<(Frame, usize)> {
    let rest = data.get(offset..).unwrap_or_default();
    let id = rest
        .get(0..4)
        .and_then(FrameId::from_slice)
        .ok_or(TagError::MalformedFrame { offset })?;

    if rest.len() < FRAME_HEADER_LEN {
        return Err(TagError::TruncatedFrame {
            id: id.to_string(),
            declared: FRAME_HEADER_LEN,
            available: rest.len(),
        });
    }

    let size = if version == 4 {
        BitPaddedInt::decode(&rest[4..8], size_bits) as usize
    } else {
        BigEndian::read_u32(&rest[4..8]) as usize
    };
    let flags = FrameFlags(BigEndian::read_u16(&rest[8..10]));

    let available = rest.len() - FRAME_HEADER_LEN;
    if size > available {
        return Err(TagError::TruncatedFrame {
            id: id.to_string(),
            declared: size,
            available,
        });
    }

    let payload = rest[FRAME_HEADER_LEN..FRAME_HEADER_LEN + size].to_vec();
    Ok((Frame::classify(id, flags, payload, version), FRAME_HEADER_LEN + size))
}

/// Decode one v2.2 frame (3-byte id, 3-byte size) starting at `offset`.
///
/// The id is upgraded to its 4-byte equivalent. Frames with no v2.3+
/// equivalent yield `None` along with the consumed length so the caller can
/// skip them.
pub fn decode_frame_v22(data: &[u8], offset: usize) -> Result<(Option<Frame>, usize)> {
    let rest = data.get(offset..).unwrap_or_default();
    let id_bytes = match rest.get(0..3) {
        Some(id) if id.iter().all(|&b| is_id_byte(b)) => id,
        _ => return Err(TagError::MalformedFrame { offset }),
    };
    let id_str = std::str::from_utf8(id_bytes).unwrap_or("XXX");

    if rest.len() < V22_FRAME_HEADER_LEN {
        return Err(TagError::TruncatedFrame {
            id: id_str.to_string(),
            declared: V22_FRAME_HEADER_LEN,
            available: rest.len(),
        });
    }

    let size = BigEndian::read_u24(&rest[3..6]) as usize;
    let available = rest.len() - V22_FRAME_HEADER_LEN;
    if size > available {
        return Err(TagError::TruncatedFrame {
            id: id_str.to_string(),
            declared: size,
            available,
        });
    }
    let consumed = V22_FRAME_HEADER_LEN + size;
    let payload = &rest[V22_FRAME_HEADER_LEN..consumed];

    let Some(id) = convert_v22_frame_id(id_str).and_then(|s| FrameId::from_slice(s.as_bytes())) else {
        log::warn!("Dropping v2.2 frame {} with no v2.3+ equivalent", id_str);
        return Ok((None, consumed));
    };

    let payload = if id_bytes == b"PIC" {
        match upgrade_v22_picture(payload) {
            Some(p) => p,
            None => {
                log::warn!("Dropping malformed v2.2 PIC frame");
                return Ok((None, consumed));
            }
        }
    } else {
        payload.to_vec()
    };

    Ok((Some(Frame::classify(id, FrameFlags::default(), payload, 2)), consumed))
}

/// Serialize a frame for a v2.3 or v2.4 tag: id, size, flags, payload.
pub fn encode_frame(frame: &Frame, version: u8) -> Result<Vec<u8>> {
    let payload = frame.payload();
    let size = u32::try_from(payload.len())
        .ok()
        .filter(|&s| version != 4 || s <= MAX_SYNCSAFE)
        .ok_or_else(|| TagError::TooLarge {
            id: frame.id().to_string(),
            size: payload.len(),
        })?;

    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(frame.id().as_bytes());
    if version == 4 {
        out.extend_from_slice(&BitPaddedInt::encode_syncsafe(size));
    } else {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, size);
        out.extend_from_slice(&buf);
    }
    let mut flag_buf = [0u8; 2];
    BigEndian::write_u16(&mut flag_buf, frame.flags().0);
    out.extend_from_slice(&flag_buf);
    out.extend_from_slice(payload);
    Ok(out)
}

// ---- v2.2 to v2.3/v2.4 conversion ----

/// Convert a v2.2 3-char frame ID to its v2.3+ 4-char equivalent.
pub fn convert_v22_frame_id(id: &str) -> Option<&'static str> {
    Some(match id {
        "BUF" => "RBUF",
        "CNT" => "PCNT",
        "COM" => "COMM",
        "CRA" => "AENC",
        "ETC" => "ETCO",
        "GEO" => "GEOB",
        "IPL" => "IPLS",
        "LNK" => "LINK",
        "MCI" => "MCDI",
        "MLL" => "MLLT",
        "PIC" => "APIC",
        "POP" => "POPM",
        "REV" => "RVRB",
        "SLT" => "SYLT",
        "STC" => "SYTC",
        "TAL" => "TALB",
        "TBP" => "TBPM",
        "TCM" => "TCOM",
        "TCO" => "TCON",
        "TCR" => "TCOP",
        "TDA" => "TDAT",
        "TDY" => "TDLY",
        "TEN" => "TENC",
        "TFT" => "TFLT",
        "TIM" => "TIME",
        "TKE" => "TKEY",
        "TLA" => "TLAN",
        "TLE" => "TLEN",
        "TMT" => "TMED",
        "TOA" => "TOPE",
        "TOF" => "TOFN",
        "TOL" => "TOLY",
        "TOR" => "TORY",
        "TOT" => "TOAL",
        "TP1" => "TPE1",
        "TP2" => "TPE2",
        "TP3" => "TPE3",
        "TP4" => "TPE4",
        "TPA" => "TPOS",
        "TPB" => "TPUB",
        "TRC" => "TSRC",
        "TRD" => "TRDA",
        "TRK" => "TRCK",
        "TSI" => "TSIZ",
        "TSS" => "TSSE",
        "TT1" => "TIT1",
        "TT2" => "TIT2",
        "TT3" => "TIT3",
        "TXT" => "TEXT",
        "TXX" => "TXXX",
        "TYE" => "TYER",
        "UFI" => "UFID",
        "ULT" => "USLT",
        "WAF" => "WOAF",
        "WAR" => "WOAR",
        "WAS" => "WOAS",
        "WCM" => "WCOM",
        "WCP" => "WCOP",
        "WPB" => "WPUB",
        "WXX" => "WXXX",
        _ => return None,
    })
}

/// Rewrite a v2.2 PIC payload into the APIC layout.
///
/// PIC stores a 3-char image format where APIC stores a NUL-terminated MIME
/// type; everything after it (picture type, description, data) is identical.
fn upgrade_v22_picture(payload: &[u8]) -> Option<Vec<u8>> {
    if payload.len() < 5 {
        return None;
    }
    let format = std::str::from_utf8(&payload[1..4]).ok()?;
    let mime = match format.to_ascii_uppercase().as_str() {
        "JPG" => "image/jpeg".to_string(),
        "PNG" => "image/png".to_string(),
        "-->" => "-->".to_string(),
        other => format!("image/{}", other.to_ascii_lowercase()),
    };
    let mut out = Vec::with_capacity(payload.len() + mime.len());
    out.push(payload[0]);
    out.extend_from_slice(mime.as_bytes());
    out.push(0);
    out.extend_from_slice(&payload[4..]);
    Some(out)
}
