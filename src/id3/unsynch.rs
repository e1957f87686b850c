use memchr::memchr;

/// Reverse ID3v2 unsynchronisation: drop each 0x00 that follows a 0xFF.
///
/// Used for v2.3 tags with the header unsynchronisation flag (whole body) and
/// for v2.4 frames carrying the per-frame flag.
pub fn decode(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len());
    let mut rest = data;
    while let Some(pos) = memchr(0xFF, rest) {
        output.extend_from_slice(&rest[..=pos]);
        rest = &rest[pos + 1..];
        if rest.first() == Some(&0x00) {
            rest = &rest[1..];
        }
    }
    output.extend_from_slice(rest);
    output
}
