// Note body decoding for ZICNOTEDATA.ZDATA blobs.
//
// Blobs are gzip-compressed protobuf. The plain text lives at
// NoteStoreProto(2) -> Document(3) -> Note(2); attachments appear inline as
// U+FFFC which is stripped.

use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const OBJECT_REPLACEMENT: char = '\u{fffc}';

/// Extract the plain text of a note, or `None` when the blob is not a
/// readable note body.
pub fn decode_note_text(data: &[u8]) -> Option<String> {
    let raw = inflate(data)?;
    let document = find_bytes_field(&raw, 2)?;
    let note = find_bytes_field(document, 3)?;
    let text = find_bytes_field(note, 2)?;
    let text = String::from_utf8_lossy(text);
    Some(text.chars().filter(|c| *c != OBJECT_REPLACEMENT).collect())
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Some(data.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out).ok()?;
    Some(out)
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = *buf.get(*pos)?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

/// First length-delimited field with the given number at this message level.
fn find_bytes_field(buf: &[u8], wanted: u64) -> Option<&[u8]> {
    let mut pos = 0;
    while pos < buf.len() {
        let key = read_varint(buf, &mut pos)?;
        let (number, wire_type) = (key >> 3, key & 0x7);
        match wire_type {
            0 => {
                read_varint(buf, &mut pos)?;
            }
            1 => pos = pos.checked_add(8)?,
            2 => {
                let len = usize::try_from(read_varint(buf, &mut pos)?).ok()?;
                let end = pos.checked_add(len)?;
                let payload = buf.get(pos..end)?;
                if number == wanted {
                    return Some(payload);
                }
                pos = end;
            }
            5 => pos = pos.checked_add(4)?,
            _ => return None,
        }
    }
    None
}
