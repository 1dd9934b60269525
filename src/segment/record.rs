//! The data record format shared by spill, merge and data files.
//!
//! A segment file is an 8-byte magic followed by records. Each record is a
//! 9-digit zero-padded decimal length and exactly that many payload bytes:
//!
//! ```text
//! <length:9 ASCII digits><payload>
//! payload := <termByteLen> ':' <term> ( '#' <docID> ( ';' <offset> )+ )*
//! ```
//!
//! The term is read by its byte length, so it may contain any character,
//! including the `#`, `;` and `:` delimiters.

use std::io::{ErrorKind, Read, Write};

use crate::error::{PilumError, Result};
use crate::postings::{Posting, PostingsList};

/// Magic bytes at the start of every segment file.
///
/// No record can start at offset 0, so a zero dictionary slot always means
/// "empty".
pub const SEGMENT_MAGIC: &[u8; 8] = b"PILUMSEG";

/// Width of the decimal length prefix.
pub const LENGTH_PREFIX_WIDTH: usize = 9;

/// Largest payload the length prefix can express.
pub const MAX_PAYLOAD_LEN: usize = 999_999_999;

const TERM_LEN_SEPARATOR: char = ':';
const DOC_SEPARATOR: char = '#';
const OFFSET_SEPARATOR: char = ';';

/// One decoded record: a term and its postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub term: String,
    pub postings: PostingsList,
}

impl DataRecord {
    pub fn new(term: impl Into<String>, postings: PostingsList) -> Self {
        DataRecord {
            term: term.into(),
            postings,
        }
    }
}

/// Write the segment file header.
pub fn write_header<W: Write>(writer: &mut W) -> Result<u64> {
    writer.write_all(SEGMENT_MAGIC)?;
    Ok(SEGMENT_MAGIC.len() as u64)
}

/// Read and check the segment file header.
pub fn read_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PilumError::malformed("file is shorter than its header"),
        _ => PilumError::Io(e),
    })?;

    if &magic != SEGMENT_MAGIC {
        return Err(PilumError::malformed("not a segment file (bad magic)"));
    }
    Ok(())
}

/// Serialize a record payload.
pub fn encode_payload(term: &str, postings: &PostingsList) -> String {
    let mut payload = String::with_capacity(term.len() + 8 + postings.len() * 8);
    payload.push_str(&term.len().to_string());
    payload.push(TERM_LEN_SEPARATOR);
    payload.push_str(term);

    for posting in postings {
        payload.push(DOC_SEPARATOR);
        payload.push_str(&posting.doc_id.to_string());
        for offset in posting.offsets() {
            payload.push(OFFSET_SEPARATOR);
            payload.push_str(&offset.to_string());
        }
    }

    payload
}

/// Parse a record payload.
pub fn decode_payload(payload: &[u8]) -> Result<DataRecord> {
    let colon = payload
        .iter()
        .position(|&b| b == TERM_LEN_SEPARATOR as u8)
        .ok_or_else(|| PilumError::malformed("payload has no term length"))?;

    let term_len: usize = parse_number(&payload[..colon], "term length")?;
    let term_start = colon + 1;
    let term_end = term_start
        .checked_add(term_len)
        .filter(|&end| end <= payload.len())
        .ok_or_else(|| PilumError::malformed("term length exceeds payload"))?;

    let term = std::str::from_utf8(&payload[term_start..term_end])
        .map_err(|e| PilumError::malformed(format!("term is not UTF-8: {e}")))?
        .to_string();

    let rest = std::str::from_utf8(&payload[term_end..])
        .map_err(|e| PilumError::malformed(format!("postings are not UTF-8: {e}")))?;

    Ok(DataRecord {
        term,
        postings: decode_postings(rest)?,
    })
}

fn decode_postings(text: &str) -> Result<PostingsList> {
    let mut postings = PostingsList::new();
    if text.is_empty() {
        return Ok(postings);
    }

    let Some(body) = text.strip_prefix(DOC_SEPARATOR) else {
        return Err(PilumError::malformed(format!(
            "expected '{DOC_SEPARATOR}' after term"
        )));
    };

    let mut last_doc = None;
    for entry in body.split(DOC_SEPARATOR) {
        let mut fields = entry.split(OFFSET_SEPARATOR);
        let doc_id: u64 = parse_number(fields.next().unwrap_or("").as_bytes(), "doc id")?;
        if last_doc.is_some_and(|last| last >= doc_id) {
            return Err(PilumError::malformed(format!(
                "doc id {doc_id} is not ascending"
            )));
        }

        let mut offsets = Vec::new();
        for field in fields {
            let offset: u32 = parse_number(field.as_bytes(), "offset")?;
            if offsets.last().is_some_and(|&last| last >= offset) {
                return Err(PilumError::malformed(format!(
                    "offset {offset} of doc {doc_id} is not ascending"
                )));
            }
            offsets.push(offset);
        }
        if offsets.is_empty() {
            return Err(PilumError::malformed(format!("doc {doc_id} has no offsets")));
        }

        postings.push(Posting::from_sorted_offsets(doc_id, offsets));
        last_doc = Some(doc_id);
    }

    Ok(postings)
}

fn parse_number<T: std::str::FromStr>(digits: &[u8], what: &str) -> Result<T> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(PilumError::malformed(format!(
            "{what} is not a decimal number: {:?}",
            String::from_utf8_lossy(digits)
        )));
    }

    // All-ASCII digits, so the only failure left is overflow.
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PilumError::malformed(format!("{what} is out of range")))
}

/// Append one framed record. Returns the number of bytes written.
pub fn write_record<W: Write>(writer: &mut W, term: &str, postings: &PostingsList) -> Result<u64> {
    let payload = encode_payload(term, postings);
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PilumError::invalid_argument(format!(
            "record for term {term:?} is {} bytes, above the {MAX_PAYLOAD_LEN} byte limit",
            payload.len()
        )));
    }

    writer.write_all(format!("{:09}", payload.len()).as_bytes())?;
    writer.write_all(payload.as_bytes())?;

    Ok((LENGTH_PREFIX_WIDTH + payload.len()) as u64)
}

/// Read one framed record.
///
/// Returns `Ok(None)` at a clean end of file, `MalformedRecord` when the
/// prefix is not a number or the payload is shorter than declared, and the
/// record with its framed length otherwise.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<(DataRecord, u64)>> {
    let mut prefix = [0u8; LENGTH_PREFIX_WIDTH];
    let filled = read_fully(reader, &mut prefix)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < LENGTH_PREFIX_WIDTH {
        return Err(PilumError::malformed(format!(
            "truncated length prefix ({filled} of {LENGTH_PREFIX_WIDTH} bytes)"
        )));
    }

    let len: usize = parse_number(&prefix, "length prefix")?;
    let mut payload = Vec::new();
    let filled = Read::take(&mut *reader, len as u64).read_to_end(&mut payload)?;
    if filled < len {
        return Err(PilumError::malformed(format!(
            "truncated payload ({filled} of {len} bytes)"
        )));
    }

    let record = decode_payload(&payload)?;
    Ok(Some((record, (LENGTH_PREFIX_WIDTH + len) as u64)))
}

/// Fill `buf` as far as the reader allows, returning the byte count.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn sample_postings() -> PostingsList {
        let mut postings = PostingsList::new();
        postings.add_occurrence(0, 3);
        postings.add_occurrence(0, 7);
        postings.add_occurrence(12, 0);
        postings
    }

    #[test]
    fn test_encode_payload_format() {
        let payload = encode_payload("cat", &sample_postings());
        assert_eq!(payload, "3:cat#0;3;7#12;0");
    }

    #[test]
    fn test_framed_record() {
        let mut buf = Vec::new();
        let written = write_record(&mut buf, "cat", &sample_postings()).unwrap();

        assert_eq!(&buf[..9], b"000000016");
        assert_eq!(written, buf.len() as u64);

        let (record, len) = read_record(&mut Cursor::new(&buf)).unwrap().unwrap();
        assert_eq!(record.term, "cat");
        assert_eq!(record.postings, sample_postings());
        assert_eq!(len, written);
    }

    #[test]
    fn test_terms_with_delimiters() {
        for term in ["a#b", "x;y;z", "12:ab", "#;:", "ünïcödé", ""] {
            let payload = encode_payload(term, &sample_postings());
            let record = decode_payload(payload.as_bytes()).unwrap();
            assert_eq!(record.term, term);
            assert_eq!(record.postings, sample_postings());
        }
    }

    #[test]
    fn test_clean_eof_is_none() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(read_record(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_malformed_framing() {
        // Prefix is not a number
        let err = read_record(&mut Cursor::new(b"00000x0033:cat#0;1".to_vec())).unwrap_err();
        assert!(err.is_malformed());

        // Payload shorter than declared
        let err = read_record(&mut Cursor::new(b"0000000503:cat".to_vec())).unwrap_err();
        assert!(err.is_malformed());

        // Prefix cut short
        let err = read_record(&mut Cursor::new(b"0000".to_vec())).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_huge_declared_length_on_short_input() {
        let err = read_record(&mut Cursor::new(b"9999999993:cat#0;1".to_vec())).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("9 of 999999999 bytes"));
    }

    #[test]
    fn test_consecutive_records_read_exactly() {
        let mut buf = Vec::new();
        write_record(&mut buf, "cat", &sample_postings()).unwrap();
        write_record(&mut buf, "dog", &sample_postings()).unwrap();

        let mut cursor = Cursor::new(buf);
        let (first, _) = read_record(&mut cursor).unwrap().unwrap();
        let (second, _) = read_record(&mut cursor).unwrap().unwrap();
        assert_eq!(first.term, "cat");
        assert_eq!(second.term, "dog");
        assert!(read_record(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_malformed_payload() {
        for payload in [
            "cat#0;1",     // no term length
            "9:cat#0;1",   // term length too long
            "3:catx0;1",   // missing doc separator
            "3:cat#0",     // doc without offsets
            "3:cat#1;1#0;2", // doc ids not ascending
            "3:cat#0;4;2", // offsets not ascending
            "3:cat#a;1",   // doc id not a number
        ] {
            assert!(
                decode_payload(payload.as_bytes()).unwrap_err().is_malformed(),
                "{payload} should be rejected"
            );
        }
    }

    #[test]
    fn test_header() {
        let mut buf = Vec::new();
        assert_eq!(write_header(&mut buf).unwrap(), 8);
        assert!(read_header(&mut Cursor::new(&buf)).is_ok());

        assert!(read_header(&mut Cursor::new(b"NOTASEGM".to_vec())).is_err());
        assert!(read_header(&mut Cursor::new(b"PIL".to_vec())).unwrap_err().is_malformed());
    }
}
