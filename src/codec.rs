//! Newline framing codec
//!
//! Splits a raw byte stream into discrete newline-terminated records and
//! serializes envelopes back onto the wire. The buffering is kept in the
//! IO-free [`FrameBuffer`] so the split logic can be tested without a
//! socket; [`FrameReader`] drives it from any `AsyncRead`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::AppError;

/// Size of the transport read chunk
const READ_CHUNK_SIZE: usize = 1024;

/// Growable byte buffer that yields complete newline-terminated records
///
/// Bytes arrive in arbitrary chunks; a trailing partial record stays
/// buffered until its newline arrives. Feeding the same bytes split at any
/// boundary yields the same record sequence as feeding them whole.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly arrived bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete record, if one is buffered
    ///
    /// Strips the trailing newline and any carriage return. Invalid UTF-8
    /// is replaced lossily; the JSON decode step rejects such records.
    pub fn next_record(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Number of buffered bytes awaiting a newline
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Reads framed records from an async transport
pub struct FrameReader<R> {
    inner: R,
    buffer: FrameBuffer,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: FrameBuffer::new(),
        }
    }

    /// Read the next non-blank record
    ///
    /// Returns `Ok(None)` on orderly remote close (zero-length read); a
    /// partial record with no newline at EOF is dropped.
    pub async fn next_record(&mut self) -> Result<Option<String>, AppError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            while let Some(record) = self.buffer.next_record() {
                if !record.trim().is_empty() {
                    return Ok(Some(record));
                }
            }

            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buffer.extend(&chunk[..n]);
        }
    }
}

/// Decode one record as a JSON message
pub fn decode<T: DeserializeOwned>(record: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(record)
}

/// Encode a message as one newline-terminated JSON record
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AuthReply, Envelope};

    fn drain(buffer: &mut FrameBuffer) -> Vec<String> {
        let mut records = Vec::new();
        while let Some(record) = buffer.next_record() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_single_record() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"{\"content\":\"hi\"}\n");
        assert_eq!(drain(&mut buffer), vec!["{\"content\":\"hi\"}"]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_partial_record_stays_buffered() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"{\"content\":");
        assert!(buffer.next_record().is_none());
        buffer.extend(b"\"hi\"}\n{\"cont");
        assert_eq!(drain(&mut buffer), vec!["{\"content\":\"hi\"}"]);
        assert_eq!(buffer.pending(), 6);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"one\r\ntwo\n");
        assert_eq!(drain(&mut buffer), vec!["one", "two"]);
    }

    #[test]
    fn test_arbitrary_split_boundaries_yield_same_records() {
        let input = b"{\"a\":1}\n{\"b\":2}\r\n{\"c\":3}\nleftover";

        let mut whole = FrameBuffer::new();
        whole.extend(input);
        let expected = drain(&mut whole);

        for split in 0..=input.len() {
            let mut buffer = FrameBuffer::new();
            buffer.extend(&input[..split]);
            let mut records = drain(&mut buffer);
            buffer.extend(&input[split..]);
            records.extend(drain(&mut buffer));
            assert_eq!(records, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_feed() {
        let input = b"{\"a\":1}\n{\"b\":2}\n";
        let mut buffer = FrameBuffer::new();
        let mut records = Vec::new();
        for byte in input {
            buffer.extend(std::slice::from_ref(byte));
            records.extend(drain(&mut buffer));
        }
        assert_eq!(records, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_frame_reader_skips_blank_lines_and_ends_on_eof() {
        let (mut writer, reader) = tokio::io::duplex(256);
        let mut frames = FrameReader::new(reader);

        use tokio::io::AsyncWriteExt;
        writer.write_all(b"\n\r\n{\"content\":\"x\"}\n").await.unwrap();
        drop(writer);

        let record = frames.next_record().await.unwrap().unwrap();
        let reply: AuthReply = decode(&record).unwrap();
        assert_eq!(reply.content, "x");
        assert!(frames.next_record().await.unwrap().is_none());
    }

    #[test]
    fn test_encode_appends_newline() {
        let bytes = encode(&Envelope::system("Server", "hello")).unwrap();
        assert_eq!(*bytes.last().unwrap(), b'\n');
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
