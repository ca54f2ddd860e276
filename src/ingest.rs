//! Streamed-response ingestion.
//!
//! This module turns an incremental byte stream from the assistant
//! endpoint into a lazy, finite, non-restartable sequence of text
//! increments. Decoding is stateful across chunk boundaries: a multi-byte
//! UTF-8 sequence split across two chunks is buffered until its remaining
//! bytes arrive, never replaced or dropped.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{STREAM_CHUNKS, STREAM_ERRORS};

/// Incremental UTF-8 decoder that carries incomplete trailing sequences
/// between calls.
///
/// `decode` may return an empty string when a chunk ends mid-sequence;
/// the buffered bytes are prepended to the next chunk. Invalid (as
/// opposed to incomplete) sequences are an error.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Creates a decoder with no buffered bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a chunk, yielding all complete characters seen so far.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        match String::from_utf8(buf) {
            Ok(text) => Ok(text),
            Err(err) => {
                let utf8_err = err.utf8_error();
                let valid = utf8_err.valid_up_to();
                let incomplete = utf8_err.error_len().is_none();
                let buf = err.into_bytes();
                if incomplete {
                    // A sequence split at the chunk boundary; hold its
                    // prefix until the rest arrives.
                    let text = std::str::from_utf8(&buf[..valid])?.to_string();
                    self.pending = buf[valid..].to_vec();
                    Ok(text)
                } else {
                    Err(Error::encoding(
                        format!("invalid UTF-8 in stream at byte {valid}"),
                        None,
                    ))
                }
            }
        }
    }

    /// Signals end of stream. Errors if a partial sequence is still
    /// buffered, which means the stream was truncated mid-character.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            self.pending.clear();
            Err(Error::encoding(
                "stream ended inside a multi-byte UTF-8 sequence",
                None,
            ))
        }
    }

    /// Returns true if bytes are buffered awaiting the rest of a sequence.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Adapts a byte stream into a stream of decoded text increments.
///
/// The returned stream yields each non-empty decoded increment in arrival
/// order and terminates after the first error: an underlying read failure
/// or an encoding failure ends the sequence with that error rather than a
/// false done.
pub fn text_chunks<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin + 'static,
{
    let decoder = Utf8StreamDecoder::new();

    stream::unfold(
        (byte_stream, decoder, false),
        move |(mut stream, mut decoder, failed)| async move {
            if failed {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_CHUNKS.click();
                        match decoder.decode(&bytes) {
                            // All bytes buffered mid-sequence; read more.
                            Ok(text) if text.is_empty() => continue,
                            Ok(text) => return Some((Ok(text), (stream, decoder, false))),
                            Err(err) => {
                                STREAM_ERRORS.click();
                                return Some((Err(err), (stream, decoder, true)));
                            }
                        }
                    }
                    Some(Err(err)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), (stream, decoder, true)));
                    }
                    None => {
                        if let Err(err) = decoder.finish() {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, decoder, true)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_source(chunks: Vec<Bytes>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        Box::pin(stream::iter(chunks.into_iter().map(Ok)))
    }

    async fn accumulate(chunks: Vec<Bytes>) -> Result<String> {
        let mut stream = Box::pin(text_chunks(byte_source(chunks)));
        let mut out = String::new();
        while let Some(item) = stream.next().await {
            out.push_str(&item?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn single_chunk_ascii() {
        let chunks = vec![Bytes::from_static(b"Hello there")];
        assert_eq!(accumulate(chunks).await.unwrap(), "Hello there");
    }

    #[tokio::test]
    async fn increments_arrive_in_order() {
        let chunks = vec![
            Bytes::from_static(b"Hel"),
            Bytes::from_static(b"lo "),
            Bytes::from_static(b"there"),
        ];
        let mut stream = Box::pin(text_chunks(byte_source(chunks)));
        let mut parts = Vec::new();
        while let Some(item) = stream.next().await {
            parts.push(item.unwrap());
        }
        assert_eq!(parts, vec!["Hel", "lo ", "there"]);
    }

    #[tokio::test]
    async fn multibyte_split_across_chunks() {
        // "你好" is six bytes; split inside the second character.
        let all = "你好".as_bytes();
        let chunks = vec![
            Bytes::copy_from_slice(&all[..4]),
            Bytes::copy_from_slice(&all[4..]),
        ];
        assert_eq!(accumulate(chunks).await.unwrap(), "你好");
    }

    #[tokio::test]
    async fn every_split_point_matches_unfragmented() {
        let text = "héllo 世界 🚇 done";
        let all = text.as_bytes();
        for split in 0..=all.len() {
            let chunks = vec![
                Bytes::copy_from_slice(&all[..split]),
                Bytes::copy_from_slice(&all[split..]),
            ];
            let fragmented = accumulate(chunks).await.unwrap();
            assert_eq!(fragmented, text, "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn invalid_sequence_is_an_error() {
        // 0xff can never start a UTF-8 sequence.
        let chunks = vec![Bytes::from_static(b"ok "), Bytes::from_static(b"\xff\xfe")];
        let result = accumulate(chunks).await;
        assert!(result.unwrap_err().is_encoding());
    }

    #[tokio::test]
    async fn truncated_sequence_at_end_is_an_error() {
        // First two bytes of a three-byte sequence, then end of stream.
        let all = "世".as_bytes();
        let chunks = vec![Bytes::copy_from_slice(&all[..2])];
        let result = accumulate(chunks).await;
        assert!(result.unwrap_err().is_encoding());
    }

    #[tokio::test]
    async fn read_failure_terminates_with_error() {
        let source = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"partial ")),
            Err(Error::streaming("connection reset", None)),
            Ok(Bytes::from_static(b"never seen")),
        ]));
        let mut stream = Box::pin(text_chunks(source));

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial ");
        assert!(stream.next().await.unwrap().is_err());
        // Terminates after the error rather than resuming.
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn decoder_buffers_and_releases() {
        let mut decoder = Utf8StreamDecoder::new();
        let all = "🚇".as_bytes();

        assert_eq!(decoder.decode(&all[..2]).unwrap(), "");
        assert!(decoder.has_pending());

        assert_eq!(decoder.decode(&all[2..]).unwrap(), "🚇");
        assert!(!decoder.has_pending());
        assert!(decoder.finish().is_ok());
    }
}
