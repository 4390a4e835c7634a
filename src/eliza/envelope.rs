//! Connect streaming envelope codec
//!
//! Every streaming message is framed as one flag byte, a 4-byte big-endian
//! length and the JSON payload. The final frame of a response carries the
//! end-of-stream flag and an optional error.

use super::error::{Code, RpcError, WireError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub const FLAG_COMPRESSED: u8 = 0b01;
pub const FLAG_END_STREAM: u8 = 0b10;

const HEADER_LEN: usize = 5;

/// Raw response body as delivered by the HTTP client
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// One framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub flags: u8,
    pub payload: Bytes,
}

impl Envelope {
    pub fn is_end_stream(&self) -> bool {
        self.flags & FLAG_END_STREAM != 0
    }
}

/// Frame a message for a streaming request body
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, RpcError> {
    let payload = serde_json::to_vec(message)
        .map_err(|e| RpcError::internal("failed to encode request").with_cause(e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| RpcError::new(Code::ResourceExhausted, "message too large"))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(0);
    buf.put_u32(len);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Incremental decoder; frames may be split across or packed into chunks
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    buffer: BytesMut,
}

impl EnvelopeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Envelope> {
        if self.buffer.len() < HEADER_LEN {
            return None;
        }
        let flags = self.buffer[0];
        let len = u32::from_be_bytes([
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
            self.buffer[4],
        ]) as usize;
        if self.buffer.len() < HEADER_LEN + len {
            return None;
        }
        self.buffer.advance(HEADER_LEN);
        let payload = self.buffer.split_to(len).freeze();
        Some(Envelope { flags, payload })
    }

    /// Bytes held that do not yet form a complete frame
    pub fn has_partial_frame(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Reads envelopes off a response body
pub struct EnvelopeReader {
    body: ByteStream,
    decoder: EnvelopeDecoder,
}

impl EnvelopeReader {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            decoder: EnvelopeDecoder::new(),
        }
    }

    /// Next envelope, or `None` once the body ends on a frame boundary
    pub async fn next(&mut self) -> Result<Option<Envelope>, RpcError> {
        loop {
            if let Some(envelope) = self.decoder.next_frame() {
                return Ok(Some(envelope));
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(e)) => return Err(RpcError::transport(&e)),
                None if self.decoder.has_partial_frame() => {
                    return Err(RpcError::internal("stream ended inside a message frame"));
                }
                None => return Ok(None),
            }
        }
    }
}

/// A decoded frame of a response stream
#[derive(Debug, PartialEq, Eq)]
pub enum StreamItem<T> {
    Message(T),
    /// Clean end of stream
    End,
}

#[derive(Debug, Deserialize)]
struct EndStream {
    #[serde(default)]
    error: Option<WireError>,
}

/// Decode one envelope. An end-of-stream frame carrying an error becomes `Err`.
pub fn decode<T: DeserializeOwned>(envelope: &Envelope) -> Result<StreamItem<T>, RpcError> {
    if envelope.flags & FLAG_COMPRESSED != 0 {
        return Err(RpcError::internal(
            "received compressed message without a negotiated encoding",
        ));
    }

    if envelope.is_end_stream() {
        if envelope.payload.is_empty() {
            return Ok(StreamItem::End);
        }
        let end: EndStream = serde_json::from_slice(&envelope.payload)
            .map_err(|e| RpcError::internal("malformed end-of-stream message").with_cause(e))?;
        return match end.error {
            Some(error) => Err(error.into_rpc_error(Code::Unknown)),
            None => Ok(StreamItem::End),
        };
    }

    serde_json::from_slice(&envelope.payload)
        .map(StreamItem::Message)
        .map_err(|e| RpcError::internal("malformed response message").with_cause(e))
}
