// ABOUTME: Compression negotiation and payload encoding for streaming transports
// ABOUTME: Brotli, gzip and deflate codecs with size thresholds and a rolling ratio
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Compression
//!
//! The server prefers brotli, then gzip, then deflate. A payload is only
//! compressed when it is larger than the configured threshold and when the
//! compressed form is actually smaller. An encoder failure never fails the
//! stream: the payload is sent as-is and the failure is logged.
//!
//! WebSocket frames are compressed one by one through [`Compressor`]. SSE
//! responses are compressed as a whole with a [`StreamEncoder`] that flushes
//! after every write, so clients can decode each event as soon as it arrives.

use cadence_core::constants::compression::{
    BROTLI_BUFFER_SIZE, BROTLI_LG_WINDOW, BROTLI_QUALITY, MIN_COMPRESSION_BYTES,
};
use cadence_core::errors::StreamError;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Payload codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    /// Brotli
    #[serde(rename = "br")]
    Brotli,
    /// Gzip
    #[serde(rename = "gzip")]
    Gzip,
    /// Zlib-wrapped deflate, as HTTP `deflate` specifies
    #[serde(rename = "deflate")]
    Deflate,
    /// No compression
    #[serde(rename = "none")]
    None,
}

impl Codec {
    /// Server preference order, best first
    pub const PREFERENCE: [Self; 3] = [Self::Brotli, Self::Gzip, Self::Deflate];

    /// Wire token
    #[must_use]
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::None => "none",
        }
    }

    /// Parse a capability or `Accept-Encoding` token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "br" | "brotli" => Some(Self::Brotli),
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            "none" | "identity" => Some(Self::None),
            _ => None,
        }
    }

    /// Value for a `Content-Encoding` header
    #[must_use]
    pub const fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            other => Some(other.token()),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Turn an `Accept-Encoding` header or a comma-separated capability list into codecs
///
/// Keeps the client's order, drops unknown tokens and entries with `q=0`, and
/// expands `*` to every supported codec.
#[must_use]
pub fn parse_accept_encoding(header: &str) -> Vec<Codec> {
    let mut codecs = Vec::new();
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let token = parts.next().unwrap_or_default().trim();
        let refused = parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f64>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if refused {
            continue;
        }

        let candidates: Vec<Codec> = if token == "*" {
            Codec::PREFERENCE.to_vec()
        } else {
            Codec::from_token(token).into_iter().collect()
        };
        for codec in candidates {
            if codec != Codec::None && !codecs.contains(&codec) {
                codecs.push(codec);
            }
        }
    }
    codecs
}

/// Pick the best codec both sides support
#[must_use]
pub fn negotiate(capabilities: &[Codec]) -> Codec {
    Codec::PREFERENCE
        .into_iter()
        .find(|codec| capabilities.contains(codec))
        .unwrap_or(Codec::None)
}

fn compression_error(codec: Codec, source: io::Error) -> StreamError {
    StreamError::Compression {
        codec: codec.token(),
        source,
    }
}

/// Compress a complete payload
///
/// # Errors
///
/// Returns [`StreamError::Compression`] if the encoder fails
pub fn compress(payload: &[u8], codec: Codec) -> Result<Vec<u8>, StreamError> {
    let encoded = match codec {
        Codec::None => Ok(payload.to_vec()),
        Codec::Brotli => {
            let mut writer = brotli::CompressorWriter::new(
                Vec::new(),
                BROTLI_BUFFER_SIZE,
                BROTLI_QUALITY,
                BROTLI_LG_WINDOW,
            );
            writer.write_all(payload).map(|()| writer.into_inner())
        }
        Codec::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload).and_then(|()| encoder.finish())
        }
        Codec::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload).and_then(|()| encoder.finish())
        }
    };
    encoded.map_err(|e| compression_error(codec, e))
}

/// Decompress a complete payload
///
/// # Errors
///
/// Returns [`StreamError::Compression`] if the payload is not valid for `codec`
pub fn decompress(payload: &[u8], codec: Codec) -> Result<Vec<u8>, StreamError> {
    let mut decoded = Vec::new();
    let result = match codec {
        Codec::None => {
            decoded.extend_from_slice(payload);
            Ok(payload.len())
        }
        Codec::Brotli => {
            brotli::Decompressor::new(payload, BROTLI_BUFFER_SIZE).read_to_end(&mut decoded)
        }
        Codec::Gzip => flate2::read::GzDecoder::new(payload).read_to_end(&mut decoded),
        Codec::Deflate => flate2::read::ZlibDecoder::new(payload).read_to_end(&mut decoded),
    };
    result.map_err(|e| compression_error(codec, e))?;
    Ok(decoded)
}

/// Result of an attempted compression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Bytes to send
    pub bytes: Vec<u8>,
    /// Codec actually applied; `None` when sent as-is
    pub codec: Codec,
}

impl Encoded {
    /// Whether the bytes are compressed
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.codec != Codec::None
    }
}

/// Per-connection frame compressor with a rolling compression ratio
#[derive(Debug, Clone)]
pub struct Compressor {
    codec: Codec,
    threshold: usize,
    samples: u64,
    average_ratio: f64,
}

impl Compressor {
    /// Compressor for the negotiated codec
    #[must_use]
    pub const fn new(codec: Codec, threshold: usize) -> Self {
        Self {
            codec,
            threshold,
            samples: 0,
            average_ratio: 1.0,
        }
    }

    /// Negotiated codec
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Compress `payload` when it is worth it
    pub fn encode(&mut self, payload: &[u8]) -> Encoded {
        let passthrough = || Encoded {
            bytes: payload.to_vec(),
            codec: Codec::None,
        };
        if self.codec == Codec::None || payload.len() <= self.threshold {
            return passthrough();
        }

        match compress(payload, self.codec) {
            Ok(bytes) if bytes.len() < payload.len() => {
                self.record(payload.len(), bytes.len());
                Encoded {
                    bytes,
                    codec: self.codec,
                }
            }
            Ok(_) => passthrough(),
            Err(e) => {
                warn!(codec = %self.codec, error = %e, "Compression failed, sending uncompressed");
                passthrough()
            }
        }
    }

    fn record(&mut self, original: usize, compressed: usize) {
        let ratio = compressed as f64 / original as f64;
        self.samples += 1;
        self.average_ratio += (ratio - self.average_ratio) / self.samples as f64;
    }

    /// Average compressed/original size over compressed payloads
    #[must_use]
    pub fn average_ratio(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.average_ratio)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(Codec::None, MIN_COMPRESSION_BYTES)
    }
}

/// Write target shared between an encoder and its owner
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        let mut buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buffer)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum EncoderKind {
    Brotli(Box<brotli::CompressorWriter<SharedBuffer>>),
    Gzip(GzEncoder<SharedBuffer>),
    Deflate(ZlibEncoder<SharedBuffer>),
}

/// Streaming encoder for a whole response body
///
/// Every [`StreamEncoder::encode`] call returns the bytes produced by a sync
/// flush, so the output received so far always decodes to everything written.
pub struct StreamEncoder {
    codec: Codec,
    kind: EncoderKind,
    output: SharedBuffer,
}

impl StreamEncoder {
    /// Encoder for `codec`; `None` when the codec is [`Codec::None`]
    #[must_use]
    pub fn new(codec: Codec) -> Option<Self> {
        let output = SharedBuffer::default();
        let kind = match codec {
            Codec::None => return None,
            Codec::Brotli => EncoderKind::Brotli(Box::new(brotli::CompressorWriter::new(
                output.clone(),
                BROTLI_BUFFER_SIZE,
                BROTLI_QUALITY,
                BROTLI_LG_WINDOW,
            ))),
            Codec::Gzip => EncoderKind::Gzip(GzEncoder::new(output.clone(), Compression::fast())),
            Codec::Deflate => {
                EncoderKind::Deflate(ZlibEncoder::new(output.clone(), Compression::fast()))
            }
        };
        Some(Self {
            codec,
            kind,
            output,
        })
    }

    /// Codec in use
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Encode and flush `data`
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Compression`] if the encoder fails
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>, StreamError> {
        let result = match &mut self.kind {
            EncoderKind::Brotli(writer) => writer.write_all(data).and_then(|()| writer.flush()),
            EncoderKind::Gzip(encoder) => encoder.write_all(data).and_then(|()| encoder.flush()),
            EncoderKind::Deflate(encoder) => {
                encoder.write_all(data).and_then(|()| encoder.flush())
            }
        };
        result.map_err(|e| compression_error(self.codec, e))?;
        Ok(self.output.take())
    }

    /// Write the stream trailer
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Compression`] if the encoder fails
    pub fn finish(self) -> Result<Vec<u8>, StreamError> {
        let codec = self.codec;
        let result = match self.kind {
            EncoderKind::Brotli(writer) => {
                writer.into_inner();
                Ok(())
            }
            EncoderKind::Gzip(encoder) => encoder.finish().map(drop),
            EncoderKind::Deflate(encoder) => encoder.finish().map(drop),
        };
        result.map_err(|e| compression_error(codec, e))?;
        Ok(self.output.take())
    }
}

impl fmt::Debug for StreamEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEncoder")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
