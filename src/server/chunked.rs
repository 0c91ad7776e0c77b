//! `Transfer-Encoding: chunked` request body decoding.
//!
//! The decoder is an explicit state machine over the wire grammar:
//!
//! ```text
//! Size ──\r──▶ SizeLf ──\n──▶ Data ──▶ DataCr ──\r──▶ DataLf ──\n──▶ Size
//!                │ (size == 0)
//!                ▼
//!             Trailer ──\r──▶ TrailerLf ──\n──▶ Done (empty line)
//!
//! SizeLf ──\n──▶ Done (size line had no digits)
//! ```
//!
//! It is strict: a size line holds hex digits only (no extensions), and any
//! byte other than `\r\n` where a line terminator is expected fails the whole
//! body with [`ProtocolError::ChunkTerminator`]. A size line with no digits at
//! all reads as size zero and ends the body on the spot, without a trailer
//! section.

use std::io::{BufRead, Read};

use super::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Accumulating hex digits of the next chunk size
    Size { size: usize, digits: usize },
    /// Saw `\r` after the size, expecting `\n`; `bare` when no digit was read
    SizeLf { size: usize, bare: bool },
    /// Copying chunk payload
    Data { remaining: usize },
    /// Expecting `\r` after the payload
    DataCr,
    /// Expecting `\n` after the payload
    DataLf,
    /// Inside a trailer line (`len` bytes so far; 0 means the final empty line)
    Trailer { len: usize },
    /// Saw `\r` ending a trailer line, expecting `\n`
    TrailerLf { len: usize },
    Done,
}

/// Incremental chunked-body decoder with a cap on the decoded size.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    limit: usize,
    decoded: Vec<u8>,
}

impl ChunkedDecoder {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            state: ChunkState::Size { size: 0, digits: 0 },
            limit,
            decoded: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Read from `reader` until the terminal state and return the decoded body.
    pub fn decode<R: BufRead>(mut self, reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
        while !self.is_done() {
            if let ChunkState::Data { remaining } = self.state {
                self.read_data(reader, remaining)?;
                self.state = ChunkState::DataCr;
            } else {
                let byte = read_byte(reader)?;
                self.state = self.step(byte)?;
            }
        }
        Ok(self.decoded)
    }

    /// Transition for every state that consumes a single framing byte.
    fn step(&self, byte: u8) -> Result<ChunkState, ProtocolError> {
        match self.state {
            ChunkState::Size { size, digits } => match byte {
                b'\r' => Ok(ChunkState::SizeLf {
                    size,
                    bare: digits == 0,
                }),
                _ => {
                    let digit = hex_value(byte).ok_or(ProtocolError::ChunkSize { byte })?;
                    let size = size
                        .checked_mul(16)
                        .and_then(|s| s.checked_add(digit))
                        .ok_or(ProtocolError::ChunkSizeOverflow)?;
                    Ok(ChunkState::Size {
                        size,
                        digits: digits + 1,
                    })
                }
            },
            ChunkState::SizeLf { size, bare } => {
                if byte != b'\n' {
                    return Err(ProtocolError::ChunkTerminator);
                }
                if bare {
                    return Ok(ChunkState::Done);
                }
                if size == 0 {
                    return Ok(ChunkState::Trailer { len: 0 });
                }
                if self.decoded.len().saturating_add(size) > self.limit {
                    return Err(ProtocolError::BodyTooLarge { limit: self.limit });
                }
                Ok(ChunkState::Data { remaining: size })
            }
            ChunkState::DataCr => expect(byte, b'\r', ChunkState::DataLf),
            ChunkState::DataLf => expect(byte, b'\n', ChunkState::Size { size: 0, digits: 0 }),
            ChunkState::Trailer { len } => match byte {
                b'\r' => Ok(ChunkState::TrailerLf { len }),
                b'\n' => Err(ProtocolError::ChunkTerminator),
                _ if len >= self.limit => Err(ProtocolError::BodyTooLarge { limit: self.limit }),
                _ => Ok(ChunkState::Trailer { len: len + 1 }),
            },
            ChunkState::TrailerLf { len } => {
                if byte != b'\n' {
                    return Err(ProtocolError::ChunkTerminator);
                }
                if len == 0 {
                    Ok(ChunkState::Done)
                } else {
                    Ok(ChunkState::Trailer { len: 0 })
                }
            }
            ChunkState::Data { .. } | ChunkState::Done => Ok(self.state),
        }
    }

    fn read_data<R: BufRead>(&mut self, reader: &mut R, mut remaining: usize) -> Result<(), ProtocolError> {
        while remaining > 0 {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Err(ProtocolError::UnexpectedEof);
            }
            let take = remaining.min(available.len());
            self.decoded.extend_from_slice(&available[..take]);
            reader.consume(take);
            remaining -= take;
        }
        Ok(())
    }
}

/// Decode a complete chunked body from `reader`, failing past `limit` bytes.
pub fn decode_chunked<R: BufRead>(reader: &mut R, limit: usize) -> Result<Vec<u8>, ProtocolError> {
    ChunkedDecoder::new(limit).decode(reader)
}

fn expect(byte: u8, wanted: u8, next: ChunkState) -> Result<ChunkState, ProtocolError> {
    if byte == wanted {
        Ok(next)
    } else {
        Err(ProtocolError::ChunkTerminator)
    }
}

fn hex_value(byte: u8) -> Option<usize> {
    (byte as char).to_digit(16).map(|d| d as usize)
}

fn read_byte<R: BufRead>(reader: &mut R) -> Result<u8, ProtocolError> {
    let mut byte = [0u8; 1];
    reader
        .read_exact(&mut byte)
        .map_err(ProtocolError::from_read)?;
    Ok(byte[0])
}
