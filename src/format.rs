// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The on-disk `(token, TokenEntry)` record format (spec.md §4.7).
//!
//! Each record is `[token_len: u32 LE][token][entry_len: u32 LE][entry]`.
//! The entry payload is a small varint-based TLV encoding equivalent in
//! spirit to the Protocol Buffers messages named in the spec: `df`, a
//! posting count, then each posting's `doc_id`, `frequency`, and its seven
//! fixed tag-frequency counts (the bucket set is closed, so a positional
//! encoding stands in for the `map<string,uint64>` the spec describes —
//! round-trip equality holds either way).
//!
//! Varint encode/decode below is kept nearly verbatim from the teacher's
//! LEB128 implementation (DWARF/Protocol Buffers lineage).

use std::io::{self, Read, Write};

use crate::types::{DocId, Posting, TagFrequencies, TokenEntry};

const MAX_VARINT_BYTES: usize = 10;

pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

pub fn decode_varint(bytes: &[u8]) -> io::Result<(u64, usize)> {
    if bytes.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty buffer for varint",
        ));
    }

    let mut result: u64 = 0;
    let mut shift = 0;
    let mut i = 0;

    while i < bytes.len() && i < MAX_VARINT_BYTES {
        let byte = bytes[i];
        result |= ((byte & 0x7F) as u64) << shift;
        i += 1;
        if byte & 0x80 == 0 {
            return Ok((result, i));
        }
        shift += 7;
    }

    if i >= MAX_VARINT_BYTES {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "varint exceeds maximum length",
        ))
    } else {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "incomplete varint"))
    }
}

fn encode_tag_frequencies(freqs: &TagFrequencies, buf: &mut Vec<u8>) {
    encode_varint(freqs.h1, buf);
    encode_varint(freqs.h2, buf);
    encode_varint(freqs.h3, buf);
    encode_varint(freqs.title, buf);
    encode_varint(freqs.b, buf);
    encode_varint(freqs.strong, buf);
    encode_varint(freqs.other, buf);
}

fn decode_tag_frequencies(bytes: &[u8]) -> io::Result<(TagFrequencies, usize)> {
    let mut pos = 0;
    let mut next = || -> io::Result<u64> {
        let (v, n) = decode_varint(&bytes[pos..])?;
        pos += n;
        Ok(v)
    };
    let h1 = next()?;
    let h2 = next()?;
    let h3 = next()?;
    let title = next()?;
    let b = next()?;
    let strong = next()?;
    let other = next()?;
    Ok((
        TagFrequencies {
            h1,
            h2,
            h3,
            title,
            b,
            strong,
            other,
        },
        pos,
    ))
}

fn encode_posting(posting: &Posting, buf: &mut Vec<u8>) {
    encode_varint(posting.doc_id.get() as u64, buf);
    encode_varint(posting.frequency, buf);
    encode_tag_frequencies(&posting.tag_frequencies, buf);
}

fn decode_posting(bytes: &[u8]) -> io::Result<(Posting, usize)> {
    let mut pos = 0;
    let (doc_id, n) = decode_varint(bytes)?;
    pos += n;
    let (frequency, n) = decode_varint(&bytes[pos..])?;
    pos += n;
    let (tag_frequencies, n) = decode_tag_frequencies(&bytes[pos..])?;
    pos += n;
    Ok((
        Posting {
            doc_id: DocId::new(doc_id as u32),
            frequency,
            tag_frequencies,
        },
        pos,
    ))
}

/// Encode a `TokenEntry` into the TLV payload described above.
pub fn encode_token_entry(entry: &TokenEntry) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_varint(entry.df, &mut buf);
    encode_varint(entry.postings.len() as u64, &mut buf);
    for posting in &entry.postings {
        encode_posting(posting, &mut buf);
    }
    buf
}

/// Decode a `TokenEntry` from its TLV payload.
pub fn decode_token_entry(bytes: &[u8]) -> io::Result<TokenEntry> {
    let mut pos = 0;
    let (df, n) = decode_varint(bytes)?;
    pos += n;
    let (count, n) = decode_varint(&bytes[pos..])?;
    pos += n;

    let mut postings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (posting, n) = decode_posting(&bytes[pos..])?;
        pos += n;
        postings.push(posting);
    }

    Ok(TokenEntry { df, postings })
}

/// Appends `(token, TokenEntry)` records to an underlying writer, tracking
/// a running CRC32 for an end-of-stream integrity trailer.
pub struct RecordWriter<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        RecordWriter {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    pub fn write_record(&mut self, token: &str, entry: &TokenEntry) -> io::Result<()> {
        let token_bytes = token.as_bytes();
        let entry_bytes = encode_token_entry(entry);

        let mut frame = Vec::with_capacity(8 + token_bytes.len() + entry_bytes.len());
        frame.extend_from_slice(&(token_bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(token_bytes);
        frame.extend_from_slice(&(entry_bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(&entry_bytes);

        self.hasher.update(&frame);
        self.inner.write_all(&frame)
    }

    /// Write the trailing CRC32 checksum and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        let checksum = self.hasher.clone().finalize();
        self.inner.write_all(&checksum.to_le_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

const TRAILER_LEN: usize = 4;

/// Reads `(token, TokenEntry)` records from an underlying reader, verifying
/// the trailing CRC32 written by `RecordWriter::finish` once the stream is
/// exhausted. A truncated tail (a partial length prefix, a prefix claiming
/// more bytes than remain, or fewer than `TRAILER_LEN` residual bytes) is
/// treated as end-of-stream rather than an error, per spec.md §4.7 — only a
/// *complete* but corrupted stream (every frame parses, but the trailer
/// doesn't match) is reported as an error, since that's the only case the
/// checksum can actually distinguish from plain truncation.
///
/// The whole stream is read into memory up front: run/partition/merged
/// files are bounded by the same `max_postings_per_run` /
/// `partition_posting_size` tunables that already size everything else in
/// this pipeline for in-memory handling, and a single linear buffer is the
/// simplest way to tell "the last 4 bytes are the trailer" apart from "the
/// last 4 bytes are a truncated record".
pub struct RecordReader {
    buf: Vec<u8>,
    pos: usize,
    hasher: crc32fast::Hasher,
}

impl RecordReader {
    pub fn new<R: Read>(mut inner: R) -> io::Result<Self> {
        let mut buf = Vec::new();
        inner.read_to_end(&mut buf)?;
        Ok(RecordReader {
            buf,
            pos: 0,
            hasher: crc32fast::Hasher::new(),
        })
    }

    /// Attempt to parse one frame starting at `pos`. Returns the number of
    /// bytes consumed and the decoded record, or `None` if the frame is
    /// incomplete or malformed.
    fn try_parse_frame(&self, pos: usize) -> Option<(usize, String, TokenEntry)> {
        let buf = &self.buf;
        if pos + 4 > buf.len() {
            return None;
        }
        let token_len = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
        let token_start = pos + 4;
        if token_start + token_len > buf.len() {
            return None;
        }
        let token = String::from_utf8(buf[token_start..token_start + token_len].to_vec()).ok()?;

        let entry_len_pos = token_start + token_len;
        if entry_len_pos + 4 > buf.len() {
            return None;
        }
        let entry_len =
            u32::from_le_bytes(buf[entry_len_pos..entry_len_pos + 4].try_into().unwrap()) as usize;
        let entry_start = entry_len_pos + 4;
        if entry_start + entry_len > buf.len() {
            return None;
        }
        let entry = decode_token_entry(&buf[entry_start..entry_start + entry_len]).ok()?;

        Some((entry_start + entry_len - pos, token, entry))
    }

    /// Read the next record. Returns `None` once the stream is exhausted —
    /// either because only the trailer remains (checksum verified here) or
    /// because the tail is truncated (lenient EOF, no verification
    /// possible).
    pub fn next_record(&mut self) -> io::Result<Option<(String, TokenEntry)>> {
        let remaining = self.buf.len() - self.pos;

        if remaining == TRAILER_LEN {
            let trailer = &self.buf[self.pos..self.pos + TRAILER_LEN];
            let expected = u32::from_le_bytes(trailer.try_into().unwrap());
            let actual = self.hasher.clone().finalize();
            self.pos = self.buf.len();
            return if actual == expected {
                Ok(None)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("record stream checksum mismatch: expected {expected:08x}, got {actual:08x}"),
                ))
            };
        }

        if remaining < TRAILER_LEN {
            self.pos = self.buf.len();
            return Ok(None);
        }

        match self.try_parse_frame(self.pos) {
            Some((consumed, token, entry)) => {
                self.hasher.update(&self.buf[self.pos..self.pos + consumed]);
                self.pos += consumed;
                Ok(Some((token, entry)))
            }
            None => {
                self.pos = self.buf.len();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocId;

    fn sample_entry() -> TokenEntry {
        let mut entry = TokenEntry::new();
        entry.push(Posting::new(
            DocId::new(1),
            TagFrequencies {
                h1: 1,
                other: 2,
                ..Default::default()
            },
        ));
        entry
    }

    #[test]
    fn varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, consumed) = decode_varint(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn token_entry_round_trip() {
        let entry = sample_entry();
        let encoded = encode_token_entry(&entry);
        let decoded = decode_token_entry(&encoded).unwrap();
        assert_eq!(decoded.df, entry.df);
        assert_eq!(decoded.postings, entry.postings);
    }

    #[test]
    fn record_stream_round_trip() {
        let mut buf = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer.write_record("alderis", &sample_entry()).unwrap();
            writer.write_record("zhu", &sample_entry()).unwrap();
            writer.finish().unwrap();
        }

        let mut reader = RecordReader::new(&buf[..]).unwrap();
        let (token, entry) = reader.next_record().unwrap().unwrap();
        assert_eq!(token, "alderis");
        assert_eq!(entry.df, 1);
        let (token, _) = reader.next_record().unwrap().unwrap();
        assert_eq!(token, "zhu");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn truncated_tail_is_end_of_stream_not_error() {
        let mut buf = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer.write_record("alderis", &sample_entry()).unwrap();
            writer.finish().unwrap();
        }
        // Truncate mid-record of a second, never-written record by chopping
        // the trailer and a few bytes off a full frame appended manually.
        let mut truncated = buf.clone();
        truncated.truncate(buf.len() - 2);

        let mut reader = RecordReader::new(&truncated[..]).unwrap();
        let first = reader.next_record().unwrap();
        assert!(first.is_some());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn corrupted_frame_is_reported_via_checksum_mismatch() {
        let mut buf = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer.write_record("alderis", &sample_entry()).unwrap();
            writer.write_record("zhu", &sample_entry()).unwrap();
            writer.finish().unwrap();
        }

        // Flip the case bit of the first token's first byte ('a' -> 'A'):
        // still valid UTF-8 and the same length, so every frame still
        // parses structurally; only the trailer comparison can catch this.
        let corrupt_byte_offset = 4; // first byte of the "alderis" token
        buf[corrupt_byte_offset] ^= 0x20;

        let mut reader = RecordReader::new(&buf[..]).unwrap();
        let err = loop {
            match reader.next_record() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a checksum mismatch error"),
                Err(err) => break err,
            }
        };
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
