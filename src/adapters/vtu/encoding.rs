//! Binary payload encoding used by VTK XML files.
//!
//! A binary payload is a size header followed by the data. Uncompressed
//! payloads carry a single `header_type` word with the byte count. Payloads
//! compressed with `vtkZLibDataCompressor` carry
//! `[n_blocks, block_size, last_block_size, compressed_size_1 .. compressed_size_n]`
//! followed by the zlib streams of each block.
//!
//! Inline payloads are base64. VTK encodes the header and the data as two
//! separate base64 streams, other writers encode them as one; both are read.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::domain::model::{ArrayData, ScalarType};
use crate::utils::error::{BcError, Result};

/// Uncompressed size of each zlib block, as written by VTK.
pub const BLOCK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderType {
    #[default]
    UInt32,
    UInt64,
}

impl HeaderType {
    pub fn size(self) -> usize {
        match self {
            Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }
}

/// How binary payloads of one file are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryLayout {
    pub byte_order: ByteOrder,
    pub header_type: HeaderType,
    pub compressed: bool,
}

impl BinaryLayout {
    fn word<const N: usize>(&self, bytes: &[u8]) -> [u8; N] {
        let mut word = [0u8; N];
        word.copy_from_slice(bytes);
        if self.byte_order == ByteOrder::BigEndian {
            word.reverse();
        }
        word
    }

    fn read_header_word(&self, bytes: &[u8], index: usize) -> Result<usize> {
        let size = self.header_type.size();
        let chunk = bytes
            .get(index * size..(index + 1) * size)
            .ok_or_else(|| BcError::format("binary header is truncated"))?;
        let value = match self.header_type {
            HeaderType::UInt32 => u32::from_le_bytes(self.word(chunk)) as u64,
            HeaderType::UInt64 => u64::from_le_bytes(self.word(chunk)),
        };
        usize::try_from(value).map_err(|_| BcError::format("binary header value overflows"))
    }

    /// Number of header bytes once the block count is known.
    fn header_len(&self, n_blocks: usize) -> Result<usize> {
        if !self.compressed {
            return Ok(self.header_type.size());
        }
        n_blocks
            .checked_add(3)
            .and_then(|words| words.checked_mul(self.header_type.size()))
            .ok_or_else(|| BcError::format(format!("binary header announces {} blocks", n_blocks)))
    }

    /// Decodes a base64 payload (inline `binary` or one `appended` base64 segment).
    pub fn decode_base64(&self, text: &str) -> Result<Vec<u8>> {
        if !text.is_ascii() {
            return Err(BcError::format("base64 payload contains non-ASCII characters"));
        }
        let text: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();

        let n_blocks = if self.compressed {
            let first = encoded_len(self.header_type.size()).min(text.len());
            let prefix = BASE64.decode(&text[..first])?;
            self.read_header_word(&prefix, 0)?
        } else {
            0
        };

        let (header, data) = split_base64(&text, self.header_len(n_blocks)?)?;
        self.unpack(&header, &data)
    }

    /// Decodes a raw `appended` payload starting at the beginning of `bytes`.
    pub fn decode_raw(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let n_blocks = if self.compressed {
            self.read_header_word(bytes, 0)?
        } else {
            0
        };
        let header_len = self.header_len(n_blocks)?;
        if bytes.len() < header_len {
            return Err(BcError::format("appended data block is truncated"));
        }
        self.unpack(&bytes[..header_len], &bytes[header_len..])
    }

    fn unpack(&self, header: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        if !self.compressed {
            let n_bytes = self.read_header_word(header, 0)?;
            return data
                .get(..n_bytes)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| BcError::format(format!(
                    "binary payload announces {} bytes but holds {}",
                    n_bytes,
                    data.len()
                )));
        }

        let n_blocks = self.read_header_word(header, 0)?;
        let block_size = self.read_header_word(header, 1)?;
        let last_block_size = self.read_header_word(header, 2)?;
        let expected = match (n_blocks, last_block_size) {
            (0, _) => Some(0),
            (n, 0) => n.checked_mul(block_size),
            (n, last) => (n - 1).checked_mul(block_size).and_then(|full| full.checked_add(last)),
        }
        .ok_or_else(|| BcError::format("compressed payload size overflows"))?;

        // 預先配置的容量不可超過實際資料可解出的合理範圍
        let mut out = Vec::with_capacity(expected.min(data.len().saturating_mul(4)));
        let mut cursor = 0usize;
        for block in 0..n_blocks {
            let compressed_size = self.read_header_word(header, 3 + block)?;
            let chunk = cursor
                .checked_add(compressed_size)
                .and_then(|end| data.get(cursor..end))
                .ok_or_else(|| BcError::format("compressed block is truncated"))?;
            ZlibDecoder::new(chunk).read_to_end(&mut out)?;
            cursor += compressed_size;
        }

        if out.len() != expected {
            return Err(BcError::format(format!(
                "decompressed {} bytes, header announces {}",
                out.len(),
                expected
            )));
        }
        Ok(out)
    }
}

/// Length of the base64 encoding of `n` bytes.
fn encoded_len(n: usize) -> usize {
    n.div_ceil(3).saturating_mul(4)
}

/// Splits an ASCII base64 payload into `header_len` header bytes and the data bytes.
fn split_base64(text: &[u8], header_len: usize) -> Result<(Vec<u8>, Vec<u8>)> {
    let header_chars = encoded_len(header_len);
    if text.len() < header_chars {
        return Err(BcError::format("base64 payload is shorter than its header"));
    }

    let prefix = &text[..header_chars];
    if header_len % 3 == 0 || prefix.ends_with(b"=") {
        // Header and data were encoded as separate streams.
        let header = BASE64.decode(prefix)?;
        let rest = &text[header_chars..];
        let data = if rest.is_empty() {
            Vec::new()
        } else {
            BASE64.decode(rest)?
        };
        Ok((header, data))
    } else {
        let mut header = BASE64.decode(text)?;
        if header.len() < header_len {
            return Err(BcError::format("base64 payload is shorter than its header"));
        }
        let data = header.split_off(header_len);
        Ok((header, data))
    }
}

/// Interprets raw little/big endian bytes as values of `scalar`.
pub fn bytes_to_array(bytes: &[u8], scalar: ScalarType, byte_order: ByteOrder) -> Result<ArrayData> {
    let size = scalar.size();
    if bytes.len() % size != 0 {
        return Err(BcError::format(format!(
            "{} bytes is not a whole number of {} values",
            bytes.len(),
            scalar.vtk_name()
        )));
    }

    let layout = BinaryLayout {
        byte_order,
        ..BinaryLayout::default()
    };
    let chunks = bytes.chunks_exact(size);
    let data = match scalar {
        ScalarType::Int8 => ArrayData::Signed(chunks.map(|c| i8::from_le_bytes(layout.word(c)) as i64).collect()),
        ScalarType::Int16 => ArrayData::Signed(chunks.map(|c| i16::from_le_bytes(layout.word(c)) as i64).collect()),
        ScalarType::Int32 => ArrayData::Signed(chunks.map(|c| i32::from_le_bytes(layout.word(c)) as i64).collect()),
        ScalarType::Int64 => ArrayData::Signed(chunks.map(|c| i64::from_le_bytes(layout.word(c))).collect()),
        ScalarType::UInt8 => ArrayData::Unsigned(chunks.map(|c| c[0] as u64).collect()),
        ScalarType::UInt16 => ArrayData::Unsigned(chunks.map(|c| u16::from_le_bytes(layout.word(c)) as u64).collect()),
        ScalarType::UInt32 => ArrayData::Unsigned(chunks.map(|c| u32::from_le_bytes(layout.word(c)) as u64).collect()),
        ScalarType::UInt64 => ArrayData::Unsigned(chunks.map(|c| u64::from_le_bytes(layout.word(c))).collect()),
        ScalarType::Float32 => ArrayData::Float(chunks.map(|c| f32::from_le_bytes(layout.word(c)) as f64).collect()),
        ScalarType::Float64 => ArrayData::Float(chunks.map(|c| f64::from_le_bytes(layout.word(c))).collect()),
    };
    Ok(data)
}

/// Parses whitespace separated ascii values of `scalar`.
pub fn parse_ascii(text: &str, scalar: ScalarType) -> Result<ArrayData> {
    let bad = |token: &str| BcError::format(format!("'{}' is not a valid {} value", token, scalar.vtk_name()));
    let tokens = text.split_whitespace();
    let data = if scalar.is_float() {
        ArrayData::Float(tokens.map(|t| t.parse::<f64>().map_err(|_| bad(t))).collect::<Result<_>>()?)
    } else if scalar.is_signed() {
        ArrayData::Signed(tokens.map(|t| t.parse::<i64>().map_err(|_| bad(t))).collect::<Result<_>>()?)
    } else {
        ArrayData::Unsigned(tokens.map(|t| t.parse::<u64>().map_err(|_| bad(t))).collect::<Result<_>>()?)
    };
    Ok(data)
}

/// Little endian bytes of `data` stored as `scalar`.
pub fn array_to_bytes(data: &ArrayData, scalar: ScalarType) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * scalar.size());
    let overflow = |v: &dyn std::fmt::Display| {
        BcError::format(format!("value {} does not fit into {}", v, scalar.vtk_name()))
    };

    match data {
        ArrayData::Float(values) => {
            if !scalar.is_float() {
                return Err(BcError::format(format!(
                    "floating point data cannot be stored as {}",
                    scalar.vtk_name()
                )));
            }
            for &v in values {
                match scalar {
                    ScalarType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                    _ => out.extend_from_slice(&v.to_le_bytes()),
                }
            }
        }
        ArrayData::Signed(values) => {
            for &v in values {
                match scalar {
                    ScalarType::Int8 => out.extend_from_slice(&i8::try_from(v).map_err(|_| overflow(&v))?.to_le_bytes()),
                    ScalarType::Int16 => out.extend_from_slice(&i16::try_from(v).map_err(|_| overflow(&v))?.to_le_bytes()),
                    ScalarType::Int32 => out.extend_from_slice(&i32::try_from(v).map_err(|_| overflow(&v))?.to_le_bytes()),
                    ScalarType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                    ScalarType::Float64 => out.extend_from_slice(&(v as f64).to_le_bytes()),
                    _ => out.extend_from_slice(&v.to_le_bytes()),
                }
            }
        }
        ArrayData::Unsigned(values) => {
            for &v in values {
                match scalar {
                    ScalarType::UInt8 => out.push(u8::try_from(v).map_err(|_| overflow(&v))?),
                    ScalarType::UInt16 => out.extend_from_slice(&u16::try_from(v).map_err(|_| overflow(&v))?.to_le_bytes()),
                    ScalarType::UInt32 => out.extend_from_slice(&u32::try_from(v).map_err(|_| overflow(&v))?.to_le_bytes()),
                    ScalarType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                    ScalarType::Float64 => out.extend_from_slice(&(v as f64).to_le_bytes()),
                    _ => out.extend_from_slice(&v.to_le_bytes()),
                }
            }
        }
    }
    Ok(out)
}

/// Base64 payload for inline `binary` DataArrays with a `UInt64` header.
///
/// `level` selects zlib compression; `None` writes the data uncompressed.
pub fn encode_base64(data: &[u8], level: Option<u32>) -> Result<String> {
    let Some(level) = level else {
        let mut payload = Vec::with_capacity(8 + data.len());
        payload.extend_from_slice(&(data.len() as u64).to_le_bytes());
        payload.extend_from_slice(data);
        return Ok(BASE64.encode(payload));
    };

    let mut header = Vec::new();
    let mut compressed = Vec::new();
    let blocks: Vec<&[u8]> = data.chunks(BLOCK_SIZE).collect();
    let last_block_size = data.len() % BLOCK_SIZE;

    header.extend_from_slice(&(blocks.len() as u64).to_le_bytes());
    header.extend_from_slice(&(BLOCK_SIZE as u64).to_le_bytes());
    header.extend_from_slice(&(last_block_size as u64).to_le_bytes());
    for block in blocks {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
        encoder.write_all(block)?;
        let bytes = encoder.finish()?;
        header.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        compressed.extend_from_slice(&bytes);
    }

    let mut text = BASE64.encode(header);
    if !compressed.is_empty() {
        text.push_str(&BASE64.encode(compressed));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(header_type: HeaderType, compressed: bool) -> BinaryLayout {
        BinaryLayout {
            byte_order: ByteOrder::LittleEndian,
            header_type,
            compressed,
        }
    }

    #[test]
    fn test_uncompressed_payload_in_one_stream() {
        let values = [1.5f64, -2.0, 3.25];
        let bytes = array_to_bytes(&ArrayData::Float(values.to_vec()), ScalarType::Float64).unwrap();
        let text = encode_base64(&bytes, None).unwrap();

        let decoded = layout(HeaderType::UInt64, false).decode_base64(&text).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_uncompressed_payload_in_two_streams() {
        // VTK style: header and data encoded separately, UInt32 header.
        let data: Vec<u8> = (0u8..10).collect();
        let text = format!(
            "{}{}",
            BASE64.encode((data.len() as u32).to_le_bytes()),
            BASE64.encode(&data)
        );
        let decoded = layout(HeaderType::UInt32, false).decode_base64(&text).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_compressed_payload_spanning_blocks() {
        let data: Vec<u8> = (0..(BLOCK_SIZE * 2 + 100)).map(|i| (i % 251) as u8).collect();
        let text = encode_base64(&data, Some(6)).unwrap();
        let decoded = layout(HeaderType::UInt64, true).decode_base64(&text).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_compressed_empty_payload() {
        let text = encode_base64(&[], Some(6)).unwrap();
        let decoded = layout(HeaderType::UInt64, true).decode_base64(&text).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_raw_payload() {
        let mut raw = 8u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&7i64.to_le_bytes());
        raw.extend_from_slice(b"trailing");
        let decoded = layout(HeaderType::UInt32, false).decode_raw(&raw).unwrap();
        assert_eq!(bytes_to_array(&decoded, ScalarType::Int64, ByteOrder::LittleEndian).unwrap(), ArrayData::Signed(vec![7]));
    }

    #[test]
    fn test_big_endian_values() {
        let bytes = 258u16.to_be_bytes();
        let data = bytes_to_array(&bytes, ScalarType::UInt16, ByteOrder::BigEndian).unwrap();
        assert_eq!(data, ArrayData::Unsigned(vec![258]));
    }

    #[test]
    fn test_parse_ascii() {
        assert_eq!(parse_ascii("1 2\n3", ScalarType::Int32).unwrap(), ArrayData::Signed(vec![1, 2, 3]));
        assert_eq!(parse_ascii(" 0.5 1e-3 ", ScalarType::Float32).unwrap(), ArrayData::Float(vec![0.5, 1e-3]));
        assert!(parse_ascii("1 x", ScalarType::UInt8).is_err());
    }

    #[test]
    fn test_narrowing_overflow_is_rejected() {
        assert!(array_to_bytes(&ArrayData::Unsigned(vec![300]), ScalarType::UInt8).is_err());
        assert!(array_to_bytes(&ArrayData::Float(vec![1.0]), ScalarType::Int32).is_err());
    }

    #[test]
    fn test_non_ascii_base64_is_a_format_error() {
        for compressed in [false, true] {
            let err = layout(HeaderType::UInt32, compressed)
                .decode_base64("AAAAAAA\u{e9}AAAAAAA")
                .unwrap_err();
            assert!(matches!(err, BcError::FormatError { .. }));
        }
    }

    #[test]
    fn test_oversized_block_count_is_a_format_error() {
        let raw = u64::MAX.to_le_bytes();
        let err = layout(HeaderType::UInt64, true).decode_raw(&raw).unwrap_err();
        assert!(matches!(err, BcError::FormatError { .. }));
    }

    #[test]
    fn test_overflowing_sizes_are_format_errors() {
        // 一個區塊，但區塊大小與壓縮長度都是 u64::MAX
        let mut raw = Vec::new();
        for word in [1u64, u64::MAX, 0, u64::MAX] {
            raw.extend_from_slice(&word.to_le_bytes());
        }
        raw.extend_from_slice(&[0u8; 16]);
        let err = layout(HeaderType::UInt64, true).decode_raw(&raw).unwrap_err();
        assert!(matches!(err, BcError::FormatError { .. }));

        let mut raw = Vec::new();
        for word in [2u64, u64::MAX, 5, 4, 4] {
            raw.extend_from_slice(&word.to_le_bytes());
        }
        let err = layout(HeaderType::UInt64, true).decode_raw(&raw).unwrap_err();
        assert!(matches!(err, BcError::FormatError { .. }));
    }
}
