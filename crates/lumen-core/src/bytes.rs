//! Byte and buffer utilities shared by the RLP, SSZ, and MPT layers.
//!
//! Every decoder in this crate walks borrowed slices rather than allocating
//! per-field, so the primitives here are split between zero-copy views
//! (`ByteView`) and a small growable buffer (`ByteBuf`) used only where the
//! spec calls for building new encodings (RLP/SSZ encode, MPT node writer).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BytesError {
    #[error("slice out of range: wanted {wanted} bytes at offset {offset}, have {len}")]
    OutOfRange {
        offset: usize,
        wanted: usize,
        len: usize,
    },
    #[error("hex decode error: {0}")]
    InvalidHex(String),
    #[error("fixed-capacity buffer exhausted: wanted to write {wanted} more bytes, {remaining} left")]
    FixedCapacityExhausted { wanted: usize, remaining: usize },
}

/// A non-owning view into a byte slice, with bounds-checked reads.
///
/// This mirrors the C-side "pointer + length, non-owning" view: every method
/// returns a `Result` rather than panicking on out-of-range input, since all
/// input here ultimately derives from an untrusted proof blob.
#[derive(Clone, Copy, Debug)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Slice `[offset, offset+len)`, bounds-checked against this view.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], BytesError> {
        let end = offset.checked_add(len).ok_or(BytesError::OutOfRange {
            offset,
            wanted: len,
            len: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(BytesError::OutOfRange {
                offset,
                wanted: len,
                len: self.data.len(),
            });
        }
        Ok(&self.data[offset..end])
    }

    pub fn read_u32_le(&self, offset: usize) -> Result<u32, BytesError> {
        let s = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn read_u64_le(&self, offset: usize) -> Result<u64, BytesError> {
        let s = self.slice(offset, 8)?;
        Ok(u64::from_le_bytes(s.try_into().unwrap()))
    }
}

/// A growable buffer with an optional fixed-capacity ("stack buffer") mode.
///
/// In fixed mode the buffer is backed by caller-provided storage sized up
/// front and refuses to grow past it - used by callers that want to avoid
/// heap allocation on a hot verification path (e.g. building small SSZ
/// containers inside a loop).
#[derive(Debug, Default)]
pub struct ByteBuf {
    data: Vec<u8>,
    fixed_capacity: Option<usize>,
}

impl ByteBuf {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            fixed_capacity: None,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
            fixed_capacity: None,
        }
    }

    /// Stack-buffer mode: pre-allocates `capacity` bytes and refuses to
    /// grow beyond it - `push`/`extend` return `FixedCapacityExhausted`
    /// instead of reallocating.
    pub fn with_fixed_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            fixed_capacity: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn check_capacity(&self, additional: usize) -> Result<(), BytesError> {
        if let Some(cap) = self.fixed_capacity {
            let remaining = cap.saturating_sub(self.data.len());
            if additional > remaining {
                return Err(BytesError::FixedCapacityExhausted {
                    wanted: additional,
                    remaining,
                });
            }
        }
        Ok(())
    }

    pub fn push(&mut self, byte: u8) -> Result<(), BytesError> {
        self.check_capacity(1)?;
        self.data.push(byte);
        Ok(())
    }

    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), BytesError> {
        self.check_capacity(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn extend_zeros(&mut self, n: usize) -> Result<(), BytesError> {
        self.check_capacity(n)?;
        self.data.resize(self.data.len() + n, 0);
        Ok(())
    }

    /// Overwrite `len` bytes starting at `offset` - used to patch fixed
    /// offsets after the dynamic section of an SSZ container is known.
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BytesError> {
        if offset + bytes.len() > self.data.len() {
            return Err(BytesError::OutOfRange {
                offset,
                wanted: bytes.len(),
                len: self.data.len(),
            });
        }
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Decode a hex string into bytes. Accepts an optional `0x` prefix and an
/// odd-length leading nibble (the first byte is treated as a single nibble).
pub fn hex_decode(input: &str) -> Result<Vec<u8>, BytesError> {
    let s = input.strip_prefix("0x").unwrap_or(input);
    if s.is_empty() {
        return Ok(Vec::new());
    }
    if s.len() % 2 == 1 {
        let mut padded = String::with_capacity(s.len() + 1);
        padded.push('0');
        padded.push_str(s);
        return hex::decode(&padded).map_err(|e| BytesError::InvalidHex(e.to_string()));
    }
    hex::decode(s).map_err(|e| BytesError::InvalidHex(e.to_string()))
}

pub fn hex_encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_slice_bounds_checked() {
        let v = ByteView::new(&[1, 2, 3, 4]);
        assert_eq!(v.slice(1, 2).unwrap(), &[2, 3]);
        assert!(v.slice(3, 2).is_err());
    }

    #[test]
    fn fixed_buf_refuses_to_grow() {
        let mut buf = ByteBuf::with_fixed_capacity(2);
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        assert!(buf.push(3).is_err());
    }

    #[test]
    fn hex_decode_accepts_prefix_and_odd_length() {
        assert_eq!(hex_decode("0xabc").unwrap(), vec![0x0a, 0xbc]);
        assert_eq!(hex_decode("abcd").unwrap(), vec![0xab, 0xcd]);
        assert_eq!(hex_decode("0x").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn patch_overwrites_in_place() {
        let mut buf = ByteBuf::new();
        buf.extend(&[0, 0, 0, 0]).unwrap();
        buf.patch(1, &[0xAA, 0xBB]).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0xAA, 0xBB, 0]);
    }
}
