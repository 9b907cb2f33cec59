use byteorder::{ByteOrder, LittleEndian};

use crate::status::{MdlError, Status, StatusResult};

/// Input cursor over one of the two model streams.
///
/// `DecoderBuffer` provides sequential little-endian reads plus absolute
/// seeking. Every read is bounds-checked and fails with
/// [`MdlError::BufferError`] instead of panicking, so callers decide whether a
/// short read is fatal or recoverable.
///
/// # Example
///
/// ```
/// use mdlx_core::DecoderBuffer;
///
/// let data = [0x2a, 0x00, 0x00, 0x00, 0x01];
/// let mut buffer = DecoderBuffer::new(&data);
///
/// assert_eq!(buffer.decode_u32().unwrap(), 42);
/// assert_eq!(buffer.remaining_size(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DecoderBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DecoderBuffer<'a> {
    /// Creates a new `DecoderBuffer` from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the underlying bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the total length of the underlying bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current read position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Sets the read position.
    ///
    /// # Errors
    ///
    /// Returns `MdlError::BufferError` if the position is beyond the buffer length.
    pub fn set_position(&mut self, pos: usize) -> Status {
        if pos > self.data.len() {
            return Err(MdlError::BufferError(format!(
                "Position {} exceeds buffer length {}",
                pos,
                self.data.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// Returns the number of bytes remaining in the buffer.
    pub fn remaining_size(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns true if `len` bytes starting at the absolute `offset` are readable.
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .map_or(false, |end| end <= self.data.len())
    }

    /// Advances the position by `n` bytes without reading.
    pub fn skip(&mut self, n: usize) -> Status {
        if n > self.remaining_size() {
            return Err(MdlError::BufferError(format!(
                "Cannot skip {} bytes, have {}",
                n,
                self.remaining_size()
            )));
        }
        self.pos += n;
        Ok(())
    }

    /// Decodes and returns a slice of the specified size.
    pub fn decode_slice(&mut self, size: usize) -> StatusResult<&'a [u8]> {
        if size > self.remaining_size() {
            return Err(MdlError::BufferError(format!(
                "Unexpected end of buffer at {}: need {} bytes, have {}",
                self.pos,
                size,
                self.remaining_size()
            )));
        }
        let slice = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(slice)
    }

    /// Decodes bytes into the provided buffer.
    pub fn decode_bytes(&mut self, out: &mut [u8]) -> Status {
        let slice = self.decode_slice(out.len())?;
        out.copy_from_slice(slice);
        Ok(())
    }

    /// Decodes a single byte.
    pub fn decode_u8(&mut self) -> StatusResult<u8> {
        Ok(self.decode_slice(1)?[0])
    }

    /// Decodes a little-endian u16.
    pub fn decode_u16(&mut self) -> StatusResult<u16> {
        Ok(LittleEndian::read_u16(self.decode_slice(2)?))
    }

    /// Decodes a little-endian i16.
    pub fn decode_i16(&mut self) -> StatusResult<i16> {
        Ok(LittleEndian::read_i16(self.decode_slice(2)?))
    }

    /// Decodes a little-endian u32.
    pub fn decode_u32(&mut self) -> StatusResult<u32> {
        Ok(LittleEndian::read_u32(self.decode_slice(4)?))
    }

    /// Decodes a little-endian i32.
    pub fn decode_i32(&mut self) -> StatusResult<i32> {
        Ok(LittleEndian::read_i32(self.decode_slice(4)?))
    }

    /// Decodes a little-endian f32.
    pub fn decode_f32(&mut self) -> StatusResult<f32> {
        Ok(LittleEndian::read_f32(self.decode_slice(4)?))
    }

    pub fn decode_vec2(&mut self) -> StatusResult<[f32; 2]> {
        Ok([self.decode_f32()?, self.decode_f32()?])
    }

    pub fn decode_vec3(&mut self) -> StatusResult<[f32; 3]> {
        Ok([self.decode_f32()?, self.decode_f32()?, self.decode_f32()?])
    }

    /// Decodes a quaternion stored as (w, x, y, z) and returns it as [x, y, z, w].
    pub fn decode_quaternion_wxyz(&mut self) -> StatusResult<[f32; 4]> {
        let w = self.decode_f32()?;
        let [x, y, z] = self.decode_vec3()?;
        Ok([x, y, z, w])
    }

    /// Decodes a fixed-width, NUL-padded string field of `width` bytes.
    pub fn decode_fixed_string(&mut self, width: usize) -> StatusResult<String> {
        let bytes = self.decode_slice(width)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Decodes a NUL-terminated string.
    pub fn decode_string(&mut self) -> StatusResult<String> {
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            MdlError::BufferError(format!("Unterminated string at {}", self.pos))
        })?;
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(value)
    }

    /// Reads a little-endian f32 at an absolute offset without moving the cursor.
    pub fn f32_at(&self, offset: usize) -> Option<f32> {
        if !self.contains(offset, 4) {
            return None;
        }
        Some(LittleEndian::read_f32(&self.data[offset..offset + 4]))
    }

    /// Reads a little-endian u32 at an absolute offset without moving the cursor.
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        if !self.contains(offset, 4) {
            return None;
        }
        Some(LittleEndian::read_u32(&self.data[offset..offset + 4]))
    }

    /// Reads three consecutive f32 values at an absolute offset.
    pub fn vec3_at(&self, offset: usize) -> Option<[f32; 3]> {
        Some([
            self.f32_at(offset)?,
            self.f32_at(offset.checked_add(4)?)?,
            self.f32_at(offset.checked_add(8)?)?,
        ])
    }

    /// Reads two consecutive f32 values at an absolute offset.
    pub fn vec2_at(&self, offset: usize) -> Option<[f32; 2]> {
        Some([self.f32_at(offset)?, self.f32_at(offset.checked_add(4)?)?])
    }
}
