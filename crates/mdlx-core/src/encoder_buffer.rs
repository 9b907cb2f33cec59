use byteorder::{ByteOrder, LittleEndian};

use crate::status::{MdlError, Status};

/// Output buffer for one of the two model streams.
///
/// All offsets are planned before writing starts, so the buffer only ever
/// appends. [`EncoderBuffer::expect_position`] lets the writer confirm that
/// the bytes emitted so far agree with the plan.
#[derive(Debug, Clone, Default)]
pub struct EncoderBuffer {
    buffer: Vec<u8>,
}

impl EncoderBuffer {
    /// Create a new empty encoder buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer size
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the buffer and return the written bytes
    pub fn into_data(self) -> Vec<u8> {
        self.buffer
    }

    /// Fails with an invariant violation unless exactly `expected` bytes have been written.
    pub fn expect_position(&self, expected: usize, what: &str) -> Status {
        if self.buffer.len() != expected {
            return Err(MdlError::InvariantViolation(format!(
                "{} planned at offset {} but writer is at {}",
                what,
                expected,
                self.buffer.len()
            )));
        }
        Ok(())
    }

    /// Encode raw bytes
    pub fn encode(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn encode_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn encode_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.encode(&bytes);
    }

    pub fn encode_i16(&mut self, value: i16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_i16(&mut bytes, value);
        self.encode(&bytes);
    }

    pub fn encode_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.encode(&bytes);
    }

    pub fn encode_i32(&mut self, value: i32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, value);
        self.encode(&bytes);
    }

    pub fn encode_f32(&mut self, value: f32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_f32(&mut bytes, value);
        self.encode(&bytes);
    }

    pub fn encode_vec2(&mut self, value: [f32; 2]) {
        value.iter().for_each(|&v| self.encode_f32(v));
    }

    pub fn encode_vec3(&mut self, value: [f32; 3]) {
        value.iter().for_each(|&v| self.encode_f32(v));
    }

    /// Encode an [x, y, z, w] quaternion in (w, x, y, z) order.
    pub fn encode_quaternion_wxyz(&mut self, value: [f32; 4]) {
        let [x, y, z, w] = value;
        self.encode_f32(w);
        self.encode_vec3([x, y, z]);
    }

    /// Encode a string into a fixed-width, NUL-padded field.
    ///
    /// The string is truncated so that at least one terminating NUL fits.
    pub fn encode_fixed_string(&mut self, value: &str, width: usize) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(width.saturating_sub(1));
        self.encode(&bytes[..len]);
        self.encode_zeros(width - len);
    }

    /// Encode a NUL-terminated string.
    pub fn encode_string(&mut self, value: &str) {
        self.encode(value.as_bytes());
        self.encode_u8(0);
    }

    pub fn encode_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Pad with zeros up to the next multiple of `alignment`.
    pub fn pad_to_alignment(&mut self, alignment: usize) {
        let rem = self.buffer.len() % alignment;
        if rem != 0 {
            self.encode_zeros(alignment - rem);
        }
    }
}
