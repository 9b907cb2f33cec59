//! Controller table decoding.
//!
//! A node stores its controller headers in one array and every key time and
//! value in a second array of floats, the controller-data block. Header key
//! and data offsets are float indices into that block.

use crate::controller::{
    controller_type, Controller, ControllerRow, BEZIER_FLAG, COMPRESSED_QUATERNION_COLUMNS,
};
use crate::decoder_buffer::DecoderBuffer;
use crate::headers::ControllerHeader;
use crate::quaternion_compression::decompress_quaternion;
use crate::status::StatusResult;

/// How a row is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// One packed 32-bit quaternion followed by a padding float.
    CompressedQuaternion,
    /// `columns` logical columns of (value, in-tangent, out-tangent).
    Bezier { columns: usize },
    /// `width` plain floats.
    Linear { width: usize },
}

impl RowLayout {
    /// Interprets a header's column count. The compressed-quaternion case is
    /// checked before the Bezier flag.
    pub fn from_header(controller_type: u32, column_count: u8) -> Self {
        if controller_type == controller_type::ORIENTATION
            && column_count == COMPRESSED_QUATERNION_COLUMNS
        {
            RowLayout::CompressedQuaternion
        } else if column_count & BEZIER_FLAG != 0 {
            RowLayout::Bezier {
                columns: (column_count & !BEZIER_FLAG) as usize,
            }
        } else {
            RowLayout::Linear {
                width: column_count as usize,
            }
        }
    }

    /// Floats per row on disk.
    pub fn disk_width(self) -> usize {
        match self {
            RowLayout::CompressedQuaternion => 2,
            RowLayout::Bezier { columns } => columns * 3,
            RowLayout::Linear { width } => width,
        }
    }
}

/// A decoded controller plus the row count its header declared.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedController {
    pub controller: Controller,
    pub declared_rows: usize,
}

impl DecodedController {
    pub fn is_truncated(&self) -> bool {
        self.controller.rows.len() < self.declared_rows
    }
}

/// Decodes the controller whose header starts at `header_offset`.
///
/// Only a header that cannot be read is an error. Rows are read until one
/// would run past the end of the buffer; the rest are dropped.
pub fn decode_controller(
    buffer: &DecoderBuffer<'_>,
    header_offset: usize,
    data_block_offset: usize,
) -> StatusResult<DecodedController> {
    let mut cursor = buffer.clone();
    cursor.set_position(header_offset)?;
    let header = ControllerHeader::read(&mut cursor)?;

    let layout = RowLayout::from_header(header.controller_type, header.column_count);
    let width = layout.disk_width();
    let float_at = |index: usize| -> Option<usize> {
        index.checked_mul(4)?.checked_add(data_block_offset)
    };

    let declared_rows = header.row_count as usize;
    let mut controller = Controller::new(header.controller_type);
    controller.bezier = matches!(layout, RowLayout::Bezier { .. });

    for row in 0..declared_rows {
        let time = float_at(header.key_offset as usize + row).and_then(|at| buffer.f32_at(at));
        let first = header.data_offset as usize + row * width;
        let values = match layout {
            RowLayout::CompressedQuaternion => float_at(first)
                .and_then(|at| buffer.u32_at(at))
                .map(|packed| decompress_quaternion(packed).to_vec()),
            _ => (0..width)
                .map(|column| float_at(first + column).and_then(|at| buffer.f32_at(at)))
                .collect::<Option<Vec<f32>>>(),
        };
        match (time, values) {
            (Some(time), Some(values)) => controller.rows.push(ControllerRow::new(time, values)),
            _ => break,
        }
    }

    log::trace!(
        "controller type {} at {}: {} of {} rows, {:?}",
        header.controller_type,
        header_offset,
        controller.rows.len(),
        declared_rows,
        layout
    );
    Ok(DecodedController {
        controller,
        declared_rows,
    })
}
