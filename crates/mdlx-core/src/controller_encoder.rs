//! Packs a node's controllers into headers plus one controller-data block.

use crate::controller::{controller_type, Controller, BEZIER_FLAG, COMPRESSED_QUATERNION_COLUMNS};
use crate::headers::ControllerHeader;
use crate::quaternion_compression::compress_quaternion;
use crate::status::{MdlError, StatusResult};

/// Largest column count that does not collide with the Bezier flag.
const MAX_COLUMNS: usize = (BEZIER_FLAG - 1) as usize;

/// Controller headers and the raw 32-bit words of the data block they index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackedControllers {
    pub headers: Vec<ControllerHeader>,
    /// Float bit patterns, except for compressed quaternion words.
    pub data: Vec<u32>,
}

impl PackedControllers {
    pub fn data_size(&self) -> usize {
        self.data.len() * 4
    }

    pub fn headers_size(&self) -> usize {
        self.headers.len() * ControllerHeader::SIZE
    }
}

fn invalid(node_name: &str, controller: &Controller, what: String) -> MdlError {
    MdlError::InvalidParameter(format!(
        "controller {} on '{}': {}",
        controller.controller_type, node_name, what
    ))
}

fn float_index(node_name: &str, controller: &Controller, cursor: usize) -> StatusResult<u16> {
    u16::try_from(cursor).map_err(|_| {
        invalid(
            node_name,
            controller,
            format!("controller data index {} does not fit in 16 bits", cursor),
        )
    })
}

/// Packs `controllers` in order, keeping one running float cursor across them
/// so key and data offsets index the shared block.
///
/// With `compress_orientations`, linear four-column orientation controllers
/// are written as packed quaternions.
pub fn pack_controllers(
    node_name: &str,
    controllers: &[Controller],
    compress_orientations: bool,
) -> StatusResult<PackedControllers> {
    let mut packed = PackedControllers::default();
    for controller in controllers {
        let width = controller
            .row_width()
            .ok_or_else(|| invalid(node_name, controller, "rows differ in width".into()))?;
        let row_count = u16::try_from(controller.rows.len()).map_err(|_| {
            invalid(
                node_name,
                controller,
                format!("{} rows exceed the format limit", controller.rows.len()),
            )
        })?;
        let is_orientation = controller.controller_type == controller_type::ORIENTATION;
        let compress = compress_orientations && is_orientation && !controller.bezier && width == 4;

        let column_count = if compress {
            COMPRESSED_QUATERNION_COLUMNS
        } else if controller.bezier {
            let columns = controller.logical_columns().ok_or_else(|| {
                invalid(
                    node_name,
                    controller,
                    format!("bezier row width {} is not a multiple of 3", width),
                )
            })?;
            if columns > MAX_COLUMNS {
                return Err(invalid(node_name, controller, format!("{} bezier columns", columns)));
            }
            columns as u8 | BEZIER_FLAG
        } else {
            if width > MAX_COLUMNS {
                return Err(invalid(node_name, controller, format!("{} columns", width)));
            }
            if is_orientation && width as u8 == COMPRESSED_QUATERNION_COLUMNS {
                return Err(invalid(
                    node_name,
                    controller,
                    "two-column orientation rows would read back as compressed".into(),
                ));
            }
            width as u8
        };

        let key_offset = float_index(node_name, controller, packed.data.len())?;
        packed
            .data
            .extend(controller.rows.iter().map(|row| row.time.to_bits()));
        let data_offset = float_index(node_name, controller, packed.data.len())?;
        for row in &controller.rows {
            if compress {
                let q = [row.values[0], row.values[1], row.values[2], row.values[3]];
                packed.data.push(compress_quaternion(q));
                packed.data.push(0);
            } else {
                packed.data.extend(row.values.iter().map(|v| v.to_bits()));
            }
        }

        packed.headers.push(ControllerHeader {
            controller_type: controller.controller_type,
            row_count,
            key_offset,
            data_offset,
            column_count,
        });
    }
    Ok(packed)
}
