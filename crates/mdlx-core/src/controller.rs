//! Keyframe controllers.

/// Controller type codes. Codes above 100 are interpreted per node kind, so a
/// few constants share a value.
pub mod controller_type {
    pub const POSITION: u32 = 8;
    pub const ORIENTATION: u32 = 20;
    pub const SCALE: u32 = 36;

    // Lights.
    pub const COLOR: u32 = 76;
    pub const RADIUS: u32 = 88;
    pub const SHADOW_RADIUS: u32 = 96;
    pub const VERTICAL_DISPLACEMENT: u32 = 100;
    pub const MULTIPLIER: u32 = 140;

    // Meshes.
    pub const SELF_ILLUM_COLOR: u32 = 100;
    pub const ALPHA: u32 = 132;
}

/// Column-count bit marking Bezier keys.
pub const BEZIER_FLAG: u8 = 0x10;

/// Column count marking compressed orientation rows.
pub const COMPRESSED_QUATERNION_COLUMNS: u8 = 2;

/// One key: a time and its row of values.
///
/// Bezier rows hold three floats per logical column (value, in-tangent,
/// out-tangent). Orientation rows hold [x, y, z, w].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerRow {
    pub time: f32,
    pub values: Vec<f32>,
}

impl ControllerRow {
    pub fn new(time: f32, values: Vec<f32>) -> Self {
        Self { time, values }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    pub controller_type: u32,
    pub bezier: bool,
    pub rows: Vec<ControllerRow>,
}

impl Controller {
    pub fn new(controller_type: u32) -> Self {
        Self {
            controller_type,
            bezier: false,
            rows: Vec::new(),
        }
    }

    /// A single-row controller holding a static value at time zero.
    pub fn constant(controller_type: u32, values: Vec<f32>) -> Self {
        Self {
            controller_type,
            bezier: false,
            rows: vec![ControllerRow::new(0.0, values)],
        }
    }

    /// Float width shared by every row, or `None` when rows disagree.
    /// An empty controller has width zero.
    pub fn row_width(&self) -> Option<usize> {
        let width = self.rows.first().map_or(0, |r| r.values.len());
        self.rows
            .iter()
            .all(|r| r.values.len() == width)
            .then_some(width)
    }

    /// Number of logical columns: the float width, divided by three for Bezier keys.
    pub fn logical_columns(&self) -> Option<usize> {
        let width = self.row_width()?;
        if self.bezier {
            (width % 3 == 0).then_some(width / 3)
        } else {
            Some(width)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_width() {
        let mut c = Controller::new(controller_type::POSITION);
        assert_eq!(c.row_width(), Some(0));
        c.rows.push(ControllerRow::new(0.0, vec![1.0, 2.0, 3.0]));
        c.rows.push(ControllerRow::new(1.0, vec![1.0, 2.0, 3.0]));
        assert_eq!(c.row_width(), Some(3));
        c.rows.push(ControllerRow::new(2.0, vec![1.0]));
        assert_eq!(c.row_width(), None);
    }

    #[test]
    fn test_bezier_logical_columns() {
        let mut c = Controller::constant(controller_type::POSITION, vec![0.0; 9]);
        c.bezier = true;
        assert_eq!(c.logical_columns(), Some(3));
        c.rows[0].values.pop();
        assert_eq!(c.logical_columns(), None);
    }
}
