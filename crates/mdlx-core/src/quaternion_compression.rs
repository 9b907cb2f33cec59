//! 32-bit packed unit quaternions.
//!
//! X and Y take 11 bits each and Z takes the top 10 bits. Each field maps
//! linearly onto [-1, 1] with 0 meaning +1. W is not stored; it is rebuilt as
//! `sqrt(max(0, 1 - x² - y² - z²))`, so only rotations with `w >= 0` survive
//! unchanged and the compressor flips the sign of any quaternion with negative
//! `w` (q and -q describe the same rotation).

use num_traits::clamp;

const XY_BITS: u32 = 11;
const XY_MASK: u32 = (1 << XY_BITS) - 1;
const XY_SCALE: f32 = 1023.0;
const Z_SHIFT: u32 = 22;
const Z_MAX: u32 = (1 << 10) - 1;
const Z_SCALE: f32 = 511.0;

/// Worst-case per-axis error of a compress/decompress round trip.
pub const MAX_AXIS_ERROR: f32 = 0.5 / Z_SCALE;

/// Unpacks a compressed quaternion into [x, y, z, w].
pub fn decompress_quaternion(packed: u32) -> [f32; 4] {
    let x = 1.0 - (packed & XY_MASK) as f32 / XY_SCALE;
    let y = 1.0 - ((packed >> XY_BITS) & XY_MASK) as f32 / XY_SCALE;
    let z = 1.0 - (packed >> Z_SHIFT) as f32 / Z_SCALE;
    let w = (1.0 - x * x - y * y - z * z).max(0.0).sqrt();
    [x, y, z, w]
}

/// Packs an [x, y, z, w] quaternion. The input is normalized first.
pub fn compress_quaternion(q: [f32; 4]) -> u32 {
    let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    let mut q = if len > f32::EPSILON {
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    };
    if q[3] < 0.0 {
        q = [-q[0], -q[1], -q[2], -q[3]];
    }

    let x = quantize(q[0], XY_SCALE, XY_MASK);
    let y = quantize(q[1], XY_SCALE, XY_MASK);
    let z = quantize(q[2], Z_SCALE, Z_MAX);
    x | (y << XY_BITS) | (z << Z_SHIFT)
}

fn quantize(component: f32, scale: f32, max: u32) -> u32 {
    let v = ((1.0 - component) * scale).round();
    clamp(v, 0.0, max as f32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit(q: [f32; 4]) -> [f32; 4] {
        let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    }

    #[test]
    fn test_identity_roundtrip() {
        let packed = compress_quaternion([0.0, 0.0, 0.0, 1.0]);
        let q = decompress_quaternion(packed);
        for axis in 0..3 {
            assert!(q[axis].abs() <= MAX_AXIS_ERROR, "axis {} = {}", axis, q[axis]);
        }
        assert!((q[3] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_field_layout() {
        // All-zero fields decode to x = y = z = 1, which leaves no room for w.
        assert_eq!(decompress_quaternion(0), [1.0, 1.0, 1.0, 0.0]);
        // Maximal fields decode to the negative end of each range.
        let q = decompress_quaternion(u32::MAX);
        assert!((q[0] - (1.0 - 2047.0 / 1023.0)).abs() < 1e-6);
        assert!((q[2] - (1.0 - 1023.0 / 511.0)).abs() < 1e-6);
    }

    #[test]
    fn test_negative_w_is_canonicalized() {
        let q = unit([0.2, -0.3, 0.1, -0.9]);
        let r = decompress_quaternion(compress_quaternion(q));
        assert!(r[3] >= 0.0);
        for axis in 0..3 {
            assert!((r[axis] + q[axis]).abs() <= MAX_AXIS_ERROR + 1e-6);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn prop_roundtrip_within_quantization_error(
            x in -1.0f32..1.0,
            y in -1.0f32..1.0,
            z in -1.0f32..1.0,
            w in 0.0f32..1.0,
        ) {
            let len = (x * x + y * y + z * z + w * w).sqrt();
            prop_assume!(len > 0.1);
            let q = unit([x, y, z, w]);
            let r = decompress_quaternion(compress_quaternion(q));
            for axis in 0..3 {
                prop_assert!(
                    (r[axis] - q[axis]).abs() <= MAX_AXIS_ERROR + 1e-6,
                    "axis {}: {} vs {}", axis, r[axis], q[axis]
                );
            }
            prop_assert!(r[3] >= 0.0);
        }
    }
}
