//! Vertex-count recovery.
//!
//! The vertex count in a mesh header is unreliable in files written by
//! third-party tools. Recovery runs an ordered chain of pure strategies over a
//! [`RecoveryContext`]; the first one that returns a result wins, and
//! [`RecoveryStrategy::FaceMinimum`] is the fallback when none does.
//!
//! Whatever the strategy, the adopted count is never below the number of
//! vertices the faces address.

use crate::decoder_buffer::DecoderBuffer;

/// Largest coordinate magnitude accepted as a real vertex.
pub const MAX_PLAUSIBLE_COORDINATE: f32 = 1_000_000.0;

/// Number of leading vertices that must pass for a relocated table to be adopted.
pub const RELOCATION_MIN_RUN: usize = 10;

const POSITION_SIZE: usize = 12;

/// Which stream holds the vertex positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    /// Packed `vec3` array in the model stream.
    Inline,
    /// Interleaved in the external stream at the given stride.
    External { stride: usize },
}

impl PositionSource {
    pub fn stride(self) -> usize {
        match self {
            PositionSource::Inline => POSITION_SIZE,
            PositionSource::External { stride } => stride.max(POSITION_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// The declared count was trustworthy.
    Declared,
    /// The stream holds enough bytes for every vertex the faces address.
    AvailableBytes,
    /// Leading vertices were read one by one until an implausible one appeared.
    SequentialProbe,
    /// The vertex table was found at a different offset.
    Relocated,
    /// Nothing could be confirmed; the face-implied minimum was adopted.
    FaceMinimum,
}

/// Everything the strategies need to know about one mesh.
#[derive(Debug, Clone)]
pub struct RecoveryContext<'a> {
    /// The stream holding positions.
    pub stream: &'a DecoderBuffer<'a>,
    pub source: PositionSource,
    pub declared_count: usize,
    /// Absolute offset of vertex 0 in `stream`.
    pub declared_offset: usize,
    /// Highest face vertex index plus one, zero without faces.
    pub required_count: usize,
    /// Where a relocation scan starts, normally just past the face array.
    pub search_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveredVertices {
    pub offset: usize,
    pub count: usize,
    pub strategy: RecoveryStrategy,
}

type Strategy = fn(&RecoveryContext<'_>) -> Option<RecoveredVertices>;

const STRATEGIES: [Strategy; 4] = [
    accept_declared,
    confirm_by_available_bytes,
    confirm_by_sequential_probe,
    relocate_vertex_table,
];

/// Runs the strategy chain and returns the adopted vertex table.
pub fn recover(ctx: &RecoveryContext<'_>) -> RecoveredVertices {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(ctx))
        .unwrap_or(RecoveredVertices {
            offset: ctx.declared_offset,
            count: ctx.declared_count.max(ctx.required_count),
            strategy: RecoveryStrategy::FaceMinimum,
        })
}

/// True when the declared count cannot cover the faces.
pub fn is_suspicious(declared_count: usize, required_count: usize) -> bool {
    required_count > 0 && (declared_count <= 1 || declared_count < required_count)
}

pub fn is_plausible(v: [f32; 3]) -> bool {
    v.iter()
        .all(|c| c.is_finite() && c.abs() <= MAX_PLAUSIBLE_COORDINATE)
}

/// Keeps the header's count when it covers the faces and its table can be read
/// in full at the declared offset.
pub fn accept_declared(ctx: &RecoveryContext<'_>) -> Option<RecoveredVertices> {
    if is_suspicious(ctx.declared_count, ctx.required_count) {
        return None;
    }
    if ctx.declared_count > 0 {
        let span = table_span(ctx.source, ctx.declared_count)?;
        if !ctx.stream.contains(ctx.declared_offset, span) {
            return None;
        }
    }
    Some(RecoveredVertices {
        offset: ctx.declared_offset,
        count: ctx.declared_count,
        strategy: RecoveryStrategy::Declared,
    })
}

/// Adopts the declared offset when every face-addressed vertex is readable
/// there. The count is the declared one cut down to what the stream holds, and
/// never below what the faces address.
pub fn confirm_by_available_bytes(ctx: &RecoveryContext<'_>) -> Option<RecoveredVertices> {
    let span = table_span(ctx.source, ctx.required_count)?;
    if !ctx.stream.contains(ctx.declared_offset, span) {
        return None;
    }
    let readable = readable_count(ctx.stream.len(), ctx.declared_offset, ctx.source.stride());
    Some(RecoveredVertices {
        offset: ctx.declared_offset,
        count: ctx.declared_count.min(readable).max(ctx.required_count),
        strategy: RecoveryStrategy::AvailableBytes,
    })
}

pub fn confirm_by_sequential_probe(ctx: &RecoveryContext<'_>) -> Option<RecoveredVertices> {
    let valid = plausible_run(ctx.stream, ctx.declared_offset, ctx.source.stride(), ctx.required_count);
    (valid > 0).then_some(RecoveredVertices {
        offset: ctx.declared_offset,
        count: valid.max(ctx.required_count),
        strategy: RecoveryStrategy::SequentialProbe,
    })
}

/// Scans 4-byte aligned offsets from `search_start` for a plausible table.
///
/// The first offset where every required vertex passes wins. Failing that, the
/// first offset where the leading [`RELOCATION_MIN_RUN`] vertices pass is
/// used. Only inline tables are relocated.
///
/// Run lengths are computed once, back to front, so the scan is linear in the
/// stream length.
pub fn relocate_vertex_table(ctx: &RecoveryContext<'_>) -> Option<RecoveredVertices> {
    if ctx.source != PositionSource::Inline || ctx.required_count == 0 {
        return None;
    }
    let start = ctx.search_start.checked_add(3)? & !3;
    let slots = ctx.stream.len().checked_sub(start)? / 4;
    let step = POSITION_SIZE / 4;

    // runs[j]: plausible vertices in a row starting at start + 4 * j.
    let mut runs = vec![0usize; slots];
    for j in (0..slots).rev() {
        if ctx.stream.vec3_at(start + j * 4).map_or(false, is_plausible) {
            runs[j] = 1 + runs.get(j + step).copied().unwrap_or(0);
        }
    }

    let min_run = ctx.required_count.min(RELOCATION_MIN_RUN);
    let slot = runs
        .iter()
        .position(|&run| run >= ctx.required_count)
        .or_else(|| runs.iter().position(|&run| run >= min_run))?;
    let count = if is_suspicious(ctx.declared_count, ctx.required_count) {
        ctx.required_count
    } else {
        ctx.declared_count
    };
    Some(RecoveredVertices {
        offset: start + slot * 4,
        count,
        strategy: RecoveryStrategy::Relocated,
    })
}

/// Reads the adopted table. Vertices that cannot be read, or that are
/// implausible when the count was corrected, become the zero vector.
///
/// Returns the positions and the number of zero-filled entries.
pub fn read_vertices(
    stream: &DecoderBuffer<'_>,
    source: PositionSource,
    recovered: &RecoveredVertices,
) -> (Vec<[f32; 3]>, usize) {
    let stride = source.stride();
    let strict = recovered.strategy != RecoveryStrategy::Declared;
    let mut zero_filled = 0;
    let vertices = (0..recovered.count)
        .map(|i| {
            let v = i
                .checked_mul(stride)
                .and_then(|rel| recovered.offset.checked_add(rel))
                .and_then(|offset| stream.vec3_at(offset))
                .filter(|&v| !strict || is_plausible(v));
            v.unwrap_or_else(|| {
                zero_filled += 1;
                [0.0; 3]
            })
        })
        .collect();
    (vertices, zero_filled)
}

fn table_span(source: PositionSource, count: usize) -> Option<usize> {
    if count == 0 {
        return Some(0);
    }
    (count - 1)
        .checked_mul(source.stride())?
        .checked_add(POSITION_SIZE)
}

/// Number of whole vertices readable from `offset` at `stride`.
fn readable_count(len: usize, offset: usize, stride: usize) -> usize {
    match len.checked_sub(offset).and_then(|rest| rest.checked_sub(POSITION_SIZE)) {
        Some(rest) => rest / stride + 1,
        None => 0,
    }
}

fn plausible_run(stream: &DecoderBuffer<'_>, offset: usize, stride: usize, limit: usize) -> usize {
    (0..limit)
        .take_while(|&i| {
            i.checked_mul(stride)
                .and_then(|rel| offset.checked_add(rel))
                .and_then(|at| stream.vec3_at(at))
                .map_or(false, is_plausible)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(points: &[[f32; 3]]) -> Vec<u8> {
        points
            .iter()
            .flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes()))
            .collect()
    }

    fn context<'a>(
        stream: &'a DecoderBuffer<'a>,
        declared_count: usize,
        declared_offset: usize,
        required_count: usize,
    ) -> RecoveryContext<'a> {
        RecoveryContext {
            stream,
            source: PositionSource::Inline,
            declared_count,
            declared_offset,
            required_count,
            search_start: 0,
        }
    }

    #[test]
    fn test_suspicious_counts() {
        assert!(!is_suspicious(0, 0));
        assert!(!is_suspicious(1, 0));
        assert!(is_suspicious(1, 1));
        assert!(is_suspicious(5, 41));
        assert!(!is_suspicious(41, 41));
        assert!(!is_suspicious(50, 41));
    }

    #[test]
    fn test_plausibility() {
        assert!(is_plausible([1.0, -2.0, 1_000_000.0]));
        assert!(!is_plausible([f32::NAN, 0.0, 0.0]));
        assert!(!is_plausible([0.0, f32::INFINITY, 0.0]));
        assert!(!is_plausible([0.0, 0.0, -1_000_001.0]));
    }

    #[test]
    fn test_declared_count_is_kept_when_consistent() {
        let data = packed(&[[1.0; 3]; 4]);
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 4, 0, 3));
        assert_eq!(recovered.strategy, RecoveryStrategy::Declared);
        assert_eq!(recovered.count, 4);
    }

    #[test]
    fn test_count_raised_to_face_minimum_when_bytes_exist() {
        let data = packed(&[[0.5; 3]; 41]);
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 1, 0, 41));
        assert_eq!(recovered.strategy, RecoveryStrategy::AvailableBytes);
        assert_eq!(recovered.count, 41);

        let (vertices, zero_filled) = read_vertices(&stream, PositionSource::Inline, &recovered);
        assert_eq!(vertices.len(), 41);
        assert_eq!(zero_filled, 0);
    }

    #[test]
    fn test_probe_zero_fills_the_tail() {
        // Only 5 of 10 required vertices are present.
        let data = packed(&[[2.0; 3]; 5]);
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 1, 0, 10));
        assert_eq!(recovered.strategy, RecoveryStrategy::SequentialProbe);
        assert_eq!(recovered.count, 10);

        let (vertices, zero_filled) = read_vertices(&stream, PositionSource::Inline, &recovered);
        assert_eq!(vertices.len(), 10);
        assert_eq!(zero_filled, 5);
        assert_eq!(vertices[4], [2.0; 3]);
        assert_eq!(vertices[5], [0.0; 3]);
    }

    #[test]
    fn test_relocation_finds_table_after_garbage() {
        let mut data = vec![0xFFu8; 16];
        data.extend(packed(&[[3.0; 3]; 12]));
        let stream = DecoderBuffer::new(&data);
        let ctx = RecoveryContext {
            search_start: 0,
            ..context(&stream, 0, 10_000, 12)
        };
        let recovered = recover(&ctx);
        assert_eq!(recovered.strategy, RecoveryStrategy::Relocated);
        assert_eq!(recovered.offset, 16);
        assert_eq!(recovered.count, 12);
    }

    #[test]
    fn test_believable_count_with_unreadable_table_is_relocated() {
        let data = packed(&[[4.0; 3]; 42]);
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 42, 0x7FFF_0000, 42));
        assert_eq!(recovered.strategy, RecoveryStrategy::Relocated);
        assert_eq!(recovered.offset, 0);
        assert_eq!(recovered.count, 42);

        let (vertices, zero_filled) = read_vertices(&stream, PositionSource::Inline, &recovered);
        assert_eq!(zero_filled, 0);
        assert_eq!(vertices, vec![[4.0; 3]; 42]);
    }

    #[test]
    fn test_relocation_prefers_a_full_table_over_an_earlier_partial_one() {
        let mut data = packed(&[[1.0; 3]; 10]);
        data.extend([0xFFu8; 12]);
        data.extend(packed(&[[2.0; 3]; 20]));
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 0, usize::MAX, 20));
        assert_eq!(recovered.strategy, RecoveryStrategy::Relocated);
        assert_eq!(recovered.offset, 132);
    }

    #[test]
    fn test_relocation_scan_of_large_stream_takes_first_partial_run() {
        // 400 KB of zero vertices cannot hold 65535 of them in a row.
        let data = vec![0u8; 400_000];
        let stream = DecoderBuffer::new(&data);
        let ctx = RecoveryContext {
            search_start: 6,
            ..context(&stream, 1, usize::MAX, 65_535)
        };
        let recovered = relocate_vertex_table(&ctx).unwrap();
        assert_eq!(recovered.offset, 8);
        assert_eq!(recovered.count, 65_535);
    }

    #[test]
    fn test_available_bytes_keeps_readable_vertices_beyond_faces() {
        // Header claims 50, faces need 41, the table is cut after 45.
        let data = packed(&[[0.5; 3]; 45]);
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 50, 0, 41));
        assert_eq!(recovered.strategy, RecoveryStrategy::AvailableBytes);
        assert_eq!(recovered.count, 45);
    }

    #[test]
    fn test_fallback_when_nothing_is_readable() {
        let data = [0xFFu8; 8];
        let stream = DecoderBuffer::new(&data);
        let recovered = recover(&context(&stream, 1, 4096, 6));
        assert_eq!(recovered.strategy, RecoveryStrategy::FaceMinimum);
        assert_eq!(recovered.count, 6);

        let (vertices, zero_filled) = read_vertices(&stream, PositionSource::Inline, &recovered);
        assert_eq!(vertices, vec![[0.0; 3]; 6]);
        assert_eq!(zero_filled, 6);
    }

    #[test]
    fn test_external_source_uses_stride() {
        let mut data = Vec::new();
        for i in 0..3 {
            data.extend(packed(&[[i as f32; 3]]));
            data.extend([0u8; 8]);
        }
        let stream = DecoderBuffer::new(&data);
        let ctx = RecoveryContext {
            source: PositionSource::External { stride: 20 },
            ..context(&stream, 1, 0, 3)
        };
        let recovered = recover(&ctx);
        assert_eq!(recovered.count, 3);
        let (vertices, _) = read_vertices(&stream, ctx.source, &recovered);
        assert_eq!(vertices[2], [2.0; 3]);
    }
}
