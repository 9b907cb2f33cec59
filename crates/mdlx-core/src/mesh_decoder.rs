//! Trailing data of the geometry payloads: mesh faces and vertices, skin
//! bind pose and weights, dangly constraints, walkmesh AABB trees and light
//! flares.

use std::collections::HashSet;

use crate::decoder_buffer::DecoderBuffer;
use crate::diagnostics::{emit, Diagnostic, DiagnosticSink};
use crate::headers::{
    external_component, external_flags, AabbRecord, ArrayDefinition, DanglyHeader, LightHeader,
    MeshHeader, SkinHeader, FACE_SIZE,
};
use crate::mesh::{face_vertex_bound, Face, Mesh, Skin, VertexWeight};
use crate::node::{AabbNode, Dangly, LensFlare, Light, Walkmesh};
use crate::status::{MdlError, StatusResult};
use crate::vertex_recovery::{self, PositionSource, RecoveryContext, RecoveryStrategy};

/// The two streams a payload may read from.
#[derive(Debug, Clone, Copy)]
pub struct Streams<'a> {
    pub mdl: &'a DecoderBuffer<'a>,
    pub mdx: Option<&'a DecoderBuffer<'a>>,
}

/// Reads `def.count` elements of `element_size` bytes starting at `def.offset`.
fn read_array<T>(
    buffer: &DecoderBuffer<'_>,
    def: ArrayDefinition,
    element_size: usize,
    what: &str,
    mut read: impl FnMut(&mut DecoderBuffer<'_>) -> StatusResult<T>,
) -> StatusResult<Vec<T>> {
    if def.count == 0 {
        return Ok(Vec::new());
    }
    let in_range = def
        .byte_len(element_size)
        .map_or(false, |len| buffer.contains(def.offset as usize, len));
    if !in_range {
        return Err(MdlError::BufferError(format!(
            "{} array of {} at offset {} runs past {} bytes",
            what,
            def.count,
            def.offset,
            buffer.len()
        )));
    }
    let mut cursor = buffer.clone();
    cursor.set_position(def.offset as usize)?;
    (0..def.count).map(|_| read(&mut cursor)).collect()
}

fn vec4_at(stream: &DecoderBuffer<'_>, at: usize) -> Option<[f32; 4]> {
    let [a, b] = stream.vec2_at(at)?;
    let [c, d] = stream.vec2_at(at.checked_add(8)?)?;
    Some([a, b, c, d])
}

fn read_face(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Face> {
    let normal = buffer.decode_vec3()?;
    let plane_distance = buffer.decode_f32()?;
    let (material, smoothing_group) = Face::split_surface(buffer.decode_u32()?);
    let mut adjacent = [0u16; 3];
    for a in adjacent.iter_mut() {
        *a = buffer.decode_u16()?;
    }
    let mut vertices = [0u16; 3];
    for v in vertices.iter_mut() {
        *v = buffer.decode_u16()?;
    }
    Ok(Face {
        normal,
        plane_distance,
        material,
        smoothing_group,
        adjacent,
        vertices,
    })
}

/// Where interleaved attributes for one mesh live in the external stream.
#[derive(Debug, Clone, Copy)]
struct ExternalBlock<'a> {
    stream: &'a DecoderBuffer<'a>,
    base: usize,
    stride: usize,
}

impl<'a> ExternalBlock<'a> {
    fn locate(streams: Streams<'a>, header: &MeshHeader) -> Option<Self> {
        let stream = streams.mdx?;
        Some(Self {
            stream,
            base: header.external_data_offset as usize,
            stride: header.external_stride as usize,
        })
    }

    fn attribute_offset(&self, vertex: usize, sub_offset: usize) -> Option<usize> {
        vertex
            .checked_mul(self.stride)?
            .checked_add(self.base)?
            .checked_add(sub_offset)
    }

    /// Reads one attribute per vertex, defaulting unreadable ones to zero.
    fn read_per_vertex<T: Copy>(
        &self,
        count: usize,
        sub_offset: usize,
        defaulted: &mut usize,
        zero: T,
        read: impl Fn(&DecoderBuffer<'_>, usize) -> Option<T>,
    ) -> Vec<T> {
        (0..count)
            .map(|i| {
                self.attribute_offset(i, sub_offset)
                    .and_then(|at| read(self.stream, at))
                    .unwrap_or_else(|| {
                        *defaulted += 1;
                        zero
                    })
            })
            .collect()
    }
}

/// Decodes a mesh payload, recovering the vertex count when the header's is
/// not believable.
pub fn decode_mesh(
    streams: Streams<'_>,
    header: &MeshHeader,
    node_name: &str,
    sink: &mut dyn DiagnosticSink,
) -> StatusResult<Mesh> {
    let faces = read_array(streams.mdl, header.faces, FACE_SIZE, "face", read_face)?;
    let external = ExternalBlock::locate(streams, header);

    let external_positions = external.filter(|_| header.external_flags & external_flags::POSITION != 0);
    let (stream, source, declared_offset) =
        match (external_positions, header.component_offset(external_component::POSITION)) {
            (Some(block), Some(sub)) => (
                block.stream,
                PositionSource::External {
                    stride: block.stride,
                },
                block.base.saturating_add(sub),
            ),
            _ => (
                streams.mdl,
                PositionSource::Inline,
                header.vertex_positions_offset as usize,
            ),
        };

    let ctx = RecoveryContext {
        stream,
        source,
        declared_count: header.vertex_count as usize,
        declared_offset,
        required_count: face_vertex_bound(&faces),
        search_start: (header.faces.offset as usize)
            .saturating_add(faces.len() * FACE_SIZE),
    };
    let recovered = vertex_recovery::recover(&ctx);
    if recovered.strategy != RecoveryStrategy::Declared {
        emit(
            sink,
            Diagnostic::VertexCountCorrected {
                node: node_name.to_string(),
                declared: ctx.declared_count,
                adopted: recovered.count,
                strategy: recovered.strategy,
            },
        );
    }
    if recovered.offset != declared_offset {
        emit(
            sink,
            Diagnostic::VertexTableRelocated {
                node: node_name.to_string(),
                declared_offset,
                adopted_offset: recovered.offset,
            },
        );
    }
    let (vertices, zero_filled) = vertex_recovery::read_vertices(stream, source, &recovered);
    if zero_filled > 0 {
        emit(
            sink,
            Diagnostic::VerticesZeroFilled {
                node: node_name.to_string(),
                count: zero_filled,
            },
        );
    }

    let count = vertices.len();
    let mut defaulted = 0;
    let attribute = |flag: u32, component: usize| {
        let block = external.filter(|_| header.external_flags & flag != 0)?;
        Some((block, header.component_offset(component)?))
    };
    let normals = attribute(external_flags::NORMAL, external_component::NORMAL).map(|(block, sub)| {
        block.read_per_vertex(count, sub, &mut defaulted, [0.0; 3], |s, at| s.vec3_at(at))
    });
    let uv1 = attribute(external_flags::UV1, external_component::UV1).map(|(block, sub)| {
        block.read_per_vertex(count, sub, &mut defaulted, [0.0; 2], |s, at| s.vec2_at(at))
    });
    let uv2 = attribute(external_flags::UV2, external_component::UV2).map(|(block, sub)| {
        block.read_per_vertex(count, sub, &mut defaulted, [0.0; 2], |s, at| s.vec2_at(at))
    });
    if defaulted > 0 {
        emit(
            sink,
            Diagnostic::AttributesDefaulted {
                node: node_name.to_string(),
                count: defaulted,
            },
        );
    }

    let inverted_counter = if header.inverted_counter.count > 0 {
        streams
            .mdl
            .u32_at(header.inverted_counter.offset as usize)
            .unwrap_or(0)
    } else {
        0
    };

    Ok(Mesh {
        vertices,
        normals,
        uv1,
        uv2,
        faces,
        bounding_box: header.bounding_box,
        radius: header.radius,
        average: header.average,
        surface_area: header.total_area,
        diffuse: header.diffuse,
        ambient: header.ambient,
        transparency_hint: header.transparency_hint,
        texture1: header.texture1.clone(),
        texture2: header.texture2.clone(),
        lightmapped: header.lightmapped,
        rotate_texture: header.rotate_texture,
        background_geometry: header.background_geometry,
        shadow: header.shadow,
        beaming: header.beaming,
        render: header.render,
        two_sided: header.two_sided,
        animate_uv: header.animate_uv,
        uv_direction: header.uv_direction,
        uv_jitter: header.uv_jitter,
        uv_jitter_speed: header.uv_jitter_speed,
        inverted_counter,
        dirt_enabled: header.dirt_enabled,
        dirt_texture: header.dirt_texture,
        dirt_coordinate_space: header.dirt_coordinate_space,
        hide_in_hologram: header.hide_in_hologram,
    })
}

/// Decodes a skin payload. Per-vertex weights come from the external stream
/// and default to "no influence" when it is absent or short.
pub fn decode_skin(
    streams: Streams<'_>,
    mesh_header: &MeshHeader,
    header: &SkinHeader,
    vertex_count: usize,
    node_name: &str,
    sink: &mut dyn DiagnosticSink,
) -> StatusResult<Skin> {
    let bonemap_def = ArrayDefinition {
        offset: header.bonemap_offset,
        count: header.bonemap_count,
    };
    let bonemap = read_array(streams.mdl, bonemap_def, 4, "bonemap", |b| {
        Ok(b.decode_f32()? as i32)
    })?;
    let qbones = read_array(streams.mdl, header.qbones, 16, "qbone", |b| {
        b.decode_quaternion_wxyz()
    })?;
    let tbones = read_array(streams.mdl, header.tbones, 12, "tbone", |b| b.decode_vec3())?;

    let mut defaulted = 0;
    let weights = match ExternalBlock::locate(streams, mesh_header) {
        Some(block) if header.bone_weights_offset >= 0 && header.bone_indices_offset >= 0 => {
            let weights = block.read_per_vertex(
                vertex_count,
                header.bone_weights_offset as usize,
                &mut defaulted,
                [0.0; 4],
                vec4_at,
            );
            let bones = block.read_per_vertex(
                vertex_count,
                header.bone_indices_offset as usize,
                &mut defaulted,
                [-1.0; 4],
                vec4_at,
            );
            weights
                .into_iter()
                .zip(bones)
                .map(|(weights, bones)| VertexWeight {
                    bones: bones.map(|b| b as i16),
                    weights,
                })
                .collect()
        }
        _ => vec![VertexWeight::default(); vertex_count],
    };
    if defaulted > 0 {
        emit(
            sink,
            Diagnostic::AttributesDefaulted {
                node: node_name.to_string(),
                count: defaulted,
            },
        );
    }

    Ok(Skin {
        bone_indices: header.bone_indices,
        bonemap,
        qbones,
        tbones,
        weights,
    })
}

pub fn decode_dangly(mdl: &DecoderBuffer<'_>, header: &DanglyHeader) -> StatusResult<Dangly> {
    let constraints = read_array(mdl, header.constraints, 4, "dangly constraint", |b| {
        b.decode_f32()
    })?;
    let vertices_def = ArrayDefinition {
        offset: header.vertices_offset,
        count: header.constraints.count,
    };
    let vertices = read_array(mdl, vertices_def, 12, "dangly vertex", |b| b.decode_vec3())?;
    Ok(Dangly {
        displacement: header.displacement,
        tightness: header.tightness,
        period: header.period,
        constraints,
        vertices,
    })
}

/// Flattens the AABB tree rooted at `root_offset` in pre-order. Branches that
/// point out of range or back into the tree end there.
pub fn decode_walkmesh(mdl: &DecoderBuffer<'_>, root_offset: u32, node_name: &str) -> Walkmesh {
    let mut aabbs = Vec::new();
    let mut visited = HashSet::new();
    read_aabb(mdl, root_offset, &mut visited, &mut aabbs, node_name);
    Walkmesh { aabbs }
}

fn read_aabb(
    mdl: &DecoderBuffer<'_>,
    offset: u32,
    visited: &mut HashSet<u32>,
    out: &mut Vec<AabbNode>,
    node_name: &str,
) -> Option<usize> {
    if offset == 0 {
        return None;
    }
    if !visited.insert(offset) {
        log::warn!("node '{}': aabb node at {} revisited, branch ended", node_name, offset);
        return None;
    }
    let mut cursor = mdl.clone();
    let record = cursor
        .set_position(offset as usize)
        .and_then(|_| AabbRecord::read(&mut cursor));
    let record = match record {
        Ok(record) => record,
        Err(err) => {
            log::warn!("node '{}': aabb node at {} unreadable ({})", node_name, offset, err);
            return None;
        }
    };

    let index = out.len();
    out.push(AabbNode {
        bounding_box: record.bounding_box,
        face: record.face,
        significant_plane: record.significant_plane,
        left: None,
        right: None,
    });
    let left = read_aabb(mdl, record.left_offset, visited, out, node_name);
    let right = read_aabb(mdl, record.right_offset, visited, out, node_name);
    out[index].left = left;
    out[index].right = right;
    Some(index)
}

pub fn decode_light(mdl: &DecoderBuffer<'_>, header: &LightHeader) -> StatusResult<Light> {
    let sizes = read_array(mdl, header.flare_sizes, 4, "flare size", |b| b.decode_f32())?;
    let positions = read_array(mdl, header.flare_positions, 4, "flare position", |b| {
        b.decode_f32()
    })?;
    let shifts = read_array(mdl, header.flare_color_shifts, 12, "flare colour", |b| {
        b.decode_vec3()
    })?;
    let texture_offsets = read_array(mdl, header.flare_textures, 4, "flare texture", |b| {
        b.decode_u32()
    })?;
    let textures = texture_offsets
        .into_iter()
        .map(|offset| {
            let mut cursor = mdl.clone();
            cursor.set_position(offset as usize)?;
            cursor.decode_string()
        })
        .collect::<StatusResult<Vec<String>>>()?;

    let flares = textures
        .into_iter()
        .zip(sizes)
        .zip(positions)
        .zip(shifts)
        .map(|(((texture, size), position), color_shift)| LensFlare {
            texture,
            size,
            position,
            color_shift,
        })
        .collect();

    Ok(Light {
        flare_radius: header.flare_radius,
        priority: header.priority,
        ambient_only: header.ambient_only,
        dynamic_type: header.dynamic_type,
        affect_dynamic: header.affect_dynamic,
        shadow: header.shadow,
        flare: header.flare,
        fading: header.fading,
        flares,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder_buffer::EncoderBuffer;

    #[test]
    fn test_read_array_bounds() {
        let data = [0u8; 8];
        let buffer = DecoderBuffer::new(&data);
        let ok = read_array(&buffer, ArrayDefinition::new(0, 2), 4, "x", |b| b.decode_u32());
        assert_eq!(ok.unwrap(), vec![0, 0]);
        let short = read_array(&buffer, ArrayDefinition::new(4, 2), 4, "x", |b| b.decode_u32());
        assert!(matches!(short, Err(MdlError::BufferError(_))));
        let huge = read_array(&buffer, ArrayDefinition::new(0, u32::MAX as usize), 4, "x", |b| {
            b.decode_u32()
        });
        assert!(huge.is_err());
    }

    #[test]
    fn test_walkmesh_cycle_terminates() {
        // Two records pointing at each other.
        let mut buffer = EncoderBuffer::new();
        buffer.encode_zeros(4);
        AabbRecord {
            left_offset: 44,
            face: -1,
            ..AabbRecord::default()
        }
        .write(&mut buffer);
        AabbRecord {
            left_offset: 4,
            face: 7,
            ..AabbRecord::default()
        }
        .write(&mut buffer);
        let data = buffer.into_data();

        let walkmesh = decode_walkmesh(&DecoderBuffer::new(&data), 4, "wok");
        assert_eq!(walkmesh.aabbs.len(), 2);
        assert_eq!(walkmesh.aabbs[0].left, Some(1));
        assert_eq!(walkmesh.aabbs[1].left, None);
        assert_eq!(walkmesh.aabbs[1].face, 7);
    }

    #[test]
    fn test_walkmesh_out_of_range_root_is_empty() {
        let data = [0u8; 16];
        let walkmesh = decode_walkmesh(&DecoderBuffer::new(&data), 1000, "wok");
        assert!(walkmesh.aabbs.is_empty());
    }
}
