//! Writes node blocks at the offsets chosen by the planner.
//!
//! The writer never computes an offset. It checks its position against the
//! plan before every section and fails with an invariant violation when the
//! two disagree.

use crate::encoder_buffer::EncoderBuffer;
use crate::headers::{
    external_component, external_flags, AabbRecord, ArrayDefinition, DanglyHeader, EmitterHeader,
    LightHeader, MeshHeader, NodeHeader, ReferenceHeader, SkinHeader, WalkmeshHeader,
    ABSENT_COMPONENT, NAME_WIDTH,
};
use crate::mesh::Mesh;
use crate::node::{Node, Walkmesh};
use crate::offset_planner::{ExternalLayout, NodeLayout, TreeLayout};
use crate::status::{MdlError, Status};
use crate::version::Revision;

/// Rejects strings that would be truncated by a fixed-width field.
pub(crate) fn check_fixed_width(owner: &str, field: &str, value: &str, width: usize) -> Status {
    if value.len() >= width {
        return Err(MdlError::InvalidParameter(format!(
            "{} on '{}' is {} bytes, the field holds {}",
            field,
            owner,
            value.len(),
            width - 1
        )));
    }
    Ok(())
}

fn sub_offset(offset: Option<usize>) -> i32 {
    offset.map_or(ABSENT_COMPONENT, |o| o as i32)
}

/// Writes every node of a tree in pre-order.
pub fn encode_tree(
    buffer: &mut EncoderBuffer,
    external: &mut EncoderBuffer,
    root: &Node,
    tree: &TreeLayout,
    revision: Revision,
    owner_offset: usize,
) -> Status {
    let nodes = root.preorder();
    if nodes.len() != tree.nodes.len() {
        return Err(MdlError::InvariantViolation(format!(
            "tree under '{}' has {} nodes but {} were planned",
            root.name,
            nodes.len(),
            tree.nodes.len()
        )));
    }
    for (node, layout) in nodes.into_iter().zip(&tree.nodes) {
        encode_node(buffer, external, node, layout, revision, owner_offset)?;
    }
    Ok(())
}

/// Writes one node block and its external-stream attributes.
pub fn encode_node(
    buffer: &mut EncoderBuffer,
    external: &mut EncoderBuffer,
    node: &Node,
    layout: &NodeLayout,
    revision: Revision,
    owner_offset: usize,
) -> Status {
    if layout.child_offsets.len() != node.children.len() {
        return Err(MdlError::InvariantViolation(format!(
            "node '{}' declares {} children but {} child offsets were planned",
            node.name,
            node.children.len(),
            layout.child_offsets.len()
        )));
    }
    let block = &layout.block;
    let section = |what: &str| format!("node '{}' {}", node.name, what);

    buffer.expect_position(layout.offset, &section("header"))?;
    NodeHeader {
        type_flags: node.type_flags(),
        node_id: node.id,
        name_index: layout.name_index,
        owner_offset: owner_offset as u32,
        parent_offset: layout.parent_offset as u32,
        position: node.position,
        orientation: node.orientation,
        children: ArrayDefinition::new(layout.offset + block.children, node.children.len()),
        controllers: ArrayDefinition::new(
            layout.offset + block.controllers,
            layout.controllers.headers.len(),
        ),
        controller_data: ArrayDefinition::new(
            layout.offset + block.controller_data,
            layout.controllers.data.len(),
        ),
    }
    .write(buffer);

    write_payload_headers(buffer, node, layout, revision)?;

    if let Some(mesh) = &node.mesh {
        buffer.expect_position(layout.offset + block.faces, &section("faces"))?;
        for face in &mesh.faces {
            buffer.encode_vec3(face.normal);
            buffer.encode_f32(face.plane_distance);
            buffer.encode_u32(face.surface());
            face.adjacent.iter().for_each(|&a| buffer.encode_u16(a));
            face.vertices.iter().for_each(|&v| buffer.encode_u16(v));
        }
        buffer.encode_u32((mesh.faces.len() * 3) as u32);
        buffer.encode_u32(layout.at(block.vertex_indices));
        buffer.encode_u32(mesh.inverted_counter);
        buffer.expect_position(layout.offset + block.vertices, &section("vertices"))?;
        mesh.vertices.iter().for_each(|&v| buffer.encode_vec3(v));
    }
    if let Some(skin) = &node.skin {
        buffer.expect_position(layout.offset + block.bonemap, &section("bonemap"))?;
        skin.bonemap.iter().for_each(|&b| buffer.encode_f32(b as f32));
        skin.qbones.iter().for_each(|&q| buffer.encode_quaternion_wxyz(q));
        skin.tbones.iter().for_each(|&t| buffer.encode_vec3(t));
    }
    if let Some(mesh) = &node.mesh {
        buffer.expect_position(layout.offset + block.vertex_indices, &section("vertex indices"))?;
        mesh.faces
            .iter()
            .flat_map(|f| f.vertices)
            .for_each(|v| buffer.encode_u16(v));
        buffer.pad_to_alignment(4);
    }
    if let Some(dangly) = &node.dangly {
        buffer.expect_position(layout.offset + block.dangly_constraints, &section("constraints"))?;
        dangly.constraints.iter().for_each(|&c| buffer.encode_f32(c));
        dangly.vertices.iter().for_each(|&v| buffer.encode_vec3(v));
    }
    if let Some(walkmesh) = &node.walkmesh {
        buffer.expect_position(layout.offset + block.aabbs, &section("aabb tree"))?;
        write_aabbs(buffer, walkmesh, layout);
    }
    if let Some(light) = &node.light {
        buffer.expect_position(layout.offset + block.flare_sizes, &section("flares"))?;
        light.flares.iter().for_each(|f| buffer.encode_f32(f.size));
        light.flares.iter().for_each(|f| buffer.encode_f32(f.position));
        light.flares.iter().for_each(|f| buffer.encode_vec3(f.color_shift));
        block
            .flare_strings
            .iter()
            .for_each(|&s| buffer.encode_u32(layout.at(s)));
        light
            .flares
            .iter()
            .for_each(|f| buffer.encode_string(&f.texture));
        buffer.pad_to_alignment(4);
    }

    buffer.expect_position(layout.offset + block.children, &section("child table"))?;
    layout
        .child_offsets
        .iter()
        .for_each(|&c| buffer.encode_u32(c as u32));

    buffer.expect_position(layout.offset + block.controllers, &section("controllers"))?;
    layout
        .controllers
        .headers
        .iter()
        .for_each(|h| h.write(buffer));
    layout
        .controllers
        .data
        .iter()
        .for_each(|&word| buffer.encode_u32(word));
    buffer.expect_position(layout.offset + block.size, &section("end"))?;

    if let (Some(mesh), Some(ext)) = (&node.mesh, &layout.external) {
        write_external(external, node, mesh, ext)?;
    }
    Ok(())
}

fn write_payload_headers(
    buffer: &mut EncoderBuffer,
    node: &Node,
    layout: &NodeLayout,
    revision: Revision,
) -> Status {
    let block = &layout.block;
    let name = node.name.as_str();

    if let Some(mesh) = &node.mesh {
        check_fixed_width(name, "texture1", &mesh.texture1, NAME_WIDTH)?;
        check_fixed_width(name, "texture2", &mesh.texture2, NAME_WIDTH)?;
        buffer.expect_position(layout.offset + block.mesh_header, &format!("node '{}' mesh", name))?;
        mesh_header(node, mesh, layout, revision).write(buffer, revision);
    }
    if let Some(skin) = &node.skin {
        let ext = layout.external.as_ref();
        SkinHeader {
            unused_weights: ArrayDefinition::default(),
            bone_weights_offset: sub_offset(ext.and_then(|e| e.bone_weights)),
            bone_indices_offset: sub_offset(ext.and_then(|e| e.bone_indices)),
            bonemap_offset: layout.at(block.bonemap),
            bonemap_count: skin.bonemap.len() as u32,
            qbones: ArrayDefinition::new(layout.offset + block.qbones, skin.qbones.len()),
            tbones: ArrayDefinition::new(layout.offset + block.tbones, skin.tbones.len()),
            reserved: ArrayDefinition::default(),
            bone_indices: skin.bone_indices,
        }
        .write(buffer);
    }
    if let Some(dangly) = &node.dangly {
        DanglyHeader {
            constraints: ArrayDefinition::new(
                layout.offset + block.dangly_constraints,
                dangly.constraints.len(),
            ),
            displacement: dangly.displacement,
            tightness: dangly.tightness,
            period: dangly.period,
            vertices_offset: layout.at(block.dangly_vertices),
        }
        .write(buffer);
    }
    if let Some(walkmesh) = &node.walkmesh {
        let root_offset = if walkmesh.aabbs.is_empty() {
            0
        } else {
            layout.at(block.aabbs)
        };
        WalkmeshHeader { root_offset }.write(buffer);
    }
    if let Some(light) = &node.light {
        let n = light.flares.len();
        LightHeader {
            flare_radius: light.flare_radius,
            flare_sizes: ArrayDefinition::new(layout.offset + block.flare_sizes, n),
            flare_positions: ArrayDefinition::new(layout.offset + block.flare_positions, n),
            flare_color_shifts: ArrayDefinition::new(layout.offset + block.flare_color_shifts, n),
            flare_textures: ArrayDefinition::new(layout.offset + block.flare_texture_offsets, n),
            priority: light.priority,
            ambient_only: light.ambient_only,
            dynamic_type: light.dynamic_type,
            affect_dynamic: light.affect_dynamic,
            shadow: light.shadow,
            flare: light.flare,
            fading: light.fading,
        }
        .write(buffer);
    }
    if let Some(e) = &node.emitter {
        for (field, value) in [
            ("update", &e.update),
            ("render", &e.render),
            ("blend", &e.blend),
            ("texture", &e.texture),
            ("depth texture", &e.depth_texture),
        ] {
            check_fixed_width(name, field, value, NAME_WIDTH)?;
        }
        check_fixed_width(name, "chunk name", &e.chunk_name, 16)?;
        EmitterHeader {
            dead_space: e.dead_space,
            blast_radius: e.blast_radius,
            blast_length: e.blast_length,
            branch_count: e.branch_count,
            control_point_smoothing: e.control_point_smoothing,
            x_grid: e.x_grid,
            y_grid: e.y_grid,
            spawn_type: e.spawn_type,
            update: e.update.clone(),
            render: e.render.clone(),
            blend: e.blend.clone(),
            texture: e.texture.clone(),
            chunk_name: e.chunk_name.clone(),
            two_sided_texture: e.two_sided_texture,
            looping: e.looping,
            render_order: e.render_order,
            frame_blending: e.frame_blending,
            depth_texture: e.depth_texture.clone(),
            flags: e.flags,
        }
        .write(buffer);
    }
    if let Some(reference) = &node.reference {
        check_fixed_width(name, "reference model", &reference.model, NAME_WIDTH)?;
        ReferenceHeader {
            model: reference.model.clone(),
            reattachable: reference.reattachable,
        }
        .write(buffer);
    }
    Ok(())
}

fn mesh_header(node: &Node, mesh: &Mesh, layout: &NodeLayout, revision: Revision) -> MeshHeader {
    let block = &layout.block;
    let ext = layout.external.clone().unwrap_or_default();

    let routine_sentinels = if node.skin.is_some() {
        revision.skin_sentinels()
    } else if node.dangly.is_some() {
        revision.dangly_sentinels()
    } else {
        revision.mesh_sentinels()
    };

    let mut flags = 0;
    let mut offsets = [ABSENT_COMPONENT; external_component::COUNT];
    for (sub, flag, component) in [
        (ext.normal, external_flags::NORMAL, external_component::NORMAL),
        (ext.uv1, external_flags::UV1, external_component::UV1),
        (ext.uv2, external_flags::UV2, external_component::UV2),
    ] {
        if let Some(sub) = sub {
            flags |= flag;
            offsets[component] = sub as i32;
        }
    }

    MeshHeader {
        routine_sentinels,
        faces: ArrayDefinition::new(layout.offset + block.faces, mesh.faces.len()),
        bounding_box: mesh.bounding_box,
        radius: mesh.radius,
        average: mesh.average,
        diffuse: mesh.diffuse,
        ambient: mesh.ambient,
        transparency_hint: mesh.transparency_hint,
        texture1: mesh.texture1.clone(),
        texture2: mesh.texture2.clone(),
        texture3: String::new(),
        texture4: String::new(),
        index_counts: ArrayDefinition::new(layout.offset + block.index_counts, 1),
        index_offsets: ArrayDefinition::new(layout.offset + block.index_offsets, 1),
        inverted_counter: ArrayDefinition::new(layout.offset + block.inverted_counter, 1),
        animate_uv: mesh.animate_uv,
        uv_direction: mesh.uv_direction,
        uv_jitter: mesh.uv_jitter,
        uv_jitter_speed: mesh.uv_jitter_speed,
        external_stride: ext.stride as u32,
        external_flags: flags,
        external_offsets: offsets,
        vertex_count: mesh.num_vertices() as u16,
        texture_count: mesh.texture_count(),
        lightmapped: mesh.lightmapped,
        rotate_texture: mesh.rotate_texture,
        background_geometry: mesh.background_geometry,
        shadow: mesh.shadow,
        beaming: mesh.beaming,
        render: mesh.render,
        dirt_enabled: mesh.dirt_enabled,
        dirt_texture: mesh.dirt_texture,
        dirt_coordinate_space: mesh.dirt_coordinate_space,
        hide_in_hologram: mesh.hide_in_hologram,
        two_sided: mesh.two_sided,
        total_area: mesh.surface_area,
        external_data_offset: ext.offset as u32,
        vertex_positions_offset: layout.at(block.vertices),
    }
}

fn write_aabbs(buffer: &mut EncoderBuffer, walkmesh: &Walkmesh, layout: &NodeLayout) {
    let record_offset =
        |index: Option<usize>| index.map_or(0, |i| layout.at(layout.block.aabbs + i * AabbRecord::SIZE));
    for aabb in &walkmesh.aabbs {
        AabbRecord {
            bounding_box: aabb.bounding_box,
            left_offset: record_offset(aabb.left),
            right_offset: record_offset(aabb.right),
            face: aabb.face,
            significant_plane: aabb.significant_plane,
        }
        .write(buffer);
    }
}

/// Writes the interleaved per-vertex block followed by one zeroed vertex.
fn write_external(
    external: &mut EncoderBuffer,
    node: &Node,
    mesh: &Mesh,
    ext: &ExternalLayout,
) -> Status {
    if ext.stride == 0 {
        return Ok(());
    }
    external.expect_position(ext.offset, &format!("node '{}' external block", node.name))?;
    for i in 0..ext.vertex_count {
        if let Some(normals) = &mesh.normals {
            external.encode_vec3(normals[i]);
        }
        if let Some(uv1) = &mesh.uv1 {
            external.encode_vec2(uv1[i]);
        }
        if let Some(uv2) = &mesh.uv2 {
            external.encode_vec2(uv2[i]);
        }
        if let Some(skin) = &node.skin {
            let weight = skin.weights[i];
            weight.bones.iter().for_each(|&b| external.encode_f32(b as f32));
            weight.weights.iter().for_each(|&w| external.encode_f32(w));
        }
    }
    external.encode_zeros(ext.stride);
    external.expect_position(ext.offset + ext.size(), &format!("node '{}' external end", node.name))
}
