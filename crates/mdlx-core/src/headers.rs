//! Fixed-size on-disk headers.
//!
//! Every header has a `read` that consumes exactly `SIZE` bytes (or the
//! revision-dependent size for [`MeshHeader`]) and a `write` that produces the
//! same number of bytes. Reads check the whole span up front and fail with
//! [`MdlError::MalformedHeader`] when it runs past the end of the stream.

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::model::BoundingBox;
use crate::status::{MdlError, Status, StatusResult};
use crate::version::Revision;

/// Width of the fixed name fields used throughout the format.
pub const NAME_WIDTH: usize = 32;

/// Offset value meaning "not set".
pub const UNSET_OFFSET: u32 = u32::MAX;

fn require(buffer: &DecoderBuffer<'_>, size: usize, what: &str) -> Status {
    if buffer.remaining_size() < size {
        return Err(MdlError::MalformedHeader(format!(
            "{} needs {} bytes at offset {}, {} available",
            what,
            size,
            buffer.position(),
            buffer.remaining_size()
        )));
    }
    Ok(())
}

fn decode_bool_u32(buffer: &mut DecoderBuffer<'_>) -> StatusResult<bool> {
    Ok(buffer.decode_u32()? != 0)
}

fn decode_bool_u8(buffer: &mut DecoderBuffer<'_>) -> StatusResult<bool> {
    Ok(buffer.decode_u8()? != 0)
}

/// `{offset, count, count}` triple locating a variable-length array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDefinition {
    pub offset: u32,
    pub count: u32,
}

impl ArrayDefinition {
    pub const SIZE: usize = 12;

    pub fn new(offset: usize, count: usize) -> Self {
        Self {
            offset: offset as u32,
            count: count as u32,
        }
    }

    /// Byte span of `count` elements of `element_size` bytes, or `None` on overflow.
    pub fn byte_len(&self, element_size: usize) -> Option<usize> {
        (self.count as usize).checked_mul(element_size)
    }

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        let offset = buffer.decode_u32()?;
        let count = buffer.decode_u32()?;
        // The duplicated count is not trusted; the first one wins.
        buffer.decode_u32()?;
        Ok(Self { offset, count })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u32(self.offset);
        buffer.encode_u32(self.count);
        buffer.encode_u32(self.count);
    }
}

/// Leading header of the model stream. Not counted by any offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeader {
    pub model_data_size: u32,
    pub external_size: u32,
}

impl FileHeader {
    pub const SIZE: usize = 12;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "file header")?;
        let zero = buffer.decode_u32()?;
        if zero != 0 {
            return Err(MdlError::MalformedHeader(format!(
                "file header must start with zero, found {:#x}",
                zero
            )));
        }
        Ok(Self {
            model_data_size: buffer.decode_u32()?,
            external_size: buffer.decode_u32()?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u32(0);
        buffer.encode_u32(self.model_data_size);
        buffer.encode_u32(self.external_size);
    }
}

pub mod model_type {
    pub const GEOMETRY: u8 = 2;
    pub const ANIMATION: u8 = 5;
}

/// Shared prefix of the model header and every animation header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryHeader {
    pub sentinels: (u32, u32),
    pub name: String,
    pub root_node_offset: u32,
    pub node_count: u32,
    pub reference_count: u32,
    pub model_type: u8,
}

impl GeometryHeader {
    pub const SIZE: usize = 80;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "geometry header")?;
        let sentinels = (buffer.decode_u32()?, buffer.decode_u32()?);
        let name = buffer.decode_fixed_string(NAME_WIDTH)?;
        let root_node_offset = buffer.decode_u32()?;
        let node_count = buffer.decode_u32()?;
        buffer.skip(24)?;
        let reference_count = buffer.decode_u32()?;
        let model_type = buffer.decode_u8()?;
        buffer.skip(3)?;
        Ok(Self {
            sentinels,
            name,
            root_node_offset,
            node_count,
            reference_count,
            model_type,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u32(self.sentinels.0);
        buffer.encode_u32(self.sentinels.1);
        buffer.encode_fixed_string(&self.name, NAME_WIDTH);
        buffer.encode_u32(self.root_node_offset);
        buffer.encode_u32(self.node_count);
        buffer.encode_zeros(24);
        buffer.encode_u32(self.reference_count);
        buffer.encode_u8(self.model_type);
        buffer.encode_zeros(3);
    }

    /// Revision implied by the sentinel pair.
    pub fn revision(&self) -> Revision {
        Revision::detect(self.sentinels)
    }
}

/// Supermodel name stored when a model has no parent.
pub const NO_SUPERMODEL: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelHeader {
    pub geometry: GeometryHeader,
    pub classification: u8,
    pub subclassification: u8,
    pub affected_by_fog: bool,
    pub child_model_count: u32,
    pub animations: ArrayDefinition,
    pub supermodel_reference: u32,
    pub bounding_box: BoundingBox,
    pub radius: f32,
    pub animation_scale: f32,
    pub supermodel_name: String,
    pub head_root_offset: u32,
    pub external_size: u32,
    pub external_offset: u32,
    pub names: ArrayDefinition,
}

impl ModelHeader {
    /// Size of the model-specific part that follows the geometry header.
    pub const SIZE: usize = 116;

    /// Reads the geometry header and the model header that follows it.
    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        let geometry = GeometryHeader::read(buffer)?;
        require(buffer, Self::SIZE, "model header")?;
        let classification = buffer.decode_u8()?;
        let subclassification = buffer.decode_u8()?;
        buffer.skip(1)?;
        let affected_by_fog = decode_bool_u8(buffer)?;
        let child_model_count = buffer.decode_u32()?;
        let animations = ArrayDefinition::read(buffer)?;
        let supermodel_reference = buffer.decode_u32()?;
        let bounding_box = BoundingBox::new(buffer.decode_vec3()?, buffer.decode_vec3()?);
        let radius = buffer.decode_f32()?;
        let animation_scale = buffer.decode_f32()?;
        let supermodel_name = buffer.decode_fixed_string(NAME_WIDTH)?;
        let head_root_offset = buffer.decode_u32()?;
        buffer.skip(4)?;
        let external_size = buffer.decode_u32()?;
        let external_offset = buffer.decode_u32()?;
        let names = ArrayDefinition::read(buffer)?;
        Ok(Self {
            geometry,
            classification,
            subclassification,
            affected_by_fog,
            child_model_count,
            animations,
            supermodel_reference,
            bounding_box,
            radius,
            animation_scale,
            supermodel_name,
            head_root_offset,
            external_size,
            external_offset,
            names,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        self.geometry.write(buffer);
        buffer.encode_u8(self.classification);
        buffer.encode_u8(self.subclassification);
        buffer.encode_u8(0);
        buffer.encode_u8(self.affected_by_fog as u8);
        buffer.encode_u32(self.child_model_count);
        self.animations.write(buffer);
        buffer.encode_u32(self.supermodel_reference);
        buffer.encode_vec3(self.bounding_box.min);
        buffer.encode_vec3(self.bounding_box.max);
        buffer.encode_f32(self.radius);
        buffer.encode_f32(self.animation_scale);
        buffer.encode_fixed_string(&self.supermodel_name, NAME_WIDTH);
        buffer.encode_u32(self.head_root_offset);
        buffer.encode_u32(0);
        buffer.encode_u32(self.external_size);
        buffer.encode_u32(self.external_offset);
        self.names.write(buffer);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationHeader {
    pub geometry: GeometryHeader,
    pub length: f32,
    pub transition: f32,
    pub source_model: String,
    pub events: ArrayDefinition,
}

impl AnimationHeader {
    /// Full size including the leading geometry header.
    pub const SIZE: usize = GeometryHeader::SIZE + 56;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "animation header")?;
        let geometry = GeometryHeader::read(buffer)?;
        let length = buffer.decode_f32()?;
        let transition = buffer.decode_f32()?;
        let source_model = buffer.decode_fixed_string(NAME_WIDTH)?;
        let events = ArrayDefinition::read(buffer)?;
        buffer.skip(4)?;
        Ok(Self {
            geometry,
            length,
            transition,
            source_model,
            events,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        self.geometry.write(buffer);
        buffer.encode_f32(self.length);
        buffer.encode_f32(self.transition);
        buffer.encode_fixed_string(&self.source_model, NAME_WIDTH);
        self.events.write(buffer);
        buffer.encode_u32(0);
    }
}

/// Size of one animation event record.
pub const EVENT_SIZE: usize = 4 + NAME_WIDTH;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeHeader {
    pub type_flags: u16,
    pub node_id: u16,
    pub name_index: u16,
    pub owner_offset: u32,
    pub parent_offset: u32,
    pub position: [f32; 3],
    /// [x, y, z, w]; stored as (w, x, y, z).
    pub orientation: [f32; 4],
    pub children: ArrayDefinition,
    pub controllers: ArrayDefinition,
    pub controller_data: ArrayDefinition,
}

impl NodeHeader {
    pub const SIZE: usize = 80;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "node header")?;
        let type_flags = buffer.decode_u16()?;
        let node_id = buffer.decode_u16()?;
        let name_index = buffer.decode_u16()?;
        buffer.skip(2)?;
        Ok(Self {
            type_flags,
            node_id,
            name_index,
            owner_offset: buffer.decode_u32()?,
            parent_offset: buffer.decode_u32()?,
            position: buffer.decode_vec3()?,
            orientation: buffer.decode_quaternion_wxyz()?,
            children: ArrayDefinition::read(buffer)?,
            controllers: ArrayDefinition::read(buffer)?,
            controller_data: ArrayDefinition::read(buffer)?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u16(self.type_flags);
        buffer.encode_u16(self.node_id);
        buffer.encode_u16(self.name_index);
        buffer.encode_u16(0);
        buffer.encode_u32(self.owner_offset);
        buffer.encode_u32(self.parent_offset);
        buffer.encode_vec3(self.position);
        buffer.encode_quaternion_wxyz(self.orientation);
        self.children.write(buffer);
        self.controllers.write(buffer);
        self.controller_data.write(buffer);
    }
}

/// Attribute bits of [`MeshHeader::external_flags`].
pub mod external_flags {
    pub const POSITION: u32 = 0x01;
    pub const UV1: u32 = 0x02;
    pub const UV2: u32 = 0x04;
    pub const NORMAL: u32 = 0x20;
}

/// Slots of [`MeshHeader::external_offsets`].
pub mod external_component {
    pub const POSITION: usize = 0;
    pub const NORMAL: usize = 1;
    pub const COLOR: usize = 2;
    pub const UV1: usize = 3;
    pub const UV2: usize = 4;
    pub const UV3: usize = 5;
    pub const UV4: usize = 6;
    pub const TANGENT1: usize = 7;
    pub const COUNT: usize = 11;
}

/// Sub-offset value for an absent external-stream component.
pub const ABSENT_COMPONENT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshHeader {
    pub routine_sentinels: (u32, u32),
    pub faces: ArrayDefinition,
    pub bounding_box: BoundingBox,
    pub radius: f32,
    pub average: [f32; 3],
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub transparency_hint: u32,
    pub texture1: String,
    pub texture2: String,
    pub texture3: String,
    pub texture4: String,
    pub index_counts: ArrayDefinition,
    pub index_offsets: ArrayDefinition,
    pub inverted_counter: ArrayDefinition,
    pub animate_uv: bool,
    pub uv_direction: [f32; 2],
    pub uv_jitter: f32,
    pub uv_jitter_speed: f32,
    pub external_stride: u32,
    pub external_flags: u32,
    pub external_offsets: [i32; external_component::COUNT],
    pub vertex_count: u16,
    pub texture_count: u16,
    pub lightmapped: bool,
    pub rotate_texture: bool,
    pub background_geometry: bool,
    pub shadow: bool,
    pub beaming: bool,
    pub render: bool,
    pub dirt_enabled: bool,
    pub dirt_texture: u16,
    pub dirt_coordinate_space: u16,
    pub hide_in_hologram: bool,
    pub two_sided: bool,
    pub total_area: f32,
    pub external_data_offset: u32,
    pub vertex_positions_offset: u32,
}

impl MeshHeader {
    /// Byte offset of `vertex_count` within the header.
    pub const VERTEX_COUNT_OFFSET: usize = 304;

    /// Sub-offset of an external component, or `None` when absent.
    pub fn component_offset(&self, component: usize) -> Option<usize> {
        match self.external_offsets.get(component) {
            Some(&offset) if offset >= 0 => Some(offset as usize),
            _ => None,
        }
    }

    pub fn read(buffer: &mut DecoderBuffer<'_>, revision: Revision) -> StatusResult<Self> {
        require(buffer, revision.mesh_header_size(), "mesh header")?;
        let mut header = Self {
            routine_sentinels: (buffer.decode_u32()?, buffer.decode_u32()?),
            faces: ArrayDefinition::read(buffer)?,
            bounding_box: BoundingBox::new(buffer.decode_vec3()?, buffer.decode_vec3()?),
            radius: buffer.decode_f32()?,
            average: buffer.decode_vec3()?,
            diffuse: buffer.decode_vec3()?,
            ambient: buffer.decode_vec3()?,
            transparency_hint: buffer.decode_u32()?,
            texture1: buffer.decode_fixed_string(NAME_WIDTH)?,
            texture2: buffer.decode_fixed_string(NAME_WIDTH)?,
            texture3: buffer.decode_fixed_string(12)?,
            texture4: buffer.decode_fixed_string(12)?,
            index_counts: ArrayDefinition::read(buffer)?,
            index_offsets: ArrayDefinition::read(buffer)?,
            inverted_counter: ArrayDefinition::read(buffer)?,
            ..Self::default()
        };
        buffer.skip(12 + 8)?;
        header.animate_uv = decode_bool_u32(buffer)?;
        header.uv_direction = buffer.decode_vec2()?;
        header.uv_jitter = buffer.decode_f32()?;
        header.uv_jitter_speed = buffer.decode_f32()?;
        header.external_stride = buffer.decode_u32()?;
        header.external_flags = buffer.decode_u32()?;
        for slot in header.external_offsets.iter_mut() {
            *slot = buffer.decode_i32()?;
        }
        header.vertex_count = buffer.decode_u16()?;
        header.texture_count = buffer.decode_u16()?;
        header.lightmapped = decode_bool_u8(buffer)?;
        header.rotate_texture = decode_bool_u8(buffer)?;
        header.background_geometry = decode_bool_u8(buffer)?;
        header.shadow = decode_bool_u8(buffer)?;
        header.beaming = decode_bool_u8(buffer)?;
        header.render = decode_bool_u8(buffer)?;
        if revision.has_mesh_extension() {
            header.dirt_enabled = decode_bool_u8(buffer)?;
            buffer.skip(1)?;
            header.dirt_texture = buffer.decode_u16()?;
            header.dirt_coordinate_space = buffer.decode_u16()?;
            header.hide_in_hologram = decode_bool_u8(buffer)?;
            buffer.skip(1)?;
        }
        header.two_sided = decode_bool_u8(buffer)?;
        buffer.skip(1)?;
        header.total_area = buffer.decode_f32()?;
        buffer.skip(4)?;
        header.external_data_offset = buffer.decode_u32()?;
        header.vertex_positions_offset = buffer.decode_u32()?;
        Ok(header)
    }

    pub fn write(&self, buffer: &mut EncoderBuffer, revision: Revision) {
        buffer.encode_u32(self.routine_sentinels.0);
        buffer.encode_u32(self.routine_sentinels.1);
        self.faces.write(buffer);
        buffer.encode_vec3(self.bounding_box.min);
        buffer.encode_vec3(self.bounding_box.max);
        buffer.encode_f32(self.radius);
        buffer.encode_vec3(self.average);
        buffer.encode_vec3(self.diffuse);
        buffer.encode_vec3(self.ambient);
        buffer.encode_u32(self.transparency_hint);
        buffer.encode_fixed_string(&self.texture1, NAME_WIDTH);
        buffer.encode_fixed_string(&self.texture2, NAME_WIDTH);
        buffer.encode_fixed_string(&self.texture3, 12);
        buffer.encode_fixed_string(&self.texture4, 12);
        self.index_counts.write(buffer);
        self.index_offsets.write(buffer);
        self.inverted_counter.write(buffer);
        buffer.encode_i32(-1);
        buffer.encode_i32(-1);
        buffer.encode_u32(0);
        buffer.encode_zeros(8);
        buffer.encode_u32(self.animate_uv as u32);
        buffer.encode_vec2(self.uv_direction);
        buffer.encode_f32(self.uv_jitter);
        buffer.encode_f32(self.uv_jitter_speed);
        buffer.encode_u32(self.external_stride);
        buffer.encode_u32(self.external_flags);
        for &offset in &self.external_offsets {
            buffer.encode_i32(offset);
        }
        buffer.encode_u16(self.vertex_count);
        buffer.encode_u16(self.texture_count);
        buffer.encode_u8(self.lightmapped as u8);
        buffer.encode_u8(self.rotate_texture as u8);
        buffer.encode_u8(self.background_geometry as u8);
        buffer.encode_u8(self.shadow as u8);
        buffer.encode_u8(self.beaming as u8);
        buffer.encode_u8(self.render as u8);
        if revision.has_mesh_extension() {
            buffer.encode_u8(self.dirt_enabled as u8);
            buffer.encode_u8(0);
            buffer.encode_u16(self.dirt_texture);
            buffer.encode_u16(self.dirt_coordinate_space);
            buffer.encode_u8(self.hide_in_hologram as u8);
            buffer.encode_u8(0);
        }
        buffer.encode_u8(self.two_sided as u8);
        buffer.encode_u8(0);
        buffer.encode_f32(self.total_area);
        buffer.encode_u32(0);
        buffer.encode_u32(self.external_data_offset);
        buffer.encode_u32(self.vertex_positions_offset);
    }
}

/// Size of one face record.
pub const FACE_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinHeader {
    pub unused_weights: ArrayDefinition,
    /// External-stream sub-offset of the four bone weights, or -1.
    pub bone_weights_offset: i32,
    /// External-stream sub-offset of the four bone indices, or -1.
    pub bone_indices_offset: i32,
    pub bonemap_offset: u32,
    pub bonemap_count: u32,
    pub qbones: ArrayDefinition,
    pub tbones: ArrayDefinition,
    pub reserved: ArrayDefinition,
    pub bone_indices: [u16; 16],
}

impl SkinHeader {
    pub const SIZE: usize = 100;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "skin header")?;
        let mut header = Self {
            unused_weights: ArrayDefinition::read(buffer)?,
            bone_weights_offset: buffer.decode_i32()?,
            bone_indices_offset: buffer.decode_i32()?,
            bonemap_offset: buffer.decode_u32()?,
            bonemap_count: buffer.decode_u32()?,
            qbones: ArrayDefinition::read(buffer)?,
            tbones: ArrayDefinition::read(buffer)?,
            reserved: ArrayDefinition::read(buffer)?,
            bone_indices: [0; 16],
        };
        for slot in header.bone_indices.iter_mut() {
            *slot = buffer.decode_u16()?;
        }
        buffer.skip(4)?;
        Ok(header)
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        self.unused_weights.write(buffer);
        buffer.encode_i32(self.bone_weights_offset);
        buffer.encode_i32(self.bone_indices_offset);
        buffer.encode_u32(self.bonemap_offset);
        buffer.encode_u32(self.bonemap_count);
        self.qbones.write(buffer);
        self.tbones.write(buffer);
        self.reserved.write(buffer);
        for &index in &self.bone_indices {
            buffer.encode_u16(index);
        }
        buffer.encode_u32(0);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DanglyHeader {
    pub constraints: ArrayDefinition,
    pub displacement: f32,
    pub tightness: f32,
    pub period: f32,
    pub vertices_offset: u32,
}

impl DanglyHeader {
    pub const SIZE: usize = 28;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "dangly header")?;
        Ok(Self {
            constraints: ArrayDefinition::read(buffer)?,
            displacement: buffer.decode_f32()?,
            tightness: buffer.decode_f32()?,
            period: buffer.decode_f32()?,
            vertices_offset: buffer.decode_u32()?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        self.constraints.write(buffer);
        buffer.encode_f32(self.displacement);
        buffer.encode_f32(self.tightness);
        buffer.encode_f32(self.period);
        buffer.encode_u32(self.vertices_offset);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkmeshHeader {
    /// Offset of the root AABB node, 0 for an empty tree.
    pub root_offset: u32,
}

impl WalkmeshHeader {
    pub const SIZE: usize = 4;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "walkmesh header")?;
        Ok(Self {
            root_offset: buffer.decode_u32()?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u32(self.root_offset);
    }
}

/// On-disk AABB tree node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AabbRecord {
    pub bounding_box: BoundingBox,
    pub left_offset: u32,
    pub right_offset: u32,
    pub face: i32,
    pub significant_plane: u32,
}

impl AabbRecord {
    pub const SIZE: usize = 40;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "aabb node")?;
        Ok(Self {
            bounding_box: BoundingBox::new(buffer.decode_vec3()?, buffer.decode_vec3()?),
            left_offset: buffer.decode_u32()?,
            right_offset: buffer.decode_u32()?,
            face: buffer.decode_i32()?,
            significant_plane: buffer.decode_u32()?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_vec3(self.bounding_box.min);
        buffer.encode_vec3(self.bounding_box.max);
        buffer.encode_u32(self.left_offset);
        buffer.encode_u32(self.right_offset);
        buffer.encode_i32(self.face);
        buffer.encode_u32(self.significant_plane);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightHeader {
    pub flare_radius: f32,
    pub flare_sizes: ArrayDefinition,
    pub flare_positions: ArrayDefinition,
    pub flare_color_shifts: ArrayDefinition,
    pub flare_textures: ArrayDefinition,
    pub priority: u32,
    pub ambient_only: bool,
    pub dynamic_type: u32,
    pub affect_dynamic: bool,
    pub shadow: bool,
    pub flare: bool,
    pub fading: bool,
}

impl LightHeader {
    pub const SIZE: usize = 92;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "light header")?;
        let flare_radius = buffer.decode_f32()?;
        ArrayDefinition::read(buffer)?;
        Ok(Self {
            flare_radius,
            flare_sizes: ArrayDefinition::read(buffer)?,
            flare_positions: ArrayDefinition::read(buffer)?,
            flare_color_shifts: ArrayDefinition::read(buffer)?,
            flare_textures: ArrayDefinition::read(buffer)?,
            priority: buffer.decode_u32()?,
            ambient_only: decode_bool_u32(buffer)?,
            dynamic_type: buffer.decode_u32()?,
            affect_dynamic: decode_bool_u32(buffer)?,
            shadow: decode_bool_u32(buffer)?,
            flare: decode_bool_u32(buffer)?,
            fading: decode_bool_u32(buffer)?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_f32(self.flare_radius);
        ArrayDefinition::default().write(buffer);
        self.flare_sizes.write(buffer);
        self.flare_positions.write(buffer);
        self.flare_color_shifts.write(buffer);
        self.flare_textures.write(buffer);
        buffer.encode_u32(self.priority);
        buffer.encode_u32(self.ambient_only as u32);
        buffer.encode_u32(self.dynamic_type);
        buffer.encode_u32(self.affect_dynamic as u32);
        buffer.encode_u32(self.shadow as u32);
        buffer.encode_u32(self.flare as u32);
        buffer.encode_u32(self.fading as u32);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmitterHeader {
    pub dead_space: f32,
    pub blast_radius: f32,
    pub blast_length: f32,
    pub branch_count: u32,
    pub control_point_smoothing: f32,
    pub x_grid: u32,
    pub y_grid: u32,
    pub spawn_type: u32,
    pub update: String,
    pub render: String,
    pub blend: String,
    pub texture: String,
    pub chunk_name: String,
    pub two_sided_texture: bool,
    pub looping: bool,
    pub render_order: u16,
    pub frame_blending: bool,
    pub depth_texture: String,
    pub flags: u32,
}

impl EmitterHeader {
    pub const SIZE: usize = 224;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "emitter header")?;
        let mut header = Self {
            dead_space: buffer.decode_f32()?,
            blast_radius: buffer.decode_f32()?,
            blast_length: buffer.decode_f32()?,
            branch_count: buffer.decode_u32()?,
            control_point_smoothing: buffer.decode_f32()?,
            x_grid: buffer.decode_u32()?,
            y_grid: buffer.decode_u32()?,
            spawn_type: buffer.decode_u32()?,
            update: buffer.decode_fixed_string(NAME_WIDTH)?,
            render: buffer.decode_fixed_string(NAME_WIDTH)?,
            blend: buffer.decode_fixed_string(NAME_WIDTH)?,
            texture: buffer.decode_fixed_string(NAME_WIDTH)?,
            chunk_name: buffer.decode_fixed_string(16)?,
            two_sided_texture: decode_bool_u32(buffer)?,
            looping: decode_bool_u32(buffer)?,
            render_order: buffer.decode_u16()?,
            frame_blending: decode_bool_u8(buffer)?,
            depth_texture: buffer.decode_fixed_string(NAME_WIDTH)?,
            flags: 0,
        };
        buffer.skip(1)?;
        header.flags = buffer.decode_u32()?;
        Ok(header)
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_f32(self.dead_space);
        buffer.encode_f32(self.blast_radius);
        buffer.encode_f32(self.blast_length);
        buffer.encode_u32(self.branch_count);
        buffer.encode_f32(self.control_point_smoothing);
        buffer.encode_u32(self.x_grid);
        buffer.encode_u32(self.y_grid);
        buffer.encode_u32(self.spawn_type);
        buffer.encode_fixed_string(&self.update, NAME_WIDTH);
        buffer.encode_fixed_string(&self.render, NAME_WIDTH);
        buffer.encode_fixed_string(&self.blend, NAME_WIDTH);
        buffer.encode_fixed_string(&self.texture, NAME_WIDTH);
        buffer.encode_fixed_string(&self.chunk_name, 16);
        buffer.encode_u32(self.two_sided_texture as u32);
        buffer.encode_u32(self.looping as u32);
        buffer.encode_u16(self.render_order);
        buffer.encode_u8(self.frame_blending as u8);
        buffer.encode_fixed_string(&self.depth_texture, NAME_WIDTH);
        buffer.encode_u8(0);
        buffer.encode_u32(self.flags);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceHeader {
    pub model: String,
    pub reattachable: bool,
}

impl ReferenceHeader {
    pub const SIZE: usize = 36;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "reference header")?;
        Ok(Self {
            model: buffer.decode_fixed_string(NAME_WIDTH)?,
            reattachable: decode_bool_u32(buffer)?,
        })
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_fixed_string(&self.model, NAME_WIDTH);
        buffer.encode_u32(self.reattachable as u32);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerHeader {
    pub controller_type: u32,
    pub row_count: u16,
    /// Float index of the first key time within the node's controller data.
    pub key_offset: u16,
    /// Float index of the first value row within the node's controller data.
    pub data_offset: u16,
    pub column_count: u8,
}

impl ControllerHeader {
    pub const SIZE: usize = 16;

    pub fn read(buffer: &mut DecoderBuffer<'_>) -> StatusResult<Self> {
        require(buffer, Self::SIZE, "controller header")?;
        let controller_type = buffer.decode_u32()?;
        buffer.skip(2)?;
        let header = Self {
            controller_type,
            row_count: buffer.decode_u16()?,
            key_offset: buffer.decode_u16()?,
            data_offset: buffer.decode_u16()?,
            column_count: buffer.decode_u8()?,
        };
        buffer.skip(3)?;
        Ok(header)
    }

    pub fn write(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u32(self.controller_type);
        buffer.encode_u16(u16::MAX);
        buffer.encode_u16(self.row_count);
        buffer.encode_u16(self.key_offset);
        buffer.encode_u16(self.data_offset);
        buffer.encode_u8(self.column_count);
        buffer.encode_zeros(3);
    }
}
