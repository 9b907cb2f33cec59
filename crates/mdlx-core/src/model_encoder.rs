//! Top-level encoding of a model into a model stream and an external stream.

use crate::encoder_buffer::EncoderBuffer;
use crate::encoder_options::EncoderOptions;
use crate::headers::{
    model_type, AnimationHeader, ArrayDefinition, FileHeader, GeometryHeader, ModelHeader,
    NAME_WIDTH, NO_SUPERMODEL,
};
use crate::model::Model;
use crate::node_encoder::{check_fixed_width, encode_tree};
use crate::offset_planner::{plan_model, ModelLayout, NAME_TABLE_OFFSET};
use crate::status::{MdlError, Status, StatusResult};

/// The two streams produced by one encode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedModel {
    /// Model stream including the file header.
    pub mdl: Vec<u8>,
    /// External stream with per-vertex attributes. Empty when no mesh has any.
    pub mdx: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelEncoder {
    options: EncoderOptions,
}

impl ModelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EncoderOptions) {
        self.options = options;
    }

    /// Plans the layout of `model`, then writes both streams in one pass.
    ///
    /// Any inconsistency in the tree or between the plan and the writer is
    /// fatal; nothing is repaired on the way out.
    pub fn encode(&self, model: &Model) -> StatusResult<EncodedModel> {
        check_model_strings(model)?;
        let layout = plan_model(model, &self.options)?;

        let mut body = EncoderBuffer::with_capacity(layout.model_size);
        let mut external = EncoderBuffer::with_capacity(layout.external_size);
        write_model_header(&mut body, model, &layout);
        write_names(&mut body, &layout)?;
        write_animations(&mut body, &mut external, model, &layout)?;

        encode_tree(
            &mut body,
            &mut external,
            &model.root,
            &layout.tree,
            layout.revision,
            0,
        )?;
        body.expect_position(layout.model_size, "end of model stream")?;
        external.expect_position(layout.external_size, "end of external stream")?;

        let mut mdl = EncoderBuffer::with_capacity(FileHeader::SIZE + body.size());
        FileHeader {
            model_data_size: body.size() as u32,
            external_size: external.size() as u32,
        }
        .write(&mut mdl);
        mdl.encode(body.data());

        log::debug!(
            "encoded '{}' as revision {:?}: {} model bytes, {} external bytes",
            model.name,
            layout.revision,
            mdl.size(),
            external.size()
        );
        Ok(EncodedModel {
            mdl: mdl.into_data(),
            mdx: external.into_data(),
        })
    }
}

fn check_model_strings(model: &Model) -> Status {
    check_fixed_width(&model.name, "model name", &model.name, NAME_WIDTH)?;
    if let Some(supermodel) = &model.supermodel {
        check_fixed_width(&model.name, "supermodel", supermodel, NAME_WIDTH)?;
    }
    for animation in &model.animations {
        check_fixed_width(&model.name, "animation name", &animation.name, NAME_WIDTH)?;
        check_fixed_width(&animation.name, "source model", &animation.source_model, NAME_WIDTH)?;
        for event in &animation.events {
            check_fixed_width(&animation.name, "event name", &event.name, NAME_WIDTH)?;
        }
    }
    Ok(())
}

fn write_model_header(body: &mut EncoderBuffer, model: &Model, layout: &ModelLayout) {
    let root_offset = layout.tree.root_offset() as u32;
    ModelHeader {
        geometry: GeometryHeader {
            sentinels: layout.revision.model_sentinels(),
            name: model.name.clone(),
            root_node_offset: root_offset,
            node_count: model.node_count() as u32,
            reference_count: 0,
            model_type: model_type::GEOMETRY,
        },
        classification: model.classification,
        subclassification: model.subclassification,
        affected_by_fog: model.affected_by_fog,
        child_model_count: 0,
        animations: ArrayDefinition::new(layout.animation_table_offset, layout.animations.len()),
        supermodel_reference: 0,
        bounding_box: model.bounding_box,
        radius: model.radius,
        animation_scale: model.animation_scale,
        supermodel_name: model
            .supermodel
            .clone()
            .unwrap_or_else(|| NO_SUPERMODEL.to_string()),
        head_root_offset: root_offset,
        external_size: layout.external_size as u32,
        external_offset: 0,
        names: ArrayDefinition::new(NAME_TABLE_OFFSET, layout.names.len()),
    }
    .write(body);
}

fn write_names(body: &mut EncoderBuffer, layout: &ModelLayout) -> Status {
    body.expect_position(NAME_TABLE_OFFSET, "name table")?;
    layout
        .name_string_offsets
        .iter()
        .for_each(|&offset| body.encode_u32(offset as u32));
    for (name, &offset) in layout.names.iter().zip(&layout.name_string_offsets) {
        body.expect_position(offset, "name string")?;
        body.encode_string(name);
    }
    body.pad_to_alignment(4);
    body.expect_position(layout.animation_table_offset, "animation table")
}

fn write_animations(
    body: &mut EncoderBuffer,
    external: &mut EncoderBuffer,
    model: &Model,
    layout: &ModelLayout,
) -> Status {
    if model.animations.len() != layout.animations.len() {
        return Err(MdlError::InvariantViolation(format!(
            "{} animations but {} were planned",
            model.animations.len(),
            layout.animations.len()
        )));
    }
    layout
        .animations
        .iter()
        .for_each(|a| body.encode_u32(a.offset as u32));

    for (animation, planned) in model.animations.iter().zip(&layout.animations) {
        body.expect_position(planned.offset, &format!("animation '{}'", animation.name))?;
        AnimationHeader {
            geometry: GeometryHeader {
                sentinels: layout.revision.animation_sentinels(),
                name: animation.name.clone(),
                root_node_offset: planned.tree.root_offset() as u32,
                node_count: animation.root.node_count() as u32,
                reference_count: 0,
                model_type: model_type::ANIMATION,
            },
            length: animation.length,
            transition: animation.transition,
            source_model: animation.source_model.clone(),
            events: ArrayDefinition::new(planned.events_offset, animation.events.len()),
        }
        .write(body);

        body.expect_position(planned.events_offset, &format!("animation '{}' events", animation.name))?;
        for event in &animation.events {
            body.encode_f32(event.time);
            body.encode_fixed_string(&event.name, NAME_WIDTH);
        }
        encode_tree(
            body,
            external,
            &animation.root,
            &planned.tree,
            layout.revision,
            planned.offset,
        )?;
    }
    Ok(())
}
