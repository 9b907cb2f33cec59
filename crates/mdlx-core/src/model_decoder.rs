//! Top-level decoding of a model stream and its optional external stream.

use crate::decoder_buffer::DecoderBuffer;
use crate::decoder_options::DecoderOptions;
use crate::diagnostics::{emit, Diagnostic, DiagnosticSink};
use crate::headers::{AnimationHeader, ArrayDefinition, FileHeader, ModelHeader, EVENT_SIZE, NAME_WIDTH, NO_SUPERMODEL};
use crate::mesh_decoder::Streams;
use crate::model::{Animation, Event, Model};
use crate::node_decoder::NodeDecoder;
use crate::status::{malformed_header, MdlError, StatusResult};
use crate::version::Revision;

/// Reads the revision from the geometry header without decoding anything else.
pub fn detect_revision(mdl: &[u8]) -> StatusResult<Revision> {
    let mut buffer = DecoderBuffer::new(mdl);
    FileHeader::read(&mut buffer)?;
    let header = ModelHeader::read(&mut buffer)?;
    Ok(header.geometry.revision())
}

#[derive(Debug, Clone, Default)]
pub struct ModelDecoder {
    options: DecoderOptions,
}

impl ModelDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decodes a model. Recoverable problems are only logged.
    pub fn decode(&self, mdl: &[u8], mdx: Option<&[u8]>) -> StatusResult<Model> {
        self.decode_with_diagnostics(mdl, mdx, &mut ())
    }

    /// Decodes a model, reporting every recoverable problem to `sink`.
    ///
    /// Without an external stream, normals, UVs and skin weights are not
    /// decoded and positions are always read from the model stream.
    pub fn decode_with_diagnostics(
        &self,
        mdl: &[u8],
        mdx: Option<&[u8]>,
        sink: &mut dyn DiagnosticSink,
    ) -> StatusResult<Model> {
        let mut outer = DecoderBuffer::new(mdl);
        let file_header = FileHeader::read(&mut outer)?;
        let body = DecoderBuffer::new(&mdl[FileHeader::SIZE..]);
        let external = mdx.map(DecoderBuffer::new);
        let streams = Streams {
            mdl: &body,
            mdx: external.as_ref(),
        };

        let mut cursor = body.clone();
        let header = ModelHeader::read(&mut cursor)?;
        let sentinels = header.geometry.sentinels;
        if !Revision::is_known_sentinel_pair(sentinels) {
            log::debug!(
                "unknown sentinel pair ({}, {}), assuming revision B",
                sentinels.0,
                sentinels.1
            );
        }
        let revision = header.geometry.revision();
        log::debug!(
            "decoding '{}': revision {:?}, {} model bytes, {} external bytes",
            header.geometry.name,
            revision,
            file_header.model_data_size,
            mdx.map_or(0, <[u8]>::len)
        );

        let names = read_names(&body, header.names)?;
        let root = NodeDecoder::new(streams, revision, &names, self.options.get_fast_load(), sink)
            .decode_root(header.geometry.root_node_offset)?;

        let animations = if self.options.get_fast_load() {
            Vec::new()
        } else {
            decode_animations(streams, revision, &names, header.animations, sink)
        };

        let supermodel = Some(header.supermodel_name)
            .filter(|name| !name.eq_ignore_ascii_case(NO_SUPERMODEL));
        Ok(Model {
            name: header.geometry.name,
            supermodel,
            classification: header.classification,
            subclassification: header.subclassification,
            affected_by_fog: header.affected_by_fog,
            animation_scale: header.animation_scale,
            bounding_box: header.bounding_box,
            radius: header.radius,
            root,
            animations,
        })
    }
}

/// Reads the name table: an array of offsets to NUL-terminated strings.
fn read_names(body: &DecoderBuffer<'_>, table: ArrayDefinition) -> StatusResult<Vec<String>> {
    let in_range = table
        .byte_len(4)
        .map_or(false, |len| body.contains(table.offset as usize, len));
    if !in_range {
        return Err(MdlError::MalformedHeader(format!(
            "name table of {} entries at offset {} runs past the stream",
            table.count, table.offset
        )));
    }
    (0..table.count as usize)
        .map(|i| {
            let mut cursor = body.clone();
            let entry = table.offset as usize + i * 4;
            let offset = body.u32_at(entry).unwrap_or(u32::MAX);
            cursor
                .set_position(offset as usize)
                .and_then(|_| cursor.decode_string())
                .map_err(|err| malformed_header("name table", err))
        })
        .collect()
}

fn decode_animations(
    streams: Streams<'_>,
    revision: Revision,
    names: &[String],
    table: ArrayDefinition,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Animation> {
    let mut animations = Vec::with_capacity(table.count.min(1024) as usize);
    for i in 0..table.count as usize {
        let entry = (table.offset as usize).saturating_add(i * 4);
        let Some(offset) = streams.mdl.u32_at(entry) else {
            emit(
                sink,
                Diagnostic::AnimationSkipped {
                    offset: table.offset,
                    reason: format!("animation table entry {} unreadable", i),
                },
            );
            break;
        };
        match decode_animation(streams, revision, names, offset, sink) {
            Ok(animation) => animations.push(animation),
            Err(err) => emit(
                sink,
                Diagnostic::AnimationSkipped {
                    offset,
                    reason: err.to_string(),
                },
            ),
        }
    }
    animations
}

fn decode_animation(
    streams: Streams<'_>,
    revision: Revision,
    names: &[String],
    offset: u32,
    sink: &mut dyn DiagnosticSink,
) -> StatusResult<Animation> {
    let mut cursor = streams.mdl.clone();
    cursor.set_position(offset as usize)?;
    let header = AnimationHeader::read(&mut cursor)?;

    let events_len = header.events.byte_len(EVENT_SIZE).unwrap_or(usize::MAX);
    if !streams.mdl.contains(header.events.offset as usize, events_len) {
        return Err(MdlError::BufferError(format!(
            "{} events at offset {} run past the stream",
            header.events.count, header.events.offset
        )));
    }
    cursor.set_position(header.events.offset as usize)?;
    let events = (0..header.events.count)
        .map(|_| {
            Ok(Event {
                time: cursor.decode_f32()?,
                name: cursor.decode_fixed_string(NAME_WIDTH)?,
            })
        })
        .collect::<StatusResult<Vec<Event>>>()?;

    let root = NodeDecoder::new(streams, revision, names, false, sink)
        .decode_root(header.geometry.root_node_offset)?;
    log::debug!("animation '{}': {} nodes", header.geometry.name, root.node_count());

    Ok(Animation {
        name: header.geometry.name,
        source_model: header.source_model,
        length: header.length,
        transition: header.transition,
        events,
        root,
    })
}
