//! Node tree decoding.
//!
//! Trees are walked depth-first with an explicit stack of open nodes, so a
//! deep or hostile hierarchy costs heap rather than call stack.

use std::collections::HashSet;

use crate::controller::Controller;
use crate::controller_decoder::decode_controller;
use crate::decoder_buffer::DecoderBuffer;
use crate::diagnostics::{emit, Diagnostic, DiagnosticSink};
use crate::headers::{
    ControllerHeader, DanglyHeader, EmitterHeader, LightHeader, MeshHeader, NodeHeader,
    ReferenceHeader, SkinHeader, WalkmeshHeader, UNSET_OFFSET,
};
use crate::mesh_decoder::{self, Streams};
pub use crate::node::MAX_NODE_DEPTH;
use crate::node::{node_flags, Emitter, Node, Reference};
use crate::status::{malformed_header, MdlError, StatusResult};
use crate::version::Revision;

/// Payload headers that follow a node header, in on-disk order.
#[derive(Debug, Default)]
struct PayloadHeaders {
    mesh: Option<MeshHeader>,
    skin: Option<SkinHeader>,
    dangly: Option<DanglyHeader>,
    walkmesh: Option<WalkmeshHeader>,
    light: Option<LightHeader>,
    emitter: Option<EmitterHeader>,
    reference: Option<ReferenceHeader>,
}

/// A decoded node whose children are still being read.
struct OpenNode {
    node: Node,
    pending: std::vec::IntoIter<u32>,
    depth: usize,
}

pub struct NodeDecoder<'a, 's> {
    streams: Streams<'a>,
    revision: Revision,
    names: &'a [String],
    fast_load: bool,
    visited: HashSet<u32>,
    sink: &'s mut dyn DiagnosticSink,
}

impl<'a, 's> NodeDecoder<'a, 's> {
    pub fn new(
        streams: Streams<'a>,
        revision: Revision,
        names: &'a [String],
        fast_load: bool,
        sink: &'s mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            streams,
            revision,
            names,
            fast_load,
            visited: HashSet::new(),
            sink,
        }
    }

    /// Decodes the tree rooted at `offset`. Failure to read the root itself is
    /// fatal; problems below it are reported and skipped.
    pub fn decode_root(&mut self, offset: u32) -> StatusResult<Node> {
        let root = self
            .read_node(offset)
            .map_err(|err| malformed_header("root node", err))?;
        let mut stack = vec![root];

        while let Some(top) = stack.last_mut() {
            let Some(child_offset) = top.pending.next() else {
                let done = stack.pop().map(|open| open.node);
                match (stack.last_mut(), done) {
                    (Some(parent), Some(node)) => parent.node.children.push(node),
                    (None, Some(node)) => return Ok(node),
                    _ => break,
                }
                continue;
            };
            let depth = top.depth + 1;
            let parent = top.node.name.clone();

            let rejection = if child_offset == UNSET_OFFSET
                || child_offset as usize >= self.streams.mdl.len()
            {
                Some("offset out of range".to_string())
            } else if self.visited.contains(&child_offset) {
                Some("node already decoded".to_string())
            } else if depth >= MAX_NODE_DEPTH {
                Some(format!("nesting deeper than {}", MAX_NODE_DEPTH))
            } else {
                None
            };
            let result = match rejection {
                Some(reason) => Err(reason),
                None => self.read_node(child_offset).map_err(|err| err.to_string()),
            };
            match result {
                Ok(mut child) => {
                    child.depth = depth;
                    stack.push(child);
                }
                Err(reason) => emit(
                    self.sink,
                    Diagnostic::ChildSkipped {
                        node: parent,
                        child_offset,
                        reason,
                    },
                ),
            }
        }
        Err(MdlError::InvariantViolation(
            "node stack emptied before the root closed".to_string(),
        ))
    }

    /// Reads one node without its children; the child table is returned as
    /// pending offsets.
    fn read_node(&mut self, offset: u32) -> StatusResult<OpenNode> {
        self.visited.insert(offset);
        let mut cursor = self.streams.mdl.clone();
        cursor.set_position(offset as usize)?;
        let header = NodeHeader::read(&mut cursor)?;

        let name = match self.names.get(header.name_index as usize) {
            Some(name) => name.clone(),
            None => {
                emit(
                    self.sink,
                    Diagnostic::UnknownName {
                        node_id: header.node_id,
                        name_index: header.name_index,
                    },
                );
                format!("node_{}", header.node_id)
            }
        };
        log::trace!(
            "node '{}' (id {}) at {}, flags {:#06x}",
            name,
            header.node_id,
            offset,
            header.type_flags
        );

        let unsupported = header.type_flags & node_flags::UNSUPPORTED;
        if unsupported != 0 {
            emit(
                self.sink,
                Diagnostic::UnsupportedPayload {
                    node: name.clone(),
                    flags: unsupported,
                },
            );
        }

        let payloads = self.read_payload_headers(&mut cursor, header.type_flags)?;
        let mut node = Node::new(header.node_id, name);
        node.position = header.position;
        node.orientation = header.orientation;
        self.decode_payloads(&mut node, payloads)?;

        if !self.fast_load {
            node.controllers = self.decode_controllers(&node.name, &header);
        }
        let pending = self.child_offsets(&node.name, &header);
        Ok(OpenNode {
            node,
            pending: pending.into_iter(),
            depth: 0,
        })
    }

    fn read_payload_headers(
        &self,
        cursor: &mut DecoderBuffer<'_>,
        flags: u16,
    ) -> StatusResult<PayloadHeaders> {
        let has = |bit: u16| flags & bit != 0;
        let mut headers = PayloadHeaders::default();
        if has(node_flags::MESH) {
            headers.mesh = Some(MeshHeader::read(cursor, self.revision)?);
        }
        if has(node_flags::SKIN) {
            headers.skin = Some(SkinHeader::read(cursor)?);
        }
        if has(node_flags::DANGLY) {
            headers.dangly = Some(DanglyHeader::read(cursor)?);
        }
        if has(node_flags::WALKMESH) {
            headers.walkmesh = Some(WalkmeshHeader::read(cursor)?);
        }
        if has(node_flags::LIGHT) {
            headers.light = Some(LightHeader::read(cursor)?);
        }
        if has(node_flags::EMITTER) {
            headers.emitter = Some(EmitterHeader::read(cursor)?);
        }
        if has(node_flags::REFERENCE) {
            headers.reference = Some(ReferenceHeader::read(cursor)?);
        }
        Ok(headers)
    }

    fn decode_payloads(&mut self, node: &mut Node, headers: PayloadHeaders) -> StatusResult<()> {
        let mdl = self.streams.mdl;
        if let Some(mesh_header) = &headers.mesh {
            let mesh = mesh_decoder::decode_mesh(self.streams, mesh_header, &node.name, self.sink)?;
            let vertex_count = mesh.num_vertices();
            if let Some(skin_header) = &headers.skin {
                node.skin = Some(mesh_decoder::decode_skin(
                    self.streams,
                    mesh_header,
                    skin_header,
                    vertex_count,
                    &node.name,
                    self.sink,
                )?);
            }
            if let Some(dangly_header) = &headers.dangly {
                node.dangly = Some(mesh_decoder::decode_dangly(mdl, dangly_header)?);
            }
            if let Some(walkmesh_header) = &headers.walkmesh {
                node.walkmesh = Some(mesh_decoder::decode_walkmesh(
                    mdl,
                    walkmesh_header.root_offset,
                    &node.name,
                ));
            }
            node.mesh = Some(mesh);
        } else {
            let orphaned = [
                (headers.skin.is_some(), node_flags::SKIN),
                (headers.dangly.is_some(), node_flags::DANGLY),
                (headers.walkmesh.is_some(), node_flags::WALKMESH),
            ]
            .iter()
            .filter(|(present, _)| *present)
            .fold(0u16, |acc, (_, bit)| acc | *bit);
            if orphaned != 0 {
                emit(
                    self.sink,
                    Diagnostic::UnsupportedPayload {
                        node: node.name.clone(),
                        flags: orphaned,
                    },
                );
            }
        }

        if let Some(light_header) = &headers.light {
            node.light = Some(mesh_decoder::decode_light(mdl, light_header)?);
        }
        if let Some(h) = headers.emitter {
            node.emitter = Some(Emitter {
                dead_space: h.dead_space,
                blast_radius: h.blast_radius,
                blast_length: h.blast_length,
                branch_count: h.branch_count,
                control_point_smoothing: h.control_point_smoothing,
                x_grid: h.x_grid,
                y_grid: h.y_grid,
                spawn_type: h.spawn_type,
                update: h.update,
                render: h.render,
                blend: h.blend,
                texture: h.texture,
                chunk_name: h.chunk_name,
                two_sided_texture: h.two_sided_texture,
                looping: h.looping,
                render_order: h.render_order,
                frame_blending: h.frame_blending,
                depth_texture: h.depth_texture,
                flags: h.flags,
            });
        }
        if let Some(h) = headers.reference {
            node.reference = Some(Reference {
                model: h.model,
                reattachable: h.reattachable,
            });
        }
        Ok(())
    }

    /// Reads the child-offset table. A table that cannot be used yields no
    /// children.
    fn child_offsets(&mut self, name: &str, header: &NodeHeader) -> Vec<u32> {
        let table = header.children;
        if table.count == 0 {
            return Vec::new();
        }
        match self.read_child_table(table.offset, table.count) {
            Ok(offsets) => offsets,
            Err(reason) => {
                emit(
                    self.sink,
                    Diagnostic::ChildTableDiscarded {
                        node: name.to_string(),
                        reason,
                    },
                );
                Vec::new()
            }
        }
    }

    fn read_child_table(&self, offset: u32, count: u32) -> Result<Vec<u32>, String> {
        if offset == UNSET_OFFSET {
            return Err("offset unset".to_string());
        }
        let len = self.streams.mdl.len();
        let end = (count as usize)
            .checked_mul(4)
            .and_then(|bytes| bytes.checked_add(offset as usize));
        match end {
            Some(end) if end <= len => {}
            _ => {
                return Err(format!(
                    "{} entries at offset {} exceed {} bytes",
                    count, offset, len
                ))
            }
        }
        (0..count as usize)
            .map(|i| {
                self.streams
                    .mdl
                    .u32_at(offset as usize + i * 4)
                    .ok_or_else(|| format!("entry {} unreadable", i))
            })
            .collect()
    }

    fn decode_controllers(&mut self, name: &str, header: &NodeHeader) -> Vec<Controller> {
        let table = header.controllers;
        if table.count == 0 {
            return Vec::new();
        }
        let in_range = table
            .byte_len(ControllerHeader::SIZE)
            .map_or(false, |len| self.streams.mdl.contains(table.offset as usize, len));
        if !in_range {
            emit(
                self.sink,
                Diagnostic::ControllerTableDiscarded {
                    node: name.to_string(),
                    reason: format!(
                        "{} headers at offset {} run past the stream",
                        table.count, table.offset
                    ),
                },
            );
            return Vec::new();
        }

        let data_block = header.controller_data.offset as usize;
        let mut controllers = Vec::with_capacity(table.count as usize);
        for i in 0..table.count as usize {
            let header_offset = table.offset as usize + i * ControllerHeader::SIZE;
            match decode_controller(self.streams.mdl, header_offset, data_block) {
                Ok(decoded) => {
                    if decoded.is_truncated() {
                        emit(
                            self.sink,
                            Diagnostic::ControllerTruncated {
                                node: name.to_string(),
                                controller_type: decoded.controller.controller_type,
                                declared_rows: decoded.declared_rows,
                                decoded_rows: decoded.controller.rows.len(),
                            },
                        );
                    }
                    controllers.push(decoded.controller);
                }
                Err(err) => {
                    emit(
                        self.sink,
                        Diagnostic::ControllerTableDiscarded {
                            node: name.to_string(),
                            reason: err.to_string(),
                        },
                    );
                    return Vec::new();
                }
            }
        }
        controllers
    }
}

/// Decodes the node tree rooted at `offset` in the model stream.
pub fn decode_node(
    streams: Streams<'_>,
    offset: u32,
    revision: Revision,
    names: &[String],
    fast_load: bool,
    sink: &mut dyn DiagnosticSink,
) -> StatusResult<Node> {
    NodeDecoder::new(streams, revision, names, fast_load, sink).decode_root(offset)
}
