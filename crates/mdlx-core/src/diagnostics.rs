//! Recoverable decode conditions.
//!
//! The format is routinely produced by lossy third-party tools, so the decoder
//! corrects many problems in place. Each correction is described by a
//! [`Diagnostic`], logged through the `log` facade at warn level and handed to
//! the caller's [`DiagnosticSink`].

use std::fmt;

use crate::vertex_recovery::RecoveryStrategy;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A node's child-offset table could not be used; the node decodes with no children.
    ChildTableDiscarded { node: String, reason: String },
    /// One child offset was rejected or the child failed to decode.
    ChildSkipped {
        node: String,
        child_offset: u32,
        reason: String,
    },
    VertexCountCorrected {
        node: String,
        declared: usize,
        adopted: usize,
        strategy: RecoveryStrategy,
    },
    VertexTableRelocated {
        node: String,
        declared_offset: usize,
        adopted_offset: usize,
    },
    /// Vertices that could not be read and were replaced with the zero vector.
    VerticesZeroFilled { node: String, count: usize },
    /// Per-vertex attribute reads from the external stream that fell back to zero.
    AttributesDefaulted { node: String, count: usize },
    ControllerTruncated {
        node: String,
        controller_type: u32,
        declared_rows: usize,
        decoded_rows: usize,
    },
    ControllerTableDiscarded { node: String, reason: String },
    UnsupportedPayload { node: String, flags: u16 },
    AnimationSkipped { offset: u32, reason: String },
    UnknownName { node_id: u16, name_index: u16 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ChildTableDiscarded { node, reason } => {
                write!(f, "node '{}': child table discarded ({})", node, reason)
            }
            Diagnostic::ChildSkipped {
                node,
                child_offset,
                reason,
            } => write!(
                f,
                "node '{}': child at offset {} skipped ({})",
                node, child_offset, reason
            ),
            Diagnostic::VertexCountCorrected {
                node,
                declared,
                adopted,
                strategy,
            } => write!(
                f,
                "node '{}': vertex count {} corrected to {} ({:?})",
                node, declared, adopted, strategy
            ),
            Diagnostic::VertexTableRelocated {
                node,
                declared_offset,
                adopted_offset,
            } => write!(
                f,
                "node '{}': vertex table moved from offset {} to {}",
                node, declared_offset, adopted_offset
            ),
            Diagnostic::VerticesZeroFilled { node, count } => {
                write!(f, "node '{}': {} unreadable vertices zero-filled", node, count)
            }
            Diagnostic::AttributesDefaulted { node, count } => write!(
                f,
                "node '{}': {} external attribute reads defaulted to zero",
                node, count
            ),
            Diagnostic::ControllerTruncated {
                node,
                controller_type,
                declared_rows,
                decoded_rows,
            } => write!(
                f,
                "node '{}': controller {} truncated from {} to {} rows",
                node, controller_type, declared_rows, decoded_rows
            ),
            Diagnostic::ControllerTableDiscarded { node, reason } => {
                write!(f, "node '{}': controllers discarded ({})", node, reason)
            }
            Diagnostic::UnsupportedPayload { node, flags } => write!(
                f,
                "node '{}': unsupported payload flags {:#06x} ignored",
                node, flags
            ),
            Diagnostic::AnimationSkipped { offset, reason } => {
                write!(f, "animation at offset {} skipped ({})", offset, reason)
            }
            Diagnostic::UnknownName {
                node_id,
                name_index,
            } => write!(
                f,
                "node {}: name index {} is outside the name table",
                node_id, name_index
            ),
        }
    }
}

/// Receives recoverable-condition reports from the decoder.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Discards every report.
impl DiagnosticSink for () {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Collects every report in order.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Logs `diagnostic` and forwards it to `sink`.
pub(crate) fn emit(sink: &mut dyn DiagnosticSink, diagnostic: Diagnostic) {
    log::warn!("{}", diagnostic);
    sink.report(diagnostic);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        emit(
            &mut sink,
            Diagnostic::VerticesZeroFilled {
                node: "a".into(),
                count: 2,
            },
        );
        emit(
            &mut sink,
            Diagnostic::UnsupportedPayload {
                node: "b".into(),
                flags: 0x800,
            },
        );
        assert_eq!(sink.len(), 2);
        assert!(matches!(sink[0], Diagnostic::VerticesZeroFilled { count: 2, .. }));
    }

    #[test]
    fn test_unit_sink_is_a_no_op() {
        let mut sink = ();
        emit(
            &mut sink,
            Diagnostic::AnimationSkipped {
                offset: 4,
                reason: "x".into(),
            },
        );
    }

    #[test]
    fn test_display_mentions_node() {
        let d = Diagnostic::ChildTableDiscarded {
            node: "torso".into(),
            reason: "offset out of range".into(),
        };
        assert_eq!(
            d.to_string(),
            "node 'torso': child table discarded (offset out of range)"
        );
    }
}
