//! MDL/MDX Core Library
//!
//! Decoding and encoding of the two-stream binary model format: a model
//! stream holding the node hierarchy, headers, name and animation tables,
//! and an external stream holding per-vertex render attributes.
//!
//! ```
//! use mdlx_core::{Face, Mesh, Model, ModelDecoder, ModelEncoder, Node};
//!
//! let mut body = Node::new(1, "body");
//! let mut mesh = Mesh::new();
//! mesh.vertices = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
//! mesh.faces.push(Face::new([0, 1, 2]));
//! body.mesh = Some(mesh);
//! let mut root = Node::new(0, "root");
//! root.children.push(body);
//! let model = Model::new("c_box", root);
//!
//! let encoded = ModelEncoder::new().encode(&model).unwrap();
//! let decoded = ModelDecoder::new().decode(&encoded.mdl, Some(encoded.mdx.as_slice())).unwrap();
//! assert_eq!(decoded, model);
//! ```

#![allow(clippy::needless_range_loop)]

// =============================================================================
// Core modules - always available
// =============================================================================

pub mod controller;
pub mod mesh;
pub mod model;
pub mod node;
pub mod quaternion_compression;
pub mod status;
pub mod version;

// Header structs read and write symmetrically, so both cursors are core.
pub mod decoder_buffer;
pub mod encoder_buffer;
pub mod headers;

// =============================================================================
// Decoder-only modules
// =============================================================================

#[cfg(feature = "decoder")]
pub mod controller_decoder;
#[cfg(feature = "decoder")]
pub mod decoder_options;
#[cfg(feature = "decoder")]
pub mod diagnostics;
#[cfg(feature = "decoder")]
pub mod mesh_decoder;
#[cfg(feature = "decoder")]
pub mod model_decoder;
#[cfg(feature = "decoder")]
pub mod node_decoder;
#[cfg(feature = "decoder")]
pub mod vertex_recovery;

// =============================================================================
// Encoder-only modules
// =============================================================================

#[cfg(feature = "encoder")]
pub mod controller_encoder;
#[cfg(feature = "encoder")]
pub mod encoder_options;
#[cfg(feature = "encoder")]
pub mod model_encoder;
#[cfg(feature = "encoder")]
pub mod node_encoder;
#[cfg(feature = "encoder")]
pub mod offset_planner;

// =============================================================================
// Core re-exports - always available
// =============================================================================

pub use controller::{Controller, ControllerRow};
pub use decoder_buffer::DecoderBuffer;
pub use encoder_buffer::EncoderBuffer;
pub use mesh::{Face, Mesh, Skin, VertexWeight};
pub use model::{Animation, BoundingBox, Event, Model};
pub use node::{AabbNode, Dangly, Emitter, LensFlare, Light, Node, Reference, Walkmesh};
pub use quaternion_compression::{compress_quaternion, decompress_quaternion};
pub use status::{MdlError, Status, StatusResult};
pub use version::Revision;

// =============================================================================
// Decoder re-exports
// =============================================================================

#[cfg(feature = "decoder")]
pub use decoder_options::DecoderOptions;
#[cfg(feature = "decoder")]
pub use diagnostics::{Diagnostic, DiagnosticSink};
#[cfg(feature = "decoder")]
pub use model_decoder::{detect_revision, ModelDecoder};
#[cfg(feature = "decoder")]
pub use vertex_recovery::RecoveryStrategy;

// =============================================================================
// Encoder re-exports
// =============================================================================

#[cfg(feature = "encoder")]
pub use encoder_options::EncoderOptions;
#[cfg(feature = "encoder")]
pub use model_encoder::{EncodedModel, ModelEncoder};
#[cfg(feature = "encoder")]
pub use offset_planner::plan_model;
