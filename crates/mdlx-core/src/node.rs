//! Scene-graph nodes and their optional payloads.
//!
//! Payload presence is expressed with `Option` fields only. The on-disk type
//! bitmask is derived from them by [`Node::type_flags`] at encode time and is
//! never stored alongside the payloads.

use crate::controller::Controller;
use crate::mesh::{Mesh, Skin};
use crate::model::BoundingBox;

/// Node type bits as stored in the node header.
pub mod node_flags {
    pub const HEADER: u16 = 0x0001;
    pub const LIGHT: u16 = 0x0002;
    pub const EMITTER: u16 = 0x0004;
    pub const CAMERA: u16 = 0x0008;
    pub const REFERENCE: u16 = 0x0010;
    pub const MESH: u16 = 0x0020;
    pub const SKIN: u16 = 0x0040;
    pub const ANIM_MESH: u16 = 0x0080;
    pub const DANGLY: u16 = 0x0100;
    pub const WALKMESH: u16 = 0x0200;
    pub const SABER: u16 = 0x0800;

    /// Bits whose payloads are recognized but not decoded.
    pub const UNSUPPORTED: u16 = CAMERA | ANIM_MESH | SABER;
}

/// Deepest nesting a tree may have; the root is at depth 0.
pub const MAX_NODE_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node number; animation nodes reuse the number of the geometry node they drive.
    pub id: u16,
    pub name: String,
    pub position: [f32; 3],
    /// Local rotation as [x, y, z, w].
    pub orientation: [f32; 4],
    pub children: Vec<Node>,
    pub controllers: Vec<Controller>,
    pub mesh: Option<Mesh>,
    pub skin: Option<Skin>,
    pub dangly: Option<Dangly>,
    pub walkmesh: Option<Walkmesh>,
    pub light: Option<Light>,
    pub emitter: Option<Emitter>,
    pub reference: Option<Reference>,
}

impl Node {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            children: Vec::new(),
            controllers: Vec::new(),
            mesh: None,
            skin: None,
            dangly: None,
            walkmesh: None,
            light: None,
            emitter: None,
            reference: None,
        }
    }

    /// The header type bitmask implied by which payloads are present.
    pub fn type_flags(&self) -> u16 {
        let mut flags = node_flags::HEADER;
        if self.mesh.is_some() {
            flags |= node_flags::MESH;
        }
        if self.skin.is_some() {
            flags |= node_flags::SKIN;
        }
        if self.dangly.is_some() {
            flags |= node_flags::DANGLY;
        }
        if self.walkmesh.is_some() {
            flags |= node_flags::WALKMESH;
        }
        if self.light.is_some() {
            flags |= node_flags::LIGHT;
        }
        if self.emitter.is_some() {
            flags |= node_flags::EMITTER;
        }
        if self.reference.is_some() {
            flags |= node_flags::REFERENCE;
        }
        flags
    }

    /// This node followed by all of its descendants, depth-first, children in order.
    pub fn preorder(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// All descendants in pre-order, excluding this node.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut nodes = self.preorder();
        nodes.remove(0);
        nodes
    }

    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    /// Depth of the deepest descendant; 0 for a leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|c| (c, depth + 1)));
        }
        deepest
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.preorder().into_iter().find(|n| n.name == name)
    }
}

/// A lens flare attached to a light.
#[derive(Debug, Clone, PartialEq)]
pub struct LensFlare {
    pub texture: String,
    pub size: f32,
    pub position: f32,
    pub color_shift: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Light {
    pub flare_radius: f32,
    pub priority: u32,
    pub ambient_only: bool,
    pub dynamic_type: u32,
    pub affect_dynamic: bool,
    pub shadow: bool,
    pub flare: bool,
    pub fading: bool,
    pub flares: Vec<LensFlare>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Emitter {
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

/// Attaches another model at this node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    pub model: String,
    pub reattachable: bool,
}

/// Cloth-like vertex animation data for a mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dangly {
    pub displacement: f32,
    pub tightness: f32,
    pub period: f32,
    /// One constraint weight per mesh vertex.
    pub constraints: Vec<f32>,
    /// Rest positions, one per mesh vertex.
    pub vertices: Vec<[f32; 3]>,
}

/// One node of a walkmesh AABB tree. Leaves reference a face, branches do not.
#[derive(Debug, Clone, PartialEq)]
pub struct AabbNode {
    pub bounding_box: BoundingBox,
    /// Face index for leaves, -1 for branches.
    pub face: i32,
    pub significant_plane: u32,
    /// Index of the left child within [`Walkmesh::aabbs`].
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// Marks a mesh as walkable geometry and carries its AABB tree.
///
/// The tree is flattened in pre-order; entry 0 is the root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Walkmesh {
    pub aabbs: Vec<AabbNode>,
}
