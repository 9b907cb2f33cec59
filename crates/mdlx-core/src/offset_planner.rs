//! Encode-time layout planning.
//!
//! [`plan_model`] computes every offset the writer needs without touching a
//! buffer. Each node tree is flattened into a pre-order arena where a node's
//! id is its index. Pass one sizes every node block from the node alone;
//! pass two assigns absolute offsets from the size array, so no offset is
//! ever patched after writing.
//!
//! All model-stream offsets are relative to the first byte after the file
//! header.

use std::collections::{HashMap, HashSet};

use crate::controller_encoder::{pack_controllers, PackedControllers};
use crate::encoder_options::EncoderOptions;
use crate::headers::{
    AabbRecord, AnimationHeader, DanglyHeader, EmitterHeader, GeometryHeader, LightHeader,
    ModelHeader, NodeHeader, ReferenceHeader, SkinHeader, WalkmeshHeader, EVENT_SIZE, FACE_SIZE,
};
use crate::model::Model;
use crate::node::{Node, MAX_NODE_DEPTH};
use crate::status::{MdlError, Status, StatusResult};
use crate::version::Revision;

/// Offset of the name-offset table: right after the geometry and model headers.
pub const NAME_TABLE_OFFSET: usize = GeometryHeader::SIZE + ModelHeader::SIZE;

fn align4(value: usize) -> usize {
    (value + 3) & !3
}

/// Unique node names, model tree first in pre-order, then names that only
/// appear in animation trees. A node's name index is its first occurrence.
pub fn build_name_table(model: &Model) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let trees = std::iter::once(&model.root).chain(model.animations.iter().map(|a| &a.root));
    for node in trees.flat_map(Node::preorder) {
        if seen.insert(node.name.as_str()) {
            names.push(node.name.clone());
        }
    }
    names
}

/// Per-vertex block of one mesh in the external stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalLayout {
    /// Absolute offset of vertex 0 in the external stream.
    pub offset: usize,
    pub stride: usize,
    pub normal: Option<usize>,
    pub uv1: Option<usize>,
    pub uv2: Option<usize>,
    pub bone_indices: Option<usize>,
    pub bone_weights: Option<usize>,
    pub vertex_count: usize,
}

impl ExternalLayout {
    fn for_node(node: &Node) -> Option<Self> {
        let mesh = node.mesh.as_ref()?;
        let mut layout = Self {
            vertex_count: mesh.num_vertices(),
            ..Self::default()
        };
        let mut claim = |present: bool, size: usize| -> Option<usize> {
            present.then(|| {
                let at = layout.stride;
                layout.stride += size;
                at
            })
        };
        let normal = claim(mesh.normals.is_some(), 12);
        let uv1 = claim(mesh.uv1.is_some(), 8);
        let uv2 = claim(mesh.uv2.is_some(), 8);
        let bone_indices = claim(node.skin.is_some(), 16);
        let bone_weights = claim(node.skin.is_some(), 16);
        layout.normal = normal;
        layout.uv1 = uv1;
        layout.uv2 = uv2;
        layout.bone_indices = bone_indices;
        layout.bone_weights = bone_weights;
        Some(layout)
    }

    /// Block size including the trailing padding vertex.
    pub fn size(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            (self.vertex_count + 1) * self.stride
        }
    }
}

/// Offsets of every section of a node block, relative to the node header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockLayout {
    pub mesh_header: usize,
    pub skin_header: usize,
    pub dangly_header: usize,
    pub walkmesh_header: usize,
    pub light_header: usize,
    pub emitter_header: usize,
    pub reference_header: usize,
    pub faces: usize,
    pub index_counts: usize,
    pub index_offsets: usize,
    pub inverted_counter: usize,
    pub vertices: usize,
    pub bonemap: usize,
    pub qbones: usize,
    pub tbones: usize,
    pub vertex_indices: usize,
    pub dangly_constraints: usize,
    pub dangly_vertices: usize,
    pub aabbs: usize,
    pub flare_sizes: usize,
    pub flare_positions: usize,
    pub flare_color_shifts: usize,
    pub flare_texture_offsets: usize,
    /// One entry per flare texture name.
    pub flare_strings: Vec<usize>,
    pub children: usize,
    pub controllers: usize,
    pub controller_data: usize,
    pub size: usize,
}

/// Sizes a node block and places its sections. Pass one of the planner.
pub fn layout_block(
    node: &Node,
    revision: Revision,
    packed: &PackedControllers,
) -> BlockLayout {
    let mut block = BlockLayout::default();
    let mut cursor = NodeHeader::SIZE;
    let mut take = |size: usize| {
        let at = cursor;
        cursor += size;
        at
    };

    block.mesh_header = take(node.mesh.as_ref().map_or(0, |_| revision.mesh_header_size()));
    block.skin_header = take(node.skin.as_ref().map_or(0, |_| SkinHeader::SIZE));
    block.dangly_header = take(node.dangly.as_ref().map_or(0, |_| DanglyHeader::SIZE));
    block.walkmesh_header = take(node.walkmesh.as_ref().map_or(0, |_| WalkmeshHeader::SIZE));
    block.light_header = take(node.light.as_ref().map_or(0, |_| LightHeader::SIZE));
    block.emitter_header = take(node.emitter.as_ref().map_or(0, |_| EmitterHeader::SIZE));
    block.reference_header = take(node.reference.as_ref().map_or(0, |_| ReferenceHeader::SIZE));

    if let Some(mesh) = &node.mesh {
        block.faces = take(mesh.faces.len() * FACE_SIZE);
        block.index_counts = take(4);
        block.index_offsets = take(4);
        block.inverted_counter = take(4);
        block.vertices = take(mesh.num_vertices() * 12);
    }
    if let Some(skin) = &node.skin {
        block.bonemap = take(skin.bonemap.len() * 4);
        block.qbones = take(skin.qbones.len() * 16);
        block.tbones = take(skin.tbones.len() * 12);
    }
    if let Some(mesh) = &node.mesh {
        block.vertex_indices = take(align4(mesh.faces.len() * 3 * 2));
    }
    if let Some(dangly) = &node.dangly {
        block.dangly_constraints = take(dangly.constraints.len() * 4);
        block.dangly_vertices = take(dangly.vertices.len() * 12);
    }
    if let Some(walkmesh) = &node.walkmesh {
        block.aabbs = take(walkmesh.aabbs.len() * AabbRecord::SIZE);
    }
    if let Some(light) = &node.light {
        let n = light.flares.len();
        block.flare_sizes = take(n * 4);
        block.flare_positions = take(n * 4);
        block.flare_color_shifts = take(n * 12);
        block.flare_texture_offsets = take(n * 4);
        block.flare_strings = light
            .flares
            .iter()
            .map(|flare| take(flare.texture.len() + 1))
            .collect();
        let strings: usize = light.flares.iter().map(|f| f.texture.len() + 1).sum();
        take(align4(strings) - strings);
    }
    block.children = take(node.children.len() * 4);
    block.controllers = take(packed.headers_size());
    block.controller_data = take(packed.data_size());
    block.size = cursor;
    block
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    /// Absolute offset of the node header.
    pub offset: usize,
    pub parent_offset: usize,
    pub name_index: u16,
    pub block: BlockLayout,
    /// Absolute offsets of the children, in order.
    pub child_offsets: Vec<usize>,
    pub controllers: PackedControllers,
    pub external: Option<ExternalLayout>,
}

impl NodeLayout {
    /// Absolute offset of a block-relative position, as stored on disk.
    pub fn at(&self, relative: usize) -> u32 {
        (self.offset + relative) as u32
    }
}

/// One node tree in pre-order. `nodes[0]` is the root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeLayout {
    pub nodes: Vec<NodeLayout>,
    pub size: usize,
}

impl TreeLayout {
    pub fn root_offset(&self) -> usize {
        self.nodes.first().map_or(0, |n| n.offset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLayout {
    pub offset: usize,
    pub events_offset: usize,
    pub tree: TreeLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayout {
    pub revision: Revision,
    pub names: Vec<String>,
    pub name_string_offsets: Vec<usize>,
    pub animation_table_offset: usize,
    pub animations: Vec<AnimationLayout>,
    pub tree: TreeLayout,
    /// Size of the model stream after the file header.
    pub model_size: usize,
    pub external_size: usize,
}

impl ModelLayout {
    pub fn name_index(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| u16::try_from(i).ok())
    }
}

struct Planner<'a> {
    revision: Revision,
    compress_orientations: bool,
    name_lookup: HashMap<&'a str, u16>,
    external_cursor: usize,
}

impl<'a> Planner<'a> {
    fn validate(&self, node: &Node) -> Status {
        let requires_mesh = [
            (node.skin.is_some(), "skin"),
            (node.dangly.is_some(), "dangly"),
            (node.walkmesh.is_some(), "walkmesh"),
        ];
        if node.mesh.is_none() {
            if let Some((_, what)) = requires_mesh.iter().find(|(present, _)| *present) {
                return Err(MdlError::InvalidParameter(format!(
                    "node '{}' has a {} payload without a mesh",
                    node.name, what
                )));
            }
        }
        let Some(mesh) = &node.mesh else {
            return Ok(());
        };
        mesh.validate(&node.name)?;
        let count = mesh.num_vertices();
        if let Some(skin) = &node.skin {
            skin.validate(&node.name, count)?;
            if skin.qbones.len() != skin.bonemap.len() || skin.tbones.len() != skin.bonemap.len() {
                return Err(MdlError::InvalidParameter(format!(
                    "skin on '{}' has {} bonemap entries, {} qbones and {} tbones",
                    node.name,
                    skin.bonemap.len(),
                    skin.qbones.len(),
                    skin.tbones.len()
                )));
            }
        }
        if let Some(dangly) = &node.dangly {
            if dangly.constraints.len() != count || dangly.vertices.len() != count {
                return Err(MdlError::InvalidParameter(format!(
                    "dangly on '{}' has {} constraints and {} vertices for {} mesh vertices",
                    node.name,
                    dangly.constraints.len(),
                    dangly.vertices.len(),
                    count
                )));
            }
        }
        if let Some(walkmesh) = &node.walkmesh {
            let len = walkmesh.aabbs.len();
            let dangling = walkmesh
                .aabbs
                .iter()
                .flat_map(|a| [a.left, a.right])
                .flatten()
                .find(|&child| child == 0 || child >= len);
            if let Some(child) = dangling {
                return Err(MdlError::InvalidParameter(format!(
                    "walkmesh on '{}' references aabb {} of {}",
                    node.name, child, len
                )));
            }
        }
        Ok(())
    }

    /// Both passes for one tree starting at `start`.
    fn plan_tree(&mut self, root: &Node, start: usize) -> StatusResult<TreeLayout> {
        let depth = root.depth();
        if depth >= MAX_NODE_DEPTH {
            return Err(MdlError::InvalidParameter(format!(
                "tree under '{}' is {} levels deep, at most {} can be decoded",
                root.name,
                depth + 1,
                MAX_NODE_DEPTH
            )));
        }
        // Pass one: arena of nodes in write order, each sized on its own.
        let arena = root.preorder();
        let mut parents: Vec<Option<usize>> = vec![None; arena.len()];
        let mut child_ids: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
        for (id, node) in arena.iter().enumerate() {
            let mut next = id + 1;
            for child in &node.children {
                child_ids[id].push(next);
                parents[next] = Some(id);
                next += child.node_count();
            }
        }

        let mut packed = Vec::with_capacity(arena.len());
        let mut blocks = Vec::with_capacity(arena.len());
        for node in &arena {
            self.validate(node)?;
            let controllers =
                pack_controllers(&node.name, &node.controllers, self.compress_orientations)?;
            blocks.push(layout_block(node, self.revision, &controllers));
            packed.push(controllers);
        }

        // Pass two: absolute offsets from the size array.
        let mut offsets = Vec::with_capacity(arena.len());
        let mut cursor = start;
        for block in &blocks {
            offsets.push(cursor);
            cursor += block.size;
        }

        let mut nodes = Vec::with_capacity(arena.len());
        for (id, ((node, block), controllers)) in arena.iter().zip(blocks).zip(packed).enumerate() {
            let name_index = *self.name_lookup.get(node.name.as_str()).ok_or_else(|| {
                MdlError::InvariantViolation(format!("node '{}' missing from name table", node.name))
            })?;
            let external = ExternalLayout::for_node(node).map(|mut layout| {
                layout.offset = self.external_cursor;
                self.external_cursor += layout.size();
                layout
            });
            nodes.push(NodeLayout {
                offset: offsets[id],
                parent_offset: parents[id].map_or(0, |p| offsets[p]),
                name_index,
                block,
                child_offsets: child_ids[id].iter().map(|&c| offsets[c]).collect(),
                controllers,
                external,
            });
        }
        Ok(TreeLayout {
            nodes,
            size: cursor - start,
        })
    }
}

/// Plans the complete encoded layout of `model`.
pub fn plan_model(model: &Model, options: &EncoderOptions) -> StatusResult<ModelLayout> {
    let names = build_name_table(model);
    if names.len() > u16::MAX as usize + 1 {
        return Err(MdlError::InvalidParameter(format!(
            "{} distinct node names exceed the name index range",
            names.len()
        )));
    }
    let mut name_lookup = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        name_lookup.insert(name.as_str(), i as u16);
    }

    let mut cursor = NAME_TABLE_OFFSET + names.len() * 4;
    let mut name_string_offsets = Vec::with_capacity(names.len());
    for name in &names {
        name_string_offsets.push(cursor);
        cursor += name.len() + 1;
    }
    cursor = align4(cursor);

    let animation_table_offset = cursor;
    cursor += model.animations.len() * 4;

    let mut planner = Planner {
        revision: options.get_revision(),
        compress_orientations: options.get_compress_orientations(),
        name_lookup,
        external_cursor: 0,
    };

    let mut animations = Vec::with_capacity(model.animations.len());
    for animation in &model.animations {
        let offset = cursor;
        let events_offset = offset + AnimationHeader::SIZE;
        let tree_start = events_offset + animation.events.len() * EVENT_SIZE;
        let tree = planner.plan_tree(&animation.root, tree_start)?;
        cursor = tree_start + tree.size;
        animations.push(AnimationLayout {
            offset,
            events_offset,
            tree,
        });
    }

    let tree = planner.plan_tree(&model.root, cursor)?;
    cursor += tree.size;
    let external_size = planner.external_cursor;

    log::debug!(
        "planned '{}': {} names, {} animations, {} model bytes, {} external bytes",
        model.name,
        names.len(),
        animations.len(),
        cursor,
        external_size
    );
    Ok(ModelLayout {
        revision: options.get_revision(),
        names,
        name_string_offsets,
        animation_table_offset,
        animations,
        tree,
        model_size: cursor,
        external_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{controller_type, Controller};
    use crate::mesh::{Face, Mesh, Skin, VertexWeight};
    use crate::model::Animation;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.faces.push(Face::new([0, 1, 2]));
        mesh
    }

    fn sample_model() -> Model {
        let mut root = Node::new(0, "root");
        let mut body = Node::new(1, "body");
        body.mesh = Some(triangle());
        body.children.push(Node::new(2, "hand"));
        root.children.push(body);
        root.children.push(Node::new(3, "tail"));
        Model::new("sample", root)
    }

    #[test]
    fn test_name_table_order_and_dedup() {
        let mut model = sample_model();
        let mut anim_root = Node::new(0, "root");
        anim_root.children.push(Node::new(9, "extra"));
        anim_root.children.push(Node::new(2, "hand"));
        model.animations.push(Animation::new("wave", anim_root));

        assert_eq!(build_name_table(&model), ["root", "body", "hand", "tail", "extra"]);
    }

    #[test]
    fn test_tree_offsets_are_contiguous_preorder() {
        let model = sample_model();
        let layout = plan_model(&model, &EncoderOptions::new()).unwrap();
        let nodes = &layout.tree.nodes;
        assert_eq!(nodes.len(), 4);
        for pair in nodes.windows(2) {
            assert_eq!(pair[0].offset + pair[0].block.size, pair[1].offset);
        }
        // root -> body, tail; body -> hand
        assert_eq!(nodes[0].child_offsets, vec![nodes[1].offset, nodes[3].offset]);
        assert_eq!(nodes[1].child_offsets, vec![nodes[2].offset]);
        assert_eq!(nodes[2].parent_offset, nodes[1].offset);
        assert_eq!(nodes[3].parent_offset, nodes[0].offset);
        assert_eq!(layout.model_size, nodes[3].offset + nodes[3].block.size);
    }

    #[test]
    fn test_revision_changes_mesh_block_by_extension() {
        let model = sample_model();
        let a = plan_model(&model, &EncoderOptions::with_revision(Revision::A)).unwrap();
        let b = plan_model(&model, &EncoderOptions::with_revision(Revision::B)).unwrap();
        assert_eq!(b.tree.nodes[1].block.size - a.tree.nodes[1].block.size, 8);
        assert_eq!(a.tree.nodes[0].block.size, b.tree.nodes[0].block.size);
    }

    #[test]
    fn test_external_layout_order() {
        let mut model = sample_model();
        let body = &mut model.root.children[0];
        let mesh = body.mesh.as_mut().unwrap();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 3]);
        mesh.uv2 = Some(vec![[0.0; 2]; 3]);
        body.skin = Some(Skin {
            weights: vec![VertexWeight::default(); 3],
            ..Skin::default()
        });

        let layout = plan_model(&model, &EncoderOptions::new()).unwrap();
        let external = layout.tree.nodes[1].external.clone().unwrap();
        assert_eq!(external.normal, Some(0));
        assert_eq!(external.uv1, None);
        assert_eq!(external.uv2, Some(12));
        assert_eq!(external.bone_indices, Some(20));
        assert_eq!(external.bone_weights, Some(36));
        assert_eq!(external.stride, 52);
        assert_eq!(layout.external_size, 4 * 52);
    }

    #[test]
    fn test_animation_precedes_model_tree() {
        let mut model = sample_model();
        let mut anim_root = Node::new(0, "root");
        anim_root
            .controllers
            .push(Controller::constant(controller_type::POSITION, vec![1.0, 2.0, 3.0]));
        model.animations.push(Animation::new("idle", anim_root));

        let layout = plan_model(&model, &EncoderOptions::new()).unwrap();
        let animation = &layout.animations[0];
        assert_eq!(animation.offset, layout.animation_table_offset + 4);
        assert_eq!(animation.tree.root_offset(), animation.events_offset);
        assert_eq!(
            layout.tree.root_offset(),
            animation.tree.root_offset() + animation.tree.size
        );
        assert_eq!(animation.tree.nodes[0].controllers.data.len(), 4);
    }

    #[test]
    fn test_skin_without_mesh_is_rejected() {
        let mut model = sample_model();
        model.root.skin = Some(Skin::default());
        assert!(matches!(
            plan_model(&model, &EncoderOptions::new()),
            Err(MdlError::InvalidParameter(_))
        ));
    }

    fn chain(levels: usize) -> Node {
        let mut node = Node::new(0, "link");
        for _ in 1..levels {
            let mut parent = Node::new(0, "link");
            parent.children.push(node);
            node = parent;
        }
        node
    }

    #[test]
    fn test_tree_deeper_than_decoder_cap_is_rejected() {
        let options = EncoderOptions::new();
        let fits = Model::new("deep", chain(MAX_NODE_DEPTH));
        assert_eq!(plan_model(&fits, &options).unwrap().tree.nodes.len(), MAX_NODE_DEPTH);

        let too_deep = Model::new("deep", chain(MAX_NODE_DEPTH + 1));
        assert!(matches!(
            plan_model(&too_deep, &options),
            Err(MdlError::InvalidParameter(_))
        ));
    }
}
