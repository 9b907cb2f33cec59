use std::collections::HashMap;

use crate::model::BoundingBox;
use crate::node::Node;
use crate::status::{MdlError, Status};

/// Adjacency value for an edge with no neighbouring face.
pub const NO_ADJACENT_FACE: u16 = u16::MAX;

/// Highest material id that fits in the packed surface word.
pub const MAX_MATERIAL: u8 = 0x1F;

/// Highest smoothing group that fits in the packed surface word.
pub const MAX_SMOOTHING_GROUP: u32 = u32::MAX >> 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub normal: [f32; 3],
    pub plane_distance: f32,
    pub material: u8,
    pub smoothing_group: u32,
    pub adjacent: [u16; 3],
    pub vertices: [u16; 3],
}

impl Face {
    pub fn new(vertices: [u16; 3]) -> Self {
        Self {
            normal: [0.0; 3],
            plane_distance: 0.0,
            material: 0,
            smoothing_group: 0,
            adjacent: [NO_ADJACENT_FACE; 3],
            vertices,
        }
    }

    /// Packed on-disk surface word: material in the low five bits, smoothing group above.
    pub fn surface(&self) -> u32 {
        (self.material & MAX_MATERIAL) as u32 | (self.smoothing_group << 5)
    }

    pub fn split_surface(surface: u32) -> (u8, u32) {
        ((surface & MAX_MATERIAL as u32) as u8, surface >> 5)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uv1: Option<Vec<[f32; 2]>>,
    pub uv2: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Face>,

    pub bounding_box: BoundingBox,
    pub radius: f32,
    pub average: [f32; 3],
    pub surface_area: f32,

    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub transparency_hint: u32,
    pub texture1: String,
    pub texture2: String,

    pub lightmapped: bool,
    pub rotate_texture: bool,
    pub background_geometry: bool,
    pub shadow: bool,
    pub beaming: bool,
    pub render: bool,
    pub two_sided: bool,

    pub animate_uv: bool,
    pub uv_direction: [f32; 2],
    pub uv_jitter: f32,
    pub uv_jitter_speed: f32,

    pub inverted_counter: u32,

    // Revision B only; written as zero and decoded as default under revision A.
    pub dirt_enabled: bool,
    pub dirt_texture: u16,
    pub dirt_coordinate_space: u16,
    pub hide_in_hologram: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Smallest vertex count the faces can address: highest referenced index plus one.
    pub fn face_vertex_bound(&self) -> usize {
        face_vertex_bound(&self.faces)
    }

    /// Number of UV sets present.
    pub fn texture_count(&self) -> u16 {
        self.uv1.is_some() as u16 + self.uv2.is_some() as u16
    }

    /// Checks the invariants the encoder relies on.
    pub fn validate(&self, node_name: &str) -> Status {
        let count = self.vertices.len();
        if count > u16::MAX as usize {
            return Err(MdlError::InvalidParameter(format!(
                "mesh '{}' has {} vertices, the format stores at most {}",
                node_name,
                count,
                u16::MAX
            )));
        }
        check_len(node_name, "normals", self.normals.as_ref().map(Vec::len), count)?;
        check_len(node_name, "uv1", self.uv1.as_ref().map(Vec::len), count)?;
        check_len(node_name, "uv2", self.uv2.as_ref().map(Vec::len), count)?;
        if self.face_vertex_bound() > count {
            return Err(MdlError::InvalidParameter(format!(
                "mesh '{}' has faces referencing vertex {} but only {} vertices",
                node_name,
                self.face_vertex_bound() - 1,
                count
            )));
        }
        for face in &self.faces {
            if face.material > MAX_MATERIAL || face.smoothing_group > MAX_SMOOTHING_GROUP {
                return Err(MdlError::InvalidParameter(format!(
                    "mesh '{}' has a face with material {} / smoothing group {} outside the packed range",
                    node_name, face.material, face.smoothing_group
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn face_vertex_bound(faces: &[Face]) -> usize {
    faces
        .iter()
        .flat_map(|f| f.vertices.iter())
        .map(|&v| v as usize + 1)
        .max()
        .unwrap_or(0)
}

fn check_len(node_name: &str, what: &str, len: Option<usize>, expected: usize) -> Status {
    match len {
        Some(len) if len != expected => Err(MdlError::InvalidParameter(format!(
            "mesh '{}' has {} {} for {} vertices",
            node_name, len, what, expected
        ))),
        _ => Ok(()),
    }
}

/// Up to four bone influences for one vertex. Unused slots hold bone -1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub bones: [i16; 4],
    pub weights: [f32; 4],
}

impl Default for VertexWeight {
    fn default() -> Self {
        Self {
            bones: [-1; 4],
            weights: [0.0; 4],
        }
    }
}

/// Skinning data. Requires a mesh on the same node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skin {
    /// Fixed table of bone node numbers used by the renderer.
    pub bone_indices: [u16; 16],
    /// Indexed by node number; holds the bone slot for that node or -1.
    pub bonemap: Vec<i32>,
    /// Bind-pose rotations as [x, y, z, w], one per bonemap entry.
    pub qbones: Vec<[f32; 4]>,
    /// Bind-pose translations, one per bonemap entry.
    pub tbones: Vec<[f32; 3]>,
    /// One entry per mesh vertex.
    pub weights: Vec<VertexWeight>,
}

impl Skin {
    /// Resolves the bonemap into a bone-name to bone-slot map using the node
    /// numbers of `root` and its descendants.
    pub fn bone_lookup(&self, root: &Node) -> HashMap<String, i32> {
        root.preorder()
            .into_iter()
            .filter_map(|node| match self.bonemap.get(node.id as usize) {
                Some(&slot) if slot >= 0 => Some((node.name.clone(), slot)),
                _ => None,
            })
            .collect()
    }

    pub fn validate(&self, node_name: &str, vertex_count: usize) -> Status {
        if self.weights.len() != vertex_count {
            return Err(MdlError::InvalidParameter(format!(
                "skin on '{}' has {} vertex weights for {} vertices",
                node_name,
                self.weights.len(),
                vertex_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_packing() {
        let mut face = Face::new([0, 1, 2]);
        face.material = 7;
        face.smoothing_group = 3;
        let surface = face.surface();
        assert_eq!(surface, 7 | (3 << 5));
        assert_eq!(Face::split_surface(surface), (7, 3));
    }

    #[test]
    fn test_face_vertex_bound() {
        let mut mesh = Mesh::new();
        assert_eq!(mesh.face_vertex_bound(), 0);
        mesh.faces.push(Face::new([0, 4, 2]));
        mesh.faces.push(Face::new([1, 3, 2]));
        assert_eq!(mesh.face_vertex_bound(), 5);
    }

    #[test]
    fn test_validate_rejects_mismatched_attributes() {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![[0.0; 3]; 3];
        mesh.faces.push(Face::new([0, 1, 2]));
        assert!(mesh.validate("m").is_ok());

        mesh.normals = Some(vec![[0.0; 3]; 2]);
        assert!(matches!(mesh.validate("m"), Err(MdlError::InvalidParameter(_))));

        mesh.normals = None;
        mesh.faces.push(Face::new([0, 1, 3]));
        assert!(mesh.validate("m").is_err());
    }

    #[test]
    fn test_bone_lookup_uses_node_numbers() {
        let mut root = Node::new(0, "root");
        root.children.push(Node::new(1, "pelvis"));
        root.children.push(Node::new(2, "head"));

        let skin = Skin {
            bonemap: vec![-1, 0, 1],
            ..Skin::default()
        };
        let lookup = skin.bone_lookup(&root);
        assert_eq!(lookup.get("pelvis"), Some(&0));
        assert_eq!(lookup.get("head"), Some(&1));
        assert!(!lookup.contains_key("root"));
    }
}
