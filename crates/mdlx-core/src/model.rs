//! Root of the in-memory tree.
//!
//! A [`Model`] exclusively owns its node hierarchy and its animations; each
//! [`Animation`] owns a private node tree that carries only the controllers
//! keyframed by that animation.

use crate::node::Node;

/// Model classification codes stored in the model header.
pub mod classification {
    pub const OTHER: u8 = 0x00;
    pub const EFFECT: u8 = 0x01;
    pub const TILE: u8 = 0x02;
    pub const CHARACTER: u8 = 0x04;
    pub const DOOR: u8 = 0x08;
    pub const LIGHTSABER: u8 = 0x10;
    pub const PLACEABLE: u8 = 0x20;
    pub const FLYER: u8 = 0x40;
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Self::new(first, first);
        for p in &points[1..] {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    /// Parent model this one inherits animations from. `None` is stored as "NULL".
    pub supermodel: Option<String>,
    pub classification: u8,
    pub subclassification: u8,
    pub affected_by_fog: bool,
    pub animation_scale: f32,
    pub bounding_box: BoundingBox,
    pub radius: f32,
    pub root: Node,
    pub animations: Vec<Animation>,
}

impl Model {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        Self {
            name: name.into(),
            supermodel: None,
            classification: classification::OTHER,
            subclassification: 0,
            affected_by_fog: true,
            animation_scale: 1.0,
            bounding_box: BoundingBox::default(),
            radius: 0.0,
            root,
            animations: Vec::new(),
        }
    }

    /// Number of nodes in the geometry tree.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.root.find(name)
    }

    pub fn find_animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }
}

/// A named, timed event fired during an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: f32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Name of the model the animation was authored against.
    pub source_model: String,
    pub length: f32,
    pub transition: f32,
    pub events: Vec<Event>,
    pub root: Node,
}

impl Animation {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        Self {
            name: name.into(),
            source_model: String::new(),
            length: 0.0,
            transition: 0.0,
            events: Vec::new(),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_points() {
        let bounds = BoundingBox::from_points(&[[1.0, -2.0, 0.5], [-1.0, 3.0, 0.0]]).unwrap();
        assert_eq!(bounds.min, [-1.0, -2.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 3.0, 0.5]);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_model_lookup_helpers() {
        let mut root = Node::new(0, "root");
        root.children.push(Node::new(1, "hand"));
        let mut model = Model::new("c_test", root);
        model.animations.push(Animation::new("walk", Node::new(0, "root")));

        assert_eq!(model.node_count(), 2);
        assert_eq!(model.find_node("hand").map(|n| n.id), Some(1));
        assert!(model.find_animation("walk").is_some());
        assert!(model.find_animation("run").is_none());
    }
}
