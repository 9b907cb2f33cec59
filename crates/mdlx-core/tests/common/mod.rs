#![allow(dead_code)]

use mdlx_core::controller::controller_type;
use mdlx_core::headers::FileHeader;
use mdlx_core::{
    AabbNode, Animation, BoundingBox, Controller, ControllerRow, Dangly, Emitter, Event, Face,
    LensFlare, Light, Mesh, Model, Node, Reference, Skin, VertexWeight, Walkmesh,
};

/// Absolute position in the model stream of a body-relative offset.
pub fn file_offset(body_offset: usize) -> usize {
    FileHeader::SIZE + body_offset
}

pub fn patch_u16(data: &mut [u8], at: usize, value: u16) {
    data[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn patch_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// A strip of `quads` quads: `2 * (quads + 1)` vertices, two faces per quad.
pub fn strip_mesh(quads: u16) -> Mesh {
    let mut mesh = Mesh::new();
    for i in 0..=quads {
        mesh.vertices.push([i as f32, 0.0, 0.0]);
        mesh.vertices.push([i as f32, 1.0, 0.0]);
    }
    for i in 0..quads {
        let a = i * 2;
        let mut lower = Face::new([a, a + 2, a + 1]);
        lower.normal = [0.0, 0.0, 1.0];
        lower.material = 3;
        lower.smoothing_group = 1;
        let mut upper = Face::new([a + 1, a + 2, a + 3]);
        upper.normal = [0.0, 0.0, 1.0];
        upper.plane_distance = 0.5;
        mesh.faces.push(lower);
        mesh.faces.push(upper);
    }
    mesh.bounding_box = BoundingBox::from_points(&mesh.vertices).unwrap_or_default();
    mesh.radius = quads as f32;
    mesh.surface_area = quads as f32;
    mesh
}

fn textured(mut mesh: Mesh) -> Mesh {
    let n = mesh.num_vertices();
    mesh.normals = Some(vec![[0.0, 0.0, 1.0]; n]);
    mesh.uv1 = Some((0..n).map(|i| [i as f32 / n as f32, 0.5]).collect());
    mesh.uv2 = Some((0..n).map(|i| [0.25, i as f32]).collect());
    mesh.texture1 = "c_body01".into();
    mesh.texture2 = "c_body01_lm".into();
    mesh.diffuse = [0.8, 0.8, 0.8];
    mesh.ambient = [0.2, 0.2, 0.2];
    mesh.render = true;
    mesh.shadow = true;
    mesh.lightmapped = true;
    mesh.inverted_counter = 7;
    mesh.dirt_enabled = true;
    mesh.dirt_texture = 2;
    mesh
}

fn position_keys() -> Controller {
    let mut c = Controller::new(controller_type::POSITION);
    c.rows.push(ControllerRow::new(0.0, vec![0.0, 0.0, 0.0]));
    c.rows.push(ControllerRow::new(0.5, vec![0.0, 0.1, 0.2]));
    c.rows.push(ControllerRow::new(1.0, vec![0.0, 0.0, 0.4]));
    c
}

fn bezier_keys() -> Controller {
    let mut c = Controller::new(controller_type::POSITION);
    c.bezier = true;
    c.rows.push(ControllerRow::new(0.0, vec![0.0, 0.0, 0.0, 0.1, 0.1, 0.1, 0.2, 0.2, 0.2]));
    c.rows.push(ControllerRow::new(1.0, vec![1.0, 1.0, 1.0, 0.9, 0.9, 0.9, 0.8, 0.8, 0.8]));
    c
}

/// A model exercising every payload kind, controllers and one animation.
pub fn rich_model() -> Model {
    let mut root = Node::new(0, "c_rich");
    root.controllers.push(Controller::constant(
        controller_type::ORIENTATION,
        vec![0.0, 0.0, 0.0, 1.0],
    ));

    let mut body = Node::new(1, "body");
    body.position = [0.0, 0.0, 1.0];
    body.orientation = [0.0, 0.0, 0.70710677, 0.70710677];
    let mesh = textured(strip_mesh(3));
    let n = mesh.num_vertices();
    body.skin = Some(Skin {
        bone_indices: [0, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        bonemap: vec![0, 1, -1, -1, -1, -1, -1],
        qbones: vec![[0.0, 0.0, 0.0, 1.0]; 7],
        tbones: vec![[0.0, 0.0, -1.0]; 7],
        weights: (0..n)
            .map(|i| VertexWeight {
                bones: [(i % 2) as i16, -1, -1, -1],
                weights: [1.0, 0.0, 0.0, 0.0],
            })
            .collect(),
    });
    body.mesh = Some(mesh);
    body.controllers.push(position_keys());

    let mut cape = Node::new(2, "cape");
    let mesh = strip_mesh(2);
    let n = mesh.num_vertices();
    cape.dangly = Some(Dangly {
        displacement: 0.3,
        tightness: 2.0,
        period: 1.5,
        constraints: (0..n).map(|i| i as f32 * 10.0).collect(),
        vertices: mesh.vertices.clone(),
    });
    cape.mesh = Some(mesh);
    body.children.push(cape);

    let mut floor = Node::new(3, "floor");
    let mesh = strip_mesh(1);
    let leaf = |face: i32| AabbNode {
        bounding_box: BoundingBox::new([0.0; 3], [1.0, 1.0, 0.0]),
        face,
        significant_plane: 0,
        left: None,
        right: None,
    };
    floor.walkmesh = Some(Walkmesh {
        aabbs: vec![
            AabbNode {
                bounding_box: mesh.bounding_box,
                face: -1,
                significant_plane: 1,
                left: Some(1),
                right: Some(2),
            },
            leaf(0),
            leaf(1),
        ],
    });
    floor.mesh = Some(mesh);

    let mut lamp = Node::new(4, "lamp");
    lamp.light = Some(Light {
        flare_radius: 2.0,
        priority: 3,
        ambient_only: false,
        dynamic_type: 1,
        affect_dynamic: true,
        shadow: true,
        flare: true,
        fading: false,
        flares: vec![
            LensFlare {
                texture: "flaretex01".into(),
                size: 0.5,
                position: 1.0,
                color_shift: [1.0, 0.5, 0.0],
            },
            LensFlare {
                texture: "fx_halo".into(),
                size: 1.5,
                position: -0.5,
                color_shift: [0.0, 0.0, 1.0],
            },
        ],
    });
    lamp.controllers.push(bezier_keys());

    let mut spark = Node::new(5, "spark");
    spark.emitter = Some(Emitter {
        dead_space: 0.1,
        blast_radius: 2.0,
        blast_length: 1.0,
        branch_count: 4,
        control_point_smoothing: 0.5,
        x_grid: 5,
        y_grid: 6,
        spawn_type: 1,
        update: "Fountain".into(),
        render: "Normal".into(),
        blend: "Lighten".into(),
        texture: "fx_spark".into(),
        chunk_name: "chunk".into(),
        two_sided_texture: true,
        looping: true,
        render_order: 2,
        frame_blending: true,
        depth_texture: "fx_depth".into(),
        flags: 0x0101,
    });

    let mut hook = Node::new(6, "hook");
    hook.reference = Some(Reference {
        model: "w_blade".into(),
        reattachable: true,
    });

    root.children.push(body);
    root.children.push(floor);
    root.children.push(lamp);
    root.children.push(spark);
    root.children.push(hook);

    let mut model = Model::new("c_rich", root);
    model.supermodel = Some("c_base".into());
    model.classification = mdlx_core::model::classification::CHARACTER;
    model.radius = 3.0;
    model.bounding_box = BoundingBox::new([-1.0; 3], [1.0; 3]);

    let mut anim_root = Node::new(0, "c_rich");
    let mut anim_body = Node::new(1, "body");
    anim_body.controllers.push(position_keys());
    anim_body.controllers.push(bezier_keys());
    anim_root.children.push(anim_body);
    anim_root.children.push(Node::new(7, "extra_bone"));
    let mut walk = Animation::new("walk", anim_root);
    walk.source_model = "c_rich".into();
    walk.length = 1.0;
    walk.transition = 0.25;
    walk.events.push(Event {
        time: 0.5,
        name: "snd_footstep".into(),
    });
    model.animations.push(walk);
    model
}

/// Every face of every mesh addresses an existing vertex.
pub fn assert_faces_in_range(model: &Model) {
    let trees = std::iter::once(&model.root).chain(model.animations.iter().map(|a| &a.root));
    for node in trees.flat_map(Node::preorder) {
        if let Some(mesh) = &node.mesh {
            for face in &mesh.faces {
                let max = face.vertices.iter().copied().max().unwrap_or(0) as usize;
                assert!(
                    max < mesh.vertices.len(),
                    "node '{}': face vertex {} of {}",
                    node.name,
                    max,
                    mesh.vertices.len()
                );
            }
        }
    }
}
