mod common;

use mdlx_core::controller::controller_type;
use mdlx_core::node::MAX_NODE_DEPTH;
use mdlx_core::{
    detect_revision, Controller, ControllerRow, DecoderOptions, Diagnostic, EncoderOptions,
    MdlError, Model, ModelDecoder, ModelEncoder, Node, Revision,
};

use common::{assert_faces_in_range, rich_model, strip_mesh};

fn roundtrip(model: &Model, options: EncoderOptions) -> (Model, Vec<Diagnostic>) {
    let encoded = ModelEncoder::with_options(options)
        .encode(model)
        .expect("encode failed");
    let mut diagnostics = Vec::new();
    let decoded = ModelDecoder::new()
        .decode_with_diagnostics(&encoded.mdl, Some(encoded.mdx.as_slice()), &mut diagnostics)
        .expect("decode failed");
    (decoded, diagnostics)
}

#[test]
fn test_rich_model_roundtrip() {
    let model = rich_model();
    let (decoded, diagnostics) = roundtrip(&model, EncoderOptions::new());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
    assert_faces_in_range(&decoded);
    assert_eq!(decoded.root, model.root);
    assert_eq!(decoded.animations, model.animations);
    assert_eq!(decoded, model);
}

#[test]
fn test_encode_is_deterministic() {
    let model = rich_model();
    let encoder = ModelEncoder::new();
    let first = encoder.encode(&model).unwrap();
    let second = encoder.encode(&model).unwrap();
    assert_eq!(first, second);

    // Re-encoding the decoded tree reproduces the same bytes.
    let decoded = ModelDecoder::new()
        .decode(&first.mdl, Some(first.mdx.as_slice()))
        .unwrap();
    assert_eq!(encoder.encode(&decoded).unwrap(), first);
}

#[test]
fn test_revision_a_and_b_differ_by_mesh_extension() {
    let mut model = rich_model();
    // Revision A has no dirt fields.
    model.root.children[0].mesh.as_mut().unwrap().dirt_enabled = false;
    model.root.children[0].mesh.as_mut().unwrap().dirt_texture = 0;
    let mesh_nodes = model.root.preorder().iter().filter(|n| n.mesh.is_some()).count();
    assert_eq!(mesh_nodes, 3);

    let a = ModelEncoder::with_options(EncoderOptions::with_revision(Revision::A))
        .encode(&model)
        .unwrap();
    let b = ModelEncoder::with_options(EncoderOptions::with_revision(Revision::B))
        .encode(&model)
        .unwrap();

    assert_eq!(b.mdl.len() - a.mdl.len(), 8 * mesh_nodes);
    assert_eq!(a.mdx, b.mdx);
    assert_eq!(detect_revision(&a.mdl).unwrap(), Revision::A);
    assert_eq!(detect_revision(&b.mdl).unwrap(), Revision::B);

    let decoder = ModelDecoder::new();
    let from_a = decoder.decode(&a.mdl, Some(a.mdx.as_slice())).unwrap();
    let from_b = decoder.decode(&b.mdl, Some(b.mdx.as_slice())).unwrap();
    assert_eq!(from_a, from_b);
    assert_eq!(from_a, model);
}

#[test]
fn test_fast_load_skips_animations_and_controllers() {
    let model = rich_model();
    let encoded = ModelEncoder::new().encode(&model).unwrap();

    let mut options = DecoderOptions::new();
    options.set_fast_load(true);
    let decoded = ModelDecoder::with_options(options)
        .decode(&encoded.mdl, Some(encoded.mdx.as_slice()))
        .unwrap();

    assert!(decoded.animations.is_empty());
    assert!(decoded.root.preorder().iter().all(|n| n.controllers.is_empty()));
    assert_eq!(decoded.node_count(), model.node_count());
    assert_eq!(
        decoded.find_node("body").and_then(|n| n.mesh.as_ref()),
        model.find_node("body").and_then(|n| n.mesh.as_ref())
    );
}

#[test]
fn test_missing_external_stream_keeps_inline_geometry() {
    let model = rich_model();
    let encoded = ModelEncoder::new().encode(&model).unwrap();
    let decoded = ModelDecoder::new().decode(&encoded.mdl, None).unwrap();

    let body = decoded.find_node("body").unwrap();
    let mesh = body.mesh.as_ref().unwrap();
    assert_eq!(mesh.vertices, model.find_node("body").unwrap().mesh.as_ref().unwrap().vertices);
    assert!(mesh.normals.is_none());
    assert!(mesh.uv1.is_none());
    let skin = body.skin.as_ref().unwrap();
    assert_eq!(skin.weights.len(), mesh.vertices.len());
    assert!(skin.weights.iter().all(|w| w.bones == [-1; 4]));
}

#[test]
fn test_compressed_orientation_roundtrip() {
    let mut root = Node::new(0, "root");
    let mut orientation = Controller::new(controller_type::ORIENTATION);
    orientation
        .rows
        .push(ControllerRow::new(0.0, vec![0.0, 0.0, 0.0, 1.0]));
    orientation
        .rows
        .push(ControllerRow::new(1.0, vec![0.0, 0.38268343, 0.0, 0.9238795]));
    root.controllers.push(orientation.clone());
    let model = Model::new("c_spin", root);

    let mut options = EncoderOptions::new();
    options.set_compress_orientations(true);
    let (decoded, _) = roundtrip(&model, options);

    let decoded = &decoded.root.controllers[0];
    assert_eq!(decoded.controller_type, controller_type::ORIENTATION);
    assert!(!decoded.bezier);
    assert_eq!(decoded.rows.len(), 2);
    for (got, want) in decoded.rows.iter().zip(&orientation.rows) {
        assert_eq!(got.time, want.time);
        assert_eq!(got.values.len(), 4);
        for (g, w) in got.values.iter().zip(&want.values) {
            assert!((g - w).abs() < 2e-3, "{:?} vs {:?}", got.values, want.values);
        }
    }
}

#[test]
fn test_invalid_trees_are_rejected_on_encode() {
    let encoder = ModelEncoder::new();

    let mut bad_face = rich_model();
    bad_face.root.children[1].mesh.as_mut().unwrap().faces[0].vertices[0] = 99;
    assert!(matches!(encoder.encode(&bad_face), Err(MdlError::InvalidParameter(_))));

    let mut bad_weights = rich_model();
    bad_weights.root.children[0].skin.as_mut().unwrap().weights.pop();
    assert!(matches!(encoder.encode(&bad_weights), Err(MdlError::InvalidParameter(_))));

    let mut orphan_skin = rich_model();
    orphan_skin.root.children[1].mesh = None;
    orphan_skin.root.children[1].walkmesh = None;
    orphan_skin.root.children[1].skin = orphan_skin.root.children[0].skin.clone();
    assert!(matches!(encoder.encode(&orphan_skin), Err(MdlError::InvalidParameter(_))));

    let mut long_texture = Model::new("m", Node::new(0, "root"));
    let mut mesh = strip_mesh(1);
    mesh.texture1 = "t".repeat(40);
    long_texture.root.mesh = Some(mesh);
    assert!(matches!(encoder.encode(&long_texture), Err(MdlError::InvalidParameter(_))));
}

fn chain(levels: usize) -> Node {
    let mut node = Node::new((levels - 1) as u16, format!("bone{}", levels - 1));
    for i in (0..levels - 1).rev() {
        let mut parent = Node::new(i as u16, format!("bone{}", i));
        parent.children.push(node);
        node = parent;
    }
    node
}

#[test]
fn test_tree_at_depth_limit_roundtrips() {
    let model = Model::new("c_chain", chain(MAX_NODE_DEPTH));
    let (decoded, diagnostics) = roundtrip(&model, EncoderOptions::new());
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
    assert_eq!(decoded.node_count(), MAX_NODE_DEPTH);
    assert_eq!(decoded.root.depth(), MAX_NODE_DEPTH - 1);
    assert!(decoded.find_node(&format!("bone{}", MAX_NODE_DEPTH - 1)).is_some());

    let too_deep = Model::new("c_chain", chain(MAX_NODE_DEPTH + 1));
    assert!(matches!(
        ModelEncoder::new().encode(&too_deep),
        Err(MdlError::InvalidParameter(_))
    ));
}
