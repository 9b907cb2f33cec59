use mdlx_core::controller::controller_type;
use mdlx_core::controller_decoder::{decode_controller, RowLayout};
use mdlx_core::controller_encoder::pack_controllers;
use mdlx_core::{Controller, ControllerRow, DecoderBuffer, EncoderBuffer, Model, ModelDecoder, ModelEncoder, Node};
use proptest::prelude::*;

fn controller_strategy() -> impl Strategy<Value = Controller> {
    (1usize..=4, any::<bool>(), 1usize..12)
        .prop_flat_map(|(columns, bezier, rows)| {
            let width = if bezier { columns * 3 } else { columns };
            (
                Just(bezier),
                prop::collection::vec(
                    (-100.0f32..100.0, prop::collection::vec(-1e3f32..1e3, width)),
                    rows,
                ),
            )
        })
        .prop_map(|(bezier, rows)| {
            let mut c = Controller::new(controller_type::SCALE);
            c.bezier = bezier;
            c.rows = rows
                .into_iter()
                .map(|(time, values)| ControllerRow::new(time, values))
                .collect();
            c
        })
}

/// Writes packed headers followed by the data block and decodes them back.
fn repack(controllers: &[Controller]) -> Vec<Controller> {
    let packed = pack_controllers("n", controllers, false).unwrap();
    let mut buffer = EncoderBuffer::new();
    packed.headers.iter().for_each(|h| h.write(&mut buffer));
    packed.data.iter().for_each(|&w| buffer.encode_u32(w));
    let bytes = buffer.into_data();

    let stream = DecoderBuffer::new(&bytes);
    (0..packed.headers.len())
        .map(|i| {
            decode_controller(&stream, i * 16, packed.headers_size())
                .unwrap()
                .controller
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_controller_tables_roundtrip(
        controllers in prop::collection::vec(controller_strategy(), 1..5)
    ) {
        prop_assert_eq!(repack(&controllers), controllers);
    }

    #[test]
    fn prop_disk_width_matches_column_byte(column_count in 0u8..32) {
        let width = RowLayout::from_header(controller_type::POSITION, column_count).disk_width();
        let logical = (column_count & 0x0F) as usize;
        if column_count & 0x10 != 0 {
            prop_assert_eq!(width, logical * 3);
        } else {
            prop_assert_eq!(width, column_count as usize);
        }
    }
}

#[test]
fn test_compressed_case_precedes_bezier_flag() {
    assert_eq!(
        RowLayout::from_header(controller_type::ORIENTATION, 2),
        RowLayout::CompressedQuaternion
    );
    assert_eq!(RowLayout::from_header(controller_type::ORIENTATION, 2).disk_width(), 2);
    assert_eq!(
        RowLayout::from_header(controller_type::ORIENTATION, 16 | 4),
        RowLayout::Bezier { columns: 4 }
    );
    assert_eq!(
        RowLayout::from_header(controller_type::POSITION, 2),
        RowLayout::Linear { width: 2 }
    );
}

#[test]
fn test_many_controllers_share_one_data_block() {
    let mut root = Node::new(0, "root");
    let mut expected = Vec::new();
    for (i, kind) in [controller_type::POSITION, controller_type::ORIENTATION, controller_type::SCALE]
        .into_iter()
        .enumerate()
    {
        let width = match kind {
            controller_type::ORIENTATION => 4,
            controller_type::SCALE => 1,
            _ => 3,
        };
        let mut c = Controller::new(kind);
        for row in 0..=i {
            c.rows.push(ControllerRow::new(row as f32 * 0.5, vec![row as f32; width]));
        }
        expected.push(c);
    }
    root.controllers = expected.clone();
    let model = Model::new("c_keys", root);

    let encoded = ModelEncoder::new().encode(&model).unwrap();
    let decoded = ModelDecoder::new().decode(&encoded.mdl, None).unwrap();
    assert_eq!(decoded.root.controllers, expected);
}
