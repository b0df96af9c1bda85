//! JSON rendering and the script-facing handle bridge.

use serde_json::json;

use rtti_core::types::engine_types::{SceneObject, SliderJoint, SphereCollider};
use rtti_core::types::{downcast_ref, register_engine_types, share, PlainValue};
use rtti_core::{FieldValue, RttiConfig, RttiContext, RttiError};

fn context() -> RttiContext {
    RttiContext::init(RttiConfig::default(), &[register_engine_types]).unwrap()
}

#[test]
fn test_json_and_binary_agree() {
    let serializer = context().serializer();
    let mut joint = SliderJoint::default();
    joint.body_b = Some(share(SphereCollider {
        radius: 0.25,
        ..Default::default()
    }));
    joint.limit.upper = 8.0;

    let json = serializer.to_json(&joint).unwrap();
    assert_eq!(json["$type"], "SliderJoint");
    assert_eq!(json["SliderJoint"]["body_a"], serde_json::Value::Null);
    assert_eq!(json["SliderJoint"]["body_b"]["SphereCollider"]["radius"], 0.25);
    assert_eq!(json["SliderJoint"]["limit"]["LimitLinearRange"]["upper"], 8.0);

    let from_text = serializer.from_json(&json).unwrap();
    let from_binary = serializer
        .deserialize(&serializer.serialize(&joint).unwrap())
        .unwrap();
    assert_eq!(
        serializer.serialize(from_text.as_ref()).unwrap(),
        serializer.serialize(from_binary.as_ref()).unwrap()
    );
}

#[test]
fn test_hand_written_json_loads() {
    let serializer = context().serializer();
    let json = json!({
        "$type": "SceneObject",
        "GameObject": { "name": "crate" },
        "SceneObject": {
            "position": [0.0, 1.5, 0.0],
            "tags": ["pickup"],
            "components": [
                { "$type": "BoxCollider", "BoxCollider": { "extents": [0.5, 0.5, 0.5] } },
                null
            ]
        }
    });

    let object = serializer.from_json(&json).unwrap();
    let scene = downcast_ref::<SceneObject>(object.as_ref()).unwrap();
    assert_eq!(scene.game_object.name, "crate");
    assert_eq!(scene.position, [0.0, 1.5, 0.0]);
    assert_eq!(scene.scale, [1.0; 3]);
    assert_eq!(scene.tags, vec!["pickup".to_string()]);
    assert_eq!(scene.components.len(), 2);
    assert!(scene.components[1].is_none());
}

#[test]
fn test_json_without_type_is_rejected() {
    let serializer = context().serializer();
    assert!(matches!(
        serializer.from_json(&json!({ "GameObject": {} })),
        Err(RttiError::SerializationError(_))
    ));
    assert!(matches!(
        serializer.from_json(&json!({ "$type": "Teapot" })),
        Err(RttiError::UnknownTypeName(_))
    ));
}

#[test]
fn test_bridge_round_trip_through_serializer() {
    let context = context();
    let bridge = context.bridge();

    let handle = bridge.construct("BoxCollider").unwrap();
    bridge
        .set_field(
            handle,
            "extents",
            FieldValue::Plain(PlainValue::Vec3([2.0, 3.0, 4.0])),
        )
        .unwrap();
    bridge
        .set_field(handle, "is_trigger", FieldValue::Plain(PlainValue::Bool(true)))
        .unwrap();
    assert!(matches!(
        bridge.set_field(handle, "instance_id", FieldValue::Plain(PlainValue::U64(5))),
        Err(RttiError::FieldNotExposed { .. })
    ));

    let object = bridge.object(handle).unwrap();
    let bytes = context.serializer().serialize_shared(&object).unwrap();
    let json = context
        .serializer()
        .to_json(context.serializer().deserialize(&bytes).unwrap().as_ref())
        .unwrap();
    assert_eq!(json["BoxCollider"]["extents"], json!([2.0, 3.0, 4.0]));
    assert_eq!(json["Collider"]["is_trigger"], true);

    bridge.release(handle).unwrap();
    assert_eq!(bridge.handle_count(), 0);
}

#[test]
fn test_bridge_pointer_fields() {
    let context = context();
    let bridge = context.bridge();
    let joint = bridge.construct("SliderJoint").unwrap();
    let body = bridge.construct("SphereCollider").unwrap();

    let body_object = bridge.object(body).unwrap();
    bridge
        .set_field(joint, "body_a", FieldValue::Pointer(Some(body_object)))
        .unwrap();

    match bridge.get_field(joint, "body_a").unwrap() {
        FieldValue::Pointer(Some(pointer)) => {
            let guard = pointer.read().unwrap();
            assert!(downcast_ref::<SphereCollider>(guard.as_ref()).is_some());
        }
        other => panic!("unexpected value {:?}", other),
    }
}
