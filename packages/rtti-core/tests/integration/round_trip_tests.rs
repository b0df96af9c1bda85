//! Round trips through the binary stream and registry behaviour under load.

use std::sync::Arc;
use std::thread;

use ntest::timeout;

use rtti_core::types::engine_types::{
    BoxCollider, GameObject, LimitLinearRange, SceneObject, SliderJoint, SphereCollider, Spring,
};
use rtti_core::types::{downcast_ref, register_engine_types, share, RttiType};
use rtti_core::{RttiError, RttiId, Serializer, TypeRegistry};

use super::helpers::{serializer, Node};

#[test]
fn test_scene_graph_round_trip() {
    let serializer = serializer();

    let sphere = share(SphereCollider {
        radius: 2.0,
        ..Default::default()
    });
    let mut joint = SliderJoint::default();
    joint.body_a = Some(sphere.clone());
    joint.limit = LimitLinearRange {
        lower: 0.5,
        upper: 3.0,
        contact_dist: 0.05,
        restitution: 0.2,
        spring: Spring {
            stiffness: 100.0,
            damping: 5.0,
        },
    };

    let mut scene = SceneObject::default();
    scene.game_object.name = "root".to_string();
    scene.position = [1.0, 2.0, 3.0];
    scene.tags = vec!["level".to_string(), "static".to_string()];
    scene.components = vec![Some(sphere), Some(share(joint)), None];
    scene.children = vec![Some(share(BoxCollider::default()))];

    let bytes = serializer.serialize(&scene).unwrap();
    let restored: SceneObject = serializer.deserialize_as(&bytes).unwrap();

    assert_eq!(restored.game_object.name, "root");
    assert_eq!(restored.position, [1.0, 2.0, 3.0]);
    assert_eq!(restored.rotation, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(restored.tags, scene.tags);
    assert_eq!(restored.components.len(), 3);
    assert!(restored.components[2].is_none());

    {
        let guard = restored.components[1].as_ref().unwrap().read().unwrap();
        let joint = downcast_ref::<SliderJoint>(guard.as_ref()).unwrap();
        assert_eq!(joint.limit.spring.stiffness, 100.0);
        let body = joint.body_a.as_ref().unwrap().read().unwrap();
        assert_eq!(
            downcast_ref::<SphereCollider>(body.as_ref()).unwrap().radius,
            2.0
        );
    }

    // Re-serializing the restored graph yields the same bytes.
    assert_eq!(serializer.serialize(&restored).unwrap(), bytes);
}

#[test]
fn test_null_pointer_is_zero_type_id() {
    let serializer = serializer();
    let node = Node {
        label: "tail".to_string(),
        next: None,
    };
    let bytes = serializer.serialize(&node).unwrap();

    // header(6) type(4) levels(1) level id(4) field count(2), then field 0
    // label: id(2) kind(1) len(4) tag(1) strlen(4) "tail"(4), then field 1
    let next_payload = 6 + 4 + 1 + 4 + 2 + (2 + 1 + 4 + 1 + 4 + 4) + (2 + 1 + 4);
    assert_eq!(&bytes[next_payload..], &0u32.to_le_bytes());

    let restored: Node = serializer.deserialize_as(&bytes).unwrap();
    assert!(restored.next.is_none());
    assert_eq!(restored.label, "tail");
}

#[test]
fn test_base_fields_restored_before_derived() {
    let serializer = serializer();
    let mut sphere = SphereCollider::default();
    sphere.collider.component.game_object.name = "wheel".to_string();
    sphere.collider.layer = 9;

    let bytes = serializer.serialize(&sphere).unwrap();
    let root = rtti_core::serialization::inspect::inspect(&bytes)
        .unwrap()
        .unwrap();
    let levels: Vec<RttiId> = root.levels.iter().map(|level| level.type_id).collect();
    assert_eq!(
        levels,
        vec![
            GameObject::RTTI_ID,
            rtti_core::types::engine_types::Component::RTTI_ID,
            rtti_core::types::engine_types::Collider::RTTI_ID,
            SphereCollider::RTTI_ID
        ]
    );

    let restored = serializer.deserialize(&bytes).unwrap();
    let restored = rtti_core::types::cast_ref::<GameObject>(restored.as_ref()).unwrap();
    assert_eq!(restored.name, "wheel");
}

#[test]
fn test_repeated_registration_is_idempotent() {
    let registry = Arc::new(TypeRegistry::new());
    register_engine_types(&registry).unwrap();
    let first = registry.resolve(Spring::RTTI_ID).unwrap();
    register_engine_types(&registry).unwrap();
    let second = registry.resolve(Spring::RTTI_ID).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 11);
}

#[test]
fn test_unregistered_root_type() {
    let serializer = Serializer::new(Arc::new(TypeRegistry::new()));
    let err = serializer.serialize(&Spring::default()).unwrap_err();
    assert!(matches!(err, RttiError::UnknownType { type_id } if type_id == Spring::RTTI_ID));
}

#[timeout(10000)]
#[test]
fn test_concurrent_serialization_shares_registry() {
    let serializer = Arc::new(serializer());
    let mut handles = Vec::new();
    for thread_index in 0..8u32 {
        let serializer = Arc::clone(&serializer);
        handles.push(thread::spawn(move || {
            for i in 0..200u32 {
                let mut sphere = SphereCollider::default();
                sphere.collider.layer = u64::from(thread_index * 1000 + i);
                let bytes = serializer.serialize(&sphere).unwrap();
                let restored: SphereCollider = serializer.deserialize_as(&bytes).unwrap();
                assert_eq!(restored, sphere);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[timeout(10000)]
#[test]
fn test_concurrent_first_resolution() {
    let registry = Arc::new(TypeRegistry::new());
    register_engine_types(&registry).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.chain(SliderJoint::RTTI_ID).unwrap())
        })
        .collect();
    let chains: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for chain in &chains[1..] {
        assert!(Arc::ptr_eq(chain, &chains[0]));
    }
}
