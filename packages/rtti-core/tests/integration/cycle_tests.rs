//! Back-references in object graphs must fail fast instead of recursing.

use ntest::timeout;

use rtti_core::types::{downcast_mut, share, RttiType};
use rtti_core::RttiError;

use super::helpers::{serializer, Node};

fn link(from: &rtti_core::SharedObject, to: &rtti_core::SharedObject) {
    let mut guard = from.write().unwrap();
    downcast_mut::<Node>(guard.as_mut()).unwrap().next = Some(to.clone());
}

#[timeout(5000)]
#[test]
fn test_self_reference_is_detected() {
    let node = share(Node {
        label: "loop".to_string(),
        next: None,
    });
    link(&node, &node);

    let err = serializer().serialize_shared(&node).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        RttiError::CyclicGraph { type_id } if *type_id == Node::RTTI_ID
    ));

    // Break the cycle so the nodes can be dropped.
    let mut guard = node.write().unwrap();
    downcast_mut::<Node>(guard.as_mut()).unwrap().next = None;
}

#[timeout(5000)]
#[test]
fn test_longer_cycle_is_detected() {
    let a = share(Node::default());
    let b = share(Node::default());
    let c = share(Node::default());
    link(&a, &b);
    link(&b, &c);
    link(&c, &a);

    let err = serializer().serialize_shared(&a).unwrap_err();
    assert!(matches!(err.root_cause(), RttiError::CyclicGraph { .. }));
    assert_eq!(err.field_path().len(), 3);

    // A cycle that does not pass through the root is found as well.
    let root = Node {
        label: "entry".to_string(),
        next: Some(b.clone()),
    };
    assert!(matches!(
        serializer().serialize(&root).unwrap_err().root_cause(),
        RttiError::CyclicGraph { .. }
    ));

    let mut guard = c.write().unwrap();
    downcast_mut::<Node>(guard.as_mut()).unwrap().next = None;
}

#[timeout(5000)]
#[test]
fn test_cycle_is_detected_in_text_rendering() {
    let node = share(Node::default());
    link(&node, &node);
    let holder = rtti_core::types::engine_types::SceneObject {
        children: vec![Some(node.clone())],
        ..Default::default()
    };

    assert!(matches!(
        serializer().to_json(&holder).unwrap_err().root_cause(),
        RttiError::CyclicGraph { .. }
    ));

    let mut guard = node.write().unwrap();
    downcast_mut::<Node>(guard.as_mut()).unwrap().next = None;
}

#[test]
fn test_long_acyclic_chain_serializes() {
    let mut head: Option<rtti_core::SharedObject> = None;
    for i in 0..100 {
        head = Some(share(Node {
            label: format!("n{}", i),
            next: head,
        }));
    }
    let head = head.unwrap();
    let bytes = serializer().serialize_shared(&head).unwrap();
    let restored: Node = serializer().deserialize_as(&bytes).unwrap();
    assert_eq!(restored.label, "n99");
}
