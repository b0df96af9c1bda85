//! Streams written by one build and read by another with a changed schema.

use rtti_core::types::engine_types::Spring;
use rtti_core::types::{downcast_ref, share, RttiType};
use rtti_core::{RttiConfig, RttiError, UnknownTypePolicy};

use super::helpers::{
    serializer, serializer_with, single_type_serializer, Holder, Node, WidgetV1, WidgetV2,
    WidgetV3,
};

#[test]
fn test_removed_field_is_skipped_and_added_field_defaults() {
    let writer = single_type_serializer::<WidgetV1>(RttiConfig::default());
    let reader = single_type_serializer::<WidgetV2>(RttiConfig::default());

    let old = WidgetV1 {
        width: 42,
        label: "knob".to_string(),
        weight: 3.5,
    };
    let bytes = writer.serialize(&old).unwrap();
    let loaded: WidgetV2 = reader.deserialize_as(&bytes).unwrap();

    assert_eq!(loaded.width, 42);
    assert_eq!(loaded.label, "knob");
    assert_eq!(loaded.color, [1.0; 4]);
}

#[test]
fn test_newer_stream_loads_in_older_build() {
    let writer = single_type_serializer::<WidgetV2>(RttiConfig::default());
    let reader = single_type_serializer::<WidgetV1>(RttiConfig::default());

    let new = WidgetV2 {
        width: 7,
        label: "dial".to_string(),
        color: [0.5, 0.5, 0.5, 1.0],
    };
    let bytes = writer.serialize(&new).unwrap();
    let loaded: WidgetV1 = reader.deserialize_as(&bytes).unwrap();

    assert_eq!(loaded.width, 7);
    assert_eq!(loaded.label, "dial");
    assert_eq!(loaded.weight, WidgetV1::default().weight);
}

#[test]
fn test_kind_change_skipped_when_lenient() {
    let writer = single_type_serializer::<WidgetV1>(RttiConfig::default());
    let reader = single_type_serializer::<WidgetV3>(RttiConfig::default());

    let bytes = writer.serialize(&WidgetV1::default()).unwrap();
    let loaded: WidgetV3 = reader.deserialize_as(&bytes).unwrap();
    assert_eq!(loaded, WidgetV3::default());
}

#[test]
fn test_kind_change_fails_when_strict() {
    let writer = single_type_serializer::<WidgetV1>(RttiConfig::default());
    let reader = single_type_serializer::<WidgetV3>(RttiConfig {
        strict_field_kinds: true,
        ..Default::default()
    });

    let bytes = writer.serialize(&WidgetV1::default()).unwrap();
    let err = reader.deserialize(&bytes).unwrap_err();
    match err {
        RttiError::FieldTypeMismatch {
            type_id, field_id, ..
        } => {
            assert_eq!(type_id, WidgetV3::RTTI_ID);
            assert_eq!(field_id.0, 0);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unknown_nested_type_reports_field_path() {
    let holder = Holder {
        target: Some(share(Node::default())),
        items: Vec::new(),
        count: 3,
    };
    let bytes = serializer().serialize(&holder).unwrap();

    let reader = single_type_serializer::<Holder>(RttiConfig::default());
    let err = reader.deserialize(&bytes).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        RttiError::UnknownType { type_id } if *type_id == Node::RTTI_ID
    ));
    let path: Vec<(u32, u16)> = err
        .field_path()
        .into_iter()
        .map(|(type_id, field_id)| (type_id.0, field_id.0))
        .collect();
    assert_eq!(path, vec![(Holder::RTTI_ID.0, 0)]);
}

#[test]
fn test_unknown_nested_type_substituted_with_null() {
    let holder = Holder {
        target: Some(share(Node::default())),
        items: vec![
            Some(share(Node::default())),
            None,
            Some(share(Holder::default())),
        ],
        count: 9,
    };
    let bytes = serializer().serialize(&holder).unwrap();

    let reader = single_type_serializer::<Holder>(RttiConfig {
        unknown_type_policy: UnknownTypePolicy::SubstituteNull,
        ..Default::default()
    });
    let loaded: Holder = reader.deserialize_as(&bytes).unwrap();
    assert!(loaded.target.is_none());
    assert_eq!(loaded.count, 9);
    assert_eq!(loaded.items.len(), 3);
    assert!(loaded.items[0].is_none());
    assert!(loaded.items[1].is_none());
    let kept = loaded.items[2].as_ref().unwrap().read().unwrap();
    assert!(downcast_ref::<Holder>(kept.as_ref()).is_some());
}

#[test]
fn test_unknown_root_type_fails_under_any_policy() {
    let bytes = serializer().serialize(&Node::default()).unwrap();
    let reader = single_type_serializer::<Holder>(RttiConfig {
        unknown_type_policy: UnknownTypePolicy::SubstituteNull,
        ..Default::default()
    });
    assert!(matches!(
        reader.deserialize(&bytes),
        Err(RttiError::UnknownType { .. })
    ));
}

#[test]
fn test_corrupted_payload_length_is_rejected() {
    let serializer = serializer_with(RttiConfig::default());
    let spring = Spring {
        stiffness: 4.0,
        damping: 0.5,
    };
    let mut bytes = serializer.serialize(&spring).unwrap();
    // Inflate the payload length of the first field past the end of the stream.
    let len_at = 6 + 4 + 1 + 4 + 2 + 2 + 1;
    bytes[len_at..len_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        serializer.deserialize(&bytes),
        Err(RttiError::Truncated { .. })
    ));
}

