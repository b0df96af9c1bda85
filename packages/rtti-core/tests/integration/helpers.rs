//! Shared fixtures: test-only reflectable types and registry setup.

use std::sync::Arc;

use rtti_core::types::{register_engine_types, RttiDescriptor, RttiId, RttiType, SharedObject};
use rtti_core::{RttiConfig, Serializer, TypeRegistry};

/// Linked node used to build chains and cycles.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub label: String,
    pub next: Option<SharedObject>,
}

rtti_core::reflectable!(Node, Node::RTTI_ID);

impl RttiType for Node {
    const RTTI_ID: RttiId = RttiId(5000);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Node", Self::RTTI_ID, Node::default)
            .plain(0, "label", |n| &n.label, |n| &mut n.label)
            .pointer(1, "next", |n| &n.next, |n| &mut n.next)
            .build()
    }
}

/// Holds a reference whose type may be missing from the loading registry.
#[derive(Debug, Clone, Default)]
pub struct Holder {
    pub target: Option<SharedObject>,
    pub items: Vec<Option<SharedObject>>,
    pub count: u32,
}

rtti_core::reflectable!(Holder, Holder::RTTI_ID);

impl RttiType for Holder {
    const RTTI_ID: RttiId = RttiId(5200);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Holder", Self::RTTI_ID, Holder::default)
            .pointer(0, "target", |h| &h.target, |h| &mut h.target)
            .pointer_array(1, "items", |h| &h.items, |h| &mut h.items)
            .plain(2, "count", |h| &h.count, |h| &mut h.count)
            .build()
    }
}

/// First shipped layout of the widget type.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetV1 {
    pub width: u32,
    pub label: String,
    pub weight: f32,
}

impl Default for WidgetV1 {
    fn default() -> Self {
        Self {
            width: 10,
            label: "widget".to_string(),
            weight: 1.0,
        }
    }
}

rtti_core::reflectable!(WidgetV1, WidgetV1::RTTI_ID);

impl RttiType for WidgetV1 {
    const RTTI_ID: RttiId = RttiId(5100);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Widget", Self::RTTI_ID, WidgetV1::default)
            .plain(0, "width", |w| &w.width, |w| &mut w.width)
            .plain(1, "label", |w| &w.label, |w| &mut w.label)
            .plain(2, "weight", |w| &w.weight, |w| &mut w.weight)
            .build()
    }
}

/// Later layout: `weight` removed, `color` added.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetV2 {
    pub width: u32,
    pub label: String,
    pub color: [f32; 4],
}

impl Default for WidgetV2 {
    fn default() -> Self {
        Self {
            width: 10,
            label: "widget".to_string(),
            color: [1.0; 4],
        }
    }
}

rtti_core::reflectable!(WidgetV2, WidgetV2::RTTI_ID);

impl RttiType for WidgetV2 {
    const RTTI_ID: RttiId = RttiId(5100);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Widget", Self::RTTI_ID, WidgetV2::default)
            .plain(0, "width", |w| &w.width, |w| &mut w.width)
            .plain(1, "label", |w| &w.label, |w| &mut w.label)
            .plain(3, "color", |w| &w.color, |w| &mut w.color)
            .build()
    }
}

/// Incompatible layout: `width` changed element type, `label` changed kind.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetV3 {
    pub width: f64,
    pub label: Vec<String>,
}

impl Default for WidgetV3 {
    fn default() -> Self {
        Self {
            width: -1.0,
            label: Vec::new(),
        }
    }
}

rtti_core::reflectable!(WidgetV3, WidgetV3::RTTI_ID);

impl RttiType for WidgetV3 {
    const RTTI_ID: RttiId = RttiId(5100);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Widget", Self::RTTI_ID, WidgetV3::default)
            .plain(0, "width", |w| &w.width, |w| &mut w.width)
            .plain_array(1, "label", |w| &w.label, |w| &mut w.label)
            .build()
    }
}

/// Registry with the engine types plus `Node` and `Holder`.
pub fn full_registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    register_engine_types(&registry).unwrap();
    registry.register_type::<Node>().unwrap();
    registry.register_type::<Holder>().unwrap();
    registry
}

pub fn serializer() -> Serializer {
    Serializer::new(full_registry())
}

pub fn serializer_with(config: RttiConfig) -> Serializer {
    Serializer::with_config(full_registry(), config)
}

/// Serializer whose registry knows only `T`.
pub fn single_type_serializer<T: RttiType>(config: RttiConfig) -> Serializer {
    let registry = Arc::new(TypeRegistry::new());
    registry.register_type::<T>().unwrap();
    Serializer::with_config(registry, config)
}
