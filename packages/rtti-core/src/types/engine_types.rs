//! Reflection declarations for engine object types.
//!
//! Each type declares its id, its embedded base part and its fields. Field
//! ids are scoped to the declaring type and must never be reused for a
//! different meaning once assets referencing them exist.

use super::descriptor::RttiDescriptor;
use super::type_registry::TypeRegistry;
use super::{RttiId, RttiType, SharedObject};
use crate::error::RttiError;

/// Base of every object placed in a scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameObject {
    pub name: String,
    pub instance_id: u64,
}

crate::reflectable!(GameObject, GameObject::RTTI_ID);

impl RttiType for GameObject {
    const RTTI_ID: RttiId = RttiId(1000);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("GameObject", Self::RTTI_ID, GameObject::default)
            .plain(0, "name", |o| &o.name, |o| &mut o.name)
            .plain(1, "instance_id", |o| &o.instance_id, |o| &mut o.instance_id)
            .script_hidden()
            .build()
    }
}

/// Behaviour attached to a scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub game_object: GameObject,
    pub enabled: bool,
}

impl Default for Component {
    fn default() -> Self {
        Self {
            game_object: GameObject::default(),
            enabled: true,
        }
    }
}

crate::reflectable!(Component, Component::RTTI_ID, base = game_object);

impl RttiType for Component {
    const RTTI_ID: RttiId = RttiId(1001);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Component", Self::RTTI_ID, Component::default)
            .base(GameObject::RTTI_ID)
            .plain(0, "enabled", |c| &c.enabled, |c| &mut c.enabled)
            .build()
    }
}

/// Physics collision shape shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub component: Component,
    pub is_trigger: bool,
    pub mass: f32,
    pub layer: u64,
    pub contact_offset: f32,
    pub rest_offset: f32,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            component: Component::default(),
            is_trigger: false,
            mass: 1.0,
            layer: 1,
            contact_offset: 0.02,
            rest_offset: 0.0,
        }
    }
}

crate::reflectable!(Collider, Collider::RTTI_ID, base = component);

impl RttiType for Collider {
    const RTTI_ID: RttiId = RttiId(1002);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Collider", Self::RTTI_ID, Collider::default)
            .base(Component::RTTI_ID)
            .plain(0, "is_trigger", |c| &c.is_trigger, |c| &mut c.is_trigger)
            .plain(1, "mass", |c| &c.mass, |c| &mut c.mass)
            .plain(2, "layer", |c| &c.layer, |c| &mut c.layer)
            .plain(3, "contact_offset", |c| &c.contact_offset, |c| &mut c.contact_offset)
            .plain(4, "rest_offset", |c| &c.rest_offset, |c| &mut c.rest_offset)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereCollider {
    pub collider: Collider,
    pub radius: f32,
    pub center: [f32; 3],
}

impl Default for SphereCollider {
    fn default() -> Self {
        Self {
            collider: Collider::default(),
            radius: 1.0,
            center: [0.0; 3],
        }
    }
}

crate::reflectable!(SphereCollider, SphereCollider::RTTI_ID, base = collider);

impl RttiType for SphereCollider {
    const RTTI_ID: RttiId = RttiId(1003);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("SphereCollider", Self::RTTI_ID, SphereCollider::default)
            .base(Collider::RTTI_ID)
            .plain(0, "radius", |s| &s.radius, |s| &mut s.radius)
            .plain(1, "center", |s| &s.center, |s| &mut s.center)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxCollider {
    pub collider: Collider,
    pub extents: [f32; 3],
    pub center: [f32; 3],
}

impl Default for BoxCollider {
    fn default() -> Self {
        Self {
            collider: Collider::default(),
            extents: [1.0; 3],
            center: [0.0; 3],
        }
    }
}

crate::reflectable!(BoxCollider, BoxCollider::RTTI_ID, base = collider);

impl RttiType for BoxCollider {
    const RTTI_ID: RttiId = RttiId(1004);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("BoxCollider", Self::RTTI_ID, BoxCollider::default)
            .base(Collider::RTTI_ID)
            .plain(0, "extents", |b| &b.extents, |b| &mut b.extents)
            .plain(1, "center", |b| &b.center, |b| &mut b.center)
            .build()
    }
}

/// Spring pulling joint bodies back towards a limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spring {
    pub stiffness: f32,
    pub damping: f32,
}

crate::reflectable!(Spring, Spring::RTTI_ID);

impl RttiType for Spring {
    const RTTI_ID: RttiId = RttiId(1010);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("Spring", Self::RTTI_ID, Spring::default)
            .plain(0, "stiffness", |s| &s.stiffness, |s| &mut s.stiffness)
            .plain(1, "damping", |s| &s.damping, |s| &mut s.damping)
            .build()
    }
}

/// Joint limit between two distances. `lower` must not exceed `upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitLinearRange {
    pub lower: f32,
    pub upper: f32,
    /// Distance from the limit at which it activates, -1 for the default
    pub contact_dist: f32,
    pub restitution: f32,
    pub spring: Spring,
}

impl Default for LimitLinearRange {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
            contact_dist: -1.0,
            restitution: 0.0,
            spring: Spring::default(),
        }
    }
}

crate::reflectable!(LimitLinearRange, LimitLinearRange::RTTI_ID);

impl RttiType for LimitLinearRange {
    const RTTI_ID: RttiId = RttiId(1011);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("LimitLinearRange", Self::RTTI_ID, LimitLinearRange::default)
            .plain(0, "lower", |l| &l.lower, |l| &mut l.lower)
            .plain(1, "upper", |l| &l.upper, |l| &mut l.upper)
            .plain(2, "contact_dist", |l| &l.contact_dist, |l| &mut l.contact_dist)
            .plain(3, "restitution", |l| &l.restitution, |l| &mut l.restitution)
            .value(4, "spring", |l| &l.spring, |l| &mut l.spring)
            .build()
    }
}

/// Joint constraining two bodies to move along one axis.
#[derive(Debug, Clone, Default)]
pub struct SliderJoint {
    pub component: Component,
    pub body_a: Option<SharedObject>,
    pub body_b: Option<SharedObject>,
    pub limit: LimitLinearRange,
    pub enable_limit: bool,
}

crate::reflectable!(SliderJoint, SliderJoint::RTTI_ID, base = component);

impl RttiType for SliderJoint {
    const RTTI_ID: RttiId = RttiId(1012);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("SliderJoint", Self::RTTI_ID, SliderJoint::default)
            .base(Component::RTTI_ID)
            .pointer(0, "body_a", |j| &j.body_a, |j| &mut j.body_a)
            .pointer(1, "body_b", |j| &j.body_b, |j| &mut j.body_b)
            .value(2, "limit", |j| &j.limit, |j| &mut j.limit)
            .plain(3, "enable_limit", |j| &j.enable_limit, |j| &mut j.enable_limit)
            .build()
    }
}

/// Node of the scene hierarchy.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub game_object: GameObject,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub tags: Vec<String>,
    pub children: Vec<Option<SharedObject>>,
    pub components: Vec<Option<SharedObject>>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            game_object: GameObject::default(),
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            tags: Vec::new(),
            children: Vec::new(),
            components: Vec::new(),
        }
    }
}

crate::reflectable!(SceneObject, SceneObject::RTTI_ID, base = game_object);

impl RttiType for SceneObject {
    const RTTI_ID: RttiId = RttiId(1020);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("SceneObject", Self::RTTI_ID, SceneObject::default)
            .base(GameObject::RTTI_ID)
            .plain(0, "position", |s| &s.position, |s| &mut s.position)
            .plain(1, "rotation", |s| &s.rotation, |s| &mut s.rotation)
            .plain(2, "scale", |s| &s.scale, |s| &mut s.scale)
            .plain_array(3, "tags", |s| &s.tags, |s| &mut s.tags)
            .pointer_array(4, "children", |s| &s.children, |s| &mut s.children)
            .pointer_array(5, "components", |s| &s.components, |s| &mut s.components)
            .build()
    }
}

/// GUI toggle button.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiToggle {
    pub text: String,
    pub on: bool,
}

crate::reflectable!(GuiToggle, GuiToggle::RTTI_ID);

impl RttiType for GuiToggle {
    const RTTI_ID: RttiId = RttiId(1030);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("GUIToggle", Self::RTTI_ID, GuiToggle::default)
            .plain(0, "text", |t| &t.text, |t| &mut t.text)
            .plain(1, "on", |t| &t.on, |t| &mut t.on)
            .build()
    }
}

/// Group of toggles where at most one may be on.
#[derive(Debug, Clone, Default)]
pub struct GuiToggleGroup {
    pub allow_all_off: bool,
    pub toggles: Vec<Option<SharedObject>>,
}

crate::reflectable!(GuiToggleGroup, GuiToggleGroup::RTTI_ID);

impl RttiType for GuiToggleGroup {
    const RTTI_ID: RttiId = RttiId(1031);

    fn rtti_descriptor() -> RttiDescriptor {
        RttiDescriptor::builder("GUIToggleGroup", Self::RTTI_ID, GuiToggleGroup::default)
            .plain(0, "allow_all_off", |g| &g.allow_all_off, |g| &mut g.allow_all_off)
            .pointer_array(1, "toggles", |g| &g.toggles, |g| &mut g.toggles)
            .build()
    }
}

/// Registers every engine type declared in this module.
pub fn register_engine_types(registry: &TypeRegistry) -> Result<(), RttiError> {
    registry.register_type::<GameObject>()?;
    registry.register_type::<Component>()?;
    registry.register_type::<Collider>()?;
    registry.register_type::<SphereCollider>()?;
    registry.register_type::<BoxCollider>()?;
    registry.register_type::<Spring>()?;
    registry.register_type::<LimitLinearRange>()?;
    registry.register_type::<SliderJoint>()?;
    registry.register_type::<SceneObject>()?;
    registry.register_type::<GuiToggle>()?;
    registry.register_type::<GuiToggleGroup>()?;
    Ok(())
}
