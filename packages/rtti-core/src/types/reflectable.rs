/// Implements [`Reflectable`](crate::types::Reflectable) for a type.
///
/// ```ignore
/// reflectable!(SphereCollider, SphereCollider::RTTI_ID, base = collider);
/// ```
#[macro_export]
macro_rules! reflectable {
    ($ty:ty, $id:expr) => {
        impl $crate::types::Reflectable for $ty {
            fn rtti_id(&self) -> $crate::types::RttiId {
                $id
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
    ($ty:ty, $id:expr, base = $base:ident) => {
        impl $crate::types::Reflectable for $ty {
            fn rtti_id(&self) -> $crate::types::RttiId {
                $id
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }

            fn rtti_base(&self) -> ::std::option::Option<&dyn $crate::types::Reflectable> {
                ::std::option::Option::Some(&self.$base)
            }

            fn rtti_base_mut(
                &mut self,
            ) -> ::std::option::Option<&mut dyn $crate::types::Reflectable> {
                ::std::option::Option::Some(&mut self.$base)
            }
        }
    };
}
