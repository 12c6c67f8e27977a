//! Declarative generation of [`Bean`](crate::Bean) implementations
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

/// Implement [`Bean`](crate::Bean) and [`FieldValue`](crate::FieldValue) for a struct
///
/// Three shapes are supported, mirroring how a type is populated:
///
/// ```
/// use beanmorph_core::bean;
///
/// // No-argument construction (`Default`) followed by setters
/// #[derive(Debug, Clone, Default, PartialEq)]
/// pub struct UserDto { pub id: i64, pub name: String }
/// bean!(mutable UserDto { id: i64, name: String });
///
/// // All fields through one constructor, in declaration order
/// #[derive(Debug, Clone, PartialEq)]
/// pub struct Point { pub x: i32, pub y: i32 }
/// bean!(immutable Point { x: i32, y: i32 });
///
/// // Some fields through the constructor, the rest through setters
/// #[derive(Debug, Clone, Default, PartialEq)]
/// pub struct Account { pub id: i64, pub owner: String }
/// bean!(hybrid Account { constructor { id: i64 } setters { owner: String } });
/// ```
///
/// The struct must be `Clone`; `mutable` and `hybrid` also need `Default`.
#[macro_export]
macro_rules! bean {
    (mutable $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        impl $crate::Bean for $name {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::builder::<$name>(stringify!($name))
                    .default_constructor()
                    $(
                        .property::<$ty>(
                            stringify!($field),
                            |bean| &bean.$field,
                            |bean, value| bean.$field = value,
                        )
                    )*
                    .build()
            }

            fn type_ref(&self) -> $crate::TypeRef {
                $crate::TypeRef::of::<$name>()
            }
        }

        $crate::impl_field_value!($name);
    };

    (immutable $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        impl $crate::Bean for $name {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::builder::<$name>(stringify!($name))
                    .constructor(
                        ::std::vec![$($crate::ParamInfo::named::<$ty>(stringify!($field))),*],
                        |args| ::std::result::Result::Ok($name {
                            $($field: args.next::<$ty>()?,)*
                        }),
                    )
                    $(
                        .read_only::<$ty>(stringify!($field), |bean| &bean.$field)
                    )*
                    .build()
            }

            fn type_ref(&self) -> $crate::TypeRef {
                $crate::TypeRef::of::<$name>()
            }
        }

        $crate::impl_field_value!($name);
    };

    (hybrid $name:ident {
        constructor { $($cfield:ident : $cty:ty),* $(,)? }
        setters { $($sfield:ident : $sty:ty),* $(,)? }
    }) => {
        impl $crate::Bean for $name {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::builder::<$name>(stringify!($name))
                    .constructor(
                        ::std::vec![$($crate::ParamInfo::named::<$cty>(stringify!($cfield))),*],
                        |args| ::std::result::Result::Ok($name {
                            $($cfield: args.next::<$cty>()?,)*
                            ..::std::default::Default::default()
                        }),
                    )
                    $(
                        .read_only::<$cty>(stringify!($cfield), |bean| &bean.$cfield)
                    )*
                    $(
                        .property::<$sty>(
                            stringify!($sfield),
                            |bean| &bean.$sfield,
                            |bean, value| bean.$sfield = value,
                        )
                    )*
                    .build()
            }

            fn type_ref(&self) -> $crate::TypeRef {
                $crate::TypeRef::of::<$name>()
            }
        }

        $crate::impl_field_value!($name);
    };
}

#[cfg(test)]
mod tests {
    use crate::transform::shape::{analyze, ConstructionKind};
    use crate::{Bean, TypeRef};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Mutable {
        id: i64,
        tags: Vec<String>,
    }
    bean!(mutable Mutable { id: i64, tags: Vec<String> });

    #[derive(Debug, Clone, PartialEq)]
    struct Immutable {
        x: i32,
        y: Option<i32>,
    }
    bean!(immutable Immutable { x: i32, y: Option<i32> });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Hybrid {
        id: u32,
        name: String,
    }
    bean!(hybrid Hybrid { constructor { id: u32 } setters { name: String } });

    #[test]
    fn test_generated_shapes() {
        let kind = |t: TypeRef| analyze(t).map(|shape| shape.kind());
        assert_eq!(kind(TypeRef::of::<Mutable>()).ok(), Some(ConstructionKind::Mutable));
        assert_eq!(kind(TypeRef::of::<Immutable>()).ok(), Some(ConstructionKind::Immutable));
        assert_eq!(kind(TypeRef::of::<Hybrid>()).ok(), Some(ConstructionKind::Hybrid));
    }

    #[test]
    fn test_generated_tables() {
        let info = Hybrid::type_info();
        assert_eq!(info.properties.len(), 2);
        assert_eq!(info.constructors.len(), 1);
        assert_eq!(info.constructors[0].params[0].name.as_deref(), Some("id"));
        assert!(!info.properties[0].is_writable());
        assert!(info.properties[1].is_writable());
    }
}
