//! Identifier types for the type loader's arenas
//!
//! Declarations, modules, monomorphs, lazy types and anonymous structures all
//! live in arenas owned by the `TypeloadContext`. Edges between them (super
//! class, implemented interfaces, instance-of) are these copyable ids rather than
//! owning pointers, so a declaration can be referenced before it is built and
//! cycle detection is a walk over indices.

use std::fmt;

/// Macro to define ID types with consistent behavior
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u32 {
                self.0
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id_type! {
    /// A class, interface, typedef, enum or abstract declaration.
    ///
    /// Type parameters and constant generic arguments are declarations too, of
    /// class kind `TypeParameter` / `ExprLiteral`.
    DeclId
}

define_id_type! {
    /// A loaded module
    ModuleId
}

define_id_type! {
    /// A single-assignment placeholder type
    MonoId
}

define_id_type! {
    /// A memoized thunk producing a type on first demand
    LazyId
}

define_id_type! {
    /// An anonymous structure's field table and status
    AnonId
}
