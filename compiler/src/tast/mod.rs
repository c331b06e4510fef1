//! Typed declarations and the type loader
//!
//! The loader turns module syntax into declarations, resolves type paths
//! against the current scope, instantiates generics, builds anonymous
//! structures and checks that classes conform to their parents. Work that may
//! depend on declarations not built yet is queued on a [`scheduler::PassScheduler`]
//! and run pass by pass.

pub mod id_types;
pub mod errors;
pub mod core;
pub mod symbols;
pub mod core_types;
pub mod monomorph;
pub mod scheduler;
pub mod context;
pub mod namespace;
pub mod type_resolution;
pub mod generic_instantiation;
pub mod structure_builder;
pub mod typeload_module;
pub mod class_builder;
pub mod class_fields;
pub mod unify;
pub mod conformance;
pub mod final_vars;
pub mod type_diagnostics;
pub mod expression_typer;

#[cfg(test)]
mod tests;

pub use id_types::*;
pub use context::{BuildScope, TypeloadConfig, TypeloadContext};
pub use core::{AnonStatus, AnonType, FunArg, Type};
pub use errors::{BuildCancelled, TypeloadError, TypeloadErrorKind, TypeloadResult, UnifyCause, UnifyError};
pub use namespace::{MemoryLoader, ModuleLoader, ModulePath};
pub use scheduler::Pass;
pub use symbols::{
    BuildState, ClassDecl, ClassFlags, ClassKind, DeclKind, Declaration, Field, FieldFlags, FieldKind,
    MethodKind, TypeParam, TypeParamHost, TypePath, VarAccess,
};
