//! Core type representation
//!
//! Types are plain values that refer to arena entries by id: declarations, anonymous
//! structures, monomorphs and lazy cells all live in [`TypeloadContext`] tables, so a
//! type can name a declaration that has not been built yet and cyclic graphs stay
//! cheap to clone.
//!
//! Derived `PartialEq` is identity equality on those ids. Structural comparison that
//! looks through monomorphs and lazy cells is [`TypeloadContext::type_iseq`].
//!
//! [`TypeloadContext`]: super::context::TypeloadContext
//! [`TypeloadContext::type_iseq`]: super::context::TypeloadContext::type_iseq

use super::context::TypeloadContext;
use super::symbols::{ClassKind, DeclKind, Field};
use super::{AnonId, DeclId, LazyId, MonoId};
use indexmap::IndexMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Class or interface instance. Type parameters are classes too, so a
    /// parameter `T` in scope is `Instance { decl: <T>, params: [] }`.
    Instance { decl: DeclId, params: Vec<Type> },
    Enum { decl: DeclId, params: Vec<Type> },
    Typedef { decl: DeclId, params: Vec<Type> },
    Abstract { decl: DeclId, params: Vec<Type> },
    Anonymous(AnonId),
    Function { args: Vec<FunArg>, ret: Box<Type> },
    Dynamic(Option<Box<Type>>),
    Mono(MonoId),
    Lazy(LazyId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunArg {
    pub name: String,
    pub optional: bool,
    pub ty: Type,
}

impl FunArg {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            optional: false,
            ty,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl Type {
    pub fn dynamic() -> Self {
        Type::Dynamic(None)
    }

    pub fn instance(decl: DeclId, params: Vec<Type>) -> Self {
        Type::Instance { decl, params }
    }

    pub fn function(args: Vec<FunArg>, ret: Type) -> Self {
        Type::Function {
            args,
            ret: Box::new(ret),
        }
    }

    /// Declaration this type names, for the nominal variants
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            Type::Instance { decl, .. }
            | Type::Enum { decl, .. }
            | Type::Typedef { decl, .. }
            | Type::Abstract { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    pub fn params(&self) -> &[Type] {
        match self {
            Type::Instance { params, .. }
            | Type::Enum { params, .. }
            | Type::Typedef { params, .. }
            | Type::Abstract { params, .. } => params,
            _ => &[],
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// Calls `f` on every directly nested type
    pub fn iter_children(&self, mut f: impl FnMut(&Type)) {
        match self {
            Type::Instance { params, .. }
            | Type::Enum { params, .. }
            | Type::Typedef { params, .. }
            | Type::Abstract { params, .. } => params.iter().for_each(f),
            Type::Function { args, ret } => {
                args.iter().for_each(|a| f(&a.ty));
                f(ret);
            }
            Type::Dynamic(Some(inner)) => f(inner),
            Type::Dynamic(None) | Type::Anonymous(_) | Type::Mono(_) | Type::Lazy(_) => {}
        }
    }
}

/// Status of an anonymous structure
#[derive(Debug, Clone, PartialEq)]
pub enum AnonStatus {
    Closed,
    /// Built by extending the listed structures
    Extend(Vec<Type>),
    /// Fields are still being collected
    Building,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonType {
    pub fields: IndexMap<String, Field>,
    pub status: AnonStatus,
}

impl AnonType {
    pub fn closed(fields: IndexMap<String, Field>) -> Self {
        Self {
            fields,
            status: AnonStatus::Closed,
        }
    }
}

/// Renders types the way Haxe error messages print them
pub struct TypePrinter<'a> {
    ctx: &'a TypeloadContext,
    depth: usize,
}

const MAX_PRINT_DEPTH: usize = 32;

impl<'a> TypePrinter<'a> {
    pub fn new(ctx: &'a TypeloadContext) -> Self {
        Self { ctx, depth: 0 }
    }

    pub fn print(&mut self, t: &Type) -> String {
        let mut out = String::new();
        self.write_type(&mut out, t);
        out
    }

    fn write_type(&mut self, out: &mut String, t: &Type) {
        if self.depth > MAX_PRINT_DEPTH {
            out.push_str("...");
            return;
        }
        self.depth += 1;
        match t {
            Type::Instance { decl, params } => {
                let d = self.ctx.decl(*decl);
                match &d.kind {
                    DeclKind::Class(c) if matches!(c.kind, ClassKind::TypeParameter { .. }) => {
                        out.push_str(&d.path.name)
                    }
                    DeclKind::Class(c) if matches!(c.kind, ClassKind::ExprLiteral(_)) => {
                        out.push_str(&d.path.name)
                    }
                    _ => self.write_path(out, *decl, params),
                }
            }
            Type::Enum { decl, params }
            | Type::Typedef { decl, params }
            | Type::Abstract { decl, params } => self.write_path(out, *decl, params),
            Type::Anonymous(id) => {
                let anon = self.ctx.anon(*id);
                if anon.fields.is_empty() {
                    out.push_str("{}");
                } else {
                    out.push_str("{ ");
                    for (i, (name, field)) in anon.fields.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "{} : ", name);
                        self.write_type(out, &field.ty);
                    }
                    out.push_str(" }");
                }
            }
            Type::Function { args, ret } => {
                if args.is_empty() {
                    out.push_str("Void");
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" -> ");
                    }
                    if arg.optional {
                        out.push('?');
                    }
                    if arg.ty.is_function() {
                        out.push('(');
                        self.write_type(out, &arg.ty);
                        out.push(')');
                    } else {
                        self.write_type(out, &arg.ty);
                    }
                }
                out.push_str(" -> ");
                self.write_type(out, ret);
            }
            Type::Dynamic(None) => out.push_str("Dynamic"),
            Type::Dynamic(Some(inner)) => {
                out.push_str("Dynamic<");
                self.write_type(out, inner);
                out.push('>');
            }
            Type::Mono(id) => match self.ctx.monos.bound(*id) {
                Some(bound) => {
                    let bound = bound.clone();
                    self.write_type(out, &bound)
                }
                None => {
                    let _ = write!(out, "Unknown<{}>", id.as_raw());
                }
            },
            Type::Lazy(id) => match self.ctx.lazies.forced_value(*id) {
                Some(value) => {
                    let value = value.clone();
                    self.write_type(out, &value)
                }
                None => {
                    let _ = write!(out, "Lazy<{}>", id.as_raw());
                }
            },
        }
        self.depth -= 1;
    }

    fn write_path(&mut self, out: &mut String, decl: DeclId, params: &[Type]) {
        out.push_str(&self.ctx.decl(decl).path.to_string());
        if !params.is_empty() {
            out.push('<');
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_type(out, p);
            }
            out.push('>');
        }
    }
}
