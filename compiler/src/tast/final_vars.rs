//! Initialization of `final` instance vars
//!
//! A final var without an initializer must be assigned somewhere in the
//! constructor through `this.<name> = ...`. Assignments are found by a plain walk
//! of the constructor body; control flow is not taken into account.

use super::context::TypeloadContext;
use super::errors::{TypeloadError, TypeloadErrorKind};
use super::symbols::{Field, FieldFlags, FieldKind};
use super::DeclId;
use crate::syntax::{Binop, Constant, Expr, ExprKind, FieldKindSyntax, TypeDeclSyntax};
use fxhash::FxHashSet;

impl TypeloadContext {
    /// Final vars of `decl` still waiting for an initial value
    pub fn pending_final_vars(&self, decl: DeclId) -> Vec<Field> {
        let Some(class) = self.class(decl) else {
            return Vec::new();
        };
        class
            .fields
            .values()
            .filter(|f| {
                f.has_flag(FieldFlags::FINAL)
                    && matches!(f.kind, FieldKind::Var { .. })
                    && !f.has_expr
                    && !f.has_flag(FieldFlags::STATIC)
                    && !f.has_flag(FieldFlags::EXTERN)
            })
            .cloned()
            .collect()
    }

    /// Reports each pending final var that `body` never assigns
    pub fn check_final_vars(&mut self, decl: DeclId, body: &Expr) {
        let pending = self.pending_final_vars(decl);
        if pending.is_empty() {
            return;
        }
        let mut assigned = FxHashSet::default();
        collect_this_assignments(body, &mut assigned);
        for field in pending {
            if !assigned.contains(field.name.as_str()) {
                self.report(TypeloadError::new(
                    TypeloadErrorKind::UninitializedFinal { field: field.name.clone() },
                    field.span,
                ));
            }
        }
    }

    /// Final var check for a whole class: needs a constructor when any final var
    /// lacks an initializer
    pub fn check_class_final_vars(&mut self, decl: DeclId) {
        let pending = self.pending_final_vars(decl);
        if pending.is_empty() {
            return;
        }
        match self.constructor_body(decl) {
            Some(body) => self.check_final_vars(decl, &body),
            None => {
                let span = self.decl(decl).span;
                let err = pending.iter().fold(
                    TypeloadError::new(TypeloadErrorKind::FinalVarsWithoutConstructor, span),
                    |err, field| err.with_related(format!("Uninitialized final var {}", field.name), field.span),
                );
                self.report(err);
            }
        }
    }

    fn constructor_body(&self, decl: DeclId) -> Option<Expr> {
        let class = self.class(decl)?;
        class.constructor.as_ref()?;
        let syntax = self.decl(decl).syntax.as_ref()?;
        let TypeDeclSyntax::Class(c) = &**syntax else {
            return None;
        };
        c.fields.iter().find_map(|f| match &f.kind {
            FieldKindSyntax::Fun(fun) if f.name == super::class_fields::CONSTRUCTOR_NAME => {
                Some(fun.body.clone().unwrap_or_else(|| Expr::block(Vec::new())))
            }
            _ => None,
        })
    }
}

fn collect_this_assignments<'a>(expr: &'a Expr, assigned: &mut FxHashSet<&'a str>) {
    if let ExprKind::Binop(Binop::Assign, target, _) = &expr.kind {
        if let ExprKind::Field(receiver, name) = &target.kind {
            if matches!(&receiver.kind, ExprKind::Const(Constant::Ident(id)) if id == "this") {
                assigned.insert(name.as_str());
            }
        }
    }
    expr.iter_children(|child| collect_this_assignments(child, assigned));
}
