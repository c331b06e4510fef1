//! Class builds: heritage first, then fields
//!
//! A build that needs a parent which is not built yet cancels itself. Everything
//! it changed on the class is rolled back and the build is queued again on the
//! build-class pass.

use super::context::TypeloadContext;
use super::core::Type;
use super::errors::{BuildCancelled, TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::scheduler::Pass;
use super::symbols::BuildState;
use super::DeclId;
use crate::error_codes;
use crate::syntax::{ClassSyntax, HeritageClause, MetaEntry, TypePathHint};
use source_map::SourceSpan;
use std::rc::Rc;

pub const META_AUTO_BUILD: &str = ":autoBuild";
pub const META_BUILD: &str = ":build";
pub const META_HACK: &str = ":hack";

/// Work left over from a heritage clause, run once the parent is built
#[derive(Debug, Clone, PartialEq)]
pub struct HeritageAction {
    pub target: DeclId,
    pub span: SourceSpan,
}

impl HeritageAction {
    /// Requires the parent to be built, then inherits its `@:autoBuild` macros
    pub fn run(&self, ctx: &mut TypeloadContext, owner: DeclId) -> Result<(), BuildCancelled> {
        match ctx.ensure_built(self.target) {
            BuildState::Built => {}
            state => {
                return Err(BuildCancelled {
                    decl: self.target,
                    state,
                })
            }
        }
        let inherited: Vec<MetaEntry> = ctx
            .decl(self.target)
            .meta
            .iter()
            .filter(|m| m.name == META_AUTO_BUILD)
            .cloned()
            .collect();
        let owner = ctx.decl_mut(owner);
        for entry in inherited {
            owner.meta.push(MetaEntry {
                name: META_BUILD.to_string(),
                ..entry.clone()
            });
            owner.meta.push(entry);
        }
        Ok(())
    }
}

impl TypeloadContext {
    pub(crate) fn build_class(&mut self, decl: DeclId, syntax: &ClassSyntax) {
        let mark = self.diagnostics.len();
        let saved_meta = self.decl(decl).meta.clone();
        self.decl_mut(decl).build_state = BuildState::Building(smallvec::smallvec![decl]);

        let scope = self.scope_for_decl(decl);
        let result = self.with_scope(scope, |ctx| {
            let actions = ctx.set_heritage(decl, &syntax.heritage);
            for action in &actions {
                action.run(ctx, decl)?;
            }
            ctx.init_class_fields(decl, &syntax.fields);
            Ok::<(), BuildCancelled>(())
        });

        let cancel = match result {
            Ok(()) => {
                self.decl_mut(decl).build_state = BuildState::Built;
                self.schedule_class_checks(decl);
                return;
            }
            Err(cancel) => cancel,
        };

        self.diagnostics.truncate(mark);
        self.decl_mut(decl).meta = saved_meta;
        if let Some(class) = self.class_mut(decl) {
            class.super_class = None;
            class.implements.clear();
            class.array_access = None;
            class.dynamic = None;
        }

        let attempts = {
            let n = self.build_attempts.entry(decl).or_insert(0);
            *n += 1;
            *n
        };
        if attempts >= self.config.max_build_retries {
            let d = self.decl(decl);
            let err = TypeloadError::new(
                TypeloadErrorKind::BuildRetriesExhausted {
                    path: d.path.to_string(),
                    dependency: self.decl(cancel.decl).path.to_string(),
                },
                d.span,
            );
            self.decl_mut(decl).build_state = BuildState::Built;
            self.report(err);
            return;
        }
        log::debug!(
            "build of {} cancelled by {} ({:?})",
            self.decl(decl).path,
            self.decl(cancel.decl).path,
            cancel.state
        );
        self.decl_mut(decl).build_state = BuildState::NotYetBuilt;
        self.scheduler.delay(Pass::BuildClass, move |ctx| {
            ctx.ensure_built(decl);
        });
    }

    /// Connects `decl` to its parents. Each clause is checked on its own, so one
    /// bad clause does not hide the others.
    pub fn set_heritage(&mut self, decl: DeclId, clauses: &[HeritageClause]) -> Vec<HeritageAction> {
        let mut actions = Vec::new();
        for clause in clauses {
            let (hint, extends) = match clause {
                HeritageClause::Extends(h) => (h, true),
                HeritageClause::Implements(h) => (h, false),
            };
            let t = match self.load_type_path(hint, false) {
                Ok(t) => t,
                Err(err) if self.config.display_mode => {
                    log::warn!("skipping unresolved parent {}: {}", hint, err);
                    self.report_warning(
                        error_codes::SKIPPED_HERITAGE,
                        format!("Skipping unresolved parent {}: {}", hint, err.kind),
                        hint.span,
                    );
                    continue;
                }
                Err(err) => {
                    self.report(err);
                    continue;
                }
            };
            let result = if extends {
                self.check_extends(decl, hint, &t)
            } else {
                self.check_implements(decl, hint, &t)
            };
            match result {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(err) => self.report(err),
            }
        }
        actions
    }

    fn check_extends(&mut self, decl: DeclId, hint: &TypePathHint, t: &Type) -> TypeloadResult<Option<HeritageAction>> {
        let span = hint.span;
        let (target, params) = match self.follow(t) {
            Type::Instance { decl, params } => (decl, params),
            _ => return Err(TypeloadError::new(TypeloadErrorKind::ExtendNonClass, span)),
        };
        if self.decl(target).is_type_parameter() {
            return Err(TypeloadError::new(TypeloadErrorKind::ExtendTypeParameter, span));
        }
        if self.is_parent(decl, target) {
            return Err(TypeloadError::new(TypeloadErrorKind::RecursiveClass, span));
        }
        let Some(parent) = self.class(target) else {
            return Err(TypeloadError::new(TypeloadErrorKind::ExtendNonClass, span));
        };
        let parent_final = parent.is_final();
        let parent_extern = parent.is_extern();
        let parent_interface = parent.is_interface();
        let (owner_interface, owner_extern, has_super) = match self.class(decl) {
            Some(c) => (c.is_interface(), c.is_extern(), c.super_class.is_some()),
            None => return Ok(None),
        };

        if parent_final && !(parent_extern && self.decl(decl).has_meta(META_HACK)) {
            return Err(TypeloadError::new(
                TypeloadErrorKind::ExtendFinalClass {
                    path: self.decl(target).path.to_string(),
                },
                span,
            ));
        }
        if self.std.is_basic_class(target) && !(owner_extern && parent_extern) {
            return Err(TypeloadError::new(
                TypeloadErrorKind::ExtendBasicClass {
                    path: self.decl(target).path.to_string(),
                },
                span,
            ));
        }

        if owner_interface {
            if !parent_interface {
                return Err(TypeloadError::new(TypeloadErrorKind::ExtendWithClass, span));
            }
            if let Some(class) = self.class_mut(decl) {
                class.implements.push((target, params));
            }
        } else {
            if parent_interface {
                return Err(TypeloadError::new(TypeloadErrorKind::ExtendWithInterface, span));
            }
            if has_super {
                return Err(TypeloadError::new(TypeloadErrorKind::MultipleSuperclasses, span));
            }
            if let Some(class) = self.class_mut(decl) {
                class.super_class = Some((target, params));
            }
        }
        Ok(Some(HeritageAction { target, span }))
    }

    fn check_implements(
        &mut self,
        decl: DeclId,
        hint: &TypePathHint,
        t: &Type,
    ) -> TypeloadResult<Option<HeritageAction>> {
        let span = hint.span;
        let followed = self.follow(t);
        let (owner_interface, owner_extern) = match self.class(decl) {
            Some(c) => (c.is_interface(), c.is_extern()),
            None => return Ok(None),
        };

        if let Type::Dynamic(inner) = &followed {
            if !owner_extern {
                return Err(TypeloadError::new(TypeloadErrorKind::ImplementsDynamicOnNonExtern, span));
            }
            let value = inner.as_deref().cloned().unwrap_or_else(Type::dynamic);
            let Some(class) = self.class_mut(decl) else {
                return Ok(None);
            };
            if class.dynamic.is_some() {
                return Err(TypeloadError::new(TypeloadErrorKind::MultipleDynamic, span));
            }
            class.dynamic = Some(value);
            return Ok(None);
        }

        let (target, params) = match followed {
            Type::Instance { decl, params } => (decl, params),
            _ => return Err(TypeloadError::new(TypeloadErrorKind::ImplementNonInterface, span)),
        };

        if target == self.std.array_access {
            let element = params.first().cloned().unwrap_or_else(Type::dynamic);
            let Some(class) = self.class_mut(decl) else {
                return Ok(None);
            };
            if class.array_access.is_some() {
                return Err(TypeloadError::new(TypeloadErrorKind::DuplicateArrayAccess, span));
            }
            class.array_access = Some(element);
            return Ok(None);
        }

        if owner_interface {
            return Err(TypeloadError::new(TypeloadErrorKind::InterfaceImplements, span));
        }
        match self.class(target) {
            Some(c) if c.is_interface() => {}
            Some(_) => return Err(TypeloadError::new(TypeloadErrorKind::ImplementWithClass, span)),
            None => return Err(TypeloadError::new(TypeloadErrorKind::ImplementNonInterface, span)),
        }
        if self.is_parent(decl, target) {
            return Err(TypeloadError::new(TypeloadErrorKind::RecursiveClass, span));
        }

        let schedule = match self.class_mut(decl) {
            Some(class) => {
                class.implements.push((target, params));
                !std::mem::replace(&mut class.interface_check_scheduled, true)
            }
            None => false,
        };
        if schedule {
            self.delay_retrying(
                Pass::ConnectField,
                decl,
                Rc::new(move |ctx: &mut TypeloadContext| ctx.check_interfaces(decl)),
            );
        }
        Ok(Some(HeritageAction { target, span }))
    }
}
