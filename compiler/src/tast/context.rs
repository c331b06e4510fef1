//! The type loading context
//!
//! Every table the loader touches lives here and is passed explicitly by `&mut`
//! through resolution, instantiation and the deferred checks. The scheduler queues
//! closures over this context, so "run this later" never needs global state.

use super::core::{AnonType, Type};
use super::core_types::{self, StdTypes};
use super::errors::{BuildCancelled, TypeloadError, TypeloadErrorKind};
use super::expression_typer::{ExpressionTyper, LiteralTyper};
use super::monomorph::{LazyProgress, LazyTable, MonomorphTable};
use super::namespace::{MemoryLoader, ModuleLoader, ModuleTable};
use super::scheduler::{Pass, PassScheduler};
use super::symbols::{ClassDecl, DeclKind, Declaration, TypeParam};
use super::{AnonId, DeclId, LazyId, ModuleId};
use diagnostics::Diagnostics;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Tunables for a type loading session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeloadConfig {
    /// How many times a cancelled check is retried before it is reported
    pub max_build_retries: u32,
    /// Completion/display queries: unresolved heritage is skipped instead of reported
    pub display_mode: bool,
    /// Root package that may be dropped when a qualified module is missing
    pub std_root: String,
    pub check_final_vars: bool,
    /// Compilation flags that satisfy `@:require(flag)`
    pub defines: Vec<String>,
}

impl Default for TypeloadConfig {
    fn default() -> Self {
        Self {
            max_build_retries: 16,
            display_mode: false,
            std_root: "std".to_string(),
            check_final_vars: true,
            defines: Vec::new(),
        }
    }
}

/// Ambient state for whatever is being built right now
#[derive(Debug, Clone, Default)]
pub struct BuildScope {
    pub module: Option<ModuleId>,
    pub decl: Option<DeclId>,
    /// Type parameters in scope, innermost last
    pub type_params: Vec<TypeParam>,
    /// Whether arbitrary expressions may be passed as type arguments
    pub allow_expressions: bool,
}

impl BuildScope {
    pub fn find_type_param(&self, name: &str) -> Option<&TypeParam> {
        self.type_params.iter().rev().find(|p| p.name == name)
    }
}

/// A check that may be cancelled and retried while its dependencies build
pub type RetryableCheck = Rc<dyn Fn(&mut TypeloadContext) -> Result<(), BuildCancelled>>;

const MAX_FOLLOW_DEPTH: usize = 128;

pub struct TypeloadContext {
    pub config: TypeloadConfig,
    pub decls: Vec<Declaration>,
    pub modules: ModuleTable,
    pub monos: MonomorphTable,
    pub lazies: LazyTable,
    pub anons: Vec<AnonType>,
    pub scheduler: PassScheduler,
    pub diagnostics: Diagnostics,
    pub scope: BuildScope,
    pub std: StdTypes,
    pub(crate) loader: Box<dyn ModuleLoader>,
    pub(crate) typer: Box<dyn ExpressionTyper>,
    pub(crate) unify_stack: Vec<(Type, Type)>,
    /// Cancelled class builds so far, per class
    pub(crate) build_attempts: FxHashMap<DeclId, u32>,
}

impl TypeloadContext {
    pub fn new(config: TypeloadConfig) -> Self {
        Self::with_loader(config, Box::new(MemoryLoader::new()))
    }

    pub fn with_loader(config: TypeloadConfig, loader: Box<dyn ModuleLoader>) -> Self {
        let mut decls = Vec::new();
        let mut modules = ModuleTable::new();
        let std = core_types::register_std_types(&mut decls, &mut modules);
        log::debug!("typeload context ready with {} builtin declarations", decls.len());
        Self {
            config,
            decls,
            modules,
            monos: MonomorphTable::new(),
            lazies: LazyTable::new(),
            anons: Vec::new(),
            scheduler: PassScheduler::new(),
            diagnostics: Diagnostics::new(),
            scope: BuildScope::default(),
            std,
            loader,
            typer: Box::new(LiteralTyper),
            unify_stack: Vec::new(),
            build_attempts: FxHashMap::default(),
        }
    }

    pub fn with_typer(mut self, typer: Box<dyn ExpressionTyper>) -> Self {
        self.typer = typer;
        self
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.decls[id.index()]
    }

    pub fn class(&self, id: DeclId) -> Option<&ClassDecl> {
        self.decl(id).as_class()
    }

    pub fn class_mut(&mut self, id: DeclId) -> Option<&mut ClassDecl> {
        self.decl_mut(id).as_class_mut()
    }

    pub fn add_decl(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId::from_index(self.decls.len());
        self.decls.push(decl);
        id
    }

    pub fn anon(&self, id: AnonId) -> &AnonType {
        &self.anons[id.index()]
    }

    pub fn anon_mut(&mut self, id: AnonId) -> &mut AnonType {
        &mut self.anons[id.index()]
    }

    pub fn add_anon(&mut self, anon: AnonType) -> Type {
        let id = AnonId::from_index(self.anons.len());
        self.anons.push(anon);
        Type::Anonymous(id)
    }

    /// Runs `f` with `scope` installed, restoring the previous scope afterwards
    pub fn with_scope<R>(&mut self, scope: BuildScope, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    pub fn scope_for_decl(&self, decl: DeclId) -> BuildScope {
        let d = self.decl(decl);
        BuildScope {
            module: Some(d.module),
            decl: Some(decl),
            type_params: d.params.clone(),
            allow_expressions: false,
        }
    }

    /// Creates a lazy cell evaluated in the current scope and queues it for forcing
    pub fn make_lazy(
        &mut self,
        stand_in: Type,
        thunk: impl FnOnce(&mut TypeloadContext) -> Result<Type, TypeloadError> + 'static,
    ) -> Type {
        let scope = self.scope.clone();
        let id = self.lazies.create(
            Box::new(move |ctx: &mut TypeloadContext| ctx.with_scope(scope, thunk)),
            stand_in,
        );
        self.scheduler.delay(Pass::Force, move |ctx| {
            ctx.force_lazy(id);
        });
        Type::Lazy(id)
    }

    /// Evaluates a lazy cell. Errors from the thunk are reported and memoized as `Dynamic`.
    pub fn force_lazy(&mut self, id: LazyId) -> Type {
        match self.lazies.begin_forcing(id) {
            LazyProgress::Ready(t) | LazyProgress::InProgress(t) => t,
            LazyProgress::Run { thunk, stand_in } => {
                let value = match thunk(self) {
                    Ok(t) => t,
                    Err(err) => {
                        self.report(err);
                        Type::dynamic()
                    }
                };
                self.lazies.finish(id, value.clone());
                // Anything that captured the stand-in while the thunk ran now sees the result
                if let Type::Mono(mono) = stand_in {
                    if !self.monos.is_bound(mono) && value != stand_in {
                        let _ = self.monos.bind(mono, value.clone());
                    }
                }
                value
            }
        }
    }

    /// Looks through bound monomorphs and lazy cells, stopping at typedefs
    pub fn follow_mono(&mut self, t: &Type) -> Type {
        let mut current = t.clone();
        for _ in 0..MAX_FOLLOW_DEPTH {
            let next = match &current {
                Type::Mono(id) => self.monos.bound(*id).cloned(),
                Type::Lazy(id) => Some(self.force_lazy(*id)),
                _ => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }

    /// Looks through monomorphs, lazy cells and typedefs
    pub fn follow(&mut self, t: &Type) -> Type {
        let mut current = t.clone();
        for _ in 0..MAX_FOLLOW_DEPTH {
            let next = match &current {
                Type::Mono(id) => self.monos.bound(*id).cloned(),
                Type::Lazy(id) => Some(self.force_lazy(*id)),
                Type::Typedef { decl, params } => {
                    let target = self.typedef_target(*decl);
                    let decl_params = self.decl(*decl).params.clone();
                    Some(self.apply_params(&decl_params, params, &target))
                }
                _ => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
        log::warn!("type chain too deep to follow: {:?}", current);
        current
    }

    fn typedef_target(&mut self, decl: DeclId) -> Type {
        self.ensure_built(decl);
        match &self.decl(decl).kind {
            DeclKind::Typedef(t) => t.target.clone().unwrap_or_else(Type::dynamic),
            _ => Type::dynamic(),
        }
    }

    /// Substitutes `args` for the declared `params` inside `t`
    pub fn apply_params(&mut self, params: &[TypeParam], args: &[Type], t: &Type) -> Type {
        if params.is_empty() {
            return t.clone();
        }
        let map: Vec<(DeclId, Type)> = params
            .iter()
            .zip(args)
            .map(|(p, a)| (p.decl, a.clone()))
            .collect();
        self.substitute(&map, t)
    }

    pub fn substitute(&mut self, map: &[(DeclId, Type)], t: &Type) -> Type {
        if map.is_empty() {
            return t.clone();
        }
        match t {
            Type::Instance { decl, params } if params.is_empty() => map
                .iter()
                .find(|(d, _)| d == decl)
                .map(|(_, a)| a.clone())
                .unwrap_or_else(|| t.clone()),
            Type::Instance { decl, params } => Type::Instance {
                decl: *decl,
                params: self.substitute_all(map, params),
            },
            Type::Enum { decl, params } => Type::Enum {
                decl: *decl,
                params: self.substitute_all(map, params),
            },
            Type::Typedef { decl, params } => Type::Typedef {
                decl: *decl,
                params: self.substitute_all(map, params),
            },
            Type::Abstract { decl, params } => Type::Abstract {
                decl: *decl,
                params: self.substitute_all(map, params),
            },
            Type::Function { args, ret } => {
                let args = args
                    .iter()
                    .map(|a| super::core::FunArg {
                        name: a.name.clone(),
                        optional: a.optional,
                        ty: self.substitute(map, &a.ty),
                    })
                    .collect();
                let ret = self.substitute(map, ret);
                Type::function(args, ret)
            }
            Type::Dynamic(Some(inner)) => Type::Dynamic(Some(Box::new(self.substitute(map, inner)))),
            Type::Dynamic(None) => t.clone(),
            Type::Mono(id) => match self.monos.bound(*id).cloned() {
                Some(bound) => self.substitute(map, &bound),
                None => t.clone(),
            },
            Type::Lazy(id) => {
                let forced = self.force_lazy(*id);
                self.substitute(map, &forced)
            }
            Type::Anonymous(id) => {
                let anon = self.anon(*id).clone();
                let mut changed = false;
                let mut fields = anon.fields.clone();
                for field in fields.values_mut() {
                    let ty = self.substitute(map, &field.ty);
                    if ty != field.ty {
                        field.ty = ty;
                        changed = true;
                    }
                }
                if changed {
                    self.add_anon(AnonType {
                        fields,
                        status: anon.status,
                    })
                } else {
                    t.clone()
                }
            }
        }
    }

    fn substitute_all(&mut self, map: &[(DeclId, Type)], types: &[Type]) -> Vec<Type> {
        types.iter().map(|t| self.substitute(map, t)).collect()
    }

    /// Runs queued work for every pass up to and including `until`
    pub fn flush_pass(&mut self, until: Pass) {
        while let Some((pass, task)) = self.scheduler.next_task(until) {
            log::trace!("running delayed task in pass {}", pass);
            task(self);
        }
    }

    pub fn run_all(&mut self) {
        self.flush_pass(Pass::Final);
    }

    /// Queues `check` on `pass`. When it cancels, diagnostics it emitted are rolled
    /// back and it is queued again at the back of the same pass, up to the
    /// configured retry bound.
    pub fn delay_retrying(&mut self, pass: Pass, owner: DeclId, check: RetryableCheck) {
        self.schedule_attempt(pass, owner, check, 0);
    }

    fn schedule_attempt(&mut self, pass: Pass, owner: DeclId, check: RetryableCheck, attempt: u32) {
        self.scheduler.delay(pass, move |ctx| {
            let mark = ctx.diagnostics.len();
            if let Err(cancel) = check(ctx) {
                ctx.diagnostics.truncate(mark);
                if attempt + 1 >= ctx.config.max_build_retries {
                    let d = ctx.decl(owner);
                    let err = TypeloadError::new(
                        TypeloadErrorKind::BuildRetriesExhausted {
                            path: d.path.to_string(),
                            dependency: ctx.decl(cancel.decl).path.to_string(),
                        },
                        d.span,
                    );
                    ctx.report(err);
                } else {
                    log::debug!(
                        "check on {} cancelled by {} ({:?}), retry {}",
                        ctx.decl(owner).path,
                        ctx.decl(cancel.decl).path,
                        cancel.state,
                        attempt + 1
                    );
                    ctx.schedule_attempt(pass, owner, check, attempt + 1);
                }
            }
        });
    }

    pub fn type_to_string(&self, t: &Type) -> String {
        super::core::TypePrinter::new(self).print(t)
    }
}

impl std::fmt::Debug for TypeloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeloadContext")
            .field("config", &self.config)
            .field("decls", &self.decls.len())
            .field("modules", &self.modules.len())
            .field("monos", &self.monos.len())
            .field("lazies", &self.lazies.len())
            .field("scheduler", &self.scheduler)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tast::errors::TypeloadError;
    use std::cell::RefCell;

    #[test]
    fn test_config_defaults() {
        let config = TypeloadConfig::default();
        assert_eq!(config.max_build_retries, 16);
        assert_eq!(config.std_root, "std");
        assert!(!config.display_mode);

        let parsed: TypeloadConfig = serde_json::from_str(r#"{ "display_mode": true }"#).unwrap();
        assert!(parsed.display_mode);
        assert_eq!(parsed.max_build_retries, 16);
    }

    #[test]
    fn test_lazy_error_is_reported_and_memoized() {
        let mut ctx = TypeloadContext::new(TypeloadConfig::default());
        let t = ctx.make_lazy(Type::dynamic(), |_| {
            Err(TypeloadError::custom("broken", source_map::SourceSpan::unknown()))
        });
        assert_eq!(ctx.follow(&t), Type::dynamic());
        assert_eq!(ctx.follow(&t), Type::dynamic());
        assert_eq!(ctx.diagnostics.len(), 1);
    }

    #[test]
    fn test_retrying_check_gives_up() {
        let mut ctx = TypeloadContext::new(TypeloadConfig {
            max_build_retries: 3,
            ..TypeloadConfig::default()
        });
        let owner = ctx.std.string;
        let attempts = Rc::new(RefCell::new(0));
        let counter = attempts.clone();
        ctx.delay_retrying(
            Pass::ConnectField,
            owner,
            Rc::new(move |_ctx: &mut TypeloadContext| {
                *counter.borrow_mut() += 1;
                Err(BuildCancelled {
                    decl: owner,
                    state: Default::default(),
                })
            }),
        );
        ctx.run_all();
        assert_eq!(*attempts.borrow(), 3);
        assert_eq!(ctx.diagnostics.len(), 1);
        let message = &ctx.diagnostics.iter().next().unwrap().message;
        assert_eq!(message, "Could not finish building String: String never completed its build");
    }
}
