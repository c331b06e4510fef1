//! Module registration and the build driver
//!
//! Registering a module only creates declaration shells and their type
//! parameters. Bodies are built on demand through [`TypeloadContext::ensure_built`]
//! or, failing that, by the tasks queued on the build passes.

use super::context::TypeloadContext;
use super::core::{FunArg, Type};
use super::errors::{TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::namespace::{Module, ModulePath};
use super::scheduler::Pass;
use super::symbols::{
    AbstractDecl, BuildState, ClassDecl, ClassFlags, ClassKind, DeclKind, Declaration, EnumConstructor,
    EnumDecl, FieldFlags, TypeParam, TypeParamHost, TypePath, TypedefDecl,
};
use super::{DeclId, ModuleId};
use crate::error_codes;
use crate::syntax::{
    AbstractSyntax, EnumSyntax, ModuleSyntax, TypeDeclSyntax, TypeHint, TypeParamSyntax, TypedefSyntax,
};
use source_map::SourceSpan;
use std::rc::Rc;

pub const META_GENERIC: &str = ":generic";
pub const META_GENERIC_BUILD: &str = ":genericBuild";
pub const META_CONST: &str = ":const";

impl TypeloadContext {
    /// Adds a module and shells for its declarations, and queues their builds
    pub fn register_module(&mut self, syntax: ModuleSyntax) -> ModuleId {
        let ModuleSyntax {
            pack,
            name,
            imports,
            decls,
        } = syntax;
        let mut module = Module::new(ModulePath::new(pack.clone(), name));
        module.import_syntax = imports;
        let id = self.modules.add(module);

        let mut registered = Vec::with_capacity(decls.len());
        for decl in decls {
            let duplicate = self
                .modules
                .get(id)
                .decls
                .iter()
                .any(|d| self.decl(*d).path.name == decl.name());
            if duplicate {
                let err = TypeloadError::new(
                    TypeloadErrorKind::DuplicateType {
                        name: decl.name().to_string(),
                    },
                    decl.span(),
                );
                self.report(err);
                continue;
            }
            let decl_id = self.register_decl(id, &pack, decl);
            self.modules.get_mut(id).decls.push(decl_id);
            registered.push(decl_id);
        }

        for decl in registered {
            let Some(syntax) = self.decl(decl).syntax.clone() else {
                continue;
            };
            let owner = self.decl(decl).path.clone();
            let scope = self.scope_for_decl(decl);
            let params = self.with_scope(scope, |ctx| {
                ctx.create_type_params(&owner, syntax.params(), TypeParamHost::Type)
            });
            self.decl_mut(decl).params = params;

            let pass = match &*syntax {
                TypeDeclSyntax::Class(_) => Pass::BuildClass,
                _ => Pass::BuildModule,
            };
            self.scheduler.delay(pass, move |ctx| {
                ctx.ensure_built(decl);
            });
        }
        log::debug!(
            "registered module {} with {} declarations",
            self.modules.get(id).path,
            self.modules.get(id).decls.len()
        );
        id
    }

    fn register_decl(&mut self, module: ModuleId, pack: &[String], syntax: TypeDeclSyntax) -> DeclId {
        let path = TypePath::new(pack.to_vec(), syntax.name());
        let kind = match &syntax {
            TypeDeclSyntax::Class(c) => {
                let mut flags = ClassFlags::NONE;
                if c.flags.interface {
                    flags.insert(ClassFlags::INTERFACE);
                }
                if c.flags.abstract_ {
                    flags.insert(ClassFlags::ABSTRACT);
                }
                if c.flags.extern_ {
                    flags.insert(ClassFlags::EXTERN);
                }
                if c.flags.final_ {
                    flags.insert(ClassFlags::FINAL);
                }
                let kind = if c.meta.iter().any(|m| m.name == META_GENERIC_BUILD) {
                    ClassKind::GenericBuild
                } else if c.meta.iter().any(|m| m.name == META_GENERIC) {
                    ClassKind::GenericDefinition
                } else {
                    ClassKind::Normal
                };
                DeclKind::Class(ClassDecl::new(flags, kind))
            }
            TypeDeclSyntax::Typedef(_) => DeclKind::Typedef(TypedefDecl::default()),
            TypeDeclSyntax::Enum(_) => DeclKind::Enum(EnumDecl::default()),
            TypeDeclSyntax::Abstract(_) => DeclKind::Abstract(AbstractDecl::default()),
        };

        let mut decl = Declaration::new(path.clone(), module, kind);
        decl.span = syntax.span();
        decl.private = syntax.is_private();
        decl.meta = syntax.meta().to_vec();
        let impl_fields = matches!(&syntax, TypeDeclSyntax::Abstract(a) if !a.fields.is_empty());
        decl.syntax = Some(Rc::new(syntax));
        let id = self.add_decl(decl);

        if impl_fields {
            let mut impl_decl = Declaration::new(
                TypePath::new(path.pack.clone(), format!("{}_Impl_", path.name)),
                module,
                DeclKind::Class(ClassDecl::new(ClassFlags::NONE, ClassKind::AbstractImpl(id))),
            );
            impl_decl.private = true;
            impl_decl.span = self.decl(id).span;
            let impl_id = self.add_decl(impl_decl);
            if let DeclKind::Abstract(a) = &mut self.decl_mut(id).kind {
                a.impl_class = Some(impl_id);
            }
        }
        id
    }

    /// Creates the parameter declarations for `owner`. Constraints and defaults
    /// are lazy and see every parameter of the list.
    pub fn create_type_params(
        &mut self,
        owner: &TypePath,
        syntax: &[TypeParamSyntax],
        host: TypeParamHost,
    ) -> Vec<TypeParam> {
        let module = self.scope.module.unwrap_or(self.std.module);
        let mut pack = owner.pack.clone();
        pack.push(owner.name.clone());

        let mut params: Vec<TypeParam> = Vec::with_capacity(syntax.len());
        for p in syntax {
            if params.iter().any(|q| q.name == p.name) {
                let err = TypeloadError::new(
                    TypeloadErrorKind::DuplicateTypeParameter { name: p.name.clone() },
                    p.span,
                );
                self.report(err);
            }
            let mut decl = Declaration::new(
                TypePath::new(pack.clone(), p.name.clone()),
                module,
                DeclKind::Class(ClassDecl::new(
                    ClassFlags::NONE,
                    ClassKind::TypeParameter {
                        constraints: Vec::new(),
                    },
                )),
            );
            decl.span = p.span;
            decl.meta = p.meta.clone();
            decl.build_state = BuildState::Built;
            let id = self.add_decl(decl);
            params.push(TypeParam {
                name: p.name.clone(),
                decl: id,
                ty: Type::instance(id, Vec::new()),
                default: None,
                host,
                is_const: p.meta.iter().any(|m| m.name == META_CONST),
                span: p.span,
            });
        }

        let mut scope = self.scope.clone();
        scope.type_params.extend(params.iter().cloned());
        self.with_scope(scope, |ctx| {
            for (tp, p) in params.iter_mut().zip(syntax) {
                let mut constraints = Vec::new();
                for hint in &p.constraints {
                    match hint {
                        TypeHint::Intersection(parts) => {
                            constraints.extend(parts.iter().map(|part| ctx.lazy_hint(part.clone())));
                        }
                        other => constraints.push(ctx.lazy_hint(other.clone())),
                    }
                }
                if let Some(ClassKind::TypeParameter { constraints: slot }) =
                    ctx.class_mut(tp.decl).map(|c| &mut c.kind)
                {
                    *slot = constraints;
                }

                if let Some(default) = &p.default {
                    if host == TypeParamHost::Type {
                        tp.default = Some(ctx.lazy_hint(default.clone()));
                    } else {
                        let err = TypeloadError::new(
                            TypeloadErrorKind::DefaultTypeParameterNotAllowed { name: p.name.clone() },
                            p.span,
                        );
                        ctx.report(err);
                    }
                }
            }
        });
        params
    }

    /// A hint loaded on first use; failures report and read as `Dynamic`
    fn lazy_hint(&mut self, hint: TypeHint) -> Type {
        self.make_lazy(Type::dynamic(), move |ctx| ctx.load_complex_type(&hint))
    }

    /// Builds `decl` if nobody has started it yet and returns its resulting state
    pub fn ensure_built(&mut self, decl: DeclId) -> BuildState {
        match &self.decl(decl).build_state {
            BuildState::NotYetBuilt => {}
            state => return state.clone(),
        }
        let Some(syntax) = self.decl(decl).syntax.clone() else {
            self.decl_mut(decl).build_state = BuildState::Built;
            return BuildState::Built;
        };
        log::trace!("building {}", self.decl(decl).path);
        match &*syntax {
            TypeDeclSyntax::Class(c) => self.build_class(decl, c),
            TypeDeclSyntax::Typedef(t) => self.build_typedef(decl, t),
            TypeDeclSyntax::Enum(e) => self.build_enum(decl, e),
            TypeDeclSyntax::Abstract(a) => self.build_abstract(decl, a),
        }
        self.decl(decl).build_state.clone()
    }

    fn build_typedef(&mut self, decl: DeclId, syntax: &TypedefSyntax) {
        let scope = self.scope_for_decl(decl);
        let hint = syntax.target.clone();
        let target = self.with_scope(scope, |ctx| {
            // A typedef reached again while its target loads sees the unbound stand-in
            let stand_in = ctx.monos.fresh();
            ctx.make_lazy(stand_in, move |ctx| ctx.load_complex_type(&hint))
        });
        let d = self.decl_mut(decl);
        d.kind = DeclKind::Typedef(TypedefDecl { target: Some(target) });
        d.build_state = BuildState::Built;
    }

    fn build_enum(&mut self, decl: DeclId, syntax: &EnumSyntax) {
        self.decl_mut(decl).build_state = BuildState::Building(smallvec::smallvec![decl]);
        let scope = self.scope_for_decl(decl);
        let enum_params: Vec<Type> = self.decl(decl).params.iter().map(|p| p.ty.clone()).collect();
        let owner = self.decl(decl).path.clone();
        let enum_type = Type::Enum {
            decl,
            params: enum_params,
        };

        let constructors = self.with_scope(scope, |ctx| {
            let mut constructors = indexmap::IndexMap::new();
            for ctor in &syntax.constructors {
                if constructors.contains_key(&ctor.name) {
                    let err = TypeloadError::new(
                        TypeloadErrorKind::DuplicateClassField { name: ctor.name.clone() },
                        ctor.span,
                    );
                    ctx.report(err);
                    continue;
                }
                let ctor_owner = TypePath::new(
                    owner.pack.iter().cloned().chain([owner.name.clone()]).collect(),
                    ctor.name.clone(),
                );
                let params = ctx.create_type_params(&ctor_owner, &ctor.params, TypeParamHost::EnumConstructor);
                let mut scope = ctx.scope.clone();
                scope.type_params.extend(params.iter().cloned());
                let ty = ctx.with_scope(scope, |ctx| -> TypeloadResult<Type> {
                    if ctor.args.is_empty() {
                        return Ok(enum_type.clone());
                    }
                    let mut args = Vec::with_capacity(ctor.args.len());
                    for arg in &ctor.args {
                        let ty = match &arg.hint {
                            Some(hint) => ctx.load_complex_type(hint)?,
                            None => {
                                return Err(TypeloadError::new(
                                    TypeloadErrorKind::ExplicitTypeRequired { name: arg.name.clone() },
                                    arg.span,
                                ))
                            }
                        };
                        let mut loaded = FunArg::new(arg.name.clone(), ty);
                        if arg.optional {
                            loaded = loaded.optional();
                        }
                        args.push(loaded);
                    }
                    Ok(Type::function(args, enum_type.clone()))
                });
                match ty {
                    Ok(ty) => {
                        constructors.insert(
                            ctor.name.clone(),
                            EnumConstructor {
                                name: ctor.name.clone(),
                                ty,
                                params,
                                span: ctor.span,
                            },
                        );
                    }
                    Err(err) => ctx.report(err),
                }
            }
            constructors
        });

        let d = self.decl_mut(decl);
        d.kind = DeclKind::Enum(EnumDecl { constructors });
        d.build_state = BuildState::Built;
    }

    fn build_abstract(&mut self, decl: DeclId, syntax: &AbstractSyntax) {
        self.decl_mut(decl).build_state = BuildState::Building(smallvec::smallvec![decl]);
        let scope = self.scope_for_decl(decl);
        let impl_class = match &self.decl(decl).kind {
            DeclKind::Abstract(a) => a.impl_class,
            _ => None,
        };

        let (underlying, from, to) = self.with_scope(scope, |ctx| {
            let underlying = syntax
                .underlying
                .as_ref()
                .and_then(|hint| ctx.load_or_report(hint));
            let from: Vec<Type> = syntax.from.iter().filter_map(|h| ctx.load_or_report(h)).collect();
            let to: Vec<Type> = syntax.to.iter().filter_map(|h| ctx.load_or_report(h)).collect();
            (underlying, from, to)
        });

        let d = self.decl_mut(decl);
        d.kind = DeclKind::Abstract(AbstractDecl {
            underlying,
            from,
            to,
            impl_class,
        });
        d.build_state = BuildState::Built;

        if let Some(impl_id) = impl_class {
            let mut scope = self.scope_for_decl(decl);
            scope.decl = Some(impl_id);
            self.with_scope(scope, |ctx| {
                for field in &syntax.fields {
                    match ctx.load_class_field(impl_id, field) {
                        Ok(mut loaded) => {
                            loaded.flags.insert(FieldFlags::STATIC);
                            if let Some(class) = ctx.class_mut(impl_id) {
                                class.statics.insert(loaded.name.clone(), loaded);
                            }
                        }
                        Err(err) => ctx.report(err),
                    }
                }
            });
            self.decl_mut(impl_id).build_state = BuildState::Built;
        }
    }

    fn load_or_report(&mut self, hint: &TypeHint) -> Option<Type> {
        match self.load_complex_type(hint) {
            Ok(t) => Some(t),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    /// Queues the checks a freshly built class is subject to
    pub(crate) fn schedule_class_checks(&mut self, decl: DeclId) {
        let Some(class) = self.class(decl) else {
            return;
        };
        if class.is_interface() {
            return;
        }
        let is_abstract = class.is_abstract();
        let is_extern = class.is_extern();
        let super_class = class.super_class.clone();
        let fields: Vec<String> = class.fields.keys().cloned().collect();

        for name in fields {
            self.scheduler.delay(Pass::ConnectField, move |ctx| {
                ctx.check_overriding(decl, &name);
            });
        }

        if let (false, Some((parent, args))) = (is_abstract, super_class) {
            self.delay_retrying(
                Pass::ConnectField,
                decl,
                Rc::new(move |ctx: &mut TypeloadContext| ctx.check_abstract_class(decl, parent, &args)),
            );
        }

        if self.config.check_final_vars && !is_extern {
            self.scheduler.delay(Pass::TypeField, move |ctx| {
                ctx.check_class_final_vars(decl);
            });
        }
    }

    /// Loads the module at `dotted`, runs every queued pass and reports unused
    /// imports of that module
    pub fn check_module(&mut self, dotted: &str) -> TypeloadResult<ModuleId> {
        let path = ModulePath::parse(dotted);
        let id = self.load_module(&path, SourceSpan::unknown())?;
        self.ensure_imports(id);
        self.run_all();
        for import in self.unused_imports(id) {
            self.report_warning(
                error_codes::UNUSED_IMPORT,
                format!("Unused import {}", import.path),
                import.span,
            );
        }
        Ok(id)
    }
}
