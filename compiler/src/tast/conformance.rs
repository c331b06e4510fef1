//! Override and interface conformance
//!
//! [`TypeloadContext::valid_redefinition`] is the single compatibility rule shared
//! by overriding and interface implementation: methods are covariant in their
//! return type and contravariant in their arguments, read-only vars are
//! covariant, write-only vars contravariant, anything else invariant.

use super::context::TypeloadContext;
use super::core::Type;
use super::errors::{BuildCancelled, TypeloadError, TypeloadErrorKind, UnifyCause, UnifyError};
use super::symbols::{
    BuildState, ClassDecl, ClassFlags, ClassKind, DeclKind, Declaration, Field, FieldFlags, FieldKind,
    MethodKind, Purity, TypePath, VarAccess, META_PURE,
};
use super::unify::EqMode;
use super::DeclId;
use crate::syntax::{Expr, MetaEntry};

/// A field found on a class or one of its parents
#[derive(Debug, Clone)]
struct FoundField {
    owner: DeclId,
    /// Type as seen from the class the lookup started at
    ty: Type,
    field: Field,
}

impl TypeloadContext {
    /// Checks that `child: t1` may stand in for `parent: t2`. A pure parent makes
    /// an undeclared child expect purity.
    pub fn valid_redefinition(
        &mut self,
        child: &mut Field,
        t1: &Type,
        parent: &Field,
        t2: &Type,
    ) -> Result<(), UnifyError> {
        if parent.purity() == Purity::Pure && child.purity() == Purity::MaybePure {
            child
                .meta
                .push(MetaEntry::new(META_PURE).with_params(vec![Expr::ident("expect")]));
        }

        let (t1, t2) = self.align_field_params(child, t1, parent, t2)?;

        match (child.kind, parent.kind) {
            (FieldKind::Method(m1), FieldKind::Method(m2))
                if m1 != MethodKind::Dynamic && m2 != MethodKind::Dynamic =>
            {
                self.valid_method_redefinition(&t1, &t2)
            }
            (_, FieldKind::Var { write, .. }) if write.forbids() => self.valid(&t1, &t2),
            (_, FieldKind::Var { read, .. }) if read.forbids() => self.valid(&t2, &t1),
            _ if parent.has_flag(FieldFlags::FINAL) => self.valid(&t1, &t2),
            _ => {
                self.type_eq(EqMode::Strict, &t1, &t2)?;
                if self.is_null(&t1) != self.is_null(&t2) {
                    return Err(UnifyError::cannot_unify(&t1, &t2).context(UnifyCause::NullabilityMismatch));
                }
                Ok(())
            }
        }
    }

    /// Replaces both fields' own type parameters with shared placeholders once
    /// their constraints agree. Differing parameter counts are left alone.
    fn align_field_params(
        &mut self,
        child: &Field,
        t1: &Type,
        parent: &Field,
        t2: &Type,
    ) -> Result<(Type, Type), UnifyError> {
        if (child.params.is_empty() && parent.params.is_empty()) || child.params.len() != parent.params.len() {
            return Ok((t1.clone(), t2.clone()));
        }

        let placeholders: Vec<Type> = child.params.iter().map(|p| self.fresh_placeholder(&p.name)).collect();
        let map1: Vec<(DeclId, Type)> = child
            .params
            .iter()
            .zip(&placeholders)
            .map(|(p, t)| (p.decl, t.clone()))
            .collect();
        let map2: Vec<(DeclId, Type)> = parent
            .params
            .iter()
            .zip(&placeholders)
            .map(|(p, t)| (p.decl, t.clone()))
            .collect();

        for (p1, p2) in child.params.iter().zip(&parent.params) {
            let c1 = self.constraints_of(p1.decl);
            let c2 = self.constraints_of(p2.decl);
            if c1.len() != c2.len() {
                return Err(UnifyError::new(UnifyCause::DifferentConstraintCount));
            }
            for (a, b) in c1.iter().zip(&c2) {
                let a = self.substitute(&map1, a);
                let b = self.substitute(&map2, b);
                self.type_eq(EqMode::Strict, &a, &b)
                    .map_err(|e| e.context(UnifyCause::ConstraintsDiffer))?;
            }
        }
        Ok((self.substitute(&map1, t1), self.substitute(&map2, t2)))
    }

    /// A nominal type that only equals itself
    fn fresh_placeholder(&mut self, name: &str) -> Type {
        let module = self.scope.module.unwrap_or(self.std.module);
        let mut decl = Declaration::new(
            TypePath::root(name),
            module,
            DeclKind::Class(ClassDecl::new(
                ClassFlags::NONE,
                ClassKind::TypeParameter {
                    constraints: Vec::new(),
                },
            )),
        );
        decl.build_state = BuildState::Built;
        let id = self.add_decl(decl);
        Type::instance(id, Vec::new())
    }

    fn valid_method_redefinition(&mut self, t1: &Type, t2: &Type) -> Result<(), UnifyError> {
        let (args1, r1, args2, r2) = match (self.follow(t1), self.follow(t2)) {
            (Type::Function { args: a1, ret: r1 }, Type::Function { args: a2, ret: r2 }) => (a1, r1, a2, r2),
            _ => return Err(UnifyError::cannot_unify(t1, t2)),
        };
        if args1.len() != args2.len() {
            return Err(UnifyError::cannot_unify(t1, t2).context(UnifyCause::DifferentArgumentCount));
        }
        self.valid(&r1, &r2).map_err(|e| {
            e.context(UnifyCause::InvalidReturnType)
                .context(UnifyCause::CannotUnify {
                    from: t1.clone(),
                    to: t2.clone(),
                })
        })?;
        let count = args1.len();
        for (i, (a1, a2)) in args1.iter().zip(&args2).enumerate() {
            if a1.optional != a2.optional {
                return Err(UnifyError::new(UnifyCause::NotMatchingOptional {
                    name: a1.name.clone(),
                })
                .context(UnifyCause::CannotUnify {
                    from: t1.clone(),
                    to: t2.clone(),
                }));
            }
            self.valid(&a2.ty, &a1.ty).map_err(|e| {
                e.context(UnifyCause::InvalidArgument { index: i + 1, count })
                    .context(UnifyCause::CannotUnify {
                        from: t1.clone(),
                        to: t2.clone(),
                    })
            })?;
        }
        Ok(())
    }

    /// Assignability that does not let nullability or `Dynamic` slip in
    fn valid(&mut self, a: &Type, b: &Type) -> Result<(), UnifyError> {
        self.unify(a, b)?;
        let a_dynamic = matches!(self.follow(a), Type::Dynamic(None));
        let b_dynamic = matches!(self.follow(b), Type::Dynamic(None));
        if self.is_null(a) != self.is_null(b) || (a_dynamic && !b_dynamic) {
            return Err(UnifyError::cannot_unify(a, b));
        }
        Ok(())
    }

    /// Looks `name` up on `start` and its super chain
    fn lookup_field(&mut self, start: DeclId, params: &[Type], name: &str) -> Option<FoundField> {
        let mut current = start;
        let mut current_params = params.to_vec();
        let mut visited = Vec::new();
        while !visited.contains(&current) {
            visited.push(current);
            let (field, super_class) = {
                let class = self.class(current)?;
                (class.fields.get(name).cloned(), class.super_class.clone())
            };
            let decl_params = self.decl(current).params.clone();
            if let Some(field) = field {
                let ty = self.apply_params(&decl_params, &current_params, &field.ty);
                return Some(FoundField {
                    owner: current,
                    ty,
                    field,
                });
            }
            let (sup, sup_params) = super_class?;
            current_params = sup_params
                .iter()
                .map(|t| self.apply_params(&decl_params, &current_params, t))
                .collect();
            current = sup;
        }
        None
    }

    /// Expands a found field into itself plus its overloads, each typed in context
    fn with_overloads(&mut self, start: DeclId, params: &[Type], found: FoundField) -> Vec<(Type, Field)> {
        let mut out = vec![(found.ty.clone(), found.field.clone())];
        if found.field.overloads.is_empty() {
            return out;
        }
        // Overloads share the owner, so the owner's substitution applies to them too
        let owner_params = if found.owner == start {
            params.to_vec()
        } else {
            self.find_ancestor(start, params, found.owner).unwrap_or_default()
        };
        let decl_params = self.decl(found.owner).params.clone();
        for overload in &found.field.overloads {
            let ty = self.apply_params(&decl_params, &owner_params, &overload.ty);
            out.push((ty, overload.clone()));
        }
        out
    }

    fn own_params(&self, decl: DeclId) -> Vec<Type> {
        self.decl(decl).params.iter().map(|p| p.ty.clone()).collect()
    }

    /// Every instance field name on the super chain of `decl`
    fn inherited_field_names(&self, decl: DeclId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.class(decl).and_then(|c| c.super_class.as_ref().map(|(s, _)| *s));
        let mut visited = Vec::new();
        while let Some(id) = current {
            if visited.contains(&id) {
                break;
            }
            visited.push(id);
            let Some(class) = self.class(id) else { break };
            names.extend(class.fields.keys().cloned());
            current = class.super_class.as_ref().map(|(s, _)| *s);
        }
        names
    }

    /// Checks the instance field `name` of `decl` (and its overloads) against
    /// the superclass chain and writes back any flag or metadata changes
    pub fn check_overriding(&mut self, decl: DeclId, name: &str) {
        let Some(field) = self.class(decl).and_then(|c| c.fields.get(name).cloned()) else {
            return;
        };
        if field.name == super::class_fields::CONSTRUCTOR_NAME || field.has_flag(FieldFlags::STATIC) {
            return;
        }

        let mut checked = self.check_field_override(decl, field.clone());
        let mut overloads = Vec::with_capacity(field.overloads.len());
        for overload in field.overloads {
            overloads.push(self.check_field_override(decl, overload));
        }
        checked.overloads = overloads;
        if let Some(class) = self.class_mut(decl) {
            if let Some(slot) = class.fields.get_mut(name) {
                *slot = checked;
            }
        }
    }

    /// Copies metadata gained while checking `field` back to its declaration.
    /// `slot` 0 is the field itself, later slots are its overloads in order.
    fn store_field_meta(&mut self, owner: DeclId, slot: usize, field: &Field) {
        let Some(stored) = self.class_mut(owner).and_then(|c| c.fields.get_mut(&field.name)) else {
            return;
        };
        let target = match slot {
            0 => Some(stored),
            n => stored.overloads.get_mut(n - 1),
        };
        if let Some(target) = target {
            target.meta = field.meta.clone();
        }
    }

    fn check_field_override(&mut self, decl: DeclId, mut field: Field) -> Field {
        let super_class = self.class(decl).and_then(|c| c.super_class.clone());
        let is_extern = self.class(decl).is_some_and(ClassDecl::is_extern);
        let is_overload = field.has_flag(FieldFlags::OVERLOAD) || !field.overloads.is_empty();

        let mut any_by_name = false;
        let parent = match &super_class {
            Some((sup, params)) => match self.lookup_field(*sup, params, &field.name) {
                Some(found) => {
                    any_by_name = true;
                    let owner = found.owner;
                    let candidates = self.with_overloads(*sup, params, found);
                    let mut matching = None;
                    for (t, f) in candidates {
                        let usable = !matches!(f.kind, FieldKind::Var { read: VarAccess::Require, .. });
                        if usable && (!is_overload || self.same_overload_args(&field.ty, &t, &field, &f)) {
                            matching = Some((owner, t, f));
                            break;
                        }
                    }
                    matching
                }
                None => None,
            },
            None => None,
        };

        let Some((owner, parent_type, parent_field)) = parent else {
            if field.has_flag(FieldFlags::OVERRIDE) {
                let kind = if is_overload && any_by_name {
                    TypeloadErrorKind::OverrideNoCompatibleOverload {
                        field: field.name.clone(),
                    }
                } else {
                    let candidates = self.inherited_field_names(decl);
                    TypeloadErrorKind::OverrideWithoutParent {
                        field: field.name.clone(),
                        suggestion: super::type_diagnostics::suggest_similar(&field.name, &candidates),
                    }
                };
                self.report(TypeloadError::new(kind, field.span));
            }
            return field;
        };

        let name = field.name.clone();
        if parent_field.has_flag(FieldFlags::ABSTRACT) {
            field.flags.insert(FieldFlags::OVERRIDE);
        } else if !field.has_flag(FieldFlags::OVERRIDE) {
            if is_extern {
                field.flags.insert(FieldFlags::OVERRIDE);
            } else {
                let err = TypeloadError::new(
                    TypeloadErrorKind::MissingOverride {
                        field: name.clone(),
                        superclass: self.decl(owner).path.to_string(),
                    },
                    field.span,
                );
                self.report(err);
            }
        }

        if !field.is_public() && parent_field.is_public() {
            self.report(TypeloadError::new(
                TypeloadErrorKind::OverrideLessVisible { field: name.clone() },
                field.span,
            ));
        } else {
            match (parent_field.kind, field.kind) {
                (FieldKind::Method(MethodKind::Inline), _) => self.report(TypeloadError::new(
                    TypeloadErrorKind::OverrideInline { field: name.clone() },
                    field.span,
                )),
                (a, b) if a == b => {}
                (FieldKind::Method(MethodKind::Normal), FieldKind::Method(MethodKind::Inline)) => {}
                _ => self.report(TypeloadError::new(
                    TypeloadErrorKind::OverrideAccessMismatch { field: name.clone() },
                    field.span,
                )),
            }
        }

        if parent_field.has_flag(FieldFlags::FINAL) {
            self.report(TypeloadError::new(
                TypeloadErrorKind::OverrideFinal { field: name.clone() },
                field.span,
            ));
        }

        let own_type = field.ty.clone();
        if let Err(err) = self.valid_redefinition(&mut field, &own_type, &parent_field, &parent_type) {
            let notes = self.explain_unify(&err);
            let error = TypeloadError::new(TypeloadErrorKind::IncompatibleOverride { field: name }, field.span)
                .with_related("Base field is defined here", parent_field.span)
                .with_notes(notes);
            self.report(error);
        }
        field
    }

    /// Checks every field of every interface `decl` implements. Missing fields are
    /// collected and reported together. Cancels while an interface is unbuilt.
    pub fn check_interfaces(&mut self, decl: DeclId) -> Result<(), BuildCancelled> {
        let implements = self.class(decl).map(|c| c.implements.clone()).unwrap_or_default();
        let mut missing = Vec::new();
        let mut visited = Vec::new();
        for (intf, params) in implements {
            self.check_interface(decl, intf, &params, &mut missing, &mut visited)?;
        }
        if !missing.is_empty() {
            let d = self.decl(decl);
            let err = TypeloadError::new(
                TypeloadErrorKind::MissingInterfaceFields {
                    class: d.path.to_string(),
                    entries: missing,
                },
                d.span,
            );
            self.report(err);
        }
        Ok(())
    }

    fn check_interface(
        &mut self,
        decl: DeclId,
        intf: DeclId,
        params: &[Type],
        missing: &mut Vec<String>,
        visited: &mut Vec<DeclId>,
    ) -> Result<(), BuildCancelled> {
        match self.ensure_built(intf) {
            BuildState::Built => {}
            state => return Err(BuildCancelled { decl: intf, state }),
        }
        if visited.contains(&intf) {
            return Ok(());
        }
        visited.push(intf);

        let intf_path = self.decl(intf).path.to_string();
        let intf_params = self.decl(intf).params.clone();
        let (fields, parents) = match self.class(intf) {
            Some(c) => (
                c.fields
                    .values()
                    .flat_map(|f| std::iter::once(f).chain(f.overloads.iter()))
                    .cloned()
                    .collect::<Vec<_>>(),
                c.implements.clone(),
            ),
            None => return Ok(()),
        };
        let own_params = self.own_params(decl);
        let (class_is_abstract, class_is_interface) = self
            .class(decl)
            .map(|c| (c.is_abstract(), c.is_interface()))
            .unwrap_or((false, false));

        for field in fields {
            let t = self.apply_params(&intf_params, params, &field.ty);
            let is_overload = !field.overloads.is_empty() || field.has_flag(FieldFlags::OVERLOAD);
            let mut found = None;
            if let Some(hit) = self.lookup_field(decl, &own_params, &field.name) {
                let owner = hit.owner;
                let candidates = self.with_overloads(decl, &own_params, hit);
                let single = candidates.len() == 1 && !is_overload;
                for (slot, (ct, cf)) in candidates.into_iter().enumerate() {
                    if single || self.same_overload_args(&t, &ct, &field, &cf) {
                        found = Some((owner, slot, ct, cf));
                        break;
                    }
                }
            }

            match found {
                Some((owner, slot, ct, mut cf)) => {
                    let forced = ct.clone();
                    self.scheduler.delay(super::scheduler::Pass::Force, move |ctx| {
                        ctx.follow(&forced);
                    });
                    if !cf.is_public() {
                        self.report(TypeloadError::new(
                            TypeloadErrorKind::InterfaceFieldNotPublic {
                                field: field.name.clone(),
                                interface: intf_path.clone(),
                            },
                            cf.span,
                        ));
                    } else if !interface_kind_matches(cf.kind, field.kind) {
                        self.report(TypeloadError::new(
                            TypeloadErrorKind::InterfaceAccessMismatch {
                                field: field.name.clone(),
                                interface: intf_path.clone(),
                            },
                            cf.span,
                        ));
                    } else {
                        let result = self.valid_redefinition(&mut cf, &ct, &field, &t);
                        self.store_field_meta(owner, slot, &cf);
                        if let Err(err) = result {
                            let notes = self.explain_unify(&err);
                            let error = TypeloadError::new(
                                TypeloadErrorKind::InterfaceFieldTypeMismatch {
                                    field: field.name.clone(),
                                    interface: intf_path.clone(),
                                },
                                cf.span,
                            )
                            .with_related("Interface field is defined here", field.span)
                            .with_notes(notes);
                            self.report(error);
                        }
                    }
                }
                None if class_is_abstract && field.kind.is_method() => {
                    let mut synthesized = field.clone();
                    synthesized.ty = t;
                    synthesized.overloads.clear();
                    synthesized.flags.insert(FieldFlags::ABSTRACT);
                    self.add_synthesized_field(decl, synthesized);
                }
                None if field.has_flag(FieldFlags::DEFAULT) => {
                    let mut synthesized = field.clone();
                    synthesized.ty = t;
                    synthesized.overloads.clear();
                    synthesized.flags.insert(FieldFlags::EXTERN);
                    synthesized.flags.insert(FieldFlags::OVERRIDE);
                    self.add_synthesized_field(decl, synthesized);
                }
                None if class_is_interface => {}
                None => {
                    let entry = if is_overload {
                        format!("No suitable overload for {} (from {})", field.name, intf_path)
                    } else {
                        format!("{} : {} (from {})", field.name, self.type_to_string(&t), intf_path)
                    };
                    missing.push(entry);
                }
            }
        }

        for (parent, parent_params) in parents {
            let mapped: Vec<Type> = parent_params
                .iter()
                .map(|p| self.apply_params(&intf_params, params, p))
                .collect();
            self.check_interface(decl, parent, &mapped, missing, visited)?;
        }
        Ok(())
    }

    fn add_synthesized_field(&mut self, decl: DeclId, mut field: Field) {
        field.flags.insert(FieldFlags::COMPILER_GENERATED);
        if let Some(class) = self.class_mut(decl) {
            class.fields.entry(field.name.clone()).or_insert(field);
        }
    }

    /// Reports abstract fields along the abstract superclass chain of `decl`
    /// that nothing implements
    pub fn check_abstract_class(&mut self, decl: DeclId, sup: DeclId, params: &[Type]) -> Result<(), BuildCancelled> {
        let own_params = self.own_params(decl);
        let mut missing = Vec::new();
        let mut current = Some((sup, params.to_vec()));
        let mut visited = Vec::new();

        while let Some((parent, parent_params)) = current.take() {
            match self.ensure_built(parent) {
                BuildState::Built => {}
                state => return Err(BuildCancelled { decl: parent, state }),
            }
            if visited.contains(&parent) {
                break;
            }
            visited.push(parent);
            let Some(class) = self.class(parent) else { break };
            if !class.is_abstract() {
                break;
            }
            let abstract_fields: Vec<Field> = class
                .fields
                .values()
                .flat_map(|f| std::iter::once(f).chain(f.overloads.iter()))
                .filter(|f| f.has_flag(FieldFlags::ABSTRACT))
                .cloned()
                .collect();
            let next = class.super_class.clone();
            let decl_params = self.decl(parent).params.clone();
            let parent_path = self.decl(parent).path.to_string();

            for field in abstract_fields {
                let t = self.apply_params(&decl_params, &parent_params, &field.ty);
                let implemented = match self.lookup_field(decl, &own_params, &field.name) {
                    Some(hit) => {
                        let candidates = self.with_overloads(decl, &own_params, hit);
                        let mut ok = false;
                        for (ct, cf) in candidates {
                            if !cf.has_flag(FieldFlags::ABSTRACT) && self.same_overload_args(&ct, &t, &cf, &field) {
                                ok = true;
                                break;
                            }
                        }
                        ok
                    }
                    None => false,
                };
                if !implemented {
                    missing.push(format!("{} : {} (from {})", field.name, self.type_to_string(&t), parent_path));
                }
            }

            current = next.map(|(s, sp)| {
                let mapped = sp
                    .iter()
                    .map(|t| self.apply_params(&decl_params, &parent_params, t))
                    .collect();
                (s, mapped)
            });
        }

        if !missing.is_empty() {
            let d = self.decl(decl);
            let err = TypeloadError::new(
                TypeloadErrorKind::MissingAbstractImplementations {
                    class: d.path.to_string(),
                    entries: missing,
                },
                d.span,
            );
            self.report(err);
        }
        Ok(())
    }
}

fn access_satisfies(child: VarAccess, required: VarAccess) -> bool {
    child == required || required.forbids()
}

/// Whether a class field of kind `child` can implement an interface field of kind `required`
pub fn interface_kind_matches(child: FieldKind, required: FieldKind) -> bool {
    match (child, required) {
        (FieldKind::Var { read: r1, write: w1 }, FieldKind::Var { read: r2, write: w2 }) => {
            access_satisfies(r1, r2) && access_satisfies(w1, w2)
        }
        (FieldKind::Method(m1), FieldKind::Method(m2)) => {
            m1 == m2 || (m1 == MethodKind::Inline && m2 == MethodKind::Normal)
        }
        _ => false,
    }
}
