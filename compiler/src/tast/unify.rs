//! Assignability and type equality
//!
//! `unify(a, b)` answers "can a value of type `a` be used where `b` is expected",
//! binding free monomorphs on the way. `type_eq` is the invariant comparison used
//! for type arguments and plain variable redefinitions.

use super::context::TypeloadContext;
use super::core::{FunArg, Type};
use super::errors::{UnifyCause, UnifyError};
use super::symbols::{ClassKind, DeclKind, Field, FieldFlags, FieldKind, VarAccess};
use super::{DeclId, MonoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqMode {
    /// `Dynamic` only equals `Dynamic`
    Strict,
    /// `Dynamic` on either side is accepted
    Normal,
}

pub type UnifyResult = Result<(), UnifyError>;

const MAX_TYPEDEF_CHAIN: usize = 64;

impl TypeloadContext {
    pub fn unify(&mut self, a: &Type, b: &Type) -> UnifyResult {
        if a == b {
            return Ok(());
        }
        let guarded = matches!(a, Type::Typedef { .. } | Type::Anonymous(_))
            || matches!(b, Type::Typedef { .. } | Type::Anonymous(_));
        if guarded {
            let pair = (a.clone(), b.clone());
            if self.unify_stack.contains(&pair) {
                return Ok(());
            }
            self.unify_stack.push(pair);
            let result = self.unify_followed(a, b);
            self.unify_stack.pop();
            result
        } else {
            self.unify_followed(a, b)
        }
    }

    fn unify_followed(&mut self, a: &Type, b: &Type) -> UnifyResult {
        let fa = self.follow(a);
        let fb = self.follow(b);
        if fa == fb {
            return Ok(());
        }
        match (&fa, &fb) {
            (Type::Mono(x), _) => return self.link(*x, &fb, a, b),
            (_, Type::Mono(y)) => return self.link(*y, &fa, a, b),
            (Type::Dynamic(_), _) | (_, Type::Dynamic(_)) => return Ok(()),
            _ => {}
        }
        if let Some(inner) = self.null_inner(&fa) {
            return self.unify(&inner, b);
        }
        if let Some(inner) = self.null_inner(&fb) {
            return self.unify(a, &inner);
        }

        match (&fa, &fb) {
            (Type::Instance { decl: c1, params: p1 }, Type::Instance { decl: c2, params: p2 }) => {
                if c1 == c2 {
                    return self.params_eq(p1, p2).map_err(|e| e.context(UnifyCause::CannotUnify {
                        from: a.clone(),
                        to: b.clone(),
                    }));
                }
                if let Some(constraints) = self.type_param_constraints(*c1) {
                    for c in constraints {
                        if self.unify(&c, b).is_ok() {
                            return Ok(());
                        }
                    }
                    return Err(UnifyError::cannot_unify(a, b));
                }
                match self.find_ancestor(*c1, p1, *c2) {
                    Some(ancestor_params) => self
                        .params_eq(&ancestor_params, p2)
                        .map_err(|e| e.context(UnifyCause::CannotUnify {
                            from: a.clone(),
                            to: b.clone(),
                        })),
                    None => Err(UnifyError::cannot_unify(a, b)),
                }
            }
            (Type::Enum { decl: e1, params: p1 }, Type::Enum { decl: e2, params: p2 })
            | (Type::Abstract { decl: e1, params: p1 }, Type::Abstract { decl: e2, params: p2 })
                if e1 == e2 =>
            {
                self.params_eq(p1, p2)
                    .map_err(|e| e.context(UnifyCause::CannotUnify {
                        from: a.clone(),
                        to: b.clone(),
                    }))
            }
            (Type::Function { args: a1, ret: r1 }, Type::Function { args: a2, ret: r2 }) => {
                self.unify_functions(a1, r1, a2, r2)
                    .map_err(|e| e.context(UnifyCause::CannotUnify {
                        from: a.clone(),
                        to: b.clone(),
                    }))
            }
            (Type::Instance { decl, params }, Type::Anonymous(id)) => {
                let expected = self.anon(*id).fields.clone();
                for (name, field) in &expected {
                    let Some((found_ty, found)) = self.class_field(*decl, params, name) else {
                        if field.has_flag(FieldFlags::OPTIONAL) {
                            continue;
                        }
                        return Err(UnifyError::new(UnifyCause::MissingField { name: name.clone() })
                            .context(UnifyCause::CannotUnify {
                                from: a.clone(),
                                to: b.clone(),
                            }));
                    };
                    self.unify_field(&found_ty, &found, field)
                        .map_err(|e| e.context(UnifyCause::CannotUnify {
                            from: a.clone(),
                            to: b.clone(),
                        }))?;
                }
                Ok(())
            }
            (Type::Anonymous(id1), Type::Anonymous(id2)) => {
                let have = self.anon(*id1).fields.clone();
                let expected = self.anon(*id2).fields.clone();
                for (name, field) in &expected {
                    let Some(found) = have.get(name) else {
                        if field.has_flag(FieldFlags::OPTIONAL) {
                            continue;
                        }
                        return Err(UnifyError::new(UnifyCause::MissingField { name: name.clone() })
                            .context(UnifyCause::CannotUnify {
                                from: a.clone(),
                                to: b.clone(),
                            }));
                    };
                    self.unify_field(&found.ty, found, field)
                        .map_err(|e| e.context(UnifyCause::CannotUnify {
                            from: a.clone(),
                            to: b.clone(),
                        }))?;
                }
                Ok(())
            }
            _ => {
                if let Type::Abstract { decl, params } = &fa {
                    for to in self.abstract_casts(*decl, params, false) {
                        if self.unify(&to, b).is_ok() {
                            return Ok(());
                        }
                    }
                }
                if let Type::Abstract { decl, params } = &fb {
                    for from in self.abstract_casts(*decl, params, true) {
                        if self.unify(a, &from).is_ok() {
                            return Ok(());
                        }
                    }
                }
                if let Type::Instance { decl, .. } = &fa {
                    if let Some(constraints) = self.type_param_constraints(*decl) {
                        for c in constraints {
                            if self.unify(&c, b).is_ok() {
                                return Ok(());
                            }
                        }
                    }
                }
                Err(UnifyError::cannot_unify(a, b))
            }
        }
    }

    fn link(&mut self, mono: MonoId, target: &Type, a: &Type, b: &Type) -> UnifyResult {
        if self.occurs(mono, target) {
            return Err(UnifyError::cannot_unify(a, b));
        }
        self.monos
            .bind(mono, target.clone())
            .map_err(|e| UnifyError::new(UnifyCause::Custom(e.to_string())))
    }

    fn occurs(&self, mono: MonoId, t: &Type) -> bool {
        match t {
            Type::Mono(id) if *id == mono => true,
            Type::Mono(id) => match self.monos.bound(*id) {
                Some(bound) => self.occurs(mono, bound),
                None => false,
            },
            _ => {
                let mut found = false;
                t.iter_children(|child| found = found || self.occurs(mono, child));
                found
            }
        }
    }

    fn unify_functions(&mut self, a1: &[FunArg], r1: &Type, a2: &[FunArg], r2: &Type) -> UnifyResult {
        let count = a1.len().max(a2.len());
        for i in 0..count {
            match (a1.get(i), a2.get(i)) {
                (Some(x), Some(y)) => {
                    if y.optional && !x.optional {
                        return Err(UnifyError::new(UnifyCause::NotMatchingOptional {
                            name: x.name.clone(),
                        }));
                    }
                    self.unify(&y.ty, &x.ty).map_err(|e| {
                        e.context(UnifyCause::InvalidArgument {
                            index: i + 1,
                            count: a1.len(),
                        })
                    })?;
                }
                (Some(x), None) if x.optional => {}
                _ => return Err(UnifyError::new(UnifyCause::DifferentArgumentCount)),
            }
        }
        self.unify(r1, r2)
            .map_err(|e| e.context(UnifyCause::InvalidReturnType))
    }

    /// `found` is the field on the value side, `expected` on the target side
    fn unify_field(&mut self, found_ty: &Type, found: &Field, expected: &Field) -> UnifyResult {
        let name = expected.name.clone();
        if let (FieldKind::Var { read: r1, write: w1 }, FieldKind::Var { read: r2, write: w2 }) =
            (found.kind, expected.kind)
        {
            if (r2 == VarAccess::Normal && r1.forbids()) || (w2 == VarAccess::Normal && w1.forbids()) {
                return Err(UnifyError::new(UnifyCause::InvalidFieldAccess { name }));
            }
        }
        let read_only = match expected.kind {
            FieldKind::Var { write, .. } => write.forbids() || expected.has_flag(FieldFlags::FINAL),
            FieldKind::Method(_) => true,
        };
        let result = if read_only {
            self.unify(found_ty, &expected.ty)
        } else {
            self.type_eq(EqMode::Normal, found_ty, &expected.ty)
        };
        result.map_err(|e| e.context(UnifyCause::InvalidFieldAccess { name }))
    }

    fn params_eq(&mut self, p1: &[Type], p2: &[Type]) -> UnifyResult {
        for (x, y) in p1.iter().zip(p2) {
            self.type_eq(EqMode::Normal, x, y)?;
        }
        Ok(())
    }

    /// Invariant comparison
    pub fn type_eq(&mut self, mode: EqMode, a: &Type, b: &Type) -> UnifyResult {
        if a == b {
            return Ok(());
        }
        let pair = (a.clone(), b.clone());
        if self.unify_stack.contains(&pair) {
            return Ok(());
        }
        self.unify_stack.push(pair);
        let result = self.type_eq_followed(mode, a, b);
        self.unify_stack.pop();
        result
    }

    fn type_eq_followed(&mut self, mode: EqMode, a: &Type, b: &Type) -> UnifyResult {
        let fa = self.follow(a);
        let fb = self.follow(b);
        if fa == fb {
            return Ok(());
        }
        let mismatch = || UnifyError::cannot_unify(a, b);
        match (&fa, &fb) {
            (Type::Mono(x), _) => self.link(*x, &fb, a, b),
            (_, Type::Mono(y)) => self.link(*y, &fa, a, b),
            (Type::Dynamic(x), Type::Dynamic(y)) => match (x, y) {
                (Some(x), Some(y)) => self.type_eq(mode, x, y),
                _ => Ok(()),
            },
            (Type::Dynamic(_), _) | (_, Type::Dynamic(_)) if mode == EqMode::Normal => Ok(()),
            (Type::Instance { decl: c1, params: p1 }, Type::Instance { decl: c2, params: p2 })
            | (Type::Enum { decl: c1, params: p1 }, Type::Enum { decl: c2, params: p2 })
            | (Type::Abstract { decl: c1, params: p1 }, Type::Abstract { decl: c2, params: p2 })
                if c1 == c2 && p1.len() == p2.len() =>
            {
                for (x, y) in p1.iter().zip(p2) {
                    self.type_eq(mode, x, y).map_err(|e| e.context(UnifyCause::CannotUnify {
                        from: a.clone(),
                        to: b.clone(),
                    }))?;
                }
                Ok(())
            }
            (Type::Function { args: a1, ret: r1 }, Type::Function { args: a2, ret: r2 }) => {
                if a1.len() != a2.len() {
                    return Err(mismatch().context(UnifyCause::DifferentArgumentCount));
                }
                for (i, (x, y)) in a1.iter().zip(a2).enumerate() {
                    if x.optional != y.optional {
                        return Err(UnifyError::new(UnifyCause::NotMatchingOptional {
                            name: x.name.clone(),
                        }));
                    }
                    self.type_eq(mode, &x.ty, &y.ty).map_err(|e| {
                        e.context(UnifyCause::InvalidArgument {
                            index: i + 1,
                            count: a1.len(),
                        })
                    })?;
                }
                self.type_eq(mode, r1, r2)
                    .map_err(|e| e.context(UnifyCause::InvalidReturnType))
            }
            (Type::Anonymous(id1), Type::Anonymous(id2)) => {
                let f1 = self.anon(*id1).fields.clone();
                let f2 = self.anon(*id2).fields.clone();
                if f1.len() != f2.len() {
                    return Err(mismatch());
                }
                for (name, x) in &f1 {
                    let Some(y) = f2.get(name) else {
                        return Err(mismatch().context(UnifyCause::MissingField { name: name.clone() }));
                    };
                    if x.kind != y.kind {
                        return Err(mismatch().context(UnifyCause::InvalidFieldAccess { name: name.clone() }));
                    }
                    self.type_eq(mode, &x.ty, &y.ty)?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    /// Structural equality looking through monomorphs and lazy cells.
    /// Never binds a monomorph.
    pub fn type_iseq(&mut self, a: &Type, b: &Type) -> bool {
        if a == b {
            return true;
        }
        let fa = self.follow(a);
        let fb = self.follow(b);
        if fa == fb {
            return true;
        }
        match (&fa, &fb) {
            (Type::Instance { decl: c1, params: p1 }, Type::Instance { decl: c2, params: p2 })
            | (Type::Enum { decl: c1, params: p1 }, Type::Enum { decl: c2, params: p2 })
            | (Type::Abstract { decl: c1, params: p1 }, Type::Abstract { decl: c2, params: p2 }) => {
                c1 == c2
                    && p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| self.type_iseq(x, y))
            }
            (Type::Dynamic(x), Type::Dynamic(y)) => match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => self.type_iseq(x, y),
                _ => false,
            },
            (Type::Function { args: a1, ret: r1 }, Type::Function { args: a2, ret: r2 }) => {
                a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(a2)
                        .all(|(x, y)| x.optional == y.optional && self.type_iseq(&x.ty, &y.ty))
                    && self.type_iseq(r1, r2)
            }
            (Type::Anonymous(id1), Type::Anonymous(id2)) => {
                let f1 = self.anon(*id1).fields.clone();
                let f2 = self.anon(*id2).fields.clone();
                f1.len() == f2.len()
                    && f1.iter().all(|(name, x)| {
                        f2.get(name)
                            .is_some_and(|y| x.kind == y.kind && self.type_iseq(&x.ty, &y.ty))
                    })
            }
            _ => false,
        }
    }

    fn null_inner(&self, t: &Type) -> Option<Type> {
        match t {
            Type::Abstract { decl, params } if *decl == self.std.null => params.first().cloned(),
            _ => None,
        }
    }

    /// Whether `t` is `Null<T>` (possibly behind typedefs)
    pub fn is_null(&mut self, t: &Type) -> bool {
        let mut current = self.follow_mono(t);
        for _ in 0..MAX_TYPEDEF_CHAIN {
            let (decl, params) = match &current {
                Type::Abstract { decl, .. } if *decl == self.std.null => return true,
                Type::Typedef { decl, params } => (*decl, params.clone()),
                _ => return false,
            };
            self.ensure_built(decl);
            let target = match &self.decl(decl).kind {
                DeclKind::Typedef(td) => td.target.clone(),
                _ => None,
            };
            let Some(target) = target else { return false };
            let decl_params = self.decl(decl).params.clone();
            let next = self.apply_params(&decl_params, &params, &target);
            current = self.follow_mono(&next);
        }
        false
    }

    pub fn is_dynamic(&mut self, t: &Type) -> bool {
        matches!(self.follow(t), Type::Dynamic(_))
    }

    fn type_param_constraints(&self, decl: DeclId) -> Option<Vec<Type>> {
        match self.class(decl).map(|c| &c.kind) {
            Some(ClassKind::TypeParameter { constraints }) => Some(constraints.clone()),
            _ => None,
        }
    }

    fn abstract_casts(&mut self, decl: DeclId, params: &[Type], from: bool) -> Vec<Type> {
        let (casts, decl_params) = match &self.decl(decl).kind {
            DeclKind::Abstract(a) => (
                if from { a.from.clone() } else { a.to.clone() },
                self.decl(decl).params.clone(),
            ),
            _ => return Vec::new(),
        };
        casts
            .iter()
            .map(|t| self.apply_params(&decl_params, params, t))
            .collect()
    }

    /// Walks the super and implements edges of `child` looking for `ancestor`,
    /// returning its type arguments as seen from `child<params>`
    pub fn find_ancestor(&mut self, child: DeclId, params: &[Type], ancestor: DeclId) -> Option<Vec<Type>> {
        let mut visited = Vec::new();
        self.find_ancestor_rec(child, params.to_vec(), ancestor, &mut visited)
    }

    fn find_ancestor_rec(
        &mut self,
        child: DeclId,
        params: Vec<Type>,
        ancestor: DeclId,
        visited: &mut Vec<DeclId>,
    ) -> Option<Vec<Type>> {
        if child == ancestor {
            return Some(params);
        }
        if visited.contains(&child) {
            return None;
        }
        visited.push(child);
        self.ensure_built(child);
        let class = self.class(child)?;
        let mut edges: Vec<(DeclId, Vec<Type>)> = class.implements.clone();
        if let Some(sup) = &class.super_class {
            edges.insert(0, sup.clone());
        }
        let decl_params = self.decl(child).params.clone();
        for (target, target_params) in edges {
            let mapped: Vec<Type> = target_params
                .iter()
                .map(|t| self.apply_params(&decl_params, &params, t))
                .collect();
            if let Some(found) = self.find_ancestor_rec(target, mapped, ancestor, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Whether `ancestor` is `child` or reachable from it through heritage edges
    pub fn is_parent(&self, ancestor: DeclId, child: DeclId) -> bool {
        let mut stack = vec![child];
        let mut visited = Vec::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            if let Some(class) = self.class(current) {
                if let Some((sup, _)) = &class.super_class {
                    stack.push(*sup);
                }
                stack.extend(class.implements.iter().map(|(i, _)| *i));
            }
        }
        false
    }

    /// Instance field lookup through the super chain, typed as seen from `decl<params>`
    pub fn class_field(&mut self, decl: DeclId, params: &[Type], name: &str) -> Option<(Type, Field)> {
        let mut current = decl;
        let mut current_params = params.to_vec();
        let mut visited = Vec::new();
        loop {
            if visited.contains(&current) {
                return None;
            }
            visited.push(current);
            self.ensure_built(current);
            let (field, super_class) = {
                let class = self.class(current)?;
                (class.fields.get(name).cloned(), class.super_class.clone())
            };
            let decl_params = self.decl(current).params.clone();
            if let Some(field) = field {
                let ty = self.apply_params(&decl_params, &current_params, &field.ty);
                return Some((ty, field));
            }
            let (sup, sup_params) = super_class?;
            current_params = sup_params
                .iter()
                .map(|t| self.apply_params(&decl_params, &current_params, t))
                .collect();
            current = sup;
        }
    }

    /// Two overload signatures take the same arguments
    pub fn same_overload_args(&mut self, t1: &Type, t2: &Type, f1: &Field, f2: &Field) -> bool {
        if f1.params.len() != f2.params.len() {
            return false;
        }
        let map: Vec<(DeclId, Type)> = f2
            .params
            .iter()
            .zip(&f1.params)
            .map(|(p2, p1)| (p2.decl, p1.ty.clone()))
            .collect();
        let t2 = self.substitute(&map, t2);
        match (self.follow(t1), self.follow(&t2)) {
            (Type::Function { args: a1, .. }, Type::Function { args: a2, .. }) => {
                a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(&a2)
                        .all(|(x, y)| x.optional == y.optional && self.type_iseq(&x.ty, &y.ty))
            }
            _ => false,
        }
    }
}
