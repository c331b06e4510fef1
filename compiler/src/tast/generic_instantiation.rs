// Generic instantiation: binding type arguments to a declaration's parameters

use super::context::TypeloadContext;
use super::core::Type;
use super::errors::{TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::scheduler::Pass;
use super::symbols::{
    BuildState, ClassDecl, ClassFlags, ClassKind, DeclKind, Declaration, TypeParam, TypePath,
};
use super::DeclId;
use crate::syntax::{Constant, Expr, ExprKind, TypeArgHint};
use source_map::SourceSpan;

/// A type argument after loading
#[derive(Debug, Clone)]
pub struct LoadedArg {
    pub ty: Type,
    /// Came from a constant or expression rather than a type
    pub is_expr: bool,
    pub span: SourceSpan,
}

/// A bound argument whose parameter carries constraints
#[derive(Debug, Clone)]
struct PendingConstraint {
    arg: Type,
    param: TypeParam,
    span: SourceSpan,
}

impl TypeloadContext {
    /// Type denoted by `decl` applied to already bound parameters
    pub fn apply_decl(&self, decl: DeclId, params: Vec<Type>) -> Type {
        match &self.decl(decl).kind {
            DeclKind::Class(_) => Type::Instance { decl, params },
            DeclKind::Typedef(_) => Type::Typedef { decl, params },
            DeclKind::Enum(_) => Type::Enum { decl, params },
            DeclKind::Abstract(_) => Type::Abstract { decl, params },
        }
    }

    /// Binds `args` to the parameters of `decl`.
    ///
    /// Missing arguments take the parameter default, or a fresh monomorph when
    /// `allow_omitted` is set. Extra arguments are only accepted by a trailing
    /// `Rest` parameter of a generic-build declaration. Constraints are checked in
    /// the check-constraint pass.
    pub fn instantiate(
        &mut self,
        decl: DeclId,
        args: &[TypeArgHint],
        allow_omitted: bool,
        span: SourceSpan,
    ) -> TypeloadResult<Type> {
        if decl == self.std.dynamic {
            return self.instantiate_dynamic(args, span);
        }

        let declared = self.decl(decl).params.clone();
        let path = self.decl(decl).path.to_string();
        let generic_build = self
            .class(decl)
            .is_some_and(|c| c.kind == ClassKind::GenericBuild);
        let has_rest = generic_build && declared.last().is_some_and(|p| p.name == "Rest");

        let mut loaded = Vec::with_capacity(args.len());
        for arg in args {
            loaded.push(self.load_type_arg(arg)?);
        }
        let found = loaded.len();
        let mut remaining = loaded.into_iter();
        let mut params = Vec::with_capacity(declared.len());
        let mut pending = Vec::new();

        for (i, tp) in declared.iter().enumerate() {
            if has_rest && i + 1 == declared.len() {
                params.extend(remaining.by_ref().map(|a| a.ty));
                break;
            }
            match remaining.next() {
                Some(arg) => {
                    check_const(tp, &arg)?;
                    if self.has_constraints(tp) {
                        pending.push(PendingConstraint {
                            arg: arg.ty.clone(),
                            param: tp.clone(),
                            span: arg.span,
                        });
                    }
                    params.push(arg.ty);
                }
                None => match &tp.default {
                    Some(default) => params.push(default.clone()),
                    None if allow_omitted => params.push(self.monos.fresh()),
                    None => {
                        return Err(TypeloadError::new(
                            TypeloadErrorKind::NotEnoughTypeParameters {
                                path,
                                expected: declared.len(),
                                found,
                            },
                            span,
                        ));
                    }
                },
            }
        }

        let extra: Vec<LoadedArg> = remaining.collect();
        if !extra.is_empty() {
            if generic_build {
                params.extend(extra.into_iter().map(|a| a.ty));
            } else {
                return Err(TypeloadError::new(
                    TypeloadErrorKind::TooManyTypeParameters {
                        path,
                        expected: declared.len(),
                        found,
                    },
                    span,
                ));
            }
        }

        if !pending.is_empty() && !has_rest {
            let bound = params.clone();
            self.scheduler.delay(Pass::CheckConstraint, move |ctx| {
                for check in pending {
                    let constraints = ctx.constraints_of(check.param.decl);
                    for constraint in constraints {
                        let constraint = ctx.apply_params(&declared, &bound, &constraint);
                        ctx.check_constraint(&check.arg, &constraint, &path, &check.param.name, check.span);
                    }
                }
            });
        }

        Ok(self.apply_decl(decl, params))
    }

    fn instantiate_dynamic(&mut self, args: &[TypeArgHint], span: SourceSpan) -> TypeloadResult<Type> {
        match args {
            [] => Ok(Type::dynamic()),
            [TypeArgHint::Type(hint)] => {
                let inner = self.load_complex_type(hint)?;
                Ok(Type::Dynamic(Some(Box::new(inner))))
            }
            [TypeArgHint::Expr(e)] => Err(TypeloadError::new(
                TypeloadErrorKind::UnexpectedConstant {
                    param: "T".to_string(),
                },
                e.span,
            )),
            _ => Err(TypeloadError::new(
                TypeloadErrorKind::TooManyTypeParameters {
                    path: "Dynamic".to_string(),
                    expected: 1,
                    found: args.len(),
                },
                span,
            )),
        }
    }

    pub fn load_type_arg(&mut self, arg: &TypeArgHint) -> TypeloadResult<LoadedArg> {
        match arg {
            TypeArgHint::Type(hint) => Ok(LoadedArg {
                ty: self.load_complex_type(hint)?,
                is_expr: false,
                span: hint.span(),
            }),
            TypeArgHint::Expr(expr) => {
                let ty = self.expression_literal(expr)?;
                Ok(LoadedArg {
                    ty,
                    is_expr: true,
                    span: expr.span,
                })
            }
        }
    }

    /// Wraps a constant (or, where allowed, any expression) as an opaque class type
    fn expression_literal(&mut self, expr: &Expr) -> TypeloadResult<Type> {
        let name = match &expr.kind {
            ExprKind::Const(Constant::String(s)) => format!("S{}", s),
            ExprKind::Const(Constant::Int(i)) => format!("I{}", i),
            ExprKind::Const(Constant::Float(f)) => format!("F{}", f),
            _ if self.scope.allow_expressions => "Expr".to_string(),
            _ => {
                return Err(TypeloadError::new(
                    TypeloadErrorKind::ExpressionNotAllowed,
                    expr.span,
                ));
            }
        };
        let module = self.scope.module.unwrap_or(self.std.module);
        let mut decl = Declaration::new(
            TypePath::root(name),
            module,
            DeclKind::Class(ClassDecl::new(
                ClassFlags::NONE,
                ClassKind::ExprLiteral(expr.clone()),
            )),
        );
        decl.span = expr.span;
        decl.private = true;
        decl.build_state = BuildState::Built;
        let id = self.add_decl(decl);
        Ok(Type::instance(id, Vec::new()))
    }

    fn has_constraints(&self, tp: &TypeParam) -> bool {
        matches!(
            self.class(tp.decl).map(|c| &c.kind),
            Some(ClassKind::TypeParameter { constraints }) if !constraints.is_empty()
        )
    }

    pub fn constraints_of(&self, param_decl: DeclId) -> Vec<Type> {
        match self.class(param_decl).map(|c| &c.kind) {
            Some(ClassKind::TypeParameter { constraints }) => constraints.clone(),
            _ => Vec::new(),
        }
    }

    /// Requires `arg` to satisfy `constraint`. Unbound monomorphs are skipped;
    /// expression literals fall back to typing the expression against the constraint.
    pub fn check_constraint(
        &mut self,
        arg: &Type,
        constraint: &Type,
        owner: &str,
        param: &str,
        span: SourceSpan,
    ) {
        let followed = self.follow(arg);
        if matches!(followed, Type::Mono(_)) {
            return;
        }
        let Err(err) = self.unify(arg, constraint) else {
            return;
        };

        let literal = match &followed {
            Type::Instance { decl, .. } => match self.class(*decl).map(|c| &c.kind) {
                Some(ClassKind::ExprLiteral(expr)) => Some(expr.clone()),
                _ => None,
            },
            _ => None,
        };
        if let Some(expr) = literal {
            let typed = self.typer.type_expression(&expr, Some(constraint), &self.std);
            if let Ok(typed) = typed {
                if self.unify(&typed.ty, constraint).is_ok() {
                    return;
                }
            }
        }

        let notes = self.explain_unify(&err);
        let error = TypeloadError::new(
            TypeloadErrorKind::ConstraintFailure {
                owner: owner.to_string(),
                param: param.to_string(),
            },
            span,
        )
        .with_notes(notes);
        self.report(error);
    }
}

fn check_const(tp: &TypeParam, arg: &LoadedArg) -> TypeloadResult<()> {
    if arg.is_expr && !tp.expects_constant() {
        return Err(TypeloadError::new(
            TypeloadErrorKind::UnexpectedConstant {
                param: tp.name.clone(),
            },
            arg.span,
        ));
    }
    if !arg.is_expr && tp.is_const {
        return Err(TypeloadError::new(
            TypeloadErrorKind::ConstantExpected {
                param: tp.name.clone(),
            },
            arg.span,
        ));
    }
    Ok(())
}
