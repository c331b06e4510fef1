//! Anonymous structure types
//!
//! Builds `{ a : Int }`, `{ > A, b : String }` and `A & B` from their syntax.
//! Extensions and intersections merge fields of other types, which may not be
//! loaded yet, so both are produced as lazy cells with a fresh monomorph standing
//! in for the result. A structure that reaches its own stand-in while merging is
//! a cyclic definition.

use super::context::TypeloadContext;
use super::core::{AnonStatus, AnonType, FunArg, Type};
use super::errors::{TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::symbols::{Field, FieldFlags, FieldKind, MethodKind, TypeParamHost, TypePath, VarAccess};
use crate::syntax::{Access, FieldKindSyntax, FieldSyntax, FunctionSyntax, TypeHint, TypePathHint};
use indexmap::IndexMap;
use source_map::SourceSpan;

const META_OPTIONAL: &str = ":optional";

impl TypeloadContext {
    pub fn build_anonymous(&mut self, fields: &[FieldSyntax], _span: SourceSpan) -> TypeloadResult<Type> {
        let loaded = self.load_structure_fields(fields)?;
        Ok(self.add_anon(AnonType::closed(loaded)))
    }

    fn load_structure_fields(&mut self, fields: &[FieldSyntax]) -> TypeloadResult<IndexMap<String, Field>> {
        let mut loaded = IndexMap::with_capacity(fields.len());
        for syntax in fields {
            if loaded.contains_key(&syntax.name) {
                return Err(TypeloadError::new(
                    TypeloadErrorKind::DuplicateStructureField {
                        name: syntax.name.clone(),
                    },
                    syntax.span,
                ));
            }
            let field = self.load_structure_field(syntax)?;
            loaded.insert(syntax.name.clone(), field);
        }
        Ok(loaded)
    }

    pub fn load_structure_field(&mut self, syntax: &FieldSyntax) -> TypeloadResult<Field> {
        let mut flags = FieldFlags::PUBLIC;
        let mut is_final = false;
        let mut method_kind = MethodKind::Normal;
        for access in &syntax.access {
            match access {
                Access::Public => {}
                Access::Dynamic => method_kind = MethodKind::Dynamic,
                Access::Private => flags.remove(FieldFlags::PUBLIC),
                Access::Final => is_final = true,
                other => {
                    return Err(TypeloadError::new(
                        TypeloadErrorKind::InvalidStructureAccess {
                            access: format!("{:?}", other).to_lowercase(),
                        },
                        syntax.span,
                    ));
                }
            }
        }
        let optional = syntax.meta.iter().any(|m| m.name == META_OPTIONAL);

        let (ty, kind, params) = match &syntax.kind {
            FieldKindSyntax::Var { hint, expr } => {
                if expr.is_some() {
                    return Err(self.expression_in_structure(syntax));
                }
                let ty = self.require_structure_hint(syntax, hint.as_ref())?;
                let kind = if is_final {
                    FieldKind::Var {
                        read: VarAccess::Normal,
                        write: VarAccess::Never,
                    }
                } else {
                    FieldKind::PLAIN_VAR
                };
                (ty, kind, Vec::new())
            }
            FieldKindSyntax::Prop { get, set, hint, expr } => {
                if expr.is_some() {
                    return Err(self.expression_in_structure(syntax));
                }
                let ty = self.require_structure_hint(syntax, hint.as_ref())?;
                let read = property_access(get, &syntax.name, true, syntax.span)?;
                let write = property_access(set, &syntax.name, false, syntax.span)?;
                (ty, FieldKind::Var { read, write }, Vec::new())
            }
            FieldKindSyntax::Fun(function) => {
                if function.body.is_some() {
                    return Err(self.expression_in_structure(syntax));
                }
                let owner = TypePath::root(syntax.name.clone());
                let params = self.create_type_params(&owner, &function.params, TypeParamHost::AnonField);
                let mut scope = self.scope.clone();
                scope.type_params.extend(params.iter().cloned());
                let ty = self.with_scope(scope, |ctx| ctx.load_signature(syntax, function))?;
                (ty, FieldKind::Method(method_kind), params)
            }
        };

        let mut field = Field::new(syntax.name.clone(), ty, kind);
        field.span = syntax.span;
        field.meta = syntax.meta.clone();
        field.params = params;
        field.flags = flags;
        if optional {
            field.flags.insert(FieldFlags::OPTIONAL);
            field.ty = self.std.null_of(field.ty);
        }
        if is_final {
            field.flags.insert(FieldFlags::FINAL);
        }
        Ok(field)
    }

    fn require_structure_hint(&mut self, syntax: &FieldSyntax, hint: Option<&TypeHint>) -> TypeloadResult<Type> {
        let Some(hint) = hint else {
            return Err(TypeloadError::new(
                TypeloadErrorKind::ExplicitTypeRequired {
                    name: syntax.name.clone(),
                },
                syntax.span,
            ));
        };
        let ty = self.load_complex_type(hint)?;
        if self.std.is_void(&ty) {
            return Err(TypeloadError::new(
                TypeloadErrorKind::VoidStructureField {
                    name: syntax.name.clone(),
                },
                syntax.span,
            ));
        }
        Ok(ty)
    }

    /// Signature of a bodiless structure method; every argument and the return need a hint
    fn load_signature(&mut self, syntax: &FieldSyntax, function: &FunctionSyntax) -> TypeloadResult<Type> {
        let mut args = Vec::with_capacity(function.args.len());
        for arg in &function.args {
            let Some(hint) = &arg.hint else {
                return Err(TypeloadError::new(
                    TypeloadErrorKind::ExplicitTypeRequired {
                        name: format!("{}.{}", syntax.name, arg.name),
                    },
                    arg.span,
                ));
            };
            let mut loaded = FunArg::new(arg.name.clone(), self.load_complex_type(hint)?);
            if arg.optional {
                loaded = loaded.optional();
            }
            args.push(loaded);
        }
        let Some(ret) = &function.ret else {
            return Err(TypeloadError::new(
                TypeloadErrorKind::ExplicitTypeRequired {
                    name: syntax.name.clone(),
                },
                syntax.span,
            ));
        };
        let ret = self.load_complex_type(ret)?;
        Ok(Type::function(args, ret))
    }

    fn expression_in_structure(&self, syntax: &FieldSyntax) -> TypeloadError {
        TypeloadError::new(
            TypeloadErrorKind::ExpressionInStructure {
                name: syntax.name.clone(),
            },
            syntax.span,
        )
    }

    /// `{ > A, > B, extra : T }`
    pub fn build_extension(
        &mut self,
        bases: &[TypePathHint],
        fields: &[FieldSyntax],
        span: SourceSpan,
    ) -> TypeloadResult<Type> {
        let mut sources = Vec::with_capacity(bases.len());
        for base in bases {
            sources.push((self.load_type_path(base, false)?, base.span));
        }
        let own = self.load_structure_fields(fields)?;
        let status = AnonStatus::Extend(sources.iter().map(|(t, _)| t.clone()).collect());
        let stand_in = self.monos.fresh();
        Ok(self.make_lazy(stand_in, move |ctx| {
            ctx.merge_structures(&sources, own, status, span)
        }))
    }

    /// `A & B`
    pub fn build_intersection(&mut self, parts: &[TypeHint], span: SourceSpan) -> TypeloadResult<Type> {
        let mut sources = Vec::with_capacity(parts.len());
        for part in parts {
            sources.push((self.load_complex_type(part)?, part.span()));
        }
        let stand_in = self.monos.fresh();
        Ok(self.make_lazy(stand_in, move |ctx| {
            ctx.merge_structures(&sources, IndexMap::new(), AnonStatus::Closed, span)
        }))
    }

    /// Merges the fields of every source plus `own` into one closed structure.
    /// A name present twice must carry identical types.
    pub fn merge_structures(
        &mut self,
        sources: &[(Type, SourceSpan)],
        own: IndexMap<String, Field>,
        status: AnonStatus,
        span: SourceSpan,
    ) -> TypeloadResult<Type> {
        let mut merged: IndexMap<String, Field> = IndexMap::new();
        for (source, source_span) in sources {
            let fields = self.structure_fields(source, *source_span)?;
            for field in fields.into_values() {
                self.merge_field(&mut merged, field)?;
            }
        }
        for field in own.into_values() {
            self.merge_field(&mut merged, field)?;
        }
        log::trace!("merged structure with {} fields at {}", merged.len(), span);
        Ok(self.add_anon(AnonType { fields: merged, status }))
    }

    fn structure_fields(&mut self, t: &Type, span: SourceSpan) -> TypeloadResult<IndexMap<String, Field>> {
        let followed = self.follow(t);
        match &followed {
            Type::Anonymous(id) => Ok(self.anon(*id).fields.clone()),
            Type::Mono(_) => Err(TypeloadError::new(TypeloadErrorKind::LoopInDefinition, span)),
            // a base that already failed to load was reported where it failed
            Type::Dynamic(_) => {
                log::debug!("extending Dynamic contributes no fields");
                Ok(IndexMap::new())
            }
            Type::Instance { decl, .. } if self.decl(*decl).is_type_parameter() => Err(
                TypeloadError::new(TypeloadErrorKind::ExtendTypeParameterStructurally, span),
            ),
            other => Err(TypeloadError::new(
                TypeloadErrorKind::ExtendNonStructure {
                    found: self.type_to_string(other),
                },
                span,
            )),
        }
    }

    fn merge_field(&mut self, merged: &mut IndexMap<String, Field>, field: Field) -> TypeloadResult<()> {
        if let Some(existing) = merged.get(&field.name) {
            let first = existing.ty.clone();
            if !self.type_iseq(&first, &field.ty) {
                return Err(TypeloadError::new(
                    TypeloadErrorKind::FieldRedefinition {
                        name: field.name.clone(),
                    },
                    field.span,
                )
                .with_related(format!("First type was {}", self.type_to_string(&first)), existing.span)
                .with_related(format!("Second type was {}", self.type_to_string(&field.ty)), field.span));
            }
            return Ok(());
        }
        merged.insert(field.name.clone(), field);
        Ok(())
    }
}

/// Maps a property accessor token to its access mode. `get` and `set` are only
/// valid on their own side; `get_<name>` / `set_<name>` are accepted as aliases.
pub fn property_access(token: &str, name: &str, get: bool, span: SourceSpan) -> TypeloadResult<VarAccess> {
    let accessor = if get { "get" } else { "set" };
    match token {
        "null" => Ok(VarAccess::No),
        "never" => Ok(VarAccess::Never),
        "default" => Ok(VarAccess::Normal),
        "dynamic" => Ok(VarAccess::Call),
        t if t == accessor => Ok(VarAccess::Call),
        t if t == format!("{}_{}", accessor, name) => Ok(VarAccess::Call),
        other => Err(TypeloadError::new(
            TypeloadErrorKind::CustomPropertyAccessor {
                accessor: other.to_string(),
            },
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_access_tokens() {
        let span = SourceSpan::unknown();
        assert_eq!(property_access("null", "x", true, span).ok(), Some(VarAccess::No));
        assert_eq!(property_access("never", "x", false, span).ok(), Some(VarAccess::Never));
        assert_eq!(property_access("default", "x", true, span).ok(), Some(VarAccess::Normal));
        assert_eq!(property_access("get", "x", true, span).ok(), Some(VarAccess::Call));
        assert_eq!(property_access("set_x", "x", false, span).ok(), Some(VarAccess::Call));
        assert!(property_access("set", "x", true, span).is_err());
        assert!(property_access("fetch", "x", true, span).is_err());
    }
}
