//! Class field loading

use super::context::TypeloadContext;
use super::core::{FunArg, Type};
use super::errors::{TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::structure_builder::property_access;
use super::symbols::{Field, FieldFlags, FieldKind, MethodKind, TypeParamHost, TypePath, VarAccess};
use super::DeclId;
use crate::syntax::{Access, Constant, Expr, ExprKind, FieldKindSyntax, FieldSyntax, FunctionSyntax, MetaEntry, TypeHint};

pub const CONSTRUCTOR_NAME: &str = "new";

impl TypeloadContext {
    /// Loads every field of `decl` into its constructor, statics or instance table
    pub fn init_class_fields(&mut self, decl: DeclId, fields: &[FieldSyntax]) {
        for syntax in fields {
            let field = match self.load_class_field(decl, syntax) {
                Ok(field) => field,
                Err(err) => {
                    self.report(err);
                    continue;
                }
            };
            if let Err(err) = self.add_class_field(decl, field) {
                self.report(err);
            }
        }
    }

    fn add_class_field(&mut self, decl: DeclId, field: Field) -> TypeloadResult<()> {
        let Some(class) = self.class_mut(decl) else {
            return Ok(());
        };
        let span = field.span;
        if field.name == CONSTRUCTOR_NAME && !field.has_flag(FieldFlags::STATIC) {
            if class.constructor.is_some() {
                return Err(TypeloadError::new(TypeloadErrorKind::DuplicateConstructor, span));
            }
            class.constructor = Some(field);
            return Ok(());
        }

        if field.has_flag(FieldFlags::STATIC) {
            let misplaced_override = field.has_flag(FieldFlags::OVERRIDE);
            let name = field.name.clone();
            if class.statics.contains_key(&name) {
                return Err(TypeloadError::new(TypeloadErrorKind::DuplicateClassField { name }, span));
            }
            class.statics.insert(name.clone(), field);
            if misplaced_override {
                return Err(TypeloadError::new(TypeloadErrorKind::OverrideStatic { field: name }, span));
            }
            return Ok(());
        }

        match class.fields.get_mut(&field.name) {
            Some(existing)
                if existing.has_flag(FieldFlags::OVERLOAD) || field.has_flag(FieldFlags::OVERLOAD) =>
            {
                existing.overloads.push(field);
                Ok(())
            }
            Some(_) => Err(TypeloadError::new(
                TypeloadErrorKind::DuplicateClassField { name: field.name },
                span,
            )),
            None => {
                class.fields.insert(field.name.clone(), field);
                Ok(())
            }
        }
    }

    pub fn load_class_field(&mut self, decl: DeclId, syntax: &FieldSyntax) -> TypeloadResult<Field> {
        let (is_interface, is_abstract_class) = self
            .class(decl)
            .map(|c| (c.is_interface(), c.is_abstract()))
            .unwrap_or((false, false));

        let mut flags = FieldFlags::NONE;
        let mut method_kind = MethodKind::Normal;
        for access in &syntax.access {
            match access {
                Access::Public => flags.insert(FieldFlags::PUBLIC),
                Access::Private => {}
                Access::Static => flags.insert(FieldFlags::STATIC),
                Access::Override => flags.insert(FieldFlags::OVERRIDE),
                Access::Dynamic => method_kind = MethodKind::Dynamic,
                Access::Inline => method_kind = MethodKind::Inline,
                Access::Macro => method_kind = MethodKind::Macro,
                Access::Final => flags.insert(FieldFlags::FINAL),
                Access::Extern => flags.insert(FieldFlags::EXTERN),
                Access::Abstract => flags.insert(FieldFlags::ABSTRACT),
                Access::Overload => flags.insert(FieldFlags::OVERLOAD),
            }
        }
        if is_interface {
            flags.insert(FieldFlags::PUBLIC);
        }

        let mut field = match &syntax.kind {
            FieldKindSyntax::Var { hint, expr } => {
                let ty = self.field_type(hint.as_ref(), expr.as_ref())?;
                let mut field = Field::new(syntax.name.clone(), ty, FieldKind::PLAIN_VAR);
                field.has_expr = expr.is_some();
                field
            }
            FieldKindSyntax::Prop { get, set, hint, expr } => {
                let read = property_access(get, &syntax.name, true, syntax.span)?;
                let write = property_access(set, &syntax.name, false, syntax.span)?;
                let ty = self.field_type(hint.as_ref(), expr.as_ref())?;
                let mut field = Field::new(syntax.name.clone(), ty, FieldKind::Var { read, write });
                field.has_expr = expr.is_some();
                field
            }
            FieldKindSyntax::Fun(function) => {
                if flags.contains(FieldFlags::ABSTRACT) {
                    if !is_abstract_class {
                        return Err(TypeloadError::new(
                            TypeloadErrorKind::AbstractMethodInConcreteClass {
                                name: syntax.name.clone(),
                            },
                            syntax.span,
                        ));
                    }
                    if function.body.is_some() {
                        return Err(TypeloadError::new(
                            TypeloadErrorKind::AbstractMethodWithBody {
                                name: syntax.name.clone(),
                            },
                            syntax.span,
                        ));
                    }
                }
                if is_interface && function.body.is_some() {
                    flags.insert(FieldFlags::DEFAULT);
                }
                self.load_method(decl, syntax, function, method_kind)?
            }
        };
        if let FieldKind::Var { read, .. } = &mut field.kind {
            if syntax.meta.iter().any(|m| !self.requirement_met(m)) {
                *read = VarAccess::Require;
            }
        }
        field.flags = flags;
        field.meta = syntax.meta.clone();
        field.span = syntax.span;
        Ok(field)
    }

    /// `@:require(flag)` holds when every named flag is defined
    fn requirement_met(&self, meta: &MetaEntry) -> bool {
        if meta.name != ":require" {
            return true;
        }
        meta.params.iter().all(|param| match &param.kind {
            ExprKind::Const(Constant::Ident(flag)) => self.config.defines.contains(flag),
            _ => true,
        })
    }

    /// Declared type, or the literal type of the initializer, or a monomorph
    fn field_type(&mut self, hint: Option<&TypeHint>, expr: Option<&Expr>) -> TypeloadResult<Type> {
        if let Some(hint) = hint {
            return self.load_complex_type(hint);
        }
        if let Some(expr) = expr {
            if let Ok(typed) = self.typer.type_expression(expr, None, &self.std) {
                return Ok(typed.ty);
            }
        }
        Ok(self.monos.fresh())
    }

    fn load_method(
        &mut self,
        decl: DeclId,
        syntax: &FieldSyntax,
        function: &FunctionSyntax,
        kind: MethodKind,
    ) -> TypeloadResult<Field> {
        let is_constructor = syntax.name == CONSTRUCTOR_NAME;
        let host = if is_constructor {
            TypeParamHost::Constructor
        } else {
            TypeParamHost::Method
        };
        let class_path = self.decl(decl).path.clone();
        let owner = TypePath::new(
            class_path.pack.iter().cloned().chain([class_path.name]).collect(),
            syntax.name.clone(),
        );
        let params = self.create_type_params(&owner, &function.params, host);
        let mut scope = self.scope.clone();
        scope.type_params.extend(params.iter().cloned());

        let ty = self.with_scope(scope, |ctx| -> TypeloadResult<Type> {
            let mut args = Vec::with_capacity(function.args.len());
            for arg in &function.args {
                let ty = match &arg.hint {
                    Some(hint) => ctx.load_complex_type(hint)?,
                    None => ctx.monos.fresh(),
                };
                let mut loaded = FunArg::new(arg.name.clone(), ty);
                if arg.optional || arg.default.is_some() {
                    loaded = loaded.optional();
                }
                args.push(loaded);
            }
            let ret = match &function.ret {
                Some(hint) => ctx.load_complex_type(hint)?,
                None if is_constructor => ctx.std.void_type(),
                None => ctx.monos.fresh(),
            };
            Ok(Type::function(args, ret))
        })?;

        let mut field = Field::new(syntax.name.clone(), ty, FieldKind::Method(kind));
        field.params = params;
        field.has_expr = function.body.is_some();
        Ok(field)
    }
}
