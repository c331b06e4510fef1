//! Turning type hints into types

use super::context::TypeloadContext;
use super::core::{FunArg, Type};
use super::errors::{TypeloadError, TypeloadErrorKind, TypeloadResult};
use crate::syntax::{TypeHint, TypePathHint};

impl TypeloadContext {
    pub fn load_complex_type(&mut self, hint: &TypeHint) -> TypeloadResult<Type> {
        match hint {
            TypeHint::Path(path) => self.load_type_path(path, false),
            TypeHint::Optional(inner) => {
                let t = self.load_complex_type(inner)?;
                Ok(self.std.null_of(t))
            }
            TypeHint::Function { args, ret } => {
                let mut loaded = Vec::with_capacity(args.len());
                for arg in args {
                    let fun_arg = match arg {
                        TypeHint::Optional(inner) => FunArg::new("", self.load_complex_type(inner)?).optional(),
                        other => FunArg::new("", self.load_complex_type(other)?),
                    };
                    loaded.push(fun_arg);
                }
                // `Void -> T` takes no arguments
                if let [only] = loaded.as_slice() {
                    if !only.optional && self.std.is_void(&only.ty) {
                        loaded.clear();
                    }
                }
                let ret = self.load_complex_type(ret)?;
                Ok(Type::function(loaded, ret))
            }
            TypeHint::Anonymous(fields) => self.build_anonymous(fields, hint.span()),
            TypeHint::Extend { bases, fields } => self.build_extension(bases, fields, hint.span()),
            TypeHint::Intersection(parts) => self.build_intersection(parts, hint.span()),
        }
    }

    /// Loads a path, checking type parameters in scope before declarations
    pub fn load_type_path(&mut self, path: &TypePathHint, allow_omitted: bool) -> TypeloadResult<Type> {
        if path.pack.is_empty() && path.sub.is_none() {
            if let Some(tp) = self.scope.find_type_param(&path.name) {
                if !path.params.is_empty() {
                    return Err(TypeloadError::new(
                        TypeloadErrorKind::TypeParameterWithParameters {
                            name: path.name.clone(),
                        },
                        path.span,
                    ));
                }
                return Ok(tp.ty.clone());
            }
        }
        let decl = self.resolve(path)?;
        self.instantiate(decl, &path.params, allow_omitted, path.span)
    }
}
