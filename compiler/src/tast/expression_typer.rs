//! Typing of expressions the loader runs into
//!
//! Full expression typing is outside the loader. It only needs a type for
//! untyped var initializers and for expression type arguments checked against
//! a constraint, and asks an [`ExpressionTyper`] for those.

use super::core::Type;
use super::core_types::StdTypes;
use super::errors::{TypeloadError, TypeloadResult};
use crate::syntax::{Constant, Expr, ExprKind};
use source_map::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpression {
    pub ty: Type,
    pub span: SourceSpan,
}

pub trait ExpressionTyper {
    fn type_expression(
        &mut self,
        expr: &Expr,
        expected: Option<&Type>,
        std: &StdTypes,
    ) -> TypeloadResult<TypedExpression>;
}

/// Types literals and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralTyper;

impl ExpressionTyper for LiteralTyper {
    fn type_expression(
        &mut self,
        expr: &Expr,
        expected: Option<&Type>,
        std: &StdTypes,
    ) -> TypeloadResult<TypedExpression> {
        let ty = match &expr.kind {
            ExprKind::Const(Constant::Int(_)) => std.int_type(),
            ExprKind::Const(Constant::Float(_)) => std.float_type(),
            ExprKind::Const(Constant::String(_)) => std.string_type(),
            ExprKind::Const(Constant::Ident(id)) if id == "true" || id == "false" => std.bool_type(),
            ExprKind::Paren(inner) => return self.type_expression(inner, expected, std),
            _ => {
                return Err(TypeloadError::custom(
                    "Only literal expressions can be typed here",
                    expr.span,
                ))
            }
        };
        Ok(TypedExpression { ty, span: expr.span })
    }
}
