//! Typeload errors to diagnostics
//!
//! Converts [`TypeloadError`]s and unification cause chains into entries of the
//! context's diagnostics sink, attaching the stable code and help text from the
//! error registry.

use super::context::TypeloadContext;
use super::errors::{TypeloadError, TypeloadErrorKind, UnifyCause, UnifyError};
use crate::error_codes::{self, format_error_code, get_error_code};
use diagnostics::{DiagnosticBuilder, SourceSpan};

/// Registry code for an error kind
pub fn error_code(kind: &TypeloadErrorKind) -> u16 {
    use TypeloadErrorKind::*;
    match kind {
        ModuleNotFound { .. } => error_codes::MODULE_NOT_FOUND,
        TypeNotFound { .. } => error_codes::TYPE_NOT_FOUND,
        DuplicateType { .. } => error_codes::DUPLICATE_TYPE,
        NotEnoughTypeParameters { .. } | TooManyTypeParameters { .. } => {
            error_codes::TYPE_PARAMETER_COUNT
        }
        ConstantExpected { .. } | UnexpectedConstant { .. } | ExpressionNotAllowed => {
            error_codes::CONSTANT_TYPE_PARAMETER
        }
        TypeParameterWithParameters { .. }
        | DuplicateTypeParameter { .. }
        | DefaultTypeParameterNotAllowed { .. } => error_codes::INVALID_TYPE_PARAMETER,
        ConstraintFailure { .. } => error_codes::CONSTRAINT_FAILURE,
        DuplicateStructureField { .. } => error_codes::DUPLICATE_STRUCTURE_FIELD,
        FieldRedefinition { .. } => error_codes::FIELD_REDEFINITION,
        ExplicitTypeRequired { .. } => error_codes::EXPLICIT_TYPE_REQUIRED,
        VoidStructureField { .. } => error_codes::VOID_STRUCTURE_FIELD,
        InvalidStructureAccess { .. } => error_codes::INVALID_STRUCTURE_ACCESS,
        ExpressionInStructure { .. } => error_codes::EXPRESSION_IN_STRUCTURE,
        CustomPropertyAccessor { .. } => error_codes::CUSTOM_PROPERTY_ACCESSOR,
        ExtendTypeParameterStructurally | ExtendNonStructure { .. } => {
            error_codes::EXTEND_NON_STRUCTURE
        }
        LoopInDefinition => error_codes::LOOP_IN_DEFINITION,
        MultipleSuperclasses | ExtendBasicClass { .. } | ExtendTypeParameter | ExtendWithInterface
        | ExtendWithClass | ExtendNonClass => error_codes::INVALID_SUPERCLASS,
        ExtendFinalClass { .. } => error_codes::EXTEND_FINAL_CLASS,
        RecursiveClass => error_codes::RECURSIVE_CLASS,
        ImplementWithClass | ImplementNonInterface | InterfaceImplements => {
            error_codes::INVALID_INTERFACE
        }
        DuplicateArrayAccess | ImplementsDynamicOnNonExtern | MultipleDynamic => {
            error_codes::INVALID_SPECIAL_HERITAGE
        }
        DuplicateClassField { .. } | DuplicateConstructor => error_codes::DUPLICATE_CLASS_FIELD,
        AbstractMethodInConcreteClass { .. } | AbstractMethodWithBody { .. } => {
            error_codes::INVALID_ABSTRACT_METHOD
        }
        MissingOverride { .. } => error_codes::MISSING_OVERRIDE,
        OverrideWithoutParent { .. } | OverrideNoCompatibleOverload { .. } => {
            error_codes::OVERRIDE_WITHOUT_PARENT
        }
        OverrideLessVisible { .. }
        | OverrideInline { .. }
        | OverrideAccessMismatch { .. }
        | OverrideFinal { .. }
        | OverrideStatic { .. } => error_codes::INVALID_OVERRIDE,
        IncompatibleOverride { .. } => error_codes::INCOMPATIBLE_OVERRIDE,
        InterfaceFieldNotPublic { .. }
        | InterfaceAccessMismatch { .. }
        | InterfaceFieldTypeMismatch { .. } => error_codes::INTERFACE_FIELD_MISMATCH,
        MissingInterfaceFields { .. } => error_codes::MISSING_INTERFACE_FIELDS,
        MissingAbstractImplementations { .. } => error_codes::MISSING_ABSTRACT_IMPLEMENTATIONS,
        UninitializedFinal { .. } | FinalVarsWithoutConstructor => error_codes::UNINITIALIZED_FINAL,
        BuildRetriesExhausted { .. } => error_codes::BUILD_RETRIES_EXHAUSTED,
        Custom(_) => error_codes::CUSTOM_ERROR,
    }
}

impl TypeloadContext {
    /// Pushes `err` to the diagnostics sink
    pub fn report(&mut self, err: TypeloadError) {
        let code = error_code(&err.kind);
        log::debug!("{}: {}", format_error_code(code), err);

        let mut builder = DiagnosticBuilder::error(err.message(), err.span)
            .code(format_error_code(code))
            .label(err.span, primary_label(&err.kind));
        for (message, span) in &err.related {
            builder = builder.secondary_label(*span, message.clone());
        }
        for note in &err.notes {
            builder = builder.note(note.clone());
        }
        if let Some(help) = get_error_code(code).and_then(|c| c.help) {
            builder = builder.help(help);
        }
        self.diagnostics.push(builder.build());
    }

    pub fn report_warning(&mut self, code: u16, message: impl Into<String>, span: SourceSpan) {
        let mut builder = DiagnosticBuilder::warning(message, span).code(format_error_code(code));
        if let Some(help) = get_error_code(code).and_then(|c| c.help) {
            builder = builder.help(help);
        }
        self.diagnostics.push(builder.build());
    }

    /// Renders a unification failure as note lines, outermost cause first
    pub fn explain_unify(&self, err: &UnifyError) -> Vec<String> {
        err.causes
            .iter()
            .map(|cause| match cause {
                UnifyCause::CannotUnify { from, to } => format!(
                    "{} should be {}",
                    self.type_to_string(from),
                    self.type_to_string(to)
                ),
                UnifyCause::InvalidReturnType => "Cannot unify return types".to_string(),
                UnifyCause::InvalidArgument { index, count } => {
                    format!("For function argument {} of {}", index, count)
                }
                UnifyCause::NotMatchingOptional { name } => {
                    format!("Argument {} optionality does not match", name)
                }
                UnifyCause::DifferentArgumentCount => "Different number of function arguments".to_string(),
                UnifyCause::ConstraintsDiffer => "Constraints differ".to_string(),
                UnifyCause::DifferentConstraintCount => "Different number of constraints".to_string(),
                UnifyCause::MissingField { name } => format!("Missing field {}", name),
                UnifyCause::InvalidFieldAccess { name } => format!("Inconsistent access for field {}", name),
                UnifyCause::NullabilityMismatch => "Nullability differs".to_string(),
                UnifyCause::Custom(message) => message.clone(),
            })
            .collect()
    }
}

fn primary_label(kind: &TypeloadErrorKind) -> &'static str {
    use TypeloadErrorKind::*;
    match kind {
        MissingOverride { .. } | IncompatibleOverride { .. } => "overriding field",
        MissingInterfaceFields { .. } | MissingAbstractImplementations { .. } => "in this class",
        UninitializedFinal { .. } => "declared here",
        TypeNotFound { .. } | ModuleNotFound { .. } => "not found",
        _ => "here",
    }
}

/// Closest candidate to `name` by edit distance, if any is close enough to be
/// a plausible typo
pub fn suggest_similar(name: &str, candidates: &[String]) -> Option<String> {
    let limit = (name.chars().count() / 3).max(1);
    candidates
        .iter()
        .filter(|c| c.as_str() != name)
        .map(|c| (edit_distance(name, c), c))
        .filter(|(d, _)| *d <= limit)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c.clone())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_suggest_similar() {
        let candidates = vec!["toString".to_string(), "update".to_string()];
        assert_eq!(suggest_similar("toStrin", &candidates), Some("toString".to_string()));
        assert_eq!(suggest_similar("render", &candidates), None);
    }

    #[test]
    fn test_error_codes_are_registered() {
        let kinds = [
            TypeloadErrorKind::LoopInDefinition,
            TypeloadErrorKind::RecursiveClass,
            TypeloadErrorKind::FinalVarsWithoutConstructor,
            TypeloadErrorKind::Custom("x".into()),
        ];
        for kind in &kinds {
            assert!(get_error_code(error_code(kind)).is_some(), "{:?}", kind);
        }
    }
}
