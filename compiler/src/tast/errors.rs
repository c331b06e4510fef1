//! Error channels of the type loader
//!
//! Three separate channels are kept apart:
//! - [`TypeloadError`]: a hard failure that aborts the current build step and is
//!   reported once it reaches the owner of the diagnostics sink.
//! - [`UnifyError`]: a structured assignability failure with a cause chain, folded
//!   into a diagnostic by whoever asked the question.
//! - [`BuildCancelled`]: a dependency-not-ready control signal. It never reaches the
//!   diagnostics sink; the scheduler turns it into a retry.

use super::core::Type;
use super::symbols::BuildState;
use super::DeclId;
use source_map::SourceSpan;
use std::fmt;

pub type TypeloadResult<T> = Result<T, TypeloadError>;

/// Why a type lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Nothing with that name is visible from the requesting module
    NotDefined,
    /// The module exists but does not declare the requested type
    NotDefinedInModule(String),
    /// The type exists but is private to another module
    PrivateType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeloadErrorKind {
    ModuleNotFound {
        path: String,
    },
    TypeNotFound {
        name: String,
        reason: NotFoundReason,
    },
    DuplicateType {
        name: String,
    },

    NotEnoughTypeParameters {
        path: String,
        expected: usize,
        found: usize,
    },
    TooManyTypeParameters {
        path: String,
        expected: usize,
        found: usize,
    },
    ConstantExpected {
        param: String,
    },
    UnexpectedConstant {
        param: String,
    },
    ExpressionNotAllowed,
    TypeParameterWithParameters {
        name: String,
    },
    DuplicateTypeParameter {
        name: String,
    },
    DefaultTypeParameterNotAllowed {
        name: String,
    },
    ConstraintFailure {
        owner: String,
        param: String,
    },

    DuplicateStructureField {
        name: String,
    },
    FieldRedefinition {
        name: String,
    },
    ExplicitTypeRequired {
        name: String,
    },
    VoidStructureField {
        name: String,
    },
    InvalidStructureAccess {
        access: String,
    },
    ExpressionInStructure {
        name: String,
    },
    CustomPropertyAccessor {
        accessor: String,
    },
    ExtendTypeParameterStructurally,
    LoopInDefinition,
    ExtendNonStructure {
        found: String,
    },

    MultipleSuperclasses,
    ExtendFinalClass {
        path: String,
    },
    ExtendBasicClass {
        path: String,
    },
    RecursiveClass,
    ExtendTypeParameter,
    ExtendWithInterface,
    ExtendWithClass,
    ExtendNonClass,
    ImplementWithClass,
    ImplementNonInterface,
    InterfaceImplements,
    DuplicateArrayAccess,
    ImplementsDynamicOnNonExtern,
    MultipleDynamic,

    DuplicateClassField {
        name: String,
    },
    DuplicateConstructor,
    AbstractMethodInConcreteClass {
        name: String,
    },
    AbstractMethodWithBody {
        name: String,
    },

    MissingOverride {
        field: String,
        superclass: String,
    },
    OverrideWithoutParent {
        field: String,
        suggestion: Option<String>,
    },
    OverrideNoCompatibleOverload {
        field: String,
    },
    OverrideLessVisible {
        field: String,
    },
    OverrideInline {
        field: String,
    },
    OverrideAccessMismatch {
        field: String,
    },
    OverrideFinal {
        field: String,
    },
    OverrideStatic {
        field: String,
    },
    IncompatibleOverride {
        field: String,
    },

    InterfaceFieldNotPublic {
        field: String,
        interface: String,
    },
    InterfaceAccessMismatch {
        field: String,
        interface: String,
    },
    InterfaceFieldTypeMismatch {
        field: String,
        interface: String,
    },
    MissingInterfaceFields {
        class: String,
        entries: Vec<String>,
    },
    MissingAbstractImplementations {
        class: String,
        entries: Vec<String>,
    },

    UninitializedFinal {
        field: String,
    },
    FinalVarsWithoutConstructor,

    BuildRetriesExhausted {
        path: String,
        dependency: String,
    },
    Custom(String),
}

impl fmt::Display for TypeloadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TypeloadErrorKind::*;
        match self {
            ModuleNotFound { path } => write!(f, "Module not found : {}", path),
            TypeNotFound { name, reason } => match reason {
                NotFoundReason::NotDefined => write!(f, "Type not found : {}", name),
                NotFoundReason::NotDefinedInModule(module) => {
                    write!(f, "Module {} does not define type {}", module, name)
                }
                NotFoundReason::PrivateType(module) => {
                    write!(f, "Cannot access private type {} in module {}", name, module)
                }
            },
            DuplicateType { name } => write!(f, "Name {} is already defined in this module", name),
            NotEnoughTypeParameters { path, expected, found } => write!(
                f,
                "Not enough type parameters for {} (expected {}, found {})",
                path, expected, found
            ),
            TooManyTypeParameters { path, expected, found } => write!(
                f,
                "Too many type parameters for {} (expected {}, found {})",
                path, expected, found
            ),
            ConstantExpected { param } => {
                write!(f, "Type parameter {} expects a constant value", param)
            }
            UnexpectedConstant { param } => {
                write!(f, "Constant value unexpected for type parameter {}", param)
            }
            ExpressionNotAllowed => write!(f, "Only constant values are allowed as type parameters here"),
            TypeParameterWithParameters { name } => {
                write!(f, "Class type parameter {} can't have parameters", name)
            }
            DuplicateTypeParameter { name } => write!(f, "Duplicate type parameter name: {}", name),
            DefaultTypeParameterNotAllowed { name } => write!(
                f,
                "Default type parameters are only supported on types (found on {})",
                name
            ),
            ConstraintFailure { owner, param } => {
                write!(f, "Constraint check failure for {}.{}", owner, param)
            }
            DuplicateStructureField { name } => write!(f, "Duplicate field {}", name),
            FieldRedefinition { name } => {
                write!(f, "Cannot redefine field {} with different type", name)
            }
            ExplicitTypeRequired { name } => write!(f, "Explicit type required for field {}", name),
            VoidStructureField { name } => write!(
                f,
                "Fields of type Void are not allowed in structures (field {})",
                name
            ),
            InvalidStructureAccess { access } => write!(f, "Invalid access {}", access),
            ExpressionInStructure { name } => {
                write!(f, "Expression not allowed here (field {})", name)
            }
            CustomPropertyAccessor { accessor } => write!(
                f,
                "Custom property accessor is no longer supported, please use `get` or `set` (found {})",
                accessor
            ),
            ExtendTypeParameterStructurally => write!(f, "Cannot structurally extend type parameters"),
            LoopInDefinition => write!(
                f,
                "Loop found in cascading signatures definitions. Please change order/import"
            ),
            ExtendNonStructure { found } => {
                write!(f, "Can only extend structures, found {}", found)
            }
            MultipleSuperclasses => write!(f, "Cannot extend several classes"),
            ExtendFinalClass { path } => write!(f, "Cannot extend a final class {}", path),
            ExtendBasicClass { path } => write!(f, "Cannot extend basic class {}", path),
            RecursiveClass => write!(f, "Recursive class"),
            ExtendTypeParameter => write!(f, "Cannot extend type parameters"),
            ExtendWithInterface => write!(f, "Cannot extend by using an interface"),
            ExtendWithClass => write!(f, "Cannot extend by using a class"),
            ExtendNonClass => write!(f, "Should extend by using a class"),
            ImplementWithClass => write!(f, "Cannot implement by using a class"),
            ImplementNonInterface => write!(f, "Should implement by using an interface"),
            InterfaceImplements => write!(f, "Interfaces cannot implement another interface (use extends)"),
            DuplicateArrayAccess => write!(f, "Duplicate array access"),
            ImplementsDynamicOnNonExtern => {
                write!(f, "implements Dynamic is only supported on externs")
            }
            MultipleDynamic => write!(f, "Cannot have several Dynamic"),
            DuplicateClassField { name } => write!(f, "Duplicate class field declaration : {}", name),
            DuplicateConstructor => write!(f, "Duplicate constructor"),
            AbstractMethodInConcreteClass { name } => write!(
                f,
                "Only abstract classes can have abstract methods (found {})",
                name
            ),
            AbstractMethodWithBody { name } => {
                write!(f, "Abstract method {} may not have an expression", name)
            }
            MissingOverride { field, superclass } => write!(
                f,
                "Field {} should be declared with 'override' since it is inherited from superclass {}",
                field, superclass
            ),
            OverrideWithoutParent { field, suggestion } => {
                write!(
                    f,
                    "Field {} is declared 'override' but doesn't override any field",
                    field
                )?;
                if let Some(s) = suggestion {
                    write!(f, " (did you mean {}?)", s)?;
                }
                Ok(())
            }
            OverrideNoCompatibleOverload { field } => write!(
                f,
                "Field {} is declared 'override' but no compatible overload was found",
                field
            ),
            OverrideLessVisible { field } => write!(
                f,
                "Field {} has less visibility (public/private) than superclass one",
                field
            ),
            OverrideInline { field } => {
                write!(f, "Field {} is inlined and cannot be overridden", field)
            }
            OverrideAccessMismatch { field } => write!(
                f,
                "Field {} has different property access than in superclass",
                field
            ),
            OverrideFinal { field } => write!(f, "Cannot override final method {}", field),
            OverrideStatic { field } => write!(f, "Invalid override on static field {}", field),
            IncompatibleOverride { field } => write!(
                f,
                "Field {} overrides parent class with different or incomplete type",
                field
            ),
            InterfaceFieldNotPublic { field, interface } => write!(
                f,
                "Field {} should be public as requested by {}",
                field, interface
            ),
            InterfaceAccessMismatch { field, interface } => write!(
                f,
                "Field {} has different property access than in {}",
                field, interface
            ),
            InterfaceFieldTypeMismatch { field, interface } => write!(
                f,
                "Field {} has different type than in {}",
                field, interface
            ),
            MissingInterfaceFields { class, entries } => {
                write!(f, "Class {} has missing interface fields:", class)?;
                for entry in entries {
                    write!(f, "\n    {}", entry)?;
                }
                Ok(())
            }
            MissingAbstractImplementations { class, entries } => {
                write!(f, "Class {} must implement abstract fields:", class)?;
                for entry in entries {
                    write!(f, "\n    {}", entry)?;
                }
                Ok(())
            }
            UninitializedFinal { field } => write!(
                f,
                "final field {} must be initialized immediately or in the constructor",
                field
            ),
            FinalVarsWithoutConstructor => write!(
                f,
                "This class has uninitialized final vars, which requires a constructor"
            ),
            BuildRetriesExhausted { path, dependency } => write!(
                f,
                "Could not finish building {}: {} never completed its build",
                path, dependency
            ),
            Custom(message) => write!(f, "{}", message),
        }
    }
}

/// A positioned hard error with optional related positions and trailing notes
#[derive(Debug, Clone, PartialEq)]
pub struct TypeloadError {
    pub kind: TypeloadErrorKind,
    pub span: SourceSpan,
    pub related: Vec<(String, SourceSpan)>,
    pub notes: Vec<String>,
}

impl TypeloadError {
    pub fn new(kind: TypeloadErrorKind, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            related: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn custom(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(TypeloadErrorKind::Custom(message.into()), span)
    }

    pub fn with_related(mut self, message: impl Into<String>, span: SourceSpan) -> Self {
        self.related.push((message.into(), span));
        self
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes.extend(notes);
        self
    }

    pub fn is_module_not_found(&self) -> bool {
        matches!(self.kind, TypeloadErrorKind::ModuleNotFound { .. })
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for TypeloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.kind)
    }
}

impl std::error::Error for TypeloadError {}

/// One link of an assignability failure chain
#[derive(Debug, Clone, PartialEq)]
pub enum UnifyCause {
    CannotUnify { from: Type, to: Type },
    InvalidReturnType,
    InvalidArgument { index: usize, count: usize },
    NotMatchingOptional { name: String },
    DifferentArgumentCount,
    ConstraintsDiffer,
    DifferentConstraintCount,
    MissingField { name: String },
    InvalidFieldAccess { name: String },
    NullabilityMismatch,
    Custom(String),
}

/// Assignability failure, outermost cause first
#[derive(Debug, Clone, PartialEq)]
pub struct UnifyError {
    pub causes: Vec<UnifyCause>,
}

impl UnifyError {
    pub fn new(cause: UnifyCause) -> Self {
        Self {
            causes: vec![cause],
        }
    }

    pub fn cannot_unify(from: &Type, to: &Type) -> Self {
        Self::new(UnifyCause::CannotUnify {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Wraps this failure in an outer cause
    pub fn context(mut self, cause: UnifyCause) -> Self {
        self.causes.insert(0, cause);
        self
    }

    pub fn first(&self) -> Option<&UnifyCause> {
        self.causes.first()
    }

    pub fn contains(&self, pred: impl Fn(&UnifyCause) -> bool) -> bool {
        self.causes.iter().any(pred)
    }
}

/// Raised when a check needs a declaration that has not finished building.
/// Carries the dependency and its state so the caller can reschedule.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildCancelled {
    pub decl: DeclId,
    pub state: BuildState,
}

impl fmt::Display for BuildCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build of {} cancelled ({:?})", self.decl, self.state)
    }
}
