//! Declarations, fields and type parameters
//!
//! Everything here is owned by the declaration arena in the context. Edges between
//! declarations (super class, implemented interfaces) are stored as ids so a class
//! can point at a declaration that is still being built.

use super::core::Type;
use super::{DeclId, ModuleId};
use crate::syntax::{Constant, Expr, ExprKind, MetaEntry, TypeDeclSyntax};
use indexmap::IndexMap;
use smallvec::SmallVec;
use source_map::SourceSpan;
use std::fmt;
use std::rc::Rc;

/// Fully qualified declaration path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePath {
    pub pack: Vec<String>,
    pub name: String,
}

impl TypePath {
    pub fn new(pack: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            pack,
            name: name.into(),
        }
    }

    pub fn root(name: impl Into<String>) -> Self {
        Self::new(Vec::new(), name)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.pack {
            write!(f, "{}.", p)?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BuildState {
    #[default]
    NotYetBuilt,
    /// Mid-build; carries the declarations whose continuations are pending
    Building(SmallVec<[DeclId; 2]>),
    Built,
}

impl BuildState {
    pub fn is_built(&self) -> bool {
        matches!(self, BuildState::Built)
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub path: TypePath,
    pub module: ModuleId,
    pub span: SourceSpan,
    pub private: bool,
    pub params: Vec<TypeParam>,
    pub meta: Vec<MetaEntry>,
    pub build_state: BuildState,
    pub kind: DeclKind,
    /// Source this declaration was registered from, if any
    pub syntax: Option<Rc<TypeDeclSyntax>>,
}

impl Declaration {
    pub fn new(path: TypePath, module: ModuleId, kind: DeclKind) -> Self {
        Self {
            path,
            module,
            span: SourceSpan::unknown(),
            private: false,
            params: Vec::new(),
            meta: Vec::new(),
            build_state: BuildState::NotYetBuilt,
            kind,
            syntax: None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            DeclKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassDecl> {
        match &mut self.kind {
            DeclKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn has_meta(&self, name: &str) -> bool {
        self.meta.iter().any(|m| m.name == name)
    }

    pub fn is_interface(&self) -> bool {
        self.as_class().is_some_and(|c| c.flags.contains(ClassFlags::INTERFACE))
    }

    pub fn is_type_parameter(&self) -> bool {
        self.as_class()
            .is_some_and(|c| matches!(c.kind, ClassKind::TypeParameter { .. }))
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Class(ClassDecl),
    Typedef(TypedefDecl),
    Enum(EnumDecl),
    Abstract(AbstractDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClassFlags(u8);

impl ClassFlags {
    pub const NONE: Self = Self(0);
    pub const INTERFACE: Self = Self(1 << 0);
    pub const ABSTRACT: Self = Self(1 << 1);
    pub const EXTERN: Self = Self(1 << 2);
    pub const FINAL: Self = Self(1 << 3);

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassKind {
    Normal,
    /// `@:generic` class
    GenericDefinition,
    /// `@:genericBuild` macro target, accepts any number of type arguments
    GenericBuild,
    TypeParameter {
        constraints: Vec<Type>,
    },
    /// Implementation class of an abstract
    AbstractImpl(DeclId),
    /// Opaque expression passed as a type argument
    ExprLiteral(Expr),
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub flags: ClassFlags,
    pub kind: ClassKind,
    pub super_class: Option<(DeclId, Vec<Type>)>,
    pub implements: Vec<(DeclId, Vec<Type>)>,
    pub fields: IndexMap<String, Field>,
    pub statics: IndexMap<String, Field>,
    pub constructor: Option<Field>,
    pub array_access: Option<Type>,
    pub dynamic: Option<Type>,
    pub interface_check_scheduled: bool,
}

impl ClassDecl {
    pub fn new(flags: ClassFlags, kind: ClassKind) -> Self {
        Self {
            flags,
            kind,
            super_class: None,
            implements: Vec::new(),
            fields: IndexMap::new(),
            statics: IndexMap::new(),
            constructor: None,
            array_access: None,
            dynamic: None,
            interface_check_scheduled: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    pub fn is_extern(&self) -> bool {
        self.flags.contains(ClassFlags::EXTERN)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypedefDecl {
    pub target: Option<Type>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDecl {
    pub constructors: IndexMap<String, EnumConstructor>,
}

#[derive(Debug, Clone)]
pub struct EnumConstructor {
    pub name: String,
    pub ty: Type,
    pub params: Vec<TypeParam>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default)]
pub struct AbstractDecl {
    pub underlying: Option<Type>,
    pub from: Vec<Type>,
    pub to: Vec<Type>,
    pub impl_class: Option<DeclId>,
}

/// Where a type parameter was declared; defaults are only legal on `Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParamHost {
    Type,
    Constructor,
    Method,
    EnumConstructor,
    AnonField,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    /// The parameter's own class declaration
    pub decl: DeclId,
    /// Nominal stand-in used inside the declaring body
    pub ty: Type,
    pub default: Option<Type>,
    pub host: TypeParamHost,
    pub is_const: bool,
    pub span: SourceSpan,
}

impl TypeParam {
    /// Accepts constant expressions as arguments
    pub fn expects_constant(&self) -> bool {
        self.is_const || self.name == "Const"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Normal,
    Inline,
    Dynamic,
    Macro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarAccess {
    Normal,
    Never,
    /// `null`: only accessible from within the declaring class
    No,
    /// Goes through an accessor method
    Call,
    /// Exists only when a compilation condition holds
    Require,
}

impl VarAccess {
    pub fn forbids(self) -> bool {
        matches!(self, VarAccess::Never | VarAccess::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Method(MethodKind),
    Var { read: VarAccess, write: VarAccess },
}

impl FieldKind {
    pub const PLAIN_VAR: FieldKind = FieldKind::Var {
        read: VarAccess::Normal,
        write: VarAccess::Normal,
    };

    pub fn is_method(&self) -> bool {
        matches!(self, FieldKind::Method(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Method(MethodKind::Normal) => write!(f, "method"),
            FieldKind::Method(MethodKind::Inline) => write!(f, "inline method"),
            FieldKind::Method(MethodKind::Dynamic) => write!(f, "dynamic method"),
            FieldKind::Method(MethodKind::Macro) => write!(f, "macro method"),
            FieldKind::Var { .. } => write!(f, "var"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldFlags(u16);

impl FieldFlags {
    pub const NONE: Self = Self(0);
    pub const PUBLIC: Self = Self(1 << 0);
    pub const OVERRIDE: Self = Self(1 << 1);
    pub const OVERLOAD: Self = Self(1 << 2);
    pub const FINAL: Self = Self(1 << 3);
    pub const ABSTRACT: Self = Self(1 << 4);
    pub const EXTERN: Self = Self(1 << 5);
    pub const COMPILER_GENERATED: Self = Self(1 << 6);
    /// Interface member that carries a default implementation
    pub const DEFAULT: Self = Self(1 << 7);
    pub const STATIC: Self = Self(1 << 8);
    pub const OPTIONAL: Self = Self(1 << 9);

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub kind: FieldKind,
    pub flags: FieldFlags,
    pub params: Vec<TypeParam>,
    pub overloads: Vec<Field>,
    pub meta: Vec<MetaEntry>,
    pub span: SourceSpan,
    /// Carries an initializer or a body
    pub has_expr: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            flags: FieldFlags::NONE,
            params: Vec::new(),
            overloads: Vec::new(),
            meta: Vec::new(),
            span: SourceSpan::unknown(),
            has_expr: false,
        }
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    pub fn has_flag(&self, flag: FieldFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_public(&self) -> bool {
        self.has_flag(FieldFlags::PUBLIC)
    }

    pub fn has_meta(&self, name: &str) -> bool {
        self.meta.iter().any(|m| m.name == name)
    }

    pub fn purity(&self) -> Purity {
        Purity::from_meta(&self.meta)
    }
}

/// Purity as declared through `@:pure` metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purity {
    Pure,
    Impure,
    MaybePure,
    /// Inherited from a pure parent, verified later
    ExpectPure,
}

pub const META_PURE: &str = ":pure";

impl Purity {
    pub fn from_meta(meta: &[MetaEntry]) -> Self {
        let Some(entry) = meta.iter().find(|m| m.name == META_PURE) else {
            return Purity::MaybePure;
        };
        match entry.params.first().map(|e| &e.kind) {
            None => Purity::Pure,
            Some(ExprKind::Const(Constant::Ident(id))) => match id.as_str() {
                "true" => Purity::Pure,
                "false" => Purity::Impure,
                "expect" => Purity::ExpectPure,
                _ => Purity::MaybePure,
            },
            Some(_) => Purity::MaybePure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_flags() {
        let mut flags = FieldFlags::PUBLIC.union(FieldFlags::FINAL);
        assert!(flags.contains(FieldFlags::PUBLIC));
        assert!(!flags.contains(FieldFlags::OVERRIDE));
        flags.insert(FieldFlags::OVERRIDE);
        flags.remove(FieldFlags::PUBLIC);
        assert!(flags.contains(FieldFlags::OVERRIDE));
        assert!(!flags.contains(FieldFlags::PUBLIC));
    }

    #[test]
    fn test_purity_from_meta() {
        assert_eq!(Purity::from_meta(&[]), Purity::MaybePure);
        assert_eq!(Purity::from_meta(&[MetaEntry::new(META_PURE)]), Purity::Pure);
        let impure = MetaEntry::new(META_PURE).with_params(vec![Expr::ident("false")]);
        assert_eq!(Purity::from_meta(&[impure]), Purity::Impure);
    }

    #[test]
    fn test_type_path_display() {
        let path = TypePath::new(vec!["haxe".into(), "ds".into()], "Map");
        assert_eq!(path.to_string(), "haxe.ds.Map");
        assert_eq!(TypePath::root("Int").to_string(), "Int");
    }
}
