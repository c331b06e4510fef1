//! Syntax trees consumed from the parser
//!
//! Lexing and parsing are not part of this crate: these are the shapes the type
//! loader accepts as input. They derive serde so a project can be handed over as
//! JSON (that is how the `hxtype` CLI reads its input), and they carry a handful
//! of constructors so tests and embedders can write syntax by hand.

use serde::{Deserialize, Serialize};
use source_map::SourceSpan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSyntax {
    #[serde(default)]
    pub pack: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub imports: Vec<ImportSyntax>,
    #[serde(default)]
    pub decls: Vec<TypeDeclSyntax>,
}

impl ModuleSyntax {
    pub fn new(dotted_path: &str) -> Self {
        let mut segments: Vec<String> = dotted_path.split('.').map(str::to_string).collect();
        let name = segments.pop().unwrap_or_default();
        Self {
            pack: segments,
            name,
            imports: Vec::new(),
            decls: Vec::new(),
        }
    }

    pub fn import(mut self, import: ImportSyntax) -> Self {
        self.imports.push(import);
        self
    }

    pub fn decl(mut self, decl: impl Into<TypeDeclSyntax>) -> Self {
        self.decls.push(decl.into());
        self
    }

    pub fn dotted_path(&self) -> String {
        if self.pack.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.pack.join("."), self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    #[default]
    Normal,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSyntax {
    pub path: Vec<String>,
    #[serde(default)]
    pub mode: ImportMode,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl ImportSyntax {
    /// `import a.b.C;` or `import a.b.C.Sub;`
    pub fn path(dotted: &str) -> Self {
        Self {
            path: dotted.split('.').map(str::to_string).collect(),
            mode: ImportMode::Normal,
            alias: None,
            span: SourceSpan::unknown(),
        }
    }

    /// `import a.b.*;`
    pub fn wildcard(dotted_pack: &str) -> Self {
        Self {
            mode: ImportMode::All,
            ..Self::path(dotted_pack)
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDeclSyntax {
    Class(ClassSyntax),
    Typedef(TypedefSyntax),
    Enum(EnumSyntax),
    Abstract(AbstractSyntax),
}

impl TypeDeclSyntax {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclSyntax::Class(c) => &c.name,
            TypeDeclSyntax::Typedef(t) => &t.name,
            TypeDeclSyntax::Enum(e) => &e.name,
            TypeDeclSyntax::Abstract(a) => &a.name,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            TypeDeclSyntax::Class(c) => c.span,
            TypeDeclSyntax::Typedef(t) => t.span,
            TypeDeclSyntax::Enum(e) => e.span,
            TypeDeclSyntax::Abstract(a) => a.span,
        }
    }

    pub fn params(&self) -> &[TypeParamSyntax] {
        match self {
            TypeDeclSyntax::Class(c) => &c.params,
            TypeDeclSyntax::Typedef(t) => &t.params,
            TypeDeclSyntax::Enum(e) => &e.params,
            TypeDeclSyntax::Abstract(a) => &a.params,
        }
    }

    pub fn is_private(&self) -> bool {
        match self {
            TypeDeclSyntax::Class(c) => c.flags.private,
            TypeDeclSyntax::Typedef(t) => t.private,
            TypeDeclSyntax::Enum(e) => e.private,
            TypeDeclSyntax::Abstract(a) => a.private,
        }
    }

    pub fn meta(&self) -> &[MetaEntry] {
        match self {
            TypeDeclSyntax::Class(c) => &c.meta,
            TypeDeclSyntax::Typedef(t) => &t.meta,
            TypeDeclSyntax::Enum(e) => &e.meta,
            TypeDeclSyntax::Abstract(a) => &a.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassSyntaxFlags {
    pub interface: bool,
    #[serde(rename = "abstract")]
    pub abstract_: bool,
    #[serde(rename = "extern")]
    pub extern_: bool,
    #[serde(rename = "final")]
    pub final_: bool,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub flags: ClassSyntaxFlags,
    #[serde(default)]
    pub params: Vec<TypeParamSyntax>,
    #[serde(default)]
    pub heritage: Vec<HeritageClause>,
    #[serde(default)]
    pub fields: Vec<FieldSyntax>,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl From<ClassSyntax> for TypeDeclSyntax {
    fn from(c: ClassSyntax) -> Self {
        TypeDeclSyntax::Class(c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub params: Vec<TypeParamSyntax>,
    pub target: TypeHint,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl From<TypedefSyntax> for TypeDeclSyntax {
    fn from(t: TypedefSyntax) -> Self {
        TypeDeclSyntax::Typedef(t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub params: Vec<TypeParamSyntax>,
    #[serde(default)]
    pub constructors: Vec<EnumConstructorSyntax>,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl From<EnumSyntax> for TypeDeclSyntax {
    fn from(e: EnumSyntax) -> Self {
        TypeDeclSyntax::Enum(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstructorSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub params: Vec<TypeParamSyntax>,
    #[serde(default)]
    pub args: Vec<FunctionArg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub params: Vec<TypeParamSyntax>,
    #[serde(default)]
    pub underlying: Option<TypeHint>,
    #[serde(default)]
    pub from: Vec<TypeHint>,
    #[serde(default)]
    pub to: Vec<TypeHint>,
    #[serde(default)]
    pub fields: Vec<FieldSyntax>,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl From<AbstractSyntax> for TypeDeclSyntax {
    fn from(a: AbstractSyntax) -> Self {
        TypeDeclSyntax::Abstract(a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParamSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub constraints: Vec<TypeHint>,
    #[serde(default)]
    pub default: Option<TypeHint>,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl TypeParamSyntax {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            span: SourceSpan::unknown(),
            constraints: Vec::new(),
            default: None,
            meta: Vec::new(),
        }
    }

    pub fn constraint(mut self, hint: TypeHint) -> Self {
        self.constraints.push(hint);
        self
    }

    pub fn default_type(mut self, hint: TypeHint) -> Self {
        self.default = Some(hint);
        self
    }

    pub fn meta(mut self, name: &str) -> Self {
        self.meta.push(MetaEntry::new(name));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeritageClause {
    Extends(TypePathHint),
    Implements(TypePathHint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Private,
    Static,
    Override,
    Dynamic,
    Inline,
    Macro,
    Final,
    Extern,
    Abstract,
    Overload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSyntax {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub access: Vec<Access>,
    pub kind: FieldKindSyntax,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
}

impl FieldSyntax {
    pub fn var(name: &str, hint: Option<TypeHint>) -> Self {
        Self {
            name: name.to_string(),
            span: SourceSpan::unknown(),
            access: Vec::new(),
            kind: FieldKindSyntax::Var { hint, expr: None },
            meta: Vec::new(),
        }
    }

    pub fn prop(name: &str, get: &str, set: &str, hint: Option<TypeHint>) -> Self {
        Self {
            kind: FieldKindSyntax::Prop {
                get: get.to_string(),
                set: set.to_string(),
                hint,
                expr: None,
            },
            ..Self::var(name, None)
        }
    }

    pub fn function(name: &str, function: FunctionSyntax) -> Self {
        Self {
            kind: FieldKindSyntax::Fun(function),
            ..Self::var(name, None)
        }
    }

    pub fn with_access(mut self, access: &[Access]) -> Self {
        self.access.extend_from_slice(access);
        self
    }

    pub fn with_expr(mut self, value: Expr) -> Self {
        match &mut self.kind {
            FieldKindSyntax::Var { expr, .. } | FieldKindSyntax::Prop { expr, .. } => {
                *expr = Some(value)
            }
            FieldKindSyntax::Fun(f) => f.body = Some(value),
        }
        self
    }

    pub fn with_meta(mut self, name: &str) -> Self {
        self.meta.push(MetaEntry::new(name));
        self
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    pub fn has_access(&self, access: Access) -> bool {
        self.access.contains(&access)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindSyntax {
    Var {
        #[serde(default)]
        hint: Option<TypeHint>,
        #[serde(default)]
        expr: Option<Expr>,
    },
    Prop {
        get: String,
        set: String,
        #[serde(default)]
        hint: Option<TypeHint>,
        #[serde(default)]
        expr: Option<Expr>,
    },
    Fun(FunctionSyntax),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionSyntax {
    pub params: Vec<TypeParamSyntax>,
    pub args: Vec<FunctionArg>,
    pub ret: Option<TypeHint>,
    pub body: Option<Expr>,
}

impl FunctionSyntax {
    pub fn new(args: Vec<FunctionArg>, ret: Option<TypeHint>) -> Self {
        Self {
            params: Vec::new(),
            args,
            ret,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Expr) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_params(mut self, params: Vec<TypeParamSyntax>) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArg {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub hint: Option<TypeHint>,
    #[serde(default)]
    pub default: Option<Expr>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl FunctionArg {
    pub fn new(name: &str, hint: TypeHint) -> Self {
        Self {
            name: name.to_string(),
            optional: false,
            hint: Some(hint),
            default: None,
            span: SourceSpan::unknown(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    Path(TypePathHint),
    Function {
        args: Vec<TypeHint>,
        ret: Box<TypeHint>,
    },
    Anonymous(Vec<FieldSyntax>),
    Extend {
        bases: Vec<TypePathHint>,
        fields: Vec<FieldSyntax>,
    },
    Intersection(Vec<TypeHint>),
    Optional(Box<TypeHint>),
}

impl TypeHint {
    /// `Int`, `haxe.ds.StringMap`, `pack.Module.Sub`
    pub fn path(dotted: &str) -> Self {
        TypeHint::Path(TypePathHint::new(dotted))
    }

    pub fn generic(dotted: &str, params: Vec<TypeHint>) -> Self {
        TypeHint::Path(TypePathHint::new(dotted).with_params(params))
    }

    pub fn function(args: Vec<TypeHint>, ret: TypeHint) -> Self {
        TypeHint::Function {
            args,
            ret: Box::new(ret),
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            TypeHint::Path(p) => p.span,
            TypeHint::Optional(inner) => inner.span(),
            TypeHint::Function { ret, .. } => ret.span(),
            TypeHint::Extend { bases, .. } => {
                bases.first().map(|b| b.span).unwrap_or_default()
            }
            TypeHint::Anonymous(fields) => fields.first().map(|f| f.span).unwrap_or_default(),
            TypeHint::Intersection(parts) => parts.first().map(TypeHint::span).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePathHint {
    #[serde(default)]
    pub pack: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub params: Vec<TypeArgHint>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl TypePathHint {
    /// Splits a dotted path: lowercase segments are packages, the first
    /// capitalized segment names the module, a second one the sub-type.
    pub fn new(dotted: &str) -> Self {
        let mut pack = Vec::new();
        let mut name = None;
        let mut sub = None;
        for segment in dotted.split('.') {
            let capitalized = segment.chars().next().is_some_and(char::is_uppercase);
            match (&name, capitalized) {
                (None, false) => pack.push(segment.to_string()),
                (None, true) => name = Some(segment.to_string()),
                (Some(_), _) => sub = Some(segment.to_string()),
            }
        }
        Self {
            name: name.unwrap_or_else(|| pack.pop().unwrap_or_default()),
            pack,
            sub,
            params: Vec::new(),
            span: SourceSpan::unknown(),
        }
    }

    pub fn with_params(mut self, params: Vec<TypeHint>) -> Self {
        self.params = params.into_iter().map(TypeArgHint::Type).collect();
        self
    }

    pub fn with_args(mut self, args: Vec<TypeArgHint>) -> Self {
        self.params = args;
        self
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Name actually looked up: the sub-type if present, else the module name
    pub fn type_name(&self) -> &str {
        self.sub.as_deref().unwrap_or(&self.name)
    }
}

impl std::fmt::Display for TypePathHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for p in &self.pack {
            write!(f, "{}.", p)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(sub) = &self.sub {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeArgHint {
    Type(TypeHint),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Expr>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl MetaEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            span: SourceSpan::unknown(),
        }
    }

    pub fn with_params(mut self, params: Vec<Expr>) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Int(String),
    Float(String),
    String(String),
    Ident(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binop {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Gt,
    BoolAnd,
    BoolOr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Const(Constant),
    Field(Box<Expr>, String),
    Binop(Binop, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    New(TypePathHint, Vec<Expr>),
    Block(Vec<Expr>),
    If(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    While(Box<Expr>, Box<Expr>),
    Var {
        name: String,
        #[serde(default)]
        hint: Option<TypeHint>,
        #[serde(default)]
        expr: Option<Box<Expr>>,
    },
    Return(Option<Box<Expr>>),
    Function(Box<FunctionSyntax>),
    ArrayDecl(Vec<Expr>),
    ObjectDecl(Vec<(String, Expr)>),
    Paren(Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Throw(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: SourceSpan::unknown(),
        }
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Const(Constant::Int(value.to_string())))
    }

    pub fn string(value: &str) -> Self {
        Self::new(ExprKind::Const(Constant::String(value.to_string())))
    }

    pub fn ident(name: &str) -> Self {
        Self::new(ExprKind::Const(Constant::Ident(name.to_string())))
    }

    pub fn field(target: Expr, name: &str) -> Self {
        Self::new(ExprKind::Field(Box::new(target), name.to_string()))
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::Binop(Binop::Assign, Box::new(target), Box::new(value)))
    }

    /// `this.<field> = <value>`
    pub fn this_assign(field: &str, value: Expr) -> Self {
        Self::assign(Self::field(Self::ident("this"), field), value)
    }

    pub fn block(exprs: Vec<Expr>) -> Self {
        Self::new(ExprKind::Block(exprs))
    }

    pub fn if_else(cond: Expr, then: Expr, otherwise: Option<Expr>) -> Self {
        Self::new(ExprKind::If(
            Box::new(cond),
            Box::new(then),
            otherwise.map(Box::new),
        ))
    }

    pub fn call(target: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call(Box::new(target), args))
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Calls `f` on every direct sub-expression
    pub fn iter_children<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Const(_) => {}
            ExprKind::Field(e, _) | ExprKind::Paren(e) | ExprKind::Throw(e) => f(e),
            ExprKind::Binop(_, a, b) | ExprKind::While(a, b) => {
                f(a);
                f(b);
            }
            ExprKind::Call(e, args) => {
                f(e);
                args.iter().for_each(f);
            }
            ExprKind::New(_, args) | ExprKind::Block(args) | ExprKind::ArrayDecl(args) => {
                args.iter().for_each(f)
            }
            ExprKind::If(c, t, e) => {
                f(c);
                f(t);
                if let Some(e) = e {
                    f(e);
                }
            }
            ExprKind::Var { expr, .. } | ExprKind::Return(expr) => {
                if let Some(e) = expr {
                    f(e);
                }
            }
            ExprKind::Function(fun) => {
                for arg in &fun.args {
                    if let Some(d) = &arg.default {
                        f(d);
                    }
                }
                if let Some(body) = &fun.body {
                    f(body);
                }
            }
            ExprKind::ObjectDecl(fields) => fields.iter().for_each(|(_, e)| f(e)),
            ExprKind::Ternary(a, b, c) => {
                f(a);
                f(b);
                f(c);
            }
        }
    }
}
