//! Builtin declarations every module sees
//!
//! These are registered up front in a `StdTypes` module that is implicitly imported
//! everywhere, so `Int` or `Array<T>` resolve without any loader involvement.

use super::core::Type;
use super::namespace::{Module, ModulePath, ModuleTable};
use super::symbols::{
    AbstractDecl, BuildState, ClassDecl, ClassFlags, ClassKind, DeclKind, Declaration, TypeParam,
    TypeParamHost, TypePath,
};
use super::{DeclId, ModuleId};
use source_map::SourceSpan;

pub const STD_MODULE: &str = "StdTypes";

#[derive(Debug, Clone)]
pub struct StdTypes {
    pub module: ModuleId,
    pub void: DeclId,
    pub int: DeclId,
    pub float: DeclId,
    pub bool: DeclId,
    pub dynamic: DeclId,
    pub null: DeclId,
    pub string: DeclId,
    pub array: DeclId,
    pub array_access: DeclId,
}

impl StdTypes {
    pub fn void_type(&self) -> Type {
        Type::Abstract {
            decl: self.void,
            params: Vec::new(),
        }
    }

    pub fn int_type(&self) -> Type {
        Type::Abstract {
            decl: self.int,
            params: Vec::new(),
        }
    }

    pub fn float_type(&self) -> Type {
        Type::Abstract {
            decl: self.float,
            params: Vec::new(),
        }
    }

    pub fn bool_type(&self) -> Type {
        Type::Abstract {
            decl: self.bool,
            params: Vec::new(),
        }
    }

    pub fn string_type(&self) -> Type {
        Type::instance(self.string, Vec::new())
    }

    pub fn null_of(&self, t: Type) -> Type {
        Type::Abstract {
            decl: self.null,
            params: vec![t],
        }
    }

    pub fn array_of(&self, t: Type) -> Type {
        Type::instance(self.array, vec![t])
    }

    /// Classes backed by a native representation that user classes may not extend
    pub fn is_basic_class(&self, decl: DeclId) -> bool {
        decl == self.string || decl == self.array
    }

    pub fn is_void(&self, t: &Type) -> bool {
        matches!(t, Type::Abstract { decl, .. } if *decl == self.void)
    }

    pub fn is_null(&self, t: &Type) -> bool {
        matches!(t, Type::Abstract { decl, .. } if *decl == self.null)
    }
}

struct StdBuilder<'a> {
    decls: &'a mut Vec<Declaration>,
    module: ModuleId,
}

impl StdBuilder<'_> {
    fn push(&mut self, name: &str, kind: DeclKind) -> DeclId {
        let id = DeclId::from_index(self.decls.len());
        let mut decl = Declaration::new(TypePath::root(name), self.module, kind);
        decl.build_state = BuildState::Built;
        self.decls.push(decl);
        id
    }

    fn abstract_type(&mut self, name: &str, to: Vec<Type>) -> DeclId {
        self.push(
            name,
            DeclKind::Abstract(AbstractDecl {
                to,
                ..AbstractDecl::default()
            }),
        )
    }

    fn extern_class(&mut self, name: &str, flags: ClassFlags) -> DeclId {
        self.push(
            name,
            DeclKind::Class(ClassDecl::new(flags.union(ClassFlags::EXTERN), ClassKind::Normal)),
        )
    }

    /// Gives `owner` a single type parameter `T`
    fn with_param(&mut self, owner: DeclId) {
        let owner_name = self.decls[owner.index()].path.name.clone();
        let id = DeclId::from_index(self.decls.len());
        let mut decl = Declaration::new(
            TypePath::new(vec![owner_name], "T"),
            self.module,
            DeclKind::Class(ClassDecl::new(
                ClassFlags::NONE,
                ClassKind::TypeParameter {
                    constraints: Vec::new(),
                },
            )),
        );
        decl.build_state = BuildState::Built;
        self.decls.push(decl);
        self.decls[owner.index()].params.push(TypeParam {
            name: "T".to_string(),
            decl: id,
            ty: Type::instance(id, Vec::new()),
            default: None,
            host: TypeParamHost::Type,
            is_const: false,
            span: SourceSpan::unknown(),
        });
    }
}

pub fn register_std_types(decls: &mut Vec<Declaration>, modules: &mut ModuleTable) -> StdTypes {
    let module = modules.add(Module::new(ModulePath::new(Vec::new(), STD_MODULE)));
    let mut b = StdBuilder { decls, module };

    let void = b.abstract_type("Void", Vec::new());
    let float = b.abstract_type("Float", Vec::new());
    let int = b.abstract_type(
        "Int",
        vec![Type::Abstract {
            decl: float,
            params: Vec::new(),
        }],
    );
    let bool = b.abstract_type("Bool", Vec::new());
    let dynamic = b.abstract_type("Dynamic", Vec::new());
    let null = b.abstract_type("Null", Vec::new());
    b.with_param(null);
    let string = b.extern_class("String", ClassFlags::FINAL);
    let array = b.extern_class("Array", ClassFlags::NONE);
    b.with_param(array);
    let array_access = b.extern_class("ArrayAccess", ClassFlags::INTERFACE);
    b.with_param(array_access);

    let std = StdTypes {
        module,
        void,
        int,
        float,
        bool,
        dynamic,
        null,
        string,
        array,
        array_access,
    };
    let m = modules.get_mut(module);
    m.decls = vec![
        void,
        float,
        int,
        bool,
        dynamic,
        null,
        string,
        array,
        array_access,
    ];
    m.imports_resolved = true;
    std
}
