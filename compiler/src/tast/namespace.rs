//! Modules, imports and type-path resolution
//!
//! A reference is resolved in this order, first match wins:
//! 1. types declared in the current module, then imported types (last import wins)
//! 2. for unqualified references, the current package and each parent package
//! 3. wildcard-imported packages in declaration order
//!
//! At levels 2 and 3 a missing module is skipped, but a module that exists without
//! declaring the requested type is a hard error. A reference with an explicit
//! package only does a qualified lookup.

use super::context::{BuildScope, TypeloadContext};
use super::errors::{NotFoundReason, TypeloadError, TypeloadErrorKind, TypeloadResult};
use super::{DeclId, ModuleId};
use crate::syntax::{ImportMode, ImportSyntax, ModuleSyntax, TypePathHint};
use fxhash::FxHashMap;
use source_map::SourceSpan;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath {
    pub pack: Vec<String>,
    pub name: String,
}

impl ModulePath {
    pub fn new(pack: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            pack,
            name: name.into(),
        }
    }

    pub fn parse(dotted: &str) -> Self {
        let mut pack: Vec<String> = dotted.split('.').map(str::to_string).collect();
        let name = pack.pop().unwrap_or_default();
        Self { pack, name }
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.pack {
            write!(f, "{}.", p)?;
        }
        write!(f, "{}", self.name)
    }
}

/// An import statement and whether anything was resolved through it
#[derive(Debug, Clone)]
pub struct ImportUse {
    pub path: String,
    pub span: SourceSpan,
    pub used: bool,
}

/// A type made visible in a module by an import (or the implicit std import)
#[derive(Debug, Clone)]
pub struct ScopedType {
    pub decl: DeclId,
    pub alias: Option<String>,
    pub import: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub path: ModulePath,
    pub decls: Vec<DeclId>,
    pub import_syntax: Vec<ImportSyntax>,
    pub imports: Vec<ImportUse>,
    pub scope_types: Vec<ScopedType>,
    pub wildcards: Vec<Vec<String>>,
    pub imports_resolved: bool,
}

impl Module {
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            decls: Vec::new(),
            import_syntax: Vec::new(),
            imports: Vec::new(),
            scope_types: Vec::new(),
            wildcards: Vec::new(),
            imports_resolved: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: Vec<Module>,
    by_path: FxHashMap<ModulePath, ModuleId>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: Module) -> ModuleId {
        let id = ModuleId::from_index(self.modules.len());
        self.by_path.insert(module.path.clone(), id);
        self.modules.push(module);
        id
    }

    pub fn find(&self, path: &ModulePath) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId::from_index(i), m))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Supplies module syntax on demand
pub trait ModuleLoader {
    /// `None` when no such module exists
    fn load(&mut self, path: &ModulePath) -> Option<ModuleSyntax>;
}

/// Loader over modules held in memory, keyed by dotted path
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    modules: FxHashMap<ModulePath, ModuleSyntax>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: ModuleSyntax) {
        let path = ModulePath::new(module.pack.clone(), module.name.clone());
        self.modules.insert(path, module);
    }

    pub fn with(mut self, module: ModuleSyntax) -> Self {
        self.add(module);
        self
    }

    /// Reads a JSON array of modules
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let modules: Vec<ModuleSyntax> = serde_json::from_str(json)?;
        let mut loader = Self::new();
        for module in modules {
            loader.add(module);
        }
        Ok(loader)
    }

    /// Every module path held, in dotted order
    pub fn module_paths(&self) -> Vec<ModulePath> {
        let mut paths: Vec<ModulePath> = self.modules.keys().cloned().collect();
        paths.sort_by_key(|p| p.to_string());
        paths
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for MemoryLoader {
    fn load(&mut self, path: &ModulePath) -> Option<ModuleSyntax> {
        self.modules.get(path).cloned()
    }
}

fn is_capitalized(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

impl TypeloadContext {
    /// Returns the module at `path`, registering it from the loader on first use
    pub fn load_module(&mut self, path: &ModulePath, span: SourceSpan) -> TypeloadResult<ModuleId> {
        if let Some(id) = self.modules.find(path) {
            return Ok(id);
        }
        match self.loader.load(path) {
            Some(syntax) => {
                log::debug!("loading module {}", path);
                Ok(self.register_module(syntax))
            }
            None => Err(TypeloadError::new(
                TypeloadErrorKind::ModuleNotFound {
                    path: path.to_string(),
                },
                span,
            )),
        }
    }

    /// Resolves a type path from the current scope to its declaration
    pub fn resolve(&mut self, hint: &TypePathHint) -> TypeloadResult<DeclId> {
        match self.resolve_path(&hint.pack, &hint.name, hint.sub.as_deref(), hint.span) {
            Err(err)
                if err.is_module_not_found()
                    && hint.pack.first() == Some(&self.config.std_root) =>
            {
                log::debug!("retrying {} without the {} root", hint, self.config.std_root);
                self.resolve_path(&hint.pack[1..], &hint.name, hint.sub.as_deref(), hint.span)
            }
            result => result,
        }
    }

    fn resolve_path(
        &mut self,
        pack: &[String],
        module_name: &str,
        sub: Option<&str>,
        span: SourceSpan,
    ) -> TypeloadResult<DeclId> {
        let type_name = sub.unwrap_or(module_name);
        if !pack.is_empty() {
            let module = self.load_module(&ModulePath::new(pack.to_vec(), module_name), span)?;
            return self.find_in_module(module, type_name, span);
        }

        let current = self.scope.module;
        if let Some(current) = current {
            if let Some(decl) = self.find_in_scope(current, module_name, type_name) {
                return Ok(decl);
            }

            let mut pkg = self.modules.get(current).path.pack.clone();
            loop {
                if let Some(decl) = self.try_module(&pkg, module_name, type_name, span)? {
                    return Ok(decl);
                }
                if pkg.pop().is_none() {
                    break;
                }
            }

            let wildcards = self.modules.get(current).wildcards.clone();
            for pkg in &wildcards {
                if let Some(decl) = self.try_module(pkg, module_name, type_name, span)? {
                    return Ok(decl);
                }
            }
        } else {
            let builtin = self
                .modules
                .get(self.std.module)
                .decls
                .iter()
                .copied()
                .find(|d| self.decl(*d).path.name == type_name);
            if let Some(decl) = builtin {
                return Ok(decl);
            }
            if let Some(decl) = self.try_module(&[], module_name, type_name, span)? {
                return Ok(decl);
            }
        }

        Err(TypeloadError::new(
            TypeloadErrorKind::TypeNotFound {
                name: type_name.to_string(),
                reason: NotFoundReason::NotDefined,
            },
            span,
        ))
    }

    /// Loads `pkg.module_name` if it exists. A present module that lacks the type fails.
    fn try_module(
        &mut self,
        pkg: &[String],
        module_name: &str,
        type_name: &str,
        span: SourceSpan,
    ) -> TypeloadResult<Option<DeclId>> {
        match self.load_module(&ModulePath::new(pkg.to_vec(), module_name), span) {
            Ok(module) => self.find_in_module(module, type_name, span).map(Some),
            Err(err) if err.is_module_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn find_in_scope(&mut self, module: ModuleId, module_name: &str, type_name: &str) -> Option<DeclId> {
        let local = self
            .modules
            .get(module)
            .decls
            .iter()
            .copied()
            .find(|d| self.decl(*d).path.name == type_name);
        if local.is_some() && module_name == type_name {
            return local;
        }

        self.ensure_imports(module);
        let m = self.modules.get(module);
        let found = m.scope_types.iter().rev().find(|scoped| {
            let decl = self.decl(scoped.decl);
            if module_name != type_name {
                let owner = &self.modules.get(decl.module).path;
                return owner.name == module_name && decl.path.name == type_name;
            }
            match &scoped.alias {
                Some(alias) => alias == type_name,
                None => decl.path.name == type_name,
            }
        });
        let (decl, import) = found.map(|s| (s.decl, s.import))?;
        if let Some(index) = import {
            self.modules.get_mut(module).imports[index].used = true;
        }
        Some(decl)
    }

    pub fn find_in_module(
        &self,
        module: ModuleId,
        type_name: &str,
        span: SourceSpan,
    ) -> TypeloadResult<DeclId> {
        let m = self.modules.get(module);
        let Some(decl) = m
            .decls
            .iter()
            .copied()
            .find(|d| self.decl(*d).path.name == type_name)
        else {
            return Err(TypeloadError::new(
                TypeloadErrorKind::TypeNotFound {
                    name: type_name.to_string(),
                    reason: NotFoundReason::NotDefinedInModule(m.path.to_string()),
                },
                span,
            ));
        };
        let d = self.decl(decl);
        if d.private && self.scope.module != Some(module) {
            return Err(TypeloadError::new(
                TypeloadErrorKind::TypeNotFound {
                    name: type_name.to_string(),
                    reason: NotFoundReason::PrivateType(m.path.to_string()),
                },
                span,
            ));
        }
        Ok(decl)
    }

    /// Resolves the import statements of `module` once. Failures are reported and
    /// the import skipped.
    pub fn ensure_imports(&mut self, module: ModuleId) {
        if self.modules.get(module).imports_resolved {
            return;
        }
        self.modules.get_mut(module).imports_resolved = true;

        let std_decls = self.modules.get(self.std.module).decls.clone();
        let imports = self.modules.get(module).import_syntax.clone();
        let scope = BuildScope {
            module: Some(module),
            ..BuildScope::default()
        };
        self.with_scope(scope, |ctx| {
            ctx.modules.get_mut(module).scope_types.extend(std_decls.into_iter().map(|decl| {
                ScopedType {
                    decl,
                    alias: None,
                    import: None,
                }
            }));
            for import in &imports {
                if let Err(err) = ctx.resolve_import(module, import) {
                    ctx.report(err);
                }
            }
        });
    }

    fn resolve_import(&mut self, module: ModuleId, import: &ImportSyntax) -> TypeloadResult<()> {
        let dotted = import.path.join(".");
        let last_is_type = import.path.last().is_some_and(|s| is_capitalized(s));
        if import.mode == ImportMode::All && !last_is_type {
            self.modules.get_mut(module).wildcards.push(import.path.clone());
            return Ok(());
        }

        let index = {
            let m = self.modules.get_mut(module);
            m.imports.push(ImportUse {
                path: dotted.clone(),
                span: import.span,
                used: false,
            });
            m.imports.len() - 1
        };

        let hint = TypePathHint::new(&dotted);
        let target = self.load_module(&ModulePath::new(hint.pack.clone(), hint.name.clone()), import.span)?;

        let decls: Vec<DeclId> = match (&hint.sub, import.mode) {
            (Some(sub), ImportMode::Normal) => vec![self.find_in_module(target, sub, import.span)?],
            (None, ImportMode::Normal) if import.alias.is_some() => {
                vec![self.find_in_module(target, &hint.name, import.span)?]
            }
            _ => self
                .modules
                .get(target)
                .decls
                .iter()
                .copied()
                .filter(|d| !self.decl(*d).private)
                .collect(),
        };
        let alias = import.alias.clone();
        let m = self.modules.get_mut(module);
        m.scope_types.extend(decls.into_iter().map(|decl| ScopedType {
            decl,
            alias: alias.clone(),
            import: Some(index),
        }));
        Ok(())
    }

    /// Imports of `module` nothing was resolved through
    pub fn unused_imports(&self, module: ModuleId) -> Vec<ImportUse> {
        self.modules
            .get(module)
            .imports
            .iter()
            .filter(|i| !i.used)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_parse() {
        let path = ModulePath::parse("haxe.ds.StringMap");
        assert_eq!(path.pack, vec!["haxe", "ds"]);
        assert_eq!(path.name, "StringMap");
        assert_eq!(path.to_string(), "haxe.ds.StringMap");
    }

    #[test]
    fn test_memory_loader_from_json() {
        let json = r#"[ { "pack": ["a"], "name": "B" }, { "name": "Main" } ]"#;
        let mut loader = MemoryLoader::from_json(json).unwrap();
        assert_eq!(loader.len(), 2);
        assert!(loader.load(&ModulePath::parse("a.B")).is_some());
        assert!(loader.load(&ModulePath::parse("a.C")).is_none());
    }

    #[test]
    fn test_module_table_lookup() {
        let mut table = ModuleTable::new();
        let id = table.add(Module::new(ModulePath::parse("pack.Mod")));
        assert_eq!(table.find(&ModulePath::parse("pack.Mod")), Some(id));
        assert_eq!(table.find(&ModulePath::parse("pack.Other")), None);
        assert_eq!(table.get(id).path.name, "Mod");
    }
}
