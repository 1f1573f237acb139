//! Symbol database: the directory of classes, modules, constants and method
//! definitions that the analysis treats as authoritative.
//!
//! **Source**: produced by an external indexer and loaded through the
//! `SymbolSource` port (JSON in practice). **Use**: candidate lookup by method name,
//! parameter shapes for the applicability matcher, scope-qualified constant
//! resolution, and correlating `def` nodes with their database entry by location.
//!
//! Ids are positions in the module / method tables and are validated when the
//! table is deserialized, so lookups by id never go out of bounds for ids handed
//! out by the same table.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub u32);

/// Parameter kind, named the way Ruby's `Method#parameters` reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Req,
    Opt,
    Rest,
    Keyreq,
    Key,
    Keyrest,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParamKind,
    /// Absent for anonymous `*`, `**` and `&`.
    #[serde(default)]
    pub name: Option<String>,
}

impl Parameter {
    pub fn new(kind: ParamKind, name: &str) -> Self {
        Self {
            kind,
            name: Some(name.to_string()),
        }
    }

    pub fn anonymous(kind: ParamKind) -> Self {
        Self { kind, name: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    #[default]
    Class,
    Module,
}

/// What a constant is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantRef {
    /// A class or module.
    Module(ModuleId),
    /// A value whose class is known, e.g. `X = ""`.
    InstanceOf(ModuleId),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleDef {
    /// Fully qualified name (`A::B`); `None` for anonymous and singleton classes.
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ModuleKind,
    #[serde(default)]
    pub constants: BTreeMap<String, ConstantRef>,
    #[serde(default)]
    pub instance_methods: Vec<MethodId>,
    #[serde(default)]
    pub singleton_methods: Vec<MethodId>,
}

/// Where a method was declared: file and first line of its `def`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSite {
    pub file: String,
    pub line: u32,
}

impl DefinitionSite {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub owner: ModuleId,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub location: Option<DefinitionSite>,
}

/// A constant reference as written in source: `A::B`, `::A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstPath {
    /// Anchored at the root namespace (`::A`).
    pub rooted: bool,
    pub segments: Vec<String>,
}

impl ConstPath {
    pub fn parse(text: &str) -> Option<Self> {
        let (rooted, rest) = match text.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let segments: Vec<String> = rest.split("::").map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { rooted, segments })
    }
}

impl fmt::Display for ConstPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rooted {
            f.write_str("::")?;
        }
        f.write_str(&self.segments.join("::"))
    }
}

/// Raw serialized form; converted into a validated, indexed `SymbolTable`.
#[derive(Debug, Deserialize)]
struct SymbolTableData {
    #[serde(default)]
    root: ModuleId,
    modules: Vec<ModuleDef>,
    #[serde(default)]
    methods: Vec<MethodDef>,
}

impl Default for ModuleId {
    fn default() -> Self {
        ModuleId(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SymbolTableData")]
pub struct SymbolTable {
    root: ModuleId,
    modules: Vec<ModuleDef>,
    methods: Vec<MethodDef>,
    /// method name → definitions, in table order
    methods_by_name: HashMap<String, Vec<MethodId>>,
}

impl TryFrom<SymbolTableData> for SymbolTable {
    type Error = anyhow::Error;

    fn try_from(data: SymbolTableData) -> Result<Self> {
        let module_count = data.modules.len();
        let method_count = data.methods.len();
        let module_ok = |id: ModuleId| (id.0 as usize) < module_count;
        let method_ok = |id: MethodId| (id.0 as usize) < method_count;

        if !module_ok(data.root) {
            return Err(anyhow!("root module {} is not defined", data.root.0));
        }
        for (idx, method) in data.methods.iter().enumerate() {
            if !module_ok(method.owner) {
                return Err(anyhow!(
                    "method {} ({}) has unknown owner {}",
                    idx,
                    method.name,
                    method.owner.0
                ));
            }
        }
        for (idx, module) in data.modules.iter().enumerate() {
            let label = module.name.as_deref().unwrap_or("<anonymous>");
            if let Some(bad) = module
                .instance_methods
                .iter()
                .chain(&module.singleton_methods)
                .find(|id| !method_ok(**id))
            {
                return Err(anyhow!(
                    "module {} ({}) lists unknown method {}",
                    idx,
                    label,
                    bad.0
                ));
            }
            for (name, constant) in &module.constants {
                let (ConstantRef::Module(target) | ConstantRef::InstanceOf(target)) = *constant;
                if !module_ok(target) {
                    return Err(anyhow!(
                        "constant {}::{} refers to unknown module {}",
                        label,
                        name,
                        target.0
                    ));
                }
            }
        }

        let mut table = Self {
            root: data.root,
            modules: data.modules,
            methods: data.methods,
            methods_by_name: HashMap::new(),
        };
        table.reindex();
        Ok(table)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Empty table holding only the root namespace, `Object`.
    pub fn new() -> Self {
        Self {
            root: ModuleId(0),
            modules: vec![ModuleDef {
                name: Some("Object".to_string()),
                kind: ModuleKind::Class,
                ..Default::default()
            }],
            methods: Vec::new(),
            methods_by_name: HashMap::new(),
        }
    }

    fn reindex(&mut self) {
        self.methods_by_name.clear();
        for (idx, method) in self.methods.iter().enumerate() {
            self.methods_by_name
                .entry(method.name.clone())
                .or_default()
                .push(MethodId(idx as u32));
        }
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    /// Declare a class or module as constant `name` inside `scope`.
    pub fn add_module(&mut self, scope: ModuleId, name: &str, kind: ModuleKind) -> ModuleId {
        let qualified = match self.module_name(scope) {
            Some(parent) if scope != self.root => format!("{parent}::{name}"),
            _ => name.to_string(),
        };
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleDef {
            name: Some(qualified),
            kind,
            ..Default::default()
        });
        self.set_constant(scope, name, ConstantRef::Module(id));
        id
    }

    pub fn set_constant(&mut self, scope: ModuleId, name: &str, constant: ConstantRef) {
        if let Some(module) = self.modules.get_mut(scope.0 as usize) {
            module.constants.insert(name.to_string(), constant);
        }
    }

    pub fn add_method(
        &mut self,
        owner: ModuleId,
        name: &str,
        singleton: bool,
        parameters: Vec<Parameter>,
        location: Option<DefinitionSite>,
    ) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodDef {
            name: name.to_string(),
            owner,
            singleton,
            parameters,
            location,
        });
        if let Some(module) = self.modules.get_mut(owner.0 as usize) {
            if singleton {
                module.singleton_methods.push(id);
            } else {
                module.instance_methods.push(id);
            }
        }
        self.methods_by_name
            .entry(name.to_string())
            .or_default()
            .push(id);
        id
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleDef> {
        self.modules.get(id.0 as usize)
    }

    pub fn module_name(&self, id: ModuleId) -> Option<&str> {
        self.module(id).and_then(|m| m.name.as_deref())
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodDef> {
        self.methods.get(id.0 as usize)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDef)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(idx, m)| (MethodId(idx as u32), m))
    }

    /// All definitions named `name`, across every class and module.
    pub fn methods_named<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = (MethodId, &'a MethodDef)> + 'a {
        self.methods_by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.method(*id).map(|m| (*id, m)))
    }

    /// Instance (or singleton) methods defined directly on `module` with this name.
    pub fn defined_methods<'a>(
        &'a self,
        module: ModuleId,
        name: &'a str,
        singleton: bool,
    ) -> impl Iterator<Item = (MethodId, &'a MethodDef)> + 'a {
        let ids: &[MethodId] = match self.module(module) {
            Some(m) if singleton => &m.singleton_methods,
            Some(m) => &m.instance_methods,
            None => &[],
        };
        ids.iter()
            .filter_map(|id| self.method(*id).map(|m| (*id, m)))
            .filter(move |(_, m)| m.name == name)
    }

    pub fn constant(&self, scope: ModuleId, name: &str) -> Option<ConstantRef> {
        self.module(scope)?.constants.get(name).copied()
    }

    /// Resolve a constant reference from inside the lexical scopes `lexical`
    /// (outermost first). The head segment is searched innermost-out, then in the
    /// root namespace.
    pub fn lookup_constant_path(&self, path: &ConstPath, lexical: &[ModuleId]) -> Option<ConstantRef> {
        let (head, rest) = path.segments.split_first()?;
        let mut current = if path.rooted {
            self.constant(self.root, head)?
        } else {
            lexical
                .iter()
                .rev()
                .find_map(|scope| self.constant(*scope, head))
                .or_else(|| self.constant(self.root, head))?
        };

        for segment in rest {
            current = match current {
                ConstantRef::Module(module) => self.constant(module, segment)?,
                ConstantRef::InstanceOf(_) => return None,
            };
        }
        Some(current)
    }

    /// Resolve the name in a `class`/`module` header. A bare name refers to the
    /// innermost enclosing scope only.
    pub fn lookup_definition_name(&self, path: &ConstPath, lexical: &[ModuleId]) -> Option<ModuleId> {
        let constant = match path.segments.as_slice() {
            [name] if !path.rooted => {
                let scope = lexical.last().copied().unwrap_or(self.root);
                self.constant(scope, name)?
            }
            _ => self.lookup_constant_path(path, lexical)?,
        };
        match constant {
            ConstantRef::Module(module) => Some(module),
            ConstantRef::InstanceOf(_) => None,
        }
    }

    /// Resolve a fully qualified module name such as `A::B` from the root.
    pub fn resolve_qualified(&self, name: &str) -> Option<ModuleId> {
        let path = ConstPath::parse(name)?;
        if path.segments.len() == 1 && path.segments[0] == self.module_name(self.root)? {
            return Some(self.root);
        }
        match self.lookup_constant_path(&path, &[])? {
            ConstantRef::Module(module) => Some(module),
            ConstantRef::InstanceOf(_) => None,
        }
    }

    /// Correlate a definition node with its database entry by name, file and first line.
    pub fn find_definition(&self, name: &str, file: &str, line: u32) -> Option<MethodId> {
        self.methods_named(name)
            .find(|(_, method)| {
                method
                    .location
                    .as_ref()
                    .is_some_and(|site| site.line == line && same_file(&site.file, file))
            })
            .map(|(id, _)| id)
    }

    /// `Owner#name` for instance methods, `Owner.name` for singleton methods.
    pub fn qualified_name(&self, id: MethodId) -> String {
        match self.method(id) {
            Some(method) => {
                let owner = self.module_name(method.owner).unwrap_or("(anonymous)");
                let sep = if method.singleton { '.' } else { '#' };
                format!("{owner}{sep}{}", method.name)
            }
            None => format!("<unknown method {}>", id.0),
        }
    }
}

/// Two paths name the same file when equal or when one is a component-wise
/// suffix of the other (databases often record paths relative to another root).
fn same_file(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (a, b) = (Path::new(a), Path::new(b));
    a == b || a.ends_with(b) || b.ends_with(a)
}
