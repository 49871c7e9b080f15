//! The global declaration index.
//!
//! Holds the fully qualified names of all declarations and maps them to
//! their definitions in the AST arena. Produced by the cataloger and
//! read-only thereafter.
//!
//! There are three distinct spaces of fully qualified names: the type
//! space, the function space, and the module space. The type and function
//! spaces must be disjoint, since every struct also has a constructor in
//! the function space. Either may overlap with the module space.

use indexmap::IndexMap;

use crate::ast::DeclId;

/// One function-space entry: the declaration plus the short name it
/// exports under (relevant to code generation downstream).
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub decl: DeclId,
    /// `main` for the entry point, the relative name for externs, and the
    /// FQN for everything else.
    pub short_name: String,
}

/// The declaration index keyed by fully qualified name.
#[derive(Debug, Default)]
pub struct Ontology {
    types: IndexMap<String, DeclId>,
    functions: IndexMap<String, FunctionEntry>,
    modules: IndexMap<String, DeclId>,
    /// FQN of the `main` function, when one was found.
    pub entry_point: Option<String>,
}

impl Ontology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(&mut self, fqn: &str, decl: DeclId) {
        self.types.insert(fqn.to_owned(), decl);
    }

    pub fn record_function(&mut self, fqn: &str, short_name: &str, decl: DeclId) {
        self.functions.insert(
            fqn.to_owned(),
            FunctionEntry {
                decl,
                short_name: short_name.to_owned(),
            },
        );
    }

    pub fn record_module(&mut self, fqn: &str, decl: DeclId) {
        self.modules.insert(fqn.to_owned(), decl);
    }

    /// Finds a struct in the type space.
    #[must_use]
    pub fn get_type(&self, fqn: &str) -> Option<DeclId> {
        self.types.get(fqn).copied()
    }

    /// Finds a function or extern function in the function space.
    #[must_use]
    pub fn get_function(&self, fqn: &str) -> Option<DeclId> {
        self.functions.get(fqn).map(|e| e.decl)
    }

    /// Looks for a function in the function space or a struct (i.e. its
    /// constructor) in the type space.
    #[must_use]
    pub fn get_function_or_constructor(&self, fqn: &str) -> Option<DeclId> {
        self.get_function(fqn).or_else(|| self.get_type(fqn))
    }

    /// Finds a module in the module space.
    #[must_use]
    pub fn get_module(&self, fqn: &str) -> Option<DeclId> {
        self.modules.get(fqn).copied()
    }

    /// The short external name a function exports under.
    #[must_use]
    pub fn short_name(&self, fqn: &str) -> Option<&str> {
        self.functions.get(fqn).map(|e| e.short_name.as_str())
    }

    /// All recorded struct FQNs, in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
