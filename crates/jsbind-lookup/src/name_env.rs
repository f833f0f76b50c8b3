//! Types that do not come from the units of a pass.
//!
//! The lookup environment asks a [`NameEnvironment`] for any type name it
//! cannot find among the units being resolved. [`StandardLibrary`] provides
//! the built-in JavaScript types; embedders add their own library types or
//! remove built-ins to model an incomplete class path.

use jsbind_common::Modifiers;
use rustc_hash::FxHashMap;

/// A member signature refers to types by text (`Number`, `String[]`, `void`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryField {
    pub name: String,
    pub ty: String,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryMethod {
    pub selector: String,
    pub parameters: Vec<String>,
    pub return_type: String,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryType {
    /// Package segments followed by the type name.
    pub compound_name: Vec<String>,
    pub superclass: Option<String>,
    pub modifiers: Modifiers,
    pub fields: Vec<LibraryField>,
    pub methods: Vec<LibraryMethod>,
}

impl LibraryType {
    pub fn new(dotted: &str) -> Self {
        LibraryType {
            compound_name: dotted.split('.').map(str::to_string).collect(),
            superclass: Some("Object".to_string()),
            modifiers: Modifiers::PUBLIC,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.fields.push(LibraryField {
            name: name.to_string(),
            ty: ty.to_string(),
            modifiers: Modifiers::PUBLIC,
        });
        self
    }

    pub fn method(mut self, selector: &str, parameters: &[&str], return_type: &str) -> Self {
        self.methods.push(LibraryMethod {
            selector: selector.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.to_string(),
            modifiers: Modifiers::PUBLIC,
        });
        self
    }

    pub fn dotted_name(&self) -> String {
        self.compound_name.join(".")
    }
}

/// Source of library types.
pub trait NameEnvironment: Send + Sync {
    fn find_type(&self, compound_name: &[&str]) -> Option<LibraryType>;

    fn is_package(&self, compound_name: &[&str]) -> bool;
}

/// Built-in JavaScript types in the root package.
#[derive(Debug, Clone)]
pub struct StandardLibrary {
    types: FxHashMap<String, LibraryType>,
}

impl Default for StandardLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardLibrary {
    pub fn new() -> Self {
        let mut object = LibraryType::new("Object")
            .method("toString", &[], "String")
            .method("valueOf", &[], "Object")
            .method("hasOwnProperty", &["String"], "boolean");
        object.superclass = None;

        let builtins = [
            object,
            LibraryType::new("String")
                .field("length", "Number")
                .method("charAt", &["Number"], "String")
                .method("indexOf", &["String"], "Number")
                .method("substring", &["Number", "Number"], "String"),
            LibraryType::new("Number")
                .field("MAX_VALUE", "Number")
                .method("toFixed", &["Number"], "String"),
            LibraryType::new("Boolean"),
            LibraryType::new("Function")
                .field("length", "Number")
                .method("call", &["Object"], "Object"),
            LibraryType::new("Array")
                .field("length", "Number")
                .method("push", &["Object"], "Number")
                .method("join", &["String"], "String"),
            LibraryType::new("RegExp")
                .field("source", "String")
                .method("test", &["String"], "boolean"),
        ];
        let mut types = FxHashMap::default();
        for ty in builtins {
            types.insert(ty.dotted_name(), ty);
        }
        StandardLibrary { types }
    }

    /// Add (or replace) a library type.
    pub fn with_type(mut self, ty: LibraryType) -> Self {
        self.types.insert(ty.dotted_name(), ty);
        self
    }

    /// Drop a type, e.g. to simulate a broken class path.
    pub fn without(mut self, dotted: &str) -> Self {
        self.types.remove(dotted);
        self
    }
}

impl NameEnvironment for StandardLibrary {
    fn find_type(&self, compound_name: &[&str]) -> Option<LibraryType> {
        self.types.get(&compound_name.join(".")).cloned()
    }

    fn is_package(&self, compound_name: &[&str]) -> bool {
        if compound_name.is_empty() {
            return false;
        }
        self.types.values().any(|ty| {
            ty.compound_name.len() > compound_name.len()
                && ty
                    .compound_name
                    .iter()
                    .zip(compound_name)
                    .all(|(a, b)| a == b)
        })
    }
}
