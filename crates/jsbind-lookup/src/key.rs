//! Binding keys.
//!
//! A key is a textual fingerprint of a declaration, unique within a pass:
//!
//! | binding | key |
//! |---------|-----|
//! | base type | one letter (`I`, `Z`, `V`, `N` for null, `U` for undefined, ...) |
//! | reference type | `Lp/q/Foo;`, member types `Lp/q/Outer$Inner;` |
//! | array type | one `[` per dimension, then the leaf key |
//! | package | `p/q` |
//! | method | `<declaring key>.<selector>(<parameter keys>)<return key>` |
//! | field | `<declaring key>.<name>)<type key>` |
//! | local | `<method key>#<name>#<id>` |
//!
//! Keys are produced by [`unique_key`] and read back into a [`KeyDescriptor`]
//! before anything is resolved, so a driver can route a key to the unit that
//! declares its type.

use crate::raw::{BaseType, BindingId, RawBinding};
use crate::store::BindingStore;
use std::fmt;

/// Compute the key of a raw binding. Unknown ids produce an empty key.
pub fn unique_key(store: &BindingStore, id: BindingId) -> String {
    let mut out = String::new();
    write_key(store, id, &mut out);
    out
}

fn write_key(store: &BindingStore, id: BindingId, out: &mut String) {
    let Some(binding) = store.get(id) else {
        return;
    };
    match binding {
        RawBinding::Base(base) => out.push(base.key_char()),
        RawBinding::Array(array) => {
            for _ in 0..array.dimensions {
                out.push('[');
            }
            write_key(store, array.leaf, out);
        }
        RawBinding::Reference(data) => {
            if data.is_member() && data.enclosing.is_some() {
                write_key(store, data.enclosing, out);
                if out.ends_with(';') {
                    out.pop();
                }
                out.push('$');
                out.push_str(&data.source_name);
                out.push(';');
            } else {
                out.push('L');
                push_joined(out, data.compound_name.iter().map(|s| &**s), '/');
                out.push(';');
            }
        }
        RawBinding::Method(data) => {
            write_key(store, data.declaring_class, out);
            out.push('.');
            out.push_str(&data.selector);
            out.push('(');
            for param in &data.parameters {
                write_key(store, *param, out);
            }
            out.push(')');
            write_key(store, data.return_type, out);
        }
        RawBinding::Field(data) => {
            write_key(store, data.declaring_class, out);
            out.push('.');
            out.push_str(&data.name);
            out.push(')');
            write_key(store, data.ty, out);
        }
        RawBinding::Variable(data) => {
            write_key(store, data.declaring_method, out);
            out.push('#');
            out.push_str(&data.name);
            out.push('#');
            out.push_str(&data.id.to_string());
        }
        RawBinding::Package(data) => {
            push_joined(out, data.compound_name.iter().map(|s| &**s), '/');
        }
        RawBinding::Import(data) => {
            push_joined(out, data.compound_name.iter().map(|s| &**s), '/');
            if data.on_demand {
                out.push_str("/*");
            }
        }
    }
}

fn push_joined<'a>(out: &mut String, parts: impl Iterator<Item = &'a str>, sep: char) {
    for (i, part) in parts.enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push_str(part);
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// A binding key that does not follow the key grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyError {
    pub key: String,
    pub position: usize,
    pub message: &'static str,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid binding key `{}` at {}: {}",
            self.key, self.position, self.message
        )
    }
}

impl std::error::Error for KeyError {}

/// Structured form of a binding key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    Base(BaseType),
    Array {
        dimensions: u32,
        leaf: Box<KeyDescriptor>,
    },
    /// Compound name as written; member types keep their `Outer$Inner` segment.
    Type { compound_name: Vec<String> },
    Package { compound_name: Vec<String> },
    Method {
        declaring: Box<KeyDescriptor>,
        selector: String,
        parameters: Vec<KeyDescriptor>,
        return_type: Option<Box<KeyDescriptor>>,
    },
    Field {
        declaring: Box<KeyDescriptor>,
        name: String,
        ty: Option<Box<KeyDescriptor>>,
    },
    Local {
        method: Box<KeyDescriptor>,
        name: String,
        id: u32,
    },
}

impl KeyDescriptor {
    pub fn parse(key: &str) -> Result<KeyDescriptor, KeyError> {
        KeyParser { key, pos: 0 }.parse()
    }

    /// Compound name of the type that owns the key, when there is one.
    ///
    /// Array, base and package keys have no type name and are resolved
    /// against the whole environment instead of a unit.
    pub fn type_name(&self) -> Option<&[String]> {
        match self {
            KeyDescriptor::Type { compound_name } => Some(compound_name),
            KeyDescriptor::Method { declaring, .. } | KeyDescriptor::Field { declaring, .. } => {
                declaring.type_name()
            }
            KeyDescriptor::Local { method, .. } => method.type_name(),
            KeyDescriptor::Base(_) | KeyDescriptor::Array { .. } | KeyDescriptor::Package { .. } => {
                None
            }
        }
    }
}

impl fmt::Display for KeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDescriptor::Base(base) => write!(f, "{}", base.key_char()),
            KeyDescriptor::Array { dimensions, leaf } => {
                for _ in 0..*dimensions {
                    f.write_str("[")?;
                }
                write!(f, "{leaf}")
            }
            KeyDescriptor::Type { compound_name } => write!(f, "L{};", compound_name.join("/")),
            KeyDescriptor::Package { compound_name } => f.write_str(&compound_name.join("/")),
            KeyDescriptor::Method {
                declaring,
                selector,
                parameters,
                return_type,
            } => {
                write!(f, "{declaring}.{selector}(")?;
                for param in parameters {
                    write!(f, "{param}")?;
                }
                f.write_str(")")?;
                match return_type {
                    Some(ret) => write!(f, "{ret}"),
                    None => Ok(()),
                }
            }
            KeyDescriptor::Field { declaring, name, ty } => {
                write!(f, "{declaring}.{name})")?;
                match ty {
                    Some(ty) => write!(f, "{ty}"),
                    None => Ok(()),
                }
            }
            KeyDescriptor::Local { method, name, id } => write!(f, "{method}#{name}#{id}"),
        }
    }
}

struct KeyParser<'a> {
    key: &'a str,
    pos: usize,
}

impl KeyParser<'_> {
    fn error(&self, message: &'static str) -> KeyError {
        KeyError {
            key: self.key.to_string(),
            position: self.pos,
            message,
        }
    }

    fn rest(&self) -> &str {
        &self.key[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.key.len()
    }

    fn parse(mut self) -> Result<KeyDescriptor, KeyError> {
        if self.key.is_empty() {
            return Err(self.error("empty key"));
        }
        if !self.starts_type() {
            return self.parse_package();
        }
        let ty = self.parse_type()?;
        if self.at_end() {
            return Ok(ty);
        }
        if self.bump() != Some('.') {
            return Err(self.error("expected `.` after the declaring type"));
        }
        let member = self.parse_member(ty)?;
        if self.at_end() {
            return Ok(member);
        }
        if self.bump() != Some('#') || !matches!(member, KeyDescriptor::Method { .. }) {
            return Err(self.error("unexpected trailing characters"));
        }
        self.parse_local(member)
    }

    fn starts_type(&self) -> bool {
        match self.peek() {
            Some('[') => true,
            Some('L') => self.key.contains(';'),
            Some(c) => {
                BaseType::from_key_char(c).is_some()
                    && self.key.len() == c.len_utf8()
            }
            None => false,
        }
    }

    fn parse_package(&mut self) -> Result<KeyDescriptor, KeyError> {
        let text = self.rest();
        if text
            .chars()
            .any(|c| matches!(c, ';' | '(' | ')' | '#' | '['))
        {
            return Err(self.error("not a type, member or package key"));
        }
        let compound_name = text.split('/').map(str::to_string).collect::<Vec<_>>();
        if compound_name.iter().any(String::is_empty) {
            return Err(self.error("empty package segment"));
        }
        self.pos = self.key.len();
        Ok(KeyDescriptor::Package { compound_name })
    }

    fn parse_type(&mut self) -> Result<KeyDescriptor, KeyError> {
        match self.peek() {
            Some('[') => {
                let mut dimensions = 0;
                while self.peek() == Some('[') {
                    self.bump();
                    dimensions += 1;
                }
                let leaf = self.parse_type()?;
                Ok(KeyDescriptor::Array {
                    dimensions,
                    leaf: Box::new(leaf),
                })
            }
            Some('L') => {
                self.bump();
                let Some(end) = self.rest().find(';') else {
                    return Err(self.error("unterminated type key"));
                };
                let body = &self.rest()[..end];
                let compound_name = body.split('/').map(str::to_string).collect::<Vec<_>>();
                if compound_name.iter().any(String::is_empty) {
                    return Err(self.error("empty type name segment"));
                }
                self.pos += end + 1;
                Ok(KeyDescriptor::Type { compound_name })
            }
            Some(c) => match BaseType::from_key_char(c) {
                Some(base) => {
                    self.bump();
                    Ok(KeyDescriptor::Base(base))
                }
                None => Err(self.error("expected a type key")),
            },
            None => Err(self.error("expected a type key")),
        }
    }

    fn parse_member(&mut self, declaring: KeyDescriptor) -> Result<KeyDescriptor, KeyError> {
        let Some(end) = self.rest().find(['(', ')']) else {
            return Err(self.error("expected `(` or `)` after the member name"));
        };
        let name = self.rest()[..end].to_string();
        if name.is_empty() {
            return Err(self.error("empty member name"));
        }
        self.pos += end;
        if self.bump() == Some('(') {
            let mut parameters = Vec::new();
            while self.peek() != Some(')') {
                if self.at_end() {
                    return Err(self.error("unterminated parameter list"));
                }
                parameters.push(self.parse_type()?);
            }
            self.bump();
            let return_type = self.parse_optional_type()?;
            Ok(KeyDescriptor::Method {
                declaring: Box::new(declaring),
                selector: name,
                parameters,
                return_type,
            })
        } else {
            let ty = self.parse_optional_type()?;
            Ok(KeyDescriptor::Field {
                declaring: Box::new(declaring),
                name,
                ty,
            })
        }
    }

    fn parse_optional_type(&mut self) -> Result<Option<Box<KeyDescriptor>>, KeyError> {
        if self.at_end() || self.peek() == Some('#') {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_type()?)))
    }

    fn parse_local(&mut self, method: KeyDescriptor) -> Result<KeyDescriptor, KeyError> {
        let Some(end) = self.rest().find('#') else {
            return Err(self.error("expected `#` after the local name"));
        };
        let name = self.rest()[..end].to_string();
        self.pos += end + 1;
        let id = self
            .rest()
            .parse::<u32>()
            .map_err(|_| self.error("expected a numeric local id"))?;
        self.pos = self.key.len();
        Ok(KeyDescriptor::Local {
            method: Box::new(method),
            name,
            id,
        })
    }
}

#[cfg(test)]
#[path = "../tests/key_tests.rs"]
mod key_tests;
