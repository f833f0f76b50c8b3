//! The closed set of facade kinds.

use crate::method_binding::MethodBinding;
use crate::package_binding::PackageBinding;
use crate::type_binding::TypeBinding;
use crate::variable_binding::VariableBinding;
use jsbind_common::Modifiers;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Type,
    Method,
    Variable,
    Package,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingKind::Type => "type",
            BindingKind::Method => "method",
            BindingKind::Variable => "variable",
            BindingKind::Package => "package",
        })
    }
}

/// A facade of any kind.
///
/// Facades are handed out by a binding resolver and are reference-stable
/// within a pass: asking twice for the same declaration yields the same
/// `Arc`.
#[derive(Debug, Clone)]
pub enum Binding {
    Type(Arc<TypeBinding>),
    Method(Arc<MethodBinding>),
    Variable(Arc<VariableBinding>),
    Package(Arc<PackageBinding>),
}

impl Binding {
    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Type(_) => BindingKind::Type,
            Binding::Method(_) => BindingKind::Method,
            Binding::Variable(_) => BindingKind::Variable,
            Binding::Package(_) => BindingKind::Package,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Binding::Type(b) => b.key(),
            Binding::Method(b) => b.key(),
            Binding::Variable(b) => b.key(),
            Binding::Package(b) => b.key(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Binding::Type(b) => b.name(),
            Binding::Method(b) => b.name(),
            Binding::Variable(b) => b.name(),
            Binding::Package(b) => b.name(),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Binding::Type(b) => b.modifiers(),
            Binding::Method(b) => b.modifiers(),
            Binding::Variable(b) => b.modifiers(),
            Binding::Package(_) => Modifiers::empty(),
        }
    }

    pub fn is_recovered(&self) -> bool {
        match self {
            Binding::Type(b) => b.is_recovered(),
            Binding::Variable(b) => b.is_recovered(),
            Binding::Method(_) | Binding::Package(_) => false,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        match self {
            Binding::Type(b) => b.is_deprecated(),
            Binding::Method(b) => b.is_deprecated(),
            Binding::Variable(b) => b.is_deprecated(),
            Binding::Package(_) => false,
        }
    }

    /// Structural equality; bindings of different kinds are never equal.
    pub fn is_equal_to(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Type(a), Binding::Type(b)) => a.is_equal_to(b),
            (Binding::Method(a), Binding::Method(b)) => a.is_equal_to(b),
            (Binding::Variable(a), Binding::Variable(b)) => a.is_equal_to(b),
            (Binding::Package(a), Binding::Package(b)) => a.is_equal_to(b),
            _ => false,
        }
    }

    /// Whether both handles are the same facade instance.
    pub fn ptr_eq(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Type(a), Binding::Type(b)) => Arc::ptr_eq(a, b),
            (Binding::Method(a), Binding::Method(b)) => Arc::ptr_eq(a, b),
            (Binding::Variable(a), Binding::Variable(b)) => Arc::ptr_eq(a, b),
            (Binding::Package(a), Binding::Package(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<TypeBinding>> {
        match self {
            Binding::Type(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Arc<MethodBinding>> {
        match self {
            Binding::Method(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Arc<VariableBinding>> {
        match self {
            Binding::Variable(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_package(&self) -> Option<&Arc<PackageBinding>> {
        match self {
            Binding::Package(b) => Some(b),
            _ => None,
        }
    }

    /// Raw binding behind the facade; recovered types have none.
    pub(crate) fn raw_id(&self) -> Option<jsbind_lookup::BindingId> {
        match self {
            Binding::Type(b) => b.raw_id(),
            Binding::Method(b) => Some(b.raw_id()),
            Binding::Variable(b) => Some(b.raw_id()),
            Binding::Package(b) => Some(b.raw_id()),
        }
    }
}

impl From<Arc<TypeBinding>> for Binding {
    fn from(binding: Arc<TypeBinding>) -> Self {
        Binding::Type(binding)
    }
}

impl From<Arc<MethodBinding>> for Binding {
    fn from(binding: Arc<MethodBinding>) -> Self {
        Binding::Method(binding)
    }
}

impl From<Arc<VariableBinding>> for Binding {
    fn from(binding: Arc<VariableBinding>) -> Self {
        Binding::Variable(binding)
    }
}

impl From<Arc<PackageBinding>> for Binding {
    fn from(binding: Arc<PackageBinding>) -> Self {
        Binding::Package(binding)
    }
}
