//! Raw bindings produced by the semantic analyzer.
//!
//! A raw binding is the analyzer's mutable record for a declaration. Raw
//! bindings live in a [`BindingStore`](crate::BindingStore) and refer to each
//! other by [`BindingId`], so cyclic graphs (a type whose field has the type
//! itself) need no shared pointers.
//!
//! Names are kept as `Arc<str>` rather than interned atoms: two resolution
//! passes own different interners, and the comparator must be able to compare
//! bindings across passes.

use bitflags::bitflags;
use jsbind_common::Modifiers;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Compound (dotted) name, one segment per entry.
pub type CompoundName = SmallVec<[Arc<str>; 4]>;

// =============================================================================
// Identifiers
// =============================================================================

/// Index of a raw binding inside its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl BindingId {
    pub const NONE: BindingId = BindingId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub fn to_option(self) -> Option<BindingId> {
        if self.is_none() { None } else { Some(self) }
    }
}

impl Default for BindingId {
    fn default() -> Self {
        BindingId::NONE
    }
}

/// Identity of one binding store (one resolution pass).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreId(pub u64);

// =============================================================================
// Base types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    Char,
    Byte,
    Short,
    Boolean,
    Void,
    Long,
    Double,
    Float,
    Int,
    Null,
    Undefined,
}

impl BaseType {
    pub const ALL: [BaseType; 11] = [
        BaseType::Char,
        BaseType::Byte,
        BaseType::Short,
        BaseType::Boolean,
        BaseType::Void,
        BaseType::Long,
        BaseType::Double,
        BaseType::Float,
        BaseType::Int,
        BaseType::Null,
        BaseType::Undefined,
    ];

    /// Numeric type id; base types compare by this id.
    pub fn type_id(self) -> u8 {
        match self {
            BaseType::Char => 2,
            BaseType::Byte => 3,
            BaseType::Short => 4,
            BaseType::Boolean => 5,
            BaseType::Void => 6,
            BaseType::Long => 7,
            BaseType::Double => 8,
            BaseType::Float => 9,
            BaseType::Int => 10,
            BaseType::Null => 12,
            BaseType::Undefined => 13,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BaseType::Char => "char",
            BaseType::Byte => "byte",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
            BaseType::Void => "void",
            BaseType::Long => "long",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Null => "null",
            BaseType::Undefined => "undefined",
        }
    }

    /// Single-letter key of the type.
    pub fn key_char(self) -> char {
        match self {
            BaseType::Char => 'C',
            BaseType::Byte => 'B',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
            BaseType::Void => 'V',
            BaseType::Long => 'J',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Null => 'N',
            BaseType::Undefined => 'U',
        }
    }

    pub fn from_key_char(c: char) -> Option<BaseType> {
        BaseType::ALL.into_iter().find(|base| base.key_char() == c)
    }

    pub fn from_primitive(code: jsbind_ast::PrimitiveCode) -> BaseType {
        use jsbind_ast::PrimitiveCode;
        match code {
            PrimitiveCode::Boolean => BaseType::Boolean,
            PrimitiveCode::Byte => BaseType::Byte,
            PrimitiveCode::Char => BaseType::Char,
            PrimitiveCode::Short => BaseType::Short,
            PrimitiveCode::Int => BaseType::Int,
            PrimitiveCode::Long => BaseType::Long,
            PrimitiveCode::Float => BaseType::Float,
            PrimitiveCode::Double => BaseType::Double,
            PrimitiveCode::Void => BaseType::Void,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BaseType::Byte
                | BaseType::Short
                | BaseType::Int
                | BaseType::Long
                | BaseType::Float
                | BaseType::Double
                | BaseType::Char
        )
    }

    /// `null` and `undefined` flow into any reference type.
    pub fn is_nullish(self) -> bool {
        matches!(self, BaseType::Null | BaseType::Undefined)
    }
}

// =============================================================================
// Constants
// =============================================================================

/// Compile-time constant value.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Short(i16),
    Char(char),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(Arc<str>),
}

impl Constant {
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Constant::Int(v) => f64::from(*v),
            Constant::Long(v) => *v as f64,
            Constant::Short(v) => f64::from(*v),
            Constant::Char(v) => f64::from(u32::from(*v)),
            Constant::Float(v) => f64::from(*v),
            Constant::Double(v) => *v,
            Constant::Boolean(_) | Constant::String(_) => return None,
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        Some(match self {
            Constant::Int(v) => i64::from(*v),
            Constant::Long(v) => *v,
            Constant::Short(v) => i64::from(*v),
            Constant::Char(v) => i64::from(u32::from(*v)),
            _ => return None,
        })
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Constant::Int(_) | Constant::Long(_) | Constant::Short(_) | Constant::Char(_)
        )
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}"),
            Constant::Short(v) => write!(f, "{v}"),
            Constant::Char(v) => write!(f, "{v}"),
            Constant::Float(v) => write!(f, "{v}"),
            Constant::Double(v) => write!(f, "{v}"),
            Constant::Boolean(v) => write!(f, "{v}"),
            Constant::String(v) => f.write_str(v),
        }
    }
}

// =============================================================================
// Problems
// =============================================================================

/// Why a lookup produced a problem binding instead of a real one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProblemReason {
    NotFound,
    NotVisible,
    NonStaticReferenceInStaticContext,
}

bitflags! {
    /// Shape of a reference type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Declared inside another type.
        const MEMBER = 0x01;
        /// Installed from the name environment rather than from source.
        const BINARY = 0x02;
        /// The type owning a unit's top-level functions and variables.
        const COMPILATION_UNIT = 0x04;
    }
}

// =============================================================================
// Binding records
// =============================================================================

#[derive(Clone, Debug)]
pub struct ArrayData {
    pub leaf: BindingId,
    pub dimensions: u32,
}

#[derive(Clone, Debug)]
pub struct ReferenceData {
    /// Package segments followed by the type name (`Outer$Inner` for members).
    pub compound_name: CompoundName,
    pub source_name: Arc<str>,
    /// Slash-separated name (`p/q/Outer$Inner`); absent for problem types.
    pub constant_pool_name: Option<Arc<str>>,
    pub modifiers: Modifiers,
    pub flags: TypeFlags,
    pub enclosing: BindingId,
    pub package: BindingId,
    pub superclass: BindingId,
    pub fields: Vec<BindingId>,
    pub methods: Vec<BindingId>,
    pub member_types: Vec<BindingId>,
    /// Unit that declares the type; `None` for binary types.
    pub file_name: Option<Arc<str>>,
    pub problem: Option<ProblemReason>,
    pub closest_match: BindingId,
}

impl ReferenceData {
    pub fn is_member(&self) -> bool {
        self.flags.contains(TypeFlags::MEMBER)
    }

    pub fn is_binary(&self) -> bool {
        self.flags.contains(TypeFlags::BINARY)
    }

    pub fn is_compilation_unit(&self) -> bool {
        self.flags.contains(TypeFlags::COMPILATION_UNIT)
    }

    pub fn is_valid(&self) -> bool {
        self.problem.is_none()
    }

    /// Dotted package name plus type name.
    pub fn dotted_name(&self) -> String {
        self.compound_name.join(".")
    }
}

#[derive(Clone, Debug)]
pub struct MethodData {
    /// `<init>` for constructors.
    pub selector: Arc<str>,
    pub return_type: BindingId,
    pub parameters: SmallVec<[BindingId; 4]>,
    pub declaring_class: BindingId,
    pub modifiers: Modifiers,
    pub locals: Vec<BindingId>,
    pub problem: Option<ProblemReason>,
    pub closest_match: BindingId,
}

impl MethodData {
    pub const CONSTRUCTOR_SELECTOR: &'static str = "<init>";

    pub fn is_constructor(&self) -> bool {
        &*self.selector == Self::CONSTRUCTOR_SELECTOR
    }

    pub fn is_valid(&self) -> bool {
        self.problem.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct FieldData {
    pub name: Arc<str>,
    pub ty: BindingId,
    pub modifiers: Modifiers,
    pub declaring_class: BindingId,
    pub id: u32,
    pub constant: Option<Constant>,
    pub problem: Option<ProblemReason>,
    pub closest_match: BindingId,
}

impl FieldData {
    /// Id of problem fields, which are not declared anywhere.
    pub const NO_ID: u32 = u32::MAX;

    pub fn is_valid(&self) -> bool {
        self.problem.is_none()
    }
}

/// Local variable or parameter.
#[derive(Clone, Debug)]
pub struct LocalData {
    pub name: Arc<str>,
    pub ty: BindingId,
    pub modifiers: Modifiers,
    pub id: u32,
    pub declaring_method: BindingId,
    pub is_parameter: bool,
    pub constant: Option<Constant>,
}

#[derive(Clone, Debug)]
pub struct PackageData {
    pub compound_name: CompoundName,
    pub problem: Option<ProblemReason>,
}

impl PackageData {
    pub fn is_valid(&self) -> bool {
        self.problem.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ImportData {
    pub compound_name: CompoundName,
    pub on_demand: bool,
    /// The type or package the import names, once resolved.
    pub resolved: BindingId,
}

/// A raw binding of any kind.
#[derive(Clone, Debug)]
pub enum RawBinding {
    Base(BaseType),
    Array(ArrayData),
    Reference(ReferenceData),
    Method(MethodData),
    Field(FieldData),
    Variable(LocalData),
    Package(PackageData),
    Import(ImportData),
}

impl RawBinding {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            RawBinding::Base(_) | RawBinding::Array(_) | RawBinding::Reference(_)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RawBinding::Base(_) => "base",
            RawBinding::Array(_) => "array",
            RawBinding::Reference(_) => "reference",
            RawBinding::Method(_) => "method",
            RawBinding::Field(_) => "field",
            RawBinding::Variable(_) => "variable",
            RawBinding::Package(_) => "package",
            RawBinding::Import(_) => "import",
        }
    }

    /// Modifier bits of the binding (none for base, array and package).
    pub fn modifiers(&self) -> Modifiers {
        match self {
            RawBinding::Reference(data) => data.modifiers,
            RawBinding::Method(data) => data.modifiers,
            RawBinding::Field(data) => data.modifiers,
            RawBinding::Variable(data) => data.modifiers,
            RawBinding::Base(_)
            | RawBinding::Array(_)
            | RawBinding::Package(_)
            | RawBinding::Import(_) => Modifiers::empty(),
        }
    }
}
