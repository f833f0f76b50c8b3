//! Node kinds of the syntax tree.
//!
//! Payloads hold child [`NodeIndex`]es; an absent optional child is
//! [`NodeIndex::NONE`].

use jsbind_common::{Atom, Modifiers, Span};
use serde::Serialize;
use smallvec::SmallVec;

/// Index of a node in a [`crate::NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// `None` for [`NodeIndex::NONE`].
    #[inline]
    pub fn to_option(self) -> Option<NodeIndex> {
        if self.is_none() { None } else { Some(self) }
    }
}

/// Primitive type keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveCode {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveCode {
    pub fn from_keyword(keyword: &str) -> Option<PrimitiveCode> {
        Some(match keyword {
            "boolean" => PrimitiveCode::Boolean,
            "byte" => PrimitiveCode::Byte,
            "char" => PrimitiveCode::Char,
            "short" => PrimitiveCode::Short,
            "int" => PrimitiveCode::Int,
            "long" => PrimitiveCode::Long,
            "float" => PrimitiveCode::Float,
            "double" => PrimitiveCode::Double,
            "void" => PrimitiveCode::Void,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveCode::Boolean => "boolean",
            PrimitiveCode::Byte => "byte",
            PrimitiveCode::Char => "char",
            PrimitiveCode::Short => "short",
            PrimitiveCode::Int => "int",
            PrimitiveCode::Long => "long",
            PrimitiveCode::Float => "float",
            PrimitiveCode::Double => "double",
            PrimitiveCode::Void => "void",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InfixOperator {
    Plus,
    Minus,
    Times,
    Divide,
    Remainder,
    Less,
    Greater,
    LessEquals,
    GreaterEquals,
    Equals,
    NotEquals,
    StrictEquals,
    StrictNotEquals,
    ConditionalAnd,
    ConditionalOr,
    And,
    Or,
    Xor,
    LeftShift,
    RightShift,
}

impl InfixOperator {
    pub fn from_token(token: &str) -> Option<InfixOperator> {
        Some(match token {
            "+" => InfixOperator::Plus,
            "-" => InfixOperator::Minus,
            "*" => InfixOperator::Times,
            "/" => InfixOperator::Divide,
            "%" => InfixOperator::Remainder,
            "<" => InfixOperator::Less,
            ">" => InfixOperator::Greater,
            "<=" => InfixOperator::LessEquals,
            ">=" => InfixOperator::GreaterEquals,
            "==" => InfixOperator::Equals,
            "!=" => InfixOperator::NotEquals,
            "===" => InfixOperator::StrictEquals,
            "!==" => InfixOperator::StrictNotEquals,
            "&&" => InfixOperator::ConditionalAnd,
            "||" => InfixOperator::ConditionalOr,
            "&" => InfixOperator::And,
            "|" => InfixOperator::Or,
            "^" => InfixOperator::Xor,
            "<<" => InfixOperator::LeftShift,
            ">>" => InfixOperator::RightShift,
            _ => return None,
        })
    }

    /// Comparison and logical operators always produce a boolean.
    pub fn is_boolean_valued(self) -> bool {
        matches!(
            self,
            InfixOperator::Less
                | InfixOperator::Greater
                | InfixOperator::LessEquals
                | InfixOperator::GreaterEquals
                | InfixOperator::Equals
                | InfixOperator::NotEquals
                | InfixOperator::StrictEquals
                | InfixOperator::StrictNotEquals
                | InfixOperator::ConditionalAnd
                | InfixOperator::ConditionalOr
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PrefixOperator {
    Plus,
    Minus,
    Not,
    Complement,
    Increment,
    Decrement,
    TypeOf,
}

impl PrefixOperator {
    pub fn from_token(token: &str) -> Option<PrefixOperator> {
        Some(match token {
            "+" => PrefixOperator::Plus,
            "-" => PrefixOperator::Minus,
            "!" => PrefixOperator::Not,
            "~" => PrefixOperator::Complement,
            "++" => PrefixOperator::Increment,
            "--" => PrefixOperator::Decrement,
            "typeof" => PrefixOperator::TypeOf,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

impl PostfixOperator {
    pub fn from_token(token: &str) -> Option<PostfixOperator> {
        match token {
            "++" => Some(PostfixOperator::Increment),
            "--" => Some(PostfixOperator::Decrement),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AssignmentOperator {
    Assign,
    PlusAssign,
    MinusAssign,
    TimesAssign,
    DivideAssign,
}

impl AssignmentOperator {
    pub fn from_token(token: &str) -> Option<AssignmentOperator> {
        Some(match token {
            "=" => AssignmentOperator::Assign,
            "+=" => AssignmentOperator::PlusAssign,
            "-=" => AssignmentOperator::MinusAssign,
            "*=" => AssignmentOperator::TimesAssign,
            "/=" => AssignmentOperator::DivideAssign,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum NodeKind {
    // ========================================================================
    // Unit structure
    // ========================================================================
    SourceFile {
        package: NodeIndex,
        imports: Vec<NodeIndex>,
        types: Vec<NodeIndex>,
        statements: Vec<NodeIndex>,
    },
    PackageDeclaration {
        name: NodeIndex,
    },
    ImportDeclaration {
        name: NodeIndex,
        on_demand: bool,
    },

    // ========================================================================
    // Declarations
    // ========================================================================
    TypeDeclaration {
        modifiers: Modifiers,
        name: NodeIndex,
        superclass: NodeIndex,
        doc: NodeIndex,
        body: Vec<NodeIndex>,
    },
    FieldDeclaration {
        modifiers: Modifiers,
        ty: NodeIndex,
        fragments: Vec<NodeIndex>,
    },
    FunctionDeclaration {
        modifiers: Modifiers,
        is_constructor: bool,
        name: NodeIndex,
        return_type: NodeIndex,
        parameters: Vec<NodeIndex>,
        extra_dimensions: u32,
        doc: NodeIndex,
        body: NodeIndex,
    },
    SingleVariableDeclaration {
        ty: NodeIndex,
        name: NodeIndex,
        extra_dimensions: u32,
        initializer: NodeIndex,
    },
    VariableDeclarationFragment {
        name: NodeIndex,
        extra_dimensions: u32,
        initializer: NodeIndex,
    },
    VariableDeclarationStatement {
        modifiers: Modifiers,
        ty: NodeIndex,
        fragments: Vec<NodeIndex>,
    },
    VariableDeclarationExpression {
        ty: NodeIndex,
        fragments: Vec<NodeIndex>,
    },

    // ========================================================================
    // Types
    // ========================================================================
    PrimitiveType {
        code: PrimitiveCode,
    },
    SimpleType {
        name: NodeIndex,
    },
    QualifiedType {
        qualifier: NodeIndex,
        name: NodeIndex,
    },
    ArrayType {
        element: NodeIndex,
        dimensions: u32,
    },

    // ========================================================================
    // Names
    // ========================================================================
    /// `index` is the one-based position of the segment inside its
    /// enclosing qualified name (1 for a lone name).
    SimpleName {
        id: Atom,
        index: u32,
    },
    /// `index` is the number of segments covered by this name.
    QualifiedName {
        qualifier: NodeIndex,
        name: NodeIndex,
        index: u32,
    },

    // ========================================================================
    // Statements
    // ========================================================================
    Block {
        statements: Vec<NodeIndex>,
    },
    ExpressionStatement {
        expression: NodeIndex,
    },
    ReturnStatement {
        expression: NodeIndex,
    },

    // ========================================================================
    // Expressions
    // ========================================================================
    FunctionInvocation {
        receiver: NodeIndex,
        name: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    SuperMethodInvocation {
        name: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    ClassInstanceCreation {
        ty: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    ConstructorInvocation {
        arguments: Vec<NodeIndex>,
    },
    SuperConstructorInvocation {
        arguments: Vec<NodeIndex>,
    },
    FieldAccess {
        receiver: NodeIndex,
        name: NodeIndex,
    },
    SuperFieldAccess {
        name: NodeIndex,
    },
    NumberLiteral {
        token: Atom,
    },
    StringLiteral {
        value: Atom,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    UndefinedLiteral,
    CharacterLiteral {
        value: char,
    },
    RegularExpressionLiteral {
        pattern: Atom,
    },
    ThisExpression,
    ParenthesizedExpression {
        expression: NodeIndex,
    },
    InfixExpression {
        operator: InfixOperator,
        left: NodeIndex,
        right: NodeIndex,
    },
    PrefixExpression {
        operator: PrefixOperator,
        operand: NodeIndex,
    },
    PostfixExpression {
        operator: PostfixOperator,
        operand: NodeIndex,
    },
    ConditionalExpression {
        condition: NodeIndex,
        then_expression: NodeIndex,
        else_expression: NodeIndex,
    },
    ArrayAccess {
        array: NodeIndex,
        index: NodeIndex,
    },
    Assignment {
        operator: AssignmentOperator,
        left: NodeIndex,
        right: NodeIndex,
    },
    InstanceofExpression {
        expression: NodeIndex,
        ty: NodeIndex,
    },

    // ========================================================================
    // Doc comments
    // ========================================================================
    JsDoc {
        tags: Vec<NodeIndex>,
    },
    MemberRef {
        qualifier: NodeIndex,
        name: NodeIndex,
    },
    FunctionRef {
        qualifier: NodeIndex,
        name: NodeIndex,
        parameters: Vec<NodeIndex>,
    },
}

impl NodeKind {
    /// Direct children in source order, skipping absent ones.
    pub fn children(&self) -> SmallVec<[NodeIndex; 4]> {
        let mut out: SmallVec<[NodeIndex; 4]> = SmallVec::new();
        let mut push = |idx: NodeIndex| {
            if idx.is_some() {
                out.push(idx);
            }
        };
        match self {
            NodeKind::SourceFile {
                package,
                imports,
                types,
                statements,
            } => {
                push(*package);
                imports.iter().copied().for_each(&mut push);
                types.iter().copied().for_each(&mut push);
                statements.iter().copied().for_each(&mut push);
            }
            NodeKind::PackageDeclaration { name } | NodeKind::ImportDeclaration { name, .. } => {
                push(*name)
            }
            NodeKind::TypeDeclaration {
                name,
                superclass,
                doc,
                body,
                ..
            } => {
                push(*doc);
                push(*name);
                push(*superclass);
                body.iter().copied().for_each(&mut push);
            }
            NodeKind::FieldDeclaration { ty, fragments, .. }
            | NodeKind::VariableDeclarationStatement { ty, fragments, .. }
            | NodeKind::VariableDeclarationExpression { ty, fragments } => {
                push(*ty);
                fragments.iter().copied().for_each(&mut push);
            }
            NodeKind::FunctionDeclaration {
                name,
                return_type,
                parameters,
                doc,
                body,
                ..
            } => {
                push(*doc);
                push(*return_type);
                push(*name);
                parameters.iter().copied().for_each(&mut push);
                push(*body);
            }
            NodeKind::SingleVariableDeclaration {
                ty,
                name,
                initializer,
                ..
            } => {
                push(*ty);
                push(*name);
                push(*initializer);
            }
            NodeKind::VariableDeclarationFragment {
                name, initializer, ..
            } => {
                push(*name);
                push(*initializer);
            }
            NodeKind::SimpleType { name } => push(*name),
            NodeKind::QualifiedType { qualifier, name }
            | NodeKind::QualifiedName {
                qualifier, name, ..
            } => {
                push(*qualifier);
                push(*name);
            }
            NodeKind::ArrayType { element, .. } => push(*element),
            NodeKind::Block { statements } => statements.iter().copied().for_each(&mut push),
            NodeKind::ExpressionStatement { expression }
            | NodeKind::ReturnStatement { expression }
            | NodeKind::ParenthesizedExpression { expression } => push(*expression),
            NodeKind::FunctionInvocation {
                receiver,
                name,
                arguments,
            } => {
                push(*receiver);
                push(*name);
                arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::SuperMethodInvocation { name, arguments } => {
                push(*name);
                arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::ClassInstanceCreation { ty, arguments } => {
                push(*ty);
                arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::ConstructorInvocation { arguments }
            | NodeKind::SuperConstructorInvocation { arguments } => {
                arguments.iter().copied().for_each(&mut push)
            }
            NodeKind::FieldAccess { receiver, name } => {
                push(*receiver);
                push(*name);
            }
            NodeKind::SuperFieldAccess { name } => push(*name),
            NodeKind::InfixExpression { left, right, .. }
            | NodeKind::Assignment { left, right, .. } => {
                push(*left);
                push(*right);
            }
            NodeKind::PrefixExpression { operand, .. }
            | NodeKind::PostfixExpression { operand, .. } => push(*operand),
            NodeKind::ConditionalExpression {
                condition,
                then_expression,
                else_expression,
            } => {
                push(*condition);
                push(*then_expression);
                push(*else_expression);
            }
            NodeKind::ArrayAccess { array, index } => {
                push(*array);
                push(*index);
            }
            NodeKind::InstanceofExpression { expression, ty } => {
                push(*expression);
                push(*ty);
            }
            NodeKind::JsDoc { tags } => tags.iter().copied().for_each(&mut push),
            NodeKind::MemberRef { qualifier, name } => {
                push(*qualifier);
                push(*name);
            }
            NodeKind::FunctionRef {
                qualifier,
                name,
                parameters,
            } => {
                push(*qualifier);
                push(*name);
                parameters.iter().copied().for_each(&mut push);
            }
            NodeKind::PrimitiveType { .. }
            | NodeKind::SimpleName { .. }
            | NodeKind::NumberLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NullLiteral
            | NodeKind::UndefinedLiteral
            | NodeKind::CharacterLiteral { .. }
            | NodeKind::RegularExpressionLiteral { .. }
            | NodeKind::ThisExpression => {}
        }
        out
    }

    /// Stable node-type name, used in diagnostics and recovered keys.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::SourceFile { .. } => "SourceFile",
            NodeKind::PackageDeclaration { .. } => "PackageDeclaration",
            NodeKind::ImportDeclaration { .. } => "ImportDeclaration",
            NodeKind::TypeDeclaration { .. } => "TypeDeclaration",
            NodeKind::FieldDeclaration { .. } => "FieldDeclaration",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::SingleVariableDeclaration { .. } => "SingleVariableDeclaration",
            NodeKind::VariableDeclarationFragment { .. } => "VariableDeclarationFragment",
            NodeKind::VariableDeclarationStatement { .. } => "VariableDeclarationStatement",
            NodeKind::VariableDeclarationExpression { .. } => "VariableDeclarationExpression",
            NodeKind::PrimitiveType { .. } => "PrimitiveType",
            NodeKind::SimpleType { .. } => "SimpleType",
            NodeKind::QualifiedType { .. } => "QualifiedType",
            NodeKind::ArrayType { .. } => "ArrayType",
            NodeKind::SimpleName { .. } => "SimpleName",
            NodeKind::QualifiedName { .. } => "QualifiedName",
            NodeKind::Block { .. } => "Block",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::FunctionInvocation { .. } => "FunctionInvocation",
            NodeKind::SuperMethodInvocation { .. } => "SuperMethodInvocation",
            NodeKind::ClassInstanceCreation { .. } => "ClassInstanceCreation",
            NodeKind::ConstructorInvocation { .. } => "ConstructorInvocation",
            NodeKind::SuperConstructorInvocation { .. } => "SuperConstructorInvocation",
            NodeKind::FieldAccess { .. } => "FieldAccess",
            NodeKind::SuperFieldAccess { .. } => "SuperFieldAccess",
            NodeKind::NumberLiteral { .. } => "NumberLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::UndefinedLiteral => "UndefinedLiteral",
            NodeKind::CharacterLiteral { .. } => "CharacterLiteral",
            NodeKind::RegularExpressionLiteral { .. } => "RegularExpressionLiteral",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::ParenthesizedExpression { .. } => "ParenthesizedExpression",
            NodeKind::InfixExpression { .. } => "InfixExpression",
            NodeKind::PrefixExpression { .. } => "PrefixExpression",
            NodeKind::PostfixExpression { .. } => "PostfixExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::ArrayAccess { .. } => "ArrayAccess",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::InstanceofExpression { .. } => "InstanceofExpression",
            NodeKind::JsDoc { .. } => "JsDoc",
            NodeKind::MemberRef { .. } => "MemberRef",
            NodeKind::FunctionRef { .. } => "FunctionRef",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::PrimitiveType { .. }
                | NodeKind::SimpleType { .. }
                | NodeKind::QualifiedType { .. }
                | NodeKind::ArrayType { .. }
        )
    }

    pub fn is_name(&self) -> bool {
        matches!(
            self,
            NodeKind::SimpleName { .. } | NodeKind::QualifiedName { .. }
        )
    }

    /// Single variable declarations and declaration fragments.
    pub fn is_variable_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::SingleVariableDeclaration { .. } | NodeKind::VariableDeclarationFragment { .. }
        )
    }

    /// Index of a name node (see [`NodeKind::SimpleName`]); 0 otherwise.
    pub fn name_index(&self) -> u32 {
        match self {
            NodeKind::SimpleName { index, .. } | NodeKind::QualifiedName { index, .. } => *index,
            _ => 0,
        }
    }
}

/// A node in the arena.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: NodeIndex,
}
