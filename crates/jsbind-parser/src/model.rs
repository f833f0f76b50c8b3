//! Serde model of a unit description.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitModel {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub imports: Vec<ImportModel>,
    #[serde(default)]
    pub types: Vec<TypeModel>,
    /// Top-level functions, owned by the unit's own binding.
    #[serde(default)]
    pub functions: Vec<FunctionModel>,
    /// Top-level statements (`var` declarations become unit variables).
    #[serde(default)]
    pub statements: Vec<StatementModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportModel {
    pub name: String,
    #[serde(default)]
    pub on_demand: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeModel {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldModel>,
    #[serde(default)]
    pub methods: Vec<FunctionModel>,
    /// Member types.
    #[serde(default)]
    pub types: Vec<TypeModel>,
    #[serde(default)]
    pub doc: Vec<DocRefModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub dims: u32,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub init: Option<ExprModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionModel {
    pub name: String,
    #[serde(default)]
    pub constructor: bool,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamModel>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub doc: Vec<DocRefModel>,
    /// Statements, kept raw so a diet parse can skip them.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamModel {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub dims: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DocRefModel {
    MemberRef {
        #[serde(default)]
        qualifier: Option<String>,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    FunctionRef {
        #[serde(default)]
        qualifier: Option<String>,
        name: String,
        #[serde(default)]
        params: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StatementModel {
    Var {
        #[serde(default, rename = "type")]
        ty: Option<String>,
        name: String,
        #[serde(default)]
        dims: u32,
        #[serde(default)]
        init: Option<ExprModel>,
    },
    Expr {
        expr: ExprModel,
    },
    Return {
        #[serde(default)]
        expr: Option<ExprModel>,
    },
    Block {
        #[serde(default)]
        statements: Vec<StatementModel>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExprModel {
    Name {
        name: String,
    },
    Number {
        value: String,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Null,
    Undefined,
    Char {
        value: char,
    },
    Regexp {
        pattern: String,
    },
    This,
    Paren {
        expr: Box<ExprModel>,
    },
    Infix {
        op: String,
        left: Box<ExprModel>,
        right: Box<ExprModel>,
    },
    Prefix {
        op: String,
        operand: Box<ExprModel>,
    },
    Postfix {
        op: String,
        operand: Box<ExprModel>,
    },
    Conditional {
        condition: Box<ExprModel>,
        then: Box<ExprModel>,
        #[serde(rename = "else")]
        otherwise: Box<ExprModel>,
    },
    Call {
        #[serde(default)]
        receiver: Option<Box<ExprModel>>,
        name: String,
        #[serde(default)]
        args: Vec<ExprModel>,
    },
    SuperCall {
        name: String,
        #[serde(default)]
        args: Vec<ExprModel>,
    },
    New {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        args: Vec<ExprModel>,
    },
    ThisCall {
        #[serde(default)]
        args: Vec<ExprModel>,
    },
    SuperConstructorCall {
        #[serde(default)]
        args: Vec<ExprModel>,
    },
    Field {
        receiver: Box<ExprModel>,
        name: String,
    },
    SuperField {
        name: String,
    },
    Index {
        array: Box<ExprModel>,
        index: Box<ExprModel>,
    },
    Assign {
        #[serde(default = "default_assign")]
        op: String,
        left: Box<ExprModel>,
        right: Box<ExprModel>,
    },
    Instanceof {
        expr: Box<ExprModel>,
        #[serde(rename = "type")]
        ty: String,
    },
}

fn default_assign() -> String {
    "=".to_string()
}
