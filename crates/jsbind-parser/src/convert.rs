//! Unit model to syntax tree conversion.

use crate::frontend::{DeferredBody, ParseError, ParseMode};
use crate::model::{
    DocRefModel, ExprModel, FieldModel, FunctionModel, StatementModel, TypeModel, UnitModel,
};
use jsbind_ast::{
    AssignmentOperator, InfixOperator, NodeIndex, NodeKind, PostfixOperator, PrefixOperator,
    TreeBuilder,
};
use jsbind_common::Modifiers;

pub(crate) struct Converter<'a> {
    pub builder: &'a mut TreeBuilder,
    pub deferred: &'a mut Vec<DeferredBody>,
    pub mode: ParseMode,
}

impl Converter<'_> {
    fn error(&self, message: String) -> ParseError {
        ParseError {
            file_name: self.builder.file_name().to_string(),
            message,
        }
    }

    fn modifiers(&self, words: &[String]) -> Result<Modifiers, ParseError> {
        let mut modifiers = Modifiers::empty();
        for word in words {
            match Modifiers::from_keyword(word) {
                Some(bit) => modifiers |= bit,
                None => return Err(self.error(format!("unknown modifier `{word}`"))),
            }
        }
        Ok(modifiers)
    }

    fn optional_type(&mut self, text: Option<&str>, dims: u32) -> NodeIndex {
        match text {
            Some(text) => self.builder.type_from_text(text),
            None if dims > 0 => {
                let element = self.builder.type_from_text("Object");
                self.builder.array_type(element, dims)
            }
            None => NodeIndex::NONE,
        }
    }

    /// Convert a whole unit. Returns `(package, imports, types, statements)`.
    pub fn unit(
        &mut self,
        unit: &UnitModel,
    ) -> Result<(NodeIndex, Vec<NodeIndex>, Vec<NodeIndex>, Vec<NodeIndex>), ParseError> {
        let package = match &unit.package {
            Some(name) if !name.is_empty() => {
                let name = self.builder.name(name);
                self.builder.add(NodeKind::PackageDeclaration { name })
            }
            _ => NodeIndex::NONE,
        };
        let mut imports = Vec::with_capacity(unit.imports.len());
        for import in &unit.imports {
            let name = self.builder.name(&import.name);
            imports.push(self.builder.add(NodeKind::ImportDeclaration {
                name,
                on_demand: import.on_demand,
            }));
        }
        let mut types = Vec::with_capacity(unit.types.len());
        for ty in &unit.types {
            types.push(self.type_declaration(ty)?);
        }
        let mut statements = Vec::new();
        for function in &unit.functions {
            statements.push(self.function(function)?);
        }
        for statement in &unit.statements {
            statements.push(self.statement(statement)?);
        }
        Ok((package, imports, types, statements))
    }

    fn type_declaration(&mut self, ty: &TypeModel) -> Result<NodeIndex, ParseError> {
        let modifiers = self.modifiers(&ty.modifiers)?;
        let doc = self.doc(&ty.doc)?;
        let name = self.builder.simple_name(&ty.name);
        let superclass = match &ty.superclass {
            Some(text) => self.builder.type_from_text(text),
            None => NodeIndex::NONE,
        };
        let mut body = Vec::new();
        for field in &ty.fields {
            body.push(self.field(field)?);
        }
        for method in &ty.methods {
            body.push(self.function(method)?);
        }
        for member in &ty.types {
            body.push(self.type_declaration(member)?);
        }
        Ok(self.builder.add(NodeKind::TypeDeclaration {
            modifiers,
            name,
            superclass,
            doc,
            body,
        }))
    }

    fn field(&mut self, field: &FieldModel) -> Result<NodeIndex, ParseError> {
        let modifiers = self.modifiers(&field.modifiers)?;
        let ty = self.optional_type(field.ty.as_deref(), 0);
        let initializer = match &field.init {
            Some(init) => self.expression(init)?,
            None => NodeIndex::NONE,
        };
        let fragment = self.builder.fragment(&field.name, field.dims, initializer);
        Ok(self.builder.add(NodeKind::FieldDeclaration {
            modifiers,
            ty,
            fragments: vec![fragment],
        }))
    }

    fn function(&mut self, function: &FunctionModel) -> Result<NodeIndex, ParseError> {
        let modifiers = self.modifiers(&function.modifiers)?;
        let doc = self.doc(&function.doc)?;
        let return_type = self.optional_type(function.return_type.as_deref(), 0);
        let name = self.builder.simple_name(&function.name);
        let mut parameters = Vec::with_capacity(function.params.len());
        for param in &function.params {
            let ty = self.optional_type(param.ty.as_deref(), 0);
            let name = self.builder.simple_name(&param.name);
            parameters.push(self.builder.add(NodeKind::SingleVariableDeclaration {
                ty,
                name,
                extra_dimensions: param.dims,
                initializer: NodeIndex::NONE,
            }));
        }
        let (body, deferred) = match (&function.body, self.mode) {
            (None, _) => (NodeIndex::NONE, None),
            (Some(raw), ParseMode::Diet) => (NodeIndex::NONE, Some(raw.clone())),
            (Some(raw), ParseMode::Full) => (self.body(raw)?, None),
        };
        let index = self.builder.add(NodeKind::FunctionDeclaration {
            modifiers,
            is_constructor: function.constructor,
            name,
            return_type,
            parameters,
            extra_dimensions: 0,
            doc,
            body,
        });
        if let Some(raw) = deferred {
            self.deferred.push(DeferredBody {
                function: index,
                body: raw,
            });
        }
        Ok(index)
    }

    /// Convert raw body JSON (an array of statements) into a block.
    pub fn body(&mut self, raw: &serde_json::Value) -> Result<NodeIndex, ParseError> {
        let statements: Vec<StatementModel> = serde_json::from_value(raw.clone())
            .map_err(|err| self.error(format!("invalid function body: {err}")))?;
        let mut converted = Vec::with_capacity(statements.len());
        for statement in &statements {
            converted.push(self.statement(statement)?);
        }
        Ok(self.builder.block(converted))
    }

    fn statement(&mut self, statement: &StatementModel) -> Result<NodeIndex, ParseError> {
        Ok(match statement {
            StatementModel::Var {
                ty,
                name,
                dims,
                init,
            } => {
                let ty = self.optional_type(ty.as_deref(), 0);
                let initializer = match init {
                    Some(init) => self.expression(init)?,
                    None => NodeIndex::NONE,
                };
                let fragment = self.builder.fragment(name, *dims, initializer);
                self.builder.add(NodeKind::VariableDeclarationStatement {
                    modifiers: Modifiers::empty(),
                    ty,
                    fragments: vec![fragment],
                })
            }
            StatementModel::Expr { expr } => {
                let expression = self.expression(expr)?;
                self.builder.expression_statement(expression)
            }
            StatementModel::Return { expr } => {
                let expression = match expr {
                    Some(expr) => self.expression(expr)?,
                    None => NodeIndex::NONE,
                };
                self.builder.add(NodeKind::ReturnStatement { expression })
            }
            StatementModel::Block { statements } => {
                let mut converted = Vec::with_capacity(statements.len());
                for statement in statements {
                    converted.push(self.statement(statement)?);
                }
                self.builder.block(converted)
            }
        })
    }

    fn arguments(&mut self, args: &[ExprModel]) -> Result<Vec<NodeIndex>, ParseError> {
        args.iter().map(|arg| self.expression(arg)).collect()
    }

    fn expression(&mut self, expr: &ExprModel) -> Result<NodeIndex, ParseError> {
        let kind = match expr {
            ExprModel::Name { name } => return Ok(self.builder.name(name)),
            ExprModel::Number { value } => NodeKind::NumberLiteral {
                token: self.builder.interner_mut().intern(value),
            },
            ExprModel::String { value } => NodeKind::StringLiteral {
                value: self.builder.interner_mut().intern(value),
            },
            ExprModel::Boolean { value } => NodeKind::BooleanLiteral { value: *value },
            ExprModel::Null => NodeKind::NullLiteral,
            ExprModel::Undefined => NodeKind::UndefinedLiteral,
            ExprModel::Char { value } => NodeKind::CharacterLiteral { value: *value },
            ExprModel::Regexp { pattern } => NodeKind::RegularExpressionLiteral {
                pattern: self.builder.interner_mut().intern(pattern),
            },
            ExprModel::This => NodeKind::ThisExpression,
            ExprModel::Paren { expr } => NodeKind::ParenthesizedExpression {
                expression: self.expression(expr)?,
            },
            ExprModel::Infix { op, left, right } => {
                let operator = InfixOperator::from_token(op)
                    .ok_or_else(|| self.error(format!("unknown infix operator `{op}`")))?;
                NodeKind::InfixExpression {
                    operator,
                    left: self.expression(left)?,
                    right: self.expression(right)?,
                }
            }
            ExprModel::Prefix { op, operand } => {
                let operator = PrefixOperator::from_token(op)
                    .ok_or_else(|| self.error(format!("unknown prefix operator `{op}`")))?;
                NodeKind::PrefixExpression {
                    operator,
                    operand: self.expression(operand)?,
                }
            }
            ExprModel::Postfix { op, operand } => {
                let operator = PostfixOperator::from_token(op)
                    .ok_or_else(|| self.error(format!("unknown postfix operator `{op}`")))?;
                NodeKind::PostfixExpression {
                    operator,
                    operand: self.expression(operand)?,
                }
            }
            ExprModel::Conditional {
                condition,
                then,
                otherwise,
            } => NodeKind::ConditionalExpression {
                condition: self.expression(condition)?,
                then_expression: self.expression(then)?,
                else_expression: self.expression(otherwise)?,
            },
            ExprModel::Call {
                receiver,
                name,
                args,
            } => {
                let receiver = match receiver {
                    Some(receiver) => self.expression(receiver)?,
                    None => NodeIndex::NONE,
                };
                let name = self.builder.simple_name(name);
                NodeKind::FunctionInvocation {
                    receiver,
                    name,
                    arguments: self.arguments(args)?,
                }
            }
            ExprModel::SuperCall { name, args } => {
                let name = self.builder.simple_name(name);
                NodeKind::SuperMethodInvocation {
                    name,
                    arguments: self.arguments(args)?,
                }
            }
            ExprModel::New { ty, args } => {
                let ty = self.builder.type_from_text(ty);
                NodeKind::ClassInstanceCreation {
                    ty,
                    arguments: self.arguments(args)?,
                }
            }
            ExprModel::ThisCall { args } => NodeKind::ConstructorInvocation {
                arguments: self.arguments(args)?,
            },
            ExprModel::SuperConstructorCall { args } => NodeKind::SuperConstructorInvocation {
                arguments: self.arguments(args)?,
            },
            ExprModel::Field { receiver, name } => {
                let receiver = self.expression(receiver)?;
                let name = self.builder.simple_name(name);
                NodeKind::FieldAccess { receiver, name }
            }
            ExprModel::SuperField { name } => NodeKind::SuperFieldAccess {
                name: self.builder.simple_name(name),
            },
            ExprModel::Index { array, index } => NodeKind::ArrayAccess {
                array: self.expression(array)?,
                index: self.expression(index)?,
            },
            ExprModel::Assign { op, left, right } => {
                let operator = AssignmentOperator::from_token(op)
                    .ok_or_else(|| self.error(format!("unknown assignment operator `{op}`")))?;
                NodeKind::Assignment {
                    operator,
                    left: self.expression(left)?,
                    right: self.expression(right)?,
                }
            }
            ExprModel::Instanceof { expr, ty } => {
                let expression = self.expression(expr)?;
                let ty = self.builder.type_from_text(ty);
                NodeKind::InstanceofExpression { expression, ty }
            }
        };
        Ok(self.builder.add(kind))
    }

    fn doc(&mut self, refs: &[DocRefModel]) -> Result<NodeIndex, ParseError> {
        if refs.is_empty() {
            return Ok(NodeIndex::NONE);
        }
        let mut tags = Vec::with_capacity(refs.len());
        for doc_ref in refs {
            let tag = match doc_ref {
                DocRefModel::MemberRef { qualifier, name } => {
                    let qualifier = match qualifier {
                        Some(q) => self.builder.name(q),
                        None => NodeIndex::NONE,
                    };
                    let name = self.builder.simple_name(name);
                    NodeKind::MemberRef { qualifier, name }
                }
                DocRefModel::FunctionRef {
                    qualifier,
                    name,
                    params,
                } => {
                    let qualifier = match qualifier {
                        Some(q) => self.builder.name(q),
                        None => NodeIndex::NONE,
                    };
                    let name = self.builder.simple_name(name);
                    let parameters = params
                        .iter()
                        .map(|p| self.builder.type_from_text(p))
                        .collect();
                    NodeKind::FunctionRef {
                        qualifier,
                        name,
                        parameters,
                    }
                }
            };
            tags.push(self.builder.add(tag));
        }
        Ok(self.builder.add(NodeKind::JsDoc { tags }))
    }
}
