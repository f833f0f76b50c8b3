//! Expression typing, constant folding and implicit conversions.

use super::{Analyzer, ImplicitConversion};
use crate::constants::{fold_infix, fold_prefix, parse_number};
use crate::environment::LookupEnvironment;
use crate::error::AnalyzerError;
use crate::raw::{BaseType, BindingId, Constant, RawBinding};
use jsbind_ast::{AssignmentOperator, InfixOperator, NodeIndex, NodeKind, PrefixOperator};
use jsbind_common::limits::MAX_EXPRESSION_DEPTH;
use tracing::trace;

type Typed = (BindingId, Option<Constant>);

impl Analyzer<'_> {
    /// Type an expression, recording its type and constant value. Returns the
    /// type (`NONE` when it cannot be determined).
    pub(super) fn expression(&mut self, node: NodeIndex) -> Result<BindingId, AnalyzerError> {
        let Some(kind) = self.kind(node)? else {
            return Ok(BindingId::NONE);
        };
        if self.depth >= MAX_EXPRESSION_DEPTH {
            trace!(node = node.0, "expression nesting too deep");
            return Ok(BindingId::NONE);
        }
        self.depth += 1;
        let result = self.expression_kind(node, kind);
        self.depth -= 1;
        let (ty, constant) = result?;
        let record = self.unit.node_mut(node);
        record.resolved_type = ty;
        record.constant = constant;
        Ok(ty)
    }

    pub(super) fn constant_of(&self, node: NodeIndex) -> Option<Constant> {
        self.unit.node(node).and_then(|record| record.constant.clone())
    }

    /// A well-known type the analyzer cannot work without.
    pub(super) fn required_type(&mut self, name: &str) -> Result<BindingId, AnalyzerError> {
        self.env
            .well_known_type(name)
            .ok_or_else(|| AnalyzerError::Abort {
                file_name: self.file_name.clone(),
                missing: name.to_string(),
            })
    }

    fn base(&self, base: BaseType) -> BindingId {
        self.env.base_type(base)
    }

    fn object(&mut self) -> BindingId {
        self.env.object_type().unwrap_or(BindingId::NONE)
    }

    fn expression_kind(&mut self, node: NodeIndex, kind: NodeKind) -> Result<Typed, AnalyzerError> {
        Ok(match kind {
            NodeKind::NumberLiteral { token } => {
                let constant = parse_number(self.tree.text(token));
                let base = match constant {
                    Some(Constant::Int(_)) => BaseType::Int,
                    Some(Constant::Long(_)) => BaseType::Long,
                    _ => BaseType::Double,
                };
                (self.base(base), constant)
            }
            NodeKind::StringLiteral { value } => {
                let string = self.required_type("String")?;
                let value = self.tree.interner.resolve_shared(value);
                (string, Some(Constant::String(value)))
            }
            NodeKind::BooleanLiteral { value } => {
                (self.base(BaseType::Boolean), Some(Constant::Boolean(value)))
            }
            NodeKind::CharacterLiteral { value } => {
                (self.base(BaseType::Char), Some(Constant::Char(value)))
            }
            NodeKind::NullLiteral => (self.base(BaseType::Null), None),
            NodeKind::UndefinedLiteral => (self.base(BaseType::Undefined), None),
            NodeKind::RegularExpressionLiteral { .. } => (
                self.env.well_known_type("RegExp").unwrap_or(BindingId::NONE),
                None,
            ),
            NodeKind::ThisExpression => (self.context.enclosing_type, None),
            NodeKind::ParenthesizedExpression { expression } => {
                let ty = self.expression(expression)?;
                (ty, self.constant_of(expression))
            }
            NodeKind::InfixExpression {
                operator,
                left,
                right,
            } => self.infix(operator, left, right)?,
            NodeKind::PrefixExpression { operator, operand } => self.prefix(operator, operand)?,
            NodeKind::PostfixExpression { operand, .. } => (self.expression(operand)?, None),
            NodeKind::ConditionalExpression {
                condition,
                then_expression,
                else_expression,
            } => {
                self.expression(condition)?;
                let boolean = self.base(BaseType::Boolean);
                self.convert(condition, boolean);
                let then_type = self.expression(then_expression)?;
                let else_type = self.expression(else_expression)?;
                let constant = match self.constant_of(condition) {
                    Some(Constant::Boolean(true)) => self.constant_of(then_expression),
                    Some(Constant::Boolean(false)) => self.constant_of(else_expression),
                    _ => None,
                };
                (self.merge(then_type, else_type), constant)
            }
            NodeKind::ArrayAccess { array, index } => {
                let array_type = self.expression(array)?;
                self.expression(index)?;
                (self.component_type(array_type), None)
            }
            NodeKind::Assignment {
                operator,
                left,
                right,
            } => {
                let left_type = self.expression(left)?;
                self.expression(right)?;
                if operator == AssignmentOperator::Assign {
                    self.convert(right, left_type);
                }
                (left_type, None)
            }
            NodeKind::InstanceofExpression { expression, ty } => {
                self.expression(expression)?;
                self.resolve_type_node(ty)?;
                (self.base(BaseType::Boolean), None)
            }
            NodeKind::FunctionInvocation {
                receiver,
                name,
                arguments,
            } => (self.invocation(node, receiver, name, &arguments)?, None),
            NodeKind::SuperMethodInvocation { name, arguments } => {
                (self.super_invocation(node, name, &arguments)?, None)
            }
            NodeKind::ClassInstanceCreation { ty, arguments } => {
                (self.instance_creation(node, ty, &arguments)?, None)
            }
            NodeKind::ConstructorInvocation { arguments } => {
                let owner = self.context.enclosing_type;
                self.explicit_constructor_call(node, owner, &arguments)?;
                (self.base(BaseType::Void), None)
            }
            NodeKind::SuperConstructorInvocation { arguments } => {
                let owner = self.superclass_of(self.context.enclosing_type);
                self.explicit_constructor_call(node, owner, &arguments)?;
                (self.base(BaseType::Void), None)
            }
            NodeKind::FieldAccess { receiver, name } => self.field_access(node, receiver, name)?,
            NodeKind::SuperFieldAccess { name } => self.super_field_access(node, name)?,
            NodeKind::SimpleName { .. } | NodeKind::QualifiedName { .. } => {
                self.name_expression(node)?
            }
            other => {
                trace!(kind = other.type_name(), "not an expression");
                (BindingId::NONE, None)
            }
        })
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn infix(
        &mut self,
        operator: InfixOperator,
        left: NodeIndex,
        right: NodeIndex,
    ) -> Result<Typed, AnalyzerError> {
        use InfixOperator as Op;

        let left_type = self.expression(left)?;
        let right_type = self.expression(right)?;
        let constant = match (self.constant_of(left), self.constant_of(right)) {
            (Some(l), Some(r)) => fold_infix(operator, &l, &r),
            _ => None,
        };
        if let Some(folded) = &constant {
            let ty = self.constant_type(folded)?;
            return Ok((ty, constant));
        }

        let string = self.env.well_known_type("String");
        if operator == Op::Plus && string.is_some() && (Some(left_type) == string || Some(right_type) == string) {
            return Ok((self.required_type("String")?, None));
        }
        if operator.is_boolean_valued() {
            return Ok((self.base(BaseType::Boolean), None));
        }
        let boolean = self.base(BaseType::Boolean);
        if matches!(operator, Op::And | Op::Or | Op::Xor) && left_type == boolean && right_type == boolean {
            return Ok((boolean, None));
        }

        let (Some(l), Some(r)) = (
            self.numeric_operand(left, left_type),
            self.numeric_operand(right, right_type),
        ) else {
            return Ok((self.object(), None));
        };
        let base = match operator {
            Op::Divide => BaseType::Double,
            Op::LeftShift | Op::RightShift => promote(l, BaseType::Int),
            _ => promote(l, r),
        };
        Ok((self.base(base), None))
    }

    fn prefix(&mut self, operator: PrefixOperator, operand: NodeIndex) -> Result<Typed, AnalyzerError> {
        let operand_type = self.expression(operand)?;
        let constant = self
            .constant_of(operand)
            .and_then(|value| fold_prefix(operator, &value));
        if let Some(folded) = &constant {
            let ty = self.constant_type(folded)?;
            return Ok((ty, constant));
        }
        let ty = match operator {
            PrefixOperator::Not => self.base(BaseType::Boolean),
            PrefixOperator::TypeOf => self.required_type("String")?,
            PrefixOperator::Increment | PrefixOperator::Decrement => operand_type,
            PrefixOperator::Plus | PrefixOperator::Minus | PrefixOperator::Complement => {
                match self.numeric_operand(operand, operand_type) {
                    Some(base) if operator == PrefixOperator::Complement => {
                        match promote(base, BaseType::Int) {
                            BaseType::Int => self.base(BaseType::Int),
                            _ => self.base(BaseType::Long),
                        }
                    }
                    Some(base) => self.base(promote(base, BaseType::Int)),
                    None => self.object(),
                }
            }
        };
        Ok((ty, None))
    }

    /// Numeric view of an operand, unboxing a `Number`.
    fn numeric_operand(&mut self, node: NodeIndex, ty: BindingId) -> Option<BaseType> {
        let base = match self.env.store.get(ty) {
            Some(RawBinding::Base(base)) => Some(*base),
            Some(RawBinding::Reference(_)) => None,
            _ => return None,
        };
        match base {
            Some(base) if base.is_numeric() => Some(base),
            None if self.env.well_known_type("Number") == Some(ty) => {
                self.unit.node_mut(node).conversion |= ImplicitConversion::UNBOXING;
                Some(BaseType::Double)
            }
            _ => None,
        }
    }

    fn constant_type(&mut self, constant: &Constant) -> Result<BindingId, AnalyzerError> {
        Ok(match constant {
            Constant::Int(_) => self.base(BaseType::Int),
            Constant::Long(_) => self.base(BaseType::Long),
            Constant::Short(_) => self.base(BaseType::Short),
            Constant::Char(_) => self.base(BaseType::Char),
            Constant::Float(_) => self.base(BaseType::Float),
            Constant::Double(_) => self.base(BaseType::Double),
            Constant::Boolean(_) => self.base(BaseType::Boolean),
            Constant::String(_) => self.required_type("String")?,
        })
    }

    /// Type of a conditional whose branches have types `a` and `b`.
    fn merge(&mut self, a: BindingId, b: BindingId) -> BindingId {
        if a == b || b.is_none() {
            return a;
        }
        if a.is_none() {
            return b;
        }
        let nullish = |env: &LookupEnvironment, ty: BindingId| {
            matches!(env.store.get(ty), Some(RawBinding::Base(base)) if base.is_nullish())
        };
        if nullish(&*self.env, a) {
            return b;
        }
        if nullish(&*self.env, b) {
            return a;
        }
        if self.env.is_compatible_with(a, b) {
            return b;
        }
        if self.env.is_compatible_with(b, a) {
            return a;
        }
        self.object()
    }

    fn component_type(&mut self, array: BindingId) -> BindingId {
        match self.env.store.array(array) {
            Some(data) => {
                let (leaf, dimensions) = (data.leaf, data.dimensions);
                self.env.create_array_type(leaf, dimensions - 1)
            }
            None => self.object(),
        }
    }

    pub(super) fn superclass_of(&self, ty: BindingId) -> BindingId {
        self.env
            .store
            .reference(ty)
            .map_or(BindingId::NONE, |data| data.superclass)
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Record the boxing or unboxing needed to use `node` where `expected`
    /// is required.
    pub(super) fn convert(&mut self, node: NodeIndex, expected: BindingId) {
        let actual = self.unit.resolved_type(node);
        if actual.is_none() || expected.is_none() || actual == expected {
            return;
        }
        if self.env.is_compatible_with(actual, expected) {
            return;
        }
        if self.env.is_boxing_compatible(actual, expected) {
            let conversion = if matches!(self.env.store.get(actual), Some(RawBinding::Base(_))) {
                ImplicitConversion::BOXING
            } else {
                ImplicitConversion::UNBOXING
            };
            self.unit.node_mut(node).conversion |= conversion;
        }
    }

    pub(super) fn convert_arguments(&mut self, arguments: &[NodeIndex], method: BindingId) {
        let parameters = match self.env.store.method(method) {
            Some(data) if data.is_valid() => data.parameters.clone(),
            _ => return,
        };
        for (argument, parameter) in arguments.iter().zip(parameters) {
            self.convert(*argument, parameter);
        }
    }

    pub(super) fn arguments(&mut self, arguments: &[NodeIndex]) -> Result<Vec<BindingId>, AnalyzerError> {
        let mut types = Vec::with_capacity(arguments.len());
        for argument in arguments {
            types.push(self.expression(*argument)?);
        }
        Ok(types)
    }
}

/// Binary numeric promotion.
fn promote(a: BaseType, b: BaseType) -> BaseType {
    fn rank(base: BaseType) -> u8 {
        match base {
            BaseType::Double => 4,
            BaseType::Float => 3,
            BaseType::Long => 2,
            _ => 1,
        }
    }
    match rank(a).max(rank(b)) {
        4 => BaseType::Double,
        3 => BaseType::Float,
        2 => BaseType::Long,
        _ => BaseType::Int,
    }
}
