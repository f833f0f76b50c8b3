//! Compile-time constant folding.

use crate::raw::Constant;
use jsbind_ast::{InfixOperator, NodeIndex, NodeKind, PrefixOperator, SyntaxTree};
use std::sync::Arc;

/// Read a number literal token.
pub fn parse_number(text: &str) -> Option<Constant> {
    let text = text.trim();
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        let value = i64::from_str_radix(hex, 16).ok()?;
        return Some(narrow_integral(value));
    }
    if text.contains(['.', 'e', 'E']) {
        return text.parse::<f64>().ok().map(Constant::Double);
    }
    match text.parse::<i64>() {
        Ok(value) => Some(narrow_integral(value)),
        Err(_) => text.parse::<f64>().ok().map(Constant::Double),
    }
}

fn narrow_integral(value: i64) -> Constant {
    match i32::try_from(value) {
        Ok(v) => Constant::Int(v),
        Err(_) => Constant::Long(value),
    }
}

/// Constant value of a literal (or a negated number literal).
pub fn literal_constant(tree: &SyntaxTree, index: NodeIndex) -> Option<Constant> {
    match tree.kind(index)? {
        NodeKind::NumberLiteral { token } => parse_number(tree.text(*token)),
        NodeKind::StringLiteral { value } => Some(Constant::String(tree.interner.resolve_shared(*value))),
        NodeKind::BooleanLiteral { value } => Some(Constant::Boolean(*value)),
        NodeKind::CharacterLiteral { value } => Some(Constant::Char(*value)),
        NodeKind::ParenthesizedExpression { expression } => literal_constant(tree, *expression),
        NodeKind::PrefixExpression { operator, operand } => {
            fold_prefix(*operator, &literal_constant(tree, *operand)?)
        }
        _ => None,
    }
}

pub fn fold_prefix(operator: PrefixOperator, operand: &Constant) -> Option<Constant> {
    match operator {
        PrefixOperator::Plus => operand.as_f64().map(|_| operand.clone()),
        PrefixOperator::Minus => match operand {
            Constant::Int(v) => Some(v.checked_neg().map_or(Constant::Long(-i64::from(*v)), Constant::Int)),
            Constant::Long(v) => v.checked_neg().map(Constant::Long),
            Constant::Short(v) => Some(Constant::Int(-i32::from(*v))),
            Constant::Float(v) => Some(Constant::Float(-v)),
            Constant::Double(v) => Some(Constant::Double(-v)),
            Constant::Char(_) | Constant::Boolean(_) | Constant::String(_) => None,
        },
        PrefixOperator::Not => match operand {
            Constant::Boolean(v) => Some(Constant::Boolean(!v)),
            _ => None,
        },
        PrefixOperator::Complement => operand.as_i64().map(|v| narrow_integral(!v)),
        PrefixOperator::Increment | PrefixOperator::Decrement | PrefixOperator::TypeOf => None,
    }
}

pub fn fold_infix(operator: InfixOperator, left: &Constant, right: &Constant) -> Option<Constant> {
    use InfixOperator as Op;

    if operator == Op::Plus
        && (matches!(left, Constant::String(_)) || matches!(right, Constant::String(_)))
    {
        return Some(Constant::String(Arc::from(format!("{left}{right}"))));
    }

    match (left, right) {
        (Constant::Boolean(l), Constant::Boolean(r)) => {
            return match operator {
                Op::ConditionalAnd | Op::And => Some(Constant::Boolean(*l && *r)),
                Op::ConditionalOr | Op::Or => Some(Constant::Boolean(*l || *r)),
                Op::Xor => Some(Constant::Boolean(l ^ r)),
                Op::Equals | Op::StrictEquals => Some(Constant::Boolean(l == r)),
                Op::NotEquals | Op::StrictNotEquals => Some(Constant::Boolean(l != r)),
                _ => None,
            };
        }
        (Constant::String(l), Constant::String(r)) => {
            return match operator {
                Op::Equals | Op::StrictEquals => Some(Constant::Boolean(l == r)),
                Op::NotEquals | Op::StrictNotEquals => Some(Constant::Boolean(l != r)),
                _ => None,
            };
        }
        _ => {}
    }

    if left.is_integral() && right.is_integral() {
        let (l, r) = (left.as_i64()?, right.as_i64()?);
        let value = match operator {
            Op::Plus => l.checked_add(r)?,
            Op::Minus => l.checked_sub(r)?,
            Op::Times => l.checked_mul(r)?,
            Op::Remainder => l.checked_rem(r)?,
            Op::And => l & r,
            Op::Or => l | r,
            Op::Xor => l ^ r,
            Op::LeftShift => l.checked_shl(u32::try_from(r).ok()?)?,
            Op::RightShift => l.checked_shr(u32::try_from(r).ok()?)?,
            Op::Divide => {
                if r == 0 {
                    return None;
                }
                return Some(Constant::Double(l as f64 / r as f64));
            }
            _ => return compare(operator, l as f64, r as f64),
        };
        return Some(narrow_integral(value));
    }

    let (l, r) = (left.as_f64()?, right.as_f64()?);
    let value = match operator {
        Op::Plus => l + r,
        Op::Minus => l - r,
        Op::Times => l * r,
        Op::Divide => l / r,
        Op::Remainder => l % r,
        _ => return compare(operator, l, r),
    };
    Some(Constant::Double(value))
}

fn compare(operator: InfixOperator, l: f64, r: f64) -> Option<Constant> {
    use InfixOperator as Op;
    let value = match operator {
        Op::Less => l < r,
        Op::Greater => l > r,
        Op::LessEquals => l <= r,
        Op::GreaterEquals => l >= r,
        Op::Equals | Op::StrictEquals => l == r,
        Op::NotEquals | Op::StrictNotEquals => l != r,
        _ => return None,
    };
    Some(Constant::Boolean(value))
}

#[cfg(test)]
#[path = "../tests/constants_tests.rs"]
mod constants_tests;
