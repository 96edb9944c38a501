//! Evaluation of XPath 1.0 binary operators over already-evaluated operand values.

use crate::ast::BinaryOperator;
use crate::datasource::DataSourceNode;
use crate::engine::XPathValue;
use crate::error::XPathError;

/// Applies a binary operator to two evaluated values, following XPath 1.0 coercion rules.
pub fn evaluate<'a, N>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    use BinaryOperator::*;
    match op {
        Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        Equals => Ok(XPathValue::Boolean(compare_eq(&left, &right, true))),
        NotEquals => Ok(XPathValue::Boolean(compare_eq(&left, &right, false))),
        LessThan => Ok(XPathValue::Boolean(compare_rel(&left, &right, |a, b| a < b))),
        LessThanOrEqual => Ok(XPathValue::Boolean(compare_rel(&left, &right, |a, b| a <= b))),
        GreaterThan => Ok(XPathValue::Boolean(compare_rel(&left, &right, |a, b| a > b))),
        GreaterThanOrEqual => {
            Ok(XPathValue::Boolean(compare_rel(&left, &right, |a, b| a >= b)))
        }
        Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        Union => match (left, right) {
            (XPathValue::NodeSet(mut a), XPathValue::NodeSet(b)) => {
                for node in b {
                    if !a.contains(&node) {
                        a.push(node);
                    }
                }
                a.sort();
                Ok(XPathValue::NodeSet(a))
            }
            _ => Err(XPathError::TypeError(
                "union operator requires two node-sets".to_string(),
            )),
        },
    }
}

/// Equality comparison per XPath 1.0 §3.4: if either side is a node-set, the comparison
/// is true if any member's string-value compares equal (as a string) to the other side.
fn compare_eq<'a, N: DataSourceNode<'a>>(
    left: &XPathValue<N>,
    right: &XPathValue<N>,
    want_eq: bool,
) -> bool {
    let result = match (left, right) {
        (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => a
            .iter()
            .any(|n| b.iter().any(|m| n.string_value() == m.string_value())),
        (XPathValue::NodeSet(nodes), other) | (other, XPathValue::NodeSet(nodes)) => {
            match other {
                XPathValue::Number(_) => nodes.iter().any(|n| {
                    n.string_value().trim().parse::<f64>().ok() == Some(other.to_number())
                }),
                XPathValue::Boolean(b) => nodes.is_empty() != *b,
                _ => nodes.iter().any(|n| n.string_value() == other.to_string()),
            }
        }
        (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
            left.to_bool() == right.to_bool()
        }
        (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
            left.to_number() == right.to_number()
        }
        _ => left.to_string() == right.to_string(),
    };
    result == want_eq
}

/// Relational comparison per XPath 1.0 §3.4: both sides coerce to numbers, except that
/// a node-set is compared member-wise against the other side's numeric value.
fn compare_rel<'a, N: DataSourceNode<'a>>(
    left: &XPathValue<N>,
    right: &XPathValue<N>,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => a.iter().any(|n| {
            b.iter().any(|m| {
                let x: f64 = n.string_value().trim().parse().unwrap_or(f64::NAN);
                let y: f64 = m.string_value().trim().parse().unwrap_or(f64::NAN);
                cmp(x, y)
            })
        }),
        (XPathValue::NodeSet(nodes), _) => nodes.iter().any(|n| {
            let x: f64 = n.string_value().trim().parse().unwrap_or(f64::NAN);
            cmp(x, right.to_number())
        }),
        (_, XPathValue::NodeSet(nodes)) => nodes.iter().any(|n| {
            let y: f64 = n.string_value().trim().parse().unwrap_or(f64::NAN);
            cmp(left.to_number(), y)
        }),
        _ => cmp(left.to_number(), right.to_number()),
    }
}
