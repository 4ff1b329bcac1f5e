//! # Presentation
//!
//! Human-readable printing of expression trees. Two forms:
//!
//! - `Display` on [`Expr`]: one line, infix for `+` and `*`, call syntax for
//!   unary operators: `((8 * 3) + 1.2)`, `sin(x)`, `e^(x)`.
//! - [`tree`]: an indented multi-line dump, one node per line.
//!
//! Symbols carry no semantic weight; nothing here is parsed back.

use std::fmt::{self, Write};

use crate::expr::Expr;
use crate::op::Op;

/// A node that can be dumped by [`tree`].
pub trait RenderNode {
    /// One-line description of this node alone.
    fn label(&self) -> String;

    /// Children, in order. Empty for leaves.
    fn child_nodes(&self) -> Vec<&Self>;
}

impl RenderNode for Expr {
    fn label(&self) -> String {
        match self {
            Expr::Literal(value) => value.to_string(),
            Expr::Calc(calc) => calc.op().symbol().to_string(),
        }
    }

    fn child_nodes(&self) -> Vec<&Self> {
        match self {
            Expr::Literal(_) => Vec::new(),
            Expr::Calc(calc) => calc.children().iter().collect(),
        }
    }
}

/// Indented dump of a tree, two spaces per level.
///
/// ```rust
/// use treegrad_core::expr::{add, literal, multiply};
/// use treegrad_core::render::tree;
///
/// let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
/// assert_eq!(tree(&y), "+\n  *\n    8\n    3\n  1.2\n");
/// ```
pub fn tree<N: RenderNode>(node: &N) -> String {
    let mut out = String::new();
    tree_indent(node, 0, &mut out);
    out
}

fn tree_indent<N: RenderNode>(node: &N, indent: usize, out: &mut String) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(&node.label());
    out.push('\n');
    for child in node.child_nodes() {
        tree_indent(child, indent + 1, out);
    }
}

/// Write `op` applied to pre-rendered operands in the one-line form.
///
/// Shared by every tree type so they all print the same way.
pub fn write_application(f: &mut impl Write, op: Op, operands: &[String]) -> fmt::Result {
    if op.is_variadic() {
        if operands.len() == 1 {
            return write!(f, "{}({})", op.symbol(), operands[0]);
        }
        let sep = format!(" {} ", op.symbol());
        write!(f, "({})", operands.join(&sep))
    } else {
        write!(f, "{}({})", op.symbol(), operands.join(", "))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Calc(calc) => {
                let operands: Vec<String> =
                    calc.children().iter().map(|c| c.to_string()).collect();
                write_application(f, calc.op(), &operands)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{add, cos, exp, literal, multiply, sin, sum};

    #[test]
    fn test_display_infix() {
        let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
        assert_eq!(y.to_string(), "((8 * 3) + 1.2)");
    }

    #[test]
    fn test_display_unary() {
        assert_eq!(sin(literal(0.5)).to_string(), "sin(0.5)");
        assert_eq!(cos(literal(0.0)).to_string(), "cos(0)");
        assert_eq!(exp(literal(1.0)).to_string(), "e^(1)");
    }

    #[test]
    fn test_display_variadic() {
        let e = sum(vec![literal(1.0), literal(2.0), literal(3.0)]).unwrap();
        assert_eq!(e.to_string(), "(1 + 2 + 3)");
        let single = sum(vec![literal(4.0)]).unwrap();
        assert_eq!(single.to_string(), "+(4)");
    }

    #[test]
    fn test_tree_dump() {
        let e = sin(add(literal(1.0), literal(2.0)));
        let dump = tree(&e);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines, vec!["sin", "  +", "    1", "    2"]);
    }
}
