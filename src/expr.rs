//! Scalar expression tree
//!
//! The compiler consumes an already-typed expression tree: constants at the
//! leaves and operator calls at the interior nodes. Nodes are immutable and
//! read-only to the generators; the tree is owned by whoever built it.

use std::fmt;

use crate::types::{SqlType, Value};

// ============================================================================
// Operator Signatures
// ============================================================================

/// Registry lookup key for an operator generator: name plus fixed arity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Operator name, stored lowercase
    name: String,
    /// Number of arguments the operator accepts
    arity: usize,
}

impl Signature {
    /// Create a signature; the name is normalized to lowercase
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            arity,
        }
    }

    /// Get the operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the operator arity
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

// ============================================================================
// Expression Nodes
// ============================================================================

/// A typed constant leaf
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// The literal value; `Value::Null` represents a typed NULL
    pub value: Value,
    /// Declared type of the constant
    pub ty: SqlType,
}

/// A reference to a caller-bound input value (one per row/evaluation)
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Binding slot index
    pub index: usize,
    /// Declared type of the bound value
    pub ty: SqlType,
}

/// An operator invocation over child expressions
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Which generator handles this node
    pub signature: Signature,
    /// Declared result type
    pub return_type: SqlType,
    /// Fixed-order argument expressions
    pub args: Vec<Expr>,
}

/// A scalar expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Typed literal
    Constant(Constant),
    /// Caller-bound input value
    Parameter(Parameter),
    /// Operator call dispatched through the generator registry
    Call(CallExpr),
}

impl Expr {
    /// Declared type of this expression
    pub fn sql_type(&self) -> SqlType {
        match self {
            Expr::Constant(c) => c.ty,
            Expr::Parameter(p) => p.ty,
            Expr::Call(c) => c.return_type,
        }
    }

    /// Build a typed constant
    pub fn constant(value: Value, ty: SqlType) -> Self {
        Expr::Constant(Constant { value, ty })
    }

    /// Build a boolean literal
    pub fn boolean(b: bool) -> Self {
        Self::constant(Value::Boolean(b), SqlType::Boolean)
    }

    /// Build a typed NULL literal
    pub fn null_of(ty: SqlType) -> Self {
        Self::constant(Value::Null, ty)
    }

    /// Build a parameter reference
    pub fn param(index: usize, ty: SqlType) -> Self {
        Expr::Parameter(Parameter { index, ty })
    }

    /// Build an operator call
    pub fn call(name: &str, return_type: SqlType, args: Vec<Expr>) -> Self {
        let arity = args.len();
        Expr::Call(CallExpr {
            signature: Signature::new(name, arity),
            return_type,
            args,
        })
    }

    /// Build `left AND right`
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::call("and", SqlType::Boolean, vec![left, right])
    }

    /// Build `left OR right`
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::call("or", SqlType::Boolean, vec![left, right])
    }

    /// Build `NOT operand`
    pub fn not(operand: Expr) -> Self {
        Self::call("not", SqlType::Boolean, vec![operand])
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{}", c.value),
            Expr::Parameter(p) => write!(f, "?{}", p.index),
            Expr::Call(c) => {
                write!(f, "{}(", c.signature.name())?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_normalizes_name() {
        let sig = Signature::new("AND", 2);
        assert_eq!(sig.name(), "and");
        assert_eq!(sig.arity(), 2);
        assert_eq!(format!("{}", sig), "and/2");
    }

    #[test]
    fn test_signature_equality() {
        assert_eq!(Signature::new("And", 2), Signature::new("and", 2));
        assert_ne!(Signature::new("and", 2), Signature::new("and", 3));
        assert_ne!(Signature::new("and", 2), Signature::new("or", 2));
    }

    #[test]
    fn test_expr_builders() {
        let expr = Expr::and(Expr::boolean(true), Expr::null_of(SqlType::Boolean));
        assert_eq!(expr.sql_type(), SqlType::Boolean);

        match &expr {
            Expr::Call(call) => {
                assert_eq!(call.signature, Signature::new("and", 2));
                assert_eq!(call.args.len(), 2);
                assert_eq!(call.args[0], Expr::boolean(true));
            }
            _ => panic!("expected call expression"),
        }
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::or(Expr::boolean(false), Expr::not(Expr::boolean(true)));
        assert_eq!(format!("{}", expr), "or(false, not(true))");

        let expr = Expr::and(
            Expr::param(0, SqlType::Boolean),
            Expr::param(1, SqlType::Boolean),
        );
        assert_eq!(format!("{}", expr), "and(?0, ?1)");
    }

    #[test]
    fn test_param_type() {
        assert_eq!(Expr::param(2, SqlType::BigInt).sql_type(), SqlType::BigInt);
    }
}
