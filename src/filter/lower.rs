//! Lowering of filter trees into polars expressions.
//!
//! Every node is lowered to a `Float64` expression so that numeric and
//! logical sub-expressions mix freely, as they do in C.

use super::{BinaryOp, FilterExpr, Function, UnaryOp, bad_index};
use crate::error::Result;
use polars::prelude::{DataType, Expr, col, lit};

fn as_float(e: Expr) -> Expr {
    e.cast(DataType::Float64)
}

fn truthy(e: Expr) -> Expr {
    e.neq(lit(0.0))
}

impl FilterExpr {
    /// Boolean polars predicate selecting the rows this filter accepts
    pub fn to_polars(&self) -> Result<Expr> {
        Ok(truthy(self.lower()?))
    }

    fn lower(&self) -> Result<Expr> {
        Ok(match self {
            FilterExpr::Number(v) => lit(*v),
            FilterExpr::Field(name) => as_float(col(name.as_str())),
            FilterExpr::Index(name, 0) => as_float(col(name.as_str())),
            FilterExpr::Index(name, i) => return Err(bad_index(name, *i)),
            FilterExpr::Unary(UnaryOp::Neg, inner) => lit(0.0) - inner.lower()?,
            FilterExpr::Unary(UnaryOp::Not, inner) => as_float(inner.lower()?.eq(lit(0.0))),
            FilterExpr::Binary(op, lhs, rhs) => {
                let a = lhs.lower()?;
                let b = rhs.lower()?;
                match op {
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Lt => as_float(a.lt(b)),
                    BinaryOp::Le => as_float(a.lt_eq(b)),
                    BinaryOp::Gt => as_float(a.gt(b)),
                    BinaryOp::Ge => as_float(a.gt_eq(b)),
                    BinaryOp::Eq => as_float(a.eq(b)),
                    BinaryOp::Ne => as_float(a.neq(b)),
                    BinaryOp::And => as_float(truthy(a).and(truthy(b))),
                    BinaryOp::Or => as_float(truthy(a).or(truthy(b))),
                }
            }
            FilterExpr::Call(f, args) => {
                let x = args[0].lower()?;
                match f {
                    Function::Acos => x.arccos(),
                    Function::Asin => x.arcsin(),
                    Function::Atan2 => x.arctan2(args[1].lower()?),
                    Function::Cos => x.cos(),
                    Function::Sin => x.sin(),
                    Function::Abs => x.abs(),
                }
            }
        })
    }
}
