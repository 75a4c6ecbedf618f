//! Row filter expressions.
//!
//! The filter string from the command line is parsed into a [`FilterExpr`]
//! tree. Derived names are then rewritten into the raw direction fields
//! they are computed from, so the event source only ever sees columns it
//! actually stores. Values follow C truthiness: any non-zero number is
//! true, and comparisons and logical operators produce `1` or `0`.

mod lower;
mod parser;

use crate::constants::{ALWAYS_TRUE_FILTER, derived, direction};
use crate::error::{ExtractError, Result};
use std::f64::consts::PI;
use std::fmt;

const RAD_TO_DEG: f64 = 180.0 / PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::And,
            _ => BinaryOp::Or,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Functions callable from a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Acos,
    Asin,
    Atan2,
    Cos,
    Sin,
    Abs,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "acos" => Some(Function::Acos),
            "asin" => Some(Function::Asin),
            "atan2" => Some(Function::Atan2),
            "cos" => Some(Function::Cos),
            "sin" => Some(Function::Sin),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Function::Acos => "acos",
            Function::Asin => "asin",
            Function::Atan2 => "atan2",
            Function::Cos => "cos",
            Function::Sin => "sin",
            Function::Abs => "abs",
        }
    }

    fn arity(&self) -> usize {
        match self {
            Function::Atan2 => 2,
            _ => 1,
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Number(f64),
    Field(String),
    /// `Name[i]`; event columns are scalar so only index 0 is meaningful
    Index(String, usize),
    Unary(UnaryOp, Box<FilterExpr>),
    Binary(BinaryOp, Box<FilterExpr>, Box<FilterExpr>),
    Call(Function, Vec<FilterExpr>),
}

impl FilterExpr {
    /// Parse a filter; blank input selects every row
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return parser::parse(ALWAYS_TRUE_FILTER);
        }
        parser::parse(input)
    }

    /// Parse the user filter, rewrite derived names and prepend `base`
    pub fn for_run(user_filter: &str, base_filter: &str) -> Result<Self> {
        let user = Self::parse(user_filter)?.rewrite_derived();
        if base_filter.trim().is_empty() {
            return Ok(user);
        }
        Ok(Self::parse(base_filter)?.rewrite_derived().and(user))
    }

    pub fn always_true() -> Self {
        FilterExpr::Number(1.0)
    }

    pub fn and(self, other: FilterExpr) -> Self {
        FilterExpr::Binary(BinaryOp::And, Box::new(self), Box::new(other))
    }

    /// Replace whole-identifier references to derived fields with the raw
    /// direction expressions they stand for, and collapse `Name[0]` to
    /// `Name`. Identifiers that only contain a derived name are kept.
    pub fn rewrite_derived(self) -> Self {
        match self {
            FilterExpr::Field(name) => derived_expr(&name).unwrap_or(FilterExpr::Field(name)),
            FilterExpr::Index(name, 0) => {
                derived_expr(&name).unwrap_or(FilterExpr::Field(name))
            }
            FilterExpr::Index(name, i) => FilterExpr::Index(name, i),
            FilterExpr::Number(v) => FilterExpr::Number(v),
            FilterExpr::Unary(op, inner) => FilterExpr::Unary(op, Box::new(inner.rewrite_derived())),
            FilterExpr::Binary(op, lhs, rhs) => FilterExpr::Binary(
                op,
                Box::new(lhs.rewrite_derived()),
                Box::new(rhs.rewrite_derived()),
            ),
            FilterExpr::Call(f, args) => {
                FilterExpr::Call(f, args.into_iter().map(Self::rewrite_derived).collect())
            }
        }
    }

    /// Every field name the expression reads
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterExpr::Field(name) | FilterExpr::Index(name, _) => out.push(name),
            FilterExpr::Number(_) => {}
            FilterExpr::Unary(_, inner) => inner.collect_fields(out),
            FilterExpr::Binary(_, lhs, rhs) => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            FilterExpr::Call(_, args) => args.iter().for_each(|a| a.collect_fields(out)),
        }
    }

    /// Evaluate over one row, looking fields up by name
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64> {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        Ok(match self {
            FilterExpr::Number(v) => *v,
            FilterExpr::Field(name) => lookup(name.as_str()).ok_or_else(|| unknown_field(name))?,
            FilterExpr::Index(name, 0) => lookup(name.as_str()).ok_or_else(|| unknown_field(name))?,
            FilterExpr::Index(name, i) => return Err(bad_index(name, *i)),
            FilterExpr::Unary(UnaryOp::Neg, inner) => -inner.evaluate(lookup)?,
            FilterExpr::Unary(UnaryOp::Not, inner) => truth(inner.evaluate(lookup)? == 0.0),
            FilterExpr::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(lookup)?;
                let b = rhs.evaluate(lookup)?;
                match op {
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                    BinaryOp::And => truth(a != 0.0 && b != 0.0),
                    BinaryOp::Or => truth(a != 0.0 || b != 0.0),
                }
            }
            FilterExpr::Call(f, args) => {
                let x = args[0].evaluate(lookup)?;
                match f {
                    Function::Acos => x.acos(),
                    Function::Asin => x.asin(),
                    Function::Atan2 => x.atan2(args[1].evaluate(lookup)?),
                    Function::Cos => x.cos(),
                    Function::Sin => x.sin(),
                    Function::Abs => x.abs(),
                }
            }
        })
    }

    /// True when the row passes the filter
    pub fn matches(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<bool> {
        Ok(self.evaluate(lookup)? != 0.0)
    }
}

fn derived_expr(name: &str) -> Option<FilterExpr> {
    let degrees = |e: FilterExpr| {
        FilterExpr::Binary(BinaryOp::Mul, Box::new(e), Box::new(FilterExpr::Number(RAD_TO_DEG)))
    };
    match name {
        derived::THETA => Some(degrees(FilterExpr::Call(
            Function::Acos,
            vec![FilterExpr::Field(direction::Z.to_string())],
        ))),
        derived::PHI => Some(degrees(FilterExpr::Call(
            Function::Atan2,
            vec![
                FilterExpr::Field(direction::Y.to_string()),
                FilterExpr::Field(direction::X.to_string()),
            ],
        ))),
        _ => None,
    }
}

fn unknown_field(name: &str) -> ExtractError {
    ExtractError::configuration(format!("unknown field {} in filter", name))
}

fn bad_index(name: &str, index: usize) -> ExtractError {
    ExtractError::configuration(format!(
        "{}[{}]: only index 0 is supported on scalar event fields",
        name, index
    ))
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Number(v) => write!(f, "{}", v),
            FilterExpr::Field(name) => f.write_str(name),
            FilterExpr::Index(name, i) => write!(f, "{}[{}]", name, i),
            FilterExpr::Unary(UnaryOp::Neg, inner) => write!(f, "-{}", inner),
            FilterExpr::Unary(UnaryOp::Not, inner) => write!(f, "!{}", inner),
            FilterExpr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            FilterExpr::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(expr: &FilterExpr, row: &HashMap<String, f64>) -> f64 {
        expr.evaluate(&|name| row.get(name).copied()).unwrap()
    }

    #[test]
    fn test_blank_filter_is_always_true() {
        let expr = FilterExpr::parse("   ").unwrap();
        assert_eq!(eval(&expr, &HashMap::new()), 1.0);
    }

    #[test]
    fn test_theta_rewrite_uses_z_direction() {
        let expr = FilterExpr::parse("Theta < 30").unwrap().rewrite_derived();
        assert_eq!(expr.fields(), vec!["ZDir"]);

        // acos(0.9) is about 25.8 degrees
        assert_eq!(eval(&expr, &row(&[("ZDir", 0.9)])), 1.0);
        // acos(0.5) is 60 degrees
        assert_eq!(eval(&expr, &row(&[("ZDir", 0.5)])), 0.0);
    }

    #[test]
    fn test_phi_rewrite_uses_x_and_y() {
        let expr = FilterExpr::parse("Phi > 80 && Phi < 100")
            .unwrap()
            .rewrite_derived();
        assert_eq!(expr.fields(), vec!["XDir", "YDir"]);
        assert_eq!(eval(&expr, &row(&[("XDir", 0.0), ("YDir", 1.0)])), 1.0);
        assert_eq!(eval(&expr, &row(&[("XDir", 1.0), ("YDir", 0.0)])), 0.0);
    }

    #[test]
    fn test_rewrite_leaves_longer_identifiers_alone() {
        let expr = FilterExpr::parse("ThetaMax > 1 && PhiOffset < 2")
            .unwrap()
            .rewrite_derived();
        assert_eq!(expr.fields(), vec!["PhiOffset", "ThetaMax"]);
    }

    #[test]
    fn test_index_zero_collapses_to_field() {
        let expr = FilterExpr::parse("ChiSquare[0] < 10 && TrackLength > 1")
            .unwrap()
            .rewrite_derived();
        assert_eq!(expr.fields(), vec!["ChiSquare", "TrackLength"]);
        assert!(!expr.to_string().contains('['));
    }

    #[test]
    fn test_for_run_prepends_base_filter() {
        let expr = FilterExpr::for_run("Theta < 30", "StatusCode == 0").unwrap();
        assert_eq!(expr.fields(), vec!["StatusCode", "ZDir"]);
        assert_eq!(eval(&expr, &row(&[("StatusCode", 0.0), ("ZDir", 1.0)])), 1.0);
        assert_eq!(eval(&expr, &row(&[("StatusCode", 2.0), ("ZDir", 1.0)])), 0.0);

        let unbased = FilterExpr::for_run("", "").unwrap();
        assert_eq!(unbased.fields(), Vec::<&str>::new());
    }

    #[test]
    fn test_c_truthiness() {
        let expr = FilterExpr::parse("!(a - 2) || (b && 0)").unwrap();
        assert_eq!(eval(&expr, &row(&[("a", 2.0), ("b", 5.0)])), 1.0);
        assert_eq!(eval(&expr, &row(&[("a", 3.0), ("b", 5.0)])), 0.0);
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let expr = FilterExpr::parse("Missing > 1").unwrap();
        assert!(expr.evaluate(&|_| None).is_err());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let expr = FilterExpr::parse("-a * 2 >= abs(b) || !c").unwrap();
        let reparsed = FilterExpr::parse(&expr.to_string()).unwrap();
        assert_eq!(expr, reparsed);
    }
}
