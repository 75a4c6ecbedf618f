//! Output schema: the ordered, typed columns requested on the command line.
//!
//! Each [`Variable`] is either a pass-through event field or one of the
//! derived fields (`Theta`, `Phi`, `Pressure`). Values are held in a
//! tagged [`Value`] slot that is overwritten once per accepted row.

use crate::constants::derived;
use crate::error::{ExtractError, Result};
use std::fmt;
use std::str::FromStr;

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Float,
}

impl Kind {
    /// Single-letter tag used on the command line
    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Integer => "I",
            Kind::Float => "F",
        }
    }
}

impl FromStr for Kind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "I" => Ok(Kind::Integer),
            "F" => Ok(Kind::Float),
            other => Err(ExtractError::configuration(format!(
                "Unrecognised type {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Current scalar held by a variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
}

impl Value {
    fn zero(kind: Kind) -> Self {
        match kind {
            Kind::Integer => Value::Integer(0),
            Kind::Float => Value::Float(0.0),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
        }
    }
}

/// Where a column's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Read from the event row under the variable's own name
    Event,
    /// `acos(ZDir)` in degrees
    Theta,
    /// `atan2(YDir, XDir)` in degrees
    Phi,
    /// Cached per-file weather reading
    Pressure,
}

impl FieldSource {
    fn for_name(name: &str) -> Self {
        match name {
            derived::THETA => FieldSource::Theta,
            derived::PHI => FieldSource::Phi,
            derived::PRESSURE => FieldSource::Pressure,
            _ => FieldSource::Event,
        }
    }

    pub fn is_derived(&self) -> bool {
        !matches!(self, FieldSource::Event)
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: Kind,
    source: FieldSource,
    value: Value,
}

impl Variable {
    /// Create a variable from its command-line type tag and name
    pub fn new(name: impl Into<String>, type_tag: &str) -> Result<Self> {
        let kind: Kind = type_tag.parse()?;
        Self::with_kind(name, kind)
    }

    pub fn with_kind(name: impl Into<String>, kind: Kind) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ExtractError::configuration("variable name cannot be empty"));
        }

        let source = FieldSource::for_name(&name);
        if source.is_derived() && kind != Kind::Float {
            return Err(ExtractError::configuration(format!(
                "derived variable {} must be declared as F",
                name
            )));
        }

        Ok(Self {
            value: Value::zero(kind),
            name,
            kind,
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn source(&self) -> FieldSource {
        self.source
    }

    /// Column header, which is simply the variable name
    pub fn header(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self.value {
            Value::Integer(v) => Ok(v),
            Value::Float(_) => Err(self.kind_mismatch(Kind::Integer)),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self.value {
            Value::Float(v) => Ok(v),
            Value::Integer(_) => Err(self.kind_mismatch(Kind::Float)),
        }
    }

    pub fn set_integer(&mut self, value: i64) -> Result<()> {
        if self.kind != Kind::Integer {
            return Err(self.kind_mismatch(Kind::Integer));
        }
        self.value = Value::Integer(value);
        Ok(())
    }

    pub fn set_float(&mut self, value: f64) -> Result<()> {
        if self.kind != Kind::Float {
            return Err(self.kind_mismatch(Kind::Float));
        }
        self.value = Value::Float(value);
        Ok(())
    }

    /// Store a raw event value, truncating toward zero for integer columns
    pub fn set_coerced(&mut self, raw: f64) {
        self.value = match self.kind {
            Kind::Integer => Value::Integer(raw.trunc() as i64),
            Kind::Float => Value::Float(raw),
        };
    }

    fn kind_mismatch(&self, requested: Kind) -> ExtractError {
        ExtractError::configuration(format!(
            "variable {} is declared {} but was accessed as {}",
            self.name, self.kind, requested
        ))
    }
}

/// Ordered, non-empty list of output columns
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    variables: Vec<Variable>,
}

impl Schema {
    /// Build a schema from `(type_tag, name)` pairs in declaration order
    pub fn from_pairs<T, N>(pairs: impl IntoIterator<Item = (T, N)>) -> Result<Self>
    where
        T: AsRef<str>,
        N: Into<String>,
    {
        let variables = pairs
            .into_iter()
            .map(|(tag, name)| Variable::new(name, tag.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(variables)
    }

    /// Build a schema from a flat `type name type name ...` argument list
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() % 2 != 0 {
            return Err(ExtractError::MissingArguments {
                message: format!(
                    "type tag '{}' has no variable name",
                    args.last().map(String::as_str).unwrap_or_default()
                ),
            });
        }
        Self::from_pairs(args.chunks(2).map(|pair| (pair[0].as_str(), pair[1].clone())))
    }

    pub fn new(variables: Vec<Variable>) -> Result<Self> {
        if variables.is_empty() {
            return Err(ExtractError::NoVariables);
        }
        for (i, var) in variables.iter().enumerate() {
            if variables[..i].iter().any(|v| v.name == var.name) {
                return Err(ExtractError::configuration(format!(
                    "variable {} declared more than once",
                    var.name
                )));
            }
        }
        Ok(Self { variables })
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(Variable::header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_preserves_declaration_order() {
        let schema =
            Schema::from_args(&args(&["I", "Seconds", "F", "Theta", "F", "Phi", "I", "Hits"]))
                .unwrap();

        let headers: Vec<&str> = schema.headers().collect();
        assert_eq!(headers, vec!["Seconds", "Theta", "Phi", "Hits"]);

        let kinds: Vec<Kind> = schema.variables().iter().map(Variable::kind).collect();
        assert_eq!(
            kinds,
            vec![Kind::Integer, Kind::Float, Kind::Float, Kind::Integer]
        );
    }

    #[test]
    fn test_derived_sources() {
        let schema =
            Schema::from_args(&args(&["F", "Theta", "F", "Phi", "F", "Pressure", "F", "ThetaMax"]))
                .unwrap();
        let sources: Vec<FieldSource> = schema.variables().iter().map(Variable::source).collect();
        assert_eq!(
            sources,
            vec![
                FieldSource::Theta,
                FieldSource::Phi,
                FieldSource::Pressure,
                FieldSource::Event
            ]
        );
    }

    #[test]
    fn test_unrecognised_type_tag() {
        let err = Schema::from_args(&args(&["D", "Seconds"])).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
        assert!(err.to_string().contains("Unrecognised type D"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = Schema::from_args(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::NoVariables));
    }

    #[test]
    fn test_unpaired_argument() {
        let err = Schema::from_args(&args(&["I", "Seconds", "F"])).unwrap_err();
        assert!(matches!(err, ExtractError::MissingArguments { .. }));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::from_args(&args(&["I", "Seconds", "F", "Seconds"])).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
    }

    #[test]
    fn test_derived_field_must_be_float() {
        let err = Variable::new("Theta", "I").unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
    }

    #[test]
    fn test_typed_accessors_fail_fast() {
        let mut var = Variable::new("Seconds", "I").unwrap();
        var.set_integer(42).unwrap();
        assert_eq!(var.as_integer().unwrap(), 42);
        assert!(var.as_float().is_err());
        assert!(var.set_float(1.5).is_err());
        assert_eq!(var.value(), Value::Integer(42));
    }

    #[test]
    fn test_coercion_truncates_toward_zero() {
        let mut var = Variable::new("Seconds", "I").unwrap();
        var.set_coerced(3.99);
        assert_eq!(var.value(), Value::Integer(3));
        var.set_coerced(-3.99);
        assert_eq!(var.value(), Value::Integer(-3));

        let mut var = Variable::new("Energy", "F").unwrap();
        var.set_coerced(3.99);
        assert_eq!(var.value(), Value::Float(3.99));
    }
}
