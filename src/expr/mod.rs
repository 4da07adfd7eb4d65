//! # Expressions
//!
//! Scalar expressions evaluated against an optional input row, the query
//! context and the parameter bindings. Projected rows evaluate them lazily
//! per field; bindable rows fold them once when the template is built.
//!
//! ## Node Types
//!
//! | Node | Value | Constant | Bindings-sensitive |
//! |------|-------|----------|--------------------|
//! | `Literal` | fixed value | yes | no |
//! | `Parameter` | `$n` from bindings | no | yes |
//! | `Field` | input row field | no | no |
//! | `Function` | body over evaluated args | if all args are | if any arg is |
//!
//! ## Constant Folding
//!
//! `fold_constant` replaces an expression that does not depend on the row or
//! the bindings with the `Literal` it evaluates to. Folding happens once at
//! plan time; errors raised while folding are reported then.

mod context;
mod nodes;

pub use context::{QueryBindings, QueryContext};
pub use nodes::{Field, Function, FunctionBody, Literal, Parameter};

use crate::row::Row;
use crate::types::{TInstance, Value};
use eyre::Result;
use std::fmt;
use std::sync::Arc;

/// Everything an expression may read while evaluating.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub row: Option<&'a dyn Row>,
    pub query: &'a QueryContext,
    pub bindings: Option<&'a QueryBindings>,
}

impl<'a> EvalContext<'a> {
    pub fn new(query: &'a QueryContext) -> Self {
        Self {
            row: None,
            query,
            bindings: None,
        }
    }

    pub fn with_row(mut self, row: &'a dyn Row) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_bindings(mut self, bindings: &'a QueryBindings) -> Self {
        self.bindings = Some(bindings);
        self
    }
}

pub trait Expression: fmt::Debug + Send + Sync {
    fn result_type(&self) -> TInstance;

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value>;

    /// The value of a literal.
    fn constant_value(&self) -> Option<&Value> {
        None
    }

    /// True if the value depends on neither the row nor the bindings.
    fn is_constant(&self) -> bool {
        self.constant_value().is_some()
    }

    fn is_bindings_sensitive(&self) -> bool {
        false
    }
}

pub type ExprRef = Arc<dyn Expression>;

/// Evaluates `expr` now if it is constant, returning the equivalent literal.
pub fn fold_constant(expr: ExprRef, query: &QueryContext) -> Result<ExprRef> {
    if expr.constant_value().is_some() || !expr.is_constant() {
        return Ok(expr);
    }
    let value = expr.evaluate(&EvalContext::new(query))?;
    Ok(Arc::new(Literal::new(expr.result_type(), value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ImmutableRow, Row};
    use crate::schema::Schema;
    use eyre::{bail, eyre};

    fn add(args: &[Value], _: &QueryContext) -> Result<Value> {
        let a = args[0].as_i64().ok_or_else(|| eyre!("add expects integers"))?;
        let b = args[1].as_i64().ok_or_else(|| eyre!("add expects integers"))?;
        Ok(Value::Int64(a + b))
    }

    fn lit(v: i64) -> ExprRef {
        Arc::new(Literal::new(TInstance::int8(), v).unwrap())
    }

    #[test]
    fn test_literal_casts_to_declared_type() {
        let l = Literal::new(TInstance::varchar(8), 42i32).unwrap();
        assert_eq!(l.constant_value(), Some(&Value::from("42")));
        assert!(Literal::new(TInstance::int4(), "x").is_err());
    }

    #[test]
    fn test_function_over_constants_folds_to_literal() {
        let query = QueryContext::new();
        let f: ExprRef =
            Arc::new(Function::new("add", vec![lit(2), lit(3)], TInstance::int8(), add));
        assert!(f.is_constant());
        assert!(f.constant_value().is_none());
        let folded = fold_constant(f, &query).unwrap();
        assert_eq!(folded.constant_value(), Some(&Value::Int64(5)));
    }

    #[test]
    fn test_parameter_blocks_folding_and_reads_bindings() {
        let query = QueryContext::new();
        let p: ExprRef = Arc::new(Parameter::new(0, TInstance::int8()));
        let f: ExprRef = Arc::new(Function::new("add", vec![p, lit(1)], TInstance::int8(), add));
        assert!(!f.is_constant());
        assert!(f.is_bindings_sensitive());
        let f = fold_constant(f, &query).unwrap();
        assert!(f.constant_value().is_none());

        let bindings = QueryBindings::with_values([Value::Int32(41)]);
        let ctx = EvalContext::new(&query).with_bindings(&bindings);
        assert_eq!(f.evaluate(&ctx).unwrap(), Value::Int64(42));
        assert!(f.evaluate(&EvalContext::new(&query)).is_err());
    }

    #[test]
    fn test_strict_function_short_circuits_null() {
        fn fail(_: &[Value], _: &QueryContext) -> Result<Value> {
            bail!("should not run")
        }
        let query = QueryContext::new();
        let null: ExprRef = Arc::new(Literal::null(TInstance::int8()));
        let strict = Function::new("f", vec![Arc::clone(&null)], TInstance::int8(), fail);
        assert_eq!(strict.evaluate(&EvalContext::new(&query)).unwrap(), Value::Null);
        let lax = Function::new("f", vec![null], TInstance::int8(), fail).non_strict();
        let err = lax.evaluate(&EvalContext::new(&query)).unwrap_err();
        assert!(format!("{:#}", err).contains("should not run"));
    }

    #[test]
    fn test_field_reads_input_row() {
        let schema = Schema::new();
        let ty = schema.new_values_type(vec![TInstance::int8(), TInstance::text()]);
        let row = ImmutableRow::new(ty, [Value::Int64(7), Value::from("seven")]).unwrap();
        let query = QueryContext::new();
        let field = Field::new(1, TInstance::text());
        let ctx = EvalContext::new(&query).with_row(&row as &dyn Row);
        assert_eq!(field.evaluate(&ctx).unwrap(), Value::from("seven"));
        assert!(field.evaluate(&EvalContext::new(&query)).is_err());
    }
}
