//! Expression node implementations.

use super::{EvalContext, ExprRef, Expression};
use super::QueryContext;
use crate::types::{TInstance, Value};
use eyre::{eyre, Result};

/// A constant.
#[derive(Debug, Clone)]
pub struct Literal {
    ty: TInstance,
    value: Value,
}

impl Literal {
    /// Creates a literal of type `ty`, converting `value` to it.
    pub fn new(ty: TInstance, value: impl Into<Value>) -> Result<Self> {
        let value = ty.cast(value.into())?;
        Ok(Self { ty, value })
    }

    pub fn null(ty: TInstance) -> Self {
        Self {
            ty,
            value: Value::Null,
        }
    }
}

impl Expression for Literal {
    fn result_type(&self) -> TInstance {
        self.ty
    }

    fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn constant_value(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

/// A `$n` parameter, read from the bindings at evaluation time.
#[derive(Debug, Clone)]
pub struct Parameter {
    index: usize,
    ty: TInstance,
}

impl Parameter {
    pub fn new(index: usize, ty: TInstance) -> Self {
        Self { index, ty }
    }
}

impl Expression for Parameter {
    fn result_type(&self) -> TInstance {
        self.ty
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        let bindings = ctx
            .bindings
            .ok_or_else(|| eyre!("parameter ${} evaluated without bindings", self.index + 1))?;
        self.ty.cast(bindings.value(self.index)?.clone())
    }

    fn is_bindings_sensitive(&self) -> bool {
        true
    }
}

/// A field of the input row.
#[derive(Debug, Clone)]
pub struct Field {
    index: usize,
    ty: TInstance,
}

impl Field {
    pub fn new(index: usize, ty: TInstance) -> Self {
        Self { index, ty }
    }
}

impl Expression for Field {
    fn result_type(&self) -> TInstance {
        self.ty
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        let row = ctx
            .row
            .ok_or_else(|| eyre!("field {} evaluated without an input row", self.index))?;
        Ok(row.value(self.index)?.clone())
    }
}

pub type FunctionBody = fn(&[Value], &QueryContext) -> Result<Value>;

/// A scalar function applied to argument expressions. Strict functions
/// return NULL without calling the body when any argument is NULL.
#[derive(Debug, Clone)]
pub struct Function {
    name: &'static str,
    args: Vec<ExprRef>,
    ty: TInstance,
    body: FunctionBody,
    strict: bool,
}

impl Function {
    pub fn new(name: &'static str, args: Vec<ExprRef>, ty: TInstance, body: FunctionBody) -> Self {
        Self {
            name,
            args,
            ty,
            body,
            strict: true,
        }
    }

    /// Lets the body see NULL arguments.
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Expression for Function {
    fn result_type(&self) -> TInstance {
        self.ty
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let value = arg.evaluate(ctx)?;
            if self.strict && value.is_null() {
                return Ok(Value::Null);
            }
            args.push(value);
        }
        let result = (self.body)(&args, ctx.query)
            .map_err(|e| e.wrap_err(format!("in function {}", self.name)))?;
        self.ty.cast(result)
    }

    fn is_constant(&self) -> bool {
        self.args.iter().all(|a| a.is_constant())
    }

    fn is_bindings_sensitive(&self) -> bool {
        self.args.iter().any(|a| a.is_bindings_sensitive())
    }
}
