//! Per-query state handed to expression evaluation.

use crate::types::Value;
use eyre::{eyre, Result};

/// Query-wide state that stays fixed while a plan runs.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    start_time_micros: i64,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the statement start time returned by time functions.
    pub fn with_start_time(mut self, micros: i64) -> Self {
        self.start_time_micros = micros;
        self
    }

    pub fn start_time(&self) -> i64 {
        self.start_time_micros
    }
}

/// Parameter values for one execution of a prepared plan.
#[derive(Debug, Clone, Default)]
pub struct QueryBindings {
    parameters: Vec<Option<Value>>,
}

impl QueryBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            parameters: values.into_iter().map(Some).collect(),
        }
    }

    pub fn set_value(&mut self, index: usize, value: Value) {
        if index >= self.parameters.len() {
            self.parameters.resize(index + 1, None);
        }
        self.parameters[index] = Some(value);
    }

    pub fn value(&self, index: usize) -> Result<&Value> {
        self.parameters
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| eyre!("parameter ${} is not bound", index + 1))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_parameter_is_an_error() {
        let mut bindings = QueryBindings::new();
        bindings.set_value(2, Value::Int32(9));
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.value(2).unwrap(), &Value::Int32(9));
        let err = bindings.value(0).unwrap_err();
        assert_eq!(err.to_string(), "parameter $1 is not bound");
        assert!(bindings.value(7).is_err());
    }
}
