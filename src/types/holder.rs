//! # Value Holders
//!
//! A `ValueHolder` is the write-side staging slot for one column. Besides a
//! value or an explicit NULL it can be *unset*, the state of a freshly
//! allocated or cleared row buffer. Reading an unset holder is an error, so a
//! row that was not completely populated can never leak stale data.

use super::{TInstance, Value};
use eyre::{ensure, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ValueHolder {
    ty: TInstance,
    value: Option<Value>,
}

impl ValueHolder {
    pub fn new(ty: TInstance) -> Self {
        Self { ty, value: None }
    }

    pub fn ty(&self) -> &TInstance {
        &self.ty
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Result<&Value> {
        self.value
            .as_ref()
            .ok_or_else(|| eyre::eyre!("read of unset {} value", self.ty))
    }

    /// Stores `value`, which must already be of this holder's underlying kind.
    pub fn put(&mut self, value: Value) -> Result<()> {
        ensure!(
            self.ty.accepts(&value),
            "cannot store {:?} in a {} slot",
            value,
            self.ty
        );
        self.value = Some(value);
        Ok(())
    }

    pub fn put_null(&mut self) {
        self.value = Some(Value::Null);
    }

    pub fn unset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_holder_is_unset_and_rejects_reads() {
        let holder = ValueHolder::new(TInstance::int4());
        assert!(!holder.is_set());
        let err = holder.get().unwrap_err();
        assert!(err.to_string().contains("unset"));
    }

    #[test]
    fn explicit_null_is_readable() {
        let mut holder = ValueHolder::new(TInstance::text());
        holder.put_null();
        assert_eq!(holder.get().unwrap(), &Value::Null);
    }

    #[test]
    fn put_rejects_wrong_kind() {
        let mut holder = ValueHolder::new(TInstance::int4());
        assert!(holder.put(Value::from("x")).is_err());
        holder.put(Value::Int32(3)).unwrap();
        holder.unset();
        assert!(!holder.is_set());
    }
}
