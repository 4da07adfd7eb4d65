use super::{check_field, Row, RowRef};
use crate::expr::{EvalContext, ExprRef, QueryBindings, QueryContext};
use crate::hkey::HKey;
use crate::schema::RowType;
use crate::types::Value;
use eyre::{ensure, Result, WrapErr};
use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;

/// A row whose fields are expressions over an optional source row.
///
/// Each field is evaluated the first time it is read and cached for the
/// lifetime of the row, so repeated reads never re-run the expression.
#[derive(Debug, Clone)]
pub struct ProjectedRow {
    row_type: Arc<RowType>,
    source: Option<RowRef>,
    exprs: Arc<[ExprRef]>,
    query: QueryContext,
    bindings: Option<Rc<QueryBindings>>,
    cache: Vec<OnceCell<Value>>,
}

impl ProjectedRow {
    pub fn new(row_type: Arc<RowType>, exprs: Arc<[ExprRef]>, query: QueryContext) -> Result<Self> {
        ensure!(
            exprs.len() == row_type.nfields(),
            "{} expects {} expressions, got {}",
            row_type,
            row_type.nfields(),
            exprs.len()
        );
        let cache = (0..exprs.len()).map(|_| OnceCell::new()).collect();
        Ok(Self {
            row_type,
            source: None,
            exprs,
            query,
            bindings: None,
            cache,
        })
    }

    /// Sets the row that `Field` expressions read.
    pub fn with_source(mut self, source: RowRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_bindings(mut self, bindings: Rc<QueryBindings>) -> Self {
        self.bindings = Some(bindings);
        self
    }

    pub fn source(&self) -> Option<&RowRef> {
        self.source.as_ref()
    }

    pub fn is_evaluated(&self, index: usize) -> bool {
        self.cache.get(index).map_or(false, |cell| cell.get().is_some())
    }

    fn evaluate(&self, index: usize) -> Result<Value> {
        let mut ctx = EvalContext::new(&self.query);
        if let Some(source) = &self.source {
            ctx = ctx.with_row(&**source);
        }
        if let Some(bindings) = &self.bindings {
            ctx = ctx.with_bindings(bindings);
        }
        let value = self.exprs[index]
            .evaluate(&ctx)
            .wrap_err_with(|| format!("evaluating field {} of {}", index, self.row_type))?;
        self.row_type.fields()[index].cast(value)
    }
}

impl Row for ProjectedRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        let cell = &self.cache[index];
        if let Some(value) = cell.get() {
            return Ok(value);
        }
        let value = self.evaluate(index)?;
        Ok(cell.get_or_init(|| value))
    }

    fn hkey(&self) -> Option<&HKey> {
        None
    }

    fn is_bindings_sensitive(&self) -> bool {
        self.exprs.iter().any(|e| e.is_bindings_sensitive())
            || self
                .source
                .as_ref()
                .map_or(false, |s| s.is_bindings_sensitive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Field, Function, Literal, Parameter};
    use crate::fixtures::Coi;
    use crate::types::TInstance;
    use eyre::eyre;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DOUBLE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn double(args: &[Value], _: &QueryContext) -> Result<Value> {
        DOUBLE_CALLS.fetch_add(1, Ordering::SeqCst);
        let v = args[0].as_f64().ok_or_else(|| eyre!("double expects a number"))?;
        Ok(Value::Double(v * 2.0))
    }

    #[test]
    fn test_fields_are_evaluated_once_on_first_read() {
        let coi = Coi::new();
        let ty = coi
            .schema
            .new_projected_type(vec![TInstance::int8(), TInstance::float8()]);
        let exprs: Arc<[ExprRef]> = Arc::from(vec![
            Arc::new(Field::new(0, TInstance::int8())) as ExprRef,
            Arc::new(Function::new(
                "double",
                vec![Arc::new(Field::new(2, TInstance::float8()))],
                TInstance::float8(),
                double,
            )),
        ]);
        let row = ProjectedRow::new(ty, exprs, QueryContext::new())
            .unwrap()
            .with_source(coi.order_row(10, 1, 4.5));

        assert!(!row.is_evaluated(1));
        let before = DOUBLE_CALLS.load(Ordering::SeqCst);
        assert_eq!(row.value(1).unwrap(), &Value::Double(9.0));
        assert_eq!(row.value(1).unwrap(), &Value::Double(9.0));
        assert_eq!(DOUBLE_CALLS.load(Ordering::SeqCst), before + 1);
        assert!(row.is_evaluated(1));
        assert!(!row.is_evaluated(0));
        assert_eq!(row.value(0).unwrap(), &Value::Int64(10));
        assert!(row.hkey().is_none());
    }

    #[test]
    fn test_failed_evaluation_is_not_cached() {
        let coi = Coi::new();
        let ty = coi.schema.new_projected_type(vec![TInstance::int4()]);
        let param: ExprRef = Arc::new(Parameter::new(0, TInstance::int4()));
        let exprs: Arc<[ExprRef]> = Arc::from(vec![param]);
        let row =
            ProjectedRow::new(Arc::clone(&ty), Arc::clone(&exprs), QueryContext::new()).unwrap();
        assert!(row.is_bindings_sensitive());
        assert!(row.value(0).is_err());
        assert!(!row.is_evaluated(0));

        let bound = ProjectedRow::new(ty, exprs, QueryContext::new())
            .unwrap()
            .with_bindings(Rc::new(QueryBindings::with_values([Value::Int64(7)])));
        assert_eq!(bound.value(0).unwrap(), &Value::Int32(7));
    }

    #[test]
    fn test_expression_count_must_match_type() {
        let coi = Coi::new();
        let ty = coi.schema.new_projected_type(vec![TInstance::int4(), TInstance::int4()]);
        let exprs: Arc<[ExprRef]> =
            Arc::from(vec![Arc::new(Literal::new(TInstance::int4(), 1).unwrap()) as ExprRef]);
        assert!(ProjectedRow::new(ty, exprs, QueryContext::new()).is_err());
    }
}
