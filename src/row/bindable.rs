use super::{ImmutableRow, ProjectedRow, RowRef};
use crate::expr::{fold_constant, ExprRef, QueryBindings, QueryContext};
use crate::schema::RowType;
use crate::types::Value;
use eyre::{ensure, Result};
use std::rc::Rc;
use std::sync::Arc;

/// A row template produced at plan time and bound once per execution.
///
/// Expressions are constant-folded when the template is built. If every
/// field folds to a literal, the template collapses to one shared immutable
/// row that `bind` hands out without evaluating anything.
#[derive(Debug, Clone)]
pub enum BindableRow {
    Constant(RowRef),
    Expressions {
        row_type: Arc<RowType>,
        exprs: Arc<[ExprRef]>,
    },
}

impl BindableRow {
    pub fn of_expressions(
        row_type: Arc<RowType>,
        exprs: Vec<ExprRef>,
        query: &QueryContext,
    ) -> Result<Self> {
        ensure!(
            exprs.len() == row_type.nfields(),
            "{} expects {} expressions, got {}",
            row_type,
            row_type.nfields(),
            exprs.len()
        );
        let exprs = exprs
            .into_iter()
            .map(|e| fold_constant(e, query))
            .collect::<Result<Vec<_>>>()?;

        let constants: Option<Vec<Value>> = exprs
            .iter()
            .map(|e| e.constant_value().cloned())
            .collect();
        match constants {
            Some(values) => {
                let row = ImmutableRow::converting(row_type, values)?;
                Ok(BindableRow::Constant(RowRef::new(row)))
            }
            None => Ok(BindableRow::Expressions {
                row_type,
                exprs: exprs.into(),
            }),
        }
    }

    pub fn of_row(row: &RowRef) -> Self {
        BindableRow::Constant(row.acquire())
    }

    pub fn row_type(&self) -> &Arc<RowType> {
        match self {
            BindableRow::Constant(row) => row.row_type(),
            BindableRow::Expressions { row_type, .. } => row_type,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, BindableRow::Constant(_))
    }

    /// The row for one set of parameter values.
    pub fn bind(&self, query: &QueryContext, bindings: &Rc<QueryBindings>) -> Result<RowRef> {
        match self {
            BindableRow::Constant(row) => Ok(row.acquire()),
            BindableRow::Expressions { row_type, exprs } => {
                let row = ProjectedRow::new(Arc::clone(row_type), Arc::clone(exprs), query.clone())?
                    .with_bindings(Rc::clone(bindings));
                Ok(RowRef::new(row))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Function, Literal, Parameter};
    use crate::schema::Schema;
    use crate::types::TInstance;
    use eyre::eyre;

    fn concat(args: &[Value], _: &QueryContext) -> Result<Value> {
        let a = args[0].as_str().ok_or_else(|| eyre!("concat expects text"))?;
        let b = args[1].as_str().ok_or_else(|| eyre!("concat expects text"))?;
        Ok(Value::String(format!("{}{}", a, b)))
    }

    fn text(s: &str) -> ExprRef {
        Arc::new(Literal::new(TInstance::varchar(16), s).unwrap())
    }

    #[test]
    fn test_all_constant_template_is_shared() {
        let schema = Schema::new();
        let ty = schema.new_values_type(vec![TInstance::int8(), TInstance::varchar(16)]);
        let query = QueryContext::new();
        let f: ExprRef = Arc::new(Function::new(
            "concat",
            vec![text("ab"), text("cd")],
            TInstance::varchar(16),
            concat,
        ));
        let lit: ExprRef = Arc::new(Literal::new(TInstance::int4(), 3).unwrap());
        let template = BindableRow::of_expressions(ty, vec![lit, f], &query).unwrap();
        assert!(template.is_constant());

        let bindings = Rc::new(QueryBindings::new());
        let a = template.bind(&query, &bindings).unwrap();
        let b = template.bind(&query, &bindings).unwrap();
        assert!(RowRef::ptr_eq(&a, &b));
        assert_eq!(a.value(0).unwrap(), &Value::Int64(3));
        assert_eq!(a.value(1).unwrap(), &Value::from("abcd"));
    }

    #[test]
    fn test_parameter_template_binds_per_execution() {
        let schema = Schema::new();
        let ty = schema.new_values_type(vec![TInstance::varchar(16)]);
        let query = QueryContext::new();
        let f: ExprRef = Arc::new(Function::new(
            "concat",
            vec![text("id-"), Arc::new(Parameter::new(0, TInstance::varchar(16)))],
            TInstance::varchar(16),
            concat,
        ));
        let template = BindableRow::of_expressions(ty, vec![f], &query).unwrap();
        assert!(!template.is_constant());

        let first = template
            .bind(&query, &Rc::new(QueryBindings::with_values([Value::from("7")])))
            .unwrap();
        let second = template
            .bind(&query, &Rc::new(QueryBindings::with_values([Value::Int64(8)])))
            .unwrap();
        assert!(first.is_bindings_sensitive());
        assert_eq!(first.value(0).unwrap(), &Value::from("id-7"));
        assert_eq!(second.value(0).unwrap(), &Value::from("id-8"));
    }

    #[test]
    fn test_of_row_hands_out_the_same_row() {
        let schema = Schema::new();
        let ty = schema.new_values_type(vec![TInstance::int4()]);
        let row = RowRef::new(ImmutableRow::new(Arc::clone(&ty), [Value::Int32(1)]).unwrap());
        let template = BindableRow::of_row(&row);
        let bound = template
            .bind(&QueryContext::new(), &Rc::new(QueryBindings::new()))
            .unwrap();
        assert!(RowRef::ptr_eq(&bound, &row));
        assert_eq!(template.row_type().id(), ty.id());
    }
}
