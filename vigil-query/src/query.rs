use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    conditions::{binary_condition, AND},
    expression::Expression,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedExpression {
    pub name: Option<String>,
    pub expression: Expression,
}

impl SelectedExpression {
    pub fn new(name: Option<String>, expression: Expression) -> Self {
        Self { name, expression }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub direction: OrderByDirection,
    pub expression: Expression,
}

/// A logical query against one entity. Processors own and mutate it in place
/// while it travels through a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub entity: String,
    pub selected_columns: Vec<SelectedExpression>,
    pub groupby: Vec<Expression>,
    pub condition: Option<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub granularity: Option<u64>,
}

impl Query {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            selected_columns: Vec::new(),
            groupby: Vec::new(),
            condition: None,
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            granularity: None,
        }
    }

    pub fn select(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.selected_columns
            .push(SelectedExpression::new(Some(name.into()), expression));
        self
    }

    pub fn filter(mut self, condition: Expression) -> Self {
        self.add_condition(condition);
        self
    }

    /// ANDs `condition` onto the existing WHERE clause.
    pub fn add_condition(&mut self, condition: Expression) {
        self.condition = Some(match self.condition.take() {
            Some(current) => binary_condition(AND, current, condition),
            None => condition,
        });
    }

    /// Applies `f` bottom-up to every expression of every clause.
    pub fn transform_expressions<F>(&mut self, mut f: F)
    where
        F: FnMut(Expression) -> Expression,
    {
        for selected in self.selected_columns.iter_mut() {
            transform_in_place(&mut selected.expression, &mut f);
        }

        for expression in self.groupby.iter_mut() {
            transform_in_place(expression, &mut f);
        }

        if let Some(condition) = self.condition.as_mut() {
            transform_in_place(condition, &mut f);
        }

        if let Some(having) = self.having.as_mut() {
            transform_in_place(having, &mut f);
        }

        for order_by in self.order_by.iter_mut() {
            transform_in_place(&mut order_by.expression, &mut f);
        }
    }

    pub fn expressions(&self) -> Vec<&Expression> {
        self.selected_columns
            .iter()
            .map(|selected| &selected.expression)
            .chain(self.groupby.iter())
            .chain(self.condition.iter())
            .chain(self.having.iter())
            .chain(self.order_by.iter().map(|order_by| &order_by.expression))
            .collect()
    }

    pub fn columns_referenced_in_conditions(&self) -> BTreeSet<String> {
        self.condition
            .iter()
            .flat_map(|condition| condition.columns())
            .map(|column| column.column_name.to_owned())
            .collect()
    }
}

fn transform_in_place<F>(expression: &mut Expression, f: &mut F)
where
    F: FnMut(Expression) -> Expression,
{
    let owned = std::mem::replace(expression, Expression::Literal(crate::Literal::Null));
    *expression = owned.transform(f);
}
