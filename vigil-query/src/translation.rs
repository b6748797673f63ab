//! Rewrites user-facing expressions into their backend-native form.
//!
//! Mappers are tried in declared order, function-name mappers before
//! subscriptable mappers. The first mapper that matches a node rewrites it and
//! the remaining ones are skipped for that node. Rewritten nodes are never
//! visited again, so mappers are not applied transitively.

use serde::Deserialize;
use tracing::debug;

use crate::{
    expression::{Column, Expression, FunctionCall, SubscriptableReference},
    query::Query,
};

pub trait ExpressionMapper {
    fn attempt_map(&self, expression: &Expression) -> Option<Expression>;
}

/// Renames a function, leaving its arguments untouched. A mapper scoped to a
/// table only matches calls with at least one column argument, all of them
/// from that table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionNameMapper {
    pub from_name: String,
    pub to_name: String,
    /// When set, only calls whose column arguments all belong to this table match.
    #[serde(default)]
    pub table_name: Option<String>,
}

impl FunctionNameMapper {
    pub fn new(from_name: impl Into<String>, to_name: impl Into<String>) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            table_name: None,
        }
    }

    fn table_matches(&self, call: &FunctionCall) -> bool {
        let Some(table_name) = &self.table_name else {
            return true;
        };

        let mut columns = call
            .parameters
            .iter()
            .filter_map(|parameter| parameter.as_column())
            .peekable();

        columns.peek().is_some()
            && columns.all(|column| column.table_name.as_ref() == Some(table_name))
    }
}

impl ExpressionMapper for FunctionNameMapper {
    fn attempt_map(&self, expression: &Expression) -> Option<Expression> {
        let call = expression.as_function()?;

        if call.function_name != self.from_name || !self.table_matches(call) {
            return None;
        }

        Some(Expression::FunctionCall(FunctionCall {
            function_name: self.to_name.to_owned(),
            parameters: call.parameters.clone(),
        }))
    }
}

/// Turns `from_column_name[key]` into a lookup on the key/value subcolumns of a
/// nested column:
/// `arrayElement(to_nested_col_name.<value_subcolumn_name>, indexOf(to_nested_col_name.key, key))`,
/// which selects the value stored next to `key`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptableMapper {
    #[serde(default)]
    pub from_column_table: Option<String>,
    pub from_column_name: String,
    #[serde(default)]
    pub to_nested_col_table: Option<String>,
    pub to_nested_col_name: String,
    pub value_subcolumn_name: String,
}

impl SubscriptableMapper {
    pub fn new(
        from_column_name: impl Into<String>,
        to_nested_col_name: impl Into<String>,
        value_subcolumn_name: impl Into<String>,
    ) -> Self {
        Self {
            from_column_table: None,
            from_column_name: from_column_name.into(),
            to_nested_col_table: None,
            to_nested_col_name: to_nested_col_name.into(),
            value_subcolumn_name: value_subcolumn_name.into(),
        }
    }

    pub fn key_column(&self) -> Column {
        Column::with_table(
            self.to_nested_col_table.clone(),
            format!("{}.key", self.to_nested_col_name),
        )
    }

    pub fn value_column(&self) -> Column {
        Column::with_table(
            self.to_nested_col_table.clone(),
            format!("{}.{}", self.to_nested_col_name, self.value_subcolumn_name),
        )
    }
}

impl ExpressionMapper for SubscriptableMapper {
    fn attempt_map(&self, expression: &Expression) -> Option<Expression> {
        let Expression::SubscriptableReference(SubscriptableReference { column, key }) =
            expression
        else {
            return None;
        };

        if column.column_name != self.from_column_name
            || column.table_name != self.from_column_table
        {
            return None;
        }

        Some(Expression::function(
            "arrayElement",
            vec![
                Expression::Column(self.value_column()),
                Expression::function(
                    "indexOf",
                    vec![
                        Expression::Column(self.key_column()),
                        Expression::Literal(key.clone()),
                    ],
                ),
            ],
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranslationMappers {
    #[serde(default)]
    pub functions: Vec<FunctionNameMapper>,
    #[serde(default)]
    pub subscriptables: Vec<SubscriptableMapper>,
}

impl TranslationMappers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, mapper: FunctionNameMapper) -> Self {
        self.functions.push(mapper);
        self
    }

    pub fn subscriptable(mut self, mapper: SubscriptableMapper) -> Self {
        self.subscriptables.push(mapper);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.subscriptables.is_empty()
    }

    pub fn translate_expression(&self, expression: Expression) -> Expression {
        let mapped = self
            .functions
            .iter()
            .find_map(|mapper| mapper.attempt_map(&expression))
            .or_else(|| {
                self.subscriptables
                    .iter()
                    .find_map(|mapper| mapper.attempt_map(&expression))
            });

        match mapped {
            Some(mapped) => {
                debug!("translated {expression} into {mapped}");
                mapped
            }
            None => expression,
        }
    }

    pub fn translate(&self, query: &mut Query) {
        if self.is_empty() {
            return;
        }

        query.transform_expressions(|expression| self.translate_expression(expression));
    }
}
