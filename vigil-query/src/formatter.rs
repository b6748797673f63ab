//! Renders queries into the text handed to the backend.

use std::fmt::{self, Display, Formatter};

use crate::{
    conditions::TUPLE,
    expression::{Column, Expression, FunctionCall, Literal, SubscriptableReference},
    query::{OrderByDirection, Query},
};

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::UInt(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value:?}"),
            Literal::String(value) => {
                write!(f, "'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Literal::DateTime(value) => write!(
                f,
                "toDateTime('{}', 'Universal')",
                value.format("%Y-%m-%dT%H:%M:%S")
            ),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.table_name {
            Some(table_name) => write!(f, "{table_name}.{}", self.column_name),
            None => write!(f, "{}", self.column_name),
        }
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| parameter.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if self.function_name == TUPLE {
            write!(f, "({parameters})")
        } else {
            write!(f, "{}({parameters})", self.function_name)
        }
    }
}

impl Display for SubscriptableReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.column, self.key)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(column) => column.fmt(f),
            Expression::Literal(literal) => literal.fmt(f),
            Expression::FunctionCall(call) => call.fmt(f),
            Expression::SubscriptableReference(reference) => reference.fmt(f),
        }
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let selected = self
            .selected_columns
            .iter()
            .map(|selected| match &selected.name {
                Some(name) => format!("{} AS {name}", selected.expression),
                None => selected.expression.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "SELECT {selected} FROM {}", self.entity)?;

        if let Some(condition) = &self.condition {
            write!(f, " WHERE {condition}")?;
        }

        if !self.groupby.is_empty() {
            write!(f, " GROUP BY {}", join(&self.groupby))?;
        }

        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }

        if !self.order_by.is_empty() {
            let order_by = self
                .order_by
                .iter()
                .map(|order_by| {
                    let direction = match order_by.direction {
                        OrderByDirection::Asc => "ASC",
                        OrderByDirection::Desc => "DESC",
                    };

                    format!("{} {direction}", order_by.expression)
                })
                .collect::<Vec<_>>()
                .join(", ");

            write!(f, " ORDER BY {order_by}")?;
        }

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}

fn join(expressions: &[Expression]) -> String {
    expressions
        .iter()
        .map(|expression| expression.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
