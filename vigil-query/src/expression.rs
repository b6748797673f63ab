use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers that do not fit in `Int`.
    UInt(u64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<u64> for Literal {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Literal::Int)
            .unwrap_or(Literal::UInt(value))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_owned())
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Literal::DateTime(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub table_name: Option<String>,
    pub column_name: String,
}

impl Column {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            table_name: None,
            column_name: column_name.into(),
        }
    }

    pub fn with_table(table_name: Option<String>, column_name: impl Into<String>) -> Self {
        Self {
            table_name,
            column_name: column_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function_name: String,
    pub parameters: Vec<Expression>,
}

/// An indexed lookup against a flat pseudo-column, e.g. `tags_raw[5]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptableReference {
    pub column: Column,
    pub key: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Column(Column),
    Literal(Literal),
    FunctionCall(FunctionCall),
    SubscriptableReference(SubscriptableReference),
}

impl Expression {
    pub fn column(column_name: impl Into<String>) -> Self {
        Expression::Column(Column::new(column_name))
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn function(function_name: impl Into<String>, parameters: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionCall {
            function_name: function_name.into(),
            parameters,
        })
    }

    pub fn subscriptable(column_name: impl Into<String>, key: impl Into<Literal>) -> Self {
        Expression::SubscriptableReference(SubscriptableReference {
            column: Column::new(column_name),
            key: key.into(),
        })
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Expression::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionCall> {
        match self {
            Expression::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_function(&self, function_name: &str) -> bool {
        self.as_function()
            .map(|call| call.function_name == function_name)
            .unwrap_or(false)
    }

    /// Rewrites the tree bottom-up: children are transformed before their
    /// parent is handed to `f`, and every node is visited exactly once.
    pub fn transform<F>(self, f: &mut F) -> Expression
    where
        F: FnMut(Expression) -> Expression,
    {
        let expression = match self {
            Expression::FunctionCall(call) => Expression::FunctionCall(FunctionCall {
                function_name: call.function_name,
                parameters: call
                    .parameters
                    .into_iter()
                    .map(|parameter| parameter.transform(f))
                    .collect(),
            }),
            other => other,
        };

        f(expression)
    }

    /// Visits the tree top-down.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        f(self);

        if let Expression::FunctionCall(call) = self {
            for parameter in call.parameters.iter() {
                parameter.walk(f);
            }
        }
    }

    pub fn columns(&self) -> Vec<&Column> {
        let mut columns = Vec::new();

        self.walk(&mut |expression| match expression {
            Expression::Column(column) => columns.push(column),
            Expression::SubscriptableReference(reference) => columns.push(&reference.column),
            _ => {}
        });

        columns
    }
}
