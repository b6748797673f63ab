//! Conditions are plain function calls. These helpers build and inspect them.

use crate::expression::{Expression, Literal};

pub const EQ: &str = "equals";
pub const NEQ: &str = "notEquals";
pub const LT: &str = "less";
pub const LTE: &str = "lessOrEquals";
pub const GT: &str = "greater";
pub const GTE: &str = "greaterOrEquals";
pub const IN: &str = "in";
pub const NOT_IN: &str = "notIn";
pub const AND: &str = "and";
pub const OR: &str = "or";
pub const TUPLE: &str = "tuple";

pub const COMPARISON_FUNCTIONS: [&str; 8] = [EQ, NEQ, LT, LTE, GT, GTE, IN, NOT_IN];

pub fn binary_condition(function_name: &str, lhs: Expression, rhs: Expression) -> Expression {
    Expression::function(function_name, vec![lhs, rhs])
}

/// Folds conditions into a right-nested `and` chain.
pub fn combine_and_conditions(conditions: Vec<Expression>) -> Option<Expression> {
    conditions
        .into_iter()
        .rev()
        .reduce(|acc, condition| binary_condition(AND, condition, acc))
}

/// Flattens nested `and` calls into their operands, in source order.
pub fn get_first_level_and_conditions(condition: &Expression) -> Vec<&Expression> {
    match condition.as_function() {
        Some(call) if call.function_name == AND => call
            .parameters
            .iter()
            .flat_map(get_first_level_and_conditions)
            .collect(),
        _ => vec![condition],
    }
}

/// Literal values a top-level `equals` or `in` condition binds `column_name` to.
pub fn get_column_values(condition: &Expression, column_name: &str) -> Vec<Literal> {
    let mut values = Vec::new();

    for condition in get_first_level_and_conditions(condition) {
        let Some(call) = condition.as_function() else {
            continue;
        };

        let [lhs, rhs] = call.parameters.as_slice() else {
            continue;
        };

        let matches_column = lhs
            .as_column()
            .map(|column| column.column_name == column_name)
            .unwrap_or(false);

        if !matches_column {
            continue;
        }

        match (call.function_name.as_str(), rhs) {
            (EQ, Expression::Literal(literal)) => values.push(literal.clone()),
            (IN, Expression::FunctionCall(tuple)) if tuple.function_name == TUPLE => {
                values.extend(tuple.parameters.iter().filter_map(|p| p.as_literal().cloned()))
            }
            _ => {}
        }
    }

    values
}

/// Whether a top-level `equals` or `in` condition filters on `column_name`.
pub fn has_filter_on(condition: &Expression, column_name: &str) -> bool {
    get_first_level_and_conditions(condition)
        .into_iter()
        .filter_map(|condition| condition.as_function())
        .filter(|call| call.function_name == EQ || call.function_name == IN)
        .any(|call| {
            call.parameters
                .first()
                .and_then(|lhs| lhs.as_column())
                .map(|column| column.column_name == column_name)
                .unwrap_or(false)
        })
}
