use async_trait::async_trait;
use vigil_query::{
    conditions::{COMPARISON_FUNCTIONS, TUPLE},
    Expression, FunctionCall, Literal, Query, SubscriptableReference,
};

use crate::{context::RequestContext, error::Result, processor::QueryProcessor};

/// Column whose keys and values are stored as indexed integers.
pub const INDEXED_TAGS_COLUMN: &str = "tags";

/// Types `tags[...]` lookups for metrics storages: decimal string keys, and
/// decimal string values compared against a lookup, become integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagsTypeTransformer;

fn to_integer(literal: Literal) -> Literal {
    match literal {
        Literal::String(value) => match value.parse::<i64>() {
            Ok(value) => Literal::Int(value),
            Err(_) => Literal::String(value),
        },
        other => other,
    }
}

fn is_tag_lookup(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::SubscriptableReference(SubscriptableReference { column, .. })
            if column.column_name == INDEXED_TAGS_COLUMN
    )
}

fn transform_operand(operand: Expression) -> Expression {
    match operand {
        Expression::Literal(literal) => Expression::Literal(to_integer(literal)),
        Expression::FunctionCall(FunctionCall {
            function_name,
            parameters,
        }) if function_name == TUPLE => Expression::FunctionCall(FunctionCall {
            function_name,
            parameters: parameters.into_iter().map(transform_operand).collect(),
        }),
        other => other,
    }
}

fn transform(expression: Expression) -> Expression {
    match expression {
        Expression::SubscriptableReference(SubscriptableReference { column, key })
            if column.column_name == INDEXED_TAGS_COLUMN =>
        {
            Expression::SubscriptableReference(SubscriptableReference {
                column,
                key: to_integer(key),
            })
        }
        Expression::FunctionCall(FunctionCall {
            function_name,
            parameters,
        }) if COMPARISON_FUNCTIONS.contains(&function_name.as_str())
            && parameters.len() == 2
            && parameters.iter().any(is_tag_lookup) =>
        {
            Expression::FunctionCall(FunctionCall {
                function_name,
                parameters: parameters
                    .into_iter()
                    .map(|parameter| match is_tag_lookup(&parameter) {
                        true => parameter,
                        false => transform_operand(parameter),
                    })
                    .collect(),
            })
        }
        other => other,
    }
}

#[async_trait]
impl QueryProcessor for TagsTypeTransformer {
    fn name(&self) -> &'static str {
        "tags_type_transformer"
    }

    async fn process(&self, query: &mut Query, _ctx: &RequestContext) -> Result<()> {
        query.transform_expressions(transform);

        Ok(())
    }
}
