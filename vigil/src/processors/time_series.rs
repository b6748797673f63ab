use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;
use vigil_query::{
    conditions::{COMPARISON_FUNCTIONS, TUPLE},
    Expression, FunctionCall, Literal, Query,
};

use crate::{context::RequestContext, error::Result, processor::QueryProcessor};

/// Bucket width used when a query does not request a granularity.
pub const DEFAULT_TIME_GRANULARITY: u64 = 3600;

/// Buckets time series and types time literals.
///
/// References to a grouping pseudo-column (`time_group_columns`, mapping the
/// pseudo-column to the time column it buckets) become the bucket expression
/// of the query granularity. String literals compared against one of the
/// `time_parse_columns` become datetime literals when they parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimeSeriesProcessor {
    #[serde(default)]
    pub time_group_columns: BTreeMap<String, String>,
    #[serde(default)]
    pub time_parse_columns: Vec<String>,
}

impl TimeSeriesProcessor {
    pub fn new<G, P>(time_group_columns: G, time_parse_columns: P) -> Self
    where
        G: IntoIterator<Item = (&'static str, &'static str)>,
        P: IntoIterator<Item = &'static str>,
    {
        Self {
            time_group_columns: time_group_columns
                .into_iter()
                .map(|(from, to)| (from.to_owned(), to.to_owned()))
                .collect(),
            time_parse_columns: time_parse_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The expression truncating `column` to buckets of `granularity` seconds.
    pub fn bucket(column: &str, granularity: u64) -> Expression {
        let column = Expression::column(column);
        let timezone = Expression::literal("Universal");

        match granularity {
            60 => Expression::function("toStartOfMinute", vec![column, timezone]),
            3600 => Expression::function("toStartOfHour", vec![column, timezone]),
            86400 => Expression::function("toDate", vec![column, timezone]),
            _ => Expression::function(
                "toDateTime",
                vec![
                    Expression::function(
                        "multiply",
                        vec![
                            Expression::function(
                                "intDiv",
                                vec![
                                    Expression::function("toUInt32", vec![column]),
                                    Expression::literal(granularity),
                                ],
                            ),
                            Expression::literal(granularity),
                        ],
                    ),
                    timezone,
                ],
            ),
        }
    }

    fn group(&self, expression: Expression, granularity: u64) -> Expression {
        match expression {
            Expression::Column(column) if column.table_name.is_none() => {
                match self.time_group_columns.get(&column.column_name) {
                    Some(time_column) => Self::bucket(time_column, granularity),
                    None => Expression::Column(column),
                }
            }
            other => other,
        }
    }

    fn parse_time_literals(&self, expression: Expression) -> Expression {
        let Expression::FunctionCall(FunctionCall {
            function_name,
            parameters,
        }) = expression
        else {
            return expression;
        };

        let on_time_column = COMPARISON_FUNCTIONS.contains(&function_name.as_str())
            && parameters.len() == 2
            && parameters[0]
                .as_column()
                .map(|column| self.time_parse_columns.contains(&column.column_name))
                .unwrap_or(false);

        if !on_time_column {
            return Expression::FunctionCall(FunctionCall {
                function_name,
                parameters,
            });
        }

        let parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(position, parameter)| match position {
                0 => parameter,
                _ => parse_time_operand(parameter),
            })
            .collect();

        Expression::FunctionCall(FunctionCall {
            function_name,
            parameters,
        })
    }
}

fn parse_time_operand(operand: Expression) -> Expression {
    match operand {
        Expression::Literal(Literal::String(value)) => match parse_datetime(&value) {
            Some(datetime) => Expression::Literal(Literal::DateTime(datetime)),
            None => Expression::Literal(Literal::String(value)),
        },
        Expression::FunctionCall(FunctionCall {
            function_name,
            parameters,
        }) if function_name == TUPLE => Expression::FunctionCall(FunctionCall {
            function_name,
            parameters: parameters.into_iter().map(parse_time_operand).collect(),
        }),
        other => other,
    }
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

#[async_trait]
impl QueryProcessor for TimeSeriesProcessor {
    fn name(&self) -> &'static str {
        "time_series_processor"
    }

    async fn process(&self, query: &mut Query, _ctx: &RequestContext) -> Result<()> {
        let granularity = query.granularity.unwrap_or(DEFAULT_TIME_GRANULARITY);

        if !self.time_group_columns.is_empty() {
            query.transform_expressions(|expression| self.group(expression, granularity));
        }

        if !self.time_parse_columns.is_empty() {
            if let Some(condition) = query.condition.take() {
                query.condition =
                    Some(condition.transform(&mut |expression| self.parse_time_literals(expression)));
            }
        }

        debug!("time series of {} bucketed by {granularity}s", query.entity);

        Ok(())
    }
}
