//! Parser for the textual query language.
//!
//! ```text
//! MATCH (generic_metrics_sets)
//! SELECT uniq(value) AS count BY project_id
//! WHERE org_id = 1 AND project_id IN (1, 2) AND tags_raw[5] = 'prod'
//! ORDER BY count DESC LIMIT 10 GRANULARITY 60
//! ```
//!
//! Comparisons and boolean operators become function calls (`equals`,
//! `and`, ...) so every later stage only has to deal with one node kind.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded},
    IResult, Parser,
};

use crate::{
    conditions::{binary_condition, AND, EQ, GT, GTE, IN, LT, LTE, NEQ, NOT_IN, OR, TUPLE},
    error::{QueryError, Result},
    expression::{Column, Expression, FunctionCall, Literal, SubscriptableReference},
    query::{OrderBy, OrderByDirection, Query, SelectedExpression},
};

const RESERVED: [&str; 17] = [
    "MATCH",
    "SELECT",
    "BY",
    "WHERE",
    "HAVING",
    "ORDER",
    "LIMIT",
    "OFFSET",
    "GRANULARITY",
    "AS",
    "AND",
    "OR",
    "NOT",
    "IN",
    "ASC",
    "DESC",
    "NULL",
];

/// Deepest parenthesis nesting accepted in a query.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse a full query.
pub fn parse_query(input: &str) -> Result<Query> {
    check_nesting(input)?;

    match query(input.trim()) {
        Ok((remaining, query)) if remaining.trim().is_empty() => Ok(query),
        Ok((remaining, _)) => Err(QueryError::parse(format!(
            "unexpected trailing input: '{}'",
            remaining.trim()
        ))),
        Err(e) => Err(QueryError::parse(format!("{e}"))),
    }
}

/// Parse a standalone expression, e.g. a condition.
pub fn parse_expression(input: &str) -> Result<Expression> {
    check_nesting(input)?;

    match expression(input.trim()) {
        Ok((remaining, expression)) if remaining.trim().is_empty() => Ok(expression),
        Ok((remaining, _)) => Err(QueryError::parse(format!(
            "unexpected trailing input: '{}'",
            remaining.trim()
        ))),
        Err(e) => Err(QueryError::parse(format!("{e}"))),
    }
}

/// Every level of recursion in the grammar opens a parenthesis, so bounding
/// the nesting bounds the parser's stack usage.
fn check_nesting(input: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (in_string, c) {
            (true, '\\') => {
                chars.next();
            }
            (true, '\'') => in_string = false,
            (true, _) => {}
            (false, '\'') => in_string = true,
            (false, '(') => {
                depth += 1;

                if depth > MAX_NESTING_DEPTH {
                    return Err(QueryError::parse("expression nested too deeply"));
                }
            }
            (false, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    Ok(())
}

fn query(input: &str) -> IResult<&str, Query> {
    let (input, _) = (keyword("MATCH"), multispace0, char('('), multispace0).parse(input)?;
    let (input, entity) = identifier(input)?;
    let (input, _) = (
        multispace0,
        char(')'),
        multispace1,
        keyword("SELECT"),
        multispace1,
    )
        .parse(input)?;

    let (input, selected_columns) = separated_list1(list_separator, selected).parse(input)?;

    let (input, groupby) = opt(preceded(
        (multispace1, keyword("BY"), multispace1),
        separated_list1(list_separator, expression),
    ))
    .parse(input)?;

    let (input, condition) =
        opt(preceded((multispace1, keyword("WHERE"), multispace1), expression)).parse(input)?;

    let (input, having) =
        opt(preceded((multispace1, keyword("HAVING"), multispace1), expression)).parse(input)?;

    let (input, order_by) = opt(preceded(
        (
            multispace1,
            keyword("ORDER"),
            multispace1,
            keyword("BY"),
            multispace1,
        ),
        separated_list1(list_separator, order_by),
    ))
    .parse(input)?;

    let (input, limit) =
        opt(preceded((multispace1, keyword("LIMIT"), multispace1), unsigned)).parse(input)?;

    let (input, offset) =
        opt(preceded((multispace1, keyword("OFFSET"), multispace1), unsigned)).parse(input)?;

    let (input, granularity) = opt(preceded(
        (multispace1, keyword("GRANULARITY"), multispace1),
        unsigned,
    ))
    .parse(input)?;

    Ok((
        input,
        Query {
            entity: entity.to_owned(),
            selected_columns,
            groupby: groupby.unwrap_or_default(),
            condition,
            having,
            order_by: order_by.unwrap_or_default(),
            limit,
            offset,
            granularity,
        },
    ))
}

fn selected(input: &str) -> IResult<&str, SelectedExpression> {
    let (input, expression) = expression(input)?;
    let (input, name) =
        opt(preceded((multispace1, keyword("AS"), multispace1), identifier)).parse(input)?;

    Ok((
        input,
        SelectedExpression::new(name.map(|name| name.to_owned()), expression),
    ))
}

fn order_by(input: &str) -> IResult<&str, OrderBy> {
    let (input, expression) = expression(input)?;
    let (input, direction) = opt(preceded(
        multispace1,
        alt((
            value(OrderByDirection::Asc, keyword("ASC")),
            value(OrderByDirection::Desc, keyword("DESC")),
        )),
    ))
    .parse(input)?;

    Ok((
        input,
        OrderBy {
            direction: direction.unwrap_or(OrderByDirection::Asc),
            expression,
        },
    ))
}

fn expression(input: &str) -> IResult<&str, Expression> {
    or_condition(input)
}

fn or_condition(input: &str) -> IResult<&str, Expression> {
    let (input, first) = and_condition(input)?;
    let (input, rest) =
        many0(preceded((multispace1, keyword("OR"), multispace0), and_condition)).parse(input)?;

    Ok((input, fold_binary(OR, first, rest)))
}

fn and_condition(input: &str) -> IResult<&str, Expression> {
    let (input, first) = comparison(input)?;
    let (input, rest) =
        many0(preceded((multispace1, keyword("AND"), multispace0), comparison)).parse(input)?;

    Ok((input, fold_binary(AND, first, rest)))
}

fn fold_binary(function_name: &str, first: Expression, rest: Vec<Expression>) -> Expression {
    rest.into_iter().fold(first, |acc, expression| {
        binary_condition(function_name, acc, expression)
    })
}

fn comparison(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = operand(input)?;
    let (input, rhs) = opt(alt((
        (multispace0, comparison_operator, multispace0, operand)
            .map(|(_, function_name, _, rhs)| (function_name, rhs)),
        (
            multispace1,
            opt((keyword("NOT"), multispace1)),
            keyword("IN"),
            multispace0,
            tuple,
        )
            .map(|(_, not, _, _, rhs)| (if not.is_some() { NOT_IN } else { IN }, rhs)),
    )))
    .parse(input)?;

    let expression = match rhs {
        Some((function_name, rhs)) => binary_condition(function_name, lhs, rhs),
        None => lhs,
    };

    Ok((input, expression))
}

fn comparison_operator(input: &str) -> IResult<&str, &'static str> {
    alt((
        value(LTE, tag("<=")),
        value(GTE, tag(">=")),
        value(NEQ, tag("!=")),
        value(NEQ, tag("<>")),
        value(EQ, tag("=")),
        value(LT, tag("<")),
        value(GT, tag(">")),
    ))
    .parse(input)
}

fn operand(input: &str) -> IResult<&str, Expression> {
    alt((
        literal.map(Expression::Literal),
        function_call,
        subscriptable,
        identifier.map(|name| Expression::Column(Column::new(name))),
        delimited((char('('), multispace0), expression, (multispace0, char(')'))),
    ))
    .parse(input)
}

fn tuple(input: &str) -> IResult<&str, Expression> {
    delimited(
        (char('('), multispace0),
        separated_list0(list_separator, expression),
        (multispace0, char(')')),
    )
    .map(|items| Expression::function(TUPLE, items))
    .parse(input)
}

fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, function_name) = identifier(input)?;
    let (input, parameters) = delimited(
        (multispace0, char('('), multispace0),
        separated_list0(list_separator, expression),
        (multispace0, char(')')),
    )
    .parse(input)?;

    Ok((
        input,
        Expression::FunctionCall(FunctionCall {
            function_name: function_name.to_owned(),
            parameters,
        }),
    ))
}

fn subscriptable(input: &str) -> IResult<&str, Expression> {
    let (input, column_name) = identifier(input)?;
    let (input, key) = delimited(
        (char('['), multispace0),
        literal,
        (multispace0, char(']')),
    )
    .parse(input)?;

    Ok((
        input,
        Expression::SubscriptableReference(SubscriptableReference {
            column: Column::new(column_name),
            key,
        }),
    ))
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        string_literal,
        number,
        value(Literal::Null, keyword("NULL")),
        value(Literal::Bool(true), keyword("true")),
        value(Literal::Bool(false), keyword("false")),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Literal> {
    let (rest, text) =
        recognize((opt(char('-')), digit1, opt((char('.'), digit1)))).parse(input)?;

    let literal = if text.contains('.') {
        text.parse::<f64>().map(Literal::Float).ok()
    } else {
        text.parse::<i64>()
            .map(Literal::Int)
            .or_else(|_| text.parse::<u64>().map(Literal::UInt))
            .ok()
    };

    match literal {
        Some(literal) if !rest.starts_with(is_identifier_char) => Ok((rest, literal)),
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
    }
}

fn string_literal(input: &str) -> IResult<&str, Literal> {
    let (body, _) = char('\'').parse(input)?;
    let mut value = String::new();
    let mut chars = body.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '\'' => return Ok((&body[pos + 1..], Literal::String(value))),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

fn unsigned(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>()).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    let (rest, name) = recognize((
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ))
    .parse(input)?;

    if RESERVED.iter().any(|word| word.eq_ignore_ascii_case(name)) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }

    Ok((rest, name))
}

fn keyword<'a>(word: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag_no_case(word).parse(input)?;

        if rest.starts_with(is_identifier_char) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }

        Ok((rest, matched))
    }
}

fn list_separator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0).parse(input)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}
