use vigil_query::{
    parse_query, Expression, FunctionNameMapper, Literal, OrderByDirection, QueryError,
    SubscriptableMapper, TranslationMappers,
};

#[test]
fn parse_full_query() {
    let query = parse_query(
        r#"
        MATCH (generic_metrics_sets)
        SELECT uniq(value) AS count, max(value)
        BY project_id, tags_raw[3]
        WHERE org_id = 1 AND project_id IN (1, 2) AND metric_id = 7
        HAVING count > 10
        ORDER BY count DESC, project_id
        LIMIT 100 OFFSET 5 GRANULARITY 3600
        "#,
    )
    .unwrap();

    assert_eq!(query.entity, "generic_metrics_sets");
    assert_eq!(query.selected_columns.len(), 2);
    assert_eq!(query.selected_columns[0].name.as_deref(), Some("count"));
    assert_eq!(query.selected_columns[1].name, None);
    assert_eq!(query.groupby.len(), 2);
    assert!(query.having.is_some());
    assert_eq!(query.order_by.len(), 2);
    assert_eq!(query.order_by[0].direction, OrderByDirection::Desc);
    assert_eq!(query.order_by[1].direction, OrderByDirection::Asc);
    assert_eq!(query.limit, Some(100));
    assert_eq!(query.offset, Some(5));
    assert_eq!(query.granularity, Some(3600));
    assert_eq!(
        query.columns_referenced_in_conditions().into_iter().collect::<Vec<_>>(),
        vec!["metric_id", "org_id", "project_id"]
    );
}

#[test]
fn format_query() {
    let query = parse_query(
        "MATCH (events) SELECT count() AS count BY project_id WHERE project_id = 1 AND type != 'transaction' LIMIT 10",
    )
    .unwrap();

    assert_eq!(
        query.to_string(),
        "SELECT count() AS count FROM events WHERE and(equals(project_id, 1), notEquals(type, 'transaction')) GROUP BY project_id LIMIT 10"
    );
}

#[test]
fn parse_errors() {
    for input in [
        "SELECT count() FROM events",
        "MATCH (events) SELECT",
        "MATCH (events) SELECT count() WHERE",
        "MATCH (events) SELECT count() AS select",
        "MATCH (events) SELECT count() LIMIT ten",
    ] {
        assert!(
            matches!(parse_query(input), Err(QueryError::Parse(_))),
            "{input} should not parse"
        );
    }
}

#[test]
fn subscriptable_filter_becomes_nested_key_value_lookup() {
    let mut query =
        parse_query("MATCH (generic_metrics_sets) SELECT uniq(value) AS count WHERE tags_raw[5] = 10")
            .unwrap();

    TranslationMappers::new()
        .subscriptable(SubscriptableMapper::new("tags_raw", "tags", "raw_value"))
        .translate(&mut query);

    let condition = query.condition.unwrap();
    let call = condition.as_function().unwrap();
    let lookup = call.parameters[0].as_function().unwrap();
    let index = lookup.parameters[1].as_function().unwrap();

    assert_eq!(call.function_name, "equals");
    assert_eq!(call.parameters[1], Expression::Literal(Literal::Int(10)));
    assert_eq!(lookup.function_name, "arrayElement");
    assert_eq!(lookup.parameters[0].to_string(), "tags.raw_value");
    assert_eq!(index.parameters[0].to_string(), "tags.key");
    assert_eq!(index.parameters[1], Expression::Literal(Literal::Int(5)));
    assert_eq!(
        condition.to_string(),
        "equals(arrayElement(tags.raw_value, indexOf(tags.key, 5)), 10)"
    );
}

#[test]
fn function_translation_is_not_reapplied() {
    let mappers = TranslationMappers::new()
        .function(FunctionNameMapper::new("uniq", "uniqCombined64Merge"));

    let mut query =
        parse_query("MATCH (generic_metrics_sets) SELECT uniq(value) AS count WHERE project_id = 1")
            .unwrap();

    mappers.translate(&mut query);
    let once = query.clone();
    mappers.translate(&mut query);

    assert_eq!(query, once);
    assert_eq!(
        query.selected_columns[0].expression.to_string(),
        "uniqCombined64Merge(value)"
    );
}
