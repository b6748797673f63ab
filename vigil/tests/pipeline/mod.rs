use chrono::{DateTime, TimeZone, Utc};
use vigil::{
    config::VigilConfig, evaluate, processors::LimiterScope, vigil_query::QueryError,
    vigil_query::parse_query, vigil_store::EntitySubscription, vigil_store::SubscriptionData,
    CounterStore, EntityRegistry, Error, RequestContext,
};

pub const FIXTURES: &str = "tests/fixtures/entities";

/// Start of a minute, so every limiter window of the fixtures begins here.
pub fn window() -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_564_800, 0).unwrap()
}

pub fn registry() -> EntityRegistry {
    EntityRegistry::from_dir(FIXTURES, &VigilConfig::default()).unwrap()
}

fn sets(project_id: u64, organization: u64) -> SubscriptionData {
    SubscriptionData::new(
        project_id,
        "MATCH (generic_metrics_sets) SELECT uniq(value) AS count \
         WHERE metric_id = 7 AND tags[5] = '10' GRANULARITY 3600",
        600,
        60,
        EntitySubscription::GenericMetricsSets { organization },
    )
}

pub async fn test_end_to_end(counters: &CounterStore) -> anyhow::Result<()> {
    let registry = registry();
    let ctx = RequestContext::new(counters.clone())
        .referrer("subscriptions_executor")
        .at(window());

    let backend = evaluate(&registry, &sets(101, 201), window(), &ctx).await?;

    assert!(backend
        .sql
        .starts_with("SELECT uniqCombined64Merge(value) AS count FROM generic_metrics_sets WHERE "));
    for fragment in [
        "equals(metric_id, 7)",
        "equals(arrayElement(tags.indexed_value, indexOf(tags.key, 5)), 10)",
        "equals(project_id, 101)",
        "equals(org_id, 201)",
        "greaterOrEquals(timestamp, toDateTime('2024-05-01T11:50:00', 'Universal'))",
        "less(timestamp, toDateTime('2024-05-01T12:00:00', 'Universal'))",
        "equals(granularity, 2)",
    ] {
        assert!(backend.sql.contains(fragment), "{fragment} not in {}", backend.sql);
    }

    assert_eq!(backend.sql, backend.query.to_string());
    assert_eq!(
        counters
            .read(&format!("organization:201:{}", window().timestamp()))
            .await?,
        1
    );
    assert_eq!(
        counters
            .read(&format!(
                "project_referrer:101:subscriptions_executor:{}",
                window().timestamp()
            ))
            .await?,
        1
    );
    assert_eq!(
        counters
            .read(&format!("resource_quota:101:{}", window().timestamp()))
            .await?,
        1
    );

    Ok(())
}

pub async fn test_limiter_order(counters: &CounterStore) -> anyhow::Result<()> {
    let registry = registry();
    let ctx = RequestContext::new(counters.clone()).at(window());
    let data = sets(102, 202);

    evaluate(&registry, &data, window(), &ctx).await?;

    match evaluate(&registry, &data, window(), &ctx).await {
        Err(Error::RateLimitExceeded {
            scope,
            key,
            current,
            limit,
            window,
        }) => {
            assert_eq!(scope, LimiterScope::Organization);
            assert_eq!(key, "202");
            assert_eq!(current, 2);
            assert_eq!(limit, 1);
            assert_eq!(window, 60);
        }
        other => anyhow::bail!("expected an organization rejection, got {other:?}"),
    }

    assert_eq!(
        counters
            .read(&format!("project:102:{}", window().timestamp()))
            .await?,
        1
    );
    assert!(Error::RateLimitExceeded {
        scope: LimiterScope::Organization,
        key: "202".to_owned(),
        current: 2,
        limit: 1,
        window: 60,
    }
    .is_retryable());

    Ok(())
}

pub async fn test_missing_filter_before_admission(counters: &CounterStore) -> anyhow::Result<()> {
    let registry = registry();
    let ctx = RequestContext::new(counters.clone())
        .referrer("missing_filter")
        .project(103)
        .at(window());

    let query = parse_query("MATCH (events) SELECT count() AS count WHERE type = 'error'")?;

    match registry.get("events")?.pipeline().run(query, &ctx).await {
        Err(Error::Query(QueryError::MissingRequiredFilter { columns })) => {
            assert_eq!(columns, vec!["project_id".to_owned()]);
        }
        other => anyhow::bail!("expected a missing filter, got {other:?}"),
    }

    assert_eq!(
        counters
            .read(&format!("referrer:missing_filter:{}", window().timestamp()))
            .await?,
        0
    );
    assert_eq!(
        counters
            .read(&format!("project:103:{}", window().timestamp()))
            .await?,
        0
    );

    Ok(())
}

pub async fn test_window_boundary(counters: &CounterStore) -> anyhow::Result<()> {
    let registry = registry();
    let pipeline = registry.get("events")?.pipeline();
    let query = parse_query(
        "MATCH (events) SELECT count() AS count BY time WHERE project_id = 104 GRANULARITY 60",
    )?;

    let start = RequestContext::new(counters.clone()).at(window());
    let last_second = start
        .clone()
        .at(window() + chrono::Duration::seconds(59));
    let next_window = start
        .clone()
        .at(window() + chrono::Duration::seconds(60));

    let backend = pipeline.run(query.clone(), &start).await?;
    assert_eq!(
        backend.query.groupby[0].to_string(),
        "toStartOfMinute(timestamp, 'Universal')"
    );

    pipeline.run(query.clone(), &last_second).await?;

    assert!(matches!(
        pipeline.run(query.clone(), &last_second).await,
        Err(Error::RateLimitExceeded {
            scope: LimiterScope::Project,
            current: 3,
            limit: 2,
            ..
        })
    ));

    pipeline.run(query, &next_window).await?;

    assert_eq!(
        counters
            .read(&format!("project:104:{}", window().timestamp()))
            .await?,
        3
    );
    assert_eq!(
        counters
            .read(&format!("project:104:{}", window().timestamp() + 60))
            .await?,
        1
    );

    Ok(())
}

pub async fn test_expire(counters: &CounterStore) -> anyhow::Result<()> {
    let old = Utc.timestamp_opt(60, 0).unwrap();
    let recent = window() + chrono::Duration::seconds(60);

    counters.increment("expire:old", old).await?;
    counters.increment("expire:recent", recent).await?;

    assert!(counters.expire(window()).await? >= 1);
    assert_eq!(counters.read("expire:old").await?, 0);
    assert_eq!(counters.read("expire:recent").await?, 1);

    Ok(())
}

pub async fn test_long_referrer(counters: &CounterStore) -> anyhow::Result<()> {
    let registry = registry();
    let referrer = "alerts.".repeat(200);
    let ctx = RequestContext::new(counters.clone())
        .referrer(referrer.clone())
        .at(window());
    let query = parse_query("MATCH (events) SELECT count() AS count WHERE project_id = 105")?;

    registry.get("events")?.pipeline().run(query, &ctx).await?;

    assert_eq!(
        counters
            .read(&format!("referrer:{referrer}:{}", window().timestamp()))
            .await?,
        1
    );

    Ok(())
}
