use futures_util::{future::join_all, TryStreamExt};
use std::collections::HashSet;
use vigil_store::{
    count_per_partition, list_per_partition, EntitySubscription, PartitionId, Store, StoreError,
    SubscriptionCreator, SubscriptionData, SubscriptionDeleter,
};

pub mod faulty;

const PARTITIONS: u16 = 8;

fn events(project_id: u64) -> SubscriptionData {
    SubscriptionData::new(
        project_id,
        "MATCH (events) SELECT count() AS count WHERE type = 'error'",
        3600,
        60,
        EntitySubscription::Events,
    )
}

fn sets(project_id: u64, organization: u64) -> SubscriptionData {
    SubscriptionData::new(
        project_id,
        "MATCH (generic_metrics_sets) SELECT uniq(value) AS count WHERE metric_id = 4",
        600,
        60,
        EntitySubscription::GenericMetricsSets { organization },
    )
}

pub async fn test_round_trip(store: &Store) -> anyhow::Result<()> {
    let creator = SubscriptionCreator::new(store.partitioned("events"), PARTITIONS);
    let data = events(42);

    let identifier = creator.create(data.clone()).await?;

    assert_eq!(identifier.partition, PartitionId::for_project(42, PARTITIONS)?);
    assert_eq!(
        store
            .partitioned("events")
            .get_by_identifier(&identifier)
            .await?,
        Some(data)
    );

    let parsed = identifier.to_string().parse()?;
    assert_eq!(identifier, parsed);

    Ok(())
}

pub async fn test_missing_entries(store: &Store) -> anyhow::Result<()> {
    let partitioned = store.partitioned("events");
    let identifier = SubscriptionCreator::new(partitioned.clone(), PARTITIONS)
        .create(events(1))
        .await?;

    assert_eq!(
        partitioned
            .get(identifier.partition, uuid::Uuid::new_v4())
            .await?,
        None
    );
    assert_eq!(
        store
            .partitioned("transactions")
            .get(identifier.partition, identifier.key)
            .await?,
        None
    );

    Ok(())
}

pub async fn test_set_overwrites(store: &Store) -> anyhow::Result<()> {
    let partitioned = store.partitioned("events");
    let identifier = SubscriptionCreator::new(partitioned.clone(), PARTITIONS)
        .create(events(7))
        .await?;

    let updated = SubscriptionData {
        resolution_sec: 120,
        ..events(7)
    };

    partitioned
        .set(identifier.partition, identifier.key, &updated)
        .await?;
    partitioned
        .set(identifier.partition, identifier.key, &updated)
        .await?;

    assert_eq!(
        partitioned.get_by_identifier(&identifier).await?,
        Some(updated)
    );

    Ok(())
}

pub async fn test_all_and_delete(store: &Store) -> anyhow::Result<()> {
    let partitioned = store.partitioned("generic_metrics_sets").page_size(2);
    let creator = SubscriptionCreator::new(partitioned.clone(), PARTITIONS);
    let partition = PartitionId::for_project(5, PARTITIONS)?;

    let mut identifiers = Vec::new();

    for expected in 1..=5 {
        identifiers.push(creator.create(sets(5, 1)).await?);

        let live = partitioned.all(partition).try_collect::<Vec<_>>().await?;
        assert!(live.len() >= expected);
    }

    let live = partitioned.all(partition).try_collect::<Vec<_>>().await?;
    let keys = live
        .iter()
        .map(|subscription| subscription.identifier)
        .collect::<HashSet<_>>();

    assert_eq!(keys.len(), live.len());
    for identifier in identifiers.iter() {
        assert!(keys.contains(identifier));
    }

    let deleter = SubscriptionDeleter::new(partitioned.clone());
    deleter.delete(&identifiers[2]).await?;
    deleter.delete(&identifiers[2]).await?;

    let live = partitioned.all(partition).try_collect::<Vec<_>>().await?;
    assert!(live
        .iter()
        .all(|subscription| subscription.identifier != identifiers[2]));
    assert_eq!(partitioned.get_by_identifier(&identifiers[2]).await?, None);

    Ok(())
}

pub async fn test_enumeration(store: &Store) -> anyhow::Result<()> {
    let partitioned = store.partitioned("events").page_size(3);
    let creator = SubscriptionCreator::new(partitioned.clone(), PARTITIONS);

    for project_id in 0..20 {
        creator.create(events(project_id)).await?;
    }

    let counts = count_per_partition(&partitioned, PARTITIONS).await?;
    let lists = list_per_partition(&partitioned, PARTITIONS).await?;

    assert_eq!(counts.len(), usize::from(PARTITIONS));
    assert_eq!(counts.iter().map(|(_, count)| count).sum::<usize>(), 20);

    for ((partition, count), (listed_partition, subscriptions)) in counts.iter().zip(lists.iter()) {
        assert_eq!(partition, listed_partition);
        assert_eq!(*count, subscriptions.len());

        for subscription in subscriptions {
            assert_eq!(subscription.identifier.partition, *partition);
            assert_eq!(
                PartitionId::for_project(subscription.data.project_id, PARTITIONS)?,
                *partition
            );
        }
    }

    Ok(())
}

pub async fn test_concurrency(store: &Store) -> anyhow::Result<()> {
    let creator = SubscriptionCreator::new(store.partitioned("generic_metrics_sets"), PARTITIONS);

    let identifiers = join_all((0..20).map(|_| creator.create(sets(11, 2))))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let unique = identifiers.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), identifiers.len());

    let partition = PartitionId::for_project(11, PARTITIONS)?;
    assert!(identifiers
        .iter()
        .all(|identifier| identifier.partition == partition));

    Ok(())
}

pub async fn test_invalid_subscriptions(store: &Store) -> anyhow::Result<()> {
    let events_creator = SubscriptionCreator::new(store.partitioned("events"), PARTITIONS);
    let sets_creator = SubscriptionCreator::new(store.partitioned("generic_metrics_sets"), PARTITIONS);

    let zero_window = SubscriptionData {
        time_window_sec: 0,
        ..events(1)
    };
    assert!(matches!(
        events_creator.create(zero_window).await,
        Err(StoreError::InvalidSubscription(_))
    ));

    assert!(matches!(
        events_creator.create(sets(1, 1)).await,
        Err(StoreError::EntityMismatch { .. })
    ));

    let with_having = SubscriptionData {
        query: "MATCH (generic_metrics_sets) SELECT uniq(value) AS count HAVING count > 1"
            .to_owned(),
        ..sets(1, 1)
    };
    assert!(matches!(
        sets_creator.create(with_having).await,
        Err(StoreError::Query(_))
    ));

    assert!(matches!(
        SubscriptionCreator::new(store.partitioned("events"), 0)
            .create(events(1))
            .await,
        Err(StoreError::NoPartitions)
    ));

    Ok(())
}
