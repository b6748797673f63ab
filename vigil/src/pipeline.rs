use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use vigil_query::{Query, QueryValidator, TranslationMappers};
use vigil_store::SubscriptionData;

use crate::{
    context::RequestContext,
    error::{Error, Result},
    processor::{ProcessorKind, QueryProcessor},
    registry::EntityRegistry,
};

/// A translated query ready for the external executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendQuery {
    pub query: Query,
    pub sql: String,
}

/// The ordered stages a query of one entity goes through.
///
/// `run` executes validators, then rewriting processors in the order they
/// were added, then translation, then admission control. Admission
/// processors must be added after every rewriting processor and in
/// [`crate::processors::LimiterScope`] order. The first failing stage aborts
/// the run.
#[derive(Default)]
pub struct QueryPipeline {
    validators: Vec<Box<dyn QueryValidator>>,
    rewriters: Vec<Box<dyn QueryProcessor>>,
    mappers: TranslationMappers,
    limiters: Vec<Box<dyn QueryProcessor>>,
}

impl QueryPipeline {
    pub fn new(mappers: TranslationMappers) -> Self {
        Self {
            mappers,
            ..Default::default()
        }
    }

    pub fn validator<V: QueryValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn processor<P: QueryProcessor + 'static>(mut self, processor: P) -> Result<Self> {
        let ProcessorKind::Admission(scope) = processor.kind() else {
            if let Some(limiter) = self.limiters.first() {
                return Err(Error::configuration(format!(
                    "{} must run before {}",
                    processor.name(),
                    limiter.name()
                )));
            }

            self.rewriters.push(Box::new(processor));

            return Ok(self);
        };

        if let Some(previous) = self.limiters.last() {
            if let ProcessorKind::Admission(previous_scope) = previous.kind() {
                if previous_scope > scope {
                    return Err(Error::configuration(format!(
                        "{} must run before {}",
                        processor.name(),
                        previous.name()
                    )));
                }
            }
        }

        self.limiters.push(Box::new(processor));

        Ok(self)
    }

    pub fn mappers(&self) -> &TranslationMappers {
        &self.mappers
    }

    /// Names of the processors in execution order.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.rewriters
            .iter()
            .chain(self.limiters.iter())
            .map(|processor| processor.name())
            .collect()
    }

    pub fn validate(&self, query: &Query) -> Result<()> {
        for validator in self.validators.iter() {
            debug!("{} on {}", validator.name(), query.entity);
            validator.validate(query)?;
        }

        Ok(())
    }

    pub async fn run(&self, mut query: Query, ctx: &RequestContext) -> Result<BackendQuery> {
        self.validate(&query)?;

        for processor in self.rewriters.iter() {
            debug!("{} on {}", processor.name(), query.entity);
            processor.process(&mut query, ctx).await?;
        }

        self.mappers.translate(&mut query);

        for processor in self.limiters.iter() {
            debug!("{} on {}", processor.name(), query.entity);
            processor.process(&mut query, ctx).await?;
        }

        let sql = query.to_string();

        Ok(BackendQuery { query, sql })
    }
}

/// Builds the query of `subscription` at `timestamp` and runs it through the
/// pipeline of its entity. The subscription's project and organization fill
/// the context when the caller did not set them.
pub async fn evaluate(
    registry: &EntityRegistry,
    subscription: &SubscriptionData,
    timestamp: DateTime<Utc>,
    ctx: &RequestContext,
) -> Result<BackendQuery> {
    let entity = registry.get(subscription.entity_subscription.entity_key())?;
    let query = subscription.build_query(timestamp, entity.required_time_column())?;

    let mut ctx = ctx.clone();
    ctx.project_id = ctx.project_id.or(Some(subscription.project_id));
    ctx.organization_id = ctx
        .organization_id
        .or(subscription.entity_subscription.organization());

    entity.pipeline().run(query, &ctx).await
}
