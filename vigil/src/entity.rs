//! Declarative entity definitions.
//!
//! A definition is a JSON document:
//!
//! ```json
//! {
//!   "version": "v1",
//!   "kind": "entity",
//!   "name": "generic_metrics_sets",
//!   "schema": [
//!     { "name": "org_id", "type": "UInt", "args": { "size": 64 } },
//!     { "name": "tags", "type": "Nested", "args": { "subcolumns": [
//!       { "name": "key", "type": "UInt", "args": { "size": 64 } },
//!       { "name": "raw_value", "type": "String" }
//!     ] } }
//!   ],
//!   "readable_storage": "generic_metrics_sets",
//!   "query_processors": [
//!     { "processor": "organization_rate_limiter",
//!       "args": { "org_column": "org_id", "limit": 100, "window_secs": 60 } }
//!   ],
//!   "translation_mappers": {
//!     "functions": [
//!       { "mapper": "function_name_mapper",
//!         "args": { "from_name": "uniq", "to_name": "uniqCombined64Merge" } }
//!     ],
//!     "subscriptables": [
//!       { "mapper": "subscriptable_mapper",
//!         "args": { "from_column_name": "tags_raw", "to_nested_col_name": "tags",
//!                   "value_subcolumn_name": "raw_value" } }
//!     ]
//!   },
//!   "validators": [
//!     { "validator": "entity_required_column_validator",
//!       "args": { "required_filter_columns": ["org_id"] } }
//!   ],
//!   "required_time_column": "timestamp"
//! }
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use vigil_query::{
    EntityRequiredColumnValidator, FunctionNameMapper, GranularityMapper, SubscriptableMapper,
    TranslationMappers,
};

use crate::{
    config::VigilConfig,
    error::{Error, Result},
    pipeline::QueryPipeline,
    processors::{
        MappedGranularityProcessor, OrganizationRateLimit, ProjectRateLimit, RateLimit,
        RateLimiter, ResourceQuota, TagsTypeTransformer, TimeSeriesProcessor,
    },
};

pub const ENTITY_VERSION: &str = "v1";
pub const ENTITY_KIND: &str = "entity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ColumnKind {
    UInt,
    Int,
    Float,
    String,
    DateTime,
    Array,
    Nested,
    AggregateFunction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColumnArgs {
    #[serde(default)]
    pub size: Option<u8>,
    #[serde(default)]
    pub subcolumns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub schema_modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    #[serde(default)]
    pub args: ColumnArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "processor", content = "args", rename_all = "snake_case")]
pub enum ProcessorDefinition {
    TimeSeriesProcessor(TimeSeriesProcessor),
    TagsTypeTransformer,
    MappedGranularityProcessor(GranularityMapper),
    ReferrerRateLimiter(RateLimit),
    OrganizationRateLimiter(OrganizationRateLimit),
    ProjectReferrerRateLimiter(ProjectRateLimit),
    ProjectRateLimiter(ProjectRateLimit),
    ResourceQuotaProcessor(ResourceQuota),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mapper", content = "args", rename_all = "snake_case")]
pub enum FunctionMapperDefinition {
    FunctionNameMapper(FunctionNameMapper),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mapper", content = "args", rename_all = "snake_case")]
pub enum SubscriptableMapperDefinition {
    SubscriptableMapper(SubscriptableMapper),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranslationMapperDefinitions {
    #[serde(default)]
    pub functions: Vec<FunctionMapperDefinition>,
    #[serde(default)]
    pub subscriptables: Vec<SubscriptableMapperDefinition>,
}

impl TranslationMapperDefinitions {
    fn to_mappers(&self) -> TranslationMappers {
        let mappers = self
            .functions
            .iter()
            .fold(TranslationMappers::new(), |mappers, definition| match definition {
                FunctionMapperDefinition::FunctionNameMapper(mapper) => {
                    mappers.function(mapper.clone())
                }
            });

        self.subscriptables
            .iter()
            .fold(mappers, |mappers, definition| match definition {
                SubscriptableMapperDefinition::SubscriptableMapper(mapper) => {
                    mappers.subscriptable(mapper.clone())
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "validator", content = "args", rename_all = "snake_case")]
pub enum ValidatorDefinition {
    EntityRequiredColumnValidator(EntityRequiredColumnValidator),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityDefinition {
    pub version: String,
    pub kind: String,
    pub name: String,
    pub schema: Vec<ColumnDefinition>,
    pub readable_storage: String,
    #[serde(default)]
    pub writable_storage: Option<String>,
    #[serde(default)]
    pub query_processors: Vec<ProcessorDefinition>,
    #[serde(default)]
    pub translation_mappers: TranslationMapperDefinitions,
    #[serde(default)]
    pub validators: Vec<ValidatorDefinition>,
    pub required_time_column: String,
    /// Subscription partitions, defaults to the configured number.
    #[serde(default)]
    pub partitions_number: Option<u16>,
}

impl EntityDefinition {
    pub fn from_json(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|e| Error::configuration(format!("malformed entity definition: {e}")))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.schema.iter().find(|column| column.name == name)
    }

    fn require_column(&self, name: &str, used_by: &str) -> Result<()> {
        match self.column(name) {
            Some(_) => Ok(()),
            None => Err(self.error(format!("{used_by} references unknown column {name}"))),
        }
    }

    fn error(&self, message: impl AsRef<str>) -> Error {
        Error::configuration(format!("entity {}: {}", self.name, message.as_ref()))
    }

    /// Checks the definition is consistent with its own schema.
    pub fn validate(&self) -> Result<()> {
        if self.version != ENTITY_VERSION {
            return Err(self.error(format!("unsupported version {}", self.version)));
        }

        if self.kind != ENTITY_KIND {
            return Err(self.error(format!("unsupported kind {}", self.kind)));
        }

        let mut names = HashSet::new();
        if let Some(column) = self.schema.iter().find(|column| !names.insert(&column.name)) {
            return Err(self.error(format!("duplicate column {}", column.name)));
        }

        self.require_column(&self.required_time_column, "required_time_column")?;

        if self.partitions_number == Some(0) {
            return Err(self.error("partitions_number must be greater than zero"));
        }

        for definition in self.translation_mappers.subscriptables.iter() {
            let SubscriptableMapperDefinition::SubscriptableMapper(mapper) = definition;
            self.validate_subscriptable(mapper)?;
        }

        for definition in self.query_processors.iter() {
            self.validate_processor(definition)?;
        }

        for definition in self.validators.iter() {
            let ValidatorDefinition::EntityRequiredColumnValidator(validator) = definition;

            for column in validator.required_filter_columns.iter() {
                self.require_column(column, "entity_required_column_validator")?;
            }
        }

        Ok(())
    }

    fn validate_subscriptable(&self, mapper: &SubscriptableMapper) -> Result<()> {
        let Some(nested) = self.column(&mapper.to_nested_col_name) else {
            return Err(self.error(format!(
                "subscriptable mapper targets unknown column {}",
                mapper.to_nested_col_name
            )));
        };

        if nested.kind != ColumnKind::Nested {
            return Err(self.error(format!(
                "subscriptable mapper target {} is not a nested column",
                nested.name
            )));
        }

        for subcolumn in ["key", mapper.value_subcolumn_name.as_str()] {
            if !nested.args.subcolumns.iter().any(|column| column.name == subcolumn) {
                return Err(self.error(format!(
                    "nested column {} has no {subcolumn} subcolumn",
                    nested.name
                )));
            }
        }

        Ok(())
    }

    fn validate_processor(&self, definition: &ProcessorDefinition) -> Result<()> {
        let window_secs = match definition {
            ProcessorDefinition::TimeSeriesProcessor(processor) => {
                for column in processor
                    .time_group_columns
                    .values()
                    .chain(processor.time_parse_columns.iter())
                {
                    self.require_column(column, "time_series_processor")?;
                }

                None
            }
            ProcessorDefinition::TagsTypeTransformer => None,
            ProcessorDefinition::MappedGranularityProcessor(mapper) => {
                let default = mapper.default_granularity();

                if !mapper.accepted_granularities().values().any(|code| *code == default) {
                    return Err(self.error(format!(
                        "default granularity {default} is not an accepted granularity"
                    )));
                }

                None
            }
            ProcessorDefinition::ReferrerRateLimiter(args) => Some(args.window_secs),
            ProcessorDefinition::OrganizationRateLimiter(args) => {
                self.require_column(&args.org_column, "organization_rate_limiter")?;
                Some(args.window_secs)
            }
            ProcessorDefinition::ProjectReferrerRateLimiter(args) => {
                self.require_column(&args.project_column, "project_referrer_rate_limiter")?;
                Some(args.window_secs)
            }
            ProcessorDefinition::ProjectRateLimiter(args) => {
                self.require_column(&args.project_column, "project_rate_limiter")?;
                Some(args.window_secs)
            }
            ProcessorDefinition::ResourceQuotaProcessor(args) => {
                if let Some(column) = args.project_column.as_deref() {
                    self.require_column(column, "resource_quota_processor")?;
                }
                Some(args.window_secs)
            }
        };

        if window_secs == Some(0) {
            return Err(self.error("rate limiter window must be greater than zero"));
        }

        Ok(())
    }

    /// Validates the definition and assembles its pipeline.
    pub fn build(self, config: &VigilConfig) -> Result<Entity> {
        self.validate()?;

        let mut pipeline = QueryPipeline::new(self.translation_mappers.to_mappers());

        for definition in self.validators.iter() {
            let ValidatorDefinition::EntityRequiredColumnValidator(validator) = definition;
            pipeline = pipeline.validator(validator.clone());
        }

        for definition in self.query_processors.iter() {
            pipeline = match definition.clone() {
                ProcessorDefinition::TimeSeriesProcessor(processor) => pipeline.processor(processor),
                ProcessorDefinition::TagsTypeTransformer => pipeline.processor(TagsTypeTransformer),
                ProcessorDefinition::MappedGranularityProcessor(mapper) => {
                    pipeline.processor(MappedGranularityProcessor::new(mapper))
                }
                ProcessorDefinition::ReferrerRateLimiter(args) => {
                    pipeline.processor(RateLimiter::referrer(args))
                }
                ProcessorDefinition::OrganizationRateLimiter(args) => {
                    pipeline.processor(RateLimiter::organization(args))
                }
                ProcessorDefinition::ProjectReferrerRateLimiter(args) => {
                    pipeline.processor(RateLimiter::project_referrer(args))
                }
                ProcessorDefinition::ProjectRateLimiter(args) => {
                    pipeline.processor(RateLimiter::project(args))
                }
                ProcessorDefinition::ResourceQuotaProcessor(args) => {
                    pipeline.processor(RateLimiter::resource_quota(args))
                }
            }
            .map_err(|e| match e {
                Error::Configuration(message) => self.error(message),
                other => other,
            })?;
        }

        info!(
            "loaded entity {} with processors {:?}",
            self.name,
            pipeline.processor_names()
        );

        Ok(Entity {
            partitions_number: self.partitions_number.unwrap_or(config.partitions_number),
            definition: self,
            pipeline,
        })
    }
}

/// A loaded entity: its definition and the pipeline built from it.
pub struct Entity {
    definition: EntityDefinition,
    partitions_number: u16,
    pipeline: QueryPipeline,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub fn required_time_column(&self) -> &str {
        &self.definition.required_time_column
    }

    pub fn partitions_number(&self) -> u16 {
        self.partitions_number
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }
}
