//! Runtime defaults.
//!
//! Entity pipelines are configured through their declarative definitions, see
//! [`crate::EntityDefinition`]. The values here cover the subscription
//! registry and requests that carry no explicit caller information.

/// Defaults for subscription storage and request handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VigilConfig {
    /// Partitions of an entity whose definition does not set them
    pub partitions_number: u16,

    /// Subscriptions fetched per round trip while enumerating a partition
    pub page_size: u16,

    /// Keys drawn before a subscription creation gives up
    pub allocation_attempts: u8,

    /// Referrer of requests that do not name one
    pub referrer: String,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            partitions_number: DEFAULT_PARTITIONS_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            allocation_attempts: DEFAULT_ALLOCATION_ATTEMPTS,
            referrer: DEFAULT_REFERRER.to_owned(),
        }
    }
}

/// Default number of subscription partitions
///
/// Matches the partition count of the stream the subscriptions are evaluated
/// from. Changing it moves existing subscriptions to other partitions.
pub const DEFAULT_PARTITIONS_NUMBER: u16 = 64;

/// Default page size of partition enumeration
pub const DEFAULT_PAGE_SIZE: u16 = vigil_store::DEFAULT_PAGE_SIZE;

/// Default number of identifier allocation attempts
///
/// Keys are random, a collision is already unlikely on the first attempt.
pub const DEFAULT_ALLOCATION_ATTEMPTS: u8 = vigil_store::DEFAULT_ALLOCATION_ATTEMPTS;

/// Default referrer of anonymous requests
pub const DEFAULT_REFERRER: &str = "<unknown>";

/// Configuration builder
#[derive(Debug)]
pub struct ConfigBuilder {
    config: VigilConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: VigilConfig::default(),
        }
    }

    pub fn partitions_number(mut self, partitions_number: u16) -> Self {
        self.config.partitions_number = partitions_number;
        self
    }

    pub fn page_size(mut self, page_size: u16) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn allocation_attempts(mut self, attempts: u8) -> Self {
        self.config.allocation_attempts = attempts;
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.config.referrer = referrer.into();
        self
    }

    pub fn build(self) -> VigilConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ConfigBuilder::new()
            .partitions_number(8)
            .page_size(10)
            .referrer("alerts")
            .build();

        assert_eq!(config.partitions_number, 8);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.allocation_attempts, DEFAULT_ALLOCATION_ATTEMPTS);
        assert_eq!(config.referrer, "alerts");
        assert_eq!(VigilConfig::default().partitions_number, DEFAULT_PARTITIONS_NUMBER);
    }
}
