use std::{collections::HashMap, fs, path::Path};
use tracing::info;

use crate::{
    config::VigilConfig,
    entity::{Entity, EntityDefinition},
    error::{Error, Result},
};

/// Every entity known to the process, built once at startup and read-only
/// afterwards. Share it by reference, or behind an `Arc`.
pub struct EntityRegistry {
    entities: HashMap<String, Entity>,
}

impl EntityRegistry {
    /// Builds every entity. Any invalid definition fails the whole registry.
    pub fn from_definitions<I>(definitions: I, config: &VigilConfig) -> Result<Self>
    where
        I: IntoIterator<Item = EntityDefinition>,
    {
        let mut entities = HashMap::new();

        for definition in definitions {
            if entities.contains_key(&definition.name) {
                return Err(Error::configuration(format!(
                    "entity {} is defined more than once",
                    definition.name
                )));
            }

            let entity = definition.build(config)?;
            entities.insert(entity.name().to_owned(), entity);
        }

        info!("entity registry loaded with {} entities", entities.len());

        Ok(Self { entities })
    }

    /// Loads every `*.json` definition of `dir`.
    pub fn from_dir(dir: impl AsRef<Path>, config: &VigilConfig) -> Result<Self> {
        let mut paths = fs::read_dir(dir.as_ref())?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;

        paths.retain(|path| path.extension().map(|ext| ext == "json").unwrap_or(false));
        paths.sort();

        let definitions = paths
            .iter()
            .map(|path| {
                let content = fs::read_to_string(path)?;

                EntityDefinition::from_json(&content).map_err(|e| match e {
                    Error::Configuration(message) => {
                        Error::configuration(format!("{}: {message}", path.display()))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_definitions(definitions, config)
    }

    pub fn get(&self, name: &str) -> Result<&Entity> {
        self.entities
            .get(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_owned()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
