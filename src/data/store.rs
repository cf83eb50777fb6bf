//! Loaded dataset and its reloadable holder.

use crate::config::DataConfig;
use crate::data::{
    DietMap, Detection, ReferenceTable, enrich, load_detections, load_diet_map,
};
use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Everything read from disk for one cache lifetime.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Enriched detections, in table order.
    pub detections: Vec<Detection>,
    /// Reference table as loaded.
    pub reference: ReferenceTable,
    /// Diet map as loaded.
    pub diets: DietMap,
}

impl Dataset {
    /// Read the detections, reference table and diet map, then join them.
    pub fn load(config: &DataConfig) -> Result<Self> {
        let mut detections = load_detections(&config.database, &config.table)?;
        let reference = ReferenceTable::load(&config.reference)?;
        let diets = load_diet_map(&config.diet)?;

        enrich(&mut detections, &reference.species_meta(), &diets);

        Ok(Self {
            detections,
            reference,
            diets,
        })
    }

    /// Build a dataset from already-loaded parts.
    pub fn from_parts(
        mut detections: Vec<Detection>,
        reference: ReferenceTable,
        diets: DietMap,
    ) -> Self {
        enrich(&mut detections, &reference.species_meta(), &diets);
        Self {
            detections,
            reference,
            diets,
        }
    }
}

/// Holds the loaded dataset until explicitly invalidated.
#[derive(Debug)]
pub struct DataStore {
    config: DataConfig,
    loaded: Mutex<Option<Arc<Dataset>>>,
}

impl DataStore {
    /// Create an empty store for the given data files.
    pub fn new(config: DataConfig) -> Self {
        Self {
            config,
            loaded: Mutex::new(None),
        }
    }

    /// Return the dataset, loading it on first use.
    pub fn get(&self) -> Result<Arc<Dataset>> {
        let mut guard = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dataset) = guard.as_ref() {
            debug!("Dataset cache hit");
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(Dataset::load(&self.config)?);
        *guard = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop the loaded dataset so the next `get` re-reads the files.
    pub fn invalidate(&self) {
        let mut guard = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!("Dataset cache invalidated");
        }
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Data file locations backing this store.
    pub fn config(&self) -> &DataConfig {
        &self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> DataConfig {
        let database = dir.path().join("birds.db");
        let conn = Connection::open(&database).unwrap();
        conn.execute_batch(
            "CREATE TABLE detections (
                Date TEXT, Time TEXT, Sci_Name TEXT, Com_Name TEXT,
                Confidence REAL, Lat REAL, Lon REAL
             );
             INSERT INTO detections VALUES
                ('2024-05-01', '06:00:00', 'Erithacus rubecula', 'European Robin', 0.9, 51.5, -0.1);",
        )
        .unwrap();

        let reference = dir.path().join("reference.csv");
        std::fs::write(
            &reference,
            "Common Name,Latin Name,Status\nRobin,Erithacus rubecula,Resident\n",
        )
        .unwrap();

        DataConfig {
            database,
            table: "detections".to_string(),
            reference,
            diet: dir.path().join("species_diet.json"),
        }
    }

    #[test]
    fn test_dataset_load_enriches() {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::load(&setup(&dir)).unwrap();
        assert_eq!(dataset.detections.len(), 1);
        assert_eq!(dataset.detections[0].status, "Resident");
        assert_eq!(
            dataset.detections[0].diet,
            crate::constants::diet::UNCLASSIFIED
        );
    }

    #[test]
    fn test_store_reuses_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        let store = DataStore::new(config.clone());

        let first = store.get().unwrap();
        let second = store.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::write(
            &config.reference,
            "Common Name,Latin Name,Status\nRobin,Erithacus rubecula,Other\n",
        )
        .unwrap();
        assert_eq!(store.get().unwrap().detections[0].status, "Resident");

        store.invalidate();
        let reloaded = store.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.detections[0].status, "Other");
    }
}
