//! Dataset and mask collaborators.
//!
//! Retrieval of raw datasets and basin masks happens outside this crate.
//! Implementations of [`DatasetFetcher`] and [`MaskProvider`] adapt whatever
//! storage is available (remote archives, local NetCDF files) to the
//! in-memory types of `hydrobench-core`.

use hydrobench_core::errors::{BenchError, BenchResult};
use hydrobench_core::field::{BasinMask, GriddedField};
use std::collections::HashMap;

/// Supplies raw gridded datasets by identifier (e.g. "ERA5", "CRU").
pub trait DatasetFetcher {
    /// Failures are reported as [`BenchError::Fetch`].
    fn fetch(&self, source_id: &str) -> BenchResult<GriddedField>;
}

/// Supplies basin masks by basin name.
pub trait MaskProvider {
    fn basin_mask(&self, basin: &str) -> BenchResult<BasinMask>;
}

/// Fetches each dataset at most once per run.
#[derive(Debug)]
pub struct FetchCache<F> {
    fetcher: F,
    cache: HashMap<String, GriddedField>,
}

impl<F: DatasetFetcher> FetchCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: HashMap::new(),
        }
    }

    /// Returns the cached dataset, fetching it on first use.
    pub fn get(&mut self, source_id: &str) -> BenchResult<&GriddedField> {
        if !self.cache.contains_key(source_id) {
            log::debug!("Fetching '{source_id}'");
            let field = self.fetcher.fetch(source_id)?;
            self.cache.insert(source_id.to_string(), field);
        }
        self.cache.get(source_id).ok_or_else(|| BenchError::Fetch {
            source_id: source_id.to_string(),
            reason: "dataset missing from cache".to_string(),
        })
    }

    /// Fetches several datasets, preserving order.
    pub fn get_all(&mut self, source_ids: &[String]) -> BenchResult<Vec<GriddedField>> {
        source_ids
            .iter()
            .map(|id| self.get(id).cloned())
            .collect()
    }

    pub fn is_cached(&self, source_id: &str) -> bool {
        self.cache.contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Datasets held in memory, keyed by their provenance label.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    datasets: HashMap<String, GriddedField>,
}

impl InMemoryFetcher {
    pub fn insert(&mut self, field: GriddedField) {
        self.datasets.insert(field.source().to_string(), field);
    }
}

impl FromIterator<GriddedField> for InMemoryFetcher {
    fn from_iter<I: IntoIterator<Item = GriddedField>>(iter: I) -> Self {
        let mut fetcher = Self::default();
        for field in iter {
            fetcher.insert(field);
        }
        fetcher
    }
}

impl DatasetFetcher for InMemoryFetcher {
    fn fetch(&self, source_id: &str) -> BenchResult<GriddedField> {
        self.datasets
            .get(source_id)
            .cloned()
            .ok_or_else(|| BenchError::Fetch {
                source_id: source_id.to_string(),
                reason: "no such dataset".to_string(),
            })
    }
}

/// Masks held in memory, keyed by basin name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMasks {
    masks: HashMap<String, BasinMask>,
}

impl InMemoryMasks {
    pub fn insert(&mut self, mask: BasinMask) {
        self.masks.insert(mask.name().to_string(), mask);
    }
}

impl MaskProvider for InMemoryMasks {
    fn basin_mask(&self, basin: &str) -> BenchResult<BasinMask> {
        self.masks
            .get(basin)
            .cloned()
            .ok_or_else(|| BenchError::Fetch {
                source_id: basin.to_string(),
                reason: "no mask for this basin".to_string(),
            })
    }
}
