//! Cache of initialised OCR engines keyed by language and acceleration flag.
//!
//! Lookups of an existing entry only take a shared read lock. Creation is
//! serialised by a separate mutex so each key's factory runs at most once
//! at a time, even when several images ask for the same model together.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub language: String,
    pub accelerated: bool,
}

impl ModelKey {
    pub fn new(language: impl Into<String>, accelerated: bool) -> Self {
        Self {
            language: language.into(),
            accelerated,
        }
    }
}

pub struct ModelCache<E> {
    models: RwLock<HashMap<ModelKey, Arc<E>>>,
    create_lock: Mutex<()>,
}

impl<E> Default for ModelCache<E> {
    fn default() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            create_lock: Mutex::new(()),
        }
    }
}

impl<E> ModelCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached model for `key`, building it with `factory` if absent.
    /// A failed build leaves the cache unchanged.
    pub fn get_or_create<F>(&self, key: &ModelKey, factory: F) -> Result<Arc<E>>
    where
        F: FnOnce() -> Result<E>,
    {
        if let Some(model) = self.models.read().get(key) {
            return Ok(Arc::clone(model));
        }

        let _creating = self.create_lock.lock();
        if let Some(model) = self.models.read().get(key) {
            return Ok(Arc::clone(model));
        }
        info!(
            language = %key.language,
            accelerated = key.accelerated,
            "loading OCR model"
        );
        let model = Arc::new(factory()?);
        self.models.write().insert(key.clone(), Arc::clone(&model));
        Ok(model)
    }

    pub fn clear(&self) {
        self.models.write().clear();
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}
