use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::trace;

use crate::{NavflowError, Result, ShareLock, utils};

use super::{DbCollection, DbCollectionIden, DbStore, StoreIden, data::*};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store with every collection registered by `backend`.
    pub fn with_backend(backend: &impl DbStore) -> Self {
        let store = Self::new();
        backend.init(&store);
        store
    }

    pub fn collection<DATA>(&self) -> Result<Arc<dyn DbCollection<Item = DATA>>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);

        collections
            .get(&DATA::iden())
            .and_then(|collection| collection.downcast_ref::<DynDbSetRef<DATA>>())
            .map(|v| v.0.clone())
            .ok_or_else(|| NavflowError::Store(format!("fail to get collection: {}", DATA::iden().as_ref())))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn runs(&self) -> Result<Arc<dyn DbCollection<Item = RunStatus>>> {
        self.collection()
    }

    pub fn edge_metrics(&self) -> Result<Arc<dyn DbCollection<Item = DirectionMetrics>>> {
        self.collection()
    }

    pub fn node_metrics(&self) -> Result<Arc<dyn DbCollection<Item = NodeMetricsSummary>>> {
        self.collection()
    }

    pub fn actions(&self) -> Result<Arc<dyn DbCollection<Item = ActionExecution>>> {
        self.collection()
    }

    /// Persists the latest status of a run.
    pub fn save_run(
        &self,
        status: &RunStatus,
    ) -> Result<bool> {
        trace!("store::save_run({}, {})", status.run_id, status.state.as_ref());
        if status.run_id.is_empty() {
            return Err(NavflowError::Store("missing id in run".into()));
        }
        let mut data = status.clone();
        data.timestamp = utils::time::time_millis();
        self.runs()?.upsert(&data)
    }

    pub fn load_run(
        &self,
        run_id: &str,
    ) -> Result<RunStatus> {
        trace!("store::load_run({})", run_id);
        self.runs()?.find(run_id)
    }
}
