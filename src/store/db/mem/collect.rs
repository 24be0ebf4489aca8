use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::trace;

use crate::{
    NavflowError, Result, ShareLock,
    store::{DbCollection, db::mem::DbDocument},
};

#[derive(Debug)]
struct Docs<T> {
    items: HashMap<String, T>,
    order: VecDeque<String>,
}

impl<T> Docs<T> {
    /// Appends a new key, dropping the oldest records beyond `capacity`.
    fn push(
        &mut self,
        id: String,
        item: T,
        capacity: Option<usize>,
    ) {
        self.order.push_back(id.clone());
        self.items.insert(id, item);
        if let Some(capacity) = capacity {
            while self.order.len() > capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.items.remove(&oldest);
                }
            }
        }
    }
}

/// In-memory collection keeping records in insertion order.
///
/// A bounded collection evicts its oldest records once `capacity` is exceeded.
#[derive(Debug)]
pub struct Collect<T> {
    name: String,
    capacity: Option<usize>,
    docs: ShareLock<Docs<T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capacity: None,
            docs: Arc::new(RwLock::new(Docs {
                items: HashMap::new(),
                order: VecDeque::new(),
            })),
        }
    }

    pub fn with_capacity(
        name: &str,
        capacity: usize,
    ) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new(name)
        }
    }
}

impl<T: DbDocument> DbCollection for Collect<T> {
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.items.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("{}::find({})", self.name, id);
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        docs.items.get(id).cloned().ok_or_else(|| NavflowError::NotFound(format!("{} {}", self.name, id)))
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.order.iter().filter_map(|id| docs.items.get(id).cloned()).collect())
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let id = data.id();
        trace!("{}::create({})", self.name, id);
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if docs.items.contains_key(&id) {
            return Err(NavflowError::Store(format!("{} {} already exists", self.name, id)));
        }
        docs.push(id, data.clone(), self.capacity);
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let id = data.id();
        trace!("{}::update({})", self.name, id);
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        match docs.items.get_mut(&id) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Err(NavflowError::NotFound(format!("{} {}", self.name, id))),
        }
    }

    fn upsert(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let id = data.id();
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        match docs.items.get_mut(&id) {
            Some(item) => *item = data.clone(),
            None => docs.push(id, data.clone(), self.capacity),
        }
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("{}::delete({})", self.name, id);
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if docs.items.remove(id).is_none() {
            return Ok(false);
        }
        docs.order.retain(|key| key != id);
        Ok(true)
    }
}
