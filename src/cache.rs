use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Short-lived results keyed by a generated run id.
///
/// Entries expire `ttl` after insertion; expired ones are dropped on read
/// and whenever a new entry is inserted.
pub struct ResultCache<T> {
    entries: RwLock<HashMap<Uuid, (Instant, T)>>,
    ttl: Duration,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Store `value` under `id`, replacing any previous entry.
    pub fn insert(&self, id: Uuid, value: T) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        entries.retain(|_, (inserted, _)| now.duration_since(*inserted) < self.ttl);
        entries.insert(id, (now, value));
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        {
            let entries = self.entries.read();
            match entries.get(id) {
                Some((inserted, value)) if inserted.elapsed() < self.ttl => {
                    return Some(value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().remove(id);
        None
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
