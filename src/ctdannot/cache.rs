use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use tokio::sync::OnceCell;

/// A concurrent map where each value is computed at most once.  Callers
/// that ask for the same key while the value is being computed wait for
/// that computation instead of starting their own.  If the computation
/// fails the key stays empty and the next caller tries again.
pub struct OnceMap<K, V>
  where K: Eq + Hash + Clone,
        V: Clone,
{
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> Default for OnceMap<K, V>
  where K: Eq + Hash + Clone,
        V: Clone,
{
    fn default() -> Self {
        OnceMap {
            cells: DashMap::new(),
        }
    }
}

impl<K, V> OnceMap<K, V>
  where K: Eq + Hash + Clone,
        V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        // the shard lock is released before we await on the cell
        self.cells.entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone()
    }

    /// Return the value for key, computing it with init if no other
    /// caller has.  The bool is true only for the caller whose init
    /// produced the value.
    pub async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> Result<(V, bool)>
      where F: FnOnce() -> Fut,
            Fut: Future<Output = Result<V>>,
    {
        let cell = self.cell(key);

        let mut initialized_here = false;
        let value = cell.get_or_try_init(|| {
            initialized_here = true;
            init()
        }).await?;

        Ok((value.clone(), initialized_here))
    }

    // number of keys with a computed value
    pub fn len(&self) -> usize {
        self.cells.iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }
}

#[tokio::test]
async fn test_once_map_init_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let map: Arc<OnceMap<String, usize>> = Arc::new(OnceMap::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for _ in 0..16 {
        let map = map.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            let key = "CHEBI:16842".to_owned();
            map.get_or_try_init(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(42)
            }).await
        }));
    }

    let mut initialized_count = 0;
    for handle in handles {
        let (value, initialized_here) = handle.await.unwrap().unwrap();
        assert_eq!(value, 42);
        if initialized_here {
            initialized_count += 1;
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(initialized_count, 1);
    assert_eq!(map.len(), 1);
}

#[tokio::test]
async fn test_once_map_retries_after_error() {
    let map: OnceMap<u32, u32> = OnceMap::new();

    let result = map.get_or_try_init(&1, || async {
        Err(anyhow::anyhow!("lookup failed"))
    }).await;
    assert!(result.is_err());
    assert_eq!(map.len(), 0);

    let (value, initialized_here) =
        map.get_or_try_init(&1, || async { Ok(7) }).await.unwrap();
    assert_eq!(value, 7);
    assert!(initialized_here);
}
