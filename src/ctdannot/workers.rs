use std::future::Future;

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::task::AbortHandle;

// cancels a spawned item when its slot in the stream is dropped
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Process items with at most worker_count spawned tasks in flight.  The
/// results are returned in the order of the input items regardless of which
/// task finished first.  After the first error no further items are started,
/// the tasks still in flight are aborted and the error is returned.
pub async fn run_worker_pool<T, R, F, Fut>(items: Vec<T>, worker_count: usize, work: F)
    -> Result<Vec<R>>
  where T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
{
    let worker_count = worker_count.max(1);

    stream::iter(items)
        .map(|item| {
            let handle = tokio::spawn(work(item));
            async move {
                let _abort_on_drop = AbortOnDrop(handle.abort_handle());
                match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(anyhow!("worker failed: {}", join_err)),
                }
            }
        })
        .buffered(worker_count)
        .try_collect()
        .await
}

#[tokio::test]
async fn test_worker_pool_order() {
    let items: Vec<u64> = (0..100).collect();

    let results = run_worker_pool(items, 7, |n| async move {
        // early items take longer
        for _ in n..100 {
            tokio::task::yield_now().await;
        }
        Ok(n * 2)
    }).await.unwrap();

    assert_eq!(results, (0..100).map(|n| n * 2).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_worker_pool_error() {
    let items: Vec<u32> = (0..20).collect();

    let result = run_worker_pool(items, 4, |n| async move {
        if n == 13 {
            Err(anyhow!("bad item {}", n))
        } else {
            Ok(n)
        }
    }).await;

    assert_eq!(result.unwrap_err().to_string(), "bad item 13");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_stops_after_error() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let processed = Arc::new(AtomicUsize::new(0));
    let items: Vec<u32> = (0..200).collect();

    let counter = processed.clone();
    let result = run_worker_pool(items, 4, move |n| {
        let counter = counter.clone();
        async move {
            if n == 1 {
                return Err(anyhow!("store failure"));
            }
            for _ in 0..50 {
                tokio::task::yield_now().await;
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(n)
        }
    }).await;

    assert_eq!(result.unwrap_err().to_string(), "store failure");

    for _ in 0..500 {
        tokio::task::yield_now().await;
    }

    // only the items already in flight beside the failing one could finish
    assert!(processed.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn test_worker_pool_empty() {
    let results = run_worker_pool(Vec::<u32>::new(), 8, |n| async move { Ok(n) })
        .await.unwrap();
    assert!(results.is_empty());
}
