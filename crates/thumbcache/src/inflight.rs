//! # In-flight production
//!
//! Registry of artifacts currently being produced. The first requester for a
//! key spawns the production task; everyone else awaits the same shared
//! result. Tasks run detached, so a requester going away never cancels the
//! work, and each task deregisters itself when it finishes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::ArtifactKey;
use crate::error::ThumbnailError;

type SharedTask<T> = Shared<BoxFuture<'static, Result<T, ThumbnailError>>>;
type Registry<T> = Arc<Mutex<HashMap<ArtifactKey, SharedTask<T>>>>;

pub struct InFlight<T> {
    tasks: Registry<T>,
}

/// Removes a finished (or panicked) task from the registry.
struct Deregister<T> {
    tasks: Registry<T>,
    key: ArtifactKey,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        self.tasks.lock().remove(&self.key);
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `produce` for `key` unless a producer is already in flight, in
    /// which case its result is awaited instead.
    ///
    /// Returns the result and whether this caller joined an existing producer.
    pub async fn run<F>(&self, key: ArtifactKey, produce: F) -> (Result<T, ThumbnailError>, bool)
    where
        F: Future<Output = Result<T, ThumbnailError>> + Send + 'static,
    {
        let (task, joined) = {
            let mut tasks = self.tasks.lock();
            match tasks.get(&key) {
                Some(task) => (task.clone(), true),
                None => {
                    let guard = Deregister {
                        tasks: self.tasks.clone(),
                        key: key.clone(),
                    };
                    // The registry lock is held until the task is inserted,
                    // so the guard cannot remove it before it exists.
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        produce.await
                    });
                    let task = async move {
                        handle
                            .await
                            .unwrap_or_else(|e| Err(ThumbnailError::TaskFailure(e.to_string())))
                    }
                    .boxed()
                    .shared();
                    tasks.insert(key.clone(), task.clone());
                    (task, false)
                }
            }
        };

        if joined {
            debug!(key = %key, "Joined in-flight production");
        }

        (task.await, joined)
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.tasks.lock().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl<T> Default for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
