use std::sync::Arc;

use tokio::sync::Semaphore;

/// Bounded pool for blocking work such as materialising blocks.
///
/// At most `num_threads` jobs run at once; further jobs wait for a free slot
/// without blocking the async runtime.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    num_threads: usize,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        Self {
            permits: Arc::new(Semaphore::new(num_threads)),
            num_threads,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run `job` on a blocking thread once a slot is free.
    pub async fn run<T, F>(&self, job: F) -> crate::Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> crate::Result<T> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(crate::Error::wrap)?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(crate::Error::wrap)?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1)
    }
}
