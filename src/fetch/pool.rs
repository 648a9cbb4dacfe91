use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Bounded pool of concurrent tasks
///
/// At most `concurrency` jobs run at once. Jobs run as tokio tasks owned by
/// a `JoinSet`, so dropping the future returned by [`WorkerPool::run`] (for
/// example on a host timeout) aborts every outstanding job.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl WorkerPool {
    /// Creates a pool; a concurrency of zero is raised to one
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `job` over every item and collects the outputs in completion order
    pub async fn run<I, T, F, Fut>(&self, items: I, job: F) -> Vec<T>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let job = Arc::new(job);
        let mut tasks = JoinSet::new();

        for item in items {
            let semaphore = Arc::clone(&self.semaphore);
            let job = Arc::clone(&job);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(job(item).await)
            });
        }

        let mut outputs = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => tracing::warn!("Worker pool closed before job started"),
                Err(e) => tracing::warn!("Worker task failed: {}", e),
            }
        }
        outputs
    }
}
