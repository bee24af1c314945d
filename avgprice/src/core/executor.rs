use std::{any::Any, sync::Arc};

use futures_util::future::join_all;
use tokio::{sync::Semaphore, task::JoinError};
use tracing::debug;

use super::{
    aggregate::Aggregator,
    mapper::{map_chunk, MapOutput},
    partition::Chunk,
};
use crate::{config::MalformedPolicy, error::Error};

/// Runs map units on the blocking pool, at most `parallelism` at a time.
#[derive(Clone, Debug)]
pub struct Executor {
    parallelism: usize,
    permits: Arc<Semaphore>,
}

impl Executor {
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        Self {
            parallelism,
            permits: Arc::new(Semaphore::new(parallelism)),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Maps every chunk and waits for all of them.
    ///
    /// Outputs come back in chunk order. If any unit fails the whole call
    /// fails; the lowest failing chunk index wins.
    pub async fn map_all<A, L>(
        &self,
        aggregator: A,
        chunks: Vec<Chunk<L>>,
        on_malformed: MalformedPolicy,
    ) -> Result<Vec<MapOutput<A::Combiner>>, Error>
    where
        A: Aggregator<Value = f64> + Clone,
        L: AsRef<[u8]> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let index = chunk.index;
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::WorkerFailure {
                    chunk: index,
                    reason: e.to_string(),
                })?;
            let aggregator = aggregator.clone();
            debug!(chunk = index, lines = chunk.len(), "dispatching chunk");
            let handle = tokio::task::spawn_blocking(move || {
                let output = map_chunk(&aggregator, chunk, on_malformed);
                drop(permit);
                output
            });
            handles.push((index, handle));
        }

        let (indices, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        indices
            .into_iter()
            .zip(results)
            .map(|(chunk, joined)| match joined {
                Ok(output) => output,
                Err(e) => Err(Error::WorkerFailure {
                    chunk,
                    reason: join_failure_reason(e),
                }),
            })
            .collect()
    }
}

fn join_failure_reason(e: JoinError) -> String {
    if e.is_panic() {
        format!("panicked: {}", panic_message(e.into_panic()))
    } else {
        e.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => msg.to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}
