//! Fan-out/fan-in regrouping of codes for batch soft deletion.
//!
//! A feeder pushes the requested codes into a bounded queue that a fixed pool
//! of workers drains. Each worker regroups what it receives into chunks of at
//! most `chunk_size` codes and sends every chunk to a results channel. Once a
//! worker finds the queue drained it flushes its partial chunk and sends one
//! terminal marker. [`ChunkStream::next`] yields chunks until it has seen a
//! marker from every worker.
//!
//! The pool lives only as long as its [`ChunkStream`]; dropping the stream
//! aborts whatever is still running.

use snip_core::{Result, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::trace;

pub const DELETE_WORKERS: usize = 4;
pub const DELETE_CHUNK_SIZE: usize = 100;
pub const QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
enum Message {
    Chunk(Vec<String>),
    Done,
}

/// Chunks of codes produced by a worker pool.
pub struct ChunkStream {
    results: mpsc::Receiver<Message>,
    remaining_workers: usize,
    _tasks: JoinSet<()>,
}

impl ChunkStream {
    /// Starts a pool with [`DELETE_WORKERS`] workers and chunks of up to
    /// [`DELETE_CHUNK_SIZE`] codes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(codes: Vec<String>) -> Self {
        Self::with_pool(codes, DELETE_WORKERS, DELETE_CHUNK_SIZE)
    }

    /// # Panics
    ///
    /// Panics if `workers` or `chunk_size` is zero.
    pub fn with_pool(codes: Vec<String>, workers: usize, chunk_size: usize) -> Self {
        assert!(workers > 0, "worker pool must not be empty");
        assert!(chunk_size > 0, "chunk size must be positive");

        let (queue_tx, queue_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (results_tx, results) = mpsc::channel(workers);
        let mut tasks = JoinSet::new();

        tasks.spawn(async move {
            for code in codes {
                if queue_tx.send(code).await.is_err() {
                    break;
                }
            }
        });

        for worker in 0..workers {
            let queue = Arc::clone(&queue_rx);
            let results = results_tx.clone();
            tasks.spawn(run_worker(worker, queue, results, chunk_size));
        }

        Self {
            results,
            remaining_workers: workers,
            _tasks: tasks,
        }
    }

    /// Returns the next chunk, or `None` once every worker has finished.
    ///
    /// Fails if a worker stopped without sending its terminal marker, in
    /// which case some codes were never delivered.
    pub async fn next(&mut self) -> Result<Option<Vec<String>>> {
        while self.remaining_workers > 0 {
            match self.results.recv().await {
                Some(Message::Chunk(chunk)) => return Ok(Some(chunk)),
                Some(Message::Done) => self.remaining_workers -= 1,
                None => {
                    return Err(StoreError::Query(format!(
                        "{} delete worker(s) stopped before draining the queue",
                        self.remaining_workers
                    )));
                }
            }
        }
        Ok(None)
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<Message>,
    chunk_size: usize,
) {
    let mut chunk = Vec::with_capacity(chunk_size);

    loop {
        let next = queue.lock().await.recv().await;
        let Some(code) = next else {
            break;
        };

        chunk.push(code);
        if chunk.len() >= chunk_size {
            trace!(worker, size = chunk.len(), "emitting delete chunk");
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
            if results.send(Message::Chunk(full)).await.is_err() {
                return;
            }
        }
    }

    if !chunk.is_empty() {
        trace!(worker, size = chunk.len(), "emitting final delete chunk");
        if results.send(Message::Chunk(chunk)).await.is_err() {
            return;
        }
    }
    let _ = results.send(Message::Done).await;
}
