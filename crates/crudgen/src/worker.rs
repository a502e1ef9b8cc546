//! Generation task queue.
//!
//! Generators live on a background task; callers only enqueue named tasks
//! (`{pool, task, data}`) and await the reply. Messages are handled one
//! at a time, so no two regeneration waves ever overlap.

use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codegen::ModuleMap;
use crate::config::BundlerConfig;
use crate::diagnostic::GeneratorError;
use crate::generator::{Generator, HandlerRun};

const QUEUE_CAPACITY: usize = 64;

/// A task and its data.
#[derive(Debug, Clone)]
pub enum Task {
    ConfigResolved(BundlerConfig),
    Bootstrap,
    FileChanged(PathBuf),
    WatchedPaths,
    Modules,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::ConfigResolved(_) => "configResolved",
            Task::Bootstrap => "bootstrap",
            Task::FileChanged(_) => "fileChanged",
            Task::WatchedPaths => "watchedPaths",
            Task::Modules => "modules",
        }
    }
}

#[derive(Debug)]
pub enum TaskOutput {
    Done,
    Runs(Vec<HandlerRun>),
    Paths(Vec<PathBuf>),
    Modules(ModuleMap),
}

/// One queued task addressed to the generator of `pool`.
#[derive(Debug)]
pub struct Message {
    pub pool: String,
    pub task: Task,
    reply: oneshot::Sender<Result<TaskOutput, GeneratorError>>,
}

enum PoolMessage {
    Run(Message),
    Shutdown,
}

/// Owns the background task running every generator.
pub struct WorkerPool {
    tx: mpsc::Sender<PoolMessage>,
    join: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the worker on the current tokio runtime. Each generator is a
    /// pool named after its base.
    pub fn spawn(generators: Vec<Generator>) -> Self {
        let generators: HashMap<String, Generator> = generators
            .into_iter()
            .map(|g| (g.base().to_string(), g))
            .collect();

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let join = tokio::spawn(worker_loop(rx, generators));

        Self { tx, join: Some(join) }
    }

    pub fn handle(&self, pool: impl Into<String>) -> PoolHandle {
        PoolHandle {
            pool: pool.into(),
            tx: self.tx.clone(),
        }
    }

    /// Stops the worker once queued tasks have been handled.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(PoolMessage::Shutdown).await;
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Enqueues tasks for one pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    pool: String,
    tx: mpsc::Sender<PoolMessage>,
}

impl PoolHandle {
    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub async fn send(&self, task: Task) -> Result<TaskOutput, GeneratorError> {
        let (reply, response) = oneshot::channel();
        let message = Message {
            pool: self.pool.clone(),
            task,
            reply,
        };

        self.tx
            .send(PoolMessage::Run(message))
            .await
            .map_err(|_| GeneratorError::WorkerUnavailable)?;

        response.await.map_err(|_| GeneratorError::WorkerUnavailable)?
    }

    pub async fn config_resolved(&self, config: BundlerConfig) -> Result<(), GeneratorError> {
        self.send(Task::ConfigResolved(config)).await.map(|_| ())
    }

    pub async fn bootstrap(&self) -> Result<Vec<HandlerRun>, GeneratorError> {
        match self.send(Task::Bootstrap).await? {
            TaskOutput::Runs(runs) => Ok(runs),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn file_changed(&self, path: impl Into<PathBuf>) -> Result<Vec<HandlerRun>, GeneratorError> {
        match self.send(Task::FileChanged(path.into())).await? {
            TaskOutput::Runs(runs) => Ok(runs),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn watched_paths(&self) -> Result<Vec<PathBuf>, GeneratorError> {
        match self.send(Task::WatchedPaths).await? {
            TaskOutput::Paths(paths) => Ok(paths),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn modules(&self) -> Result<ModuleMap, GeneratorError> {
        match self.send(Task::Modules).await? {
            TaskOutput::Modules(modules) => Ok(modules),
            _ => Err(GeneratorError::WorkerUnavailable),
        }
    }
}

async fn worker_loop(mut rx: mpsc::Receiver<PoolMessage>, mut generators: HashMap<String, Generator>) {
    while let Some(message) = rx.recv().await {
        match message {
            PoolMessage::Run(Message { pool, task, reply }) => {
                debug!("{}: {}", pool, task.name());
                let result = match generators.get_mut(&pool) {
                    Some(generator) => execute(generator, task).await,
                    None => Err(GeneratorError::UnknownPool { pool }),
                };
                let _ = reply.send(result);
            }
            PoolMessage::Shutdown => break,
        }
    }
}

async fn execute(generator: &mut Generator, task: Task) -> Result<TaskOutput, GeneratorError> {
    match task {
        Task::ConfigResolved(config) => {
            generator.config_resolved(config);
            Ok(TaskOutput::Done)
        }
        Task::Bootstrap => generator.bootstrap().await.map(TaskOutput::Runs),
        Task::FileChanged(path) => generator.file_changed(&path).await.map(TaskOutput::Runs),
        Task::WatchedPaths => Ok(TaskOutput::Paths(generator.watched_paths())),
        Task::Modules => Ok(TaskOutput::Modules(generator.modules())),
    }
}
