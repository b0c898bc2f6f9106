//! Fixed-size pool of worker threads for reading and decoding resources.
//!
//! Tasks are boxed closures sent over a multi-consumer channel that every
//! worker receives from. The pool tracks how
//! many submitted tasks have not finished yet, which is what the coordinator
//! uses to tell "nothing queued right now" apart from "nothing left to do".

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{PreloadError, Result};
use crate::sync::lock;

/// A unit of work run on a pool thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Message sent to the worker threads.
enum WorkerMessage {
    /// Run a task
    Run(Task),
    /// Stop the receiving worker
    Shutdown,
}

/// Count of submitted tasks that have not finished.
#[derive(Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Outstanding {
    fn increment(&self) {
        *lock(&self.count) += 1;
    }

    fn decrement(&self) {
        let mut count = lock(&self.count);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *lock(&self.count)
    }

    fn wait_idle(&self) {
        let mut count = lock(&self.count);
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

/// Bounded pool of worker threads.
pub struct WorkerPool {
    sender: Sender<WorkerMessage>,
    outstanding: Arc<Outstanding>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool with `size` threads.
    ///
    /// Fails only if the operating system refuses to start a thread; the
    /// threads that did start are shut down before returning.
    pub fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkerMessage>();
        let outstanding = Arc::new(Outstanding::default());

        let mut pool = Self {
            sender,
            outstanding,
            workers: Vec::with_capacity(size),
        };

        for index in 0..size {
            let receiver = receiver.clone();
            let outstanding = Arc::clone(&pool.outstanding);
            let handle = thread::Builder::new()
                .name(format!("preload-worker-{}", index))
                .spawn(move || Self::worker_loop(&receiver, &outstanding))
                .map_err(PreloadError::PoolSpawn)?;
            pool.workers.push(handle);
        }

        log::debug!("Spawned worker pool with {} threads", size);
        Ok(pool)
    }

    fn worker_loop(receiver: &Receiver<WorkerMessage>, outstanding: &Outstanding) {
        loop {
            match receiver.recv() {
                Ok(WorkerMessage::Run(task)) => {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
                        log::error!("Preload task panicked: {:?}", panic);
                    }
                    outstanding.decrement();
                }
                Ok(WorkerMessage::Shutdown) | Err(_) => break,
            }
        }
    }

    /// Queue a task. Never blocks.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.outstanding.increment();
        if self.sender.send(WorkerMessage::Run(Box::new(task))).is_err() {
            log::error!("Failed to submit task: worker channel closed");
            self.outstanding.decrement();
        }
    }

    /// Whether any submitted task has not finished yet.
    pub fn is_busy(&self) -> bool {
        self.outstanding.get() > 0
    }

    /// Number of submitted tasks that have not finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// Block until every submitted task has finished.
    pub fn join(&self) {
        self.outstanding.wait_idle();
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        log::debug!("Shutting down worker pool ({} threads)", self.workers.len());

        for _ in &self.workers {
            let _ = self.sender.send(WorkerMessage::Shutdown);
        }

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                log::warn!("Worker thread panicked: {:?}", e);
            }
        }
    }
}
