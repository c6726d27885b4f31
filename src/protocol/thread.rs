use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, TrySendError},
    },
    thread,
};

use log::{debug, error};
use thiserror::Error;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("all {0} workers are busy")]
    Saturated(usize),
    #[error("thread pool has shut down")]
    ShutDown,
}

/// Fixed-size pool of worker threads.
///
/// Jobs are handed over through a rendezvous channel, so a job is only
/// accepted once an idle worker takes it. At most `size` jobs ever run at
/// once and nothing queues behind a busy pool.
#[derive(Debug)]
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::SyncSender<Job>>,
    active: Arc<AtomicUsize>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        assert!(size > 0);

        let mut workers = Vec::with_capacity(size);
        let (sender, receiver) = mpsc::sync_channel(0);

        let receiver = Arc::new(Mutex::new(receiver));
        let active = Arc::new(AtomicUsize::new(0));
        let sender = Some(sender);

        for i in 0..size {
            workers.push(Worker::new(i, Arc::clone(&receiver), Arc::clone(&active)));
        }

        Self {
            workers,
            sender,
            active,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of jobs currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn active_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Run `f` on the pool, blocking the caller until a worker is free.
    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::ShutDown)?;
        sender.send(Box::new(f)).map_err(|_| PoolError::ShutDown)
    }

    /// Run `f` on the pool only if a worker is idle right now.
    pub fn try_execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::ShutDown)?;
        sender.try_send(Box::new(f)).map_err(|e| match e {
            TrySendError::Full(_) => PoolError::Saturated(self.size()),
            TrySendError::Disconnected(_) => PoolError::ShutDown,
        })
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            debug!("shutting down worker {}", worker.id);

            if worker.thread.join().is_err() {
                error!("worker {} panicked", worker.id);
            }
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn new(
        id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        let thread = thread::spawn(move || {
            loop {
                let msg = receiver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .recv();
                match msg {
                    Ok(job) => {
                        debug!("worker {id} handling a connection!");
                        active.fetch_add(1, Ordering::SeqCst);
                        let _running = ActiveGuard(&active);
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!("worker {id} recovered from a panicking job");
                        }
                    }
                    Err(_) => {
                        debug!("worker {id} disconnected!");
                        break;
                    }
                }
            }
        });

        Self { id, thread }
    }
}

/// Keeps the active count accurate once a job finishes, however it ends.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
