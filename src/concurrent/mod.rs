// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Worker dispatch: a small pool of threads draining a job queue, each job
//! carrying its own single-use completion sink. `Tree` itself is callable
//! directly and synchronously; `TreeController` is additive sugar for
//! callers that want to submit work from one thread and be notified of
//! completion on another, mirroring the "done channel" shape the B+tree
//! this crate is descended from exposed at its own public boundary.

use crate::btree::{Order, Record, Tree};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// One unit of work submitted to a [`Dispatcher`], paired with the sink
/// its result is written to exactly once.
enum Job {
    Insert { record: Record, done: Sender<bool> },
    Search { key: Vec<u8>, done: Sender<Option<Vec<u8>>> },
    Update { record: Record, done: Sender<bool> },
    Delete { key: Vec<u8>, done: Sender<bool> },
}

/// A fixed pool of worker threads draining a shared job queue against one
/// [`Tree`]. Dropping the dispatcher closes the queue; workers exit once
/// it drains.
struct Dispatcher {
    sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    fn new(tree: Arc<Tree>, worker_count: usize) -> Self {
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = unbounded();
        let workers = (0..worker_count.max(1))
            .map(|id| {
                let tree = Arc::clone(&tree);
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("reedindex-worker-{id}"))
                    .spawn(move || run_worker(tree, receiver))
                    .expect("spawning a worker thread")
            })
            .collect();
        Dispatcher { sender, workers }
    }

    fn submit(&self, job: Job) {
        // The receiver side only disappears once every worker has exited,
        // which only happens after the dispatcher itself is dropped; a
        // send here can't outlive the workers that would consume it.
        let _ = self.sender.send(job);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_worker(tree: Arc<Tree>, receiver: Receiver<Job>) {
    for job in receiver {
        match job {
            Job::Insert { record, done } => {
                let _ = done.send(tree.insert(record));
            }
            Job::Search { key, done } => {
                let _ = done.send(tree.search(&key));
            }
            Job::Update { record, done } => {
                let _ = done.send(tree.update(record));
            }
            Job::Delete { key, done } => {
                let _ = done.send(tree.delete(&key));
            }
        }
    }
}

/// The tree plus its worker pool. Each operation submits a job and
/// returns immediately; the caller's supplied `done` sink receives the
/// result once a worker picks it up.
pub struct TreeController {
    tree: Arc<Tree>,
    dispatcher: Dispatcher,
}

impl TreeController {
    pub fn new(order: Order) -> Self {
        Self::with_workers(order, default_worker_count())
    }

    pub fn with_workers(order: Order, worker_count: usize) -> Self {
        let tree = Arc::new(Tree::new(order));
        let dispatcher = Dispatcher::new(Arc::clone(&tree), worker_count);
        TreeController { tree, dispatcher }
    }

    pub fn metadata(&self) -> crate::btree::TreeMetadata {
        self.tree.metadata()
    }

    pub fn insert(&self, record: Record, done: Sender<bool>) {
        self.dispatcher.submit(Job::Insert { record, done });
    }

    pub fn search(&self, key: Vec<u8>, done: Sender<Option<Vec<u8>>>) {
        self.dispatcher.submit(Job::Search { key, done });
    }

    pub fn update(&self, record: Record, done: Sender<bool>) {
        self.dispatcher.submit(Job::Update { record, done });
    }

    pub fn delete(&self, key: Vec<u8>, done: Sender<bool>) {
        self.dispatcher.submit(Job::Delete { key, done });
    }

    /// Submits an insert and blocks the calling thread for its result.
    pub fn insert_blocking(&self, record: Record) -> bool {
        let (done, rx) = crossbeam_channel::bounded(1);
        self.insert(record, done);
        rx.recv().unwrap_or(false)
    }

    pub fn search_blocking(&self, key: Vec<u8>) -> Option<Vec<u8>> {
        let (done, rx) = crossbeam_channel::bounded(1);
        self.search(key, done);
        rx.recv().unwrap_or(None)
    }

    pub fn update_blocking(&self, record: Record) -> bool {
        let (done, rx) = crossbeam_channel::bounded(1);
        self.update(record, done);
        rx.recv().unwrap_or(false)
    }

    pub fn delete_blocking(&self, key: Vec<u8>) -> bool {
        let (done, rx) = crossbeam_channel::bounded(1);
        self.delete(key, done);
        rx.recv().unwrap_or(false)
    }
}

fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
