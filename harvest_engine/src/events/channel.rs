//! Simple stateless pub-sub event handler
//!
//! Components of the system subscribe to marketplace events (orders placed, status changes, payments settling) and
//! react to them. Handlers are stateless: they receive the event and nothing else, and cannot reach back into the
//! engine's state. Handlers may be async.
//!
//! Events are only ever published after the change they describe has been committed, so a handler never sees an
//! event for something that was rolled back.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    name: &'static str,
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(name: &'static str, buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { name, listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handler jobs before returning.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting {} event handler", self.name);
        // Only subscribers hold senders from here on, so the loop ends when the last of them is dropped
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling {} event", self.name);
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap whatever has already finished so the set doesn't grow without bound
            while let Some(res) = jobs.try_join_next() {
                log_job_result(self.name, res);
            }
        }
        debug!("📬️ {} event handler draining {} pending jobs", self.name, jobs.len());
        while let Some(res) = jobs.join_next().await {
            log_job_result(self.name, res);
        }
        debug!("📬️ {} event handler has shut down", self.name);
    }
}

fn log_job_result(name: &str, res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ {name} event handled"),
        Err(e) => warn!("📬️ A {name} event handler panicked or was cancelled: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
