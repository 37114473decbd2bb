//! Render-and-deliver cycle.
//!
//! The file watcher and the connection handler post [`Trigger`]s; a single
//! [`Broadcaster`] task consumes them. Cycles never overlap, so a slow render
//! can not land after a newer one. Triggers that pile up while a cycle runs
//! are folded into the next cycle, and every cycle pushes to every open
//! viewer so they all converge on the latest render.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::PreviewResult;
use crate::registry::{ClientId, ClientRegistry, DeliveryReport};
use crate::render::{Renderer, read_source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The watched file was modified.
    FileChanged,
    /// A viewer connected and needs the current render.
    ClientJoined(ClientId),
}

/// Sending side of the trigger channel, handed to the watcher and the web layer.
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl TriggerSender {
    pub fn file_changed(&self) -> bool {
        self.send(Trigger::FileChanged)
    }

    pub fn client_joined(&self, id: ClientId) -> bool {
        self.send(Trigger::ClientJoined(id))
    }

    fn send(&self, trigger: Trigger) -> bool {
        if self.tx.send(trigger).is_err() {
            tracing::warn!("broadcaster stopped, trigger dropped");
            return false;
        }
        true
    }
}

pub fn trigger_channel() -> (TriggerSender, mpsc::UnboundedReceiver<Trigger>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TriggerSender { tx }, rx)
}

pub struct Broadcaster {
    source: PathBuf,
    renderer: Arc<dyn Renderer>,
    registry: Arc<ClientRegistry>,
    rx: mpsc::UnboundedReceiver<Trigger>,
    coalesce_window: Duration,
}

impl Broadcaster {
    pub fn new(
        source: PathBuf,
        renderer: Arc<dyn Renderer>,
        registry: Arc<ClientRegistry>,
        rx: mpsc::UnboundedReceiver<Trigger>,
    ) -> Self {
        Self {
            source,
            renderer,
            registry,
            rx,
            coalesce_window: Duration::ZERO,
        }
    }

    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    /// Consume triggers until every sender is gone.
    pub async fn run(mut self) {
        while let Some(first) = self.rx.recv().await {
            if !self.coalesce_window.is_zero() {
                tokio::time::sleep(self.coalesce_window).await;
            }

            let mut batch = vec![first];
            while let Ok(next) = self.rx.try_recv() {
                batch.push(next);
            }
            let joined = batch
                .iter()
                .filter(|t| matches!(t, Trigger::ClientJoined(_)))
                .count();
            tracing::debug!(triggers = batch.len(), joined, "render cycle");

            match self.cycle().await {
                Ok(reports) => {
                    for report in reports.iter().filter(|r| !r.delivered()) {
                        tracing::debug!(client = %report.client, "push not delivered");
                    }
                    let delivered = reports.iter().filter(|r| r.delivered()).count();
                    tracing::debug!(
                        delivered,
                        failed = reports.len() - delivered,
                        "render pushed"
                    );
                }
                Err(e) if e.is_recoverable() => tracing::warn!("render skipped: {}", e),
                Err(e) => tracing::error!("render failed: {}", e),
            }
        }
        tracing::debug!("trigger channel closed, broadcaster stopping");
    }

    /// One read → render → broadcast pass. A read or render failure sends
    /// nothing and leaves every connection untouched.
    pub async fn cycle(&self) -> PreviewResult<Vec<DeliveryReport>> {
        let source = read_source(&self.source).await?;
        let markup = self.renderer.render(&source).await?;
        Ok(self.registry.broadcast(&markup))
    }
}
