//! Connection manager: the coordinator task and its cheap-to-clone handle.
//!
//! Every registry mutation and every broadcast travels as a [`Command`]
//! through one FIFO inbox and is applied by a single task, one command at a
//! time. A broadcast therefore sees exactly the registrations submitted
//! before it, and nothing outside the coordinator ever touches the registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sensorhub_core::config::RealtimeConfig;
use sensorhub_core::error::AppError;
use sensorhub_core::result::AppResult;

use crate::message::types::WireMessage;
use crate::metrics::RealtimeMetrics;

use super::delivery::spawn_delivery;
use super::handle::{ConnectionHandle, ConnectionId};
use super::registry::Registry;

/// Instructions processed by the coordinator, strictly in arrival order.
#[derive(Debug)]
pub(crate) enum Command {
    Register(Arc<ConnectionHandle>),
    Unregister(ConnectionId),
    Broadcast(WireMessage),
    Count(oneshot::Sender<usize>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle used to submit commands to the coordinator.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
}

impl ConnectionManager {
    /// Spawns the coordinator task and returns a handle to it.
    ///
    /// The task runs until [`shutdown`](Self::shutdown) is called or every
    /// handle has been dropped.
    pub fn spawn(config: &RealtimeConfig, metrics: Arc<RealtimeMetrics>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.command_buffer_size.max(1));

        let coordinator = Coordinator {
            registry: Registry::new(),
            commands: rx,
            reports: tx.downgrade(),
            metrics,
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        };
        let task = tokio::spawn(coordinator.run());

        (Self { commands: tx }, task)
    }

    /// Adds a connection to the registry. Re-registering is a no-op.
    pub async fn register(&self, conn: Arc<ConnectionHandle>) -> AppResult<()> {
        self.submit(Command::Register(conn)).await
    }

    /// Removes a connection and closes it. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) {
        if self.submit(Command::Unregister(id)).await.is_err() {
            debug!(conn_id = %id, "Coordinator stopped, unregister dropped");
        }
    }

    /// Fans `message` out to every connection registered when the
    /// coordinator reaches this command.
    ///
    /// Returns once the command is queued; delivery happens in the
    /// background. Empty payloads are dropped.
    pub async fn broadcast(&self, message: WireMessage) -> AppResult<()> {
        if message.is_empty() {
            warn!("Ignoring empty broadcast payload");
            return Ok(());
        }
        self.submit(Command::Broadcast(message)).await
    }

    /// Number of registered connections, observed after every command
    /// submitted before this call.
    pub async fn connection_count(&self) -> AppResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Count(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Closes every registered connection and stops the coordinator.
    pub async fn shutdown(&self) -> AppResult<()> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn submit(&self, command: Command) -> AppResult<()> {
        self.commands.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> AppError {
    AppError::service_unavailable("Connection coordinator is not running")
}

/// Sole owner of the registry.
struct Coordinator {
    registry: Registry,
    commands: mpsc::Receiver<Command>,
    /// Handed to delivery tasks so failures come back as unregisters
    /// without keeping the inbox open on their own.
    reports: mpsc::WeakSender<Command>,
    metrics: Arc<RealtimeMetrics>,
    write_timeout: Duration,
}

impl Coordinator {
    async fn run(mut self) {
        info!("Connection coordinator started");

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Register(conn) => self.register(conn),
                Command::Unregister(id) => self.unregister(&id),
                Command::Broadcast(message) => self.broadcast(message),
                Command::Count(reply) => {
                    let _ = reply.send(self.registry.len());
                }
                Command::Shutdown(done) => {
                    self.shutdown(done);
                    break;
                }
            }
        }

        info!("Connection coordinator stopped");
    }

    fn register(&mut self, conn: Arc<ConnectionHandle>) {
        let id = conn.id;
        let remote_addr = conn.peer();
        if !self.registry.insert(conn) {
            debug!(conn_id = %id, "Connection already registered");
            return;
        }
        self.metrics.connection_opened();
        info!(
            conn_id = %id,
            remote_addr = %remote_addr,
            total = self.registry.len(),
            "WebSocket client connected"
        );
    }

    fn unregister(&mut self, id: &ConnectionId) {
        let Some(conn) = self.registry.remove(id) else {
            return;
        };
        conn.close(self.write_timeout);
        self.metrics.connection_closed();
        info!(
            conn_id = %id,
            remote_addr = %conn.peer(),
            connected_secs = (Utc::now() - conn.connected_at).num_seconds(),
            remaining = self.registry.len(),
            "WebSocket client disconnected"
        );
    }

    fn broadcast(&mut self, message: WireMessage) {
        let recipients = self.registry.snapshot();
        self.metrics.broadcast_dispatched(recipients.len() as u64);
        if recipients.is_empty() {
            return;
        }

        debug!(
            recipients = recipients.len(),
            bytes = message.len(),
            "Broadcasting message"
        );
        for conn in recipients {
            spawn_delivery(
                conn,
                message.clone(),
                self.write_timeout,
                self.reports.clone(),
                Arc::clone(&self.metrics),
            );
        }
    }

    /// Stop accepting commands, settle everything already queued, then close
    /// every connection.
    ///
    /// Registrations queued behind the shutdown were already acknowledged to
    /// their sockets, so they are admitted and closed with the rest. Queued
    /// broadcasts and count queries are dropped.
    fn shutdown(&mut self, done: oneshot::Sender<()>) {
        self.commands.close();

        let mut waiters = vec![done];
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Register(conn) => self.register(conn),
                Command::Unregister(id) => self.unregister(&id),
                Command::Shutdown(done) => waiters.push(done),
                Command::Broadcast(_) | Command::Count(_) => {}
            }
        }

        self.close_all();
        for done in waiters {
            let _ = done.send(());
        }
    }

    fn close_all(&mut self) {
        let conns = self.registry.drain();
        for conn in &conns {
            conn.close(self.write_timeout);
            self.metrics.connection_closed();
        }
        info!(count = conns.len(), "All connections closed");
    }
}
