//! Process-wide lifecycle coordination.
//!
//! # Responsibilities
//! - Build the namespace registry (configuration errors are fatal here)
//! - Launch one supervisor task per namespace and wait until all are bound
//! - Start the public listener once every backend is reachable
//! - Surface the first fatal error, or stop on external cancellation
//!
//! # Design Decisions
//! - Fail fast: no partial degradation, no restarts, no drain of in-flight relays
//! - Phases only move forward: Starting → Running → Terminating

use std::future::Future;
use std::pin::{pin, Pin};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinSet};

use crate::backend::{BackendFactory, BackendSupervisor};
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::fatal::{fatal_slot, FatalReporter, FatalSlot, LifecycleError};
use crate::namespace::NamespaceRegistry;
use crate::net::BoundedListener;

/// Coordinator state, observable through [`Coordinator::phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Endpoints are being provisioned and supervisors launched.
    Starting,
    /// Every backend and the public listener are live.
    Running,
    /// A fatal error or cancellation was observed.
    Terminating,
}

/// Runs the backend supervisors and the public listener as one group.
pub struct Coordinator {
    config: ProxyConfig,
    factory: Arc<dyn BackendFactory>,
    listener: Option<TcpListener>,
    phase: watch::Sender<Phase>,
}

enum Startup {
    Ready,
    Cancelled,
}

impl Coordinator {
    pub fn new(config: ProxyConfig, factory: Arc<dyn BackendFactory>) -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            config,
            factory,
            listener: None,
            phase,
        }
    }

    /// Serve the public side on an already bound listener instead of
    /// binding `listener.bind_address`.
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Subscribe to phase changes.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Run until the first fatal error or until `shutdown` resolves.
    ///
    /// Returns `Ok(())` on cancellation and the first reported error
    /// otherwise. All supervised tasks are aborted before returning.
    pub async fn run<S>(mut self, shutdown: S) -> Result<(), LifecycleError>
    where
        S: Future<Output = ()>,
    {
        let registry = Arc::new(NamespaceRegistry::from_config(&self.config)?);
        let (reporter, mut slot) = fatal_slot();
        let mut tasks = JoinSet::new();
        let mut shutdown = pin!(shutdown);

        tracing::info!(
            namespaces = self.config.namespaces.len(),
            default_namespace = %registry.default_namespace(),
            state_dir = %self.config.state_dir.display(),
            "Starting backends"
        );

        let backends_ready = self.spawn_supervisors(&registry, &reporter, &mut tasks);
        let outcome = match wait_ready(backends_ready, &mut tasks, &mut slot, shutdown.as_mut()).await
        {
            Ok(Startup::Ready) => {
                let listener_ready = self.spawn_listener(registry, &reporter, &mut tasks);
                match wait_ready(vec![listener_ready], &mut tasks, &mut slot, shutdown.as_mut())
                    .await
                {
                    Ok(Startup::Ready) => {
                        self.phase.send_replace(Phase::Running);
                        tracing::info!("All backends and the public listener are running");
                        run_until_failure(&mut tasks, &mut slot, shutdown.as_mut()).await
                    }
                    Ok(Startup::Cancelled) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            Ok(Startup::Cancelled) => Ok(()),
            Err(e) => Err(e),
        };

        self.phase.send_replace(Phase::Terminating);
        match &outcome {
            Ok(()) => tracing::info!("Cancellation received, terminating"),
            Err(e) => tracing::error!(error = %e, "Fatal error, terminating"),
        }

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        drop(reporter);

        outcome
    }

    fn spawn_supervisors(
        &self,
        registry: &NamespaceRegistry,
        reporter: &FatalReporter,
        tasks: &mut JoinSet<()>,
    ) -> Vec<oneshot::Receiver<()>> {
        let mut ready = Vec::with_capacity(self.config.namespaces.len());

        for ns in &self.config.namespaces {
            let endpoint = registry.resolve(&ns.name).clone();
            let supervisor = BackendSupervisor::new(ns.clone(), endpoint, Arc::clone(&self.factory));
            let reporter = reporter.clone();
            let (tx, rx) = oneshot::channel();
            ready.push(rx);

            tasks.spawn(async move {
                let namespace = supervisor.namespace().to_string();
                if let Err(source) = supervisor.run(Some(tx)).await {
                    reporter.report(LifecycleError::Backend { namespace, source });
                }
            });
        }

        ready
    }

    fn spawn_listener(
        &mut self,
        registry: Arc<NamespaceRegistry>,
        reporter: &FatalReporter,
        tasks: &mut JoinSet<()>,
    ) -> oneshot::Receiver<()> {
        let server = HttpServer::new(&self.config, registry);
        let listener_config = self.config.listener.clone();
        let prebound = self.listener.take();
        let reporter = reporter.clone();
        let (tx, rx) = oneshot::channel();

        tasks.spawn(async move {
            let listener = match prebound {
                Some(listener) => {
                    BoundedListener::from_listener(listener, listener_config.max_connections)
                }
                None => match BoundedListener::bind(&listener_config).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        reporter.report(LifecycleError::Listener(e));
                        return;
                    }
                },
            };
            let _ = tx.send(());

            let err = match server.run(listener).await {
                Ok(()) => std::io::Error::other("public listener stopped"),
                Err(e) => e,
            };
            reporter.report(LifecycleError::Server(err));
        });

        rx
    }
}

/// Wait for every readiness signal, a fatal error, or cancellation.
async fn wait_ready<S>(
    ready: Vec<oneshot::Receiver<()>>,
    tasks: &mut JoinSet<()>,
    slot: &mut FatalSlot,
    shutdown: Pin<&mut S>,
) -> Result<Startup, LifecycleError>
where
    S: Future<Output = ()>,
{
    tokio::select! {
        biased;
        Some(err) = slot.recv() => Err(err),
        _ = shutdown => Ok(Startup::Cancelled),
        Some(res) = tasks.join_next() => Err(exit_error(res, slot)),
        results = join_all(ready) => {
            if results.iter().all(Result::is_ok) {
                Ok(Startup::Ready)
            } else {
                // A task dropped its readiness sender; its error follows.
                Err(next_failure(tasks, slot).await)
            }
        }
    }
}

/// Running phase: block until something fails or cancellation arrives.
async fn run_until_failure<S>(
    tasks: &mut JoinSet<()>,
    slot: &mut FatalSlot,
    shutdown: Pin<&mut S>,
) -> Result<(), LifecycleError>
where
    S: Future<Output = ()>,
{
    tokio::select! {
        biased;
        Some(err) = slot.recv() => Err(err),
        _ = shutdown => Ok(()),
        Some(res) = tasks.join_next() => Err(exit_error(res, slot)),
    }
}

async fn next_failure(tasks: &mut JoinSet<()>, slot: &mut FatalSlot) -> LifecycleError {
    tokio::select! {
        biased;
        Some(err) = slot.recv() => err,
        Some(res) = tasks.join_next() => exit_error(res, slot),
        else => LifecycleError::Task("all supervised tasks ended".to_string()),
    }
}

/// Error for a supervised task that finished.
///
/// Tasks report before they return, so a finished task's error is already in
/// the slot unless it panicked.
fn exit_error(res: Result<(), JoinError>, slot: &mut FatalSlot) -> LifecycleError {
    if let Some(err) = slot.try_recv() {
        return err;
    }
    match res {
        Err(e) => LifecycleError::Task(e.to_string()),
        Ok(()) => LifecycleError::Task("task returned without an error".to_string()),
    }
}
