//! Shared utilities for integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use namespace_proxy::backend::BackendError;
use namespace_proxy::config::{NamespaceConfig, ProxyConfig};
use namespace_proxy::namespace::Endpoint;
use namespace_proxy::{Coordinator, LifecycleError, Phase};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running proxy over a temporary state directory.
#[allow(dead_code)]
pub struct TestProxy {
    pub base: String,
    pub state_dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), LifecycleError>>,
}

#[allow(dead_code)]
impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    /// Cancel the proxy and return its outcome.
    pub async fn stop(mut self) -> Result<(), LifecycleError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("proxy did not stop")
            .expect("proxy task panicked")
    }
}

/// Configuration for `names` with the first treated as default.
pub fn config(state_dir: &Path, names: &[&str], default: &str) -> ProxyConfig {
    ProxyConfig {
        namespaces: names
            .iter()
            .map(|name| NamespaceConfig {
                name: name.to_string(),
                upstream: "http://upstream.invalid".to_string(),
            })
            .collect(),
        default_namespace: default.to_string(),
        state_dir: state_dir.to_path_buf(),
        ..ProxyConfig::default()
    }
}

#[allow(dead_code)]
/// Start a proxy whose backend for each namespace is `app(name)`.
///
/// Returns once the coordinator reports `Running`.
pub async fn start_proxy<F>(names: &[&str], default: &str, app: F) -> TestProxy
where
    F: Fn(&str) -> Router + Send + Sync + 'static,
{
    let state_dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let factory = move |ns: &NamespaceConfig, _: &Endpoint| -> Result<Router, BackendError> {
        Ok(app(&ns.name))
    };
    let coordinator = Coordinator::new(config(state_dir.path(), names, default), Arc::new(factory))
        .with_listener(listener);
    let mut phase = coordinator.phase();

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(coordinator.run(async {
        let _ = stopped.await;
    }));

    tokio::time::timeout(
        Duration::from_secs(5),
        phase.wait_for(|p| *p == Phase::Running),
    )
    .await
    .expect("proxy did not start")
    .expect("proxy terminated during startup");

    TestProxy {
        base,
        state_dir,
        stop: Some(stop),
        task,
    }
}

#[allow(dead_code)]
/// HTTP client that ignores any proxy settings in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
