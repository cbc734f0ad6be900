//! Service layer: owns both registries and exposes them through rate-limited agents.

mod affinity;
mod agent;
#[cfg(feature = "http-server")]
pub mod http;
mod rate_limit;

use std::sync::Arc;

use anyhow::{Context, bail};
use parking_lot::Mutex;

use crate::config::Settings;
use crate::process::{ProcFileLinker, ProcessLinker, ProcessRegistry};
use crate::share::ShareRegistry;

pub use affinity::pin_current_process;
pub use agent::{ProcessAgent, ShareAgent};
pub use rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Both registries plus their agents.
///
/// Must be created inside a tokio runtime.
pub struct KrakenServer {
    settings: Settings,
    process: Arc<ProcessAgent>,
    share: Arc<ShareAgent>,
    lifecycle: Mutex<Lifecycle>,
}

impl KrakenServer {
    /// Server backed by the descriptor-file linker.
    pub fn new(settings: Settings) -> Self {
        let linker = Arc::new(ProcFileLinker::new(settings.tracking.process.clone()));
        Self::with_linker(settings, linker)
    }

    pub fn with_linker(settings: Settings, linker: Arc<dyn ProcessLinker>) -> Self {
        let interval = settings.server.rate_limit_interval();
        let process = ProcessRegistry::new(&settings.tracking, &settings.monitor, linker);
        let share = ShareRegistry::new(&settings.tracking);

        Self {
            process: Arc::new(ProcessAgent::new(Arc::new(process), interval)),
            share: Arc::new(ShareAgent::new(Arc::new(share), interval)),
            settings,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn process_agent(&self) -> Arc<ProcessAgent> {
        Arc::clone(&self.process)
    }

    pub fn share_agent(&self) -> Arc<ShareAgent> {
        Arc::clone(&self.share)
    }

    /// Pin to the configured CPUs and start tracking both roots.
    ///
    /// Returns `Ok(false)` when already running. A stopped server cannot be restarted.
    pub async fn start(&self) -> anyhow::Result<bool> {
        {
            let mut lifecycle = self.lifecycle.lock();
            match *lifecycle {
                Lifecycle::Running => return Ok(false),
                Lifecycle::Stopped => bail!("server was stopped and cannot be restarted"),
                Lifecycle::Idle => *lifecycle = Lifecycle::Running,
            }
        }

        let cpus = &self.settings.server.real_time;
        if !cpus.is_empty() {
            match pin_current_process(cpus) {
                Ok(()) => crate::log_event!("server", "pinned", "cpus {cpus:?}"),
                Err(e) => tracing::warn!("[server] cannot pin to cpus {cpus:?}: {e}"),
            }
        }

        self.process
            .registry()
            .start_tracking()
            .await
            .context("Failed to start process tracking")?;
        self.share
            .registry()
            .start_tracking()
            .await
            .context("Failed to start share tracking")?;

        crate::log_event!(
            "server",
            "started",
            "process root {}, share root {}",
            self.process.registry().root().display(),
            self.share.registry().root().display()
        );
        Ok(true)
    }

    /// Stop tracking and dispose both registries. Returns `false` unless running.
    pub async fn stop(&self) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Running {
                return false;
            }
            *lifecycle = Lifecycle::Stopped;
        }

        self.process.registry().stop_tracking();
        self.share.registry().stop_tracking();
        self.process.registry().dispose().await;
        self.share.registry().dispose().await;
        crate::log_event!("server", "stopped");
        true
    }

    /// Start, serve HTTP until `shutdown` resolves, then stop.
    #[cfg(feature = "http-server")]
    pub async fn serve(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        self.start().await?;

        let bind = self.settings.server.bind();
        let state = http::AppState {
            process: self.process_agent(),
            share: self.share_agent(),
        };
        let router = http::router(state, self.settings.server.compression);

        let result = async {
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;
            crate::log_event!("server", "listening", "http://{bind}");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .context("HTTP server failed")
        }
        .await;

        self.stop().await;
        result
    }

    /// Start and block until `shutdown` resolves, then stop.
    #[cfg(not(feature = "http-server"))]
    pub async fn serve(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        self.start().await?;
        tracing::warn!("[server] built without http-server; no remote surface");
        shutdown.await;
        self.stop().await;
        Ok(())
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[server] cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    crate::log_event!("server", "shutdown requested");
}
