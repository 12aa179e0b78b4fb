use aisop_core::PhaseTracker;
use anyhow::{Context, Result};

/// Serve the dashboard until Ctrl-C.
pub fn run(tracker: PhaseTracker, port: u16, open_browser: bool) -> Result<()> {
    let graph = tracker.phase_graph().name.clone();
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind dashboard port {port}"))?;
        let actual_port = listener.local_addr()?.port();

        println!("AI-SOP dashboard ({graph} phases) at http://localhost:{actual_port}");
        println!("Press Ctrl-C to stop.");

        tokio::select! {
            res = aisop_server::serve_on(tracker, listener, open_browser) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("dashboard stopped");
                Ok(())
            }
        }
    })
}
