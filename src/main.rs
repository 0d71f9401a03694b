use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shrike::api;
use shrike::cli;
use shrike::clock::SystemClock;
use shrike::gateway::{kernel::KernelDevice, Gateway};
use shrike::oidc::Provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shrike=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let args = cli::Cli::parse();
    let settings = args.into_settings();

    // Socket server listen address setup
    let listen_address: IpAddr = settings
        .listen_address
        .parse::<IpAddr>()
        .expect("Invalid ip address");
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    let clock = Arc::new(SystemClock);

    // Bring up the tunnel device before accepting any traffic
    let gateway = Arc::new(Gateway::new(
        settings.gateway_config(),
        Box::new(KernelDevice::new()),
        clock.clone(),
    )?);

    let verifier = Arc::new(Provider::new(settings.verifier_config(), clock)?);

    // Background peer reclamation
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let reclaimer = {
        let gateway = gateway.clone();
        let interval = settings.cleanup_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match gateway.cleanup_peers().await {
                            Ok(0) => {}
                            Ok(n) => info!(removed = n, "reclaimed stale peers"),
                            Err(err) => error!(err = %err, "peer reclamation failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        })
    };

    // Build Axum Router
    let router = api::api(api::ApiState {
        gateway: gateway.clone(),
        verifier,
        auth: settings.authz_settings(),
    });

    // Start server
    info!("Starting Shrike on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the reclaimer before the device disappears under it
    let _ = shutdown_tx.send(true);
    reclaimer.await?;

    info!("Tearing down tunnel device");
    gateway.destroy().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
