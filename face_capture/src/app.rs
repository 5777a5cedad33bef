use crate::camera;
use crate::config::Config;
use crate::inference::InferenceClient;
use crate::server::{HttpServer, SharedState};
use crate::session::SessionController;
use crate::stream::VideoStream;
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let source = match camera::start(&config.camera) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("Failed to initialize camera: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let jpeg_quality = config.camera.get_jpeg_quality();
    let inference = match InferenceClient::new(&config.inference, jpeg_quality) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize inference client: {:?}", e);
            return Err(Box::new(e));
        }
    };
    tracing::info!("Using recognition backend at {}", inference.base_url());

    tokio::spawn({
        let inference = inference.clone();
        let retries = config.inference.health_retries;
        async move {
            inference.check_health(retries).await;
        }
    });

    let metrics = Arc::new(Metrics::new()?);
    let session = SessionController::new(source.clone(), inference.clone())
        .with_metrics(metrics.clone());

    let state = SharedState {
        session: Arc::new(session),
        source: source.clone(),
        backend: inference,
        video_stream: VideoStream::new(
            source,
            config.camera.get_stream_delay_ms(),
            jpeg_quality,
        ),
        metrics,
        jpeg_quality,
    };

    let server = HttpServer::new(state, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    if let Ok(Err(e)) = server_handle.await {
        tracing::error!("Server stopped with error: {:?}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
