use crate::{
    camera::FrameSource, config::ServerConfig, inference::InferenceClient, routes::api_routes,
    session::SessionController, stream::VideoStream, telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

#[derive(Clone)]
pub struct SharedState {
    pub session: Arc<SessionController>,
    pub source: Arc<dyn FrameSource>,
    pub backend: Arc<InferenceClient>,
    pub video_stream: VideoStream,
    pub metrics: Arc<Metrics>,
    pub jpeg_quality: u8,
}

pub fn build_router(state: SharedState) -> Router {
    let metrics_layer = HttpMetricsLayerBuilder::new().build();

    Router::new()
        .merge(api_routes())
        .with_state(state)
        .layer(metrics_layer)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: SharedState, config: &ServerConfig) -> anyhow::Result<Self> {
        let addr = config.get_address();
        let router = build_router(state);
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting face capture station on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::InferenceConfig,
        session::{
            tests::{alice, BrokenSource, FakeInference, Reply, SolidSource},
            SessionState,
        },
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Json,
    };
    use face_proto::{EnrollmentRequest, UPLOAD_FACE_PATH};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::{io::AsyncWriteExt, net::TcpStream, sync::Notify};
    use tower::ServiceExt;

    const UNUSED_BACKEND: &str = "http://127.0.0.1:9";

    fn backend_client(base_url: &str) -> Arc<InferenceClient> {
        let config = InferenceConfig {
            context_host: "localhost".to_string(),
            local_url: base_url.to_string(),
            remote_url: "http://unused.invalid".to_string(),
            health_retries: 0,
        };
        Arc::new(InferenceClient::new(&config, 80).unwrap())
    }

    fn state_with(
        source: Arc<dyn FrameSource>,
        inference: Arc<FakeInference>,
        backend_url: &str,
    ) -> SharedState {
        let metrics = Arc::new(Metrics::new().unwrap());
        let session = SessionController::new(source.clone(), inference).with_metrics(metrics.clone());
        SharedState {
            session: Arc::new(session),
            source: source.clone(),
            backend: backend_client(backend_url),
            video_stream: VideoStream::new(source, 10, 80),
            metrics,
            jpeg_quality: 80,
        }
    }

    fn router(reply: Reply) -> Router {
        build_router(state_with(
            Arc::new(SolidSource),
            Arc::new(FakeInference::new(reply)),
            UNUSED_BACKEND,
        ))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn snapshot_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/snapshot")
            .body(Body::empty())
            .unwrap()
    }

    fn enroll_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/enroll")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn post_snapshot(router: Router) -> (StatusCode, Value) {
        send(router, snapshot_request()).await
    }

    async fn spawn_backend(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_snapshot_success_reply() {
        let unknown = face_proto::Detection {
            name: "Unknown".to_string(),
            distance: None,
            x: 5,
            y: 5,
            w: 50,
            h: 50,
        };
        let (status, body) =
            post_snapshot(router(Reply::Detections(vec![alice(), unknown]))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["face_count"], 2);
        assert_eq!(body["summary"], "Faces Detected: 2");
        assert_eq!(body["detections"][0]["label"], "Alice — Match: 0.88");
        assert_eq!(body["detections"][0]["color"], "#00d1b2");
        assert_eq!(body["detections"][1]["label"], "Unknown");
        assert_eq!(body["detections"][1]["score"], Value::Null);
        assert_eq!(body["detections"][1]["color"], "#ff3860");
        assert!(body["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_snapshot_service_error_reply() {
        let (status, body) = post_snapshot(router(Reply::Service("no face"))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Error: no face");
    }

    #[tokio::test]
    async fn test_snapshot_transport_error_reply() {
        let (status, body) = post_snapshot(router(Reply::Transport)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Failed to connect to backend server.");
    }

    #[tokio::test]
    async fn test_snapshot_camera_error_reply() {
        let inference = Arc::new(FakeInference::new(Reply::Detections(vec![])));
        let router = build_router(state_with(
            Arc::new(BrokenSource),
            inference.clone(),
            UNUSED_BACKEND,
        ));

        let (status, body) = post_snapshot(router).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "error");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Could not access camera."));
        assert_eq!(inference.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_snapshot_while_busy_is_conflict() {
        let gate = Arc::new(Notify::new());
        let inference = Arc::new(FakeInference::gated(
            Reply::Detections(vec![alice()]),
            gate.clone(),
        ));
        let entered = inference.entered.clone();
        let router = build_router(state_with(
            Arc::new(SolidSource),
            inference.clone(),
            UNUSED_BACKEND,
        ));

        let first = tokio::spawn(post_snapshot(router.clone()));
        entered.notified().await;

        let (status, body) = post_snapshot(router).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "busy");

        gate.notify_one();
        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["face_count"], 1);
        assert_eq!(inference.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_hangup_keeps_cycle_running() {
        let gate = Arc::new(Notify::new());
        let inference = Arc::new(FakeInference::gated(
            Reply::Detections(vec![alice()]),
            gate.clone(),
        ));
        let entered = inference.entered.clone();
        let state = state_with(Arc::new(SolidSource), inference, UNUSED_BACKEND);
        let session = state.session.clone();
        let station = spawn_backend(build_router(state)).await;

        let mut client = TcpStream::connect(station.trim_start_matches("http://"))
            .await
            .unwrap();
        client
            .write_all(b"POST /snapshot HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        entered.notified().await;
        assert_eq!(session.state(), SessionState::Capturing);

        drop(client);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.state(), SessionState::Capturing);

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.state() != SessionState::Idle {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_enroll_uploads_captured_frame() {
        let backend = Router::new().route(
            UPLOAD_FACE_PATH,
            post(|Json(request): Json<EnrollmentRequest>| async move {
                assert!(request.image.starts_with("data:image/jpeg;base64,"));
                Json(serde_json::json!({
                    "status": "success",
                    "message": format!("Face registered for {}", request.name),
                }))
            }),
        );
        let backend_url = spawn_backend(backend).await;
        let router = build_router(state_with(
            Arc::new(SolidSource),
            Arc::new(FakeInference::new(Reply::Transport)),
            &backend_url,
        ));

        let (status, body) = send(
            router,
            enroll_request(serde_json::json!({"name": " Alice ", "department": "Ops"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Face registered for Alice");
    }

    #[tokio::test]
    async fn test_enroll_without_name_is_bad_request() {
        let (status, body) = send(
            router(Reply::Transport),
            enroll_request(serde_json::json!({"employee_id": "E-7"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Name is required");
    }

    #[tokio::test]
    async fn test_employees_unreachable_backend() {
        let request = Request::builder()
            .uri("/employees")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(router(Reply::Transport), request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Failed to connect to backend server.");
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (_, body) = send(router(Reply::Transport), request).await;

        assert_eq!(body["status"], "Available");
        assert_eq!(body["session"], "idle");
        assert_eq!(body["backend"], UNUSED_BACKEND);
    }
}
