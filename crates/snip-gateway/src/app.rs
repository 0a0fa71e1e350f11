use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_batch_handler, create_json_handler, create_text_handler, delete_user_urls_handler,
    health_handler, ping_handler, redirect_handler, stats_handler, user_urls_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", post(create_text_handler))
            .route("/health", get(health_handler))
            .route("/ping", get(ping_handler))
            .route("/{code}", get(redirect_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(create_json_handler))
                    .route("/shorten/batch", post(create_batch_handler))
                    .route(
                        "/user/urls",
                        get(user_urls_handler).delete(delete_user_urls_handler),
                    )
                    .route("/internal/stats", get(stats_handler)),
            )
            .layer(CompressionLayer::new())
            .layer(RequestDecompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::USER_ID_HEADER;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use snip_core::Store;
    use snip_generator::SeqGenerator;
    use snip_shortener::ShortenerService;
    use snip_storage::MemoryStore;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::{ServiceBuilder, ServiceExt};

    const BASE_URL: &str = "http://localhost:8080";

    fn test_app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let shortener = ShortenerService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            SeqGenerator::with_prefix("sn"),
            BASE_URL,
        );
        (App::router(AppState::new(shortener)), store)
    }

    fn request(method: Method, uri: &str, user: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        builder.body(body).unwrap()
    }

    fn json_request(method: Method, uri: &str, user: &str, body: Value) -> Request<Body> {
        let mut request = request(method, uri, Some(user), Body::from(body.to_string()));
        request.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        request
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Gzips `payload` through the same compression middleware the router uses.
    async fn gzip(payload: Vec<u8>) -> Vec<u8> {
        let compressor = ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .service_fn(move |_: Request<Body>| {
                let payload = payload.clone();
                async move { Ok::<_, Infallible>(Response::new(Body::from(payload))) }
            });
        let request = Request::builder()
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();

        let response = compressor.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        to_bytes(Body::new(response.into_body()), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = test_app();

        let response = send(&app, request(Method::GET, "/health", None, Body::empty())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn create_from_text_body() {
        let (app, _) = test_app();

        let response = send(
            &app,
            request(
                Method::POST,
                "/",
                Some("alice"),
                Body::from("https://example.com\n"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain"
        );
        assert_eq!(body_text(response).await, "http://localhost:8080/sn000000");
    }

    #[tokio::test]
    async fn create_same_url_twice_conflicts() {
        let (app, _) = test_app();
        let body = json!({ "url": "https://example.com" });

        let first = send(&app, json_request(Method::POST, "/api/shorten", "alice", body.clone())).await;
        let second = send(&app, json_request(Method::POST, "/api/shorten", "bob", body)).await;

        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(second).await,
            json!({ "result": "http://localhost:8080/sn000000" })
        );
    }

    #[tokio::test]
    async fn create_requires_user() {
        let (app, _) = test_app();

        let response = send(
            &app,
            request(Method::POST, "/", None, Body::from("https://example.com")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_empty_url() {
        let (app, _) = test_app();

        let response = send(
            &app,
            json_request(Method::POST, "/api/shorten", "alice", json!({ "url": "" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_create_echoes_correlation_ids() {
        let (app, _) = test_app();
        let body = json!([
            { "correlation_id": "a", "original_url": "https://a.example" },
            { "correlation_id": "b", "original_url": "https://b.example" },
        ]);

        let response = send(
            &app,
            json_request(Method::POST, "/api/shorten/batch", "alice", body),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            json!([
                { "correlation_id": "a", "short_url": "http://localhost:8080/sn000000" },
                { "correlation_id": "b", "short_url": "http://localhost:8080/sn000001" },
            ])
        );
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (app, _) = test_app();

        let response = send(
            &app,
            json_request(Method::POST, "/api/shorten/batch", "alice", json!([])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn redirect_statuses() {
        let (app, store) = test_app();
        store.put("abc", "https://example.com", "alice").await.unwrap();
        store.put("old", "https://old.example", "alice").await.unwrap();
        store.soft_delete("alice", vec!["old".to_string()]).await.unwrap();

        let found = send(&app, request(Method::GET, "/abc", None, Body::empty())).await;
        assert_eq!(found.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(found.headers()[header::LOCATION], "https://example.com");

        let gone = send(&app, request(Method::GET, "/old", None, Body::empty())).await;
        assert_eq!(gone.status(), StatusCode::GONE);

        let missing = send(&app, request(Method::GET, "/nope", None, Body::empty())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_urls_lists_own_records() {
        let (app, store) = test_app();
        store.put("abc", "https://a.example", "alice").await.unwrap();
        store.put("def", "https://b.example", "bob").await.unwrap();

        let response = send(
            &app,
            request(Method::GET, "/api/user/urls", Some("alice"), Body::empty()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{ "short_url": "http://localhost:8080/abc", "original_url": "https://a.example" }])
        );
    }

    #[tokio::test]
    async fn user_urls_without_records_is_no_content() {
        let (app, _) = test_app();

        let response = send(
            &app,
            request(Method::GET, "/api/user/urls", Some("carol"), Body::empty()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_is_accepted_and_applied_later() {
        let (app, store) = test_app();
        store.put("abc", "https://a.example", "alice").await.unwrap();

        let response = send(
            &app,
            json_request(Method::DELETE, "/api/user/urls", "alice", json!(["abc"])),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async {
                store.get("abc").await == Err(snip_core::StoreError::Gone)
            })
            .await;
    }

    #[tokio::test]
    async fn delete_with_empty_list_is_rejected() {
        let (app, _) = test_app();

        let response = send(
            &app,
            json_request(Method::DELETE, "/api/user/urls", "alice", json!([])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_report_counts() {
        let (app, store) = test_app();
        store.put("abc", "https://a.example", "alice").await.unwrap();
        store.put("def", "https://b.example", "bob").await.unwrap();

        let response = send(
            &app,
            request(Method::GET, "/api/internal/stats", None, Body::empty()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "urls": 2, "users": 2 }));
    }

    #[tokio::test]
    async fn ping_follows_store_state() {
        let (app, store) = test_app();

        let up = send(&app, request(Method::GET, "/ping", None, Body::empty())).await;
        assert_eq!(up.status(), StatusCode::OK);

        store.close().await.unwrap();
        let down = send(&app, request(Method::GET, "/ping", None, Body::empty())).await;
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn responses_are_gzipped_on_request() {
        let (app, store) = test_app();
        store.put("abc", "https://a.example/some/long/path", "alice").await.unwrap();
        store.put("def", "https://b.example/another/long/path", "alice").await.unwrap();
        let mut request = request(Method::GET, "/api/user/urls", Some("alice"), Body::empty());
        request
            .headers_mut()
            .insert(header::ACCEPT_ENCODING, "gzip".parse().unwrap());

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }

    #[tokio::test]
    async fn gzipped_request_bodies_are_decompressed() {
        let (app, store) = test_app();
        let payload = json!({ "url": "https://example.com/a/rather/long/path/to/shorten" });
        let compressed = gzip(payload.to_string().into_bytes()).await;

        let mut request = json_request(Method::POST, "/api/shorten", "alice", payload);
        *request.body_mut() = Body::from(compressed);
        request
            .headers_mut()
            .insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            json!({ "result": "http://localhost:8080/sn000000" })
        );
        assert_eq!(
            store.get("sn000000").await.unwrap(),
            "https://example.com/a/rather/long/path/to/shorten"
        );
    }
}
