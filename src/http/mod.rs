//! HTTP surface: routes, admission gate and server.

mod gate;
mod handlers;
mod server;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;

pub use gate::{RequestGate, LIMIT_HEADER, REMAINING_HEADER};
pub use server::HttpServer;

use crate::books::BookStore;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<BookStore>,
    pub gate: RequestGate,
}

impl AppState {
    pub fn new(books: Arc<BookStore>, gate: RequestGate) -> Self {
        Self { books, gate }
    }
}

/// Build the router with every route behind the request gate.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route(
            "/books/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gate::enforce,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RATE_LIMIT_DETAIL;
    use crate::ratelimit::{ForwardedForResolver, PeerAddrResolver, RateLimiter};
    use axum::body::Body;
    use axum::extract::{ConnectInfo, Request};
    use axum::http::{header, Method, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(quota: u32) -> AppState {
        let limiter = Arc::new(RateLimiter::new(quota, Duration::from_secs(60)).unwrap());
        let books = Arc::new(BookStore::new());
        books.seed();
        AppState::new(books, RequestGate::new(limiter, Arc::new(PeerAddrResolver)))
    }

    fn request(method: Method, uri: &str, peer: &str, body: Option<Value>) -> Request {
        let builder = Request::builder().method(method).uri(uri);
        let mut request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    async fn send(state: &AppState, request: Request) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn new_book() -> Value {
        json!({
            "title": "New Book",
            "author": "Author Name",
            "description": "A new book description",
            "isbn": "123-4567890123",
            "published_year": 2023
        })
    }

    #[tokio::test]
    async fn test_root() {
        let state = test_state(100);
        let response = send(&state, request(Method::GET, "/", "127.0.0.1:1", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Welcome to the Library Management API"
        );
    }

    #[tokio::test]
    async fn test_create_book() {
        let state = test_state(100);
        let response = send(
            &state,
            request(Method::POST, "/books", "127.0.0.1:1", Some(new_book())),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["title"], "New Book");
        assert_eq!(body["id"], 2);
        assert_eq!(state.books.len(), 3);
    }

    #[tokio::test]
    async fn test_list_books() {
        let state = test_state(100);
        let response = send(&state, request(Method::GET, "/books", "127.0.0.1:1", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = send(
            &state,
            request(Method::GET, "/books?skip=1&limit=5", "127.0.0.1:1", None),
        )
        .await;
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "To Kill a Mockingbird");
    }

    #[tokio::test]
    async fn test_get_book() {
        let state = test_state(100);
        let response = send(&state, request(Method::GET, "/books/0", "127.0.0.1:1", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "The Great Gatsby");
    }

    #[tokio::test]
    async fn test_get_missing_book() {
        let state = test_state(100);
        let response = send(&state, request(Method::GET, "/books/42", "127.0.0.1:1", None)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Book not found");
    }

    #[tokio::test]
    async fn test_update_book() {
        let state = test_state(100);
        let mut update = new_book();
        update["title"] = json!("Updated Book");

        let response = send(
            &state,
            request(Method::PUT, "/books/0", "127.0.0.1:1", Some(update.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "Updated Book");

        let response = send(
            &state,
            request(Method::PUT, "/books/9", "127.0.0.1:1", Some(update)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_book() {
        let state = test_state(100);
        let response = send(&state, request(Method::DELETE, "/books/0", "127.0.0.1:1", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Book with id 0 has been deleted"
        );

        let response = send(&state, request(Method::DELETE, "/books/0", "127.0.0.1:1", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gate_rejects_over_quota() {
        let state = test_state(2);

        for remaining in ["1", "0"] {
            let response = send(&state, request(Method::GET, "/books", "10.0.0.1:5000", None)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[LIMIT_HEADER], "2");
            assert_eq!(response.headers()[REMAINING_HEADER], remaining);
        }

        let response = send(&state, request(Method::GET, "/books", "10.0.0.1:5000", None)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(body_json(response).await, json!({ "detail": RATE_LIMIT_DETAIL }));
    }

    #[tokio::test]
    async fn test_gate_short_circuits_before_handler() {
        let state = test_state(1);

        send(&state, request(Method::GET, "/", "10.0.0.1:5000", None)).await;
        let response = send(
            &state,
            request(Method::POST, "/books", "10.0.0.1:5000", Some(new_book())),
        )
        .await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(state.books.len(), 2);
    }

    #[tokio::test]
    async fn test_gate_tracks_clients_separately() {
        let state = test_state(1);

        let a = send(&state, request(Method::GET, "/", "10.0.0.1:5000", None)).await;
        let b = send(&state, request(Method::GET, "/", "10.0.0.2:5000", None)).await;
        let a_again = send(&state, request(Method::GET, "/", "10.0.0.1:5001", None)).await;

        assert_eq!(a.status(), StatusCode::OK);
        assert_eq!(b.status(), StatusCode::OK);
        assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_reset_readmits_client() {
        let state = test_state(1);

        send(&state, request(Method::GET, "/", "10.0.0.1:5000", None)).await;
        let rejected = send(&state, request(Method::GET, "/", "10.0.0.1:5000", None)).await;
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

        state.gate.limiter().reset();
        let admitted = send(&state, request(Method::GET, "/", "10.0.0.1:5000", None)).await;
        assert_eq!(admitted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_resolver_keys_by_header() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)).unwrap());
        let state = AppState::new(
            Arc::new(BookStore::new()),
            RequestGate::new(limiter, Arc::new(ForwardedForResolver)),
        );

        let mut first = request(Method::GET, "/", "10.0.0.1:5000", None);
        first
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
        let mut second = request(Method::GET, "/", "10.0.0.1:5000", None);
        second
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.2".parse().unwrap());

        assert_eq!(send(&state, first).await.status(), StatusCode::OK);
        assert_eq!(send(&state, second).await.status(), StatusCode::OK);
        assert_eq!(state.gate.limiter().client_count(), 2);
    }
}
