use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    let app = Router::new()
        .route("/", get(|| async { Json(json!({"message": "Hello from the mock origin!"})) }))
        .route(
            "/api/data",
            get(|| async {
                Json(json!({"data": "This is some data from the origin", "status": "success"}))
            }),
        )
        .route(
            "/api/echo",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"echo": body, "message": "Echoed successfully"}))
            }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    println!("Mock origin listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
