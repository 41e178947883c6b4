//! ==============================================================================
//! server.rs - http surface: static assets, websocket upgrade, face uploads
//! ==============================================================================
//!
//! purpose:
//!     everything the browser talks to. the pre-built ui assets are served
//!     straight from a directory; /ws upgrades into the state-sync session;
//!     /upload_face and /delete_face are the out-of-band face artifact
//!     endpoints the faces page uses.
//!
//! routes:
//!     GET    /ws                  -> session::run
//!     POST   /upload_face         -> multipart, field "file"
//!     DELETE /delete_face/<name>  -> remove artifact by filename stem
//!     *                           -> ServeDir(static assets)
//!
//! relationships:
//!     - built by: main.rs
//!     - hands sockets to: session.rs
//!     - upload/delete facts go to: faces.rs
//!
//! ==============================================================================

use axum::{
    extract::{Multipart, Path, Request, State, WebSocketUpgrade},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::faces;
use crate::session;
use crate::AppCtx;

pub fn build_router(ctx: AppCtx, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/ws", get(ws_route))
        .route("/upload_face", post(upload_face))
        .route("/delete_face/*name", any(delete_face))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// request log line for every hit, like the firmware dev server prints
async fn log_requests(request: Request, next: Next) -> Response {
    println!("[HTTP] {} {}", request.method(), request.uri().path());
    next.run(request).await
}

async fn ws_route(ws: WebSocketUpgrade, State(ctx): State<AppCtx>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::run(socket, ctx))
}

/// multipart upload of one face archive. the body is read and discarded;
/// the simulator only records that the named artifact now exists.
async fn upload_face(
    State(ctx): State<AppCtx>,
    mut multipart: Multipart,
) -> (StatusCode, &'static str) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            break;
        };
        if field.bytes().await.is_err() {
            break;
        }
        println!("[FACES] upload: {}", filename);
        ctx.faces.on_upload(&filename).await;
        return (StatusCode::OK, "File uploaded");
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
}

/// delete a face artifact by path. only DELETE is meaningful here; the
/// artifact must already be registered or the call fails and the store
/// stays untouched.
async fn delete_face(
    State(ctx): State<AppCtx>,
    method: Method,
    Path(name): Path<String>,
) -> (StatusCode, &'static str) {
    if method != Method::DELETE {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Unknown request");
    }
    if ctx.faces.on_delete(faces::artifact_key(&name)).await {
        (StatusCode::OK, "File deleted")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Delete failed")
    }
}
