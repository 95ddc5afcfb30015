use crate::drivers::Driver;
use crate::{app::AppState, config::AppConfig, drivers::Drivers};
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::{debug, error, info};
use serde_json::json;
use std::net::SocketAddr;
use sysmon_protocol::v1::action::{ToolRequest, ToolResponse};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::protocols::v1::ProtocolV1;

pub struct WsDriver {
    app_state: AppState,
}

#[async_trait::async_trait]
impl Driver for WsDriver {
    async fn run(&self) -> anyhow::Result<()> {
        let uni_cfg = &AppConfig::get().drivers.websocket_driver_config;
        let addr = SocketAddr::new(uni_cfg.host, uni_cfg.port);

        let app = router(self.app_state.clone()).into_make_service_with_connect_info::<SocketAddr>();

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("WebSocket server listening on {}", addr);

        let stop_token = self.app_state.stop_token.clone();
        let state = self.app_state.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_token.cancelled().await;
                info!("Shutdown signal received, closing connections...");

                let mut ws_handlers = state.ws_connections.lock().await;
                for handler in ws_handlers.drain(..) {
                    if let Err(err) = handler.await {
                        error!("Error handling websocket connection: {}", err);
                    }
                }
            })
            .await
            .context("websocket server failed")
    }

    fn get_driver_type(&self) -> Drivers {
        Drivers::Websocket
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1", get(ws_handler))
        .route("/api/v1/invoke", post(invoke_handler))
        .route("/tools", get(tools_handler))
        .route("/info", get(info_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST]),
        )
}

// WebSocket处理函数
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket connection received from {:?}", addr);
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, addr))
}

// WebSocket连接处理
async fn handle_ws_connection(socket: WebSocket, state: AppState, addr: SocketAddr) {
    let state_clone = state.clone();

    // 将连接加入管理
    let join_handle = tokio::spawn(async move {
        let state_clone = state.clone();
        match state
            .ws_conn_manager
            .serve_connection(socket, state_clone, addr)
            .await
        {
            Ok(_) => debug!("WebSocket connection closed: {}", addr),
            Err(e) => error!("WebSocket error: {}: {}", addr, e),
        }
    });

    let mut connections = state_clone.ws_connections.lock().await;
    connections.retain(|handle| !handle.is_finished());
    connections.push(join_handle);
}

/// One-shot invocation over plain HTTP. Always answers 200 with the response
/// envelope; failures live in `retcode`.
async fn invoke_handler(
    State(state): State<AppState>,
    request: Result<Json<ToolRequest>, JsonRejection>,
) -> Json<ToolResponse> {
    match request {
        Ok(Json(request)) => Json(state.protocol_v1.handle(request).await),
        Err(rejection) => {
            debug!("rejected invoke body: {}", rejection);
            Json(ProtocolV1::bad_request(&rejection.body_text()))
        }
    }
}

async fn tools_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.protocol_v1.registry().describe())
}

// info请求处理
async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "name": "System Monitor Daemon",
            "version": crate::app::VERSION,
            "api_version": "v1",
            "tools": state.protocol_v1.registry().names(),
            "connections": state.ws_conn_manager.len(),
        })),
    )
}

impl WsDriver {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }
}
