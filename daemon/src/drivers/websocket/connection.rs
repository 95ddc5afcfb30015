use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::{atomic, Arc};
use tokio::select;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::app::AppState;

pub struct WebsocketConnection {
    pub app_state: AppState,

    pub sender: UnboundedSender<Message>,
    pub addr: SocketAddr,
}

impl WebsocketConnection {
    fn new(
        app_state: AppState,
        sender: UnboundedSender<Message>,
        addr: SocketAddr,
    ) -> WebsocketConnection {
        WebsocketConnection {
            app_state,
            sender,
            addr,
        }
    }
}

impl WebsocketConnection {
    /// The caller may be gone by the time a slow sample finishes; the reply
    /// is then dropped.
    pub fn weak_send(weak_sender: WeakUnboundedSender<Message>, data: Message) {
        if let Some(sender) = weak_sender.upgrade() {
            if let Err(msg) = sender.send(data) {
                debug!("could not send message due to ws sender dropped: {}", msg);
            }
        } else {
            debug!(
                "could not send message due to ws sender dropped: {:#?}",
                data
            );
        }
    }
}

pub struct WsConnManager {
    id: AtomicUsize,
    connections: scc::HashMap<usize, Arc<WebsocketConnection>, ahash::RandomState>,
}

impl Default for WsConnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConnManager {
    pub fn new() -> Self {
        Self {
            id: AtomicUsize::new(0),
            connections: scc::HashMap::default(),
        }
    }
}

impl WsConnManager {
    fn add(&self, conn: Arc<WebsocketConnection>) -> usize {
        let id = self.id.fetch_add(1, atomic::Ordering::Relaxed);
        let _ = self.connections.insert(id, conn);
        id
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub async fn serve_connection(
        &self,
        ws: WebSocket,
        app_state: AppState,
        peer_addr: SocketAddr,
    ) -> anyhow::Result<()> {
        let (mut outgoing, mut incoming) = ws.split();

        let (outgoing_tx, mut outgoing_rx) = unbounded_channel();

        let ws_conn = Arc::new(WebsocketConnection::new(
            app_state.clone(),
            outgoing_tx,
            peer_addr,
        ));

        let cancel_token = app_state.stop_token.clone();

        let ws_conn_clone = ws_conn.clone();

        let connection_loop = || async move {
            loop {
                select! {
                    // read
                    msg = incoming.next() => {
                        if let Some(Ok(m)) = msg {
                            ws_conn_clone.handle_received(m)?
                        }
                        else {
                            break;
                        }
                    }

                    // write
                    msg = outgoing_rx.recv() => {
                        if let Some(m) = msg {
                            outgoing.send(m).await?;
                        }
                        else {
                            break;
                        }
                    }

                    // cancel
                    _ = cancel_token.cancelled() => {
                        outgoing.send(Message::Close(Some(CloseFrame{
                            code: close_code::NORMAL,
                            reason: "daemon closed".into()
                        }))).await?;
                        info!("websocket connection from {} closed", peer_addr);
                        break;
                    }
                }
            }
            anyhow::Ok(())
        };
        let id = self.add(ws_conn);
        let rv = tokio::spawn(connection_loop()).await;
        self.connections.remove(&id);
        rv?
    }
}
