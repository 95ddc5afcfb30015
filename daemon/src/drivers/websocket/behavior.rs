use crate::drivers::websocket::WebsocketConnection;
use crate::protocols::Protocol;
use axum::extract::ws::{CloseFrame, Message};
use log::{debug, info};

impl WebsocketConnection {
    pub fn handle_received(&self, data: Message) -> anyhow::Result<()> {
        match data {
            Message::Text(text) => {
                debug!("received text from {}: {}", self.addr, text.as_str());

                let v1 = self.app_state.protocol_v1.clone();
                let sender = self.sender.downgrade();

                // every request on its own task, replies may overtake each other
                tokio::spawn(async move {
                    if let Some(reply) = v1.process_text(text.as_str()).await {
                        Self::weak_send(sender, Message::Text(reply.into()));
                    }
                });
            }
            Message::Binary(bin) => {
                debug!(
                    "ignoring {} byte binary frame from {}",
                    bin.len(),
                    self.addr
                );
            }
            Message::Close(close) => {
                self.handle_closing(close.as_ref());
            }
            _ => {}
        }
        Ok(())
    }

    pub fn handle_closing(&self, msg: Option<&CloseFrame>) {
        info!(
            "websocket close from client({}), with reason: {}",
            self.addr,
            msg.map(|f| f.reason.as_str()).unwrap_or_default()
        );
    }
}
