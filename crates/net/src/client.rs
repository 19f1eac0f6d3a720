//! TCP client for connecting to a board server

use std::net::SocketAddr;

use retro_core::NewCard;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{
    ClientMessage, DeleteCard, IdentityClaim, LikeCard, MoveCard, ServerMessage, SortCards,
};

/// Client handle for network operations
pub struct Client {
    event_rx: mpsc::Receiver<ServerMessage>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

enum ClientCommand {
    Send(ClientMessage),
    Disconnect,
}

impl Client {
    /// Connect to a board server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(connection_task(reader, writer, event_tx, cmd_rx));

        Ok(Client { event_rx, cmd_tx })
    }

    /// Get the next message from the server, `None` once disconnected
    pub async fn next_message(&mut self) -> Option<ServerMessage> {
        self.event_rx.recv().await
    }

    pub async fn send(&self, msg: ClientMessage) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    pub async fn join(&self, username: &str, color: &str) -> Result<()> {
        self.send(ClientMessage::Join(IdentityClaim {
            username: username.to_string(),
            color: color.to_string(),
        }))
        .await
    }

    pub async fn logout(&self, username: &str, color: &str) -> Result<()> {
        self.send(ClientMessage::Logout(IdentityClaim {
            username: username.to_string(),
            color: color.to_string(),
        }))
        .await
    }

    pub async fn add_card(&self, card: NewCard) -> Result<()> {
        self.send(ClientMessage::AddCard(card)).await
    }

    pub async fn delete_card(&self, id: &str, author_name: &str) -> Result<()> {
        self.send(ClientMessage::DeleteCard(DeleteCard {
            id: id.to_string(),
            author_name: author_name.to_string(),
        }))
        .await
    }

    pub async fn move_card(&self, id: &str, new_column: &str) -> Result<()> {
        self.send(ClientMessage::MoveCard(MoveCard {
            id: id.to_string(),
            new_column: new_column.to_string(),
        }))
        .await
    }

    pub async fn like_card(&self, card_id: &str, liked: bool) -> Result<()> {
        self.send(ClientMessage::LikeCard(LikeCard {
            card_id: card_id.to_string(),
            liked,
        }))
        .await
    }

    pub async fn sort_cards(&self, sort_order: &str) -> Result<()> {
        self.send(ClientMessage::SortCards(SortCards {
            sort_order: sort_order.to_string(),
        }))
        .await
    }

    pub async fn toggle_hide_content(&self, hide: bool) -> Result<()> {
        self.send(ClientMessage::ToggleHideContent(hide)).await
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.send(ClientMessage::Ping).await
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }
}

/// Main connection task
///
/// Frames are read on their own task: a half-read frame must never be
/// dropped because a command arrived first.
async fn connection_task(
    reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    event_tx: mpsc::Sender<ServerMessage>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    let mut reader_handle = tokio::spawn(reader_task(reader, event_tx));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
            _ = &mut reader_handle => {
                break;
            }
        }
    }

    reader_handle.abort();
    info!("Disconnected from server");
}

/// Reader task - forwards decoded server messages
async fn reader_task(mut reader: ReadHalf<TcpStream>, event_tx: mpsc::Sender<ServerMessage>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(payload) => match ServerMessage::from_bytes(&payload) {
                Ok(msg) => {
                    if event_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Undecodable server message"),
            },
            Err(Error::ConnectionClosed) => {
                debug!("Server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::server::Server;
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            stats_interval_secs: 0,
            ..ServerConfig::default()
        }
    }

    async fn next(client: &mut Client) -> ServerMessage {
        timeout(Duration::from_secs(5), client.next_message())
            .await
            .expect("timed out waiting for server")
            .expect("connection closed")
    }

    /// Skip messages until one matches
    async fn next_matching(
        client: &mut Client,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        loop {
            let msg = next(client).await;
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_client_receives_board_on_connect() {
        let server = Server::start(test_config()).await.unwrap();
        let mut client = Client::connect(server.addr()).await.unwrap();

        match next(&mut client).await {
            ServerMessage::BoardState(view) => {
                assert!(view.cards.is_empty());
                assert!(!view.hide_content);
            }
            other => panic!("Expected boardState, got {:?}", other),
        }

        client.ping().await.unwrap();
        assert_eq!(next(&mut client).await, ServerMessage::Pong);

        client.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_releases_color_to_other_viewers() {
        let server = Server::start(test_config()).await.unwrap();

        let mut alice = Client::connect(server.addr()).await.unwrap();
        let mut bob = Client::connect(server.addr()).await.unwrap();
        next(&mut alice).await;
        next(&mut bob).await;

        alice.join("Alice", "#f00").await.unwrap();
        next_matching(&mut alice, |m| *m == ServerMessage::JoinSuccess).await;

        bob.join("alice", "#0f0").await.unwrap();
        let msg = next_matching(&mut bob, |m| matches!(m, ServerMessage::Error(_))).await;
        assert_eq!(
            msg,
            ServerMessage::Error(retro_core::Error::NameTaken(String::new()).to_string())
        );

        bob.join("Bob", "#0f0").await.unwrap();
        next_matching(&mut bob, |m| *m == ServerMessage::JoinSuccess).await;

        alice.disconnect().await;
        let released = next_matching(&mut bob, |m| {
            matches!(m, ServerMessage::ColorReleased(_))
        })
        .await;
        assert_eq!(released, ServerMessage::ColorReleased("#f00".into()));

        // Name and color are reusable
        let mut carol = Client::connect(server.addr()).await.unwrap();
        carol.join("ALICE", "#f00").await.unwrap();
        next_matching(&mut carol, |m| *m == ServerMessage::JoinSuccess).await;

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_connection_open() {
        let server = Server::start(test_config()).await.unwrap();

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        read_frame(&mut reader).await.unwrap();

        let bad = serde_json::json!({"type": "likeCard", "payload": "nonsense"});
        write_frame(&mut writer, &bad).await.unwrap();
        let unknown = serde_json::json!({"type": "shuffleBoard", "payload": {}});
        write_frame(&mut writer, &unknown).await.unwrap();
        write_frame(&mut writer, &ClientMessage::Ping).await.unwrap();

        let payload = timeout(Duration::from_secs(5), read_frame(&mut reader))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ServerMessage::from_bytes(&payload).unwrap(), ServerMessage::Pong);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_session_cleanup() {
        let config = ServerConfig {
            stats_interval_secs: 60,
            ..test_config()
        };
        let server = Server::start(config).await.unwrap();
        let hub = server.hub().clone();

        let mut alice = Client::connect(server.addr()).await.unwrap();
        next(&mut alice).await;
        alice.join("Alice", "#f00").await.unwrap();
        next_matching(&mut alice, |m| *m == ServerMessage::JoinSuccess).await;

        timeout(Duration::from_secs(10), server.shutdown())
            .await
            .expect("shutdown did not finish");

        let stats = hub.stats().await;
        assert_eq!(stats.connections, 0);
        assert_eq!(stats.identities, 0);

        // The server side closed, so the client stream ends
        let end = timeout(Duration::from_secs(5), async {
            while alice.next_message().await.is_some() {}
        })
        .await;
        assert!(end.is_ok());
    }
}
