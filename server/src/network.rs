//! UDP transport in front of the match actor.
//!
//! Datagrams are JSON [`ClientMessage`]s. A receiver task decodes them, a
//! sender task writes replies and broadcasts, and a checker task drops
//! silent clients. The main loop owns the lobby: once enough players have
//! joined it builds the match and hands it to a [`MatchActor`].

use crate::ai::AiStrategy;
use crate::client_manager::{build_reference_table, is_ai_identifier, Client, ClientManager};
use crate::error::GameError;
use crate::game::Pong;
use crate::match_actor::{MatchActor, MatchMessage, MatchOutcome};
use crate::registry::{GameRegistry, MatchConfig};
use log::{debug, error, info, warn};
use pong_shared::{ClientMessage, ProtocolError, ServerMessage, UserInput, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Events sent from network tasks to the main server loop
#[derive(Debug)]
pub enum NetworkEvent {
    MessageReceived {
        message: ClientMessage,
        addr: SocketAddr,
    },
    UnknownMessageType {
        message_type: String,
        addr: SocketAddr,
    },
    ClientTimeout {
        client: Client,
    },
    MatchEnded(MatchOutcome),
    Shutdown,
}

/// Datagrams waiting to be written by the sender task
#[derive(Debug)]
pub enum Outgoing {
    SendTo {
        message: ServerMessage,
        addr: SocketAddr,
    },
    Broadcast(ServerMessage),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub registry: GameRegistry,
    pub match_config: MatchConfig,
    /// Seats played by the server itself.
    pub ai_count: usize,
    /// Strategy every AI seat plays with.
    pub ai_strategy: String,
    pub client_timeout: Duration,
    /// Wall-clock tick period, the registry tick rate when `None`.
    pub tick_duration: Option<Duration>,
}

impl ServerConfig {
    pub fn new(registry: GameRegistry, match_config: MatchConfig) -> Self {
        Self {
            registry,
            match_config,
            ai_count: 0,
            ai_strategy: "naive".to_string(),
            client_timeout: Duration::from_secs(10),
            tick_duration: None,
        }
    }

    /// Seats left for human players.
    pub fn human_seats(&self) -> usize {
        self.match_config.player_count.saturating_sub(self.ai_count)
    }
}

/// Cloneable handle that asks a running server to stop.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.event_tx.send(NetworkEvent::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    config: ServerConfig,
    match_tx: Option<mpsc::UnboundedSender<MatchMessage>>,

    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
    outgoing_rx: Option<mpsc::UnboundedReceiver<Outgoing>>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if config.ai_count > config.match_config.player_count {
            return Err(GameError::InvalidPlayerCount {
                mode: config.match_config.mode.clone(),
                count: config.match_config.player_count,
            }
            .into());
        }
        // Fail before binding if the match could never be built.
        Pong::new(&config.registry, &config.match_config)?;
        AiStrategy::from_registry(&config.ai_strategy, &config.registry.strategies)?;

        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let clients = ClientManager::new(config.human_seats(), config.client_timeout);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(clients)),
            config,
            match_tx: None,
            event_tx,
            event_rx,
            outgoing_tx,
            outgoing_rx: Some(outgoing_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            event_tx: self.event_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let event = match ClientMessage::decode(&buffer[..len]) {
                            Ok(message) => NetworkEvent::MessageReceived { message, addr },
                            Err(ProtocolError::UnknownType(message_type)) => {
                                NetworkEvent::UnknownMessageType { message_type, addr }
                            }
                            Err(ProtocolError::Malformed(reason)) => {
                                warn!("Rejected datagram from {}: {}", addr, reason);
                                continue;
                            }
                        };
                        if let Err(e) = event_tx.send(event) {
                            error!("Failed to send datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing queue
    fn spawn_network_sender(&mut self) {
        let Some(mut outgoing_rx) = self.outgoing_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            while let Some(outgoing) = outgoing_rx.recv().await {
                match outgoing {
                    Outgoing::SendTo { message, addr } => {
                        if let Err(e) = Self::send_impl(&socket, &message, addr).await {
                            error!("Failed to send to {}: {}", addr, e);
                        }
                    }
                    Outgoing::Broadcast(message) => {
                        let addrs = clients.read().await.client_addrs();
                        for addr in addrs {
                            if let Err(e) = Self::send_impl(&socket, &message, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = clients.write().await.check_timeouts();
                for client in timed_out {
                    if event_tx.send(NetworkEvent::ClientTimeout { client }).is_err() {
                        return;
                    }
                }
            }
        });
    }

    async fn send_impl(
        socket: &UdpSocket,
        message: &ServerMessage,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = message.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send(&self, message: ServerMessage, addr: SocketAddr) {
        if let Err(e) = self.outgoing_tx.send(Outgoing::SendTo { message, addr }) {
            error!("Failed to queue message for sending: {}", e);
        }
    }

    fn forward_to_match(&self, message: MatchMessage) {
        if let Some(match_tx) = &self.match_tx {
            if match_tx.send(message).is_err() {
                debug!("Match is no longer running");
            }
        }
    }

    async fn handle_message(&mut self, message: ClientMessage, addr: SocketAddr) {
        match message {
            ClientMessage::Join { player_id } => self.handle_join(player_id, addr).await,

            ClientMessage::UserInput { options } => {
                let seat = {
                    let mut clients = self.clients.write().await;
                    clients.touch(addr);
                    clients.find_by_addr(addr).and_then(|c| c.player_id)
                };
                match seat {
                    Some(seat) => {
                        let input = UserInput::new(options.input_type, options.timestamp, seat);
                        self.forward_to_match(MatchMessage::Input(input));
                    }
                    None => debug!("Ignoring input from {} without a seat", addr),
                }
            }

            ClientMessage::Leave => {
                self.clients.write().await.remove_by_addr(addr);
            }
        }
    }

    async fn handle_join(&mut self, external_id: String, addr: SocketAddr) {
        if is_ai_identifier(&external_id) {
            self.send(ServerMessage::error(format!("`{}` is reserved", external_id)), addr);
            return;
        }

        let joined = {
            let mut clients = self.clients.write().await;
            let in_match = self.match_tx.is_some();
            let known = clients.external_ids().contains(&external_id);
            if in_match && !known {
                Err("match already in progress")
            } else if clients.join(&external_id, addr).is_none() {
                Err("server full")
            } else {
                Ok(self.config.human_seats().saturating_sub(clients.len()))
            }
        };

        match joined {
            Ok(waiting_for) => {
                self.send(ServerMessage::Joined { waiting_for }, addr);
                if waiting_for == 0 && self.match_tx.is_none() {
                    self.start_match().await;
                }
            }
            Err(reason) => self.send(ServerMessage::error(reason), addr),
        }
    }

    /// Seats everyone and spawns the match actor.
    async fn start_match(&mut self) {
        let mut game = match Pong::new(&self.config.registry, &self.config.match_config) {
            Ok(game) => game,
            Err(e) => {
                error!("Failed to create match: {}", e);
                return;
            }
        };

        let reference_table = {
            let mut clients = self.clients.write().await;
            let table = build_reference_table(clients.external_ids(), self.config.ai_count, &mut game.rng);
            clients.assign_seats(&table);
            table
        };
        info!("Starting match with {:?}", reference_table);

        let (match_tx, match_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let strategy = match AiStrategy::from_registry(&self.config.ai_strategy, &self.config.registry.strategies) {
            Ok(strategy) => strategy,
            Err(e) => {
                error!("Failed to create match: {}", e);
                return;
            }
        };
        let mut actor = MatchActor::new(game, reference_table, match_rx, out_tx).with_ai_strategy(strategy);
        if let Some(tick_duration) = self.config.tick_duration {
            actor = actor.with_tick_duration(tick_duration);
        }

        let outgoing_tx = self.outgoing_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                if outgoing_tx.send(Outgoing::Broadcast(message)).is_err() {
                    break;
                }
            }
        });

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = actor.run().await;
            if event_tx.send(NetworkEvent::MatchEnded(outcome)).is_err() {
                debug!("Server stopped before the match ended");
            }
        });

        self.match_tx = Some(match_tx);
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!(
            "Waiting for {} players ({} AI)",
            self.config.match_config.player_count, self.config.ai_count
        );
        if self.config.human_seats() == 0 {
            self.start_match().await;
        }

        while let Some(event) = self.event_rx.recv().await {
            match event {
                NetworkEvent::MessageReceived { message, addr } => {
                    self.handle_message(message, addr).await;
                }
                NetworkEvent::UnknownMessageType { message_type, addr } => {
                    warn!("Unknown message type `{}` from {}", message_type, addr);
                    self.send(ServerMessage::error(format!("unknown message type `{}`", message_type)), addr);
                }
                NetworkEvent::ClientTimeout { client } => {
                    debug!("Dropped {} after timeout", client.external_id);
                }
                NetworkEvent::MatchEnded(outcome) => {
                    info!("Match ended: scores {:?}, results {:?}", outcome.scores, outcome.results);
                    self.match_tx = None;
                    // Let the final broadcast go out before the lobby empties.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    self.clients.write().await.clear();
                }
                NetworkEvent::Shutdown => {
                    info!("Server shutting down");
                    self.forward_to_match(MatchMessage::Terminate);
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::timeout;

    fn test_config(ai_count: usize) -> ServerConfig {
        let mut match_config = MatchConfig::new("classicPong", 2);
        match_config.seed = Some(1);
        let mut config = ServerConfig::new(GameRegistry::builtin().unwrap(), match_config);
        config.ai_count = ai_count;
        config.tick_duration = Some(Duration::from_millis(5));
        config
    }

    async fn start_server(config: ServerConfig) -> (SocketAddr, ServerHandle) {
        let mut server = Server::new("127.0.0.1:0", config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        tokio::spawn(async move { server.run().await.unwrap() });
        (addr, handle)
    }

    async fn client() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn send_json(socket: &UdpSocket, addr: SocketAddr, value: serde_json::Value) {
        socket.send_to(&serde_json::to_vec(&value).unwrap(), addr).await.unwrap();
    }

    async fn receive(socket: &UdpSocket) -> ServerMessage {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buffer))
            .await
            .expect("no reply from server")
            .unwrap();
        ServerMessage::decode(&buffer[..len]).unwrap()
    }

    #[test]
    fn test_human_seats() {
        assert_eq!(test_config(1).human_seats(), 1);
        assert_eq!(test_config(0).human_seats(), 2);
    }

    #[tokio::test]
    async fn test_rejects_too_many_ai() {
        let result = Server::new("127.0.0.1:0", test_config(3)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejects_unknown_ai_strategy() {
        let mut config = test_config(1);
        config.ai_strategy = "oracle".to_string();
        assert!(Server::new("127.0.0.1:0", config).await.is_err());
    }

    #[tokio::test]
    async fn test_join_starts_match_against_ai() {
        let (addr, handle) = start_server(test_config(1)).await;
        let socket = client().await;

        send_json(&socket, addr, json!({ "type": "join", "playerId": "alice" })).await;
        assert_eq!(receive(&socket).await, ServerMessage::Joined { waiting_for: 0 });

        let table = match receive(&socket).await {
            ServerMessage::GameStarted { reference_table } => reference_table,
            other => panic!("Unexpected message: {:?}", other),
        };
        let mut sorted = table.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["ai-0", "alice"]);

        match receive(&socket).await {
            ServerMessage::GameState { reference_table, data } => {
                assert_eq!(reference_table, table);
                assert_eq!(data.scores, vec![0, 0]);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_lobby_waits_and_rejects_reserved_ids() {
        let (addr, handle) = start_server(test_config(0)).await;
        let socket = client().await;

        send_json(&socket, addr, json!({ "type": "join", "playerId": "ai-3" })).await;
        assert!(matches!(receive(&socket).await, ServerMessage::Error { .. }));

        send_json(&socket, addr, json!({ "type": "join", "playerId": "alice" })).await;
        assert_eq!(receive(&socket).await, ServerMessage::Joined { waiting_for: 1 });
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_is_dropped_and_unknown_type_answered() {
        let (addr, handle) = start_server(test_config(0)).await;
        let socket = client().await;

        socket.send_to(b"{not json", addr).await.unwrap();
        send_json(&socket, addr, json!({ "type": "spectate" })).await;

        match receive(&socket).await {
            ServerMessage::Error { message } => assert!(message.contains("spectate")),
            other => panic!("Unexpected message: {:?}", other),
        }
        handle.shutdown();
    }
}
