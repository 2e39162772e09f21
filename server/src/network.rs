//! Server network layer handling UDP communications and the simulation loop

use crate::auth::TokenResolver;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::content::WorldContent;
use crate::persistence::CharacterStore;
use crate::replication::Replicator;
use crate::rpc::{persist_characters, release_character, RequestContext};
use crate::tick::Simulation;
use log::{debug, error, info, warn};
use shared::{now_millis, Call, Packet, RequestError, SyncMessage, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Largest datagram the receiver accepts
pub const MAX_DATAGRAM: usize = 65_507;

/// Operations per sync datagram, larger messages are split
pub const MAX_OPS_PER_DATAGRAM: usize = 64;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Splits a sync message so no datagram carries more than `max_ops`
/// operations. Only the first part clears the mirror and only the last part
/// carries the events, so applying the parts in order equals applying the
/// whole message.
pub fn split_sync(message: SyncMessage, max_ops: usize) -> Vec<SyncMessage> {
    if message.patch.len() <= max_ops {
        return vec![message];
    }
    let SyncMessage {
        full_state,
        patch,
        server_time,
        events,
    } = message;

    let mut parts: Vec<SyncMessage> = patch
        .chunks(max_ops.max(1))
        .enumerate()
        .map(|(index, ops)| SyncMessage {
            full_state: full_state && index == 0,
            patch: ops.to_vec(),
            server_time,
            events: Vec::new(),
        })
        .collect();
    if let Some(last) = parts.last_mut() {
        last.events = events;
    }
    parts
}

/// Main server coordinating networking and the world simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    simulation: Simulation,
    replicator: Replicator,
    store: Box<dyn CharacterStore>,
    tokens: TokenResolver,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::Sender<GameMessage>,
    game_rx: Option<mpsc::Receiver<GameMessage>>,
}

impl Server {
    pub async fn new(
        config: ServerConfig,
        content: WorldContent,
        store: Box<dyn CharacterStore>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let address = config.address();
        let socket = Arc::new(UdpSocket::bind(&address).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::channel(config.send_queue.max(1));

        let tokens = TokenResolver::new(&content.tokens, config.allow_guests);
        let simulation = Simulation::new(content, config.simulation_settings());
        let replicator = Replicator::new(config.optimizer(), config.view_distance);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            simulation,
            replicator,
            store,
            tokens,
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle other tasks can use to stop the server loop
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that reports silent viewers
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let clients_guard = clients.read().await;
                    clients_guard.find_timeouts(timeout)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Queues a packet without waiting. A full queue drops the packet so a
    /// slow socket never stalls the simulation.
    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        match self.game_tx.try_send(GameMessage::SendPacket { packet, addr }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Send queue full, dropping packet to {}", addr),
            Err(TrySendError::Closed(_)) => error!("Send queue closed, dropping packet to {}", addr),
        }
    }

    /// Takes a viewer out, saving and removing its character
    async fn drop_viewer(&mut self, client_id: u32) {
        let viewer = {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id)
        };
        let Some(viewer) = viewer else {
            return;
        };
        self.replicator.remove_viewer(client_id);
        if let Some(character_id) = viewer.character_id {
            if let Err(e) =
                release_character(&mut self.simulation, self.store.as_mut(), character_id)
            {
                error!("Failed to save {} of viewer {}: {}", character_id, client_id, e);
                self.simulation.state.remove_actor(&character_id);
            }
        }
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                token,
            } => {
                info!(
                    "Viewer connecting from {} (version: {})",
                    addr, client_version
                );
                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Replace an existing connection from the same address
                let existing = self.clients.read().await.find_client_by_addr(addr);
                if let Some(existing_id) = existing {
                    info!("Replacing viewer {} from {}", existing_id, addr);
                    self.drop_viewer(existing_id).await;
                }

                let identity = self.tokens.resolve(&token);
                if identity.is_none() {
                    warn!("Viewer from {} presented an unknown token", addr);
                }
                let client_id = self.clients.write().await.add_client(addr, identity);

                let response = match client_id {
                    Some(client_id) => Packet::Connected { client_id },
                    None => Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                };
                self.send_packet(response, addr);
            }

            Packet::Request { request_id, call } => {
                let result = self.handle_request(addr, call).await;
                self.send_packet(Packet::Response { request_id, result }, addr);
            }

            Packet::Heartbeat => {
                let mut clients = self.clients.write().await;
                if let Some(client_id) = clients.find_client_by_addr(addr) {
                    clients.touch(client_id);
                }
            }

            Packet::Disconnect => {
                let client_id = self.clients.read().await.find_client_by_addr(addr);
                if let Some(client_id) = client_id {
                    self.drop_viewer(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from viewer at {}", addr);
            }
        }
    }

    async fn handle_request(&mut self, addr: SocketAddr, call: Call) -> shared::CallResult {
        let mut clients = self.clients.write().await;
        let Some(client_id) = clients.find_client_by_addr(addr) else {
            warn!("Request from unconnected address {}", addr);
            return Err(RequestError::Unauthenticated);
        };
        clients.touch(client_id);
        let Some(viewer) = clients.get_mut(client_id) else {
            return Err(RequestError::Unauthenticated);
        };

        debug!("Viewer {} calls {}", client_id, call.name());
        RequestContext {
            simulation: &mut self.simulation,
            store: self.store.as_mut(),
            replicator: &mut self.replicator,
            viewer,
        }
        .handle(call)
    }

    /// Advances the world one step and streams the changes
    async fn tick(&mut self, dt: Duration) {
        if let Err(e) = self.simulation.tick(dt) {
            error!("Tick {} aborted: {}", self.simulation.state.tick, e);
        }

        let (observers, addrs) = {
            let clients = self.clients.read().await;
            (clients.observers(), clients.get_client_addrs())
        };
        let messages = self
            .replicator
            .flush(&mut self.simulation.state, &observers, now_millis());

        for (client_id, message) in messages {
            let Some(addr) = addrs
                .iter()
                .find(|(id, _)| *id == client_id)
                .map(|(_, addr)| *addr)
            else {
                continue;
            };
            for part in split_sync(message, MAX_OPS_PER_DATAGRAM) {
                self.send_packet(Packet::Sync(part), addr);
            }
        }

        if self.simulation.state.tick % 100 == 0 && !observers.is_empty() {
            debug!(
                "Tick {}: {} viewers, {} actors",
                self.simulation.state.tick,
                observers.len(),
                self.simulation.state.actors.len()
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let dt = self.config.tick_duration();
        let mut tick_interval = interval(dt);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut persist_interval = interval(self.config.persist_interval());
        // the first tick of an interval fires immediately
        persist_interval.tick().await;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Viewer {} timed out", client_id);
                            self.drop_viewer(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.tick(dt).await;
                },

                _ = persist_interval.tick() => {
                    persist_characters(&self.simulation, self.store.as_mut());
                },

                _ = &mut shutdown => {
                    info!("Received Ctrl+C, shutting down gracefully...");
                    break;
                }
            }
        }

        persist_characters(&self.simulation, self.store.as_mut());
        Ok(())
    }
}
