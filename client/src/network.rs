use crate::bot::Bot;
use crate::game::{OptimisticGameState, OptimisticSettings};
use crate::staleness::StalenessMonitor;
use log::{debug, error, info, warn};
use shared::{now_millis, Call, CallOutput, Packet, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Largest payload a single UDP datagram can carry
const RECV_BUFFER: usize = 65_507;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_addr: String,
    pub token: String,
    /// Simulated round trip latency, half applied on each direction
    pub fake_ping_ms: u64,
    pub settings: OptimisticSettings,
    /// Play the character with a [`Bot`]
    pub bot: bool,
    pub bot_interval: Duration,
    pub seed: Option<u64>,
    /// Disconnect after this long, run until Ctrl+C when `None`
    pub run_for: Option<Duration>,
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    token: String,
    client_id: Option<u32>,
    connected: bool,
    running: bool,

    game_state: OptimisticGameState,
    staleness: StalenessMonitor,
    bot: Option<Bot>,
    bot_interval: Duration,

    next_request_id: u32,
    pending: HashMap<u32, &'static str>,

    ping_ms: u64,
    fake_ping_ms: u64,
    run_for: Option<Duration>,
}

impl Client {
    pub async fn new(options: ClientOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = options.server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            token: options.token,
            client_id: None,
            connected: false,
            running: true,
            game_state: OptimisticGameState::new(options.settings),
            staleness: StalenessMonitor::default(),
            bot: options.bot.then(|| Bot::new(options.seed)),
            bot_interval: options.bot_interval,
            next_request_id: 1,
            pending: HashMap::new(),
            ping_ms: 0,
            fake_ping_ms: options.fake_ping_ms,
            run_for: options.run_for,
        })
    }

    pub fn game_state(&self) -> &OptimisticGameState {
        &self.game_state
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            token: self.token.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = packet.encode()?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn request(&mut self, call: Call) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending.insert(request_id, call.name());

        debug!("Request {} {}", request_id, call.name());
        if let Err(e) = self
            .send_packet(&Packet::Request { request_id, call })
            .await
        {
            error!("Error sending request: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                if self.connected {
                    return;
                }
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                self.request(Call::Join).await;
            }

            Packet::Response { request_id, result } => {
                let name = self.pending.remove(&request_id).unwrap_or("unknown");
                match result {
                    Ok(CallOutput::Joined(character_id)) => {
                        info!("Playing as {}", character_id);
                        self.game_state.character_id = Some(character_id);
                    }
                    Ok(CallOutput::Spawned(actor_id)) => info!("Spawned {}", actor_id),
                    Ok(CallOutput::Ok) => debug!("{} accepted", name),
                    Err(e) => warn!("{} rejected: {}", name, e),
                }
            }

            Packet::Sync(message) => {
                let received = now_millis();
                self.ping_ms = received.saturating_sub(message.server_time);

                if self
                    .staleness
                    .observe(message.server_time, received, Instant::now())
                {
                    self.request(Call::RequestFullState).await;
                }

                self.game_state.apply_sync(message);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
                self.running = false;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    async fn bot_step(&mut self) {
        let call = match self.bot.as_mut() {
            Some(bot) if self.connected => bot.next_call(&self.game_state),
            _ => None,
        };
        if let Some(call) = call {
            self.request(call).await;
        }
    }

    async fn heartbeat(&mut self) {
        if !self.connected {
            if let Err(e) = self.connect().await {
                error!("Error sending connect: {}", e);
            }
            return;
        }

        debug!(
            "Mirroring {} actors, sync delay {} ms, {} requests in flight",
            self.game_state.actors.len(),
            self.ping_ms,
            self.pending.len()
        );
        if let Err(e) = self.send_packet(&Packet::Heartbeat).await {
            error!("Error sending heartbeat: {}", e);
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut frame_interval = interval(FRAME_INTERVAL);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut bot_interval = interval(self.bot_interval.max(FRAME_INTERVAL));
        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        heartbeat_interval.tick().await;

        let deadline = sleep(self.run_for.unwrap_or(Duration::ZERO));
        tokio::pin!(deadline);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut last_frame = Instant::now();
        let mut buffer = vec![0u8; RECV_BUFFER];

        while self.running {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) if addr == self.server_addr => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            match Packet::decode(&buffer[..len]) {
                                Ok(packet) => self.handle_packet(packet).await,
                                Err(e) => warn!("Dropping malformed packet: {}", e),
                            }
                        },
                        Ok((_, addr)) => debug!("Ignoring datagram from {}", addr),
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = frame_interval.tick() => {
                    let now = Instant::now();
                    self.game_state.frame_callback(now.duration_since(last_frame));
                    last_frame = now;
                },

                _ = bot_interval.tick(), if self.bot.is_some() => {
                    self.bot_step().await;
                },

                _ = heartbeat_interval.tick() => {
                    self.heartbeat().await;
                },

                _ = &mut deadline, if self.run_for.is_some() => {
                    info!("Run time elapsed, leaving");
                    break;
                },

                _ = &mut shutdown => {
                    info!("Shutting down client...");
                    break;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
