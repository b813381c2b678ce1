//! Connection bookkeeping and input queuing for one match.
//!
//! Clients are known by the address they send from and by the external
//! identifier they joined with. Their in-game seat is assigned once the
//! match starts, from their position in the shuffled reference table.

use crate::rng::Rng;
use log::info;
use pong_shared::UserInput;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Player inputs waiting for the next tick, kept in timestamp order.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    inputs: Vec<UserInput>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an input after every queued input with the same or an
    /// earlier timestamp, so arrival order breaks ties.
    pub fn push(&mut self, input: UserInput) {
        let index = self.inputs.partition_point(|queued| queued.timestamp <= input.timestamp);
        self.inputs.insert(index, input);
    }

    /// Takes every queued input at once.
    pub fn drain(&mut self) -> Vec<UserInput> {
        std::mem::take(&mut self.inputs)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    /// Identifier the client joined with.
    pub external_id: String,
    /// Address used for replies.
    pub addr: SocketAddr,
    /// Seat in the match, once it started.
    pub player_id: Option<usize>,
    /// Last time we received any datagram from this client.
    pub last_seen: Instant,
}

impl Client {
    pub fn new(external_id: String, addr: SocketAddr) -> Self {
        Self {
            external_id,
            addr,
            player_id: None,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Every human client of the match, in join order.
pub struct ClientManager {
    clients: Vec<Client>,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: Vec::new(),
            max_clients,
            timeout,
        }
    }

    /// Registers a client, or moves a known one to its new address.
    /// Returns `None` when the match is full.
    pub fn join(&mut self, external_id: &str, addr: SocketAddr) -> Option<&Client> {
        if let Some(index) = self.clients.iter().position(|c| c.external_id == external_id) {
            let client = &mut self.clients[index];
            client.addr = addr;
            client.last_seen = Instant::now();
            info!("Client {} rejoined from {}", external_id, addr);
            return self.clients.get(index);
        }

        if self.clients.len() >= self.max_clients {
            return None;
        }

        info!("Client {} connected from {}", external_id, addr);
        self.clients.push(Client::new(external_id.to_string(), addr));
        self.clients.last()
    }

    pub fn remove_by_addr(&mut self, addr: SocketAddr) -> Option<Client> {
        let index = self.clients.iter().position(|c| c.addr == addr)?;
        let client = self.clients.remove(index);
        info!("Client {} disconnected", client.external_id);
        Some(client)
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<&Client> {
        self.clients.iter().find(|c| c.addr == addr)
    }

    /// Records activity from `addr`. Returns false for unknown addresses.
    pub fn touch(&mut self, addr: SocketAddr) -> bool {
        match self.clients.iter_mut().find(|c| c.addr == addr) {
            Some(client) => {
                client.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Gives every client the seat matching its index in `reference_table`.
    pub fn assign_seats(&mut self, reference_table: &[String]) {
        for client in &mut self.clients {
            client.player_id = reference_table.iter().position(|id| *id == client.external_id);
        }
    }

    /// Drops silent clients and returns them.
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        let timeout = self.timeout;
        let (expired, alive): (Vec<Client>, Vec<Client>) =
            self.clients.drain(..).partition(|c| c.is_timed_out(timeout));
        self.clients = alive;

        for client in &expired {
            info!("Client {} timed out", client.external_id);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }

    pub fn external_ids(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.external_id.clone()).collect()
    }

    pub fn client_addrs(&self) -> Vec<SocketAddr> {
        self.clients.iter().map(|c| c.addr).collect()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

const AI_PREFIX: &str = "ai-";

/// Identifier of the `index`-th AI opponent in a reference table.
pub fn ai_identifier(index: usize) -> String {
    format!("{}{}", AI_PREFIX, index)
}

pub fn is_ai_identifier(id: &str) -> bool {
    id.starts_with(AI_PREFIX)
}

/// Seats every participant: humans then AIs, shuffled once. A player's
/// seat is their index in the returned table.
pub fn build_reference_table(humans: Vec<String>, ai_count: usize, rng: &mut Rng) -> Vec<String> {
    let mut table = humans;
    table.extend((0..ai_count).map(ai_identifier));
    rng.shuffle(&mut table);
    table
}
