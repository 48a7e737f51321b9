//! Network Topology Simulation
//!
//! Graph of RSU nodes and proximity-based links. The topology is rebuilt from
//! an RSU snapshot rather than patched, and attack effects are layered onto
//! the freshly built graph.
use crate::attack_sim::catalog::AttackVector;
use crate::types::{GeoPoint, Rsu, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum distance (km) at which two RSUs are linked
pub const CONNECTION_RANGE_KM: f64 = 3.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

const BASE_THROUGHPUT_MBPS: f64 = 100.0;
const BASE_PROCESSING_LOAD: f64 = 0.3;
const BASE_DETECTION_CAPABILITY: f64 = 0.7;
/// Below this trust an RSU node starts out degraded
const DEGRADED_TRUST_THRESHOLD: i32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
    #[serde(rename = "RSU")]
    Rsu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Normal,
    Degraded,
    Compromised,
    Quarantined,
}

/// Link status, ordered from healthy to dead
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Normal,
    Degraded,
    Disrupted,
    Down,
}

/// One direction of a link. Every link is stored as a forward and a reverse
/// record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnection {
    pub source_id: String,
    pub target_id: String,
    /// Mbps
    pub bandwidth: f64,
    /// ms
    pub latency: f64,
    /// 0-1
    pub packet_loss: f64,
    pub encrypted: bool,
    pub status: ConnectionStatus,
    pub active_attacks: Vec<&'static AttackVector>,
}

impl NetworkConnection {
    fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    fn apply_attack(&mut self, attack: &'static AttackVector) {
        if !self.active_attacks.iter().any(|a| a.id == attack.id) {
            self.active_attacks.push(attack);
        }

        match attack.id {
            "ddos" | "jamming" => {
                self.status = self.status.max(ConnectionStatus::Disrupted);
                self.packet_loss = (self.packet_loss + 0.4).min(1.0);
            }
            // MITM stays subtle: latency only, no visible loss
            "mitm" => {
                self.status = self.status.max(ConnectionStatus::Degraded);
                self.latency *= 1.5;
            }
            _ => {
                self.status = self.status.max(ConnectionStatus::Degraded);
                self.packet_loss = (self.packet_loss + 0.2).min(1.0);
                self.latency *= 1.2;
            }
        }

        if self.status == ConnectionStatus::Disrupted && self.packet_loss >= 1.0 {
            self.status = ConnectionStatus::Down;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    pub id: String,
    pub node_type: NodeType,
    pub status: NodeStatus,
    /// Indices into the topology's connection list for records leaving this node
    pub connections: Vec<usize>,
    /// Mbps
    pub throughput: f64,
    /// 0-1
    pub processing_load: f64,
    pub active_attacks: Vec<&'static AttackVector>,
    pub security_level: f64,
    pub detection_capability: f64,
    pub last_update_time: DateTime<Utc>,
}

impl NetworkNode {
    pub fn from_rsu(rsu: &Rsu) -> Self {
        let status = if rsu.quarantined {
            NodeStatus::Quarantined
        } else if rsu.attack_detected {
            NodeStatus::Compromised
        } else if rsu.trust() < DEGRADED_TRUST_THRESHOLD {
            NodeStatus::Degraded
        } else {
            NodeStatus::Normal
        };

        Self {
            id: rsu.rsu_id.clone(),
            node_type: NodeType::Rsu,
            status,
            connections: Vec::new(),
            throughput: BASE_THROUGHPUT_MBPS,
            processing_load: BASE_PROCESSING_LOAD,
            active_attacks: Vec::new(),
            security_level: rsu.trust() as f64 / 100.0,
            detection_capability: BASE_DETECTION_CAPABILITY,
            last_update_time: Utc::now(),
        }
    }

    fn apply_attack(&mut self, attack: &'static AttackVector) {
        if !self.active_attacks.iter().any(|a| a.id == attack.id) {
            self.active_attacks.push(attack);
        }

        let (throughput_factor, load_increase) = match attack.severity {
            Severity::Critical => (0.2, 0.5),
            Severity::High => (0.5, 0.3),
            Severity::Medium => (0.7, 0.2),
            Severity::Low => (0.9, 0.1),
        };

        match attack.severity {
            Severity::Critical => {
                if self.status != NodeStatus::Quarantined {
                    self.status = NodeStatus::Compromised;
                }
            }
            Severity::High | Severity::Medium => {
                if self.status == NodeStatus::Normal {
                    self.status = NodeStatus::Degraded;
                }
            }
            Severity::Low => {}
        }

        self.processing_load = (self.processing_load + load_increase).min(1.0);
        self.throughput = (self.throughput * throughput_factor).max(0.0);
        self.last_update_time = Utc::now();
    }
}

/// Aggregate health of the topology
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub normal_nodes: usize,
    pub degraded_nodes: usize,
    pub compromised_nodes: usize,
    pub quarantined_nodes: usize,
    /// Sum of per-node active attack counts
    pub active_attacks: usize,
    /// Mbps, 0 with no nodes
    pub average_throughput: f64,
    /// Directed connection records that are down
    pub critical_connections: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkTopology {
    nodes: BTreeMap<String, NetworkNode>,
    connections: Vec<NetworkConnection>,
}

impl NetworkTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NetworkNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn node(&self, node_id: &str) -> Option<&NetworkNode> {
        self.nodes.get(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.nodes.values()
    }

    pub fn connections(&self) -> &[NetworkConnection] {
        &self.connections
    }

    /// Number of undirected links
    pub fn edge_count(&self) -> usize {
        self.connections.len() / 2
    }

    /// Add a link; the reverse record is created alongside it
    pub fn add_connection(&mut self, connection: NetworkConnection) {
        let reverse = NetworkConnection {
            source_id: connection.target_id.clone(),
            target_id: connection.source_id.clone(),
            ..connection.clone()
        };

        for record in [connection, reverse] {
            let index = self.connections.len();
            if let Some(node) = self.nodes.get_mut(&record.source_id) {
                node.connections.push(index);
            }
            self.connections.push(record);
        }
    }

    /// Both directed records between two nodes
    pub fn connections_between(&self, a: &str, b: &str) -> Vec<&NetworkConnection> {
        self.connections
            .iter()
            .filter(|c| {
                (c.source_id == a && c.target_id == b) || (c.source_id == b && c.target_id == a)
            })
            .collect()
    }

    pub fn neighbors(&self, node_id: &str) -> Vec<&str> {
        self.nodes
            .get(node_id)
            .map(|node| {
                node.connections
                    .iter()
                    .filter_map(|&i| self.connections.get(i))
                    .map(|c| c.target_id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rebuild nodes and links from an RSU snapshot
    pub fn initialize_from_rsus(&mut self, rsus: &[Rsu]) {
        self.nodes.clear();
        self.connections.clear();

        let rsus: Vec<&Rsu> = rsus.iter().filter(|r| r.has_id()).collect();
        for rsu in &rsus {
            self.add_node(NetworkNode::from_rsu(rsu));
        }

        for (i, a) in rsus.iter().enumerate() {
            for b in &rsus[i + 1..] {
                if a.rsu_id == b.rsu_id {
                    continue;
                }
                let distance = haversine_km(a.position(), b.position());
                if distance < CONNECTION_RANGE_KM {
                    self.add_connection(NetworkConnection {
                        source_id: a.rsu_id.clone(),
                        target_id: b.rsu_id.clone(),
                        bandwidth: 100.0 - distance * 20.0,
                        latency: 5.0 + distance * 2.0,
                        packet_loss: 0.01 + distance * 0.01,
                        encrypted: true,
                        status: ConnectionStatus::Normal,
                        active_attacks: Vec::new(),
                    });
                }
            }
        }
    }

    /// Degrade a node by severity and push the attack onto every link
    /// touching it. Returns false for an unknown node.
    pub fn apply_attack_to_node(&mut self, node_id: &str, attack: &'static AttackVector) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        node.apply_attack(attack);

        for connection in self.connections.iter_mut().filter(|c| c.touches(node_id)) {
            connection.apply_attack(attack);
        }
        true
    }

    pub fn compromised_rsus(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.status == NodeStatus::Compromised)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn network_stats(&self) -> NetworkStats {
        let count = |status: NodeStatus| self.nodes.values().filter(|n| n.status == status).count();
        let total_throughput: f64 = self.nodes.values().map(|n| n.throughput).sum();

        NetworkStats {
            total_nodes: self.nodes.len(),
            normal_nodes: count(NodeStatus::Normal),
            degraded_nodes: count(NodeStatus::Degraded),
            compromised_nodes: count(NodeStatus::Compromised),
            quarantined_nodes: count(NodeStatus::Quarantined),
            active_attacks: self.nodes.values().map(|n| n.active_attacks.len()).sum(),
            average_throughput: total_throughput / self.nodes.len().max(1) as f64,
            critical_connections: self
                .connections
                .iter()
                .filter(|c| c.status == ConnectionStatus::Down)
                .count(),
        }
    }
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
