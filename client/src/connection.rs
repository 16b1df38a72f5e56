//! Session lifecycle on top of a transport `Channel`.
//!
//! Outbound intents are fire-and-forget. Inbound messages are drained once per frame
//! and routed into the three flows the engine cares about: the join handshake,
//! snapshots, and discrete events.

use crate::transport::Channel;
use log::{debug, info, warn};
use shared::{
    BulletData, ClientMessage, CollectedPayload, DeathPayload, EntityId, ExplosionPayload, HitPayload,
    JoinedPayload, ServerMessage, Snapshot,
};

/// Outbound intents produced by local input.
pub trait Intents {
    fn move_to(&mut self, x: f32, y: f32, vx: f32, vy: f32);

    fn shoot(&mut self, target_x: f32, target_y: f32);

    fn collect(&mut self, resource_id: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Join sent, waiting for `joined`.
    Joining,
    Joined,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Hit(HitPayload),
    Died(DeathPayload),
    Exploded(DeathPayload),
    Left(EntityId),
    Explosion(ExplosionPayload),
    BulletFired(BulletData),
    Collected(CollectedPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Joined(JoinedPayload),
    Snapshot(Snapshot),
    Event(ServerEvent),
    /// The channel went away underneath us. Reported once.
    Lost,
}

impl From<ServerMessage> for Inbound {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Joined(joined) => Inbound::Joined(joined),
            ServerMessage::GameState(snapshot) => Inbound::Snapshot(snapshot),
            ServerMessage::BulletFired(bullet) => Inbound::Event(ServerEvent::BulletFired(bullet)),
            ServerMessage::PlayerLeft(id) => Inbound::Event(ServerEvent::Left(id)),
            ServerMessage::PlayerHit(hit) => Inbound::Event(ServerEvent::Hit(hit)),
            ServerMessage::PlayerDied(death) => Inbound::Event(ServerEvent::Died(death)),
            ServerMessage::PlayerExploded(death) => Inbound::Event(ServerEvent::Exploded(death)),
            ServerMessage::Explosion(explosion) => {
                Inbound::Event(ServerEvent::Explosion(explosion))
            }
            ServerMessage::ResourceCollected(collected) => {
                Inbound::Event(ServerEvent::Collected(collected))
            }
        }
    }
}

pub struct ConnectionManager {
    channel: Option<Channel>,
    state: ConnectionState,
    sent: u64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
            sent: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.channel.is_some()
            && matches!(
                self.state,
                ConnectionState::Joining | ConnectionState::Joined
            )
    }

    /// Messages handed to the channel so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Takes ownership of a fresh channel and sends the join request on it.
    pub fn attach(&mut self, channel: Channel, name: &str) {
        if let Some(previous) = self.channel.take() {
            debug!("Replacing existing channel");
            previous.close();
        }

        self.channel = Some(channel);
        self.state = ConnectionState::Joining;
        info!("Joining as {}", name);
        self.send(ClientMessage::Join {
            name: name.to_string(),
        });
    }

    /// Drains every queued server message without blocking.
    pub fn poll(&mut self) -> Vec<Inbound> {
        let mut inbound = Vec::new();
        let mut lost = false;

        if let Some(channel) = self.channel.as_mut() {
            loop {
                match channel.try_recv() {
                    Ok(Some(message)) => {
                        let routed = Inbound::from(message);
                        if let Inbound::Joined(joined) = &routed {
                            info!("Joined as player {}", joined.player_id);
                            self.state = ConnectionState::Joined;
                        }
                        inbound.push(routed);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Lost connection to server: {}", e);
                        lost = true;
                        break;
                    }
                }
            }
        }

        if lost {
            self.channel = None;
            self.state = ConnectionState::Closed;
            inbound.push(Inbound::Lost);
        }

        inbound
    }

    pub fn restart(&mut self) {
        self.send(ClientMessage::RestartGame);
    }

    /// Closes the channel. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            info!("Closing connection after {} messages", self.sent);
            channel.close();
        }
        self.state = ConnectionState::Closed;
    }

    fn send(&mut self, message: ClientMessage) {
        let Some(channel) = self.channel.as_ref() else {
            debug!("Not connected; dropping {}", message.kind());
            return;
        };

        let kind = message.kind();
        match channel.send(message) {
            Ok(()) => self.sent += 1,
            Err(e) => debug!("Dropping {}: {}", kind, e),
        }
    }
}

impl Intents for ConnectionManager {
    fn move_to(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        self.send(ClientMessage::PlayerMove { x, y, vx, vy });
    }

    fn shoot(&mut self, target_x: f32, target_y: f32) {
        self.send(ClientMessage::Shoot { target_x, target_y });
    }

    fn collect(&mut self, resource_id: &str) {
        self.send(ClientMessage::ResourceCollected {
            id: resource_id.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Channel;

    #[test]
    fn test_intents_without_channel_are_noops() {
        let mut connection = ConnectionManager::new();
        connection.move_to(1.0, 2.0, 0.0, 0.0);
        connection.shoot(3.0, 4.0);
        connection.collect("r1");
        connection.restart();

        assert_eq!(connection.sent(), 0);
        assert!(!connection.is_established());
        assert!(connection.poll().is_empty());
    }

    #[test]
    fn test_attach_sends_join_then_intents() {
        let (channel, mut remote) = Channel::in_memory();
        let mut connection = ConnectionManager::new();
        connection.attach(channel, "Hydrogen");
        assert_eq!(connection.state(), ConnectionState::Joining);

        connection.move_to(10.0, 20.0, 1000.0, 0.0);
        connection.collect("r7");

        assert_eq!(
            remote.drain(),
            vec![
                ClientMessage::Join {
                    name: "Hydrogen".into()
                },
                ClientMessage::PlayerMove {
                    x: 10.0,
                    y: 20.0,
                    vx: 1000.0,
                    vy: 0.0
                },
                ClientMessage::ResourceCollected { id: "r7".into() },
            ]
        );
        assert_eq!(connection.sent(), 3);
    }

    #[test]
    fn test_poll_routes_messages_in_order() {
        let (channel, remote) = Channel::in_memory();
        let mut connection = ConnectionManager::new();
        connection.attach(channel, "p");

        remote
            .push(ServerMessage::Joined(JoinedPayload {
                player_id: "p1".into(),
                spawn_x: 4.0,
                spawn_y: 5.0,
            }))
            .unwrap();
        remote.push(ServerMessage::GameState(Snapshot::default())).unwrap();
        remote.push(ServerMessage::PlayerLeft("p9".into())).unwrap();
        let confirmation = CollectedPayload {
            player_id: "p1".into(),
            resource_type: None,
        };
        remote
            .push(ServerMessage::ResourceCollected(confirmation.clone()))
            .unwrap();

        let inbound = connection.poll();
        assert_eq!(inbound.len(), 4);
        assert!(matches!(inbound[0], Inbound::Joined(_)));
        assert!(matches!(inbound[1], Inbound::Snapshot(_)));
        assert_eq!(inbound[2], Inbound::Event(ServerEvent::Left("p9".into())));
        assert_eq!(inbound[3], Inbound::Event(ServerEvent::Collected(confirmation)));
        assert_eq!(connection.state(), ConnectionState::Joined);
        assert!(connection.is_established());
    }

    #[test]
    fn test_lost_channel_reported_once() {
        let (channel, remote) = Channel::in_memory();
        let mut connection = ConnectionManager::new();
        connection.attach(channel, "p");
        drop(remote);

        assert_eq!(connection.poll(), vec![Inbound::Lost]);
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(connection.poll().is_empty());

        connection.shoot(0.0, 0.0);
        assert_eq!(connection.sent(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (channel, mut remote) = Channel::in_memory();
        let mut connection = ConnectionManager::new();
        connection.attach(channel, "p");
        connection.close();
        connection.close();

        assert_eq!(connection.state(), ConnectionState::Closed);
        connection.restart();
        assert_eq!(remote.drain().len(), 1);
        assert!(remote.from_client.try_recv().is_err());
    }
}
