use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use parlor_core::{ChannelKind, UserId};

use crate::server::metrics::{record_frame_dropped, record_ws_disconnect};

use super::fanout::{offer_frame, OfferOutcome};

/// Close signal for a connection's outbound pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionControl {
    Open,
    Close,
}

/// Channel sets a connection has joined. Written only by the owning
/// connection's inbound pump; the dispatcher only reads them while fanning
/// out, so entries hold exactly the channels that passed a read check.
#[derive(Debug, Default)]
pub(crate) struct JoinedChannels {
    rooms: RwLock<HashSet<String>>,
    direct_chats: RwLock<HashSet<String>>,
}

impl JoinedChannels {
    pub(crate) async fn join(&self, kind: ChannelKind, channel_id: &str) {
        match kind {
            ChannelKind::Room => self.rooms.write().await.insert(channel_id.to_owned()),
            ChannelKind::DirectChat => self
                .direct_chats
                .write()
                .await
                .insert(channel_id.to_owned()),
        };
    }

    pub(crate) async fn contains(&self, kind: ChannelKind, channel_id: &str) -> bool {
        match kind {
            ChannelKind::Room => self.rooms.read().await.contains(channel_id),
            ChannelKind::DirectChat => self.direct_chats.read().await.contains(channel_id),
        }
    }
}

/// A live registry entry: everything the dispatcher needs to reach one
/// connection.
pub(crate) struct Connection {
    pub(crate) connection_id: Uuid,
    pub(crate) user_id: UserId,
    pub(crate) outbound: mpsc::Sender<String>,
    pub(crate) control: watch::Sender<ConnectionControl>,
    pub(crate) channels: Arc<JoinedChannels>,
}

/// One fan-out unit: a serialized envelope bound for every connection
/// currently joined to the target channel. Consumed once, never persisted.
pub(crate) struct BroadcastJob {
    pub(crate) channel_id: String,
    pub(crate) frame: String,
}

pub(crate) enum HubCommand {
    Register(Connection),
    Unregister(Uuid),
    BroadcastToRoom(BroadcastJob),
    BroadcastToDirectChat(BroadcastJob),
}

/// Cloneable submission side of the hub. All registry mutation and fan-out
/// happens on the single dispatcher task behind this queue, in arrival
/// order across all four command kinds.
#[derive(Clone)]
pub(crate) struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn spawn(capacity: usize) -> Self {
        let (commands, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_hub(receiver));
        Self { commands }
    }

    pub(crate) async fn register(&self, connection: Connection) {
        let _ = self.commands.send(HubCommand::Register(connection)).await;
    }

    pub(crate) async fn unregister(&self, connection_id: Uuid) {
        let _ = self
            .commands
            .send(HubCommand::Unregister(connection_id))
            .await;
    }

    pub(crate) async fn broadcast_to_room(&self, job: BroadcastJob) {
        let _ = self.commands.send(HubCommand::BroadcastToRoom(job)).await;
    }

    pub(crate) async fn broadcast_to_direct_chat(&self, job: BroadcastJob) {
        let _ = self
            .commands
            .send(HubCommand::BroadcastToDirectChat(job))
            .await;
    }
}

/// The dispatcher: sole owner of the registry for its whole lifetime.
async fn run_hub(mut commands: mpsc::Receiver<HubCommand>) {
    let mut registry: HashMap<Uuid, Connection> = HashMap::new();
    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Register(connection) => {
                registry.insert(connection.connection_id, connection);
            }
            HubCommand::Unregister(connection_id) => {
                close_and_remove(&mut registry, connection_id);
            }
            HubCommand::BroadcastToRoom(job) => {
                dispatch_to_channel(&mut registry, ChannelKind::Room, &job).await;
            }
            HubCommand::BroadcastToDirectChat(job) => {
                dispatch_to_channel(&mut registry, ChannelKind::DirectChat, &job).await;
            }
        }
    }
}

/// Removes a connection and signals its outbound pump to close. Only the
/// first call observes the entry; repeat calls are no-ops.
fn close_and_remove(registry: &mut HashMap<Uuid, Connection>, connection_id: Uuid) -> bool {
    if let Some(connection) = registry.remove(&connection_id) {
        let _ = connection.control.send(ConnectionControl::Close);
        true
    } else {
        false
    }
}

/// One pass over the live registry: at most one delivery attempt per
/// connection joined to the target channel. A full or closed outbound
/// queue evicts the connection in the same pass instead of buffering or
/// blocking the dispatcher.
async fn dispatch_to_channel(
    registry: &mut HashMap<Uuid, Connection>,
    kind: ChannelKind,
    job: &BroadcastJob,
) -> usize {
    let mut delivered = 0_usize;
    let mut evicted: Vec<Uuid> = Vec::new();
    for connection in registry.values() {
        if !connection.channels.contains(kind, &job.channel_id).await {
            continue;
        }
        match offer_frame(&connection.outbound, &job.frame) {
            OfferOutcome::Delivered => delivered += 1,
            OfferOutcome::Full => {
                record_frame_dropped(kind.as_str(), "full_queue");
                record_ws_disconnect("slow_consumer");
                tracing::warn!(
                    connection_id = %connection.connection_id,
                    user_id = %connection.user_id,
                    channel_id = %job.channel_id,
                    "evicting slow consumer"
                );
                evicted.push(connection.connection_id);
            }
            OfferOutcome::Closed => {
                record_frame_dropped(kind.as_str(), "closed");
                evicted.push(connection.connection_id);
            }
        }
    }
    for connection_id in evicted {
        close_and_remove(registry, connection_id);
    }
    delivered
}
