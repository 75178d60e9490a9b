//! Best-effort fan-out of game messages and voice frames to a room.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::join_all;
use serde::Serialize;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, trace, warn};

use crate::protocol::{ChannelKind, Outbound};
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// Outcome of one broadcast call. Informational only; a broadcast never
/// fails from the caller's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub delivered: usize,
    pub dropped: usize,
}

/// Process-wide delivery counters.
#[derive(Debug, Default)]
struct BroadcastStats {
    state_delivered: AtomicU64,
    state_dropped: AtomicU64,
    voice_delivered: AtomicU64,
    voice_dropped: AtomicU64,
}

impl BroadcastStats {
    fn record(&self, kind: ChannelKind, report: &BroadcastReport) {
        let (delivered, dropped) = match kind {
            ChannelKind::State => (&self.state_delivered, &self.state_dropped),
            ChannelKind::Voice => (&self.voice_delivered, &self.voice_dropped),
        };
        delivered.fetch_add(report.delivered as u64, Ordering::Relaxed);
        dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub state_delivered: u64,
    pub state_dropped: u64,
    pub voice_delivered: u64,
    pub voice_dropped: u64,
}

/// Delivers payloads to every connection registered for a room.
///
/// Reads a membership snapshot from the registry, then sends outside any
/// registry lock. Per-recipient failures are counted and logged, never
/// returned, and never remove anyone from the registry: a dead peer is
/// cleaned up by its own session.
#[derive(Clone)]
pub struct RoomBroadcaster {
    registry: ConnectionRegistry,
    send_timeout: Duration,
    stats: Arc<BroadcastStats>,
}

impl RoomBroadcaster {
    pub fn new(registry: ConnectionRegistry, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
            stats: Arc::new(BroadcastStats::default()),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Send a structured message to every state-channel member of `room`.
    pub async fn broadcast_state(&self, room: &str, message: &serde_json::Value) -> BroadcastReport {
        let members = self.registry.members(room, ChannelKind::State).await;
        if members.is_empty() {
            trace!(room, "state broadcast to empty room");
            return BroadcastReport::default();
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(room, error = %e, "failed to serialize state message");
                let report = BroadcastReport {
                    recipients: members.len(),
                    delivered: 0,
                    dropped: members.len(),
                };
                self.stats.record(ChannelKind::State, &report);
                return report;
            }
        };

        self.fan_out(room, members, Outbound::State(Utf8Bytes::from(text)))
            .await
    }

    /// Send a raw frame to every voice-channel member of `room`.
    pub async fn broadcast_voice(&self, room: &str, frame: Bytes) -> BroadcastReport {
        let members = self.registry.members(room, ChannelKind::Voice).await;
        if members.is_empty() {
            trace!(room, "voice broadcast to empty room");
            return BroadcastReport::default();
        }
        self.fan_out(room, members, Outbound::Voice(frame)).await
    }

    pub fn stats(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            state_delivered: self.stats.state_delivered.load(Ordering::Relaxed),
            state_dropped: self.stats.state_dropped.load(Ordering::Relaxed),
            voice_delivered: self.stats.voice_delivered.load(Ordering::Relaxed),
            voice_dropped: self.stats.voice_dropped.load(Ordering::Relaxed),
        }
    }

    /// Attempt every recipient concurrently; one slow or dead peer only
    /// costs its own send.
    async fn fan_out(
        &self,
        room: &str,
        members: Vec<ConnectionHandle>,
        frame: Outbound,
    ) -> BroadcastReport {
        let kind = frame.kind();
        let timeout = self.send_timeout;
        let sends = members.iter().map(|member| {
            let frame = frame.clone();
            async move { (member, member.send(frame, timeout).await) }
        });

        let mut report = BroadcastReport {
            recipients: members.len(),
            ..BroadcastReport::default()
        };
        for (member, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;
                    debug!(room, kind = %kind, conn = %member.id().short(), reason = %e, "dropped frame");
                }
            }
        }

        self.stats.record(kind, &report);
        trace!(
            room,
            kind = %kind,
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo_common::ConnectionId;
    use tokio::sync::mpsc;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn member(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ConnectionHandle::new(ConnectionId::new(), tx), rx)
    }

    fn text(frame: Outbound) -> String {
        match frame {
            Outbound::State(text) => text.to_string(),
            other => panic!("expected state frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_room_is_silent_noop() {
        let broadcaster = RoomBroadcaster::new(ConnectionRegistry::new(), TIMEOUT);
        let joined = serde_json::json!({"type": "player_joined", "player_id": "p7"});

        let report = broadcaster.broadcast_state("R1", &joined).await;
        assert_eq!(report, BroadcastReport::default());

        let report = broadcaster
            .broadcast_voice("R1", Bytes::from_static(b"\x00\x01"))
            .await;
        assert_eq!(report.recipients, 0);
        assert_eq!(broadcaster.stats(), BroadcastStatsSnapshot::default());
    }

    #[tokio::test]
    async fn state_reaches_every_member_once() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = member(4);
        let (b, mut rx_b) = member(4);
        registry.connect("R1", ChannelKind::State, a).await;
        registry.connect("R1", ChannelKind::State, b).await;
        let broadcaster = RoomBroadcaster::new(registry, TIMEOUT);

        let msg = serde_json::json!({"type": "move", "piece": "R1", "to": 5});
        let report = broadcaster.broadcast_state("R1", &msg).await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 0);

        for rx in [&mut rx_a, &mut rx_b] {
            let got: serde_json::Value = serde_json::from_str(&text(rx.try_recv().unwrap())).unwrap();
            assert_eq!(got, msg);
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn state_recipients_share_one_serialized_buffer() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = member(4);
        let (b, mut rx_b) = member(4);
        registry.connect("R1", ChannelKind::State, a).await;
        registry.connect("R1", ChannelKind::State, b).await;
        let broadcaster = RoomBroadcaster::new(registry, TIMEOUT);

        broadcaster
            .broadcast_state("R1", &serde_json::json!({"type": "roll", "dice": 3}))
            .await;
        let (Outbound::State(first), Outbound::State(second)) =
            (rx_a.try_recv().unwrap(), rx_b.try_recv().unwrap())
        else {
            panic!("expected state frames");
        };
        assert_eq!(first.as_str().as_ptr(), second.as_str().as_ptr());
    }

    #[tokio::test]
    async fn closed_member_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let (alive_1, mut rx_1) = member(4);
        let (dead, rx_dead) = member(4);
        let (alive_2, mut rx_2) = member(4);
        registry.connect("R1", ChannelKind::State, alive_1).await;
        registry.connect("R1", ChannelKind::State, dead.clone()).await;
        registry.connect("R1", ChannelKind::State, alive_2).await;
        drop(rx_dead);
        let broadcaster = RoomBroadcaster::new(registry.clone(), TIMEOUT);

        let report = broadcaster
            .broadcast_state("R1", &serde_json::json!({"n": 1}))
            .await;
        assert_eq!(report.recipients, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 1);
        assert!(rx_1.try_recv().is_ok());
        assert!(rx_2.try_recv().is_ok());

        // Broadcasting never prunes the registry.
        assert_eq!(registry.member_count("R1", ChannelKind::State).await, 3);
        assert_eq!(broadcaster.stats().state_dropped, 1);
    }

    #[tokio::test]
    async fn full_member_times_out_without_stalling_fan_out() {
        let registry = ConnectionRegistry::new();
        let (stuck, _rx_stuck) = member(1);
        let (ok, mut rx_ok) = member(4);
        stuck
            .send(Outbound::State(Utf8Bytes::from_static("{}")), TIMEOUT)
            .await
            .unwrap();
        registry.connect("R1", ChannelKind::State, stuck).await;
        registry.connect("R1", ChannelKind::State, ok).await;
        let broadcaster = RoomBroadcaster::new(registry, TIMEOUT);

        let report = broadcaster
            .broadcast_state("R1", &serde_json::json!({"n": 2}))
            .await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(rx_ok.try_recv().is_ok());
    }

    #[tokio::test]
    async fn voice_only_reaches_voice_members() {
        let registry = ConnectionRegistry::new();
        let (speaker, mut rx_speaker) = member(4);
        let (player, mut rx_player) = member(4);
        registry.connect("R1", ChannelKind::Voice, speaker).await;
        registry.connect("R1", ChannelKind::State, player).await;
        let broadcaster = RoomBroadcaster::new(registry, TIMEOUT);

        let frame = Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let report = broadcaster.broadcast_voice("R1", frame.clone()).await;
        assert_eq!(report.delivered, 1);

        assert_eq!(rx_speaker.try_recv().unwrap(), Outbound::Voice(frame));
        assert!(rx_player.try_recv().is_err());
        assert_eq!(broadcaster.stats().voice_delivered, 1);
        assert_eq!(broadcaster.stats().state_delivered, 0);
    }

    #[tokio::test]
    async fn state_message_does_not_cross_rooms() {
        let registry = ConnectionRegistry::new();
        let (r1, mut rx_r1) = member(4);
        let (r2, mut rx_r2) = member(4);
        registry.connect("R1", ChannelKind::State, r1).await;
        registry.connect("R2", ChannelKind::State, r2).await;
        let broadcaster = RoomBroadcaster::new(registry, TIMEOUT);

        broadcaster
            .broadcast_state("R1", &serde_json::json!({"only": "R1"}))
            .await;
        assert!(rx_r1.try_recv().is_ok());
        assert!(rx_r2.try_recv().is_err());
    }
}
