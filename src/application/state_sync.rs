use crate::domain::models::SessionSnapshot;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::session_api::SessionApi;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Initial,
    Periodic,
    Expiry,
    Command,
}

impl PollTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Periodic => "periodic",
            Self::Expiry => "expiry",
            Self::Command => "command",
        }
    }
}

#[derive(Debug)]
pub struct PollResult {
    pub sequence: u64,
    pub trigger: PollTrigger,
    pub outcome: Result<SessionSnapshot, InfraError>,
}

/// Issues authoritative polls and decides which responses are still fresh.
///
/// Every poll is stamped with a sequence number when it is issued. A response
/// is accepted only if no response with a higher number has been accepted,
/// so an older request that resolves late cannot roll the display back.
pub struct StateSyncClient<A: SessionApi> {
    api: Arc<A>,
    issued: AtomicU64,
    accepted: AtomicU64,
}

impl<A: SessionApi + 'static> StateSyncClient<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            issued: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    pub async fn poll_now(&self, trigger: PollTrigger) -> PollResult {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.api.fetch_state().await;
        PollResult {
            sequence,
            trigger,
            outcome,
        }
    }

    /// Fire-and-forget poll; the result is delivered on `results`.
    pub fn spawn_poll(
        self: &Arc<Self>,
        trigger: PollTrigger,
        results: UnboundedSender<PollResult>,
    ) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            let result = sync.poll_now(trigger).await;
            let _ = results.send(result);
        })
    }

    /// Out-of-band poll after the local countdown reached zero. Independent
    /// of the periodic schedule.
    pub fn on_expired(self: &Arc<Self>, results: UnboundedSender<PollResult>) -> JoinHandle<()> {
        self.spawn_poll(PollTrigger::Expiry, results)
    }

    /// Polls every `period`, starting one period from now. Each poll runs in
    /// its own task so a slow response never delays the next one.
    pub fn schedule_periodic(
        self: &Arc<Self>,
        period: Duration,
        results: UnboundedSender<PollResult>,
    ) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if results.is_closed() {
                    break;
                }
                sync.spawn_poll(PollTrigger::Periodic, results.clone());
            }
        })
    }

    /// Marks `sequence` as applied if it is newer than everything applied so
    /// far. Returns false for stale responses.
    pub fn accept(&self, sequence: u64) -> bool {
        self.accepted.fetch_max(sequence, Ordering::SeqCst) < sequence
    }

    /// Whether a response numbered `sequence` is already superseded. Does not
    /// record anything.
    pub fn is_stale(&self, sequence: u64) -> bool {
        self.accepted.load(Ordering::SeqCst) >= sequence
    }

    /// Treats every poll issued so far as stale. Used after a command
    /// succeeds, since those responses predate the command's effect.
    pub fn invalidate_in_flight(&self) {
        let issued = self.issued.load(Ordering::SeqCst);
        self.accepted.fetch_max(issued, Ordering::SeqCst);
    }

    pub fn issued_sequence(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}
