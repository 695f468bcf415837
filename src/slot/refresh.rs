use crate::slot::SlotMessage;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Periodic refresh timer of one slot
///
/// Ticks carry the epoch of the timer that produced them, so a tick queued
/// before a restart or stop is recognisably stale.
#[derive(Debug, Default)]
pub(crate) struct RefreshScheduler {
    task: Option<AbortHandle>,
    epoch: u64,
}

impl RefreshScheduler {
    pub(crate) fn start(&mut self, interval: Duration, tx: UnboundedSender<SlotMessage>) {
        self.stop();
        self.epoch += 1;
        let epoch = self.epoch;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(SlotMessage::RefreshTick { epoch }).is_err() {
                    break;
                }
            }
        });

        info!("Auto-refresh every {:?}", interval);
        self.task = Some(handle.abort_handle());
    }

    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Auto-refresh timer cleared");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.task.is_some() && epoch == self.epoch
    }
}
