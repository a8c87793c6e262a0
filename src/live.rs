// Live rolling window: a poll task writing newly fetched samples into a
// single-slot handoff, and a render loop that owns the window. The slot has
// exactly one writer (the poll task) and one reader (the render loop), so
// the two independent periodic sources never mutate the same structure.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::client::DataClient;
use crate::models::Sample;
use crate::pipeline::normalize;

/// Bounded, time-ordered buffer for one device's live samples.
#[derive(Debug)]
pub struct LiveWindow {
    window_ms: i64,
    samples: Vec<Sample>,
}

impl LiveWindow {
    pub fn new(window_secs: u64) -> Self {
        LiveWindow {
            window_ms: window_secs as i64 * 1000,
            samples: Vec::new(),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Ordered insert: out-of-order arrival lands at its sorted position; a
    /// sample with an identical timestamp replaces the buffered one.
    pub fn insert(&mut self, sample: Sample) {
        let idx = self
            .samples
            .partition_point(|s| s.timestamp_ms < sample.timestamp_ms);
        match self.samples.get_mut(idx) {
            Some(existing) if existing.timestamp_ms == sample.timestamp_ms => *existing = sample,
            _ => self.samples.insert(idx, sample),
        }
    }

    /// Moves the window's right edge to `now_ms` and prunes samples that
    /// slid out on the left.
    pub fn advance_to(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.window_ms;
        let first_kept = self.samples.partition_point(|s| s.timestamp_ms < cutoff);
        if first_kept > 0 {
            self.samples.drain(..first_kept);
        }
    }

    /// Changing the visible duration clears the buffer. A poll-period change
    /// does not come through here and keeps the buffer.
    pub fn resize(&mut self, window_secs: u64) {
        self.window_ms = window_secs as i64 * 1000;
        self.samples.clear();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Creates the capacity-one handoff pair. A newer pending sample overwrites
/// an unconsumed older one; the reader takes at most one per render tick.
pub fn handoff() -> (SlotWriter, SlotReader) {
    let (tx, rx) = watch::channel(None);
    (SlotWriter(tx), SlotReader(rx))
}

pub struct SlotWriter(watch::Sender<Option<Sample>>);

impl SlotWriter {
    pub fn offer(&self, sample: Sample) {
        let _ = self.0.send(Some(sample));
    }

    /// True once the render side is gone; the poll loop uses this to stop.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub struct SlotReader(watch::Receiver<Option<Sample>>);

impl SlotReader {
    /// The pending sample, if one arrived since the last take.
    pub fn take(&mut self) -> Option<Sample> {
        if self.0.has_changed().unwrap_or(false) {
            *self.0.borrow_and_update()
        } else {
            None
        }
    }
}

/// One frame pushed to the charting layer per render tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFrame {
    pub device_id: String,
    pub timestamp_ms: i64,
    pub samples: Vec<Sample>,
}

/// Render-side state of one live session: the window plus the slot reader.
/// Created when a device becomes the live target and dropped (with the
/// socket) when it stops being one.
pub struct LiveSession {
    device_id: String,
    window: LiveWindow,
    slot: SlotReader,
}

impl LiveSession {
    pub fn new(device_id: impl Into<String>, window_secs: u64, slot: SlotReader) -> Self {
        LiveSession {
            device_id: device_id.into(),
            window: LiveWindow::new(window_secs),
            slot,
        }
    }

    /// One render tick: apply at most one pending sample (avoids visual
    /// snapping when poll and render periods interleave), advance the right
    /// edge to now, prune, and emit the frame.
    pub fn render_tick(&mut self, now_ms: i64) -> LiveFrame {
        if let Some(sample) = self.slot.take() {
            self.window.insert(sample);
        }
        self.window.advance_to(now_ms);
        LiveFrame {
            device_id: self.device_id.clone(),
            timestamp_ms: now_ms,
            samples: self.window.samples().to_vec(),
        }
    }
}

/// Spawns the poll loop for one live session. The inline await keeps at most
/// one request in flight per device; ticks that fire mid-request are skipped
/// (MissedTickBehavior::Skip), never queued. The task exits when the render
/// side drops its slot reader.
pub fn spawn_poll_task(
    client: Arc<DataClient>,
    device_id: String,
    poll_interval_ms: u64,
    slot: SlotWriter,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(poll_interval_ms.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if slot.is_closed() {
                break;
            }
            match client.latest_reading(&device_id).await {
                Ok(row) => match normalize::sample_from_row(&row) {
                    Some(sample) => slot.offer(sample),
                    None => {
                        tracing::debug!(
                            device_id = %device_id,
                            "latest reading had an unparsable timestamp"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(device_id = %device_id, error = %e, "live poll failed");
                }
            }
        }
        tracing::debug!(device_id = %device_id, "live poll task stopped");
    })
}
