//! # Alarm Scheduler
//! One-shot alarms keyed by opaque ids, dispatched by a single background task.
//!
//! The pending queue and the id → alarm map live under one mutex. The dispatcher
//! removes due alarms from both under that lock before invoking anything, so a
//! `cancel` either wins (the alarm never fires) or loses (the alarm is already
//! committed and `cancel` reports `NotFound`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::error::AlarmError;

/// Upper bound on a single dispatcher nap, so wall-clock adjustments are noticed.
const MAX_NAP: Duration = Duration::from_secs(60);

/// Opaque, server-generated alarm id (UUID v4 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(String);

impl AlarmId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AlarmId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AlarmId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display metadata attached to an alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmMeta {
    pub title: String,
    #[serde(default)]
    pub include_news: bool,
    #[serde(default)]
    pub include_weather: bool,
}

impl AlarmMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            include_news: false,
            include_weather: false,
        }
    }
}

/// Snapshot of a pending (or firing) alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub fire_at: DateTime<Utc>,
    pub meta: AlarmMeta,
}

/// What runs when an alarm fires.
#[async_trait]
pub trait AlarmAction: Send + Sync {
    async fn fire(&self, alarm: &Alarm) -> anyhow::Result<()>;
}

struct Entry {
    fire_at: DateTime<Utc>,
    seq: u64,
    meta: AlarmMeta,
    action: Arc<dyn AlarmAction>,
}

#[derive(Default)]
struct Queue {
    /// (fire_at, insertion seq) gives fire-time order with FIFO ties.
    by_time: BTreeMap<(DateTime<Utc>, u64), AlarmId>,
    entries: HashMap<AlarmId, Entry>,
    next_seq: u64,
}

type DueAlarm = (Alarm, Arc<dyn AlarmAction>);

pub struct AlarmScheduler {
    queue: Mutex<Queue>,
    wake: Notify,
    clock: Arc<dyn Clock>,
}

impl Default for AlarmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            wake: Notify::new(),
            clock,
        }
    }

    /// Register a one-shot alarm. A `fire_at` in the past fires on the next cycle.
    pub fn schedule(
        &self,
        fire_at: DateTime<Utc>,
        meta: AlarmMeta,
        action: Arc<dyn AlarmAction>,
    ) -> AlarmId {
        let id = AlarmId::generate();
        let title = meta.title.clone();
        {
            let mut q = self.queue.lock().expect("scheduler mutex poisoned");
            let seq = q.next_seq;
            q.next_seq += 1;
            q.by_time.insert((fire_at, seq), id.clone());
            q.entries.insert(
                id.clone(),
                Entry {
                    fire_at,
                    seq,
                    meta,
                    action,
                },
            );
        }

        counter!("alarms_scheduled_total").increment(1);
        info!(target: "scheduler", alarm_id = %id, %fire_at, %title, "alarm scheduled");
        self.wake.notify_one();
        id
    }

    /// Remove a pending alarm. Unknown, fired and already-cancelled ids are `NotFound`.
    pub fn cancel(&self, id: &AlarmId) -> Result<(), AlarmError> {
        let removed = {
            let mut guard = self.queue.lock().expect("scheduler mutex poisoned");
            let q = &mut *guard;
            q.entries.remove(id).inspect(|e| {
                q.by_time.remove(&(e.fire_at, e.seq));
            })
        };

        match removed {
            Some(entry) => {
                counter!("alarms_cancelled_total").increment(1);
                info!(target: "scheduler", alarm_id = %id, title = %entry.meta.title, "alarm cancelled");
                self.wake.notify_one();
                Ok(())
            }
            None => {
                debug!(target: "scheduler", alarm_id = %id, "cancel for unknown alarm");
                Err(AlarmError::NotFound(id.clone()))
            }
        }
    }

    /// Pending alarms in firing order.
    pub fn pending(&self) -> Vec<Alarm> {
        let q = self.queue.lock().expect("scheduler mutex poisoned");
        q.by_time
            .values()
            .filter_map(|id| {
                q.entries.get(id).map(|e| Alarm {
                    id: id.clone(),
                    fire_at: e.fire_at,
                    meta: e.meta.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .expect("scheduler mutex poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest fire time, if anything is pending.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        let q = self.queue.lock().expect("scheduler mutex poisoned");
        q.by_time.keys().next().map(|(at, _)| *at)
    }

    /// Detach every alarm due at `now`, in firing order.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<DueAlarm> {
        let mut guard = self.queue.lock().expect("scheduler mutex poisoned");
        let q = &mut *guard;
        let mut due = Vec::new();

        while let Some(first) = q.by_time.first_entry() {
            if first.key().0 > now {
                break;
            }
            let id = first.remove();
            if let Some(e) = q.entries.remove(&id) {
                due.push((
                    Alarm {
                        id,
                        fire_at: e.fire_at,
                        meta: e.meta,
                    },
                    e.action,
                ));
            }
        }
        due
    }

    /// One dispatch cycle: fire everything due now. Returns how many alarms fired.
    ///
    /// Actions run one after another, outside the queue lock. A failing or
    /// panicking action is logged and does not affect the others.
    pub async fn run_due(&self) -> usize {
        let due = self.take_due(self.clock.now());
        let fired = due.len();
        for (alarm, action) in due {
            invoke(alarm, action).await;
        }
        fired
    }

    /// Start the background dispatcher. It sleeps until the nearest deadline
    /// (or until `schedule`/`cancel` wakes it) and never exits on its own.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.dispatch_loop().await })
    }

    async fn dispatch_loop(&self) {
        info!(target: "scheduler", "alarm dispatcher started");
        loop {
            self.run_due().await;

            match self.next_deadline() {
                Some(at) => {
                    let nap = (at - self.clock.now())
                        .to_std()
                        .unwrap_or(Duration::ZERO)
                        .min(MAX_NAP);
                    tokio::select! {
                        _ = tokio::time::sleep(nap) => {}
                        _ = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }
}

async fn invoke(alarm: Alarm, action: Arc<dyn AlarmAction>) {
    counter!("alarms_fired_total").increment(1);
    info!(target: "scheduler", alarm_id = %alarm.id, title = %alarm.meta.title, "alarm firing");

    let task_alarm = alarm.clone();
    let outcome = tokio::spawn(async move { action.fire(&task_alarm).await }).await;

    match outcome {
        Ok(Ok(())) => {
            debug!(target: "scheduler", alarm_id = %alarm.id, "alarm action completed");
        }
        Ok(Err(e)) => {
            counter!("alarm_failures_total").increment(1);
            error!(
                target: "scheduler",
                alarm_id = %alarm.id,
                title = %alarm.meta.title,
                error = %format!("{e:#}"),
                "alarm action failed"
            );
        }
        Err(join_err) => {
            counter!("alarm_failures_total").increment(1);
            error!(
                target: "scheduler",
                alarm_id = %alarm.id,
                title = %alarm.meta.title,
                error = %join_err,
                "alarm action panicked"
            );
        }
    }
}
