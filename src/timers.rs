use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

use crate::dom::Page;

pub type TimerId = u32;
pub type TimerCallback = Box<dyn FnOnce(&Page)>;

struct TimerEntry {
    callback: TimerCallback,
    task: JoinHandle<()>,
}

/// One-shot timers. The sleeping happens on tokio tasks which only report the
/// timer id back; callbacks run on the page's thread when the page drains them.
pub struct TimerQueue {
    handle: Handle,
    next_id: Cell<TimerId>,
    timers: RefCell<HashMap<TimerId, TimerEntry>>,
    fired_tx: UnboundedSender<TimerId>,
    fired_rx: RefCell<Option<UnboundedReceiver<TimerId>>>,
}

impl TimerQueue {
    pub fn new(handle: Handle) -> Self {
        let (fired_tx, fired_rx) = unbounded_channel();
        Self {
            handle,
            next_id: Cell::new(1),
            timers: RefCell::new(HashMap::new()),
            fired_tx,
            fired_rx: RefCell::new(Some(fired_rx)),
        }
    }

    fn next_id(&self) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1).max(1));
        id
    }

    pub fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = self.next_id();
        let tx = self.fired_tx.clone();
        let task = self.handle.spawn(async move {
            sleep(delay).await;
            let _ = tx.send(id);
        });

        trace!(target = "timers", id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        self.timers
            .borrow_mut()
            .insert(id, TimerEntry { callback, task });
        id
    }

    /// Cancel a timer. Returns false when it already ran or never existed.
    pub fn clear(&self, id: TimerId) -> bool {
        match self.timers.borrow_mut().remove(&id) {
            Some(entry) => {
                entry.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    pub(crate) fn take(&self, id: TimerId) -> Option<TimerCallback> {
        self.timers
            .borrow_mut()
            .remove(&id)
            .map(|entry| entry.callback)
    }

    /// Callbacks of every timer whose sleep has already finished.
    pub(crate) fn take_due(&self) -> Vec<TimerCallback> {
        let mut fired = Vec::new();
        if let Some(rx) = self.fired_rx.borrow_mut().as_mut() {
            while let Ok(id) = rx.try_recv() {
                fired.push(id);
            }
        }
        fired.into_iter().filter_map(|id| self.take(id)).collect()
    }

    /// Wait for the next timer to fire. The receiver is moved out of its cell for
    /// the duration of the await so no borrow is held across it.
    pub(crate) async fn next_fired(&self) -> Option<TimerId> {
        let mut rx = self.fired_rx.borrow_mut().take()?;
        let fired = rx.recv().await;
        *self.fired_rx.borrow_mut() = Some(rx);
        fired
    }
}

impl Drop for TimerQueue {
    fn drop(&mut self) {
        for (_, entry) in self.timers.get_mut().drain() {
            entry.task.abort();
        }
    }
}
