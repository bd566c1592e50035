//! Scheduling for search-as-you-type.
//!
//! [`SearchThrottle`] turns every keystroke into at most a couple of [`SearchRequest`]s: the
//! first keystroke after a quiet period is dispatched shortly after, with whatever the input is
//! by then, and the end of a typing burst is dispatched once the user pauses. [`ResponseGate`]
//! then drops responses that arrive after the response to a newer request.

use std::{
  future::Future,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use log::debug;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

pub const LEADING_DELAY: Duration = Duration::from_millis(250);
pub const TRAILING_DELAY: Duration = Duration::from_millis(400);

/// Runs a task once after a delay unless cleared first.
#[derive(Debug)]
pub struct Timer {
  handle: JoinHandle<()>,
  active: Arc<AtomicBool>,
}

impl Timer {
  /// Must be called from within a tokio runtime.
  pub fn new<F>(delay: Duration, task: F) -> Self
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let active = Arc::new(AtomicBool::new(true));
    let handle = tokio::spawn({
      let active = active.clone();
      async move {
        tokio::time::sleep(delay).await;
        task.await;
        active.store(false, Ordering::SeqCst);
      }
    });
    Self { handle, active }
  }

  pub fn clear(&self) {
    self.handle.abort();
    self.active.store(false, Ordering::SeqCst);
  }

  /// Whether the task has neither run nor been cleared yet.
  #[must_use]
  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
  /// Increases with every dispatched request.
  pub seq: u64,
  pub query: String,
}

#[derive(Debug)]
struct Dispatcher {
  scheduled: Option<String>,
  last_dispatched: Option<String>,
  seq: u64,
  sender: UnboundedSender<SearchRequest>,
}

impl Dispatcher {
  fn dispatch(&mut self, query: String) {
    if self.last_dispatched.as_ref() == Some(&query) {
      debug!("Skipping repeated search '{query}'");
      return;
    }
    self.seq += 1;
    self.last_dispatched = Some(query.clone());
    let request = SearchRequest {
      seq: self.seq,
      query,
    };
    if let Err(e) = self.sender.send(request) {
      debug!("Nobody is waiting for search {}: {e}", e.0.seq);
    }
  }
}

/// Throttles search input with a trailing debounce.
#[derive(Debug)]
pub struct SearchThrottle {
  dispatcher: Arc<Mutex<Dispatcher>>,
  debounce: Option<Timer>,
  leading: Duration,
  trailing: Duration,
}

impl SearchThrottle {
  #[must_use]
  pub fn new(sender: UnboundedSender<SearchRequest>) -> Self {
    Self::with_delays(sender, LEADING_DELAY, TRAILING_DELAY)
  }

  #[must_use]
  pub fn with_delays(
    sender: UnboundedSender<SearchRequest>,
    leading: Duration,
    trailing: Duration,
  ) -> Self {
    Self {
      dispatcher: Arc::new(Mutex::new(Dispatcher {
        scheduled: None,
        last_dispatched: None,
        seq: 0,
        sender,
      })),
      debounce: None,
      leading,
      trailing,
    }
  }

  /// Feeds the full input value after a change.
  pub fn input(&mut self, value: &str) {
    if value.is_empty() {
      return;
    }
    if let Some(timer) = self.debounce.take() {
      timer.clear();
    }

    let mut dispatcher = self
      .dispatcher
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if dispatcher.last_dispatched.as_deref() == Some(value) {
      return;
    }

    if dispatcher.scheduled.is_none() {
      let shared = self.dispatcher.clone();
      // The leading timer is not kept: later input only replaces what it will dispatch.
      let _ = Timer::new(self.leading, async move {
        let mut dispatcher = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(query) = dispatcher.scheduled.take() {
          dispatcher.dispatch(query);
        }
      });
    } else {
      let shared = self.dispatcher.clone();
      let query = value.to_string();
      self.debounce = Some(Timer::new(self.trailing, async move {
        shared
          .lock()
          .unwrap_or_else(PoisonError::into_inner)
          .dispatch(query);
      }));
    }
    dispatcher.scheduled = Some(value.to_string());
  }
}

/// Lets through only responses newer than the last one let through.
#[derive(Debug, Default)]
pub struct ResponseGate {
  applied: Option<u64>,
}

impl ResponseGate {
  pub fn accept(&mut self, seq: u64) -> bool {
    if self.applied.is_some_and(|applied| seq <= applied) {
      debug!("Discarding stale response {seq}");
      return false;
    }
    self.applied = Some(seq);
    true
  }
}
