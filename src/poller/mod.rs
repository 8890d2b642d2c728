//! Snapshot polling: manual refresh, optional auto-refresh, and the state
//! the page shows while requests are in flight.
//!
//! Overlapping requests are never cancelled. Each completion is applied as
//! it arrives, so the last one to finish wins, even when it was started
//! first.

mod client;
mod timer;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use client::{FetchError, SnapshotSource};
pub use client::HttpSnapshotSource;
use timer::{IntervalTask, Scheduler};
pub use timer::BrowserScheduler;

use crate::components::topology::{BuildError, RawSnapshot, TopologySnapshot, build};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollStatus {
	#[default]
	Idle,
	Loading,
	Success,
	Error,
}

/// Auto-refresh periods offered in the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshInterval {
	Seconds10,
	#[default]
	Seconds30,
	Minute1,
	Minutes5,
}

impl RefreshInterval {
	pub const ALL: [Self; 4] = [Self::Seconds10, Self::Seconds30, Self::Minute1, Self::Minutes5];

	pub fn as_secs(self) -> u64 {
		match self {
			Self::Seconds10 => 10,
			Self::Seconds30 => 30,
			Self::Minute1 => 60,
			Self::Minutes5 => 300,
		}
	}

	/// Only the offered periods are accepted.
	pub fn from_secs(secs: u64) -> Option<Self> {
		Self::ALL.into_iter().find(|interval| interval.as_secs() == secs)
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Seconds10 => "10s",
			Self::Seconds30 => "30s",
			Self::Minute1 => "1m",
			Self::Minutes5 => "5m",
		}
	}

	pub fn duration(self) -> Duration {
		Duration::from_secs(self.as_secs())
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollState {
	pub status: PollStatus,
	/// Kept while a retry is loading; cleared by the next success.
	pub last_error: Option<String>,
	pub auto_refresh: bool,
	pub interval: RefreshInterval,
}

impl PollState {
	pub fn is_loading(&self) -> bool {
		self.status == PollStatus::Loading
	}
}

/// Why one poll attempt produced no snapshot.
#[derive(Debug, Error)]
pub enum PollError {
	#[error(transparent)]
	Fetch(#[from] FetchError),
	#[error(transparent)]
	Build(#[from] BuildError),
}

impl PollError {
	pub fn user_message(&self) -> String {
		match self {
			Self::Fetch(err) => err.user_message(),
			Self::Build(err) => err.to_string(),
		}
	}
}

#[derive(Clone, Debug)]
pub enum PollEvent {
	State(PollState),
	Snapshot(Arc<TopologySnapshot>),
}

struct Inner<S, T: Scheduler> {
	source: S,
	scheduler: T,
	state: RefCell<PollState>,
	snapshot: RefCell<Option<Arc<TopologySnapshot>>>,
	timer: RefCell<Option<T::Interval>>,
	listener: RefCell<Option<Box<dyn Fn(PollEvent)>>>,
	requests: Cell<u64>,
	disposed: Cell<bool>,
}

/// Owns the refresh timer and every in-flight request.
pub struct Poller<S, T: Scheduler> {
	inner: Rc<Inner<S, T>>,
}

impl<S, T> Poller<S, T>
where
	S: SnapshotSource + 'static,
	T: Scheduler + 'static,
{
	pub fn new(source: S, scheduler: T) -> Self {
		Self {
			inner: Rc::new(Inner {
				source,
				scheduler,
				state: RefCell::new(PollState::default()),
				snapshot: RefCell::new(None),
				timer: RefCell::new(None),
				listener: RefCell::new(None),
				requests: Cell::new(0),
				disposed: Cell::new(false),
			}),
		}
	}

	/// Replaces the listener notified of state changes and new snapshots.
	pub fn subscribe(&self, listener: impl Fn(PollEvent) + 'static) {
		*self.inner.listener.borrow_mut() = Some(Box::new(listener));
	}

	/// Issues the initial fetch.
	pub fn start(&self) {
		log::info!("topology poller started");
		Inner::refresh(&self.inner);
	}

	pub fn refresh(&self) {
		Inner::refresh(&self.inner);
	}

	pub fn state(&self) -> PollState {
		self.inner.state.borrow().clone()
	}

	/// Last snapshot that built successfully.
	pub fn snapshot(&self) -> Option<Arc<TopologySnapshot>> {
		self.inner.snapshot.borrow().clone()
	}

	pub fn set_auto_refresh(&self, enabled: bool) {
		if self.inner.disposed.get() {
			return;
		}
		self.inner.state.borrow_mut().auto_refresh = enabled;
		Inner::reschedule(&self.inner);
		self.inner.notify_state();
	}

	pub fn set_interval(&self, interval: RefreshInterval) {
		if self.inner.disposed.get() {
			return;
		}
		self.inner.state.borrow_mut().interval = interval;
		Inner::reschedule(&self.inner);
		self.inner.notify_state();
	}

	/// Stops the timer. Requests still in flight complete into nothing.
	pub fn dispose(&self) {
		if self.inner.disposed.replace(true) {
			return;
		}
		if let Some(timer) = self.inner.timer.borrow_mut().take() {
			timer.cancel();
		}
		self.inner.listener.borrow_mut().take();
		log::debug!("topology poller disposed");
	}
}

impl<S, T> Inner<S, T>
where
	S: SnapshotSource + 'static,
	T: Scheduler + 'static,
{
	fn refresh(this: &Rc<Self>) {
		if this.disposed.get() {
			return;
		}
		let request = this.requests.get() + 1;
		this.requests.set(request);
		this.state.borrow_mut().status = PollStatus::Loading;
		this.notify_state();
		log::debug!("topology request #{request} started");

		let fetch = this.source.fetch();
		let weak = Rc::downgrade(this);
		this.scheduler.spawn(Box::pin(async move {
			let result = fetch.await;
			if let Some(inner) = weak.upgrade() {
				inner.complete(request, result);
			}
		}));
	}

	fn complete(&self, request: u64, result: Result<RawSnapshot, FetchError>) {
		if self.disposed.get() {
			log::debug!("topology request #{request} finished after dispose; ignored");
			return;
		}

		match result.map_err(PollError::from).and_then(|raw| Ok(build(raw)?)) {
			Ok(snapshot) => {
				let snapshot = Arc::new(snapshot);
				log::info!(
					"topology request #{request} loaded {} nodes, {} edges",
					snapshot.nodes().len(),
					snapshot.edges().len()
				);
				*self.snapshot.borrow_mut() = Some(snapshot.clone());
				{
					let mut state = self.state.borrow_mut();
					state.status = PollStatus::Success;
					state.last_error = None;
				}
				self.emit(PollEvent::Snapshot(snapshot));
			}
			Err(err) => {
				log::error!("topology request #{request} failed: {err}");
				let mut state = self.state.borrow_mut();
				state.status = PollStatus::Error;
				state.last_error = Some(err.user_message());
			}
		}
		self.notify_state();
	}

	/// Cancels the current timer and starts a new one if auto-refresh is on.
	fn reschedule(this: &Rc<Self>) {
		if let Some(timer) = this.timer.borrow_mut().take() {
			timer.cancel();
		}
		let (enabled, interval) = {
			let state = this.state.borrow();
			(state.auto_refresh, state.interval)
		};
		if !enabled || this.disposed.get() {
			log::debug!("auto-refresh off");
			return;
		}

		let weak = Rc::downgrade(this);
		let tick = Box::new(move || {
			if let Some(inner) = weak.upgrade() {
				Inner::refresh(&inner);
			}
		});
		match this.scheduler.every(interval.duration(), tick) {
			Ok(timer) => {
				log::debug!("auto-refresh every {}", interval.label());
				*this.timer.borrow_mut() = Some(timer);
			}
			Err(err) => log::error!("auto-refresh unavailable: {err}"),
		}
	}

	fn notify_state(&self) {
		let state = self.state.borrow().clone();
		self.emit(PollEvent::State(state));
	}

	fn emit(&self, event: PollEvent) {
		if let Some(listener) = self.listener.borrow().as_ref() {
			listener(event);
		}
	}
}
