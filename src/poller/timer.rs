//! Timers and task spawning behind a trait, so polling can run against a
//! simulated clock.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use leptos::leptos_dom::helpers::{IntervalHandle, set_interval_with_handle};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("could not start timer: {0}")]
pub struct TimerError(pub String);

/// A running repeating timer. Cancelling stops every future tick.
pub trait IntervalTask {
	fn cancel(self);
}

pub trait Scheduler {
	type Interval: IntervalTask;

	/// Calls `tick` every `period` until the returned interval is cancelled.
	fn every(&self, period: Duration, tick: Box<dyn Fn()>) -> Result<Self::Interval, TimerError>;

	fn spawn(&self, task: Pin<Box<dyn Future<Output = ()>>>);
}

/// Browser event loop: Leptos interval helper and `spawn_local`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserScheduler;

impl IntervalTask for IntervalHandle {
	fn cancel(self) {
		self.clear();
	}
}

impl Scheduler for BrowserScheduler {
	type Interval = IntervalHandle;

	fn every(&self, period: Duration, tick: Box<dyn Fn()>) -> Result<IntervalHandle, TimerError> {
		set_interval_with_handle(move || tick(), period).map_err(|err| TimerError(format!("{err:?}")))
	}

	fn spawn(&self, task: Pin<Box<dyn Future<Output = ()>>>) {
		leptos::task::spawn_local(task);
	}
}
