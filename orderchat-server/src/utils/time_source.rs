use futures_util::{Stream, StreamExt};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::time::{interval_at, timeout};
use tokio_stream::wrappers::BroadcastStream;

/// Clock abstraction so time-dependent code (heartbeats) can be driven
/// manually from tests. The default instance delegates to tokio's timers.
#[derive(Clone, Default)]
pub struct TimeSource {
	test_time_source: Option<Arc<TestTimeSource>>,
}

struct TestTimeSource {
	time_sender: broadcast::Sender<Duration>,
	time_requested: Notify,
}

impl TimeSource {
	pub fn test() -> Self {
		Self {
			test_time_source: Some(Arc::new(TestTimeSource {
				time_sender: broadcast::channel(16).0,
				time_requested: Notify::new(),
			})),
		}
	}

	pub fn interval(&self, period: Duration) -> Interval {
		match &self.test_time_source {
			None => Interval::Tokio(interval_at(tokio::time::Instant::now() + period, period)),
			Some(test_time_source) => {
				let interval = TestInterval {
					elapsed: Duration::ZERO,
					next_deadline: period,
					period,
					receiver: BroadcastStream::new(test_time_source.time_sender.subscribe()),
				};
				test_time_source.time_requested.notify_one();
				Interval::Test(interval)
			}
		}
	}

	pub fn timeout<ValueFuture: Future>(&self, duration: Duration, future: ValueFuture) -> Timeout<ValueFuture> {
		match &self.test_time_source {
			None => Timeout::Tokio(timeout(duration, future)),
			Some(test_time_source) => {
				let timeout = TestTimeout {
					future,
					elapsed: Duration::ZERO,
					deadline: duration,
					receiver: BroadcastStream::new(test_time_source.time_sender.subscribe()),
				};
				test_time_source.time_requested.notify_one();
				Timeout::Test(timeout)
			}
		}
	}

	pub fn advance_time(&self, by_duration: Duration) {
		let test_time_source = self
			.test_time_source
			.as_ref()
			.expect("advance_time can only be called in test mode.");
		// ignore the error so this works even without anyone waiting
		let _ = test_time_source.time_sender.send(by_duration);
	}

	pub async fn wait_for_time_request(&self) {
		match &self.test_time_source {
			None => {}
			Some(test_time_source) => test_time_source.time_requested.notified().await,
		}
	}
}

pub enum Interval {
	Tokio(tokio::time::Interval),
	Test(TestInterval),
}

impl Interval {
	pub async fn tick(&mut self) {
		match self {
			Interval::Tokio(interval) => {
				interval.tick().await;
			}
			Interval::Test(interval) => interval.tick().await,
		}
	}
}

pub struct TestInterval {
	elapsed: Duration,
	next_deadline: Duration,
	period: Duration,
	receiver: BroadcastStream<Duration>,
}

impl TestInterval {
	async fn tick(&mut self) {
		while self.elapsed < self.next_deadline {
			match self.receiver.next().await {
				Some(Ok(advanced)) => self.elapsed += advanced,
				// lagged behind on time advancements, just keep draining
				Some(Err(_)) => {}
				// nobody can advance time anymore, block forever
				None => futures_util::future::pending::<()>().await,
			}
		}
		self.next_deadline += self.period;
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct TimedOut;

#[pin_project(project = TimeoutProjection)]
pub enum Timeout<ValueFuture> {
	Tokio(#[pin] tokio::time::Timeout<ValueFuture>),
	Test(#[pin] TestTimeout<ValueFuture>),
}

impl<ValueFuture: Future> Future for Timeout<ValueFuture> {
	type Output = Result<ValueFuture::Output, TimedOut>;

	fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			TimeoutProjection::Tokio(timeout) => timeout.poll(context).map(|result| result.map_err(|_| TimedOut)),
			TimeoutProjection::Test(timeout) => timeout.poll(context),
		}
	}
}

#[pin_project]
pub struct TestTimeout<ValueFuture> {
	#[pin]
	future: ValueFuture,
	elapsed: Duration,
	deadline: Duration,
	#[pin]
	receiver: BroadcastStream<Duration>,
}

impl<ValueFuture: Future> Future for TestTimeout<ValueFuture> {
	type Output = Result<ValueFuture::Output, TimedOut>;

	fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
		let mut this = self.project();

		if let Poll::Ready(output) = this.future.poll(context) {
			return Poll::Ready(Ok(output));
		}

		loop {
			match this.receiver.as_mut().poll_next(context) {
				Poll::Ready(Some(Ok(advanced))) => {
					*this.elapsed += advanced;
					if this.elapsed >= this.deadline {
						return Poll::Ready(Err(TimedOut));
					}
				}
				// lagged behind on time advancements, just keep draining
				Poll::Ready(Some(Err(_))) => {}
				// nobody can advance time anymore, the future can only
				// finish on its own
				Poll::Ready(None) | Poll::Pending => return Poll::Pending,
			}
		}
	}
}
