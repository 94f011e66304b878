//! Broadcast event bus for motion events.

use motion_types::MotionEvent;
use tokio::sync::broadcast;

/// Fan-out channel for [`MotionEvent`]s.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MotionEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event, returning the number of receivers it reached.
	///
	/// Fails when nobody is subscribed; callers that don't care use `.ok()`.
	pub fn publish(
		&self,
		event: MotionEvent,
	) -> Result<usize, broadcast::error::SendError<MotionEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MotionEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
