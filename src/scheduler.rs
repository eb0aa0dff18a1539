use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Independent debounced pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Refresh,
    Highlight,
}

/// Fired when a channel's quiet period elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub channel: Channel,
    pub generation: u64,
}

/// Coalesces bursts of pokes into a single [`Tick`] after `window` of quiet.
///
/// Every poke aborts the pending timer and starts a new one. A tick that was
/// already queued before a newer poke is still delivered, so the receiver
/// must check [`Debouncer::is_current`] before acting on it.
pub struct Debouncer<E> {
    channel: Channel,
    window: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    sink: UnboundedSender<E>,
}

impl<E> Debouncer<E>
where
    E: From<Tick> + Send + 'static,
{
    pub fn new(channel: Channel, window: Duration, sink: UnboundedSender<E>) -> Self {
        Self {
            channel,
            window,
            generation: 0,
            pending: None,
            sink,
        }
    }

    /// Restarts the countdown. Must be called from within a tokio runtime.
    pub fn poke(&mut self) -> u64 {
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let tick = Tick {
            channel: self.channel,
            generation: self.generation,
        };
        // deadline is fixed at poke time, not when the task first runs
        let delay = tokio::time::sleep(self.window);
        let sink = self.sink.clone();
        self.pending = Some(tokio::spawn(async move {
            delay.await;
            // receiver gone means the session shut down
            let _ = sink.send(E::from(tick));
        }));
        self.generation
    }

    pub fn is_current(&self, tick: &Tick) -> bool {
        tick.channel == self.channel && tick.generation == self.generation
    }

    /// Drops the pending timer. A tick that is already queued stops being current.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<E> Drop for Debouncer<E> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn burst_produces_one_current_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();
        let mut debouncer = Debouncer::new(Channel::Refresh, Duration::from_millis(400), tx);

        for _ in 0..10 {
            debouncer.poke();
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;

        let tick = rx.recv().await.unwrap();
        assert!(debouncer.is_current(&tick));
        assert_eq!(tick.generation, 10);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stale_tick_is_not_current() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();
        let mut debouncer = Debouncer::new(Channel::Highlight, Duration::from_millis(300), tx);

        debouncer.poke();
        tokio::time::advance(Duration::from_millis(301)).await;
        tokio::task::yield_now().await;
        let first = rx.recv().await.unwrap();

        // a poke after the tick was queued makes it stale
        debouncer.poke();
        assert!(!debouncer.is_current(&first));

        debouncer.cancel();
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn cancel_invalidates_a_queued_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();
        let mut debouncer = Debouncer::new(Channel::Refresh, Duration::from_millis(400), tx);

        debouncer.poke();
        tokio::time::advance(Duration::from_millis(401)).await;
        tokio::task::yield_now().await;
        let queued = rx.recv().await.unwrap();
        assert!(debouncer.is_current(&queued));

        debouncer.cancel();
        assert!(!debouncer.is_current(&queued));
    }
}
