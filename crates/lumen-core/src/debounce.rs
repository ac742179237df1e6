// ── Trailing-edge debouncer ──
//
// High-frequency inputs (color pickers, brightness sliders) push values
// into a channel; a task forwards only the latest value once the window
// since the first unsent value has elapsed.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Sender half of a debounced sink.
///
/// At most one sink call per window; the value sent is always the most
/// recent one. Dropping the sender flushes any pending value.
pub struct DebouncedSender<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> DebouncedSender<T> {
    pub fn spawn<F, Fut>(window: Duration, sink: F) -> Self
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, window, sink));
        Self { tx, task }
    }

    /// Queue a value. Never blocks; values after shutdown are discarded.
    pub fn send(&self, value: T) {
        if self.tx.send(value).is_err() {
            trace!("debounced sink already closed");
        }
    }

    /// Flush the pending value (if any) and wait for the sink to finish.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "debounce task aborted");
        }
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, window: Duration, sink: F)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(first) = rx.recv().await {
        let mut latest = first;
        let deadline = Instant::now() + window;
        loop {
            tokio::select! {
                biased;
                next = rx.recv() => match next {
                    Some(value) => latest = value,
                    None => break,
                },
                () = sleep_until(deadline) => break,
            }
        }
        sink(latest).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> std::future::Ready<()> + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |v| {
            if let Ok(mut guard) = sink_seen.lock() {
                guard.push(v);
            }
            std::future::ready(())
        };
        (seen, sink)
    }

    fn recorded(seen: &Arc<Mutex<Vec<u32>>>) -> Vec<u32> {
        seen.lock().map(|g| g.clone()).unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_sends_last_value_once() {
        let (seen, sink) = recorder();
        let debounced = DebouncedSender::spawn(Duration::from_millis(150), sink);

        for v in 1..=10 {
            debounced.send(v);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(recorded(&seen), vec![10]);
        debounced.close().await;
        assert_eq!(recorded(&seen), vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_each_send() {
        let (seen, sink) = recorder();
        let debounced = DebouncedSender::spawn(Duration::from_millis(150), sink);

        debounced.send(1);
        tokio::time::sleep(Duration::from_millis(300)).await;
        debounced.send(2);
        debounced.send(3);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(recorded(&seen), vec![1, 3]);
        debounced.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_pending_value() {
        let (seen, sink) = recorder();
        let debounced = DebouncedSender::spawn(Duration::from_millis(150), sink);

        debounced.send(7);
        debounced.close().await;

        assert_eq!(recorded(&seen), vec![7]);
    }
}
