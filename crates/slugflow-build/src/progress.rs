use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Heartbeat for long waits (pod launch, release publish).
///
/// Prints `message` to stdout once per period so the pusher's terminal shows
/// life while nothing else is being written. One sender signals quit, the
/// receiver drains; [`ProgressTicker::stop`] returns only after the task is
/// gone, and dropping the ticker kills it too.
pub struct ProgressTicker {
    quit: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(message: &'static str, period: Duration) -> Self {
        let (quit_tx, mut quit_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; the heartbeat starts one
            // period in.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = &mut quit_rx => break,
                    _ = interval.tick() => {
                        print!("{}", message);
                        let _ = std::io::stdout().flush();
                    }
                }
            }
        });
        Self {
            quit: Some(quit_tx),
            task: Some(task),
        }
    }

    /// Signals quit and waits for the ticker task to drain.
    pub async fn stop(mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_drains_the_ticker() {
        let ticker = ProgressTicker::start("...", Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Must not hang.
        ticker.stop().await;
    }

    #[tokio::test]
    async fn drop_does_not_leak_the_task() {
        let ticker = ProgressTicker::start("...", Duration::from_secs(3600));
        drop(ticker);
        // Nothing to assert beyond "we got here without waiting an hour".
    }
}
