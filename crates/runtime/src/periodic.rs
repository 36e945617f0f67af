use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::liveness::LivenessToken;

/// Handle to a fixed-interval background task.
///
/// The task stops on its own when its token is revoked; dropping the handle
/// aborts it as well, so no tick can outlive the owning view.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Waits for the task to exit after revocation or cancellation.
    pub async fn join(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs `tick` every `period` until `token` is revoked.
///
/// The first tick fires immediately. Missed ticks are delayed rather than
/// bursted, and a tick in flight is never interleaved with the next one.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    token: LivenessToken,
    mut tick: F,
) -> PeriodicTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.revoked() => break,
                _ = interval.tick() => {}
            }
            if !token.is_alive() {
                break;
            }
            tick().await;
        }
        tracing::debug!(task = name, "periodic task stopped");
    });

    PeriodicTask { name, handle }
}

#[cfg(test)]
mod tests {
    use super::spawn_periodic;
    use crate::liveness::LivenessToken;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_revoked() {
        let token = LivenessToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = spawn_periodic("test", Duration::from_secs(10), token.clone(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        let seen = count.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        token.revoke();
        task.join().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticks() {
        let token = LivenessToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = spawn_periodic("test", Duration::from_secs(1), token, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(task);
        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
