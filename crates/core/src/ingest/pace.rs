use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Cooperative rate limit: consecutive calls through the same pacer are separated by
/// at least `delay`, measured from the end of one call to the start of the next.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_finished: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last = self.last_finished.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.delay).await;
        }
        let out = call.await;
        *last = Some(Instant::now());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn separates_consecutive_calls() {
        let pacer = Pacer::new(Duration::from_millis(30));
        let t0 = std::time::Instant::now();
        pacer.run(async {}).await;
        // First call is not delayed.
        assert!(t0.elapsed() < Duration::from_millis(30));
        pacer.run(async {}).await;
        pacer.run(async {}).await;
        assert!(t0.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_delay_does_not_block() {
        let pacer = Pacer::new(Duration::ZERO);
        for i in 0..5 {
            assert_eq!(pacer.run(async move { i * 2 }).await, i * 2);
        }
    }
}
