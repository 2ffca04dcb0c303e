/// Fixed-interval request pacing for outbound fetches
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// `0` disables pacing
    pub fn per_second(requests_per_second: u32) -> Self {
        let interval = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / requests_per_second
        };

        RateLimiter {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for the next free slot, then claim it
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let limiter = RateLimiter::per_second(20); // 50ms apart

        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }

        // First slot is immediate, the next two wait
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_disables_pacing() {
        let limiter = RateLimiter::per_second(0);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
