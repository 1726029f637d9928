use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Process-wide circuit breaker for the moderation provider's rate limits.
///
/// `trip` opens the breaker for exactly the cooldown window; `is_open` is a
/// pure time comparison, so the breaker closes on the first check after the
/// window elapses with no half-open or probe state.
#[derive(Clone)]
pub struct RateLimitBreaker {
    open_until: Arc<Mutex<Option<Instant>>>,
    cooldown: Duration,
}

impl RateLimitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            open_until: Arc::new(Mutex::new(None)),
            cooldown,
        }
    }

    pub fn is_open(&self) -> bool {
        let open_until = match self.open_until.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        open_until.is_some_and(|until| Instant::now() < until)
    }

    pub fn trip(&self) {
        let mut open_until = match self.open_until.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *open_until = Some(Instant::now() + self.cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_closed() {
        let breaker = RateLimitBreaker::new(Duration::from_secs(300));
        assert!(!breaker.is_open());
    }

    #[test]
    fn trip_opens_for_the_cooldown_window() {
        let breaker = RateLimitBreaker::new(Duration::from_millis(20));
        breaker.trip();
        assert!(breaker.is_open());

        thread::sleep(Duration::from_millis(30));
        assert!(!breaker.is_open());
    }

    #[test]
    fn retrip_extends_the_window() {
        let breaker = RateLimitBreaker::new(Duration::from_millis(30));
        breaker.trip();
        thread::sleep(Duration::from_millis(20));
        breaker.trip();
        thread::sleep(Duration::from_millis(20));
        assert!(breaker.is_open());
    }
}
