use std::time::Duration;

/// Trailing-edge debouncer driven by the frame clock.
///
/// Each `push` replaces the pending value and restarts the quiet period;
/// `poll` yields the latest value once the quiet period has elapsed.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Duration)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T, now: Duration) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_value_wins_after_quiet_period() {
        let ms = Duration::from_millis;
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.push(true, ms(0));
        debouncer.push(false, ms(30));
        debouncer.push(true, ms(60));
        debouncer.push(false, ms(90));

        assert_eq!(debouncer.poll(ms(150)), None);
        assert_eq!(debouncer.poll(ms(190)), Some(false));
        assert_eq!(debouncer.poll(ms(400)), None);
    }
}
