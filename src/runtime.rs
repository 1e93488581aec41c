use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Unified event type consumed by the interactive commands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Input is exhausted; no more lines will arrive.
    Eof,
    Tick,
}

/// Source of user input lines
pub trait InputSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError>;
}

/// Production input source reading stdin on a helper thread
pub struct StdinSource {
    rx: Receiver<InputEvent>,
}

impl StdinSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(InputEvent::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(InputEvent::Eof);
        });

        Self { rx }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for StdinSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test input source for unit tests
pub struct TestInputSource {
    rx: Receiver<InputEvent>,
}

impl TestInputSource {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx }
    }
}

impl InputSource for TestInputSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances an interactive command one event/tick at a time
pub struct Runner<E: InputSource, T: Ticker> {
    source: E,
    ticker: T,
}

impl<E: InputSource, T: Ticker> Runner<E, T> {
    pub fn new(source: E, ticker: T) -> Self {
        Self { source, ticker }
    }

    /// Blocks up to tick interval and returns the next event, Tick on timeout,
    /// or Eof once the source has hung up.
    pub fn step(&self) -> InputEvent {
        match self.source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => InputEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => InputEvent::Eof,
        }
    }

}

/// Hands out whole seconds of wall-clock time since it was last reset,
/// carrying the sub-second remainder over to the next call.
#[derive(Clone, Copy, Debug)]
pub struct SecondCounter {
    since: Instant,
}

impl SecondCounter {
    pub fn new(now: Instant) -> Self {
        Self { since: now }
    }

    pub fn reset(&mut self, now: Instant) {
        self.since = now;
    }

    /// Whole seconds elapsed up to `now` that were not handed out before.
    pub fn take(&mut self, now: Instant) -> u32 {
        let secs = now.saturating_duration_since(self.since).as_secs();
        self.since += Duration::from_secs(secs);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let source = TestInputSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(source, ticker);

        assert_eq!(runner.step(), InputEvent::Tick);
    }

    #[test]
    fn step_passes_through_lines() {
        let (tx, rx) = mpsc::channel();
        tx.send(InputEvent::Line("2".into())).unwrap();
        let runner = Runner::new(TestInputSource::new(rx), FixedTicker::new(Duration::from_millis(10)));

        assert_eq!(runner.step(), InputEvent::Line("2".into()));
    }

    #[test]
    fn step_reports_eof_when_source_hangs_up() {
        let (tx, rx) = mpsc::channel::<InputEvent>();
        drop(tx);
        let runner = Runner::new(TestInputSource::new(rx), FixedTicker::new(Duration::from_millis(10)));

        assert_eq!(runner.step(), InputEvent::Eof);
    }

    #[test]
    fn counter_keeps_the_remainder() {
        let start = Instant::now();
        let mut counter = SecondCounter::new(start);

        assert_eq!(counter.take(start + Duration::from_millis(900)), 0);
        assert_eq!(counter.take(start + Duration::from_millis(2_500)), 2);
        assert_eq!(counter.take(start + Duration::from_millis(3_100)), 1);
        assert_eq!(counter.take(start + Duration::from_millis(3_900)), 0);
    }

    #[test]
    fn counter_reset_drops_partial_seconds() {
        let start = Instant::now();
        let mut counter = SecondCounter::new(start);
        counter.reset(start + Duration::from_millis(1_700));
        assert_eq!(counter.take(start + Duration::from_millis(2_600)), 0);
        assert_eq!(counter.take(start + Duration::from_millis(2_700)), 1);
    }

    #[test]
    fn counter_ignores_times_before_reset() {
        let start = Instant::now();
        let mut counter = SecondCounter::new(start + Duration::from_secs(5));
        assert_eq!(counter.take(start), 0);
    }
}
