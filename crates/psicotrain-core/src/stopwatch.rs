//! Exercise session stopwatch.
//!
//! The host drives it with [`Stopwatch::tick`] once per second; ticks while
//! stopped are ignored.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    elapsed_secs: u64,
    running: bool,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Start counting. No-op if already running.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop counting. No-op if already stopped.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Zero the counter and start again.
    pub fn reset(&mut self) {
        self.elapsed_secs = 0;
        self.running = true;
    }

    /// Advance by one second if running. Returns true if the time changed.
    pub fn tick(&mut self) -> bool {
        if self.running {
            self.elapsed_secs += 1;
        }
        self.running
    }

    /// `MM:SS`; minutes keep growing past 99.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_only_while_running() {
        let mut watch = Stopwatch::new();
        assert!(!watch.tick());
        watch.start();
        watch.start();
        assert!(watch.tick());
        assert!(watch.tick());
        watch.stop();
        watch.stop();
        assert!(!watch.tick());
        assert_eq!(watch.elapsed_secs(), 2);
    }

    #[test]
    fn test_reset_restarts() {
        let mut watch = Stopwatch::new();
        watch.start();
        watch.tick();
        watch.stop();
        watch.reset();
        assert!(watch.is_running());
        assert_eq!(watch.elapsed_secs(), 0);
    }

    #[test]
    fn test_display() {
        let mut watch = Stopwatch::new();
        assert_eq!(watch.display(), "00:00");
        watch.start();
        for _ in 0..65 {
            watch.tick();
        }
        assert_eq!(watch.display(), "01:05");
        for _ in 0..(100 * 60) {
            watch.tick();
        }
        assert_eq!(watch.display(), "101:05");
    }
}
