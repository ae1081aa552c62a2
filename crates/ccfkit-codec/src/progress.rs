//! Progress reporting collaborator.

/// Receiver for codec progress.
///
/// The session reports the integer percentage of bytes consumed (decode)
/// or records written (encode), calling [`on_percent`](Self::on_percent)
/// only when the value changes so a UI thread is never flooded. Both
/// methods default to no-ops; a sink is always optional.
pub trait ProgressSink {
    fn on_percent(&mut self, _percent: u8) {}

    fn on_message(&mut self, _message: &str) {}
}

/// A sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Rescales a pass's 0-100 range into a slice of an outer operation,
/// for callers that run several passes under one progress bar.
pub struct ScopedSink<'a> {
    inner: &'a mut dyn ProgressSink,
    low: u8,
    high: u8,
}

impl<'a> ScopedSink<'a> {
    pub fn new(inner: &'a mut dyn ProgressSink, low: u8, high: u8) -> Self {
        ScopedSink { inner, low, high }
    }
}

impl ProgressSink for ScopedSink<'_> {
    fn on_percent(&mut self, percent: u8) {
        let span = u32::from(self.high - self.low);
        let scaled = self.low + (u32::from(percent.min(100)) * span / 100) as u8;
        self.inner.on_percent(scaled);
    }

    fn on_message(&mut self, message: &str) {
        self.inner.on_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(Vec<u8>);

    impl ProgressSink for Capture {
        fn on_percent(&mut self, percent: u8) {
            self.0.push(percent);
        }
    }

    #[test]
    fn test_scoped_rescale() {
        let mut cap = Capture::default();
        {
            let mut scoped = ScopedSink::new(&mut cap, 10, 90);
            scoped.on_percent(0);
            scoped.on_percent(50);
            scoped.on_percent(100);
        }
        assert_eq!(cap.0, vec![10, 50, 90]);
    }
}
