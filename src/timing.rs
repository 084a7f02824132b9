use std::time::Instant;

/// RAII timer that logs elapsed milliseconds at `debug!` on drop.
pub struct Stopwatch {
    label: &'static str,
    start: Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        log::debug!("{} took {:.3}ms", self.label, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}
