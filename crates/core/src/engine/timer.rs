/// Elapsed-seconds counter for one active session.
///
/// Starts at zero when the session is activated and advances only through
/// `tick`, which the surrounding scheduler calls once per wall-clock second.
/// It never pauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTimer {
    elapsed_secs: u32,
}

impl SessionTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }
}
