/// Wall-clock tick counter driving the engine.
///
/// Each tick advances the clock by a fixed interval. Incident events are
/// scheduled against [`TickClock::elapsed_ms`], so a transcript line due at
/// 3600 ms is released on the first tick whose elapsed time reaches it.
///
/// # Examples
///
/// ```
/// use greengrid_sim::sim::clock::TickClock;
///
/// let mut clock = TickClock::new(1000);
/// assert_eq!(clock.tick(), 1000);
/// assert_eq!(clock.tick(), 2000);
/// assert_eq!(clock.ticks(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    /// Milliseconds added per tick
    interval_ms: u64,
    /// Ticks taken so far
    ticks: u64,
}

impl TickClock {
    /// Creates a clock at zero.
    ///
    /// # Arguments
    ///
    /// * `interval_ms` - Milliseconds added on every tick
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ticks: 0,
        }
    }

    /// Advances the clock by one interval.
    ///
    /// # Returns
    ///
    /// The elapsed time after advancing (ms).
    pub fn tick(&mut self) -> u64 {
        self.ticks += 1;
        self.elapsed_ms()
    }

    /// Elapsed time since the clock started (ms).
    pub fn elapsed_ms(&self) -> u64 {
        self.ticks * self.interval_ms
    }

    /// Number of ticks taken.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Milliseconds per tick.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns the clock to zero.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = TickClock::new(500);
        assert_eq!(clock.ticks(), 0);
        assert_eq!(clock.elapsed_ms(), 0);
        assert_eq!(clock.interval_ms(), 500);
    }

    #[test]
    fn test_tick() {
        let mut clock = TickClock::new(250);
        assert_eq!(clock.tick(), 250);
        assert_eq!(clock.tick(), 500);
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_reset() {
        let mut clock = TickClock::new(1000);
        clock.tick();
        clock.tick();
        clock.reset();
        assert_eq!(clock.elapsed_ms(), 0);
        assert_eq!(clock.tick(), 1000);
    }

    #[test]
    fn test_zero_interval() {
        let mut clock = TickClock::new(0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.ticks(), 1);
    }
}
