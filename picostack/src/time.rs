/*! Time keeping shared with the timer interrupt.

The engine knows time only in whole seconds. A hardware timer fires at a fixed cadence and calls
[`Clock::interrupt`], which advances a free-running sub-second counter and rolls it over into the
seconds counter. Nothing else happens in interrupt context: the countdowns of the address cache,
the retransmission pool and the idle reaper all run from the main loop when [`Engine::update`]
observes that seconds have passed.

[`Clock::interrupt`]: struct.Clock.html#method.interrupt
[`Engine::update`]: ../struct.Engine.html#method.update
*/
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// A coarse clock advanced by a timer interrupt.
///
/// All state is atomic so that a `&'static Clock` can be shared between the interrupt handler and
/// the main loop without a lock.
#[derive(Debug)]
pub struct Clock {
    ticks_per_second: u16,
    subsecond: AtomicU16,
    seconds: AtomicU32,
}

impl Clock {
    /// A clock whose interrupt fires `ticks_per_second` times per second.
    ///
    /// A rate of zero is treated as one.
    pub const fn new(ticks_per_second: u16) -> Self {
        Clock {
            ticks_per_second: if ticks_per_second == 0 { 1 } else { ticks_per_second },
            subsecond: AtomicU16::new(0),
            seconds: AtomicU32::new(0),
        }
    }

    /// Advance the clock by one timer tick.
    ///
    /// Called from the timer interrupt. Only the interrupt writes the counters.
    pub fn interrupt(&self) {
        let sub = self.subsecond.load(Ordering::Relaxed) + 1;
        if sub >= self.ticks_per_second {
            self.subsecond.store(0, Ordering::Relaxed);
            self.seconds.fetch_add(1, Ordering::Release);
        } else {
            self.subsecond.store(sub, Ordering::Relaxed);
        }
    }

    /// Whole seconds since the clock started.
    pub fn seconds(&self) -> u32 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Timer ticks since the last full second.
    pub fn subsecond(&self) -> u16 {
        self.subsecond.load(Ordering::Relaxed)
    }

    /// Timer ticks since the clock started.
    pub fn ticks(&self) -> u64 {
        loop {
            let seconds = self.seconds();
            let subsecond = self.subsecond();
            if self.seconds() == seconds {
                return u64::from(seconds) * u64::from(self.ticks_per_second) + u64::from(subsecond);
            }
        }
    }

    /// The configured interrupt rate.
    pub fn ticks_per_second(&self) -> u16 {
        self.ticks_per_second
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rolls_into_seconds() {
        let clock = Clock::new(4);
        for _ in 0..3 {
            clock.interrupt();
        }
        assert_eq!(clock.seconds(), 0);
        assert_eq!(clock.subsecond(), 3);
        clock.interrupt();
        assert_eq!(clock.seconds(), 1);
        assert_eq!(clock.subsecond(), 0);
        clock.interrupt();
        assert_eq!(clock.ticks(), 5);
    }

    #[test]
    fn static_clock() {
        static CLOCK: Clock = Clock::new(1);
        CLOCK.interrupt();
        CLOCK.interrupt();
        assert_eq!(CLOCK.seconds(), 2);
    }
}
