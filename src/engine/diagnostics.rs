//! Runtime fault reporting.
//!
//! Numeric faults never stop the sample loop. The module recovers with a
//! safe output, and the fault is logged through `tracing` and counted here
//! so hosts and tests can observe it without installing a subscriber.

use tracing::warn;

/// Kind of runtime numeric fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Enabled divider saw a zero divisor.
    DivideByZero,
    /// Table index, multiplexer address or bit range outside its bounds.
    IndexOutOfRange,
}

impl Fault {
    fn describe(self) -> &'static str {
        match self {
            Fault::DivideByZero => "divide by zero",
            Fault::IndexOutOfRange => "index out of range",
        }
    }
}

/// Per-circuit fault counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    divide_by_zero: u64,
    index_out_of_range: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault raised by `node`. `value` is the offending input.
    pub fn report(&mut self, node: &str, fault: Fault, value: f64) {
        match fault {
            Fault::DivideByZero => self.divide_by_zero += 1,
            Fault::IndexOutOfRange => self.index_out_of_range += 1,
        }
        warn!(node, value, "{}", fault.describe());
    }

    /// Number of reports of one fault kind.
    pub fn count(&self, fault: Fault) -> u64 {
        match fault {
            Fault::DivideByZero => self.divide_by_zero,
            Fault::IndexOutOfRange => self.index_out_of_range,
        }
    }

    /// Number of reports of any kind.
    pub fn total(&self) -> u64 {
        self.divide_by_zero + self.index_out_of_range
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Edge detector for fault reporting: reports when a fault condition
/// begins and stays quiet until the condition has cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultLatch {
    tripped: bool,
}

impl FaultLatch {
    /// Note that the fault condition holds this sample.
    pub fn trip(&mut self, ctx: &mut super::Context<'_>, fault: Fault, value: f64) {
        if !self.tripped {
            self.tripped = true;
            ctx.report(fault, value);
        }
    }

    /// Note that the fault condition does not hold this sample.
    pub fn clear(&mut self) {
        self.tripped = false;
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Context, SampleClock};

    #[test]
    fn test_counts_by_kind() {
        let mut diag = Diagnostics::new();
        diag.report("D1", Fault::DivideByZero, 0.0);
        diag.report("L1", Fault::IndexOutOfRange, 9.0);
        diag.report("L1", Fault::IndexOutOfRange, 10.0);
        assert_eq!(diag.count(Fault::DivideByZero), 1);
        assert_eq!(diag.count(Fault::IndexOutOfRange), 2);
        assert_eq!(diag.total(), 3);
        diag.clear();
        assert_eq!(diag.total(), 0);
    }

    #[test]
    fn test_latch_reports_once_per_run() {
        let clock = SampleClock::new(1000.0).unwrap();
        let mut diag = Diagnostics::new();
        let mut latch = FaultLatch::default();
        for faulty in [true, true, true, false, true, true] {
            let mut ctx = Context::new("X", &clock, &mut diag);
            if faulty {
                latch.trip(&mut ctx, Fault::DivideByZero, 0.0);
            } else {
                latch.clear();
            }
        }
        assert_eq!(diag.count(Fault::DivideByZero), 2);
        assert!(latch.is_tripped());
    }
}
