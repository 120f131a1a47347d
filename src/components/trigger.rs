//! Trigger functions: fixed boolean combinations of up to three triggers.
//!
//! Used by the integrators and the triggered VCA to decide which charge
//! paths are active. A trigger counts as active when its integer part is
//! non-zero, so a fractional X-time value below 1 is inactive.

/// A boolean combination of the trigger inputs `trg0`, `trg1`, `trg2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerFunction {
    #[default]
    Trg0,
    Trg0Inv,
    Trg1,
    Trg1Inv,
    Trg2,
    Trg2Inv,
    Trg01And,
    Trg01Nand,
    Trg02And,
    Trg02Nand,
    Trg12And,
    Trg12Nand,
}

impl TriggerFunction {
    /// Parse a netlist keyword such as `TRG0`, `TRG1_INV` or `TRG01_NAND`.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRG0" => Some(Self::Trg0),
            "TRG0_INV" => Some(Self::Trg0Inv),
            "TRG1" => Some(Self::Trg1),
            "TRG1_INV" => Some(Self::Trg1Inv),
            "TRG2" => Some(Self::Trg2),
            "TRG2_INV" => Some(Self::Trg2Inv),
            "TRG01_AND" => Some(Self::Trg01And),
            "TRG01_NAND" => Some(Self::Trg01Nand),
            "TRG02_AND" => Some(Self::Trg02And),
            "TRG02_NAND" => Some(Self::Trg02Nand),
            "TRG12_AND" => Some(Self::Trg12And),
            "TRG12_NAND" => Some(Self::Trg12Nand),
            _ => None,
        }
    }

    pub fn eval(self, trg0: f64, trg1: f64, trg2: f64) -> bool {
        let active = |trg: f64| trg.trunc() != 0.0;
        let (t0, t1, t2) = (active(trg0), active(trg1), active(trg2));
        match self {
            Self::Trg0 => t0,
            Self::Trg0Inv => !t0,
            Self::Trg1 => t1,
            Self::Trg1Inv => !t1,
            Self::Trg2 => t2,
            Self::Trg2Inv => !t2,
            Self::Trg01And => t0 && t1,
            Self::Trg01Nand => !(t0 && t1),
            Self::Trg02And => t0 && t2,
            Self::Trg02Nand => !(t0 && t2),
            Self::Trg12And => t1 && t2,
            Self::Trg12Nand => !(t1 && t2),
        }
    }
}
