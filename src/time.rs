//! Time units

pub use fugit::HertzU32 as Hertz;

/// Bits per second
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bps(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Bps`
    fn bps(self) -> Bps;

    /// Wrap in `Hertz`
    fn hz(self) -> Hertz;

    /// Wrap in `Hertz`, interpreting `self` as kilohertz
    fn khz(self) -> Hertz;

    /// Wrap in `Hertz`, interpreting `self` as megahertz
    fn mhz(self) -> Hertz;
}

impl U32Ext for u32 {
    fn bps(self) -> Bps {
        Bps(self)
    }

    fn hz(self) -> Hertz {
        Hertz::from_raw(self)
    }

    fn khz(self) -> Hertz {
        Hertz::from_raw(self * 1_000)
    }

    fn mhz(self) -> Hertz {
        Hertz::from_raw(self * 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use crate::time::*;

    #[test]
    fn convert_mhz_to_hz() {
        let as_hz: Hertz = 16.mhz();
        assert_eq!(as_hz.raw(), 16_000_000_u32);
    }

    #[test]
    fn convert_khz_to_hz() {
        let as_hz: Hertz = 32.khz();
        assert_eq!(as_hz.raw(), 32_000_u32);
    }
}
