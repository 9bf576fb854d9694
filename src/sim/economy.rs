//! Four bounded resource meters with all-or-nothing spending

use serde::{Deserialize, Serialize};

use super::kinds::Meter;
use super::rejection::Rejection;
use crate::consts::METER_MAX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Economy {
    levels: [u32; 4],
}

impl Economy {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn level(&self, meter: Meter) -> u32 {
        self.levels[meter.index()]
    }

    /// Add to a meter, clamping at the cap. Returns the new level.
    pub fn credit(&mut self, meter: Meter, amount: u32) -> u32 {
        let slot = &mut self.levels[meter.index()];
        *slot = slot.saturating_add(amount).min(METER_MAX);
        *slot
    }

    pub fn can_afford(&self, costs: &[(Meter, u32)]) -> Result<(), Rejection> {
        for &(meter, needed) in costs {
            let available = self.level(meter);
            if available < needed {
                return Err(Rejection::InsufficientFunds {
                    meter,
                    needed,
                    available,
                });
            }
        }
        Ok(())
    }

    pub fn debit(&mut self, meter: Meter, amount: u32) -> Result<u32, Rejection> {
        self.debit_all(&[(meter, amount)])?;
        Ok(self.level(meter))
    }

    /// Spend several meters at once; nothing is spent unless every cost is covered
    pub fn debit_all(&mut self, costs: &[(Meter, u32)]) -> Result<(), Rejection> {
        self.can_afford(costs)?;
        for &(meter, amount) in costs {
            self.levels[meter.index()] -= amount;
        }
        Ok(())
    }

    /// Empty a meter entirely, returning what it held
    pub fn drain(&mut self, meter: Meter) -> u32 {
        std::mem::take(&mut self.levels[meter.index()])
    }

    pub fn levels(&self) -> [(Meter, u32); 4] {
        Meter::ALL.map(|m| (m, self.level(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_clamps() {
        let mut economy = Economy::new();
        assert_eq!(economy.credit(Meter::Fire, 70), 70);
        assert_eq!(economy.credit(Meter::Fire, 70), METER_MAX);
    }

    #[test]
    fn test_debit_all_is_all_or_nothing() {
        let mut economy = Economy::new();
        economy.credit(Meter::Earth, 19);
        economy.credit(Meter::Water, 40);

        let result = economy.debit_all(&[(Meter::Earth, 20), (Meter::Water, 30)]);
        assert_eq!(
            result,
            Err(Rejection::InsufficientFunds {
                meter: Meter::Earth,
                needed: 20,
                available: 19
            })
        );
        assert_eq!(economy.level(Meter::Earth), 19);
        assert_eq!(economy.level(Meter::Water), 40);

        economy.credit(Meter::Earth, 1);
        economy.debit_all(&[(Meter::Earth, 20), (Meter::Water, 30)]).unwrap();
        assert_eq!(economy.level(Meter::Earth), 0);
        assert_eq!(economy.level(Meter::Water), 10);
    }

    #[test]
    fn test_debit_single_meter() {
        let mut economy = Economy::new();
        economy.credit(Meter::Fire, 25);
        assert_eq!(economy.debit(Meter::Fire, 10), Ok(15));
        assert_eq!(
            economy.debit(Meter::Fire, 16),
            Err(Rejection::InsufficientFunds {
                meter: Meter::Fire,
                needed: 16,
                available: 15
            })
        );
        assert_eq!(economy.level(Meter::Fire), 15);
    }

    #[test]
    fn test_drain() {
        let mut economy = Economy::new();
        economy.credit(Meter::Shift, 100);
        assert_eq!(economy.drain(Meter::Shift), 100);
        assert_eq!(economy.level(Meter::Shift), 0);
    }
}
