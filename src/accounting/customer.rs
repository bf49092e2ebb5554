use getset::Getters;
use serde::{Deserialize, Serialize};

use super::LedgerError;
use crate::numeric::Rational;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Customer {
    id: String,
    name: String,
    currency: String,
    /// Payments received that no invoice has absorbed yet.
    #[serde(default)]
    credit: Rational,
}

impl Customer {
    pub fn new(id: &str, name: &str, currency: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            currency: currency.to_string(),
            credit: Rational::ZERO,
        }
    }

    pub fn add_credit(&mut self, amount: Rational) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }

        self.credit = self.credit.checked_add(&amount)?;

        Ok(())
    }

    /// Removes up to `limit` from the available credit and returns what was taken.
    pub fn take_credit(&mut self, limit: Rational) -> Result<Rational, LedgerError> {
        let taken = self.credit.min(limit).max(Rational::ZERO);
        self.credit = self.credit.checked_sub(&taken)?;

        Ok(taken)
    }
}
