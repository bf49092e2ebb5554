use std::collections::HashMap;

use chrono::NaiveDateTime;
use csv::StringRecord;
use rust_decimal::Decimal;

use crate::dates::{parse_date, DateError};
use crate::numeric::Rational;

pub const DATE: &str = "Date";
pub const CUSTOMER_ID: &str = "Customer ID";
pub const QUANTITY: &str = "Quantity";
pub const UNIT_PRICE: &str = "Unit Price";
pub const CASH_PAID: &str = "Cash Paid";
pub const DESCRIPTION: &str = "Description";
pub const REMARKS: &str = "Remarks";
pub const CURRENCY: &str = "Currency";
pub const INCOME_ACCOUNT: &str = "Income Account";

/// Values that count as "not filled in": zero, `""`, `"0"` and absent.
///
/// Only the exact text `"0"` is blank; `"0.0"` and `" "` are not.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for str {
    fn is_blank(&self) -> bool {
        self.is_empty() || self == "0"
    }
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.as_str().is_blank()
    }
}

impl Blank for i64 {
    fn is_blank(&self) -> bool {
        *self == 0
    }
}

impl Blank for Decimal {
    fn is_blank(&self) -> bool {
        self.is_zero()
    }
}

impl Blank for Rational {
    fn is_blank(&self) -> bool {
        self.is_zero()
    }
}

impl<T: Blank + ?Sized> Blank for &T {
    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

impl<T: Blank> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Blank::is_blank)
    }
}

/// Fallbacks for optional columns.
#[derive(Debug, Clone)]
pub struct RecordDefaults {
    pub currency: String,
    pub income_account: String,
    /// Unit appended to the quantity when a row has no description, e.g. `"3 Ltr. Milk"`.
    pub item_unit: String,
    pub date: NaiveDateTime,
}

/// Read-only view of one input row where missing columns read as `""`.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn from_csv(headers: &StringRecord, row: &StringRecord) -> Record {
        headers.iter().zip(row.iter()).collect()
    }

    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map_or("", String::as_str)
    }

    pub fn is_blank(&self, key: &str) -> bool {
        self.fields.get(key).is_blank()
    }

    pub fn description(&self, defaults: &RecordDefaults) -> String {
        let mut description = if self.is_blank(DESCRIPTION) {
            format!("{} {}", self.get(QUANTITY), defaults.item_unit)
        } else {
            self.get(DESCRIPTION).to_string()
        };

        if !self.is_blank(REMARKS) {
            description.push_str(&format!(" ({})", self.get(REMARKS)));
        }

        description
    }

    pub fn currency<'a>(&'a self, defaults: &'a RecordDefaults) -> &'a str {
        self.or_default(CURRENCY, &defaults.currency)
    }

    pub fn income_account<'a>(&'a self, defaults: &'a RecordDefaults) -> &'a str {
        self.or_default(INCOME_ACCOUNT, &defaults.income_account)
    }

    pub fn date(&self, defaults: &RecordDefaults) -> Result<NaiveDateTime, DateError> {
        if self.is_blank(DATE) {
            Ok(defaults.date)
        } else {
            parse_date(self.get(DATE))
        }
    }

    fn or_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        if self.is_blank(key) {
            default
        } else {
            self.get(key)
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
