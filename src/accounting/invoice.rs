use chrono::NaiveDateTime;
use getset::Getters;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::LedgerError;
use crate::numeric::Rational;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
}

impl InvoiceStatus {
    pub fn is_posted(&self) -> bool {
        self != &InvoiceStatus::Draft
    }

    pub fn is_settled(&self) -> bool {
        self == &InvoiceStatus::Paid
    }
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub description: String,
    pub quantity: Rational,
    pub price: Rational,
    pub income_account: AccountId,
}

impl Entry {
    pub fn amount(&self) -> Result<Rational, LedgerError> {
        Ok(self.quantity.checked_mul(&self.price)?)
    }
}

/// Arguments for posting an invoice to a receivable account.
#[derive(Debug, Clone)]
pub struct Posting {
    pub receivable: AccountId,
    pub posted: NaiveDateTime,
    pub due: NaiveDateTime,
    pub description: String,
    /// Merge lines that credit the same income account into one split.
    pub accumulate: bool,
    /// Apply the customer's unapplied credit to the invoice once posted.
    pub autopay: bool,
}

/// Where and when an invoice was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePosting {
    pub receivable: AccountId,
    pub posted: NaiveDateTime,
    pub due: NaiveDateTime,
    pub total: Rational,
    /// Index of the posting transaction in the book's journal.
    pub transaction: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Invoice {
    id: String,
    customer: String,
    currency: String,
    #[serde(default)]
    entries: Vec<Entry>,
    #[serde(default)]
    posting: Option<InvoicePosting>,
    #[serde(default)]
    paid: Rational,
}

impl Invoice {
    pub fn new(id: &str, customer: &str, currency: &str) -> Invoice {
        Invoice {
            id: id.to_string(),
            customer: customer.to_string(),
            currency: currency.to_string(),
            entries: Vec::new(),
            posting: None,
            paid: Rational::ZERO,
        }
    }

    pub fn status(&self) -> InvoiceStatus {
        match &self.posting {
            None => InvoiceStatus::Draft,
            Some(posting) if self.paid >= posting.total => InvoiceStatus::Paid,
            Some(_) => InvoiceStatus::Open,
        }
    }

    pub fn add_entry(&mut self, entry: Entry) -> Result<(), LedgerError> {
        if self.status().is_posted() {
            return Err(LedgerError::AlreadyPosted(self.id.clone()));
        }

        self.entries.push(entry);

        Ok(())
    }

    pub fn total(&self) -> Result<Rational, LedgerError> {
        self.entries
            .iter()
            .try_fold(Rational::ZERO, |total, entry| Ok(total.checked_add(&entry.amount()?)?))
    }

    /// Amount still owed; zero until the invoice is posted.
    pub fn balance(&self) -> Result<Rational, LedgerError> {
        match &self.posting {
            Some(posting) => Ok(posting.total.checked_sub(&self.paid)?),
            None => Ok(Rational::ZERO),
        }
    }

    pub(super) fn mark_posted(&mut self, posting: InvoicePosting) {
        self.posting = Some(posting);
    }

    /// Applies up to `amount` against the open balance and returns the part that was used.
    pub(super) fn apply(&mut self, amount: Rational) -> Result<Rational, LedgerError> {
        if !self.status().is_posted() {
            return Err(LedgerError::NotPosted(self.id.clone()));
        }

        let applied = amount.min(self.balance()?).max(Rational::ZERO);
        self.paid = self.paid.checked_add(&applied)?;

        Ok(applied)
    }
}

/// Arguments for recording a customer payment.
#[derive(Debug, Clone)]
pub struct Payment {
    /// Receivable account the payment is credited to.
    pub receivable: AccountId,
    /// Cash or bank account the money goes into.
    pub transfer: AccountId,
    pub amount: Rational,
    /// Change handed back to the customer out of `amount`.
    pub refund: Rational,
    pub date: NaiveDateTime,
    pub memo: String,
    pub num: String,
    /// Spread whatever the target invoice does not absorb over the customer's other open invoices.
    pub autopay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub applied: Rational,
    pub credited: Rational,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub account: AccountId,
    /// Positive values debit the account, negative values credit it.
    pub value: Rational,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub date: NaiveDateTime,
    pub num: String,
    pub description: String,
    pub currency: String,
    pub splits: Vec<Split>,
}

impl LedgerTransaction {
    pub fn imbalance(&self) -> Result<Rational, LedgerError> {
        self.splits
            .iter()
            .try_fold(Rational::ZERO, |sum, split| Ok(sum.checked_add(&split.value)?))
    }
}
