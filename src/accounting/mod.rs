use std::fmt;

use thiserror::Error;

pub mod account;
pub mod book;
pub mod customer;
pub mod invoice;
pub mod session;


use account::{Account, AccountId};
use customer::Customer;
use invoice::{Entry, Payment, PaymentReceipt, Posting};

use crate::numeric::{NumericError, Rational};

#[derive(Debug, PartialEq, Error)]
pub enum AccountError {
    #[error("account {path:?} not found: no account named {segment:?}")]
    NotFound { path: String, segment: String },
}

#[derive(Debug, PartialEq, Error)]
pub enum LedgerError {
    #[error("customer {0} not found")]
    UnknownCustomer(String),
    #[error("invoice {0} not found")]
    UnknownInvoice(String),
    #[error("account {0} not found")]
    UnknownAccount(AccountId),
    #[error("currency {0} is not in the book")]
    UnknownCurrency(String),
    #[error("customer trades in {expected}, not {found}")]
    CurrencyMismatch { expected: String, found: String },
    #[error("invoice {0} already exists")]
    DuplicateInvoice(String),
    #[error("invoice {invoice} belongs to customer {owner}")]
    CustomerMismatch { invoice: String, owner: String },
    #[error("invoice {0} is already posted")]
    AlreadyPosted(String),
    #[error("invoice {0} is not posted")]
    NotPosted(String),
    #[error("invoice {0} has no entries")]
    NothingToPost(String),
    #[error("invalid amount {0}")]
    InvalidAmount(Rational),
    #[error("transaction {0:?} does not balance")]
    Unbalanced(String),
    #[error("{0}")]
    Numeric(#[from] NumericError),
}

/// ISO 4217 code of a currency the book knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency(String);

impl Currency {
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The accounting engine operations the importer drives.
pub trait Book {
    fn root_account(&self) -> &Account;

    fn lookup_currency(&self, code: &str) -> Option<Currency>;

    fn lookup_customer(&self, id: &str) -> Option<&Customer>;

    /// Reserves the next invoice number.
    fn next_invoice_id(&mut self) -> String;

    fn create_invoice(&mut self, id: &str, currency: &Currency, customer: &str) -> Result<(), LedgerError>;

    fn add_entry(&mut self, invoice: &str, entry: Entry) -> Result<(), LedgerError>;

    /// Posts the invoice and returns its total.
    fn post_invoice(&mut self, invoice: &str, posting: Posting) -> Result<Rational, LedgerError>;

    /// Records a payment from `customer`, applied to `invoice` when one is given.
    fn apply_payment(
        &mut self,
        customer: &str,
        invoice: Option<&str>,
        payment: Payment,
    ) -> Result<PaymentReceipt, LedgerError>;
}
