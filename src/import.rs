use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use thiserror::Error;

use crate::accounting::account::{resolve, AccountId};
use crate::accounting::invoice::{Entry, Payment, Posting};
use crate::accounting::{AccountError, Book, LedgerError};
use crate::dates::DateError;
use crate::numeric::{to_rational, Rational, ScaledDecimal};
use crate::record::{self, Record, RecordDefaults};

pub const PAYMENT_MEMO: &str = "Payment Received";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub delimiter: u8,
    pub receivable_account: String,
    pub transfer_account: String,
    pub defaults: RecordDefaults,
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("unreadable row: {0}")]
    Unreadable(#[from] csv::Error),
    #[error("customer {0} not found")]
    UnknownCustomer(String),
    #[error("currency {0} not found")]
    UnknownCurrency(String),
    #[error("{field} {value:?} is not a number")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{0}")]
    Account(#[from] AccountError),
    #[error("{0}")]
    Date(#[from] DateError),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, PartialEq)]
pub enum RowOutcome {
    /// Nothing to import, e.g. no customer ID.
    Skipped(&'static str),
    Imported {
        invoice: Option<String>,
        payment: Option<Rational>,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub invoices: usize,
    pub payments: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} rows: {} invoices posted, {} payments applied, {} skipped, {} failed",
            self.rows, self.invoices, self.payments, self.skipped, self.failed
        )
    }
}

/// Accounts every row posts against, resolved once per run.
struct RunAccounts {
    receivable: AccountId,
    transfer: AccountId,
}

pub fn import_file<B: Book>(file_path: &Path, book: &mut B, options: &ImportOptions) -> Result<ImportSummary> {
    let file = File::open(file_path).with_context(|| format!("cannot open {}", file_path.display()))?;
    import_rows(file, book, options)
}

/// Imports every row of `reader`. Rows that cannot be imported are logged and counted; only
/// problems that affect the whole run (unreadable header, missing posting accounts) are errors.
pub fn import_rows<R: io::Read, B: Book>(reader: R, book: &mut B, options: &ImportOptions) -> Result<ImportSummary> {
    let accounts = RunAccounts {
        receivable: resolve(book.root_account(), &options.receivable_account)
            .context("receivable account")?
            .id,
        transfer: resolve(book.root_account(), &options.transfer_account)
            .context("transfer account")?
            .id,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers().context("cannot read header line")?.clone();

    let mut summary = ImportSummary::default();
    for (index, row) in csv_reader.records().enumerate() {
        // Line 1 is the header.
        let line = index + 2;
        summary.rows += 1;

        let outcome = row
            .map_err(RowError::from)
            .and_then(|row| import_record(&Record::from_csv(&headers, &row), book, &accounts, options));

        match outcome {
            Ok(RowOutcome::Skipped(reason)) => {
                debug!("line {}: skipped, {}", line, reason);
                summary.skipped += 1;
            },
            Ok(RowOutcome::Imported { invoice, payment }) => {
                if let Some(invoice) = invoice {
                    info!("line {}: posted invoice {}", line, invoice);
                    summary.invoices += 1;
                }
                if let Some(amount) = payment {
                    info!("line {}: applied payment of {}", line, display_amount(&amount));
                    summary.payments += 1;
                }
            },
            Err(err) => {
                warn!("line {}: {}", line, err);
                summary.failed += 1;
            },
        }
    }

    Ok(summary)
}

fn import_record<B: Book>(
    record: &Record,
    book: &mut B,
    accounts: &RunAccounts,
    options: &ImportOptions,
) -> Result<RowOutcome, RowError> {
    let defaults = &options.defaults;

    if record.is_blank(record::CUSTOMER_ID) {
        return Ok(RowOutcome::Skipped("no customer ID"));
    }
    let customer_id = record.get(record::CUSTOMER_ID);

    let has_invoice = !record.is_blank(record::QUANTITY);
    let has_payment = !record.is_blank(record::CASH_PAID);
    if !has_invoice && !has_payment {
        return Ok(RowOutcome::Skipped("no quantity or payment"));
    }

    let currency_code = record.currency(defaults);
    let currency = book
        .lookup_currency(currency_code)
        .ok_or_else(|| RowError::UnknownCurrency(currency_code.to_string()))?;

    let customer = book
        .lookup_customer(customer_id)
        .ok_or_else(|| RowError::UnknownCustomer(customer_id.to_string()))?;
    // Checked here as well so a mismatch does not use up an invoice number.
    if customer.currency() != currency.code() {
        return Err(LedgerError::CurrencyMismatch {
            expected: customer.currency().clone(),
            found: currency.code().to_string(),
        }
        .into());
    }

    let date = record.date(defaults)?;

    // Everything that can fail on the row's own data is settled before the book is touched,
    // so a bad row never leaves a draft invoice behind.
    let entry = if has_invoice {
        let entry = Entry {
            description: record.description(defaults),
            quantity: parse_amount(record, record::QUANTITY)?,
            price: parse_amount(record, record::UNIT_PRICE)?,
            income_account: resolve(book.root_account(), record.income_account(defaults))?.id,
        };
        entry.amount()?;
        Some(entry)
    } else {
        None
    };
    let paid = if has_payment {
        Some(parse_amount(record, record::CASH_PAID)?)
    } else {
        None
    };

    let mut invoice = None;
    if let Some(entry) = entry {
        let id = book.next_invoice_id();
        let description = entry.description.clone();

        book.create_invoice(&id, &currency, customer_id)?;
        book.add_entry(&id, entry)?;
        let total = book.post_invoice(
            &id,
            Posting {
                receivable: accounts.receivable,
                posted: date,
                due: date,
                description,
                accumulate: true,
                autopay: false,
            },
        )?;
        debug!("invoice {} for customer {} totals {}", id, customer_id, display_amount(&total));

        invoice = Some(id);
    }

    let mut payment = None;
    if let Some(amount) = paid {
        let receipt = book.apply_payment(
            customer_id,
            invoice.as_deref(),
            Payment {
                receivable: accounts.receivable,
                transfer: accounts.transfer,
                amount,
                refund: Rational::ZERO,
                date,
                memo: PAYMENT_MEMO.to_string(),
                num: String::new(),
                autopay: false,
            },
        )?;
        if receipt.credited.is_positive() {
            debug!(
                "customer {} keeps {} as credit",
                customer_id,
                display_amount(&receipt.credited)
            );
        }

        payment = Some(amount);
    }

    Ok(RowOutcome::Imported { invoice, payment })
}

fn parse_amount(record: &Record, field: &'static str) -> Result<Rational, RowError> {
    let value = record.get(field);
    let decimal: ScaledDecimal = value.parse().map_err(|_| RowError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;

    Ok(to_rational(&decimal))
}

fn display_amount(amount: &Rational) -> String {
    amount
        .to_decimal()
        .map_or_else(|| amount.to_string(), |decimal| decimal.to_string())
}
