use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use super::account::{Account, AccountId};
use super::customer::Customer;
use super::invoice::{Entry, Invoice, InvoicePosting, LedgerTransaction, Payment, PaymentReceipt, Posting, Split};
use super::{Book, Currency, LedgerError};
use crate::numeric::Rational;

/// Book kept entirely in memory and serialized as a whole by [`super::session::Session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBook {
    currencies: BTreeSet<String>,
    root: Account,
    #[serde(default)]
    customers: BTreeMap<String, Customer>,
    #[serde(default)]
    invoices: BTreeMap<String, Invoice>,
    #[serde(default)]
    journal: Vec<LedgerTransaction>,
    #[serde(default)]
    last_invoice_number: u64,
}

impl MemoryBook {
    pub fn new(root: Account) -> MemoryBook {
        MemoryBook {
            currencies: BTreeSet::new(),
            root,
            customers: BTreeMap::new(),
            invoices: BTreeMap::new(),
            journal: Vec::new(),
            last_invoice_number: 0,
        }
    }

    pub fn with_currency(mut self, code: &str) -> MemoryBook {
        self.currencies.insert(code.to_string());
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> MemoryBook {
        self.customers.insert(customer.id().clone(), customer);
        self
    }

    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.get(id)
    }

    pub fn invoices_iter(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.values()
    }

    pub fn journal(&self) -> &[LedgerTransaction] {
        &self.journal
    }

    /// Sum of every split posted to `account`; debits count positive.
    pub fn balance(&self, account: AccountId) -> Result<Rational, LedgerError> {
        self.journal
            .iter()
            .flat_map(|transaction| transaction.splits.iter())
            .filter(|split| split.account == account)
            .try_fold(Rational::ZERO, |sum, split| Ok(sum.checked_add(&split.value)?))
    }

    /// Account ids that appear more than once in the tree.
    pub fn duplicate_account_ids(&self) -> Vec<AccountId> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for account in self.root.descendants() {
            if !seen.insert(account.id) {
                duplicates.insert(account.id);
            }
        }
        duplicates.into_iter().collect()
    }

    fn require_account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.root.find(id).ok_or(LedgerError::UnknownAccount(id))
    }

    /// Appends a balanced transaction to the journal and returns its index.
    fn record(&mut self, transaction: LedgerTransaction) -> Result<usize, LedgerError> {
        if !transaction.imbalance()?.is_zero() {
            return Err(LedgerError::Unbalanced(transaction.description));
        }

        debug!("journal entry {} {:?}", self.journal.len(), transaction.description);
        for split in &transaction.splits {
            let path = self.root.path_of(split.account).unwrap_or_else(|| split.account.to_string());
            debug!("  {} {}", path, split.value);
        }

        self.journal.push(transaction);
        Ok(self.journal.len() - 1)
    }
}

impl Book for MemoryBook {
    fn root_account(&self) -> &Account {
        &self.root
    }

    fn lookup_currency(&self, code: &str) -> Option<Currency> {
        self.currencies.get(code).map(|code| Currency(code.clone()))
    }

    fn lookup_customer(&self, id: &str) -> Option<&Customer> {
        self.customers.get(id)
    }

    fn next_invoice_id(&mut self) -> String {
        loop {
            self.last_invoice_number += 1;
            let id = format!("{:06}", self.last_invoice_number);
            if !self.invoices.contains_key(&id) {
                return id;
            }
        }
    }

    fn create_invoice(&mut self, id: &str, currency: &Currency, customer: &str) -> Result<(), LedgerError> {
        if !self.currencies.contains(currency.code()) {
            return Err(LedgerError::UnknownCurrency(currency.code().to_string()));
        }

        let owner = self
            .customers
            .get(customer)
            .ok_or_else(|| LedgerError::UnknownCustomer(customer.to_string()))?;
        if owner.currency() != currency.code() {
            return Err(LedgerError::CurrencyMismatch {
                expected: owner.currency().clone(),
                found: currency.code().to_string(),
            });
        }

        if self.invoices.contains_key(id) {
            return Err(LedgerError::DuplicateInvoice(id.to_string()));
        }

        self.invoices
            .insert(id.to_string(), Invoice::new(id, customer, currency.code()));

        Ok(())
    }

    fn add_entry(&mut self, invoice: &str, entry: Entry) -> Result<(), LedgerError> {
        self.require_account(entry.income_account)?;

        self.invoices
            .get_mut(invoice)
            .ok_or_else(|| LedgerError::UnknownInvoice(invoice.to_string()))?
            .add_entry(entry)
    }

    fn post_invoice(&mut self, invoice_id: &str, posting: Posting) -> Result<Rational, LedgerError> {
        self.require_account(posting.receivable)?;

        let invoice = self
            .invoices
            .get(invoice_id)
            .ok_or_else(|| LedgerError::UnknownInvoice(invoice_id.to_string()))?;
        if invoice.status().is_posted() {
            return Err(LedgerError::AlreadyPosted(invoice_id.to_string()));
        }
        if invoice.entries().is_empty() {
            return Err(LedgerError::NothingToPost(invoice_id.to_string()));
        }

        let total = invoice.total()?;
        let mut splits = vec![Split {
            account: posting.receivable,
            value: total,
            memo: posting.description.clone(),
        }];

        for entry in invoice.entries() {
            let credit = entry.amount()?.checked_neg()?;
            let existing = if posting.accumulate {
                splits.iter().skip(1).position(|split| split.account == entry.income_account)
            } else {
                None
            };
            match existing {
                Some(index) => {
                    let split = &mut splits[index + 1];
                    split.value = split.value.checked_add(&credit)?;
                },
                None => splits.push(Split {
                    account: entry.income_account,
                    value: credit,
                    memo: entry.description.clone(),
                }),
            }
        }

        let transaction = LedgerTransaction {
            date: posting.posted,
            num: invoice_id.to_string(),
            description: posting.description.clone(),
            currency: invoice.currency().clone(),
            splits,
        };

        // Work on copies so a failed step leaves neither the journal nor the invoice changed.
        let mut posted = invoice.clone();
        posted.mark_posted(InvoicePosting {
            receivable: posting.receivable,
            posted: posting.posted,
            due: posting.due,
            total,
            transaction: self.journal.len(),
        });

        let mut owner = None;
        if posting.autopay {
            if let Some(customer) = self.customers.get(posted.customer()) {
                let mut customer = customer.clone();
                let credit = customer.take_credit(posted.balance()?)?;
                if credit.is_positive() {
                    posted.apply(credit)?;
                    debug!("applied {} of customer credit to invoice {}", credit, invoice_id);
                    owner = Some(customer);
                }
            }
        }

        self.record(transaction)?;
        self.invoices.insert(invoice_id.to_string(), posted);
        if let Some(customer) = owner {
            self.customers.insert(customer.id().clone(), customer);
        }

        Ok(total)
    }

    fn apply_payment(
        &mut self,
        customer_id: &str,
        invoice_id: Option<&str>,
        payment: Payment,
    ) -> Result<PaymentReceipt, LedgerError> {
        let mut customer = self
            .customers
            .get(customer_id)
            .ok_or_else(|| LedgerError::UnknownCustomer(customer_id.to_string()))?
            .clone();
        self.require_account(payment.receivable)?;
        self.require_account(payment.transfer)?;

        let net = payment.amount.checked_sub(&payment.refund)?;
        if !net.is_positive() {
            return Err(LedgerError::InvalidAmount(net));
        }

        let mut remaining = net;
        let mut updated = Vec::new();
        if let Some(id) = invoice_id {
            let invoice = self
                .invoices
                .get(id)
                .ok_or_else(|| LedgerError::UnknownInvoice(id.to_string()))?;
            if invoice.customer() != customer_id {
                return Err(LedgerError::CustomerMismatch {
                    invoice: id.to_string(),
                    owner: invoice.customer().clone(),
                });
            }
            if !invoice.status().is_posted() {
                return Err(LedgerError::NotPosted(id.to_string()));
            }

            let mut invoice = invoice.clone();
            remaining = remaining.checked_sub(&invoice.apply(remaining)?)?;
            updated.push(invoice);
        }

        if payment.autopay && remaining.is_positive() {
            let mut open: Vec<&Invoice> = self
                .invoices
                .values()
                .filter(|invoice| invoice.customer() == customer_id && Some(invoice.id().as_str()) != invoice_id)
                .filter(|invoice| invoice.status().is_posted() && !invoice.status().is_settled())
                .collect();
            open.sort_by(|a, b| {
                let posted_a = a.posting().as_ref().map(|posting| posting.posted);
                let posted_b = b.posting().as_ref().map(|posting| posting.posted);
                posted_a.cmp(&posted_b).then_with(|| a.id().cmp(b.id()))
            });

            for invoice in open {
                if !remaining.is_positive() {
                    break;
                }
                let mut invoice = invoice.clone();
                remaining = remaining.checked_sub(&invoice.apply(remaining)?)?;
                updated.push(invoice);
            }
        }

        if remaining.is_positive() {
            customer.add_credit(remaining)?;
        }
        let receipt = PaymentReceipt {
            applied: net.checked_sub(&remaining)?,
            credited: remaining,
        };

        let transaction = LedgerTransaction {
            date: payment.date,
            num: payment.num.clone(),
            description: customer.name().clone(),
            currency: customer.currency().clone(),
            splits: vec![
                Split {
                    account: payment.transfer,
                    value: net,
                    memo: payment.memo.clone(),
                },
                Split {
                    account: payment.receivable,
                    value: net.checked_neg()?,
                    memo: payment.memo.clone(),
                },
            ],
        };

        self.record(transaction)?;
        for invoice in updated {
            self.invoices.insert(invoice.id().clone(), invoice);
        }
        self.customers.insert(customer_id.to_string(), customer);

        Ok(receipt)
    }
}
