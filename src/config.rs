use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use clap::Parser;

use crate::import::ImportOptions;
use crate::record::RecordDefaults;

pub const FALLBACK_CURRENCY: &str = "USD";

/// Creates invoices and payments in a book from a delimited export of sales rows.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Delimited file with a header line.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Book file to post into.
    #[arg(value_name = "BOOK")]
    pub book: PathBuf,

    /// Field delimiter of the input file.
    #[arg(short, long, default_value = "\t")]
    pub delimiter: String,

    /// Currency for rows without one; derived from the locale when unset.
    #[arg(long, env = "AUTOINV_CURRENCY")]
    pub currency: Option<String>,

    /// Income account for rows without one.
    #[arg(long, env = "AUTOINV_INCOME_ACCOUNT", default_value = "Income:Sales")]
    pub income_account: String,

    #[arg(long, env = "AUTOINV_RECEIVABLE_ACCOUNT", default_value = "Assets:Accounts Receivable")]
    pub receivable_account: String,

    /// Account that receives cash payments.
    #[arg(long, env = "AUTOINV_TRANSFER_ACCOUNT", default_value = "Assets:Current Assets:Petty Cash")]
    pub transfer_account: String,

    /// Unit used to describe rows without a description.
    #[arg(long, default_value = "Ltr. Milk")]
    pub item_unit: String,

    /// Directory for the backup copy; defaults to the book's directory.
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    #[arg(long)]
    pub no_backup: bool,

    /// Process the rows without saving the book.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        let delimiter = match self.delimiter.as_str() {
            "\\t" | "tab" => "\t",
            other => other,
        };
        match delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => bail!("delimiter must be a single byte, got {:?}", self.delimiter),
        }
    }

    pub fn default_currency(&self) -> String {
        self.currency
            .clone()
            .or_else(locale_currency)
            .unwrap_or_else(|| FALLBACK_CURRENCY.to_string())
    }

    pub fn import_options(&self, today: NaiveDateTime) -> Result<ImportOptions> {
        Ok(ImportOptions {
            delimiter: self.delimiter_byte()?,
            receivable_account: self.receivable_account.clone(),
            transfer_account: self.transfer_account.clone(),
            defaults: RecordDefaults {
                currency: self.default_currency(),
                income_account: self.income_account.clone(),
                item_unit: self.item_unit.clone(),
                date: today,
            },
        })
    }
}

/// Currency of the process locale, read the way libc orders the variables.
pub fn locale_currency() -> Option<String> {
    ["LC_ALL", "LC_MONETARY", "LANG"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
        .and_then(|locale| currency_for_locale(&locale))
        .map(str::to_string)
}

/// Maps a locale name such as `ne_NP.UTF-8` or `de_DE@euro` to its currency code.
pub fn currency_for_locale(locale: &str) -> Option<&'static str> {
    let name = locale.split(['.', '@']).next()?;
    let (_, territory) = name.split_once('_')?;

    let code = match territory {
        "US" | "EC" | "SV" | "PR" => "USD",
        "GB" => "GBP",
        "NP" => "NPR",
        "IN" => "INR",
        "PK" => "PKR",
        "BD" => "BDT",
        "LK" => "LKR",
        "CN" => "CNY",
        "JP" => "JPY",
        "KR" => "KRW",
        "CA" => "CAD",
        "AU" => "AUD",
        "NZ" => "NZD",
        "CH" | "LI" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "CZ" => "CZK",
        "HU" => "HUF",
        "RU" => "RUB",
        "BR" => "BRL",
        "MX" => "MXN",
        "ZA" => "ZAR",
        "SG" => "SGD",
        "HK" => "HKD",
        "AT" | "BE" | "CY" | "DE" | "EE" | "ES" | "FI" | "FR" | "GR" | "HR" | "IE" | "IT" | "LT" | "LU" | "LV"
        | "MT" | "NL" | "PT" | "SI" | "SK" => "EUR",
        _ => return None,
    };

    Some(code)
}
