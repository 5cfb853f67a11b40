//! Statement importers: a keyed registry of per-bank CSV dialect parsers
//!
//! Each importer turns an uploaded statement into a sequence of
//! [`ImportRecord`]s. Malformed rows fail the whole parse; short rows
//! (separator lines, preamble) are skipped.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ImportRecord;

/// A parser for one statement dialect
pub trait TransactionImporter: Send + Sync {
    /// Registry key, also stored on the import session
    fn key(&self) -> &'static str;

    /// Parse a full statement into raw records, preserving file order
    fn import_transactions(&self, data: &[u8]) -> Result<Vec<ImportRecord>>;
}

/// The known importer dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterKind {
    /// DKB checking account export
    Dkb,
    /// Volksbank export with unsigned amounts and a debit/credit marker
    Volksbank,
    /// Splitbook's own export format, re-imported
    Ledger,
}

impl ImporterKind {
    pub fn all() -> &'static [ImporterKind] {
        &[Self::Dkb, Self::Volksbank, Self::Ledger]
    }

    pub fn importer(&self) -> &'static dyn TransactionImporter {
        match self {
            Self::Dkb => &DkbImporter,
            Self::Volksbank => &VolksbankImporter,
            Self::Ledger => &LedgerImporter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.importer().key()
    }
}

impl std::str::FromStr for ImporterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dkb" => Ok(Self::Dkb),
            "volksbank" => Ok(Self::Volksbank),
            "ledger" => Ok(Self::Ledger),
            _ => Err(Error::UnknownImporter(s.to_string())),
        }
    }
}

impl std::fmt::Display for ImporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DKB checking account CSV
///
/// Semicolon-separated, quoted, dd.mm.yyyy dates, decimal comma.
/// Columns: Buchungstag;Wertstellung;Buchungstext;Auftraggeber;
/// Verwendungszweck;Kontonummer;BLZ;Betrag (EUR)
pub struct DkbImporter;

impl TransactionImporter for DkbImporter {
    fn key(&self) -> &'static str {
        "dkb"
    }

    fn import_transactions(&self, data: &[u8]) -> Result<Vec<ImportRecord>> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let mut records = Vec::new();

        for result in rdr.records() {
            let record = result?;
            // DKB files carry preamble and balance lines with fewer columns
            if record.len() < 8 {
                continue;
            }

            let book_date = parse_date_de(field(&record, 0, "book date")?)?;
            let transaction_date = parse_date_de(field(&record, 1, "value date")?)?;
            let title = field(&record, 3, "payee")?.trim().to_string();
            let iban = record
                .get(5)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let amount = parse_amount_de(field(&record, 7, "amount")?)?;

            records.push(ImportRecord {
                book_date,
                transaction_date,
                amount,
                title,
                iban,
            });
        }

        debug!("Parsed {} DKB records", records.len());
        Ok(records)
    }
}

/// Volksbank CSV
///
/// Semicolon-separated, dd.mm.yyyy dates. Amounts are unsigned; a
/// trailing S/H column marks debit (Soll) or credit (Haben).
/// Columns: Buchungstag;Valuta;Empfaenger;IBAN;Verwendungszweck;Betrag;S/H
pub struct VolksbankImporter;

impl TransactionImporter for VolksbankImporter {
    fn key(&self) -> &'static str {
        "volksbank"
    }

    fn import_transactions(&self, data: &[u8]) -> Result<Vec<ImportRecord>> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let mut records = Vec::new();

        for result in rdr.records() {
            let record = result?;
            if record.len() < 7 {
                continue;
            }

            let book_date = parse_date_de(field(&record, 0, "book date")?)?;
            let transaction_date = parse_date_de(field(&record, 1, "value date")?)?;
            let title = field(&record, 2, "payee")?.trim().to_string();
            let iban = record
                .get(3)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let magnitude = parse_amount_de(field(&record, 5, "amount")?)?;

            let amount = match field(&record, 6, "debit/credit marker")?.trim() {
                "S" | "s" => -magnitude.abs(),
                "H" | "h" => magnitude.abs(),
                other => {
                    return Err(Error::Import(format!(
                        "Unknown debit/credit marker: {}",
                        other
                    )))
                }
            };

            records.push(ImportRecord {
                book_date,
                transaction_date,
                amount,
                title,
                iban,
            });
        }

        debug!("Parsed {} Volksbank records", records.len());
        Ok(records)
    }
}

/// Splitbook's own export format, read back in
///
/// Columns: account;opposing_account;date;amount;category. The opposing
/// account name becomes the row title; there is no IBAN column.
pub struct LedgerImporter;

impl TransactionImporter for LedgerImporter {
    fn key(&self) -> &'static str {
        "ledger"
    }

    fn import_transactions(&self, data: &[u8]) -> Result<Vec<ImportRecord>> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let mut records = Vec::new();

        for result in rdr.records() {
            let record = result?;
            if record.len() < 4 {
                continue;
            }

            let date = parse_date_iso(field(&record, 2, "date")?)?;
            let title = field(&record, 1, "opposing account")?.trim().to_string();
            // Exports use dot decimals, unlike the bank dialects
            let amount_str = field(&record, 3, "amount")?;
            let amount = amount_str
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Import(format!("Unable to parse amount: {}", amount_str)))?;

            records.push(ImportRecord {
                book_date: date,
                transaction_date: date,
                amount,
                title,
                iban: None,
            });
        }

        debug!("Parsed {} ledger records", records.len());
        Ok(records)
    }
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> Result<&'a str> {
    record
        .get(index)
        .ok_or_else(|| Error::Import(format!("Missing {}", name)))
}

/// Parse dd.mm.yyyy dates, with ISO as a fallback
fn parse_date_de(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    for fmt in ["%d.%m.%Y", "%d.%m.%y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

fn parse_date_iso(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount in either separator convention: `1.234,56` and
/// `-1,234.56` are both accepted. When both separators appear, the
/// rightmost one is the decimal point and the other groups thousands.
fn parse_amount_de(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().replace("EUR", "").replace(['€', ' '], "");

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}
