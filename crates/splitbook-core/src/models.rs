//! Domain models for splitbook

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A ledger account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    /// Soft matching key for statement rows; not enforced unique
    pub iban: Option<String>,
    pub account_type: AccountType,
}

/// Account classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Owned by the user; both legs personal makes a transfer
    Personal,
    /// External counterparty (merchants, employers, other people)
    Foreign,
    /// Technical account backing opening balances
    System,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Foreign => "foreign",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "personal" => Ok(Self::Personal),
            "foreign" => Ok(Self::Foreign),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction classification based on which legs touch personal accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Both legs on accounts owned by the user
    Transfer,
    /// Money leaving a personal account to a foreign one
    Withdraw,
    /// Money entering a personal account from a foreign one
    Deposit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Withdraw => "withdraw",
            Self::Deposit => "deposit",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transfer" => Ok(Self::Transfer),
            "withdraw" => Ok(Self::Withdraw),
            "deposit" => Ok(Self::Deposit),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction header; the money movement itself lives in its two splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub title: String,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    /// Positive magnitude; sign lives on the splits
    pub amount: f64,
    pub recurrence_id: Option<i64>,
}

/// One debit/credit leg of a transaction
///
/// Exactly two splits belong to each transaction. They sum to zero and
/// reference each other's accounts as opposing accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub id: i64,
    pub transaction_id: i64,
    pub account_id: i64,
    pub opposing_account_id: i64,
    pub title: String,
    /// Signed; negative when money leaves `account_id`
    pub amount: f64,
    pub date: NaiveDate,
    pub category_id: Option<i64>,
}

/// A spending category, projected into the export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A recurring transaction template, selectable at confirmation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recurrence {
    pub id: i64,
    pub title: String,
    pub disabled: bool,
}

/// A raw statement row as produced by an importer parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Date the bank booked the movement
    pub book_date: NaiveDate,
    /// Date the movement actually happened
    pub transaction_date: NaiveDate,
    /// Signed; negative = outflow from the imported account
    pub amount: f64,
    pub title: String,
    /// Counterparty IBAN, when the dialect carries one
    pub iban: Option<String>,
}

/// A stored import session: one uploaded statement under review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: i64,
    /// The personal account the statement belongs to
    pub account_id: i64,
    pub importer: String,
    pub filename: Option<String>,
}

/// One annotated row of an import session
///
/// `position` is the positional contract between review and confirmation:
/// the i-th confirm row applies to the row stored at position i.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub session_id: i64,
    pub position: i64,
    pub book_date: NaiveDate,
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub title: String,
    pub iban: Option<String>,
    /// Opposing account matched by IBAN during review, if any
    pub matched_account_id: Option<i64>,
    /// Pre-checked "ignore" suggestion from duplicate detection
    pub suggested_ignore: bool,
}

/// User-edited fields for one row, positionally aligned with the session rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmRow {
    #[serde(default)]
    pub title: String,
    /// Opposing account name; created as Foreign if unknown
    #[serde(default)]
    pub account: String,
    /// Recurrence selector; values > 0 link a recurrence
    #[serde(default = "default_recurrence")]
    pub recurrence: i64,
    #[serde(default)]
    pub ignore: bool,
}

fn default_recurrence() -> i64 {
    -1
}

/// Why a confirmation row produced no transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Ignore flag was set (user kept or accepted the duplicate suggestion)
    Ignored,
    MissingTitle,
    MissingAccount,
    /// Zero amounts are a deliberate no-op, not an error
    ZeroAmount,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::MissingTitle => "missing_title",
            Self::MissingAccount => "missing_account",
            Self::ZeroAmount => "zero_amount",
        }
    }
}

/// Per-row result of a confirmation pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Created { transaction_id: i64 },
    Skipped { reason: SkipReason },
}
