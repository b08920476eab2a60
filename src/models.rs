//! Core data models for the assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Open,
    Closed,
}

impl LoanStatus {
    /// Case-insensitive parse; anything other than "open"/"closed" is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Saving,
    Current,
}

impl AccountType {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "saving" | "savings" => Some(Self::Saving),
            "current" => Some(Self::Current),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

//
// ================= User Record =================
//

/// One registered chat participant, keyed by a stable sender identifier
/// (phone number or chat id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub external_id: String,
    pub name: String,
    pub age: u32,
    pub income_monthly: u64,
    pub expenses_monthly: u64,
    pub credit_score: u32,
    pub loan_status: LoanStatus,
    pub investment_interest: String,
    pub priority: Priority,
    pub previous_queries: Vec<String>,
    pub last_ai_response: Option<String>,
    pub bank_accounts: Vec<BankAccount>,
    pub created_at: DateTime<Utc>,
}

/// Invariant: `account_number` holds the masked form only; the raw value is
/// redacted at capture time and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: u64,
}

/// Redact all but the last four characters with `X`. Irreversible; applied
/// exactly once, at capture time.
pub fn mask_account_number(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= 4 {
        return raw.to_string();
    }
    let keep_from = chars.len() - 4;
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < keep_from { 'X' } else { *c })
        .collect()
}

//
// ================= Display =================
//

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Open => "Open",
            LoanStatus::Closed => "Closed",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountType::Saving => "Saving",
            AccountType::Current => "Current",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Normal => "normal",
            Priority::High => "high",
        };
        write!(f, "{}", s)
    }
}
