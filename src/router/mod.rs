//! Intent router
//!
//! Ordered first-match-wins evaluation over the normalized message text.
//! Matching stays substring-based on purpose: the canned replies depend on
//! this exact precedence, and the Matcher trait is the one seam where a
//! structured classifier could be swapped in without touching handlers.

use crate::escalation;
use crate::faq;
use crate::market;
use crate::models::{BankAccount, UserRecord};
use crate::reply::{group_digits, render};
use tracing::debug;

pub const BANK_KEYWORDS: &[&str] = &["balance", "account number", "account type"];
pub const MARKET_KEYWORDS: &[&str] = &["stock", "share", "price"];

/// Banks the assistant knows about. A mention of one that is not among the
/// sender's own accounts gets the "not recognized" reply instead of the
/// disambiguation list.
pub const KNOWN_BANKS: &[&str] = &[
    "hdfc", "icici", "sbi", "axis", "kotak", "pnb", "yes bank", "indusind",
];

//
// ================= Intent =================
//

/// Which bank-account fields the message asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankFields {
    pub number: bool,
    pub account_type: bool,
    pub balance: bool,
}

impl BankFields {
    fn from_message(normalized: &str) -> Self {
        Self {
            number: normalized.contains("account number"),
            account_type: normalized.contains("account type"),
            balance: normalized.contains("balance"),
        }
    }

    pub fn any(&self) -> bool {
        self.number || self.account_type || self.balance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    Income,
    Expenses,
    Loan,
    CreditScore,
    Investment,
    Name,
    Age,
}

/// Fixed keyword order; the first hit selects the field.
const PERSONAL_KEYWORDS: &[(&str, PersonalField)] = &[
    ("income", PersonalField::Income),
    ("expenses", PersonalField::Expenses),
    ("loan", PersonalField::Loan),
    ("credit score", PersonalField::CreditScore),
    ("investment", PersonalField::Investment),
    ("name", PersonalField::Name),
    ("age", PersonalField::Age),
];

impl PersonalField {
    fn from_message(normalized: &str) -> Option<Self> {
        PERSONAL_KEYWORDS
            .iter()
            .find(|(keyword, _)| normalized.contains(keyword))
            .map(|(_, field)| *field)
    }
}

/// The classified purpose of one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Escalation,
    /// Resolved canned answer.
    Faq(&'static str),
    BankAccount(BankFields),
    /// Resolved ticker; None when no table entry matched.
    MarketQuote(Option<&'static str>),
    PersonalField(PersonalField),
    Fallback,
}

//
// ================= Matchers =================
//

/// A single intent matcher. Implementations are evaluated in registration
/// order; the first to return Some wins.
pub trait Matcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, normalized: &str) -> Option<Intent>;
}

struct EscalationMatcher;

impl Matcher for EscalationMatcher {
    fn name(&self) -> &'static str {
        "escalation"
    }

    fn matches(&self, normalized: &str) -> Option<Intent> {
        escalation::is_escalation(normalized).then_some(Intent::Escalation)
    }
}

struct FaqMatcher;

impl Matcher for FaqMatcher {
    fn name(&self) -> &'static str {
        "faq"
    }

    fn matches(&self, normalized: &str) -> Option<Intent> {
        faq::answer(normalized).map(Intent::Faq)
    }
}

struct BankAccountMatcher;

impl Matcher for BankAccountMatcher {
    fn name(&self) -> &'static str {
        "bank_account"
    }

    fn matches(&self, normalized: &str) -> Option<Intent> {
        let fields = BankFields::from_message(normalized);
        fields.any().then_some(Intent::BankAccount(fields))
    }
}

struct MarketQuoteMatcher;

impl Matcher for MarketQuoteMatcher {
    fn name(&self) -> &'static str {
        "market_quote"
    }

    fn matches(&self, normalized: &str) -> Option<Intent> {
        MARKET_KEYWORDS
            .iter()
            .any(|keyword| normalized.contains(keyword))
            .then(|| Intent::MarketQuote(market::resolve_symbol(normalized)))
    }
}

struct PersonalFieldMatcher;

impl Matcher for PersonalFieldMatcher {
    fn name(&self) -> &'static str {
        "personal_field"
    }

    fn matches(&self, normalized: &str) -> Option<Intent> {
        PersonalField::from_message(normalized).map(Intent::PersonalField)
    }
}

//
// ================= Router =================

pub struct IntentRouter {
    matchers: Vec<Box<dyn Matcher>>,
}

impl IntentRouter {
    pub fn new() -> Self {
        Self {
            matchers: vec![
                Box::new(EscalationMatcher),
                Box::new(FaqMatcher),
                Box::new(BankAccountMatcher),
                Box::new(MarketQuoteMatcher),
                Box::new(PersonalFieldMatcher),
            ],
        }
    }

    /// Select exactly one intent for a normalized message.
    pub fn classify(&self, normalized: &str) -> Intent {
        for matcher in &self.matchers {
            if let Some(intent) = matcher.matches(normalized) {
                debug!(matcher = matcher.name(), "Intent matched");
                return intent;
            }
        }
        Intent::Fallback
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Handlers (pure) =================
//

/// Requested-field lines for one account, fixed order: number, type, balance.
fn account_lines(account: &BankAccount, fields: BankFields) -> Vec<String> {
    let mut lines = Vec::new();
    if fields.number {
        lines.push(format!("🔢 Account Number: {}", account.account_number));
    }
    if fields.account_type {
        lines.push(format!("📘 Account Type: {}", account.account_type));
    }
    if fields.balance {
        lines.push(format!("💰 Balance: ₹{}", group_digits(account.balance)));
    }
    lines
}

/// Resolve a bank-account query against the sender's accounts.
pub fn bank_account_reply(user: &UserRecord, fields: BankFields, normalized: &str) -> String {
    let accounts = &user.bank_accounts;

    if accounts.is_empty() {
        return "❗ No bank account data found.".to_string();
    }

    if accounts.len() == 1 {
        return render(&account_lines(&accounts[0], fields));
    }

    if let Some(account) = accounts
        .iter()
        .find(|account| normalized.contains(&account.bank_name.to_lowercase()))
    {
        return render(&account_lines(account, fields));
    }

    if KNOWN_BANKS.iter().any(|bank| normalized.contains(bank)) {
        return "🏦 That bank name doesn't match any of your accounts.".to_string();
    }

    let names = accounts
        .iter()
        .map(|account| account.bank_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "🏦 You have multiple bank accounts: {}.\nPlease specify the bank name to proceed.",
        names
    )
}

/// Single-field reply drawn directly from the record.
pub fn personal_field_reply(user: &UserRecord, field: PersonalField) -> String {
    match field {
        PersonalField::Income => {
            format!("💼 Monthly Income: ₹{}", group_digits(user.income_monthly))
        }
        PersonalField::Expenses => {
            format!("📉 Monthly Expenses: ₹{}", group_digits(user.expenses_monthly))
        }
        PersonalField::Loan => format!("🏦 Loan Status: {}", user.loan_status),
        PersonalField::CreditScore => format!("💳 Credit Score: {}", user.credit_score),
        PersonalField::Investment => {
            if user.investment_interest.trim().is_empty() {
                "📊 Investment Preference: Not Available".to_string()
            } else {
                format!("📊 Investment Preference: {}", user.investment_interest)
            }
        }
        PersonalField::Name => format!("🧑 Name: {}", user.name),
        PersonalField::Age => format!("🎂 Age: {}", user.age),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, LoanStatus, Priority};
    use chrono::Utc;

    fn account(bank_name: &str, balance: u64) -> BankAccount {
        BankAccount {
            bank_name: bank_name.to_string(),
            account_number: "XXXXXXXX9012".to_string(),
            account_type: AccountType::Saving,
            balance,
        }
    }

    fn fixture_user(accounts: Vec<BankAccount>) -> UserRecord {
        UserRecord {
            external_id: "919876543210".to_string(),
            name: "Ravi".to_string(),
            age: 30,
            income_monthly: 45000,
            expenses_monthly: 20000,
            credit_score: 750,
            loan_status: LoanStatus::Open,
            investment_interest: "Mutual Funds".to_string(),
            priority: Priority::Normal,
            previous_queries: vec![],
            last_ai_response: None,
            bank_accounts: accounts,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escalation_outranks_everything() {
        let router = IntentRouter::new();
        // Escalation term plus a bank keyword: escalation wins.
        assert_eq!(
            router.classify("urgent, my balance looks wrong"),
            Intent::Escalation
        );
        // Escalation term plus a market keyword.
        assert_eq!(
            router.classify("stolen card, freeze my stock account"),
            Intent::Escalation
        );
    }

    #[test]
    fn test_faq_exact_match() {
        let router = IntentRouter::new();
        assert!(matches!(router.classify("faq"), Intent::Faq(_)));
        assert!(matches!(
            router.classify("what is genfinbot"),
            Intent::Faq(_)
        ));
        // Non-exact mention falls through to later matchers.
        assert_eq!(
            router.classify("tell me something about genfinbot"),
            Intent::Fallback
        );
    }

    #[test]
    fn test_bank_keywords_select_requested_fields() {
        let router = IntentRouter::new();
        match router.classify("what's my balance") {
            Intent::BankAccount(fields) => {
                assert!(fields.balance);
                assert!(!fields.number);
                assert!(!fields.account_type);
            }
            other => panic!("unexpected intent: {:?}", other),
        }

        match router.classify("hdfc account number and account type and balance") {
            Intent::BankAccount(fields) => {
                assert!(fields.balance && fields.number && fields.account_type);
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn test_bank_outranks_market_on_shared_message() {
        let router = IntentRouter::new();
        assert!(matches!(
            router.classify("balance and apple stock price"),
            Intent::BankAccount(_)
        ));
    }

    #[test]
    fn test_market_quote_resolution() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("apple stock please"),
            Intent::MarketQuote(Some("AAPL"))
        );
        assert_eq!(
            router.classify("share price of unknowncorp"),
            Intent::MarketQuote(None)
        );
    }

    #[test]
    fn test_personal_field_precedence() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("what's my income"),
            Intent::PersonalField(PersonalField::Income)
        );
        // "loan" precedes "credit score" in the fixed keyword order.
        assert_eq!(
            router.classify("does my loan affect my credit score"),
            Intent::PersonalField(PersonalField::Loan)
        );
        assert_eq!(
            router.classify("my credit score"),
            Intent::PersonalField(PersonalField::CreditScore)
        );
    }

    #[test]
    fn test_unmatched_goes_to_fallback() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("should i buy gold"), Intent::Fallback);
    }

    #[test]
    fn test_single_account_balance_only() {
        let user = fixture_user(vec![account("HDFC", 10000)]);
        let fields = BankFields {
            number: false,
            account_type: false,
            balance: true,
        };
        let reply = bank_account_reply(&user, fields, "what's my balance");
        assert_eq!(reply, "💰 Balance: ₹10,000");
    }

    #[test]
    fn test_single_account_field_order() {
        let user = fixture_user(vec![account("HDFC", 10000)]);
        let fields = BankFields {
            number: true,
            account_type: true,
            balance: true,
        };
        let reply = bank_account_reply(&user, fields, "account number account type balance");
        assert_eq!(
            reply,
            "🔢 Account Number: XXXXXXXX9012\n📘 Account Type: Saving\n💰 Balance: ₹10,000"
        );
    }

    #[test]
    fn test_no_accounts() {
        let user = fixture_user(vec![]);
        let fields = BankFields {
            number: false,
            account_type: false,
            balance: true,
        };
        assert_eq!(
            bank_account_reply(&user, fields, "balance"),
            "❗ No bank account data found."
        );
    }

    #[test]
    fn test_multiple_accounts_bank_name_selects() {
        let user = fixture_user(vec![account("HDFC", 10000), account("ICICI", 2500)]);
        let fields = BankFields {
            number: false,
            account_type: false,
            balance: true,
        };
        let reply = bank_account_reply(&user, fields, "icici balance");
        assert_eq!(reply, "💰 Balance: ₹2,500");
    }

    #[test]
    fn test_multiple_accounts_unrecognized_bank() {
        let user = fixture_user(vec![account("HDFC", 10000), account("ICICI", 2500)]);
        let fields = BankFields {
            number: false,
            account_type: false,
            balance: true,
        };
        // "sbi" is a known bank but not one of the sender's accounts.
        let reply = bank_account_reply(&user, fields, "sbi balance");
        assert_eq!(reply, "🏦 That bank name doesn't match any of your accounts.");
    }

    #[test]
    fn test_multiple_accounts_asks_to_disambiguate() {
        let user = fixture_user(vec![account("HDFC", 10000), account("ICICI", 2500)]);
        let fields = BankFields {
            number: false,
            account_type: false,
            balance: true,
        };
        let reply = bank_account_reply(&user, fields, "what's my balance");
        assert!(reply.contains("HDFC, ICICI"));
        assert!(reply.contains("specify the bank name"));
    }

    #[test]
    fn test_personal_field_replies() {
        let user = fixture_user(vec![]);
        assert_eq!(
            personal_field_reply(&user, PersonalField::Income),
            "💼 Monthly Income: ₹45,000"
        );
        assert_eq!(
            personal_field_reply(&user, PersonalField::Loan),
            "🏦 Loan Status: Open"
        );

        let mut blank = fixture_user(vec![]);
        blank.investment_interest = String::new();
        assert_eq!(
            personal_field_reply(&blank, PersonalField::Investment),
            "📊 Investment Preference: Not Available"
        );
    }
}
