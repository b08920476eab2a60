//! Registration state machine
//!
//! Turns an unauthenticated sender's successive messages into one validated
//! UserRecord, one field per message. Malformed numeric or enum input
//! re-emits the prompt and stays on the same step. Sessions live in the
//! engine-owned SessionStore and are evicted after an idle TTL.

use crate::models::{
    mask_account_number, AccountType, BankAccount, LoanStatus, Priority, UserRecord,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Sessions idle past this are evicted; the sender starts over.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

pub const REGISTRATION_GREETING: &str =
    "👋 Welcome to GenFinBot! You are not registered yet — let's set you up.";

pub const COMPLETION_MESSAGE: &str = "✅ Registration complete! You can now ask about your \
balance, expenses, loans, investments, or live stock prices.";

//
// ================= Steps =================
//

/// The fixed onboarding order. The bank-account fields repeat once per
/// declared account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Name,
    Age,
    IncomeMonthly,
    ExpensesMonthly,
    CreditScore,
    LoanStatus,
    InvestmentInterest,
    NumAccounts,
    BankName,
    AccountNumber,
    AccountType,
    Balance,
}

impl RegistrationStep {
    pub fn prompt(&self) -> &'static str {
        match self {
            RegistrationStep::Name => "🧑 What's your full name?",
            RegistrationStep::Age => "🎂 How old are you?",
            RegistrationStep::IncomeMonthly => "💼 What is your monthly income (numbers only)?",
            RegistrationStep::ExpensesMonthly => {
                "📉 What are your monthly expenses (numbers only)?"
            }
            RegistrationStep::CreditScore => "💳 What is your credit score?",
            RegistrationStep::LoanStatus => "🏦 Do you have a loan? Reply Open or Closed.",
            RegistrationStep::InvestmentInterest => {
                "📊 What are you interested in investing in?"
            }
            RegistrationStep::NumAccounts => "🔢 How many bank accounts do you have?",
            RegistrationStep::BankName => "🏦 Bank name?",
            RegistrationStep::AccountNumber => "🔢 Account number?",
            RegistrationStep::AccountType => "📘 Account type (Saving or Current)?",
            RegistrationStep::Balance => "💰 Current balance (numbers only)?",
        }
    }
}

/// Result of consuming one inbound message.
#[derive(Debug)]
pub enum StepOutcome {
    /// Prompt for the next field, or a re-prompt after invalid input.
    Prompt(String),
    /// All fields collected; the assembled record is ready to persist.
    Complete(UserRecord),
}

//
// ================= Session =================
//

#[derive(Debug, Clone, Default)]
struct AccountDraft {
    bank_name: Option<String>,
    account_number: Option<String>,
    account_type: Option<AccountType>,
}

/// Transient per-sender onboarding state. Exists only while the sender has
/// no UserRecord; destroyed once the record is assembled.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    pub session_id: Uuid,
    pub external_id: String,
    pub step: RegistrationStep,
    name: Option<String>,
    age: Option<u32>,
    income_monthly: Option<u64>,
    expenses_monthly: Option<u64>,
    credit_score: Option<u32>,
    loan_status: Option<LoanStatus>,
    investment_interest: Option<String>,
    remaining_accounts: u32,
    current_account: AccountDraft,
    accounts: Vec<BankAccount>,
    last_activity: Instant,
}

impl RegistrationSession {
    pub fn new(external_id: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            step: RegistrationStep::Name,
            name: None,
            age: None,
            income_monthly: None,
            expenses_monthly: None,
            credit_score: None,
            loan_status: None,
            investment_interest: None,
            remaining_accounts: 0,
            current_account: AccountDraft::default(),
            accounts: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// Consume one inbound message for the current step.
    pub fn advance(&mut self, text: &str) -> StepOutcome {
        self.last_activity = Instant::now();
        let input = text.trim();

        match self.step {
            RegistrationStep::Name => {
                if input.chars().count() < 2 {
                    return self.reprompt();
                }
                self.name = Some(input.to_string());
                self.goto(RegistrationStep::Age)
            }
            RegistrationStep::Age => match input.parse::<u32>() {
                Ok(age) => {
                    self.age = Some(age);
                    self.goto(RegistrationStep::IncomeMonthly)
                }
                Err(_) => self.reprompt(),
            },
            RegistrationStep::IncomeMonthly => match input.parse::<u64>() {
                Ok(income) => {
                    self.income_monthly = Some(income);
                    self.goto(RegistrationStep::ExpensesMonthly)
                }
                Err(_) => self.reprompt(),
            },
            RegistrationStep::ExpensesMonthly => match input.parse::<u64>() {
                Ok(expenses) => {
                    self.expenses_monthly = Some(expenses);
                    self.goto(RegistrationStep::CreditScore)
                }
                Err(_) => self.reprompt(),
            },
            RegistrationStep::CreditScore => match input.parse::<u32>() {
                Ok(score) => {
                    self.credit_score = Some(score);
                    self.goto(RegistrationStep::LoanStatus)
                }
                Err(_) => self.reprompt(),
            },
            RegistrationStep::LoanStatus => match LoanStatus::parse(input) {
                Some(status) => {
                    self.loan_status = Some(status);
                    self.goto(RegistrationStep::InvestmentInterest)
                }
                None => self.reprompt(),
            },
            RegistrationStep::InvestmentInterest => {
                if input.is_empty() {
                    return self.reprompt();
                }
                self.investment_interest = Some(input.to_string());
                self.goto(RegistrationStep::NumAccounts)
            }
            RegistrationStep::NumAccounts => match input.parse::<u32>() {
                // Zero accounts skips the bank sub-loop entirely.
                Ok(0) => self.complete(),
                Ok(count) => {
                    self.remaining_accounts = count;
                    self.goto(RegistrationStep::BankName)
                }
                Err(_) => self.reprompt(),
            },
            RegistrationStep::BankName => {
                if input.is_empty() {
                    return self.reprompt();
                }
                self.current_account.bank_name = Some(input.to_string());
                self.goto(RegistrationStep::AccountNumber)
            }
            RegistrationStep::AccountNumber => {
                if input.is_empty() {
                    return self.reprompt();
                }
                // Masked before it is stored anywhere; the raw number never
                // leaves this scope.
                self.current_account.account_number = Some(mask_account_number(input));
                self.goto(RegistrationStep::AccountType)
            }
            RegistrationStep::AccountType => match AccountType::parse(input) {
                Some(account_type) => {
                    self.current_account.account_type = Some(account_type);
                    self.goto(RegistrationStep::Balance)
                }
                None => self.reprompt(),
            },
            RegistrationStep::Balance => match input.parse::<u64>() {
                Ok(balance) => {
                    self.close_account(balance);
                    self.remaining_accounts = self.remaining_accounts.saturating_sub(1);
                    if self.remaining_accounts > 0 {
                        self.goto(RegistrationStep::BankName)
                    } else {
                        self.complete()
                    }
                }
                Err(_) => self.reprompt(),
            },
        }
    }

    fn goto(&mut self, step: RegistrationStep) -> StepOutcome {
        self.step = step;
        StepOutcome::Prompt(step.prompt().to_string())
    }

    fn reprompt(&self) -> StepOutcome {
        debug!(
            external_id = %self.external_id,
            step = ?self.step,
            "Invalid registration input, re-prompting"
        );
        StepOutcome::Prompt(self.step.prompt().to_string())
    }

    fn close_account(&mut self, balance: u64) {
        let draft = std::mem::take(&mut self.current_account);
        // Draft fields are filled before Balance is reachable.
        self.accounts.push(BankAccount {
            bank_name: draft.bank_name.unwrap_or_default(),
            account_number: draft.account_number.unwrap_or_default(),
            account_type: draft.account_type.unwrap_or(AccountType::Saving),
            balance,
        });
    }

    fn complete(&mut self) -> StepOutcome {
        // Earlier steps are guaranteed filled before this state is reachable.
        let record = UserRecord {
            external_id: self.external_id.clone(),
            name: self.name.take().unwrap_or_default(),
            age: self.age.unwrap_or_default(),
            income_monthly: self.income_monthly.unwrap_or_default(),
            expenses_monthly: self.expenses_monthly.unwrap_or_default(),
            credit_score: self.credit_score.unwrap_or_default(),
            loan_status: self.loan_status.unwrap_or(LoanStatus::Closed),
            investment_interest: self.investment_interest.take().unwrap_or_default(),
            priority: Priority::Normal,
            previous_queries: Vec::new(),
            last_ai_response: None,
            bank_accounts: std::mem::take(&mut self.accounts),
            created_at: Utc::now(),
        };

        info!(
            external_id = %self.external_id,
            accounts = record.bank_accounts.len(),
            "Registration session finished"
        );

        StepOutcome::Complete(record)
    }
}

//
// ================= Session Store =================
//

/// Engine-owned registration session store, keyed by sender id. Lookups and
/// step transitions hold the write lock, so concurrent messages from
/// different senders never interfere.
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, RegistrationSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a session for an unknown sender and return the greeting plus
    /// the first prompt. The triggering message is not consumed as a field.
    pub async fn start(&self, external_id: &str) -> String {
        let session = RegistrationSession::new(external_id);
        let prompt = session.step.prompt();
        let reply = format!("{}\n{}", REGISTRATION_GREETING, prompt);

        let mut sessions = self.sessions.write().await;
        sessions.insert(external_id.to_string(), session);
        reply
    }

    /// Advance the sender's session with one inbound message. Returns None
    /// when there is no live session (never started, or expired). A
    /// completed session is removed before the record is handed back.
    pub async fn advance(&self, external_id: &str, text: &str) -> Option<StepOutcome> {
        let mut sessions = self.sessions.write().await;

        if let Some(session) = sessions.get(external_id) {
            if session.last_activity.elapsed() >= self.ttl {
                sessions.remove(external_id);
                return None;
            }
        }

        let session = sessions.get_mut(external_id)?;
        let outcome = session.advance(text);
        if matches!(outcome, StepOutcome::Complete(_)) {
            sessions.remove(external_id);
        }
        Some(outcome)
    }

    /// Evict sessions idle past the TTL.
    pub async fn sweep(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.last_activity.elapsed() < self.ttl);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_sequence(session: &mut RegistrationSession, inputs: &[&str]) -> Option<UserRecord> {
        for input in inputs {
            if let StepOutcome::Complete(record) = session.advance(input) {
                return Some(record);
            }
        }
        None
    }

    #[test]
    fn test_full_sequence_builds_record() {
        let mut session = RegistrationSession::new("919876543210");
        let record = run_sequence(
            &mut session,
            &[
                "Ravi", "30", "50000", "20000", "750", "Open", "Mutual Funds", "1", "HDFC",
                "123456789012", "Saving", "10000",
            ],
        )
        .expect("sequence should complete");

        assert_eq!(record.external_id, "919876543210");
        assert_eq!(record.name, "Ravi");
        assert_eq!(record.age, 30);
        assert_eq!(record.income_monthly, 50000);
        assert_eq!(record.expenses_monthly, 20000);
        assert_eq!(record.credit_score, 750);
        assert_eq!(record.loan_status, LoanStatus::Open);
        assert_eq!(record.investment_interest, "Mutual Funds");
        assert_eq!(record.priority, Priority::Normal);
        assert!(record.previous_queries.is_empty());
        assert_eq!(
            record.bank_accounts,
            vec![BankAccount {
                bank_name: "HDFC".to_string(),
                account_number: "XXXXXXXX9012".to_string(),
                account_type: AccountType::Saving,
                balance: 10000,
            }]
        );
    }

    #[test]
    fn test_invalid_numeric_input_stays_on_step() {
        let mut session = RegistrationSession::new("919");
        session.advance("Ravi");
        assert_eq!(session.step, RegistrationStep::Age);

        let outcome = session.advance("thirty");
        assert_eq!(session.step, RegistrationStep::Age);
        assert!(session.age.is_none());
        match outcome {
            StepOutcome::Prompt(prompt) => {
                assert_eq!(prompt, RegistrationStep::Age.prompt())
            }
            StepOutcome::Complete(_) => panic!("must not complete"),
        }

        // Valid input still advances afterwards.
        session.advance("30");
        assert_eq!(session.step, RegistrationStep::IncomeMonthly);
        assert_eq!(session.age, Some(30));
    }

    #[test]
    fn test_loan_status_reprompts_until_valid() {
        let mut session = RegistrationSession::new("919");
        for input in ["Ravi", "30", "50000", "20000", "750"] {
            session.advance(input);
        }
        assert_eq!(session.step, RegistrationStep::LoanStatus);

        session.advance("paid off");
        assert_eq!(session.step, RegistrationStep::LoanStatus);

        session.advance("closed");
        assert_eq!(session.step, RegistrationStep::InvestmentInterest);
        assert_eq!(session.loan_status, Some(LoanStatus::Closed));
    }

    #[test]
    fn test_zero_accounts_skips_bank_loop() {
        let mut session = RegistrationSession::new("919");
        let record = run_sequence(
            &mut session,
            &["Ravi", "30", "50000", "20000", "750", "Open", "Stocks", "0"],
        )
        .expect("sequence should complete");

        assert!(record.bank_accounts.is_empty());
    }

    #[test]
    fn test_multiple_accounts_loop_back() {
        let mut session = RegistrationSession::new("919");
        let record = run_sequence(
            &mut session,
            &[
                "Ravi", "30", "50000", "20000", "750", "Open", "Stocks", "2", "HDFC",
                "123456789012", "Saving", "10000", "ICICI", "555566667777", "Current", "2500",
            ],
        )
        .expect("sequence should complete");

        assert_eq!(record.bank_accounts.len(), 2);
        assert_eq!(record.bank_accounts[0].bank_name, "HDFC");
        assert_eq!(record.bank_accounts[1].bank_name, "ICICI");
        assert_eq!(record.bank_accounts[1].account_number, "XXXXXXXX7777");
        assert_eq!(record.bank_accounts[1].account_type, AccountType::Current);
        assert_eq!(record.bank_accounts[1].balance, 2500);
    }

    #[test]
    fn test_short_name_reprompts() {
        let mut session = RegistrationSession::new("919");
        session.advance("R");
        assert_eq!(session.step, RegistrationStep::Name);
        assert!(session.name.is_none());
    }

    #[tokio::test]
    async fn test_store_start_then_advance() {
        let store = SessionStore::new();
        let greeting = store.start("919").await;
        assert!(greeting.contains(RegistrationStep::Name.prompt()));
        assert_eq!(store.len().await, 1);

        let outcome = store.advance("919", "Ravi").await.expect("session exists");
        match outcome {
            StepOutcome::Prompt(prompt) => assert_eq!(prompt, RegistrationStep::Age.prompt()),
            StepOutcome::Complete(_) => panic!("must not complete"),
        }
    }

    #[tokio::test]
    async fn test_store_removes_session_on_completion() {
        let store = SessionStore::new();
        store.start("919").await;
        for input in ["Ravi", "30", "50000", "20000", "750", "Open", "Stocks"] {
            store.advance("919", input).await.expect("session exists");
        }
        let outcome = store.advance("919", "0").await.expect("session exists");
        assert!(matches!(outcome, StepOutcome::Complete(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_evicted() {
        let store = SessionStore::with_ttl(Duration::from_millis(5));
        store.start("919").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Sweep drops the idle session; advance then reports no session.
        store.sweep().await;
        assert!(store.is_empty().await);
        assert!(store.advance("919", "Ravi").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_sender_has_no_session() {
        let store = SessionStore::new();
        assert!(store.advance("nobody", "hello").await.is_none());
    }
}
