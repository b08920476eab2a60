//! Canned FAQ answers
//!
//! Exact-match lookup over canonical keys. Each question is reachable both
//! by its menu number and by the full question sentence; the menu itself is
//! triggered by "faq"/"faqs"/"faq's".

use lazy_static::lazy_static;
use std::collections::HashMap;

pub const FAQ_MENU: &str = "📋 FAQ Menu\n\
1. What is GenFinBot?\n\
2. How do I check my bank balance?\n\
3. How can I find my account number?\n\
4. How can I check my monthly expenses?\n\
5. How does GenFinBot handle financial advice?\n\
6. Is my data secure?\n\
7. How can I contact support?\n\
\nReply with a question or its number (e.g., 1) to know more.";

lazy_static! {
    static ref FAQ_ANSWERS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();

        let what_is = "🤖 GenFinBot is your AI-powered financial assistant helping you manage bank info, expenses, and investments securely!";
        let balance = "💰 Simply type your bank name + 'balance', e.g., HDFC balance.";
        let number = "🔢 Type your bank name + 'account number'. Example: ICICI account number.";
        let expenses = "📉 Just type 'expenses' to know your recorded monthly expenses.";
        let advice = "🧠 GenFinBot uses AI to provide safe, personalized financial suggestions.";
        let secure = "🔐 Yes! Your data is stored securely with encryption.";
        let support = "📞 Just type your issue with the keyword 'urgent' or 'high priority'!";

        m.insert("1", what_is);
        m.insert("what is genfinbot", what_is);
        m.insert("2", balance);
        m.insert("how do i check my bank balance", balance);
        m.insert("3", number);
        m.insert("how can i find my account number", number);
        m.insert("4", expenses);
        m.insert("how can i check my monthly expenses", expenses);
        m.insert("5", advice);
        m.insert("how does genfinbot handle financial advice", advice);
        m.insert("6", secure);
        m.insert("is my data secure", secure);
        m.insert("7", support);
        m.insert("how can i contact support", support);
        m
    };
}

/// Look up the canned answer for an exact, already-normalized message.
pub fn answer(normalized: &str) -> Option<&'static str> {
    if matches!(normalized, "faq" | "faqs" | "faq's") {
        return Some(FAQ_MENU);
    }
    FAQ_ANSWERS.get(normalized).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_triggers() {
        assert_eq!(answer("faq"), Some(FAQ_MENU));
        assert_eq!(answer("faqs"), Some(FAQ_MENU));
        assert_eq!(answer("faq's"), Some(FAQ_MENU));
    }

    #[test]
    fn test_number_and_sentence_share_answer() {
        assert_eq!(answer("1"), answer("what is genfinbot"));
        assert_eq!(answer("6"), answer("is my data secure"));
        assert!(answer("1").is_some());
    }

    #[test]
    fn test_only_exact_matches() {
        // Substring mentions of FAQ material must not fire the matcher.
        assert_eq!(answer("tell me what is genfinbot please"), None);
        assert_eq!(answer("12"), None);
    }
}
