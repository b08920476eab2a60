//! Escalation detection
//!
//! High-risk messages short-circuit the router: the sender's priority is
//! raised and a support notification goes out before the acknowledgment
//! reply. Detection is substring containment over a fixed vocabulary.

pub const ESCALATION_TERMS: &[&str] = &[
    "fraud",
    "stolen",
    "hacked",
    "missed emi",
    "overdue emi",
    "blocked",
    "urgent",
    "high priority",
    "transaction failed",
    "transaction dispute",
    "unauthorized",
];

pub const ESCALATION_ACK: &str =
    "🚨 Your issue has been marked as high priority. Our support team will reach out to you shortly.";

/// True when the normalized message contains any escalation term.
pub fn is_escalation(normalized: &str) -> bool {
    ESCALATION_TERMS.iter().any(|term| normalized.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_terms_anywhere_in_message() {
        assert!(is_escalation("my card was stolen yesterday"));
        assert!(is_escalation("i think there is fraud on my account"));
        assert!(is_escalation("account hacked, help"));
        assert!(is_escalation("this is urgent"));
        assert!(is_escalation("i missed emi payment last month"));
    }

    #[test]
    fn test_ignores_benign_messages() {
        assert!(!is_escalation("what is my balance"));
        assert!(!is_escalation("tell me about mutual funds"));
    }
}
