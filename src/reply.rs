//! Reply rendering
//!
//! Joins handler output fragments into the final reply text. Presentation
//! only; no routing or lookup logic lives here.

/// Join ordered answer fragments with a line break.
pub fn render(fragments: &[String]) -> String {
    fragments.join("\n")
}

/// Group digits in threes for currency display (50000 -> "50,000").
pub fn group_digits(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
