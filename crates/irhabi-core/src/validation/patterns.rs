use std::sync::LazyLock;

use regex::Regex;

pub static ALPHA: LazyLock<Regex> = LazyLock::new(|| compile("^[a-zA-Z]+$"));
pub static ALPHA_NUM: LazyLock<Regex> = LazyLock::new(|| compile("^[a-zA-Z0-9]+$"));
pub static ALPHA_NUM_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9\s]+$"));
pub static ALPHA_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[\pL\s]+$"));
pub static CREDIT_CARD: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|6(?:011|5[0-9][0-9])[0-9]{12}|3[47][0-9]{13}|3(?:0[0-5]|[68][0-9])[0-9]{11}|(?:2131|1800|35\d{3})\d{11})$",
    )
});

/// URL schemes accepted by the `url` rule.
pub const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "tcp", "udp", "ws", "wss"];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}
