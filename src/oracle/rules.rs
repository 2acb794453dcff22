use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

use super::verdict::Verdict;
use super::{Check, TextOracle};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap()
});

const MIN_PASSWORD_LEN: usize = 8;

/// 本地规则校验，离线可用，结果确定
#[derive(Debug, Default, Clone)]
pub struct RuleOracle;

impl RuleOracle {
    pub fn new() -> Self {
        RuleOracle
    }

    fn check_password(password: &str) -> Verdict {
        let mut missing = Vec::new();
        if password.chars().count() < MIN_PASSWORD_LEN {
            missing.push(format!("at least {} characters", MIN_PASSWORD_LEN));
        }
        if !password.chars().any(|c| c.is_uppercase()) {
            missing.push("an upper case letter".to_string());
        }
        if !password.chars().any(|c| c.is_lowercase()) {
            missing.push("a lower case letter".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a digit".to_string());
        }
        if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
            missing.push("a symbol".to_string());
        }

        if missing.is_empty() {
            Verdict::approve("Password meets the length and character-class requirements.")
        } else {
            Verdict::reject(format!("Password needs {}.", missing.join(", ")))
        }
    }

    fn check_email(email: &str) -> Verdict {
        if EMAIL_REGEX.is_match(email.trim()) {
            Verdict::approve("Email format is valid.")
        } else {
            Verdict::reject("Email format is invalid.")
        }
    }
}

#[async_trait]
impl TextOracle for RuleOracle {
    async fn judge(&self, check: Check, subject: &str) -> Result<Verdict> {
        Ok(match check {
            Check::PasswordStrength => Self::check_password(subject),
            Check::EmailFormat => Self::check_email(subject),
        })
    }

    async fn advise(&self, account_summary: &str) -> Result<String> {
        let mut tips = vec![
            "1. Rotate the password periodically and never reuse it on other sites.",
            "2. Enable a second factor when one becomes available.",
        ];
        if account_summary.contains("Last login: Never") {
            tips.push("3. The account has never been used; disable it if it is not needed.");
        } else {
            tips.push("3. Review recent login times for activity you do not recognise.");
        }
        Ok(tips.join("\n"))
    }
}
