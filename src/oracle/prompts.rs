//! 固定提示词

/// 要求模型只输出结构化结论
pub const VERDICT_SYSTEM: &str = "You are a strict validator. Reply with a single JSON object \
and nothing else: {\"valid\": true|false, \"message\": \"<one or two sentences>\"}.";

pub const ADVICE_SYSTEM: &str =
    "You are a security analyst. Provide brief security recommendations.";

pub const PASSWORD_STRENGTH: &str = "Analyze the strength of the password below. \
It is strong enough only if it has at least 8 characters and mixes upper case, lower case, \
digits and symbols. Set \"valid\" accordingly and mention any security concerns in \"message\".";

pub const EMAIL_FORMAT: &str = "Is the text below a syntactically valid email address? \
Set \"valid\" accordingly.";

pub const SECURITY_ADVICE: &str =
    "Analyze this user account security and provide 2-3 brief security recommendations.";

/// 拼接指令和待判断内容
pub fn compose(instruction: &str, subject: &str) -> String {
    format!("{}\n\n---\n{}", instruction, subject)
}

/// 账户安全分析的输入
pub fn account_summary(created_at: &str, last_login: Option<&str>) -> String {
    format!(
        "- Created: {}\n- Last login: {}",
        created_at,
        last_login.unwrap_or("Never")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_summary_never() {
        let summary = account_summary("2024-01-01T00:00:00+00:00", None);
        assert!(summary.contains("Last login: Never"));
    }
}
