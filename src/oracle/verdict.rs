use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AuthError, Result};

/// 从第一个 `{` 到最后一个 `}`，兼容代码块和前后多余文字
static JSON_OBJECT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// 校验结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub approved: bool,
    pub message: String,
}

impl Verdict {
    pub fn approve(message: impl Into<String>) -> Self {
        Verdict {
            approved: true,
            message: message.into(),
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Verdict {
            approved: false,
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    valid: bool,
    #[serde(default)]
    message: String,
}

/// 解析模型返回的结构化结论
///
/// 只接受 `{"valid": bool, "message": string}`。解析失败返回
/// `OracleUnavailable`，调用方据此拒绝，绝不默认通过。
pub fn parse_verdict(text: &str) -> Result<Verdict> {
    let object = JSON_OBJECT_REGEX
        .find(text)
        .ok_or_else(|| AuthError::oracle(format!("响应中没有 JSON 对象：{}", text.trim())))?;

    let raw: RawVerdict = serde_json::from_str(object.as_str())
        .map_err(|e| AuthError::oracle(format!("无法解析校验结论：{}", e)))?;

    Ok(Verdict {
        approved: raw.valid,
        message: raw.message.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let v = parse_verdict(r#"{"valid": true, "message": "Strong password."}"#).unwrap();
        assert!(v.approved);
        assert_eq!(v.message, "Strong password.");
    }

    #[test]
    fn test_fenced_object_with_prose() {
        let text = "Here you go:\n```json\n{\"valid\": false, \"message\": \"Too short\"}\n```\n";
        let v = parse_verdict(text).unwrap();
        assert_eq!(v, Verdict::reject("Too short"));
    }

    #[test]
    fn test_missing_message_is_empty() {
        let v = parse_verdict(r#"{"valid": true}"#).unwrap();
        assert!(v.approved);
        assert!(v.message.is_empty());
    }

    #[test]
    fn test_prose_is_not_a_verdict() {
        // 旧格式的 "VALID: ..." 不再被接受
        let err = parse_verdict("VALID: this password is strong").unwrap_err();
        assert!(matches!(err, AuthError::OracleUnavailable(_)));
    }

    #[test]
    fn test_string_boolean_rejected() {
        assert!(parse_verdict(r#"{"valid": "yes", "message": "ok"}"#).is_err());
    }
}
