use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// 用户记录（用于持久化），以用户名为键存放在用户库中
///
/// 时间写出为 RFC 3339；读取时也接受不带时区的 ISO-8601，按本地时间解释。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub password_hash: String,
    pub email: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(password: &str, email: &str) -> Self {
        UserRecord {
            password_hash: hash_password(password),
            email: email.to_string(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }

    pub fn to_info(&self, username: &str) -> UserInfo {
        UserInfo {
            username: username.to_string(),
            email: self.email.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// 对外公开的用户信息，不含密码哈希
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// 解析时间戳：优先 RFC 3339，其次不带时区的 `YYYY-MM-DDTHH:MM:SS[.ffffff]`
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let utc = match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // 夏令时跳过的本地时间，只能按 UTC 处理
        None => Utc.from_utc_datetime(&naive),
    };
    Some(utc)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("无法识别的时间格式：{}", text)))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无法识别的时间格式：{}", text))),
        None => Ok(None),
    }
}

/// SHA-256，小写十六进制
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_password() {
        let record = UserRecord::new("MyStr0ng!Pass2024", "charlie@example.com");
        assert!(record.verify_password("MyStr0ng!Pass2024"));
        assert!(!record.verify_password("mystr0ng!pass2024"));
        assert!(record.last_login.is_none());
    }

    #[test]
    fn test_info_has_no_hash() {
        let record = UserRecord::new("secret", "a@example.com");
        let json = serde_json::to_value(record.to_info("a")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "a");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let with_offset = parse_timestamp("2024-01-01T12:00:00+08:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2024-01-01T04:00:00+00:00");

        let naive = parse_timestamp("2024-01-01T12:00:00.123456").unwrap();
        assert_eq!(
            naive.with_timezone(&Local).naive_local().to_string(),
            "2024-01-01 12:00:00.123456"
        );
        assert!(parse_timestamp("2024-01-01T12:00:00").is_some());

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_written_timestamps_are_rfc3339() {
        let record = UserRecord::new("pw", "a@example.com");
        let json = serde_json::to_value(&record).unwrap();
        let created_at = json["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created_at).is_ok());
    }
}
