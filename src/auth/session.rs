use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// 会话，只保存在进程内存中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// 会话查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Valid(String),
    Expired,
    NotFound,
}

/// 令牌 -> 会话
///
/// 过期只在查询时惰性检查，没有后台清理。
pub struct SessionTable {
    sessions: HashMap<String, Session>,
    ttl: Duration,
}

impl SessionTable {
    /// `ttl` 必须为正，否则退回 24 小时
    pub fn new(ttl: Duration) -> Self {
        let ttl = if ttl > Duration::zero() {
            ttl
        } else {
            Duration::hours(24)
        };

        SessionTable {
            sessions: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 创建新会话
    pub fn issue(&mut self, username: &str, now: DateTime<Utc>) -> &Session {
        let token = generate_token(username, now);
        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            login_time: now,
            expires_at: now + self.ttl,
        };
        self.sessions.entry(token).or_insert(session)
    }

    /// 查询会话，过期的会话在这里被删除
    pub fn check_at(&mut self, token: &str, now: DateTime<Utc>) -> SessionStatus {
        let expired = match self.sessions.get(token) {
            None => return SessionStatus::NotFound,
            Some(session) => session.is_expired_at(now),
        };

        if expired {
            self.sessions.remove(token);
            return SessionStatus::Expired;
        }

        match self.sessions.get(token) {
            Some(session) => SessionStatus::Valid(session.username.clone()),
            None => SessionStatus::NotFound,
        }
    }

    /// 删除会话，返回是否确实删除了
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// 清理所有已过期会话，返回清理数量
    pub fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        before - self.sessions.len()
    }

    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 由用户名、登录时间和随机数派生的不可逆令牌
fn generate_token(username: &str, now: DateTime<Utc>) -> String {
    let nonce = uuid::Uuid::new_v4();
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(now.to_rfc3339().as_bytes());
    hasher.update(nonce.as_bytes());
    hex::encode(hasher.finalize())
}
