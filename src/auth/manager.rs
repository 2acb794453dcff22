use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{AuthError, Result};
use crate::oracle::{prompts, Check, TextOracle};

use super::record::{UserInfo, UserRecord};
use super::session::{SessionStatus, SessionTable};
use super::store::UserStore;

/// 登录结果
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// 认证管理器：用户库 + 会话表 + 校验服务
///
/// 所有操作都通过 `&mut self` 顺序执行，不做跨进程加锁。
pub struct AuthManager {
    store: UserStore,
    sessions: SessionTable,
    oracle: Box<dyn TextOracle>,
}

impl AuthManager {
    pub fn new(store: UserStore, session_ttl: Duration, oracle: Box<dyn TextOracle>) -> Self {
        AuthManager {
            store,
            sessions: SessionTable::new(session_ttl),
            oracle,
        }
    }

    /// 按配置打开用户库
    pub fn open(config: &StoreConfig, oracle: Box<dyn TextOracle>) -> Result<Self> {
        let store = UserStore::load(config.db_path.clone())?;
        let ttl = Duration::hours(i64::from(config.session_ttl_hours));
        Ok(Self::new(store, ttl, oracle))
    }

    pub fn db_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// 注册新用户
    ///
    /// 先查重，再依次让校验服务判断密码强度和邮箱格式，全部通过后写盘。
    pub async fn register(&mut self, username: &str, password: &str, email: &str) -> Result<String> {
        if self.store.contains(username) {
            return Err(AuthError::DuplicateUser(username.to_string()));
        }

        let password_verdict = self
            .oracle
            .judge(Check::PasswordStrength, password)
            .await?;
        if !password_verdict.approved {
            info!(username, "密码强度不足，拒绝注册");
            return Err(AuthError::WeakCredential(password_verdict.message));
        }

        let email_verdict = self.oracle.judge(Check::EmailFormat, email).await?;
        if !email_verdict.approved {
            info!(username, "邮箱格式无效，拒绝注册");
            return Err(AuthError::InvalidEmail);
        }

        self.store.insert(username, UserRecord::new(password, email));
        if let Err(e) = self.store.save() {
            self.store.remove(username);
            return Err(e);
        }

        info!(username, "用户注册成功");
        let feedback = password_verdict.message;
        if feedback.is_empty() {
            Ok(format!("User '{}' registered successfully!", username))
        } else {
            Ok(format!("User '{}' registered successfully! {}", username, feedback))
        }
    }

    /// 登录，成功时签发新令牌
    pub fn login(&mut self, username: &str, password: &str) -> Result<LoginOutcome> {
        let now = Utc::now();

        let record = match self.store.get_mut(username) {
            Some(record) if record.verify_password(password) => record,
            _ => {
                debug!(username, "登录失败");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let previous = record.last_login.replace(now);
        if let Err(e) = self.store.save() {
            if let Some(record) = self.store.get_mut(username) {
                record.last_login = previous;
            }
            return Err(e);
        }

        let session = self.sessions.issue(username, now);
        info!(username, "用户登录");

        Ok(LoginOutcome {
            token: session.token.clone(),
            message: format!("Welcome back, {}!", username),
            expires_at: session.expires_at,
        })
    }

    /// 校验令牌，有效时返回用户名
    pub fn verify_session(&mut self, token: &str) -> Option<String> {
        match self.sessions.check_at(token, Utc::now()) {
            SessionStatus::Valid(username) => Some(username),
            SessionStatus::Expired => {
                debug!("会话已过期并被移除");
                None
            }
            SessionStatus::NotFound => None,
        }
    }

    /// 与 `verify_session` 相同，但给出失败原因
    pub fn require_session(&mut self, token: &str) -> Result<String> {
        match self.sessions.check_at(token, Utc::now()) {
            SessionStatus::Valid(username) => Ok(username),
            SessionStatus::Expired => Err(AuthError::SessionExpired),
            SessionStatus::NotFound => Err(AuthError::SessionNotFound),
        }
    }

    /// 注销，重复调用无副作用
    pub fn logout(&mut self, token: &str) -> bool {
        let removed = self.sessions.revoke(token);
        if removed {
            info!("会话已注销");
        }
        removed
    }

    pub fn get_user_info(&self, username: &str) -> Option<UserInfo> {
        self.store.get(username).map(|record| record.to_info(username))
    }

    /// 所有用户名（有序）
    pub fn usernames(&self) -> Vec<String> {
        self.store.usernames().into_iter().map(str::to_string).collect()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// 主动清理过期会话
    pub fn purge_expired(&mut self) -> usize {
        let purged = self.sessions.purge_expired_at(Utc::now());
        if purged > 0 {
            debug!("清理了 {} 个过期会话", purged);
        }
        purged
    }

    /// 让校验服务给出账户安全建议，仅供参考
    pub async fn analyze_security_risk(&self, username: &str) -> Result<String> {
        let info = self
            .get_user_info(username)
            .ok_or_else(|| AuthError::UserNotFound(username.to_string()))?;

        let created_at = info.created_at.to_rfc3339();
        let last_login = info.last_login.map(|t| t.to_rfc3339());
        let summary = prompts::account_summary(&created_at, last_login.as_deref());

        self.oracle
            .advise(&summary)
            .await
            .map_err(|e| {
                warn!(username, "安全分析失败：{}", e);
                e
            })
    }
}
