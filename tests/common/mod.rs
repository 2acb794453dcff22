//! 集成测试公共工具

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tempfile::TempDir;

use keyward::auth::{AuthManager, UserStore};
use keyward::oracle::Check;
use keyward::{AuthError, Result, TextOracle, Verdict};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("keyward=debug")
            .with_test_writer()
            .try_init();
    });
}

/// 按脚本回答的校验服务
pub struct ScriptedOracle {
    weak_passwords: Vec<String>,
    offline: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOracle {
    pub fn new(weak_passwords: &[&str]) -> Self {
        ScriptedOracle {
            weak_passwords: weak_passwords.iter().map(|s| s.to_string()).collect(),
            offline: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn offline() -> Self {
        ScriptedOracle {
            offline: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TextOracle for ScriptedOracle {
    async fn judge(&self, check: Check, subject: &str) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(AuthError::oracle("connection refused"));
        }

        match check {
            Check::PasswordStrength if self.weak_passwords.iter().any(|p| p == subject) => {
                Ok(Verdict::reject("Too common and lacks symbols."))
            }
            Check::PasswordStrength => Ok(Verdict::approve("Strong password.")),
            Check::EmailFormat => {
                let valid = subject
                    .split_once('@')
                    .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                    .unwrap_or(false);
                Ok(Verdict {
                    approved: valid,
                    message: String::new(),
                })
            }
        }
    }

    async fn advise(&self, account_summary: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(AuthError::oracle("connection refused"));
        }
        Ok(format!("Enable two-factor authentication.\n{}", account_summary))
    }
}

/// 在临时目录中创建认证管理器，返回的 TempDir 需要在测试期间保持存活
pub fn test_manager(oracle: ScriptedOracle) -> (AuthManager, TempDir) {
    init_logging();
    let dir = TempDir::new().unwrap();
    let store = UserStore::load(dir.path().join("users_db.json")).unwrap();
    let manager = AuthManager::new(store, Duration::hours(24), Box::new(oracle));
    (manager, dir)
}
