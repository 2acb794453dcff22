//! 文本校验服务
//!
//! 注册时密码强度和邮箱格式都交给一个外部"裁判"判断。裁判必须返回结构化的
//! [`Verdict`]，调用方不再从自然语言里猜结论。

pub mod ollama;
pub mod prompts;
pub mod rules;
pub mod verdict;

use async_trait::async_trait;

use crate::config::{OracleBackend, OracleConfig};
use crate::error::Result;

pub use ollama::{LlmClient, OllamaOracle};
pub use rules::RuleOracle;
pub use verdict::{parse_verdict, Verdict};

/// 需要裁判判断的事项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    PasswordStrength,
    EmailFormat,
}

impl Check {
    /// 交给语言模型的指令
    pub fn instruction(self) -> &'static str {
        match self {
            Check::PasswordStrength => prompts::PASSWORD_STRENGTH,
            Check::EmailFormat => prompts::EMAIL_FORMAT,
        }
    }
}

#[async_trait]
pub trait TextOracle: Send + Sync {
    /// 二分类判断：返回是否通过及说明
    async fn judge(&self, check: Check, subject: &str) -> Result<Verdict>;

    /// 根据账户摘要给出安全建议，仅供参考，不参与流程控制
    async fn advise(&self, account_summary: &str) -> Result<String>;
}

/// 按配置创建校验服务
pub fn build_oracle(config: &OracleConfig) -> Box<dyn TextOracle> {
    match config.backend {
        OracleBackend::Ollama => Box::new(OllamaOracle::new(config.clone())),
        OracleBackend::Rules => Box::new(RuleOracle::new()),
    }
}
