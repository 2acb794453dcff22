use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::error::AuthError;
use crate::types::{Message, OllamaRequest, OllamaResponse};

use super::prompts::{self, ADVICE_SYSTEM, SECURITY_ADVICE, VERDICT_SYSTEM};
use super::verdict::{parse_verdict, Verdict};
use super::{Check, TextOracle};

/// 单次退避上限：100ms * 2^6
const MAX_BACKOFF_EXPONENT: usize = 6;

/// 第 `attempt` 次失败后的等待时间，指数增长并封顶
pub fn backoff_delay(attempt: usize) -> Duration {
    let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as u32;
    Duration::from_millis(100u64.saturating_mul(1u64 << exponent))
}

pub struct LlmClient {
    client: Client,
    config: OracleConfig,
}

impl LlmClient {
    pub fn new(config: OracleConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("创建 HTTP 客户端失败，使用默认设置：{}", e);
                Client::new()
            });

        LlmClient { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn chat_with_retry(&self, messages: &[Message], format: Option<&str>) -> Result<Message> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            match self.chat(messages, format).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        warn!(
                            "LLM 调用失败 (尝试 {}/{})，正在重试：{}",
                            attempt, self.config.max_retries, e
                        );
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(anyhow::anyhow!(
            "LLM 调用在 {} 次尝试后仍然失败：{:?}",
            self.config.max_retries,
            last_error
        ))
    }

    async fn chat(&self, messages: &[Message], format: Option<&str>) -> Result<Message> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            format: format.map(str::to_string),
            stream: false,
        };

        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("调用 Ollama API 失败")?;

        let status = response.status();
        let text = response.text().await.context("读取响应失败")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("Ollama API 错误：{} - {}", status, text));
        }

        let ollama_response: OllamaResponse = serde_json::from_str(&text)
            .with_context(|| format!("解析 Ollama 响应失败，原始内容：{}", text))?;

        if let Some(err) = ollama_response.error {
            return Err(anyhow::anyhow!("Ollama 错误：{}", err));
        }

        Ok(ollama_response.message)
    }
}

/// 基于 Ollama 的校验服务
pub struct OllamaOracle {
    llm: LlmClient,
}

impl OllamaOracle {
    pub fn new(config: OracleConfig) -> Self {
        OllamaOracle {
            llm: LlmClient::new(config),
        }
    }

    async fn ask(&self, system: &str, prompt: &str, format: Option<&str>) -> crate::error::Result<String> {
        let messages = [Message::system(system), Message::user(prompt)];
        let reply = self
            .llm
            .chat_with_retry(&messages, format)
            .await
            .map_err(|e| AuthError::oracle(format!("{:#}", e)))?;

        debug!(model = self.llm.model(), "oracle reply: {}", reply.content);
        Ok(reply.content)
    }
}

#[async_trait]
impl TextOracle for OllamaOracle {
    async fn judge(&self, check: Check, subject: &str) -> crate::error::Result<Verdict> {
        let reply = self
            .ask(VERDICT_SYSTEM, &prompts::compose(check.instruction(), subject), Some("json"))
            .await?;
        parse_verdict(&reply)
    }

    async fn advise(&self, account_summary: &str) -> crate::error::Result<String> {
        let reply = self
            .ask(ADVICE_SYSTEM, &prompts::compose(SECURITY_ADVICE, account_summary), None)
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AuthError::oracle("模型返回了空内容"));
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleBackend;

    #[tokio::test]
    async fn test_unreachable_server_is_oracle_error() {
        let config = OracleConfig {
            backend: OracleBackend::Ollama,
            model: "test".to_string(),
            // 保留端口，不会有服务监听
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            timeout_secs: 2,
        };
        let oracle = OllamaOracle::new(config);
        let err = oracle
            .judge(Check::EmailFormat, "bob@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OracleUnavailable(_)));
    }

    #[test]
    fn test_backoff_grows_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
        assert_eq!(backoff_delay(6), Duration::from_millis(6400));
        // 超大重试次数不会溢出，也不会无限增长
        assert_eq!(backoff_delay(70), Duration::from_millis(6400));
        assert_eq!(backoff_delay(usize::MAX), Duration::from_millis(6400));
    }
}
