use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// 认证系统错误
///
/// 所有错误都以结果返回给调用方，没有一种会导致进程退出。
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username '{0}' already exists")]
    DuplicateUser(String),

    #[error("Weak password: {0}")]
    WeakCredential(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("User '{0}' not found")]
    UserNotFound(String),

    /// 校验服务调用失败或返回无法解析的内容，一律视为拒绝
    #[error("Validation oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AuthError {
    pub fn oracle(reason: impl Into<String>) -> Self {
        AuthError::OracleUnavailable(reason.into())
    }

    pub fn storage(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AuthError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 注册是否因校验未通过而被拒绝（不合格或校验服务不可用）
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::WeakCredential(_) | AuthError::InvalidEmail | AuthError::OracleUnavailable(_)
        )
    }
}
