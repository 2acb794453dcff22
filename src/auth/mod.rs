pub mod manager;
pub mod record;
pub mod session;
pub mod store;

pub use manager::{AuthManager, LoginOutcome};
pub use record::{hash_password, UserInfo, UserRecord};
pub use session::{Session, SessionStatus, SessionTable};
pub use store::UserStore;
