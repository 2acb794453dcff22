//! 演示流程：注册、登录、会话管理、安全分析

use anyhow::Result;
use std::fs;

use crate::auth::AuthManager;
use crate::config::Config;
use crate::oracle::build_oracle;

fn banner(title: &str) {
    println!("{}", "=".repeat(70));
    println!("{}", title);
    println!("{}", "=".repeat(70));
}

fn outcome<T, E: std::fmt::Display>(result: &std::result::Result<T, E>) -> String {
    match result {
        Ok(_) => "SUCCESS".to_string(),
        Err(e) => format!("FAILED ({})", e),
    }
}

async fn demo_registration(auth: &mut AuthManager) {
    banner("DEMO 1: 注册与密码校验");

    let cases = [
        ("弱密码", "alice", "123", "alice@example.com"),
        ("中等密码", "bob", "password123", "bob@example.com"),
        ("强密码", "charlie", "MyStr0ng!Pass2024", "charlie@example.com"),
        ("重复用户名", "charlie", "AnotherP@ss123", "charlie2@example.com"),
        ("无效邮箱", "dave", "D4ve!Secure#1", "dave-at-example"),
    ];

    for (label, user, password, email) in cases {
        println!("\n[{}] register({}, {}, {})", label, user, password, email);
        let result = auth.register(user, password, email).await;
        println!("结果：{}", outcome(&result));
        if let Ok(msg) = result {
            println!("消息：{}", msg);
        }
    }
    println!();
}

async fn demo_login(auth: &mut AuthManager) {
    banner("DEMO 2: 登录");

    if let Err(e) = auth.register("testuser", "SecureP@ss123", "test@example.com").await {
        println!("准备用户失败：{}", e);
    }

    let attempts = [
        ("正确密码", "testuser", "SecureP@ss123"),
        ("错误密码", "testuser", "WrongPassword"),
        ("不存在的用户", "nobody", "password"),
    ];

    for (label, user, password) in attempts {
        println!("\n[{}] login({}, ***)", label, user);
        let result = auth.login(user, password);
        println!("结果：{}", outcome(&result));
        if let Ok(login) = result {
            println!("消息：{}", login.message);
            println!("令牌：{}...", &login.token[..20]);
        }
    }
    println!();
}

async fn demo_sessions(auth: &mut AuthManager) {
    banner("DEMO 3: 会话管理");

    if let Err(e) = auth.register("sessionuser", "MyP@ssw0rd!", "session@example.com").await {
        println!("准备用户失败：{}", e);
    }
    let token = match auth.login("sessionuser", "MyP@ssw0rd!") {
        Ok(login) => login.token,
        Err(e) => {
            println!("登录失败，跳过：{}\n", e);
            return;
        }
    };

    println!("\n[校验有效会话] {:?}", auth.verify_session(&token));
    println!("[注销] {}", auth.logout(&token));
    println!("[注销后校验] {:?}", auth.verify_session(&token));
    println!("[重复注销] {}\n", auth.logout(&token));
}

async fn demo_workflow(auth: &mut AuthManager) {
    banner("DEMO 4: 完整流程");

    println!("\n1. 注册");
    match auth.register("workflowuser", "C0mpl3x!Pass", "workflow@example.com").await {
        Ok(msg) => println!("   {}", msg),
        Err(e) => {
            println!("   {}", e);
            return;
        }
    }

    println!("2. 登录");
    let login = match auth.login("workflowuser", "C0mpl3x!Pass") {
        Ok(login) => login,
        Err(e) => {
            println!("   {}", e);
            return;
        }
    };
    println!("   {}", login.message);

    println!("3. 校验会话");
    let Some(username) = auth.verify_session(&login.token) else {
        println!("   会话无效");
        return;
    };
    println!("   有效，用户：{}", username);

    println!("4. 用户信息");
    if let Some(info) = auth.get_user_info(&username) {
        println!("   email: {}", info.email);
        println!("   created_at: {}", info.created_at.to_rfc3339());
        println!(
            "   last_login: {}",
            info.last_login.map(|t| t.to_rfc3339()).unwrap_or_else(|| "null".into())
        );
    }

    println!("5. 安全分析");
    match auth.analyze_security_risk(&username).await {
        Ok(report) => println!("{}", report),
        Err(e) => println!("   {}", e),
    }

    println!("6. 注销：{}\n", auth.logout(&login.token));
}

/// 运行演示，使用独立的演示用户库，每次从空库开始
pub async fn run_demo(config: &Config) -> Result<()> {
    config.ensure_store_dir()?;

    let demo_path = config.store.db_path.with_file_name("demo_users_db.json");
    if demo_path.exists() {
        fs::remove_file(&demo_path)?;
    }

    let mut store_config = config.store.clone();
    store_config.db_path = demo_path.clone();
    let mut auth = AuthManager::open(&store_config, build_oracle(&config.oracle))?;

    println!();
    println!("{}", "*".repeat(70));
    println!("  keyward 演示（校验服务：{:?}）", config.oracle.backend);
    println!("{}", "*".repeat(70));
    println!();

    demo_registration(&mut auth).await;
    demo_login(&mut auth).await;
    demo_sessions(&mut auth).await;
    demo_workflow(&mut auth).await;

    banner("演示完成");
    println!("用户库：{}", demo_path.display());
    println!("密码以 SHA-256 哈希保存。");
    Ok(())
}
