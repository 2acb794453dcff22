use anyhow::{Context, Result};

use reedline::{DefaultCompleter, DefaultHinter, DefaultPrompt, Reedline, Signal};

use crate::auth::{AuthManager, UserInfo};
use crate::config::Config;
use crate::demo::run_demo;
use crate::error::AuthError;
use crate::logging::init_logging;
use crate::oracle::build_oracle;

/// 打印帮助信息
fn print_help() {
    println!("🔐 keyward - 用户认证系统");
    println!();
    println!("用法：keyward <命令>");
    println!();
    println!("命令:");
    println!("  shell                          进入交互模式");
    println!("  register <用户> <密码> <邮箱>  注册用户");
    println!("  info <用户>                    查看用户信息");
    println!("  users                          列出所有用户");
    println!("  analyze <用户>                 账户安全分析");
    println!("  demo                           运行完整演示");
    println!("  onboard                        初始化配置");
    println!("  help                           显示此帮助信息");
    println!();
    println!("会话只存在于进程内存中，登录/校验/注销请在 shell 中使用。");
}

fn print_shell_help() {
    println!("命令:");
    println!("  /register <用户> <密码> <邮箱>");
    println!("  /login <用户> <密码>");
    println!("  /verify <令牌>");
    println!("  /logout <令牌>");
    println!("  /info <用户>");
    println!("  /users");
    println!("  /analyze <用户>");
    println!("  /quit");
    println!();
}

fn print_user_info(info: &UserInfo) {
    println!("👤 {}", info.username);
    println!("   邮箱：{}", info.email);
    println!("   创建时间：{}", info.created_at.format("%Y-%m-%d %H:%M:%S"));
    match info.last_login {
        Some(t) => println!("   最近登录：{}", t.format("%Y-%m-%d %H:%M:%S")),
        None => println!("   最近登录：从未"),
    }
}

/// 注册失败提示：被校验服务拒绝的用 ⛔，其余错误用 ❌
fn register_failure(e: &AuthError) -> String {
    let icon = if e.is_rejection() { "⛔" } else { "❌" };
    format!("{} {}", icon, e)
}

/// 令牌只显示首尾
fn short_token(token: &str) -> String {
    if token.len() > 30 {
        format!("{}...{}", &token[..20], &token[token.len() - 10..])
    } else {
        token.to_string()
    }
}

fn open_manager(config: &Config) -> Result<AuthManager> {
    config.ensure_store_dir()?;
    let oracle = build_oracle(&config.oracle);
    AuthManager::open(&config.store, oracle).context("打开用户库失败")
}

/// Onboard 命令 - 写入默认配置
fn run_onboard() -> Result<()> {
    println!("🚀 初始化 keyward 配置...\n");

    let config = Config::default();
    config.ensure_store_dir().context("创建用户库目录失败")?;

    let config_path = Config::default_path();
    config.save(&config_path).context("保存配置文件失败")?;

    println!("✅ 保存配置：{}", config_path.display());
    println!("✅ 用户库：{}", config.store.db_path.display());
    println!();
    println!("没有本地 Ollama 时，可把 [oracle] backend 改为 \"rules\"。");
    Ok(())
}

async fn run_register(config: &Config, args: &[String]) -> Result<()> {
    if args.len() < 3 {
        eprintln!("用法：keyward register <用户> <密码> <邮箱>");
        std::process::exit(1);
    }

    let mut manager = open_manager(config)?;
    match manager.register(&args[0], &args[1], &args[2]).await {
        Ok(msg) => println!("✅ {}", msg),
        Err(e) => println!("{}", register_failure(&e)),
    }
    Ok(())
}

fn run_info(config: &Config, args: &[String]) -> Result<()> {
    let Some(username) = args.first() else {
        eprintln!("用法：keyward info <用户>");
        std::process::exit(1);
    };

    let manager = open_manager(config)?;
    match manager.get_user_info(username) {
        Some(info) => print_user_info(&info),
        None => println!("❌ 用户不存在：{}", username),
    }
    Ok(())
}

fn run_users(config: &Config) -> Result<()> {
    let manager = open_manager(config)?;
    let users = manager.usernames();

    if users.is_empty() {
        println!("📭 暂无用户");
        return Ok(());
    }

    println!("📋 用户列表:");
    for name in users {
        println!("  {}", name);
    }
    Ok(())
}

async fn run_analyze(config: &Config, args: &[String]) -> Result<()> {
    let Some(username) = args.first() else {
        eprintln!("用法：keyward analyze <用户>");
        std::process::exit(1);
    };

    let manager = open_manager(config)?;
    match manager.analyze_security_risk(username).await {
        Ok(report) => {
            println!("🛡️ 安全分析：");
            println!("{}", report);
        }
        Err(e) => println!("❌ {}", e),
    }
    Ok(())
}

async fn handle_shell_command(manager: &mut AuthManager, parts: &[&str]) {
    let cmd = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

    match (cmd.as_str(), &parts[1..]) {
        ("/register", [user, password, email]) => {
            match manager.register(user, password, email).await {
                Ok(msg) => println!("✅ {}\n", msg),
                Err(e) => println!("{}\n", register_failure(&e)),
            }
        }
        ("/login", [user, password]) => match manager.login(user, password) {
            Ok(outcome) => {
                println!("✅ {}", outcome.message);
                println!("   令牌：{}", outcome.token);
                println!("   过期时间：{}\n", outcome.expires_at.format("%Y-%m-%d %H:%M:%S"));
            }
            Err(e) => println!("❌ {}\n", e),
        },
        ("/verify", [token]) => match manager.require_session(token) {
            Ok(username) => println!("✅ 会话有效，用户：{}\n", username),
            Err(e) => println!("❌ {}\n", e),
        },
        ("/logout", [token]) => {
            if manager.logout(token) {
                println!("✅ 已注销 {}\n", short_token(token));
            } else {
                println!("ℹ️ 会话不存在\n");
            }
        }
        ("/info", [user]) => match manager.get_user_info(user) {
            Some(info) => {
                print_user_info(&info);
                println!();
            }
            None => println!("❌ 用户不存在：{}\n", user),
        },
        ("/users", []) => {
            let users = manager.usernames();
            if users.is_empty() {
                println!("📭 暂无用户\n");
            } else {
                println!("{}\n", users.join(", "));
            }
        }
        ("/analyze", [user]) => match manager.analyze_security_risk(user).await {
            Ok(report) => println!("🛡️ {}\n", report),
            Err(e) => println!("❌ {}\n", e),
        },
        ("/help" | "/h", _) => print_shell_help(),
        _ => {
            println!("❌ 未知命令或参数错误：{}", parts.join(" "));
            println!("输入 /help 查看帮助\n");
        }
    }
}

/// Shell 命令 - 交互模式
async fn run_shell(config: &Config) -> Result<()> {
    let mut manager = open_manager(config)?;

    println!("🔐 keyward 交互模式");
    println!("📁 用户库：{}", manager.db_path().display());
    println!("🤖 校验服务：{:?} ({})", config.oracle.backend, config.oracle.model);
    println!("输入 /help 查看帮助，/quit 退出\n");

    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(DefaultHinter::default()))
        .with_completer(Box::new(DefaultCompleter::default()));
    let prompt = DefaultPrompt::default();

    loop {
        let sig = line_editor.read_line(&prompt)?;

        match sig {
            Signal::Success(buffer) => {
                let input = buffer.trim();
                if input.is_empty() {
                    continue;
                }

                let parts: Vec<&str> = input.split_whitespace().collect();
                if matches!(parts[0], "/quit" | "/exit" | "quit" | "exit") {
                    println!("👋 再见！");
                    break;
                }

                handle_shell_command(&mut manager, &parts).await;
            }
            Signal::CtrlD => {
                println!("\n👋 再见！");
                break;
            }
            Signal::CtrlC => {
                println!("\n输入 /quit 退出");
            }
        }
    }

    Ok(())
}

/// 主入口函数
pub async fn run_cli() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    let command = args[1].to_lowercase();
    let rest = &args[2..];

    if matches!(command.as_str(), "help" | "-h" | "--help" | "h") {
        print_help();
        return Ok(());
    }
    if command == "onboard" {
        return run_onboard();
    }

    let config = Config::load_default()?;
    init_logging(&config.logging)?;

    match command.as_str() {
        "shell" | "s" => run_shell(&config).await,
        "register" => run_register(&config, rest).await,
        "info" => run_info(&config, rest),
        "users" => run_users(&config),
        "analyze" => run_analyze(&config, rest).await,
        "demo" => run_demo(&config).await,
        _ => {
            eprintln!("❌ 未知命令：{}", command);
            eprintln!();
            eprintln!("运行 'keyward help' 查看帮助信息");
            std::process::exit(1);
        }
    }
}
