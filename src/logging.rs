//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 tracing 订阅者
///
/// `RUST_LOG` 优先，未设置时使用 `default_directive`。重复调用不会报错，
/// 返回本次是否真正完成安装。
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
