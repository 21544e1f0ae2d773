//! 启动阶段的依赖重试
//!
//! 只重试服务端类错误（连接失败等）；配置错误立即返回。

use std::future::Future;
use std::time::Duration;

use procure_config::DatabaseConfig;
use procure_errors::AppResult;
use tracing::{info, warn};

/// 重试策略：等待从 `initial_delay` 开始逐次翻倍，不超过 `max_delay`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次），为 0 时按 1 处理
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 数据库连接池的启动重试策略
    pub fn for_database(config: &DatabaseConfig) -> Self {
        Self {
            attempts: config.connect_attempts,
            initial_delay: Duration::from_millis(config.connect_retry_initial_ms),
            max_delay: Duration::from_secs(config.connect_retry_max_secs),
        }
    }

    /// 每次失败后的等待序列，长度为 `attempts - 1`
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.initial_delay.min(max_delay)), move |delay| {
            Some(delay.saturating_mul(2).min(max_delay))
        })
        .take(self.attempts.saturating_sub(1) as usize)
    }
}

/// 按策略执行启动操作
pub async fn retry_startup<F, Fut, T>(
    policy: &RetryPolicy,
    dependency: &'static str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut delays = policy.delays();
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(dependency, attempt, "Dependency available after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_server_error() => {
                warn!(dependency, error = %e, "Dependency misconfigured, not retrying");
                return Err(e);
            }
            Err(e) => e,
        };

        match delays.next() {
            Some(delay) => {
                warn!(
                    dependency,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Dependency unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => {
                warn!(dependency, attempt, error = %error, "Dependency unavailable, giving up");
                return Err(error);
            }
        }
    }
}
