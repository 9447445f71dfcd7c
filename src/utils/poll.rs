//! 有上限的轮询等待
//!
//! 替代固定的 `sleep`：按指数退避反复探测，直到就绪或超时。

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, Instant};

/// 轮询策略
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// 总等待时间上限
    pub timeout: Duration,
    /// 首次轮询间隔
    pub interval: Duration,
    /// 退避后的最大间隔
    pub max_interval: Duration,
    /// 每次退避的倍数
    pub backoff: f64,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            timeout,
            interval,
            max_interval: (interval * 4).min(timeout.max(interval)),
            backoff: 1.5,
        }
    }

    /// 固定间隔，不退避
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            max_interval: interval,
            backoff: 1.0,
            ..Self::new(timeout, interval)
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff.max(1.0)).min(self.max_interval)
    }

    /// 反复调用 `probe` 直到返回 `Some`
    ///
    /// `probe` 返回 `Err` 时立即向上传播；超时返回 `Ok(None)`。
    /// 超时前至少探测一次，最后一次探测发生在截止时间之后。
    pub async fn poll<T, F, Fut>(&self, mut probe: F) -> Result<Option<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut interval = self.interval;
        let mut attempt = 0;

        loop {
            if let Some(value) = probe(attempt).await? {
                return Ok(Some(value));
            }
            attempt += 1;

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(interval.min(deadline - now)).await;
            interval = self.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_returns_when_ready() {
        let policy = PollPolicy::new(Duration::from_secs(1), Duration::from_millis(5));
        let result = policy
            .poll(|attempt| async move { Ok((attempt >= 2).then_some(attempt)) })
            .await
            .unwrap();
        assert_eq!(result, Some(2));
    }

    #[tokio::test]
    async fn test_poll_times_out() {
        let policy = PollPolicy::fixed(Duration::from_millis(30), Duration::from_millis(10));
        let mut calls = 0;
        let result: Option<()> = policy
            .poll(|_| {
                calls += 1;
                async { Ok(None) }
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(calls >= 2);
    }

    #[tokio::test]
    async fn test_poll_propagates_probe_error() {
        let policy = PollPolicy::new(Duration::from_secs(1), Duration::from_millis(5));
        let result: Result<Option<()>> = policy
            .poll(|_| async { anyhow::bail!("页面已关闭") })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::new(Duration::from_secs(10), Duration::from_millis(100));
        let mut interval = policy.interval;
        for _ in 0..20 {
            interval = policy.next_interval(interval);
        }
        assert_eq!(interval, Duration::from_millis(400));
    }
}
