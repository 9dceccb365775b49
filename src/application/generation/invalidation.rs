//! 写入后的缓存失效（后台执行，带退避重试）

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::application::ports::{CacheInvalidatorPort, InvalidationKey};

/// 失效重试策略
#[derive(Debug, Clone, Copy)]
pub struct InvalidationPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for InvalidationPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// 在后台依次失效给定的键
///
/// 调用方不等待结果；重试耗尽后只记录错误
pub fn spawn_invalidation(
    invalidator: Arc<dyn CacheInvalidatorPort>,
    keys: Vec<InvalidationKey>,
    policy: InvalidationPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for key in keys {
            let mut attempt = 0u32;
            loop {
                match invalidator.invalidate(key).await {
                    Ok(()) => break,
                    Err(e) if attempt < policy.retries => {
                        let delay = policy.backoff * 2u32.saturating_pow(attempt);
                        attempt += 1;
                        tracing::warn!(
                            kind = ?key.kind,
                            id = %key.id,
                            attempt = attempt,
                            error = %e,
                            "Cache invalidation failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        tracing::error!(
                            kind = ?key.kind,
                            id = %key.id,
                            error = %e,
                            "Cache invalidation gave up"
                        );
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CacheError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    /// 前 N 次失败的失效器
    struct FlakyInvalidator {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CacheInvalidatorPort for FlakyInvalidator {
        async fn invalidate(&self, _key: InvalidationKey) -> Result<(), CacheError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(CacheError::Unavailable("down".into()))
            } else {
                Ok(())
            }
        }
    }

    fn policy(retries: u32) -> InvalidationPolicy {
        InvalidationPolicy {
            retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let invalidator = Arc::new(FlakyInvalidator {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        spawn_invalidation(invalidator.clone(), vec![InvalidationKey::story(Uuid::nil())], policy(3))
            .await
            .unwrap();
        assert_eq!(invalidator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let invalidator = Arc::new(FlakyInvalidator {
            failures: 100,
            calls: AtomicU32::new(0),
        });
        spawn_invalidation(invalidator.clone(), vec![InvalidationKey::artifact(Uuid::nil())], policy(2))
            .await
            .unwrap();
        assert_eq!(invalidator.calls.load(Ordering::SeqCst), 3);
    }
}
