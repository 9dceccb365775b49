//! 序号计算 + 持久化的进程内串行锁

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::story::GenerationLevel;

/// 锁键：(故事, 排序范围, 层级)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub story_id: Uuid,
    pub scope_id: Uuid,
    pub level: GenerationLevel,
}

/// 每个排序范围一把异步互斥锁，最后一个持有者释放后移除
#[derive(Default)]
pub struct ScopeLocks {
    locks: DashMap<ScopeKey, Arc<Mutex<()>>>,
}

/// 范围锁 guard；drop 时释放互斥锁并清理空闲条目
pub struct ScopeGuard<'a> {
    locks: &'a ScopeLocks,
    key: ScopeKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // 只剩表内引用时没有等待者；remove_if 持有分片锁，与 acquire 互斥
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取锁；guard 释放前同一范围的其他生成会等待
    pub async fn acquire(&self, key: ScopeKey) -> ScopeGuard<'_> {
        // 先克隆出 Arc，避免持有 DashMap 分片锁跨 await
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ScopeGuard {
            locks: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_scope_is_serialized() {
        let locks = Arc::new(ScopeLocks::new());
        let key = ScopeKey {
            story_id: Uuid::nil(),
            scope_id: Uuid::nil(),
            level: GenerationLevel::Chapter,
        };

        let guard = locks.acquire(key).await;
        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire(key).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_block() {
        let locks = ScopeLocks::new();
        let a = ScopeKey {
            story_id: Uuid::nil(),
            scope_id: Uuid::nil(),
            level: GenerationLevel::Character,
        };
        let b = ScopeKey {
            level: GenerationLevel::Setting,
            ..a
        };
        let _ga = locks.acquire(a).await;
        let _gb = locks.acquire(b).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_scopes_are_evicted() {
        let locks = Arc::new(ScopeLocks::new());
        let key = ScopeKey {
            story_id: Uuid::new_v4(),
            scope_id: Uuid::new_v4(),
            level: GenerationLevel::SceneSummary,
        };

        let guard = locks.acquire(key).await;
        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire(key).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // 有等待者时条目保留
        drop(guard);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);

        let again = locks.acquire(key).await;
        assert_eq!(locks.len(), 1);
        drop(again);
        assert_eq!(locks.len(), 0);
    }
}
