//! In-Memory Story View Cache
//!
//! 故事读模型缓存，同时作为写入后的缓存失效目标
//!
//! 每次失效先递增 epoch 再删除条目；写入在持有分片锁时比较 epoch，
//! 失效的删除只能排在写入之后。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{
    CacheError, CacheInvalidatorPort, InvalidationKey, InvalidationKind, StoryTree,
    StoryViewCachePort,
};

/// 内存故事视图缓存
#[derive(Default)]
pub struct InMemoryStoryViewCache {
    trees: DashMap<Uuid, Arc<StoryTree>>,
    epoch: AtomicU64,
}

impl InMemoryStoryViewCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn tree_contains(tree: &StoryTree, id: Uuid) -> bool {
    tree.parts.iter().any(|p| p.id == id)
        || tree
            .chapters
            .iter()
            .any(|c| c.chapter.id == id || c.scenes.iter().any(|s| s.id == id))
        || tree.characters.iter().any(|c| c.id == id)
        || tree.settings.iter().any(|s| s.id == id)
}

impl StoryViewCachePort for InMemoryStoryViewCache {
    fn get(&self, story_id: Uuid) -> Option<Arc<StoryTree>> {
        self.trees.get(&story_id).map(|t| t.clone())
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn put(&self, story_id: Uuid, tree: Arc<StoryTree>, epoch: u64) -> bool {
        let entry = self.trees.entry(story_id);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        entry.insert(tree);
        true
    }

    fn len(&self) -> usize {
        self.trees.len()
    }
}

#[async_trait]
impl CacheInvalidatorPort for InMemoryStoryViewCache {
    async fn invalidate(&self, key: InvalidationKey) -> Result<(), CacheError> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        match key.kind {
            InvalidationKind::Story => {
                if self.trees.remove(&key.id).is_some() {
                    tracing::debug!(story_id = %key.id, "Story view invalidated");
                }
            }
            InvalidationKind::Artifact => {
                let before = self.trees.len();
                self.trees.retain(|_, tree| !tree_contains(tree, key.id));
                let removed = before.saturating_sub(self.trees.len());
                if removed > 0 {
                    tracing::debug!(artifact_id = %key.id, removed = removed, "Story views invalidated by artifact");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PartRecord, StoryRecord};
    use crate::domain::story::{StoryStatus, StoryStructure, Tone};
    use chrono::Utc;

    fn tree(story_id: Uuid, part_id: Uuid) -> Arc<StoryTree> {
        let now = Utc::now();
        Arc::new(StoryTree {
            story: StoryRecord {
                id: story_id,
                title: "t".into(),
                premise: "p".into(),
                genre: "g".into(),
                tone: Tone::Hopeful,
                status: StoryStatus::Writing,
                structure: StoryStructure::default(),
                created_at: now,
                updated_at: now,
            },
            parts: vec![PartRecord {
                id: part_id,
                story_id,
                ordinal_index: 1,
                title: "p".into(),
                goal: String::new(),
                conflict: String::new(),
                outcome: String::new(),
                summary: String::new(),
                created_at: now,
            }],
            chapters: vec![],
            characters: vec![],
            settings: vec![],
        })
    }

    #[tokio::test]
    async fn test_invalidate_by_story_and_artifact() {
        let cache = InMemoryStoryViewCache::new();
        let (a, b, part) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(cache.put(a, tree(a, Uuid::new_v4()), cache.epoch()));
        assert!(cache.put(b, tree(b, part), cache.epoch()));
        assert_eq!(cache.len(), 2);

        cache.invalidate(InvalidationKey::story(a)).await.unwrap();
        assert!(cache.get(a).is_none());

        cache.invalidate(InvalidationKey::artifact(part)).await.unwrap();
        assert!(cache.get(b).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_put_after_invalidation_is_rejected() {
        let cache = InMemoryStoryViewCache::new();
        let story = Uuid::new_v4();
        let seen = cache.epoch();

        // 加载期间有写入触发了失效
        cache.invalidate(InvalidationKey::artifact(Uuid::new_v4())).await.unwrap();
        assert!(!cache.put(story, tree(story, Uuid::new_v4()), seen));
        assert!(cache.get(story).is_none());

        assert!(cache.put(story, tree(story, Uuid::new_v4()), cache.epoch()));
        assert!(cache.get(story).is_some());
    }
}
