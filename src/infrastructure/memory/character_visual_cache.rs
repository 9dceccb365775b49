//! In-Memory Character Visual Cache
//!
//! 每个角色的规范外观描述只构建一次；除显式 clear 外只增不删

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{CharacterRecord, CharacterVisualCachePort, VisualCacheStats};

/// 由外貌特征构建规范描述
pub fn build_fragment(character: &CharacterRecord) -> String {
    let p = &character.physical;
    let mut parts: Vec<String> = vec![character.name.trim().to_string()];
    if !p.age.trim().is_empty() {
        parts.push(p.age.trim().to_string());
    }
    if !p.build.trim().is_empty() {
        parts.push(format!("{} build", p.build.trim()));
    }
    for field in [&p.hair, &p.eyes] {
        if !field.trim().is_empty() {
            parts.push(field.trim().to_string());
        }
    }
    if !p.skin.trim().is_empty() {
        parts.push(format!("{} skin", p.skin.trim()));
    }
    if !p.attire.trim().is_empty() {
        parts.push(format!("wearing {}", p.attire.trim()));
    }
    parts.extend(
        p.distinguishing_features
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string),
    );
    parts.retain(|s| !s.is_empty());
    parts.join(", ")
}

/// 内存角色外观缓存
#[derive(Default)]
pub struct InMemoryCharacterVisualCache {
    fragments: DashMap<Uuid, Arc<str>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCharacterVisualCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CharacterVisualCachePort for InMemoryCharacterVisualCache {
    fn fragment_for(&self, character: &CharacterRecord) -> Arc<str> {
        if let Some(fragment) = self.fragments.get(&character.id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return fragment.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fragment = self
            .fragments
            .entry(character.id)
            .or_insert_with(|| Arc::from(build_fragment(character)))
            .clone();
        tracing::debug!(character_id = %character.id, "Character visual fragment built");
        fragment
    }

    fn clear(&self) {
        let removed = self.fragments.len();
        self.fragments.clear();
        tracing::info!(removed = removed, "Character visual cache cleared");
    }

    fn len(&self) -> usize {
        self.fragments.len()
    }

    fn stats(&self) -> VisualCacheStats {
        VisualCacheStats {
            entries: self.fragments.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
