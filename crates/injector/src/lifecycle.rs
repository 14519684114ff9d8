use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::metadata::{Instance, Qualifier, TypeKey};

/// Ключ кэшей и in-flight стека: (тип, qualifier)
pub type CacheKey = (TypeKey, Option<Qualifier>);

/// Статистика использования кэшей
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub singleton_hits: u64,
    pub singleton_misses: u64,
    pub transient_hits: u64,
    pub transient_creations: u64,
}

/// Кэши жизненного цикла, принадлежащие одному injector'у
///
/// - transient: сбрасывается в начале каждого top-level запроса
/// - singletons: живёт столько же, сколько контейнер, запись не перезаписывается
/// - in-flight: ключи, которые сейчас строятся на стеке вызовов
#[derive(Default)]
pub struct LifecycleCaches {
    transient: HashMap<CacheKey, Instance>,
    singletons: HashMap<CacheKey, Instance>,
    in_flight: Vec<CacheKey>,
    stats: CacheStats,
}

impl LifecycleCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Начать top-level запрос: transient-кэш и in-flight очищаются
    pub fn begin_request(&mut self) {
        self.transient.clear();
        self.in_flight.clear();
    }

    /// Сбросить in-flight после неудачного запроса
    pub fn clear_in_flight(&mut self) {
        self.in_flight.clear();
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn enter(&mut self, key: CacheKey) {
        self.in_flight.push(key);
    }

    /// Убрать ключ из in-flight (последнее вхождение)
    pub fn leave(&mut self, key: &CacheKey) {
        if let Some(position) = self.in_flight.iter().rposition(|k| k == key) {
            self.in_flight.remove(position);
        }
    }

    /// Имена типов на in-flight стеке, от корня к вершине
    pub fn in_flight_chain(&self) -> Vec<String> {
        self.in_flight
            .iter()
            .map(|(key, _)| key.name().to_string())
            .collect()
    }

    pub fn transient(&mut self, key: &CacheKey) -> Option<Instance> {
        let hit = self.transient.get(key).cloned();
        if hit.is_some() {
            self.stats.transient_hits += 1;
        }
        hit
    }

    /// Записать экземпляр в transient-кэш, если ключ ещё свободен
    pub fn record_transient(&mut self, key: CacheKey, instance: &Instance) {
        self.transient.entry(key).or_insert_with(|| instance.clone());
    }

    pub fn note_transient_creation(&mut self) {
        self.stats.transient_creations += 1;
    }

    pub fn singleton(&mut self, key: &CacheKey) -> Option<Instance> {
        match self.singletons.get(key) {
            Some(instance) => {
                self.stats.singleton_hits += 1;
                debug!("Singleton cache hit for {}", key.0);
                Some(instance.clone())
            }
            None => {
                self.stats.singleton_misses += 1;
                None
            }
        }
    }

    /// Сохранить singleton; существующая запись не перезаписывается и возвращается
    pub fn store_singleton(&mut self, key: CacheKey, instance: Instance) -> Instance {
        self.singletons.entry(key).or_insert(instance).clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
