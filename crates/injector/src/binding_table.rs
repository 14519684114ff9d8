use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::metadata::{Dependency, Qualifier, TypeKey};
use crate::type_config::TypeConfiguration;

/// Ключ binding'а: запрошенный тип и необязательный qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub source: TypeKey,
    pub qualifier: Option<Qualifier>,
}

impl BindingKey {
    pub fn new(source: TypeKey, qualifier: Option<Qualifier>) -> Self {
        Self { source, qualifier }
    }
}

/// Таблица bindings: (source type, qualifier) -> конфигурация
///
/// Заполняется binder'ом, после конфигурации только читается.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    bindings: HashMap<BindingKey, Arc<TypeConfiguration>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сохранить конфигурацию; возвращает заменённую запись, если ключ уже был занят
    pub fn insert(&mut self, config: TypeConfiguration) -> Option<Arc<TypeConfiguration>> {
        let key = BindingKey::new(config.source(), config.qualifier());
        let replaced = self.bindings.insert(key, Arc::new(config));

        if replaced.is_some() {
            warn!(
                "Binding for {} {:?} is already registered, overwriting",
                key.source, key.qualifier
            );
        }

        replaced
    }

    /// Конфигурация для зависимости; если binding нет - синтезируется
    /// конфигурация по соглашению (target = запрошенный тип)
    pub fn lookup(&self, dependency: &Dependency) -> Arc<TypeConfiguration> {
        let key = BindingKey::new(dependency.key(), dependency.qualifier());

        match self.bindings.get(&key) {
            Some(config) => Arc::clone(config),
            None => Arc::new(TypeConfiguration::by_convention(dependency)),
        }
    }

    pub fn get(&self, source: TypeKey, qualifier: Option<Qualifier>) -> Option<&TypeConfiguration> {
        self.bindings
            .get(&BindingKey::new(source, qualifier))
            .map(|config| config.as_ref())
    }

    /// Все ли типы присутствуют как source type (qualifier не учитывается).
    /// Пустой список разрешим всегда.
    pub fn all_resolvable(&self, types: &[TypeKey]) -> bool {
        types
            .iter()
            .all(|ty| self.bindings.keys().any(|key| key.source == *ty))
    }

    pub fn contains(&self, source: TypeKey, qualifier: Option<Qualifier>) -> bool {
        self.bindings.contains_key(&BindingKey::new(source, qualifier))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
