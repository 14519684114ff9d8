//! Движок разрешения зависимостей
//!
//! Запрос (тип + qualifier) -> binding из таблицы -> выбор конструктора ->
//! рекурсивное разрешение параметров -> кэш жизненного цикла ->
//! post-initializer -> представление как запрошенный тип.
//!
//! Все кэши принадлежат одному `Injector`; несколько контейнеров полностью
//! независимы. Методы разрешения берут `&mut self`, поэтому повторный вход в
//! `get_instance` из фабрики или post-initializer'а невозможен, а совместное
//! использование из нескольких потоков требует внешней синхронизации.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use common::OperationTimer;

use crate::binder::{Binder, Module};
use crate::binding_table::BindingTable;
use crate::config::ContainerConfig;
use crate::errors::{InjectionError, InjectionResult};
use crate::lifecycle::{CacheKey, LifecycleCaches};
use crate::metadata::{
    Arguments, Constructor, Dependency, Injectable, Instance, Marker, Qualifier, Resolved, TypeKey,
};
use crate::selector;
use crate::type_config::{Lifecycle, TypeConfiguration};

/// Внешний hook, который может вернуть значение для типа до обычного lookup'а
pub type CustomResolver = Box<dyn Fn(&BindingTable, TypeKey) -> Option<Resolved> + Send + Sync>;

/// Статистика контейнера
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InjectorStats {
    pub bindings: usize,
    pub cached_singletons: usize,
    pub requests: u64,
    pub failed_requests: u64,
    pub constructions: u64,
    pub singleton_hits: u64,
    pub singleton_misses: u64,
    pub transient_hits: u64,
    pub transient_creations: u64,
    pub custom_resolver_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: u64,
    failed_requests: u64,
    constructions: u64,
    custom_resolver_hits: u64,
}

pub struct Injector {
    config: ContainerConfig,
    bindings: BindingTable,
    caches: LifecycleCaches,
    /// Только один resolver: регистрация заменяет предыдущий
    custom_resolver: Option<CustomResolver>,
    counters: Counters,
}

impl Injector {
    pub fn new(bindings: BindingTable) -> Self {
        Self::with_config(bindings, ContainerConfig::default())
    }

    pub fn with_config(bindings: BindingTable, config: ContainerConfig) -> Self {
        info!(
            "Injector '{}' created with {} bindings",
            config.name,
            bindings.len()
        );

        Self {
            config,
            bindings,
            caches: LifecycleCaches::new(),
            custom_resolver: None,
            counters: Counters::default(),
        }
    }

    /// Сконфигурировать bindings модулем и создать контейнер
    pub fn from_module<M: Module + ?Sized>(module: &M) -> InjectionResult<Self> {
        Self::from_module_with_config(module, ContainerConfig::default())
    }

    pub fn from_module_with_config<M: Module + ?Sized>(
        module: &M,
        config: ContainerConfig,
    ) -> InjectionResult<Self> {
        config.validate()?;

        let mut binder = Binder::with_limit(config.max_bindings);
        module.configure(&mut binder);
        let bindings = binder.finish()?;

        Ok(Self::with_config(bindings, config))
    }

    /// Экземпляр конкретного типа `T` (без qualifier'а)
    pub fn get_instance<T: Injectable>(&mut self) -> InjectionResult<Arc<T>> {
        self.request::<T>(Dependency::of::<T>())
    }

    /// Экземпляр конкретного типа `T`, выбранный маркером `Q`
    pub fn get_qualified_instance<T: Injectable, Q: Marker>(&mut self) -> InjectionResult<Arc<T>> {
        self.request::<T>(Dependency::of::<T>().qualified(Qualifier::of::<Q>()))
    }

    /// Экземпляр абстрактного типа (trait object); требует binding
    pub fn get_service<S: ?Sized + 'static>(&mut self) -> InjectionResult<Arc<S>> {
        self.request::<S>(Dependency::service::<S>())
    }

    pub fn get_qualified_service<S: ?Sized + 'static, Q: Marker>(
        &mut self,
    ) -> InjectionResult<Arc<S>> {
        self.request::<S>(Dependency::service::<S>().qualified(Qualifier::of::<Q>()))
    }

    /// Зарегистрировать custom resolver; предыдущий, если был, заменяется
    pub fn register_custom_resolver<F>(&mut self, resolver: F)
    where
        F: Fn(&BindingTable, TypeKey) -> Option<Resolved> + Send + Sync + 'static,
    {
        if self.custom_resolver.is_some() {
            warn!("Custom resolver is already registered, replacing it");
        }
        self.custom_resolver = Some(Box::new(resolver));
    }

    /// Удалить custom resolver; возвращает true, если он был зарегистрирован
    pub fn unregister_custom_resolver(&mut self) -> bool {
        self.custom_resolver.take().is_some()
    }

    pub fn has_custom_resolver(&self) -> bool {
        self.custom_resolver.is_some()
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn stats(&self) -> InjectorStats {
        let cache_stats = self.caches.stats();

        InjectorStats {
            bindings: self.bindings.len(),
            cached_singletons: self.caches.singleton_count(),
            requests: self.counters.requests,
            failed_requests: self.counters.failed_requests,
            constructions: self.counters.constructions,
            singleton_hits: cache_stats.singleton_hits,
            singleton_misses: cache_stats.singleton_misses,
            transient_hits: cache_stats.transient_hits,
            transient_creations: cache_stats.transient_creations,
            custom_resolver_hits: self.counters.custom_resolver_hits,
        }
    }

    /// Top-level запрос: сброс transient-кэша, разрешение, представление как `S`
    fn request<S: ?Sized + 'static>(&mut self, dependency: Dependency) -> InjectionResult<Arc<S>> {
        let mut timer = OperationTimer::new("injector_get_instance");
        timer.add_field("type", dependency.key().name());

        self.caches.begin_request();
        self.counters.requests += 1;

        let result = self.resolve(&dependency, 0).and_then(|resolved| {
            let actual = resolved.key();
            resolved
                .downcast::<S>()
                .map_err(|_| InjectionError::mismatch(dependency.key(), actual))
        });

        if let Err(e) = &result {
            self.counters.failed_requests += 1;
            self.caches.clear_in_flight();
            warn!(
                "Failed to resolve {} ({}): {}",
                dependency.key(),
                e.category(),
                e
            );
        }

        timer.finish_with_result(&result);
        result
    }

    fn resolve(&mut self, dependency: &Dependency, depth: usize) -> InjectionResult<Resolved> {
        let requested: CacheKey = (dependency.key(), dependency.qualifier());
        if self.caches.is_in_flight(&requested) {
            return Err(self.circular(requested));
        }

        if let Some(max_depth) = self.config.max_resolution_depth {
            if depth > max_depth {
                return Err(InjectionError::ResolutionTooDeep {
                    type_name: dependency.key().name().to_string(),
                    max_depth,
                });
            }
        }

        if let Some(resolved) = self.try_custom_resolver(dependency.key())? {
            return Ok(resolved);
        }

        let config = self.bindings.lookup(dependency);
        let descriptor = config
            .descriptor()
            .ok_or_else(|| InjectionError::unbound(config.target(), dependency.qualifier()))?;

        // цикл через binding source -> target
        let target: CacheKey = (config.target(), config.qualifier());
        if self.caches.is_in_flight(&target) {
            return Err(self.circular(target));
        }

        let constructor =
            selector::select_constructor(&config, descriptor.constructors(), &self.bindings)?;

        if self.config.debug_logging {
            debug!(
                "Resolving {} -> {} ({:?}, {} parameters, depth {})",
                config.source(),
                config.target(),
                config.lifecycle(),
                constructor.arity(),
                depth
            );
        }

        let instance = self.build(&config, &constructor, target, depth)?;

        self.caches
            .record_transient((constructor.produces(), config.qualifier()), &instance);

        config
            .view(instance)
            .ok_or_else(|| InjectionError::mismatch(dependency.key(), constructor.produces()))
    }

    fn try_custom_resolver(&mut self, key: TypeKey) -> InjectionResult<Option<Resolved>> {
        let Some(resolver) = &self.custom_resolver else {
            return Ok(None);
        };

        match resolver(&self.bindings, key) {
            Some(resolved) if resolved.key() == key => {
                self.counters.custom_resolver_hits += 1;
                if self.config.debug_logging {
                    debug!("Custom resolver supplied {}", key);
                }
                Ok(Some(resolved))
            }
            Some(resolved) => Err(InjectionError::mismatch(key, resolved.key())),
            None => Ok(None),
        }
    }

    /// Построить (или взять из кэша) экземпляр target'а. Ключ находится в
    /// in-flight на всё время разрешения параметров и убирается всегда.
    fn build(
        &mut self,
        config: &TypeConfiguration,
        constructor: &Constructor,
        key: CacheKey,
        depth: usize,
    ) -> InjectionResult<Instance> {
        self.caches.enter(key);
        let result = self.build_in_flight(config, constructor, key, depth);
        self.caches.leave(&key);

        let instance = result?;
        config.post_initialize(&instance);
        Ok(instance)
    }

    fn build_in_flight(
        &mut self,
        config: &TypeConfiguration,
        constructor: &Constructor,
        key: CacheKey,
        depth: usize,
    ) -> InjectionResult<Instance> {
        // параметры разрешаются даже если экземпляр уже есть в кэше
        let mut arguments = Vec::with_capacity(constructor.arity());
        for parameter in constructor.parameters() {
            let value = match config.seeds().find(parameter.key()) {
                Some(seed) => seed,
                None => self.resolve(parameter, depth + 1)?,
            };
            arguments.push(value);
        }

        match config.lifecycle() {
            Lifecycle::Transient => {
                if let Some(instance) = self.caches.transient(&key) {
                    return Ok(instance);
                }
                let instance = self.construct(constructor, arguments)?;
                self.caches.note_transient_creation();
                Ok(instance)
            }
            Lifecycle::Singleton => {
                if let Some(instance) = self.caches.singleton(&key) {
                    return Ok(instance);
                }
                let instance = self.construct(constructor, arguments)?;
                Ok(self.caches.store_singleton(key, instance))
            }
        }
    }

    fn construct(
        &mut self,
        constructor: &Constructor,
        arguments: Vec<Resolved>,
    ) -> InjectionResult<Instance> {
        let produces = constructor.produces();

        let instance = constructor
            .invoke(Arguments::new(produces, arguments))
            .map_err(|error| match error.downcast::<InjectionError>() {
                Ok(injection_error) => injection_error,
                Err(other) => InjectionError::ConstructionFailed {
                    type_name: produces.name().to_string(),
                    message: format!("{:#}", other),
                },
            })?;

        self.counters.constructions += 1;
        if self.config.debug_logging {
            debug!("Constructed {}", produces);
        }

        Ok(instance)
    }

    fn circular(&self, key: CacheKey) -> InjectionError {
        let mut chain = self.caches.in_flight_chain();
        chain.push(key.0.name().to_string());
        InjectionError::circular(key.0, key.1, chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use std::marker::PhantomData;

    struct Leaf;
    struct Middle;
    struct Root;
    struct Faulty;

    impl Injectable for Leaf {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|_| Ok(Leaf))]
        }
    }

    impl Injectable for Middle {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|args| {
                args.take::<Leaf>()?;
                Ok(Middle)
            })
            .arg::<Leaf>()
            .marked_default()]
        }
    }

    impl Injectable for Root {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|args| {
                args.take::<Middle>()?;
                Ok(Root)
            })
            .arg::<Middle>()
            .marked_default()]
        }
    }

    /// Слой цепочки: единственный помеченный конструктор требует `T`
    struct Layer<T>(PhantomData<fn() -> T>);

    impl<T: Injectable> Injectable for Layer<T> {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|args| {
                args.take::<T>()?;
                Ok(Layer::<T>(PhantomData))
            })
            .arg::<T>()
            .marked_default()]
        }
    }

    type L2<T> = Layer<Layer<T>>;
    type L4<T> = L2<L2<T>>;
    type L8<T> = L4<L4<T>>;
    type L16<T> = L8<L8<T>>;
    type L32<T> = L16<L16<T>>;
    type L64<T> = L32<L32<T>>;

    /// 72 слоя над `Leaf`
    type DeepChain = L64<L8<Leaf>>;

    impl Injectable for Faulty {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|_| -> anyhow::Result<Faulty> {
                anyhow::bail!("disk is on fire")
            })]
        }
    }

    #[test]
    fn test_stats_count_requests_and_constructions() {
        let mut injector = Injector::new(BindingTable::new());

        injector.get_instance::<Root>().unwrap();
        let stats = injector.stats();

        assert_eq!(stats.requests, 1);
        assert_eq!(stats.failed_requests, 0);
        assert_eq!(stats.constructions, 3);
        assert_eq!(stats.bindings, 0);
    }

    #[test]
    fn test_deep_acyclic_chain_resolves_with_default_config() {
        let mut injector = Injector::new(BindingTable::new());

        assert!(injector.get_instance::<DeepChain>().is_ok());
        assert_eq!(injector.stats().constructions, 73);
        assert_eq!(injector.stats().failed_requests, 0);
    }

    #[test]
    fn test_bounded_config_rejects_deep_chain() {
        let mut injector = Injector::with_config(BindingTable::new(), ContainerConfig::bounded(64));

        assert!(matches!(
            injector.get_instance::<DeepChain>(),
            Err(InjectionError::ResolutionTooDeep { max_depth: 64, .. })
        ));
        assert!(injector.get_instance::<L32<Leaf>>().is_ok());
    }

    #[test]
    fn test_resolution_depth_limit() {
        let config = ConfigBuilder::new().max_resolution_depth(1).build();
        let mut injector = Injector::with_config(BindingTable::new(), config);

        assert!(injector.get_instance::<Middle>().is_ok());
        assert!(matches!(
            injector.get_instance::<Root>(),
            Err(InjectionError::ResolutionTooDeep { max_depth: 1, .. })
        ));
    }

    #[test]
    fn test_factory_error_becomes_construction_failed() {
        let mut injector = Injector::new(BindingTable::new());

        match injector.get_instance::<Faulty>() {
            Err(InjectionError::ConstructionFailed { type_name, message }) => {
                assert!(type_name.ends_with("Faulty"));
                assert!(message.contains("disk is on fire"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(injector.stats().failed_requests, 1);
    }

    #[test]
    fn test_custom_resolver_wrong_type_is_mismatch() {
        let mut injector = Injector::new(BindingTable::new());
        injector.register_custom_resolver(|_, _| Some(Resolved::new(Arc::new(5u8))));

        assert!(matches!(
            injector.get_instance::<Leaf>(),
            Err(InjectionError::InstanceMismatch { .. })
        ));

        assert!(injector.unregister_custom_resolver());
        assert!(!injector.has_custom_resolver());
        assert!(injector.get_instance::<Leaf>().is_ok());
    }

    #[test]
    fn test_debug_logging_does_not_change_results() {
        let mut injector =
            Injector::with_config(BindingTable::new(), ContainerConfig::traced());

        assert!(injector.get_instance::<Root>().is_ok());
        assert_eq!(injector.config().name, "injector-traced");
    }
}
