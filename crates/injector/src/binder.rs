//! Fluent-конфигурация bindings
//!
//! Тонкий фасад над [`TypeConfiguration`]: каждый `bind*` закрывает
//! предыдущую конфигурацию и начинает новую, цепочка методов только
//! заполняет поля записи. Движок видит лишь готовую [`BindingTable`].
//!
//! ```ignore
//! let mut binder = Binder::new();
//! binder.bind_to::<dyn Logger, ConsoleLogger>().with_activation().singleton();
//! binder
//!     .bind::<Report>()
//!     .with_constructor(&[TypeKey::of::<i32>(), TypeKey::of::<String>()])
//!     .with_values(|| SeedValues::new().with(7i32).with("title".to_string()));
//! let table = binder.finish()?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use crate::binding_table::BindingTable;
use crate::config::ContainerConfig;
use crate::errors::{InjectionError, InjectionResult};
use crate::metadata::{Implements, Injectable, Instance, Marker, Qualifier, TypeKey};
use crate::type_config::{ConstructorStrategy, Lifecycle, SeedValues, TypeConfiguration};

/// Набор bindings, описанный одной функцией конфигурации
pub trait Module {
    fn configure(&self, binder: &mut Binder);
}

impl<F> Module for F
where
    F: Fn(&mut Binder),
{
    fn configure(&self, binder: &mut Binder) {
        self(binder)
    }
}

pub struct Binder {
    bindings: BindingTable,
    current: Option<TypeConfiguration>,
    max_bindings: usize,
}

impl Binder {
    pub fn new() -> Self {
        Self::with_limit(ContainerConfig::default().max_bindings)
    }

    pub fn with_limit(max_bindings: usize) -> Self {
        Self {
            bindings: BindingTable::new(),
            current: None,
            max_bindings,
        }
    }

    /// Binding типа на самого себя
    pub fn bind<T: Injectable>(&mut self) -> TypeBinder<'_, T> {
        self.bind_to::<T, T>()
    }

    /// Binding запрошенного типа `S` (обычно trait object) на конкретный `T`
    pub fn bind_to<S, T>(&mut self) -> TypeBinder<'_, T>
    where
        S: ?Sized + 'static,
        T: Implements<S>,
    {
        self.end_bind();

        debug!(
            "Binding {} -> {}",
            std::any::type_name::<S>(),
            std::any::type_name::<T>()
        );

        let config = self.current.insert(TypeConfiguration::bound::<S, T>());
        TypeBinder::new(config)
    }

    /// Закрыть конфигурацию и получить таблицу bindings
    pub fn finish(mut self) -> InjectionResult<BindingTable> {
        self.end_bind();

        if self.bindings.len() > self.max_bindings {
            return Err(InjectionError::TooManyBindings {
                count: self.bindings.len(),
                limit: self.max_bindings,
            });
        }

        Ok(self.bindings)
    }

    /// Количество bindings, включая незакрытый текущий
    pub fn len(&self) -> usize {
        self.bindings.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn end_bind(&mut self) {
        if let Some(config) = self.current.take() {
            self.bindings.insert(config);
        }
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

/// Настройка текущего binding'а с целевым типом `T`
pub struct TypeBinder<'a, T> {
    config: &'a mut TypeConfiguration,
    _target: PhantomData<fn() -> T>,
}

impl<'a, T: Injectable> TypeBinder<'a, T> {
    fn new(config: &'a mut TypeConfiguration) -> Self {
        Self {
            config,
            _target: PhantomData,
        }
    }

    pub fn with_activation(self) -> ActivationBinder<'a, T> {
        ActivationBinder { inner: self }
    }

    /// Конструктор с точно такой последовательностью типов параметров
    pub fn with_constructor(self, argument_types: &[TypeKey]) -> ConstructorBinder<'a, T> {
        self.config
            .set_strategy(ConstructorStrategy::ArgumentTypeMatch);
        self.config.set_argument_types(argument_types.to_vec());
        ConstructorBinder { inner: self }
    }

    pub fn with_no_arguments_constructor(self) -> Self {
        self.config.set_strategy(ConstructorStrategy::NoArguments);
        self
    }

    pub fn with_longest_resolvable_constructor(self) -> Self {
        self.config
            .set_strategy(ConstructorStrategy::LongestResolvable);
        self
    }

    /// Callback, вызываемый на экземпляре перед тем, как он будет отдан
    pub fn initialize_object_with<F>(self, initializer: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.config
            .set_post_initializer(Arc::new(move |instance: &Instance| {
                if let Some(target) = (**instance).downcast_ref::<T>() {
                    initializer(target);
                }
            }));
        self
    }

    /// Binding выбирается только для параметров с маркером `Q`
    pub fn when_argument_has<Q: Marker>(self) -> Self {
        self.config.set_qualifier(Qualifier::of::<Q>());
        self
    }
}

pub struct ActivationBinder<'a, T> {
    inner: TypeBinder<'a, T>,
}

impl<'a, T: Injectable> ActivationBinder<'a, T> {
    /// Один экземпляр на top-level запрос
    pub fn per_request(self) -> TypeBinder<'a, T> {
        self.inner.config.set_lifecycle(Lifecycle::Transient);
        self.inner
    }

    pub fn singleton(self) -> TypeBinder<'a, T> {
        self.inner.config.set_lifecycle(Lifecycle::Singleton);
        self.inner
    }
}

pub struct ConstructorBinder<'a, T> {
    inner: TypeBinder<'a, T>,
}

impl<'a, T: Injectable> ConstructorBinder<'a, T> {
    /// Seed-значения; provider вызывается один раз, сразу
    pub fn with_values<F>(self, provider: F) -> TypeBinder<'a, T>
    where
        F: FnOnce() -> SeedValues,
    {
        self.inner.config.set_seeds(provider());
        self.inner
    }

    pub fn without_values(self) -> TypeBinder<'a, T> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Constructor;

    trait Horn: Send + Sync {}

    struct Klaxon;
    impl Horn for Klaxon {}

    impl Injectable for Klaxon {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::new(|_| Ok(Klaxon))]
        }
    }

    crate::implements!(Klaxon => dyn Horn);

    struct Loud;
    impl Marker for Loud {}

    #[test]
    fn test_bind_finalizes_previous_configuration() {
        let mut binder = Binder::new();
        binder.bind::<Klaxon>().with_activation().singleton();
        assert_eq!(binder.len(), 1);

        binder.bind_to::<dyn Horn, Klaxon>().with_no_arguments_constructor();
        assert_eq!(binder.len(), 2);

        let table = binder.finish().unwrap();
        assert_eq!(table.len(), 2);

        let klaxon = table.get(TypeKey::of::<Klaxon>(), None).unwrap();
        assert_eq!(klaxon.lifecycle(), Lifecycle::Singleton);

        let horn = table.get(TypeKey::of::<dyn Horn>(), None).unwrap();
        assert_eq!(horn.target(), TypeKey::of::<Klaxon>());
        assert_eq!(horn.strategy(), ConstructorStrategy::NoArguments);
    }

    #[test]
    fn test_constructor_binder_records_types_and_seeds() {
        let mut binder = Binder::new();
        let seeds_built = std::cell::Cell::new(0);

        binder
            .bind::<Klaxon>()
            .with_constructor(&[TypeKey::of::<i32>(), TypeKey::of::<String>()])
            .with_values(|| {
                seeds_built.set(seeds_built.get() + 1);
                SeedValues::new().with(3i32)
            })
            .when_argument_has::<Loud>();

        let table = binder.finish().unwrap();
        let config = table
            .get(TypeKey::of::<Klaxon>(), Some(Qualifier::of::<Loud>()))
            .unwrap();

        assert_eq!(config.strategy(), ConstructorStrategy::ArgumentTypeMatch);
        assert_eq!(config.argument_types().len(), 2);
        assert_eq!(config.seeds().len(), 1);
        assert_eq!(seeds_built.get(), 1);
    }

    #[test]
    fn test_too_many_bindings() {
        let mut binder = Binder::with_limit(1);
        binder.bind::<Klaxon>();
        binder.bind_to::<dyn Horn, Klaxon>();

        assert!(matches!(
            binder.finish(),
            Err(InjectionError::TooManyBindings { count: 2, limit: 1 })
        ));
    }

    #[test]
    fn test_closure_module() {
        let module = |binder: &mut Binder| {
            binder
                .bind::<Klaxon>()
                .with_longest_resolvable_constructor()
                .initialize_object_with(|_: &Klaxon| {});
        };

        let mut binder = Binder::new();
        module.configure(&mut binder);
        let table = binder.finish().unwrap();

        let config = table.get(TypeKey::of::<Klaxon>(), None).unwrap();
        assert!(config.has_post_initializer());
        assert_eq!(config.strategy(), ConstructorStrategy::LongestResolvable);
    }
}
