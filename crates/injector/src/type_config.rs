//! Конфигурация одного binding'а
//!
//! Запись создаётся binder'ом во время конфигурации и после неё не
//! меняется; движок только читает её.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::metadata::{
    no_view, view_as, Dependency, Implements, Instance, Qualifier, Resolved, TypeDescriptor,
    TypeKey, ViewFn,
};

/// Жизненный цикл экземпляра
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Переиспользуется только в пределах одного top-level запроса
    #[default]
    Transient,
    /// Один экземпляр на всё время жизни контейнера
    Singleton,
}

/// Стратегия выбора конструктора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstructorStrategy {
    /// Конструктор, помеченный как default; без пометки - `LongestResolvable`
    #[default]
    MarkedConstructor,
    /// Конструктор с точно совпадающей последовательностью типов параметров
    ArgumentTypeMatch,
    /// Конструктор без параметров
    NoArguments,
    /// Самый длинный конструктор, все параметры которого есть в bindings
    LongestResolvable,
}

impl fmt::Display for ConstructorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstructorStrategy::MarkedConstructor => "marked-constructor",
            ConstructorStrategy::ArgumentTypeMatch => "argument-type-match",
            ConstructorStrategy::NoArguments => "no-arguments",
            ConstructorStrategy::LongestResolvable => "longest-resolvable",
        };
        f.write_str(name)
    }
}

type SeedProvider = Arc<dyn Fn() -> Resolved + Send + Sync>;

/// Заранее вычисленные значения параметров, подставляемые по типу
#[derive(Clone, Default)]
pub struct SeedValues {
    values: Vec<(TypeKey, SeedProvider)>,
}

impl SeedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить значение для параметров типа `T`
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_shared(Arc::new(value))
    }

    /// Добавить разделяемое значение (в том числе trait object) для параметров типа `S`
    pub fn with_shared<S: ?Sized + Send + Sync + 'static>(mut self, value: Arc<S>) -> Self {
        let provider: SeedProvider = Arc::new(move || Resolved::new::<S>(Arc::clone(&value)));
        self.values.push((TypeKey::of::<S>(), provider));
        self
    }

    /// Первое значение, объявленный тип которого совпадает с типом параметра
    pub fn find(&self, key: TypeKey) -> Option<Resolved> {
        self.values
            .iter()
            .find(|(seed_key, _)| *seed_key == key)
            .map(|(_, provider)| provider())
    }

    pub fn types(&self) -> Vec<TypeKey> {
        self.values.iter().map(|(key, _)| *key).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SeedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types()).finish()
    }
}

pub type PostInitializer = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Конфигурация binding'а (source type + qualifier -> target type и политика создания)
#[derive(Clone)]
pub struct TypeConfiguration {
    source: TypeKey,
    target: TypeKey,
    descriptor: Option<TypeDescriptor>,
    view: ViewFn,
    lifecycle: Lifecycle,
    strategy: ConstructorStrategy,
    argument_types: Vec<TypeKey>,
    seeds: SeedValues,
    post_initializer: Option<PostInitializer>,
    qualifier: Option<Qualifier>,
}

impl TypeConfiguration {
    /// Binding `S -> T` со значениями по умолчанию
    pub fn bound<S, T>() -> Self
    where
        S: ?Sized + 'static,
        T: Implements<S>,
    {
        Self {
            source: TypeKey::of::<S>(),
            target: TypeKey::of::<T>(),
            descriptor: Some(TypeDescriptor::of::<T>()),
            view: view_as::<S, T>,
            lifecycle: Lifecycle::default(),
            strategy: ConstructorStrategy::default(),
            argument_types: Vec::new(),
            seeds: SeedValues::default(),
            post_initializer: None,
            qualifier: None,
        }
    }

    /// Конфигурация для незарегистрированного типа: target = запрошенный тип,
    /// transient, marked-constructor, без qualifier'а
    pub fn by_convention(dependency: &Dependency) -> Self {
        let (descriptor, view) = match dependency.descriptor() {
            Some(descriptor) => (Some(descriptor), descriptor.view()),
            None => (None, no_view as ViewFn),
        };

        Self {
            source: dependency.key(),
            target: dependency.key(),
            descriptor,
            view,
            lifecycle: Lifecycle::default(),
            strategy: ConstructorStrategy::default(),
            argument_types: Vec::new(),
            seeds: SeedValues::default(),
            post_initializer: None,
            qualifier: None,
        }
    }

    pub fn source(&self) -> TypeKey {
        self.source
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn descriptor(&self) -> Option<TypeDescriptor> {
        self.descriptor
    }

    /// Можно ли создать target (есть ли дескриптор конструкторов)
    pub fn is_instantiable(&self) -> bool {
        self.descriptor.is_some()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn strategy(&self) -> ConstructorStrategy {
        self.strategy
    }

    pub fn argument_types(&self) -> &[TypeKey] {
        &self.argument_types
    }

    pub fn seeds(&self) -> &SeedValues {
        &self.seeds
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn has_post_initializer(&self) -> bool {
        self.post_initializer.is_some()
    }

    pub(crate) fn view(&self, instance: Instance) -> Option<Resolved> {
        (self.view)(instance)
    }

    pub(crate) fn post_initialize(&self, instance: &Instance) {
        if let Some(initializer) = &self.post_initializer {
            initializer(instance);
        }
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub(crate) fn set_strategy(&mut self, strategy: ConstructorStrategy) {
        self.strategy = strategy;
    }

    pub(crate) fn set_argument_types(&mut self, types: Vec<TypeKey>) {
        self.argument_types = types;
    }

    pub(crate) fn set_seeds(&mut self, seeds: SeedValues) {
        self.seeds = seeds;
    }

    pub(crate) fn set_post_initializer(&mut self, initializer: PostInitializer) {
        self.post_initializer = Some(initializer);
    }

    pub(crate) fn set_qualifier(&mut self, qualifier: Qualifier) {
        self.qualifier = Some(qualifier);
    }
}

impl fmt::Debug for TypeConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConfiguration")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("lifecycle", &self.lifecycle)
            .field("strategy", &self.strategy)
            .field("argument_types", &self.argument_types)
            .field("seeds", &self.seeds)
            .field("post_initializer", &self.post_initializer.is_some())
            .field("qualifier", &self.qualifier)
            .finish()
    }
}
