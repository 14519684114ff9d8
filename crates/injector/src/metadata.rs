//! Метаданные типов: замена runtime reflection
//!
//! Контейнеру нужно уметь перечислить конструкторы типа, узнать типы и
//! маркеры их параметров и вызвать выбранный конструктор. Вместо reflection
//! каждый конкретный тип реализует [`Injectable`] и возвращает список
//! [`Constructor`] - это compile-time реестр, который движок читает так же,
//! как читал бы метаданные runtime.
//!
//! Экземпляры хранятся type-erased как [`Instance`] (`Arc<dyn Any>`),
//! а потребителю отдаются через [`Resolved`] - обёртку над `Arc<S>`
//! запрошенного (возможно, trait object) типа.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::errors::{InjectionError, InjectionResult};

/// Type-erased экземпляр конкретного типа, созданный контейнером
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Преобразование конкретного экземпляра в представление запрошенного типа
pub type ViewFn = fn(Instance) -> Option<Resolved>;

type ErasedFactory = Arc<dyn Fn(&mut Arguments) -> anyhow::Result<Instance> + Send + Sync>;

/// Идентификатор типа: `TypeId` для сравнения и имя для диагностики
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Маркерный тип для qualifier'ов (аналог атрибута на параметре)
///
/// ```
/// struct Red;
/// impl injector::Marker for Red {}
/// ```
pub trait Marker: 'static {}

/// Qualifier, выбирающий один из нескольких bindings одного типа
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Qualifier(TypeKey);

impl Qualifier {
    pub fn of<M: Marker>() -> Self {
        Self(TypeKey::of::<M>())
    }

    pub fn key(&self) -> TypeKey {
        self.0
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qualifier({})", self.0.name())
    }
}

/// Конкретный тип, который контейнер умеет создавать
///
/// Порядок конструкторов в векторе - это "порядок объявления"; стратегии
/// выбора разрешают ничьи в пользу более раннего конструктора.
pub trait Injectable: Any + Send + Sync + Sized {
    fn constructors() -> Vec<Constructor>;
}

/// Представление `Arc<Target>` как `Arc<Source>`
///
/// Для `Source == Target` реализовано автоматически; для trait object
/// используйте макрос [`implements!`](crate::implements).
pub trait Implements<S: ?Sized + 'static>: Injectable {
    fn cast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Injectable> Implements<T> for T {
    fn cast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Реализовать [`Implements`] для trait object'ов
///
/// ```ignore
/// implements!(ConsoleLogger => dyn Logger, dyn Sink);
/// ```
#[macro_export]
macro_rules! implements {
    ($target:ty => $($source:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$source> for $target {
                fn cast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$source> {
                    self
                }
            }
        )+
    };
}

pub(crate) fn view_as<S: ?Sized + 'static, T: Implements<S>>(instance: Instance) -> Option<Resolved> {
    instance
        .downcast::<T>()
        .ok()
        .map(|typed| Resolved::new::<S>(typed.cast()))
}

pub(crate) fn no_view(_: Instance) -> Option<Resolved> {
    None
}

/// Дескриптор конкретного типа: ключ, конструкторы и тождественное представление
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    key: TypeKey,
    constructors: fn() -> Vec<Constructor>,
    view: ViewFn,
}

impl TypeDescriptor {
    pub fn of<T: Injectable>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            constructors: T::constructors,
            view: view_as::<T, T>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn constructors(&self) -> Vec<Constructor> {
        (self.constructors)()
    }

    pub(crate) fn view(&self) -> ViewFn {
        self.view
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor").field("key", &self.key).finish()
    }
}

/// Зависимость: тип, qualifier и (для конкретных типов) дескриптор
///
/// Используется и для параметров конструктора, и для top-level запросов.
#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    key: TypeKey,
    qualifier: Option<Qualifier>,
    descriptor: Option<TypeDescriptor>,
}

impl Dependency {
    /// Конкретный тип: без binding создаётся по соглашению
    pub fn of<T: Injectable>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            qualifier: None,
            descriptor: Some(TypeDescriptor::of::<T>()),
        }
    }

    /// Абстрактный тип или значение: разрешается только через binding,
    /// seed-значение или custom resolver
    pub fn service<S: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<S>(),
            qualifier: None,
            descriptor: None,
        }
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn descriptor(&self) -> Option<TypeDescriptor> {
        self.descriptor
    }
}

/// Дескриптор конструктора: параметры, маркер "по умолчанию" и фабрика
#[derive(Clone)]
pub struct Constructor {
    produces: TypeKey,
    parameters: Vec<Dependency>,
    marked_default: bool,
    factory: ErasedFactory,
}

impl Constructor {
    /// Создать конструктор из фабрики; параметры добавляются builder-методами
    /// в том порядке, в котором фабрика их забирает из [`Arguments`]
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            produces: TypeKey::of::<T>(),
            parameters: Vec::new(),
            marked_default: false,
            factory: Arc::new(move |args| {
                let instance = factory(args)?;
                Ok(Arc::new(instance) as Instance)
            }),
        }
    }

    /// Параметр конкретного типа
    pub fn arg<T: Injectable>(mut self) -> Self {
        self.parameters.push(Dependency::of::<T>());
        self
    }

    /// Параметр конкретного типа с маркером
    pub fn arg_marked<T: Injectable, M: Marker>(mut self) -> Self {
        self.parameters
            .push(Dependency::of::<T>().qualified(Qualifier::of::<M>()));
        self
    }

    /// Параметр абстрактного типа (trait object) или простого значения
    pub fn service<S: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(Dependency::service::<S>());
        self
    }

    pub fn service_marked<S: ?Sized + 'static, M: Marker>(mut self) -> Self {
        self.parameters
            .push(Dependency::service::<S>().qualified(Qualifier::of::<M>()));
        self
    }

    /// Пометить конструктор как конструктор по умолчанию
    pub fn marked_default(mut self) -> Self {
        self.marked_default = true;
        self
    }

    pub fn produces(&self) -> TypeKey {
        self.produces
    }

    pub fn parameters(&self) -> &[Dependency] {
        &self.parameters
    }

    pub fn parameter_types(&self) -> Vec<TypeKey> {
        self.parameters.iter().map(|p| p.key()).collect()
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_marked_default(&self) -> bool {
        self.marked_default
    }

    pub(crate) fn invoke(&self, mut arguments: Arguments) -> anyhow::Result<Instance> {
        (self.factory)(&mut arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("produces", &self.produces)
            .field("parameters", &self.parameter_types())
            .field("marked_default", &self.marked_default)
            .finish()
    }
}

/// Значение, отданное потребителю: `Arc<S>` запрошенного типа
pub struct Resolved {
    key: TypeKey,
    value: Box<dyn Any>,
}

impl Resolved {
    pub fn new<S: ?Sized + 'static>(value: Arc<S>) -> Self {
        Self {
            key: TypeKey::of::<S>(),
            value: Box::new(value),
        }
    }

    /// Тип, в котором представлено значение
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn downcast<S: ?Sized + 'static>(self) -> Result<Arc<S>, Self> {
        let key = self.key;
        match self.value.downcast::<Arc<S>>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { key, value }),
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolved({})", self.key)
    }
}

/// Разрешённые аргументы конструктора в порядке объявления параметров
pub struct Arguments {
    owner: TypeKey,
    values: std::vec::IntoIter<Resolved>,
    position: usize,
}

impl Arguments {
    pub(crate) fn new(owner: TypeKey, values: Vec<Resolved>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Забрать следующий аргумент как `Arc<S>`
    pub fn take<S: ?Sized + 'static>(&mut self) -> InjectionResult<Arc<S>> {
        let position = self.position;
        self.position += 1;

        let value = self.values.next().ok_or_else(|| InjectionError::ArgumentMismatch {
            owner: self.owner.name().to_string(),
            position,
            expected: std::any::type_name::<S>().to_string(),
            found: "no argument".to_string(),
        })?;

        value.downcast::<S>().map_err(|value| InjectionError::ArgumentMismatch {
            owner: self.owner.name().to_string(),
            position,
            expected: std::any::type_name::<S>().to_string(),
            found: format!("'{}'", value.key().name()),
        })
    }

    /// Забрать следующий аргумент по значению
    pub fn take_cloned<T: Clone + 'static>(&mut self) -> InjectionResult<T> {
        self.take::<T>().map(|value| (*value).clone())
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
