//! Ошибки разрешения зависимостей
//!
//! Каждая ошибка терминальна для текущего вызова `get_instance`: частично
//! построенный граф не возвращается, повторных попыток нет. Все варианты
//! содержат имя типа и qualifier, чтобы по сообщению можно было найти
//! отсутствующий или конфликтующий binding.

use thiserror::Error;

use crate::metadata::{Qualifier, TypeKey};

pub type InjectionResult<T> = Result<T, InjectionError>;

/// Основной error type для всех операций контейнера
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InjectionError {
    /// Целевой тип не может быть создан (нет binding и нет дескриптора конструкторов)
    #[error("Type '{type_name}'{} can not be resolved and instantiated", fmt_qualifier(.qualifier))]
    UnboundType {
        type_name: String,
        qualifier: Option<String>,
    },

    /// Ни один конструктор не удовлетворяет выбранной стратегии
    #[error("No constructor of '{type_name}' satisfies the {strategy} strategy")]
    MissingAppropriateConstructor {
        type_name: String,
        strategy: String,
    },

    /// Несколько конструкторов помечены как конструктор по умолчанию
    #[error("Type '{type_name}' has {count} constructors marked as default")]
    AmbiguousDefaultConstructor { type_name: String, count: usize },

    /// Тип запрошен, пока он ещё строится выше по стеку
    #[error("Circular dependency detected for '{type_name}'{}: {}", fmt_qualifier(.qualifier), .chain.join(" -> "))]
    CircularDependency {
        type_name: String,
        qualifier: Option<String>,
        chain: Vec<String>,
    },

    /// Граф глубже, чем разрешено конфигурацией контейнера
    #[error("Resolution of '{type_name}' exceeded the maximum depth of {max_depth}")]
    ResolutionTooDeep { type_name: String, max_depth: usize },

    /// Фабрика конструктора запросила аргумент не того типа или сверх объявленных
    #[error("Constructor of '{owner}' expected argument #{position} of type '{expected}', found {found}")]
    ArgumentMismatch {
        owner: String,
        position: usize,
        expected: String,
        found: String,
    },

    /// Фабрика конструктора вернула ошибку
    #[error("Construction of '{type_name}' failed: {message}")]
    ConstructionFailed { type_name: String, message: String },

    /// Полученный экземпляр нельзя представить как запрошенный тип
    #[error("Instance of '{actual}' can not be viewed as '{requested}'")]
    InstanceMismatch { requested: String, actual: String },

    /// Превышен лимит bindings из конфигурации
    #[error("Binding table holds {count} bindings, limit is {limit}")]
    TooManyBindings { count: usize, limit: usize },

    /// Ошибка конфигурации контейнера
    #[error("Invalid container configuration: {message}")]
    InvalidConfiguration { message: String },
}

fn fmt_qualifier(qualifier: &Option<String>) -> String {
    match qualifier {
        Some(q) => format!(" [{}]", q),
        None => String::new(),
    }
}

impl InjectionError {
    pub(crate) fn unbound(key: TypeKey, qualifier: Option<Qualifier>) -> Self {
        InjectionError::UnboundType {
            type_name: key.name().to_string(),
            qualifier: qualifier.map(|q| q.name().to_string()),
        }
    }

    pub(crate) fn circular(
        key: TypeKey,
        qualifier: Option<Qualifier>,
        chain: Vec<String>,
    ) -> Self {
        InjectionError::CircularDependency {
            type_name: key.name().to_string(),
            qualifier: qualifier.map(|q| q.name().to_string()),
            chain,
        }
    }

    pub(crate) fn missing_constructor(key: TypeKey, strategy: impl Into<String>) -> Self {
        InjectionError::MissingAppropriateConstructor {
            type_name: key.name().to_string(),
            strategy: strategy.into(),
        }
    }

    pub(crate) fn mismatch(requested: TypeKey, actual: TypeKey) -> Self {
        InjectionError::InstanceMismatch {
            requested: requested.name().to_string(),
            actual: actual.name().to_string(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        InjectionError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Ошибка вызвана конфигурацией bindings/типов, а не конкретным запуском фабрики
    pub fn is_configuration_error(&self) -> bool {
        match self {
            InjectionError::UnboundType { .. } => true,
            InjectionError::MissingAppropriateConstructor { .. } => true,
            InjectionError::AmbiguousDefaultConstructor { .. } => true,
            InjectionError::CircularDependency { .. } => true,
            InjectionError::ResolutionTooDeep { .. } => false,
            InjectionError::ArgumentMismatch { .. } => true,
            InjectionError::ConstructionFailed { .. } => false,
            InjectionError::InstanceMismatch { .. } => true,
            InjectionError::TooManyBindings { .. } => true,
            InjectionError::InvalidConfiguration { .. } => true,
        }
    }

    /// Категория ошибки для логов
    pub fn category(&self) -> &'static str {
        match self {
            InjectionError::UnboundType { .. } => "unbound",
            InjectionError::MissingAppropriateConstructor { .. } => "constructor",
            InjectionError::AmbiguousDefaultConstructor { .. } => "constructor",
            InjectionError::CircularDependency { .. } => "cycle",
            InjectionError::ResolutionTooDeep { .. } => "depth",
            InjectionError::ArgumentMismatch { .. } => "arguments",
            InjectionError::ConstructionFailed { .. } => "factory",
            InjectionError::InstanceMismatch { .. } => "view",
            InjectionError::TooManyBindings { .. } => "configuration",
            InjectionError::InvalidConfiguration { .. } => "configuration",
        }
    }
}
