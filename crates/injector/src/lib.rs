//! Inversion-of-control контейнер
//!
//! Декларативные bindings (запрошенный тип + qualifier -> конкретный тип)
//! превращаются в полностью связанные графы объектов: конструктор выбирается
//! по стратегии binding'а, параметры разрешаются рекурсивно, экземпляры
//! кэшируются согласно жизненному циклу (transient или singleton).
//!
//! ```ignore
//! let mut injector = Injector::from_module(&|binder: &mut Binder| {
//!     binder.bind_to::<dyn Logger, ConsoleLogger>().with_activation().singleton();
//! })?;
//! let logger = injector.get_service::<dyn Logger>()?;
//! ```

pub mod binder;
pub mod binding_table;
pub mod config;
pub mod errors;
pub mod injector;
pub mod lifecycle;
pub mod metadata;
pub mod selector;
pub mod type_config;

pub use binder::{ActivationBinder, Binder, ConstructorBinder, Module, TypeBinder};
pub use binding_table::{BindingKey, BindingTable};
pub use config::{ConfigBuilder, ContainerConfig};
pub use errors::{InjectionError, InjectionResult};
pub use injector::{CustomResolver, Injector, InjectorStats};
pub use lifecycle::CacheStats;
pub use metadata::{
    Arguments, Constructor, Dependency, Implements, Injectable, Instance, Marker, Qualifier,
    Resolved, TypeDescriptor, TypeKey,
};
pub use type_config::{ConstructorStrategy, Lifecycle, SeedValues, TypeConfiguration};
