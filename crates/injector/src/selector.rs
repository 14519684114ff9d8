//! Выбор конструктора по стратегии из конфигурации binding'а
//!
//! Чистые функции: (конфигурация, конструкторы target'а, таблица bindings)
//! -> один конструктор или ошибка. Ничего не создают и кэши не трогают.

use tracing::debug;

use crate::binding_table::BindingTable;
use crate::errors::{InjectionError, InjectionResult};
use crate::metadata::Constructor;
use crate::type_config::{ConstructorStrategy, TypeConfiguration};

/// Выбрать конструктор target'а согласно `config.strategy()`
pub fn select_constructor(
    config: &TypeConfiguration,
    constructors: Vec<Constructor>,
    table: &BindingTable,
) -> InjectionResult<Constructor> {
    let selected = match config.strategy() {
        ConstructorStrategy::MarkedConstructor => match marked(config, &constructors)? {
            Some(constructor) => Some(constructor),
            None => {
                debug!(
                    "No marked constructor on {}, falling back to longest resolvable",
                    config.target()
                );
                longest_resolvable(&constructors, table)
            }
        },
        ConstructorStrategy::ArgumentTypeMatch => argument_type_match(config, &constructors),
        ConstructorStrategy::NoArguments => no_arguments(&constructors),
        ConstructorStrategy::LongestResolvable => longest_resolvable(&constructors, table),
    };

    selected.cloned().ok_or_else(|| {
        let strategy = match config.strategy() {
            // деградация marked -> longest не является ошибкой, а вот её неудача - да
            ConstructorStrategy::MarkedConstructor => ConstructorStrategy::LongestResolvable,
            other => other,
        };
        InjectionError::missing_constructor(config.target(), strategy.to_string())
    })
}

/// Конструктор с пометкой "по умолчанию"; больше одной пометки - ошибка
pub fn marked<'a>(
    config: &TypeConfiguration,
    constructors: &'a [Constructor],
) -> InjectionResult<Option<&'a Constructor>> {
    let mut found = constructors.iter().filter(|c| c.is_marked_default());
    let first = found.next();
    let extra = found.count();

    if extra > 0 {
        return Err(InjectionError::AmbiguousDefaultConstructor {
            type_name: config.target().name().to_string(),
            count: extra + 1,
        });
    }

    Ok(first)
}

/// Конструктор, последовательность типов параметров которого равна заданной
pub fn argument_type_match<'a>(
    config: &TypeConfiguration,
    constructors: &'a [Constructor],
) -> Option<&'a Constructor> {
    constructors
        .iter()
        .find(|c| c.parameter_types().as_slice() == config.argument_types())
}

pub fn no_arguments(constructors: &[Constructor]) -> Option<&Constructor> {
    constructors.iter().find(|c| c.arity() == 0)
}

/// Самый длинный конструктор из тех, чьи типы параметров все есть в bindings.
/// При равной длине побеждает объявленный раньше.
pub fn longest_resolvable<'a>(
    constructors: &'a [Constructor],
    table: &BindingTable,
) -> Option<&'a Constructor> {
    let mut best: Option<&Constructor> = None;

    for constructor in constructors {
        if !table.all_resolvable(&constructor.parameter_types()) {
            continue;
        }
        if best.map_or(true, |current| constructor.arity() > current.arity()) {
            best = Some(constructor);
        }
    }

    best
}
