//! Конфигурация контейнера
//!
//! Поля, которых нет в TOML, берутся из `Default`. Глубина графа по
//! умолчанию не ограничена: завершение гарантирует in-flight стек, а
//! `max_resolution_depth` лишь дополнительный предохранитель.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{InjectionError, InjectionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Имя в логах
    pub name: String,

    /// Сколько bindings может закрыть `Binder::finish`
    pub max_bindings: usize,

    /// debug!-трассы каждого шага разрешения
    pub debug_logging: bool,

    /// Предел вложенности параметров; `None` - без предела
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resolution_depth: Option<usize>,
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self {
            name: "injector".to_string(),
            max_bindings: 1024,
            debug_logging: false,
            max_resolution_depth: None,
        }
    }

    /// Трассировка разрешения включена
    pub fn traced() -> Self {
        Self {
            name: "injector-traced".to_string(),
            debug_logging: true,
            ..Self::new()
        }
    }

    /// Граф не глубже `max_depth` параметров
    pub fn bounded(max_depth: usize) -> Self {
        Self {
            max_resolution_depth: Some(max_depth),
            ..Self::new()
        }
    }

    pub fn validate(&self) -> InjectionResult<()> {
        if self.max_bindings == 0 {
            return Err(InjectionError::invalid_configuration(
                "max_bindings must be greater than 0",
            ));
        }

        if self.max_resolution_depth == Some(0) {
            return Err(InjectionError::invalid_configuration(
                "max_resolution_depth must be greater than 0 when set",
            ));
        }

        Ok(())
    }

    pub fn from_toml_str(source: &str) -> InjectionResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| InjectionError::invalid_configuration(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> InjectionResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            InjectionError::invalid_configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> InjectionResult<String> {
        toml::to_string(self)
            .map_err(|e| InjectionError::invalid_configuration(format!("TOML serialize error: {}", e)))
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ConfigBuilder {
    config: ContainerConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn max_bindings(mut self, max: usize) -> Self {
        self.config.max_bindings = max;
        self
    }

    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.config.debug_logging = enabled;
        self
    }

    pub fn max_resolution_depth(mut self, depth: usize) -> Self {
        self.config.max_resolution_depth = Some(depth);
        self
    }

    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
