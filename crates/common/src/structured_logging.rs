//! Structured logging для контейнера и его потребителей
//!
//! Один глобальный subscriber: `EnvFilter` (RUST_LOG или директива из
//! конфигурации) плюс либо человекочитаемый fmt-слой, либо JSON-слой,
//! печатающий по одной записи [`LogRecord`] на строку.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Одна строка JSON-лога
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Остальные поля события
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// Заполняется для событий, записанных [`OperationTimer`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationMetrics>,
}

/// Итог измеренной операции
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub name: String,
    pub duration_us: u64,
    pub success: bool,
}

impl OperationMetrics {
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.duration_us)
    }
}

/// Слой, пишущий события как [`LogRecord`] в stdout
pub struct JsonLogLayer;

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let record = visitor.into_record(*event.metadata().level(), event.metadata().target());

        if let Ok(json) = serde_json::to_string(&record) {
            let _ = writeln!(io::stdout(), "{}", json);
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }

    /// Поля `operation`/`duration_us`/`success` сворачиваются в [`OperationMetrics`]
    fn into_record(mut self, level: Level, target: &str) -> LogRecord {
        let operation = match (
            self.fields.get("operation").and_then(Value::as_str),
            self.fields.get("duration_us").and_then(Value::as_u64),
        ) {
            (Some(name), Some(duration_us)) => Some(OperationMetrics {
                name: name.to_string(),
                duration_us,
                success: self
                    .fields
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            }),
            _ => None,
        };

        if operation.is_some() {
            for key in ["operation", "duration_us", "success"] {
                self.fields.remove(key);
            }
        }

        LogRecord {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: target.to_string(),
            message: self.message.unwrap_or_default(),
            fields: self.fields,
            operation,
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.insert(field, Value::String(text));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }
}

/// Настройки логирования
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Директива EnvFilter, если RUST_LOG не задан (например `injector=debug`)
    pub filter: String,
    pub json_output: bool,
    pub color_output: bool,
    pub include_line_numbers: bool,
    /// Писать через test writer, чтобы `cargo test` перехватывал вывод
    pub test_writer: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Level::INFO.to_string(),
            json_output: false,
            color_output: true,
            include_line_numbers: cfg!(debug_assertions),
            test_writer: false,
        }
    }
}

impl LoggingConfig {
    /// Подробные трассы разрешения
    pub fn debug() -> Self {
        Self {
            filter: "injector=debug,info".to_string(),
            ..Self::default()
        }
    }

    /// JSON без цвета для сбора логов
    pub fn json() -> Self {
        Self {
            json_output: true,
            color_output: false,
            include_line_numbers: false,
            ..Self::default()
        }
    }

    pub fn for_tests() -> Self {
        Self {
            color_output: false,
            test_writer: true,
            ..Self::debug()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Установить глобальный subscriber
///
/// Subscriber устанавливается один раз на процесс; повторный вызов
/// возвращает ошибку.
pub fn init_structured_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = config.env_filter();

    if config.json_output {
        let subscriber = Registry::default().with(env_filter).with(JsonLogLayer);
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_line_number(config.include_line_numbers)
        .with_ansi(config.color_output);

    if config.test_writer {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(fmt_layer.with_test_writer());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(env_filter).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Замер длительности операции с записью итога в лог
pub struct OperationTimer {
    start: Instant,
    name: String,
    fields: BTreeMap<String, Value>,
}

impl OperationTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Дополнительное поле итоговой записи; несериализуемые значения пропускаются
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.fields.insert(key.into(), value);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn metrics(&self, success: bool) -> OperationMetrics {
        OperationMetrics {
            name: self.name.clone(),
            duration_us: self.start.elapsed().as_micros() as u64,
            success,
        }
    }

    pub fn finish(self) -> OperationMetrics {
        let metrics = self.metrics(true);

        tracing::debug!(
            operation = %metrics.name,
            duration_us = metrics.duration_us,
            success = true,
            fields = ?self.fields,
            "Operation completed"
        );

        metrics
    }

    /// Ошибка пишется на уровне warn, успех на debug
    pub fn finish_with_result<T, E: std::fmt::Display>(
        self,
        result: &Result<T, E>,
    ) -> OperationMetrics {
        let metrics = self.metrics(result.is_ok());

        match result {
            Ok(_) => tracing::debug!(
                operation = %metrics.name,
                duration_us = metrics.duration_us,
                success = true,
                fields = ?self.fields,
                "Operation completed"
            ),
            Err(e) => tracing::warn!(
                operation = %metrics.name,
                duration_us = metrics.duration_us,
                success = false,
                error = %e,
                fields = ?self.fields,
                "Operation failed"
            ),
        }

        metrics
    }
}
