//! Общие типы для интеграционных тестов контейнера

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use common::{init_structured_logging, LoggingConfig};
use injector::{implements, Constructor, Injectable, Marker};

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = init_structured_logging(LoggingConfig::for_tests());
    });
}

// === Маркеры ===

pub struct Red;
impl Marker for Red {}

pub struct Yellow;
impl Marker for Yellow {}

// === Logger и реализации ===

pub trait Logger: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn name(&self) -> &'static str {
        "console"
    }
}

impl Injectable for ConsoleLogger {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| Ok(ConsoleLogger))]
    }
}

#[derive(Debug)]
pub struct FileLogger;

impl Logger for FileLogger {
    fn name(&self) -> &'static str {
        "file"
    }
}

impl Injectable for FileLogger {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| Ok(FileLogger))]
    }
}

implements!(ConsoleLogger => dyn Logger);
implements!(FileLogger => dyn Logger);

/// Потребитель двух логгеров: обычного и помеченного `Red`
pub struct Auditor {
    pub plain: Arc<dyn Logger>,
    pub red: Arc<dyn Logger>,
}

impl Injectable for Auditor {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            Ok(Auditor {
                plain: args.take::<dyn Logger>()?,
                red: args.take::<dyn Logger>()?,
            })
        })
        .service::<dyn Logger>()
        .service_marked::<dyn Logger, Red>()]
    }
}

/// Тот же логгер через trait object и через конкретный тип
pub struct Mirror {
    pub as_trait: Arc<dyn Logger>,
    pub as_console: Arc<ConsoleLogger>,
}

impl Injectable for Mirror {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            Ok(Mirror {
                as_trait: args.take::<dyn Logger>()?,
                as_console: args.take::<ConsoleLogger>()?,
            })
        })
        .service::<dyn Logger>()
        .arg::<ConsoleLogger>()
        .marked_default()]
    }
}

// === Простые конкретные типы ===

/// Тип только с конструктором без параметров
#[derive(Debug)]
pub struct Clock;

impl Injectable for Clock {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| Ok(Clock))]
    }
}

pub struct Wheel;

impl Injectable for Wheel {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| Ok(Wheel))]
    }
}

/// Два соседних параметра одного transient-типа
pub struct Car {
    pub left: Arc<Wheel>,
    pub right: Arc<Wheel>,
}

impl Injectable for Car {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            Ok(Car {
                left: args.take()?,
                right: args.take()?,
            })
        })
        .arg::<Wheel>()
        .arg::<Wheel>()]
    }
}

// === Циклы ===

pub struct Chicken;
pub struct Egg;

impl Injectable for Chicken {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            args.take::<Egg>()?;
            Ok(Chicken)
        })
        .arg::<Egg>()
        .marked_default()]
    }
}

impl Injectable for Egg {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            args.take::<Chicken>()?;
            Ok(Egg)
        })
        .arg::<Chicken>()
        .marked_default()]
    }
}

pub trait Node: Send + Sync {}

/// Реализация `dyn Node`, которой самой нужен `dyn Node`
pub struct Loop;

impl Node for Loop {}

impl Injectable for Loop {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            args.take::<dyn Node>()?;
            Ok(Loop)
        })
        .service::<dyn Node>()]
    }
}

implements!(Loop => dyn Node);

// === Стратегии выбора конструктора ===

/// Какой конструктор был вызван
pub struct Report {
    pub variant: &'static str,
    pub number: i32,
    pub title: String,
}

impl Injectable for Report {
    fn constructors() -> Vec<Constructor> {
        vec![
            Constructor::new(|_| {
                Ok(Report {
                    variant: "()",
                    number: 0,
                    title: String::new(),
                })
            }),
            Constructor::new(|args| {
                Ok(Report {
                    variant: "(i32)",
                    number: args.take_cloned()?,
                    title: String::new(),
                })
            })
            .service::<i32>(),
            Constructor::new(|args| {
                Ok(Report {
                    variant: "(i32, String)",
                    number: args.take_cloned()?,
                    title: args.take_cloned()?,
                })
            })
            .service::<i32>()
            .service::<String>(),
            Constructor::new(|args| {
                let title = args.take_cloned()?;
                Ok(Report {
                    variant: "(String, i32)",
                    number: args.take_cloned()?,
                    title,
                })
            })
            .service::<String>()
            .service::<i32>(),
        ]
    }
}

pub struct Radio;

impl Injectable for Radio {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| Ok(Radio))]
    }
}

/// Конструкторы арности 0, 1 и 2
pub struct Dashboard {
    pub arity: usize,
}

impl Injectable for Dashboard {
    fn constructors() -> Vec<Constructor> {
        vec![
            Constructor::new(|_| Ok(Dashboard { arity: 0 })),
            Constructor::new(|args| {
                args.take::<Clock>()?;
                Ok(Dashboard { arity: 1 })
            })
            .arg::<Clock>(),
            Constructor::new(|args| {
                args.take::<Clock>()?;
                args.take::<Radio>()?;
                Ok(Dashboard { arity: 2 })
            })
            .arg::<Clock>()
            .arg::<Radio>(),
        ]
    }
}

/// Два конструктора, помеченных как default
pub struct Gearbox;

pub static GEARBOX_BUILDS: AtomicUsize = AtomicUsize::new(0);

impl Injectable for Gearbox {
    fn constructors() -> Vec<Constructor> {
        vec![
            Constructor::new(|_| {
                GEARBOX_BUILDS.fetch_add(1, Ordering::SeqCst);
                Ok(Gearbox)
            })
            .marked_default(),
            Constructor::new(|args| {
                GEARBOX_BUILDS.fetch_add(1, Ordering::SeqCst);
                args.take::<Clock>()?;
                Ok(Gearbox)
            })
            .arg::<Clock>()
            .marked_default(),
        ]
    }
}

/// Значение без binding'а и без дескриптора: разрешимо только seed'ом
#[derive(Debug, Clone, PartialEq)]
pub struct Celsius(pub f64);

pub struct Thermostat {
    pub target: Celsius,
}

impl Injectable for Thermostat {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|args| {
            Ok(Thermostat {
                target: args.take_cloned()?,
            })
        })
        .service::<Celsius>()]
    }
}

// === Post-initializer ===

pub struct Engine {
    pub starts: AtomicUsize,
}

impl Engine {
    pub fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Injectable for Engine {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| {
            Ok(Engine {
                starts: AtomicUsize::new(0),
            })
        })]
    }
}

/// Фабрика, которая всегда падает
pub struct Broken;

impl Injectable for Broken {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(|_| -> anyhow::Result<Broken> {
            anyhow::bail!("sensor not connected")
        })]
    }
}
