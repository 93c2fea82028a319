//! Read-only access to the expansion catalog.
//!
//! Storage and editing of shortcuts live outside this crate. The core only ever
//! sees an immutable snapshot taken at request time, so edits never race with
//! an in-flight selection.

use crate::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Одна запись "сокращение -> текст"
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Expansion {
    pub trigger: String,
    pub body: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Expansion {
    pub fn new(trigger: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            body: body.into(),
            description: String::new(),
            enabled: true,
        }
    }

    /// Регистронезависимое совпадение подстроки по сокращению или тексту
    pub fn matches_filter(&self, filter_lower: &str) -> bool {
        filter_lower.is_empty()
            || self.trigger.to_lowercase().contains(filter_lower)
            || self.body.to_lowercase().contains(filter_lower)
    }

    /// Короткое превью текста для логов и меню
    pub fn preview(&self, max_chars: usize) -> String {
        let single_line = self.body.replace('\n', " ");
        if single_line.chars().count() <= max_chars {
            single_line
        } else {
            let cut: String = single_line.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// Неизменяемый снимок каталога
pub type Catalog = Arc<[Expansion]>;

/// Source of the expansion catalog.
pub trait ExpansionStore: Send + Sync {
    /// Ordered snapshot of all expansions at call time.
    fn list_expansions(&self) -> Result<Catalog>;
}

/// Каталог из секции `[[expansions]]` конфигурации.
/// Снимок заменяется целиком при перезагрузке конфига.
pub struct ConfigExpansionStore {
    snapshot: RwLock<Catalog>,
}

impl ConfigExpansionStore {
    pub fn new(expansions: Vec<Expansion>) -> Self {
        Self {
            snapshot: RwLock::new(expansions.into()),
        }
    }

    pub fn replace(&self, expansions: Vec<Expansion>) {
        *self.snapshot.write() = expansions.into();
    }
}

impl ExpansionStore for ConfigExpansionStore {
    fn list_expansions(&self) -> Result<Catalog> {
        Ok(self.snapshot.read().clone())
    }
}
