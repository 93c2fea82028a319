use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Информация об окне
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Идентификатор окна у оконного менеджера (если backend его сообщает)
    pub id: Option<String>,
    pub title: String,
    pub class: String,
}

impl WindowInfo {
    pub fn new(title: String) -> Self {
        Self {
            id: None,
            title,
            class: String::new(),
        }
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }

    /// Проверить, соответствует ли окно паттерну (регистронезависимо)
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }
        let pattern_lower = pattern.to_lowercase();
        self.title.to_lowercase().contains(&pattern_lower)
            || self.class.to_lowercase().contains(&pattern_lower)
    }

    /// Проверить, соответствует ли окно любому из паттернов.
    /// Пустой список не совпадает ни с чем.
    pub fn matches_any_pattern(&self, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| self.matches_pattern(pattern))
    }

    /// Совпадение по идентичности: id, если он есть у обоих, иначе заголовок и класс
    pub fn same_window(&self, other: &WindowInfo) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b && self.title == other.title,
            _ => self.title == other.title && self.class == other.class,
        }
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class.is_empty() {
            write!(f, "\"{}\"", self.title)
        } else {
            write!(f, "\"{}\" ({})", self.title, self.class)
        }
    }
}

/// Событие смены активного окна
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub window: Arc<WindowInfo>,
    pub previous: Option<Arc<WindowInfo>>,
}

impl WindowEvent {
    pub fn focus_changed(window: Arc<WindowInfo>, previous: Option<Arc<WindowInfo>>) -> Self {
        Self {
            window,
            previous,
        }
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous {
            Some(previous) => write!(f, "Смена активного окна: {} -> {}", previous, self.window),
            None => write!(f, "Смена активного окна: {}", self.window),
        }
    }
}

/// Окно, имевшее фокус в момент срабатывания триггера (до показа выбора).
/// Принадлежит одному циклу выбора и вставки.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusSnapshot {
    window: Option<Arc<WindowInfo>>,
}

impl FocusSnapshot {
    pub fn new(window: Option<Arc<WindowInfo>>) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Option<&WindowInfo> {
        self.window.as_deref()
    }
}

impl fmt::Display for FocusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "{}", window),
            None => write!(f, "<неизвестно>"),
        }
    }
}
