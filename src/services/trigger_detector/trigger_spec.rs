use crate::error::{ExpanderError, Result};
use crate::mappings::KeyNameToEvdevCode;
use smallvec::SmallVec;
use std::fmt;

const DELIMITER: char = '+';

/// Комбинация клавиш: непустое множество каноничных имён в порядке первого появления.
/// Сравнение не зависит от порядка.
#[derive(Debug, Clone)]
pub struct TriggerSpec {
    keys: SmallVec<[&'static str; 4]>,
}

impl TriggerSpec {
    /// Разбор строки вида "Ctrl + Space": split по '+', trim, lowercase, синонимы, дедупликация
    pub fn parse(raw: &str) -> Result<Self> {
        let mut keys: SmallVec<[&'static str; 4]> = SmallVec::new();

        for token in raw.split(DELIMITER).map(str::trim).filter(|t| !t.is_empty()) {
            let name = KeyNameToEvdevCode::canonical_name(token).ok_or_else(|| {
                ExpanderError::InvalidTriggerSpec(format!("неизвестная клавиша {:?} в {:?}", token, raw))
            })?;
            if !keys.contains(&name) {
                keys.push(name);
            }
        }

        if keys.is_empty() {
            return Err(ExpanderError::InvalidTriggerSpec(format!(
                "комбинация {:?} не содержит клавиш",
                raw
            )));
        }

        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| *k == key)
    }
}

impl PartialEq for TriggerSpec {
    fn eq(&self, other: &Self) -> bool {
        self.keys.len() == other.keys.len() && self.keys.iter().all(|k| other.contains(k))
    }
}

impl Eq for TriggerSpec {}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_and_dedupes() {
        let spec = TriggerSpec::parse(" Ctrl + SPACE + control ").unwrap();
        assert_eq!(spec.keys(), &["ctrl", "space"]);
        assert_eq!(spec.to_string(), "ctrl+space");
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = TriggerSpec::parse("ctrl+alt+e").unwrap();
        let b = TriggerSpec::parse("e+Alt+ctrl").unwrap();
        let c = TriggerSpec::parse("ctrl+e").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_spec_rejected() {
        for raw in ["", "   ", "+", " + + "] {
            assert!(matches!(
                TriggerSpec::parse(raw),
                Err(ExpanderError::InvalidTriggerSpec(_))
            ));
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            TriggerSpec::parse("ctrl+hyperdrive"),
            Err(ExpanderError::InvalidTriggerSpec(_))
        ));
    }

    #[test]
    fn test_single_key_spec() {
        let spec = TriggerSpec::parse("f12").unwrap();
        assert_eq!(spec.keys(), &["f12"]);
        assert!(spec.contains("f12"));
    }
}
