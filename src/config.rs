use crate::services::expansion_store::Expansion;
use crate::services::trigger_detector::TriggerSpec;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub trigger: TriggerConfig,
    pub input: InputConfig,
    pub window: WindowConfig,
    pub selection: SelectionConfig,
    pub injection: InjectionConfig,
    pub expansions: Vec<Expansion>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Комбинация в виде "ctrl+space"
    pub chord: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// "auto" = все доступные клавиатуры
    pub device_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub backend: String,
    pub polling_interval_ms: u64,
    /// Окна, которые никогда не считаются целью вставки (само меню выбора)
    pub ignore_patterns: Vec<String>,
    /// Окна, в которых триггер игнорируется
    pub blocked_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// argv dmenu-совместимой программы выбора
    pub command: Vec<String>,
    pub timeout_ms: u64,
    pub notify: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectionConfig {
    pub paste_backend: String,
    pub paste_shortcut: String,
    pub settle_delay_ms: u64,
    pub restore_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            trigger: TriggerConfig::default(),
            input: InputConfig::default(),
            window: WindowConfig::default(),
            selection: SelectionConfig::default(),
            injection: InjectionConfig::default(),
            expansions: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            chord: "ctrl+space".to_string(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: "auto".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            polling_interval_ms: 100,
            ignore_patterns: vec!["rofi".to_string(), "dmenu".to_string()],
            blocked_patterns: Vec::new(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            command: ["rofi", "-dmenu", "-i", "-p", "expand"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_ms: 60_000,
            notify: true,
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            paste_backend: "uinput".to_string(),
            paste_shortcut: "ctrl+v".to_string(),
            settle_delay_ms: 100,
            restore_delay_ms: 100,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("EXPANDER_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "pretty" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if let Err(e) = TriggerSpec::parse(&self.trigger.chord) {
            anyhow::bail!("Неверная комбинация [trigger].chord {:?}: {}", self.trigger.chord, e);
        }

        match self.window.backend.as_str() {
            "auto" | "xdotool" | "kdotool" | "wmctrl" | "sway" => {}
            _ => anyhow::bail!("Неизвестный backend окон: {}", self.window.backend),
        }

        if self.window.polling_interval_ms == 0 {
            anyhow::bail!("polling_interval_ms должен быть больше 0");
        }

        if self.selection.command.is_empty() {
            anyhow::bail!("[selection].command не может быть пустым");
        }

        if self.selection.timeout_ms == 0 {
            anyhow::bail!("[selection].timeout_ms должен быть больше 0");
        }

        match self.injection.paste_backend.as_str() {
            "uinput" | "xdotool" | "wtype" => {}
            _ => anyhow::bail!("Неизвестный способ вставки: {}", self.injection.paste_backend),
        }

        if let Err(e) = TriggerSpec::parse(&self.injection.paste_shortcut) {
            anyhow::bail!("Неверное сочетание вставки {:?}: {}", self.injection.paste_shortcut, e);
        }

        for expansion in &self.expansions {
            if expansion.trigger.trim().is_empty() {
                anyhow::bail!("У сокращения пустой trigger");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.polling_interval_ms, 100);
        assert_eq!(config.injection.settle_delay_ms, 100);
        assert_eq!(config.injection.restore_delay_ms, 100);
    }

    #[test]
    fn test_invalid_chord_rejected() {
        let mut config = Config::default();
        config.trigger.chord = " + ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_paste_backend_rejected() {
        let mut config = Config::default();
        config.injection.paste_backend = "telepathy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_with_expansions() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "expander.toml",
                r#"
                [trigger]
                chord = "alt+shift+e"

                [[expansions]]
                trigger = "omg"
                body = "Oh my gosh!"

                [[expansions]]
                trigger = "brb"
                body = "Be right back"
                description = "away"
                enabled = false
                "#,
            )?;

            let config = Config::load("expander.toml").expect("конфигурация должна загрузиться");
            assert_eq!(config.trigger.chord, "alt+shift+e");
            assert_eq!(config.expansions.len(), 2);
            assert!(config.expansions[0].enabled);
            assert!(!config.expansions[1].enabled);
            assert_eq!(config.expansions[1].description, "away");
            // Не указанные секции берутся из значений по умолчанию
            assert_eq!(config.selection.timeout_ms, 60_000);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("expander.toml", "")?;
            jail.set_env("EXPANDER_TRIGGER__CHORD", "ctrl+alt+x");

            let config = Config::load("expander.toml").expect("конфигурация должна загрузиться");
            assert_eq!(config.trigger.chord, "ctrl+alt+x");
            Ok(())
        });
    }
}
