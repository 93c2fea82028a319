use super::WindowBackend;
use crate::error::{ExpanderError, Result};
use crate::expander_error;
use crate::events::WindowInfo;
use crate::utils::command::run_capture;
use serde_json::Value;
use std::process::Command;

pub struct SwayBackend;

impl SwayBackend {
    pub fn new() -> Self {
        Self
    }
}

impl WindowBackend for SwayBackend {
    fn name(&self) -> &'static str {
        "sway"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let output = run_capture(Command::new("swaymsg").args(["-r", "-t", "get_tree"]))?;

        let tree: Value = serde_json::from_str(&output)
            .map_err(|e| expander_error!(window_lookup, "неверный JSON от swaymsg: {}", e))?;

        focused_window(&tree)
            .ok_or_else(|| ExpanderError::WindowLookupFailed("активное окно в Sway не найдено".to_string()))
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        let criteria = match &window.id {
            Some(id) => format!("[con_id={}]", id),
            None => format!("[title=\"^{}$\"]", super::xdotool::escape_regex(&window.title).replace('"', "\\\"")),
        };

        let output = run_capture(Command::new("swaymsg").args([criteria.as_str(), "focus"]))?;

        // swaymsg отвечает кодом 0 и "No matching node" для пустого критерия
        if output.contains("No matching node") {
            return Err(expander_error!(window_lookup, "окно {} не найдено", window));
        }
        Ok(())
    }
}

/// Обход дерева `get_tree` до узла-окна с `"focused": true`
fn focused_window(node: &Value) -> Option<WindowInfo> {
    let is_window = node.get("pid").is_some_and(|pid| !pid.is_null());
    if is_window && node.get("focused").and_then(Value::as_bool) == Some(true) {
        let title = node.get("name").and_then(Value::as_str).unwrap_or_default();
        let class = node
            .get("app_id")
            .and_then(Value::as_str)
            .or_else(|| {
                node.get("window_properties")
                    .and_then(|props| props.get("class"))
                    .and_then(Value::as_str)
            })
            .unwrap_or_default();

        let mut window = WindowInfo::new(title.to_string()).with_class(class.to_string());
        if let Some(id) = node.get("id").and_then(Value::as_i64) {
            window = window.with_id(id.to_string());
        }
        return Some(window);
    }

    ["nodes", "floating_nodes"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(focused_window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focused_window_in_nested_tree() {
        let tree: Value = serde_json::from_str(
            r#"{
                "id": 1, "name": "root", "focused": false,
                "nodes": [{
                    "id": 2, "name": "eDP-1", "focused": false,
                    "nodes": [
                        {"id": 10, "name": "vim", "pid": 100, "app_id": "foot", "focused": false, "nodes": []},
                        {"id": 11, "name": "Firefox", "pid": 200, "app_id": null,
                         "window_properties": {"class": "firefox"}, "focused": true, "nodes": []}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let window = focused_window(&tree).unwrap();
        assert_eq!(window.title, "Firefox");
        assert_eq!(window.class, "firefox");
        assert_eq!(window.id.as_deref(), Some("11"));
    }

    #[test]
    fn test_focused_workspace_is_not_a_window() {
        let tree: Value = serde_json::from_str(
            r#"{"id": 1, "name": "1", "type": "workspace", "focused": true, "nodes": []}"#,
        )
        .unwrap();
        assert!(focused_window(&tree).is_none());
    }

    #[test]
    fn test_floating_nodes_are_searched() {
        let tree: Value = serde_json::from_str(
            r#"{"id": 1, "name": "ws", "nodes": [],
                "floating_nodes": [{"id": 5, "name": "pavucontrol", "pid": 7, "app_id": "pavucontrol", "focused": true}]}"#,
        )
        .unwrap();
        assert_eq!(focused_window(&tree).unwrap().class, "pavucontrol");
    }
}
