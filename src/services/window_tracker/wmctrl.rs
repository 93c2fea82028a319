use super::WindowBackend;
use crate::error::Result;
use crate::expander_error;
use crate::events::WindowInfo;
use crate::utils::command::run_capture;
use std::process::Command;

/// wmctrl не умеет сообщать активное окно сам, id берётся из `_NET_ACTIVE_WINDOW`
pub struct WmctrlBackend;

impl WmctrlBackend {
    pub fn new() -> Self {
        Self
    }

    fn active_id() -> Result<u64> {
        let output = run_capture(Command::new("xprop").args(["-root", "_NET_ACTIVE_WINDOW"]))?;
        parse_active_window_id(&output).ok_or_else(|| {
            expander_error!(window_lookup, "неожиданный ответ xprop: {}", output)
        })
    }
}

impl WindowBackend for WmctrlBackend {
    fn name(&self) -> &'static str {
        "wmctrl"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let active = Self::active_id()?;
        let listing = run_capture(Command::new("wmctrl").arg("-lx"))?;

        find_in_listing(&listing, active).ok_or_else(|| {
            expander_error!(window_lookup, "окно 0x{:08x} отсутствует в wmctrl -lx", active)
        })
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        let mut cmd = Command::new("wmctrl");
        match &window.id {
            Some(id) => cmd.args(["-i", "-a", id]),
            None => cmd.args(["-F", "-a", &window.title]),
        };
        run_capture(&mut cmd).map(|_| ())
    }
}

fn parse_hex(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim().trim_start_matches("0x"), 16).ok()
}

/// `_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007`
fn parse_active_window_id(output: &str) -> Option<u64> {
    let id = parse_hex(output.rsplit('#').next()?)?;
    (id != 0).then_some(id)
}

/// Строка `wmctrl -lx`: `0x03a00007  0 firefox.Firefox host Заголовок окна`
fn find_in_listing(listing: &str, active: u64) -> Option<WindowInfo> {
    listing.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let raw_id = parts.next()?;
        if parse_hex(raw_id)? != active {
            return None;
        }
        let _desktop = parts.next()?;
        let class = parts.next().unwrap_or_default();
        let _host = parts.next();
        let title = parts.collect::<Vec<_>>().join(" ");

        Some(
            WindowInfo::new(title)
                .with_class(class.to_string())
                .with_id(raw_id.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_active_window_id() {
        assert_eq!(
            parse_active_window_id("_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007"),
            Some(0x3a00007)
        );
        assert_eq!(parse_active_window_id("_NET_ACTIVE_WINDOW(WINDOW): window id # 0x0"), None);
        assert_eq!(parse_active_window_id("garbage"), None);
    }

    #[test]
    fn test_find_in_listing_matches_padded_id() {
        let listing = "0x01e00003  0 xterm.XTerm   host  bash\n\
                       0x03a00007  0 firefox.Firefox host Новая вкладка - Mozilla Firefox";

        let window = find_in_listing(listing, 0x3a00007).unwrap();
        assert_eq!(window.title, "Новая вкладка - Mozilla Firefox");
        assert_eq!(window.class, "firefox.Firefox");
        assert_eq!(window.id.as_deref(), Some("0x03a00007"));

        assert!(find_in_listing(listing, 0x1234).is_none());
    }
}
