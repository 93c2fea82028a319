use super::TriggerSpec;
use crate::events::KeyState;
use std::collections::HashMap;

/// Состояние удерживаемых клавиш и фронтовое срабатывание комбинации.
///
/// Срабатывает один раз на переход в состояние "все клавиши нажаты".
/// Повторно взводится, когда отпущена хотя бы одна клавиша комбинации.
/// Нажатия учитываются по сырому коду: левый и правый ctrl дают одно имя,
/// и имя считается отпущенным только после отпускания обеих.
#[derive(Debug)]
pub struct ChordTracker {
    spec: TriggerSpec,
    down: HashMap<u16, &'static str>,
    armed: bool,
}

impl ChordTracker {
    pub fn new(spec: TriggerSpec) -> Self {
        Self {
            spec,
            down: HashMap::new(),
            armed: true,
        }
    }

    pub fn spec(&self) -> &TriggerSpec {
        &self.spec
    }

    /// Замена комбинации вместе со сбросом состояния,
    /// чтобы частичное совпадение со старой комбинацией не дало ложного срабатывания
    pub fn reconfigure(&mut self, spec: TriggerSpec) {
        self.spec = spec;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.down.clear();
        self.armed = true;
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.down.values().any(|held| *held == key)
    }

    /// Обработать событие клавиши `code` с каноничным именем `key`;
    /// `true` означает срабатывание триггера
    pub fn process(&mut self, code: u16, key: &'static str, state: KeyState) -> bool {
        if !state.is_down() {
            self.down.remove(&code);
            if self.spec.contains(key) && !self.is_down(key) {
                self.armed = true;
            }
            return false;
        }
        self.down.insert(code, key);

        if !self.armed || !self.spec.contains(key) {
            return false;
        }

        if self.spec.keys().iter().all(|k| self.is_down(k)) {
            self.armed = false;
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::KeyNameToEvdevCode;
    use KeyState::{Pressed, Released, Repeat};

    const LEFT_CTRL: u16 = 29;
    const RIGHT_CTRL: u16 = 97;
    const SPACE: u16 = 57;

    fn tracker(raw: &str) -> ChordTracker {
        ChordTracker::new(TriggerSpec::parse(raw).unwrap())
    }

    fn fire_count(tracker: &mut ChordTracker, events: &[(&'static str, KeyState)]) -> usize {
        let mut fired = 0;
        for &(key, state) in events {
            let code = KeyNameToEvdevCode::translate(key).unwrap();
            if tracker.process(code, key, state) {
                fired += 1;
            }
        }
        fired
    }

    #[test]
    fn test_fires_once_in_any_press_order() {
        let orders: [&[&'static str]; 3] = [
            &["ctrl", "alt", "e"],
            &["e", "ctrl", "alt"],
            &["alt", "e", "ctrl"],
        ];

        for order in orders {
            let mut t = tracker("ctrl+alt+e");
            let presses: Vec<_> = order.iter().map(|k| (*k, Pressed)).collect();
            assert_eq!(fire_count(&mut t, &presses), 1, "порядок {:?}", order);
        }
    }

    #[test]
    fn test_holding_does_not_refire() {
        let mut t = tracker("ctrl+space");
        let events = [
            ("ctrl", Pressed),
            ("space", Pressed),
            ("space", Repeat),
            ("ctrl", Repeat),
            ("space", Repeat),
            ("space", Pressed),
        ];
        assert_eq!(fire_count(&mut t, &events), 1);
    }

    #[test]
    fn test_releasing_one_key_rearms() {
        let mut t = tracker("ctrl+space");
        assert_eq!(fire_count(&mut t, &[("ctrl", Pressed), ("space", Pressed)]), 1);
        // Отпускаем только space, ctrl остаётся зажатым
        assert_eq!(fire_count(&mut t, &[("space", Released), ("space", Pressed)]), 1);
        assert_eq!(fire_count(&mut t, &[("ctrl", Released), ("ctrl", Pressed)]), 1);
    }

    #[test]
    fn test_unrelated_release_does_not_rearm() {
        let mut t = tracker("ctrl+space");
        assert_eq!(
            fire_count(&mut t, &[("ctrl", Pressed), ("space", Pressed), ("a", Pressed)]),
            1
        );
        assert_eq!(fire_count(&mut t, &[("a", Released), ("space", Repeat)]), 0);
    }

    #[test]
    fn test_extra_held_keys_do_not_block_trigger() {
        let mut t = tracker("ctrl+space");
        assert_eq!(
            fire_count(&mut t, &[("shift", Pressed), ("ctrl", Pressed), ("space", Pressed)]),
            1
        );
    }

    #[test]
    fn test_partial_chord_never_fires() {
        let mut t = tracker("ctrl+alt+e");
        let events = [
            ("ctrl", Pressed),
            ("e", Pressed),
            ("e", Released),
            ("e", Pressed),
            ("ctrl", Released),
        ];
        assert_eq!(fire_count(&mut t, &events), 0);
    }

    #[test]
    fn test_reconfigure_clears_partial_state() {
        let mut t = tracker("ctrl+space");
        assert_eq!(fire_count(&mut t, &[("ctrl", Pressed)]), 0);

        t.reconfigure(TriggerSpec::parse("ctrl+e").unwrap());
        assert!(!t.is_down("ctrl"));
        // ctrl был нажат до смены комбинации и не учитывается
        assert_eq!(fire_count(&mut t, &[("e", Pressed)]), 0);
        assert_eq!(fire_count(&mut t, &[("e", Released), ("ctrl", Pressed), ("e", Pressed)]), 1);
    }

    #[test]
    fn test_one_side_release_keeps_modifier_held() {
        let mut t = tracker("ctrl+space");
        assert!(!t.process(LEFT_CTRL, "ctrl", Pressed));
        assert!(!t.process(RIGHT_CTRL, "ctrl", Pressed));
        assert!(!t.process(RIGHT_CTRL, "ctrl", Released));

        assert!(t.is_down("ctrl"));
        assert!(t.process(SPACE, "space", Pressed));
    }

    #[test]
    fn test_one_side_release_does_not_rearm() {
        let mut t = tracker("ctrl+space");
        t.process(LEFT_CTRL, "ctrl", Pressed);
        t.process(RIGHT_CTRL, "ctrl", Pressed);
        assert!(t.process(SPACE, "space", Pressed));

        assert!(!t.process(RIGHT_CTRL, "ctrl", Released));
        assert!(!t.process(SPACE, "space", Repeat));

        // Отпущены обе стороны: комбинация снова взведена
        assert!(!t.process(LEFT_CTRL, "ctrl", Released));
        assert!(!t.is_down("ctrl"));
        assert!(t.process(RIGHT_CTRL, "ctrl", Pressed));
    }
}
