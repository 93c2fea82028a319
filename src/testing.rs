//! In-process stand-ins for the OS boundary, used by unit tests.

use crate::error::{ExpanderError, Result};
use crate::events::{KeyCode, KeyEvent, KeyState, WindowInfo};
use crate::mappings::KeyNameToEvdevCode;
use crate::services::injector::{ClipboardAccess, ClipboardImage, PasteSimulator};
use crate::services::input_hook::{InputHook, KeyHandler, Subscription};
use crate::services::selection::{CancelReason, Notice, SelectionSession, SelectionUi};
use crate::services::window_tracker::WindowBackend;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Опрос условия с шагом 5 мс; паника через 3 секунды
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(Instant::now() < deadline, "условие не выполнено за 3 секунды");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Перехват клавиатуры, события которого подаёт сам тест
#[derive(Default)]
pub struct ManualInputHook {
    handler: Arc<Mutex<Option<KeyHandler>>>,
    subscribes: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl ManualInputHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: &str) {
        self.emit(key, KeyState::Pressed);
    }

    pub fn release(&self, key: &str) {
        self.emit(key, KeyState::Released);
    }

    pub fn repeat(&self, key: &str) {
        self.emit(key, KeyState::Repeat);
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn has_subscriber(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Следующие подписки завершатся ошибкой `HookUnavailable`
    pub fn fail_subscribe(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }

    fn emit(&self, key: &str, state: KeyState) {
        let code = KeyNameToEvdevCode::translate(key).expect("известная клавиша");
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(&KeyEvent::new(KeyCode::new(code), state, "manual".to_string()));
        }
    }
}

impl InputHook for ManualInputHook {
    fn subscribe(&self, handler: KeyHandler) -> Result<Subscription> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(ExpanderError::HookUnavailable(reason));
        }

        self.subscribes.fetch_add(1, Ordering::SeqCst);
        *self.handler.lock() = Some(handler);

        let slot = self.handler.clone();
        Ok(Subscription::new(move || {
            slot.lock().take();
        }))
    }
}

/// Окно с фокусом задаётся тестом; `None` означает сбой запроса
pub struct FakeWindowBackend {
    name: &'static str,
    window: Mutex<Option<WindowInfo>>,
    fail_activation: AtomicBool,
    activations: Mutex<Vec<WindowInfo>>,
}

impl FakeWindowBackend {
    pub fn showing(name: &'static str, window: WindowInfo) -> Self {
        Self {
            name,
            window: Mutex::new(Some(window)),
            fail_activation: AtomicBool::new(false),
            activations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            window: Mutex::new(None),
            fail_activation: AtomicBool::new(false),
            activations: Mutex::new(Vec::new()),
        }
    }

    pub fn set_window(&self, window: Option<WindowInfo>) {
        *self.window.lock() = window;
    }

    /// Окно "закрыто": активация не находит его
    pub fn fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    pub fn activations(&self) -> Vec<WindowInfo> {
        self.activations.lock().clone()
    }
}

impl WindowBackend for FakeWindowBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn active_window(&self) -> Result<WindowInfo> {
        self.window
            .lock()
            .clone()
            .ok_or_else(|| ExpanderError::WindowLookupFailed(format!("{}: нет окна", self.name)))
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(ExpanderError::WindowLookupFailed(format!("окно {} закрыто", window)));
        }
        self.activations.lock().push(window.clone());
        Ok(())
    }
}

/// Буфер обмена в памяти с журналом записей и управляемыми сбоями
pub struct FakeClipboard {
    text: Mutex<Option<String>>,
    image: Mutex<Option<ClipboardImage>>,
    writes: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeClipboard {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            text: Mutex::new(initial.map(str::to_string)),
            image: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.text.lock().clone()
    }

    /// Положить в буфер изображение вместо текста
    pub fn set_image(&self, image: ClipboardImage) {
        *self.text.lock() = None;
        *self.image.lock() = Some(image);
    }

    pub fn image(&self) -> Option<ClipboardImage> {
        self.image.lock().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ClipboardAccess for FakeClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ExpanderError::ClipboardAccessFailed("чтение запрещено".to_string()));
        }
        Ok(self.content())
    }

    fn write_text(&self, text: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExpanderError::ClipboardAccessFailed("запись запрещена".to_string()));
        }
        self.writes.lock().push(text.to_string());
        *self.image.lock() = None;
        *self.text.lock() = Some(text.to_string());
        Ok(())
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ExpanderError::ClipboardAccessFailed("чтение запрещено".to_string()));
        }
        Ok(self.image())
    }

    fn write_image(&self, image: &ClipboardImage) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExpanderError::ClipboardAccessFailed("запись запрещена".to_string()));
        }
        self.set_image(image.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExpanderError::ClipboardAccessFailed("очистка запрещена".to_string()));
        }
        *self.text.lock() = None;
        *self.image.lock() = None;
        Ok(())
    }
}

/// Вставка, запоминающая содержимое буфера в момент нажатия
pub struct FakePaste {
    clipboard: Arc<FakeClipboard>,
    pasted: Mutex<Vec<Option<String>>>,
    fail: AtomicBool,
}

impl FakePaste {
    pub fn new(clipboard: Arc<FakeClipboard>) -> Self {
        Self {
            clipboard,
            pasted: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn pasted(&self) -> Vec<Option<String>> {
        self.pasted.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PasteSimulator for FakePaste {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn simulate_paste(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExpanderError::InjectionFailed("виртуальная клавиатура недоступна".to_string()));
        }
        self.pasted.lock().push(self.clipboard.content());
        Ok(())
    }
}

/// Действие пользователя для очередного показа выбора
pub enum SelectorScript {
    Choose { filter: Option<String>, index: usize },
    ChooseAfter { delay: Duration, index: usize },
    Cancel,
    /// Меню висит, пока результат не перестанут ждать
    Hold,
}

/// UI выбора по сценарию; без сценария меню закрывается
#[derive(Default)]
pub struct ScriptedSelector {
    scripts: Mutex<VecDeque<SelectorScript>>,
    presented: Mutex<Vec<usize>>,
    filtered: Mutex<Vec<usize>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: SelectorScript) {
        self.scripts.lock().push_back(script);
    }

    /// Число кандидатов в каждом показе
    pub fn presented(&self) -> Vec<usize> {
        self.presented.lock().clone()
    }

    /// Число кандидатов после каждого изменения фильтра
    pub fn filtered(&self) -> Vec<usize> {
        self.filtered.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

#[async_trait::async_trait]
impl SelectionUi for ScriptedSelector {
    fn present(&self, session: SelectionSession) {
        let mut session = session;
        self.presented.lock().push(session.candidates().len());

        let script = self.scripts.lock().pop_front();
        match script {
            None => drop(session),
            Some(SelectorScript::Choose { filter, index }) => {
                if let Some(filter) = filter {
                    let visible = session.set_filter(&filter);
                    self.filtered.lock().push(visible.len());
                }
                session.choose(index);
            }
            Some(SelectorScript::ChooseAfter { delay, index }) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    session.choose(index);
                });
            }
            Some(SelectorScript::Cancel) => session.cancel(CancelReason::Escape),
            Some(SelectorScript::Hold) => {
                tokio::spawn(async move {
                    session.closed().await;
                });
            }
        }
    }

    async fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
