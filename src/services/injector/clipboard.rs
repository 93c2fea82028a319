use crate::error::{ExpanderError, Result};
use crate::expander_error;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// Растровое изображение в буфере обмена: RGBA, по 4 байта на пиксель
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

/// Содержимое буфера обмена до вставки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardSnapshot {
    Text(String),
    Image(ClipboardImage),
    Empty,
}

/// Системный буфер обмена: текст и изображения
pub trait ClipboardAccess: Send + Sync {
    /// `Ok(None)`, если буфер пуст или содержит не текст
    fn read_text(&self) -> Result<Option<String>>;

    fn write_text(&self, text: &str) -> Result<()>;

    /// `Ok(None)`, если в буфере нет изображения
    fn read_image(&self) -> Result<Option<ClipboardImage>>;

    fn write_image(&self, image: &ClipboardImage) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Сначала текст, затем изображение
    fn snapshot(&self) -> Result<ClipboardSnapshot> {
        if let Some(text) = self.read_text()? {
            return Ok(ClipboardSnapshot::Text(text));
        }
        match self.read_image()? {
            Some(image) => Ok(ClipboardSnapshot::Image(image)),
            None => Ok(ClipboardSnapshot::Empty),
        }
    }

    /// Вернуть снимок; пустой снимок очищает буфер
    fn restore(&self, snapshot: &ClipboardSnapshot) -> Result<()> {
        match snapshot {
            ClipboardSnapshot::Text(text) => self.write_text(text),
            ClipboardSnapshot::Image(image) => self.write_image(image),
            ClipboardSnapshot::Empty => self.clear(),
        }
    }
}

pub fn create_clipboard(dry_run: bool) -> Arc<dyn ClipboardAccess> {
    if dry_run {
        Arc::new(InMemoryClipboard::default())
    } else {
        Arc::new(ArboardClipboard::new())
    }
}

/// Буфер обмена через arboard.
///
/// На X11 содержимое принадлежит процессу-владельцу, поэтому дескриптор
/// живёт всё время работы. Создаётся при первом обращении, чтобы запуск
/// без доступного дисплея не был фатальным.
pub struct ArboardClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl ArboardClipboard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    fn with_clipboard<T>(&self, op: impl FnOnce(&mut arboard::Clipboard) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.lock();
        if guard.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| {
                expander_error!(clipboard, "буфер обмена недоступен: {}", e)
            })?;
            info!("Подключение к буферу обмена установлено");
            *guard = Some(clipboard);
        }

        match guard.as_mut() {
            Some(clipboard) => op(clipboard),
            None => Err(ExpanderError::ClipboardAccessFailed("буфер обмена недоступен".to_string())),
        }
    }
}

impl ClipboardAccess for ArboardClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        self.with_clipboard(|clipboard| match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("В буфере обмена нет текста");
                Ok(None)
            }
            Err(e) => Err(expander_error!(clipboard, "чтение: {}", e)),
        })
    }

    fn write_text(&self, text: &str) -> Result<()> {
        self.with_clipboard(|clipboard| {
            clipboard
                .set_text(text.to_owned())
                .map_err(|e| expander_error!(clipboard, "запись: {}", e))
        })
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>> {
        self.with_clipboard(|clipboard| match clipboard.get_image() {
            Ok(image) => Ok(Some(ClipboardImage {
                width: image.width,
                height: image.height,
                bytes: image.bytes.into_owned(),
            })),
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("В буфере обмена нет изображения");
                Ok(None)
            }
            Err(e) => Err(expander_error!(clipboard, "чтение изображения: {}", e)),
        })
    }

    fn write_image(&self, image: &ClipboardImage) -> Result<()> {
        let data = arboard::ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Borrowed(image.bytes.as_slice()),
        };
        self.with_clipboard(|clipboard| {
            clipboard
                .set_image(data)
                .map_err(|e| expander_error!(clipboard, "запись изображения: {}", e))
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_clipboard(|clipboard| {
            clipboard
                .clear()
                .map_err(|e| expander_error!(clipboard, "очистка: {}", e))
        })
    }
}

/// Буфер в памяти процесса для dry-run
pub struct InMemoryClipboard {
    content: Mutex<ClipboardSnapshot>,
}

impl Default for InMemoryClipboard {
    fn default() -> Self {
        Self {
            content: Mutex::new(ClipboardSnapshot::Empty),
        }
    }
}

impl ClipboardAccess for InMemoryClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        match &*self.content.lock() {
            ClipboardSnapshot::Text(text) => Ok(Some(text.clone())),
            _ => Ok(None),
        }
    }

    fn write_text(&self, text: &str) -> Result<()> {
        *self.content.lock() = ClipboardSnapshot::Text(text.to_string());
        Ok(())
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>> {
        match &*self.content.lock() {
            ClipboardSnapshot::Image(image) => Ok(Some(image.clone())),
            _ => Ok(None),
        }
    }

    fn write_image(&self, image: &ClipboardImage) -> Result<()> {
        *self.content.lock() = ClipboardSnapshot::Image(image.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.content.lock() = ClipboardSnapshot::Empty;
        Ok(())
    }
}
