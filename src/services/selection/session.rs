use crate::services::expansion_store::{Catalog, Expansion};
use std::fmt;
use tokio::sync::oneshot;

/// Почему выбор завершился без результата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Пользователь явно отменил (Escape)
    Escape,
    /// UI закрыт без выбора
    Dismissed,
    /// Истекло время ожидания выбора
    Timeout,
    /// Каталог сокращений недоступен
    StoreUnavailable,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CancelReason::Escape => "отменено пользователем",
            CancelReason::Dismissed => "меню закрыто",
            CancelReason::Timeout => "истекло время ожидания",
            CancelReason::StoreUnavailable => "каталог недоступен",
        };
        f.write_str(text)
    }
}

/// Ответ UI на один показ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Chosen(Expansion),
    Cancelled(CancelReason),
}

/// Видимое подмножество каталога: регистронезависимая подстрока
/// по сокращению или тексту. Весь каталог остаётся только при пустом фильтре,
/// пробелы считаются частью подстроки.
pub fn filter_candidates(catalog: &[Expansion], filter: &str) -> Vec<Expansion> {
    let filter_lower = filter.to_lowercase();
    catalog
        .iter()
        .filter(|e| e.enabled && e.matches_filter(&filter_lower))
        .cloned()
        .collect()
}

/// Один показ выбора.
///
/// UI получает сессию целиком и завершает её ровно одним из `choose`/`cancel`.
/// Если сессия уничтожена без ответа, это считается закрытием меню.
pub struct SelectionSession {
    catalog: Catalog,
    filter: String,
    reply: Option<oneshot::Sender<SelectionResult>>,
}

impl SelectionSession {
    /// Сессия над включёнными записями каталога и приёмник её результата
    pub fn new(catalog: &[Expansion]) -> (Self, oneshot::Receiver<SelectionResult>) {
        let (reply, rx) = oneshot::channel();
        let enabled: Catalog = catalog.iter().filter(|e| e.enabled).cloned().collect();

        let session = Self {
            catalog: enabled,
            filter: String::new(),
            reply: Some(reply),
        };
        (session, rx)
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Кандидаты с учётом текущего фильтра
    pub fn candidates(&self) -> Vec<Expansion> {
        filter_candidates(&self.catalog, &self.filter)
    }

    /// Изменение фильтра пользователем; возвращает новый видимый список
    pub fn set_filter(&mut self, filter: &str) -> Vec<Expansion> {
        self.filter = filter.to_string();
        self.candidates()
    }

    /// Выбрать `index`-й видимый вариант.
    /// Индекс вне списка закрывает сессию без выбора.
    pub fn choose(self, index: usize) -> bool {
        match self.candidates().into_iter().nth(index) {
            Some(expansion) => {
                self.finish(SelectionResult::Chosen(expansion));
                true
            }
            None => {
                self.finish(SelectionResult::Cancelled(CancelReason::Dismissed));
                false
            }
        }
    }

    pub fn cancel(self, reason: CancelReason) {
        self.finish(SelectionResult::Cancelled(reason));
    }

    /// Дождаться, пока ожидающая сторона откажется от результата
    pub async fn closed(&mut self) {
        if let Some(reply) = self.reply.as_mut() {
            reply.closed().await;
        }
    }

    fn finish(mut self, result: SelectionResult) {
        if let Some(reply) = self.reply.take() {
            // Получатель мог уйти по таймауту: результат просто не нужен
            let _ = reply.send(result);
        }
    }
}

impl Drop for SelectionSession {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(SelectionResult::Cancelled(CancelReason::Dismissed));
        }
    }
}
