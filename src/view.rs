use crate::error::Result;

/// Renderable state of a fetched list. A failed fetch and a successful fetch
/// with no rows are different states.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Failed(String),
    Empty,
    /// Never holds an empty list.
    Ready(Vec<T>),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Loading
    }
}

impl<T> ViewState<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Ready(items)
        }
    }

    pub fn from_result(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => Self::from_items(items),
            Err(e) => ViewState::Failed(e.to_string()),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            ViewState::Ready(items) => items,
            _ => &[],
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ViewState::Empty | ViewState::Ready(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Removes the first item matching `pred`, falling back to `Empty` when the
    /// last one goes. Returns whether anything was removed.
    pub fn remove_where<F>(&mut self, pred: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let ViewState::Ready(items) = self else {
            return false;
        };
        let Some(pos) = items.iter().position(pred) else {
            return false;
        };
        items.remove(pos);
        if items.is_empty() {
            *self = ViewState::Empty;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PantryError;

    #[test]
    fn empty_and_failed_stay_distinct() {
        let empty: ViewState<u8> = ViewState::from_result(Ok(vec![]));
        let failed: ViewState<u8> =
            ViewState::from_result(Err(PantryError::Transport("connection refused".into())));
        assert_eq!(empty, ViewState::Empty);
        assert!(empty.is_loaded());
        assert_eq!(failed.error(), Some("connection refused"));
        assert!(!failed.is_loaded());
        assert!(failed.items().is_empty());
    }

    #[test]
    fn removing_the_last_item_empties_the_view() {
        let mut view = ViewState::from_items(vec![1, 2]);
        assert!(view.remove_where(|v| *v == 1));
        assert!(!view.remove_where(|v| *v == 1));
        assert!(view.remove_where(|v| *v == 2));
        assert_eq!(view, ViewState::Empty);
    }
}
