use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{TextureEntry, TextureError};

enum RequestState {
    Pending,
    Ready(Rc<TextureEntry>),
    Failed(TextureError),
}

/// Shared completion handle for a texture load.
///
/// Every caller asking for the same path before the load finishes receives a
/// clone of the same handle, so they all observe the same [`TextureEntry`].
#[derive(Clone)]
pub struct TextureRequest {
    state: Rc<RefCell<RequestState>>,
}

impl TextureRequest {
    pub(crate) fn pending() -> Self {
        Self { state: Rc::new(RefCell::new(RequestState::Pending)) }
    }

    pub(crate) fn ready(entry: Rc<TextureEntry>) -> Self {
        Self { state: Rc::new(RefCell::new(RequestState::Ready(entry))) }
    }

    pub(crate) fn resolve(&self, result: Result<Rc<TextureEntry>, TextureError>) {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, RequestState::Pending) {
            return;
        }
        *state = match result {
            Ok(entry) => RequestState::Ready(entry),
            Err(err) => RequestState::Failed(err),
        };
    }

    /// `None` while the decode is in flight.
    pub fn poll(&self) -> Option<Result<Rc<TextureEntry>, TextureError>> {
        match &*self.state.borrow() {
            RequestState::Pending => None,
            RequestState::Ready(entry) => Some(Ok(Rc::clone(entry))),
            RequestState::Failed(err) => Some(Err(err.clone())),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), RequestState::Pending)
    }

    /// True when both handles observe the same load.
    pub fn same_load(&self, other: &TextureRequest) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for TextureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            RequestState::Pending => "pending".to_string(),
            RequestState::Ready(e) => format!("ready({})", e.path),
            RequestState::Failed(e) => format!("failed({e})"),
        };
        f.debug_struct("TextureRequest").field("state", &state).finish()
    }
}
