//! Load state of a remotely fetched value

/// Cached result of a backend call
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    /// Never requested, or invalidated since the last load
    #[default]
    NotLoaded,

    /// Request in flight and nothing usable cached
    Pending,

    Ready(T),

    /// Last request failed; holds the error message
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Loadable::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Loadable::Pending)
    }

    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Loadable::NotLoaded)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Store the outcome of a request
    pub fn resolve<E: std::fmt::Display>(&mut self, result: std::result::Result<T, E>) {
        *self = match result {
            Ok(value) => Loadable::Ready(value),
            Err(e) => Loadable::Failed(e.to_string()),
        };
    }
}
