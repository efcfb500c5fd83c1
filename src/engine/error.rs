use thiserror::Error;

/// Error type returned by hook and spec bodies.
///
/// Anything implementing `std::error::Error` converts into it through `?`,
/// and so do plain strings (`Err("boom".into())`).
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("No active suite, registration is only allowed inside a declaration body")]
    NoActiveSuite,
    #[error("Hooks cannot be flagged as `only`")]
    OnlyHook,
    #[error("Timeout of {0} ms reached")]
    Timeout(u64),
    #[error("{0}")]
    Thrown(String),
    #[error("Panicked: {0}")]
    Panicked(String),
    #[error("Setup of suite '{suite}' failed: {source}")]
    Setup {
        suite: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn setup(suite: &str, source: Error) -> Self {
        Error::Setup {
            suite: suite.to_owned(),
            source: Box::new(source),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl From<BodyError> for Error {
    fn from(err: BodyError) -> Self {
        Error::Thrown(err.to_string())
    }
}

/// Turns a panic payload into an error carrying its text.
pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Error {
    let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    };
    Error::Panicked(message)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_string_errors_are_coerced() {
        let thrown: BodyError = "plain string".into();
        let error = Error::from(thrown);

        assert_eq!(error.to_string(), "plain string");
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(Error::Timeout(5).to_string(), "Timeout of 5 ms reached");
    }

    #[test]
    fn test_panic_payload_is_kept() {
        let error = from_panic(Box::new("exploded"));
        assert_eq!(error.to_string(), "Panicked: exploded");

        let error = from_panic(Box::new(String::from("owned")));
        assert_eq!(error.to_string(), "Panicked: owned");
    }
}
