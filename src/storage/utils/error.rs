use crate::error::Error;

/// Anything a backend call can fail with, lifted into [`Error`] so a manager
/// operation can attach its own context on top.
pub trait IntoFiledeckError {
    fn into_error(self) -> Error;
}

impl IntoFiledeckError for Error {
    fn into_error(self) -> Error {
        self
    }
}

impl IntoFiledeckError for opendal::Error {
    fn into_error(self) -> Error {
        self.into()
    }
}

impl IntoFiledeckError for std::io::Error {
    fn into_error(self) -> Error {
        self.into()
    }
}

/// Tag a failed backend call with the file operation it belonged to.
///
/// The named variant must carry a `source: Box<Error>` field:
///
/// ```ignore
/// wrap_err!(
///     backend.move_to(Namespace::Active, name, Namespace::Trash, name, true).await,
///     MoveFailed { name: name.to_string(), from: Namespace::Active, to: Namespace::Trash }
/// )?;
/// ```
#[macro_export]
macro_rules! wrap_err {
    ($expr:expr, $variant:ident { $($field:ident : $value:expr),* $(,)? }) => {{
        $expr.map_err(|e| {
            let source = $crate::storage::utils::error::IntoFiledeckError::into_error(e);
            $crate::error::Error::$variant {
                $($field: $value,)*
                source: Box::new(source),
            }
        })
    }};
}
