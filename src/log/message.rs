use super::{Error, ErrorKind};
use std::{fmt::Display, io, path::Path};

pub const MISSING_VIEW: &str = "missing view";
pub const MISSING_MASTER: &str = "missing master page";
pub const CIRCULAR_MASTER: &str = "circular master page";
pub const MISSING_PARTIAL: &str = "missing partial view";
pub const MISSING_BUNDLE: &str = "missing bundle";
pub const UNKNOWN_ASSET: &str = "unknown asset type";
pub const MALFORMED_CACHE: &str = "malformed view cache";
pub const MALFORMED_OUTPUT: &str = "malformed markup";

/// Return an [`Error`] describing a view that is not known to the engine.
pub fn error_missing_view(name: &str) -> Error {
    Error::build(MISSING_VIEW)
        .with_kind(ErrorKind::NotFound)
        .with_name(name)
        .with_help(format!(
            "no view named `{name}` was loaded, is the file under a configured view root?"
        ))
}

/// Return an [`Error`] explaining that none of the configured view roots
/// resolve to a readable directory.
pub fn error_no_view_roots(roots: &[impl AsRef<Path>]) -> Error {
    let listed = roots
        .iter()
        .map(|root| format!("`{}`", root.as_ref().display()))
        .collect::<Vec<_>>()
        .join(", ");

    Error::build("no view roots")
        .with_kind(ErrorKind::Configuration)
        .with_help(if listed.is_empty() {
            "configure at least one view root".to_string()
        } else {
            format!("none of {listed} is a readable directory")
        })
}

/// Return an [`Error`] wrapping an I/O failure on the given path.
pub fn error_io(path: &Path, error: io::Error) -> Error {
    Error::build(format!("unable to access `{}`", path.display()))
        .with_kind(ErrorKind::Io)
        .with_help(error.to_string())
}

/// Return an [`Error`] describing a persisted snapshot that cannot be parsed.
pub fn error_malformed_cache(cause: impl Display) -> Error {
    Error::build(MALFORMED_CACHE)
        .with_kind(ErrorKind::MalformedCache)
        .with_help(cause.to_string())
}

/// Return an [`Error`] describing rendered markup that is not well formed.
pub fn error_malformed_output(cause: impl Display) -> Error {
    Error::build(MALFORMED_OUTPUT)
        .with_kind(ErrorKind::MalformedOutput)
        .with_help(cause.to_string())
}
