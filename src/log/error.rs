use super::{Pointer, RED, RESET};
use crate::{log::Visual, region::Region};
use std::fmt::{Debug, Display, Formatter, Result};

/// Broad classification of an [`Error`], so callers can decide how to
/// surface it without matching on reason text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable view root, or an invalid configuration file.
    Configuration,
    /// A view with the requested name is not known to the engine.
    NotFound,
    /// A template or asset could not be read or written.
    Io,
    /// A directive or substitution handler could not rewrite the buffer.
    Handler,
    /// A persisted snapshot could not be parsed.
    MalformedCache,
    /// Rendered markup failed strict normalization.
    MalformedOutput,
}

/// Describes an error, and allows adding a contextual help text and visualization.
///
/// # Examples
///
/// Creating an [`Error`] that points at the directive that caused it:
///
/// ```
/// use vellum::{Error, ErrorKind};
///
/// let error = Error::build("missing master page")
///     .with_kind(ErrorKind::Handler)
///     .with_pointer("%%Master=Layout%% BODY", 0..17)
///     .with_name("Views/Home/Index")
///     .with_help("no view named `Shared/Layout` was loaded");
///
/// assert_eq!(error.kind(), ErrorKind::Handler);
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this output:
///
/// ```text
/// error: missing master page
///   --> Views/Home/Index:1:1
///    |
///  1 | %%Master=Layout%% BODY
///    | ^^^^^^^^^^^^^^^^^
///    |
///   = help: no view named `Shared/Layout` was loaded
/// ```
pub struct Error {
    /// Classifies the [`Error`].
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The full name of the view that the [`Error`] comes from.
    name: Option<String>,
}

impl Error {
    /// Create a new [`Error`] with the given reason text.
    ///
    /// The kind defaults to [`ErrorKind::Handler`], the remaining fields may be
    /// populated using the various methods defined on `Error`.
    pub fn build<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind: ErrorKind::Handler,
            reason: reason.into(),
            name: None,
            visual: None,
            help: None,
        }
    }

    /// Set the [`ErrorKind`].
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;

        self
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the name of the view that the [`Error`] is related to.
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.name = Some(text.into());

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate the
    /// cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] with the given source text and
    /// [`Region`].
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Return the name of the view that the error is related to.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if !f.alternate() {
            return Ok(());
        }

        match &self.visual {
            Some(visual) => visual.display(f, self.name.as_deref(), self.help.as_deref()),
            None => {
                if let Some(help) = &self.help {
                    write!(f, "\n  = help: {help}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
    }
}
