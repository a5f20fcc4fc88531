//! Vellum - View Compiler
//!
//! Compiles HTML templates annotated with `%%Name=Value%%` directives into
//! cached views, and renders them with `{{key}}`, `{|key|}` and `{!key!}`
//! tag placeholders.
//!
//! ```
//! use vellum::{hook::Hooks, Config, Tags, ViewEngine};
//! # let dir = tempfile::TempDir::new()?;
//! # let views = dir.path().join("Views");
//! # std::fs::create_dir_all(views.join("Shared"))?;
//! # std::fs::write(views.join("Shared/Layout.html"), "<main>%%View%%</main>")?;
//! # std::fs::write(views.join("Index.html"), "%%Master=Layout%%<h1>{|title|}</h1>")?;
//!
//! let engine = ViewEngine::new(Config::default().with_view_root(views), Hooks::default(), None)?;
//! let html = engine.load_view("Index", Some(&Tags::new().with("title", "Fish & Chips")))?;
//!
//! assert_eq!(html, "<main>\n  <h1>Fish &amp; Chips</h1>\n</main>");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod cache;
mod compile;
mod config;
mod engine;
mod log;
mod normalize;
mod region;
mod store;
mod tags;
mod template;
mod watch;

pub mod handler;
pub mod hook;
pub mod render;

pub use cache::Snapshot;
pub use compile::{scan, strip_blank_lines, DependencyGraph, ViewCompiler};
pub use config::{Config, Mode};
pub use engine::ViewEngine;
pub use handler::{Handler, Handlers, Phase};
pub use hook::Hooks;
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use normalize::normalize;
pub use region::Region;
pub use store::TemplateStore;
pub use tags::Tags;
pub use template::{CompiledView, CompiledViewSet, Template, TemplateSet};
pub use watch::{wait_until_readable, WatchHandle};
