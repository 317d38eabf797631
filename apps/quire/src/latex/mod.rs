// LaTeX document pipeline: escaping, placeholder templates, compile runner, artifacts.
// Handlers render a named template with user data, then hand the source to a
// `DocumentCompiler`, which owns process spawning and workspace cleanup.

pub mod artifacts;
pub mod compiler;
pub mod escape;
pub mod handlers;
pub mod store;
pub mod template;

pub use artifacts::ArtifactStore;
pub use compiler::{CompileError, CompilerSettings, DocumentCompiler, LatexCompiler};
pub use escape::escape_html;
pub use store::TemplateStore;
pub use template::{render_template, TemplateError};
