pub mod docx;
mod error;
pub mod export;
pub mod markup;
pub mod model;
pub mod rewrite;
pub mod session;

pub use docx::LoadedDocument;
pub use error::Error;
pub use model::{Alignment, Color, Extraction, ParagraphRecord, RunStyle};
pub use rewrite::{EndpointConfig, PromptMode, Rewriter};
pub use session::{Scratchpad, Session, SessionState};

use std::path::Path;

/// Rewrites every paragraph of `input` and writes the result to `output`.
/// Paragraphs whose rewrite fails are exported with their original text.
pub fn humanize_docx(
    input: &Path,
    output: &Path,
    endpoint: EndpointConfig,
    mode: PromptMode,
) -> Result<(), Error> {
    let mut session = Session::new();
    session.set_endpoint(endpoint);
    session.upload(&std::fs::read(input)?)?;
    let rewriter = session.rewriter()?;
    session.rewrite_all(&rewriter, mode)?;
    let bytes = session.export()?;
    std::fs::write(output, bytes).map_err(Error::Io)
}
