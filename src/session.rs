//! Per-user session state and the handlers that act on it.
//!
//! Each handler runs to completion before the next one starts. Failures are
//! returned to the caller and also queued as user-visible messages; the
//! session always keeps its last good state.

use log::{error, info};

use crate::docx::LoadedDocument;
use crate::error::Error;
use crate::export;
use crate::model::{DEFAULT_AI_PROBABILITY, ParagraphRecord};
use crate::rewrite::{EndpointConfig, HttpTransport, PromptMode, Rewriter, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Edited,
    Exported,
}

/// Everything one user has uploaded and edited.
///
/// `paragraphs`, `modified` and `ai_probabilities` always have the same
/// length; index `i` in each refers to the same paragraph.
pub struct Session {
    document: Option<LoadedDocument>,
    paragraphs: Vec<ParagraphRecord>,
    modified: Vec<String>,
    ai_probabilities: Vec<u8>,
    state: SessionState,
    endpoint: Option<EndpointConfig>,
    messages: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            document: None,
            paragraphs: Vec::new(),
            modified: Vec::new(),
            ai_probabilities: Vec::new(),
            state: SessionState::Empty,
            endpoint: None,
            messages: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn paragraphs(&self) -> &[ParagraphRecord] {
        &self.paragraphs
    }

    pub fn modified(&self) -> &[String] {
        &self.modified
    }

    pub fn ai_probabilities(&self) -> &[u8] {
        &self.ai_probabilities
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Drains the messages queued by failed actions.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    fn report(&mut self, context: &str, e: Error) -> Error {
        error!("{context}: {e}");
        self.messages.push(format!("{context}: {e}"));
        e
    }

    pub fn set_endpoint(&mut self, endpoint: EndpointConfig) {
        self.endpoint = Some(endpoint);
    }

    /// A rewriter over the real HTTP transport for the configured endpoint.
    pub fn rewriter(&mut self) -> Result<Rewriter<HttpTransport>, Error> {
        let config = self
            .endpoint
            .clone()
            .filter(|config| !config.api_key.trim().is_empty());
        match config {
            Some(config) => Ok(Rewriter::new(config)),
            None => Err(self.report("Cannot rewrite", Error::MissingApiKey)),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index < self.paragraphs.len() {
            Ok(())
        } else {
            Err(Error::ParagraphOutOfRange { index, len: self.paragraphs.len() })
        }
    }

    /// Loads and extracts a package, replacing all paragraph state at once.
    /// On failure the previous state is left as it was.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let loaded = LoadedDocument::from_bytes(bytes).and_then(|doc| {
            let extraction = doc.extract()?;
            Ok((doc, extraction))
        });
        let (document, extraction) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return Err(self.report("Could not read the document", e)),
        };

        self.modified = extraction.texts();
        self.paragraphs = extraction.paragraphs;
        self.ai_probabilities = extraction.ai_probabilities;
        self.document = Some(document);
        self.state = SessionState::Loaded;

        info!("session loaded {} paragraphs", self.paragraphs.len());
        Ok(self.paragraphs.len())
    }

    pub fn edit(&mut self, index: usize, text: impl Into<String>) -> Result<(), Error> {
        if let Err(e) = self.check_index(index) {
            return Err(self.report("Cannot edit", e));
        }
        self.modified[index] = text.into();
        self.state = SessionState::Edited;
        Ok(())
    }

    /// Manual override of a paragraph's AI-probability, capped at 100.
    pub fn set_probability(&mut self, index: usize, probability: u8) -> Result<(), Error> {
        if let Err(e) = self.check_index(index) {
            return Err(self.report("Cannot set probability", e));
        }
        self.ai_probabilities[index] = probability.min(100);
        Ok(())
    }

    /// Discards all edits and probabilities, back to the uploaded text.
    pub fn revert_all(&mut self) {
        if self.document.is_none() {
            return;
        }
        self.modified = self.paragraphs.iter().map(|p| p.text.clone()).collect();
        self.ai_probabilities = vec![DEFAULT_AI_PROBABILITY; self.paragraphs.len()];
        self.state = SessionState::Loaded;
    }

    /// Rewrites paragraph `index` from its current text.
    ///
    /// Returns `Ok(true)` when the text was replaced and `Ok(false)` when the
    /// remote call failed; in that case the text is unchanged, a message is
    /// queued and, in graduated mode, the probability falls back to 50.
    pub fn rewrite_paragraph<T: Transport>(
        &mut self,
        rewriter: &Rewriter<T>,
        index: usize,
        mode: PromptMode,
    ) -> Result<bool, Error> {
        if self.document.is_none() {
            return Err(self.report("Cannot rewrite", Error::NoDocument));
        }
        if let Err(e) = self.check_index(index) {
            return Err(self.report("Cannot rewrite", e));
        }

        let outcome = rewriter.rewrite(&self.modified[index], mode, self.ai_probabilities[index]);
        if let Some(probability) = outcome.ai_probability {
            self.ai_probabilities[index] = probability;
        }
        match outcome.error {
            Some(e) => {
                self.messages
                    .push(format!("Paragraph {} kept unchanged: {e}", index + 1));
                Ok(false)
            }
            None => {
                self.modified[index] = outcome.text;
                self.state = SessionState::Edited;
                Ok(true)
            }
        }
    }

    /// Rewrites every paragraph, one after another. Returns how many were
    /// replaced.
    pub fn rewrite_all<T: Transport>(
        &mut self,
        rewriter: &Rewriter<T>,
        mode: PromptMode,
    ) -> Result<usize, Error> {
        if self.document.is_none() {
            return Err(self.report("Cannot rewrite", Error::NoDocument));
        }
        let mut rewritten = 0;
        for index in 0..self.paragraphs.len() {
            info!("rewriting paragraph {}/{}", index + 1, self.paragraphs.len());
            if self.rewrite_paragraph(rewriter, index, mode)? {
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    /// Package bytes for the current edits. Nothing is produced when no
    /// document is loaded or serialization fails.
    pub fn export(&mut self) -> Result<Vec<u8>, Error> {
        let Some(document) = &self.document else {
            return Err(self.report("Nothing to export", Error::NoDocument));
        };
        match export::export(document, &self.paragraphs, &self.modified) {
            Ok(bytes) => {
                self.state = SessionState::Exported;
                Ok(bytes)
            }
            Err(e) => Err(self.report("Export failed", e)),
        }
    }
}

/// Character count shown as guidance next to the free-text input.
pub const SCRATCHPAD_LIMIT: usize = 1000;

/// Free-text rewriting outside any document.
#[derive(Debug, Default, Clone)]
pub struct Scratchpad {
    pub input: String,
    output: String,
}

impl Scratchpad {
    pub fn new(input: impl Into<String>) -> Self {
        Scratchpad { input: input.into(), output: String::new() }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn char_count(&self) -> usize {
        self.input.chars().count()
    }

    pub fn over_limit(&self) -> bool {
        self.char_count() > SCRATCHPAD_LIMIT
    }

    pub fn reset(&mut self) {
        self.output.clear();
    }

    /// Rewrites the input with the fixed prompt. A missing credential or an
    /// empty input is rejected before any request. When the call fails the
    /// output shows the input unchanged and the error is returned.
    pub fn generate<T: Transport>(&mut self, rewriter: &Rewriter<T>) -> Result<&str, Error> {
        if rewriter.config().api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        if self.input.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let outcome = rewriter.rewrite(&self.input, PromptMode::Fixed, DEFAULT_AI_PROBABILITY);
        self.output = outcome.text;
        match outcome.error {
            Some(e) => Err(e),
            None => Ok(&self.output),
        }
    }
}
