//! Per-session result state.
//!
//! A [`Session`] is an explicit value the caller owns and passes to the
//! display functions in [`crate::display`]. It holds at most one result:
//!
//! * a successful extraction replaces whatever was stored;
//! * a failed extraction leaves the stored result untouched and is kept only
//!   as a transient notice until the next extraction or
//!   [`Session::take_notice`].

use crate::error::ExtractionError;
use crate::output::ExtractionOutput;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct Session {
    latest: Option<ExtractionOutput>,
    notice: Option<ExtractionError>,
    extractions: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one extraction.
    ///
    /// Returns the error when the extraction failed, so the caller can show
    /// it right away.
    pub fn apply(
        &mut self,
        outcome: Result<ExtractionOutput, ExtractionError>,
    ) -> Option<&ExtractionError> {
        self.extractions += 1;
        match outcome {
            Ok(output) => {
                debug!(
                    "session: storing result #{} ({} chars)",
                    self.extractions,
                    output.latex.len()
                );
                self.latest = Some(output);
                self.notice = None;
                None
            }
            Err(e) => {
                debug!("session: keeping previous result after {}", e.kind());
                self.notice = Some(e);
                self.notice.as_ref()
            }
        }
    }

    /// The stored result, if any extraction has succeeded.
    pub fn latest(&self) -> Option<&ExtractionOutput> {
        self.latest.as_ref()
    }

    /// The stored LaTeX text, if any.
    pub fn latex(&self) -> Option<&str> {
        self.latest.as_ref().map(|o| o.latex.as_str())
    }

    /// The error from the most recent extraction, if it failed.
    pub fn notice(&self) -> Option<&ExtractionError> {
        self.notice.as_ref()
    }

    /// Consume the transient notice.
    pub fn take_notice(&mut self) -> Option<ExtractionError> {
        self.notice.take()
    }

    /// Number of extractions recorded, successful or not.
    pub fn extractions(&self) -> usize {
        self.extractions
    }

    /// Drop everything, as at session end.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
