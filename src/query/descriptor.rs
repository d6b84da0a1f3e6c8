use super::types::{CmpOp, CursorOptions, Filter};
use crate::types::{ID_FIELD, ResumeToken};

/// Filter plus cursor options, as handed to a store when opening a read handle.
///
/// Immutable once built; resuming derives a new descriptor whose effective filter
/// additionally requires `_id > token`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    filter: Filter,
    options: CursorOptions,
    resume_after: Option<ResumeToken>,
}

impl QueryDescriptor {
    #[must_use]
    pub const fn new(filter: Filter, options: CursorOptions) -> Self {
        Self { filter, options, resume_after: None }
    }

    #[must_use]
    pub fn with_options(mut self, options: CursorOptions) -> Self {
        self.options = options;
        self
    }

    /// Same descriptor, but only admitting records inserted after `token`.
    /// A later token replaces an earlier one.
    #[must_use]
    pub fn resume_after(&self, token: &ResumeToken) -> Self {
        Self {
            filter: self.filter.clone(),
            options: self.options.clone(),
            resume_after: Some(token.clone()),
        }
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub const fn options(&self) -> &CursorOptions {
        &self.options
    }

    #[must_use]
    pub const fn resume_token(&self) -> Option<&ResumeToken> {
        self.resume_after.as_ref()
    }

    /// The conjunction a store must evaluate: user filter and resume bound.
    #[must_use]
    pub fn effective_filter(&self) -> Filter {
        match &self.resume_after {
            Some(t) => self.filter.clone().and(Filter::cmp(ID_FIELD, CmpOp::Gt, t.0.clone())),
            None => self.filter.clone(),
        }
    }
}
