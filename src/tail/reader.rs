use super::budget::TimeoutBudget;
use super::TailOptions;
use crate::dev_trace;
use crate::document::RecordDecoder;
use crate::errors::{DbError, DecodeError};
use crate::query::{CursorOptions, QueryDescriptor};
use crate::store::{CappedStore, ReadHandle};
use crate::types::{ID_FIELD, ResumeToken};
use crate::utils::logger::TAIL_TARGET;
use std::time::Duration;

/// Where the reader is in its open / pull / reopen cycle.
///
/// Yielding a record is the transient step between two `Pulling`s and has no state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Starting,
    Pulling,
    Reopen,
    Expired,
    Terminated,
}

/// Lazy, blocking sequence of decoded records from a capped collection.
///
/// Holds at most one open read handle. When the handle is exhausted it is closed and a
/// new one is opened with the filter narrowed to records after the last delivered `_id`.
/// Dropping the `Tail` closes whatever handle is open.
///
/// The collection should hold at least one record before tailing starts. Until a record
/// has been delivered there is no position to resume from, so a handle that dies is
/// reopened with the original query; without a timeout that repeats indefinitely.
pub struct Tail<S: CappedStore, D: RecordDecoder> {
    store: S,
    collection: String,
    query: QueryDescriptor,
    decoder: D,
    handle: Option<S::Handle>,
    state: TailState,
    token: Option<ResumeToken>,
    budget: Option<TimeoutBudget>,
    opens: u64,
}

impl<S: CappedStore, D: RecordDecoder> std::fmt::Debug for Tail<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tail")
            .field("collection", &self.collection)
            .field("state", &self.state)
            .field("token", &self.token)
            .field("budget", &self.budget)
            .field("opens", &self.opens)
            .finish_non_exhaustive()
    }
}

impl<S: CappedStore, D: RecordDecoder> Tail<S, D> {
    /// Check that `collection` is capped and prepare to tail it. No handle is opened yet.
    ///
    /// The query's cursor is forced tailable with await-data; its wait window is kept.
    ///
    /// # Errors
    /// `NotCapped` if the collection is not capped; store errors from the check as-is.
    pub fn new(
        store: S,
        collection: &str,
        query: QueryDescriptor,
        decoder: D,
        options: &TailOptions,
    ) -> Result<Self, DbError> {
        if !store.is_capped(collection)? {
            log::warn!(target: TAIL_TARGET, "refusing to tail non-capped collection {collection}");
            return Err(DbError::NotCapped(collection.to_string()));
        }
        let cursor = CursorOptions {
            tailable: true,
            await_data: true,
            ..query.options().clone()
        };
        let query = query.with_options(cursor);
        log::debug!(target: TAIL_TARGET, "tail {collection} timeout={:?}", options.timeout);
        Ok(Self {
            store,
            collection: collection.to_string(),
            query,
            decoder,
            handle: None,
            state: TailState::Starting,
            token: None,
            budget: options.timeout.and_then(TimeoutBudget::new),
            opens: 0,
        })
    }

    #[must_use]
    pub const fn state(&self) -> TailState {
        self.state
    }

    /// Identifier of the last delivered record.
    #[must_use]
    pub const fn resume_token(&self) -> Option<&ResumeToken> {
        self.token.as_ref()
    }

    /// Descriptor the next (re)open will use.
    #[must_use]
    pub const fn query(&self) -> &QueryDescriptor {
        &self.query
    }

    /// How many read handles have been opened so far.
    #[must_use]
    pub const fn opens(&self) -> u64 {
        self.opens
    }

    /// Reopens after the first open.
    #[must_use]
    pub const fn reopen_count(&self) -> u64 {
        self.opens.saturating_sub(1)
    }

    #[must_use]
    pub fn remaining_budget(&self) -> Option<Duration> {
        self.budget.as_ref().map(TimeoutBudget::remaining)
    }

    #[must_use]
    pub const fn has_open_handle(&self) -> bool {
        self.handle.is_some()
    }

    fn close_handle(&mut self) {
        if let Some(mut h) = self.handle.take() {
            h.close();
        }
    }

    fn terminate(&mut self) {
        self.close_handle();
        self.state = TailState::Terminated;
    }

    /// Charge the budget; true when it ran out.
    fn charge(&mut self) -> bool {
        self.budget.as_mut().is_some_and(TimeoutBudget::charge)
    }

    fn open(&mut self) -> Result<(), DbError> {
        let handle = self.store.open_tailable(&self.collection, &self.query)?;
        self.handle = Some(handle);
        self.opens += 1;
        if let Some(b) = self.budget.as_mut() {
            b.rebase();
        }
        dev_trace!("tail {} open #{} after {:?}", self.collection, self.opens, self.token);
        Ok(())
    }

    fn reopen(&mut self) {
        self.close_handle();
        if let Some(token) = &self.token {
            self.query = self.query.resume_after(token);
        } else {
            // Nothing delivered yet, typically an empty collection. Reopen unchanged, but
            // keep charging so a bounded tail still ends.
            if self.opens == 1 {
                log::warn!(
                    target: TAIL_TARGET,
                    "handle on {} died before any record was delivered; is the collection empty?",
                    self.collection
                );
            }
            if self.charge() {
                self.state = TailState::Expired;
                return;
            }
        }
        dev_trace!("tail {} reopen after {:?}", self.collection, self.token);
        self.state = TailState::Starting;
    }

    fn deliver(&mut self, raw: &bson::Document) -> Result<D::Output, DbError> {
        let id = raw
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| DecodeError::new("record has no _id to resume from", raw))?;
        let out = self.decoder.decode(raw)?;
        self.token = Some(ResumeToken(id));
        self.state = if self.charge() { TailState::Expired } else { TailState::Pulling };
        Ok(out)
    }
}

impl<S: CappedStore, D: RecordDecoder> Iterator for Tail<S, D> {
    type Item = Result<D::Output, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                TailState::Starting => {
                    if let Err(e) = self.open() {
                        log::error!(target: TAIL_TARGET, "open on {} failed: {e}", self.collection);
                        self.terminate();
                        return Some(Err(e));
                    }
                    self.state = TailState::Pulling;
                }
                TailState::Pulling => {
                    let Some(handle) = self.handle.as_mut() else {
                        self.state = TailState::Starting;
                        continue;
                    };
                    match handle.try_next() {
                        Ok(Some(raw)) => {
                            let item = self.deliver(&raw);
                            if let Err(e) = &item {
                                log::error!(
                                    target: TAIL_TARGET,
                                    "tail {} stopped: {e}",
                                    self.collection
                                );
                                self.terminate();
                            }
                            return Some(item);
                        }
                        Ok(None) if handle.is_alive() => {
                            if self.charge() {
                                self.state = TailState::Expired;
                            }
                        }
                        Ok(None) => self.state = TailState::Reopen,
                        Err(e) => {
                            log::error!(
                                target: TAIL_TARGET,
                                "pull on {} failed: {e}",
                                self.collection
                            );
                            self.terminate();
                            return Some(Err(e));
                        }
                    }
                }
                TailState::Reopen => self.reopen(),
                TailState::Expired => {
                    dev_trace!("tail {} expired", self.collection);
                    log::debug!(target: TAIL_TARGET, "tail {} timed out", self.collection);
                    self.terminate();
                    return None;
                }
                TailState::Terminated => return None,
            }
        }
    }
}

impl<S: CappedStore, D: RecordDecoder> Drop for Tail<S, D> {
    fn drop(&mut self) {
        self.close_handle();
    }
}
