//! Async iterator that drains a paged backend.

use log::debug;
use log::warn;

use super::FetchParams;
use super::PageRequest;
use super::PagedSource;
use crate::error::ConfigError;
use crate::error::Error;
use crate::model::Record;

/// Async iterator that yields successive pages of a collection.
///
/// Requests offsets `0, limit, 2 * limit, ...` and stops after the first
/// page that comes back shorter than `limit` (an empty page included).
///
/// # Example
///
/// ```ignore
/// let mut pages = Pages::new(&source, &FetchParams::table("students"));
///
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("{} rows", page.len());
/// }
/// ```
pub struct Pages<'a, S: PagedSource + ?Sized> {
    source: &'a S,
    params: &'a FetchParams,
    limit: usize,
    offset: usize,
    done: bool,
}

impl<'a, S: PagedSource + ?Sized> Pages<'a, S> {
    /// Creates an iterator using the source's page size.
    pub fn new(source: &'a S, params: &'a FetchParams) -> Self {
        Self {
            source,
            params,
            limit: source.page_size(),
            offset: 0,
            done: false,
        }
    }

    /// Fetches the next page of results.
    ///
    /// Returns `None` once the collection is exhausted or after an error.
    pub async fn next(&mut self) -> Option<Result<Vec<Record>, Error>> {
        if self.done {
            return None;
        }
        if self.limit == 0 {
            self.done = true;
            return Some(Err(ConfigError::ZeroPageSize.into()));
        }

        let request = PageRequest {
            limit: self.limit,
            offset: self.offset,
        };

        match self.source.fetch_page(self.params, request).await {
            Ok(page) => {
                debug!(
                    "fetched {} rows of {} at offset {}",
                    page.len(),
                    self.params.table,
                    self.offset
                );
                if page.len() < self.limit {
                    self.done = true;
                }
                self.offset += page.len();
                Some(Ok(page))
            }
            Err(e) => {
                warn!(
                    "page fetch of {} at offset {} failed: {}",
                    self.params.table, self.offset, e
                );
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Concatenates every page into one collection.
    ///
    /// A failed page discards everything fetched so far.
    pub async fn drain(mut self) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();
        while let Some(page) = self.next().await {
            records.extend(page?);
        }
        Ok(records)
    }
}
