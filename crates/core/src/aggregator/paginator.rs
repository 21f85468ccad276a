//! Cursor-following search pagination for a single office.

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, info};

use crate::zendesk::{RawTicket, ZendeskApi};

use super::PaginationError;

/// Where the next request goes.
struct Cursor {
    url: Option<String>,
    fetched: u32,
}

/// Pages through the Zendesk search endpoint for one office code.
///
/// Results are the unfiltered superset returned by Zendesk's free-text
/// `fieldvalue:` search; callers must apply `TicketFilter` afterwards.
pub struct TicketPaginator<'a> {
    api: &'a dyn ZendeskApi,
    max_pages: u32,
}

impl<'a> TicketPaginator<'a> {
    pub fn new(api: &'a dyn ZendeskApi, max_pages: u32) -> Self {
        Self { api, max_pages }
    }

    /// Lazily fetch pages, one request per item, until `next_page` runs out.
    ///
    /// Each call starts from the first page again.
    pub fn pages(
        &self,
        office_id: &str,
    ) -> impl Stream<Item = Result<Vec<RawTicket>, PaginationError>> + Send + 'a {
        let api = self.api;
        let max_pages = self.max_pages;
        let first = Cursor {
            url: Some(api.search_url(office_id)),
            fetched: 0,
        };

        stream::try_unfold(first, move |cursor| async move {
            let Some(url) = cursor.url else {
                return Ok(None);
            };
            if cursor.fetched >= max_pages {
                return Err(PaginationError::PageLimitExceeded(max_pages));
            }

            let page_number = cursor.fetched + 1;
            let page = api
                .fetch_search_page(&url)
                .await
                .map_err(|source| PaginationError::Remote {
                    page: page_number,
                    source,
                })?;

            let next = match page.next_cursor() {
                Some(next) if next == url => return Err(PaginationError::CursorLoop(url)),
                Some(next) => Some(next.to_string()),
                None => None,
            };

            debug!(
                page = page_number,
                results = page.results.len(),
                has_next = next.is_some(),
                "Fetched search page"
            );

            Ok(Some((
                page.results,
                Cursor {
                    url: next,
                    fetched: page_number,
                },
            )))
        })
    }

    /// Fetch every page for `office_id` and concatenate the results in order.
    /// Any failed page discards everything collected so far.
    pub async fn search(&self, office_id: &str) -> Result<Vec<RawTicket>, PaginationError> {
        let tickets: Vec<RawTicket> = self.pages(office_id).try_concat().await?;
        info!(office_id, hits = tickets.len(), "Office search complete");
        Ok(tickets)
    }
}
