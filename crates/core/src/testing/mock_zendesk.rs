//! Mock Zendesk API for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::zendesk::{Group, RawTicket, SearchPage, ZendeskApi, ZendeskError};

use super::fixtures;

const SEARCH_PREFIX: &str = "mock://search/";

/// In-memory implementation of `ZendeskApi`.
///
/// Search results are configured per office as a list of pages; cursors are
/// `mock://search/{office}/{page}` URLs. Unknown offices answer with a single
/// empty page. Unknown group ids answer with a 404.
///
/// # Example
///
/// ```rust,ignore
/// use roundup_core::testing::{fixtures, MockZendesk};
///
/// let zendesk = MockZendesk::new();
/// zendesk.set_pages("42", vec![
///     vec![fixtures::ticket(1, "42", "2024-03-05T10:00:00Z")],
///     vec![fixtures::ticket(2, "42", "2024-03-06T10:00:00Z")],
/// ]).await;
/// zendesk.add_group(7, "Tax Support").await;
/// zendesk.fail_search("43", 1, fixtures::api_error(500)).await;
/// ```
pub struct MockZendesk {
    /// Pages of search results per office code.
    pages: RwLock<HashMap<String, Vec<Vec<RawTicket>>>>,
    /// Errors returned for a given (office, page number).
    search_failures: RwLock<HashMap<(String, u32), ZendeskError>>,
    /// Group names by id.
    groups: RwLock<HashMap<u64, String>>,
    /// Errors returned for a given group id.
    group_failures: RwLock<HashMap<u64, ZendeskError>>,
    /// Every search page URL requested, in order.
    search_requests: RwLock<Vec<String>>,
    /// Every group id requested, in order.
    group_requests: RwLock<Vec<u64>>,
    search_delay: RwLock<Option<Duration>>,
    group_delay: RwLock<Option<Duration>>,
}

impl std::fmt::Debug for MockZendesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockZendesk")
            .field("pages", &"<pages>")
            .field("groups", &"<groups>")
            .field("search_requests", &"<requests>")
            .field("group_requests", &"<requests>")
            .finish()
    }
}

impl Default for MockZendesk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockZendesk {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            search_failures: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
            group_failures: RwLock::new(HashMap::new()),
            search_requests: RwLock::new(Vec::new()),
            group_requests: RwLock::new(Vec::new()),
            search_delay: RwLock::new(None),
            group_delay: RwLock::new(None),
        }
    }

    /// Replace the search pages served for `office_id`.
    pub async fn set_pages(&self, office_id: &str, pages: Vec<Vec<RawTicket>>) {
        self.pages
            .write()
            .await
            .insert(office_id.to_string(), pages);
    }

    /// Make page `page` (1-based) of `office_id` fail with `error`.
    pub async fn fail_search(&self, office_id: &str, page: u32, error: ZendeskError) {
        self.search_failures
            .write()
            .await
            .insert((office_id.to_string(), page), error);
    }

    pub async fn add_group(&self, group_id: u64, name: &str) {
        self.groups.write().await.insert(group_id, name.to_string());
    }

    /// Make lookups of `group_id` fail until cleared.
    pub async fn fail_group(&self, group_id: u64, error: ZendeskError) {
        self.group_failures.write().await.insert(group_id, error);
    }

    pub async fn clear_group_failure(&self, group_id: u64) {
        self.group_failures.write().await.remove(&group_id);
    }

    /// Delay applied to every search page request.
    pub async fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.write().await = Some(delay);
    }

    /// Delay applied to every group request.
    pub async fn set_group_delay(&self, delay: Duration) {
        *self.group_delay.write().await = Some(delay);
    }

    /// Search page URLs requested so far.
    pub async fn search_requests(&self) -> Vec<String> {
        self.search_requests.read().await.clone()
    }

    /// Number of requests made for `group_id`.
    pub async fn group_request_count(&self, group_id: u64) -> usize {
        self.group_requests
            .read()
            .await
            .iter()
            .filter(|id| **id == group_id)
            .count()
    }

    /// Number of group requests across all ids.
    pub async fn group_request_total(&self) -> usize {
        self.group_requests.read().await.len()
    }

    fn page_url(office_id: &str, page: u32) -> String {
        format!("{}{}/{}", SEARCH_PREFIX, office_id, page)
    }

    fn parse_page_url(url: &str) -> Option<(&str, u32)> {
        let (office_id, page) = url.strip_prefix(SEARCH_PREFIX)?.rsplit_once('/')?;
        Some((office_id, page.parse().ok()?))
    }
}

#[async_trait]
impl ZendeskApi for MockZendesk {
    fn search_url(&self, office_id: &str) -> String {
        Self::page_url(office_id, 1)
    }

    async fn fetch_search_page(&self, url: &str) -> Result<SearchPage, ZendeskError> {
        self.search_requests.write().await.push(url.to_string());

        let delay = *self.search_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (office_id, page) = Self::parse_page_url(url).ok_or_else(|| ZendeskError::Parse {
            url: url.to_string(),
            message: "not a mock search URL".to_string(),
        })?;

        if let Some(error) = self
            .search_failures
            .read()
            .await
            .get(&(office_id.to_string(), page))
        {
            return Err(error.clone());
        }

        let pages = self.pages.read().await;
        let configured = pages.get(office_id).map(Vec::as_slice).unwrap_or_default();
        let results = configured
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        let next_page =
            ((page as usize) < configured.len()).then(|| Self::page_url(office_id, page + 1));

        Ok(SearchPage {
            count: Some(configured.iter().map(|p| p.len() as u64).sum()),
            results,
            next_page,
        })
    }

    async fn fetch_group(&self, group_id: u64) -> Result<Group, ZendeskError> {
        self.group_requests.write().await.push(group_id);

        let delay = *self.group_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.group_failures.read().await.get(&group_id) {
            return Err(error.clone());
        }

        match self.groups.read().await.get(&group_id) {
            Some(name) => Ok(Group {
                id: group_id,
                name: name.clone(),
            }),
            None => Err(fixtures::api_error(404)),
        }
    }
}
