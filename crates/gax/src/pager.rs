//! Lazy iteration over paginated list RPCs.
//!
//! A [`Pager`] starts from the first response the list RPC returned and
//! fetches follow-up pages on demand by copying the continuation token into
//! a clone of the original request. Nothing else in the request changes
//! between pages.
//!
//! State machine:
//!
//! ```text
//! Fresh ──first pull──▶ Streaming ──empty token──▶ Exhausted
//!                           │
//!                           └──fetch error──▶ Failed (re-raises on every pull)
//! ```

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use tracing::debug;

use crate::call::Metadata;
use crate::errors::RpcError;

/// A list request that carries a continuation token.
pub trait PagedRequest {
    fn page_token(&self) -> &str;
    fn set_page_token(&mut self, token: String);
}

/// A list response: one page of items plus the token for the next page.
pub trait PagedResponse {
    type Item;

    /// Empty when there are no more pages.
    fn next_page_token(&self) -> &str;
    fn items(&self) -> &[Self::Item];
}

/// Bound callable issuing one list call with the given request and metadata.
pub type PageFetcher<Req, Resp> =
    Arc<dyn Fn(Req, Metadata) -> BoxFuture<'static, Result<Resp, RpcError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    /// Nothing has been pulled yet.
    Fresh,
    /// At least one page has been pulled and more may follow.
    Streaming,
    /// The last page had an empty continuation token.
    Exhausted,
    /// A follow-up fetch failed; the error is re-raised on every pull.
    Failed,
}

/// Lazily fetched sequence of pages and items.
///
/// Dereferences to the most recently fetched response, so response fields
/// other than the items are readable directly on the pager.
pub struct Pager<Req, Resp: PagedResponse> {
    fetch: PageFetcher<Req, Resp>,
    request: Req,
    latest: Resp,
    metadata: Metadata,
    state: PagerState,
    buffered: VecDeque<Resp::Item>,
    error: Option<RpcError>,
}

impl<Req, Resp> Pager<Req, Resp>
where
    Req: PagedRequest + Clone + Send + 'static,
    Resp: PagedResponse + Send + 'static,
    Resp::Item: Clone + Send + 'static,
{
    /// Wraps the first response of a list call.
    ///
    /// `metadata` is re-sent with every follow-up call.
    pub fn new(
        fetch: PageFetcher<Req, Resp>,
        request: Req,
        first: Resp,
        metadata: Metadata,
    ) -> Self {
        Self {
            fetch,
            request,
            latest: first,
            metadata,
            state: PagerState::Fresh,
            buffered: VecDeque::new(),
            error: None,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    /// The most recently fetched response.
    pub fn latest_response(&self) -> &Resp {
        &self.latest
    }

    /// Returns the next page, or `None` once the last page has been returned.
    ///
    /// Every page is returned, including empty ones.
    pub async fn next_page(&mut self) -> Result<Option<&Resp>, RpcError> {
        if self.advance().await? {
            Ok(Some(&self.latest))
        } else {
            Ok(None)
        }
    }

    /// Returns the next item, fetching pages as needed.
    ///
    /// Pages with no items but a continuation token are skipped.
    pub async fn next_item(&mut self) -> Result<Option<Resp::Item>, RpcError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            if !self.advance().await? {
                return Ok(None);
            }
        }
    }

    /// Stream of pages; ends after the first error.
    pub fn into_pages(self) -> impl Stream<Item = Result<Resp, RpcError>> + Send
    where
        Resp: Clone,
    {
        stream::unfold(Some(self), |pager| async move {
            let mut pager = pager?;
            let next = pager.next_page().await.map(|page| page.cloned());
            match next {
                Ok(Some(page)) => Some((Ok(page), Some(pager))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    /// Stream of items across all pages; ends after the first error.
    pub fn into_items(self) -> impl Stream<Item = Result<Resp::Item, RpcError>> + Send {
        stream::unfold(Some(self), |pager| async move {
            let mut pager = pager?;
            match pager.next_item().await {
                Ok(Some(item)) => Some((Ok(item), Some(pager))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    /// Moves to the next page. Returns `false` once exhausted.
    async fn advance(&mut self) -> Result<bool, RpcError> {
        match self.state {
            PagerState::Fresh => {
                self.state = PagerState::Streaming;
                self.buffered.extend(self.latest.items().iter().cloned());
                Ok(true)
            }
            PagerState::Exhausted => Ok(false),
            PagerState::Failed => Err(self
                .error
                .clone()
                .unwrap_or_else(|| RpcError::cancelled("pager failed"))),
            PagerState::Streaming => {
                let token = self.latest.next_page_token();
                if token.is_empty() {
                    self.state = PagerState::Exhausted;
                    return Ok(false);
                }
                self.request.set_page_token(token.to_string());
                debug!(page_token = %self.request.page_token(), "fetching next page");

                match (self.fetch)(self.request.clone(), self.metadata.clone()).await {
                    Ok(page) => {
                        self.buffered.extend(page.items().iter().cloned());
                        self.latest = page;
                        Ok(true)
                    }
                    Err(err) => {
                        self.state = PagerState::Failed;
                        self.error = Some(err.clone());
                        Err(err)
                    }
                }
            }
        }
    }
}

impl<Req, Resp: PagedResponse> Deref for Pager<Req, Resp> {
    type Target = Resp;

    fn deref(&self) -> &Resp {
        &self.latest
    }
}

impl<Req, Resp: PagedResponse> std::fmt::Debug for Pager<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("state", &self.state)
            .field("buffered", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use futures::{FutureExt, StreamExt};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct ListReq {
        filter: String,
        page_token: String,
    }

    impl PagedRequest for ListReq {
        fn page_token(&self) -> &str {
            &self.page_token
        }
        fn set_page_token(&mut self, token: String) {
            self.page_token = token;
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct ListResp {
        items: Vec<u32>,
        next_page_token: String,
        unreachable: Vec<String>,
    }

    impl PagedResponse for ListResp {
        type Item = u32;
        fn next_page_token(&self) -> &str {
            &self.next_page_token
        }
        fn items(&self) -> &[u32] {
            &self.items
        }
    }

    fn page(items: &[u32], token: &str) -> ListResp {
        ListResp {
            items: items.to_vec(),
            next_page_token: token.into(),
            unreachable: vec![format!("after-{token}")],
        }
    }

    type Calls = Arc<Mutex<Vec<(String, String, Option<String>)>>>;

    /// Serves pages by token and records (filter, token, x-trace) per call.
    fn fetcher(
        pages: HashMap<&'static str, Result<ListResp, RpcError>>,
    ) -> (PageFetcher<ListReq, ListResp>, Calls) {
        let calls: Calls = Arc::default();
        let recorded = calls.clone();
        let fetch: PageFetcher<ListReq, ListResp> = Arc::new(move |req: ListReq, md: Metadata| {
            recorded.lock().unwrap().push((
                req.filter.clone(),
                req.page_token.clone(),
                md.get("x-trace").map(str::to_string),
            ));
            let reply = pages
                .get(req.page_token.as_str())
                .cloned()
                .unwrap_or_else(|| Err(RpcError::new(ErrorKind::NotFound, "no page")));
            async move { reply }.boxed()
        });
        (fetch, calls)
    }

    fn request() -> ListReq {
        ListReq {
            filter: "labels.team=ml".into(),
            page_token: String::new(),
        }
    }

    fn metadata() -> Metadata {
        [("x-trace", "t1")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_items_concatenate_across_pages() {
        let (fetch, calls) = fetcher(HashMap::from([
            ("t1", Ok(page(&[3, 4], "t2"))),
            ("t2", Ok(page(&[5], ""))),
        ]));
        let pager = Pager::new(fetch, request(), page(&[1, 2], "t1"), metadata());

        let items: Vec<u32> = pager
            .into_items()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|(filter, _, trace)| filter == "labels.team=ml" && trace.as_deref() == Some("t1")));
        assert_eq!(calls[0].1, "t1");
        assert_eq!(calls[1].1, "t2");
    }

    #[tokio::test]
    async fn test_empty_first_page_yields_nothing() {
        let (fetch, calls) = fetcher(HashMap::new());
        let mut pager = Pager::new(fetch, request(), page(&[], ""), metadata());
        assert_eq!(pager.next_item().await.unwrap(), None);
        assert_eq!(pager.state(), PagerState::Exhausted);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_page_with_token_is_skipped() {
        let (fetch, _) = fetcher(HashMap::from([
            ("t1", Ok(page(&[], "t2"))),
            ("t2", Ok(page(&[9], ""))),
        ]));
        let mut pager = Pager::new(fetch, request(), page(&[], "t1"), metadata());
        assert_eq!(pager.next_item().await.unwrap(), Some(9));
        assert_eq!(pager.next_item().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pages_include_every_response() {
        let (fetch, _) = fetcher(HashMap::from([("t1", Ok(page(&[2], "")))]));
        let pager = Pager::new(fetch, request(), page(&[1], "t1"), metadata());
        let pages: Vec<ListResp> = pager.into_pages().map(|r| r.unwrap()).collect().await;
        assert_eq!(pages, vec![page(&[1], "t1"), page(&[2], "")]);
    }

    #[tokio::test]
    async fn test_deref_tracks_latest_page() {
        let (fetch, _) = fetcher(HashMap::from([("t1", Ok(page(&[2], "")))]));
        let mut pager = Pager::new(fetch, request(), page(&[1], "t1"), metadata());
        assert_eq!(pager.unreachable, vec!["after-t1".to_string()]);

        pager.next_page().await.unwrap();
        assert_eq!(pager.unreachable, vec!["after-t1".to_string()]);
        pager.next_page().await.unwrap();
        assert_eq!(pager.unreachable, vec!["after-".to_string()]);
        assert_eq!(pager.latest_response().items, vec![2]);
    }

    #[tokio::test]
    async fn test_failed_pager_reraises() {
        let (fetch, calls) = fetcher(HashMap::from([(
            "t1",
            Err(RpcError::new(ErrorKind::PermissionDenied, "denied")),
        )]));
        let mut pager = Pager::new(fetch, request(), page(&[1], "t1"), metadata());

        assert_eq!(pager.next_item().await.unwrap(), Some(1));
        let first = pager.next_item().await.unwrap_err();
        let second = pager.next_item().await.unwrap_err();
        assert_eq!(first.kind, ErrorKind::PermissionDenied);
        assert_eq!(second, first);
        assert_eq!(pager.state(), PagerState::Failed);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_item_stream_ends_after_error() {
        let (fetch, _) = fetcher(HashMap::new());
        let pager = Pager::new(fetch, request(), page(&[1], "missing"), metadata());
        let results: Vec<_> = pager.into_items().collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }
}
