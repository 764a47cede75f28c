use crate::fetch::{Fetch, FetchState, RequestOptions, Transport};
use crate::StoreError;
use futures_signals::signal::{MutableSignalCloned, SignalStream};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type TargetBuilder = Arc<dyn Fn(u32, Option<u32>) -> String + Send + Sync>;

/// Where a paginated fetch gets its request target from.
#[derive(Clone)]
pub enum PageTarget {
    /// A base URL; page and limit are appended as query parameters.
    Url(String),
    /// A function of `(page, limit)` producing the target directly.
    Build(TargetBuilder),
}

impl PageTarget {
    pub fn build<F>(builder: F) -> Self
    where
        F: Fn(u32, Option<u32>) -> String + Send + Sync + 'static,
    {
        PageTarget::Build(Arc::new(builder))
    }

    pub fn resolve(&self, page: u32, options: &PaginatedOptions) -> String {
        match self {
            PageTarget::Url(base) => {
                let mut params = vec![(options.page_var_name.as_str(), page)];
                if let Some(limit) = options.limit {
                    params.push((options.limit_var_name.as_str(), limit));
                }
                append_query(base, &params)
            }
            PageTarget::Build(builder) => builder(page, options.limit),
        }
    }
}

impl From<&str> for PageTarget {
    fn from(url: &str) -> Self {
        PageTarget::Url(url.to_string())
    }
}

impl From<String> for PageTarget {
    fn from(url: String) -> Self {
        PageTarget::Url(url)
    }
}

impl fmt::Debug for PageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageTarget::Url(url) => f.debug_tuple("Url").field(url).finish(),
            PageTarget::Build(_) => f.write_str("Build(..)"),
        }
    }
}

fn append_query(base: &str, params: &[(&str, u32)]) -> String {
    let (path, fragment) = match base.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (base, None),
    };
    let mut url = path.to_string();
    for (name, value) in params {
        let separator = if !url.contains('?') {
            "?"
        } else if url.ends_with('?') || url.ends_with('&') {
            ""
        } else {
            "&"
        };
        url.push_str(&format!("{separator}{name}={value}"));
    }
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Configuration of a [`PaginatedFetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedOptions {
    /// Query parameter carrying the page number.
    pub page_var_name: String,
    /// Query parameter carrying the page size.
    pub limit_var_name: String,
    pub page_start: u32,
    /// Lowest reachable page; defaults to `page_start`.
    pub min_page: Option<u32>,
    pub limit: Option<u32>,
    pub request: RequestOptions,
}

impl Default for PaginatedOptions {
    fn default() -> Self {
        PaginatedOptions {
            page_var_name: "page".to_string(),
            limit_var_name: "limit".to_string(),
            page_start: 0,
            min_page: None,
            limit: None,
            request: RequestOptions::default(),
        }
    }
}

impl PaginatedOptions {
    pub fn page_start(self, page_start: u32) -> Self {
        PaginatedOptions { page_start, ..self }
    }

    pub fn min_page(self, min_page: u32) -> Self {
        PaginatedOptions {
            min_page: Some(min_page),
            ..self
        }
    }

    pub fn limit(self, limit: u32) -> Self {
        PaginatedOptions {
            limit: Some(limit),
            ..self
        }
    }

    pub fn page_var_name(self, name: impl Into<String>) -> Self {
        PaginatedOptions {
            page_var_name: name.into(),
            ..self
        }
    }

    pub fn limit_var_name(self, name: impl Into<String>) -> Self {
        PaginatedOptions {
            limit_var_name: name.into(),
            ..self
        }
    }

    pub fn request(self, request: RequestOptions) -> Self {
        PaginatedOptions { request, ..self }
    }

    pub fn floor(&self) -> u32 {
        self.min_page.unwrap_or(self.page_start)
    }
}

/// A [`Fetch`] whose target follows a page counter.
///
/// The page never drops below [`PaginatedOptions::floor`]; moving to another
/// page recomputes the target and so triggers a new request.
pub struct PaginatedFetch {
    fetch: Fetch,
    target: PageTarget,
    options: PaginatedOptions,
    page: Mutex<u32>,
}

impl PaginatedFetch {
    pub fn new(
        transport: Arc<dyn Transport>,
        target: impl Into<PageTarget>,
        options: PaginatedOptions,
    ) -> Self {
        let target = target.into();
        let page = options.page_start.max(options.floor());
        let fetch = Fetch::new(
            transport,
            target.resolve(page, &options),
            options.request.clone(),
        );
        PaginatedFetch {
            fetch,
            target,
            options,
            page: Mutex::new(page),
        }
    }

    pub fn page(&self) -> u32 {
        *self.page.lock()
    }

    pub fn options(&self) -> &PaginatedOptions {
        &self.options
    }

    pub fn next_page(&self) {
        let mut page = self.page.lock();
        let next = page.saturating_add(1);
        self.go_to(&mut page, next);
    }

    /// Steps back one page; a no-op on the lowest page.
    pub fn prev_page(&self) {
        let mut page = self.page.lock();
        if *page <= self.options.floor() {
            trace!(page = *page, "already on the first page");
            return;
        }
        let prev = *page - 1;
        self.go_to(&mut page, prev);
    }

    /// Jumps to `page`, clamped to the lowest page.
    pub fn set_page(&self, page: u32) {
        let mut current = self.page.lock();
        self.go_to(&mut current, page.max(self.options.floor()));
    }

    fn go_to(&self, current: &mut u32, page: u32) {
        *current = page;
        let target = self.target.resolve(page, &self.options);
        debug!(page, %target, "changing page");
        self.fetch.set_target(target);
    }

    pub fn refetch(&self) {
        self.fetch.refetch();
    }

    pub fn fetch(&self) -> &Fetch {
        &self.fetch
    }

    pub fn state(&self) -> FetchState {
        self.fetch.state()
    }

    pub async fn await_state(&self) -> Result<FetchState, StoreError> {
        self.fetch.await_state().await
    }

    pub async fn settled(&self) -> Result<FetchState, StoreError> {
        self.fetch.settled().await
    }

    pub fn to_signal(&self) -> MutableSignalCloned<FetchState> {
        self.fetch.to_signal()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<FetchState>> {
        self.fetch.to_stream()
    }
}

impl fmt::Debug for PaginatedFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedFetch")
            .field("page", &self.page())
            .field("target", &self.target)
            .field("fetch", &self.fetch)
            .finish()
    }
}
