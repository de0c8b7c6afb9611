//! Paged remote answers
//!
//! Some upstreams split one answer across pages. [`Pages`] walks them lazily
//! and exactly once: it stops after the first page without a continuation
//! token, or after the first error.

use crate::error::CacheResult;
use crate::remote::{Source, Throttle};
use crate::value::{AmbiguityPolicy, Value};
use std::iter::FusedIterator;

/// One page of candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<String>,

    /// Continuation token for the next page, `None` on the last page
    pub next: Option<String>,
}

/// Lazy, finite, non-restartable sequence of pages
pub struct Pages<F> {
    fetch_page: F,
    cursor: Option<String>,
    done: bool,
}

impl<F> Pages<F>
where
    F: FnMut(Option<&str>) -> CacheResult<Page>,
{
    /// Start at the first page (the fetcher gets `None` as cursor)
    pub fn new(fetch_page: F) -> Self {
        Self {
            fetch_page,
            cursor: None,
            done: false,
        }
    }

    /// Drain every remaining page into one list of candidates
    pub fn collect_items(self) -> CacheResult<Vec<String>> {
        let mut items = Vec::new();
        for page in self {
            items.extend(page?);
        }
        Ok(items)
    }
}

impl<F> Iterator for Pages<F>
where
    F: FnMut(Option<&str>) -> CacheResult<Page>,
{
    type Item = CacheResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match (self.fetch_page)(self.cursor.as_deref()) {
            Ok(page) => {
                match page.next {
                    Some(next) => self.cursor = Some(next),
                    None => self.done = true,
                }
                Some(Ok(page.items))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<F> FusedIterator for Pages<F> where F: FnMut(Option<&str>) -> CacheResult<Page> {}

/// Page-fetching function of a [`PagedSource`]: key and cursor in, page out
pub type PageFetcher = Box<dyn FnMut(&str, Option<&str>) -> CacheResult<Page>>;

/// Source that gathers candidates across every page of an answer
///
/// The adapter's throttle spaces whole answers only. Give the source its own
/// throttle with [`PagedSource::with_page_throttle`] to space the pages of one
/// answer as well.
pub struct PagedSource {
    name: String,
    fetcher: PageFetcher,
    policy: Option<AmbiguityPolicy>,
    cache_empty: bool,
    page_throttle: Option<Throttle>,
}

impl PagedSource {
    pub fn new(
        name: impl Into<String>,
        fetcher: impl FnMut(&str, Option<&str>) -> CacheResult<Page> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            fetcher: Box::new(fetcher),
            policy: None,
            cache_empty: false,
            page_throttle: None,
        }
    }

    /// Wait on `throttle` before every page request
    pub fn with_page_throttle(mut self, throttle: Throttle) -> Self {
        self.page_throttle = Some(throttle);
        self
    }

    /// Override the shape's default ambiguity policy
    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Treat an empty answer as null instead of `NotFound`
    pub fn cache_empty(mut self, cache_empty: bool) -> Self {
        self.cache_empty = cache_empty;
        self
    }
}

impl<V: Value> Source<V> for PagedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, key: &str) -> CacheResult<V> {
        let fetcher = &mut self.fetcher;
        let throttle = &mut self.page_throttle;
        let candidates = Pages::new(|cursor| {
            if let Some(throttle) = throttle.as_mut() {
                throttle.wait();
            }
            (*fetcher)(key, cursor)
        })
        .collect_items()?;
        let policy = self.policy.unwrap_or(AmbiguityPolicy::default_for(V::SHAPE));
        super::http::fold_candidates(&self.name, key, candidates, policy, self.cache_empty)
    }
}
