//! Pagination driver.

// std
use std::marker::PhantomData;
// crates.io
use futures::{Stream, StreamExt, TryStreamExt, stream};
// self
use crate::{
	_prelude::*,
	config::PaginationConfig,
	obs::{OpSpan, OpTimer, Operation},
	pagination::{PaginatedResponse, PaginationInfo, PaginationStrategy},
};

/// Traversal state of one paginated call.
///
/// Every call creates a fresh cursor; cursors are never shared or restarted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationCursor {
	offset: usize,
	page_size: usize,
	total_fetched: usize,
	limit: Option<usize>,
	last_requested: Option<usize>,
	last_returned: Option<usize>,
}
impl PaginationCursor {
	/// Starts at `offset`, requesting `page_size` items per page, stopping at `limit`.
	pub fn new(offset: usize, page_size: usize, limit: Option<usize>) -> Self {
		Self {
			offset,
			page_size: page_size.max(1),
			total_fetched: 0,
			limit,
			last_requested: None,
			last_returned: None,
		}
	}

	/// Size of the next page, or `None` once `limit` items have been fetched.
	pub fn next_page_size(&self) -> Option<usize> {
		match self.limit {
			Some(limit) => {
				let remaining = limit.saturating_sub(self.total_fetched);

				(remaining > 0).then(|| remaining.min(self.page_size))
			},
			None => Some(self.page_size),
		}
	}

	/// Records a page of `returned` items fetched with `requested` and moves past it.
	pub fn advance(&mut self, next_offset: usize, requested: usize, returned: usize) {
		self.offset = next_offset;
		self.total_fetched = self.total_fetched.saturating_add(returned);
		self.last_requested = Some(requested);
		self.last_returned = Some(returned);
	}

	/// `true` until a page comes back shorter than requested.
	pub fn has_more(&self) -> bool {
		match (self.last_requested, self.last_returned) {
			(Some(requested), Some(returned)) => returned == requested,
			_ => true,
		}
	}

	/// Offset of the next page.
	pub fn offset(&self) -> usize {
		self.offset
	}

	/// Items requested per page.
	pub fn page_size(&self) -> usize {
		self.page_size
	}

	/// Items fetched so far.
	pub fn total_fetched(&self) -> usize {
		self.total_fetched
	}

	/// Item budget of the call.
	pub fn limit(&self) -> Option<usize> {
		self.limit
	}

	/// Size requested for the most recent page.
	pub fn last_requested(&self) -> Option<usize> {
		self.last_requested
	}

	/// Items returned by the most recent page.
	pub fn last_returned(&self) -> Option<usize> {
		self.last_returned
	}
}

/// Drives a [`PaginationStrategy`] across pages.
pub struct Paginator<S, T> {
	strategy: S,
	max_total_results: Option<usize>,
	auto_paginate: bool,
	_item: PhantomData<fn() -> T>,
}
impl<S, T> Paginator<S, T>
where
	S: PaginationStrategy<T>,
	T: Send,
{
	/// Follows every page by default, without a result cap.
	pub fn new(strategy: S) -> Self {
		Self { strategy, max_total_results: None, auto_paginate: true, _item: PhantomData }
	}

	/// Applies the cap and auto-pagination switch from `config`.
	pub fn from_config(strategy: S, config: &PaginationConfig) -> Self {
		Self::new(strategy)
			.with_max_total_results(config.max_total_results)
			.with_auto_paginate(config.enable_auto_pagination)
	}

	/// Overrides whether pages are followed automatically.
	pub fn with_auto_paginate(mut self, auto_paginate: bool) -> Self {
		self.auto_paginate = auto_paginate;

		self
	}

	/// Stops accumulating once `cap` items are held; `None` disables the cap.
	pub fn with_max_total_results(mut self, cap: Option<usize>) -> Self {
		self.max_total_results = cap;

		self
	}

	/// Underlying strategy.
	pub fn strategy(&self) -> &S {
		&self.strategy
	}

	/// Whether pages are followed automatically.
	pub fn auto_paginate(&self) -> bool {
		self.auto_paginate
	}

	/// Safety cap on accumulated results.
	pub fn max_total_results(&self) -> Option<usize> {
		self.max_total_results
	}

	/// Fetches items until the collection, `limit`, or the safety cap is exhausted.
	///
	/// Without auto-pagination and without `limit`, exactly one default-sized page is
	/// fetched. The result never exceeds `limit`; the safety cap only stops further requests.
	pub async fn fetch_all(&self, limit: Option<usize>) -> Result<Vec<T>> {
		OpSpan::new(Operation::Paginate, "fetch_all")
			.instrument(self.collect(limit))
			.await
			.map(|(items, _)| items)
	}

	/// [`Paginator::fetch_all`] plus metadata describing where the result sits.
	pub async fn fetch_paginated(&self, limit: Option<usize>) -> Result<PaginatedResponse<T>> {
		let (data, cursor) = OpSpan::new(Operation::Paginate, "fetch_paginated")
			.instrument(self.collect(limit))
			.await?;
		let pagination = PaginationInfo::from_offset(
			self.strategy.initial_offset(),
			cursor.page_size(),
			cursor.last_returned().unwrap_or_default(),
			cursor.last_requested().unwrap_or_default(),
		);

		Ok(PaginatedResponse { data, pagination })
	}

	/// Streams items one page at a time until a short page arrives.
	///
	/// Pages are fetched lazily as the stream is polled. The stream ignores the
	/// auto-pagination switch and the safety cap.
	pub fn iter_pages(&self, page_size: Option<usize>) -> impl Stream<Item = Result<T>> + Send + '_ {
		let page_size = page_size
			.unwrap_or_else(|| self.strategy.page_size())
			.clamp(1, self.strategy.max_page_size().max(1));
		let cursor = PaginationCursor::new(self.strategy.initial_offset(), page_size, None);

		stream::try_unfold(Some(cursor), move |state| async move {
			let Some(mut cursor) = state.filter(PaginationCursor::has_more) else {
				return Ok(None);
			};
			let requested = cursor.page_size();
			let page = OpSpan::new(Operation::Paginate, "iter_pages")
				.instrument(self.strategy.fetch_page(cursor.offset(), requested))
				.await?;

			cursor.advance(
				self.strategy.next_offset(cursor.offset(), requested),
				requested,
				page.len(),
			);

			Ok::<_, Error>(Some((stream::iter(page).map(Ok::<T, Error>), Some(cursor))))
		})
		.try_flatten()
	}

	async fn collect(&self, limit: Option<usize>) -> Result<(Vec<T>, PaginationCursor)> {
		let mut timer = OpTimer::start(Operation::Paginate, "collect");
		let limit = match limit {
			None if !self.auto_paginate => Some(self.strategy.page_size()),
			limit => limit,
		};
		let mut cursor =
			PaginationCursor::new(self.strategy.initial_offset(), self.strategy.page_size(), limit);
		let mut items = Vec::new();

		while let Some(requested) = cursor.next_page_size() {
			let page = self.strategy.fetch_page(cursor.offset(), requested).await?;

			cursor.advance(
				self.strategy.next_offset(cursor.offset(), requested),
				requested,
				page.len(),
			);
			items.extend(page);

			if !cursor.has_more() || !self.auto_paginate {
				break;
			}
			if self.max_total_results.is_some_and(|cap| items.len() >= cap) {
				#[cfg(feature = "tracing")]
				tracing::debug!(fetched = items.len(), "Pagination stopped at the result cap.");

				break;
			}
		}

		if let Some(limit) = limit {
			items.truncate(limit);
		}

		timer.succeed();

		Ok((items, cursor))
	}
}
impl<S, T> Debug for Paginator<S, T>
where
	S: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Paginator")
			.field("strategy", &self.strategy)
			.field("max_total_results", &self.max_total_results)
			.field("auto_paginate", &self.auto_paginate)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::{Value, json};
	// self
	use super::*;
	use crate::pagination::{OffsetPaginationStrategy, PageRequest, fetch_fn};

	fn source(
		total: usize,
		calls: Arc<AtomicUsize>,
	) -> impl crate::pagination::PageFetcher {
		fetch_fn(move |request: PageRequest| {
			calls.fetch_add(1, Ordering::SeqCst);

			let end = total.min(request.offset + request.limit);
			let items = (request.offset.min(end)..end).map(|i| json!(i)).collect::<Vec<_>>();

			async move { Ok::<_, Error>(Value::Array(items)) }
		})
	}

	fn paginator(
		total: usize,
		page_size: usize,
		calls: Arc<AtomicUsize>,
	) -> Paginator<impl PaginationStrategy<usize>, usize> {
		let strategy =
			OffsetPaginationStrategy::<_, usize>::new(source(total, calls), page_size, 1_000)
			.expect("Strategy should build.");

		Paginator::new(strategy)
	}

	#[test]
	fn cursor_shrinks_the_final_page_to_the_limit() {
		let mut cursor = PaginationCursor::new(0, 100, Some(150));

		assert_eq!(cursor.next_page_size(), Some(100));

		cursor.advance(100, 100, 100);

		assert_eq!(cursor.next_page_size(), Some(50));

		cursor.advance(150, 50, 50);

		assert_eq!(cursor.next_page_size(), None);
		assert!(cursor.has_more());
	}

	#[tokio::test]
	async fn fetch_all_without_limit_concatenates_every_page() {
		let calls = Arc::new(AtomicUsize::new(0));
		let items = paginator(25, 10, calls.clone())
			.fetch_all(None)
			.await
			.expect("Pagination should succeed.");

		assert_eq!(items, (0..25).collect::<Vec<_>>());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn exact_multiple_needs_one_empty_page() {
		let calls = Arc::new(AtomicUsize::new(0));
		let items = paginator(20, 10, calls.clone())
			.fetch_all(None)
			.await
			.expect("Pagination should succeed.");

		assert_eq!(items.len(), 20);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn fetch_all_returns_exactly_the_limit() {
		let calls = Arc::new(AtomicUsize::new(0));
		let paginator = paginator(1_000, 10, calls.clone());

		assert_eq!(
			paginator.fetch_all(Some(25)).await.expect("Pagination should succeed."),
			(0..25).collect::<Vec<_>>()
		);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(
			paginator.fetch_all(Some(5_000)).await.expect("Pagination should succeed.").len(),
			1_000
		);
	}

	#[tokio::test]
	async fn disabled_auto_pagination_fetches_one_default_page() {
		let calls = Arc::new(AtomicUsize::new(0));
		let paginator = paginator(1_000, 10, calls.clone()).with_auto_paginate(false);

		assert_eq!(paginator.fetch_all(None).await.expect("Pagination should succeed.").len(), 10);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(paginator.fetch_all(Some(35)).await.expect("Pagination should succeed.").len(), 10);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn result_cap_stops_further_requests() {
		let calls = Arc::new(AtomicUsize::new(0));
		let paginator = paginator(1_000, 10, calls.clone()).with_max_total_results(Some(25));
		let items = paginator.fetch_all(None).await.expect("Pagination should succeed.");

		assert_eq!(items.len(), 30);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn has_next_tracks_whether_the_last_page_was_full() {
		let calls = Arc::new(AtomicUsize::new(0));
		let full = paginator(100, 10, calls.clone())
			.fetch_paginated(Some(20))
			.await
			.expect("Pagination should succeed.");

		assert!(full.pagination.has_next);
		assert_eq!(full.pagination.page, 1);
		assert_eq!(full.pagination.per_page, 10);
		assert!(!full.pagination.has_previous);

		let short = paginator(15, 10, calls)
			.fetch_paginated(None)
			.await
			.expect("Pagination should succeed.");

		assert_eq!(short.data.len(), 15);
		assert!(!short.pagination.has_next);
	}

	#[tokio::test]
	async fn iter_pages_is_lazy_and_finite() {
		let calls = Arc::new(AtomicUsize::new(0));
		let paginator = paginator(23, 10, calls.clone());
		let mut pages = Box::pin(paginator.iter_pages(Some(5)));

		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert_eq!(pages.try_next().await.expect("First item should load."), Some(0));
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		let rest = pages.try_collect::<Vec<_>>().await.expect("Remaining pages should load.");

		assert_eq!(rest, (1..23).collect::<Vec<_>>());
		assert_eq!(calls.load(Ordering::SeqCst), 5);
	}

	#[tokio::test]
	async fn iter_pages_surfaces_item_errors() {
		let strategy = OffsetPaginationStrategy::<_, usize>::new(
			fetch_fn(|_| async { Ok::<_, Error>(json!([1, "two"])) }),
			2,
			10,
		)
		.expect("Strategy should build.");
		let paginator = Paginator::new(strategy);
		let err = paginator
			.iter_pages(None)
			.try_collect::<Vec<_>>()
			.await
			.expect_err("A string item should fail validation.");

		assert!(matches!(err, Error::InvalidItem { index: 1, .. }));
	}
}
