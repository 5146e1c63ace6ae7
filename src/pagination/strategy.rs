//! Page decoding strategies.

// std
use std::marker::PhantomData;
// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::PaginationConfig,
	error::{ConfigError, ProtocolError},
	obs::{OpTimer, Operation},
	pagination::{PageFetcher, PageRequest},
};

/// Boxed future returned by [`PaginationStrategy::fetch_page`].
pub type PageResultFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Vec<T>>> + 'a + Send>>;

/// Fetches and decodes single pages of `T`.
pub trait PaginationStrategy<T>
where
	Self: Send + Sync,
{
	/// Page size used when the caller does not choose one.
	fn page_size(&self) -> usize;

	/// Largest page size the strategy will request.
	fn max_page_size(&self) -> usize;

	/// Offset of the first page.
	fn initial_offset(&self) -> usize;

	/// Fetches `limit` items starting at `offset`.
	fn fetch_page(&self, offset: usize, limit: usize) -> PageResultFuture<'_, T>;

	/// Offset of the page following one requested at `offset` with `limit`.
	fn next_offset(&self, offset: usize, limit: usize) -> usize {
		offset.saturating_add(limit)
	}
}

/// `limit`/`offset` strategy that validates every item into `T`.
pub struct OffsetPaginationStrategy<F, T> {
	fetcher: F,
	page_size: usize,
	max_page_size: usize,
	initial_offset: usize,
	_item: PhantomData<fn() -> T>,
}
impl<F, T> OffsetPaginationStrategy<F, T> {
	/// Creates a strategy; `page_size` is clamped into `[1, max_page_size]`.
	pub fn new(fetcher: F, page_size: usize, max_page_size: usize) -> Result<Self, ConfigError> {
		if max_page_size == 0 {
			return Err(ConfigError::InvalidPagination {
				field: "max_page_size",
				reason: "must be at least one",
			});
		}

		Ok(Self {
			fetcher,
			page_size: page_size.clamp(1, max_page_size),
			max_page_size,
			initial_offset: 0,
			_item: PhantomData,
		})
	}

	/// Creates a strategy sized by `config`.
	pub fn from_config(fetcher: F, config: &PaginationConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Self::new(fetcher, config.default_page_size, config.max_page_size)
	}

	/// Starts traversal at `offset` instead of zero.
	pub fn with_initial_offset(mut self, offset: usize) -> Self {
		self.initial_offset = offset;

		self
	}

	/// Underlying fetcher.
	pub fn fetcher(&self) -> &F {
		&self.fetcher
	}
}
impl<F, T> Debug for OffsetPaginationStrategy<F, T>
where
	F: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OffsetPaginationStrategy")
			.field("fetcher", &self.fetcher)
			.field("page_size", &self.page_size)
			.field("max_page_size", &self.max_page_size)
			.field("initial_offset", &self.initial_offset)
			.finish()
	}
}
impl<F, T> PaginationStrategy<T> for OffsetPaginationStrategy<F, T>
where
	F: PageFetcher,
	T: 'static + DeserializeOwned + Send,
{
	fn page_size(&self) -> usize {
		self.page_size
	}

	fn max_page_size(&self) -> usize {
		self.max_page_size
	}

	fn initial_offset(&self) -> usize {
		self.initial_offset
	}

	fn fetch_page(&self, offset: usize, limit: usize) -> PageResultFuture<'_, T> {
		Box::pin(async move {
			let mut timer = OpTimer::start(Operation::Paginate, "fetch_page");
			let raw = self.fetcher.fetch(PageRequest { limit, offset }).await?;
			let items = decode_page(raw, offset)?;

			timer.succeed();

			Ok(items)
		})
	}
}

/// Validates a raw page into typed items.
///
/// Item errors report the item's absolute position, `offset + index`.
pub fn decode_page<T>(raw: Value, offset: usize) -> Result<Vec<T>>
where
	T: DeserializeOwned,
{
	let items = match raw {
		Value::Array(items) => items,
		other => return Err(ProtocolError::NotAList { found: json_kind(&other) }.into()),
	};

	items
		.into_iter()
		.enumerate()
		.map(|(i, item)| {
			serde_path_to_error::deserialize(item)
				.map_err(|source| Error::InvalidItem { index: offset.saturating_add(i), source })
		})
		.collect()
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
