//! Raw page sources.

// crates.io
use ::http::Method;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ProtocolError},
	http::{HttpRequest, HttpTransport},
};

/// Boxed future returned by [`PageFetcher::fetch`].
pub type PageFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + 'a + Send>>;

/// Window of a collection requested in one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
	/// Maximum number of items to return.
	pub limit: usize,
	/// Number of items to skip.
	pub offset: usize,
}

/// Source of raw pages.
pub trait PageFetcher
where
	Self: Send + Sync,
{
	/// Fetches the items in `request` as an undecoded JSON document.
	fn fetch(&self, request: PageRequest) -> PageFuture<'_>;
}
impl<F> PageFetcher for Arc<F>
where
	F: ?Sized + PageFetcher,
{
	fn fetch(&self, request: PageRequest) -> PageFuture<'_> {
		(**self).fetch(request)
	}
}

/// [`PageFetcher`] backed by a closure; see [`fetch_fn`].
#[derive(Clone)]
pub struct FnPageFetcher<F>(F);
impl<F, Fut> PageFetcher for FnPageFetcher<F>
where
	F: Fn(PageRequest) -> Fut + Send + Sync,
	Fut: 'static + Future<Output = Result<Value>> + Send,
{
	fn fetch(&self, request: PageRequest) -> PageFuture<'_> {
		Box::pin((self.0)(request))
	}
}
impl<F> Debug for FnPageFetcher<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnPageFetcher(..)")
	}
}

/// Adapts an async closure into a [`PageFetcher`].
pub fn fetch_fn<F, Fut>(f: F) -> FnPageFetcher<F>
where
	F: Fn(PageRequest) -> Fut + Send + Sync,
	Fut: 'static + Future<Output = Result<Value>> + Send,
{
	FnPageFetcher(f)
}

/// Issues `GET endpoint?<params>&limit=..&offset=..` through an [`HttpTransport`].
///
/// Non-success statuses become [`Error::Api`]; bodies that are not JSON become
/// [`ProtocolError::Json`].
#[derive(Clone, Debug)]
pub struct HttpPageFetcher<T> {
	transport: T,
	endpoint: Url,
	params: Vec<(String, String)>,
}
impl<T> HttpPageFetcher<T> {
	/// Targets `endpoint` through `transport`.
	pub fn new(transport: T, endpoint: &str) -> Result<Self, ConfigError> {
		Ok(Self { transport, endpoint: Url::parse(endpoint)?, params: Vec::new() })
	}

	/// Adds a query parameter sent with every page.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Display) -> Self {
		self.params.push((key.into(), value.to_string()));

		self
	}

	/// Endpoint without pagination parameters.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Wrapped transport.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	fn page_url(&self, request: PageRequest) -> Url {
		let mut url = self.endpoint.clone();

		url.query_pairs_mut()
			.extend_pairs(&self.params)
			.append_pair("limit", &request.limit.to_string())
			.append_pair("offset", &request.offset.to_string());

		url
	}
}
impl<T> PageFetcher for HttpPageFetcher<T>
where
	T: HttpTransport,
{
	fn fetch(&self, request: PageRequest) -> PageFuture<'_> {
		let url = self.page_url(request);

		Box::pin(async move {
			let http_request: HttpRequest = ::http::Request::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let response = self.transport.send(http_request).await?;
			let status = response.status();

			if !status.is_success() {
				return Err(Error::Api {
					status: status.as_u16(),
					body: String::from_utf8_lossy(response.body()).into_owned(),
				});
			}

			let mut de = serde_json::Deserializer::from_slice(response.body());
			let page = serde_path_to_error::deserialize(&mut de)
				.map_err(|source| ProtocolError::Json { source })?;

			// Trailing bytes after the page mean the body is not a single JSON document.
			de.end().map_err(|e| ProtocolError::Json {
				source: serde_path_to_error::Error::new(serde_path_to_error::Track::new().path(), e),
			})?;

			Ok(page)
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::http::{HttpResponse, TransportFuture};

	struct Fixed(u16, &'static str, Mutex<Vec<String>>);
	impl HttpTransport for Fixed {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.2.lock().push(request.uri().to_string());

			let mut response = HttpResponse::new(self.1.as_bytes().to_vec());

			*response.status_mut() =
				::http::StatusCode::from_u16(self.0).expect("Fixture status should be valid.");

			Box::pin(async move { Ok(response) })
		}
	}

	#[tokio::test]
	async fn http_fetcher_appends_pagination_parameters() {
		let fetcher = HttpPageFetcher::new(
			Fixed(200, "[{\"id\":1}]", Mutex::default()),
			"https://gamma.example.com/markets?closed=false",
		)
		.expect("Endpoint should parse.")
		.with_param("tag", "politics");
		let page = fetcher
			.fetch(PageRequest { limit: 10, offset: 20 })
			.await
			.expect("Fixture page should decode.");

		assert_eq!(page, json!([{ "id": 1 }]));
		assert_eq!(
			fetcher.transport().2.lock()[0],
			"https://gamma.example.com/markets?closed=false&tag=politics&limit=10&offset=20"
		);
	}

	#[tokio::test]
	async fn non_success_status_is_an_api_error() {
		let fetcher = HttpPageFetcher::new(
			Fixed(503, "down", Mutex::default()),
			"https://gamma.example.com/markets",
		)
		.expect("Endpoint should parse.");
		let err = fetcher
			.fetch(PageRequest { limit: 1, offset: 0 })
			.await
			.expect_err("A 503 should surface as an error.");

		assert!(matches!(err, Error::Api { status: 503, ref body } if body == "down"));
	}

	#[tokio::test]
	async fn malformed_json_is_a_protocol_error() {
		let fetcher =
			HttpPageFetcher::new(Fixed(200, "[1,", Mutex::default()), "https://gamma.example.com/")
				.expect("Endpoint should parse.");
		let err = fetcher
			.fetch(PageRequest { limit: 1, offset: 0 })
			.await
			.expect_err("Truncated JSON should fail.");

		assert!(matches!(err, Error::Protocol(ProtocolError::Json { .. })));
	}

	#[tokio::test]
	async fn trailing_garbage_after_a_page_is_a_protocol_error() {
		let fetcher = HttpPageFetcher::new(
			Fixed(200, "[1,2] }{ not json", Mutex::default()),
			"https://gamma.example.com/",
		)
		.expect("Endpoint should parse.");
		let err = fetcher
			.fetch(PageRequest { limit: 2, offset: 0 })
			.await
			.expect_err("A page followed by garbage should fail.");

		assert!(matches!(err, Error::Protocol(ProtocolError::Json { .. })));
	}

	#[tokio::test]
	async fn trailing_whitespace_is_accepted() {
		let fetcher =
			HttpPageFetcher::new(Fixed(200, "[1,2]\n  ", Mutex::default()), "https://gamma.example.com/")
				.expect("Endpoint should parse.");
		let page = fetcher
			.fetch(PageRequest { limit: 2, offset: 0 })
			.await
			.expect("Whitespace after the page should be ignored.");

		assert_eq!(page, json!([1, 2]));
	}

	#[tokio::test]
	async fn closures_adapt_into_fetchers() {
		let fetcher = fetch_fn(|request: PageRequest| async move {
			Ok::<_, Error>(json!([request.offset, request.limit]))
		});
		let page = fetcher
			.fetch(PageRequest { limit: 5, offset: 7 })
			.await
			.expect("Closure fetcher should succeed.");

		assert_eq!(page, json!([7, 5]));
	}
}
