//! Walks a signed, rate-limited, paginated session against an in-process exchange.
//!
//! 1. Build the transport stack (rate limiting over retries) from [`TransportConfig`].
//! 2. Wrap it in an HMAC [`AuthSession`](clob_transport::auth::AuthSession) created by the
//!    [`AuthMiddleware`].
//! 3. Page through `/markets` with a [`Paginator`] whose fetcher sends through the session.
//! 4. The exchange validates every request with its own middleware and rejects unsigned ones.

// crates.io
use color_eyre::Result;
use serde::Deserialize;
use serde_json::json;
// self
use clob_transport::{
	auth::{AuthMiddleware, AuthScheme, SigningIdentity},
	config::TransportConfig,
	error::ConfigError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{Request, StatusCode},
	pagination::{HttpPageFetcher, OffsetPaginationStrategy, Paginator},
	transport,
	url::Url,
};

const API_KEY: &str = "demo-key-0123456789abcdef01234567";
const API_SECRET: &str = "demo-secret";
const MARKETS: u64 = 7;

#[derive(Debug, Deserialize)]
struct Market {
	id: u64,
	question: String,
}

#[derive(Debug, Default)]
struct Exchange {
	middleware: AuthMiddleware,
}
impl Exchange {
	fn page(&self, request: &HttpRequest) -> clob_transport::error::Result<HttpResponse> {
		let url = Url::parse(&request.uri().to_string()).map_err(ConfigError::from)?;
		let mut limit = 0_u64;
		let mut offset = 0_u64;

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"limit" => limit = value.parse().unwrap_or_default(),
				"offset" => offset = value.parse().unwrap_or_default(),
				_ => {},
			}
		}

		let items = (offset..MARKETS.min(offset + limit))
			.map(|id| json!({ "id": id, "question": format!("Will market {id} resolve yes?") }))
			.collect::<Vec<_>>();

		Ok(HttpResponse::new(serde_json::to_vec(&items).unwrap_or_default()))
	}
}
impl HttpTransport for Exchange {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if let Err(reason) = self.middleware.check_request(&request, Some(API_SECRET)) {
				let mut response = HttpResponse::new(reason.to_string().into_bytes());

				*response.status_mut() = StatusCode::UNAUTHORIZED;

				return Ok(response);
			}

			self.page(&request)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = TransportConfig::default();
	let stack = transport::build_stack(Exchange::default(), &config)?;
	let identity = SigningIdentity::new().with_api_credentials(API_KEY, API_SECRET, "demo-pass");
	let session = AuthMiddleware::from_config(&config.auth).create_auth_session(
		&identity,
		AuthScheme::Hmac,
		stack,
	)?;
	let unsigned = session
		.inner()
		.send(Request::builder().uri("https://clob.example.com/markets").body(Vec::new())?)
		.await?;

	println!(
		"Unsigned request answered with {}: {}",
		unsigned.status(),
		String::from_utf8_lossy(unsigned.body())
	);

	let fetcher = HttpPageFetcher::new(session, "https://clob.example.com/markets")?;
	let strategy =
		OffsetPaginationStrategy::<_, Market>::new(fetcher, 3, config.pagination.max_page_size)?;
	let paginator = Paginator::from_config(strategy, &config.pagination).with_auto_paginate(true);
	let markets: Vec<Market> = paginator.fetch_all(None).await?;

	for market in &markets {
		println!("#{} {}", market.id, market.question);
	}

	let first = paginator.fetch_paginated(Some(3)).await?;

	println!(
		"First page: {} markets, page {}, has_next = {}.",
		first.data.len(),
		first.pagination.page,
		first.pagination.has_next
	);

	Ok(())
}
