// crates.io
use futures::TryStreamExt;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use clob_transport::{
	config::{PaginationConfig, RateLimitConfig, TransportConfig},
	error::{Error, ProtocolError},
	http::ReqwestTransport,
	pagination::{HttpPageFetcher, OffsetPaginationStrategy, Paginator},
	transport::{self, RetryPolicy, TransportStack},
};

#[derive(Debug, PartialEq, Deserialize)]
struct Market {
	id: u32,
	slug: String,
}

type MarketPaginator =
	Paginator<OffsetPaginationStrategy<HttpPageFetcher<TransportStack<ReqwestTransport>>, Market>, Market>;

fn paginator(server: &MockServer, config: &PaginationConfig) -> MarketPaginator {
	let stack = transport::build_stack(
		ReqwestTransport::default(),
		&TransportConfig {
			rate_limit: RateLimitConfig { enabled: false, ..Default::default() },
			retry: RetryPolicy { max_retries: 0, ..Default::default() },
			..Default::default()
		},
	)
	.expect("Transport stack should build.");
	let fetcher = HttpPageFetcher::new(stack, &server.url("/markets"))
		.expect("Mock endpoint should parse.")
		.with_param("active", true);
	let strategy =
		OffsetPaginationStrategy::from_config(fetcher, config).expect("Strategy should build.");

	Paginator::from_config(strategy, config)
}

fn config(page_size: usize, auto: bool) -> PaginationConfig {
	PaginationConfig {
		default_page_size: page_size,
		enable_auto_pagination: auto,
		..Default::default()
	}
}

async fn mount_markets(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/markets")
				.query_param("active", "true")
				.query_param("limit", "2")
				.query_param("offset", "0");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"slug\":\"a\"},{\"id\":2,\"slug\":\"b\"}]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/markets")
				.query_param("limit", "2")
				.query_param("offset", "2");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":3,\"slug\":\"c\"}]");
		})
		.await;
}

#[tokio::test]
async fn auto_pagination_walks_until_a_short_page() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;

	mount_markets(&server).await;

	let markets = paginator(&server, &config(2, true)).fetch_all(None).await?;

	assert_eq!(markets.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2, 3]);
	assert_eq!(markets[2].slug, "c");

	Ok(())
}

#[tokio::test]
async fn default_settings_fetch_a_single_page() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;

	mount_markets(&server).await;

	let response = paginator(&server, &config(2, false)).fetch_paginated(None).await?;

	assert_eq!(response.data.len(), 2);
	assert!(response.pagination.has_next);
	assert_eq!(response.pagination.page, 1);
	assert_eq!(response.pagination.per_page, 2);

	Ok(())
}

#[tokio::test]
async fn streamed_pages_match_fetch_all() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;

	mount_markets(&server).await;

	let paginator = paginator(&server, &config(2, false));
	let streamed = paginator.iter_pages(None).try_collect::<Vec<_>>().await?;

	assert_eq!(streamed.len(), 3);
	assert_eq!(streamed[0], Market { id: 1, slug: "a".into() });

	Ok(())
}

#[tokio::test]
async fn object_bodies_are_protocol_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/markets");
			then.status(200).body("{\"data\":[]}");
		})
		.await;

	let err = paginator(&server, &config(2, true))
		.fetch_all(None)
		.await
		.expect_err("An object body is not a page.");

	assert!(matches!(err, Error::Protocol(ProtocolError::NotAList { found: "an object" })));
}

#[tokio::test]
async fn server_errors_keep_status_and_body() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/markets");
			then.status(500).body("upstream exploded");
		})
		.await;

	let err = paginator(&server, &config(2, true))
		.fetch_all(Some(10))
		.await
		.expect_err("A 500 should not be treated as data.");

	assert!(matches!(err, Error::Api { status: 500, ref body } if body == "upstream exploded"));
}
