//! Signing transport decorator.

// crates.io
use ::http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
// self
use crate::{
	_prelude::*,
	auth::{AuthScheme, NonceClock, RequestSigner, signer},
	error::ConfigError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	obs::{OpSpan, Operation},
};

/// Callback run on every outbound request after it has been signed.
pub type RequestHook = Arc<dyn Fn(&mut HttpRequest) + Send + Sync>;
/// Callback run on every response before it is handed back to the caller.
pub type ResponseHook = Arc<dyn Fn(&HttpResponse) + Send + Sync>;

/// Transport that attaches authentication headers to every request it forwards.
///
/// Default headers (`Content-Type: application/json` and a crate `User-Agent`) are added only
/// when the request does not set them. Wallet sessions draw nonces from a strictly increasing
/// clock so two requests signed within the same microsecond never collide.
pub struct AuthSession<T> {
	transport: T,
	signer: Arc<RequestSigner>,
	scheme: AuthScheme,
	default_headers: HeaderMap,
	request_hooks: Vec<RequestHook>,
	response_hooks: Vec<ResponseHook>,
	nonce_clock: NonceClock,
}
impl<T> AuthSession<T> {
	/// Wraps `transport`, failing when `signer` cannot produce `scheme` headers.
	pub fn new(
		transport: T,
		signer: impl Into<Arc<RequestSigner>>,
		scheme: AuthScheme,
	) -> Result<Self, ConfigError> {
		let signer = signer.into();

		signer.require(scheme)?;

		let mut default_headers = HeaderMap::new();

		default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		default_headers.insert(
			USER_AGENT,
			HeaderValue::from_static(concat!("clob-transport/", env!("CARGO_PKG_VERSION"))),
		);

		Ok(Self {
			transport,
			signer,
			scheme,
			default_headers,
			request_hooks: Vec::new(),
			response_hooks: Vec::new(),
			nonce_clock: NonceClock::default(),
		})
	}

	/// Registers a hook that sees each signed request before it is sent.
	pub fn with_request_hook<F>(mut self, hook: F) -> Self
	where
		F: 'static + Fn(&mut HttpRequest) + Send + Sync,
	{
		self.request_hooks.push(Arc::new(hook));

		self
	}

	/// Registers a hook that sees each response.
	pub fn with_response_hook<F>(mut self, hook: F) -> Self
	where
		F: 'static + Fn(&HttpResponse) + Send + Sync,
	{
		self.response_hooks.push(Arc::new(hook));

		self
	}

	/// Adds or replaces a header applied to requests that do not set it themselves.
	pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.default_headers.insert(name, value);

		self
	}

	/// Scheme used for every request.
	pub fn scheme(&self) -> AuthScheme {
		self.scheme
	}

	/// Shared signer.
	pub fn signer(&self) -> &Arc<RequestSigner> {
		&self.signer
	}

	/// Headers added to requests that lack them.
	pub fn default_headers(&self) -> &HeaderMap {
		&self.default_headers
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &T {
		&self.transport
	}

	/// Applies default headers and the authentication header set to `request`.
	///
	/// HMAC signs the path with its query string and the body, which must be UTF-8 so that
	/// [`AuthMiddleware`](crate::auth::AuthMiddleware) can recompute the same payload.
	pub fn sign(&self, request: &mut HttpRequest) -> Result<(), ConfigError> {
		for (name, value) in &self.default_headers {
			if !request.headers().contains_key(name) {
				request.headers_mut().insert(name.clone(), value.clone());
			}
		}

		let headers = match self.scheme {
			AuthScheme::Hmac => {
				let path = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
				let body = std::str::from_utf8(request.body()).map_err(|e| ConfigError::Signing {
					source: format!("HMAC request body is not UTF-8: {e}").into(),
				})?;

				self.signer.create_auth_headers(request.method().as_str(), path, body)?
			},
			AuthScheme::Wallet => {
				let timestamp = signer::unix_seconds();

				self.signer.wallet_headers(Some(&timestamp), Some(self.nonce_clock.next()))?
			},
		};

		headers.apply(request.headers_mut())
	}
}
impl<T> Debug for AuthSession<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthSession")
			.field("transport", &self.transport)
			.field("signer", &self.signer)
			.field("scheme", &self.scheme)
			.field("request_hooks", &self.request_hooks.len())
			.field("response_hooks", &self.response_hooks.len())
			.finish()
	}
}
impl<T> HttpTransport for AuthSession<T>
where
	T: HttpTransport,
{
	fn send(&self, mut request: HttpRequest) -> TransportFuture<'_> {
		let span = OpSpan::new(Operation::Sign, self.scheme.as_str());

		Box::pin(span.instrument(async move {
			self.sign(&mut request)?;

			for hook in &self.request_hooks {
				hook(&mut request);
			}

			let response = self.transport.send(request).await?;

			for hook in &self.response_hooks {
				hook(&response);
			}

			Ok(response)
		}))
	}
}
