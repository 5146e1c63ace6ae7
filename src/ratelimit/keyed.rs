//! Per-key state storage and key derivation.

// self
use crate::_prelude::*;

/// Fixed key shared by every request under [`KeyPolicy::Global`].
pub const GLOBAL_KEY: &str = "global";

/// How request targets map to rate-limit state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyPolicy {
	/// One state per `host[:port]`.
	#[default]
	PerHost,
	/// One state shared by every request.
	Global,
}
impl KeyPolicy {
	/// Chooses the policy from a `per_host` flag.
	pub const fn from_per_host(per_host: bool) -> Self {
		if per_host { Self::PerHost } else { Self::Global }
	}

	/// Derives the state key for `target`.
	///
	/// Targets that do not parse as absolute URLs with a host fall back to [`GLOBAL_KEY`].
	pub fn key_for(self, target: &str) -> String {
		match self {
			Self::Global => GLOBAL_KEY.into(),
			Self::PerHost => Url::parse(target)
				.ok()
				.and_then(|url| {
					let host = url.host_str()?.to_owned();

					Some(match url.port() {
						Some(port) => format!("{host}:{port}"),
						None => host,
					})
				})
				.unwrap_or_else(|| GLOBAL_KEY.into()),
		}
	}
}

/// Concurrent map from key to individually locked state.
///
/// The outer lock only guards membership; callers lock the returned entry for the actual
/// read-modify-write, so keys never contend with each other. Entries live until
/// [`KeyedState::prune`] drops them.
#[derive(Debug)]
pub(crate) struct KeyedState<S> {
	entries: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}
impl<S> KeyedState<S> {
	pub(crate) fn entry(&self, key: &str, init: impl FnOnce() -> S) -> Arc<Mutex<S>> {
		if let Some(state) = self.entries.read().get(key) {
			return state.clone();
		}

		self.entries
			.write()
			.entry(key.to_owned())
			.or_insert_with(|| Arc::new(Mutex::new(init())))
			.clone()
	}

	/// Drops entries no caller holds and `idle` reports as indistinguishable from fresh state.
	pub(crate) fn prune(&self, mut idle: impl FnMut(&mut S) -> bool) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();

		// The write lock blocks new handles, so a count of one means nobody else holds it.
		entries.retain(|_, state| Arc::strong_count(state) > 1 || !idle(&mut state.lock()));

		before - entries.len()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.read().len()
	}
}
impl<S> Default for KeyedState<S> {
	fn default() -> Self {
		Self { entries: RwLock::new(HashMap::new()) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn per_host_keys_by_authority() {
		let policy = KeyPolicy::PerHost;

		assert_eq!(policy.key_for("https://clob.example.com/markets?limit=1"), "clob.example.com");
		assert_eq!(policy.key_for("http://localhost:8080/book"), "localhost:8080");
		assert_eq!(policy.key_for("https://clob.example.com:443/x"), "clob.example.com");
	}

	#[test]
	fn unparsable_targets_share_the_global_key() {
		assert_eq!(KeyPolicy::PerHost.key_for("not a url"), GLOBAL_KEY);
		assert_eq!(KeyPolicy::PerHost.key_for("data:text/plain,hi"), GLOBAL_KEY);
		assert_eq!(KeyPolicy::Global.key_for("https://a.example.com"), GLOBAL_KEY);
	}

	#[test]
	fn entries_are_created_once() {
		let state = KeyedState::<u32>::default();
		let first = state.entry("a", || 1);

		*first.lock() += 1;

		let again = state.entry("a", || 100);

		assert_eq!(*again.lock(), 2);
		assert_eq!(state.len(), 1);
		assert!(KeyPolicy::from_per_host(false) == KeyPolicy::Global);
	}

	#[test]
	fn prune_keeps_busy_and_held_entries() {
		let state = KeyedState::<u32>::default();

		drop(state.entry("idle", || 0));
		drop(state.entry("busy", || 3));

		let held = state.entry("held", || 0);

		assert_eq!(state.prune(|count| *count == 0), 1);
		assert_eq!(state.len(), 2);

		drop(held);

		assert_eq!(state.prune(|count| *count == 0), 1);
		assert_eq!(state.len(), 1);
	}
}
