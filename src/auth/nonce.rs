//! Single-use nonce tracking.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

const MICROS_PER_SECOND: i128 = 1_000_000;

/// Current unix time in microseconds.
pub fn unix_micros(now: OffsetDateTime) -> i128 {
	now.unix_timestamp_nanos() / 1_000
}

/// Returns `true` when `nonce` is unused and its age lies in `[0, max_age_seconds]`.
///
/// Nonces are interpreted as microsecond timestamps.
pub(crate) fn nonce_is_fresh(
	nonce: u64,
	used: &HashSet<u64>,
	max_age_seconds: i64,
	now: OffsetDateTime,
) -> bool {
	if used.contains(&nonce) {
		return false;
	}

	let age = unix_micros(now) - i128::from(nonce);

	(0..=i128::from(max_age_seconds) * MICROS_PER_SECOND).contains(&age)
}

/// Set of consumed wallet nonces.
///
/// [`NonceSet::consume`] performs the freshness check and the insert inside one critical
/// section, so two concurrent requests can never both claim the same nonce.
#[derive(Debug, Default)]
pub struct NonceSet {
	used: Mutex<HashSet<u64>>,
}
impl NonceSet {
	/// Claims `nonce` if it is fresh and unused.
	pub fn consume(&self, nonce: u64, max_age_seconds: i64) -> bool {
		self.consume_at(nonce, max_age_seconds, OffsetDateTime::now_utc())
	}

	/// [`NonceSet::consume`] against an explicit clock reading.
	pub fn consume_at(&self, nonce: u64, max_age_seconds: i64, now: OffsetDateTime) -> bool {
		let mut used = self.used.lock();

		if !nonce_is_fresh(nonce, &used, max_age_seconds, now) {
			return false;
		}

		used.insert(nonce)
	}

	/// Returns `true` when `nonce` was already consumed.
	pub fn contains(&self, nonce: u64) -> bool {
		self.used.lock().contains(&nonce)
	}

	/// Number of tracked nonces.
	pub fn len(&self) -> usize {
		self.used.lock().len()
	}

	/// Returns `true` when no nonce is tracked.
	pub fn is_empty(&self) -> bool {
		self.used.lock().is_empty()
	}

	/// Drops nonces older than `max_age_seconds`, returning how many were removed.
	pub fn cleanup(&self, max_age_seconds: i64) -> usize {
		self.cleanup_at(max_age_seconds, OffsetDateTime::now_utc())
	}

	/// [`NonceSet::cleanup`] against an explicit clock reading.
	pub fn cleanup_at(&self, max_age_seconds: i64, now: OffsetDateTime) -> usize {
		let cutoff = unix_micros(now) - i128::from(max_age_seconds) * MICROS_PER_SECOND;
		let mut used = self.used.lock();
		let before = used.len();

		used.retain(|&nonce| i128::from(nonce) > cutoff);

		before - used.len()
	}
}

/// Issues strictly increasing microsecond nonces.
#[derive(Debug, Default)]
pub(crate) struct NonceClock {
	last: AtomicU64,
}
impl NonceClock {
	pub(crate) fn next(&self) -> u64 {
		let now = u64::try_from(unix_micros(OffsetDateTime::now_utc())).unwrap_or_default();
		let previous = self
			.last
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(now.max(last.saturating_add(1))))
			.unwrap_or_else(|last| last);

		now.max(previous.saturating_add(1))
	}
}
