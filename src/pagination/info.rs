//! Page metadata returned alongside paginated data.

// self
use crate::_prelude::*;

/// Position metadata for an offset-paginated result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
	/// Total number of items, when the service reports it.
	pub total_count: Option<usize>,
	/// 1-based page number.
	pub page: usize,
	/// Items per page.
	pub per_page: usize,
	/// The last page was full, so more items may exist.
	pub has_next: bool,
	/// The result did not start at offset zero.
	pub has_previous: bool,
	/// Total number of pages, when the service reports it.
	pub total_pages: Option<usize>,
}
impl PaginationInfo {
	/// Derives page metadata from an offset traversal.
	///
	/// `has_next` is `true` iff `returned == requested`.
	pub fn from_offset(offset: usize, per_page: usize, returned: usize, requested: usize) -> Self {
		let per_page = per_page.max(1);

		Self {
			total_count: None,
			page: offset / per_page + 1,
			per_page,
			has_next: requested > 0 && returned == requested,
			has_previous: offset > 0,
			total_pages: None,
		}
	}

	/// Offset of the first item of [`PaginationInfo::page`].
	pub fn offset(&self) -> usize {
		self.page.saturating_sub(1) * self.per_page
	}
}

/// Items together with their pagination metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
	/// Fetched items.
	pub data: Vec<T>,
	/// Where `data` sits in the collection.
	pub pagination: PaginationInfo,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn page_numbers_are_one_based() {
		let info = PaginationInfo::from_offset(200, 100, 100, 100);

		assert_eq!(info.page, 3);
		assert_eq!(info.offset(), 200);
		assert!(info.has_next);
		assert!(info.has_previous);
	}

	#[test]
	fn short_pages_end_the_collection() {
		let info = PaginationInfo::from_offset(0, 50, 17, 50);

		assert_eq!(info.page, 1);
		assert!(!info.has_next);
		assert!(!info.has_previous);
		assert_eq!(info.total_count, None);
	}
}
