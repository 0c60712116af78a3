// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Smallest id in `1..=max_id` not present in `used`.
///
/// `used` must be sorted ascending (the store returns ids `ORDER BY id`).
pub fn first_free_id(used: &[u16], max_id: u16) -> Option<u16> {
	let mut candidate: u32 = 1;
	for &id in used {
		let id = u32::from(id);
		if id < candidate {
			continue;
		}
		if id > candidate {
			break;
		}
		candidate += 1;
	}

	if candidate > u32::from(max_id) {
		None
	} else {
		u16::try_from(candidate).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_empty_store_starts_at_one() {
		assert_eq!(first_free_id(&[], 65535), Some(1));
	}

	#[test]
	fn test_fills_lowest_gap() {
		assert_eq!(first_free_id(&[1, 2, 4, 5], 65535), Some(3));
		assert_eq!(first_free_id(&[2, 3], 65535), Some(1));
		assert_eq!(first_free_id(&[1, 2, 3], 65535), Some(4));
	}

	#[test]
	fn test_respects_max_id() {
		assert_eq!(first_free_id(&[1, 2, 3], 3), None);
		assert_eq!(first_free_id(&[], 0), None);
	}

	#[test]
	fn test_full_range_is_exhausted() {
		let used: Vec<u16> = (1..=u16::MAX).collect();
		assert_eq!(first_free_id(&used, u16::MAX), None);
	}

	proptest! {
		#[test]
		fn prop_result_is_smallest_unused(set in proptest::collection::btree_set(1u16..200, 0..150)) {
			let used: Vec<u16> = set.into_iter().collect();
			let id = first_free_id(&used, 65535).unwrap();
			prop_assert!(!used.contains(&id));
			for smaller in 1..id {
				prop_assert!(used.contains(&smaller));
			}
		}
	}
}
