// This file is part of Arena.

// Copyright (C) 2020-2023 Arena Developers.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Shared mock implementations for module tests.

use crate::CacheInvalidate;
use std::cell::RefCell;

thread_local! {
	static INVALIDATED_KEYS: RefCell<Vec<Vec<u8>>> = RefCell::new(Vec::new());
}

/// Records every invalidated cache key so tests can assert on them.
pub struct MockCacheInvalidate;

impl CacheInvalidate for MockCacheInvalidate {
	fn invalidate(key: &[u8]) {
		INVALIDATED_KEYS.with(|keys| keys.borrow_mut().push(key.to_vec()));
	}
}

impl MockCacheInvalidate {
	pub fn take_keys() -> Vec<Vec<u8>> {
		INVALIDATED_KEYS.with(|keys| keys.borrow_mut().drain(..).collect())
	}

	pub fn reset() {
		INVALIDATED_KEYS.with(|keys| keys.borrow_mut().clear());
	}
}
