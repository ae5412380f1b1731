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

//! Autogenerated weights for module_auction_manager
//!
//! THIS FILE WAS AUTO-GENERATED USING THE SUBSTRATE BENCHMARK CLI VERSION 4.0.0-dev

#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]

use frame_support::{traits::Get, weights::Weight};
use sp_std::marker::PhantomData;

/// Weight functions needed for module_auction_manager.
pub trait WeightInfo {
	fn create_auction() -> Weight;
	fn cancel_auction() -> Weight;
	fn close_auction() -> Weight;
	fn create_lot() -> Weight;
	fn delete_lot() -> Weight;
	fn close_lot() -> Weight;
	fn place_bid() -> Weight;
	fn set_auto_bid() -> Weight;
	fn close_expired_auction() -> Weight;
	fn close_expired_lot() -> Weight;
}

/// Weights for module_auction_manager using the Arena node and recommended hardware.
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn create_auction() -> Weight {
		Weight::from_parts(52_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(3))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn cancel_auction() -> Weight {
		Weight::from_parts(47_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(3))
			.saturating_add(T::DbWeight::get().writes(2))
	}
	fn close_auction() -> Weight {
		Weight::from_parts(78_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(6))
	}
	fn create_lot() -> Weight {
		Weight::from_parts(55_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().writes(4))
	}
	fn delete_lot() -> Weight {
		Weight::from_parts(45_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(3))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn close_lot() -> Weight {
		Weight::from_parts(82_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(7))
			.saturating_add(T::DbWeight::get().writes(7))
	}
	fn place_bid() -> Weight {
		Weight::from_parts(71_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(6))
	}
	fn set_auto_bid() -> Weight {
		Weight::from_parts(49_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn close_expired_auction() -> Weight {
		Weight::from_parts(78_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(6))
	}
	fn close_expired_lot() -> Weight {
		Weight::from_parts(82_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(7))
			.saturating_add(T::DbWeight::get().writes(7))
	}
}

// For backwards compatibility and tests
impl WeightInfo for () {
	fn create_auction() -> Weight {
		Weight::from_parts(52_000_000, 0)
	}
	fn cancel_auction() -> Weight {
		Weight::from_parts(47_000_000, 0)
	}
	fn close_auction() -> Weight {
		Weight::from_parts(78_000_000, 0)
	}
	fn create_lot() -> Weight {
		Weight::from_parts(55_000_000, 0)
	}
	fn delete_lot() -> Weight {
		Weight::from_parts(45_000_000, 0)
	}
	fn close_lot() -> Weight {
		Weight::from_parts(82_000_000, 0)
	}
	fn place_bid() -> Weight {
		Weight::from_parts(71_000_000, 0)
	}
	fn set_auto_bid() -> Weight {
		Weight::from_parts(49_000_000, 0)
	}
	fn close_expired_auction() -> Weight {
		Weight::from_parts(78_000_000, 0)
	}
	fn close_expired_lot() -> Weight {
		Weight::from_parts(82_000_000, 0)
	}
}
