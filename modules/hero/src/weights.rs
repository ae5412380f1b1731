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

//! Autogenerated weights for module_hero
//!
//! THIS FILE WAS AUTO-GENERATED USING THE SUBSTRATE BENCHMARK CLI VERSION 4.0.0-dev

#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]

use frame_support::{traits::Get, weights::Weight};
use sp_std::marker::PhantomData;

/// Weight functions needed for module_hero.
pub trait WeightInfo {
	fn generate_hero() -> Weight;
	fn delete_hero() -> Weight;
	fn restore_hero() -> Weight;
	fn revive_hero() -> Weight;
	fn purge_hero() -> Weight;
}

/// Weights for module_hero using the Arena node and recommended hardware.
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn generate_hero() -> Weight {
		Weight::from_parts(68_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(5))
			.saturating_add(T::DbWeight::get().writes(5))
	}
	fn delete_hero() -> Weight {
		Weight::from_parts(31_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(2))
			.saturating_add(T::DbWeight::get().writes(2))
	}
	fn restore_hero() -> Weight {
		Weight::from_parts(33_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(2))
			.saturating_add(T::DbWeight::get().writes(2))
	}
	fn revive_hero() -> Weight {
		Weight::from_parts(24_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn purge_hero() -> Weight {
		Weight::from_parts(27_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

// For backwards compatibility and tests
impl WeightInfo for () {
	fn generate_hero() -> Weight {
		Weight::from_parts(68_000_000, 0)
	}
	fn delete_hero() -> Weight {
		Weight::from_parts(31_000_000, 0)
	}
	fn restore_hero() -> Weight {
		Weight::from_parts(33_000_000, 0)
	}
	fn revive_hero() -> Weight {
		Weight::from_parts(24_000_000, 0)
	}
	fn purge_hero() -> Weight {
		Weight::from_parts(27_000_000, 0)
	}
}
