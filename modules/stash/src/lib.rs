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

//! # Stash Module
//!
//! The item catalog and per-user inventories. A stash row keys
//! `(owner, item)` to a quantity; rows are removed the moment they reach
//! zero, so iteration only ever sees owned items. The auction engine moves
//! stock through the [`ItemStash`] trait when auctions are created,
//! cancelled and closed.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::unused_unit)]

use frame_support::{
	pallet_prelude::*,
	traits::{BuildGenesisConfig, ConstU32},
};
use frame_system::pallet_prelude::*;
use primitives::ItemId;
use sp_runtime::BoundedVec;
use sp_std::prelude::*;
use support::ItemStash;

mod mock;
mod tests;

pub use module::*;

pub type ItemName = BoundedVec<u8, ConstU32<64>>;

#[frame_support::pallet]
pub mod module {
	use super::*;

	#[pallet::config]
	pub trait Config: frame_system::Config {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;
	}

	#[pallet::error]
	pub enum Error<T> {
		/// The catalog has no such item.
		ItemNotFound,
		/// The owner holds fewer items than requested.
		InsufficientStock,
		/// Quantity must be at least one.
		InvalidQuantity,
		/// Stash quantity overflow.
		Overflow,
	}

	#[pallet::event]
	#[pallet::generate_deposit(pub(crate) fn deposit_event)]
	pub enum Event<T: Config> {
		/// A new catalog item was registered.
		ItemRegistered { item: ItemId, name: ItemName },
		/// Items were added to an owner's stash.
		Deposited {
			owner: T::AccountId,
			item: ItemId,
			quantity: u32,
		},
		/// Items were removed from an owner's stash.
		Withdrawn {
			owner: T::AccountId,
			item: ItemId,
			quantity: u32,
		},
	}

	/// The item catalog: id to display name.
	#[pallet::storage]
	#[pallet::getter(fn items)]
	pub type Items<T: Config> = StorageMap<_, Twox64Concat, ItemId, ItemName, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_item_id)]
	pub type NextItemId<T: Config> = StorageValue<_, ItemId, ValueQuery>;

	/// Owned quantities. Rows with quantity zero are deleted.
	#[pallet::storage]
	#[pallet::getter(fn stash)]
	pub type Stashes<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		T::AccountId,
		Twox64Concat,
		ItemId,
		u32,
		ValueQuery,
	>;

	#[pallet::genesis_config]
	pub struct GenesisConfig<T: Config> {
		pub items: Vec<Vec<u8>>,
		pub stashes: Vec<(T::AccountId, ItemId, u32)>,
	}

	impl<T: Config> Default for GenesisConfig<T> {
		fn default() -> Self {
			GenesisConfig {
				items: Vec::new(),
				stashes: Vec::new(),
			}
		}
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for name in &self.items {
				let id = NextItemId::<T>::mutate(|id| {
					let current = *id;
					*id = id.saturating_add(1);
					current
				});
				let name: ItemName = name.clone().try_into().expect("genesis item name too long");
				Items::<T>::insert(id, name);
			}
			for (owner, item, quantity) in &self.stashes {
				if *quantity > 0 {
					Stashes::<T>::insert(owner, item, quantity);
				}
			}
		}
	}

	#[pallet::pallet]
	pub struct Pallet<T>(_);

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Register a new catalog item. Root only; the catalog is operator
		/// data, not player data.
		#[pallet::call_index(0)]
		#[pallet::weight(Weight::from_parts(10_000_000, 0).saturating_add(T::DbWeight::get().reads_writes(1, 2)))]
		pub fn register_item(origin: OriginFor<T>, name: ItemName) -> DispatchResult {
			ensure_root(origin)?;
			let id = NextItemId::<T>::mutate(|id| {
				let current = *id;
				*id = id.saturating_add(1);
				current
			});
			Items::<T>::insert(id, name.clone());
			Self::deposit_event(Event::ItemRegistered { item: id, name });
			Ok(())
		}
	}
}

impl<T: Config> Pallet<T> {
	fn do_deposit(owner: &T::AccountId, item: ItemId, quantity: u32) -> DispatchResult {
		ensure!(quantity >= 1, Error::<T>::InvalidQuantity);
		Stashes::<T>::try_mutate(owner, item, |held| -> DispatchResult {
			*held = held.checked_add(quantity).ok_or(Error::<T>::Overflow)?;
			Ok(())
		})?;
		Self::deposit_event(Event::Deposited {
			owner: owner.clone(),
			item,
			quantity,
		});
		Ok(())
	}

	fn do_withdraw(owner: &T::AccountId, item: ItemId, quantity: u32) -> DispatchResult {
		ensure!(quantity >= 1, Error::<T>::InvalidQuantity);
		Stashes::<T>::try_mutate_exists(owner, item, |held| -> DispatchResult {
			let current = held.take().unwrap_or_default();
			let remaining = current
				.checked_sub(quantity)
				.ok_or(Error::<T>::InsufficientStock)?;
			// a drained row is deleted, not kept at zero
			if remaining > 0 {
				*held = Some(remaining);
			}
			Ok(())
		})?;
		Self::deposit_event(Event::Withdrawn {
			owner: owner.clone(),
			item,
			quantity,
		});
		Ok(())
	}
}

impl<T: Config> ItemStash<T::AccountId> for Pallet<T> {
	fn quantity(owner: &T::AccountId, item: ItemId) -> u32 {
		Self::stash(owner, item)
	}

	fn deposit(owner: &T::AccountId, item: ItemId, quantity: u32) -> DispatchResult {
		Self::do_deposit(owner, item, quantity)
	}

	fn withdraw(owner: &T::AccountId, item: ItemId, quantity: u32) -> DispatchResult {
		Self::do_withdraw(owner, item, quantity)
	}
}
