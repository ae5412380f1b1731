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

//! # Hero Module
//!
//! ## Overview
//!
//! The hero roster. Heroes are unique assets owned by exactly one account:
//!
//! - generation rolls a new hero after debiting the owner through the
//!   ledger, so a failed debit never leaves an orphan hero and a failed
//!   roll never keeps the money;
//! - deletion is soft: a tombstoned hero can be restored by its owner
//!   within the restore window, after which the maintenance worker purges
//!   the row for good;
//! - dead heroes recover after a fixed duration; the maintenance worker
//!   revives them via unsigned transactions, so revival happens exactly
//!   once no matter how many instances run the worker.
//!
//! The lot engine sees heroes through the [`HeroRegistry`] trait: listing
//! gates, the on-auction flag, and ownership transfer on a won lot.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::unused_unit)]

use frame_support::{pallet_prelude::*, traits::Time};
use frame_system::{
	offchain::{SendTransactionTypes, SubmitTransaction},
	pallet_prelude::*,
};
use primitives::{clamp_page, Balance, BalanceField, HeroId, LedgerEntryType, Locale, Moment, PagedResult};
use sp_runtime::{
	offchain::storage::StorageValueRef,
	traits::{BlakeTwo256, Hash, Zero},
	transaction_validity::{
		InvalidTransaction, TransactionPriority, TransactionSource, TransactionValidity,
		ValidTransaction,
	},
};
use sp_std::prelude::*;
use support::{CurrencyLedger, HeroAttributes, HeroGenerator, HeroName, HeroPerks, HeroRegistry};
use utilities::{LeasedLock, OffchainErr};

pub mod generation;
mod mock;
mod tests;
pub mod weights;

pub use module::*;
pub use weights::WeightInfo;

pub const OFFCHAIN_WORKER_CURSOR: &[u8] = b"arena/hero/cursor/";
pub const OFFCHAIN_WORKER_LAST_RUN: &[u8] = b"arena/hero/last-run/";
pub const OFFCHAIN_WORKER_MAX_ITERATIONS: &[u8] = b"arena/hero/max-iterations/";
/// The maintenance pass runs at most once per minute.
pub const MAINTENANCE_INTERVAL: u64 = 60_000;
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// A hero and all of its lifecycle flags.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Hero<AccountId> {
	pub owner: AccountId,
	pub name: HeroName,
	pub nickname: HeroName,
	pub generation: u8,
	pub attributes: HeroAttributes,
	pub perks: HeroPerks,
	pub level: u32,
	pub experience: u32,
	pub is_training: bool,
	pub training_end: Option<Moment>,
	pub is_dead: bool,
	pub dead_until: Option<Moment>,
	pub is_on_auction: bool,
	pub is_deleted: bool,
	pub deleted_at: Option<Moment>,
	/// Number of equipment pieces currently worn. Maintained by the
	/// equipment system; a hero with equipment cannot be listed.
	pub equipped_items: u32,
	pub locale: Locale,
	pub created_at: Moment,
}

impl<AccountId> Hero<AccountId> {
	/// Live means visible to players: not tombstoned.
	pub fn is_live(&self) -> bool {
		!self.is_deleted
	}
}

#[frame_support::pallet]
pub mod module {
	use super::*;

	#[pallet::config]
	pub trait Config: frame_system::Config + SendTransactionTypes<Call<Self>> {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Wall-clock source for lifecycle timestamps.
		type Time: Time<Moment = Moment>;

		/// Money movements for generation pricing.
		type Ledger: CurrencyLedger<Self::AccountId>;

		/// Rolls attributes, perks and names for new heroes.
		type Generator: HeroGenerator;

		#[pallet::constant]
		/// Most live heroes one account may own.
		type MaxHeroes: Get<u32>;

		#[pallet::constant]
		/// Price of one unit of generation currency, in cents.
		type GenerationUnitPrice: Get<Balance>;

		#[pallet::constant]
		/// How long a tombstoned hero may still be restored.
		type RestoreWindow: Get<Moment>;

		#[pallet::constant]
		/// How long a hero stays dead before the worker revives it.
		type RecoveryDuration: Get<Moment>;

		#[pallet::constant]
		/// A configuration for base priority of unsigned transactions.
		type UnsignedPriority: Get<TransactionPriority>;

		/// Weight information for the extrinsics in this module.
		type WeightInfo: WeightInfo;
	}

	#[pallet::error]
	pub enum Error<T> {
		/// No hero under this id (or it was purged).
		HeroNotFound,
		/// Generation level must be between 1 and 10.
		InvalidGeneration,
		/// The account already owns the maximum number of live heroes.
		TooManyHeroes,
		/// The caller does not own this hero.
		NoPermission,
		/// The hero is listed on a lot.
		HeroOnAuction,
		/// The hero is in training.
		HeroInTraining,
		/// The hero is dead and has not recovered yet.
		HeroDead,
		/// The hero still wears equipment.
		HeroHasEquipment,
		/// The hero is tombstoned.
		HeroDeleted,
		/// The hero is not tombstoned, nothing to restore.
		HeroNotDeleted,
		/// The restore window has passed.
		RestoreWindowPassed,
		/// The hero is not due for revival.
		NotRecovered,
		/// The tombstone is still within the restore window.
		PurgeTooEarly,
	}

	#[pallet::event]
	#[pallet::generate_deposit(pub(crate) fn deposit_event)]
	pub enum Event<T: Config> {
		/// A new hero was rolled and paid for.
		HeroGenerated {
			owner: T::AccountId,
			hero: HeroId,
			generation: u8,
			price: Balance,
		},
		/// A hero was tombstoned by its owner.
		HeroDeleted { owner: T::AccountId, hero: HeroId },
		/// A tombstoned hero was restored by its owner.
		HeroRestored { owner: T::AccountId, hero: HeroId },
		/// A dead hero recovered.
		HeroRevived { hero: HeroId },
		/// A tombstone outlived the restore window and was removed.
		HeroPurged { hero: HeroId },
		/// Ownership moved, e.g. on a won lot.
		HeroTransferred {
			hero: HeroId,
			from: T::AccountId,
			to: T::AccountId,
		},
	}

	/// All heroes, including tombstones awaiting purge.
	#[pallet::storage]
	#[pallet::getter(fn heroes)]
	pub type Heroes<T: Config> =
		StorageMap<_, Twox64Concat, HeroId, Hero<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_hero_id)]
	pub type NextHeroId<T: Config> = StorageValue<_, HeroId, ValueQuery>;

	/// Live (non-tombstoned) heroes per owner, kept for the roster cap.
	#[pallet::storage]
	#[pallet::getter(fn owned_hero_count)]
	pub type OwnedHeroCount<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, u32, ValueQuery>;

	#[pallet::pallet]
	pub struct Pallet<T>(_);

	#[pallet::hooks]
	impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
		/// Start the maintenance worker: revive recovered heroes, purge
		/// expired tombstones.
		fn offchain_worker(now: BlockNumberFor<T>) {
			if let Err(e) = Self::_offchain_worker() {
				log::info!(
					target: "hero offchain worker",
					"cannot run offchain worker at {:?}: {:?}",
					now,
					e,
				);
			}
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Roll a new hero. The whole exchange is atomic: the debit and the
		/// insert either both happen or neither does.
		///
		/// - `generation`: target generation, 1 to 10.
		/// - `currency`: units of generation currency to spend; the debit is
		///   `currency * GenerationUnitPrice`.
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::generate_hero())]
		pub fn generate_hero(
			origin: OriginFor<T>,
			generation: u8,
			currency: u32,
			locale: Locale,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Self::do_generate_hero(&who, generation, currency, locale)?;
			Ok(())
		}

		/// Tombstone a hero. It stays restorable for the restore window.
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::delete_hero())]
		pub fn delete_hero(origin: OriginFor<T>, hero_id: HeroId) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
				let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
				ensure!(hero.owner == who, Error::<T>::NoPermission);
				ensure!(!hero.is_deleted, Error::<T>::HeroDeleted);
				ensure!(!hero.is_on_auction, Error::<T>::HeroOnAuction);
				ensure!(!hero.is_training, Error::<T>::HeroInTraining);
				hero.is_deleted = true;
				hero.deleted_at = Some(T::Time::now());
				Ok(())
			})?;
			OwnedHeroCount::<T>::mutate(&who, |count| *count = count.saturating_sub(1));
			Self::deposit_event(Event::HeroDeleted {
				owner: who,
				hero: hero_id,
			});
			Ok(())
		}

		/// Bring a tombstoned hero back, within the restore window.
		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::restore_hero())]
		pub fn restore_hero(origin: OriginFor<T>, hero_id: HeroId) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ensure!(
				Self::owned_hero_count(&who) < T::MaxHeroes::get(),
				Error::<T>::TooManyHeroes
			);
			Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
				let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
				ensure!(hero.owner == who, Error::<T>::NoPermission);
				ensure!(hero.is_deleted, Error::<T>::HeroNotDeleted);
				let deleted_at = hero.deleted_at.unwrap_or_default();
				ensure!(
					T::Time::now() <= deleted_at.saturating_add(T::RestoreWindow::get()),
					Error::<T>::RestoreWindowPassed
				);
				hero.is_deleted = false;
				hero.deleted_at = None;
				Ok(())
			})?;
			OwnedHeroCount::<T>::mutate(&who, |count| *count = count.saturating_add(1));
			Self::deposit_event(Event::HeroRestored {
				owner: who,
				hero: hero_id,
			});
			Ok(())
		}

		/// Revive a recovered hero.
		///
		/// The dispatch origin of this call must be _None_; the maintenance
		/// worker submits it for heroes whose recovery time has passed.
		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::revive_hero())]
		pub fn revive_hero(origin: OriginFor<T>, hero_id: HeroId) -> DispatchResult {
			ensure_none(origin)?;
			Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
				let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
				ensure!(hero.is_dead, Error::<T>::NotRecovered);
				let due = hero.dead_until.ok_or(Error::<T>::NotRecovered)?;
				ensure!(due <= T::Time::now(), Error::<T>::NotRecovered);
				hero.is_dead = false;
				hero.dead_until = None;
				Ok(())
			})?;
			Self::deposit_event(Event::HeroRevived { hero: hero_id });
			Ok(())
		}

		/// Remove a tombstone that outlived the restore window.
		///
		/// The dispatch origin of this call must be _None_.
		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::purge_hero())]
		pub fn purge_hero(origin: OriginFor<T>, hero_id: HeroId) -> DispatchResult {
			ensure_none(origin)?;
			let hero = Self::heroes(hero_id).ok_or(Error::<T>::HeroNotFound)?;
			ensure!(hero.is_deleted, Error::<T>::HeroNotDeleted);
			let deleted_at = hero.deleted_at.unwrap_or_default();
			ensure!(
				T::Time::now() > deleted_at.saturating_add(T::RestoreWindow::get()),
				Error::<T>::PurgeTooEarly
			);
			Heroes::<T>::remove(hero_id);
			Self::deposit_event(Event::HeroPurged { hero: hero_id });
			Ok(())
		}
	}

	#[pallet::validate_unsigned]
	impl<T: Config> ValidateUnsigned for Pallet<T> {
		type Call = Call<T>;

		fn validate_unsigned(_source: TransactionSource, call: &Self::Call) -> TransactionValidity {
			let now = T::Time::now();
			match call {
				Call::revive_hero { hero_id } => {
					let hero = Self::heroes(hero_id).ok_or(InvalidTransaction::Stale)?;
					let due = hero.is_dead && hero.dead_until.map_or(false, |until| until <= now);
					if !due {
						return InvalidTransaction::Stale.into();
					}
					ValidTransaction::with_tag_prefix("HeroMaintenanceOffchainWorker")
						.priority(T::UnsignedPriority::get())
						.and_provides(("revive", hero_id))
						.longevity(64_u64)
						.propagate(true)
						.build()
				}
				Call::purge_hero { hero_id } => {
					let hero = Self::heroes(hero_id).ok_or(InvalidTransaction::Stale)?;
					let expired = hero.is_deleted
						&& hero
							.deleted_at
							.map_or(false, |at| at.saturating_add(T::RestoreWindow::get()) < now);
					if !expired {
						return InvalidTransaction::Stale.into();
					}
					ValidTransaction::with_tag_prefix("HeroMaintenanceOffchainWorker")
						.priority(T::UnsignedPriority::get())
						.and_provides(("purge", hero_id))
						.longevity(64_u64)
						.propagate(true)
						.build()
				}
				_ => InvalidTransaction::Call.into(),
			}
		}
	}
}

impl<T: Config> Pallet<T> {
	pub fn do_generate_hero(
		who: &T::AccountId,
		generation: u8,
		currency: u32,
		locale: Locale,
	) -> Result<HeroId, DispatchError> {
		ensure!(
			(1..=10).contains(&generation),
			Error::<T>::InvalidGeneration
		);
		ensure!(
			Self::owned_hero_count(who) < T::MaxHeroes::get(),
			Error::<T>::TooManyHeroes
		);

		let price = T::GenerationUnitPrice::get().saturating_mul(currency as Balance);
		if !price.is_zero() {
			T::Ledger::adjust_balance(
				who,
				BalanceField::Balance,
				-(price as i128),
				LedgerEntryType::HeroGeneration,
				None,
			)?;
		}

		let hero_id = NextHeroId::<T>::mutate(|id| {
			let current = *id;
			*id = id.saturating_add(1);
			current
		});

		let seed: [u8; 32] = BlakeTwo256::hash_of(&(
			frame_system::Pallet::<T>::parent_hash(),
			who,
			hero_id,
			currency,
		))
		.into();
		let rolled = T::Generator::generate(&seed, generation, locale);

		let now = T::Time::now();
		Heroes::<T>::insert(
			hero_id,
			Hero {
				owner: who.clone(),
				name: rolled.name,
				nickname: rolled.nickname,
				generation,
				attributes: rolled.attributes,
				perks: rolled.perks,
				level: 1,
				experience: 0,
				is_training: false,
				training_end: None,
				is_dead: false,
				dead_until: None,
				is_on_auction: false,
				is_deleted: false,
				deleted_at: None,
				equipped_items: 0,
				locale,
				created_at: now,
			},
		);
		OwnedHeroCount::<T>::mutate(who, |count| *count = count.saturating_add(1));

		Self::deposit_event(Event::HeroGenerated {
			owner: who.clone(),
			hero: hero_id,
			generation,
			price,
		});
		Ok(hero_id)
	}

	/// Called by the combat system when a hero falls. Recovery is due after
	/// `RecoveryDuration`.
	pub fn mark_dead(hero_id: HeroId) -> DispatchResult {
		Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
			let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
			hero.is_dead = true;
			hero.dead_until = Some(T::Time::now().saturating_add(T::RecoveryDuration::get()));
			Ok(())
		})
	}

	/// Called by the training system.
	pub fn set_training(hero_id: HeroId, until: Option<Moment>) -> DispatchResult {
		Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
			let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
			hero.is_training = until.is_some();
			hero.training_end = until;
			Ok(())
		})
	}

	/// Called by the equipment system whenever pieces are worn or removed.
	pub fn set_equipped_items(hero_id: HeroId, count: u32) -> DispatchResult {
		Heroes::<T>::try_mutate(hero_id, |maybe_hero| -> DispatchResult {
			let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
			hero.equipped_items = count;
			Ok(())
		})
	}

	/// Live heroes of `owner`, ordered by id.
	pub fn heroes_of(
		owner: &T::AccountId,
		limit: u32,
		offset: u32,
	) -> PagedResult<(HeroId, Hero<T::AccountId>)> {
		let (limit, offset) = clamp_page(limit, offset);
		let mut matching: Vec<(HeroId, Hero<T::AccountId>)> = Heroes::<T>::iter()
			.filter(|(_, hero)| hero.is_live() && &hero.owner == owner)
			.collect();
		matching.sort_by_key(|(id, _)| *id);
		let total = matching.len() as u32;
		let items = matching
			.into_iter()
			.skip(offset as usize)
			.take(limit as usize)
			.collect();
		PagedResult {
			items,
			total,
			limit,
			offset,
		}
	}

	fn submit_revive_tx(hero_id: HeroId) {
		let call = Call::<T>::revive_hero { hero_id };
		if let Err(err) = SubmitTransaction::<T, Call<T>>::submit_unsigned_transaction(call.into()) {
			log::info!(
				target: "hero offchain worker",
				"submit unsigned revive tx for hero {:?} failed: {:?}",
				hero_id,
				err,
			);
		}
	}

	fn submit_purge_tx(hero_id: HeroId) {
		let call = Call::<T>::purge_hero { hero_id };
		if let Err(err) = SubmitTransaction::<T, Call<T>>::submit_unsigned_transaction(call.into()) {
			log::info!(
				target: "hero offchain worker",
				"submit unsigned purge tx for hero {:?} failed: {:?}",
				hero_id,
				err,
			);
		}
	}

	fn _offchain_worker() -> Result<(), OffchainErr> {
		if !sp_io::offchain::is_validator() {
			return Err(OffchainErr::NotValidator);
		}

		// at most one pass per interval, however fast blocks come
		let now = sp_io::offchain::timestamp();
		let last_run = StorageValueRef::persistent(OFFCHAIN_WORKER_LAST_RUN);
		if let Ok(Some(last)) = last_run.get::<u64>() {
			if now.unix_millis() < last.saturating_add(MAINTENANCE_INTERVAL) {
				return Ok(());
			}
		}

		let lock = LeasedLock::hero_maintenance_lock();
		let mut guard = lock.try_acquire()?;
		last_run.set(&now.unix_millis());

		let max_iterations = StorageValueRef::persistent(OFFCHAIN_WORKER_MAX_ITERATIONS)
			.get::<u32>()
			.unwrap_or(Some(DEFAULT_MAX_ITERATIONS))
			.unwrap_or(DEFAULT_MAX_ITERATIONS);

		let mut cursor = StorageValueRef::persistent(OFFCHAIN_WORKER_CURSOR);
		let start_key = cursor.get::<Vec<u8>>().ok().flatten();
		let mut iter = match start_key {
			Some(key) => Heroes::<T>::iter_from(key),
			None => Heroes::<T>::iter(),
		};

		let now_ms = T::Time::now();
		let restore_window = T::RestoreWindow::get();
		let mut iteration_count = 0u32;
		let mut last_key: Option<Vec<u8>> = None;
		let mut exhausted = true;

		#[allow(clippy::while_let_on_iterator)]
		while let Some((hero_id, hero)) = iter.next() {
			if hero.is_dead && hero.dead_until.map_or(false, |until| until <= now_ms) {
				Self::submit_revive_tx(hero_id);
			} else if hero.is_deleted
				&& hero
					.deleted_at
					.map_or(false, |at| at.saturating_add(restore_window) < now_ms)
			{
				Self::submit_purge_tx(hero_id);
			}

			iteration_count += 1;
			last_key = Some(Heroes::<T>::hashed_key_for(hero_id));
			guard.extend_if_needed()?;

			if iteration_count >= max_iterations {
				exhausted = false;
				break;
			}
		}

		// resume where the budget ran out, otherwise start over next pass
		if exhausted {
			cursor.clear();
		} else if let Some(key) = last_key {
			cursor.set(&key);
		}

		log::debug!(
			target: "hero offchain worker",
			"maintenance pass visited {:?} heroes",
			iteration_count,
		);

		guard.release()?;
		Ok(())
	}
}

impl<T: Config> HeroRegistry<T::AccountId> for Pallet<T> {
	fn owner(hero: HeroId) -> Option<T::AccountId> {
		Self::heroes(hero).filter(|h| h.is_live()).map(|h| h.owner)
	}

	fn ensure_listable(hero: HeroId, seller: &T::AccountId) -> DispatchResult {
		let hero = Self::heroes(hero).ok_or(Error::<T>::HeroNotFound)?;
		ensure!(!hero.is_deleted, Error::<T>::HeroNotFound);
		ensure!(&hero.owner == seller, Error::<T>::NoPermission);
		ensure!(!hero.is_dead, Error::<T>::HeroDead);
		ensure!(!hero.is_training, Error::<T>::HeroInTraining);
		ensure!(!hero.is_on_auction, Error::<T>::HeroOnAuction);
		ensure!(hero.equipped_items == 0, Error::<T>::HeroHasEquipment);
		Ok(())
	}

	fn set_on_auction(hero: HeroId, listed: bool) -> DispatchResult {
		Heroes::<T>::try_mutate(hero, |maybe_hero| -> DispatchResult {
			let hero = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
			hero.is_on_auction = listed;
			Ok(())
		})
	}

	fn transfer(hero: HeroId, to: &T::AccountId) -> DispatchResult {
		let from = Heroes::<T>::try_mutate(hero, |maybe_hero| -> Result<T::AccountId, DispatchError> {
			let h = maybe_hero.as_mut().ok_or(Error::<T>::HeroNotFound)?;
			let from = h.owner.clone();
			h.owner = to.clone();
			h.is_on_auction = false;
			Ok(from)
		})?;
		OwnedHeroCount::<T>::mutate(&from, |count| *count = count.saturating_sub(1));
		OwnedHeroCount::<T>::mutate(to, |count| *count = count.saturating_add(1));
		Self::deposit_event(Event::HeroTransferred {
			hero,
			from,
			to: to.clone(),
		});
		Ok(())
	}
}
