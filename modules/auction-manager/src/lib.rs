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

//! # Auction Manager Module
//!
//! ## Overview
//!
//! Auction the assets of the arena economy. Auction types include:
//!   - `item auction`: sell a stack of catalog items out of the seller's
//!     stash to the highest bidder
//!   - `hero lot`: sell a unique hero; ownership moves to the winner when
//!     the lot closes
//!
//! Bids earmark the bidder's funds through the ledger: accepting a bid
//! reserves the amount, outbidding releases the previous bidder's
//! reservation, and closing converts the winner's reservation into the
//! seller's payout. Every step of an operation happens inside one dispatch,
//! so a failure anywhere rolls the whole thing back.
//!
//! Expired rows are closed by the offchain expiry sweeper: at most one
//! instance sweeps at a time (leased lock), and the actual closes are
//! unsigned transactions that re-check state on dispatch, so a close
//! happens exactly once no matter how many sweepers race.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::unused_unit)]

use frame_support::{pallet_prelude::*, traits::Time};
use frame_system::{
	offchain::{SendTransactionTypes, SubmitTransaction},
	pallet_prelude::*,
};
use primitives::{
	clamp_page, AuctionId, AuctionStatus, Balance, BalanceField, BidId, BidTarget, HeroId, ItemId,
	LedgerEntryType, LotId, Moment, PagedResult, RequestId,
	time::MILLISECS_PER_HOUR,
};
use sp_runtime::{
	offchain::storage::StorageValueRef,
	traits::Zero,
	transaction_validity::{
		InvalidTransaction, TransactionPriority, TransactionSource, TransactionValidity,
		ValidTransaction,
	},
};
use sp_std::prelude::*;
use support::{cache_keys, CacheInvalidate, CurrencyLedger, HeroRegistry, ItemStash};
use utilities::{LeasedLock, OffchainErr};

mod mock;
pub mod weights;

pub use module::*;
pub use weights::WeightInfo;

pub const OFFCHAIN_WORKER_CURSOR: &[u8] = b"arena/auction-manager/cursor/";
pub const OFFCHAIN_WORKER_LAST_RUN: &[u8] = b"arena/auction-manager/last-run/";
pub const OFFCHAIN_WORKER_MAX_ITERATIONS: &[u8] = b"arena/auction-manager/max-iterations/";
/// The sweeper wakes at most once per minute.
pub const SWEEP_INTERVAL: u64 = 60_000;
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Auction durations are clamped into this window, not rejected.
pub const MIN_AUCTION_DURATION: Moment = MILLISECS_PER_HOUR;
pub const MAX_AUCTION_DURATION: Moment = 24 * MILLISECS_PER_HOUR;

/// Information of an item auction.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct ItemAuction<AccountId> {
	pub item_id: ItemId,
	pub seller: AccountId,
	#[codec(compact)]
	pub quantity: u32,
	#[codec(compact)]
	pub start_price: Balance,
	/// The highest accepted bid, or `start_price` while there are none.
	#[codec(compact)]
	pub current_price: Balance,
	pub end_time: Moment,
	pub status: AuctionStatus,
	pub winner: Option<AccountId>,
	pub created_at: Moment,
}

impl<AccountId> ItemAuction<AccountId> {
	fn has_bids(&self) -> bool {
		self.winner.is_some()
	}
}

/// Information of a hero lot.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct HeroLot<AccountId> {
	pub hero_id: HeroId,
	pub seller: AccountId,
	#[codec(compact)]
	pub starting_price: Balance,
	#[codec(compact)]
	pub current_price: Balance,
	pub buyout_price: Option<Balance>,
	pub end_time: Moment,
	pub status: AuctionStatus,
	pub winner: Option<AccountId>,
	pub created_at: Moment,
}

impl<AccountId> HeroLot<AccountId> {
	fn has_bids(&self) -> bool {
		self.winner.is_some()
	}
}

/// An accepted bid. Bids are append-only; the row with the highest amount
/// per target matches the target's `current_price` and `winner`.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Bid<AccountId> {
	pub target: BidTarget,
	pub bidder: AccountId,
	#[codec(compact)]
	pub amount: Balance,
	pub request_id: Option<RequestId>,
	pub created_at: Moment,
}

#[frame_support::pallet]
pub mod module {
	use super::*;

	#[pallet::config]
	pub trait Config: frame_system::Config + SendTransactionTypes<Call<Self>> {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Wall-clock source for end times.
		type Time: Time<Moment = Moment>;

		/// Money movements: reservations, releases and payouts.
		type Ledger: CurrencyLedger<Self::AccountId>;

		/// Item stock movements on create/cancel/close.
		type Stash: ItemStash<Self::AccountId>;

		/// Hero gating and ownership transfer for lots.
		type Heroes: HeroRegistry<Self::AccountId>;

		/// Listing caches to drop after successful commits.
		type Cache: CacheInvalidate;

		#[pallet::constant]
		/// A configuration for base priority of unsigned transactions.
		///
		/// This is exposed so that it can be tuned for particular runtime,
		/// when multiple modules send unsigned transactions.
		type UnsignedPriority: Get<TransactionPriority>;

		/// Weight information for the extrinsics in this module.
		type WeightInfo: WeightInfo;
	}

	#[pallet::error]
	pub enum Error<T> {
		/// The auction does not exist.
		AuctionNotFound,
		/// The lot does not exist.
		LotNotFound,
		/// The row is no longer active, or its end time has passed.
		NotActive,
		/// Sellers cannot bid on their own listings.
		SelfBid,
		/// The bid does not beat the current price.
		BidTooLow,
		/// `balance - reserved` does not cover the amount.
		InsufficientFunds,
		/// Start price must be positive.
		InvalidPrice,
		/// Quantity must be at least one.
		InvalidQuantity,
		/// An auto-bid ceiling must be positive.
		InvalidAmount,
		/// Only the seller may do this.
		NoPermission,
		/// The listing already collected bids.
		HasBids,
		/// There is already an active lot for this hero.
		DuplicateLot,
		/// The row has not expired yet.
		NotExpired,
	}

	#[pallet::event]
	#[pallet::generate_deposit(pub(crate) fn deposit_event)]
	pub enum Event<T: Config> {
		/// Item auction created.
		AuctionCreated {
			auction_id: AuctionId,
			seller: T::AccountId,
			item_id: ItemId,
			quantity: u32,
			start_price: Balance,
			end_time: Moment,
		},
		/// Active item auction cancelled by its seller; stock returned.
		AuctionCancelled { auction_id: AuctionId },
		/// Item auction closed.
		AuctionClosed {
			auction_id: AuctionId,
			winner: Option<T::AccountId>,
			price: Balance,
		},
		/// Hero lot created.
		LotCreated {
			lot_id: LotId,
			seller: T::AccountId,
			hero_id: HeroId,
			starting_price: Balance,
			end_time: Moment,
		},
		/// Bid-free hero lot removed by its seller.
		LotDeleted { lot_id: LotId },
		/// Hero lot closed.
		LotClosed {
			lot_id: LotId,
			winner: Option<T::AccountId>,
			price: Balance,
		},
		/// A bid was accepted and the amount reserved.
		BidPlaced {
			bid_id: BidId,
			target: BidTarget,
			bidder: T::AccountId,
			amount: Balance,
		},
		/// An auto-bid ceiling was created or updated.
		AutoBidSet {
			who: T::AccountId,
			target: BidTarget,
			max_amount: Balance,
		},
	}

	/// Mapping from auction id to item auction info.
	#[pallet::storage]
	#[pallet::getter(fn item_auctions)]
	pub type ItemAuctions<T: Config> =
		StorageMap<_, Twox64Concat, AuctionId, ItemAuction<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_auction_id)]
	pub type NextAuctionId<T: Config> = StorageValue<_, AuctionId, ValueQuery>;

	/// Mapping from lot id to hero lot info.
	#[pallet::storage]
	#[pallet::getter(fn hero_lots)]
	pub type HeroLots<T: Config> =
		StorageMap<_, Twox64Concat, LotId, HeroLot<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_lot_id)]
	pub type NextLotId<T: Config> = StorageValue<_, LotId, ValueQuery>;

	/// The active lot per hero. At most one entry per hero; removed when
	/// the lot leaves the active state.
	#[pallet::storage]
	#[pallet::getter(fn lot_by_hero)]
	pub type LotByHero<T: Config> = StorageMap<_, Twox64Concat, HeroId, LotId, OptionQuery>;

	/// Append-only bid log.
	#[pallet::storage]
	#[pallet::getter(fn bids)]
	pub type Bids<T: Config> = StorageMap<_, Twox64Concat, BidId, Bid<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_bid_id)]
	pub type NextBidId<T: Config> = StorageValue<_, BidId, ValueQuery>;

	/// Idempotency index: client request id to the bid it produced.
	/// Globally unique across item and lot bids.
	#[pallet::storage]
	#[pallet::getter(fn bid_requests)]
	pub type BidRequests<T: Config> =
		StorageMap<_, Blake2_128Concat, RequestId, BidId, OptionQuery>;

	/// Auto-bid ceilings: one per (user, target), the value is the reserved
	/// maximum.
	#[pallet::storage]
	#[pallet::getter(fn auto_bids)]
	pub type AutoBids<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		T::AccountId,
		Twox64Concat,
		BidTarget,
		Balance,
		OptionQuery,
	>;

	#[pallet::pallet]
	pub struct Pallet<T>(_);

	#[pallet::hooks]
	impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
		/// Start the expiry sweeper: submit unsigned close transactions for
		/// expired auctions and lots.
		fn offchain_worker(now: BlockNumberFor<T>) {
			if let Err(e) = Self::_offchain_worker() {
				log::info!(
					target: "auction-manager offchain worker",
					"cannot run offchain worker at {:?}: {:?}",
					now,
					e,
				);
			} else {
				log::debug!(
					target: "auction-manager offchain worker",
					"offchain worker start at block: {:?} already done!",
					now,
				);
			}
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Put a stack of items up for auction. The stock leaves the
		/// seller's stash immediately; duration is clamped into
		/// [1, 24] hours.
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::create_auction())]
		pub fn create_auction(
			origin: OriginFor<T>,
			item_id: ItemId,
			#[pallet::compact] quantity: u32,
			#[pallet::compact] start_price: Balance,
			duration_hours: u32,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Self::do_create_auction(&who, item_id, quantity, start_price, duration_hours)?;
			Ok(())
		}

		/// Cancel an active, bid-free auction and return the stock. Only
		/// the seller, only before expiry.
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::cancel_auction())]
		pub fn cancel_auction(origin: OriginFor<T>, auction_id: AuctionId) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ItemAuctions::<T>::try_mutate(auction_id, |maybe_auction| -> DispatchResult {
				let auction = maybe_auction.as_mut().ok_or(Error::<T>::AuctionNotFound)?;
				ensure!(auction.seller == who, Error::<T>::NoPermission);
				ensure!(
					auction.status.is_active() && auction.end_time > T::Time::now(),
					Error::<T>::NotActive
				);
				ensure!(!auction.has_bids(), Error::<T>::HasBids);
				auction.status = AuctionStatus::Cancelled;
				T::Stash::deposit(&auction.seller, auction.item_id, auction.quantity)?;
				Ok(())
			})?;
			Self::deposit_event(Event::AuctionCancelled { auction_id });
			T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
			Ok(())
		}

		/// Close an expired auction: pay the seller out of the winner's
		/// reservation and hand over the stock, or return the stock when
		/// nobody bid. Closing a non-active auction is a no-op.
		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::close_auction())]
		pub fn close_auction(origin: OriginFor<T>, auction_id: AuctionId) -> DispatchResult {
			ensure_signed(origin)?;
			Self::do_close_auction(auction_id)
		}

		/// Put a hero up for auction. The hero must be listable (owned by
		/// the caller, alive, idle, unequipped) and not already on a lot.
		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::create_lot())]
		pub fn create_lot(
			origin: OriginFor<T>,
			hero_id: HeroId,
			#[pallet::compact] starting_price: Balance,
			buyout_price: Option<Balance>,
			duration_hours: u32,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Self::do_create_lot(&who, hero_id, starting_price, buyout_price, duration_hours)?;
			Ok(())
		}

		/// Take a bid-free lot down and free the hero. Only the seller.
		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::delete_lot())]
		pub fn delete_lot(origin: OriginFor<T>, lot_id: LotId) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let lot = Self::hero_lots(lot_id).ok_or(Error::<T>::LotNotFound)?;
			ensure!(lot.seller == who, Error::<T>::NoPermission);
			ensure!(lot.status.is_active(), Error::<T>::NotActive);
			ensure!(!lot.has_bids(), Error::<T>::HasBids);

			T::Heroes::set_on_auction(lot.hero_id, false)?;
			LotByHero::<T>::remove(lot.hero_id);
			HeroLots::<T>::remove(lot_id);

			Self::deposit_event(Event::LotDeleted { lot_id });
			T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
			T::Cache::invalidate(cache_keys::ACTIVE_LOTS);
			Ok(())
		}

		/// Close an expired lot: settle money like an auction close and move
		/// the hero to the winner. Closing a non-active lot is a no-op.
		#[pallet::call_index(5)]
		#[pallet::weight(T::WeightInfo::close_lot())]
		pub fn close_lot(origin: OriginFor<T>, lot_id: LotId) -> DispatchResult {
			ensure_signed(origin)?;
			Self::do_close_lot(lot_id)
		}

		/// Bid on an auction or lot. The amount is reserved on the bidder;
		/// the previous highest reservation is released. A repeated
		/// `request_id` is answered idempotently without charging again.
		#[pallet::call_index(6)]
		#[pallet::weight(T::WeightInfo::place_bid())]
		pub fn place_bid(
			origin: OriginFor<T>,
			target: BidTarget,
			#[pallet::compact] amount: Balance,
			request_id: Option<RequestId>,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Self::do_place_bid(&who, target, amount, request_id)?;
			Ok(())
		}

		/// Create or move an auto-bid ceiling. Creating reserves the full
		/// ceiling, updating moves the delta, a zero ceiling removes the
		/// record and releases the remainder.
		#[pallet::call_index(7)]
		#[pallet::weight(T::WeightInfo::set_auto_bid())]
		pub fn set_auto_bid(
			origin: OriginFor<T>,
			target: BidTarget,
			#[pallet::compact] max_amount: Balance,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			Self::do_set_auto_bid(&who, target, max_amount)?;
			Ok(())
		}

		/// Close an expired auction on behalf of the sweeper.
		///
		/// The dispatch origin of this call must be _None_.
		#[pallet::call_index(8)]
		#[pallet::weight(T::WeightInfo::close_expired_auction())]
		pub fn close_expired_auction(origin: OriginFor<T>, auction_id: AuctionId) -> DispatchResult {
			ensure_none(origin)?;
			Self::do_close_auction(auction_id)
		}

		/// Close an expired lot on behalf of the sweeper.
		///
		/// The dispatch origin of this call must be _None_.
		#[pallet::call_index(9)]
		#[pallet::weight(T::WeightInfo::close_expired_lot())]
		pub fn close_expired_lot(origin: OriginFor<T>, lot_id: LotId) -> DispatchResult {
			ensure_none(origin)?;
			Self::do_close_lot(lot_id)
		}
	}

	#[pallet::validate_unsigned]
	impl<T: Config> ValidateUnsigned for Pallet<T> {
		type Call = Call<T>;

		fn validate_unsigned(_source: TransactionSource, call: &Self::Call) -> TransactionValidity {
			let now = T::Time::now();
			match call {
				Call::close_expired_auction { auction_id } => {
					let auction =
						Self::item_auctions(auction_id).ok_or(InvalidTransaction::Stale)?;
					if !auction.status.is_active() || auction.end_time > now {
						return InvalidTransaction::Stale.into();
					}
					ValidTransaction::with_tag_prefix("AuctionManagerOffchainWorker")
						.priority(T::UnsignedPriority::get())
						.and_provides(("auction", auction_id))
						.longevity(64_u64)
						.propagate(true)
						.build()
				}
				Call::close_expired_lot { lot_id } => {
					let lot = Self::hero_lots(lot_id).ok_or(InvalidTransaction::Stale)?;
					if !lot.status.is_active() || lot.end_time > now {
						return InvalidTransaction::Stale.into();
					}
					ValidTransaction::with_tag_prefix("AuctionManagerOffchainWorker")
						.priority(T::UnsignedPriority::get())
						.and_provides(("lot", lot_id))
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
	/// Clamp a requested duration into the allowed window. Out-of-range
	/// requests are accepted and clamped, not rejected.
	fn clamp_duration(duration_hours: u32) -> Moment {
		(duration_hours as Moment)
			.saturating_mul(MILLISECS_PER_HOUR)
			.clamp(MIN_AUCTION_DURATION, MAX_AUCTION_DURATION)
	}

	pub fn do_create_auction(
		seller: &T::AccountId,
		item_id: ItemId,
		quantity: u32,
		start_price: Balance,
		duration_hours: u32,
	) -> Result<AuctionId, DispatchError> {
		ensure!(quantity >= 1, Error::<T>::InvalidQuantity);
		ensure!(!start_price.is_zero(), Error::<T>::InvalidPrice);

		// stock leaves the stash up front; a later failure rolls it back
		T::Stash::withdraw(seller, item_id, quantity)?;

		let now = T::Time::now();
		let end_time = now.saturating_add(Self::clamp_duration(duration_hours));
		let auction_id = NextAuctionId::<T>::mutate(|id| {
			let current = *id;
			*id = id.saturating_add(1);
			current
		});

		ItemAuctions::<T>::insert(
			auction_id,
			ItemAuction {
				item_id,
				seller: seller.clone(),
				quantity,
				start_price,
				current_price: start_price,
				end_time,
				status: AuctionStatus::Active,
				winner: None,
				created_at: now,
			},
		);

		Self::deposit_event(Event::AuctionCreated {
			auction_id,
			seller: seller.clone(),
			item_id,
			quantity,
			start_price,
			end_time,
		});
		T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
		Ok(auction_id)
	}

	pub fn do_create_lot(
		seller: &T::AccountId,
		hero_id: HeroId,
		starting_price: Balance,
		buyout_price: Option<Balance>,
		duration_hours: u32,
	) -> Result<LotId, DispatchError> {
		ensure!(!starting_price.is_zero(), Error::<T>::InvalidPrice);
		ensure!(
			!LotByHero::<T>::contains_key(hero_id),
			Error::<T>::DuplicateLot
		);

		T::Heroes::ensure_listable(hero_id, seller)?;
		T::Heroes::set_on_auction(hero_id, true)?;

		let now = T::Time::now();
		let end_time = now.saturating_add(Self::clamp_duration(duration_hours));
		let lot_id = NextLotId::<T>::mutate(|id| {
			let current = *id;
			*id = id.saturating_add(1);
			current
		});

		HeroLots::<T>::insert(
			lot_id,
			HeroLot {
				hero_id,
				seller: seller.clone(),
				starting_price,
				current_price: starting_price,
				buyout_price,
				end_time,
				status: AuctionStatus::Active,
				winner: None,
				created_at: now,
			},
		);
		LotByHero::<T>::insert(hero_id, lot_id);

		Self::deposit_event(Event::LotCreated {
			lot_id,
			seller: seller.clone(),
			hero_id,
			starting_price,
			end_time,
		});
		T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
		T::Cache::invalidate(cache_keys::ACTIVE_LOTS);
		Ok(lot_id)
	}

	pub fn do_place_bid(
		bidder: &T::AccountId,
		target: BidTarget,
		amount: Balance,
		request_id: Option<RequestId>,
	) -> DispatchResult {
		// idempotency: a replayed request id is answered with the original
		// outcome and must not charge again
		if let Some(ref rid) = request_id {
			if BidRequests::<T>::contains_key(rid) {
				return Ok(());
			}
		}

		match target {
			BidTarget::Auction(auction_id) => Self::auction_bid_handler(bidder, auction_id, amount)?,
			BidTarget::Lot(lot_id) => Self::lot_bid_handler(bidder, lot_id, amount)?,
		}

		let bid_id = NextBidId::<T>::mutate(|id| {
			let current = *id;
			*id = id.saturating_add(1);
			current
		});
		Bids::<T>::insert(
			bid_id,
			Bid {
				target,
				bidder: bidder.clone(),
				amount,
				request_id: request_id.clone(),
				created_at: T::Time::now(),
			},
		);
		if let Some(rid) = request_id {
			BidRequests::<T>::insert(rid, bid_id);
		}

		Self::deposit_event(Event::BidPlaced {
			bid_id,
			target,
			bidder: bidder.clone(),
			amount,
		});
		T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
		if matches!(target, BidTarget::Lot(_)) {
			T::Cache::invalidate(cache_keys::ACTIVE_LOTS);
		}
		Ok(())
	}

	/// Handles an item auction bid: validates, moves reservations and
	/// updates the row. Runs inside the surrounding dispatch transaction.
	fn auction_bid_handler(
		bidder: &T::AccountId,
		auction_id: AuctionId,
		amount: Balance,
	) -> DispatchResult {
		ItemAuctions::<T>::try_mutate(auction_id, |maybe_auction| -> DispatchResult {
			let auction = maybe_auction.as_mut().ok_or(Error::<T>::AuctionNotFound)?;
			ensure!(
				auction.status.is_active() && auction.end_time > T::Time::now(),
				Error::<T>::NotActive
			);
			ensure!(&auction.seller != bidder, Error::<T>::SelfBid);
			ensure!(amount > auction.current_price, Error::<T>::BidTooLow);
			ensure!(
				T::Ledger::available(bidder) >= amount,
				Error::<T>::InsufficientFunds
			);

			// an outbid opponent gets their reservation back; a bidder
			// raising their own bid keeps the old reservation and stacks
			// the new one
			if let Some(previous) = auction.winner.clone() {
				if &previous != bidder {
					T::Ledger::adjust_balance(
						&previous,
						BalanceField::Reserved,
						-(auction.current_price as i128),
						LedgerEntryType::BidReleaseReserved,
						Some(auction_id),
					)?;
				}
			}

			T::Ledger::adjust_balance(
				bidder,
				BalanceField::Reserved,
				amount as i128,
				LedgerEntryType::BidReserve,
				Some(auction_id),
			)?;

			auction.current_price = amount;
			auction.winner = Some(bidder.clone());
			Ok(())
		})
	}

	/// Handles a hero lot bid. Same shape as the auction handler.
	fn lot_bid_handler(bidder: &T::AccountId, lot_id: LotId, amount: Balance) -> DispatchResult {
		HeroLots::<T>::try_mutate(lot_id, |maybe_lot| -> DispatchResult {
			let lot = maybe_lot.as_mut().ok_or(Error::<T>::LotNotFound)?;
			ensure!(
				lot.status.is_active() && lot.end_time > T::Time::now(),
				Error::<T>::NotActive
			);
			ensure!(&lot.seller != bidder, Error::<T>::SelfBid);
			ensure!(amount > lot.current_price, Error::<T>::BidTooLow);
			ensure!(
				T::Ledger::available(bidder) >= amount,
				Error::<T>::InsufficientFunds
			);

			if let Some(previous) = lot.winner.clone() {
				if &previous != bidder {
					T::Ledger::adjust_balance(
						&previous,
						BalanceField::Reserved,
						-(lot.current_price as i128),
						LedgerEntryType::BidReleaseReserved,
						Some(lot_id),
					)?;
				}
			}

			T::Ledger::adjust_balance(
				bidder,
				BalanceField::Reserved,
				amount as i128,
				LedgerEntryType::BidReserve,
				Some(lot_id),
			)?;

			lot.current_price = amount;
			lot.winner = Some(bidder.clone());
			Ok(())
		})
	}

	pub fn do_set_auto_bid(
		who: &T::AccountId,
		target: BidTarget,
		max_amount: Balance,
	) -> DispatchResult {
		// the target must exist and still be running
		let now = T::Time::now();
		match target {
			BidTarget::Auction(id) => {
				let auction = Self::item_auctions(id).ok_or(Error::<T>::AuctionNotFound)?;
				ensure!(
					auction.status.is_active() && auction.end_time > now,
					Error::<T>::NotActive
				);
			}
			BidTarget::Lot(id) => {
				let lot = Self::hero_lots(id).ok_or(Error::<T>::LotNotFound)?;
				ensure!(
					lot.status.is_active() && lot.end_time > now,
					Error::<T>::NotActive
				);
			}
		}

		let reference = match target {
			BidTarget::Auction(id) => Some(id),
			BidTarget::Lot(id) => Some(id),
		};

		// increases must fit in the caller's available funds before the
		// ledger moves anything
		let previous_ceiling = AutoBids::<T>::get(who, target).unwrap_or_default();
		if max_amount > previous_ceiling {
			ensure!(
				T::Ledger::available(who) >= max_amount - previous_ceiling,
				Error::<T>::InsufficientFunds
			);
		}

		match AutoBids::<T>::get(who, target) {
			Some(previous) => {
				if max_amount.is_zero() {
					// dropping the ceiling releases the whole reservation
					T::Ledger::adjust_balance(
						who,
						BalanceField::Reserved,
						-(previous as i128),
						LedgerEntryType::AutoBidReserveUpdate,
						reference,
					)?;
					AutoBids::<T>::remove(who, target);
				} else {
					let delta = (max_amount as i128).saturating_sub(previous as i128);
					if delta != 0 {
						T::Ledger::adjust_balance(
							who,
							BalanceField::Reserved,
							delta,
							LedgerEntryType::AutoBidReserveUpdate,
							reference,
						)?;
					}
					AutoBids::<T>::insert(who, target, max_amount);
				}
			}
			None => {
				ensure!(!max_amount.is_zero(), Error::<T>::InvalidAmount);
				T::Ledger::adjust_balance(
					who,
					BalanceField::Reserved,
					max_amount as i128,
					LedgerEntryType::AutoBidReserve,
					reference,
				)?;
				AutoBids::<T>::insert(who, target, max_amount);
			}
		}

		Self::deposit_event(Event::AutoBidSet {
			who: who.clone(),
			target,
			max_amount,
		});
		Ok(())
	}

	/// The close state machine for item auctions. Closing requires expiry;
	/// a non-active row is an idempotent no-op.
	pub fn do_close_auction(auction_id: AuctionId) -> DispatchResult {
		let closed = ItemAuctions::<T>::try_mutate(
			auction_id,
			|maybe_auction| -> Result<Option<(Option<T::AccountId>, Balance)>, DispatchError> {
				let auction = maybe_auction.as_mut().ok_or(Error::<T>::AuctionNotFound)?;
				if !auction.status.is_active() {
					// double close is safe and changes nothing
					return Ok(None);
				}
				ensure!(auction.end_time <= T::Time::now(), Error::<T>::NotExpired);

				if let Some(winner) = auction.winner.clone() {
					let price = auction.current_price;
					// the winner's reservation becomes the seller's payout
					T::Ledger::adjust_balance(
						&winner,
						BalanceField::Reserved,
						-(price as i128),
						LedgerEntryType::AuctionReleaseReserved,
						Some(auction_id),
					)?;
					T::Ledger::adjust_balance(
						&auction.seller,
						BalanceField::Balance,
						price as i128,
						LedgerEntryType::AuctionPayout,
						Some(auction_id),
					)?;
					T::Stash::deposit(&winner, auction.item_id, auction.quantity)?;
				} else {
					T::Stash::deposit(&auction.seller, auction.item_id, auction.quantity)?;
				}

				auction.status = AuctionStatus::Finished;
				Ok(Some((auction.winner.clone(), auction.current_price)))
			},
		)?;

		if let Some((winner, price)) = closed {
			Self::deposit_event(Event::AuctionClosed {
				auction_id,
				winner,
				price,
			});
			T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
		}
		Ok(())
	}

	/// The close state machine for hero lots; additionally moves the hero.
	pub fn do_close_lot(lot_id: LotId) -> DispatchResult {
		let closed = HeroLots::<T>::try_mutate(
			lot_id,
			|maybe_lot| -> Result<Option<(Option<T::AccountId>, Balance)>, DispatchError> {
				let lot = maybe_lot.as_mut().ok_or(Error::<T>::LotNotFound)?;
				if !lot.status.is_active() {
					return Ok(None);
				}
				ensure!(lot.end_time <= T::Time::now(), Error::<T>::NotExpired);

				if let Some(winner) = lot.winner.clone() {
					let price = lot.current_price;
					T::Ledger::adjust_balance(
						&winner,
						BalanceField::Reserved,
						-(price as i128),
						LedgerEntryType::AuctionReleaseReserved,
						Some(lot_id),
					)?;
					T::Ledger::adjust_balance(
						&lot.seller,
						BalanceField::Balance,
						price as i128,
						LedgerEntryType::AuctionPayout,
						Some(lot_id),
					)?;
					// ownership moves and the hero leaves the auction house
					T::Heroes::transfer(lot.hero_id, &winner)?;
				} else {
					T::Heroes::set_on_auction(lot.hero_id, false)?;
				}

				LotByHero::<T>::remove(lot.hero_id);
				lot.status = AuctionStatus::Finished;
				Ok(Some((lot.winner.clone(), lot.current_price)))
			},
		)?;

		if let Some((winner, price)) = closed {
			Self::deposit_event(Event::LotClosed {
				lot_id,
				winner,
				price,
			});
			T::Cache::invalidate(cache_keys::ACTIVE_AUCTIONS);
			T::Cache::invalidate(cache_keys::ACTIVE_LOTS);
		}
		Ok(())
	}

	/// Item auctions, ordered by id. The default view includes finished
	/// and cancelled rows for history browsing; `active_only` restricts it
	/// to running auctions. `limit` is clamped to [1, 100].
	pub fn list_auctions(
		active_only: bool,
		limit: u32,
		offset: u32,
	) -> PagedResult<(AuctionId, ItemAuction<T::AccountId>)> {
		let (limit, offset) = clamp_page(limit, offset);
		let now = T::Time::now();
		let mut matching: Vec<(AuctionId, ItemAuction<T::AccountId>)> = ItemAuctions::<T>::iter()
			.filter(|(_, auction)| {
				!active_only || (auction.status.is_active() && auction.end_time > now)
			})
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

	/// Active hero lots, ordered by id.
	pub fn active_lots(limit: u32, offset: u32) -> PagedResult<(LotId, HeroLot<T::AccountId>)> {
		let (limit, offset) = clamp_page(limit, offset);
		let now = T::Time::now();
		let mut matching: Vec<(LotId, HeroLot<T::AccountId>)> = HeroLots::<T>::iter()
			.filter(|(_, lot)| lot.status.is_active() && lot.end_time > now)
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

	fn submit_close_auction_tx(auction_id: AuctionId) {
		let call = Call::<T>::close_expired_auction { auction_id };
		if let Err(err) = SubmitTransaction::<T, Call<T>>::submit_unsigned_transaction(call.into()) {
			log::info!(
				target: "auction-manager offchain worker",
				"submit unsigned auction close tx for AuctionId {:?} failed: {:?}",
				auction_id,
				err,
			);
		}
	}

	fn submit_close_lot_tx(lot_id: LotId) {
		let call = Call::<T>::close_expired_lot { lot_id };
		if let Err(err) = SubmitTransaction::<T, Call<T>>::submit_unsigned_transaction(call.into()) {
			log::info!(
				target: "auction-manager offchain worker",
				"submit unsigned lot close tx for LotId {:?} failed: {:?}",
				lot_id,
				err,
			);
		}
	}

	fn _offchain_worker() -> Result<(), OffchainErr> {
		if !sp_io::offchain::is_validator() {
			return Err(OffchainErr::NotValidator);
		}

		// wake at most once per sweep interval
		let now = sp_io::offchain::timestamp();
		let last_run = StorageValueRef::persistent(OFFCHAIN_WORKER_LAST_RUN);
		if let Ok(Some(last)) = last_run.get::<u64>() {
			if now.unix_millis() < last.saturating_add(SWEEP_INTERVAL) {
				return Ok(());
			}
		}

		// one sweeping instance at a time; losing the race is fine, the
		// holder is doing the work
		let lock = LeasedLock::sweep_lock();
		let mut guard = lock.try_acquire()?;
		last_run.set(&now.unix_millis());

		let max_iterations = StorageValueRef::persistent(OFFCHAIN_WORKER_MAX_ITERATIONS)
			.get::<u32>()
			.unwrap_or(Some(DEFAULT_MAX_ITERATIONS))
			.unwrap_or(DEFAULT_MAX_ITERATIONS);

		// resume where the previous pass ran out of budget:
		// phase 0 sweeps auctions, phase 1 sweeps lots
		let mut cursor = StorageValueRef::persistent(OFFCHAIN_WORKER_CURSOR);
		let (start_phase, start_key) = cursor
			.get::<(u8, Option<Vec<u8>>)>()
			.ok()
			.flatten()
			.unwrap_or((0, None));

		let now_ms = T::Time::now();
		let mut iteration_count = 0u32;
		let mut next_cursor: Option<(u8, Option<Vec<u8>>)> = None;

		if start_phase == 0 {
			let mut iter = match start_key.clone() {
				Some(key) => ItemAuctions::<T>::iter_from(key),
				None => ItemAuctions::<T>::iter(),
			};
			#[allow(clippy::while_let_on_iterator)]
			while let Some((auction_id, auction)) = iter.next() {
				if auction.status.is_active() && auction.end_time <= now_ms {
					Self::submit_close_auction_tx(auction_id);
				}
				iteration_count += 1;
				guard.extend_if_needed()?;
				if iteration_count >= max_iterations {
					next_cursor = Some((0, Some(ItemAuctions::<T>::hashed_key_for(auction_id))));
					break;
				}
			}
		}

		if next_cursor.is_none() {
			let lot_start_key = if start_phase == 1 { start_key } else { None };
			let mut iter = match lot_start_key {
				Some(key) => HeroLots::<T>::iter_from(key),
				None => HeroLots::<T>::iter(),
			};
			#[allow(clippy::while_let_on_iterator)]
			while let Some((lot_id, lot)) = iter.next() {
				if lot.status.is_active() && lot.end_time <= now_ms {
					Self::submit_close_lot_tx(lot_id);
				}
				iteration_count += 1;
				guard.extend_if_needed()?;
				if iteration_count >= max_iterations {
					next_cursor = Some((1, Some(HeroLots::<T>::hashed_key_for(lot_id))));
					break;
				}
			}
		}

		match next_cursor {
			Some(cursor_value) => cursor.set(&cursor_value),
			None => cursor.clear(),
		}

		log::debug!(
			target: "auction-manager offchain worker",
			"sweep pass visited {:?} rows",
			iteration_count,
		);

		// the pass is done; hand the lock back for the next interval
		guard.release()?;
		Ok(())
	}
}
