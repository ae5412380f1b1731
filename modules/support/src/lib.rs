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

//! Traits at the seams between the arena economy modules. Engines depend on
//! these instead of each other, and the mock runtimes wire them to the real
//! modules or to recorders.

#![cfg_attr(not(feature = "std"), no_std)]

use codec::{Decode, Encode, MaxEncodedLen};
use primitives::{Amount, Balance, BalanceField, HeroId, ItemId, LedgerEntryType, Locale};
use scale_info::TypeInfo;
use sp_core::ConstU32;
use sp_runtime::{BoundedVec, DispatchResult, RuntimeDebug};

#[cfg(feature = "std")]
pub mod mocks;

/// Cache keys invalidated by the engines after successful commits. A
/// trailing `*` is a prefix wildcard, resolved by the cache adapter.
pub mod cache_keys {
	pub const ACTIVE_AUCTIONS: &[u8] = b"auctions:active*";
	pub const ACTIVE_LOTS: &[u8] = b"auctions:active_lots*";
}

/// The double-entry money ledger. Every balance or reserved mutation in the
/// system goes through `adjust_balance`, which appends a ledger row for each
/// accepted delta.
pub trait CurrencyLedger<AccountId> {
	fn balance(who: &AccountId) -> Balance;
	fn reserved(who: &AccountId) -> Balance;

	/// `balance - reserved`: the funds usable for new bids and purchases.
	fn available(who: &AccountId) -> Balance;

	/// Apply a signed delta to one side of the account. Fails without
	/// side effects if the post-state would violate
	/// `balance >= reserved >= 0`.
	fn adjust_balance(
		who: &AccountId,
		field: BalanceField,
		amount: Amount,
		reason: LedgerEntryType,
		reference: Option<u32>,
	) -> DispatchResult;
}

/// Per-user item inventory keyed by catalog item.
pub trait ItemStash<AccountId> {
	fn quantity(owner: &AccountId, item: ItemId) -> u32;

	/// Add items to an owner's stash, creating the row if needed.
	fn deposit(owner: &AccountId, item: ItemId, quantity: u32) -> DispatchResult;

	/// Remove items from an owner's stash; deletes the row when it reaches
	/// zero. Fails if the owner holds fewer than `quantity`.
	fn withdraw(owner: &AccountId, item: ItemId, quantity: u32) -> DispatchResult;
}

/// The hero roster, as seen by the lot engine.
pub trait HeroRegistry<AccountId> {
	fn owner(hero: HeroId) -> Option<AccountId>;

	/// A hero may be listed only by its owner, and only while it is alive,
	/// not deleted, not training, not already listed and carrying no
	/// equipment.
	fn ensure_listable(hero: HeroId, seller: &AccountId) -> DispatchResult;

	fn set_on_auction(hero: HeroId, listed: bool) -> DispatchResult;

	/// Move ownership to the lot winner and take the hero off auction.
	fn transfer(hero: HeroId, to: &AccountId) -> DispatchResult;
}

/// Signals listing caches to drop entries after a successful state change.
pub trait CacheInvalidate {
	fn invalidate(key: &[u8]);
}

impl CacheInvalidate for () {
	fn invalidate(_key: &[u8]) {}
}

pub type HeroName = BoundedVec<u8, ConstU32<100>>;

/// Rolled combat attributes of a generated hero.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, Default, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct HeroAttributes {
	pub strength: u16,
	pub agility: u16,
	pub intelligence: u16,
	pub endurance: u16,
	pub speed: u16,
	pub health: u16,
	pub defense: u16,
	pub luck: u16,
	pub field_of_view: u16,
}

/// A perk granted at generation time.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct HeroPerk {
	pub perk_id: u8,
	pub level: u8,
}

pub type HeroPerks = BoundedVec<HeroPerk, ConstU32<10>>;

/// Everything the generator rolls for a new hero.
#[derive(Encode, Decode, Eq, PartialEq, Clone, RuntimeDebug, TypeInfo)]
pub struct GeneratedHero {
	pub name: HeroName,
	pub nickname: HeroName,
	pub attributes: HeroAttributes,
	pub perks: HeroPerks,
}

/// Deterministic hero roller: the same seed, generation and locale always
/// produce the same hero. The attribute formulas live behind this seam so
/// game balance can change without touching the generation transaction.
pub trait HeroGenerator {
	fn generate(seed: &[u8; 32], generation: u8, locale: Locale) -> GeneratedHero;
}
