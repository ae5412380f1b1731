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

//! Low-level types shared by the arena economy modules.

#![cfg_attr(not(feature = "std"), no_std)]

use codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::{
	generic,
	traits::{BlakeTwo256, IdentifyAccount, Verify},
	BoundedVec, MultiSignature, RuntimeDebug,
};
use sp_std::prelude::*;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// An index to a block.
pub type BlockNumber = u32;

/// Alias to 512-bit hash when used in the context of a transaction signature.
pub type Signature = MultiSignature;

/// Some way of identifying an account. We intentionally make it equivalent
/// to the public key of our transaction signing scheme.
pub type AccountId = <<Signature as Verify>::Signer as IdentifyAccount>::AccountId;

/// Index of a transaction, 32-bit should be plenty.
pub type Nonce = u32;

/// A hash of some data.
pub type Hash = sp_core::H256;

/// An instant in time, expressed in milliseconds since the unix epoch.
pub type Moment = u64;

/// Balance of an account. Monetary values are integers in cents, so the
/// two-decimal quantization of prices and ledger entries is structural.
pub type Balance = u128;

/// Signed version of `Balance`, used for ledger deltas.
pub type Amount = i128;

/// Item auction identifier.
pub type AuctionId = u32;

/// Hero lot identifier.
pub type LotId = u32;

/// Hero identifier.
pub type HeroId = u32;

/// Catalog item identifier.
pub type ItemId = u32;

/// Bid identifier. Bids are append-only, so give them more headroom.
pub type BidId = u64;

/// Ledger entry identifier.
pub type TransactionId = u64;

/// Header type.
pub type Header = generic::Header<BlockNumber, BlakeTwo256>;

/// Client-supplied idempotency key for bid submission.
pub type RequestId = BoundedVec<u8, sp_core::ConstU32<64>>;

/// The largest page a listing call will return.
pub const MAX_PAGE_SIZE: u32 = 100;

pub mod time {
	use super::Moment;

	pub const MILLISECS_PER_SECOND: Moment = 1_000;
	pub const MILLISECS_PER_MINUTE: Moment = 60 * MILLISECS_PER_SECOND;
	pub const MILLISECS_PER_HOUR: Moment = 60 * MILLISECS_PER_MINUTE;
	pub const MILLISECS_PER_DAY: Moment = 24 * MILLISECS_PER_HOUR;
}

/// Lifecycle of an auction or a hero lot. Status is monotone away from
/// `Active`: once a row leaves `Active` it never returns.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum AuctionStatus {
	Active,
	Finished,
	Cancelled,
	Expired,
}

impl AuctionStatus {
	pub fn is_active(&self) -> bool {
		matches!(self, AuctionStatus::Active)
	}
}

/// Account role, carried in token claims.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum Role {
	User,
	Moderator,
	Admin,
}

impl Default for Role {
	fn default() -> Self {
		Role::User
	}
}

/// Which side of an account the ledger mutates.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum BalanceField {
	Balance,
	Reserved,
}

/// Why a ledger entry was written.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum LedgerEntryType {
	/// Funds earmarked by a newly accepted bid.
	BidReserve,
	/// Reservation returned to an outbid bidder.
	BidReleaseReserved,
	/// Winner reservation consumed when an auction or lot closes.
	AuctionReleaseReserved,
	/// Sale proceeds credited to the seller.
	AuctionPayout,
	/// Funds earmarked by a new auto-bid ceiling.
	AutoBidReserve,
	/// Delta moved when an auto-bid ceiling changes.
	AutoBidReserveUpdate,
	/// Price of rolling a new hero.
	HeroGeneration,
}

/// What a bid is placed on: a stackable item auction or a unique hero lot.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum BidTarget {
	Auction(AuctionId),
	Lot(LotId),
}

/// Locale used when picking a hero nickname.
#[derive(Encode, Decode, Eq, PartialEq, Copy, Clone, RuntimeDebug, PartialOrd, Ord, TypeInfo, MaxEncodedLen)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum Locale {
	En,
	Uk,
}

impl Default for Locale {
	fn default() -> Self {
		Locale::En
	}
}

/// One page of a listing, together with the size of the filtered set.
#[derive(Encode, Decode, Eq, PartialEq, Clone, RuntimeDebug, TypeInfo)]
pub struct PagedResult<T> {
	pub items: Vec<T>,
	pub total: u32,
	pub limit: u32,
	pub offset: u32,
}

/// Clamp a caller-supplied page request: `limit` into `[1, MAX_PAGE_SIZE]`,
/// `offset` unchanged (it is already unsigned).
pub fn clamp_page(limit: u32, offset: u32) -> (u32, u32) {
	(limit.clamp(1, MAX_PAGE_SIZE), offset)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamp_page_bounds_limit() {
		assert_eq!(clamp_page(0, 0), (1, 0));
		assert_eq!(clamp_page(10, 7), (10, 7));
		assert_eq!(clamp_page(1_000, 0), (MAX_PAGE_SIZE, 0));
	}

	#[test]
	fn status_is_monotone_helpers() {
		assert!(AuctionStatus::Active.is_active());
		assert!(!AuctionStatus::Finished.is_active());
		assert!(!AuctionStatus::Cancelled.is_active());
		assert!(!AuctionStatus::Expired.is_active());
	}
}
