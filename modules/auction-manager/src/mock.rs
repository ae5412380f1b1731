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

//! Mocks for the auction manager module.

#![cfg(test)]

use super::*;
use crate as module_auction_manager;

use frame_support::{
	construct_runtime, parameter_types,
	traits::{ConstU128, ConstU32, ConstU64, Everything},
};
use primitives::{Balance, Locale};
use sp_core::H256;
use sp_runtime::{
	testing::TestXt,
	traits::IdentityLookup,
	transaction_validity::TransactionPriority,
	AccountId32, BuildStorage,
};
use support::mocks::MockCacheInvalidate;

pub type AccountId = AccountId32;
pub type BlockNumber = u64;

pub const ALICE: AccountId = AccountId32::new([1u8; 32]);
pub const BOB: AccountId = AccountId32::new([2u8; 32]);
pub const CAROL: AccountId = AccountId32::new([3u8; 32]);

pub const QUANTUM_CORE: ItemId = 0;
pub const HOUR: u64 = 60 * 60 * 1000;
pub const START_TIME: u64 = 1_000_000;

impl frame_system::Config for Runtime {
	type BaseCallFilter = Everything;
	type BlockWeights = ();
	type BlockLength = ();
	type RuntimeOrigin = RuntimeOrigin;
	type RuntimeCall = RuntimeCall;
	type Nonce = u64;
	type Hash = H256;
	type Hashing = ::sp_runtime::traits::BlakeTwo256;
	type AccountId = AccountId;
	type Lookup = IdentityLookup<Self::AccountId>;
	type Block = Block;
	type RuntimeEvent = RuntimeEvent;
	type BlockHashCount = ConstU64<250>;
	type DbWeight = ();
	type Version = ();
	type PalletInfo = PalletInfo;
	type AccountData = ();
	type OnNewAccount = ();
	type OnKilledAccount = ();
	type SystemWeightInfo = ();
	type SS58Prefix = ();
	type OnSetCode = ();
	type MaxConsumers = ConstU32<16>;
}

impl pallet_timestamp::Config for Runtime {
	type Moment = u64;
	type OnTimestampSet = ();
	type MinimumPeriod = ConstU64<1000>;
	type WeightInfo = ();
}

impl module_ledger::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Time = Timestamp;
}

impl module_stash::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
}

parameter_types! {
	pub const HeroUnsignedPriority: TransactionPriority = TransactionPriority::MAX - 2;
	pub const AuctionUnsignedPriority: TransactionPriority = TransactionPriority::MAX - 1;
}

impl module_hero::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Time = Timestamp;
	type Ledger = Ledger;
	type Generator = module_hero::generation::DefaultHeroGenerator;
	type MaxHeroes = ConstU32<5>;
	type GenerationUnitPrice = ConstU128<10_000>;
	type RestoreWindow = ConstU64<{ 7 * 24 * HOUR }>;
	type RecoveryDuration = ConstU64<HOUR>;
	type UnsignedPriority = HeroUnsignedPriority;
	type WeightInfo = ();
}

impl module_auction_manager::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Time = Timestamp;
	type Ledger = Ledger;
	type Stash = Stash;
	type Heroes = Heroes;
	type Cache = MockCacheInvalidate;
	type UnsignedPriority = AuctionUnsignedPriority;
	type WeightInfo = ();
}

pub type Extrinsic = TestXt<RuntimeCall, ()>;

impl<LocalCall> frame_system::offchain::SendTransactionTypes<LocalCall> for Runtime
where
	RuntimeCall: From<LocalCall>,
{
	type OverarchingCall = RuntimeCall;
	type Extrinsic = Extrinsic;
}

type Block = frame_system::mocking::MockBlock<Runtime>;

construct_runtime!(
	pub enum Runtime {
		System: frame_system,
		Timestamp: pallet_timestamp,
		Ledger: module_ledger,
		Stash: module_stash,
		Heroes: module_hero,
		AuctionManager: module_auction_manager,
	}
);

pub struct ExtBuilder {
	balances: Vec<(AccountId, Balance)>,
	stashes: Vec<(AccountId, ItemId, u32)>,
}

impl Default for ExtBuilder {
	fn default() -> Self {
		Self {
			balances: vec![],
			stashes: vec![],
		}
	}
}

impl ExtBuilder {
	pub fn balances(mut self, balances: Vec<(AccountId, Balance)>) -> Self {
		self.balances = balances;
		self
	}

	pub fn stashes(mut self, stashes: Vec<(AccountId, ItemId, u32)>) -> Self {
		self.stashes = stashes;
		self
	}

	pub fn build(self) -> sp_io::TestExternalities {
		MockCacheInvalidate::reset();

		let mut t = frame_system::GenesisConfig::<Runtime>::default()
			.build_storage()
			.unwrap();

		module_ledger::GenesisConfig::<Runtime> {
			balances: self.balances,
		}
		.assimilate_storage(&mut t)
		.unwrap();

		module_stash::GenesisConfig::<Runtime> {
			items: vec![b"Quantum Core".to_vec()],
			stashes: self.stashes,
		}
		.assimilate_storage(&mut t)
		.unwrap();

		let mut ext = sp_io::TestExternalities::new(t);
		ext.execute_with(|| {
			System::set_block_number(1);
			Timestamp::set_timestamp(START_TIME);
		});
		ext
	}
}

/// Roll a hero for `owner` and return its id.
pub fn spawn_hero(owner: &AccountId) -> HeroId {
	module_hero::Pallet::<Runtime>::do_generate_hero(owner, 1, 0, Locale::En).unwrap()
}
