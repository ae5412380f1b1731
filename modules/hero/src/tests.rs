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

//! Unit tests for the hero module.

#![cfg(test)]

use super::*;
use crate::mock::*;
use codec::Decode;
use frame_support::{assert_noop, assert_ok};
use sp_core::offchain::{testing, OffchainDbExt, OffchainWorkerExt, TransactionPoolExt};
use sp_runtime::{
	traits::ValidateUnsigned,
	transaction_validity::{InvalidTransaction, TransactionSource},
};

#[test]
fn generate_hero_debits_and_inserts() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				3,
				2,
				Locale::En
			));

			assert_eq!(Ledger::accounts(&ALICE).balance, 100_000 - 2 * UNIT_PRICE);
			assert_eq!(Heroes::owned_hero_count(&ALICE), 1);

			let hero = Heroes::heroes(0).unwrap();
			assert_eq!(hero.owner, ALICE);
			assert_eq!(hero.generation, 3);
			assert_eq!(hero.level, 1);
			assert!(!hero.is_dead && !hero.is_on_auction && !hero.is_deleted);
			assert_eq!(hero.perks.len(), 3);

			System::assert_has_event(RuntimeEvent::Heroes(crate::Event::HeroGenerated {
				owner: ALICE,
				hero: 0,
				generation: 3,
				price: 2 * UNIT_PRICE,
			}));
		});
}

#[test]
fn generate_hero_rejects_bad_generation() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_noop!(
				Heroes::generate_hero(RuntimeOrigin::signed(ALICE), 0, 1, Locale::En),
				Error::<Runtime>::InvalidGeneration
			);
			assert_noop!(
				Heroes::generate_hero(RuntimeOrigin::signed(ALICE), 11, 1, Locale::En),
				Error::<Runtime>::InvalidGeneration
			);
		});
}

#[test]
fn generate_hero_needs_funds() {
	ExtBuilder::default()
		.balances(vec![(ALICE, UNIT_PRICE - 1)])
		.build()
		.execute_with(|| {
			assert_noop!(
				Heroes::generate_hero(RuntimeOrigin::signed(ALICE), 1, 1, Locale::En),
				module_ledger::Error::<Runtime>::InsufficientFunds
			);
			// no orphan hero, no ledger entry
			assert_eq!(Heroes::next_hero_id(), 0);
			assert_eq!(Ledger::next_transaction_id(), 0);
		});
}

#[test]
fn roster_cap_is_enforced() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000_000)])
		.build()
		.execute_with(|| {
			for _ in 0..5 {
				assert_ok!(Heroes::generate_hero(
					RuntimeOrigin::signed(ALICE),
					1,
					1,
					Locale::En
				));
			}
			assert_noop!(
				Heroes::generate_hero(RuntimeOrigin::signed(ALICE), 1, 1, Locale::En),
				Error::<Runtime>::TooManyHeroes
			);

			// tombstoning frees a slot
			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 0));
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
		});
}

#[test]
fn delete_is_soft_and_restorable() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 0));

			let hero = Heroes::heroes(0).unwrap();
			assert!(hero.is_deleted);
			assert_eq!(Heroes::owned_hero_count(&ALICE), 0);

			assert_ok!(Heroes::restore_hero(RuntimeOrigin::signed(ALICE), 0));
			assert!(!Heroes::heroes(0).unwrap().is_deleted);
			assert_eq!(Heroes::owned_hero_count(&ALICE), 1);
		});
}

#[test]
fn restore_window_is_enforced() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 0));

			let deleted_at = Heroes::heroes(0).unwrap().deleted_at.unwrap();
			Timestamp::set_timestamp(deleted_at + WEEK + 1);
			assert_noop!(
				Heroes::restore_hero(RuntimeOrigin::signed(ALICE), 0),
				Error::<Runtime>::RestoreWindowPassed
			);
		});
}

#[test]
fn only_the_owner_deletes_and_restores() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_noop!(
				Heroes::delete_hero(RuntimeOrigin::signed(BOB), 0),
				Error::<Runtime>::NoPermission
			);
			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 0));
			assert_noop!(
				Heroes::restore_hero(RuntimeOrigin::signed(BOB), 0),
				Error::<Runtime>::NoPermission
			);
		});
}

#[test]
fn revive_waits_for_recovery() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_ok!(Heroes::mark_dead(0));
			let hero = Heroes::heroes(0).unwrap();
			assert!(hero.is_dead);
			let due = hero.dead_until.unwrap();

			assert_noop!(
				Heroes::revive_hero(RuntimeOrigin::none(), 0),
				Error::<Runtime>::NotRecovered
			);

			Timestamp::set_timestamp(due);
			assert_ok!(Heroes::revive_hero(RuntimeOrigin::none(), 0));
			let hero = Heroes::heroes(0).unwrap();
			assert!(!hero.is_dead && hero.dead_until.is_none());
		});
}

#[test]
fn purge_removes_expired_tombstones_only() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_noop!(
				Heroes::purge_hero(RuntimeOrigin::none(), 0),
				Error::<Runtime>::HeroNotDeleted
			);

			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 0));
			assert_noop!(
				Heroes::purge_hero(RuntimeOrigin::none(), 0),
				Error::<Runtime>::PurgeTooEarly
			);

			let deleted_at = Heroes::heroes(0).unwrap().deleted_at.unwrap();
			Timestamp::set_timestamp(deleted_at + WEEK + 1);
			assert_ok!(Heroes::purge_hero(RuntimeOrigin::none(), 0));
			assert!(Heroes::heroes(0).is_none());
		});
}

#[test]
fn transfer_moves_ownership_and_counts() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));
			assert_ok!(<Heroes as HeroRegistry<AccountId>>::set_on_auction(0, true));
			assert_ok!(<Heroes as HeroRegistry<AccountId>>::transfer(0, &BOB));

			let hero = Heroes::heroes(0).unwrap();
			assert_eq!(hero.owner, BOB);
			assert!(!hero.is_on_auction);
			assert_eq!(Heroes::owned_hero_count(&ALICE), 0);
			assert_eq!(Heroes::owned_hero_count(&BOB), 1);
		});
}

#[test]
fn listing_gates_cover_every_flag() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));

			assert_noop!(
				<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &BOB),
				Error::<Runtime>::NoPermission
			);

			assert_ok!(Heroes::mark_dead(0));
			assert_noop!(
				<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &ALICE),
				Error::<Runtime>::HeroDead
			);
			Timestamp::set_timestamp(Heroes::heroes(0).unwrap().dead_until.unwrap());
			assert_ok!(Heroes::revive_hero(RuntimeOrigin::none(), 0));

			assert_ok!(Heroes::set_training(0, Some(u64::MAX)));
			assert_noop!(
				<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &ALICE),
				Error::<Runtime>::HeroInTraining
			);
			assert_ok!(Heroes::set_training(0, None));

			assert_ok!(Heroes::set_equipped_items(0, 2));
			assert_noop!(
				<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &ALICE),
				Error::<Runtime>::HeroHasEquipment
			);
			assert_ok!(Heroes::set_equipped_items(0, 0));

			assert_ok!(<Heroes as HeroRegistry<AccountId>>::set_on_auction(0, true));
			assert_noop!(
				<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &ALICE),
				Error::<Runtime>::HeroOnAuction
			);
			assert_ok!(<Heroes as HeroRegistry<AccountId>>::set_on_auction(0, false));

			assert_ok!(<Heroes as HeroRegistry<AccountId>>::ensure_listable(0, &ALICE));
		});
}

#[test]
fn heroes_of_paginates_live_heroes() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000_000)])
		.build()
		.execute_with(|| {
			for _ in 0..4 {
				assert_ok!(Heroes::generate_hero(
					RuntimeOrigin::signed(ALICE),
					1,
					1,
					Locale::En
				));
			}
			assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 1));

			let page = Heroes::heroes_of(&ALICE, 2, 0);
			assert_eq!(page.total, 3);
			assert_eq!(page.limit, 2);
			assert_eq!(
				page.items.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
				vec![0, 2]
			);

			let page = Heroes::heroes_of(&ALICE, 0, 2);
			assert_eq!(page.limit, 1);
			assert_eq!(
				page.items.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
				vec![3]
			);
		});
}

#[test]
fn validate_unsigned_filters_stale_maintenance() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Heroes::generate_hero(
				RuntimeOrigin::signed(ALICE),
				1,
				1,
				Locale::En
			));

			assert_eq!(
				Heroes::validate_unsigned(
					TransactionSource::Local,
					&crate::Call::revive_hero { hero_id: 0 },
				),
				Err(InvalidTransaction::Stale.into())
			);

			assert_ok!(Heroes::mark_dead(0));
			Timestamp::set_timestamp(Heroes::heroes(0).unwrap().dead_until.unwrap());
			assert_ok!(Heroes::validate_unsigned(
				TransactionSource::Local,
				&crate::Call::revive_hero { hero_id: 0 },
			));
		});
}

#[test]
fn maintenance_worker_submits_revive_and_purge() {
	let (offchain, _offchain_state) = testing::TestOffchainExt::new();
	let (pool, pool_state) = testing::TestTransactionPoolExt::new();

	let mut ext = ExtBuilder::default()
		.balances(vec![(ALICE, 1_000_000)])
		.build();
	ext.register_extension(OffchainDbExt::new(offchain.clone()));
	ext.register_extension(OffchainWorkerExt::new(offchain));
	ext.register_extension(TransactionPoolExt::new(pool));

	ext.execute_with(|| {
		assert_ok!(Heroes::generate_hero(
			RuntimeOrigin::signed(ALICE),
			1,
			1,
			Locale::En
		));
		assert_ok!(Heroes::generate_hero(
			RuntimeOrigin::signed(ALICE),
			1,
			1,
			Locale::En
		));

		assert_ok!(Heroes::mark_dead(0));
		assert_ok!(Heroes::delete_hero(RuntimeOrigin::signed(ALICE), 1));

		// past recovery and past the restore window
		Timestamp::set_timestamp(Timestamp::now() + WEEK + HOUR + 1);

		assert_ok!(Heroes::_offchain_worker());

		let mut calls: Vec<RuntimeCall> = pool_state
			.write()
			.transactions
			.drain(..)
			.map(|tx| Extrinsic::decode(&mut &*tx).unwrap().call)
			.collect();
		calls.sort_by_key(|call| match call {
			RuntimeCall::Heroes(crate::Call::revive_hero { .. }) => 0,
			_ => 1,
		});

		assert_eq!(calls.len(), 2);
		assert!(matches!(
			calls[0],
			RuntimeCall::Heroes(crate::Call::revive_hero { hero_id: 0 })
		));
		assert!(matches!(
			calls[1],
			RuntimeCall::Heroes(crate::Call::purge_hero { hero_id: 1 })
		));

		// executing the submitted calls settles both heroes
		assert_ok!(Heroes::revive_hero(RuntimeOrigin::none(), 0));
		assert_ok!(Heroes::purge_hero(RuntimeOrigin::none(), 1));
		assert!(!Heroes::heroes(0).unwrap().is_dead);
		assert!(Heroes::heroes(1).is_none());
	});
}
