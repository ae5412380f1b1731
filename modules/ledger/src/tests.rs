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

//! Unit tests for the ledger module.

#![cfg(test)]

use super::*;
use crate::mock::*;
use frame_support::{assert_noop, assert_ok};

#[test]
fn genesis_seeds_balances() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_eq!(Ledger::accounts(&ALICE).balance, 100_000);
			assert_eq!(Ledger::accounts(&ALICE).reserved, 0);
			assert_eq!(Ledger::accounts(&BOB).balance, 0);
		});
}

#[test]
fn adjust_balance_credits_and_debits() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Balance,
				50_000,
				LedgerEntryType::AuctionPayout,
				Some(1),
			));
			assert_eq!(Ledger::accounts(&ALICE).balance, 150_000);

			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Balance,
				-150_000,
				LedgerEntryType::HeroGeneration,
				None,
			));
			assert_eq!(Ledger::accounts(&ALICE).balance, 0);

			System::assert_last_event(RuntimeEvent::Ledger(crate::Event::BalanceAdjusted {
				who: ALICE,
				field: BalanceField::Balance,
				amount: -150_000,
				reason: LedgerEntryType::HeroGeneration,
			}));
		});
}

#[test]
fn balance_cannot_go_negative() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100)])
		.build()
		.execute_with(|| {
			assert_noop!(
				Ledger::do_adjust_balance(
					&ALICE,
					BalanceField::Balance,
					-101,
					LedgerEntryType::HeroGeneration,
					None,
				),
				Error::<Runtime>::InsufficientFunds
			);
		});
}

#[test]
fn balance_cannot_fall_below_reserved() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				600,
				LedgerEntryType::BidReserve,
				Some(9),
			));
			// 1000 - 500 would leave balance(500) < reserved(600)
			assert_noop!(
				Ledger::do_adjust_balance(
					&ALICE,
					BalanceField::Balance,
					-500,
					LedgerEntryType::HeroGeneration,
					None,
				),
				Error::<Runtime>::InsufficientFunds
			);
		});
}

#[test]
fn reserved_cannot_go_negative_or_exceed_balance() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000)])
		.build()
		.execute_with(|| {
			assert_noop!(
				Ledger::do_adjust_balance(
					&ALICE,
					BalanceField::Reserved,
					-1,
					LedgerEntryType::BidReleaseReserved,
					None,
				),
				Error::<Runtime>::InvalidReserved
			);
			assert_noop!(
				Ledger::do_adjust_balance(
					&ALICE,
					BalanceField::Reserved,
					1_001,
					LedgerEntryType::BidReserve,
					None,
				),
				Error::<Runtime>::InvalidReserved
			);
		});
}

#[test]
fn available_is_balance_minus_reserved() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 2_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				1_500,
				LedgerEntryType::AutoBidReserve,
				None,
			));
			assert_eq!(
				<Ledger as CurrencyLedger<AccountId>>::available(&ALICE),
				500
			);
		});
}

#[test]
fn every_adjustment_appends_a_ledger_entry() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 1_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				400,
				LedgerEntryType::BidReserve,
				Some(3),
			));
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				-400,
				LedgerEntryType::BidReleaseReserved,
				Some(3),
			));

			assert_eq!(Ledger::next_transaction_id(), 2);
			let first = Ledger::transactions(0).unwrap();
			assert_eq!(first.account, ALICE);
			assert_eq!(first.amount, 400);
			assert_eq!(first.reason, LedgerEntryType::BidReserve);
			assert_eq!(first.reference, Some(3));
		});
}

#[test]
fn failed_adjustment_leaves_no_ledger_entry() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 100)])
		.build()
		.execute_with(|| {
			assert!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				200,
				LedgerEntryType::BidReserve,
				None,
			)
			.is_err());
			assert_eq!(Ledger::next_transaction_id(), 0);
			assert_eq!(Ledger::ledger_sum(&ALICE, BalanceField::Reserved), 0);
		});
}

#[test]
fn live_columns_reconcile_against_the_log() {
	ExtBuilder::default()
		.balances(vec![(ALICE, 10_000), (BOB, 5_000)])
		.build()
		.execute_with(|| {
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				2_500,
				LedgerEntryType::BidReserve,
				Some(1),
			));
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Reserved,
				-2_500,
				LedgerEntryType::AuctionReleaseReserved,
				Some(1),
			));
			assert_ok!(Ledger::do_adjust_balance(
				&ALICE,
				BalanceField::Balance,
				-2_500,
				LedgerEntryType::HeroGeneration,
				None,
			));
			assert_ok!(Ledger::do_adjust_balance(
				&BOB,
				BalanceField::Balance,
				2_500,
				LedgerEntryType::AuctionPayout,
				Some(1),
			));

			// genesis balances are the baseline; the log carries the deltas
			let alice = Ledger::accounts(&ALICE);
			assert_eq!(
				alice.balance as i128,
				10_000 + Ledger::ledger_sum(&ALICE, BalanceField::Balance)
			);
			assert_eq!(
				alice.reserved as i128,
				Ledger::ledger_sum(&ALICE, BalanceField::Reserved)
			);
			let bob = Ledger::accounts(&BOB);
			assert_eq!(
				bob.balance as i128,
				5_000 + Ledger::ledger_sum(&BOB, BalanceField::Balance)
			);
		});
}
