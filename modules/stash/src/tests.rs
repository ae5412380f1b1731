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

//! Unit tests for the stash module.

#![cfg(test)]

use super::*;
use crate::mock::*;
use frame_support::{assert_noop, assert_ok};

#[test]
fn register_item_assigns_sequential_ids() {
	ExtBuilder::default().build().execute_with(|| {
		// one item seeded at genesis
		assert_eq!(Stash::next_item_id(), 1);

		let name: ItemName = b"Plasma Blade".to_vec().try_into().unwrap();
		assert_ok!(Stash::register_item(RuntimeOrigin::root(), name.clone()));
		assert_eq!(Stash::items(1), Some(name.clone()));
		System::assert_last_event(RuntimeEvent::Stash(crate::Event::ItemRegistered {
			item: 1,
			name,
		}));
	});
}

#[test]
fn register_item_requires_root() {
	ExtBuilder::default().build().execute_with(|| {
		let name: ItemName = b"Plasma Blade".to_vec().try_into().unwrap();
		assert!(Stash::register_item(RuntimeOrigin::signed(ALICE), name).is_err());
	});
}

#[test]
fn deposit_accumulates() {
	ExtBuilder::default()
		.stashes(vec![(ALICE, QUANTUM_CORE, 2)])
		.build()
		.execute_with(|| {
			assert_ok!(Stash::do_deposit(&ALICE, QUANTUM_CORE, 3));
			assert_eq!(Stash::stash(&ALICE, QUANTUM_CORE), 5);

			// a fresh row is created for new owners
			assert_ok!(Stash::do_deposit(&BOB, QUANTUM_CORE, 1));
			assert_eq!(Stash::stash(&BOB, QUANTUM_CORE), 1);
		});
}

#[test]
fn withdraw_checks_stock() {
	ExtBuilder::default()
		.stashes(vec![(ALICE, QUANTUM_CORE, 5)])
		.build()
		.execute_with(|| {
			assert_ok!(Stash::do_withdraw(&ALICE, QUANTUM_CORE, 3));
			assert_eq!(Stash::stash(&ALICE, QUANTUM_CORE), 2);

			assert_noop!(
				Stash::do_withdraw(&ALICE, QUANTUM_CORE, 3),
				Error::<Runtime>::InsufficientStock
			);
			assert_noop!(
				Stash::do_withdraw(&BOB, QUANTUM_CORE, 1),
				Error::<Runtime>::InsufficientStock
			);
		});
}

#[test]
fn drained_row_is_deleted() {
	ExtBuilder::default()
		.stashes(vec![(ALICE, QUANTUM_CORE, 3)])
		.build()
		.execute_with(|| {
			assert_ok!(Stash::do_withdraw(&ALICE, QUANTUM_CORE, 3));
			assert!(!Stashes::<Runtime>::contains_key(&ALICE, QUANTUM_CORE));
		});
}

#[test]
fn zero_quantity_is_rejected() {
	ExtBuilder::default()
		.stashes(vec![(ALICE, QUANTUM_CORE, 3)])
		.build()
		.execute_with(|| {
			assert_noop!(
				Stash::do_deposit(&ALICE, QUANTUM_CORE, 0),
				Error::<Runtime>::InvalidQuantity
			);
			assert_noop!(
				Stash::do_withdraw(&ALICE, QUANTUM_CORE, 0),
				Error::<Runtime>::InvalidQuantity
			);
		});
}
