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

//! # Ledger Module
//!
//! ## Overview
//!
//! The money backbone of the arena economy. Every account carries a
//! `balance` and a `reserved` portion earmarked by active bids and
//! auto-bids; `available = balance - reserved` is what new bids may spend.
//! All mutations go through [`Pallet::do_adjust_balance`], which appends an
//! entry to the append-only transaction log for every accepted delta, so
//! the live columns are always reconcilable against the log.
//!
//! The module deliberately exposes no dispatchables: engines call it
//! through the [`CurrencyLedger`] trait inside their own transactions, and
//! the storage-layer rollback of a failing dispatch keeps ledger rows and
//! engine state moving together.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::unused_unit)]

use frame_support::{
	pallet_prelude::*,
	traits::{BuildGenesisConfig, Time},
};
use primitives::{Amount, Balance, BalanceField, LedgerEntryType, Moment, TransactionId};
use sp_runtime::traits::Zero;
use sp_std::prelude::*;
use support::CurrencyLedger;

mod mock;
mod tests;

pub use module::*;

#[frame_support::pallet]
pub mod module {
	use super::*;

	#[pallet::config]
	pub trait Config: frame_system::Config {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Wall-clock source stamped onto ledger entries.
		type Time: Time<Moment = Moment>;
	}

	#[pallet::error]
	pub enum Error<T> {
		/// The balance side would go negative or fall below the reserved
		/// portion.
		InsufficientFunds,
		/// The reserved side would go negative or exceed the balance.
		InvalidReserved,
		/// Arithmetic overflow while applying a delta.
		Overflow,
	}

	#[pallet::event]
	#[pallet::generate_deposit(pub(crate) fn deposit_event)]
	pub enum Event<T: Config> {
		/// A balance or reserved column moved and a ledger entry was written.
		BalanceAdjusted {
			who: T::AccountId,
			field: BalanceField,
			amount: Amount,
			reason: LedgerEntryType,
		},
	}

	/// The two money columns of an account.
	#[derive(
		Encode, Decode, Clone, Copy, PartialEq, Eq, Default, RuntimeDebug, TypeInfo, MaxEncodedLen,
	)]
	pub struct AccountData {
		pub balance: Balance,
		pub reserved: Balance,
	}

	impl AccountData {
		pub fn available(&self) -> Balance {
			self.balance.saturating_sub(self.reserved)
		}
	}

	/// One append-only ledger entry.
	#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
	pub struct CurrencyTransaction<AccountId> {
		pub account: AccountId,
		pub field: BalanceField,
		pub amount: Amount,
		pub reason: LedgerEntryType,
		pub reference: Option<u32>,
		pub at: Moment,
	}

	/// The live money columns per account.
	#[pallet::storage]
	#[pallet::getter(fn accounts)]
	pub type Accounts<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, AccountData, ValueQuery>;

	/// The append-only transaction log.
	#[pallet::storage]
	#[pallet::getter(fn transactions)]
	pub type Transactions<T: Config> =
		StorageMap<_, Twox64Concat, TransactionId, CurrencyTransaction<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	#[pallet::getter(fn next_transaction_id)]
	pub type NextTransactionId<T: Config> = StorageValue<_, TransactionId, ValueQuery>;

	#[pallet::genesis_config]
	pub struct GenesisConfig<T: Config> {
		pub balances: Vec<(T::AccountId, Balance)>,
	}

	impl<T: Config> Default for GenesisConfig<T> {
		fn default() -> Self {
			GenesisConfig { balances: Vec::new() }
		}
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for (who, balance) in &self.balances {
				Accounts::<T>::insert(
					who,
					AccountData {
						balance: *balance,
						reserved: Zero::zero(),
					},
				);
			}
		}
	}

	#[pallet::pallet]
	pub struct Pallet<T>(_);
}

impl<T: Config> Pallet<T> {
	/// Apply a signed delta to one side of `who`'s account and append the
	/// matching ledger entry. Never commits by itself: the surrounding
	/// dispatch owns the transaction, and on a later failure the storage
	/// layer rolls both the columns and the entry back together.
	pub fn do_adjust_balance(
		who: &T::AccountId,
		field: BalanceField,
		amount: Amount,
		reason: LedgerEntryType,
		reference: Option<u32>,
	) -> DispatchResult {
		Accounts::<T>::try_mutate(who, |account| -> DispatchResult {
			match field {
				BalanceField::Balance => {
					let new = Self::apply_delta(account.balance, amount, Error::<T>::InsufficientFunds)?;
					ensure!(new >= account.reserved, Error::<T>::InsufficientFunds);
					account.balance = new;
				}
				BalanceField::Reserved => {
					let new = Self::apply_delta(account.reserved, amount, Error::<T>::InvalidReserved)?;
					ensure!(new <= account.balance, Error::<T>::InvalidReserved);
					account.reserved = new;
				}
			}
			Ok(())
		})?;

		let id = NextTransactionId::<T>::mutate(|id| {
			let current = *id;
			*id = id.saturating_add(1);
			current
		});
		Transactions::<T>::insert(
			id,
			CurrencyTransaction {
				account: who.clone(),
				field,
				amount,
				reason,
				reference,
				at: T::Time::now(),
			},
		);

		Self::deposit_event(Event::BalanceAdjusted {
			who: who.clone(),
			field,
			amount,
			reason,
		});
		Ok(())
	}

	fn apply_delta(current: Balance, delta: Amount, underflow: Error<T>) -> Result<Balance, DispatchError> {
		let current: Amount = current.try_into().map_err(|_| Error::<T>::Overflow)?;
		let new = current.checked_add(delta).ok_or(Error::<T>::Overflow)?;
		ensure!(new >= 0, underflow);
		Ok(new as Balance)
	}

	/// Signed sum of all ledger entries written for `who` on `field`.
	/// Equals the live column at every committed state.
	pub fn ledger_sum(who: &T::AccountId, field: BalanceField) -> Amount {
		Transactions::<T>::iter_values()
			.filter(|tx| &tx.account == who && tx.field == field)
			.fold(0, |acc: Amount, tx| acc.saturating_add(tx.amount))
	}
}

impl<T: Config> CurrencyLedger<T::AccountId> for Pallet<T> {
	fn balance(who: &T::AccountId) -> Balance {
		Self::accounts(who).balance
	}

	fn reserved(who: &T::AccountId) -> Balance {
		Self::accounts(who).reserved
	}

	fn available(who: &T::AccountId) -> Balance {
		Self::accounts(who).available()
	}

	fn adjust_balance(
		who: &T::AccountId,
		field: BalanceField,
		amount: Amount,
		reason: LedgerEntryType,
		reference: Option<u32>,
	) -> DispatchResult {
		Self::do_adjust_balance(who, field, amount, reason, reference)
	}
}
