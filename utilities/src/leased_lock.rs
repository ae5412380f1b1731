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

//! Leased exclusive locks over the offchain database.
//!
//! A lease is a `{ fencing value, expiry }` record written with
//! compare-and-set. The fencing value is unique per acquisition; release and
//! extension are conditional on it still matching, so a holder that lost its
//! lease to TTL expiry cannot stomp on the next holder. Crash safety comes
//! from the TTL; there is no fairness queue. Callers must treat a failed
//! acquisition as "somebody else is doing it" and proceed gracefully.

use crate::OffchainErr;
use codec::{Decode, Encode};
use core::sync::atomic::{AtomicU64, Ordering};
use primitives::{AuctionId, HeroId, LotId};
use sp_runtime::{
	offchain::{
		storage::{MutateStorageError, StorageRetrievalError, StorageValueRef},
		Duration, Timestamp,
	},
	RuntimeDebug,
};
use sp_std::prelude::*;

pub const SWEEP_LOCK: &[u8] = b"dist_lock/auction_sweep";
pub const AUCTION_LOCK_PREFIX: &[u8] = b"dist_lock/auction/";
pub const LOT_LOCK_PREFIX: &[u8] = b"dist_lock/auction_lot/";
pub const USER_LOCK_PREFIX: &[u8] = b"dist_lock/user/";
pub const HERO_MAINTENANCE_LOCK: &[u8] = b"dist_lock/hero_maintenance";

pub const SWEEP_LOCK_DURATION: u64 = 90_000;
pub const RESOURCE_LOCK_DURATION: u64 = 120_000;
pub const USER_LOCK_DURATION: u64 = 30_000;

/// Floor for the auto-renewal cadence.
const MIN_RENEWAL_INTERVAL: u64 = 5_000;
/// First delay of the blocking-acquire backoff; grows by 3/2 per retry.
const ACQUIRE_BACKOFF_START: u64 = 100;

static FENCE_NONCE: AtomicU64 = AtomicU64::new(0);

/// The record stored under a lock key.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, RuntimeDebug)]
pub struct Lease {
	pub fence: u64,
	pub expires: Timestamp,
}

/// A named leased lock. Each instance carries its own fencing value; the
/// lease is only held between a successful acquire and the guard's release
/// (or TTL expiry, whichever comes first).
pub struct LeasedLock {
	key: Vec<u8>,
	ttl: Duration,
	fence: u64,
}

impl LeasedLock {
	pub fn new(key: Vec<u8>, ttl: Duration) -> Self {
		let seed = sp_io::offchain::random_seed();
		let mut word = [0u8; 8];
		word.copy_from_slice(&seed[0..8]);
		// the nonce keeps fences distinct when several locks are created
		// from one worker invocation (the seed is fixed per invocation)
		let fence = u64::from_le_bytes(word).wrapping_add(FENCE_NONCE.fetch_add(1, Ordering::Relaxed));
		LeasedLock { key, ttl, fence }
	}

	/// The global expiry-sweep lock shared by every instance.
	pub fn sweep_lock() -> Self {
		Self::new(SWEEP_LOCK.to_vec(), Duration::from_millis(SWEEP_LOCK_DURATION))
	}

	/// The hero revive/purge maintenance lock.
	pub fn hero_maintenance_lock() -> Self {
		Self::new(HERO_MAINTENANCE_LOCK.to_vec(), Duration::from_millis(SWEEP_LOCK_DURATION))
	}

	pub fn auction_lock(id: AuctionId) -> Self {
		Self::new(
			Self::suffixed(AUCTION_LOCK_PREFIX, &id.encode()),
			Duration::from_millis(RESOURCE_LOCK_DURATION),
		)
	}

	pub fn lot_lock(id: LotId) -> Self {
		Self::new(
			Self::suffixed(LOT_LOCK_PREFIX, &id.encode()),
			Duration::from_millis(RESOURCE_LOCK_DURATION),
		)
	}

	pub fn user_lock<AccountId: Encode>(who: &AccountId) -> Self {
		Self::new(
			Self::suffixed(USER_LOCK_PREFIX, &who.encode()),
			Duration::from_millis(USER_LOCK_DURATION),
		)
	}

	pub fn hero_lock(id: HeroId) -> Self {
		Self::new(
			Self::suffixed(b"dist_lock/hero/", &id.encode()),
			Duration::from_millis(RESOURCE_LOCK_DURATION),
		)
	}

	fn suffixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
		let mut key = prefix.to_vec();
		key.extend_from_slice(suffix);
		key
	}

	/// Take the lease if nobody else holds an unexpired one. Never waits.
	pub fn try_acquire(&self) -> Result<LeaseGuard<'_>, OffchainErr> {
		let storage = StorageValueRef::persistent(&self.key);
		let now = sp_io::offchain::timestamp();
		let expires = now.add(self.ttl);

		let outcome =
			storage.mutate(|lease: Result<Option<Lease>, StorageRetrievalError>| match lease {
				Ok(Some(lease)) if lease.fence != self.fence && lease.expires > now => {
					Err(OffchainErr::LockHeld)
				}
				_ => Ok(Lease {
					fence: self.fence,
					expires,
				}),
			});

		match outcome {
			Ok(_) => Ok(LeaseGuard {
				lock: self,
				renewed_at: now,
			}),
			Err(MutateStorageError::ValueFunctionFailed(e)) => Err(e),
			// lost the compare-and-set race: somebody grabbed it first
			Err(MutateStorageError::ConcurrentModification(_)) => Err(OffchainErr::LockHeld),
		}
	}

	/// Retry `try_acquire` with exponential backoff until `timeout` elapses.
	pub fn acquire_blocking(&self, timeout: Duration) -> Result<LeaseGuard<'_>, OffchainErr> {
		let deadline = sp_io::offchain::timestamp().add(timeout);
		let mut backoff = ACQUIRE_BACKOFF_START;
		loop {
			match self.try_acquire() {
				Err(OffchainErr::LockHeld) => {}
				other => return other,
			}
			let now = sp_io::offchain::timestamp();
			if now >= deadline {
				return Err(OffchainErr::LockHeld);
			}
			let remaining = deadline.diff(&now).millis();
			let wait = backoff.min(remaining);
			sp_io::offchain::sleep_until(now.add(Duration::from_millis(wait)));
			backoff = backoff.saturating_mul(3) / 2;
		}
	}

	fn conditional_write(&self, expires: Timestamp) -> Result<(), OffchainErr> {
		let storage = StorageValueRef::persistent(&self.key);
		let outcome =
			storage.mutate(|lease: Result<Option<Lease>, StorageRetrievalError>| match lease {
				Ok(Some(lease)) if lease.fence == self.fence => Ok(Lease {
					fence: self.fence,
					expires,
				}),
				_ => Err(OffchainErr::LockLost),
			});
		match outcome {
			Ok(_) => Ok(()),
			Err(MutateStorageError::ValueFunctionFailed(e)) => Err(e),
			Err(MutateStorageError::ConcurrentModification(_)) => Err(OffchainErr::LockLost),
		}
	}
}

/// Proof of a held lease. Dropping the guard does NOT release the lease;
/// call `release` to hand the key back early, or `forget` to keep it until
/// the TTL runs out (so the next worker pass cannot start immediately).
pub struct LeaseGuard<'a> {
	lock: &'a LeasedLock,
	renewed_at: Timestamp,
}

impl<'a> LeaseGuard<'a> {
	/// Push the expiry `additional_ttl` past now, if the lease is still ours.
	pub fn extend(&mut self, additional_ttl: Duration) -> Result<(), OffchainErr> {
		let now = sp_io::offchain::timestamp();
		self.lock.conditional_write(now.add(additional_ttl))?;
		self.renewed_at = now;
		Ok(())
	}

	/// Renew at the standard cadence of `max(ttl / 3, 5 s)`; a no-op when
	/// called more often. A fencing mismatch means the lease was lost and is
	/// reported without retrying.
	pub fn extend_if_needed(&mut self) -> Result<(), OffchainErr> {
		let interval = (self.lock.ttl.millis() / 3).max(MIN_RENEWAL_INTERVAL);
		let now = sp_io::offchain::timestamp();
		if now.diff(&self.renewed_at).millis() >= interval {
			self.extend(self.lock.ttl)?;
		}
		Ok(())
	}

	/// Expire the lease now, if still ours. Compare-and-release: a fencing
	/// mismatch reports `LockLost` and leaves the other holder's lease
	/// alone.
	pub fn release(self) -> Result<(), OffchainErr> {
		let now = sp_io::offchain::timestamp();
		self.lock.conditional_write(now)
	}

	/// Keep the lease until its TTL runs out.
	pub fn forget(self) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sp_core::offchain::{testing, OffchainDbExt, OffchainWorkerExt};

	fn new_test_ext() -> sp_io::TestExternalities {
		let (offchain, _state) = testing::TestOffchainExt::new();
		let mut ext = sp_io::TestExternalities::default();
		ext.register_extension(OffchainDbExt::new(offchain.clone()));
		ext.register_extension(OffchainWorkerExt::new(offchain));
		ext
	}

	#[test]
	fn acquire_and_release_round_trip() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::sweep_lock();
			let guard = lock.try_acquire().unwrap();
			assert_ok_release(guard);

			// released: a different instance can take it immediately
			let other = LeasedLock::sweep_lock();
			assert!(other.try_acquire().is_ok());
		});
	}

	#[test]
	fn second_holder_is_rejected_while_lease_lives() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::sweep_lock();
			let _guard = lock.try_acquire().unwrap();

			let other = LeasedLock::sweep_lock();
			assert_eq!(other.try_acquire().err(), Some(OffchainErr::LockHeld));
		});
	}

	#[test]
	fn reacquire_with_same_fence_is_reentrant() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::sweep_lock();
			let _guard = lock.try_acquire().unwrap();
			assert!(lock.try_acquire().is_ok());
		});
	}

	#[test]
	fn extend_keeps_the_lease() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::auction_lock(7);
			let mut guard = lock.try_acquire().unwrap();
			assert!(guard.extend(Duration::from_millis(1_000)).is_ok());
			assert!(guard.extend_if_needed().is_ok());
		});
	}

	#[test]
	fn release_after_takeover_reports_lock_lost() {
		let (offchain, state) = testing::TestOffchainExt::new();
		let mut ext = sp_io::TestExternalities::default();
		ext.register_extension(OffchainDbExt::new(offchain.clone()));
		ext.register_extension(OffchainWorkerExt::new(offchain));

		ext.execute_with(|| {
			let lock = LeasedLock::user_lock(&1u64);
			let guard = lock.try_acquire().unwrap();

			// lease expires, another instance takes over
			state.write().timestamp = Timestamp::from_unix_millis(USER_LOCK_DURATION + 1);
			let other = LeasedLock::user_lock(&1u64);
			let _their_guard = other.try_acquire().unwrap();

			assert_eq!(guard.release().err(), Some(OffchainErr::LockLost));
		});
	}

	#[test]
	fn blocking_acquire_succeeds_without_contention() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::lot_lock(3);
			assert!(lock.acquire_blocking(Duration::from_millis(500)).is_ok());
		});
	}

	#[test]
	fn blocking_acquire_gives_up_at_timeout() {
		new_test_ext().execute_with(|| {
			let lock = LeasedLock::lot_lock(4);
			let _guard = lock.try_acquire().unwrap();

			let other = LeasedLock::lot_lock(4);
			assert_eq!(
				other.acquire_blocking(Duration::from_millis(500)).err(),
				Some(OffchainErr::LockHeld)
			);
		});
	}

	fn assert_ok_release(guard: LeaseGuard<'_>) {
		assert!(guard.release().is_ok());
	}
}
