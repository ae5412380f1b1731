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

#![cfg_attr(not(feature = "std"), no_std)]

pub mod leased_lock;

pub use leased_lock::{Lease, LeaseGuard, LeasedLock};

/// Error which may occur while executing the off-chain code.
#[cfg_attr(test, derive(PartialEq))]
pub enum OffchainErr {
	OffchainStore,
	SubmitTransaction,
	NotValidator,
	/// Another holder has an unexpired lease on the key.
	LockHeld,
	/// The fencing value no longer matches: the lease expired and was taken
	/// over by somebody else.
	LockLost,
}

impl sp_std::fmt::Debug for OffchainErr {
	fn fmt(&self, fmt: &mut sp_std::fmt::Formatter) -> sp_std::fmt::Result {
		match *self {
			OffchainErr::OffchainStore => write!(fmt, "Failed to manipulate offchain store"),
			OffchainErr::SubmitTransaction => write!(fmt, "Failed to submit transaction"),
			OffchainErr::NotValidator => write!(fmt, "Is not validator"),
			OffchainErr::LockHeld => write!(fmt, "Lock is held by another instance"),
			OffchainErr::LockLost => write!(fmt, "Lease fencing value mismatch"),
		}
	}
}
