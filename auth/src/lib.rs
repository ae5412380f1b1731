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

//! # Token Service
//!
//! Short-lived access tokens and long-lived refresh tokens for the HTTP
//! edge. A token is SCALE-encoded claims signed with the service's sr25519
//! key, armored as `hex(claims).hex(signature)`.
//!
//! Refresh tokens rotate: every refresh issues a new token in the same
//! rotation *family* with an incremented serial, and the authority
//! remembers the latest serial per family. Presenting an older serial is
//! reuse — the family is revoked on the spot, which cuts off a stolen
//! refresh token the moment either holder rotates again.

use codec::{Decode, Encode};
use parking_lot::Mutex;
use primitives::{AccountId, Moment, Role};
use sp_core::{sr25519, Pair as PairT, H256};
use std::{
	collections::HashMap,
	time::{Duration, SystemTime, UNIX_EPOCH},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
	#[error("token is not in payload.signature form")]
	Malformed,
	#[error("token signature does not verify")]
	BadSignature,
	#[error("token has expired")]
	Expired,
	#[error("token type does not match the operation")]
	WrongTokenType,
	#[error("refresh token was already rotated; family revoked")]
	RefreshReuse,
	#[error("rotation family has been revoked")]
	FamilyRevoked,
}

#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenType {
	Access,
	Refresh,
}

/// What a token asserts about its bearer.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug)]
pub struct Claims {
	pub sub: AccountId,
	pub role: Role,
	pub token_type: TokenType,
	/// Expiry, unix milliseconds.
	pub exp: Moment,
	/// Rotation family; `None` on access tokens.
	pub family: Option<H256>,
	/// Position in the rotation chain; 0 on access tokens.
	pub serial: u64,
}

/// An access/refresh pair as handed to the transport layer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TokenPair {
	pub access: String,
	pub refresh: String,
	pub family: H256,
}

#[derive(Clone, Debug)]
pub struct TokenConfig {
	pub access_ttl: Duration,
	pub refresh_ttl: Duration,
	pub rotation_enabled: bool,
}

impl Default for TokenConfig {
	fn default() -> Self {
		TokenConfig {
			access_ttl: Duration::from_secs(20 * 60),
			refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
			rotation_enabled: true,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FamilyState {
	/// Latest serial issued for the family.
	Active(u64),
	/// Reuse was detected; every token of the family is dead.
	Revoked,
}

/// Issues and validates tokens. One instance per process; the family
/// registry lives in memory and adopts unknown families on first sight, so
/// a restart weakens reuse detection for in-flight chains instead of
/// logging everyone out.
pub struct TokenAuthority {
	pair: sr25519::Pair,
	config: TokenConfig,
	families: Mutex<HashMap<H256, FamilyState>>,
}

impl TokenAuthority {
	pub fn new(secret_seed: &[u8; 32], config: TokenConfig) -> Self {
		TokenAuthority {
			pair: sr25519::Pair::from_seed(secret_seed),
			config,
			families: Mutex::new(HashMap::new()),
		}
	}

	/// Mint a fresh pair in a brand-new rotation family. Credential
	/// verification happened upstream.
	pub fn login(&self, sub: AccountId, role: Role) -> TokenPair {
		let family = H256::random();
		self.families.lock().insert(family, FamilyState::Active(0));
		log::info!(target: "arena-auth", "issued token family {:?}", family);
		self.issue_pair(sub, role, family, 0)
	}

	/// Rotate a refresh token: same family, next serial. The returned
	/// refresh token is the only one considered valid afterwards.
	pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
		let claims = self.decode(refresh_token, TokenType::Refresh)?;
		let family = claims.family.ok_or(Error::Malformed)?;

		let next_serial = if self.config.rotation_enabled {
			let mut families = self.families.lock();
			match families.get(&family).copied() {
				// server restart lost the chain: adopt what we see
				None => {}
				Some(FamilyState::Active(latest)) if latest == claims.serial => {}
				Some(FamilyState::Revoked) => return Err(Error::FamilyRevoked),
				Some(FamilyState::Active(_)) => {
					families.insert(family, FamilyState::Revoked);
					log::warn!(
						target: "arena-auth",
						"refresh reuse detected, family {:?} revoked",
						family,
					);
					return Err(Error::RefreshReuse);
				}
			}
			let next = claims.serial + 1;
			families.insert(family, FamilyState::Active(next));
			next
		} else {
			claims.serial + 1
		};

		Ok(self.issue_pair(claims.sub, claims.role, family, next_serial))
	}

	/// Validate an access token and return its claims.
	pub fn decode_access(&self, token: &str) -> Result<Claims, Error> {
		self.decode(token, TokenType::Access)
	}

	fn issue_pair(&self, sub: AccountId, role: Role, family: H256, serial: u64) -> TokenPair {
		let now = now_millis();
		let access = self.sign(Claims {
			sub: sub.clone(),
			role,
			token_type: TokenType::Access,
			exp: now + self.config.access_ttl.as_millis() as Moment,
			family: None,
			serial: 0,
		});
		let refresh = self.sign(Claims {
			sub,
			role,
			token_type: TokenType::Refresh,
			exp: now + self.config.refresh_ttl.as_millis() as Moment,
			family: Some(family),
			serial,
		});
		TokenPair {
			access,
			refresh,
			family,
		}
	}

	fn sign(&self, claims: Claims) -> String {
		let payload = claims.encode();
		let signature = self.pair.sign(&payload);
		let mut token = hex::encode(&payload);
		token.push('.');
		token.push_str(&hex::encode(signature.0));
		token
	}

	fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, Error> {
		let (payload_hex, signature_hex) = token.split_once('.').ok_or(Error::Malformed)?;
		let payload = hex::decode(payload_hex).map_err(|_| Error::Malformed)?;
		let signature_bytes: [u8; 64] = hex::decode(signature_hex)
			.map_err(|_| Error::Malformed)?
			.try_into()
			.map_err(|_| Error::Malformed)?;
		let signature = sr25519::Signature::from_raw(signature_bytes);

		if !sr25519::Pair::verify(&signature, &payload, &self.pair.public()) {
			return Err(Error::BadSignature);
		}

		let claims = Claims::decode(&mut &payload[..]).map_err(|_| Error::Malformed)?;
		if claims.token_type != expected {
			return Err(Error::WrongTokenType);
		}
		if claims.exp <= now_millis() {
			return Err(Error::Expired);
		}
		Ok(claims)
	}
}

fn now_millis() -> Moment {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is after the unix epoch; qed")
		.as_millis() as Moment
}

#[cfg(test)]
mod tests {
	use super::*;
	use sp_core::crypto::AccountId32;

	const SEED: [u8; 32] = [42u8; 32];

	fn alice() -> AccountId {
		AccountId32::new([1u8; 32])
	}

	fn authority() -> TokenAuthority {
		TokenAuthority::new(&SEED, TokenConfig::default())
	}

	#[test]
	fn login_issues_a_decodable_pair() {
		let authority = authority();
		let pair = authority.login(alice(), Role::Moderator);

		let claims = authority.decode_access(&pair.access).unwrap();
		assert_eq!(claims.sub, alice());
		assert_eq!(claims.role, Role::Moderator);
		assert_eq!(claims.token_type, TokenType::Access);
		assert!(claims.family.is_none());
	}

	#[test]
	fn refresh_token_is_not_an_access_token() {
		let authority = authority();
		let pair = authority.login(alice(), Role::User);
		assert_eq!(
			authority.decode_access(&pair.refresh),
			Err(Error::WrongTokenType)
		);
		// and an access token cannot refresh
		assert_eq!(
			authority.refresh(&pair.access),
			Err(Error::WrongTokenType)
		);
	}

	#[test]
	fn expired_tokens_are_rejected() {
		let authority = TokenAuthority::new(
			&SEED,
			TokenConfig {
				access_ttl: Duration::ZERO,
				..TokenConfig::default()
			},
		);
		let pair = authority.login(alice(), Role::User);
		assert_eq!(authority.decode_access(&pair.access), Err(Error::Expired));
	}

	#[test]
	fn tampered_tokens_do_not_verify() {
		let authority = authority();
		let pair = authority.login(alice(), Role::User);

		let (payload, signature) = pair.access.split_once('.').unwrap();
		// flip one payload nibble, keep the signature
		let mut bytes = hex::decode(payload).unwrap();
		bytes[0] ^= 0x01;
		let forged = format!("{}.{}", hex::encode(bytes), signature);
		assert_eq!(authority.decode_access(&forged), Err(Error::BadSignature));

		assert_eq!(authority.decode_access("not-a-token"), Err(Error::Malformed));
	}

	#[test]
	fn tokens_from_another_key_are_rejected() {
		let ours = authority();
		let theirs = TokenAuthority::new(&[7u8; 32], TokenConfig::default());
		let pair = theirs.login(alice(), Role::Admin);
		assert_eq!(ours.decode_access(&pair.access), Err(Error::BadSignature));
	}

	#[test]
	fn refresh_rotates_within_the_family() {
		let authority = authority();
		let first = authority.login(alice(), Role::User);
		let second = authority.refresh(&first.refresh).unwrap();

		assert_eq!(second.family, first.family);
		assert_ne!(second.refresh, first.refresh);
		assert!(authority.decode_access(&second.access).is_ok());
	}

	#[test]
	fn replaying_an_old_refresh_token_revokes_the_family() {
		let authority = authority();
		let first = authority.login(alice(), Role::User);
		let second = authority.refresh(&first.refresh).unwrap();

		// the stolen (already rotated) token comes back
		assert_eq!(authority.refresh(&first.refresh), Err(Error::RefreshReuse));

		// the revocation cuts off the legitimate chain too
		assert_eq!(authority.refresh(&second.refresh), Err(Error::FamilyRevoked));
	}

	#[test]
	fn rotation_can_be_disabled() {
		let authority = TokenAuthority::new(
			&SEED,
			TokenConfig {
				rotation_enabled: false,
				..TokenConfig::default()
			},
		);
		let first = authority.login(alice(), Role::User);
		let _second = authority.refresh(&first.refresh).unwrap();
		// without rotation tracking the old token stays syntactically valid
		assert!(authority.refresh(&first.refresh).is_ok());
	}
}
