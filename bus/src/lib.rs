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

//! # Cache Bus
//!
//! An in-process publish/subscribe emitter that decouples the engines from
//! the cache layer: writers emit `cache_invalidate` with a key, the cache
//! adapter subscribed to that event drops the matching entries. Subscribers
//! run in registration order and a failing subscriber never prevents the
//! rest from running.
//!
//! Glob handling lives in the cache adapter, not in the emitter: a
//! subscriber receives the raw key string and decides how to match it.

use parking_lot::RwLock;
use std::{
	collections::HashMap,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::Arc,
	time::{Duration, Instant},
};

/// The event the cache adapter listens on.
pub const CACHE_INVALIDATE: &str = "cache_invalidate";

pub type Subscriber = Arc<dyn Fn(&str) + Send + Sync>;

/// A registry of named events and their subscribers.
#[derive(Default)]
pub struct EventBus {
	subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `callback` for `event`. Callbacks fire in registration
	/// order.
	pub fn subscribe<F>(&self, event: &str, callback: F)
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		self.subscribers
			.write()
			.entry(event.to_owned())
			.or_default()
			.push(Arc::new(callback));
	}

	/// Invoke every subscriber of `event` with `payload`. A panicking
	/// subscriber is isolated; later subscribers still run.
	pub fn emit(&self, event: &str, payload: &str) {
		let handlers: Vec<Subscriber> = self
			.subscribers
			.read()
			.get(event)
			.map(|list| list.to_vec())
			.unwrap_or_default();

		for handler in handlers {
			if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
				log::warn!(
					target: "arena-bus",
					"subscriber for {:?} panicked; continuing with the rest",
					event,
				);
			}
		}
	}

	/// Drop every registration. Used by tests to reset state.
	pub fn clear(&self) {
		self.subscribers.write().clear();
	}
}

/// Outbound fan-out for chat and system messages. The core only publishes;
/// the transport layer owns the backing fan-out (websockets, Redis
/// pub/sub) by subscribing to the channels it cares about.
pub trait Publish {
	fn publish(&self, channel: &str, message: &str, user: Option<&str>);
}

impl Publish for EventBus {
	fn publish(&self, channel: &str, message: &str, user: Option<&str>) {
		match user {
			// user-scoped messages go out on a per-user channel
			Some(user) => self.emit(&format!("{channel}:{user}"), message),
			None => self.emit(channel, message),
		}
	}
}

struct CacheEntry {
	value: Vec<u8>,
	expires_at: Instant,
}

/// A TTL'd in-memory cache with prefix invalidation. Readers that miss go
/// back to the source of truth; the cache never blocks a request.
#[derive(Default)]
pub struct MemoryCache {
	entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn get(&self, key: &str) -> Option<Vec<u8>> {
		let entries = self.entries.read();
		let entry = entries.get(key)?;
		if entry.expires_at <= Instant::now() {
			return None;
		}
		Some(entry.value.clone())
	}

	pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
		self.entries.write().insert(
			key.to_owned(),
			CacheEntry {
				value,
				expires_at: Instant::now() + ttl,
			},
		);
	}

	/// Remove entries matching `key`: a trailing `*` removes everything
	/// with that prefix, anything else removes the exact key.
	pub fn delete(&self, key: &str) {
		let mut entries = self.entries.write();
		match key.strip_suffix('*') {
			Some(prefix) => {
				entries.retain(|stored, _| !stored.starts_with(prefix));
			}
			None => {
				entries.remove(key);
			}
		}
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Wire this cache to a bus: every `cache_invalidate` event drops the
	/// matching entries.
	pub fn attach(self: &Arc<Self>, bus: &EventBus) {
		let cache = Arc::clone(self);
		bus.subscribe(CACHE_INVALIDATE, move |key| cache.delete(key));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn subscribers_run_in_registration_order() {
		let bus = EventBus::new();
		let seen = Arc::new(RwLock::new(Vec::new()));

		for tag in ["first", "second", "third"] {
			let seen = Arc::clone(&seen);
			bus.subscribe("ping", move |payload| {
				seen.write().push(format!("{tag}:{payload}"));
			});
		}

		bus.emit("ping", "x");
		assert_eq!(
			*seen.read(),
			vec!["first:x".to_owned(), "second:x".to_owned(), "third:x".to_owned()]
		);
	}

	#[test]
	fn a_panicking_subscriber_does_not_stop_the_rest() {
		let bus = EventBus::new();
		let calls = Arc::new(AtomicUsize::new(0));

		bus.subscribe("ping", |_| panic!("boom"));
		{
			let calls = Arc::clone(&calls);
			bus.subscribe("ping", move |_| {
				calls.fetch_add(1, Ordering::SeqCst);
			});
		}

		bus.emit("ping", "x");
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn emit_without_subscribers_is_a_no_op() {
		let bus = EventBus::new();
		bus.emit("nobody-listens", "x");
	}

	#[test]
	fn publish_routes_user_scoped_messages() {
		let bus = EventBus::new();
		let seen = Arc::new(RwLock::new(Vec::new()));

		{
			let seen = Arc::clone(&seen);
			bus.subscribe("private:7", move |payload| {
				seen.write().push(payload.to_owned());
			});
		}

		bus.publish("private", "you won auction #3", Some("7"));
		bus.publish("private", "not for seven", Some("8"));
		bus.publish("broadcast", "maintenance at noon", None);

		assert_eq!(*seen.read(), vec!["you won auction #3".to_owned()]);
	}

	#[test]
	fn exact_delete_leaves_other_keys() {
		let cache = MemoryCache::new();
		cache.set("auctions:active", b"a".to_vec(), Duration::from_secs(60));
		cache.set("auctions:active:1", b"b".to_vec(), Duration::from_secs(60));

		cache.delete("auctions:active");
		assert!(cache.get("auctions:active").is_none());
		assert!(cache.get("auctions:active:1").is_some());
	}

	#[test]
	fn glob_delete_removes_the_prefix() {
		let cache = MemoryCache::new();
		cache.set("auctions:active", b"a".to_vec(), Duration::from_secs(60));
		cache.set("auctions:active:1", b"b".to_vec(), Duration::from_secs(60));
		cache.set("heroes:7", b"c".to_vec(), Duration::from_secs(60));

		cache.delete("auctions:active*");
		assert!(cache.get("auctions:active").is_none());
		assert!(cache.get("auctions:active:1").is_none());
		assert!(cache.get("heroes:7").is_some());
	}

	#[test]
	fn entries_expire() {
		let cache = MemoryCache::new();
		cache.set("k", b"v".to_vec(), Duration::ZERO);
		assert!(cache.get("k").is_none());
	}

	#[test]
	fn attached_cache_reacts_to_invalidation_events() {
		let bus = EventBus::new();
		let cache = MemoryCache::new();
		cache.attach(&bus);

		cache.set("auctions:active:1", b"a".to_vec(), Duration::from_secs(60));
		cache.set("auctions:active_lots:1", b"b".to_vec(), Duration::from_secs(60));

		bus.emit(CACHE_INVALIDATE, "auctions:active*");
		assert!(cache.is_empty());
	}
}
