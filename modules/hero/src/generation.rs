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

//! The default hero roller. Everything is derived from the caller-supplied
//! seed, so the same seed, generation and locale always roll the same hero;
//! game-balance tuning happens here without touching the generation
//! transaction.

use codec::Encode;
use primitives::Locale;
use sp_std::prelude::*;
use support::{GeneratedHero, HeroAttributes, HeroGenerator, HeroPerk};

const FIRST_NAMES: &[&str] = &[
	"Aldric", "Beron", "Cassia", "Darian", "Elara", "Fenris", "Gareth", "Isolde", "Joren",
	"Kaelen", "Lyra", "Maren", "Nyx", "Orin", "Petra", "Quill", "Ronan", "Sable", "Theron",
	"Vesna",
];

const LAST_NAMES: &[&str] = &[
	"Ashgrove", "Blackwood", "Coldspring", "Dawnbreak", "Emberfall", "Frostholm", "Grimward",
	"Hollowbrook", "Ironvale", "Nightriver", "Oakenshield", "Stormwatch", "Thornfield",
	"Winterborn",
];

/// Nicknames by dominant attribute, per locale. Index order matches the
/// field order of `HeroAttributes`.
const NICKNAMES_EN: &[&str] = &[
	"the Strong",
	"the Swift",
	"the Wise",
	"the Unyielding",
	"the Fleet",
	"the Stalwart",
	"the Shielded",
	"the Fortunate",
	"the Farsighted",
];

const NICKNAMES_UK: &[&str] = &[
	"Сильний",
	"Спритний",
	"Мудрий",
	"Незламний",
	"Швидкий",
	"Живучий",
	"Захищений",
	"Щасливий",
	"Далекозорий",
];

/// How many distinct perks exist in the pool.
const PERK_POOL_SIZE: u8 = 12;

/// Deterministic byte source: draw `i` hashes the seed with a counter, so
/// consecutive draws are independent and the stream never repeats within a
/// roll.
struct SeedStream {
	seed: [u8; 32],
	counter: u32,
}

impl SeedStream {
	fn new(seed: &[u8; 32]) -> Self {
		SeedStream {
			seed: *seed,
			counter: 0,
		}
	}

	fn draw(&mut self) -> u64 {
		let hash = sp_io::hashing::blake2_256(&(self.seed, self.counter).encode());
		self.counter += 1;
		let mut word = [0u8; 8];
		word.copy_from_slice(&hash[0..8]);
		u64::from_le_bytes(word)
	}

	/// Uniform-ish draw in `[lo, hi]`.
	fn in_range(&mut self, lo: u64, hi: u64) -> u64 {
		let span = hi.saturating_sub(lo).saturating_add(1);
		lo + self.draw() % span
	}
}

/// Attribute range for a generation: higher generations roll strictly
/// better floors and ceilings.
fn attribute_range(generation: u8) -> (u64, u64) {
	let g = generation as u64;
	(8 * g, 14 * g + 6)
}

pub struct DefaultHeroGenerator;

impl HeroGenerator for DefaultHeroGenerator {
	fn generate(seed: &[u8; 32], generation: u8, locale: Locale) -> GeneratedHero {
		let mut stream = SeedStream::new(seed);
		let (lo, hi) = attribute_range(generation);

		let mut roll = || stream.in_range(lo, hi) as u16;
		let attributes = HeroAttributes {
			strength: roll(),
			agility: roll(),
			intelligence: roll(),
			endurance: roll(),
			speed: roll(),
			health: roll(),
			defense: roll(),
			luck: roll(),
			field_of_view: roll(),
		};

		// one perk per generation level, levelled within the generation's
		// decade, no duplicates
		let level_lo = (generation as u64 - 1) * 10 + 1;
		let level_hi = generation as u64 * 10;
		let mut perks: Vec<HeroPerk> = Vec::new();
		while (perks.len() as u8) < generation {
			let perk_id = stream.in_range(0, PERK_POOL_SIZE as u64 - 1) as u8;
			if perks.iter().any(|p| p.perk_id == perk_id) {
				continue;
			}
			perks.push(HeroPerk {
				perk_id,
				level: stream.in_range(level_lo, level_hi) as u8,
			});
		}

		let first = FIRST_NAMES[stream.in_range(0, FIRST_NAMES.len() as u64 - 1) as usize];
		let last = LAST_NAMES[stream.in_range(0, LAST_NAMES.len() as u64 - 1) as usize];
		let mut name = Vec::with_capacity(first.len() + last.len() + 1);
		name.extend_from_slice(first.as_bytes());
		name.push(b' ');
		name.extend_from_slice(last.as_bytes());

		let nickname = nickname_for(&attributes, locale);

		GeneratedHero {
			name: name.try_into().expect("first + last name fit the bound; qed"),
			nickname: nickname
				.as_bytes()
				.to_vec()
				.try_into()
				.expect("nicknames fit the bound; qed"),
			attributes,
			perks: perks.try_into().expect("at most 10 perks rolled; qed"),
		}
	}
}

/// The dominant attribute names the hero.
fn nickname_for(attributes: &HeroAttributes, locale: Locale) -> &'static str {
	let values = [
		attributes.strength,
		attributes.agility,
		attributes.intelligence,
		attributes.endurance,
		attributes.speed,
		attributes.health,
		attributes.defense,
		attributes.luck,
		attributes.field_of_view,
	];
	let mut dominant = 0;
	for (index, value) in values.iter().enumerate() {
		if *value > values[dominant] {
			dominant = index;
		}
	}
	match locale {
		Locale::En => NICKNAMES_EN[dominant],
		Locale::Uk => NICKNAMES_UK[dominant],
	}
}
