use chrono::{DateTime, Utc};
use rand::RngCore;
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{GenerationError, ParseKindError},
    key::{Key, KEY_LEN},
    ticks::ticks_since_gregorian_reform,
};

/// Clears the top nibble of byte 0 so the version tag can take its place.
pub const VERSION_MASK: u8 = 0b0000_1111;
/// Version 1 (time-based) tag.
pub const VERSION_TAG: u8 = 0b0001_0000;
/// Clears the top two bits of byte 8 so the variant tag can take their place.
pub const VARIANT_MASK: u8 = 0b0011_1111;
/// RFC 4122 variant tag.
pub const VARIANT_TAG: u8 = 0b1000_0000;
/// How much faster than the wall clock time runs for the truncated variant.
pub const TIME_WARP: i64 = 1_000_000;

/// Strategy used to produce primary keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyGenerator {
    /// Random bytes. Baseline with no ordering at all.
    Random,
    /// Tick count first, random tail.
    TimeOrdered,
    /// Time-ordered layout over accelerated time, re-parsed through the
    /// canonical text form by a little-endian-field implementation.
    TimeOrderedTruncated { started_at: DateTime<Utc> },
}

impl KeyGenerator {
    /// Builds the truncated variant with its time warp anchored at the current instant.
    pub fn truncated_from_now() -> Self { KeyGenerator::TimeOrderedTruncated { started_at: Utc::now() } }

    /// Metrics label for keys of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            KeyGenerator::Random => "Guid",
            KeyGenerator::TimeOrdered => "Primitives_Uuid",
            KeyGenerator::TimeOrderedTruncated { .. } => "Uuid_As_Broken_Guid",
        }
    }

    /// Writes a fresh key for `now` into `buffer`.
    pub fn fill(&self, buffer: &mut [u8; KEY_LEN], now: DateTime<Utc>) -> Result<(), GenerationError> {
        match self {
            KeyGenerator::Random => rand::thread_rng().fill_bytes(buffer),
            KeyGenerator::TimeOrdered => lay_out_time_ordered(buffer, ticks_since_gregorian_reform(now)),
            KeyGenerator::TimeOrderedTruncated { started_at } => {
                lay_out_time_ordered(buffer, warped_ticks(*started_at, now));
                reorder_through_text(buffer)?;
            }
        }
        Ok(())
    }

    pub fn generate(&self, now: DateTime<Utc>) -> Result<Key, GenerationError> {
        let mut buffer = [0u8; KEY_LEN];
        self.fill(&mut buffer, now)?;
        Ok(Key::from_bytes(buffer))
    }
}

/// Ticks of `started_at + (now - started_at) * TIME_WARP`.
///
/// The warped clock runs out of `i64` ticks roughly ten days after `started_at`.
/// From then on it stays pinned at `i64::MAX`, so every key shares one prefix;
/// the first pinned reading is logged.
pub fn warped_ticks(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    match checked_warped_ticks(started_at, now) {
        Some(ticks) => ticks,
        None => {
            if !WARP_SATURATION_REPORTED.swap(true, Ordering::Relaxed) {
                warn!(%started_at, %now, "warped clock exceeded the tick range, truncated keys now share one prefix");
            }
            i64::MAX
        }
    }
}

static WARP_SATURATION_REPORTED: AtomicBool = AtomicBool::new(false);

fn checked_warped_ticks(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    let start = ticks_since_gregorian_reform(started_at);
    let elapsed = ticks_since_gregorian_reform(now).saturating_sub(start);
    elapsed.checked_mul(TIME_WARP).and_then(|warped| start.checked_add(warped))
}

/// Lays out `ticks` most significant byte first, tagged with the version and
/// variant bits, over a random tail.
pub fn lay_out_time_ordered(buffer: &mut [u8; KEY_LEN], ticks: i64) {
    rand::thread_rng().fill_bytes(&mut buffer[8..]);

    let ticks = ticks.to_be_bytes();
    buffer[0] = (ticks[0] & VERSION_MASK) | VERSION_TAG;
    buffer[1..8].copy_from_slice(&ticks[1..]);
    buffer[8] = (buffer[8] & VARIANT_MASK) | VARIANT_TAG;
}

/// Renders the key as hyphenated text and re-reads it with the first three
/// fields stored little-endian, which reverses bytes 0..4 and swaps 4..6 and 6..8.
pub fn reorder_through_text(buffer: &mut [u8; KEY_LEN]) -> Result<(), GenerationError> {
    let text = Uuid::from_bytes(*buffer).hyphenated().to_string();
    let reparsed = Uuid::parse_str(&text)?;
    *buffer = reparsed.to_bytes_le();
    Ok(())
}

/// Configuration-side name of a generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Random,
    TimeOrdered,
    Broken,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [GeneratorKind::Random, GeneratorKind::TimeOrdered, GeneratorKind::Broken];

    pub fn build(&self, started_at: DateTime<Utc>) -> KeyGenerator {
        match self {
            GeneratorKind::Random => KeyGenerator::Random,
            GeneratorKind::TimeOrdered => KeyGenerator::TimeOrdered,
            GeneratorKind::Broken => KeyGenerator::TimeOrderedTruncated { started_at },
        }
    }

    /// Table the kind writes to unless configured otherwise.
    pub fn default_table(&self) -> &'static str {
        match self {
            GeneratorKind::Random => "guid_keys",
            GeneratorKind::TimeOrdered => "seq_keys",
            GeneratorKind::Broken => "broken_keys",
        }
    }

    /// Each kind gets its own database instance; this is its ordinal.
    pub fn instance(&self) -> u16 {
        match self {
            GeneratorKind::Random => 1,
            GeneratorKind::TimeOrdered => 2,
            GeneratorKind::Broken => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Random => "random",
            GeneratorKind::TimeOrdered => "time-ordered",
            GeneratorKind::Broken => "broken",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for GeneratorKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "guid" => Ok(GeneratorKind::Random),
            "time-ordered" | "time_ordered" | "sequential" | "seq" => Ok(GeneratorKind::TimeOrdered),
            "broken" | "truncated" => Ok(GeneratorKind::Broken),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}
