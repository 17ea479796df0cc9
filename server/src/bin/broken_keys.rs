//! Prints time-ordered keys next to what the text round-trip turns them into.
//!
//! One line per minute offset from now: `<laid out> <after round-trip>`.

use anyhow::Result;
use chrono::{Duration, Utc};
use keybench_keys::{lay_out_time_ordered, reorder_through_text, ticks_since_gregorian_reform, Key, KEY_LEN};

fn main() -> Result<()> {
    let now = Utc::now();
    for minutes in 0..20 {
        let mut laid_out = [0u8; KEY_LEN];
        lay_out_time_ordered(&mut laid_out, ticks_since_gregorian_reform(now + Duration::minutes(minutes)));

        let mut reordered = laid_out;
        reorder_through_text(&mut reordered)?;

        println!("{} {}", Key::from_bytes(laid_out), Key::from_bytes(reordered));
    }
    Ok(())
}
