#![no_main]

//! Replay decoder fuzzer.
//!
//! Arbitrary bytes must decode to a replay or a `DecodeError`, never panic
//! or allocate without bound.

use flagfall::replay::ReplayReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(replay) = ReplayReader::decode(data) {
        // Anything that decodes must be replayable
        let last = replay.rounds.last().map_or(0, |r| r.round);
        let _ = replay.state_at(last);
    }
});
