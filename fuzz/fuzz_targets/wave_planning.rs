#![no_main]

use ferrous_ioc::{plan_waves, WaveEntry};
use libfuzzer_sys::fuzz_target;

// Each 3-byte chunk is one entry: owner, before target, after target.
// Targets with the high bit set are left out.
fuzz_target!(|data: &[u8]| {
    let entries: Vec<WaveEntry<usize>> = data
        .chunks_exact(3)
        .enumerate()
        .map(|(index, chunk)| {
            let mut entry = WaveEntry::new(format!("o{}", chunk[0] % 16), index);
            if chunk[1] & 0x80 == 0 {
                entry = entry.before([format!("o{}", chunk[1] % 16)]);
            }
            if chunk[2] & 0x80 == 0 {
                entry = entry.after([format!("o{}", chunk[2] % 16)]);
            }
            entry
        })
        .collect();
    let count = entries.len();

    let waves = plan_waves(entries);
    assert_eq!(waves.iter().map(Vec::len).sum::<usize>(), count);
    assert!(waves.iter().all(|wave| !wave.is_empty()));
});
