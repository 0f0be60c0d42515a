#![no_main]

use ferrous_ioc::{Container, DiError, ValueProvider};
use futures::executor::block_on;
use libfuzzer_sys::fuzz_target;

// Pairs of bytes become alias edges between eight tokens; token 0 is bound
// to a value. Whatever the graph, resolution must terminate and cycles must
// be refused at mapping time.
fuzz_target!(|data: &[u8]| {
    let container = Container::new();
    block_on(container.register("t0", ValueProvider::new(0u8))).unwrap();

    for pair in data.chunks_exact(2) {
        let from = format!("t{}", pair[0] % 8);
        let to = format!("t{}", pair[1] % 8);
        let result = if pair[0] & 0x80 == 0 {
            container.map(from, to)
        } else {
            container.map_many(from, [to])
        };
        if let Err(error) = result {
            assert!(matches!(
                error,
                DiError::DuplicateBinding(_) | DiError::TypeMismatch { .. } | DiError::CircularMapping(_)
            ));
        }
    }

    for index in 0..8 {
        let _ = block_on(container.try_resolve(format!("t{index}")));
    }
});
