#![no_main]

use libfuzzer_sys::fuzz_target;
use classabi::{strip_class, AbiConfig, DeletedClassNames};

fuzz_target!(|data: &[u8]| {
    let mut deleted = DeletedClassNames::new();
    let _ = strip_class(data, &AbiConfig::default(), &mut deleted);
    let _ = strip_class(data, &AbiConfig::inline_safe(), &mut deleted);
});
