#![no_main]

use libfuzzer_sys::fuzz_target;
use classabi::metadata::{bitencoding::encode_bytes, ClassMetadata, MetadataHeader};

fuzz_target!(|data: &[u8]| {
    let Some((&kind, payload)) = data.split_first() else {
        return;
    };
    let header = MetadataHeader {
        kind: i32::from(kind % 6),
        metadata_version: vec![1, 9, 0],
        data1: encode_bytes(payload),
        data2: (0..16).map(|i| format!("s{i}")).collect(),
        ..MetadataHeader::default()
    };
    if let Ok(mut metadata) = ClassMetadata::parse(&header) {
        metadata.prune("com/x/Fuzz", Default::default(), |_| false);
        let _ = metadata.to_header();
    }
});
