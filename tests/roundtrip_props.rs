use proptest::prelude::*;
use sgex::escape::{escape, unescape};
use sgex::fec::{self, FecDecoder, FecParams, ReedSolomon};
use sgex::pipeline::decode_transmission;
use sgex::transmit::encode_transmission;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Any save and any filename of at most 11 bytes comes back unchanged.
    #[test]
    fn prop_pipeline_recovers_save_and_name(
        save in proptest::collection::vec(any::<u8>(), 0..4000),
        name in "[A-Za-z0-9_.]{1,11}",
    ) {
        let wire = encode_transmission(&name, &save).unwrap();
        let decoded = decode_transmission(&wire).unwrap();
        prop_assert_eq!(&decoded.header.save_filename, &name);
        prop_assert_eq!(&decoded.payload, &save);
        prop_assert!(!decoded.verify().is_mismatch());
    }

    // Unescaping inverts escaping and removes every sync byte from the wire.
    #[test]
    fn prop_escape_is_invertible(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let wire = escape(&data);
        prop_assert!(!wire.contains(&0xAB));
        prop_assert_eq!(unescape(&wire).unwrap(), data);
    }

    // Up to 16 corrupted symbols in a full block are all found and fixed.
    #[test]
    fn prop_fec_corrects_within_bound(
        data in proptest::collection::vec(any::<u8>(), 223),
        positions in proptest::sample::subsequence((0..255usize).collect::<Vec<_>>(), 0..=16),
        flip in 1..=255u8,
    ) {
        let rs = ReedSolomon::new(FecParams::SGEX);
        let mut block = fec::encode(&rs, &data).unwrap();
        for &p in &positions {
            block[p] ^= flip;
        }

        let out = rs.decode(&block).unwrap();
        prop_assert_eq!(out.data, data);
        prop_assert_eq!(out.errors_corrected, positions.len());
    }
}
