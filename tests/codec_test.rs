use m1pack::codec::dict::{RingDict, INITIAL_CURSOR};
use m1pack::codec::{compress, decompress, decompress_bounded, CodecError};

#[test]
fn fresh_dictionary_state() {
    let dict = RingDict::new();
    assert_eq!(dict.cursor(), INITIAL_CURSOR);
    assert_eq!(dict.cursor(), 4096 - 18);
    assert_eq!(dict.fill(), 0);
}

#[test]
fn prefill_reads_wrap_into_live_region() {
    let mut dict = RingDict::new();
    for &b in b"ABC" {
        dict.push(b);
    }
    assert_eq!(dict.read_at(4078), b'A');
    assert_eq!(dict.read_at(4079), b'B');
    assert_eq!(dict.read_at(4080), b'C');
    // One past the cursor folds back onto the oldest live byte.
    assert_eq!(dict.read_at(4081), b'A');
    // Far-away indices fold too: (0 - 4078) mod 4096 = 18, 18 mod 3 = 0.
    assert_eq!(dict.read_at(0), b'A');
    assert_eq!(dict.read_at(1), b'B');
}

#[test]
fn full_dictionary_reads_are_plain_modulo() {
    let mut dict = RingDict::new();
    for n in 0u32..5000 {
        dict.push(n as u8);
    }
    assert_eq!(dict.fill(), 4096);
    // Byte 4999 landed at slot (4078 + 4999) mod 4096.
    let slot = (4078 + 4999) % 4096;
    assert_eq!(dict.read_at(slot), 4999u32 as u8);
    assert_eq!(dict.read_at(slot + 4096), 4999u32 as u8);
}

#[test]
fn search_skips_two_byte_windows() {
    let mut dict = RingDict::new();
    dict.push(b'A');
    dict.push(b'B');
    assert_eq!(dict.find_longest(b"ABAB", 18), None);
}

#[test]
fn search_extends_past_the_cursor() {
    let mut dict = RingDict::new();
    for &b in b"ABA" {
        dict.push(b);
    }
    // The period-2 pattern keeps matching through bytes the copy itself
    // would write.
    assert_eq!(dict.find_longest(b"BABAB", 18), Some((5, 4079)));
}

#[test]
fn search_prefers_the_most_recent_match() {
    let mut dict = RingDict::new();
    for &b in b"ABCDEABCDE" {
        dict.push(b);
    }
    let cursor = dict.cursor();
    let (len, index) = dict.find_longest(b"ABCDE", 18).unwrap();
    assert_eq!(len, 5);
    assert_eq!(index, cursor - 5);
}

#[test]
fn decode_single_literal_stream() {
    assert_eq!(decompress(&[0xFF, 0x41]).unwrap(), b"A");
}

#[test]
fn encode_single_literal_pads_the_group() {
    let encoded = compress(b"A").unwrap();
    assert_eq!(
        encoded,
        [0xFF, 0x41, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn encode_alternating_run_uses_run_length_reference() {
    let input = b"ABABABABABABABABABAB";
    let encoded = compress(input).unwrap();
    // Three literals, then one back-reference of length 17 at index 4079
    // (0xFEF): B1 = 0xEF, B2 = 0xF0 | (17 - 3) = 0xFE.
    assert_eq!(
        encoded,
        [0xF7, 0x41, 0x42, 0x41, 0xEF, 0xFE, 0x00, 0x00, 0x00, 0x00]
    );

    let decoded = decompress(&encoded).unwrap();
    assert_eq!(&decoded[..20], input);
    // The four pad tokens decode as literal zeros.
    assert_eq!(decoded.len(), 24);
    assert!(decoded[20..].iter().all(|&b| b == 0));
}

#[test]
fn encode_emits_literals_when_no_match_reaches_three() {
    let encoded = compress(b"XYXY").unwrap();
    assert_eq!(
        encoded,
        [0xFF, 0x58, 0x59, 0x58, 0x59, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn sixteen_zeros_terminate_the_stream() {
    let mut input = vec![0xFF];
    input.extend_from_slice(b"ABCDEFGH");
    input.push(0x00);
    input.extend_from_slice(&[0x00; 16]);
    assert_eq!(decompress(&input).unwrap(), b"ABCDEFGH");
}

#[test]
fn fifteen_zeros_and_a_nonzero_byte_do_not_terminate() {
    let mut input = vec![0xFF];
    input.extend_from_slice(b"ABCDEFGH");
    input.push(0x00);
    input.extend_from_slice(&[0x00; 15]);
    input.push(0x01);
    // The zero flag byte is a legitimate all-back-reference group: seven
    // length-3 copies and one length-4 copy.
    let decoded = decompress(&input).unwrap();
    assert_eq!(decoded.len(), 8 + 7 * 3 + 4);
    assert_eq!(&decoded[..8], b"ABCDEFGH");
}

#[test]
fn truncated_back_reference_is_an_error() {
    assert!(matches!(
        decompress(&[0x00, 0x05]),
        Err(CodecError::TruncatedStream)
    ));
}

#[test]
fn output_budget_is_enforced() {
    assert!(matches!(
        decompress_bounded(&[0xFF, 0x41, 0x42], 1),
        Err(CodecError::OutputOverflow { limit: 1 })
    ));
}

#[test]
fn empty_input_round_trips() {
    let encoded = compress(b"").unwrap();
    assert!(encoded.is_empty());
    assert!(decompress(&encoded).unwrap().is_empty());
}

fn assert_round_trip(input: &[u8]) {
    let encoded = compress(input).unwrap();
    let decoded = decompress(&encoded).unwrap();
    assert!(decoded.len() >= input.len());
    assert!(decoded.len() - input.len() < 8);
    assert_eq!(&decoded[..input.len()], input);
    assert!(decoded[input.len()..].iter().all(|&b| b == 0));
}

#[test]
fn round_trip_repetitive_text() {
    let input: Vec<u8> = b"camera firmware payload block ".repeat(200);
    assert_round_trip(&input);
}

#[test]
fn round_trip_zero_runs() {
    assert_round_trip(&[0u8; 100]);
}

#[test]
fn round_trip_mixed_data() {
    // Deterministic pseudo-random bytes, incompressible on purpose.
    let mut state = 0x2545F4914F6CDD1Du64;
    let mut input: Vec<u8> = (0..4096)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect();
    input.extend_from_slice(&b"section payload ".repeat(64));
    assert_round_trip(&input);
}

#[test]
fn encoding_is_deterministic() {
    let input: Vec<u8> = b"ND1 IPL PTBL ".repeat(100);
    assert_eq!(compress(&input).unwrap(), compress(&input).unwrap());
}
