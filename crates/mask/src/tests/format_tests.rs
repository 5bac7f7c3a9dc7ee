use crate::format::{read_chunk, write_chunk, CHUNK_HEADER_BYTES, MASK_BYTES};
use crate::{Mask, MaskError};
use std::io::Cursor;

fn masks(specs: &[(u16, bool)]) -> Vec<Mask> {
    specs.iter().map(|&(s, a)| Mask::new(s, a)).collect()
}

fn encode_chunks(chunks: &[Vec<Mask>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut scratch = Vec::new();
    for chunk in chunks {
        write_chunk(&mut bytes, chunk, &mut scratch).unwrap();
    }
    bytes
}

// -------------------- Round trip --------------------

#[test]
fn single_chunk_round_trip() {
    let original = masks(&[(0, false), (1, true), (0x7FFF, true)]);
    let bytes = encode_chunks(&[original.clone()]);
    assert_eq!(bytes.len(), CHUNK_HEADER_BYTES + original.len() * MASK_BYTES);

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, original);

    // clean EOF at the next header
    assert!(!read_chunk(&mut r, &mut out).unwrap());
}

#[test]
fn consecutive_chunks_replace_the_loaded_one() {
    let first = masks(&[(1, false), (2, false)]);
    let second = masks(&[(3, true)]);
    let bytes = encode_chunks(&[first.clone(), second.clone()]);

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, first);
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, second);
    assert!(!read_chunk(&mut r, &mut out).unwrap());
}

#[test]
fn scratch_buffer_is_reusable_across_chunks() {
    let mut scratch = Vec::new();
    let mut bytes = Vec::new();
    let big = masks(&[(7, true); 100]);
    let small = masks(&[(1, false)]);
    write_chunk(&mut bytes, &big, &mut scratch).unwrap();
    write_chunk(&mut bytes, &small, &mut scratch).unwrap();

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, big);
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, small);
}

#[test]
fn empty_stream_is_clean_eof() {
    let mut r = Cursor::new(Vec::new());
    let mut out = Vec::new();
    assert!(!read_chunk(&mut r, &mut out).unwrap());
}

// -------------------- Corruption detection --------------------

#[test]
fn crc_mismatch_is_corrupt() {
    let mut bytes = encode_chunks(&[masks(&[(1, false), (2, true)])]);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(matches!(
        read_chunk(&mut r, &mut out),
        Err(MaskError::Corrupt)
    ));
}

#[test]
fn zero_count_is_corrupt() {
    // count = 0, crc = 0
    let bytes = vec![0u8; CHUNK_HEADER_BYTES];
    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(matches!(
        read_chunk(&mut r, &mut out),
        Err(MaskError::Corrupt)
    ));
}

#[test]
fn absurd_count_is_corrupt() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(matches!(
        read_chunk(&mut r, &mut out),
        Err(MaskError::Corrupt)
    ));
}

#[test]
fn truncated_header_is_corrupt() {
    // count says 1 mask, but the crc half of the header is missing
    let bytes = 1u32.to_le_bytes().to_vec();
    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(matches!(
        read_chunk(&mut r, &mut out),
        Err(MaskError::Corrupt)
    ));
}

#[test]
fn truncated_body_is_corrupt() {
    let mut bytes = encode_chunks(&[masks(&[(1, false), (2, true)])]);
    bytes.truncate(bytes.len() - MASK_BYTES);

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(matches!(
        read_chunk(&mut r, &mut out),
        Err(MaskError::Corrupt)
    ));
}

#[test]
fn eof_leaves_previous_chunk_untouched() {
    let chunk = masks(&[(4, false)]);
    let bytes = encode_chunks(&[chunk.clone()]);

    let mut r = Cursor::new(bytes);
    let mut out = Vec::new();
    assert!(read_chunk(&mut r, &mut out).unwrap());
    assert!(!read_chunk(&mut r, &mut out).unwrap());
    assert_eq!(out, chunk);
}
