//! Tests for the binary layout
//!
//! These tests verify:
//! - Header and record widths and field offsets
//! - Big-endian encoding of every integer
//! - Slot offset arithmetic (1-based)
//! - Token padding/truncation and content hash parsing

use seqstore::layout::{
    record_offset, required_len, status_offset, FixedRecord, HEADER_LEN,
};
use seqstore::{ContentHash, HashRecord, Header, SequenceRecord, Status, Token};

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_encodes_big_endian() {
    let header = Header::new(0x0102, 0x0A0B0C);

    let bytes = header.encode();

    assert_eq!(bytes.len(), HEADER_LEN);
    assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0x0A, 0x0B, 0x0C]);
}

#[test]
fn test_header_decode_reads_encoded_fields() {
    let bytes = Header::new(42, 17).encode();

    let header = Header::decode(&bytes).unwrap();

    assert_eq!(header.total_records, 42);
    assert_eq!(header.last_updated, 17);
}

#[test]
fn test_header_decode_short_buffer() {
    assert_eq!(Header::decode(&[0u8; HEADER_LEN - 1]), None);
    assert_eq!(Header::decode(&[]), None);
}

// =============================================================================
// Record Width Tests
// =============================================================================

#[test]
fn test_sequence_record_width() {
    assert_eq!(SequenceRecord::LEN, 45);
    assert_eq!(SequenceRecord::STATUS_OFFSET, 8);
}

#[test]
fn test_hash_record_width() {
    assert_eq!(HashRecord::LEN, 61);
    assert_eq!(HashRecord::STATUS_OFFSET, 24);
    assert_eq!(HashRecord::OCCURRENCE_OFFSET, 16);
    assert_eq!(HashRecord::LAST_OCCURRENCE_OFFSET, 20);
}

#[test]
fn test_sequence_record_field_positions() {
    let record = SequenceRecord {
        sequence: 5,
        status: Status::CONFIRMED,
        token: Token::from_text("abc"),
    };

    let bytes = record.encode();

    assert_eq!(bytes.len(), SequenceRecord::LEN);
    assert_eq!(&bytes[0..8], &5u64.to_be_bytes());
    assert_eq!(bytes[SequenceRecord::STATUS_OFFSET], 1);
    assert_eq!(&bytes[9..12], b"abc");
    assert!(bytes[12..].iter().all(|&b| b == 0));
}

#[test]
fn test_hash_record_field_positions() {
    let record = HashRecord {
        hash: ContentHash([0xAB; 16]),
        occurrence_count: 3,
        last_occurrence: 0x01020304,
        status: Status(9),
        token: Token::from_text("t"),
    };

    let bytes = record.encode();

    assert_eq!(bytes.len(), HashRecord::LEN);
    assert_eq!(&bytes[0..16], &[0xAB; 16]);
    assert_eq!(&bytes[16..20], &3u32.to_be_bytes());
    assert_eq!(&bytes[20..24], &[1, 2, 3, 4]);
    assert_eq!(bytes[HashRecord::STATUS_OFFSET], 9);
    assert_eq!(bytes[25], b't');
}

#[test]
fn test_record_decode_reads_encoded_fields() {
    let record = HashRecord {
        hash: ContentHash([7; 16]),
        occurrence_count: 12,
        last_occurrence: 99,
        status: Status::PENDING,
        token: Token::from_text("0f8fad5b-d9cb-469f-a165-70867728950e"),
    };

    let decoded = HashRecord::decode(&record.encode()).unwrap();

    assert_eq!(decoded, record);
}

#[test]
fn test_record_decode_short_buffer() {
    assert!(SequenceRecord::decode(&[0u8; 44]).is_none());
    assert!(HashRecord::decode(&[0u8; 60]).is_none());
}

// =============================================================================
// Offset Tests
// =============================================================================

#[test]
fn test_record_offsets() {
    assert_eq!(record_offset::<SequenceRecord>(1), Some(16));
    assert_eq!(record_offset::<SequenceRecord>(2), Some(16 + 45));
    assert_eq!(record_offset::<SequenceRecord>(3), Some(16 + 90));
    assert_eq!(record_offset::<HashRecord>(2), Some(16 + 61));
}

#[test]
fn test_status_offsets() {
    assert_eq!(status_offset::<SequenceRecord>(1), Some(24));
    assert_eq!(status_offset::<SequenceRecord>(2), Some(16 + 45 + 8));
    assert_eq!(status_offset::<HashRecord>(1), Some(16 + 24));
}

#[test]
fn test_index_zero_has_no_offset() {
    assert_eq!(record_offset::<SequenceRecord>(0), None);
    assert_eq!(status_offset::<HashRecord>(0), None);
}

#[test]
fn test_offset_overflow_is_none() {
    assert_eq!(record_offset::<SequenceRecord>(u64::MAX), None);
    assert_eq!(required_len::<HashRecord>(u64::MAX), None);
}

#[test]
fn test_required_len() {
    assert_eq!(required_len::<SequenceRecord>(0), Some(16));
    assert_eq!(required_len::<SequenceRecord>(4), Some(16 + 4 * 45));
}

// =============================================================================
// Token / Status / Hash Tests
// =============================================================================

#[test]
fn test_token_pads_short_text() {
    let token = Token::from_text("short");

    assert_eq!(token.as_bytes().len(), 36);
    assert_eq!(token.as_str(), "short");
    assert!(token.as_bytes()[5..].iter().all(|&b| b == 0));
}

#[test]
fn test_token_truncates_long_text() {
    let long = "x".repeat(50);

    let token = Token::from_text(&long);

    assert_eq!(token.as_str(), "x".repeat(36));
}

#[test]
fn test_status_display() {
    assert_eq!(Status::PENDING.to_string(), "pending");
    assert_eq!(Status::CONFIRMED.to_string(), "confirmed");
    assert_eq!(Status(5).to_string(), "status(5)");
    assert!(Status::CONFIRMED.is_confirmed());
    assert!(!Status(2).is_confirmed());
}

#[test]
fn test_content_hash_hex() {
    let text = "00112233445566778899aabbccddeeff";

    let hash: ContentHash = text.parse().unwrap();

    assert_eq!(hash.0[0], 0x00);
    assert_eq!(hash.0[15], 0xFF);
    assert_eq!(hash.to_hex(), text);
    assert_eq!(hash.to_string(), text);
}

#[test]
fn test_content_hash_rejects_bad_hex() {
    assert!(ContentHash::from_hex("zz").is_err());
    assert!(ContentHash::from_hex("0011").is_err());
}
