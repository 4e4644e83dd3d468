//! Wire format for per-chunk edit deltas.
//!
//! A delta is a flat sequence of records, each `i32 x, i32 y, i32 z`
//! (little-endian local voxel coordinates) followed by [`Voxel::BYTE_SIZE`]
//! bytes of packed voxel state. There is no header and no record count; the
//! stream length is the only framing. A zero-length payload means "no edits
//! on file". Truncated trailing bytes are silently dropped so a partially
//! written save restores every complete record it contains.

use crate::voxel::Voxel;

/// Size of one encoded record: three `i32` coordinates plus the packed voxel.
pub const RECORD_SIZE: usize = 12 + Voxel::BYTE_SIZE;

/// Encodes an iteration of change-log entries into delta bytes.
pub fn encode_changes<'a, I>(changes: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a (i32, i32, i32), &'a Voxel)>,
{
    let iter = changes.into_iter();
    let mut out = Vec::with_capacity(iter.size_hint().0 * RECORD_SIZE);
    for (&(x, y, z), voxel) in iter {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
        out.extend_from_slice(&z.to_le_bytes());
        voxel.pack_into(&mut out);
    }
    out
}

/// Decodes delta bytes into `(local coordinate, voxel)` records.
///
/// Stops at the last complete record; malformed trailing data is ignored.
pub fn decode_changes(bytes: &[u8]) -> Vec<((i32, i32, i32), Voxel)> {
    let mut records = Vec::with_capacity(bytes.len() / RECORD_SIZE);
    for record in bytes.chunks_exact(RECORD_SIZE) {
        let x = i32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let y = i32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        let z = i32::from_le_bytes([record[8], record[9], record[10], record[11]]);
        let mut packed = [0u8; Voxel::BYTE_SIZE];
        packed.copy_from_slice(&record[12..RECORD_SIZE]);
        records.push(((x, y, z), Voxel::unpack(&packed)));
    }
    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_encodes_to_zero_bytes() {
        let changes: Vec<((i32, i32, i32), Voxel)> = Vec::new();
        let bytes = encode_changes(changes.iter().map(|(k, v)| (k, v)));
        assert!(bytes.is_empty());
        assert!(decode_changes(&bytes).is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_records() {
        let changes = vec![
            ((0, 3, 5), Voxel::solid(1, [255, 255, 255, 255])),
            ((15, 0, 15), Voxel::custom(7, 3, [9, 9, 9, 255])),
            ((2, 2, 2), Voxel::EMPTY),
        ];
        let bytes = encode_changes(changes.iter().map(|(k, v)| (k, v)));
        assert_eq!(bytes.len(), changes.len() * RECORD_SIZE);

        let decoded = decode_changes(&bytes);
        assert_eq!(decoded, changes);
    }

    #[test]
    fn test_truncated_tail_is_ignored() {
        let changes = vec![
            ((1, 1, 1), Voxel::solid(2, [0, 0, 0, 255])),
            ((4, 4, 4), Voxel::solid(3, [0, 0, 0, 255])),
        ];
        let mut bytes = encode_changes(changes.iter().map(|(k, v)| (k, v)));

        // Chop the last record short: only the first survives.
        bytes.truncate(RECORD_SIZE + 5);
        let decoded = decode_changes(&bytes);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], changes[0]);
    }

    #[test]
    fn test_garbage_shorter_than_one_record_yields_nothing() {
        let decoded = decode_changes(&[0xFF; RECORD_SIZE - 1]);
        assert!(decoded.is_empty());
    }
}
