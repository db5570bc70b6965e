//! # sv-verify — The "Law" of SIEVE
//!
//! Kani proofs for the two facts every scan leans on:
//!
//! - [`TFPos`](sv_core::TFPos) is a total order, so "strict physical log
//!   order" means one thing in both directions.
//! - A frame header describes its own extent exactly. The forward reader's
//!   `post_position` and the backward reader's trailer land on the same
//!   boundary, which is what makes forward and backward scans mirror images.
//!
//! Run with `cargo kani --package sv-verify`.

extern crate sv_core;

#[cfg(kani)]
mod proofs {
    use sv_core::{Direction, RecordHeader, TFPos, HEADER_SIZE, TRAILER_SIZE};

    fn any_position() -> TFPos {
        TFPos::new(kani::any(), kani::any())
    }

    /// Any header `RecordHeader::new` accepts.
    fn any_header() -> RecordHeader {
        let stream_len: u16 = kani::any();
        let type_len: u16 = kani::any();
        let payload_len: u32 = kani::any();
        let header = RecordHeader::new(
            kani::any(),
            kani::any(),
            stream_len as usize,
            type_len as usize,
            payload_len as usize,
            kani::any(),
            kani::any(),
        );
        kani::assume(header.is_ok());
        match header {
            Ok(header) => header,
            Err(_) => unreachable!(),
        }
    }

    /// Sorting three positions yields commit-major, prepare-minor order.
    #[kani::proof]
    fn verify_position_sort_is_lexicographic() {
        let mut positions = [any_position(), any_position(), any_position()];
        positions.sort();

        for i in 0..positions.len() - 1 {
            let (a, b) = (positions[i], positions[i + 1]);
            assert!(
                a.commit_position < b.commit_position
                    || (a.commit_position == b.commit_position
                        && a.prepare_position <= b.prepare_position),
                "positions out of order at index {}",
                i
            );
        }
    }

    #[kani::proof]
    fn verify_position_transitivity() {
        let a = any_position();
        let b = any_position();
        let c = any_position();

        if a <= b && b <= c {
            assert!(a <= c, "transitivity violation in TFPos ordering");
        }
    }

    #[kani::proof]
    fn verify_position_antisymmetry() {
        let a = any_position();
        let b = any_position();

        if a <= b && b <= a {
            assert!(a == b, "antisymmetry violation in TFPos ordering");
        }
    }

    /// No position sorts after `HEAD`.
    #[kani::proof]
    fn verify_head_is_maximal() {
        let p = any_position();
        assert!(p <= TFPos::HEAD);
        assert!(TFPos::ZERO <= p);
    }

    #[kani::proof]
    fn verify_direction_reverse_is_involution() {
        let direction = if kani::any() {
            Direction::Forward
        } else {
            Direction::Backward
        };
        assert!(direction.reverse() != direction);
        assert!(direction.reverse().reverse() == direction);
    }

    /// The trailer ends exactly where the frame does, and the frame ends
    /// exactly at `post_position`.
    #[kani::proof]
    fn verify_frame_extent_is_consistent() {
        let header = any_header();
        let frame_len = header.frame_len as usize;

        assert!(header.stream_range().start == HEADER_SIZE);
        assert!(header.type_range().start == header.stream_range().end);
        assert!(header.payload_range().start == header.type_range().end);
        assert!(header.trailer_range().start == header.payload_range().end);
        assert!(header.trailer_range().end == frame_len);
        assert!(frame_len >= HEADER_SIZE + TRAILER_SIZE);

        if let Some(post) = header.log_position.checked_add(header.frame_len as u64) {
            assert!(header.post_position() == post);
        }
    }

    /// What `encode` writes, `decode` reads back unchanged.
    #[kani::proof]
    fn verify_header_encoding_is_lossless() {
        let header = any_header();
        let bytes = header.encode();
        match RecordHeader::decode(&bytes) {
            Ok(decoded) => assert!(decoded == header),
            Err(_) => panic!("a constructed header failed to decode"),
        }
    }
}

/// The same properties over a fixed sample, for builds without Kani.
#[cfg(test)]
mod tests {
    use sv_core::{RecordHeader, TFPos, HEADER_SIZE, TRAILER_SIZE};

    const EDGES: [u64; 5] = [0, 1, 0x1EAC, u64::MAX - 1, u64::MAX];

    fn sample_positions() -> Vec<TFPos> {
        let mut out = Vec::new();
        for &commit in &EDGES {
            for &prepare in &EDGES {
                out.push(TFPos::new(commit, prepare));
            }
        }
        out
    }

    #[test]
    fn test_position_order_is_total_on_sample() {
        let positions = sample_positions();
        for &a in &positions {
            for &b in &positions {
                assert_eq!(a <= b && b <= a, a == b);
                assert!(a <= b || b <= a);
                for &c in &positions {
                    if a <= b && b <= c {
                        assert!(a <= c);
                    }
                }
            }
            assert!(a <= TFPos::HEAD);
        }
    }

    #[test]
    fn test_sorted_sample_is_commit_major() {
        let mut positions = sample_positions();
        positions.sort();
        for pair in positions.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.commit_position < b.commit_position
                    || (a.commit_position == b.commit_position
                        && a.prepare_position <= b.prepare_position)
            );
        }
    }

    #[test]
    fn test_frame_extent_on_sample() {
        for (stream_len, type_len, payload_len) in
            [(0, 0, 0), (3, 10, 3000), (u16::MAX as usize, u16::MAX as usize, 1)]
        {
            let header =
                RecordHeader::new(0x1EAC, 7, stream_len, type_len, payload_len, 0, 0).unwrap();
            assert_eq!(header.stream_range().start, HEADER_SIZE);
            assert_eq!(header.trailer_range().end, header.frame_len as usize);
            assert_eq!(
                header.frame_len as usize,
                HEADER_SIZE + TRAILER_SIZE + stream_len + type_len + payload_len
            );
            assert_eq!(header.post_position(), 0x1EAC + header.frame_len as u64);
            assert_eq!(RecordHeader::decode(&header.encode()).unwrap(), header);
        }
    }
}
