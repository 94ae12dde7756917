//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Number of clockwise quarter turns `0..=3` such that
    /// `observed == rotate_code_cw(dict_code, n, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and (rotated) dictionary code.
    pub hamming: u8,
}

/// Brute-force matcher over all ids and the four rotations.
///
/// Dictionaries here hold at most a few hundred codes, so precomputing the
/// rotated variants and scanning them is fast and allocation-free per query.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher accepting codes within `max_hamming` bits of an entry.
    ///
    /// `max_hamming` is clamped to the dictionary's correction capability.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64, "marker codes must fit in u64");
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&code| {
                let r1 = rotate_code_cw(code, n, 1);
                let r2 = rotate_code_cw(r1, n, 1);
                let r3 = rotate_code_cw(r2, n, 1);
                [code, r1, r2, r3]
            })
            .collect();

        Self {
            dict,
            max_hamming: max_hamming.min(dict.max_correction_bits),
            rotated,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties keep the lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rotation, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_some_and(|b| b.hamming <= hamming) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rotation as u8,
                    hamming,
                });
                if hamming == 0 {
                    return best;
                }
            }
        }
        best
    }
}

/// Rotate an `n × n` row-major code (`idx = y * n + x`) clockwise by `quarter_turns`.
pub fn rotate_code_cw(code: u64, n: usize, quarter_turns: u8) -> u64 {
    let mut code = code;
    for _ in 0..(quarter_turns & 3) {
        let mut out = 0u64;
        for y in 0..n {
            for x in 0..n {
                // Output row y is input column y read bottom-up.
                let src = (n - 1 - x) * n + y;
                out |= ((code >> src) & 1) << (y * n + x);
            }
        }
        code = out;
    }
    code
}
