//! DES round primitives.
//!
//! Tables are stored with 0-based indices: output bit `i` of a permutation is input bit
//! `TABLE[i]`. S-boxes are flattened row-major, 4 rows of 16 columns each.

use crate::bits::BitVector;

/// Expansion table E, 32 to 48 bits.
pub const EXPANSION: [u8; 48] = [
    31, 0, 1, 2, 3, 4, //
    3, 4, 5, 6, 7, 8, //
    7, 8, 9, 10, 11, 12, //
    11, 12, 13, 14, 15, 16, //
    15, 16, 17, 18, 19, 20, //
    19, 20, 21, 22, 23, 24, //
    23, 24, 25, 26, 27, 28, //
    27, 28, 29, 30, 31, 0,
];

/// Round function output permutation P.
pub const PERMUTATION: [u8; 32] = [
    15, 6, 19, 20, 28, 11, 27, 16, //
    0, 14, 22, 25, 4, 17, 30, 9, //
    1, 7, 23, 13, 31, 26, 2, 8, //
    18, 12, 29, 5, 21, 10, 3, 24,
];

/// Final permutation, the inverse of the initial permutation.
pub const FINAL_PERMUTATION: [u8; 64] = [
    39, 7, 47, 15, 55, 23, 63, 31, //
    38, 6, 46, 14, 54, 22, 62, 30, //
    37, 5, 45, 13, 53, 21, 61, 29, //
    36, 4, 44, 12, 52, 20, 60, 28, //
    35, 3, 43, 11, 51, 19, 59, 27, //
    34, 2, 42, 10, 50, 18, 58, 26, //
    33, 1, 41, 9, 49, 17, 57, 25, //
    32, 0, 40, 8, 48, 16, 56, 24,
];

pub const SBOXES: [[u8; 64]; 8] = [
    [
        14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7, //
        0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8, //
        4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0, //
        15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13,
    ],
    [
        15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10, //
        3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5, //
        0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15, //
        13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9,
    ],
    [
        10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8, //
        13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1, //
        13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7, //
        1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12,
    ],
    [
        7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15, //
        13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9, //
        10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4, //
        3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14,
    ],
    [
        2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9, //
        14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6, //
        4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14, //
        11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3,
    ],
    [
        12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11, //
        10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8, //
        9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6, //
        4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13,
    ],
    [
        4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1, //
        13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6, //
        1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2, //
        6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12,
    ],
    [
        13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7, //
        1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2, //
        7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8, //
        2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11,
    ],
];

/// Looks up a 6-bit value in S-box `box_index`.
///
/// The middle four bits select the entry within a row and the outer two bits select the row.
///
/// # Panics
/// Panics if `box_index >= 8`.
pub fn sbox(box_index: usize, value: u8) -> u8 {
    debug_assert!(value < 64);

    let column = ((value >> 1) & 0x0f) as usize;
    let row = (((value >> 4) & 0b10) | (value & 1)) as usize;
    SBOXES[box_index][column + row * 16]
}

pub fn expand(r: &BitVector<32>) -> BitVector<48> {
    r.select(&EXPANSION)
}

/// # Panics
/// Panics if `box_index >= 8`.
pub fn substitute(box_index: usize, block: &BitVector<6>) -> BitVector<4> {
    BitVector::from_u64(sbox(box_index, block.to_u64() as u8).into())
}

/// Runs the eight S-boxes over a 48-bit value and concatenates the 4-bit outputs.
pub fn substitute_all(x: &BitVector<48>) -> BitVector<32> {
    let mut out = [BitVector::<4>::zeros(); 8];
    for (i, o) in out.iter_mut().enumerate() {
        *o = substitute(i, &x.block(i));
    }
    BitVector::from_fn(|i| out[i / 4].get(i % 4))
}

pub fn permute(v: &BitVector<32>) -> BitVector<32> {
    v.select(&PERMUTATION)
}

pub fn final_permute(v: &BitVector<64>) -> BitVector<64> {
    v.select(&FINAL_PERMUTATION)
}

/// The DES round function `f(R, K) = P(S(E(R) ^ K))`.
pub fn feistel(r: &BitVector<32>, subkey: &BitVector<48>) -> BitVector<32> {
    permute(&substitute_all(&(expand(r) ^ *subkey)))
}
