//! Fixed width bit vectors.
//!
//! Bit 0 is the leftmost (most significant) bit, following the numbering used by the DES
//! tables. The width is part of the type, so mixing a 32-bit half with a 48-bit expanded value
//! is rejected at compile time instead of being truncated or padded.

use std::{fmt, ops::BitXor};

use ndarray_rand::rand::Rng;

use crate::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitVector<const N: usize>([bool; N]);

/// A 64-bit ciphertext block.
pub type Ciphertext = BitVector<64>;

impl<const N: usize> BitVector<N> {
    pub fn zeros() -> Self {
        Self([false; N])
    }

    pub fn from_fn<F: FnMut(usize) -> bool>(f: F) -> Self {
        Self(std::array::from_fn(f))
    }

    /// Draws `N` independent uniform bits.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_fn(|_| rng.r#gen())
    }

    /// Builds a vector from the `N` least significant bits of `value`, most significant first.
    ///
    /// # Panics
    /// Panics in debug if `N > 64`.
    pub fn from_u64(value: u64) -> Self {
        debug_assert!(N <= 64);

        Self::from_fn(|i| (value >> (N - 1 - i)) & 1 == 1)
    }

    /// Packs the bits into an integer, bit 0 being the most significant.
    ///
    /// # Panics
    /// Panics in debug if `N > 64`.
    pub fn to_u64(&self) -> u64 {
        debug_assert!(N <= 64);

        self.0
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit))
    }

    pub fn get(&self, index: usize) -> bool {
        self.0[index]
    }

    pub fn bits(&self) -> &[bool; N] {
        &self.0
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&bit| bit).count()
    }

    /// Returns a vector whose bit `i` is `self[table[i]]`.
    ///
    /// # Panics
    /// Panics if an entry of `table` is not smaller than `N`.
    pub fn select<const M: usize>(&self, table: &[u8; M]) -> BitVector<M> {
        BitVector::from_fn(|i| self.0[table[i] as usize])
    }

    /// Returns the `index`-th block of `M` consecutive bits.
    ///
    /// # Panics
    /// Panics if the block does not fit in the vector.
    pub fn block<const M: usize>(&self, index: usize) -> BitVector<M> {
        let start = index * M;
        BitVector::from_fn(|i| self.0[start + i])
    }

    /// Concatenates `M / N` copies of `self`.
    ///
    /// # Panics
    /// Panics if `M` is not a multiple of `N`.
    pub fn repeat<const M: usize>(&self) -> BitVector<M> {
        assert_eq!(M % N, 0);

        BitVector::from_fn(|i| self.0[i % N])
    }
}

impl BitVector<32> {
    /// Joins two 32-bit halves, `self` first.
    pub fn concat(&self, other: &BitVector<32>) -> BitVector<64> {
        BitVector::from_fn(|i| if i < 32 { self.0[i] } else { other.0[i - 32] })
    }
}

impl BitVector<64> {
    /// Encodes the vector as 16 hexadecimal digits.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_u64().to_be_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes)?;

        Ok(Self::from_u64(u64::from_be_bytes(bytes)))
    }
}

impl<const N: usize> Default for BitVector<N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const N: usize> BitXor for BitVector<N> {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self::from_fn(|i| self.0[i] ^ rhs.0[i])
    }
}

impl<const N: usize> fmt::Display for BitVector<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Debug for BitVector<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector<{N}>({self})")
    }
}

impl<const N: usize> std::str::FromStr for BitVector<N> {
    type Err = String;

    /// Parses a string of `0` and `1`. Whitespace is ignored so tables can be grouped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: Vec<bool> = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(format!("invalid bit {c:?}")),
            })
            .collect::<Result<_, _>>()?;

        let bits: [bool; N] = bits
            .try_into()
            .map_err(|v: Vec<bool>| format!("expected {N} bits, got {}", v.len()))?;

        Ok(Self(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::{BitVector, Ciphertext};
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_u64_conversion_is_msb_first() {
        let v = BitVector::<6>::from_u64(0b100101);
        assert_eq!(v.to_string(), "100101");
        assert!(v.get(0));
        assert!(!v.get(1));
        assert_eq!(v.to_u64(), 0b100101);
    }

    #[test]
    fn test_select_block_repeat() {
        let v: BitVector<8> = "1100 1010".parse().unwrap();
        assert_eq!(v.select(&[7, 0, 7]).to_string(), "010");
        assert_eq!(v.block::<4>(1).to_string(), "1010");
        assert_eq!(v.block::<2>(0).repeat::<6>().to_string(), "111111");

        let k: BitVector<6> = "101100".parse().unwrap();
        let expanded: BitVector<48> = k.repeat();
        for i in 0..8 {
            assert_eq!(expanded.block::<6>(i), k);
        }
    }

    #[test]
    fn test_concat_and_xor() {
        let l = BitVector::<32>::from_u64(0xdeadbeef);
        let r = BitVector::<32>::from_u64(0x01234567);
        assert_eq!(l.concat(&r).to_u64(), 0xdeadbeef01234567);
        assert_eq!((l ^ r).to_u64(), 0xdeadbeef ^ 0x01234567);
        assert_eq!((l ^ l), BitVector::zeros());
    }

    #[test]
    fn test_hex() {
        let c = Ciphertext::from_u64(0x0123456789abcdef);
        assert_eq!(c.to_hex(), "0123456789abcdef");
        assert_eq!(Ciphertext::from_hex("0123456789abcdef").unwrap(), c);
        assert!(Ciphertext::from_hex("0123").is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_width() {
        assert!("101".parse::<BitVector<4>>().is_err());
        assert!("10x1".parse::<BitVector<4>>().is_err());
    }

    #[test]
    fn test_random_bits_are_balanced() {
        let mut rng = StdRng::seed_from_u64(0);
        let ones: usize = (0..1000)
            .map(|_| BitVector::<32>::random(&mut rng).count_ones())
            .sum();
        // 32000 fair draws, mean 16000 and standard deviation ~90
        assert!((15500..16500).contains(&ones), "{ones}");
    }
}
