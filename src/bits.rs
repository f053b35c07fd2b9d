use std::mem;

pub(crate) type BitBlock = u64;
pub(crate) const BLOCK_SIZE: usize = mem::size_of::<BitBlock>() * 8;

/// Get the bitmask for the i'th bit, e.g.
/// ```text
/// bitmask(0) -> 10000000
/// bitmask(1) -> 01000000
/// bitmask(6) -> 00000010
/// ```
///
/// # Panics
/// If `i` is greater than or equal to `BLOCK_SIZE` in debug mode.
pub(crate) fn bitmask(i: usize) -> BitBlock {
    debug_assert!(i < BLOCK_SIZE);
    1 << (BLOCK_SIZE - 1 - i)
}

/// Get the index of the first (left-most) set bit in the given block, e.g.
/// ```text
/// first_set_index(10000000)
///                 ^0
/// first_set_index(01000000)
///                  ^1
/// first_set_index(00010110)
///                    ^3
/// ```
///
/// # Panics
/// If `block` is zero in debug mode.
pub(crate) fn first_set_index(block: BitBlock) -> usize {
    debug_assert!(block != 0);
    block.leading_zeros() as usize
}

/// Expand a single bit into a block where every bit has that value.
pub(crate) fn broadcast(bit: bool) -> BitBlock {
    if bit {
        !0
    } else {
        0
    }
}

/// For every bit, the parity of that bit and all bits to its left, e.g.
/// ```text
/// prefix_parity(01001000) -> 01110000
/// ```
pub(crate) fn prefix_parity(block: BitBlock) -> BitBlock {
    let mut parity = block;
    let mut shift = 1;
    while shift < BLOCK_SIZE {
        parity ^= parity >> shift;
        shift *= 2;
    }
    parity
}

/// Transpose a `BLOCK_SIZE` x `BLOCK_SIZE` bit matrix stored as one block per row.
///
/// Works by repeatedly swapping the top-right and bottom-left quadrants of
/// ever smaller sub-matrices.
fn transpose_block(block: &mut [BitBlock; BLOCK_SIZE]) {
    let mut j = BLOCK_SIZE / 2;
    let mut m: BitBlock = !0 >> j;
    while j != 0 {
        let mut k = 0;
        while k < BLOCK_SIZE {
            let t = (block[k] ^ (block[k + j] >> j)) & m;
            block[k] ^= t;
            block[k + j] ^= t << j;
            k = (k + j + 1) & !j;
        }
        j >>= 1;
        m ^= m << j;
    }
}

/// A square bit matrix whose side is a whole number of blocks.
///
/// Row `r` is stored contiguously as `blocks` blocks:
/// ```text
/// r0 -> b0 b1 ... b(blocks-1)
/// r1 -> b0 b1 ... b(blocks-1)
/// ...
/// ```
/// Column `c` of a row lives in block `c / BLOCK_SIZE` under `bitmask(c % BLOCK_SIZE)`.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct BitTable {
    blocks: usize,
    data: Vec<BitBlock>,
}
impl BitTable {
    /// Create an all-zero table whose side is at least `min_side` bits.
    pub fn zero(min_side: usize) -> Self {
        let blocks = min_side.div_ceil(BLOCK_SIZE).max(1);
        BitTable {
            blocks,
            data: vec![0; blocks * blocks * BLOCK_SIZE],
        }
    }

    /// Number of blocks in each row.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// The side length in bits.
    pub fn side(&self) -> usize {
        self.blocks * BLOCK_SIZE
    }

    pub fn row(&self, r: usize) -> &[BitBlock] {
        debug_assert!(r < self.side());
        &self.data[r * self.blocks..(r + 1) * self.blocks]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [BitBlock] {
        debug_assert!(r < self.side());
        &mut self.data[r * self.blocks..(r + 1) * self.blocks]
    }

    /// The raw storage, `BLOCK_SIZE * blocks()` blocks per group of 64 rows.
    pub fn data_mut(&mut self) -> &mut [BitBlock] {
        &mut self.data
    }

    pub fn get(&self, r: usize, c: usize) -> bool {
        self.row(r)[c / BLOCK_SIZE] & bitmask(c % BLOCK_SIZE) != 0
    }

    pub fn set(&mut self, r: usize, c: usize, value: bool) {
        let block = &mut self.row_mut(r)[c / BLOCK_SIZE];
        if value {
            *block |= bitmask(c % BLOCK_SIZE);
        } else {
            *block &= !bitmask(c % BLOCK_SIZE);
        }
    }

    /// Copy the table into a bigger one whose side is at least `min_side` bits.
    pub fn grown(&self, min_side: usize) -> Self {
        let mut grown = BitTable::zero(min_side.max(self.side()));
        for r in 0..self.side() {
            grown.row_mut(r)[..self.blocks].copy_from_slice(self.row(r));
        }
        grown
    }

    /// Transpose the table in place, so that `get(r, c)` afterwards returns what `get(c, r)` returned before.
    pub fn transpose(&mut self) {
        for bi in 0..self.blocks {
            let mut diagonal = self.load_block(bi, bi);
            transpose_block(&mut diagonal);
            self.store_block(bi, bi, &diagonal);

            for bj in (bi + 1)..self.blocks {
                let mut upper = self.load_block(bi, bj);
                let mut lower = self.load_block(bj, bi);
                transpose_block(&mut upper);
                transpose_block(&mut lower);
                self.store_block(bi, bj, &lower);
                self.store_block(bj, bi, &upper);
            }
        }
    }

    fn load_block(&self, bi: usize, bj: usize) -> [BitBlock; BLOCK_SIZE] {
        let mut block = [0; BLOCK_SIZE];
        for (k, b) in block.iter_mut().enumerate() {
            *b = self.data[(bi * BLOCK_SIZE + k) * self.blocks + bj];
        }
        block
    }

    fn store_block(&mut self, bi: usize, bj: usize, block: &[BitBlock; BLOCK_SIZE]) {
        for (k, &b) in block.iter().enumerate() {
            self.data[(bi * BLOCK_SIZE + k) * self.blocks + bj] = b;
        }
    }
}

/// Get the i'th bit of a bit-packed vector.
pub(crate) fn get_bit(blocks: &[BitBlock], i: usize) -> bool {
    blocks[i / BLOCK_SIZE] & bitmask(i % BLOCK_SIZE) != 0
}

/// Set the i'th bit of a bit-packed vector to `value`.
pub(crate) fn set_bit(blocks: &mut [BitBlock], i: usize, value: bool) {
    if value {
        blocks[i / BLOCK_SIZE] |= bitmask(i % BLOCK_SIZE);
    } else {
        blocks[i / BLOCK_SIZE] &= !bitmask(i % BLOCK_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    fn random_table(side: usize, seed: u64) -> BitTable {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut table = BitTable::zero(side);
        for r in 0..table.side() {
            for c in 0..table.side() {
                table.set(r, c, rng.random_bool(0.5));
            }
        }
        table
    }

    #[test]
    fn bitmask_is_msb_first() {
        assert_eq!(bitmask(0), 0x8000_0000_0000_0000);
        assert_eq!(bitmask(63), 1);
        assert_eq!(first_set_index(bitmask(0)), 0);
        assert_eq!(first_set_index(bitmask(17) | bitmask(40)), 17);
    }

    #[test]
    fn prefix_parity_counts_bits_to_the_left() {
        assert_eq!(prefix_parity(0), 0);
        assert_eq!(prefix_parity(bitmask(0)), !0);
        assert_eq!(prefix_parity(bitmask(63)), 1);

        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..20 {
            let block: BitBlock = rng.random();
            let parity = prefix_parity(block);
            for i in 0..BLOCK_SIZE {
                let expected = (0..=i).filter(|&j| block & bitmask(j) != 0).count() % 2 == 1;
                assert_eq!(parity & bitmask(i) != 0, expected, "bit {i} of {block:#x}");
            }
        }
    }

    #[test]
    fn single_block_transpose() {
        let original = random_table(64, 1);
        let mut table = original.clone();
        table.transpose();
        for r in 0..64 {
            for c in 0..64 {
                assert_eq!(table.get(r, c), original.get(c, r), "({r}, {c})");
            }
        }
    }

    #[test]
    fn multi_block_transpose() {
        let original = random_table(150, 2);
        assert_eq!(original.side(), 192);
        let mut table = original.clone();
        table.transpose();
        for r in 0..original.side() {
            for c in 0..original.side() {
                assert_eq!(table.get(r, c), original.get(c, r), "({r}, {c})");
            }
        }
        table.transpose();
        assert!(table == original);
    }

    #[test]
    fn grown_keeps_contents() {
        let original = random_table(64, 3);
        let grown = original.grown(65);
        assert_eq!(grown.side(), 128);
        for r in 0..128 {
            for c in 0..128 {
                let expected = r < 64 && c < 64 && original.get(r, c);
                assert_eq!(grown.get(r, c), expected, "({r}, {c})");
            }
        }
    }

    #[test]
    fn bit_vector_access() {
        let mut blocks = vec![0; 2];
        set_bit(&mut blocks, 70, true);
        assert!(get_bit(&blocks, 70));
        assert!(!get_bit(&blocks, 6));
        set_bit(&mut blocks, 70, false);
        assert_eq!(blocks, vec![0, 0]);
    }
}
