//! 分块 rank 结构:BWT 按 128 个符号一块,块首缓存各符号在块前缀中的累计
//! 计数,块内用每符号一张 128 位出现位图,rank 查询即「累计计数 + popcount」。
//! TERM 不设位面:全零列即终止符。4 字母变体每块 4 个位面,5 字母变体 5 个。

use serde::{Deserialize, Serialize};

use crate::index::node::PRank;
use crate::util::dna::{CODE_A, CODE_C, CODE_G, CODE_N, CODE_T};

/// 每块覆盖的符号数。
pub const BLOCK_LEN: usize = 128;

/// rank 块:持有块前缀的累计计数与块内各符号的出现位图。
pub trait RankBlock: Clone + Default {
    /// 位面是否包含 'N'。
    const HAS_N: bool;

    /// 以块首之前的累计计数初始化空块。
    fn with_counts(counts: PRank) -> Self;

    /// 在块内偏移处登记一个符号(TERM 不占位面)。
    fn set(&mut self, off: usize, code: u8);

    /// 块内偏移处的符号编码;全零列即 TERM。
    fn code_at(&self, off: usize) -> u8;

    /// 全局 rank:块前缀累计计数加上块内 [0, off) 的 popcount。
    fn rank(&self, off: usize) -> PRank;
}

#[inline]
fn bit_set(words: &mut [u64; 2], off: usize) {
    words[off / 64] |= 1u64 << (off % 64);
}

#[inline]
fn bit_get(words: &[u64; 2], off: usize) -> bool {
    (words[off / 64] >> (off % 64)) & 1 == 1
}

/// 位图中 [0, off) 内置位的个数,off ∈ [0, 128]。
#[inline]
fn count_below(words: &[u64; 2], off: usize) -> usize {
    debug_assert!(off <= BLOCK_LEN);
    let full = off / 64;
    let rem = off % 64;
    let mut total = 0usize;
    for w in &words[..full] {
        total += w.count_ones() as usize;
    }
    if rem > 0 {
        total += (words[full] & ((1u64 << rem) - 1)).count_ones() as usize;
    }
    total
}

/// {A,C,G,T,TERM} 字母表的 rank 块,位面序 A,C,G,T。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Block4 {
    counts: [usize; 4],
    planes: [[u64; 2]; 4],
}

impl Block4 {
    const PLANE_CODES: [u8; 4] = [CODE_A, CODE_C, CODE_G, CODE_T];

    #[inline]
    fn plane_of(code: u8) -> usize {
        match code {
            CODE_A => 0,
            CODE_C => 1,
            CODE_G => 2,
            CODE_T => 3,
            _ => unreachable!(),
        }
    }
}

impl RankBlock for Block4 {
    const HAS_N: bool = false;

    fn with_counts(counts: PRank) -> Self {
        Self {
            counts: [counts.a, counts.c, counts.g, counts.t],
            planes: [[0; 2]; 4],
        }
    }

    #[inline]
    fn set(&mut self, off: usize, code: u8) {
        if code != 0 {
            bit_set(&mut self.planes[Self::plane_of(code)], off);
        }
    }

    #[inline]
    fn code_at(&self, off: usize) -> u8 {
        for (p, words) in self.planes.iter().enumerate() {
            if bit_get(words, off) {
                return Self::PLANE_CODES[p];
            }
        }
        0
    }

    #[inline]
    fn rank(&self, off: usize) -> PRank {
        PRank {
            a: self.counts[0] + count_below(&self.planes[0], off),
            c: self.counts[1] + count_below(&self.planes[1], off),
            g: self.counts[2] + count_below(&self.planes[2], off),
            n: 0,
            t: self.counts[3] + count_below(&self.planes[3], off),
        }
    }
}

/// {A,C,G,N,T,TERM} 字母表的 rank 块,位面序 A,C,G,N,T。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Block5 {
    counts: [usize; 5],
    planes: [[u64; 2]; 5],
}

impl Block5 {
    const PLANE_CODES: [u8; 5] = [CODE_A, CODE_C, CODE_G, CODE_N, CODE_T];
}

impl RankBlock for Block5 {
    const HAS_N: bool = true;

    fn with_counts(counts: PRank) -> Self {
        Self {
            counts: [counts.a, counts.c, counts.g, counts.n, counts.t],
            planes: [[0; 2]; 5],
        }
    }

    #[inline]
    fn set(&mut self, off: usize, code: u8) {
        if code != 0 {
            // 编码 1..=5 依次对应位面 0..=4
            bit_set(&mut self.planes[code as usize - 1], off);
        }
    }

    #[inline]
    fn code_at(&self, off: usize) -> u8 {
        for (p, words) in self.planes.iter().enumerate() {
            if bit_get(words, off) {
                return Self::PLANE_CODES[p];
            }
        }
        0
    }

    #[inline]
    fn rank(&self, off: usize) -> PRank {
        PRank {
            a: self.counts[0] + count_below(&self.planes[0], off),
            c: self.counts[1] + count_below(&self.planes[1], off),
            g: self.counts[2] + count_below(&self.planes[2], off),
            n: self.counts[3] + count_below(&self.planes[3], off),
            t: self.counts[4] + count_below(&self.planes[4], off),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::dna::to_code;

    fn fill<B: RankBlock>(symbols: &[u8]) -> B {
        let mut block = B::with_counts(PRank::default());
        for (i, &b) in symbols.iter().enumerate() {
            block.set(i, to_code(b, b'#').unwrap());
        }
        block
    }

    fn naive_rank(symbols: &[u8], sym: u8, off: usize) -> usize {
        symbols[..off].iter().filter(|&&b| b == sym).count()
    }

    // 跨 64 位字边界的确定性符号串
    fn sample_symbols(len: usize, with_n: bool) -> Vec<u8> {
        let bases: &[u8] = if with_n { b"ACGNT#" } else { b"ACGT#" };
        let mut x: u32 = 42;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                bases[(x >> 16) as usize % bases.len()]
            })
            .collect()
    }

    #[test]
    fn block4_rank_matches_naive_counting() {
        let symbols = sample_symbols(BLOCK_LEN, false);
        let block: Block4 = fill(&symbols);
        for off in 0..=BLOCK_LEN {
            let r = block.rank(off);
            assert_eq!(r.a, naive_rank(&symbols, b'A', off), "A at off={}", off);
            assert_eq!(r.c, naive_rank(&symbols, b'C', off), "C at off={}", off);
            assert_eq!(r.g, naive_rank(&symbols, b'G', off), "G at off={}", off);
            assert_eq!(r.n, 0);
            assert_eq!(r.t, naive_rank(&symbols, b'T', off), "T at off={}", off);
        }
    }

    #[test]
    fn block5_rank_matches_naive_counting() {
        let symbols = sample_symbols(BLOCK_LEN, true);
        let block: Block5 = fill(&symbols);
        for off in 0..=BLOCK_LEN {
            let r = block.rank(off);
            assert_eq!(r.a, naive_rank(&symbols, b'A', off));
            assert_eq!(r.c, naive_rank(&symbols, b'C', off));
            assert_eq!(r.g, naive_rank(&symbols, b'G', off));
            assert_eq!(r.n, naive_rank(&symbols, b'N', off));
            assert_eq!(r.t, naive_rank(&symbols, b'T', off));
        }
    }

    #[test]
    fn code_at_recovers_symbols() {
        let symbols = sample_symbols(BLOCK_LEN, true);
        let block: Block5 = fill(&symbols);
        for (i, &b) in symbols.iter().enumerate() {
            assert_eq!(block.code_at(i), to_code(b, b'#').unwrap(), "at off={}", i);
        }
    }

    #[test]
    fn rank_adds_prefix_counts() {
        let base = PRank { a: 10, c: 20, g: 30, n: 40, t: 50 };
        let mut block = Block5::with_counts(base);
        block.set(0, to_code(b'G', b'#').unwrap());
        let r = block.rank(1);
        assert_eq!(r.a, 10);
        assert_eq!(r.c, 20);
        assert_eq!(r.g, 31);
        assert_eq!(r.n, 40);
        assert_eq!(r.t, 50);
    }

    #[test]
    fn count_below_handles_word_boundaries() {
        let mut words = [0u64; 2];
        bit_set(&mut words, 0);
        bit_set(&mut words, 63);
        bit_set(&mut words, 64);
        bit_set(&mut words, 127);
        assert_eq!(count_below(&words, 0), 0);
        assert_eq!(count_below(&words, 1), 1);
        assert_eq!(count_below(&words, 63), 1);
        assert_eq!(count_below(&words, 64), 2);
        assert_eq!(count_below(&words, 65), 3);
        assert_eq!(count_below(&words, 127), 3);
        assert_eq!(count_below(&words, 128), 4);
    }
}
