//! 由读集合的 BWT 归纳其 LCP 数组。
//!
//! 两遍隐式后缀树遍历:
//! - 第一遍沿叶子(大小 ≥ 2)下行。叶内相邻后缀整串相同(都是 W·TERM),
//!   LCP 即叶深度;
//! - 第二遍沿右极大节点下行。相邻子区间交界处两侧的后缀恰好在节点串 W 之后
//!   分叉,LCP 即节点深度。
//!
//! 两遍合计恰好写满除 LCP[0] 以外的每个位置。遍历框架基于 Belazzougui,
//! "Linear time construction of compressed text indices in compact space"。

use anyhow::{anyhow, Result};
use std::io::Write;

use crate::index::bwt::DnaBwt;
use crate::index::node::SaNode;
use crate::index::rank::RankBlock;

/// LCP 整数宽度(1/2/4/8 字节)。NIL = 全 1,标记尚未写入;
/// 深度超出表示范围时按截断写入,宽度由调用方自行权衡。
pub trait LcpInt: Copy + Eq {
    const NIL: Self;
    const WIDTH: usize;
    fn from_depth(depth: usize) -> Self;
    fn to_u64(self) -> u64;
    fn write_le(self, out: &mut dyn Write) -> std::io::Result<()>;
}

impl LcpInt for u8 {
    const NIL: Self = u8::MAX;
    const WIDTH: usize = 1;
    #[inline]
    fn from_depth(depth: usize) -> Self {
        depth as u8
    }
    #[inline]
    fn to_u64(self) -> u64 {
        self as u64
    }
    #[inline]
    fn write_le(self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }
}

impl LcpInt for u16 {
    const NIL: Self = u16::MAX;
    const WIDTH: usize = 2;
    #[inline]
    fn from_depth(depth: usize) -> Self {
        depth as u16
    }
    #[inline]
    fn to_u64(self) -> u64 {
        self as u64
    }
    #[inline]
    fn write_le(self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }
}

impl LcpInt for u32 {
    const NIL: Self = u32::MAX;
    const WIDTH: usize = 4;
    #[inline]
    fn from_depth(depth: usize) -> Self {
        depth as u32
    }
    #[inline]
    fn to_u64(self) -> u64 {
        self as u64
    }
    #[inline]
    fn write_le(self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }
}

impl LcpInt for u64 {
    const NIL: Self = u64::MAX;
    const WIDTH: usize = 8;
    #[inline]
    fn from_depth(depth: usize) -> Self {
        depth as u64
    }
    #[inline]
    fn to_u64(self) -> u64 {
        self
    }
    #[inline]
    fn write_le(self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }
}

/// 在节点各相邻子区间的交界处写入节点深度。首个子区间左端不是交界;
/// 交界等于 last 时右侧已无后缀,同样跳过。每个位置只允许写一次。
pub(crate) fn write_child_borders<T: LcpInt>(x: &SaNode, lcp: &mut [T], filled: &mut usize) {
    debug_assert!(x.first_a >= x.first_term);
    debug_assert!(x.first_c >= x.first_a);
    debug_assert!(x.first_g >= x.first_c);
    debug_assert!(x.first_n >= x.first_g);
    debug_assert!(x.first_t >= x.first_n);
    debug_assert!(x.number_of_children() >= 2);

    let d = T::from_depth(x.depth);
    if x.has_child_term() && x.first_a != x.last {
        debug_assert!(lcp[x.first_a] == T::NIL);
        lcp[x.first_a] = d;
        *filled += 1;
    }
    if x.has_child_a() && x.first_c != x.last {
        debug_assert!(lcp[x.first_c] == T::NIL);
        lcp[x.first_c] = d;
        *filled += 1;
    }
    if x.has_child_c() && x.first_g != x.last {
        debug_assert!(lcp[x.first_g] == T::NIL);
        lcp[x.first_g] = d;
        *filled += 1;
    }
    if x.has_child_g() && x.first_n != x.last {
        debug_assert!(lcp[x.first_n] == T::NIL);
        lcp[x.first_n] = d;
        *filled += 1;
    }
    if x.has_child_n() && x.first_t != x.last {
        debug_assert!(lcp[x.first_t] == T::NIL);
        lcp[x.first_t] = d;
        *filled += 1;
    }
}

/// 归纳得到的 LCP 数组。
pub struct LcpArray<T> {
    values: Vec<T>,
}

impl<T: LcpInt> LcpArray<T> {
    /// 两遍遍历归纳整个 LCP 数组。
    pub fn induce<B: RankBlock>(bwt: &DnaBwt<B>) -> Self {
        let n = bwt.size();
        let mut values = vec![T::NIL; n];
        if n == 0 {
            return Self { values };
        }
        values[0] = T::from_depth(0);
        let mut filled = 1usize;

        // 第一遍:叶子遍历,填叶内 LCP
        let mut covered = 0usize;
        let mut leaves = 0usize;
        let mut max_stack = 0usize;
        {
            let mut tmp = Vec::with_capacity(5);
            let mut stack = vec![bwt.first_leaf()];
            while let Some(leaf) = stack.pop() {
                leaves += 1;
                debug_assert!(leaf.rn.1 > leaf.rn.0);

                let d = T::from_depth(leaf.depth);
                for i in leaf.rn.0 + 1..leaf.rn.1 {
                    debug_assert!(values[i] == T::NIL);
                    values[i] = d;
                    filled += 1;
                }
                covered += leaf.size();
                debug_assert!(covered <= n);

                bwt.next_leaves(&leaf, &mut tmp, 2);
                for l in tmp.iter().rev() {
                    stack.push(*l);
                }
                max_stack = max_stack.max(stack.len());
            }
        }
        log::debug!(
            "leaf pass: {} leaves of size >= 2, covered {}/{} positions, {}/{} LCP values, peak stack {}",
            leaves, covered, n, filled, n, max_stack
        );

        // 第二遍:右极大节点遍历,填子区间交界 LCP
        let mut nodes = 0usize;
        max_stack = 0;
        {
            let mut tmp = Vec::with_capacity(5);
            let mut stack = vec![bwt.root()];
            while let Some(node) = stack.pop() {
                nodes += 1;
                write_child_borders(&node, &mut values, &mut filled);

                bwt.next_nodes(&node, &mut tmp);
                for x in tmp.iter().rev() {
                    stack.push(*x);
                }
                max_stack = max_stack.max(stack.len());
            }
        }
        log::debug!(
            "node pass: {} nodes, {}/{} LCP values, peak stack {}",
            nodes, filled, n, max_stack
        );
        debug_assert_eq!(filled, n);

        Self { values }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// 以小端定宽整数写出 LCP 文件。
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)
            .map_err(|e| anyhow!("cannot write LCP file '{}': {}", path, e))?;
        let mut out = std::io::BufWriter::new(f);
        for v in &self.values {
            v.write_le(&mut out)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::bwt::{DnaBwt4, DnaBwt5};
    use crate::testutil::{naive_ebwt, naive_lcp};

    #[test]
    fn two_read_collection() {
        // {"AC#","AG#"}:两个终止符后缀整串相同,LCP[1] = 1
        let bwt = DnaBwt4::build(b"CG##AA", b'#').unwrap();
        let lcp = LcpArray::<u8>::induce(&bwt);
        assert_eq!(lcp.values(), &[0, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn matches_naive_reference() {
        let cases: &[&[&[u8]]] = &[
            &[b"AC", b"AG"],
            &[b"ACGT"],
            &[b"ACG", b"ACG"],
            &[b"GATTACA", b"GATTA", b"TACA"],
            &[b"TTTT", b"TTT", b"TT", b"T"],
            &[b"CCCTAAACCCTAAA", b"ACCCTA"],
        ];
        for reads in cases {
            let ebwt = naive_ebwt(reads, b'#');
            let bwt = DnaBwt4::build(&ebwt, b'#').unwrap();
            let lcp = LcpArray::<u64>::induce(&bwt);
            let expected: Vec<u64> = naive_lcp(reads, b'#').iter().map(|&v| v as u64).collect();
            assert_eq!(lcp.values(), expected.as_slice(), "reads: {:?}", reads);
        }
    }

    #[test]
    fn matches_naive_reference_with_n() {
        let cases: &[&[&[u8]]] = &[
            &[b"ANA", b"ANG"],
            &[b"NNN", b"N"],
            &[b"GANNTACA", b"GANT"],
        ];
        for reads in cases {
            let ebwt = naive_ebwt(reads, b'#');
            let bwt = DnaBwt5::build(&ebwt, b'#').unwrap();
            let lcp = LcpArray::<u64>::induce(&bwt);
            let expected: Vec<u64> = naive_lcp(reads, b'#').iter().map(|&v| v as u64).collect();
            assert_eq!(lcp.values(), expected.as_slice(), "reads: {:?}", reads);
        }
    }

    #[test]
    fn every_entry_is_written() {
        let reads: &[&[u8]] = &[b"ACGTACGT", b"ACGTAC", b"TGCATGCA", b"GGGG"];
        let ebwt = naive_ebwt(reads, b'#');
        let bwt = DnaBwt4::build(&ebwt, b'#').unwrap();
        let lcp = LcpArray::<u8>::induce(&bwt);
        assert_eq!(lcp.values().len(), ebwt.len());
        // 最长读 8 个碱基,真实 LCP 远小于 NIL,残留 NIL 必然可见
        for (i, &v) in lcp.values().iter().enumerate() {
            assert_ne!(v, u8::MAX, "LCP[{}] was never written", i);
        }
    }

    #[test]
    fn widths_agree_after_truncation() {
        let reads: &[&[u8]] = &[b"GATTACA", b"GATTACA", b"CAT"];
        let ebwt = naive_ebwt(reads, b'#');
        let bwt = DnaBwt4::build(&ebwt, b'#').unwrap();
        let wide = LcpArray::<u64>::induce(&bwt);
        let narrow8 = LcpArray::<u8>::induce(&bwt);
        let narrow16 = LcpArray::<u16>::induce(&bwt);
        for i in 0..ebwt.len() {
            assert_eq!(narrow8.values()[i], wide.values()[i] as u8);
            assert_eq!(narrow16.values()[i], wide.values()[i] as u16);
        }
    }

    #[test]
    fn custom_terminator_is_equivalent() {
        let reads: &[&[u8]] = &[b"AC", b"AG"];
        let hash = LcpArray::<u8>::induce(&DnaBwt4::build(&naive_ebwt(reads, b'#'), b'#').unwrap());
        let dollar = LcpArray::<u8>::induce(&DnaBwt4::build(&naive_ebwt(reads, b'$'), b'$').unwrap());
        assert_eq!(hash.values(), dollar.values());
    }

    #[test]
    fn empty_bwt_yields_empty_lcp() {
        let bwt = DnaBwt4::build(b"", b'#').unwrap();
        let lcp = LcpArray::<u8>::induce(&bwt);
        assert!(lcp.values().is_empty());
    }

    #[test]
    fn save_writes_little_endian_fixed_width() {
        let bwt = DnaBwt4::build(b"CG##AA", b'#').unwrap();
        let lcp = LcpArray::<u16>::induce(&bwt);
        let tmp = std::env::temp_dir().join("ebwt_rust_test_lcp_save.lcp");
        let path = tmp.to_str().unwrap();
        lcp.save_to_file(path).unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(bytes.len(), 6 * u16::WIDTH);
        assert_eq!(bytes, vec![0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0]);
        std::fs::remove_file(path).ok();
    }
}
