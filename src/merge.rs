//! 合并两个读集合的 BWT:同步遍历两棵隐式后缀树的成对叶子/节点。
//!
//! 第一遍沿成对叶子下行,把两侧区间映射进合并坐标并写文档数组(DA);
//! 若要求 LCP,同时填叶内值,并把组合大小为 1 的叶子留到第二遍。
//! 第二遍(仅计算 LCP 时)沿成对节点下行:find_leaves 补上被跳过的
//! 单元素叶子(只写 DA),再在按分量求和的合并节点上填子区间交界的 LCP。
//!
//! 合并 BWT 不在遍历中物化:保存时按 DA 做一遍线性扫描,0 位取 BWT1 的
//! 下一个符号,1 位取 BWT2 的,两侧各自保持原有顺序。

use anyhow::{anyhow, Result};
use bv::{BitVec, Bits, BitsMut};
use std::io::Write;

use crate::index::bwt::DnaBwt;
use crate::index::node::{children_in_union, merge_nodes, range_length, SaLeaf, SaNode};
use crate::index::rank::RankBlock;
use crate::lcp::{write_child_borders, LcpInt};

#[inline]
fn pair_leaf_size(p: &(SaLeaf, SaLeaf)) -> usize {
    p.0.size() + p.1.size()
}

#[inline]
fn pair_node_size(p: &(SaNode, SaNode)) -> usize {
    p.0.size() + p.1.size()
}

/// 成对叶子的子叶子:两侧各自 LF 扩展,组合大小达到 min_size 者
/// 按组合大小升序写入 out。
fn next_leaf_pairs<B: RankBlock>(
    bwt1: &DnaBwt<B>,
    bwt2: &DnaBwt<B>,
    l1: &SaLeaf,
    l2: &SaLeaf,
    out: &mut Vec<(SaLeaf, SaLeaf)>,
    min_size: usize,
) {
    let e1 = bwt1.lf_range(l1.rn);
    let e2 = bwt2.lf_range(l2.rn);
    let depth = l1.depth + 1;
    out.clear();
    for (r1, r2) in [
        (e1.a, e2.a),
        (e1.c, e2.c),
        (e1.g, e2.g),
        (e1.n, e2.n),
        (e1.t, e2.t),
    ] {
        if range_length(r1) + range_length(r2) >= min_size {
            out.push((SaLeaf { rn: r1, depth }, SaLeaf { rn: r2, depth }));
        }
    }
    out.sort_by_key(pair_leaf_size);
}

/// 成对节点的左扩展:并集仍右极大者按组合区间长度升序写入 out。
fn next_node_pairs<B: RankBlock>(
    bwt1: &DnaBwt<B>,
    bwt2: &DnaBwt<B>,
    n1: &SaNode,
    n2: &SaNode,
    out: &mut Vec<(SaNode, SaNode)>,
) {
    let e1 = bwt1.lf_node(n1);
    let e2 = bwt2.lf_node(n2);
    out.clear();
    for (a, b) in [
        (e1.a, e2.a),
        (e1.c, e2.c),
        (e1.g, e2.g),
        (e1.n, e2.n),
        (e1.t, e2.t),
    ] {
        if children_in_union(&a, &b) >= 2 {
            out.push((a, b));
        }
    }
    out.sort_by_key(pair_node_size);
}

/// 两个 BWT 的合并结果:DA 必建,LCP 可选;合并 BWT 流式写出。
pub struct BwtMerger<'a, B, T> {
    bwt1: &'a DnaBwt<B>,
    bwt2: &'a DnaBwt<B>,
    n: usize,
    da: BitVec,
    lcp: Option<Vec<T>>,
    out_da: bool,
}

impl<'a, B: RankBlock, T: LcpInt> BwtMerger<'a, B, T> {
    /// 同步遍历两个 BWT,构建 DA(与可选的 LCP)。
    pub fn merge(
        bwt1: &'a DnaBwt<B>,
        bwt2: &'a DnaBwt<B>,
        compute_lcp: bool,
        out_da: bool,
    ) -> Self {
        let n = bwt1.size() + bwt2.size();
        let lcp = if compute_lcp {
            let mut v = vec![T::NIL; n];
            if n > 0 {
                v[0] = T::from_depth(0);
            }
            Some(v)
        } else {
            None
        };
        let mut merger = Self {
            bwt1,
            bwt2,
            n,
            da: BitVec::new_fill(false, n as u64),
            lcp,
            out_da,
        };
        merger.run(compute_lcp);
        merger
    }

    fn run(&mut self, compute_lcp: bool) {
        if self.n == 0 {
            return;
        }
        let mut da_values = 0usize;
        let mut lcp_values = 1usize;

        // 第一遍:成对叶子,写 DA(与叶内 LCP)
        let mut leaves = 0usize;
        let mut max_stack = 0usize;
        {
            let mut tmp = Vec::with_capacity(5);
            let mut stack = vec![(self.bwt1.first_leaf(), self.bwt2.first_leaf())];
            // 计算 LCP 时组合大小为 1 的叶子留给第二遍的 find_leaves
            let min_size = if compute_lcp { 2 } else { 1 };
            while let Some((l1, l2)) = stack.pop() {
                leaves += 1;
                debug_assert!(l1.size() + l2.size() > 0);

                self.update_da(&l1, &l2, compute_lcp, &mut lcp_values, &mut da_values);

                next_leaf_pairs(self.bwt1, self.bwt2, &l1, &l2, &mut tmp, min_size);
                for p in tmp.iter().rev() {
                    stack.push(*p);
                }
                max_stack = max_stack.max(stack.len());
            }
        }
        log::debug!(
            "leaf pass: {} leaf pairs, {}/{} DA values, {}/{} LCP values, peak stack {}",
            leaves, da_values, self.n, lcp_values, self.n, max_stack
        );

        // 第二遍:成对节点,补单元素叶子的 DA,填子区间交界的 LCP
        if compute_lcp {
            let mut nodes = 0usize;
            max_stack = 0;
            let mut tmp = Vec::with_capacity(5);
            let mut stack = vec![(self.bwt1.root(), self.bwt2.root())];
            while let Some((n1, n2)) = stack.pop() {
                nodes += 1;
                let merged = merge_nodes(&n1, &n2);

                self.find_leaves(&n1, &n2, &mut da_values);
                if let Some(lcp) = self.lcp.as_mut() {
                    write_child_borders(&merged, lcp, &mut lcp_values);
                }

                next_node_pairs(self.bwt1, self.bwt2, &n1, &n2, &mut tmp);
                for p in tmp.iter().rev() {
                    stack.push(*p);
                }
                max_stack = max_stack.max(stack.len());
            }
            log::debug!(
                "node pass: {} node pairs, {}/{} DA values, {}/{} LCP values, peak stack {}",
                nodes, da_values, self.n, lcp_values, self.n, max_stack
            );
            debug_assert_eq!(lcp_values, self.n);
        }
        debug_assert_eq!(da_values, self.n);
    }

    /// 把成对叶子映射进合并坐标:BWT1 的区间排在 BWT2 之前,
    /// 依次写 DA 的 0 段与 1 段;需要时填叶内 LCP。
    fn update_da(
        &mut self,
        l1: &SaLeaf,
        l2: &SaLeaf,
        with_lcp: bool,
        lcp_values: &mut usize,
        da_values: &mut usize,
    ) {
        let start1 = l1.rn.0 + l2.rn.0;
        let start2 = l2.rn.0 + l1.rn.1;
        let end = l1.rn.1 + l2.rn.1;
        debug_assert!(end > start1);

        for i in start1..start2 {
            self.da.set_bit(i as u64, false);
            *da_values += 1;
        }
        for i in start2..end {
            self.da.set_bit(i as u64, true);
            *da_values += 1;
        }

        debug_assert_eq!(l1.depth, l2.depth);

        if with_lcp {
            if let Some(lcp) = self.lcp.as_mut() {
                let d = T::from_depth(l1.depth);
                for i in start1 + 1..end {
                    debug_assert!(lcp[i] == T::NIL);
                    lcp[i] = d;
                    *lcp_values += 1;
                }
            }
        }

        debug_assert!(*da_values <= self.n);
    }

    /// 补上第一遍因 min_size = 2 跳过的组合大小为 1 的叶子。
    /// 这些叶子只差 DA(符号深度 0,不写 LCP)。
    fn find_leaves(&mut self, x1: &SaNode, x2: &SaNode, da_values: &mut usize) {
        let pairs = [
            (x1.child_term(), x2.child_term()),
            (x1.child_a(), x2.child_a()),
            (x1.child_c(), x2.child_c()),
            (x1.child_g(), x2.child_g()),
            (x1.child_n(), x2.child_n()),
            (x1.child_t(), x2.child_t()),
        ];
        for (r1, r2) in pairs {
            if range_length(r1) + range_length(r2) == 1 {
                let l1 = SaLeaf { rn: r1, depth: 0 };
                let l2 = SaLeaf { rn: r2, depth: 0 };
                let mut dummy = 0usize;
                self.update_da(&l1, &l2, false, &mut dummy, da_values);
            }
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn document_array(&self) -> &BitVec {
        &self.da
    }

    pub fn lcp(&self) -> Option<&[T]> {
        self.lcp.as_deref()
    }

    /// 按 DA 线性扫描流式产出合并 BWT:rank1 记录已消费的 BWT2 符号数,
    /// 0 位取 bwt1[i - rank1],1 位取 bwt2[rank1]。
    pub fn write_merged_bwt(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let mut rank1 = 0usize;
        for i in 0..self.n {
            let c = if self.da.get_bit(i as u64) {
                let c = self.bwt2.at(rank1);
                rank1 += 1;
                c
            } else {
                self.bwt1.at(i - rank1)
            };
            out.write_all(&[c])?;
        }
        Ok(())
    }

    /// 保存 PREFIX.bwt(总是)、PREFIX.da(可选)与 PREFIX.lcp(若已计算)。
    pub fn save_to_file(&self, prefix: &str) -> Result<()> {
        let bwt_path = format!("{}.bwt", prefix);
        {
            let f = std::fs::File::create(&bwt_path)
                .map_err(|e| anyhow!("cannot write merged BWT '{}': {}", bwt_path, e))?;
            let mut out = std::io::BufWriter::new(f);
            self.write_merged_bwt(&mut out)?;
            out.flush()?;
        }

        if self.out_da {
            let da_path = format!("{}.da", prefix);
            let f = std::fs::File::create(&da_path)
                .map_err(|e| anyhow!("cannot write document array '{}': {}", da_path, e))?;
            let mut out = std::io::BufWriter::new(f);
            for i in 0..self.n {
                let c = if self.da.get_bit(i as u64) { b'1' } else { b'0' };
                out.write_all(&[c])?;
            }
            out.flush()?;
        }

        if let Some(lcp) = &self.lcp {
            let lcp_path = format!("{}.lcp", prefix);
            let f = std::fs::File::create(&lcp_path)
                .map_err(|e| anyhow!("cannot write LCP file '{}': {}", lcp_path, e))?;
            let mut out = std::io::BufWriter::new(f);
            for v in lcp {
                v.write_le(&mut out)?;
            }
            out.flush()?;
        }

        Ok(())
    }
}
