//! 隐式后缀树的叶子与右极大节点:全部以 BWT 区间表示,从不物化树本身。

/// BWT 上的左闭右开区间。
pub type Range = (usize, usize);

#[inline]
pub fn range_length(r: Range) -> usize {
    debug_assert!(r.1 >= r.0);
    r.1 - r.0
}

/// 后缀树叶子:某个 W·TERM 的 BWT 区间与深度 |W·TERM|。
///
/// rn.0 等于字典序小于 W·TERM 的后缀个数(即使 W·TERM 不出现也成立);
/// rn.1 再加上 W·TERM 的出现次数。区间为空表示 W·TERM 不出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaLeaf {
    pub rn: Range,
    pub depth: usize,
}

impl SaLeaf {
    #[inline]
    pub fn size(&self) -> usize {
        range_length(self.rn)
    }
}

/// 右极大子串 W(至少有两个不同的右扩展符号)的节点:
/// 以各子区间边界的紧凑串联表示,子区间 [first_x, first_next)。
/// 4 字母变体中 N 子区间恒为空(first_n == first_t),同一结构服务两种字母表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaNode {
    pub first_term: usize,
    pub first_a: usize,
    pub first_c: usize,
    pub first_g: usize,
    pub first_n: usize,
    pub first_t: usize,
    pub last: usize,
    /// depth = |W|
    pub depth: usize,
}

impl SaNode {
    #[inline]
    pub fn size(&self) -> usize {
        self.last - self.first_term
    }

    #[inline]
    pub fn child_term(&self) -> Range {
        (self.first_term, self.first_a)
    }

    #[inline]
    pub fn child_a(&self) -> Range {
        (self.first_a, self.first_c)
    }

    #[inline]
    pub fn child_c(&self) -> Range {
        (self.first_c, self.first_g)
    }

    #[inline]
    pub fn child_g(&self) -> Range {
        (self.first_g, self.first_n)
    }

    #[inline]
    pub fn child_n(&self) -> Range {
        (self.first_n, self.first_t)
    }

    #[inline]
    pub fn child_t(&self) -> Range {
        (self.first_t, self.last)
    }

    #[inline]
    pub fn has_child_term(&self) -> bool {
        self.first_a > self.first_term
    }

    #[inline]
    pub fn has_child_a(&self) -> bool {
        self.first_c > self.first_a
    }

    #[inline]
    pub fn has_child_c(&self) -> bool {
        self.first_g > self.first_c
    }

    #[inline]
    pub fn has_child_g(&self) -> bool {
        self.first_n > self.first_g
    }

    #[inline]
    pub fn has_child_n(&self) -> bool {
        self.first_t > self.first_n
    }

    #[inline]
    pub fn has_child_t(&self) -> bool {
        self.last > self.first_t
    }

    pub fn number_of_children(&self) -> u8 {
        u8::from(self.has_child_term())
            + u8::from(self.has_child_a())
            + u8::from(self.has_child_c())
            + u8::from(self.has_child_g())
            + u8::from(self.has_child_n())
            + u8::from(self.has_child_t())
    }
}

/// 两节点并集的子节点数(各子区间按「任一侧非空」计)。
pub fn children_in_union(a: &SaNode, b: &SaNode) -> u8 {
    u8::from(a.has_child_term() || b.has_child_term())
        + u8::from(a.has_child_a() || b.has_child_a())
        + u8::from(a.has_child_c() || b.has_child_c())
        + u8::from(a.has_child_g() || b.has_child_g())
        + u8::from(a.has_child_n() || b.has_child_n())
        + u8::from(a.has_child_t() || b.has_child_t())
}

/// 按分量求和合并两个同深度节点,得到合并 BWT 中对应的节点。
pub fn merge_nodes(a: &SaNode, b: &SaNode) -> SaNode {
    debug_assert_eq!(a.depth, b.depth);
    SaNode {
        first_term: a.first_term + b.first_term,
        first_a: a.first_a + b.first_a,
        first_c: a.first_c + b.first_c,
        first_g: a.first_g + b.first_g,
        first_n: a.first_n + b.first_n,
        first_t: a.first_t + b.first_t,
        last: a.last + b.last,
        depth: a.depth,
    }
}

/// BWT 前缀中各非 TERM 符号的出现次数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PRank {
    pub a: usize,
    pub c: usize,
    pub g: usize,
    pub n: usize,
    pub t: usize,
}

/// 区间按每个非 TERM 符号做一次 LF 扩展的结果。
#[derive(Debug, Clone, Copy)]
pub struct PRange {
    pub a: Range,
    pub c: Range,
    pub g: Range,
    pub n: Range,
    pub t: Range,
}

/// 节点按每个非 TERM 符号做一次 Weiner 链扩展的结果。
#[derive(Debug, Clone, Copy)]
pub struct PNode {
    pub a: SaNode,
    pub c: SaNode,
    pub g: SaNode,
    pub n: SaNode,
    pub t: SaNode,
}
