use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::index::node::{PNode, PRange, PRank, Range, SaLeaf, SaNode};
use crate::index::rank::{Block4, Block5, RankBlock, BLOCK_LEN};
use crate::util::dna::{from_code, to_code, CODE_A, CODE_C, CODE_G, CODE_N, CODE_T, SIGMA};

const BWT_MAGIC: u64 = 0x4542_5754_5F5F_5253; // "EBWT__RS"
const BWT_VERSION: u32 = 1;

/// 索引元信息(构建来源与时间)。
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IndexMeta {
    pub source_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 基于 BWT 的 DNA 自索引:
/// - 一遍扫描建 C 表与分块 rank 结构,此后只读;
/// - 支持单点 LF、区间 LF 与节点 LF(Weiner 链),TERM 从不作为左扩展符号;
/// - 提供隐式后缀树的叶子/右极大节点枚举,子节点按区间长度升序产出,
///   调用方逆序压栈即可让最小者先出栈,以此压住栈深。
#[derive(Debug, Serialize, Deserialize)]
pub struct DnaBwt<B> {
    pub magic: u64,
    pub version: u32,
    /// 终止符字节
    term: u8,
    /// BWT 长度
    n: usize,
    /// c[s] = 编码小于 s 的符号总数
    c: [usize; SIGMA],
    blocks: Vec<B>,
    meta: IndexMeta,
}

pub type DnaBwt4 = DnaBwt<Block4>;
pub type DnaBwt5 = DnaBwt<Block5>;

impl<B: RankBlock> DnaBwt<B> {
    /// 从 BWT 字节序列构建索引。字节必须属于所选字母表加终止符。
    pub fn build(bwt: &[u8], term: u8) -> Result<Self> {
        let n = bwt.len();
        let mut blocks: Vec<B> = Vec::with_capacity((n + BLOCK_LEN - 1) / BLOCK_LEN);
        let mut running = PRank::default();
        let mut counts = [0usize; SIGMA];
        let mut cur = B::with_counts(running);

        for (i, &b) in bwt.iter().enumerate() {
            if i > 0 && i % BLOCK_LEN == 0 {
                blocks.push(cur);
                cur = B::with_counts(running);
            }
            let code = to_code(b, term)
                .ok_or_else(|| anyhow!("invalid BWT symbol {:#04x} at position {}", b, i))?;
            if code == CODE_N && !B::HAS_N {
                return Err(anyhow!(
                    "symbol 'N' at position {} but the index has no N plane",
                    i
                ));
            }
            cur.set(i % BLOCK_LEN, code);
            match code {
                CODE_A => running.a += 1,
                CODE_C => running.c += 1,
                CODE_G => running.g += 1,
                CODE_N => running.n += 1,
                CODE_T => running.t += 1,
                _ => {}
            }
            counts[code as usize] += 1;
        }
        if n > 0 {
            blocks.push(cur);
        }

        // C 表
        let mut c = [0usize; SIGMA];
        let mut acc = 0usize;
        for (s, slot) in c.iter_mut().enumerate() {
            *slot = acc;
            acc += counts[s];
        }

        Ok(Self {
            magic: BWT_MAGIC,
            version: BWT_VERSION,
            term,
            n,
            c,
            blocks,
            meta: IndexMeta::default(),
        })
    }

    /// 从文件加载 BWT 并构建索引。
    pub fn from_file(path: &str, term: u8) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| anyhow!("cannot read BWT file '{}': {}", path, e))?;
        Self::build(&data, term)
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn terminator(&self) -> u8 {
        self.term
    }

    /// 编码为 code 的符号在 BWT 中的出现次数。
    pub fn symbol_count(&self, code: u8) -> usize {
        let s = code as usize;
        if s + 1 < SIGMA {
            self.c[s + 1] - self.c[s]
        } else {
            self.n - self.c[s]
        }
    }

    fn totals(&self) -> PRank {
        PRank {
            a: self.symbol_count(CODE_A),
            c: self.symbol_count(CODE_C),
            g: self.symbol_count(CODE_G),
            n: self.symbol_count(CODE_N),
            t: self.symbol_count(CODE_T),
        }
    }

    /// BWT 前缀 [0, i) 中各非 TERM 符号的出现次数,i ∈ [0, n]。
    fn prank(&self, i: usize) -> PRank {
        debug_assert!(i <= self.n);
        let b = i / BLOCK_LEN;
        if b == self.blocks.len() {
            // i == n 且 n 为块长整数倍
            return self.totals();
        }
        self.blocks[b].rank(i % BLOCK_LEN)
    }

    /// BWT 第 i 个符号(ASCII)。
    #[inline]
    pub fn at(&self, i: usize) -> u8 {
        debug_assert!(i < self.n);
        from_code(self.blocks[i / BLOCK_LEN].code_at(i % BLOCK_LEN), self.term)
    }

    /// 单点 LF 映射:LF(i) = C[B[i]] + rank(B[i], i)。
    pub fn lf(&self, i: usize) -> usize {
        debug_assert!(i < self.n);
        let code = self.blocks[i / BLOCK_LEN].code_at(i % BLOCK_LEN);
        let r = self.prank(i);
        let rank = match code {
            CODE_A => r.a,
            CODE_C => r.c,
            CODE_G => r.g,
            CODE_N => r.n,
            CODE_T => r.t,
            _ => i - (r.a + r.c + r.g + r.n + r.t),
        };
        self.c[code as usize] + rank
    }

    /// 区间 LF:一次返回所有非 TERM 符号的扩展区间。
    pub fn lf_range(&self, rn: Range) -> PRange {
        let lo = self.prank(rn.0);
        let hi = self.prank(rn.1);
        PRange {
            a: (self.c[CODE_A as usize] + lo.a, self.c[CODE_A as usize] + hi.a),
            c: (self.c[CODE_C as usize] + lo.c, self.c[CODE_C as usize] + hi.c),
            g: (self.c[CODE_G as usize] + lo.g, self.c[CODE_G as usize] + hi.g),
            n: (self.c[CODE_N as usize] + lo.n, self.c[CODE_N as usize] + hi.n),
            t: (self.c[CODE_T as usize] + lo.t, self.c[CODE_T as usize] + hi.t),
        }
    }

    /// 节点 LF:对每个非 TERM 左扩展符号 s,把 W 的各子区间边界逐一
    /// LF 扩展,得到 s·W 的节点;深度加一。
    pub fn lf_node(&self, x: &SaNode) -> PNode {
        let r_term = self.prank(x.first_term);
        let r_a = self.prank(x.first_a);
        let r_c = self.prank(x.first_c);
        let r_g = self.prank(x.first_g);
        let r_n = self.prank(x.first_n);
        let r_t = self.prank(x.first_t);
        let r_last = self.prank(x.last);
        let depth = x.depth + 1;

        let node_for = |base: usize, pick: fn(&PRank) -> usize| SaNode {
            first_term: base + pick(&r_term),
            first_a: base + pick(&r_a),
            first_c: base + pick(&r_c),
            first_g: base + pick(&r_g),
            first_n: base + pick(&r_n),
            first_t: base + pick(&r_t),
            last: base + pick(&r_last),
            depth,
        };

        PNode {
            a: node_for(self.c[CODE_A as usize], |r| r.a),
            c: node_for(self.c[CODE_C as usize], |r| r.c),
            g: node_for(self.c[CODE_G as usize], |r| r.g),
            n: node_for(self.c[CODE_N as usize], |r| r.n),
            t: node_for(self.c[CODE_T as usize], |r| r.t),
        }
    }

    /// 空串的 TERM 扩展对应的叶子:区间 [0, C[A]),深度 1。
    pub fn first_leaf(&self) -> SaLeaf {
        SaLeaf {
            rn: (0, self.c[CODE_A as usize]),
            depth: 1,
        }
    }

    /// 根节点:区间 [0, n),各边界即 C 表,深度 0。
    pub fn root(&self) -> SaNode {
        SaNode {
            first_term: 0,
            first_a: self.c[CODE_A as usize],
            first_c: self.c[CODE_C as usize],
            first_g: self.c[CODE_G as usize],
            first_n: self.c[CODE_N as usize],
            first_t: self.c[CODE_T as usize],
            last: self.n,
            depth: 0,
        }
    }

    /// 叶子的子叶子:LF 扩展后保留长度不小于 min_size 者,
    /// 按区间长度升序写入 out。
    pub fn next_leaves(&self, leaf: &SaLeaf, out: &mut Vec<SaLeaf>, min_size: usize) {
        let ext = self.lf_range(leaf.rn);
        let depth = leaf.depth + 1;
        out.clear();
        for rn in [ext.a, ext.c, ext.g, ext.n, ext.t] {
            if rn.1 - rn.0 >= min_size {
                out.push(SaLeaf { rn, depth });
            }
        }
        out.sort_by_key(|l| l.size());
    }

    /// 节点的左扩展:保留仍右极大(至少两个非空子区间)者,
    /// 按区间长度升序写入 out。
    pub fn next_nodes(&self, node: &SaNode, out: &mut Vec<SaNode>) {
        let ext = self.lf_node(node);
        out.clear();
        for x in [ext.a, ext.c, ext.g, ext.n, ext.t] {
            if x.number_of_children() >= 2 {
                out.push(x);
            }
        }
        out.sort_by_key(|x| x.size());
    }
}

/// 序列化封装:区分 4/5 字母变体。
#[derive(Serialize, Deserialize)]
pub enum AnyDnaBwt {
    Dna4(DnaBwt4),
    Dna5(DnaBwt5),
}

impl AnyDnaBwt {
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = std::fs::File::create(path)
            .map_err(|e| anyhow!("cannot write index file '{}': {}", path, e))?;
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)
            .map_err(|e| anyhow!("cannot open index file '{}': {}", path, e))?;
        let idx: Self = bincode::deserialize_from(std::io::BufReader::new(f))?;
        let (magic, version) = match &idx {
            Self::Dna4(b) => (b.magic, b.version),
            Self::Dna5(b) => (b.magic, b.version),
        };
        if magic != BWT_MAGIC {
            return Err(anyhow!(
                "invalid index file: bad magic number (expected 0x{:016X}, got 0x{:016X})",
                BWT_MAGIC,
                magic
            ));
        }
        if version != BWT_VERSION {
            return Err(anyhow!(
                "unsupported index version: expected {}, got {}",
                BWT_VERSION,
                version
            ));
        }
        Ok(idx)
    }
}

/// 单遍扫描输入文件,判断字母表是否含 'N'。
pub fn has_n(path: &str) -> Result<bool> {
    let f = std::fs::File::open(path)
        .map_err(|e| anyhow!("cannot open BWT file '{}': {}", path, e))?;
    let mut reader = std::io::BufReader::new(f);
    let mut buf = [0u8; 8192];
    loop {
        let k = reader
            .read(&mut buf)
            .map_err(|e| anyhow!("cannot read BWT file '{}': {}", path, e))?;
        if k == 0 {
            return Ok(false);
        }
        if buf[..k].contains(&b'N') {
            return Ok(true);
        }
    }
}
