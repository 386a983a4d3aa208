//! # ebwt-rust
//!
//! 面向 DNA 读集合 BWT 的索引工具:LCP 归纳与 BWT 合并。
//!
//! 核心是 BWT 自索引上的隐式(广义)后缀树导航:树从不物化,叶子与节点
//! 都是 BWT 区间,"子节点" 由 LF(Weiner 链)扩展得到。本 crate 提供:
//!
//! - **自索引**:从 BWT 构建 C 表与分块 rank 结构,支持单点/区间/节点 LF
//! - **LCP 归纳**:两遍遍历(叶子、右极大节点)写满整个 LCP 数组
//! - **BWT 合并**:同步遍历两个 BWT,产出文档数组(DA)、流式合并 BWT
//!   与可选的 LCP
//!
//! 字母表为 {A,C,G,T} 或 {A,C,G,N,T} 加单字节终止符,按输入自动检测。
//!
//! ## 快速示例
//!
//! ```rust
//! use ebwt_rust::index::bwt::DnaBwt4;
//! use ebwt_rust::lcp::LcpArray;
//!
//! // {"AC#","AG#"} 的 BWT
//! let bwt = DnaBwt4::build(b"CG##AA", b'#').unwrap();
//! let lcp = LcpArray::<u8>::induce(&bwt);
//! assert_eq!(lcp.values(), &[0, 1, 0, 1, 0, 0]);
//! ```
//!
//! ## 模块说明
//!
//! - [`index`] — BWT 自索引(rank 结构、后缀树叶子/节点、LF 映射)
//! - [`lcp`] — LCP 归纳与序列化
//! - [`merge`] — BWT 合并(DA、可选 LCP、流式合并 BWT)
//! - [`util`] — DNA 字母表编码

pub mod index;
pub mod lcp;
pub mod merge;
pub mod util;

#[cfg(test)]
mod testutil;
