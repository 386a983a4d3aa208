//! 测试辅助:显式枚举并排序读集合的全部后缀,给出 eBWT、LCP 与
//! 文档数组的参考实现。仅供各模块的单元测试对拍。

use crate::util::dna::to_code;

/// 每条读补上终止符后的全部后缀,按编码序排序;
/// 后缀整串相同时按读的全局序先后。
fn sorted_suffixes(reads: &[&[u8]], term: u8) -> (Vec<Vec<u8>>, Vec<(usize, usize)>) {
    let fulls: Vec<Vec<u8>> = reads
        .iter()
        .map(|r| {
            let mut f = r.to_vec();
            f.push(term);
            f
        })
        .collect();

    let key = |read: usize, off: usize| -> Vec<u8> {
        fulls[read][off..]
            .iter()
            .map(|&b| to_code(b, term).expect("valid symbol"))
            .collect()
    };

    let mut sufs: Vec<(usize, usize)> = Vec::new();
    for (ri, f) in fulls.iter().enumerate() {
        for off in 0..f.len() {
            sufs.push((ri, off));
        }
    }
    sufs.sort_by(|&(r1, o1), &(r2, o2)| key(r1, o1).cmp(&key(r2, o2)).then(r1.cmp(&r2)));

    (fulls, sufs)
}

/// 读集合(不含终止符)的 eBWT:排好序的后缀各取前一个字符,
/// 读首后缀取本读的终止符。
pub fn naive_ebwt(reads: &[&[u8]], term: u8) -> Vec<u8> {
    let (fulls, sufs) = sorted_suffixes(reads, term);
    sufs.iter()
        .map(|&(r, o)| if o == 0 { term } else { fulls[r][o - 1] })
        .collect()
}

/// 参考 LCP:相邻有序后缀的公共前缀长度(终止符同样参与比较),LCP[0] = 0。
pub fn naive_lcp(reads: &[&[u8]], term: u8) -> Vec<usize> {
    let (fulls, sufs) = sorted_suffixes(reads, term);
    let mut lcp = Vec::with_capacity(sufs.len());
    for (i, &(r, o)) in sufs.iter().enumerate() {
        if i == 0 {
            lcp.push(0);
            continue;
        }
        let (pr, po) = sufs[i - 1];
        let a = &fulls[pr][po..];
        let b = &fulls[r][o..];
        lcp.push(a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count());
    }
    lcp
}

/// 参考文档数组:前 split 条读属于集合 1(记 0),其余属于集合 2(记 1)。
pub fn naive_da(reads: &[&[u8]], split: usize, term: u8) -> Vec<bool> {
    let (_, sufs) = sorted_suffixes(reads, term);
    sufs.iter().map(|&(r, _)| r >= split).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ebwt_of_two_reads() {
        assert_eq!(naive_ebwt(&[b"AC", b"AG"], b'#'), b"CG##AA");
    }

    #[test]
    fn lcp_of_two_reads() {
        assert_eq!(naive_lcp(&[b"AC", b"AG"], b'#'), vec![0, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn da_marks_second_collection() {
        assert_eq!(
            naive_da(&[b"AC", b"GT"], 1, b'#'),
            vec![false, true, false, false, true, true]
        );
    }
}
