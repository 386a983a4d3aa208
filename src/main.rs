use anyhow::Result;
use clap::{Parser, Subcommand};

use ebwt_rust::index::bwt::{has_n, AnyDnaBwt, DnaBwt, DnaBwt4, DnaBwt5, IndexMeta};
use ebwt_rust::index::rank::{Block4, Block5, RankBlock};
use ebwt_rust::lcp::LcpArray;
use ebwt_rust::merge::BwtMerger;
use ebwt_rust::util::dna;

#[derive(Parser, Debug)]
#[command(
    name = "ebwt-rust",
    author,
    version,
    about = "BWT-based indexing toolkit for DNA read collections",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Induce the LCP array of a read collection from its BWT
    Lcp {
        /// Input BWT file
        #[arg(short = 'i', long = "input")]
        input: String,
        /// Output LCP file
        #[arg(short = 'o', long = "output")]
        output: String,
        /// Bytes per LCP value (1, 2, 4 or 8)
        #[arg(short = 'l', long = "lcp-bytes", default_value_t = 1)]
        lcp_bytes: u8,
        /// ASCII code of the terminator; cannot be the code of A/C/G/T/N
        #[arg(short = 't', long = "terminator", default_value_t = dna::DEFAULT_TERM)]
        terminator: u8,
    },
    /// Merge the BWTs of two read collections
    Merge {
        /// Input BWT 1
        #[arg(short = '1', long = "first")]
        first: String,
        /// Input BWT 2
        #[arg(short = '2', long = "second")]
        second: String,
        /// Output prefix; produces PREFIX.bwt, PREFIX.da (-d), PREFIX.lcp (-l > 0)
        #[arg(short = 'o', long = "output")]
        output: String,
        /// Bytes per LCP value (1, 2, 4 or 8); 0 skips the LCP (faster)
        #[arg(short = 'l', long = "lcp-bytes", default_value_t = 0)]
        lcp_bytes: u8,
        /// Write the document array as an ASCII file of '0'/'1'
        #[arg(short = 'd', long = "document-array")]
        document_array: bool,
        /// ASCII code of the terminator; cannot be the code of A/C/G/T/N
        #[arg(short = 't', long = "terminator", default_value_t = dna::DEFAULT_TERM)]
        terminator: u8,
    },
    /// Build the BWT self-index and store it to disk
    Index {
        /// Input BWT file
        #[arg(short = 'i', long = "input")]
        input: String,
        /// Output index file
        #[arg(short = 'o', long = "output")]
        output: String,
        /// ASCII code of the terminator; cannot be the code of A/C/G/T/N
        #[arg(short = 't', long = "terminator", default_value_t = dna::DEFAULT_TERM)]
        terminator: u8,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Lcp { input, output, lcp_bytes, terminator } => {
            run_lcp(&input, &output, lcp_bytes, terminator)
        }
        Commands::Merge { first, second, output, lcp_bytes, document_array, terminator } => {
            run_merge(&first, &second, &output, lcp_bytes, document_array, terminator)
        }
        Commands::Index { input, output, terminator } => run_index(&input, &output, terminator),
    }
}

fn check_terminator(terminator: u8) -> Result<()> {
    if !dna::is_valid_terminator(terminator) {
        anyhow::bail!(
            "invalid terminator {} ('{}'): cannot be the code of A/C/G/T/N",
            terminator,
            terminator as char
        );
    }
    Ok(())
}

fn run_lcp(input: &str, output: &str, lcp_bytes: u8, terminator: u8) -> Result<()> {
    check_terminator(terminator)?;
    if !matches!(lcp_bytes, 1 | 2 | 4 | 8) {
        anyhow::bail!("invalid LCP width {}: must be 1, 2, 4 or 8 bytes", lcp_bytes);
    }

    println!("input BWT: {}", input);
    println!("output LCP: {}", output);

    if has_n(input)? {
        println!("alphabet: A,C,G,N,T,'{}'", terminator as char);
        run_lcp_typed::<Block5>(input, output, lcp_bytes, terminator)
    } else {
        println!("alphabet: A,C,G,T,'{}'", terminator as char);
        run_lcp_typed::<Block4>(input, output, lcp_bytes, terminator)
    }
}

fn run_lcp_typed<B: RankBlock>(
    input: &str,
    output: &str,
    lcp_bytes: u8,
    terminator: u8,
) -> Result<()> {
    let bwt = DnaBwt::<B>::from_file(input, terminator)?;
    println!("BWT size: {}", bwt.size());

    match lcp_bytes {
        1 => LcpArray::<u8>::induce(&bwt).save_to_file(output)?,
        2 => LcpArray::<u16>::induce(&bwt).save_to_file(output)?,
        4 => LcpArray::<u32>::induce(&bwt).save_to_file(output)?,
        _ => LcpArray::<u64>::induce(&bwt).save_to_file(output)?,
    }

    println!("LCP saved: {}", output);
    Ok(())
}

fn run_merge(
    first: &str,
    second: &str,
    output: &str,
    lcp_bytes: u8,
    document_array: bool,
    terminator: u8,
) -> Result<()> {
    check_terminator(terminator)?;
    if !matches!(lcp_bytes, 0 | 1 | 2 | 4 | 8) {
        anyhow::bail!("invalid LCP width {}: must be 0, 1, 2, 4 or 8 bytes", lcp_bytes);
    }

    println!("input BWT 1: {}", first);
    println!("input BWT 2: {}", second);
    println!("output prefix: {}", output);

    if has_n(first)? || has_n(second)? {
        println!("alphabet: A,C,G,N,T,'{}'", terminator as char);
        run_merge_typed::<Block5>(first, second, output, lcp_bytes, document_array, terminator)
    } else {
        println!("alphabet: A,C,G,T,'{}'", terminator as char);
        run_merge_typed::<Block4>(first, second, output, lcp_bytes, document_array, terminator)
    }
}

fn run_merge_typed<B: RankBlock>(
    first: &str,
    second: &str,
    prefix: &str,
    lcp_bytes: u8,
    document_array: bool,
    terminator: u8,
) -> Result<()> {
    let bwt1 = DnaBwt::<B>::from_file(first, terminator)?;
    let bwt2 = DnaBwt::<B>::from_file(second, terminator)?;
    println!("BWT sizes: {} and {}", bwt1.size(), bwt2.size());

    match lcp_bytes {
        0 => BwtMerger::<B, u8>::merge(&bwt1, &bwt2, false, document_array).save_to_file(prefix)?,
        1 => BwtMerger::<B, u8>::merge(&bwt1, &bwt2, true, document_array).save_to_file(prefix)?,
        2 => BwtMerger::<B, u16>::merge(&bwt1, &bwt2, true, document_array).save_to_file(prefix)?,
        4 => BwtMerger::<B, u32>::merge(&bwt1, &bwt2, true, document_array).save_to_file(prefix)?,
        _ => BwtMerger::<B, u64>::merge(&bwt1, &bwt2, true, document_array).save_to_file(prefix)?,
    }

    println!("merged BWT saved: {}.bwt", prefix);
    if document_array {
        println!("document array saved: {}.da", prefix);
    }
    if lcp_bytes > 0 {
        println!("LCP saved: {}.lcp", prefix);
    }
    Ok(())
}

fn run_index(input: &str, output: &str, terminator: u8) -> Result<()> {
    check_terminator(terminator)?;
    println!("input BWT: {}", input);

    let meta = IndexMeta {
        source_file: Some(input.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    };

    let index = if has_n(input)? {
        println!("alphabet: A,C,G,N,T,'{}'", terminator as char);
        let mut bwt = DnaBwt5::from_file(input, terminator)?;
        bwt.set_meta(meta);
        println!("BWT size: {}", bwt.size());
        println!("reads: {}", bwt.symbol_count(dna::CODE_TERM));
        AnyDnaBwt::Dna5(bwt)
    } else {
        println!("alphabet: A,C,G,T,'{}'", terminator as char);
        let mut bwt = DnaBwt4::from_file(input, terminator)?;
        bwt.set_meta(meta);
        println!("BWT size: {}", bwt.size());
        println!("reads: {}", bwt.symbol_count(dna::CODE_TERM));
        AnyDnaBwt::Dna4(bwt)
    };

    index.save_to_file(output)?;
    println!("index saved: {}", output);
    Ok(())
}
