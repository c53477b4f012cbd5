//! Command line interface for the mexpr pattern language.
//!
//! This binary parses one pattern expression and matches it against a JSON
//! instruction dump, printing the matched ranges. It can also emit the
//! parsed tree for debugging purposes.

use clap::Parser;
use mexpr_cli::{Args, run};
use mexpr_lang::Pattern;
use mexpr_lang::interner::ToSymbol;
use mexpr_lang::log;
use mexpr_lang::utils::error::report;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if cfg!(debug_assertions) | cfg!(test) {
        colog::default_builder()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        colog::default_builder().init();
    }

    let args = Args::parse();
    let pattern = match Pattern::parse(&args.pattern, Some("<pattern>")) {
        Ok(p) => p,
        Err(errs) => {
            report(&args.pattern, "<pattern>".to_symbol(), &errs);
            return Err("failed to parse the pattern".into());
        }
    };
    run(&args, pattern)
}
