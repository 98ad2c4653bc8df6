// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use clap::Parser;
use hdlcomp::*;

#[derive(Parser, Debug)]
#[command(name = "print_hierarchy")]
#[command(author = "Kevin Laeufer <laeufer@cornell.edu>")]
#[command(version)]
#[command(about = "Parses the design hierarchy printed by GHDL and displays it.", long_about = None)]
struct Args {
    #[arg(value_name = "DUMP", index = 1)]
    filename: String,
    #[arg(long, default_value_t = 2, help = "indentation characters per level")]
    tab_width: usize,
    #[arg(long, default_value_t = 2, help = "trailing lines that are not part of the hierarchy")]
    epilogue: usize,
    #[arg(long, help = "only print statistics")]
    quiet: bool,
}

fn count(tree: &UnitTree, filter: impl Fn(&UnitKind) -> bool) -> usize {
    tree.iter().filter(|u| filter(tree[*u].kind())).count()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.filename).expect("failed to read hierarchy dump");
    let options = ParseOptions {
        tab_width: args.tab_width,
        epilogue_lines: args.epilogue,
    };
    let start = std::time::Instant::now();
    let tree = parse_hierarchy_with_options(&text, &options).expect("failed to parse hierarchy");
    let duration = start.elapsed();

    if !args.quiet {
        print!("{tree}");
    }
    println!("Parsed {} units in {:?}", tree.len() - 1, duration);
    println!(
        "{} instances, {} generates, {} processes, {} ports, {} signals",
        count(&tree, |k| matches!(k, UnitKind::Instance)),
        count(&tree, |k| matches!(k, UnitKind::Generate { .. })),
        count(&tree, |k| matches!(k, UnitKind::Process)),
        count(&tree, |k| matches!(k, UnitKind::Port { .. })),
        count(&tree, |k| matches!(k, UnitKind::Signal)),
    );
    println!("Packages: {}", tree.packages().join(", "));
}
