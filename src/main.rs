mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use repoheft::model::ObjectSize;
use repoheft::report;
use repoheft::repository::{scan_repository, GixStore, SizeSolver};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = if cli.verbose {
        GixStore::open_verbose(&cli.repo_path)?
    } else {
        GixStore::open(&cli.repo_path)?
    };

    if let Some(spec) = &cli.rev {
        let mut solver = SizeSolver::new(store)?;
        let (header, size) = solver.object_size(spec)?;
        println!("{} {} {}", header.oid, header.kind, header.size);
        match size {
            ObjectSize::Blob(blob) => println!("  size: {}", blob.size),
            ObjectSize::Tree(tree) => {
                println!("  max path depth: {}", tree.max_path_depth);
                println!("  expanded trees: {}", tree.expanded_tree_count);
                println!("  expanded blobs: {}", tree.expanded_blob_count);
                println!("  expanded blob bytes: {}", tree.expanded_blob_size);
                println!("  expanded links: {}", tree.expanded_link_count);
                println!("  expanded submodules: {}", tree.expanded_submodule_count);
            }
            ObjectSize::Commit(commit) => {
                println!("  max ancestor depth: {}", commit.max_ancestor_depth)
            }
            ObjectSize::Tag(tag) => println!("  tag depth: {}", tag.tag_depth),
        }
        return Ok(());
    }

    let history = scan_repository(store, |reference| cli.keep_reference(&reference.refname))?;
    print!("{}", report::render(&history));

    Ok(())
}
