use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repoheft", about = "Measure aggregate size metrics of a git repository")]
pub struct Cli {
    /// Path to the git repository
    #[arg(default_value = ".")]
    pub repo_path: PathBuf,

    /// Only scan references starting with this prefix (repeatable)
    #[arg(long = "include", value_name = "PREFIX")]
    pub include: Vec<String>,

    /// Skip references starting with this prefix (repeatable, wins over
    /// --include)
    #[arg(long = "exclude", value_name = "PREFIX")]
    pub exclude: Vec<String>,

    /// Print the size of a single object instead of scanning references
    #[arg(long = "rev", value_name = "SPEC")]
    pub rev: Option<String>,

    /// Log scan phases and show progress on stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Whether a reference survives the --include/--exclude flags.
    pub fn keep_reference(&self, refname: &str) -> bool {
        if self.exclude.iter().any(|p| refname.starts_with(p.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| refname.starts_with(p.as_str()))
    }
}
