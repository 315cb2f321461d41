use clap::{CommandFactory, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "packagebox", version, about = "Toolbox Package Manager")]
pub struct Args {
    /// Command to execute
    #[arg(value_enum)]
    pub command: Option<Command>,

    /// Package name (required for install and uninstall; `*` installs everything)
    pub package: Option<String>,

    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// List available packages
    List,
    /// Install a package (or `*` for all)
    Install,
    /// Uninstall a package
    Uninstall,
    /// Refresh the package list
    Update,
    /// Show this help
    Help,
    /// Print the path of the cached package list
    Json,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn print_help() {
        let _ = Self::command().print_help();
        println!();
    }
}
