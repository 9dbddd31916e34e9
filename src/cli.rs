use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

/// Default job description of the resume form.
pub const DEFAULT_JOB_DESCRIPTION: &str = "We are looking for a Python developer with experience in Django and Flask frameworks.";

#[derive(Debug, Parser)]
#[command(
    name = "resumerank",
    about = "Rank candidate resumes against a job description"
)]
pub struct Cli {
    /// Override the data directory used by --keep-inputs
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the embedding model ID or local model path
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank resumes from a folder or a set of uploaded files
    Rank(RankArgs),
    /// Extract skills and qualifications from one resume
    Entities(EntitiesArgs),
    /// Start MCP server for AI agent integration
    Mcp(McpArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Rank --

#[derive(Debug, Parser)]
pub struct RankArgs {
    /// Job description text
    #[arg(short = 'j', long, conflicts_with = "job_file")]
    pub job: Option<String>,

    /// Read the job description from a file
    #[arg(long)]
    pub job_file: Option<PathBuf>,

    /// Folder scanned for .docx resumes
    #[arg(short = 'f', long)]
    pub folder: Option<PathBuf>,

    /// Resume files to rank (take precedence over --folder)
    #[arg(short = 'u', long = "upload", num_args = 1..)]
    pub uploads: Vec<PathBuf>,

    /// Number of top candidates to return
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Worker threads for reading and embedding
    #[arg(long)]
    pub workers: Option<usize>,

    /// Resumes per embedding call
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Attach skills and qualifications to each ranked candidate
    #[arg(long)]
    pub entities: bool,

    /// JSON file with custom "skills" and "qualifications" term lists
    #[arg(long)]
    pub gazetteer: Option<PathBuf>,

    /// Keep a copy of the job description and uploads in the data directory
    #[arg(long)]
    pub keep_inputs: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Entities --

#[derive(Debug, Parser)]
pub struct EntitiesArgs {
    /// Resume (.docx) to analyse
    pub file: PathBuf,

    /// JSON file with custom "skills" and "qualifications" term lists
    #[arg(long)]
    pub gazetteer: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- MCP --

#[derive(Debug, Parser)]
pub struct McpArgs {
    /// JSON file with custom "skills" and "qualifications" term lists
    #[arg(long)]
    pub gazetteer: Option<PathBuf>,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "resumerank",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_rank_defaults() {
        let cli = Cli::parse_from(["resumerank", "rank", "-f", "resumes"]);
        match cli.command {
            Command::Rank(args) => {
                assert_eq!(args.folder, Some(PathBuf::from("resumes")));
                assert!(args.uploads.is_empty());
                assert!(args.job.is_none());
                assert!(args.top_k.is_none());
                assert!(!args.json);
                assert!(!args.entities);
                assert!(!args.keep_inputs);
            }
            _ => panic!("expected rank command"),
        }
    }

    #[test]
    fn parse_rank_uploads() {
        let cli = Cli::parse_from([
            "resumerank",
            "rank",
            "--job",
            "Rust engineer",
            "-u",
            "a.docx",
            "b.docx",
            "-n",
            "5",
            "--entities",
        ]);
        match cli.command {
            Command::Rank(args) => {
                assert_eq!(args.job.as_deref(), Some("Rust engineer"));
                assert_eq!(
                    args.uploads,
                    vec![PathBuf::from("a.docx"), PathBuf::from("b.docx")]
                );
                assert_eq!(args.top_k, Some(5));
                assert!(args.entities);
            }
            _ => panic!("expected rank command"),
        }
    }

    #[test]
    fn job_and_job_file_conflict() {
        let result = Cli::try_parse_from([
            "resumerank",
            "rank",
            "--job",
            "x",
            "--job-file",
            "jd.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags() {
        let cli =
            Cli::parse_from(["resumerank", "-vv", "entities", "cv.docx", "--json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Entities(args) => {
                assert_eq!(args.file, PathBuf::from("cv.docx"));
                assert!(args.json);
            }
            _ => panic!("expected entities command"),
        }
    }
}
