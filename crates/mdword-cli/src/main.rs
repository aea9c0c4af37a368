//! mdword CLI — generate, convert, extract and revise Word documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use mdword_docx::Converter;
use mdword_llm::{config, templates, LlmClient, LlmConfig};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

#[derive(Parser)]
#[command(
    name = "mdword",
    version,
    about = "Markdown ⇄ Word converter with LLM document generation"
)]
struct Args {
    /// Directory for generated documents and media (default: output,
    /// or MDWORD_OUTPUT_DIR)
    #[arg(short, long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Skip pandoc even when installed; always use native conversion
    #[arg(long, global = true)]
    no_pandoc: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output with extra details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Word document from raw text using an LLM
    Generate {
        /// Input text file (reads stdin when omitted)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,

        /// Prompt template (see `mdword templates`)
        #[arg(short, long, default_value = "default")]
        template: String,

        /// Write only the intermediate Markdown, skip the DOCX
        #[arg(long)]
        markdown_only: bool,
    },

    /// Convert a Markdown file to a Word document
    Convert {
        /// Markdown file to convert
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output document path (default: timestamped name in the
        /// output directory)
        #[arg(short = 'O', long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Extract Markdown from a Word document
    Extract {
        /// Word document to extract
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output Markdown path (default: <input stem>.md in the
        /// output directory)
        #[arg(short = 'O', long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Revise a Markdown document with an LLM instruction
    Revise {
        /// Markdown file to revise
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Revision instruction, e.g. "make the tone more formal"
        #[arg(value_name = "INSTRUCTION")]
        instruction: String,

        /// Write only the revised Markdown, skip the DOCX
        #[arg(long)]
        markdown_only: bool,
    },

    /// List available prompt templates
    Templates,

    /// Check configuration, pandoc availability and API connectivity
    Check,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::output_dir()));

    let mut converter = Converter::new(&output_dir);
    if args.no_pandoc {
        converter = converter.without_pandoc();
    }

    match args.command {
        Commands::Generate {
            input,
            template,
            markdown_only,
        } => cmd_generate(
            &converter,
            &output_dir,
            input.as_deref(),
            &template,
            markdown_only,
            verbosity,
        ),
        Commands::Convert { input, output } => {
            cmd_convert(&converter, &input, output.as_deref(), verbosity)
        }
        Commands::Extract { input, output } => {
            cmd_extract(&converter, &output_dir, &input, output.as_deref(), verbosity)
        }
        Commands::Revise {
            input,
            instruction,
            markdown_only,
        } => cmd_revise(
            &converter,
            &output_dir,
            &input,
            &instruction,
            markdown_only,
            verbosity,
        ),
        Commands::Templates => {
            for name in templates::available_templates() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Check => cmd_check(&converter),
    }
}

fn cmd_generate(
    converter: &Converter,
    output_dir: &Path,
    input: Option<&Path>,
    template: &str,
    markdown_only: bool,
    verbosity: Verbosity,
) -> Result<()> {
    let source = read_input(input)?;
    if source.trim().is_empty() {
        anyhow::bail!("input is empty, nothing to generate from");
    }

    let client = LlmClient::new(LlmConfig::from_env()).context("LLM client setup failed")?;
    if verbosity.should_show_output() {
        println!(
            "{} generating document with {} (template: {template})",
            "::".blue().bold(),
            client.model()
        );
    }

    let markdown = client
        .generate_markdown(&source, Some(template))
        .context("document generation failed")?;

    let md_path = write_markdown(output_dir, "generated_document", &markdown)?;
    if verbosity.should_show_output() {
        println!("{} wrote {}", "ok".green().bold(), md_path.display());
    }

    if !markdown_only {
        let docx_path = converter
            .markdown_to_docx(&markdown, None)
            .context("conversion to DOCX failed")?;
        if verbosity.should_show_output() {
            println!("{} wrote {}", "ok".green().bold(), docx_path.display());
        }
    }
    Ok(())
}

fn cmd_convert(
    converter: &Converter,
    input: &Path,
    output: Option<&Path>,
    verbosity: Verbosity,
) -> Result<()> {
    let markdown = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let path = converter.markdown_to_docx(&markdown, output)?;
    if verbosity.should_show_output() {
        println!("{} wrote {}", "ok".green().bold(), path.display());
    }
    Ok(())
}

fn cmd_extract(
    converter: &Converter,
    output_dir: &Path,
    input: &Path,
    output: Option<&Path>,
    verbosity: Verbosity,
) -> Result<()> {
    let markdown = converter.docx_to_markdown(input)?;

    let target = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "extracted".to_string());
            output_dir.join(format!("{stem}.md"))
        }
    };
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&target, &markdown)
        .with_context(|| format!("failed to write {}", target.display()))?;
    if verbosity.should_show_output() {
        println!("{} wrote {}", "ok".green().bold(), target.display());
    }
    Ok(())
}

fn cmd_revise(
    converter: &Converter,
    output_dir: &Path,
    input: &Path,
    instruction: &str,
    markdown_only: bool,
    verbosity: Verbosity,
) -> Result<()> {
    let original = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let client = LlmClient::new(LlmConfig::from_env()).context("LLM client setup failed")?;
    if verbosity.should_show_output() {
        println!("{} revising with {}", "::".blue().bold(), client.model());
    }
    let revised = client
        .revise_markdown(&original, instruction)
        .context("revision failed")?;

    let md_path = write_markdown(output_dir, "revised_document", &revised)?;
    if verbosity.should_show_output() {
        println!("{} wrote {}", "ok".green().bold(), md_path.display());
    }

    if !markdown_only {
        let docx_path = converter
            .markdown_to_docx(&revised, None)
            .context("conversion to DOCX failed")?;
        if verbosity.should_show_output() {
            println!("{} wrote {}", "ok".green().bold(), docx_path.display());
        }
    }
    Ok(())
}

fn cmd_check(converter: &Converter) -> Result<()> {
    let llm_config = LlmConfig::from_env();
    println!("output directory: {}", converter.output_dir().display());
    println!("model:            {}", llm_config.model);
    println!("endpoint:         {}", llm_config.base_url);

    let key_status = if llm_config.api_key.is_some() {
        "configured".green()
    } else {
        "missing (set DASHSCOPE_API_KEY or OPENAI_API_KEY)".red()
    };
    println!("API key:          {key_status}");

    match LlmClient::new(llm_config) {
        Ok(client) => {
            if client.test_connection() {
                println!("connection:       {}", "ok".green().bold());
            } else {
                println!("connection:       {}", "failed".red().bold());
                anyhow::bail!("LLM endpoint is not reachable");
            }
        }
        Err(e) => {
            println!("connection:       {} ({e})", "skipped".yellow());
        }
    }
    Ok(())
}

/// Read the input file, or stdin when no file is given.
fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Write Markdown to a timestamped file in the output directory.
fn write_markdown(output_dir: &Path, prefix: &str, markdown: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let name = format!(
        "{prefix}_{}.md",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = output_dir.join(name);
    fs::write(&path, markdown).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert!(!Verbosity::Quiet.should_show_output());
        assert!(Verbosity::Normal.should_show_output());
    }

    #[test]
    fn test_write_markdown_names_and_content() {
        let dir = TempDir::new().unwrap();
        let path = write_markdown(dir.path(), "generated_document", "# T").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("generated_document_"));
        assert!(name.ends_with(".md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# T");
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "some notes").unwrap();
        assert_eq!(read_input(Some(&file)).unwrap(), "some notes");
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
