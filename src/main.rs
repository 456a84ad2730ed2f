use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use docx_humanize::export::{self, DEFAULT_FILENAME};
use docx_humanize::markup;
use docx_humanize::rewrite::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use docx_humanize::{EndpointConfig, Error, LoadedDocument, PromptMode, Rewriter, Scratchpad, Session};

#[derive(Parser)]
#[command(
    name = "docx-humanize",
    about = "Rewrite DOCX paragraphs through a chat-completion endpoint",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Endpoint {
    /// Bearer token for the completion endpoint
    #[arg(long)]
    api_key: String,
    /// Chat-completion URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Model name sent with each request
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
}

impl Endpoint {
    fn config(&self) -> EndpointConfig {
        EndpointConfig {
            url: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the extracted paragraphs with their style and preview markup
    Inspect {
        /// Input DOCX file
        input: PathBuf,
        /// Print the extraction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write an HTML preview of the extracted paragraphs
    Preview {
        /// Input DOCX file
        input: PathBuf,
        /// Output HTML file (defaults to input with .html extension)
        output: Option<PathBuf>,
    },
    /// Rewrite paragraphs and export the edited document
    Rewrite {
        /// Input DOCX file
        input: PathBuf,
        /// Output DOCX file (defaults to modified_document.docx next to the input)
        output: Option<PathBuf>,
        /// 1-based paragraph to rewrite; repeat for several (default: all)
        #[arg(
            short,
            long = "paragraph",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        paragraphs: Vec<usize>,
        /// AI-probability applied to the selected paragraphs before rewriting
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        probability: Option<u8>,
        /// Pick the rewrite strategy from each paragraph's AI-probability
        #[arg(long)]
        graduated: bool,
        /// Print a download link with a base64 data URI instead of writing a file
        #[arg(long)]
        data_uri: bool,
        #[command(flatten)]
        endpoint: Endpoint,
    },
    /// Rewrite free text read from a file or stdin
    Text {
        /// Text file (reads stdin if omitted)
        input: Option<PathBuf>,
        #[command(flatten)]
        endpoint: Endpoint,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Inspect { input, json } => inspect(&input, json),
        Command::Preview { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("html"));
            preview(&input, &output)
        }
        Command::Rewrite {
            input,
            output,
            paragraphs,
            probability,
            graduated,
            data_uri,
            endpoint,
        } => {
            let mode = if graduated { PromptMode::Graduated } else { PromptMode::Fixed };
            let output = output.unwrap_or_else(|| input.with_file_name(DEFAULT_FILENAME));
            let target = if data_uri { None } else { Some(output.as_path()) };
            rewrite(&input, target, &paragraphs, probability, mode, endpoint.config())
        }
        Command::Text { input, endpoint } => text(input.as_deref(), endpoint.config()),
    }
}

fn inspect(input: &Path, json: bool) -> Result<(), Error> {
    let extraction = LoadedDocument::open(input)?.extract()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
        return Ok(());
    }

    for (i, para) in extraction.paragraphs.iter().enumerate() {
        println!(
            "[{}] {} ({:?}, {} runs)",
            i + 1,
            para.style_name,
            para.alignment,
            para.runs.len()
        );
        let css = markup::paragraph_style(&extraction.paragraphs, i);
        if !css.is_empty() {
            println!("    style: {}", css.trim_end());
        }
        println!("    {}", para.text);
    }
    Ok(())
}

fn preview(input: &Path, output: &Path) -> Result<(), Error> {
    let extraction = LoadedDocument::open(input)?.extract()?;
    let html = markup::render_preview(
        &extraction.paragraphs,
        &extraction.texts(),
        &extraction.ai_probabilities,
    );
    std::fs::write(output, html)?;
    println!("{}", output.display());
    Ok(())
}

fn print_messages(session: &mut Session) {
    for message in session.take_messages() {
        eprintln!("Warning: {message}");
    }
}

fn rewrite(
    input: &Path,
    output: Option<&Path>,
    selected: &[usize],
    probability: Option<u8>,
    mode: PromptMode,
    endpoint: EndpointConfig,
) -> Result<(), Error> {
    let mut session = Session::new();
    session.set_endpoint(endpoint);
    session.upload(&std::fs::read(input)?)?;

    let indices: Vec<usize> = if selected.is_empty() {
        (0..session.len()).collect()
    } else {
        selected.iter().map(|n| n - 1).collect()
    };

    if let Some(probability) = probability {
        for &index in &indices {
            session.set_probability(index, probability)?;
        }
    }

    let rewriter = session.rewriter()?;
    let mut rewritten = 0;
    for &index in &indices {
        eprintln!("Rewriting paragraph {}/{}", index + 1, session.len());
        if session.rewrite_paragraph(&rewriter, index, mode)? {
            rewritten += 1;
        }
    }
    print_messages(&mut session);

    let bytes = session.export()?;
    match output {
        Some(path) => {
            std::fs::write(path, &bytes)?;
            eprintln!(
                "Rewrote {rewritten} of {} paragraphs into {}",
                indices.len(),
                path.display()
            );
        }
        None => println!("{}", export::download_link(&bytes, DEFAULT_FILENAME)),
    }
    Ok(())
}

fn text(input: Option<&Path>, endpoint: EndpointConfig) -> Result<(), Error> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut pad = Scratchpad::new(content);
    eprintln!("{}/{} characters", pad.char_count(), docx_humanize::session::SCRATCHPAD_LIMIT);
    if pad.over_limit() {
        eprintln!("Warning: input is longer than the recommended limit");
    }

    let rewriter = Rewriter::new(endpoint);
    match pad.generate(&rewriter).map(str::to_string) {
        Ok(output) => println!("{output}"),
        Err(e @ (Error::MissingApiKey | Error::EmptyInput)) => return Err(e),
        Err(e) => {
            eprintln!("Warning: text kept unchanged: {e}");
            println!("{}", pad.output());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let base = ["docx-humanize", "rewrite", "in.docx", "--api-key", "k"];
        Cli::try_parse_from(base.iter().chain(args).copied())
    }

    #[test]
    fn paragraph_numbers_start_at_one() {
        assert!(parse(&["--paragraph", "0"]).is_err());

        let cli = parse(&["-p", "1", "-p", "3"]).unwrap();
        match cli.command {
            Command::Rewrite { paragraphs, .. } => assert_eq!(paragraphs, vec![1, 3]),
            _ => panic!("expected the rewrite subcommand"),
        }
    }
}
