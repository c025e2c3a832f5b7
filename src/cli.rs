use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate slides for a topic and store the outline artifact.
    Generate(GenerateArgs),
    /// Ask the model for a quick outline (titles and one-line descriptions).
    Outline(OutlineArgs),
    /// Generate slides grounded in a text document.
    FromDocument(FromDocumentArgs),
    /// Parse saved model output into slides (no network).
    Parse(ParseArgs),
    /// Ask the model to rewrite a prompt.
    Improve(ImproveArgs),
    /// Print a rendered prompt template.
    Prompt {
        #[command(subcommand)]
        command: PromptCommand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Summary,
}

#[derive(Debug, Args)]
pub struct TopicArgs {
    /// Presentation topic.
    #[arg(long)]
    pub topic: String,

    /// Number of slides to ask for (1-50).
    #[arg(long)]
    pub slide_count: u32,

    /// Extra description passed to the model.
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub topic: TopicArgs,

    /// Data directory; artifacts go to `<data-dir>/presentations`.
    #[arg(long, default_value = "slidecraft-data")]
    pub data_dir: String,
}

#[derive(Debug, Args)]
pub struct OutlineArgs {
    #[command(flatten)]
    pub topic: TopicArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FromDocumentArgs {
    /// Input document path (`-` for stdin).
    #[arg(long)]
    pub input: String,

    /// Presentation topic.
    #[arg(long)]
    pub topic: String,

    /// Number of slides to ask for (1-50).
    #[arg(long)]
    pub slide_count: u32,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// File containing raw model output (`-` for stdin).
    #[arg(long)]
    pub input: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Drop slides with neither a title nor content.
    #[arg(long)]
    pub valid_only: bool,

    /// Reject input larger than this many bytes.
    #[arg(long, default_value_t = crate::outline::DEFAULT_MAX_INPUT_BYTES)]
    pub max_input_bytes: usize,
}

#[derive(Debug, Args)]
pub struct ImproveArgs {
    /// Prompt to improve.
    #[arg(long)]
    pub prompt: String,

    /// Optional context for the rewrite.
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum PromptCommand {
    Content(TopicArgs),
    Outline(TopicArgs),
    Improve(ImproveArgs),
    Document(PromptDocumentArgs),
}

#[derive(Debug, Args)]
pub struct PromptDocumentArgs {
    /// Input document path (`-` for stdin).
    #[arg(long)]
    pub input: String,

    #[arg(long)]
    pub topic: String,

    #[arg(long)]
    pub slide_count: u32,
}
