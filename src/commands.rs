use std::io::Read as _;
use std::sync::Arc;

use anyhow::Context as _;

use crate::app::artifact_store::{JsonOutlineBuilder, LocalFsArtifactStore};
use crate::app::model::GenerationRequest;
use crate::app::pipeline::GenerationPipeline;
use crate::app::status_store::InMemoryStatusStore;
use crate::cli::{
    FromDocumentArgs, GenerateArgs, ImproveArgs, OutlineArgs, OutputFormat, ParseArgs,
    PromptCommand, TopicArgs,
};
use crate::formats::SlideOutline;
use crate::gemini::GeminiClient;
use crate::outline::{self, OutlineParser};
use crate::prompt;

/// Pipeline backed by the Gemini API (configured from the environment) and
/// local storage under `data_dir`.
pub fn pipeline_from_env(data_dir: &str) -> anyhow::Result<GenerationPipeline> {
    let gateway = GeminiClient::from_env().context("configure model gateway")?;
    let status_store = InMemoryStatusStore::from_env().context("configure status store")?;
    Ok(GenerationPipeline::new(
        Arc::new(gateway),
        Arc::new(status_store),
        Arc::new(JsonOutlineBuilder::default()),
        Arc::new(LocalFsArtifactStore::new(data_dir)),
    ))
}

pub async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let pipeline = pipeline_from_env(&args.data_dir)?;
    let artifact = pipeline.generate(&request_from(args.topic)).await?;
    tracing::info!(id = %artifact.id, "stored artifact");
    println!("{}", artifact.path.display());
    Ok(())
}

pub async fn outline(args: OutlineArgs) -> anyhow::Result<()> {
    let pipeline = pipeline_from_env("slidecraft-data")?;
    let slides = pipeline.preview_outline(&request_from(args.topic)).await?;
    print_slides(&slides, args.format)
}

pub async fn from_document(args: FromDocumentArgs) -> anyhow::Result<()> {
    let document = read_input(&args.input)?;
    let pipeline = pipeline_from_env("slidecraft-data")?;
    let slides = pipeline
        .generate_from_document(&document, &args.topic, args.slide_count)
        .await?;
    print_slides(&slides, args.format)
}

pub fn parse(args: ParseArgs) -> anyhow::Result<()> {
    let raw = read_input(&args.input)?;
    let parser = OutlineParser::with_max_input_bytes(args.max_input_bytes);
    let mut slides = parser.parse(&raw).context("parse model output")?;
    if args.valid_only {
        slides.retain(outline::is_valid);
    }
    print_slides(&slides, args.format)
}

pub async fn improve(args: ImproveArgs) -> anyhow::Result<()> {
    let pipeline = pipeline_from_env("slidecraft-data")?;
    let improved = pipeline
        .improve_prompt(&args.prompt, args.context.as_deref())
        .await?;
    println!("{improved}");
    Ok(())
}

pub fn render_prompt(command: PromptCommand) -> anyhow::Result<()> {
    let rendered = match command {
        PromptCommand::Content(args) => {
            prompt::content_prompt(&args.topic, args.slide_count, args.description.as_deref())
        }
        PromptCommand::Outline(args) => {
            prompt::outline_prompt(&args.topic, args.slide_count, args.description.as_deref())
        }
        PromptCommand::Improve(args) => {
            prompt::improvement_prompt(&args.prompt, args.context.as_deref())
        }
        PromptCommand::Document(args) => {
            let document = read_input(&args.input)?;
            prompt::document_prompt(&document, &args.topic, args.slide_count)
        }
    };
    println!("{rendered}");
    Ok(())
}

fn request_from(args: TopicArgs) -> GenerationRequest {
    GenerationRequest {
        topic: args.topic,
        slide_count: Some(args.slide_count),
        description: args.description,
        ..GenerationRequest::default()
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("read input: {input}"))
}

fn print_slides(slides: &[SlideOutline], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(slides).context("serialize slides")?;
            println!("{json}");
        }
        OutputFormat::Summary => {
            let summary = outline::summarize(slides);
            println!("{}", summary.trim_end());
        }
    }
    Ok(())
}
