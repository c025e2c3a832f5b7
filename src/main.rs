use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    slidecraft::logging::init("warn").context("init logging")?;

    let cli = slidecraft::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        slidecraft::cli::Command::Generate(args) => {
            slidecraft::commands::generate(args).await.context("generate")?;
        }
        slidecraft::cli::Command::Outline(args) => {
            slidecraft::commands::outline(args).await.context("outline")?;
        }
        slidecraft::cli::Command::FromDocument(args) => {
            slidecraft::commands::from_document(args)
                .await
                .context("from-document")?;
        }
        slidecraft::cli::Command::Parse(args) => {
            slidecraft::commands::parse(args).context("parse")?;
        }
        slidecraft::cli::Command::Improve(args) => {
            slidecraft::commands::improve(args).await.context("improve")?;
        }
        slidecraft::cli::Command::Prompt { command } => {
            slidecraft::commands::render_prompt(command).context("prompt")?;
        }
    }

    Ok(())
}
