//! CourseAdvisor CLI — conversational course-advisory assistant.
//!
//! Answers course questions over a hybrid of indexed catalog fragments and
//! freshly scraped course pages, with an offline index builder.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
