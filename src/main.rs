//! `linklore` CLI - Fetch links, chat with the agent, inspect the library

use std::io::{BufRead, Write as _};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linklore::{AgentConfig, LinkAgent};

#[derive(Parser)]
#[command(name = "linklore")]
#[command(about = "Chat link agent: platform-aware extraction, library, AI analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and show the extracted content
    Fetch {
        /// URL to fetch
        url: String,

        /// Show the full extracted content (not just a preview)
        #[arg(short, long)]
        full: bool,

        /// Print the result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Interactive chat session with the agent
    Chat,

    /// Send one message through the agent and print the reply
    Ask {
        /// The message, as it would be typed in chat
        message: String,
    },

    /// List collections, or show one collection's items
    Library {
        /// Collection name
        name: Option<String>,
    },

    /// Show recent fetch history
    History,

    /// Search collected content by keyword
    Search {
        /// Keyword to search for
        term: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::load()?;
    let agent = LinkAgent::new(&config)?;

    match cli.command {
        Commands::Fetch { url, full, json } => {
            cmd_fetch(&agent, &url, full, json).await?;
        }
        Commands::Chat => {
            cmd_chat(&agent).await?;
        }
        Commands::Ask { message } => {
            for chunk in agent.handle_message("cli", "cli", &message).await {
                println!("{chunk}");
            }
        }
        Commands::Library { name } => {
            cmd_library(&agent, name.as_deref());
        }
        Commands::History => {
            for chunk in agent.handle_message("cli", "cli", "!history").await {
                println!("{chunk}");
            }
        }
        Commands::Search { term } => {
            cmd_search(&agent, &term);
        }
    }

    Ok(())
}

async fn cmd_fetch(agent: &LinkAgent, url: &str, full: bool, json: bool) -> Result<()> {
    let result = agent.fetch_url(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.error {
        println!("Fetch failed: {}", result.content);
        return Ok(());
    }

    println!("URL:      {}", result.url);
    println!("Title:    {}", result.title);
    println!("Platform: {}", result.platform);
    if let Some(author) = &result.metadata.author {
        println!("Author:   {author}");
    }
    if let Some(date) = &result.metadata.date {
        println!("Date:     {date}");
    }
    println!("Length:   {} chars", result.content.chars().count());
    println!();

    if full {
        println!("{}", result.content);
    } else {
        let preview: String = result.content.chars().take(2000).collect();
        println!("{preview}");
        if result.content.chars().count() > 2000 {
            println!("\n... [use --full for the complete content]");
        }
    }

    Ok(())
}

async fn cmd_chat(agent: &LinkAgent) -> Result<()> {
    println!("linklore chat — type !help for commands, Ctrl-D to exit");
    println!("{}", agent.startup_summary());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        for chunk in agent.handle_message("cli", "cli", &line).await {
            println!("{chunk}");
        }
    }

    Ok(())
}

fn cmd_library(agent: &LinkAgent, name: Option<&str>) {
    match name {
        Some(name) => match agent.store().collection(name) {
            Some(items) => {
                println!("Collection '{}' ({} items):", name.to_lowercase(), items.len());
                for item in items {
                    println!(
                        "  {} [{}] {} — {}",
                        item.fetched_at.format("%Y-%m-%d"),
                        item.platform,
                        if item.title.is_empty() { "(no title)" } else { item.title.as_str() },
                        item.url
                    );
                }
            }
            None => println!("No collection named '{name}'"),
        },
        None => {
            let summaries = agent.store().collection_summaries();
            if summaries.is_empty() {
                println!("Library is empty");
                return;
            }
            println!("Collections:");
            for (name, count) in summaries {
                println!("  {name} — {count} items");
            }
        }
    }
}

fn cmd_search(agent: &LinkAgent, term: &str) {
    let hits = agent.store().search_by_keyword(term, 2000);
    if hits.is_empty() {
        println!("No matches for '{term}'");
        return;
    }
    println!("{} matches:", hits.len());
    for hit in hits {
        println!(
            "  {} — {}",
            if hit.title.is_empty() { "(no title)" } else { hit.title.as_str() },
            hit.url
        );
    }
}
