//! Document Hub admin CLI
//!
//! Seeding and maintenance over the REST API. Authenticates with an admin or
//! editor key from `DOCUHUB_API_KEY` (or `--api-key`).

mod client;
mod seed;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client::{DocuHubClient, TagSummary, TemplateSummary};
use seed::SeedFile;

#[derive(Parser, Debug)]
#[command(
    name = "docuhub-admin",
    about = "Seed and maintain a Document Hub server",
    version
)]
struct Cli {
    /// Base URL of the API
    #[arg(long, env = "DOCUHUB_API_URL", default_value = "http://localhost:8080")]
    api_url: String,
    /// Bearer key used for every request
    #[arg(long, env = "DOCUHUB_API_KEY", hide_env_values = true)]
    api_key: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print server status and version
    Health,
    /// Create tags, categories, merge fields, offices and layout partials from a JSON file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    /// Delete archived templates that have not changed recently
    PruneArchived {
        /// Only templates last updated more than this many days ago
        #[arg(long)]
        older_than_days: u32,
        /// List what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },
    /// List tags that no template uses
    OrphanTags {
        /// Delete the orphaned tags
        #[arg(long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "docuhub_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = DocuHubClient::new(&cli.api_url, &cli.api_key)?;

    match cli.command {
        Command::Health => {
            let health = client.health().await?;
            println!("{} (version {})", health.status, health.version);
        }
        Command::Seed { file } => {
            let seed = SeedFile::load(&file)?;
            tracing::info!(records = seed.len(), "Applying seed file");
            let summary = seed::apply(&client, &seed).await?;
            println!(
                "created {}, skipped {} existing",
                summary.created, summary.skipped
            );
        }
        Command::PruneArchived {
            older_than_days,
            dry_run,
        } => {
            let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
            let archived = client.templates_with_status("archived").await?;
            let stale = stale_templates(&archived, cutoff);

            for template in &stale {
                if dry_run {
                    println!("would delete {} ({})", template.slug, template.id);
                } else {
                    client.delete_template(&template.id).await?;
                    println!("deleted {} ({})", template.slug, template.id);
                }
            }
            tracing::info!(
                matched = stale.len(),
                dry_run,
                "Pruned archived templates"
            );
        }
        Command::OrphanTags { delete } => {
            let tags = client.tags().await?;
            for tag in orphan_tags(&tags) {
                if delete {
                    client.delete_tag(&tag.id).await?;
                    println!("deleted {} ({})", tag.name, tag.id);
                } else {
                    println!("{} ({})", tag.name, tag.id);
                }
            }
        }
    }

    Ok(())
}

/// Archived templates last touched before the cutoff
fn stale_templates(templates: &[TemplateSummary], cutoff: DateTime<Utc>) -> Vec<&TemplateSummary> {
    templates
        .iter()
        .filter(|t| t.status == "archived" && t.updated_at < cutoff)
        .collect()
}

fn orphan_tags(tags: &[TagSummary]) -> Vec<&TagSummary> {
    tags.iter().filter(|t| t.template_count == 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(slug: &str, status: &str, days_ago: i64) -> TemplateSummary {
        TemplateSummary {
            id: format!("id-{}", slug),
            slug: slug.to_string(),
            status: status.to_string(),
            updated_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_stale_templates_respects_cutoff_and_status() {
        let templates = vec![
            template("old-archived", "archived", 90),
            template("new-archived", "archived", 5),
            template("old-draft", "draft", 90),
        ];
        let cutoff = Utc::now() - Duration::days(30);

        let stale = stale_templates(&templates, cutoff);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].slug, "old-archived");
    }

    #[test]
    fn test_orphan_tags_have_no_templates() {
        let tags = vec![
            TagSummary {
                id: "1".into(),
                name: "Luxury".into(),
                template_count: 2,
            },
            TagSummary {
                id: "2".into(),
                name: "Unused".into(),
                template_count: 0,
            },
        ];
        let orphans = orphan_tags(&tags);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].name, "Unused");
    }

    #[test]
    fn test_cli_parses_prune_flags() {
        let cli = Cli::try_parse_from([
            "docuhub-admin",
            "--api-key",
            "k",
            "prune-archived",
            "--older-than-days",
            "30",
            "--dry-run",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::PruneArchived {
                older_than_days: 30,
                dry_run: true
            }
        ));
    }
}
