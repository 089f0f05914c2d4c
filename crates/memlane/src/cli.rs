//! Command-line surface: argument parsing and command dispatch.
//!
//! Every command resolves to a JSON value that the binary prints to stdout.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use log::debug;
use memlane_config::MemlaneConfig;
use memlane_core::{Assistant, Input};
use memlane_memory::{MemoryKind, Metadata};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "memlane", version, about = "Personal memory store")]
pub struct Cli {
    /// Load a single config file instead of the layered stack.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Override the data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a text memory.
    Add {
        text: String,
        /// Memory type recorded in metadata.
        #[arg(long, default_value = "text_note")]
        kind: String,
    },
    /// Answer a question from stored memories.
    Ask { question: String },
    /// Route free-form text: questions are answered, reminders scheduled,
    /// everything else stored.
    Tell { text: String },
    /// Similarity search.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        /// Rescore candidates with keyword overlap.
        #[arg(long)]
        hybrid: bool,
        #[arg(long)]
        keyword_weight: Option<f32>,
    },
    /// Memories whose metadata matches every KEY=VALUE pair.
    Filter {
        #[arg(required = true)]
        pairs: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Memories newest first.
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    Show { id: Uuid },
    /// Replace content and/or metadata of a memory.
    Update {
        id: Uuid,
        #[arg(long)]
        content: Option<String>,
        /// JSON object replacing the stored metadata.
        #[arg(long)]
        metadata: Option<String>,
    },
    Delete { id: Uuid },
    /// Add a reminder.
    Remind {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Scheduled time; defaults to one hour from now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Active reminders, soonest first.
    Reminders,
    /// Mark a reminder done.
    Done { id: Uuid },
    /// Store statistics and collaborator status.
    Stats,
    /// Write a snapshot of memories and active reminders.
    Export { path: PathBuf },
    /// Load a snapshot written by `export`.
    Import { path: PathBuf },
    /// Re-embed every memory into a fresh index.
    Rebuild,
}

impl Cli {
    /// Resolve the effective config for this invocation.
    pub fn load_config(&self) -> Result<MemlaneConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => MemlaneConfig::load_from_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => {
                let cwd = std::env::current_dir().context("failed to resolve cwd")?;
                MemlaneConfig::load_layered(cwd)
                    .context("failed to load layered config")?
                    .config
            }
        };
        if let Some(dir) = self.data_dir.as_ref() {
            config.store.data_dir = Some(dir.to_string_lossy().into_owned());
        }
        Ok(config)
    }
}

/// Execute one command against an open assistant.
pub async fn run(assistant: &Assistant, command: Command) -> Result<Value> {
    debug!("running command: {:?}", command);
    match command {
        Command::Add { text, kind } => {
            let kind = MemoryKind::parse(&kind).ok_or_else(|| anyhow!("unknown kind: {kind}"))?;
            to_json(&assistant.remember_text(&text, kind, Metadata::new())?)
        }
        Command::Ask { question } => to_json(&assistant.ask(&question).await?),
        Command::Tell { text } => to_json(&assistant.process(Input::Text(text)).await?),
        Command::Search {
            query,
            limit,
            threshold,
            hybrid,
            keyword_weight,
        } => {
            let search = &assistant.config().search;
            let limit = limit.unwrap_or(search.max_results);
            let hits = if hybrid {
                let weight = keyword_weight.unwrap_or(search.keyword_weight);
                assistant.with_store(|store| store.hybrid_search(&query, limit, weight))?
            } else {
                let threshold = threshold.unwrap_or(search.similarity_threshold);
                assistant.with_store(|store| store.search_memories(&query, limit, threshold))?
            };
            to_json(&hits)
        }
        Command::Filter { pairs, limit } => {
            let filter = parse_filter(&pairs)?;
            to_json(&assistant.with_store(|store| store.search_by_metadata(&filter, limit))?)
        }
        Command::List { limit } => {
            to_json(&assistant.with_store(|store| store.list_memories(limit))?)
        }
        Command::Show { id } => match assistant.with_store(|store| store.get_memory(id))? {
            Some(record) => to_json(&record),
            None => bail!("memory not found: {id}"),
        },
        Command::Update {
            id,
            content,
            metadata,
        } => {
            if content.is_none() && metadata.is_none() {
                bail!("nothing to update: pass --content and/or --metadata");
            }
            let metadata = metadata.as_deref().map(parse_metadata).transpose()?;
            let updated = assistant
                .with_store_mut(|store| store.update_memory(id, content.as_deref(), metadata))?;
            Ok(json!({ "id": id, "updated": updated }))
        }
        Command::Delete { id } => {
            let deleted = assistant.with_store_mut(|store| store.delete_memory(id))?;
            Ok(json!({ "id": id, "deleted": deleted }))
        }
        Command::Remind {
            title,
            description,
            at,
        } => {
            let scheduled_time = at.unwrap_or_else(|| {
                let due = chrono::Utc::now() + chrono::Duration::hours(1);
                memlane_memory::model::format_timestamp(&due)
            });
            let id = assistant.add_reminder(&title, &description, &scheduled_time)?;
            Ok(json!({ "reminder_id": id, "title": title, "scheduled_time": scheduled_time }))
        }
        Command::Reminders => to_json(&assistant.reminders()?),
        Command::Done { id } => {
            let completed = assistant.complete_reminder(id)?;
            Ok(json!({ "reminder_id": id, "completed": completed }))
        }
        Command::Stats => {
            let status = assistant.status()?;
            let statistics = assistant.with_store(|store| store.statistics())?;
            Ok(json!({ "status": status, "statistics": statistics }))
        }
        Command::Export { path } => {
            to_json(&assistant.with_store(|store| store.export(&path))?)
        }
        Command::Import { path } => {
            to_json(&assistant.with_store_mut(|store| store.import(&path))?)
        }
        Command::Rebuild => to_json(&assistant.with_store_mut(|store| store.rebuild_index())?),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to encode output")
}

/// Parse KEY=VALUE pairs; values that are valid JSON keep their type.
fn parse_filter(pairs: &[String]) -> Result<Metadata> {
    let mut filter = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got {pair:?}");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("empty filter key in {pair:?}");
        }
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        filter.insert(key.to_string(), value);
    }
    Ok(filter)
}

fn parse_metadata(raw: &str) -> Result<Metadata> {
    match serde_json::from_str::<Value>(raw).context("metadata is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("metadata must be a JSON object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn assistant_in(dir: &std::path::Path) -> Assistant {
        let config = MemlaneConfig::builder()
            .data_dir(dir.to_string_lossy())
            .build();
        Assistant::open(config).expect("assistant")
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["memlane"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse").command
    }

    /// Filter values keep their JSON type and fall back to strings.
    #[test]
    fn filter_values_are_typed() {
        let filter = parse_filter(&[
            "type=photo".to_string(),
            "people_count=2".to_string(),
            "transcribed=true".to_string(),
        ])
        .expect("filter");
        assert_eq!(filter.get("type"), Some(&json!("photo")));
        assert_eq!(filter.get("people_count"), Some(&json!(2)));
        assert_eq!(filter.get("transcribed"), Some(&json!(true)));
        assert!(parse_filter(&["missing-separator".to_string()]).is_err());
        assert!(parse_filter(&["=value".to_string()]).is_err());
    }

    /// Metadata updates must be JSON objects.
    #[test]
    fn metadata_must_be_object() {
        assert!(parse_metadata(r#"{"type": "note"}"#).is_ok());
        assert!(parse_metadata("[1, 2]").is_err());
        assert!(parse_metadata("not json").is_err());
    }

    /// Global flags are accepted after the subcommand.
    #[test]
    fn data_dir_overrides_config() {
        let cli = Cli::try_parse_from(["memlane", "stats", "--data-dir", "/tmp/memlane-test"])
            .expect("parse");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/memlane-test")));
        assert!(matches!(cli.command, Command::Stats));
    }

    /// Add, list, show and delete through the command surface.
    #[tokio::test]
    async fn add_then_show_and_delete() {
        let temp = tempdir().expect("tempdir");
        let assistant = assistant_in(temp.path());

        let added = run(&assistant, parse(&["add", "Walked the dog", "--kind", "note"]))
            .await
            .expect("add");
        assert_eq!(added["success"], json!(true));
        let id = added["memory_id"].as_str().expect("memory id").to_string();

        let listed = run(&assistant, parse(&["list"])).await.expect("list");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let shown = run(&assistant, parse(&["show", &id])).await.expect("show");
        assert_eq!(shown["content"], json!("Walked the dog"));
        assert_eq!(shown["metadata"]["type"], json!("note"));

        let deleted = run(&assistant, parse(&["delete", &id])).await.expect("delete");
        assert_eq!(deleted["deleted"], json!(true));
        assert!(run(&assistant, parse(&["show", &id])).await.is_err());
    }

    /// Unknown kinds are rejected before anything is stored.
    #[tokio::test]
    async fn add_rejects_unknown_kind() {
        let temp = tempdir().expect("tempdir");
        let assistant = assistant_in(temp.path());
        let result = run(&assistant, parse(&["add", "Hello", "--kind", "diary"])).await;
        assert!(result.is_err());
        assert_eq!(assistant.status().expect("status").memory_count, 0);
    }

    /// Reminders can be added, listed and completed.
    #[tokio::test]
    async fn remind_then_done() {
        let temp = tempdir().expect("tempdir");
        let assistant = assistant_in(temp.path());

        let added = run(
            &assistant,
            parse(&["remind", "Water plants", "--at", "2030-01-01T09:00:00.000000Z"]),
        )
        .await
        .expect("remind");
        let id = added["reminder_id"].as_str().expect("id").to_string();

        let active = run(&assistant, parse(&["reminders"])).await.expect("list");
        assert_eq!(active[0]["title"], json!("Water plants"));

        let done = run(&assistant, parse(&["done", &id])).await.expect("done");
        assert_eq!(done["completed"], json!(true));
        let active = run(&assistant, parse(&["reminders"])).await.expect("list");
        assert_eq!(active.as_array().map(Vec::len), Some(0));
    }

    /// Filtering by metadata returns only matching memories.
    #[tokio::test]
    async fn filter_by_kind() {
        let temp = tempdir().expect("tempdir");
        let assistant = assistant_in(temp.path());
        run(&assistant, parse(&["add", "Beach trip", "--kind", "photo"]))
            .await
            .expect("add photo");
        run(&assistant, parse(&["add", "Grocery list"]))
            .await
            .expect("add note");

        let found = run(&assistant, parse(&["filter", "type=photo"]))
            .await
            .expect("filter");
        let found = found.as_array().expect("array");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["content"], json!("Beach trip"));
    }

    /// Update without any field is refused.
    #[tokio::test]
    async fn update_requires_a_field() {
        let temp = tempdir().expect("tempdir");
        let assistant = assistant_in(temp.path());
        let id = Uuid::new_v4().to_string();
        assert!(run(&assistant, parse(&["update", &id])).await.is_err());

        let updated = run(&assistant, parse(&["update", &id, "--content", "x"]))
            .await
            .expect("update");
        assert_eq!(updated["updated"], json!(false));
    }

    /// Export then import into a fresh store restores memories.
    #[tokio::test]
    async fn export_import_round_trip() {
        let source = tempdir().expect("tempdir");
        let target = tempdir().expect("tempdir");
        let snapshot = source.path().join("snapshot.json");
        let snapshot_arg = snapshot.to_string_lossy().into_owned();

        let assistant = assistant_in(source.path());
        run(&assistant, parse(&["add", "First day at school"]))
            .await
            .expect("add");
        run(&assistant, parse(&["export", &snapshot_arg]))
            .await
            .expect("export");

        let restored = assistant_in(target.path());
        run(&restored, parse(&["import", &snapshot_arg]))
            .await
            .expect("import");
        let listed = run(&restored, parse(&["list"])).await.expect("list");
        assert_eq!(listed[0]["content"], json!("First day at school"));
    }
}
