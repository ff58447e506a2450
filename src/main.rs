use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use guidesync::api::types::{NewBookmark, NewNote, NotePatch};
use guidesync::{Config, Database, HttpGuideApi, NetworkStatus, OfflineClient, WriteSource};

#[derive(Parser, Debug)]
#[command(name = "guidesync")]
#[command(about = "Manage offline guides and replay queued changes")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/guidesync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Queue writes instead of sending them
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show queued change and download counts
  Status,
  /// Replay queued changes against the API
  Sync,
  /// List queued changes, oldest first
  Pending,
  /// Drop every queued change
  ClearQueue,
  /// List downloaded guides, most recent first
  Downloads,
  /// Download a guide for offline reading
  Download { guide_id: String },
  /// Remove a downloaded guide
  Remove {
    guide_id: Option<String>,
    /// Remove every downloaded guide
    #[arg(long, conflicts_with = "guide_id")]
    all: bool,
  },
  /// Set the reading position of a guide
  Position { guide_id: String, position: u64 },
  /// Manage bookmarks
  #[command(subcommand)]
  Bookmark(BookmarkCommand),
  /// Manage notes
  #[command(subcommand)]
  Note(NoteCommand),
}

#[derive(Subcommand, Debug)]
enum BookmarkCommand {
  Add {
    guide_id: String,
    position: u64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    page: Option<String>,
    #[arg(long)]
    last_read: bool,
  },
  Delete {
    guide_id: String,
    bookmark_id: String,
  },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
  Add {
    guide_id: String,
    content: String,
    #[arg(long)]
    position: Option<u64>,
  },
  Edit {
    guide_id: String,
    note_id: String,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    position: Option<u64>,
  },
  Delete {
    guide_id: String,
    note_id: String,
  },
}

fn describe(source: WriteSource) -> String {
  match source {
    WriteSource::Remote => "applied".to_string(),
    WriteSource::Queued { change_id } => format!("queued as change {}", change_id),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = guidesync::logging::init(&config)?;

  let db_path = config.database_path()?;
  let db = Database::open(&db_path)?;
  db.initialize()
    .await
    .wrap_err_with(|| format!("failed to initialize {}", db_path.display()))?;

  let api = Arc::new(HttpGuideApi::new(&config.api)?);
  let network = Arc::new(NetworkStatus::new(!(args.offline || config.offline)));
  let client = OfflineClient::new(&db, api, network);

  let result = run(&client, args.command).await;
  db.close().await?;
  result
}

async fn run(client: &OfflineClient<HttpGuideApi, NetworkStatus>, command: Command) -> Result<()> {
  match command {
    Command::Status => {
      println!("online:     {}", client.is_online());
      println!("pending:    {}", client.pending_count().await?);
      println!("downloaded: {}", client.downloaded_count().await?);
    }
    Command::Sync => {
      let report = client.sync_all().await?;
      println!(
        "synced {} change(s), {} failed",
        report.success_count, report.failed_count
      );
      for error in &report.errors {
        println!("  error: {}", error);
      }
    }
    Command::Pending => {
      for change in client.pending_changes().await? {
        let payload = match &change.unparsed {
          Some(raw) => format!("(unreadable) {}", raw),
          None => change.payload.to_string(),
        };
        println!(
          "{:>6}  {}  {}/{}  {}",
          change.id, change.created_at, change.change_type, change.action, payload
        );
      }
    }
    Command::ClearQueue => {
      client.clear_queue().await?;
      println!("queue cleared");
    }
    Command::Downloads => {
      for cached in client.downloaded_guides().await? {
        let cached_at = chrono::DateTime::from_timestamp_millis(cached.cached_at)
          .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
          .unwrap_or_default();
        println!("{}  {}  {}", cached.guide.id, cached_at, cached.guide.title);
      }
    }
    Command::Download { guide_id } => {
      let guide = client
        .download_guide(&guide_id)
        .await
        .wrap_err_with(|| format!("failed to download guide {}", guide_id))?;
      println!("downloaded {} ({})", guide.id, guide.title);
    }
    Command::Remove { guide_id, all } => match (guide_id, all) {
      (_, true) => {
        client.remove_all_downloads().await?;
        println!("removed all downloads");
      }
      (Some(guide_id), false) => {
        client.remove_guide(&guide_id).await?;
        println!("removed {}", guide_id);
      }
      (None, false) => return Err(color_eyre::eyre::eyre!("pass a guide id or --all")),
    },
    Command::Position { guide_id, position } => {
      let written = client.update_position(&guide_id, position).await?;
      println!("position {}", describe(written.source));
    }
    Command::Bookmark(BookmarkCommand::Add {
      guide_id,
      position,
      name,
      page,
      last_read,
    }) => {
      let bookmark = NewBookmark {
        position,
        name,
        page_reference: page,
        is_last_read: last_read.then_some(true),
      };
      let written = client.create_bookmark(&guide_id, bookmark).await?;
      println!("bookmark {} {}", written.data.id, describe(written.source));
    }
    Command::Bookmark(BookmarkCommand::Delete {
      guide_id,
      bookmark_id,
    }) => {
      let written = client.delete_bookmark(&guide_id, &bookmark_id).await?;
      println!("bookmark delete {}", describe(written.source));
    }
    Command::Note(NoteCommand::Add {
      guide_id,
      content,
      position,
    }) => {
      let written = client
        .create_note(&guide_id, NewNote { position, content })
        .await?;
      println!("note {} {}", written.data.id, describe(written.source));
    }
    Command::Note(NoteCommand::Edit {
      guide_id,
      note_id,
      content,
      position,
    }) => {
      let written = client
        .update_note(&guide_id, &note_id, NotePatch { position, content })
        .await?;
      println!("note {} {}", written.data.id(), describe(written.source));
    }
    Command::Note(NoteCommand::Delete { guide_id, note_id }) => {
      let written = client.delete_note(&guide_id, &note_id).await?;
      println!("note delete {}", describe(written.source));
    }
  }

  Ok(())
}
