use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use lime_export::{with_utf8_bom, ExportFormat, ExportOptions, ExportZone, TranscriptExporter};
use lime_store::{ChatRoom, Message, ViewerConfig, ViewerSession};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

/// Lime - browse and export LINE chat backups
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite file holding imported media and snapshots
    #[arg(long, default_value = "lime-viewer.db")]
    store: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a backup (database, contacts and media)
    Import {
        /// naver_line SQLite database
        #[arg(long)]
        db: PathBuf,

        /// Contacts CSV with `mid` and `profile_name` columns
        #[arg(long)]
        contacts: Option<PathBuf>,

        /// Extracted `chats_backup` folder or a ZIP archive of it
        #[arg(long)]
        media: Option<PathBuf>,

        /// Keep everything in memory only
        #[arg(long)]
        no_persist: bool,
    },

    /// List conversations
    Chats,

    /// Show messages of a conversation
    Messages {
        chat_id: String,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Show the whole conversation, oldest first
        #[arg(long)]
        all: bool,
    },

    /// Search message text across every conversation
    Search {
        query: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Export transcripts in LINE's format
    Export {
        /// Conversation to export; every conversation when omitted
        #[arg(long)]
        chat: Option<String>,

        #[arg(short, long, value_enum, default_value = "txt")]
        format: Format,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Sender name for your own messages
        #[arg(long, default_value = "自分")]
        self_name: String,

        /// IANA timezone for dates and times, e.g. Asia/Tokyo (default: local)
        #[arg(long, conflicts_with = "utc_offset")]
        timezone: Option<String>,

        /// Fixed UTC offset in hours instead of a timezone
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<i32>,
    },

    /// List the media blobs of a conversation
    Media {
        chat_id: String,

        /// Write each blob into this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Delete every imported snapshot and media blob
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Txt,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Txt => ExportFormat::Text,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaEntry {
    message_id: i64,
    filename: String,
    content_type: String,
    size: usize,
    url: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn progress_bar(label: &'static str) -> impl FnMut(u8) + Send {
    move |percent| {
        eprint!("\r{} {:>3}%", label, percent);
        if percent >= 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }
}

/// Reopen the last import or fail with a hint
async fn restored(session: &ViewerSession) -> Result<()> {
    if !session
        .restore()
        .await
        .context("Failed to restore imported backup")?
    {
        bail!("Nothing imported yet; run `lime import --db <naver_line.db>` first");
    }
    Ok(())
}

#[instrument(skip(session))]
async fn import(
    session: &ViewerSession,
    db: &Path,
    contacts: Option<&Path>,
    media: Option<&Path>,
    persist: bool,
) -> Result<()> {
    if let Some(path) = contacts {
        let csv = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read contacts {}", path.display()))?;
        let count = session.load_contacts(&csv, persist).await?;
        println!("👥 Loaded {} contacts", count);
    }

    let database = session
        .open_database_file(db, persist)
        .await
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    let rooms = database.list_conversations().await?;
    println!("💬 Opened {} conversations", rooms.len());

    if let Some(path) = media {
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        let mut progress = progress_bar("📦 Importing media");
        let imported = if is_zip {
            session.import_media_zip(path, persist, &mut progress).await
        } else {
            session.import_media_folder(path, persist, &mut progress).await
        };
        let count =
            imported.with_context(|| format!("Failed to import media from {}", path.display()))?;
        println!("🖼️  Imported {} media files", count);
    }

    if !persist {
        warn!("Import was not persisted; later commands will not see it");
    }
    info!("Import finished");
    Ok(())
}

fn export_zone(timezone: Option<&str>, utc_offset: Option<i32>) -> Result<ExportZone> {
    if let Some(name) = timezone {
        let tz: Tz = name
            .parse()
            .map_err(|e| anyhow!("Unknown timezone {}: {}", name, e))?;
        return Ok(ExportZone::Named(tz));
    }
    match utc_offset {
        Some(hours) => FixedOffset::east_opt(hours * 3600)
            .map(ExportZone::Fixed)
            .with_context(|| format!("Invalid UTC offset {}", hours)),
        None => Ok(ExportZone::Local),
    }
}

fn print_rooms(rooms: &[ChatRoom]) {
    for room in rooms {
        let marker = if room.is_group { "👪" } else { "👤" };
        println!(
            "{} {} [{}] - {}",
            marker, room.name, room.id, room.last_message
        );
    }
}

fn print_messages(messages: &[Message], zone: &ExportZone) {
    for message in messages {
        let at = lime_export::datetime::local_time(message.timestamp, zone);
        let sender = if message.is_me {
            "me"
        } else {
            message.from_name.as_deref().unwrap_or(&message.from_id)
        };
        println!(
            "{} {} {}: {}",
            at.format("%Y/%m/%d %H:%M"),
            message.id,
            sender,
            lime_export::message_text(message)
        );
    }
}

#[instrument(skip(session))]
async fn export(
    session: &ViewerSession,
    chat: Option<&str>,
    format: ExportFormat,
    out: &Path,
    options: ExportOptions,
) -> Result<PathBuf> {
    let database = session.database()?;
    let rooms = database.list_conversations().await?;
    let exporter = TranscriptExporter::new(options);

    let (filename, content) = match chat {
        Some(chat_id) => {
            let room = rooms
                .into_iter()
                .find(|room| room.id == chat_id)
                .with_context(|| format!("Unknown conversation {}", chat_id))?;
            let messages = database.list_all_messages(&room.id).await?;
            let content = match format {
                ExportFormat::Text => exporter.to_plain_text(&room, &messages),
                ExportFormat::Csv => exporter.to_csv(&room, &messages),
            };
            (exporter.filename(&room, format), content)
        }
        None => {
            let mut all = Vec::with_capacity(rooms.len());
            for room in rooms {
                let messages = database.list_all_messages(&room.id).await?;
                debug!("Collected {} messages from {}", messages.len(), room.id);
                all.push((room, messages));
            }
            let content = match format {
                ExportFormat::Text => exporter.all_to_plain_text(&all),
                ExportFormat::Csv => exporter.all_to_csv(&all),
            };
            (exporter.all_filename(format), content)
        }
    };

    tokio::fs::create_dir_all(out).await?;
    let path = out.join(filename);
    tokio::fs::write(&path, with_utf8_bom(&content))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        content_type = format.mime_type(),
        "Export written"
    );
    Ok(path)
}

#[instrument(skip(session))]
async fn media(session: &ViewerSession, chat_id: &str, save: Option<&Path>) -> Result<Vec<MediaEntry>> {
    let database = session.database()?;
    let locator = session.media();
    locator.preload_conversation(chat_id).await?;

    if let Some(dir) = save {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut entries = Vec::new();
    for message in database.list_all_messages(chat_id).await? {
        let filename = message.media_filename();
        let Some(file) = locator.media_file(chat_id, &filename) else {
            continue;
        };
        if let Some(dir) = save {
            tokio::fs::write(dir.join(&filename), &file.bytes).await?;
        }
        entries.push(MediaEntry {
            message_id: message.id,
            filename,
            content_type: file.content_type.clone(),
            size: file.bytes.len(),
            url: file.url.clone(),
        });
    }
    Ok(entries)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let session = ViewerSession::new(ViewerConfig {
        store_path: args.store.clone(),
        ..Default::default()
    })
    .await
    .with_context(|| format!("Failed to open store {}", args.store.display()))?;
    let config = session.config().clone();

    match args.command {
        Command::Import {
            db,
            contacts,
            media,
            no_persist,
        } => {
            import(
                &session,
                &db,
                contacts.as_deref(),
                media.as_deref(),
                !no_persist,
            )
            .await?;
        }

        Command::Chats => {
            restored(&session).await?;
            let rooms = session.database()?.list_conversations().await?;
            if args.json {
                print_json(&rooms)?;
            } else {
                print_rooms(&rooms);
            }
        }

        Command::Messages {
            chat_id,
            limit,
            offset,
            all,
        } => {
            restored(&session).await?;
            let database = session.database()?;
            session.media().preload_conversation(&chat_id).await?;
            let messages = if all {
                database.list_all_messages(&chat_id).await?
            } else {
                let limit = limit.unwrap_or(config.page_size);
                database.list_messages(&chat_id, limit, offset).await?
            };
            if args.json {
                print_json(&messages)?;
            } else {
                print_messages(&messages, &ExportZone::Local);
            }
        }

        Command::Search { query, limit } => {
            restored(&session).await?;
            let limit = limit.unwrap_or(config.search_limit);
            let hits = session.database()?.search_global(&query, limit).await?;
            if args.json {
                print_json(&hits)?;
            } else {
                for hit in &hits {
                    let sender = hit.from_name.as_deref().unwrap_or(&hit.from_id);
                    println!("🔎 [{}] #{} {}: {}", hit.chat_id, hit.id, sender, hit.content);
                }
                println!("{} hits", hits.len());
            }
        }

        Command::Export {
            chat,
            format,
            out,
            self_name,
            timezone,
            utc_offset,
        } => {
            restored(&session).await?;
            let zone = export_zone(timezone.as_deref(), utc_offset)?;
            let options = ExportOptions {
                self_name,
                zone,
                saved_at: None,
            };
            let format = ExportFormat::from(format);
            let path = export(&session, chat.as_deref(), format, &out, options).await?;
            println!("📄 Exported to {} ({})", path.display(), format.mime_type());
        }

        Command::Media { chat_id, save } => {
            restored(&session).await?;
            let entries = media(&session, &chat_id, save.as_deref()).await?;
            if args.json {
                print_json(&entries)?;
            } else {
                for entry in &entries {
                    println!(
                        "🖼️  #{} {} {} ({} bytes) {}",
                        entry.message_id, entry.filename, entry.content_type, entry.size, entry.url
                    );
                }
                println!("{} media files", entries.len());
            }
        }

        Command::Reset => {
            session.reset().await.context("Failed to reset store")?;
            println!("🧹 Store cleared");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_zone_selection() {
        assert_eq!(export_zone(None, None).unwrap(), ExportZone::Local);
        assert_eq!(
            export_zone(Some("Asia/Tokyo"), None).unwrap(),
            ExportZone::Named(chrono_tz::Asia::Tokyo)
        );
        assert_eq!(
            export_zone(None, Some(-5)).unwrap(),
            ExportZone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap())
        );
        assert!(export_zone(Some("Mars/Olympus"), None).is_err());
        assert!(export_zone(None, Some(30)).is_err());
    }
}
