use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use furion_context::{
    diagnosis_context, explore_context, status_context, DiagnosisPatch, ExplorePatch, ListType,
    Scope, ServerStatus, SharedState, StatusPatch, VisibilityState,
};
use furion_schema::{furion_kit_schema, PrimaryKey, FURION_KIT_VERSION, ROUTING_DIAGNOSIS};
use furion_store::{BackendKind, DiagnosticStore, MemoryBackend, StoreConfig};
use furion_types::RecordId;
use serde_json::{json, Value};

mod logging;

#[derive(Parser)]
#[command(name = "furion", about = "Furion Kit local diagnostic store")]
struct Cli {
    /// YAML store config; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the configured backend (memory, file, disabled).
    #[arg(long, global = true)]
    backend: Option<BackendKind>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Routing-diagnosis records.
    Diag {
        #[command(subcommand)]
        action: DiagCommand,
    },
    /// Print the table layout of the current schema version.
    Schema,
    /// Walk a component tree through the coordination contexts.
    Demo,
}

#[derive(Subcommand)]
enum DiagCommand {
    /// Insert a JSON object; prints the assigned id.
    Insert { record: String },
    Get { id: u64 },
    Delete { id: u64 },
    List,
    /// Arrow snapshot summary of the table.
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Diag { action } => {
            let cfg = load_config(cli.config, cli.backend)?;
            let store = DiagnosticStore::open_named(cfg.build_backend(), &cfg.database)
                .await
                .with_context(|| format!("opening database '{}'", cfg.database))?;
            run_diag(&store, action).await?;
        }
        Command::Schema => {
            let layout = furion_kit_schema()?.layout_at(FURION_KIT_VERSION)?;
            println!("schema {}", layout.version());
            for table in layout.tables() {
                let pk = match &table.primary_key {
                    PrimaryKey::AutoIncrement(f) => format!("++{f}"),
                    PrimaryKey::Explicit(f) => f.clone(),
                    PrimaryKey::Outbound => "(outbound)".into(),
                };
                let indexes: Vec<&str> = table.indexes.iter().map(|i| i.name.as_str()).collect();
                println!("  {}: key {pk}, indexes [{}]", table.name, indexes.join(", "));
            }
        }
        Command::Demo => demo().await?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>, backend: Option<BackendKind>) -> anyhow::Result<StoreConfig> {
    let cfg = match path {
        Some(path) => StoreConfig::from_path(&path)?,
        None => StoreConfig::default(),
    };
    let mut cfg = cfg.with_env_overrides()?;
    if let Some(kind) = backend {
        cfg.backend = kind;
    }
    Ok(cfg)
}

async fn run_diag(store: &DiagnosticStore, action: DiagCommand) -> anyhow::Result<()> {
    match action {
        DiagCommand::Insert { record } => {
            let value: Value = serde_json::from_str(&record).context("record is not valid JSON")?;
            let id = store.insert_as(&value).await?;
            println!("{id}");
        }
        DiagCommand::Get { id } => match store.get(RecordId(id)).await? {
            Some(rec) => println!("{}", rec.to_json()),
            None => anyhow::bail!("record {id} not found"),
        },
        DiagCommand::Delete { id } => {
            store.delete(RecordId(id)).await?;
        }
        DiagCommand::List => {
            for rec in store.scan().await? {
                println!("{}", rec.to_json());
            }
        }
        DiagCommand::Export => {
            let batch = store.store().export(ROUTING_DIAGNOSIS).await?;
            let schema = batch.schema();
            let columns: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
            println!("rows: {}, columns: [{}]", batch.num_rows(), columns.join(", "));
        }
    }
    Ok(())
}

/// A page owns the surfaces and state; a nested "route table" component
/// records a diagnosis and asks for the modal without knowing who owns it.
async fn demo() -> anyhow::Result<()> {
    let modal = VisibilityState::new("diagnosis-modal");
    let drawer = VisibilityState::new("diagnosis-drawer");
    let popover = VisibilityState::new("route-popover");
    let list_type = SharedState::new(ListType::Card);
    let status = ServerStatus::new();
    popover.show();

    let page = Scope::root()
        .provide(diagnosis_context(), DiagnosisPatch::bound_to(&modal, &drawer, &popover))
        .provide(explore_context(), ExplorePatch::bound_to(&list_type))
        .provide(status_context(), StatusPatch::bound_to(&status));
    let store = DiagnosticStore::open(Arc::new(MemoryBackend::new())).await?;

    // Nested component.
    let diag = page.consume(diagnosis_context());
    let id = store
        .insert_as(&json!({"source": "route-a", "detail": "timeout"}))
        .await?;
    diag.hide_popover.emit();
    diag.show_modal.emit();
    page.consume(explore_context()).set_list_type.call(ListType::List);
    page.consume(status_context()).set_online.call(true);

    // A sibling rendered outside the page providers only sees defaults.
    let sibling = Scope::root().consume(explore_context());

    println!("recorded diagnosis {id}");
    println!("modal: {:?}, drawer: {:?}, popover: {:?}", modal.get(), drawer.get(), popover.get());
    println!("list type (owner): {}, list type (sibling): {}", list_type.get(), sibling.list_type);
    println!("server online: {}", status.is_online());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_flag_overrides_config() {
        let cfg = load_config(None, Some(BackendKind::Memory)).unwrap();
        assert_eq!(cfg.backend, BackendKind::Memory);
    }

    #[test]
    fn cli_parses_diag_insert() {
        let cli = Cli::try_parse_from(["furion", "--backend", "memory", "diag", "insert", r#"{"source":"a"}"#])
            .unwrap();
        assert_eq!(cli.backend, Some(BackendKind::Memory));
        assert!(matches!(
            cli.command,
            Command::Diag { action: DiagCommand::Insert { .. } }
        ));
    }

    #[tokio::test]
    async fn demo_runs() {
        demo().await.unwrap();
    }
}
