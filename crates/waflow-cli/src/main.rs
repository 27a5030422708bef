use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use waflow_core::flow::{serialize, validate};
use waflow_core::phone::{digits, format_phone_number, is_valid_phone_number, truncate_message};
use waflow_core::platforms::whatsapp::publish_document;
use waflow_core::{
    BlockKind, FlowCategory, FlowGateway, GraphFlowGateway, MessageSender, OutboundMessage,
    WhatsAppCredentials, WhatsAppSender,
};
use waflow_telemetry::{TelemetryConfig, init_telemetry};

mod document_file;

#[derive(Parser, Debug)]
#[command(name = "waflow", version, about = "Build and publish WhatsApp Flows")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Edit, render and publish flow documents
    Flow {
        #[command(subcommand)]
        command: FlowCommand,
    },
    /// Send a text message from the configured phone number
    Send {
        /// Recipient in international format.
        #[arg(long)]
        to: String,
        #[arg(long)]
        text: String,
    },
}

#[derive(Subcommand, Debug)]
enum FlowCommand {
    /// Write a new document with a single empty screen
    New {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Append a screen and print its id
    AddScreen {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Append a block to a screen and print its id
    AddBlock {
        path: PathBuf,
        /// Target screen; defaults to the first one.
        #[arg(long)]
        screen: Option<String>,
        /// e.g. short-answer, dropdown, opt-in.
        #[arg(long)]
        kind: BlockKind,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        required: bool,
        /// Replaces the default option list; can be repeated.
        #[arg(long = "option", value_name = "TEXT")]
        options: Vec<String>,
    },
    /// Print the Flow JSON for a document
    Render {
        path: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Report problems WhatsApp would reject
    Lint { path: PathBuf },
    /// Serialize a document and create it on the business account
    Submit {
        path: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long = "category", value_name = "CATEGORY", default_value = "OTHER")]
        categories: Vec<FlowCategory>,
        #[arg(long)]
        publish: bool,
    },
    /// List flows on the business account as JSON
    List,
    /// Delete a flow by id
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry(
        TelemetryConfig::from_lookup("waflow", |key| std::env::var(key).ok())
            .with_default_filter("warn"),
    )?;

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Flow { command } => handle_flow(command).await,
        CliCommand::Send { to, text } => handle_send(&to, &text).await,
    }
}

fn flow_gateway(creds: &WhatsAppCredentials) -> Result<GraphFlowGateway> {
    let http = creds.http_client()?;
    Ok(GraphFlowGateway::new(http, creds))
}

async fn handle_flow(command: FlowCommand) -> Result<()> {
    match command {
        FlowCommand::New { path, force } => {
            document_file::create(&path, force)?;
            println!("created {}", path.display());
        }
        FlowCommand::AddScreen { path, title } => {
            let mut document = document_file::load(&path)?;
            let id = document.add_screen();
            if let Some(title) = title {
                document.update_screen_title(&id, title);
            }
            document_file::save(&path, &document)?;
            println!("{id}");
        }
        FlowCommand::AddBlock {
            path,
            screen,
            kind,
            label,
            value,
            required,
            options,
        } => {
            if !options.is_empty() && !kind.has_options() {
                bail!("{kind} blocks take no options");
            }
            let mut document = document_file::load(&path)?;
            let screen = match screen {
                Some(screen) => screen,
                None => document
                    .screens()
                    .first()
                    .map(|s| s.id.clone())
                    .context("document has no screens")?,
            };
            let block = document
                .add_block(&screen, kind)
                .with_context(|| format!("no screen `{screen}`"))?;
            if let Some(label) = label {
                document.update_block_label(&screen, &block, label);
            }
            if let Some(value) = value {
                document.update_block_value(&screen, &block, value);
            }
            if required {
                document.update_block_required(&screen, &block, true);
            }
            for (index, option) in options.into_iter().enumerate() {
                if index > 0 {
                    document.add_option(&screen, &block);
                }
                document.update_option(&screen, &block, index, option);
            }
            document_file::save(&path, &document)?;
            println!("{block}");
        }
        FlowCommand::Render { path, pretty } => {
            let document = document_file::load(&path)?;
            let flow_json = serialize(&document)?;
            let out = if pretty {
                serde_json::to_string_pretty(&flow_json)?
            } else {
                serde_json::to_string(&flow_json)?
            };
            println!("{out}");
        }
        FlowCommand::Lint { path } => {
            let document = document_file::load(&path)?;
            let issues = validate(&document);
            if issues.is_empty() {
                println!("ok");
                return Ok(());
            }
            for issue in &issues {
                println!("{issue}");
            }
            bail!("{} issue(s) in {}", issues.len(), path.display());
        }
        FlowCommand::Submit {
            path,
            name,
            categories,
            publish,
        } => {
            let document = document_file::load(&path)?;
            let gateway = flow_gateway(&WhatsAppCredentials::from_env())?;
            let created = publish_document(&gateway, &name, categories, publish, &document).await?;
            println!("{}", created.id);
            for error in &created.validation_errors {
                eprintln!("warning: {}: {}", error.error, error.message);
            }
        }
        FlowCommand::List => {
            let gateway = flow_gateway(&WhatsAppCredentials::from_env())?;
            let flows = gateway.list().await?;
            debug!(count = flows.len(), "listed flows");
            println!("{}", serde_json::to_string_pretty(&flows)?);
        }
        FlowCommand::Delete { id } => {
            let gateway = flow_gateway(&WhatsAppCredentials::from_env())?;
            gateway.remove(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn handle_send(to: &str, text: &str) -> Result<()> {
    let formatted = format_phone_number(to);
    if !is_valid_phone_number(&formatted) {
        bail!("invalid phone number `{to}`");
    }
    let creds = WhatsAppCredentials::from_env();
    let sender = WhatsAppSender::new(creds.http_client()?, &creds);
    let result = sender
        .send(&digits(&formatted), &OutboundMessage::text(truncate_message(text)))
        .await?;
    println!("{}", result.message_id.unwrap_or_default());
    Ok(())
}
