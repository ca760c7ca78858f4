use clap::{Parser, Subcommand};
use receipt_split::config::Config;
use receipt_split::message::{format_idr, whatsapp_link};
use receipt_split::model::{Item, subtotal};
use receipt_split::plan::BillPlan;
use receipt_split::{Ingestor, SplitError};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "receipt-split", version, about = "Split a receipt between friends")]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when absent.
    #[arg(long, global = true, env = "RECEIPT_SPLIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR a receipt photo and list the recognized items.
    Scan { image: PathBuf },
    /// Structure already-extracted receipt text.
    Parse { text: PathBuf },
    /// Apply a JSON bill plan and print each person's share.
    Bill { plan: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    info!(backend = ?cfg.structuring.backend, "receipt-split v{}", env!("CARGO_PKG_VERSION"));

    let ingestor = Ingestor::from_config(&cfg)?;

    let result = match cli.command {
        Command::Scan { image } => scan(&ingestor, &image).await,
        Command::Parse { text } => parse(&ingestor, &text).await,
        Command::Bill { plan } => bill(&ingestor, &plan).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn scan(ingestor: &Ingestor, image: &Path) -> Result<(), SplitError> {
    let bytes = tokio::fs::read(image)
        .await
        .map_err(|e| SplitError::Extraction(format!("cannot read {}: {e}", image.display())))?;
    let items = ingestor.ingest(Some(bytes.as_slice())).await?;
    print_items(&items);
    Ok(())
}

async fn parse(ingestor: &Ingestor, text: &Path) -> Result<(), SplitError> {
    let raw = tokio::fs::read_to_string(text)
        .await
        .map_err(|e| SplitError::Extraction(format!("cannot read {}: {e}", text.display())))?;
    let items = ingestor.ingest_text(&raw).await?;
    print_items(&items);
    Ok(())
}

async fn bill(ingestor: &Ingestor, plan_path: &Path) -> Result<(), SplitError> {
    let plan = BillPlan::load(plan_path)?;
    let base_dir = plan_path.parent().unwrap_or(Path::new("."));
    let session = plan.execute(base_dir, ingestor).await?;

    print_items(session.registry().items());

    for person in session.people() {
        println!("\n--- {} ---", person.name());
        for item in person.selected_items() {
            println!(
                "  {:<28} x{:<4} {:>18}",
                item.name,
                item.quantity,
                format_idr(item.line_total())
            );
        }
        println!("  Subtotal: {}", format_idr(person.subtotal()));
        println!(
            "  Surcharge ({}%): {}",
            person.tip_percent(),
            format_idr(person.tip())
        );
        println!("  Total due: {}", format_idr(person.total_due()));
        if !person.phone().is_empty() {
            println!("  {}", whatsapp_link(person));
        }
    }

    println!(
        "\nAssigned: {} of {}",
        format_idr(session.people().total_assigned()),
        format_idr(session.registry().total())
    );
    Ok(())
}

fn print_items(items: &[Item]) {
    println!("{:>3}  {:<28} {:>5} {:>18} {:>18}", "#", "Item", "Qty", "Unit", "Total");
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:>3}  {:<28} {:>5} {:>18} {:>18}",
            i,
            item.name,
            item.quantity,
            format_idr(item.price),
            format_idr(item.line_total())
        );
    }
    println!(
        "{:>3}  {:<28} {:>5} {:>18} {:>18}",
        "",
        "Total",
        "",
        "",
        format_idr(subtotal(items))
    );
}
