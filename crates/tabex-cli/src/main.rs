//! tabex CLI - table extraction for real-estate documents
//!
//! Reads a spreadsheet, CSV or PDF file and prints the extracted table with
//! its column classification, or the property records reconstructed from it.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, Overrides, API_KEY_ENV};
use std::fs;
use std::path::{Path, PathBuf};
use tabex_backend::{ExtractOptions, RuleSet, TabularExtractor};
use tabex_core::{Extraction, ExtractionResult, TabularDocument};

#[derive(Parser)]
#[command(name = "tabex")]
#[command(about = "Extract tables from spreadsheets, CSV and PDF files", long_about = None)]
#[command(version)]
struct Cli {
    /// API key for the AI gateway (overrides TABEX_API_KEY and config files)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Use this config file instead of ./.tabex.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a table and classify its columns
    Extract {
        /// Input file
        file: PathBuf,

        /// Context for the AI stages (document kind, project name)
        #[arg(long)]
        hint: Option<String>,

        /// MIME type, used when the file name has no known extension
        #[arg(long, default_value = "")]
        mime: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Extract a table, then reconstruct property records from it
    Records {
        /// Input file
        file: PathBuf,

        /// Context for the AI stages
        #[arg(long)]
        hint: Option<String>,

        /// MIME type, used when the file name has no known extension
        #[arg(long, default_value = "")]
        mime: String,
    },

    /// List the column classification rules in evaluation order
    Rules,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged configuration (API key masked)
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// JSON, as returned by the library
    #[default]
    Json,
    /// Human-readable summary
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "tabex=info"
                    .parse()
                    .expect("directive is compile-time constant"),
            ),
        )
        .init();

    let cli = Cli::parse();
    let api_key = Overrides::resolve_api_key(cli.api_key, std::env::var(API_KEY_ENV).ok());
    let files = Config::discover(cli.config.as_deref());

    match cli.command {
        Commands::Extract {
            file,
            hint,
            mime,
            format,
        } => {
            let config = files.with_overrides(Overrides {
                api_key,
                hint,
                format: format.map(|f| format_name(f).to_string()),
            });
            let format = resolve_format(config.format())?;
            let extractor = build_extractor(&config);
            let extraction = extract_file(&extractor, &file, &mime).await?;
            print_extraction(&extraction, format)?;
        }
        Commands::Records { file, hint, mime } => {
            let config = files.with_overrides(Overrides {
                api_key,
                hint,
                format: None,
            });
            let extractor = build_extractor(&config);
            match extract_file(&extractor, &file, &mime).await? {
                Extraction::Table(result) => {
                    let records = extractor
                        .extract_records(&result.table, Some(&display_name(&file)))
                        .await;
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                Extraction::NoTable(reason) => println!("No table found: {reason}"),
            }
        }
        Commands::Rules => print_rules(RuleSet::standard()),
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            let config = files.with_overrides(Overrides {
                api_key,
                ..Overrides::default()
            });
            let shown = toml::to_string_pretty(&config.redacted())
                .context("Failed to render configuration")?;
            if shown.trim().is_empty() {
                println!("# no configuration found; built-in defaults apply");
            } else {
                print!("{shown}");
            }
        }
    }

    Ok(())
}

fn build_extractor(config: &Config) -> TabularExtractor {
    let mut options = ExtractOptions::default().with_llm(config.llm_options());
    if let Some(hint) = config.hint() {
        options = options.with_hint(hint);
    }

    let extractor = match config.gateway_config() {
        Some(gateway) => TabularExtractor::with_http_gateway(gateway),
        None => {
            tracing::debug!("No API key configured; PDF input and records are unavailable");
            TabularExtractor::new()
        }
    };
    extractor.with_options(options)
}

async fn extract_file(extractor: &TabularExtractor, file: &Path, mime: &str) -> Result<Extraction> {
    let content =
        fs::read(file).with_context(|| format!("Failed to read input file: {}", file.display()))?;
    let name = display_name(file);
    Ok(extractor
        .extract(&TabularDocument::new(&content, mime, &name))
        .await)
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned())
}

const fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Text => "text",
    }
}

fn resolve_format(configured: Option<&str>) -> Result<OutputFormat> {
    configured.map_or(Ok(OutputFormat::default()), |name| {
        OutputFormat::from_str(name, true)
            .map_err(|_| anyhow::anyhow!("Unknown output format '{name}' (expected json or text)"))
    })
}

fn print_extraction(extraction: &Extraction, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(extraction)?),
        OutputFormat::Text => match extraction {
            Extraction::Table(result) => print!("{}", render_text(result)),
            Extraction::NoTable(reason) => println!("No table found: {reason}"),
        },
    }
    Ok(())
}

fn render_text(result: &ExtractionResult) -> String {
    let mut out = format!(
        "Method:  {}\nRows:    {}\nColumns: {}\n\nColumn mapping:\n",
        result.extraction_method,
        result.row_count,
        result.table.width()
    );
    for (index, header) in result.table.raw_headers.iter().enumerate() {
        let field = result.column_mapping.field_for(index).unwrap_or("-");
        out.push_str(&format!("  [{index:>2}] {header:<30} {field}\n"));
    }
    out
}

fn print_rules(rules: &RuleSet) {
    for rule in rules.rules() {
        match rule.exclude() {
            Some(exclude) => println!(
                "{:>4}  {:<14} {}  (not {})",
                rule.priority(),
                rule.field(),
                rule.pattern(),
                exclude
            ),
            None => println!("{:>4}  {:<14} {}", rule.priority(), rule.field(), rule.pattern()),
        }
    }
    println!("      (then: garantierte miete, by sample value)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(None).unwrap(), OutputFormat::Json);
        assert_eq!(resolve_format(Some("TEXT")).unwrap(), OutputFormat::Text);
        assert!(resolve_format(Some("yaml")).is_err());
    }

    #[test]
    fn test_display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/tmp/uploads/preisliste.xlsx")), "preisliste.xlsx");
    }

    #[test]
    fn test_render_text_lists_mapping() {
        let table = tabex_backend::CsvBackend::new()
            .parse_str("Whg;Notiz;Kaufpreis\n1;ruhig;149900")
            .unwrap();
        let result = TabularExtractor::new()
            .extract_local(b"Whg;Notiz;Kaufpreis\n1;ruhig;149900", tabex_core::InputFormat::Csv)
            .unwrap();
        assert_eq!(result.table, table);

        let text = render_text(&result);
        assert!(text.contains("direct-csv"));
        assert!(text.contains("Kaufpreis"));
        assert!(text.contains("price"));
        assert!(text.lines().any(|l| l.contains("Notiz") && l.trim_end().ends_with('-')));
    }

    #[test]
    fn test_cli_parses_extract() {
        let cli = Cli::try_parse_from(["tabex", "extract", "liste.csv", "--format", "text", "--hint", "Bestand"])
            .unwrap();
        match cli.command {
            Commands::Extract { file, hint, format, mime } => {
                assert_eq!(file, PathBuf::from("liste.csv"));
                assert_eq!(hint.as_deref(), Some("Bestand"));
                assert_eq!(format, Some(OutputFormat::Text));
                assert!(mime.is_empty());
            }
            _ => panic!("Expected extract command"),
        }
    }

    #[test]
    fn test_build_extractor_carries_hint() {
        let config = Config::parse("[extract]\nhint = \"Neubau\"").unwrap();
        let extractor = build_extractor(&config);
        assert_eq!(extractor.options().hint.as_deref(), Some("Neubau"));
    }
}
