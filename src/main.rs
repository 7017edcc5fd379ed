mod cli;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;

use adesao::config::Config;
use adesao::documents::validate_cnpj;
use adesao::importers::{self, ImportError};
use adesao::models::{Company, Employee};
use adesao::registry::{EnrichmentSession, RegistryClient, RegistryError, RegistryInfo};
use adesao::report;
use adesao::roster::{self, Roster};
use adesao::submission::{self, AttachmentFile, SubmissionError};
use adesao::template;

use cli::{Cli, Commands, ModeArg};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Import { file, dry_run } => handle_import(&cli.roster, &file, dry_run),

        Commands::Add {
            name,
            cpf,
            birth_date,
            mother_name,
        } => handle_add(&cli.roster, name, cpf, birth_date, mother_name),

        Commands::Remove { position } => handle_remove(&cli.roster, position),

        Commands::Show => handle_show(&cli.roster),

        Commands::Template { output } => {
            template::write_roster_template(&output)?;
            println!(
                "{} Template written to {:?}",
                "✓".green().bold(),
                output
            );
            Ok(())
        }

        Commands::Lookup { cnpj, company } => {
            handle_lookup(cli.config.as_deref(), &cnpj, company.as_deref()).await
        }

        Commands::Submit {
            company,
            mode,
            attachment,
        } => {
            handle_submit(
                cli.config.as_deref(),
                &cli.roster,
                &company,
                mode,
                attachment.as_deref(),
            )
            .await
        }
    }
}

/// Handle the import command: read, validate, merge, report, persist.
fn handle_import(roster_path: &Path, file: &Path, dry_run: bool) -> Result<()> {
    let current = Roster::load(roster_path)?;

    let import = match importers::import_roster_file(file) {
        Ok(import) => import,
        Err(ImportError::NoValidRows { rejected }) => {
            println!("{} No valid rows found. Problems:", "✗".red().bold());
            for row in &rejected {
                println!("  {}", row.describe());
            }
            bail!("import aborted, roster unchanged");
        }
        Err(e) => return Err(e).context("import aborted, roster unchanged"),
    };

    let outcome = roster::merge(&current, import.accepted);

    println!("\n{}", report::format_import_report(&outcome, &import.rejected));
    println!();
    print_roster_table(&outcome.roster);

    if dry_run {
        println!("\n{} Dry run - roster not saved", "ℹ".blue().bold());
        return Ok(());
    }

    outcome.roster.save(roster_path)?;
    println!(
        "\n{} Roster saved to {:?} ({} employees)",
        "✓".green().bold(),
        roster_path,
        outcome.roster.employees.len()
    );
    Ok(())
}

fn handle_add(
    roster_path: &Path,
    name: String,
    cpf: String,
    birth_date: String,
    mother_name: String,
) -> Result<()> {
    let mut roster = Roster::load(roster_path)?;
    let added = roster.add(Employee {
        name,
        cpf,
        birth_date,
        mother_name,
    })?;
    roster.save(roster_path)?;

    println!(
        "{} Added {} ({})",
        "✓".green().bold(),
        added.name,
        added.cpf
    );
    print_roster_table(&roster);
    Ok(())
}

fn handle_remove(roster_path: &Path, position: usize) -> Result<()> {
    let mut roster = Roster::load(roster_path)?;
    let removed = roster.remove(position)?;
    roster.save(roster_path)?;

    println!("{} Removed {}", "✓".green().bold(), removed.name);
    print_roster_table(&roster);
    Ok(())
}

fn handle_show(roster_path: &Path) -> Result<()> {
    let roster = Roster::load(roster_path)?;
    if roster.is_placeholder_only() {
        println!("Roster is empty. Use `adesao add` or `adesao import` to fill it.");
        return Ok(());
    }
    print_roster_table(&roster);
    Ok(())
}

/// Handle the lookup command, optionally enriching a company file.
async fn handle_lookup(
    config_path: Option<&Path>,
    cnpj: &str,
    company_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;

    // the registry is only consulted for checksum-valid CNPJs
    if !validate_cnpj(cnpj) {
        bail!("invalid CNPJ: {}", cnpj);
    }

    let client = RegistryClient::new();
    let info = match client.lookup(cnpj).await {
        Ok(info) => info,
        Err(RegistryError::Unavailable) => {
            let defaults = RegistryInfo {
                legal_name: None,
                city: config.defaults.city.clone(),
                state: config.defaults.state.clone(),
                postal_code: None,
            };
            if defaults.city.is_none() && defaults.state.is_none() {
                bail!("company registry unavailable, try again later");
            }
            println!(
                "{} Registry unavailable, using configured regional defaults",
                "ℹ".blue().bold()
            );
            defaults
        }
        Err(e) => return Err(e.into()),
    };

    println!("Legal name:  {}", info.legal_name.as_deref().unwrap_or("-"));
    println!("City:        {}", info.city.as_deref().unwrap_or("-"));
    println!("State:       {}", info.state.as_deref().unwrap_or("-"));
    println!("Postal code: {}", info.postal_code.as_deref().unwrap_or("-"));

    if let Some(path) = company_path {
        let mut company = load_company(path)?;
        let session = EnrichmentSession::new();
        let guard = session.begin();
        if guard.apply(&mut company, &info) {
            save_company(path, &company)?;
            println!(
                "{} Company file {:?} enriched",
                "✓".green().bold(),
                path
            );
        }
    }

    Ok(())
}

/// Handle the submit command: gate, validate, deliver.
async fn handle_submit(
    config_path: Option<&Path>,
    roster_path: &Path,
    company_path: &Path,
    mode: ModeArg,
    attachment_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let company = load_company(company_path)?;
    let roster = Roster::load(roster_path)?;

    let employees: Vec<Employee> = if roster.is_placeholder_only() {
        Vec::new()
    } else {
        roster.employees.clone()
    };

    let attachment = match attachment_path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read attachment {:?}", path))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("anexo")
                .to_string();
            Some(AttachmentFile {
                media_type: submission::guess_media_type(&filename).to_string(),
                filename,
                bytes,
            })
        }
        None => None,
    };

    let result = submission::send_submission(
        &config,
        &company,
        &employees,
        mode.submission_mode(),
        attachment,
        Utc::now(),
    )
    .await;

    match result {
        Ok(receipt) => {
            println!(
                "{} Enrollment submitted ({})",
                "✓".green().bold(),
                receipt
            );
            Ok(())
        }
        Err(SubmissionError::OutsideBusinessHours(notice)) => {
            println!("{} {}", "✗".red().bold(), notice);
            bail!("submission rejected");
        }
        Err(e) => Err(e.into()),
    }
}

fn load_company(path: &Path) -> Result<Company> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read company file {:?}", path))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse company file {:?}", path))
}

fn save_company(path: &Path, company: &Company) -> Result<()> {
    let text = serde_json::to_string_pretty(company).context("failed to serialize company")?;
    fs::write(path, text).with_context(|| format!("failed to write company file {:?}", path))
}

fn print_roster_table(roster: &Roster) {
    use tabled::{settings::Style, Table, Tabled};

    #[derive(Tabled)]
    struct EmployeeRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "CPF")]
        cpf: String,
        #[tabled(rename = "Birth date")]
        birth_date: String,
        #[tabled(rename = "Mother's name")]
        mother_name: String,
        #[tabled(rename = "Complete")]
        complete: String,
    }

    let rows: Vec<EmployeeRow> = roster
        .employees
        .iter()
        .enumerate()
        .map(|(i, e)| EmployeeRow {
            position: i + 1,
            name: e.name.clone(),
            cpf: e.cpf.clone(),
            birth_date: e.birth_date.clone(),
            mother_name: e.mother_name.clone(),
            complete: if e.is_complete() {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            },
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}
