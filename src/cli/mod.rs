use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use adesao::submission::SubmissionMode;

#[derive(Parser)]
#[command(name = "adesao")]
#[command(
    version,
    about = "Company benefits enrollment: roster import, validation and submission"
)]
#[command(
    long_about = "Enroll a company and its employees into the benefits plan: validate company data against the tax registry, build the employee roster by hand or from a spreadsheet, and e-mail the enrollment to the back office."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the roster session file
    #[arg(long, global = true, default_value = "colaboradores.json")]
    pub roster: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import employees from a spreadsheet and merge them into the roster
    Import {
        /// Path to the .xlsx or .xls file
        file: PathBuf,

        /// Preview only, don't save the merged roster
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Add one employee to the roster
    Add {
        /// Full name
        #[arg(long)]
        name: String,

        /// CPF (masked or digits only)
        #[arg(long)]
        cpf: String,

        /// Birth date (DD/MM/YYYY, or bare digits)
        #[arg(long)]
        birth_date: String,

        /// Mother's name (optional)
        #[arg(long, default_value = "")]
        mother_name: String,
    },

    /// Remove an employee by its position in `show`
    Remove {
        /// 1-based position
        position: usize,
    },

    /// Show the current roster
    Show,

    /// Write the model spreadsheet to fill in and re-import
    Template {
        /// Output path for the .xlsx file
        #[arg(default_value = "modelo_colaboradores.xlsx")]
        output: PathBuf,
    },

    /// Query the company registry for a CNPJ
    Lookup {
        /// CNPJ (masked or digits only)
        cnpj: String,

        /// Company JSON file to enrich with the result
        #[arg(long)]
        company: Option<PathBuf>,
    },

    /// Validate everything and e-mail the enrollment to the back office
    Submit {
        /// Company JSON file
        #[arg(long)]
        company: PathBuf,

        /// How the employee list travels
        #[arg(long, value_enum, default_value = "form")]
        mode: ModeArg,

        /// Attachment for the pdf/excel modes
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Employee list rendered into the e-mail body
    Form,
    /// Forward a PDF attachment without reading it
    Pdf,
    /// Forward a spreadsheet attachment without reading it
    Excel,
}

impl ModeArg {
    pub fn submission_mode(self) -> SubmissionMode {
        match self {
            ModeArg::Form => SubmissionMode::Form,
            ModeArg::Pdf => SubmissionMode::Pdf,
            ModeArg::Excel => SubmissionMode::Spreadsheet,
        }
    }
}
