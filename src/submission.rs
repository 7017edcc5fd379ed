//! Submission: turning an enrollment into the back-office e-mail
//!
//! Three modes mirror the form: `Form` puts the employee table in the
//! message body; `Pdf` and `Spreadsheet` forward an opaque attachment
//! without reading it. Every precondition (business hours, company
//! validity, attachment size and type) is checked before anything leaves
//! the machine, and delivery failures are surfaced verbatim with no retry —
//! the user resubmits.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::{Company, Employee};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const EXCEL_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

/// How the employee list travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Employees rendered into the e-mail body.
    Form,
    /// Opaque PDF attachment, content never read.
    Pdf,
    /// Opaque spreadsheet attachment, content never read.
    Spreadsheet,
}

/// An attachment as handed to the submission: bytes plus the metadata the
/// acceptance rules look at.
#[derive(Debug, Clone)]
pub struct AttachmentFile {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("outside business hours: {0}")]
    OutsideBusinessHours(String),

    #[error("invalid company data: {0}")]
    InvalidCompany(String),

    #[error("incomplete employee records at positions {0}")]
    IncompleteRoster(String),

    #[error("this mode requires an attachment")]
    MissingAttachment,

    #[error("attachment is {actual_mb:.1} MB; the limit is {limit_mb} MB")]
    AttachmentTooLarge { actual_mb: f64, limit_mb: u64 },

    #[error("attachment must be a PDF")]
    NotAPdf,

    #[error("attachment must be a .xlsx or .xls file")]
    NotASpreadsheet,

    #[error("invalid mail address: {0}")]
    BadAddress(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Map a filename to the media type the submission rules expect. The
/// browser original trusted the upload's declared type; on the CLI the
/// extension is all we have.
pub fn guess_media_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".pdf") {
        PDF_MEDIA_TYPE
    } else if lower.ends_with(".xlsx") {
        EXCEL_MEDIA_TYPES[0]
    } else if lower.ends_with(".xls") {
        EXCEL_MEDIA_TYPES[1]
    } else {
        "application/octet-stream"
    }
}

/// Minimal HTML escaping for text interpolated into the e-mail body.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Time-of-day greeting, Brazilian style.
pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Bom dia"
    } else if hour < 18 {
        "Boa tarde"
    } else {
        "Boa noite"
    }
}

/// Render the e-mail body: greeting, hand-off text, company table and
/// either the employee table or a note that the list travels as an
/// attachment.
pub fn render_email_html(company: &Company, employees: &[Employee], local_hour: u32) -> String {
    let mut html = String::new();
    html.push_str("<div style=\"font-family:Arial,sans-serif;font-size:14px;color:#111\">\n");
    html.push_str(&format!("<p>{} a todos,</p>\n", greeting(local_hour)));

    let contact = if company.contact_name.trim().is_empty() {
        "Atendimento".to_string()
    } else {
        html_escape(&company.contact_name)
    };
    html.push_str(&format!("<p>{contact}, obrigado pelo envio dos dados.</p>\n"));
    html.push_str(
        "<p>A equipe em cópia irá realizar o cadastro da empresa e encaminhar o boleto de adesão.</p>\n",
    );

    html.push_str("<h3>Empresa</h3>\n<table cellpadding=\"6\" cellspacing=\"0\" style=\"border-collapse:collapse;border:1px solid #eee\">\n");
    push_row(&mut html, "Razão Social", &company.legal_name);
    push_row(&mut html, "CNPJ", &company.cnpj);
    push_row(&mut html, "E-mail", &company.email);
    if !company.phone.is_empty() {
        push_row(&mut html, "Telefone", &company.phone);
    }
    let city_state = [company.city.as_str(), company.state.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" - ");
    if !city_state.is_empty() {
        push_row(&mut html, "Cidade/UF", &city_state);
    }
    if !company.postal_code.is_empty() {
        push_row(&mut html, "CEP", &company.postal_code);
    }
    if !company.contact_name.is_empty() {
        push_row(&mut html, "Atendente", &company.contact_name);
    }
    html.push_str("</table>\n");

    if employees.is_empty() {
        html.push_str("<p><em>Nenhum colaborador listado (anexo).</em></p>\n");
    } else {
        html.push_str(&format!("<h3>Colaboradores ({})</h3>\n", employees.len()));
        html.push_str("<table cellpadding=\"6\" cellspacing=\"0\" style=\"border-collapse:collapse;border:1px solid #eee\">\n");
        html.push_str("<tr><th align=\"left\">Nome</th><th align=\"left\">CPF</th><th align=\"left\">Nascimento</th><th align=\"left\">Mãe</th></tr>\n");
        for employee in employees {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&employee.name),
                html_escape(&employee.cpf),
                html_escape(&employee.birth_date),
                html_escape(&employee.mother_name),
            ));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</div>");
    html
}

fn push_row(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "<tr><td><b>{}</b></td><td>{}</td></tr>\n",
        label,
        html_escape(value)
    ));
}

/// Check every precondition without touching the network. On success the
/// attachment (when the mode wants one) is considered deliverable as-is.
pub fn validate_submission(
    config: &Config,
    company: &Company,
    employees: &[Employee],
    mode: SubmissionMode,
    attachment: Option<&AttachmentFile>,
    now: DateTime<Utc>,
) -> Result<(), SubmissionError> {
    let hours = config.hours.business_hours();
    if !hours.is_open_at(now) {
        return Err(SubmissionError::OutsideBusinessHours(hours.closed_notice()));
    }

    let company_errors = company.validate();
    if !company_errors.is_empty() {
        return Err(SubmissionError::InvalidCompany(company_errors.join("; ")));
    }

    match mode {
        SubmissionMode::Form => {
            let incomplete: Vec<String> = employees
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.is_complete())
                .map(|(i, _)| (i + 1).to_string())
                .collect();
            if !incomplete.is_empty() {
                return Err(SubmissionError::IncompleteRoster(incomplete.join(", ")));
            }
        }
        SubmissionMode::Pdf => {
            let attachment = attachment.ok_or(SubmissionError::MissingAttachment)?;
            if attachment.media_type != PDF_MEDIA_TYPE {
                return Err(SubmissionError::NotAPdf);
            }
            check_size(attachment, config)?;
        }
        SubmissionMode::Spreadsheet => {
            let attachment = attachment.ok_or(SubmissionError::MissingAttachment)?;
            let name = attachment.filename.to_lowercase();
            let ok_extension = name.ends_with(".xlsx") || name.ends_with(".xls");
            let ok_media = EXCEL_MEDIA_TYPES.contains(&attachment.media_type.as_str());
            if !ok_extension && !ok_media {
                return Err(SubmissionError::NotASpreadsheet);
            }
            check_size(attachment, config)?;
        }
    }

    Ok(())
}

fn check_size(attachment: &AttachmentFile, config: &Config) -> Result<(), SubmissionError> {
    let limit = config.max_attachment_bytes();
    if attachment.bytes.len() as u64 > limit {
        return Err(SubmissionError::AttachmentTooLarge {
            actual_mb: attachment.bytes.len() as f64 / 1024.0 / 1024.0,
            limit_mb: config.limits.max_attachment_mb,
        });
    }
    Ok(())
}

/// Build the outgoing message. Separate from delivery so it can be
/// exercised without an SMTP server.
pub fn build_message(
    config: &Config,
    company: &Company,
    employees: &[Employee],
    mode: SubmissionMode,
    attachment: Option<&AttachmentFile>,
    local_hour: u32,
) -> Result<Message, SubmissionError> {
    let subject = match mode {
        SubmissionMode::Form => format!(
            "Adesão ({}) – {} colaborador(es)",
            company.legal_name,
            employees.len()
        ),
        SubmissionMode::Pdf => format!("Adesão ({}) – PDF de colaboradores", company.legal_name),
        SubmissionMode::Spreadsheet => {
            format!("Adesão ({}) – Excel de colaboradores", company.legal_name)
        }
    };

    // attachment modes never render the list into the body
    let body_employees = match mode {
        SubmissionMode::Form => employees,
        _ => &[],
    };
    let html = render_email_html(company, body_employees, local_hour);

    let mut builder = Message::builder()
        .from(parse_mailbox(&config.mail.from)?)
        .subject(subject);

    // with no configured recipients the enrollment goes back to the company
    if config.mail.to.is_empty() {
        builder = builder.to(parse_mailbox(&company.email)?);
    } else {
        for to in &config.mail.to {
            builder = builder.to(parse_mailbox(to)?);
        }
    }
    for cc in &config.mail.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }

    let html_part = SinglePart::builder()
        .header(ContentType::TEXT_HTML)
        .body(html);

    let message = match attachment {
        Some(file) => {
            // fall back to the extension-derived type when none was declared
            let declared = if file.media_type.is_empty() {
                guess_media_type(&file.filename).to_string()
            } else {
                file.media_type.clone()
            };
            let content_type = declared
                .parse::<ContentType>()
                .or_else(|_| "application/octet-stream".parse::<ContentType>())
                .map_err(|e| {
                    SubmissionError::Delivery(format!("bad attachment content type: {e}"))
                })?;
            let attachment_part =
                Attachment::new(file.filename.clone()).body(file.bytes.clone(), content_type);
            builder
                .multipart(MultiPart::mixed().singlepart(html_part).singlepart(attachment_part))
        }
        None => builder.singlepart(html_part),
    }
    .map_err(|e| SubmissionError::Delivery(e.to_string()))?;

    Ok(message)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SubmissionError> {
    address
        .parse()
        .map_err(|_| SubmissionError::BadAddress(address.to_string()))
}

/// Validate, build and deliver the enrollment e-mail. Returns the SMTP
/// response text as the delivery identifier.
pub async fn send_submission(
    config: &Config,
    company: &Company,
    employees: &[Employee],
    mode: SubmissionMode,
    attachment: Option<AttachmentFile>,
    now: DateTime<Utc>,
) -> Result<String, SubmissionError> {
    validate_submission(config, company, employees, mode, attachment.as_ref(), now)?;

    let local_hour = local_hour_at(config.hours.utc_offset_hours, now);
    let message = build_message(config, company, employees, mode, attachment.as_ref(), local_hour)?;

    if config.smtp.host.is_empty() {
        return Err(SubmissionError::Delivery(
            "SMTP host is not configured".to_string(),
        ));
    }

    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.host)
            .map_err(|e| SubmissionError::Delivery(e.to_string()))?
            .port(config.smtp.port)
            .credentials(Credentials::new(
                config.smtp.user.clone(),
                config.smtp.password.clone(),
            ))
            .build();

    let response = mailer
        .send(message)
        .await
        .map_err(|e| SubmissionError::Delivery(e.to_string()))?;

    let receipt = response.message().collect::<Vec<_>>().join(" ");
    let receipt = if receipt.is_empty() {
        "accepted".to_string()
    } else {
        receipt
    };
    info!("submission delivered: {}", receipt);
    Ok(receipt)
}

fn local_hour_at(utc_offset_hours: i32, now: DateTime<Utc>) -> u32 {
    FixedOffset::east_opt(utc_offset_hours * 3600)
        .map(|offset| now.with_timezone(&offset).hour())
        .unwrap_or_else(|| now.hour())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn open_instant() -> DateTime<Utc> {
        // Wednesday 14:00 UTC = 11:00 in Brasília
        Utc.with_ymd_and_hms(2024, 6, 5, 14, 0, 0).unwrap()
    }

    fn closed_instant() -> DateTime<Utc> {
        // Saturday
        Utc.with_ymd_and_hms(2024, 6, 8, 14, 0, 0).unwrap()
    }

    fn company() -> Company {
        Company {
            legal_name: "ACME LTDA".to_string(),
            cnpj: "11.222.333/0001-81".to_string(),
            email: "contato@empresa.com.br".to_string(),
            phone: "(11) 99999-9999".to_string(),
            city: "Campinas".to_string(),
            state: "SP".to_string(),
            postal_code: String::new(),
            contact_name: "Ana".to_string(),
        }
    }

    fn complete_employee() -> Employee {
        Employee {
            name: "JOÃO DA SILVA".to_string(),
            cpf: "529.982.247-25".to_string(),
            birth_date: "01/02/1990".to_string(),
            mother_name: String::new(),
        }
    }

    fn pdf_attachment(len: usize) -> AttachmentFile {
        AttachmentFile {
            filename: "colaboradores.pdf".to_string(),
            media_type: PDF_MEDIA_TYPE.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_greeting_by_hour() {
        assert_eq!(greeting(7), "Bom dia");
        assert_eq!(greeting(11), "Bom dia");
        assert_eq!(greeting(12), "Boa tarde");
        assert_eq!(greeting(17), "Boa tarde");
        assert_eq!(greeting(18), "Boa noite");
        assert_eq!(greeting(23), "Boa noite");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"A&B"</b>'x'"#),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;x&#39;"
        );
    }

    #[test]
    fn test_render_escapes_and_lists_employees() {
        let mut company = company();
        company.legal_name = "ACME <&> LTDA".to_string();
        let html = render_email_html(&company, &[complete_employee()], 9);

        assert!(html.contains("Bom dia a todos,"));
        assert!(html.contains("ACME &lt;&amp;&gt; LTDA"));
        assert!(html.contains("Colaboradores (1)"));
        assert!(html.contains("JOÃO DA SILVA"));
        assert!(html.contains("Cidade/UF"));
        assert!(html.contains("Campinas - SP"));
    }

    #[test]
    fn test_render_attachment_note_when_no_employees() {
        let html = render_email_html(&company(), &[], 15);
        assert!(html.contains("Boa tarde a todos,"));
        assert!(html.contains("Nenhum colaborador listado (anexo)."));
        assert!(!html.contains("Colaboradores ("));
    }

    #[test]
    fn test_gate_rejects_outside_business_hours() {
        let err = validate_submission(
            &Config::default(),
            &company(),
            &[],
            SubmissionMode::Form,
            None,
            closed_instant(),
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::OutsideBusinessHours(_)));
    }

    #[test]
    fn test_invalid_company_is_reported_in_full() {
        let err = validate_submission(
            &Config::default(),
            &Company::default(),
            &[],
            SubmissionMode::Form,
            None,
            open_instant(),
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("invalid CNPJ"));
        assert!(text.contains("legal name is required"));
    }

    #[test]
    fn test_form_mode_requires_complete_employees() {
        let mut incomplete = complete_employee();
        incomplete.birth_date = String::new();
        let err = validate_submission(
            &Config::default(),
            &company(),
            &[complete_employee(), incomplete],
            SubmissionMode::Form,
            None,
            open_instant(),
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::IncompleteRoster(ref p) if p == "2"));
    }

    #[test]
    fn test_pdf_mode_rules() {
        let config = Config::default();
        let company = company();

        let err = validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Pdf,
            None,
            open_instant(),
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::MissingAttachment));

        let mut wrong_type = pdf_attachment(10);
        wrong_type.media_type = "text/plain".to_string();
        let err = validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Pdf,
            Some(&wrong_type),
            open_instant(),
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::NotAPdf));

        let too_large = pdf_attachment(11 * 1024 * 1024);
        let err = validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Pdf,
            Some(&too_large),
            open_instant(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::AttachmentTooLarge { limit_mb: 10, .. }
        ));

        assert!(validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Pdf,
            Some(&pdf_attachment(1024)),
            open_instant(),
        )
        .is_ok());
    }

    #[test]
    fn test_spreadsheet_accepted_by_extension_or_media_type() {
        let config = Config::default();
        let company = company();

        let by_extension = AttachmentFile {
            filename: "lista.XLSX".to_string(),
            media_type: String::new(),
            bytes: vec![0u8; 16],
        };
        assert!(validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Spreadsheet,
            Some(&by_extension),
            open_instant(),
        )
        .is_ok());

        let by_media_type = AttachmentFile {
            filename: "lista.bin".to_string(),
            media_type: EXCEL_MEDIA_TYPES[1].to_string(),
            bytes: vec![0u8; 16],
        };
        assert!(validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Spreadsheet,
            Some(&by_media_type),
            open_instant(),
        )
        .is_ok());

        let neither = AttachmentFile {
            filename: "lista.csv".to_string(),
            media_type: "text/csv".to_string(),
            bytes: vec![0u8; 16],
        };
        let err = validate_submission(
            &config,
            &company,
            &[],
            SubmissionMode::Spreadsheet,
            Some(&neither),
            open_instant(),
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::NotASpreadsheet));
    }

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type("lista.pdf"), PDF_MEDIA_TYPE);
        assert_eq!(guess_media_type("Lista.XLSX"), EXCEL_MEDIA_TYPES[0]);
        assert_eq!(guess_media_type("lista.xls"), EXCEL_MEDIA_TYPES[1]);
        assert_eq!(guess_media_type("lista.txt"), "application/octet-stream");
    }

    #[test]
    fn test_build_message_form_mode() {
        let message = build_message(
            &Config::default(),
            &company(),
            &[complete_employee()],
            SubmissionMode::Form,
            None,
            9,
        )
        .unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
        // falls back to the company's own address when no recipients are set
        assert!(formatted.contains("contato@empresa.com.br"));
        assert!(formatted.contains("text/html"));
        assert!(!formatted.contains("multipart/mixed"));
    }

    #[test]
    fn test_build_message_with_attachment() {
        let message = build_message(
            &Config::default(),
            &company(),
            &[],
            SubmissionMode::Pdf,
            Some(&pdf_attachment(32)),
            15,
        )
        .unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("colaboradores.pdf"));
    }

    #[test]
    fn test_bad_from_address() {
        let mut config = Config::default();
        config.mail.from = "not an address".to_string();
        let err = build_message(
            &config,
            &company(),
            &[],
            SubmissionMode::Form,
            None,
            9,
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::BadAddress(_)));
    }
}
