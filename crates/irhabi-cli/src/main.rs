use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use irhabi_core::Validation;
use irhabi_core::common::{decrypt, encrypt, password_hash};
use irhabi_core::env;
use irhabi_docs::{MongoConfig, MongoVersionStore, VersionStore};
use irhabi_mailer::{Mailer, MailerConfig, Templates};
use irhabi_server::JwtKey;

/// Longest token lifetime `token --hours` accepts (100 years).
const MAX_TOKEN_HOURS: i64 = 24 * 365 * 100;

#[derive(Parser)]
#[command(name = "irhabi", version, about = "Tools for irhabi services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a bearer token for a user id
    Token {
        /// User id stored in the `id` claim
        #[arg(long)]
        id: i64,

        /// Signing secret
        #[arg(long, env = "APP_JWT_SECRET", hide_env_values = true)]
        secret: String,

        /// Lifetime in hours
        #[arg(long, default_value_t = 72, value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_HOURS))]
        hours: i64,
    },

    /// Hash a password with bcrypt
    HashPassword {
        password: String,
    },

    /// Obfuscate a numeric id for use in URLs
    EncryptId {
        id: i64,
    },

    /// Recover a numeric id from its obfuscated form
    DecryptId {
        value: String,
    },

    /// Check a value against a rule string, e.g. "required|email"
    Validate {
        /// Rules separated by `|`
        #[arg(short, long)]
        rules: String,

        value: String,
    },

    /// Send an email through the configured SMTP server
    SendMail {
        /// Recipient; repeat for several
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        cc: Vec<String>,

        #[arg(short, long)]
        subject: String,

        /// Plain-text body
        #[arg(long, conflicts_with = "template")]
        body: Option<String>,

        /// HTML template name, e.g. "welcome.html"
        #[arg(long, requires = "data")]
        template: Option<String>,

        /// Template data as a JSON object
        #[arg(long)]
        data: Option<String>,

        /// Template directory (defaults to EMAIL_TEMPLATE_DIR)
        #[arg(long)]
        templates: Option<PathBuf>,

        /// File to attach; repeat for several
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Show the stored versions of a document
    History {
        /// Record type, e.g. "invoice"
        #[arg(short = 't', long)]
        doc_type: String,

        #[arg(long)]
        id: i64,

        /// A single version; 0 shows the latest
        #[arg(short, long)]
        version: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("irhabi=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    env::load();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { id, secret, hours } => {
            let ttl = Duration::try_hours(hours).context("--hours is out of range")?;
            let token =
                JwtKey::from_secret(secret.as_bytes()).issue("id", serde_json::json!(id), ttl)?;
            println!("{token}");
        }
        Commands::HashPassword { password } => println!("{}", password_hash(&password)?),
        Commands::EncryptId { id } => println!("{}", encrypt(id)),
        Commands::DecryptId { value } => println!("{}", decrypt(&value)?),
        Commands::Validate { rules, value } => cmd_validate(&rules, &value)?,
        Commands::SendMail {
            to,
            cc,
            subject,
            body,
            template,
            data,
            templates,
            attach,
        } => {
            let content = match (body, template) {
                (Some(body), _) => Content::Text(body),
                (None, Some(name)) => Content::Template {
                    name,
                    data: data.unwrap_or_default(),
                    dir: templates,
                },
                (None, None) => bail!("either --body or --template is required"),
            };
            cmd_send_mail(to, cc, &subject, content, attach).await?;
        }
        Commands::History {
            doc_type,
            id,
            version,
        } => cmd_history(&doc_type, id, version).await?,
    }

    Ok(())
}

fn cmd_validate(rules: &str, value: &str) -> Result<()> {
    match Validation::global().field(value, rules) {
        None => bail!("no known rule in '{rules}'"),
        Some(out) if out.is_valid() => println!("ok"),
        Some(out) => {
            let rule = out.tag().unwrap_or("?");
            let message = out.first_message().unwrap_or("invalid");
            println!("{rule}: {message}");
            std::process::exit(1);
        }
    }
    Ok(())
}

enum Content {
    Text(String),
    Template {
        name: String,
        data: String,
        dir: Option<PathBuf>,
    },
}

async fn cmd_send_mail(
    to: Vec<String>,
    cc: Vec<String>,
    subject: &str,
    content: Content,
    attach: Vec<PathBuf>,
) -> Result<()> {
    let config = MailerConfig::from_env();
    let mailer = Mailer::smtp(&config)?;

    let mut message = mailer.message();
    message.to(to).cc(cc).subject(subject);

    match content {
        Content::Text(body) => {
            message.set_body("text/plain", body);
        }
        Content::Template { name, data, dir } => {
            let dir = dir
                .or(config.template_dir)
                .context("--templates or EMAIL_TEMPLATE_DIR is required for --template")?;
            let data: serde_json::Value =
                serde_json::from_str(&data).context("--data must be a JSON object")?;
            let html = Templates::load(&dir)?.render(&name, &data)?;
            message.set_body("text/html", html);
        }
    }

    for path in &attach {
        message.attach(path, None);
    }

    mailer.send(&message).await?;
    println!("sent to {}", message.recipients().join(", "));
    Ok(())
}

async fn cmd_history(doc_type: &str, id: i64, version: Option<i64>) -> Result<()> {
    let store = MongoVersionStore::connect(&MongoConfig::versioning_from_env()).await?;

    let docs = match version {
        Some(v) => vec![store.show(doc_type, id, Some(v)).await?],
        None => store.history(doc_type, id).await?,
    };

    if docs.is_empty() {
        println!("No versions stored for {doc_type}/{id}.");
        return Ok(());
    }

    for doc in docs {
        println!("--- v{} ({})", doc.version, doc.stored_at.to_rfc3339());
        println!("updated by: {}", doc.updated_by);
        println!("{}", serde_json::to_string_pretty(&doc.data)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_mail_requires_recipient() {
        let parsed = Cli::try_parse_from(["irhabi", "send-mail", "--subject", "Hi", "--body", "x"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "irhabi", "send-mail", "--to", "a@example.com", "--to", "b@example.com", "-s", "Hi",
            "--body", "x",
        ])
        .unwrap();
        match parsed.command {
            Commands::SendMail { to, .. } => assert_eq!(to.len(), 2),
            _ => panic!("expected send-mail"),
        }
    }

    #[test]
    fn test_template_needs_data() {
        let parsed = Cli::try_parse_from([
            "irhabi", "send-mail", "--to", "a@example.com", "-s", "Hi", "--template", "x.html",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_token_hours_bounds() {
        let parse = |hours: &str| {
            Cli::try_parse_from(["irhabi", "token", "--id", "1", "--secret", "s", "--hours", hours])
        };
        assert!(parse("72").is_ok());
        assert!(parse("0").is_err());
        assert!(parse("-5").is_err());
        assert!(parse("9223372036854775807").is_err());

        let max = MAX_TOKEN_HOURS.to_string();
        match parse(&max).unwrap().command {
            Commands::Token { hours, .. } => assert!(Duration::try_hours(hours).is_some()),
            _ => panic!("expected token"),
        }
    }

    #[test]
    fn test_history_args() {
        let parsed =
            Cli::try_parse_from(["irhabi", "history", "-t", "invoice", "--id", "7", "-v", "2"])
                .unwrap();
        match parsed.command {
            Commands::History {
                doc_type,
                id,
                version,
            } => {
                assert_eq!(doc_type, "invoice");
                assert_eq!(id, 7);
                assert_eq!(version, Some(2));
            }
            _ => panic!("expected history"),
        }
    }
}
