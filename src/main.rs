use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, Password};
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

use qna_console::api::auth::RegisterRequest;
use qna_console::api::ApiClient;
use qna_console::auth::AuthSession;
use qna_console::models::{Role, UploadCandidate};
use qna_console::session::ChatSession;
use qna_console::store::CredentialStore;
use qna_console::validation::{format_file_size, media_type_for};

#[derive(Parser, Debug)]
#[command(version, about = "Terminal client for the AI document Q&A service")]
struct Args {
    /// Base URL of the backend API
    #[arg(long, env = "QNA_API_URL", default_value = "http://localhost:8000/api")]
    api_url: String,

    /// Directory holding the credential database (defaults to the platform
    /// data directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Probe the backend health endpoint and exit
    #[arg(long)]
    check: bool,

    /// Verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = Arc::new(ApiClient::new(&args.api_url));

    if args.check {
        match client.health().await {
            Ok(true) => println!("Backend is healthy"),
            _ => println!("Backend is unreachable"),
        }
        return Ok(());
    }

    let store = CredentialStore::new(&data_dir(&args)?)?;
    let mut auth = AuthSession::new(store);
    let mut session = ChatSession::new(client.clone());

    if !auth.resume(&client)? {
        sign_in(&client, &mut auth).await?;
    }

    // The first listing doubles as the token check; a 401 on a resumed
    // session drops back to the prompt.
    loop {
        match session.refresh_documents().await {
            Ok(()) => break,
            Err(err) if err.is_unauthorized() => {
                auth.invalidate(&client)?;
                println!("Session expired; please sign in again.");
                sign_in(&client, &mut auth).await?;
            }
            Err(err) => bail!("Could not reach the backend: {}", err),
        }
    }

    println!("AI-Powered Q&A console. Type /help for commands.");
    match session.selected() {
        Some(doc) => println!(
            "Selected document: {} ({}, {})",
            doc.title,
            doc.file_type.to_uppercase(),
            format_file_size(doc.file_size)
        ),
        None => println!("No documents yet; /upload <path> to add one."),
    }

    repl(&client, &mut auth, &mut session).await
}

async fn repl(
    client: &ApiClient,
    auth: &mut AuthSession,
    session: &mut ChatSession,
) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(rest) = line.strip_prefix('/') else {
            if session.selected().is_none() {
                println!("Upload or select a document first.");
                continue;
            }
            session.ask(line).await;
            print_latest_answer(session);
            continue;
        };

        let mut parts = rest.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim();
        match command {
            "help" => print_help(),
            "docs" => print_documents(session),
            "open" => match parse_index(arg, session.documents().len()) {
                Ok(index) => {
                    let doc = session.documents()[index].clone();
                    let label = format!(
                        "{} ({}, {})",
                        doc.title,
                        doc.file_type.to_uppercase(),
                        format_file_size(doc.file_size)
                    );
                    session.select_document(doc).await;
                    println!("Now chatting about {}", label);
                    print_transcript(session);
                }
                Err(message) => println!("{}", message),
            },
            "upload" => match stage_file(arg) {
                Ok(candidate) => {
                    session.upload_and_select(candidate).await;
                    match session.upload_error() {
                        Some(err) => println!("Upload failed: {}", err),
                        None => print_latest_answer(session),
                    }
                }
                Err(err) => println!("{}", err),
            },
            "delete" => match parse_index(arg, session.documents().len()) {
                Ok(index) => {
                    let doc = session.documents()[index].clone();
                    if Confirm::new()
                        .with_prompt("Delete this document?")
                        .default(false)
                        .interact()?
                    {
                        session.delete_document(&doc.id).await;
                        if session.documents().iter().any(|d| d.id == doc.id) {
                            println!("Delete failed; try again.");
                        } else {
                            println!("Deleted {}", doc.title);
                        }
                    }
                }
                Err(message) => println!("{}", message),
            },
            "clear" => {
                session.clear();
                println!("Chat cleared.");
            }
            "logout" => {
                auth.logout(client)?;
                println!("Signed out.");
                break;
            }
            "quit" | "exit" => break,
            other => println!("Unknown command: /{}", other),
        }
    }
    Ok(())
}

async fn sign_in(client: &ApiClient, auth: &mut AuthSession) -> Result<()> {
    loop {
        let choice: String = Input::new()
            .with_prompt("login or register")
            .default("login".into())
            .interact_text()?;

        let result = if choice.trim().eq_ignore_ascii_case("register") {
            let username: String = Input::new().with_prompt("Username").interact_text()?;
            let email: String = Input::new()
                .with_prompt("Email")
                .allow_empty(true)
                .interact_text()?;
            let password = Password::new().with_prompt("Password").interact()?;
            let password_confirm = Password::new().with_prompt("Confirm password").interact()?;
            let request = RegisterRequest {
                username,
                email,
                password,
                password_confirm,
                first_name: String::new(),
                last_name: String::new(),
            };
            auth.register(client, &request).await
        } else {
            let username: String = Input::new().with_prompt("Username").interact_text()?;
            let password = Password::new().with_prompt("Password").interact()?;
            auth.login(client, &username, &password).await
        };

        match result {
            Ok(()) => {
                if let Some(user) = auth.user() {
                    println!("Signed in as {}", user.username);
                }
                return Ok(());
            }
            Err(err) => println!("{}", err),
        }
    }
}

/// Read a local file into an upload candidate, inferring the declared media
/// type from its extension.
fn stage_file(path: &str) -> Result<UploadCandidate> {
    if path.is_empty() {
        bail!("Usage: /upload <path>");
    }
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let bytes = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let media_type = media_type_for(&name).to_string();
    Ok(UploadCandidate {
        name,
        media_type,
        bytes,
    })
}

fn data_dir(args: &Args) -> Result<PathBuf> {
    if let Some(dir) = &args.data_dir {
        return Ok(dir.clone());
    }
    let dirs = ProjectDirs::from("", "", "qna-console")
        .context("Could not determine a data directory; pass --data-dir")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn parse_index(arg: &str, len: usize) -> std::result::Result<usize, String> {
    if len == 0 {
        return Err("No documents uploaded yet.".to_string());
    }
    let message = format!("Expected a document number between 1 and {}", len);
    let n: usize = arg.parse().map_err(|_| message.clone())?;
    if n == 0 || n > len {
        return Err(message);
    }
    Ok(n - 1)
}

fn print_documents(session: &ChatSession) {
    if session.documents().is_empty() {
        println!("No documents uploaded yet.");
        return;
    }
    let selected_id = session.selected().map(|d| d.id.clone());
    for (index, doc) in session.documents().iter().enumerate() {
        let marker = if selected_id.as_deref() == Some(doc.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>2}. {} ({}, {})",
            marker,
            index + 1,
            doc.title,
            doc.file_type.to_uppercase(),
            format_file_size(doc.file_size)
        );
    }
}

fn print_transcript(session: &ChatSession) {
    for message in session.messages() {
        print_message(message.role, &message.content, message.confidence);
    }
}

fn print_latest_answer(session: &ChatSession) {
    if let Some(message) = session.messages().last() {
        if message.role == Role::Assistant {
            print_message(message.role, &message.content, message.confidence);
        }
    }
}

fn print_message(role: Role, content: &str, confidence: Option<f64>) {
    let speaker = match role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("[{}] {}", speaker, content);
    if let Some(confidence) = confidence {
        println!("    Confidence: {}%", (confidence * 100.0).round() as i64);
    }
}

fn print_help() {
    println!("Ask a question by typing it. Commands:");
    println!("  /docs            list your documents");
    println!("  /open <n>        chat about document n");
    println!("  /upload <path>   upload a PDF, DOCX, DOC or TXT file (max 50MB)");
    println!("  /delete <n>      delete document n");
    println!("  /clear           clear the on-screen chat");
    println!("  /logout          sign out and exit");
    println!("  /quit            exit");
}
