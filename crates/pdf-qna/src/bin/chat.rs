//! Terminal chat client for the question-answering server
//!
//! Run with: cargo run -p pdf-qna --bin pdf-qna-chat -- --upload paper.pdf

use clap::Parser;
use console::style;
use pdf_qna::client::{render_markdown, ChatSession, QnaClient, DEFAULT_SERVER_URL};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "pdf-qna-chat", version, about = "Chat with an uploaded PDF")]
struct Cli {
    /// Server base URL
    #[arg(short, long, env = "PDF_QNA_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Upload this PDF before the first prompt
    #[arg(short, long)]
    upload: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

const HELP: &str = "Commands: /upload <path>, /clear, /history, /help, /quit. Anything else is a question.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut session = ChatSession::new(QnaClient::new(&cli.server, cli.timeout)?);

    println!("{}", style("PDF Q&A chat").bold());
    println!("Server: {}", cli.server);
    println!("{}\n", style(HELP).dim());

    if let Some(path) = &cli.upload {
        upload(&mut session, path).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(style("> ").green().to_string().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("", _) => continue,
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{}", style(HELP).dim()),
            ("/upload", "") => println!("{}", style("Usage: /upload <path>").yellow()),
            ("/upload", path) => upload(&mut session, Path::new(path)).await,
            ("/clear", _) => match session.clear().await {
                Ok(message) => println!("{}", style(message).green()),
                Err(e) => println!("{}", style(e).red()),
            },
            ("/history", _) => {
                for message in session.messages() {
                    println!("{:?}: {}", message.role, message.content);
                }
            }
            _ => match session.ask(line).await {
                Ok(answer) => println!("\n{}\n", render_markdown(&answer)),
                Err(e) => println!("{}", style(e).red()),
            },
        }
    }

    Ok(())
}

async fn upload(session: &mut ChatSession, path: &Path) {
    println!("{}", style(format!("Uploading {}...", path.display())).dim());
    match session.upload(path).await {
        Ok(message) => println!("{}", style(message).green()),
        Err(e) => println!("{}", style(e).red()),
    }
}
