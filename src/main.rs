use clap::Parser;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::sync::Arc;
use stirshaken::config::Settings;
use stirshaken::signature::SigningKey;
use stirshaken::store::{MemoCredentialStore, MemoTrustAnchorStore, SigningCredential};
use stirshaken::token::{codec, Attestation, IdentityHeader};
use stirshaken::{Payload, StirShaken};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
enum StirShakenCli {
    Verify(VerifyArgs),
    Sign(SignArgs),
    Decode(DecodeArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the PASSporT in the supplied SIP Identity header, fetching \
    its certificate and checking it against the trusted roots")]
struct VerifyArgs {
    #[arg(short, long, default_value = "identity.txt")]
    identity: String,

    #[arg(short, long, default_value = "roots.pem")]
    tastore: String,

    #[arg(short, long)]
    settings: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Sign the supplied claims and print the resulting SIP Identity \
    header")]
struct SignArgs {
    #[arg(short, long, default_value = "claims.json")]
    claims: String,

    #[arg(short, long, default_value = "key.pem")]
    key: String,

    #[arg(short, long)]
    x5u: String,

    #[arg(short, long, default_value = "A")]
    attest: Attestation,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Print header and claims of the PASSporT in the supplied SIP \
    Identity header, without verifying anything")]
struct DecodeArgs {
    #[arg(short, long, default_value = "identity.txt")]
    identity: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match StirShakenCli::parse() {
        StirShakenCli::Verify(args) => match verify(&args).await {
            Ok(p) => {
                println!("{}", render(&p));
                eprintln!("verification successful");
            }
            Err(e) => eprintln!("verification failed: {e}"),
        },

        StirShakenCli::Sign(args) => match sign(&args) {
            Ok(p) => println!("{}", p.identity_header()),
            Err(e) => eprintln!("signing failed: {e}"),
        },

        StirShakenCli::Decode(args) => match decode(&args) {
            Ok(v) => println!("{v}"),
            Err(e) => eprintln!("decoding failed: {e}"),
        },
    }
}

fn render(p: &Payload) -> String {
    serde_json::to_string_pretty(p).unwrap_or_default()
}

async fn verify(args: &VerifyArgs) -> Result<Payload, Box<dyn Error>> {
    let settings = match &args.settings {
        Some(f) => Settings::from_json(&fs::read_to_string(f)?)?,
        None => Settings::default(),
    };

    let tas = MemoTrustAnchorStore::new()?;
    tas.add_pem(&fs::read(&args.tastore)?)?;

    let svc = StirShaken::new(settings, Arc::new(tas), Arc::new(MemoCredentialStore::new()))?;

    let identity = fs::read_to_string(&args.identity)?;

    Ok(svc.verify_identity(identity.trim()).await?)
}

fn sign(args: &SignArgs) -> Result<Payload, Box<dyn Error>> {
    let key = SigningKey::from_pem(&fs::read(&args.key)?)?;

    let creds = MemoCredentialStore::new();
    creds.add(SigningCredential::new(key, &args.x5u, args.attest)?);

    let tas = MemoTrustAnchorStore::new()?;

    let svc = StirShaken::new(Settings::default(), Arc::new(tas), Arc::new(creds))?;

    let claims: Value = serde_json::from_str(&fs::read_to_string(&args.claims)?)?;

    Ok(svc.sign(&claims)?)
}

fn decode(args: &DecodeArgs) -> Result<String, Box<dyn Error>> {
    let identity = fs::read_to_string(&args.identity)?;

    let id = IdentityHeader::parse(identity.trim())?;

    let header = codec::decode_header(&id.header)?;
    let claims = codec::decode_claims(&id.payload)?;

    let v = json!({
        "header": header,
        "payload": claims,
        "info": id.info,
        "alg": id.alg,
    });

    Ok(serde_json::to_string_pretty(&v)?)
}
