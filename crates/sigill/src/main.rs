#![forbid(unsafe_code)]

//! sigill CLI: create and check enveloped XML signatures.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sigill_c14n::C14nMode;
use sigill_core::{algorithm, Error};
use sigill_crypto::HmacHash;
use sigill_dsig::{Reference, SignatureContext};
use sigill_keys::{KeyInfo, KeyInfoClause, KeysManager};
use sigill_xml::{AttributeIdResolver, XmlDocument};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sigill",
    about = "sigill: XML Digital Signatures (sign, verify, c14n)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an enveloped signature to an XML document
    Sign(SignArgs),

    /// Verify the first signature in an XML document
    Verify(VerifyArgs),

    /// Print the canonical form of an XML document
    C14n(C14nArgs),
}

#[derive(Args)]
struct SignArgs {
    /// Input XML document
    file: PathBuf,

    /// Private key (PEM or DER, auto-detected)
    #[arg(short = 'k', long, conflicts_with = "hmac_key", required_unless_present = "hmac_key")]
    key: Option<PathBuf>,

    /// Raw HMAC secret (binary file)
    #[arg(long = "hmac-key")]
    hmac_key: Option<PathBuf>,

    /// Hash for the HMAC key
    #[arg(long = "hmac-hash", value_enum, default_value_t = HashArg::Sha1)]
    hmac_hash: HashArg,

    /// Truncate the HMAC to this many bits
    #[arg(long = "hmac-output-length")]
    hmac_output_length: Option<String>,

    /// SignatureMethod URI (default: derived from the key)
    #[arg(long)]
    method: Option<String>,

    /// Canonicalization method for SignedInfo and the reference
    #[arg(long, value_enum, default_value_t = ModeArg::C14n)]
    c14n: ModeArg,

    /// Include the public key as a KeyValue
    #[arg(long = "key-value")]
    key_value: bool,

    /// Include a KeyName
    #[arg(long = "key-name")]
    key_name: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Signed XML document
    file: PathBuf,

    /// Verification key; without it the key is taken from KeyInfo
    #[arg(short = 'k', long)]
    key: Option<PathBuf>,

    /// The key file is a raw HMAC secret
    #[arg(long, requires = "key")]
    hmac: bool,

    /// Key to use when KeyInfo carries a matching KeyName (NAME:FILE)
    #[arg(short = 'K', long = "key-name")]
    key_names: Vec<String>,

    /// Register an additional ID attribute name
    #[arg(long = "id-attr")]
    id_attr: Vec<String>,
}

#[derive(Args)]
struct C14nArgs {
    /// Input XML document
    file: PathBuf,

    /// Canonicalization method
    #[arg(long, value_enum, default_value_t = ModeArg::C14n)]
    mode: ModeArg,

    /// InclusiveNamespaces prefixes for the exclusive modes
    #[arg(long = "prefix")]
    prefixes: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    C14n,
    C14nComments,
    ExcC14n,
    ExcC14nComments,
}

impl ModeArg {
    fn mode(self) -> C14nMode {
        match self {
            ModeArg::C14n => C14nMode::Inclusive,
            ModeArg::C14nComments => C14nMode::InclusiveWithComments,
            ModeArg::ExcC14n => C14nMode::Exclusive,
            ModeArg::ExcC14nComments => C14nMode::ExclusiveWithComments,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum HashArg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Ripemd160,
}

impl From<HashArg> for HmacHash {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Sha1 => HmacHash::Sha1,
            HashArg::Sha256 => HmacHash::Sha256,
            HashArg::Sha384 => HmacHash::Sha384,
            HashArg::Sha512 => HmacHash::Sha512,
            HashArg::Ripemd160 => HmacHash::Ripemd160,
        }
    }
}

const EXIT_INVALID: i32 = 1;
const EXIT_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sign(args) => cmd_sign(args),
        Commands::Verify(args) => cmd_verify(args),
        Commands::C14n(args) => cmd_c14n(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(EXIT_ERROR);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_sign(args: SignArgs) -> Result<(), Error> {
    let xml = read_file(&args.file)?;
    let key = match (&args.key, &args.hmac_key) {
        (_, Some(path)) => sigill_keys::loader::load_hmac_key_file(path, args.hmac_hash.into())?,
        (Some(path), None) => sigill_keys::loader::load_key_file(path)?,
        (None, None) => return Err(Error::LoadKeyFailed),
    };
    if !key.is_private() {
        return Err(Error::Key(format!(
            "{} holds no private key",
            args.key.as_deref().unwrap_or(&args.file).display()
        )));
    }

    let mode = args.c14n.mode();
    let mut ctx = SignatureContext::new()
        .with_document(XmlDocument::parse(xml)?)
        .with_signing_key(key.clone());

    let si = ctx.signed_info_mut();
    si.canonicalization_method = mode.uri().to_owned();
    si.signature_method = args.method;
    si.hmac_output_length = args.hmac_output_length;

    let mut reference = Reference::new("");
    reference.add_transform(algorithm::ENVELOPED_SIGNATURE);
    reference.add_transform(mode.uri());
    ctx.add_reference(Some(reference))?;

    let mut key_info = KeyInfo::new();
    if let Some(name) = args.key_name {
        key_info.add_clause(KeyInfoClause::KeyName(name));
    }
    if args.key_value {
        key_info.add_key_value(&key);
    }
    if !key_info.is_empty() {
        ctx.set_key_info(Some(key_info));
    }

    tracing::info!(file = %args.file.display(), "signing");
    ctx.compute_signature()?;
    write_output(args.output.as_deref(), ctx.signed_document()?.as_bytes())
}

fn cmd_verify(args: VerifyArgs) -> Result<(), Error> {
    let xml = read_file(&args.file)?;
    let resolver = args
        .id_attr
        .iter()
        .fold(AttributeIdResolver::new(), |r, attr| r.with_attr(attr));

    let mut ctx = SignatureContext::new().with_id_resolver(Arc::new(resolver));
    ctx.load_xml(&xml)?;
    tracing::info!(file = %args.file.display(), "verifying");

    let valid = match &args.key {
        Some(path) if args.hmac => {
            let method = ctx.signature_method().unwrap_or_default();
            let hash = HmacHash::from_signature_uri(method).ok_or_else(|| {
                Error::KeyAlgorithmMismatch {
                    method: method.to_owned(),
                    key: "HMAC".to_owned(),
                }
            })?;
            let key = sigill_keys::loader::load_hmac_key_file(path, hash)?;
            ctx.check_signature_with_key(&key)?
        }
        Some(path) => {
            let key = sigill_keys::loader::load_key_file(path)?;
            let key = key.public_key().unwrap_or(key);
            ctx.check_signature_with_key(&key)?
        }
        None => {
            let keys = load_named_keys(&args.key_names)?;
            let named = ctx
                .key_info()
                .and_then(KeyInfo::key_name)
                .and_then(|name| keys.find_by_name(name));
            match named {
                Some(key) => {
                    tracing::debug!(name = ?key.name, "using named key");
                    let key = key.public_key().unwrap_or_else(|| key.clone());
                    ctx.check_signature_with_key(&key)?
                }
                None => ctx.check_signature()?,
            }
        }
    };

    if valid {
        println!("OK");
        Ok(())
    } else {
        eprintln!("INVALID");
        process::exit(EXIT_INVALID);
    }
}

fn cmd_c14n(args: C14nArgs) -> Result<(), Error> {
    let xml = read_file(&args.file)?;
    let canonical = sigill_c14n::canonicalize(&xml, args.mode.mode(), None, &args.prefixes)?;
    write_output(args.output.as_deref(), &canonical)
}

// ── Utility functions ────────────────────────────────────────────────

/// Load `NAME:FILE` key specs into a manager.
fn load_named_keys(specs: &[String]) -> Result<KeysManager, Error> {
    let mut mgr = KeysManager::new();
    for spec in specs {
        let (name, file) = spec.split_once(':').ok_or_else(|| {
            Error::Key(format!("invalid key-name format: {spec} (expected NAME:FILE)"))
        })?;
        let key = sigill_keys::loader::load_key_file(Path::new(file))?;
        mgr.add_key(key.with_name(name));
    }
    Ok(mgr)
}

fn read_file(path: &Path) -> Result<String, Error> {
    Ok(std::fs::read_to_string(path)?)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => Ok(std::fs::write(p, data)?),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(data)?;
            Ok(stdout.flush()?)
        }
    }
}
