//! Command-line front end for the tally engine
//!
//! Every subcommand prints JSON on stdout; logs go to stderr.

use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use num_bigint::BigUint;
use rand::Rng;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use elgamal_tally::{
    AggregatedResult, ChoiceVector, GroupParameters, HomomorphicOperations, KeyStore, PublicKey,
    SealedSecret, SecretVault, TallyError, VaultConfig, VoteEncoder, VoteVector,
};

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Tally(#[from] TallyError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

#[derive(Debug, Parser)]
#[command(name = "elgamal-tally", version, about = "Encrypted vote tallying with exponential ElGamal")]
struct Cli {
    /// Prime modulus p, in decimal
    #[arg(long, env = "TALLY_MODULUS", default_value = "7919", global = true)]
    modulus: BigUint,

    /// Group generator g, in decimal
    #[arg(long, env = "TALLY_GENERATOR", default_value = "2", global = true)]
    generator: BigUint,

    /// Salt for deriving the key-sealing key
    #[arg(long, env = "TALLY_KDF_SALT", default_value = "salt", global = true)]
    kdf_salt: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a key pair; prints the public key and the sealed private key
    Keygen {
        #[arg(long, env = "KEY_ENCRYPTION_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Encrypt one ballot, e.g. --choices 0,1,0
    Encrypt {
        #[arg(long)]
        public_key: String,
        #[arg(long, allow_hyphen_values = true)]
        choices: ChoiceVector,
    },
    /// Multiply a JSON array of ballots into one ciphertext per candidate
    Aggregate {
        /// File holding the ballots, or "-" for stdin
        #[arg(long, default_value = "-")]
        ballots: PathBuf,
    },
    /// Decode an aggregated result with the sealed private key
    Tally {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        sealed: SealedSecret,
        /// File holding the aggregated result, or "-" for stdin
        #[arg(long, default_value = "-")]
        aggregated: PathBuf,
        /// Exclusive upper bound on any tally, e.g. the voter-roll size plus one
        #[arg(long)]
        bound: u64,
        #[arg(long, env = "KEY_ENCRYPTION_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Run a simulated election end to end
    Demo {
        #[arg(long, default_value_t = 25)]
        voters: usize,
        #[arg(long, default_value_t = 3)]
        candidates: usize,
        #[arg(
            long,
            env = "KEY_ENCRYPTION_SECRET",
            hide_env_values = true,
            default_value = "demo secret"
        )]
        secret: String,
    },
}

fn init_logging(verbose: u8) -> Result<(), Error> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}",
        )))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|err| Error::Logging(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| Error::Logging(err.to_string()))?;
    Ok(())
}

fn read_input(path: &Path) -> Result<String, Error> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn tally_report(results: Vec<elgamal_tally::Result<u64>>) -> serde_json::Value {
    let entries: Vec<_> = results
        .into_iter()
        .enumerate()
        .map(|(candidate, result)| match result {
            Ok(votes) => json!({ "candidate": candidate, "votes": votes }),
            Err(err) if err.is_out_of_range() => json!({
                "candidate": candidate,
                "error": "result outside expected range",
                "detail": err.to_string(),
            }),
            Err(err) => json!({ "candidate": candidate, "error": err.to_string() }),
        })
        .collect();
    json!({ "results": entries })
}

/// One-hot ballots for `voters` random choices, plus the plaintext counts
fn simulate_ballots<R: Rng>(
    encoder: &VoteEncoder,
    voters: usize,
    candidates: usize,
    rng: &mut R,
) -> Result<(Vec<VoteVector>, Vec<u64>), Error> {
    if voters == 0 || candidates == 0 {
        return Err(TallyError::Range(format!(
            "demo needs at least one voter and one candidate, got {} and {}",
            voters, candidates
        ))
        .into());
    }

    let mut expected = vec![0u64; candidates];
    let mut ballots = Vec::with_capacity(voters);
    for _ in 0..voters {
        let chosen = rng.gen_range(0..candidates);
        let choices = ChoiceVector::one_hot(candidates, chosen)?;
        expected[chosen] += 1;
        ballots.push(encoder.encrypt_vote(choices.as_slice())?);
    }
    Ok((ballots, expected))
}

fn run(cli: Cli) -> Result<(), Error> {
    let params = GroupParameters::new(cli.modulus, cli.generator)?;
    let vault = SecretVault::new(VaultConfig::default().with_salt(cli.kdf_salt));
    info!("Using {}", params);

    match cli.command {
        Command::Keygen { secret } => {
            let mut store = KeyStore::new(params, vault);
            let public_key = store.initialize(&secret)?.clone();
            print_json(&json!({
                "publicKey": public_key,
                "encryptedPrivateKey": store.sealed_private_key()?,
            }))
        }
        Command::Encrypt {
            public_key,
            choices,
        } => {
            let public_key = PublicKey::from_decimal(&public_key, &params)?;
            let ballot = VoteEncoder::new(params, public_key).encrypt_vote(choices.as_slice())?;
            print_json(&serde_json::to_value(ballot)?)
        }
        Command::Aggregate { ballots } => {
            let ballots: Vec<VoteVector> = serde_json::from_str(&read_input(&ballots)?)?;
            let aggregated = params.aggregate_votes(&ballots)?;
            print_json(&serde_json::to_value(aggregated)?)
        }
        Command::Tally {
            public_key,
            sealed,
            aggregated,
            bound,
            secret,
        } => {
            let aggregated: AggregatedResult = serde_json::from_str(&read_input(&aggregated)?)?;
            let public_key = PublicKey::from_decimal(&public_key, &params)?;

            let mut store = KeyStore::new(params, vault);
            store.import(public_key, sealed)?;
            let results = store.decrypt_results(&aggregated, &secret, bound)?;
            print_json(&tally_report(results))
        }
        Command::Demo {
            voters,
            candidates,
            secret,
        } => {
            let mut store = KeyStore::new(params, vault);
            store.initialize(&secret)?;
            store.self_test(&secret)?;

            let encoder = store.encoder()?;
            let (ballots, expected) =
                simulate_ballots(&encoder, voters, candidates, &mut rand::thread_rng())?;
            info!("Encrypted {} ballots", ballots.len());

            let aggregated = store.params().aggregate_votes(&ballots)?;
            let bound = voters as u64 + 1;
            let results = store.decrypt_results(&aggregated, &secret, bound)?;

            let mut report = tally_report(results);
            report["expected"] = json!(expected);
            print_json(&report)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli) {
        error!("{err}");
        std::process::exit(1);
    }
}
