//! `maci` command-line tool.

use anyhow::Result;
use clap::{Parser, Subcommand};
use maci_domainobjs::Keypair;
use rand::rngs::OsRng;

#[derive(Parser)]
#[command(name = "maci", about = "MACI key management", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a MACI keypair and print it on one line.
    #[command(name = "genMaciKeypair")]
    GenMaciKeypair {
        /// Derive the keypair from a passphrase instead of fresh randomness.
        /// The same passphrase always yields the same keypair.
        #[arg(short, long)]
        passphrase: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::GenMaciKeypair { passphrase } => {
            let keypair = match passphrase {
                Some(p) => Keypair::from_seed(&p),
                None => Keypair::random(&mut OsRng),
            };
            println!(
                "macikeypair {} {}",
                keypair.pub_key.serialize(),
                keypair.priv_key.serialize()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maci_domainobjs::{PrivKey, PubKey};

    fn keypair_line(passphrase: Option<&str>) -> String {
        let keypair = match passphrase {
            Some(p) => Keypair::from_seed(p),
            None => Keypair::random(&mut OsRng),
        };
        format!(
            "macikeypair {} {}",
            keypair.pub_key.serialize(),
            keypair.priv_key.serialize()
        )
    }

    #[test]
    fn output_line_parses_back_into_a_keypair() {
        let line = keypair_line(None);
        let mut parts = line.split_whitespace();
        assert_eq!(parts.next(), Some("macikeypair"));
        let pk = PubKey::unserialize(parts.next().unwrap()).unwrap();
        let sk = PrivKey::unserialize(parts.next().unwrap()).unwrap();
        assert_eq!(parts.next(), None);
        assert_eq!(sk.pub_key(), pk);
    }

    #[test]
    fn passphrase_output_is_reproducible() {
        let a = keypair_line(Some("correct horse battery staple"));
        let b = keypair_line(Some("correct horse battery staple"));
        let c = keypair_line(Some("wrong horse"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn passphrase_flag_is_accepted() {
        let cli = Cli::try_parse_from(["maci", "genMaciKeypair", "-p", "seed"]).unwrap();
        let Commands::GenMaciKeypair { passphrase } = cli.command;
        assert_eq!(passphrase.as_deref(), Some("seed"));
    }
}
