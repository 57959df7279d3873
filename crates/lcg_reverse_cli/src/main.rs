//! LCG Reverse CLI
//!
//! Seed recovery for linear congruential generators, plus the lattice tools
//! it is built from.
//!
//! # Usage
//! ```bash
//! # LLL-reduce the rows of a matrix
//! lcg-reverse reduce --matrix "{{1, 0, 3}, {0, 1, 5}, {0, 0, 7}}"
//!
//! # Lattice points origin + Bᵗx inside a box
//! lcg-reverse enumerate --basis "{{2, 1}, {1, 3}}" --origin "{0, 0}" \
//!     --lower "{-5, -5}" --upper "{5, 5}"
//!
//! # Java seeds whose states after 1, 2 and 3 calls have these top 16 bits
//! lcg-reverse recover --bits 16 1:43521 2:1207 3:60001
//!
//! # Generate observations from a known seed and recover it
//! lcg-reverse -v demo --seed 123456789 --count 6 --bits 16
//! ```

mod lattice_tools;
mod recover;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use lcg_reverse_core::{Lcg, LllConfig, Rational};

#[derive(Parser)]
#[command(name = "lcg-reverse")]
#[command(about = "Recover LCG seeds from partial observations with lattice reduction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// LLL-reduce the rows of a matrix
    Reduce {
        /// Matrix as text, e.g. "{{1, 2}, {3, 4}}"
        #[arg(long)]
        matrix: String,

        /// Lovász parameter in (1/2, 1)
        #[arg(long)]
        delta: Option<Rational>,
    },

    /// List the lattice points inside a box
    Enumerate {
        /// Square basis, one basis vector per row
        #[arg(long)]
        basis: String,

        /// Offset added to every lattice point
        #[arg(long)]
        origin: String,

        /// Lower corner of the box
        #[arg(long)]
        lower: String,

        /// Upper corner of the box
        #[arg(long)]
        upper: String,

        /// Enumerate on all cores
        #[arg(long)]
        parallel: bool,

        /// Print only the number of points
        #[arg(long)]
        count_only: bool,
    },

    /// Find the seeds consistent with observed top bits of LCG states
    Recover {
        /// Number of observed top bits per state
        #[arg(long)]
        bits: u32,

        /// Observations as step:value, value being the top bits of the
        /// state after `step` calls
        #[arg(value_name = "STEP:VALUE", required = true, value_parser = recover::parse_observation)]
        observations: Vec<(u64, u64)>,

        #[command(flatten)]
        generator: GeneratorArgs,

        /// Search on all cores
        #[arg(long)]
        parallel: bool,

        /// Use δ = 3/4 instead of 99/100
        #[arg(long)]
        fast: bool,
    },

    /// Generate observations from a seed, then recover it
    Demo {
        /// Seed to hide; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Number of observed states
        #[arg(long, default_value = "6")]
        count: u64,

        /// Observed top bits per state
        #[arg(long, default_value = "16")]
        bits: u32,

        #[command(flatten)]
        generator: GeneratorArgs,

        /// Search on all cores
        #[arg(long)]
        parallel: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// java.util.Random and drand48: a = 0x5DEECE66D, c = 11, M = 2^48
    Java,
    /// Knuth's MMIX: 64-bit state
    Mmix,
}

#[derive(clap::Args, Debug)]
struct GeneratorArgs {
    /// Generator constants to start from
    #[arg(long, value_enum, default_value = "java")]
    preset: Preset,

    /// Override the multiplier
    #[arg(long)]
    multiplier: Option<u64>,

    /// Override the addend
    #[arg(long)]
    addend: Option<u64>,

    /// Override the modulus as a power of two
    #[arg(long)]
    modulus_bits: Option<u32>,
}

impl GeneratorArgs {
    fn lcg(&self) -> Result<Lcg> {
        let base = match self.preset {
            Preset::Java => Lcg::JAVA,
            Preset::Mmix => Lcg {
                multiplier: 6364136223846793005,
                addend: 1442695040888963407,
                modulus_bits: 64,
            },
        };
        Ok(Lcg::new(
            self.multiplier.unwrap_or(base.multiplier),
            self.addend.unwrap_or(base.addend),
            self.modulus_bits.unwrap_or(base.modulus_bits),
        )?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Reduce { matrix, delta } => {
            let config = match delta {
                Some(delta) => LllConfig::with_delta(delta)?,
                None => LllConfig::default(),
            };
            lattice_tools::run_reduce(&matrix, &config)
        }
        Commands::Enumerate {
            basis,
            origin,
            lower,
            upper,
            parallel,
            count_only,
        } => lattice_tools::run_enumerate(&basis, &origin, &lower, &upper, parallel, count_only),
        Commands::Recover {
            bits,
            observations,
            generator,
            parallel,
            fast,
        } => {
            let lll = if fast { LllConfig::fast() } else { LllConfig::strong() };
            recover::run_recover(generator.lcg()?, bits, &observations, lll, parallel)
        }
        Commands::Demo {
            seed,
            count,
            bits,
            generator,
            parallel,
        } => recover::run_demo(generator.lcg()?, seed, count, bits, parallel),
    }
}
