//! `recover` and `demo`: seed recovery from observed top bits

use std::time::Instant;

use anyhow::{bail, Context, Result};
use lcg_reverse_core::{Lcg, LllConfig, RandomReverser, ReverserConfig};
use log::{debug, info};
use rand::Rng;

/// Parse `step:value`; the value may be decimal or 0x-prefixed hex
pub fn parse_observation(text: &str) -> std::result::Result<(u64, u64), String> {
    let (step, value) = text
        .split_once(':')
        .ok_or_else(|| format!("expected STEP:VALUE, got '{}'", text))?;
    let step = step
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad step '{}': {}", step, e))?;
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    let value = parsed.map_err(|e| format!("bad value '{}': {}", value, e))?;
    Ok((step, value))
}

fn reverser(
    lcg: Lcg,
    bits: u32,
    observations: &[(u64, u64)],
    lll: LllConfig,
    parallel: bool,
) -> Result<RandomReverser> {
    let mut reverser = RandomReverser::new(lcg, ReverserConfig { lll, parallel });
    for &(step, value) in observations {
        reverser
            .add_top_bits(step, bits, value)
            .with_context(|| format!("Invalid observation {}:{}", step, value))?;
    }
    Ok(reverser)
}

pub fn run_recover(
    lcg: Lcg,
    bits: u32,
    observations: &[(u64, u64)],
    lll: LllConfig,
    parallel: bool,
) -> Result<()> {
    let reverser = reverser(lcg, bits, observations, lll, parallel)?;

    let start = Instant::now();
    let seeds = reverser.find_seeds().context("Seed search failed")?;
    info!("search took {:.2} ms", start.elapsed().as_secs_f64() * 1000.0);

    for seed in &seeds {
        println!("{:#x}", seed);
    }
    println!("{} seed(s)", seeds.len());
    Ok(())
}

fn check_demo_args(lcg: &Lcg, count: u64, bits: u32) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    if bits == 0 || bits > lcg.modulus_bits {
        bail!("--bits must be between 1 and {}, got {}", lcg.modulus_bits, bits);
    }
    Ok(())
}

pub fn run_demo(lcg: Lcg, seed: Option<u64>, count: u64, bits: u32, parallel: bool) -> Result<()> {
    check_demo_args(&lcg, count, bits)?;
    let secret = seed.unwrap_or_else(|| rand::thread_rng().gen::<u64>()) & lcg.mask();

    println!("Generator: a = {:#x}, c = {:#x}, M = 2^{}", lcg.multiplier, lcg.addend, lcg.modulus_bits);
    println!("Hidden seed: {:#x}", secret);
    println!();

    let mut observations = Vec::new();
    for step in 1..=count {
        let value = lcg.top_bits(lcg.skip(secret, step), bits);
        debug!("state {} top {} bits = {:#x}", step, bits, value);
        println!("  step {:>3}: {:#x}", step, value);
        observations.push((step, value));
    }
    println!();

    let reverser = reverser(lcg, bits, &observations, LllConfig::default(), parallel)?;
    let start = Instant::now();
    let seeds = reverser.find_seeds().context("Seed search failed")?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    let found = seeds.contains(&secret);
    println!("Recovered {} candidate(s) in {:.2} ms", seeds.len(), elapsed);
    for candidate in &seeds {
        let marker = if *candidate == secret { "✓" } else { " " };
        println!("  {} {:#x}", marker, candidate);
    }
    if !found {
        bail!("hidden seed {:#x} was not among the candidates", secret);
    }
    Ok(())
}
