//! Optimisation passes and the `opt` commandline format.
//!
//! Pass effects are a pure function of (benchmark, pass, current count), so
//! replaying a commandline always lands on the same instruction count.

use sha2::{Digest, Sha256};

use crate::error::{EvalError, Result};

/// Passes available as actions, in action-index order.
pub const PASSES: [&str; 14] = [
    "-adce",
    "-dce",
    "-dse",
    "-early-cse",
    "-gvn",
    "-inline",
    "-instcombine",
    "-licm",
    "-loop-unroll",
    "-mem2reg",
    "-reassociate",
    "-sccp",
    "-simplifycfg",
    "-sroa",
];

/// Passes that may grow the program.
const GROWING_PASSES: [&str; 2] = ["-inline", "-loop-unroll"];

const PROGRAM: &str = "opt";
const IO_SUFFIX: &str = "input.bc -o output.bc";

/// Render `opt <passes> input.bc -o output.bc`.
///
/// With no passes this is `opt  input.bc -o output.bc` (two spaces).
pub fn format_commandline(passes: &[&str]) -> String {
    format!("{PROGRAM} {} {IO_SUFFIX}", passes.join(" "))
}

/// Parse a commandline into pass indices into [`PASSES`].
pub fn parse_commandline(commandline: &str) -> Result<Vec<usize>> {
    let mut tokens = commandline.split_whitespace();
    match tokens.next() {
        Some(PROGRAM) => {}
        Some(other) => {
            return Err(EvalError::InvalidCommandline(format!(
                "expected '{PROGRAM}', found '{other}'"
            )))
        }
        None => return Err(EvalError::InvalidCommandline("empty commandline".to_string())),
    }

    let mut actions = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            "input.bc" => {}
            "-o" => {
                if tokens.next().is_none() {
                    return Err(EvalError::InvalidCommandline(
                        "'-o' without an output file".to_string(),
                    ));
                }
            }
            pass => {
                let index = PASSES.iter().position(|p| *p == pass).ok_or_else(|| {
                    EvalError::InvalidCommandline(format!("unknown pass '{pass}'"))
                })?;
                actions.push(index);
            }
        }
    }
    Ok(actions)
}

fn digest_u64(parts: &[&[u8]]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Unoptimised instruction count of a benchmark.
pub fn initial_instruction_count(benchmark: &str) -> u64 {
    200 + digest_u64(&[benchmark.as_bytes()]) % 9_800
}

/// Instruction count after running `pass` on a program of `count` instructions.
pub fn apply_pass(benchmark: &str, pass: &str, count: u64) -> u64 {
    let h = digest_u64(&[benchmark.as_bytes(), pass.as_bytes(), &count.to_le_bytes()]);
    if GROWING_PASSES.contains(&pass) && (h >> 32) % 3 == 0 {
        count + count * (h % 7) / 100
    } else {
        let removed = count * (h % 9) / 100;
        (count - removed).max(1)
    }
}
