// src/selector.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Resolves the buckets of a run, either from `-b` names or through an
//! interactive keyword filter and picker.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RunOptions;
use crate::error::ClearError;
use crate::wrapper::{BucketTarget, Wrapper};

/// Interactive collaborator: asks for a keyword, then lets the user pick.
#[async_trait]
pub trait BucketPicker: Send + Sync {
    async fn keyword(&self) -> Result<String, ClearError>;

    /// Return the chosen subset of `candidates`, in candidate order.
    async fn pick(&self, candidates: &[BucketTarget]) -> Result<Vec<BucketTarget>, ClearError>;
}

/// Parse a selection such as `1,3-5` or `a` into zero-based indices.
pub fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("a") || input.eq_ignore_ascii_case("all") {
        return Ok((0..len).collect());
    }

    let mut picked = vec![false; len];
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            None => (part, part),
        };
        let lo: usize = lo.parse().map_err(|_| format!("invalid selection: {part}"))?;
        let hi: usize = hi.parse().map_err(|_| format!("invalid selection: {part}"))?;
        if lo == 0 || hi < lo || hi > len {
            return Err(format!("selection out of range: {part}"));
        }
        for slot in &mut picked[lo - 1..hi] {
            *slot = true;
        }
    }
    Ok(picked
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.then_some(i))
        .collect())
}

fn prompt_line(prompt: String) -> io::Result<String> {
    let mut err = io::stderr();
    write!(err, "{prompt}")?;
    err.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn read_line(prompt: String) -> Result<String, ClearError> {
    let line = tokio::task::spawn_blocking(move || prompt_line(prompt))
        .await
        .map_err(io::Error::other)??;
    Ok(line)
}

/// Terminal picker on stdin; prompts go to stderr.
#[derive(Debug, Default)]
pub struct StdinPicker;

#[async_trait]
impl BucketPicker for StdinPicker {
    async fn keyword(&self) -> Result<String, ClearError> {
        read_line("Filter a keyword of bucket names: ".to_string()).await
    }

    async fn pick(&self, candidates: &[BucketTarget]) -> Result<Vec<BucketTarget>, ClearError> {
        let mut listing = String::new();
        for (i, target) in candidates.iter().enumerate() {
            listing.push_str(&format!("  [{}] {}\n", i + 1, target.name));
        }
        loop {
            let prompt = format!(
                "{listing}Select buckets to clear (e.g. 1,3-4, 'a' for all, empty for none): "
            );
            let answer = read_line(prompt).await?;
            match parse_selection(&answer, candidates.len()) {
                Ok(indices) => {
                    return Ok(indices.into_iter().map(|i| candidates[i].clone()).collect());
                }
                Err(msg) => eprintln!("{msg}"),
            }
        }
    }
}

pub struct BucketSelector<'a> {
    wrapper: &'a Wrapper,
    picker: &'a dyn BucketPicker,
}

impl<'a> BucketSelector<'a> {
    pub fn new(wrapper: &'a Wrapper, picker: &'a dyn BucketPicker) -> Self {
        Self { wrapper, picker }
    }

    /// Targets of the run. An empty interactive selection yields no targets.
    pub async fn select(
        &self,
        opts: &RunOptions,
        token: &CancellationToken,
    ) -> Result<Vec<BucketTarget>, ClearError> {
        let names = if opts.interactive {
            let keyword = self.picker.keyword().await?;
            let candidates = self.wrapper.list_buckets_matching(&keyword, token).await?;
            debug!("{} buckets match {:?}", candidates.len(), keyword);
            let picked = self.picker.pick(&candidates).await?;
            if picked.is_empty() {
                warn!("No buckets selected.");
                return Ok(Vec::new());
            }
            picked.into_iter().map(|t| t.locator).collect::<Vec<_>>()
        } else {
            opts.bucket_names.clone()
        };

        self.wrapper
            .check_buckets_exist(&names, token)
            .await?
            .into_result()
    }
}
