pub(crate) mod availability;
pub(crate) mod grade;
pub(crate) mod replay;
pub(crate) mod session;
pub(crate) mod validate;

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::core::config::Settings;

const USAGE: &str = "usage: invigil <validate|availability|grade|replay|session> [options]

  validate     --exam <file>
  availability --exam <file>
  grade        --exam <file> --answers <bundle> [--out <file>]
  replay       --exam <file> --script <file> [--out <bundle>]
  session      --exam <file> [--out <bundle>] [--seed <n>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Validate { exam: PathBuf },
    Availability { exam: PathBuf },
    Grade { exam: PathBuf, answers: PathBuf, out: Option<PathBuf> },
    Replay { exam: PathBuf, script: PathBuf, out: Option<PathBuf> },
    Session { exam: PathBuf, out: Option<PathBuf>, seed: Option<u64> },
}

impl Command {
    pub(crate) fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let subcommand = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;

        let mut exam = None;
        let mut answers = None;
        let mut script = None;
        let mut out = None;
        let mut seed = None;

        let mut args = args;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--exam" => {
                    exam = Some(PathBuf::from(
                        args.next().ok_or_else(|| anyhow!("--exam missing value"))?,
                    ));
                }
                "--answers" => {
                    answers = Some(PathBuf::from(
                        args.next().ok_or_else(|| anyhow!("--answers missing value"))?,
                    ));
                }
                "--script" => {
                    script = Some(PathBuf::from(
                        args.next().ok_or_else(|| anyhow!("--script missing value"))?,
                    ));
                }
                "--out" => {
                    out = Some(PathBuf::from(
                        args.next().ok_or_else(|| anyhow!("--out missing value"))?,
                    ));
                }
                "--seed" => {
                    let raw = args.next().ok_or_else(|| anyhow!("--seed missing value"))?;
                    seed = Some(raw.parse::<u64>().map_err(|_| anyhow!("invalid seed: {raw}"))?);
                }
                _ => return Err(anyhow!("Unknown argument: {arg}")),
            }
        }

        let exam = || exam.clone().ok_or_else(|| anyhow!("--exam is required"));

        match subcommand.as_str() {
            "validate" => Ok(Command::Validate { exam: exam()? }),
            "availability" => Ok(Command::Availability { exam: exam()? }),
            "grade" => Ok(Command::Grade {
                exam: exam()?,
                answers: answers.ok_or_else(|| anyhow!("--answers is required"))?,
                out,
            }),
            "replay" => Ok(Command::Replay {
                exam: exam()?,
                script: script.ok_or_else(|| anyhow!("--script is required"))?,
                out,
            }),
            "session" => Ok(Command::Session { exam: exam()?, out, seed }),
            other => Err(anyhow!("Unknown subcommand: {other}\n{USAGE}")),
        }
    }
}

pub(crate) async fn execute(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Validate { exam } => validate::run(&exam),
        Command::Availability { exam } => availability::run(&exam),
        Command::Grade { exam, answers, out } => grade::run(&exam, &answers, out.as_deref(), settings),
        Command::Replay { exam, script, out } => replay::run(&exam, &script, out.as_deref(), settings),
        Command::Session { exam, out, seed } => {
            session::run(&exam, out.as_deref(), seed, settings).await
        }
    }
}
