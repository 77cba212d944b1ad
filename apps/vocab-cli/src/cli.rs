use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;
use vocab_core::{LearningState, Page, WordWithState};

use crate::services::{ImportReport, ImportService, StudyService};

#[derive(Parser, Debug)]
#[command(name = "vocab", about = "Vocabulary import and review scheduling", version)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a CSV word list into a course
    Import {
        course_id: Uuid,
        file: PathBuf,
    },

    /// Record an answer for a word
    Answer {
        word_id: Uuid,
        #[arg(long, required_unless_present = "incorrect", conflicts_with = "incorrect")]
        correct: bool,
        #[arg(long)]
        incorrect: bool,
    },

    /// List words due for review
    Due {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List words flagged difficult
    Difficult {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List words that have never been answered
    Unseen {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List the words of a course
    Words {
        course_id: Uuid,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show progress counts for a course
    Stats { course_id: Uuid },

    /// Show a word and its learning state
    Show { word_id: Uuid },

    /// Flag a word as difficult (or clear the flag)
    MarkDifficult {
        word_id: Uuid,
        #[arg(long)]
        clear: bool,
    },
}

/// Services a command runs against.
pub struct Services {
    pub import: ImportService,
    pub study: StudyService,
}

pub fn execute(cli: Cli, services: &Services, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Command::Import { course_id, file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let report = services.import.import_csv(course_id, &bytes)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &report)?,
                OutputFormat::Plain => write_report(out, &report)?,
            }
        }
        Command::Answer {
            word_id, correct, ..
        } => {
            let state = services.study.record_answer(word_id, correct)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &state)?,
                OutputFormat::Plain => writeln!(out, "{}", describe_state(&state))?,
            }
        }
        Command::Due { limit, offset } => {
            let words = services.study.due_words(Page::new(offset, limit))?;
            write_words(out, &cli.format, &words, "No words due")?;
        }
        Command::Difficult { limit, offset } => {
            let words = services.study.difficult_words(Page::new(offset, limit))?;
            write_words(out, &cli.format, &words, "No difficult words")?;
        }
        Command::Unseen { limit, offset } => {
            let words = services.study.unseen_words(Page::new(offset, limit))?;
            write_words(out, &cli.format, &words, "No unseen words")?;
        }
        Command::Words {
            course_id,
            limit,
            offset,
        } => {
            let words = services
                .study
                .course_words(course_id, Page::new(offset, limit))?;
            write_words(out, &cli.format, &words, "No words in course")?;
        }
        Command::Stats { course_id } => {
            let stats = services.study.course_stats(course_id)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &stats)?,
                OutputFormat::Plain => writeln!(
                    out,
                    "{} words | {} learned ({}%) | {} difficult | {} due",
                    stats.total_words,
                    stats.learned_words,
                    stats.progress(),
                    stats.difficult_words,
                    stats.due_words
                )?,
            }
        }
        Command::Show { word_id } => {
            let entry = services.study.get_word(word_id)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &entry)?,
                OutputFormat::Plain => {
                    let word = &entry.word;
                    writeln!(out, "{}  {}  {}", word.text, word.pinyin, word.definition)?;
                    if let Some(example) = &word.example {
                        writeln!(out, "  example: {example}")?;
                    }
                    if let Some(link) = &word.audio_link {
                        writeln!(out, "  audio: {link}")?;
                    }
                    writeln!(out, "  {}", describe_state(&entry.state))?;
                }
            }
        }
        Command::MarkDifficult { word_id, clear } => {
            let state = services.study.mark_difficult(word_id, !clear)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &state)?,
                OutputFormat::Plain => writeln!(out, "{}", describe_state(&state))?,
            }
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_report(out: &mut impl Write, report: &ImportReport) -> Result<()> {
    writeln!(
        out,
        "Imported {} words into {} ({} invalid rows skipped, {} duplicates skipped)",
        report.imported, report.course_id, report.skipped_invalid, report.skipped_duplicate
    )?;
    Ok(())
}

fn write_words(
    out: &mut impl Write,
    format: &OutputFormat,
    words: &[WordWithState],
    empty: &str,
) -> Result<()> {
    if let OutputFormat::Json = format {
        return write_json(out, &words);
    }
    if words.is_empty() {
        writeln!(out, "{empty}")?;
        return Ok(());
    }
    for entry in words {
        writeln!(
            out,
            "{}  {}  {}  {}",
            entry.word.id, entry.word.text, entry.word.pinyin, entry.word.definition
        )?;
    }
    Ok(())
}

fn describe_state(state: &LearningState) -> String {
    let next = state
        .next_review
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unscheduled".to_string());
    let mut line = format!(
        "streak {} | errors {} | next review {}",
        state.consecutive_correct, state.error_count, next
    );
    if state.is_difficult {
        line.push_str(" | difficult");
    }
    line
}
