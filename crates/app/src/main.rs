use std::path::PathBuf;
use std::sync::Arc;

use chrono::Datelike;
use clap::{Parser, Subcommand};
use services::{AppServices, Clock, CompletionStep, GateError, OpenAiClient, parse_curriculum};
use storage::repository::Storage;
use tracker_core::model::{
    Answer, Curriculum, PracticeQuestion, QuestionKind, Section, TaskId, TrackId, WeekNumber,
};

mod config;
mod quiz;

use config::AppConfig;
use quiz::QuizEnd;

const BUNDLED_CURRICULUM: &str = include_str!("../data/curriculum.json");

#[derive(Parser)]
#[command(name = "tracker", version, about = "Learning progress tracker")]
struct Cli {
    /// SQLite URL or path (overrides TRACKER_DB_URL)
    #[arg(long, global = true)]
    db: Option<String>,
    /// User id (overrides TRACKER_USER)
    #[arg(long, global = true)]
    user: Option<String>,
    /// Curriculum JSON file (overrides TRACKER_CURRICULUM)
    #[arg(long, global = true)]
    curriculum: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record today's check-in
    Checkin {
        /// Activity done today; repeat for several
        #[arg(long = "activity")]
        activities: Vec<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Current and longest streak
    Streak,
    /// Check-in calendar for a month (defaults to the current month)
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Progress rollup for one track or the whole curriculum
    Progress {
        #[arg(long)]
        track: Option<String>,
    },
    /// Mark a task complete, passing a comprehension check first
    Complete {
        #[arg(long)]
        week: u32,
        #[arg(long)]
        task: String,
    },
    /// Mark a task incomplete
    Undo {
        #[arg(long)]
        week: u32,
        #[arg(long)]
        task: String,
    },
    /// Grade a practice answer
    Grade {
        /// Question as inline JSON or a path to a JSON file
        #[arg(long)]
        question: String,
        /// Answer text; comma-separated for multi-part answers, or answer JSON
        #[arg(long)]
        answer: String,
        #[arg(long, default_value_t = 0)]
        time_spent: u32,
    },
    /// Running totals for a practice section
    SectionProgress {
        #[arg(long)]
        section: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracker=info,services=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn build_services(config: &AppConfig) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::default();
    let model = Arc::new(OpenAiClient::from_env());
    if !model.enabled() {
        tracing::info!("no model configured; checks and grading will use fallbacks");
    }

    let services = match &config.curriculum {
        Some(path) => {
            AppServices::new_sqlite(&config.db_url, path, clock, model, config.attempt_ttl).await?
        }
        None => {
            let storage = Storage::sqlite(&config.db_url).await?;
            let curriculum = parse_curriculum(BUNDLED_CURRICULUM)?;
            AppServices::new(&storage, clock, curriculum, model, config.attempt_ttl)
        }
    };
    tracing::debug!(db = %config.db_url, user = %config.user, "services ready");
    Ok(services)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_question(raw: &str) -> Result<PracticeQuestion, Box<dyn std::error::Error>> {
    let json = if raw.trim_start().starts_with('{') {
        raw.to_owned()
    } else {
        std::fs::read_to_string(raw)?
    };
    Ok(serde_json::from_str(&json)?)
}

/// Accept answer JSON as-is; otherwise shape plain text by question kind.
fn parse_answer(kind: QuestionKind, raw: &str) -> Answer {
    if let Ok(answer) = serde_json::from_str::<Answer>(raw) {
        return answer;
    }
    let parts = || raw.split(',').map(|p| p.trim().to_owned()).collect();
    match kind {
        QuestionKind::SingleChoice => Answer::Choice(raw.trim().to_owned()),
        QuestionKind::MultipleChoice => Answer::Choices(parts()),
        QuestionKind::Reorder => Answer::Sequence(parts()),
        QuestionKind::FillInBlank => Answer::Blanks(parts()),
        QuestionKind::Summarize | QuestionKind::Essay => Answer::Text(raw.to_owned()),
    }
}

/// Description of a curriculum task, or the gate's error for a miss.
fn task_text(
    curriculum: &Curriculum,
    week: WeekNumber,
    task: &TaskId,
) -> Result<String, GateError> {
    let definition = curriculum
        .week(week)
        .ok_or(GateError::UnknownWeek(week))?
        .task(task)
        .ok_or_else(|| GateError::UnknownTask {
            week,
            task: task.clone(),
        })?;
    Ok(definition.text.clone())
}

async fn complete(
    services: &AppServices,
    config: &AppConfig,
    week: WeekNumber,
    task: &TaskId,
) -> Result<(), Box<dyn std::error::Error>> {
    let gate = services.completion();
    let user = &config.user;
    let text = task_text(services.curriculum(), week, task)?;

    match gate.request_completion(user, week, task, &text).await? {
        CompletionStep::AlreadyComplete { progress } => {
            println!("Task {task} is already complete.");
            print_json(&progress)
        }
        CompletionStep::CheckUnavailable { progress } => {
            println!("Comprehension check unavailable; task {task} marked complete.");
            print_json(&progress)
        }
        CompletionStep::InQuiz { attempt } => {
            println!("Answer the comprehension check for: {text}");
            match quiz::run(&gate, user, week, task, attempt).await? {
                QuizEnd::Passed { score, progress } => {
                    println!("Task {task} marked complete ({score} correct).");
                    print_json(&progress)
                }
                QuizEnd::Skipped => {
                    println!("Check skipped; task {task} left incomplete.");
                    Ok(())
                }
            }
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::resolve(cli.db, cli.user, cli.curriculum)?;
    let services = build_services(&config).await?;
    let user = &config.user;

    match cli.command {
        Commands::Checkin { activities, notes } => {
            let check_in = services.check_ins().check_in(user, activities, &notes).await?;
            print_json(&check_in)
        }
        Commands::Streak => print_json(&services.check_ins().streak(user).await?),
        Commands::Calendar { year, month } => {
            let today = Clock::default().today();
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            print_json(&services.check_ins().calendar(user, year, month).await?)
        }
        Commands::Progress { track } => {
            let progress = services.progress();
            let rollup = match track {
                Some(track) => progress.track_summary(user, &TrackId::new(track)?).await?,
                None => progress.overall_summary(user).await?,
            };
            print_json(&rollup)
        }
        Commands::Complete { week, task } => {
            complete(&services, &config, WeekNumber::new(week)?, &TaskId::new(task)?).await
        }
        Commands::Undo { week, task } => {
            let progress = services
                .completion()
                .mark_incomplete(user, WeekNumber::new(week)?, &TaskId::new(task)?)
                .await?;
            print_json(&progress)
        }
        Commands::Grade {
            question,
            answer,
            time_spent,
        } => {
            let question = load_question(&question)?;
            let answer = parse_answer(question.kind, &answer);
            let graded = services
                .grading()
                .submit(user, &question, answer, time_spent)
                .await?;
            print_json(&graded)
        }
        Commands::SectionProgress { section } => {
            let section = Section::parse(&section)
                .ok_or_else(|| format!("unknown section: {section}"))?;
            print_json(&services.grading().section_progress(user, section).await?)
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_curriculum_is_valid() {
        let curriculum = parse_curriculum(BUNDLED_CURRICULUM).unwrap();
        assert!(curriculum.weeks().count() > 0);
    }

    #[test]
    fn plain_answers_follow_question_kind() {
        assert_eq!(
            parse_answer(QuestionKind::Reorder, "b, a ,c"),
            Answer::Sequence(vec!["b".into(), "a".into(), "c".into()])
        );
        assert_eq!(
            parse_answer(QuestionKind::Essay, "One, two."),
            Answer::Text("One, two.".into())
        );
        assert_eq!(
            parse_answer(QuestionKind::SingleChoice, r#"{"type":"choice","value":"B"}"#),
            Answer::Choice("B".into())
        );
    }

    #[test]
    fn cli_parses_complete() {
        let cli = Cli::try_parse_from([
            "tracker", "--user", "sam", "complete", "--week", "1", "--task", "1-1",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("sam"));
        assert!(matches!(cli.command, Commands::Complete { week: 1, .. }));
    }

    #[test]
    fn complete_reports_curriculum_misses() {
        let curriculum = parse_curriculum(BUNDLED_CURRICULUM).unwrap();
        let first = curriculum.weeks().next().unwrap();
        let known = &first.tasks[0];
        assert_eq!(
            task_text(&curriculum, first.number, &known.id).unwrap(),
            known.text
        );

        let missing = TaskId::new("no-such-task").unwrap();
        assert!(matches!(
            task_text(&curriculum, first.number, &missing),
            Err(GateError::UnknownTask { .. })
        ));

        let far = WeekNumber::new(999).unwrap();
        assert!(matches!(
            task_text(&curriculum, far, &known.id),
            Err(GateError::UnknownWeek(w)) if w == far
        ));
    }
}
