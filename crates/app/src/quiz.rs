use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use services::{AttemptView, CompletionGate, FinishResult, GateError};
use tracker_core::model::{PASS_THRESHOLD, TaskId, UserId, WeekNumber, WeekProgress};

/// How an interactive check ended.
pub enum QuizEnd {
    Passed { score: u8, progress: WeekProgress },
    Skipped,
}

enum Input {
    Select(usize),
    Next,
    Previous,
    Finish,
    Retry,
    Skip,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "f" | "finish" => Input::Finish,
        "r" | "retry" => Input::Retry,
        "s" | "skip" | "q" | "quit" => Input::Skip,
        other => match other.parse::<usize>() {
            Ok(n @ 1..=4) => Input::Select(n - 1),
            _ => Input::Unknown,
        },
    }
}

fn print_question(view: &AttemptView) {
    let Some(question) = view.current() else {
        return;
    };
    println!();
    println!(
        "Question {}/{}: {}",
        view.current_index + 1,
        view.questions.len(),
        question.question
    );
    for (i, option) in question.options.iter().enumerate() {
        let marker = if question.selected == Some(i) { '*' } else { ' ' };
        println!("  {marker} {}) {option}", i + 1);
    }
}

fn print_review(view: &AttemptView) {
    for (i, q) in view.questions.iter().enumerate() {
        let verdict = if q.selected.is_some() && q.selected == q.correct_answer {
            "correct"
        } else {
            "wrong"
        };
        println!("{}. {} ({verdict})", i + 1, q.question);
        if let Some(explanation) = &q.explanation {
            println!("   {explanation}");
        }
    }
}

async fn prompt(
    input: &mut (impl AsyncBufRead + Unpin),
    text: &str,
) -> io::Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Drive a comprehension check from stdin until it is passed or skipped.
///
/// # Errors
///
/// Returns an error if stdin/stdout fail or the gate reports a storage failure.
pub async fn run(
    gate: &CompletionGate,
    user: &UserId,
    week: WeekNumber,
    task: &TaskId,
    mut view: AttemptView,
) -> Result<QuizEnd, Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin());

    loop {
        if view.is_answering() {
            print_question(&view);
        }
        let hint = if view.is_answering() {
            "[1-4] answer, n next, p previous, f finish, s skip > "
        } else {
            "r retry, s skip > "
        };
        let Some(line) = prompt(&mut input, hint).await? else {
            gate.skip(user, week, task).await?;
            return Ok(QuizEnd::Skipped);
        };

        let step = match parse_input(&line) {
            Input::Select(option) => gate.select_answer(user, week, task, option).await,
            Input::Next => gate.next_question(user, week, task).await,
            Input::Previous => gate.previous_question(user, week, task).await,
            Input::Retry => gate.retry(user, week, task).await,
            Input::Skip => {
                gate.skip(user, week, task).await?;
                return Ok(QuizEnd::Skipped);
            }
            Input::Finish => match gate.finish(user, week, task).await {
                Ok(FinishResult::Passed {
                    score,
                    progress,
                    attempt,
                }) => {
                    println!("\nPassed with {score}/{}.", attempt.questions.len());
                    print_review(&attempt);
                    return Ok(QuizEnd::Passed { score, progress });
                }
                Ok(FinishResult::Failed { score, attempt }) => {
                    println!(
                        "\nScored {score}/{}; {PASS_THRESHOLD} correct answers are needed.",
                        attempt.questions.len()
                    );
                    print_review(&attempt);
                    Ok(attempt)
                }
                Err(err) => Err(err),
            },
            Input::Unknown => {
                println!("Unrecognized input.");
                continue;
            }
        };

        match step {
            Ok(next) => view = next,
            Err(GateError::Attempt(reason)) => println!("{reason}"),
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_one_based() {
        assert!(matches!(parse_input("1\n"), Input::Select(0)));
        assert!(matches!(parse_input(" 4 "), Input::Select(3)));
        assert!(matches!(parse_input("5"), Input::Unknown));
        assert!(matches!(parse_input("0"), Input::Unknown));
        assert!(matches!(parse_input("F"), Input::Finish));
        assert!(matches!(parse_input("q"), Input::Skip));
    }

    #[tokio::test]
    async fn prompt_reads_lines_until_eof() {
        let mut input: &[u8] = b"2\nfinish\n";
        assert_eq!(prompt(&mut input, "").await.unwrap().as_deref(), Some("2\n"));
        assert_eq!(
            prompt(&mut input, "").await.unwrap().as_deref(),
            Some("finish\n")
        );
        assert_eq!(prompt(&mut input, "").await.unwrap(), None);
    }
}
