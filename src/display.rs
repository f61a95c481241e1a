// src/display.rs

//! Console rendering of a run.
//!
//! Status lines stream to stdout as they arrive; per-execution summaries go
//! to stdout on success and stderr on failure. The returned exit code is 0
//! iff every delivered result is error-free.

use tokio::sync::mpsc;

use crate::session::ExecutionResult;

/// Drain both channels, printing as we go, and compute the exit code.
pub async fn render(
    mut status: mpsc::Receiver<String>,
    mut results: mpsc::Receiver<ExecutionResult>,
) -> i32 {
    let mut failed = false;
    let mut status_open = true;
    let mut results_open = true;

    while status_open || results_open {
        tokio::select! {
            line = status.recv(), if status_open => match line {
                Some(line) => println!("{line}"),
                None => status_open = false,
            },
            result = results.recv(), if results_open => match result {
                Some(result) => failed |= print_result(&result),
                None => results_open = false,
            },
        }
    }

    println!("Done");
    if failed {
        1
    } else {
        0
    }
}

/// Print one result summary. Returns whether it carried an error.
fn print_result(result: &ExecutionResult) -> bool {
    match (&result.error, &result.terraform) {
        (Some(err), _) => {
            eprintln!("{}: ERROR {err}", result.id);
            true
        }
        (None, Some(tf)) => {
            let runtime = tf.runtime().as_secs();
            match tf.changes() {
                Some(changes) => {
                    println!("{}: OK Changes ({runtime}s)", result.id);
                    for line in changes.lines() {
                        println!("  {line}");
                    }
                }
                None if tf.command() == "plan" => {
                    println!("{}: OK No changes ({runtime}s)", result.id);
                }
                None => {
                    println!("{}: OK ({runtime}s)", result.id);
                }
            }
            false
        }
        (None, None) => {
            println!("{}: OK", result.id);
            false
        }
    }
}
