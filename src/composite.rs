//! Running several operations as one, stopping at the first failure.
//!
//! Steps run strictly in order on the calling thread; later steps may depend on
//! the effects of earlier ones (a formatter rewriting files before a linter reads
//! them). Shared arguments are handed to each step only if that step declares
//! them.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::console::{Console, format_duration};
use crate::operation::invoker::{InvokeError, Invoker, RawArg, lex, resolve_arguments};
use crate::operation::param::Arguments;
use crate::operation::registry::{Body, Operation, Registry};
use crate::outcome::Outcome;

/// What happened to one step of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub code: i32,
    pub elapsed: Duration,
}

pub struct CompositeRunner<'r, 'a> {
    invoker: &'r Invoker<'a>,
}

impl<'r, 'a> CompositeRunner<'r, 'a> {
    #[must_use]
    pub fn new(invoker: &'r Invoker<'a>) -> Self {
        Self { invoker }
    }

    /// Run `steps` in order with the shared argument tokens.
    ///
    /// Returns `Outcome::Success` when every step succeeds, otherwise the
    /// outcome of the first failing step; later steps are not run.
    ///
    /// Every step's arguments are resolved before the first step runs, so an
    /// argument error never leaves earlier steps half done.
    ///
    /// # Errors
    ///
    /// Returns the first step's `InvokeError`, if a step could not run at all,
    /// or an argument error when the shared tokens do not fit some step.
    pub fn run_sequence(
        &self,
        label: &str,
        steps: &[&Operation],
        shared: &[String],
    ) -> Result<Outcome, InvokeError> {
        let per_step = prepare(self.invoker.registry(), steps, shared)?;
        let console = self.invoker.context().console;
        let total = steps.len();
        let total_start = Instant::now();
        let mut records: Vec<StepRecord> = Vec::with_capacity(total);

        for (i, (step, args)) in steps.iter().zip(&per_step).enumerate() {
            let idx = i + 1;
            debug!("{label}: step {idx}/{total} '{}' with {args:?}", step.name);
            console.step_started(idx, total, &step.name);

            let start = Instant::now();
            let result = match args {
                Prepared::Task(args) => self.invoker.invoke_resolved(step, args),
                Prepared::Sequence(tokens) => self.invoker.invoke_operation(step, tokens),
            };
            let elapsed = start.elapsed();

            let code = match &result {
                Ok(outcome) => outcome.code(),
                Err(err) => err.exit_code(),
            };
            records.push(StepRecord {
                name: step.name.clone(),
                code,
                elapsed,
            });

            if code == 0 {
                console.step_succeeded(idx, total, &step.name, elapsed);
                continue;
            }

            console.step_failed(idx, total, &step.name, code, elapsed);
            print_summary(console, label, &records, total, total_start.elapsed());
            return result;
        }

        print_summary(console, label, &records, total, total_start.elapsed());
        Ok(Outcome::Success)
    }
}

/// A step ready to run: a task's resolved arguments, or a nested sequence's tokens.
#[derive(Debug)]
enum Prepared {
    Task(Arguments),
    Sequence(Vec<String>),
}

/// Split the shared tokens and resolve them for every step, nested sequences included.
fn prepare(
    registry: &Registry,
    steps: &[&Operation],
    shared: &[String],
) -> Result<Vec<Prepared>, InvokeError> {
    let per_step = split_shared_arguments(steps, shared)?;
    steps
        .iter()
        .zip(per_step)
        .map(|(step, tokens)| match step.body() {
            Body::Task(_) => resolve_arguments(step, &tokens).map(Prepared::Task),
            Body::Sequence(names) => {
                prepare(registry, &registry.steps(names)?, &tokens)?;
                Ok(Prepared::Sequence(tokens))
            }
        })
        .collect()
}

/// Hand each step the shared tokens its own schema declares, in their original order.
///
/// Options none of the steps know are dropped with a warning, together with a
/// value following them. Positional tokens go to every step accepting positionals.
///
/// # Errors
///
/// Returns `InvokeError::MissingValue` when a known option lacks its value.
pub fn split_shared_arguments(
    steps: &[&Operation],
    shared: &[String],
) -> Result<Vec<Vec<String>>, InvokeError> {
    let raw = lex(shared, |spelling| {
        steps.iter().find_map(|step| step.find_alias(spelling))
    })?;

    let mut warned = HashSet::new();
    for arg in &raw {
        if let RawArg::Unknown(token) = arg
            && warned.insert(token.as_str())
        {
            warn!("Ignoring `{token}`: no step accepts it");
        }
    }

    Ok(steps
        .iter()
        .map(|step| {
            let mut options = Vec::new();
            let mut positionals = Vec::new();
            for arg in &raw {
                match arg {
                    RawArg::Known { spelling, .. } if step.find_alias(spelling).is_some() => {
                        options.extend(arg.to_tokens());
                    }
                    RawArg::Positional(token) if step.accepts_positionals() => {
                        positionals.push(token.clone());
                    }
                    _ => {}
                }
            }
            if !positionals.is_empty() {
                options.push("--".to_string());
                options.extend(positionals);
            }
            options
        })
        .collect())
}

fn print_summary(
    console: &Console,
    label: &str,
    records: &[StepRecord],
    total: usize,
    elapsed: Duration,
) {
    let passed = records.iter().filter(|r| r.code == 0).count();
    let failed = records.len() - passed;
    let skipped = total - records.len();
    let elapsed = format_duration(elapsed);

    if failed == 0 {
        console.success(format!("{label}: {passed} of {total} passed ({elapsed})"));
        console.println("🎉 Nice! 🎉");
    } else {
        console.failure(format!(
            "{label}: {passed} passed, {failed} failed, {skipped} skipped ({elapsed})"
        ));
        console.println("😭 Oh no!! 😭");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::operation::Context;
    use crate::operation::param::{Kind, Param};
    use crate::process::SystemRunner;
    use crate::project::Project;
    use crate::prompt::NonInteractive;

    type Ran = Rc<RefCell<Vec<usize>>>;

    /// Step `index` records itself and exits with `code`.
    fn recording_step(index: usize, code: i32, ran: &Ran) -> Operation {
        let ran = Rc::clone(ran);
        Operation::task(
            &format!("step{index}"),
            "",
            vec![Param::option("level", Kind::Integer)],
            move |_, _| {
                ran.borrow_mut().push(index);
                Ok(Outcome::from_code(code))
            },
        )
    }

    fn run(steps: &[Operation], shared: &[String]) -> (Result<Outcome, InvokeError>, String) {
        let registry = Registry::new();
        let project = Project::at(".");
        let (console, buffer) = Console::buffered();
        let context = Context {
            project: &project,
            console: &console,
            runner: &SystemRunner,
            prompter: &NonInteractive,
        };
        let invoker = Invoker::new(&registry, context);
        let steps: Vec<&Operation> = steps.iter().collect();
        let result = CompositeRunner::new(&invoker).run_sequence("all", &steps, shared);
        (result, buffer.contents())
    }

    #[test]
    fn test_stops_at_every_possible_failing_step() {
        let n = 4;
        for failing in 1..=n {
            let ran = Ran::default();
            let steps: Vec<Operation> = (1..=n)
                .map(|i| recording_step(i, if i == failing { 7 } else { 0 }, &ran))
                .collect();

            let (result, output) = run(&steps, &[]);

            assert_eq!(result.unwrap(), Outcome::Failed { code: 7 });
            assert_eq!(*ran.borrow(), (1..=failing).collect::<Vec<_>>());
            assert!(output.contains(&format!("[{failing}/{n}] step{failing} failed")));
            assert!(output.contains(&format!("{} skipped", n - failing)));
        }
    }

    #[test]
    fn test_all_steps_succeed() {
        let ran = Ran::default();
        let steps: Vec<Operation> = (1..=3).map(|i| recording_step(i, 0, &ran)).collect();

        let (result, output) = run(&steps, &[]);

        assert_eq!(result.unwrap(), Outcome::Success);
        assert_eq!(*ran.borrow(), [1, 2, 3]);
        assert!(output.contains("3 of 3 passed"));
    }

    #[test]
    fn test_argument_error_runs_no_step() {
        let ran = Ran::default();
        let steps: Vec<Operation> = (1..=3).map(|i| recording_step(i, 0, &ran)).collect();

        let (result, output) = run(&steps, &tokens(&["--level", "high"]));

        assert!(matches!(result, Err(InvokeError::ArgumentType { .. })));
        assert!(ran.borrow().is_empty());
        assert!(output.is_empty());
    }

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    fn op(name: &str, params: Vec<Param>) -> Operation {
        Operation::task(name, "", params, |_, _| Ok(Outcome::Success))
    }

    #[test]
    fn test_split_keeps_only_declared_options() {
        let black = op(
            "black",
            vec![
                Param::flag("check"),
                Param::option("line_length", Kind::Integer).alias("-l"),
            ],
        );
        let ruff = op("ruff", vec![Param::flag("fix")]);
        let mypy = op(
            "mypy",
            vec![
                Param::flag("strict"),
                Param::positional("file_or_dir", Kind::Text).repeated(),
            ],
        );
        let steps = [&black, &ruff, &mypy];

        let split = split_shared_arguments(
            &steps,
            &tokens(&["--check", "-l", "100", "--fix", "--strict", "pkg", "--nope"]),
        )
        .unwrap();

        assert_eq!(split[0], tokens(&["--check", "-l", "100"]));
        assert_eq!(split[1], tokens(&["--fix"]));
        assert_eq!(split[2], tokens(&["--strict", "--", "pkg"]));
    }

    #[test]
    fn test_split_missing_value() {
        let black = op(
            "black",
            vec![Param::option("line_length", Kind::Integer).alias("-l")],
        );
        let err = split_shared_arguments(&[&black], &tokens(&["-l"])).unwrap_err();
        assert!(matches!(err, InvokeError::MissingValue { .. }));
    }
}
