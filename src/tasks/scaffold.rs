//! Copying the bundled editor settings and CI templates into a project.
//!
//! Templates are compiled into the binary. An existing file is only replaced
//! when forced or after the user confirms it.

use std::fmt;
use std::path::Path;

use log::debug;

use crate::operation::Context;
use crate::operation::param::{Arguments, Param};
use crate::operation::registry::Operation;
use crate::outcome::Outcome;
use crate::tasks::TaskError;

/// A bundled file, `path` being relative to the directory it is installed in.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub path: &'static str,
    pub contents: &'static str,
}

pub const VSCODE_TEMPLATES: &[Template] = &[
    Template {
        path: "extensions.json",
        contents: include_str!("../../templates/vscode/extensions.json"),
    },
    Template {
        path: "settings.json",
        contents: include_str!("../../templates/vscode/settings.json"),
    },
];

pub const GITLAB_TEMPLATES: &[Template] = &[
    Template {
        path: "issue_templates/bug.md",
        contents: include_str!("../../templates/gitlab/issue_templates/bug.md"),
    },
    Template {
        path: "issue_templates/feature.md",
        contents: include_str!("../../templates/gitlab/issue_templates/feature.md"),
    },
    Template {
        path: "merge_request_templates/default.md",
        contents: include_str!("../../templates/gitlab/merge_request_templates/default.md"),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installed {
    Created,
    Replaced,
    Kept,
}

impl fmt::Display for Installed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Installed::Created => write!(f, "has been created"),
            Installed::Replaced => write!(f, "has been replaced"),
            Installed::Kept => write!(f, "has not been replaced"),
        }
    }
}

fn forced_param() -> Param {
    Param::flag("forced")
        .alias("-f")
        .help("Replace all the files")
}

#[must_use]
pub fn vscode() -> Operation {
    Operation::task(
        "vscode",
        "Generate the settings for VS Code.",
        vec![forced_param()],
        |ctx, args| install_all(ctx, args, ".vscode", VSCODE_TEMPLATES),
    )
}

#[must_use]
pub fn gitlab() -> Operation {
    Operation::task(
        "gitlab",
        "Generate the templates for Gitlab.",
        vec![forced_param()],
        |ctx, args| install_all(ctx, args, ".gitlab", GITLAB_TEMPLATES),
    )
}

fn install_all(
    ctx: &Context<'_>,
    args: &Arguments,
    dir: &str,
    templates: &[Template],
) -> Result<Outcome, TaskError> {
    let forced = args.flag("forced");
    for template in templates {
        let display = format!("{dir}/{}", template.path);
        let installed = install(ctx, &ctx.project.root.join(dir), template, forced)?;
        match installed {
            Installed::Kept => ctx.console.failure(format!("'{display}' {installed}.")),
            _ => ctx.console.success(format!("'{display}' {installed}.")),
        }
    }
    Ok(Outcome::Success)
}

/// Write `template` below `dir`, creating parent directories.
///
/// # Errors
///
/// Returns `TaskError::Prompt` if an overwrite needs confirming and the prompt
/// fails, or `TaskError::Io` if the file cannot be written.
pub fn install(
    ctx: &Context<'_>,
    dir: &Path,
    template: &Template,
    forced: bool,
) -> Result<Installed, TaskError> {
    let target = dir.join(template.path);
    let exists = target.exists();

    if exists && !forced {
        let display = format!(
            "{}/{}",
            dir.file_name().unwrap_or_default().to_string_lossy(),
            template.path
        );
        let question = format!("The file '{display}' already exists.\nDo you want to replace it?");
        if !ctx.prompter.confirm(&question, false)? {
            debug!("Keeping {}", target.display());
            return Ok(Installed::Kept);
        }
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    std::fs::write(&target, template.contents).map_err(TaskError::io(&target))?;
    Ok(if exists {
        Installed::Replaced
    } else {
        Installed::Created
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::process::SystemRunner;
    use crate::project::Project;
    use crate::prompt::{NonInteractive, PromptError, Prompter};

    struct Answer(bool);

    impl Prompter for Answer {
        fn confirm(&self, _message: &str, _default: bool) -> Result<bool, PromptError> {
            Ok(self.0)
        }

        fn select(
            &self,
            _message: &str,
            options: &[String],
            _default: usize,
        ) -> Result<String, PromptError> {
            options.first().cloned().ok_or(PromptError::NoOptions)
        }

        fn text(&self, message: &str) -> Result<String, PromptError> {
            Err(PromptError::NotInteractive(message.to_string()))
        }
    }

    fn with_context<R>(
        root: &Path,
        prompter: &dyn Prompter,
        f: impl FnOnce(&Context<'_>) -> R,
    ) -> R {
        let project = Project::at(root);
        let (console, _buffer) = Console::buffered();
        let ctx = Context {
            project: &project,
            console: &console,
            runner: &SystemRunner,
            prompter,
        };
        f(&ctx)
    }

    #[test]
    fn test_install_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join(".gitlab");
        let installed = with_context(dir.path(), &NonInteractive, |ctx| {
            install(ctx, &target_dir, &GITLAB_TEMPLATES[0], false).unwrap()
        });
        assert_eq!(installed, Installed::Created);
        let written = std::fs::read_to_string(target_dir.join("issue_templates/bug.md")).unwrap();
        assert_eq!(written, GITLAB_TEMPLATES[0].contents);
    }

    #[test]
    fn test_existing_file_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join(".vscode");
        std::fs::create_dir(&target_dir).unwrap();
        std::fs::write(target_dir.join("settings.json"), "{}").unwrap();
        let template = &VSCODE_TEMPLATES[1];

        let installed = with_context(dir.path(), &Answer(false), |ctx| {
            install(ctx, &target_dir, template, false).unwrap()
        });
        assert_eq!(installed, Installed::Kept);
        assert_eq!(std::fs::read_to_string(target_dir.join("settings.json")).unwrap(), "{}");

        let err = with_context(dir.path(), &NonInteractive, |ctx| {
            install(ctx, &target_dir, template, false).unwrap_err()
        });
        assert!(matches!(err, TaskError::Prompt(PromptError::NotInteractive(_))));

        let installed = with_context(dir.path(), &Answer(true), |ctx| {
            install(ctx, &target_dir, template, false).unwrap()
        });
        assert_eq!(installed, Installed::Replaced);
    }

    #[test]
    fn test_forced_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join(".vscode");
        std::fs::create_dir(&target_dir).unwrap();
        std::fs::write(target_dir.join("settings.json"), "{}").unwrap();

        let installed = with_context(dir.path(), &NonInteractive, |ctx| {
            install(ctx, &target_dir, &VSCODE_TEMPLATES[1], true).unwrap()
        });
        assert_eq!(installed, Installed::Replaced);
    }

    #[test]
    fn test_templates_are_not_empty() {
        for template in VSCODE_TEMPLATES.iter().chain(GITLAB_TEMPLATES) {
            assert!(!template.contents.trim().is_empty(), "{}", template.path);
        }
    }
}
