use std::{cell::RefCell, path::PathBuf, rc::Rc};

use crate::process::{CommandRunner, ProcessCommand, ProcessError, ProcessOutput};

/// Records every command and pretends to be git.
///
/// `ls-remote` prints `listing`, `clone` creates the target with a `.git`
/// directory and `files`, and every subcommand in `failing` exits with 128.
#[derive(Clone, Default)]
pub(crate) struct FakeGit {
    pub commands: Rc<RefCell<Vec<ProcessCommand>>>,
    pub listing: String,
    pub files: Vec<(&'static str, &'static str)>,
    pub failing: Vec<&'static str>,
    pub missing_commit: bool,
}

impl FakeGit {
    pub fn count(&self, subcommand: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|command| command.subcommand() == Some(subcommand))
            .count()
    }
}

impl CommandRunner for FakeGit {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.commands.borrow_mut().push(command.clone());
        let subcommand = command.subcommand().unwrap_or_default();
        let exit = |code: i32| ProcessOutput {
            exit_code: Some(code),
            ..Default::default()
        };

        if self.failing.iter().any(|failing| *failing == subcommand) {
            return Ok(ProcessOutput {
                stderr: format!("fatal: {subcommand} failed"),
                ..exit(128)
            });
        }

        match subcommand {
            "ls-remote" => Ok(ProcessOutput {
                stdout: self.listing.clone(),
                ..exit(0)
            }),
            "cat-file" if self.missing_commit => Ok(exit(1)),
            "clone" => {
                let target = PathBuf::from(command.args.last().unwrap());
                std::fs::create_dir_all(target.join(".git")).unwrap();
                for (name, content) in &self.files {
                    std::fs::write(target.join(name), content).unwrap();
                }
                Ok(exit(0))
            }
            _ => Ok(exit(0)),
        }
    }
}
