//! Process execution abstraction.
//!
//! `ProcessRunner` is the trait collaborators use to run external programs.
//! `SystemRunner` is the production implementation.
//! `MockRunner` is the test double that records calls and returns preset responses.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

/// Exit status and combined output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub status: i32,
    /// Standard output followed by standard error.
    pub output: Vec<u8>,
}

impl ProcessOutput {
    /// Successful, empty output.
    pub fn ok() -> Self {
        Self {
            status: 0,
            output: Vec::new(),
        }
    }

    /// Successful output carrying `output`.
    pub fn ok_with(output: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            output: output.into(),
        }
    }

    /// Failed output carrying `output`.
    pub fn failed(status: i32, output: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    /// Whether the exit code was zero.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Output as trimmed text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).trim().to_string()
    }
}

/// Runs an argv to completion.
pub trait ProcessRunner {
    /// Runs `argv[0]` with the remaining arguments. Any non-zero exit is the
    /// caller's failure signal; `Err` means the process could not be started.
    fn run(&self, argv: &[String]) -> io::Result<ProcessOutput>;
}

/// Production runner spawning the program directly, without a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> io::Result<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))?;
        tracing::debug!(program = %program, ?args, "running");
        let output = Command::new(program).args(args).output()?;
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}

/// Test-double runner that records argv and returns pre-configured responses.
///
/// Responses are consumed in order; once exhausted every call succeeds with
/// empty output. With [`MockRunner::writing_outputs`] the runner also creates
/// the file named after `-o`/`-out`, copying the `-i`/`-in` file when there is
/// one, so stages that check for produced artifacts can be exercised.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<VecDeque<io::Result<ProcessOutput>>>,
    commands: Mutex<Vec<Vec<String>>>,
    write_outputs: bool,
}

impl MockRunner {
    /// Runner answering every call with success.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner answering with `responses` in order.
    pub fn with_responses(responses: Vec<ProcessOutput>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Enables output-file creation.
    pub fn writing_outputs(mut self) -> Self {
        self.write_outputs = true;
        self
    }

    /// Queues a spawn failure.
    pub fn push_spawn_error(&self, message: &str) {
        self.lock_responses()
            .push_back(Err(io::Error::new(io::ErrorKind::NotFound, message.to_string())));
    }

    /// Every argv run so far.
    pub fn executed_commands(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Argvs whose first two words are `program subcommand`.
    pub fn calls_to(&self, program: &str, subcommand: &str) -> Vec<Vec<String>> {
        self.executed_commands()
            .into_iter()
            .filter(|argv| {
                argv.first().map(String::as_str) == Some(program)
                    && argv.get(1).map(String::as_str) == Some(subcommand)
            })
            .collect()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<io::Result<ProcessOutput>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_output(argv: &[String]) -> io::Result<()> {
        let flag_value = |flags: &[&str]| {
            argv.iter()
                .position(|arg| flags.contains(&arg.as_str()))
                .and_then(|index| argv.get(index + 1))
        };
        if let Some(out) = flag_value(&["-o", "-out"]) {
            let contents = match flag_value(&["-i", "-in"]) {
                Some(input) if Path::new(input).exists() => std::fs::read(input)?,
                _ => Vec::new(),
            };
            std::fs::write(out, contents)?;
        }
        Ok(())
    }
}

impl ProcessRunner for MockRunner {
    fn run(&self, argv: &[String]) -> io::Result<ProcessOutput> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(argv.to_vec());
        }
        let response = self.lock_responses().pop_front();
        let response = response.unwrap_or_else(|| Ok(ProcessOutput::ok()))?;
        if self.write_outputs && response.success() {
            Self::write_output(argv)?;
        }
        Ok(response)
    }
}
