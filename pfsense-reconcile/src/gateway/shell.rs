use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use config_reconcile_core::script::render::quote;
use config_reconcile_core::{Document, Script};
use tracing::debug;

use crate::error::ReconcileError;
use crate::gateway::{ExecOutput, Gateway};

/// Default location of the pfSense developer shell.
pub const DEFAULT_SHELL: &str = "/usr/local/sbin/pfSsh.php";

/// The shell prints these around the output of an `exec` block.
const EXEC_MARKER: &str = "\npfSense shell: exec\n";
const EXIT_MARKER: &str = "\npfSense shell: exit\n";

/// Gateway that pipes PHP into `pfSsh.php`.
///
/// With an empty prefix the shell is run on this host, which must then be the
/// appliance itself. A prefix such as `["ssh", "root@fw"]` runs it remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellGateway {
    shell: PathBuf,
    prefix: Vec<String>,
}

impl Default for ShellGateway {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellGateway {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            prefix: Vec::new(),
        }
    }

    /// Run the shell through a command prefix.
    pub fn with_prefix(mut self, prefix: Vec<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    fn command(&self) -> Command {
        match self.prefix.split_first() {
            Some((program, args)) => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(&self.shell);
                cmd
            }
            None => Command::new(&self.shell),
        }
    }

    fn run(&self, php: &str, context: &str) -> Result<ExecOutput, ReconcileError> {
        let spawn_err = |source| ReconcileError::Spawn {
            context: context.to_string(),
            source,
        };

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(session(php).as_bytes())
                .map_err(spawn_err)?;
        }
        let output = child.wait_with_output().map_err(spawn_err)?;

        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Gateway for ShellGateway {
    fn check(&self) -> Result<(), ReconcileError> {
        if !self.prefix.is_empty() {
            return Ok(());
        }
        if !self.shell.is_file() {
            return Err(ReconcileError::Precondition(format!(
                "pfSense shell not found at {}",
                self.shell.display()
            )));
        }
        let os = std::env::consts::OS;
        if os != "freebsd" {
            return Err(ReconcileError::Precondition(format!(
                "pfSense platform expected: FreeBSD found: {os}"
            )));
        }
        Ok(())
    }

    fn read(&mut self, section: &str) -> Result<Document, ReconcileError> {
        debug!(section, shell = %self.shell.display(), "reading section");
        let output = self.run(&read_statement(section), "reading config")?;
        if !output.success() {
            return Err(ReconcileError::Transport {
                context: "reading config".to_string(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        decode_section(&output.stdout)
    }

    fn exec(&mut self, script: &Script) -> Result<ExecOutput, ReconcileError> {
        debug!(statements = script.statements().len(), "executing script");
        self.run(&script.render(), "writing config")
    }
}

/// PHP that prints one section as JSON on a line of its own.
pub fn read_statement(section: &str) -> String {
    format!(
        "echo \"\\n\".json_encode($config[{}]).\"\\n\";",
        quote(section)
    )
}

/// Wrap PHP in an `exec` block and leave the shell.
fn session(php: &str) -> String {
    format!("{php}\nexec\nexit\n")
}

/// Cut the `exec` block's output out of a shell transcript.
pub fn extract_payload(transcript: &str) -> Result<&str, ReconcileError> {
    let missing = |marker: &str| ReconcileError::Parse {
        reason: format!("marker {:?} not found in shell output", marker.trim()),
        payload: transcript.to_string(),
    };
    let start = transcript
        .find(EXEC_MARKER)
        .map(|idx| idx + EXEC_MARKER.len())
        .ok_or_else(|| missing(EXEC_MARKER))?;
    let end = transcript[start..]
        .find(EXIT_MARKER)
        .map(|idx| start + idx)
        .ok_or_else(|| missing(EXIT_MARKER))?;
    Ok(&transcript[start..end])
}

/// Decode a section read from a shell transcript.
pub fn decode_section(transcript: &str) -> Result<Document, ReconcileError> {
    let payload = extract_payload(transcript)?;
    serde_json::from_str(payload.trim())
        .map(Document::new)
        .map_err(|err| ReconcileError::Parse {
            reason: err.to_string(),
            payload: payload.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_section, extract_payload, read_statement, ShellGateway};
    use crate::error::ReconcileError;
    use crate::gateway::Gateway;

    const TRANSCRIPT: &str = "Starting the pfSense developer shell....\n\
pfSense shell: exec\n\
\n\
{\"rule\":[{\"tracker\":\"1542170888\",\"type\":\"pass\"}]}\n\
\n\
pfSense shell: exit\n";

    #[test]
    fn payload_is_cut_between_markers() {
        let payload = extract_payload(TRANSCRIPT).expect("payload");
        assert_eq!(payload.trim(), "{\"rule\":[{\"tracker\":\"1542170888\",\"type\":\"pass\"}]}");
    }

    #[test]
    fn transcript_decodes_to_document() {
        let doc = decode_section(TRANSCRIPT).expect("decode");
        assert_eq!(doc.root()["rule"][0]["tracker"], json!("1542170888"));
    }

    #[test]
    fn missing_marker_keeps_raw_output() {
        let err = extract_payload("PHP Fatal error").expect_err("no markers");
        assert!(matches!(
            err,
            ReconcileError::Parse { payload, .. } if payload == "PHP Fatal error"
        ));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let transcript = "x\npfSense shell: exec\n{not json\npfSense shell: exit\n";
        let err = decode_section(transcript).expect_err("bad json");
        assert!(matches!(err, ReconcileError::Parse { payload, .. } if payload == "{not json"));
    }

    #[test]
    fn read_statement_quotes_section() {
        assert_eq!(
            read_statement("filter"),
            "echo \"\\n\".json_encode($config['filter']).\"\\n\";"
        );
    }

    #[test]
    fn missing_local_shell_fails_precondition() {
        let gateway = ShellGateway::new("/nonexistent/pfSsh.php");
        assert!(matches!(
            gateway.check(),
            Err(ReconcileError::Precondition(msg)) if msg.contains("/nonexistent/pfSsh.php")
        ));
    }

    #[test]
    fn remote_prefix_skips_local_checks() {
        let gateway = ShellGateway::new("/nonexistent/pfSsh.php")
            .with_prefix(vec!["ssh".to_string(), "root@fw".to_string()]);
        assert!(gateway.check().is_ok());
    }
}
