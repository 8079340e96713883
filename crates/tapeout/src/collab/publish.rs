//! Publish collaborator

use super::{run_command, CollaboratorError, CommandSpec};
use async_trait::async_trait;
use tracing::info;

/// Default publisher timeout in seconds.
pub const DEFAULT_PUBLISHER_TIMEOUT_SECS: u64 = 60;

/// Performs the external publish action.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text` and return the durable identifier the outside world
    /// assigned to it. An `Err` means nothing was published.
    async fn publish(&self, text: &str) -> Result<String, CollaboratorError>;
}

/// Publisher backed by an external program.
///
/// The draft text is passed as the final argument. The program reports the
/// identifier on stdout, either as `ID: <id>` anywhere in its output or as
/// its last non-empty line.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    spec: CommandSpec,
}

impl CommandPublisher {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    async fn publish(&self, text: &str) -> Result<String, CollaboratorError> {
        let timeout = self.spec.timeout_or(DEFAULT_PUBLISHER_TIMEOUT_SECS);
        let stdout = run_command(&self.spec, &[text], None, timeout).await?;
        let id = parse_publish_id(&stdout).ok_or(CollaboratorError::EmptyOutput)?;
        info!(external_id = %id, "Publisher accepted draft");
        Ok(id)
    }
}

/// Extract the durable identifier from publisher output.
pub fn parse_publish_id(output: &str) -> Option<String> {
    let tagged = output.lines().find_map(|line| {
        let (_, rest) = line.split_once("ID:")?;
        rest.split_whitespace().next().map(str::to_string)
    });
    if tagged.is_some() {
        return tagged;
    }

    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_after_tag() {
        let out = "Posting...\nSuccess! Tweet ID: 1790000000000000001\nbye\n";
        assert_eq!(parse_publish_id(out).as_deref(), Some("1790000000000000001"));
    }

    #[test]
    fn last_nonempty_line_without_tag() {
        assert_eq!(parse_publish_id("ok\n  abc-123  \n\n").as_deref(), Some("abc-123"));
    }

    #[test]
    fn empty_output_has_no_id() {
        assert_eq!(parse_publish_id(""), None);
        assert_eq!(parse_publish_id("\n \n"), None);
    }

    #[test]
    fn dangling_tag_falls_back_to_last_line() {
        assert_eq!(parse_publish_id("ID:\nposted 42").as_deref(), Some("posted 42"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_publisher_receives_text_as_last_arg() {
        let publisher = CommandPublisher::new(
            CommandSpec::new("/bin/sh").with_args(["-c", "echo \"got: $1\"; echo 'ID: p-7'", "publish"]),
        );
        let id = publisher.publish("hello world").await.unwrap();
        assert_eq!(id, "p-7");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_publisher_is_an_error() {
        let publisher =
            CommandPublisher::new(CommandSpec::new("/bin/sh").with_args(["-c", "true"]));
        let err = publisher.publish("text").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::EmptyOutput));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_publisher_is_an_error() {
        let publisher = CommandPublisher::new(
            CommandSpec::new("/bin/sh").with_args(["-c", "echo 'rate limited' >&2; exit 2"]),
        );
        let err = publisher.publish("text").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Exit { .. }));
    }
}
