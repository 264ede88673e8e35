//! Issue reporting: the sink `IssuesRequest` replay targets, and the
//! `on_compat_error` wiring that feeds it from non-fatal compat failures
//! (spec §6 `IssuesRequest`, §7 "issue-mode replay").

use crate::error::Error;
use crate::ids::CmdId;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct Issue {
    pub cmd: CmdId,
    pub severity: IssueSeverity,
    pub message: String,
}

/// Where reported issues go (spec §6 `IssuesRequest`).
pub trait IssueReporter {
    fn report(&mut self, issue: Issue);
}

/// Test/inspection double.
#[derive(Default)]
pub struct CollectingIssueReporter {
    pub issues: Vec<Issue>,
}

impl IssueReporter for CollectingIssueReporter {
    fn report(&mut self, issue: Issue) {
        self.issues.push(issue);
    }
}

/// The default `on_compat_error` callback (spec §4.1, §7): log it and
/// continue. `replay` in issue mode rewires this to additionally call an
/// [`IssueReporter`].
pub fn log_compat_error(id: CmdId, cmd_name: &str, err: &Error) {
    log::warn!("compat error in {} ({:?}): {}", cmd_name, id, err);
}

pub fn report_compat_error(reporter: &mut dyn IssueReporter, id: CmdId, cmd_name: &str, err: &Error) {
    log_compat_error(id, cmd_name, err);
    reporter.report(Issue {
        cmd: id,
        severity: IssueSeverity::Error,
        message: format!("{}: {}", cmd_name, err),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn compat_error_is_recorded_as_error_severity() {
        let mut r = CollectingIssueReporter::default();
        report_compat_error(&mut r, CmdId::real(3), "glBindBufferRange", &Error::Infrastructure("boom".into()));
        assert_eq!(r.issues.len(), 1);
        assert_eq!(r.issues[0].severity, IssueSeverity::Error);
    }
}
