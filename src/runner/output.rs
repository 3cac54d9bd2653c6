//! Demultiplexes the tool's combined text output into annotation lines,
//! the structured result line and plain log lines.

use serde_json::Value;

use crate::actions::Reporter;
use crate::runner::exec::ExecOutcome;

/// 工作流注解行的前缀，例如 `::warning file=main.go,line=3::...`
const ANNOTATION_SENTINEL: &str = "::";

/// The name of the structured output slot exposed to downstream steps.
pub const JSON_OUTPUT_NAME: &str = "json";

/// Per-line classification. Parsing is an explicit attempt, not
/// exception-driven control flow.
#[derive(Debug)]
pub enum LineKind {
    Annotation,
    Structured(Value),
    Plain,
}

pub fn classify_line(line: &str) -> LineKind {
    if line.starts_with(ANNOTATION_SENTINEL) {
        return LineKind::Annotation;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) => LineKind::Structured(value),
        Err(_) => LineKind::Plain,
    }
}

/// Forward every non-empty line of `text` to the matching sink. When more
/// than one line parses as JSON the slot is overwritten, so the last one
/// wins.
pub fn reconcile(text: &str, reporter: &mut dyn Reporter) {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match classify_line(trimmed) {
            LineKind::Annotation => reporter.annotation(line),
            LineKind::Structured(_) => reporter.set_output(JSON_OUTPUT_NAME, trimmed),
            LineKind::Plain => reporter.info(line),
        }
    }
}

/// stdout 在前、stderr 在后，两者非空才处理
pub fn reconcile_outcome(outcome: &ExecOutcome, reporter: &mut dyn Reporter) {
    if !outcome.stdout().is_empty() {
        reconcile(outcome.stdout(), reporter);
    }
    if !outcome.stderr().is_empty() {
        reconcile(outcome.stderr(), reporter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingReporter {
        annotations: Vec<String>,
        infos: Vec<String>,
        outputs: Vec<(String, String)>,
        errors: Vec<String>,
    }

    impl Reporter for RecordingReporter {
        fn annotation(&mut self, line: &str) {
            self.annotations.push(line.to_string());
        }

        fn info(&mut self, line: &str) {
            self.infos.push(line.to_string());
        }

        fn set_output(&mut self, name: &str, value: &str) {
            self.outputs.push((name.to_string(), value.to_string()));
        }

        fn error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    #[test]
    fn test_demultiplexes_three_line_kinds() {
        let mut reporter = RecordingReporter::default();
        reconcile("::warning::x\n{\"a\":1}\nplain text\n", &mut reporter);

        assert_eq!(reporter.annotations, vec!["::warning::x"]);
        assert_eq!(
            reporter.outputs,
            vec![("json".to_string(), "{\"a\":1}".to_string())]
        );
        assert_eq!(reporter.infos, vec!["plain text"]);
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let mut reporter = RecordingReporter::default();
        reconcile("\n\n  \nplain\n\n", &mut reporter);
        assert_eq!(reporter.infos, vec!["plain"]);
        assert!(reporter.annotations.is_empty());
        assert!(reporter.outputs.is_empty());
    }

    #[test]
    fn test_last_json_line_wins() {
        let mut reporter = RecordingReporter::default();
        reconcile("{\"a\":1}\n{\"a\":2}\n", &mut reporter);
        assert_eq!(reporter.outputs.last().unwrap().1, "{\"a\":2}");
    }

    #[test]
    fn test_annotation_lines_are_never_reparsed() {
        // 即使注解行正文恰好是 JSON，也必须原样转发
        let mut reporter = RecordingReporter::default();
        reconcile("::notice::{\"a\":1}\n", &mut reporter);
        assert_eq!(reporter.annotations, vec!["::notice::{\"a\":1}"]);
        assert!(reporter.outputs.is_empty());
    }

    #[test]
    fn test_outcome_order_stdout_then_stderr() {
        let outcome = ExecOutcome::Failed {
            code: 1,
            stdout: "first\n".to_string(),
            stderr: "second\n".to_string(),
        };
        let mut reporter = RecordingReporter::default();
        reconcile_outcome(&outcome, &mut reporter);
        assert_eq!(reporter.infos, vec!["first", "second"]);
    }
}
