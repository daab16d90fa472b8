use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The close did not report back before the deadline.
    TimedOut,
    /// The close finished but returned an error.
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFailure {
    pub index: usize,
    pub name: String,
    pub origin: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResourceFailure {
    pub fn path(&self) -> String {
        format!("{}/{}", self.origin, self.name)
    }
}

impl std::fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.reason) {
            (FailureKind::Errored, Some(reason)) => write!(f, "{}: {}", self.path(), reason),
            (FailureKind::Errored, None) => write!(f, "{}: close failed", self.path()),
            (FailureKind::TimedOut, _) => write!(f, "{}: timed out", self.path()),
        }
    }
}

/// Outcome of one mass teardown.
///
/// `failures` is kept in input order regardless of the order in which the
/// closes finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub total: usize,
    pub closed: usize,
    pub failures: Vec<ResourceFailure>,
    pub elapsed_ms: u64,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn timed_out(&self) -> impl Iterator<Item = &ResourceFailure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::TimedOut)
    }

    pub fn errored(&self) -> impl Iterator<Item = &ResourceFailure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::Errored)
    }
}

impl std::fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "closed {} of {} resource(s)", self.closed, self.total);
        }

        write!(
            f,
            "failed to close {} of {} resource(s): ",
            self.failures.len(),
            self.total
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize, kind: FailureKind, reason: Option<&str>) -> ResourceFailure {
        ResourceFailure {
            index,
            name: format!("Res{}", index),
            origin: "app::db".to_string(),
            kind,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_display_lists_failures_in_order() {
        let report = TeardownReport {
            total: 3,
            closed: 1,
            failures: vec![
                failure(0, FailureKind::TimedOut, None),
                failure(2, FailureKind::Errored, Some("connection reset")),
            ],
            elapsed_ms: 12,
        };

        assert_eq!(
            report.to_string(),
            "failed to close 2 of 3 resource(s): app::db/Res0: timed out, app::db/Res2: connection reset"
        );
    }

    #[test]
    fn test_clean_report() {
        let report = TeardownReport {
            total: 2,
            closed: 2,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "closed 2 of 2 resource(s)");
    }

    #[test]
    fn test_category_filters() {
        let report = TeardownReport {
            total: 3,
            closed: 0,
            failures: vec![
                failure(0, FailureKind::Errored, Some("boom")),
                failure(1, FailureKind::TimedOut, None),
                failure(2, FailureKind::Errored, None),
            ],
            elapsed_ms: 0,
        };

        let timed_out: Vec<usize> = report.timed_out().map(|f| f.index).collect();
        let errored: Vec<usize> = report.errored().map(|f| f.index).collect();
        assert_eq!(timed_out, vec![1]);
        assert_eq!(errored, vec![0, 2]);
    }

    #[test]
    fn test_serializes_kind_snake_case() {
        let json = serde_json::to_value(failure(1, FailureKind::TimedOut, None)).unwrap();
        assert_eq!(json["kind"], "timed_out");
        assert!(json.get("reason").is_none());
    }
}
