// Error reporting and the global error boundary

use crate::{Error, HttpResponse};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How serious a reported error is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Log,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Log => "log",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request context attached to a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub method: String,
    pub path: String,
}

/// Destination for errors caught by the error boundary
pub trait ErrorReporter: Send + Sync {
    fn report(&self, severity: Severity, message: &str, context: &ReportContext);

    fn log(&self, message: &str, context: &ReportContext) {
        self.report(Severity::Log, message, context);
    }

    fn error(&self, message: &str, context: &ReportContext) {
        self.report(Severity::Error, message, context);
    }

    fn critical(&self, message: &str, context: &ReportContext) {
        self.report(Severity::Critical, message, context);
    }
}

/// Reports through `tracing`, tagged with the deployment environment
#[derive(Debug, Clone)]
pub struct TracingReporter {
    environment: String,
}

impl TracingReporter {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl ErrorReporter for TracingReporter {
    fn report(&self, severity: Severity, message: &str, context: &ReportContext) {
        let environment = self.environment.as_str();
        match severity {
            Severity::Log => info!(
                environment,
                severity = %severity,
                method = %context.method,
                path = %context.path,
                "{}", message
            ),
            Severity::Error => warn!(
                environment,
                severity = %severity,
                method = %context.method,
                path = %context.path,
                "{}", message
            ),
            Severity::Critical => error!(
                environment,
                severity = %severity,
                method = %context.method,
                path = %context.path,
                "{}", message
            ),
        }
    }
}

/// Discards every report; used in development and test
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&self, _severity: Severity, _message: &str, _context: &ReportContext) {}
}

/// Converts handler errors into responses and reports them
#[derive(Clone)]
pub struct ErrorBoundary {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorBoundary {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    /// Build the response for `err` raised while serving `method path`.
    ///
    /// Validation errors become 400 with their issues and are reported at
    /// `error` severity on internal routes, `log` elsewhere. Unmatched routes
    /// are answered without reporting. Other client errors keep their status;
    /// everything else is a 500 reported as `critical`.
    pub fn handle(&self, err: Error, method: &str, path: &str) -> HttpResponse {
        let context = ReportContext {
            method: method.to_string(),
            path: path.to_string(),
        };
        let message = err.to_string();

        if let Some(issues) = err.validation_issues() {
            if path.contains("internal") {
                self.reporter.error(&message, &context);
            } else {
                self.reporter.log(&message, &context);
            }
            return json_response(400, &issues.to_response_body());
        }

        match err {
            Error::RouteNotFound(_) | Error::MethodNotAllowed(_) => {
                json_response(err.status_code(), &json!({ "error": message }))
            }
            _ if err.is_client_error() => {
                self.reporter.log(&message, &context);
                json_response(err.status_code(), &json!({ "error": message }))
            }
            _ => {
                self.reporter.critical(&message, &context);
                json_response(500, &json!({ "error": message }))
            }
        }
    }
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new(Arc::new(NullReporter))
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary").finish_non_exhaustive()
    }
}

fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(status)
        .with_json(body)
        .unwrap_or_else(|_| HttpResponse::internal_server_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationIssue, ValidationIssues};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        reports: Mutex<Vec<(Severity, String)>>,
    }

    impl ErrorReporter for Recorder {
        fn report(&self, severity: Severity, message: &str, _context: &ReportContext) {
            self.reports.lock().push((severity, message.to_string()));
        }
    }

    fn boundary() -> (ErrorBoundary, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (ErrorBoundary::new(recorder.clone()), recorder)
    }

    fn issues() -> ValidationIssues {
        ValidationIssues::from(vec![ValidationIssue::new("name", "must have required property 'name'")])
    }

    #[test]
    fn test_validation_is_logged_on_public_routes() {
        let (boundary, recorder) = boundary();
        let response = boundary.handle(Error::Validation(issues()), "POST", "/users");

        assert_eq!(response.status, 400);
        assert_eq!(recorder.reports.lock()[0].0, Severity::Log);
    }

    #[test]
    fn test_validation_is_an_error_on_internal_routes() {
        let (boundary, recorder) = boundary();
        let response = boundary.handle(Error::Validation(issues()), "POST", "/internal/users");

        assert_eq!(response.status, 400);
        assert_eq!(recorder.reports.lock()[0].0, Severity::Error);
    }

    #[test]
    fn test_internal_error_is_critical() {
        let (boundary, recorder) = boundary();
        let response = boundary.handle(Error::Internal("boom".to_string()), "GET", "/users");

        assert_eq!(response.status, 500);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Internal server error: boom");
        assert_eq!(recorder.reports.lock()[0].0, Severity::Critical);
    }

    #[test]
    fn test_route_not_found_is_not_reported() {
        let (boundary, recorder) = boundary();
        let response = boundary.handle(Error::RouteNotFound("GET /nope".to_string()), "GET", "/nope");

        assert_eq!(response.status, 404);
        assert!(recorder.reports.lock().is_empty());
    }

    #[test]
    fn test_client_error_keeps_status() {
        let (boundary, _) = boundary();
        let response = boundary.handle(Error::Unauthorized("no user".to_string()), "GET", "/users");
        assert_eq!(response.status, 401);
    }
}
