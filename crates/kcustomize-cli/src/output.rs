use kcustomize_core::messages::Lang;
use kcustomize_core::ports::{IWorkflowObserver, WorkflowEvent};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
    /// Prints one line of a JSON event stream
    fn print_event(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
    fn print_event(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
    fn print_event(&self, value: &serde_json::Value) {
        println!("{}", value);
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// Prints workflow progress in the user's language
pub struct ProgressObserver {
    lang: Lang,
    format: OutputFormat,
    quiet: bool,
    formatter: Box<dyn OutputFormatter>,
}

impl ProgressObserver {
    pub fn new(lang: Lang, format: OutputFormat, quiet: bool) -> Self {
        Self {
            lang,
            format,
            quiet,
            formatter: get_formatter(format == OutputFormat::Json),
        }
    }
}

impl IWorkflowObserver for ProgressObserver {
    fn on_event(&self, event: &WorkflowEvent) {
        let message = event.message(self.lang);

        if self.format == OutputFormat::Json {
            self.formatter.print_event(&event_json(event, message.as_deref()));
            return;
        }

        let Some(message) = message else {
            return;
        };
        if event.is_failure() {
            self.formatter.error(&message);
        } else if matches!(event, WorkflowEvent::Retrying { .. }) {
            self.formatter.warn(&message);
        } else if !self.quiet {
            if matches!(
                event,
                WorkflowEvent::FilesUploaded
                    | WorkflowEvent::SettingUpdated
                    | WorkflowEvent::Deployed
            ) {
                self.formatter.success(&message);
            } else {
                self.formatter.info(&message);
            }
        }
    }
}

/// Stable machine-readable name of an event
fn event_name(event: &WorkflowEvent) -> &'static str {
    match event {
        WorkflowEvent::UploadStarted => "upload_started",
        WorkflowEvent::FileUploaded { .. } => "file_uploaded",
        WorkflowEvent::FileSkipped { .. } => "file_skipped",
        WorkflowEvent::FilesUploaded => "files_uploaded",
        WorkflowEvent::UploadFailed => "upload_failed",
        WorkflowEvent::SettingUpdated => "setting_updated",
        WorkflowEvent::UpdateFailed => "update_failed",
        WorkflowEvent::Deploying => "deploying",
        WorkflowEvent::Deployed => "deployed",
        WorkflowEvent::DeployFailed => "deploy_failed",
        WorkflowEvent::Retrying { .. } => "retrying",
        WorkflowEvent::Watching => "watching",
        WorkflowEvent::ChangesDetected { .. } => "changes_detected",
        WorkflowEvent::CycleFailed { .. } => "cycle_failed",
    }
}

fn event_json(event: &WorkflowEvent, message: Option<&str>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "event": event_name(event),
        "message": message,
    });
    match event {
        WorkflowEvent::FileUploaded { path } => {
            value["path"] = serde_json::json!(path.display().to_string());
        }
        WorkflowEvent::FileSkipped { identity } => {
            value["identity"] = serde_json::json!(identity.to_string());
        }
        WorkflowEvent::Retrying { attempt } => {
            value["attempt"] = serde_json::json!(attempt);
        }
        WorkflowEvent::ChangesDetected { paths } => {
            let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            value["paths"] = serde_json::json!(paths);
        }
        _ => {}
    }
    value
}
