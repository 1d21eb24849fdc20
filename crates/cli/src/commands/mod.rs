pub mod doctor;
pub mod migrate;
pub mod seed;
pub mod slots;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn raw(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
        format!("{{\"command\":\"{}\",\"status\":\"{}\"}}", payload.command, payload.status)
    })
}

#[cfg(test)]
mod tests {
    use super::CommandResult;

    #[test]
    fn success_payload_is_json_with_ok_status() {
        let result = CommandResult::success("migrate", "applied");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"status\": \"ok\""));
        assert!(result.output.contains("\"command\": \"migrate\""));
    }

    #[test]
    fn failure_payload_carries_the_error_class() {
        let result = CommandResult::failure("doctor", "database", "unreachable", 2);
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("\"error_class\": \"database\""));
    }
}
