//! Command execution.

use crate::Commands;
use colored::Colorize;
use schemarpc_core::{Config, TypeResolver, UnwrapMode};
use schemarpc_protocol::{Message, Primitive, Protocol, Schema, PROTOCOL_FILE_EXTENSION};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Executes a command and returns the formatted output.
pub fn execute(config: &Config, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Inspect {
            protocol,
            recursive,
        } => {
            let content = std::fs::read_to_string(protocol_path(&protocol))?;
            let protocol = Protocol::parse_str(&content)?;
            let resolver = resolver(config, recursive);
            tracing::debug!(protocol = %protocol.fullname(), unwrap = ?resolver.unwrap_mode(), "inspecting");
            Ok(format_protocol(&protocol, &resolver))
        }

        Commands::Resolve { schema, recursive } => {
            let json = parse_json_arg(&schema)?;
            let schema = Schema::parse(&json)?;
            Ok(resolver(config, recursive).resolve(&schema).to_string())
        }

        Commands::Config => Ok(serde_yaml::to_string(config)?),
    }
}

/// Resolves a protocol argument to a file, adding the `.avpr` extension when
/// the argument names no existing file and has no extension of its own.
fn protocol_path(arg: &str) -> PathBuf {
    let path = Path::new(arg);
    if path.exists() || path.extension().is_some() {
        return path.to_path_buf();
    }
    path.with_extension(PROTOCOL_FILE_EXTENSION)
}

fn resolver(config: &Config, recursive: bool) -> TypeResolver {
    if recursive {
        TypeResolver::new(UnwrapMode::Recursive)
    } else {
        TypeResolver::new(config.resolver.unwrap)
    }
}

fn format_protocol(protocol: &Protocol, resolver: &TypeResolver) -> String {
    let mut lines = vec![format!("Protocol {}", protocol.fullname().cyan())
        .bold()
        .to_string()];
    if let Some(doc) = &protocol.doc {
        lines.push(format!("  {}", doc.dimmed()));
    }

    if protocol.messages().is_empty() {
        lines.push(format!("  {}", "(no messages)".dimmed()));
    }
    for message in protocol.messages() {
        lines.push(format_message(message, resolver));
    }

    lines.join("\n")
}

fn format_message(message: &Message, resolver: &TypeResolver) -> String {
    let signature = resolver.resolve_message(message);
    let params: Vec<String> = message
        .request
        .iter()
        .zip(&signature.param_types)
        .map(|(field, ty)| format!("{}: {}", field.name, ty.to_string().yellow()))
        .collect();

    let mut line = format!("  {}({})", message.name.green(), params.join(", "));
    if message.one_way {
        line.push_str(&format!(" {}", "[one-way]".dimmed()));
    } else if message.response != Schema::Primitive(Primitive::Null) {
        line.push_str(&format!(" -> {}", message.response));
    }
    if !message.errors.is_empty() {
        let errors: Vec<String> = message
            .errors
            .iter()
            .map(|e| e.fullname().unwrap_or_else(|| e.type_name().to_string()))
            .collect();
        line.push_str(&format!(" {} {}", "throws".red(), errors.join(", ")));
    }
    line
}

/// Parses a JSON argument, which may be inline JSON or @file.json.
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        // Bare primitive names are accepted without quotes.
        match serde_json::from_str(arg) {
            Ok(value) => Ok(value),
            Err(_) => Ok(Value::String(arg.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_arg() {
        assert_eq!(parse_json_arg("int").unwrap(), Value::String("int".into()));
        assert_eq!(
            parse_json_arg(r#"{"type": "array", "items": "long"}"#).unwrap()["items"],
            "long"
        );
    }

    #[test]
    fn test_resolve_command() {
        colored::control::set_override(false);
        let config = Config::default();

        let out = execute(
            &config,
            Commands::Resolve {
                schema: r#"{"type": "array", "items": {"type": "array", "items": "int"}}"#.into(),
                recursive: false,
            },
        )
        .unwrap();
        assert_eq!(out, "array");

        let out = execute(
            &config,
            Commands::Resolve {
                schema: r#"{"type": "array", "items": {"type": "array", "items": "int"}}"#.into(),
                recursive: true,
            },
        )
        .unwrap();
        assert_eq!(out, "i32");
    }

    #[test]
    fn test_inspect_command() {
        colored::control::set_override(false);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("echo.avpr");
        std::fs::write(
            &path,
            r#"{"protocol": "Echo", "namespace": "demo",
                "types": [{"type": "error", "name": "Refused", "fields": []}],
                "messages": {
                    "echo": {"request": [{"name": "text", "type": "string"}],
                             "response": "string", "errors": ["Refused"]},
                    "ping": {"request": [], "one-way": true}
                }}"#,
        )
        .unwrap();

        let out = execute(
            &Config::default(),
            Commands::Inspect {
                protocol: path.to_string_lossy().into_owned(),
                recursive: false,
            },
        )
        .unwrap();

        assert!(out.contains("Protocol demo.Echo"));
        assert!(out.contains(&format!(
            "echo(text: {}) -> \"string\" throws demo.Refused",
            std::any::type_name::<String>()
        )));
        assert!(out.contains("ping() [one-way]"));
    }

    #[test]
    fn test_protocol_path_adds_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let bare = dir.path().join("bank");
        let bare_arg = bare.to_string_lossy().into_owned();

        assert_eq!(protocol_path(&bare_arg), dir.path().join("bank.avpr"));

        std::fs::write(&bare, "{}").unwrap();
        assert_eq!(protocol_path(&bare_arg), bare);

        let json = dir.path().join("bank.json");
        assert_eq!(protocol_path(&json.to_string_lossy()), json);
    }

    #[test]
    fn test_inspect_bundled_protocol_without_extension() {
        colored::control::set_override(false);
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/protocols/bank");

        let out = execute(
            &Config::default(),
            Commands::Inspect {
                protocol: path.to_string(),
                recursive: false,
            },
        )
        .unwrap();
        assert!(out.contains("deposit("));
    }

    #[test]
    fn test_config_command() {
        let out = execute(&Config::default(), Commands::Config).unwrap();
        assert!(out.contains("unwrap: single_level"));
        assert!(out.contains("eager_validation: false"));
    }
}
