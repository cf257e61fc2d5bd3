//! Binary entry point for the netloom CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use netloom::{StackConfig, StackError, StackOverrides, build_stack};

mod cli;

use cli::{Cli, PlanCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to assemble plan: {0}")]
    Build(#[from] StackError),
    #[error("failed to render plan: {0}")]
    Render(String),
    #[error("failed to write plan to `{path}`: {message}")]
    Write {
        path: String,
        message: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Plan(command) => plan_command(&command),
    }
}

fn plan_command(args: &PlanCommand) -> Result<(), CliError> {
    let config = StackConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?
        .override_with(&overrides_from(args));
    let request = config
        .as_request()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let plan = build_stack(&request)?;
    let rendered =
        serde_json::to_string_pretty(&plan).map_err(|err| CliError::Render(err.to_string()))?;

    match &args.out {
        Some(path) => write_plan(path, &rendered),
        None => {
            writeln!(io::stdout(), "{rendered}").ok();
            Ok(())
        }
    }
}

fn overrides_from(args: &PlanCommand) -> StackOverrides {
    StackOverrides {
        prefix: args.prefix.clone(),
        region: args.region.clone(),
        az_count: args.az_count,
        image_uri: args.image_uri.clone(),
        cpu: args.cpu,
        memory: args.memory,
        container_port: args.container_port,
        desired_count: args.desired_count,
    }
}

fn write_plan(path: &str, contents: &str) -> Result<(), CliError> {
    write_string_ambient(path, contents).map_err(|message| CliError::Write {
        path: path.to_owned(),
        message,
    })
}

fn write_string_ambient(path: &str, contents: &str) -> Result<(), String> {
    let path_buf = Utf8Path::new(path);

    let (dir_path, file_path) = if path_buf.is_absolute() {
        let parent = path_buf
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path_buf}"))?;
        let file_name = path_buf
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path_buf}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path_buf)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.write(file_path, contents).map_err(|err| err.to_string())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_from_maps_every_flag() {
        let command = PlanCommand {
            prefix: Some(String::from("lab")),
            region: Some(String::from("eu-central-1")),
            az_count: Some(3),
            image_uri: Some(String::from("nginx:1.27")),
            cpu: Some(512),
            memory: Some(1024),
            container_port: Some(8080),
            desired_count: Some(2),
            out: None,
        };
        let overrides = overrides_from(&command);
        assert_eq!(overrides.prefix.as_deref(), Some("lab"));
        assert_eq!(overrides.region.as_deref(), Some("eu-central-1"));
        assert_eq!(overrides.az_count, Some(3));
        assert_eq!(overrides.image_uri.as_deref(), Some("nginx:1.27"));
        assert_eq!(overrides.cpu, Some(512));
        assert_eq!(overrides.memory, Some(1024));
        assert_eq!(overrides.container_port, Some(8080));
        assert_eq!(overrides.desired_count, Some(2));
    }

    #[test]
    fn write_error_renders_build_failures() {
        let mut buf = Vec::new();
        let err = CliError::Config(String::from("missing region"));
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.contains("configuration error: missing region"));
    }
}
