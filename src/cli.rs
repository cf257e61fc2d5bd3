//! Command-line interface definitions for the `netloom` binary.
//!
//! This module centralises the clap parser structures so both the main
//! binary and the build script can reuse them when generating the manual
//! page.

use clap::Parser;

/// Top-level CLI for the `netloom` binary.
#[derive(Debug, Parser)]
#[command(
    name = "netloom",
    about = "Synthesize a multi-AZ network and service topology as a declaration plan",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Assemble the declaration plan and render it as JSON.
    #[command(name = "plan", about = "Assemble the declaration plan and render it as JSON")]
    Plan(PlanCommand),
}

/// Arguments for the `netloom plan` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct PlanCommand {
    /// Override the stack naming prefix for this plan.
    #[arg(long, value_name = "PREFIX")]
    pub(crate) prefix: Option<String>,
    /// Override the region locator for this plan.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Override the availability-zone count for this plan.
    ///
    /// Values outside the CIDR budget are rejected before any declaration
    /// is assembled.
    #[arg(long, value_name = "COUNT")]
    pub(crate) az_count: Option<u8>,
    /// Override the container image reference for this plan.
    #[arg(long, value_name = "IMAGE")]
    pub(crate) image_uri: Option<String>,
    /// Override the task CPU units.
    #[arg(long, value_name = "UNITS")]
    pub(crate) cpu: Option<u32>,
    /// Override the task memory in MiB.
    #[arg(long, value_name = "MIB")]
    pub(crate) memory: Option<u32>,
    /// Override the container port exposed to the load balancer.
    #[arg(long, value_name = "PORT")]
    pub(crate) container_port: Option<u16>,
    /// Override the desired task count.
    #[arg(long, value_name = "COUNT")]
    pub(crate) desired_count: Option<u32>,
    /// Write the plan JSON to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub(crate) out: Option<String>,
}
