//! `ignition-probe`: list Vulkan accelerators and their queue topology,
//! optionally evaluating them against selection criteria given on the
//! command line.

use std::process;

use ash::vk;
use clap::Parser;
use ignition::{filter_candidates, Candidate, DeviceProfile, InstanceBuilder, PhysicalDeviceSelector};

#[derive(Parser)]
#[command(
    name = "ignition-probe",
    version,
    about = "List Vulkan accelerators and their queue topology"
)]
struct Cli {
    /// Enable the Khronos validation layer and debug messenger
    #[arg(long)]
    validation: bool,
    /// Reject devices reporting an api version below this (e.g. "1.2")
    #[arg(long, value_name = "MAJOR.MINOR[.PATCH]")]
    min_version: Option<String>,
    /// Accept only these device kinds (discrete, integrated, virtual, cpu)
    #[arg(long, value_name = "KIND")]
    kind: Vec<String>,
    /// Require a device extension by name (repeatable)
    #[arg(long = "extension", value_name = "NAME")]
    extensions: Vec<String>,
}

fn parse_version(text: &str) -> Option<u32> {
    let mut parts = text.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch: u32 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(vk::make_api_version(0, major, minor, patch))
}

fn parse_kind(text: &str) -> Option<vk::PhysicalDeviceType> {
    match text {
        "discrete" => Some(vk::PhysicalDeviceType::DISCRETE_GPU),
        "integrated" => Some(vk::PhysicalDeviceType::INTEGRATED_GPU),
        "virtual" => Some(vk::PhysicalDeviceType::VIRTUAL_GPU),
        "cpu" => Some(vk::PhysicalDeviceType::CPU),
        _ => None,
    }
}

fn kind_name(kind: vk::PhysicalDeviceType) -> &'static str {
    match kind {
        vk::PhysicalDeviceType::DISCRETE_GPU => "discrete",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual",
        vk::PhysicalDeviceType::CPU => "cpu",
        _ => "other",
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let minimum_version = match cli.min_version.as_deref() {
        Some(text) => match parse_version(text) {
            Some(version) => version,
            None => {
                eprintln!("error: cannot parse version '{text}'");
                process::exit(1);
            }
        },
        None => 0,
    };

    let mut required_kinds = Vec::new();
    for text in &cli.kind {
        match parse_kind(text) {
            Some(kind) => required_kinds.push(kind),
            None => {
                eprintln!("error: unknown device kind '{text}'");
                process::exit(1);
            }
        }
    }

    let mut builder = InstanceBuilder::new().app_name("ignition-probe");
    if cli.validation {
        builder = builder.request_validation_layers();
    }
    let instance = match builder.build() {
        Ok(instance) => instance,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };

    let profiles = match DeviceProfile::enumerate(&instance, None) {
        Ok(profiles) => profiles,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };
    if profiles.is_empty() {
        println!("no physical devices reported");
        return;
    }

    let filtering =
        minimum_version != 0 || !required_kinds.is_empty() || !cli.extensions.is_empty();
    let selector = PhysicalDeviceSelector {
        minimum_version,
        required_kinds,
        required_extensions: cli.extensions.clone(),
        ..Default::default()
    };

    let mut candidates: Vec<Candidate> = profiles.into_iter().map(Candidate::new).collect();
    if filtering {
        filter_candidates(&mut candidates, &selector);
    }

    for (index, candidate) in candidates.iter().enumerate() {
        let profile = &candidate.profile;
        let verdict = if !filtering {
            ""
        } else if candidate.suitable {
            " — suitable"
        } else {
            " — rejected"
        };
        println!(
            "[{index}] {} ({}, api {}.{}.{}){verdict}",
            profile.name,
            kind_name(profile.kind),
            vk::api_version_major(profile.api_version),
            vk::api_version_minor(profile.api_version),
            vk::api_version_patch(profile.api_version),
        );
        for family in &profile.families {
            println!(
                "    queue family {}: {} queue{}, {:?}",
                family.index,
                family.queue_count,
                if family.queue_count == 1 { "" } else { "s" },
                family.flags,
            );
        }
    }
}
