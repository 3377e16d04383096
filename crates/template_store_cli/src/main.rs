//! Operator CLI for notification template storage.
//!
//! # Responsibility
//! - Build `Template` storage through the factory from a JSON config.
//! - Run one list/get/create/update/delete request and print the result.
//!
//! # Invariants
//! - Failures print a JSON `Status` on stderr and exit non-zero.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use template_store_core::{
    build_template_storage, core_version, init_logging, NamespaceMapper, Object, ObjectMeta,
    OrgNamespaceMapper, RequestContext, SqliteTemplateService, Storage, StorageConfig,
    StorageError, TemplateResource, TemplateSpec, WriteResult, WriteWarning,
};

fn cli() -> Command {
    Command::new("template-store")
        .version(core_version())
        .about("Serve notification templates from legacy or dual-write storage")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Storage config JSON; legacy-only when omitted"),
        )
        .arg(
            Arg::new("legacy-db")
                .long("legacy-db")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Legacy template database file"),
        )
        .arg(
            Arg::new("org")
                .long("org")
                .default_value("1")
                .value_parser(value_parser!(i64))
                .help("Org id whose namespace is addressed"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_parser(value_parser!(u64))
                .help("Request deadline; overrides the config value"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .help("Absolute directory for rolling log files"),
        )
        .subcommand(Command::new("list").about("List templates as a table"))
        .subcommand(
            Command::new("get")
                .about("Print one template as JSON")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("create")
                .about("Create a template")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("body").long("body").required(true)),
        )
        .subcommand(
            Command::new("update")
                .about("Replace a template body")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("body").long("body").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a template")
                .arg(Arg::new("name").required(true)),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let status = serde_json::to_string_pretty(&err.status())
                .unwrap_or_else(|_| err.to_string());
            eprintln!("{status}");
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &ArgMatches) -> Result<(), StorageError> {
    if let Some(log_dir) = matches.get_one::<String>("log-dir") {
        init_logging(template_store_core::default_log_level(), log_dir)
            .map_err(StorageError::Configuration)?;
    }

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StorageConfig::load(path)
            .map_err(|err| StorageError::Configuration(err.to_string()))?,
        None => StorageConfig::default(),
    };
    let legacy_db = matches
        .get_one::<PathBuf>("legacy-db")
        .ok_or_else(|| StorageError::Invalid("--legacy-db is required".to_string()))?;
    let service = SqliteTemplateService::open(legacy_db)
        .map_err(|err| StorageError::Configuration(err.to_string()))?;

    let namespacer = Arc::new(OrgNamespaceMapper);
    let org_id = matches.get_one::<i64>("org").copied().unwrap_or(1);
    let storage = build_template_storage(Arc::new(service), namespacer.clone(), &config)?;

    let mut ctx = RequestContext::new(namespacer.namespace(org_id));
    let timeout = matches
        .get_one::<u64>("timeout-ms")
        .map(|ms| Duration::from_millis(*ms))
        .or_else(|| config.request_timeout());
    if let Some(timeout) = timeout {
        ctx = ctx.with_timeout(timeout);
    }

    match matches.subcommand() {
        Some(("list", _)) => {
            let list = storage.list(&ctx)?;
            let table = storage.convert_to_table(&Object::List(list))?;
            let header: Vec<&str> = table
                .column_definitions
                .iter()
                .map(|column| column.name.as_str())
                .collect();
            println!("{}", header.join("\t"));
            for row in &table.rows {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                println!("{}", cells.join("\t"));
            }
        }
        Some(("get", args)) => {
            let template = storage.get(&ctx, required(args, "name")?)?;
            print_json(&template)?;
        }
        Some(("create", args)) => {
            let object = template_from_args(args)?;
            report(storage.create(&ctx, &object)?)?;
        }
        Some(("update", args)) => {
            let mut object = template_from_args(args)?;
            // Carry the current resource version; a concurrent change in
            // between is rejected as a conflict.
            if let Ok(current) = storage.get(&ctx, &object.metadata.name) {
                object.metadata.resource_version = current.metadata.resource_version;
            }
            report(storage.update(&ctx, &object)?)?;
        }
        Some(("delete", args)) => {
            report(storage.delete(&ctx, required(args, "name")?)?)?;
        }
        _ => return Err(StorageError::Invalid("unknown command".to_string())),
    }

    if let Some(divergences) = storage.divergences() {
        for divergence in divergences.drain() {
            eprintln!("divergence: {divergence}");
        }
    }
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str, StorageError> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| StorageError::Invalid(format!("missing argument `{name}`")))
}

fn template_from_args(args: &ArgMatches) -> Result<TemplateResource, StorageError> {
    Ok(TemplateResource {
        type_meta: template_store_core::templates_resource_info().type_meta(),
        metadata: ObjectMeta {
            name: required(args, "name")?.to_string(),
            ..ObjectMeta::default()
        },
        spec: TemplateSpec {
            template: required(args, "body")?.to_string(),
        },
    })
}

fn report(result: WriteResult<TemplateResource>) -> Result<(), StorageError> {
    for warning in &result.warnings {
        let WriteWarning::SecondaryWriteFailed {
            operation,
            name,
            reason,
        } = warning;
        log::warn!(
            "event=cli_write module=cli status=warn op={operation} name={name} reason={reason}"
        );
        eprintln!("warning: generic store {operation} of `{name}` failed: {reason}");
    }
    print_json(&result.object)
}

fn print_json(template: &TemplateResource) -> Result<(), StorageError> {
    let rendered = serde_json::to_string_pretty(template)
        .map_err(|err| StorageError::Internal(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}
