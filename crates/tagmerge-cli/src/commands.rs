use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use tagmerge_combine::{parent_relations, CombineConfig, CombineSession};
use tagmerge_members::{MemberConflictDecision, MemberDecision};
use tagmerge_tags::{TagConflictDecision, TagDecision};
use tagmerge_types::{Command as EditCommand, PrimitiveId};

use crate::cli::*;
use crate::scenario::Scenario;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Resolve(args) => cmd_resolve(args, cli.format),
        Command::Config(args) => cmd_config(args),
    }
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Report {
    target: PrimitiveId,
    automatic: Vec<String>,
    tags: Vec<TagRow>,
    members: Vec<MemberRow>,
    unresolved: usize,
    commands: Vec<EditCommand>,
}

#[derive(Serialize)]
struct TagRow {
    key: String,
    values: Vec<String>,
    decision: TagDecision,
    value: Option<String>,
}

impl TagRow {
    fn new(d: &TagConflictDecision) -> Self {
        Self {
            key: d.key().to_string(),
            values: d.values().into_iter().map(str::to_string).collect(),
            decision: d.decision().clone(),
            value: d.chosen_value().ok().flatten(),
        }
    }
}

#[derive(Serialize)]
struct MemberRow {
    relation: PrimitiveId,
    position: usize,
    original: PrimitiveId,
    role: String,
    decision: MemberDecision,
}

impl MemberRow {
    fn new(d: &MemberConflictDecision) -> Self {
        Self {
            relation: d.relation(),
            position: d.position(),
            original: d.original(),
            role: d.role().to_string(),
            decision: d.decision(),
        }
    }
}

fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut config = match &args.config {
        Some(path) => CombineConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => CombineConfig::default(),
    };
    if args.no_automatic {
        config.apply_automatic = false;
    }

    let target = scenario.target()?;
    let parents = parent_relations(&scenario.relations, &scenario.primitive_ids());
    let mut session = CombineSession::prepare(&scenario.primitives, &parents, config)?;
    apply_decisions(&mut session, &args)?;

    let commands = if session.is_resolved_completely() {
        session.build_resolution_commands(target)?
    } else {
        Vec::new()
    };
    let report = Report {
        target: target.id,
        automatic: session.automatically_resolved().to_vec(),
        tags: session.tags().decisions().map(TagRow::new).collect(),
        members: session.members().decisions().iter().map(MemberRow::new).collect(),
        unresolved: session.num_conflicts(),
        commands,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    if report.unresolved > 0 {
        bail!("{} conflict(s) left undecided", report.unresolved);
    }
    Ok(())
}

fn apply_decisions(session: &mut CombineSession, args: &ResolveArgs) -> anyhow::Result<()> {
    let tags = session.tags_mut();
    for pair in &args.decide {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
        tags.keep_one(key, value)?;
    }
    for key in &args.keep_all {
        tags.keep_all(key)?;
    }
    for key in &args.sum {
        let can_sum = tags
            .decision(key)
            .is_some_and(TagConflictDecision::can_sum_all_numeric);
        if !can_sum {
            bail!("values of '{key}' cannot be summed");
        }
        tags.sum_all_numeric(key)?;
    }
    for key in &args.drop {
        tags.keep_none(key)?;
    }

    let member_default = if args.remove_member_conflicts {
        Some(MemberDecision::Remove)
    } else if args.replace_member_conflicts {
        Some(MemberDecision::Replace)
    } else {
        None
    };
    let members = session.members_mut();
    if let Some(decision) = member_default {
        let open: Vec<usize> = members
            .decisions()
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_decided())
            .map(|(i, _)| i)
            .collect();
        for index in open {
            members.decide(index, decision)?;
        }
    }
    if let Some(role) = &args.role {
        members.apply_role(Some(role.as_str()));
    }
    debug!(remaining = session.num_conflicts(), "applied command line decisions");
    Ok(())
}

fn print_report(report: &Report) {
    println!("Combining into {}", report.target.to_string().yellow().bold());
    for key in &report.automatic {
        println!("  {} {} resolved automatically", "✓".green(), key.bold());
    }

    if !report.tags.is_empty() {
        println!("\nTags:");
        for row in &report.tags {
            let status = match (&row.decision, &row.value) {
                (TagDecision::Undecided, _) => "undecided".red().bold(),
                (TagDecision::KeepNone, _) => "removed".dimmed(),
                (_, Some(value)) => value.as_str().green(),
                (_, None) => "removed".dimmed(),
            };
            println!("  {:<24} {}  [{}]", row.key.bold(), status, row.values.join(" | "));
        }
    }

    if !report.members.is_empty() {
        println!("\nRelation memberships:");
        for row in &report.members {
            let status = match row.decision {
                MemberDecision::Undecided => "undecided".red().bold(),
                MemberDecision::Replace => "keep".green(),
                MemberDecision::Remove => "remove".yellow(),
            };
            println!(
                "  {}[{}] {} as {:?}  {}",
                row.relation.to_string().cyan(),
                row.position,
                row.original,
                row.role,
                status
            );
        }
    }

    if report.unresolved > 0 {
        println!("\n{} {} conflict(s) left", "✗".red().bold(), report.unresolved);
        return;
    }
    if report.commands.is_empty() {
        println!("\n{} Nothing to change.", "✓".green().bold());
        return;
    }
    println!("\nCommands:");
    for command in &report.commands {
        println!("  {command}");
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = match &args.path {
        Some(path) => CombineConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => CombineConfig::default(),
    };
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SCENARIO: &str = r#"{
        "primitives": [
            { "id": "w1", "tags": { "name": "North St", "capacity": "10" } },
            { "id": "w2", "tags": { "name": "South St", "capacity": "20" } }
        ],
        "relations": [
            { "id": "r5", "members": [{ "role": "outer", "member": "w2" }] }
        ]
    }"#;

    fn resolve_args(extra: &[&str]) -> ResolveArgs {
        let mut argv = vec!["tagmerge", "resolve", "scenario.json"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Resolve(args) => args,
            Command::Config(_) => unreachable!(),
        }
    }

    fn session() -> (Scenario, CombineSession) {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let parents = parent_relations(&scenario.relations, &scenario.primitive_ids());
        let session =
            CombineSession::prepare(&scenario.primitives, &parents, CombineConfig::default()).unwrap();
        (scenario, session)
    }

    #[test]
    fn command_line_decisions_resolve_everything() {
        let (scenario, mut session) = session();
        assert_eq!(session.num_conflicts(), 3);

        let args = resolve_args(&[
            "--decide",
            "name=South St",
            "--sum",
            "capacity",
            "--replace-member-conflicts",
            "--role",
            "inner",
        ]);
        apply_decisions(&mut session, &args).unwrap();
        assert!(session.is_resolved_completely());

        let target = scenario.target().unwrap();
        let commands = session.build_resolution_commands(target).unwrap();
        let rendered: Vec<String> = commands.iter().map(ToString::to_string).collect();
        assert_eq!(rendered.len(), 3);
        assert!(commands.contains(&EditCommand::set_property(target.id, "capacity", "30")));
        assert!(commands.contains(&EditCommand::set_property(target.id, "name", "South St")));
    }

    #[test]
    fn malformed_decision_is_rejected() {
        let (_, mut session) = session();
        let args = resolve_args(&["--decide", "name"]);
        assert!(apply_decisions(&mut session, &args).is_err());
    }

    #[test]
    fn non_summable_key_is_rejected() {
        let (_, mut session) = session();
        let args = resolve_args(&["--sum", "name"]);
        assert!(apply_decisions(&mut session, &args).is_err());
    }

    #[test]
    fn member_flags_conflict() {
        let argv = [
            "tagmerge",
            "resolve",
            "s.json",
            "--remove-member-conflicts",
            "--replace-member-conflicts",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
