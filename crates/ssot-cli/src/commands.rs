use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;
use ssot_binder::{load_binder, save_envelope, CandidateOutcome, FieldIssue, SsotBinder};
use ssot_server::{ServerConfig, SsotServer};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let registry = cli.registry_path();
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Show => cmd_show(&open(&registry)?, json),
        Command::Root => cmd_root(&open(&registry)?, json),
        Command::Entry(args) => cmd_entry(&open(&registry)?, &args.artifact_id, json),
        Command::Validate(args) => cmd_validate(&open(&registry)?, &args.candidate, json),
        Command::Prove(args) => cmd_prove(&open(&registry)?, &args.artifact_id, json),
        Command::Admit(args) => cmd_admit(&registry, &args, json),
        Command::Serve(args) => cmd_serve(cli.registry, args),
    }
}

fn open(registry: &Path) -> anyhow::Result<SsotBinder> {
    load_binder(registry).with_context(|| format!("cannot load registry {}", registry.display()))
}

fn read_candidate(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read candidate {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("candidate {} is not valid JSON", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_issues(issues: &[FieldIssue]) {
    for issue in issues {
        println!("  {} {} ({})", issue.path().yellow(), issue.msg, issue.kind.to_string().dimmed());
    }
}

fn display_root(root: &str) -> String {
    if root.is_empty() {
        "(empty)".dimmed().to_string()
    } else {
        root.cyan().to_string()
    }
}

fn cmd_show(binder: &SsotBinder, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&binder.snapshot());
    }
    let registry = binder.registry();
    println!("Capsule {}", binder.capsule_id().bold());
    println!(
        "  Registry: {} {} (maintainer: {})",
        registry.name,
        registry.version.yellow(),
        registry.maintainer
    );
    println!("  Entries: {}", binder.len().to_string().bold());
    for entry in binder.entries() {
        println!(
            "  {} {:<11} {} {}",
            entry.leaf_hash().short_hex().dimmed(),
            entry.entry_type().to_string().green(),
            entry.artifact_id().bold(),
            entry.author()
        );
    }
    println!("Merkle root: {}", display_root(&binder.merkle_root()));
    Ok(())
}

fn cmd_root(binder: &SsotBinder, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "merkle_root": binder.merkle_root() }));
    }
    println!("{}", binder.merkle_root());
    Ok(())
}

fn cmd_entry(binder: &SsotBinder, artifact_id: &str, json: bool) -> anyhow::Result<()> {
    let Some(entry) = binder.get_entry(artifact_id) else {
        bail!("artifact '{artifact_id}' is not registered");
    };
    if json {
        let mut value = entry.to_json();
        value["leaf_hash"] = Value::String(entry.leaf_hash().to_hex());
        return print_json(&value);
    }
    println!("{} {}", entry.artifact_id().bold(), entry.entry_type().to_string().green());
    println!("  Author: {}", entry.author());
    println!("  Created: {}", entry.created_at().to_rfc3339());
    println!("  Content: {}", entry.canonical_sha256());
    let attestation = entry.council_attestation();
    println!(
        "  Quorum: {} ({} signatures)",
        attestation.quorum_rule,
        attestation.signatures.len()
    );
    if let Some(parent) = &entry.lineage().parent {
        println!("  Parent: {}", parent.yellow());
    }
    if !entry.lineage().forks.is_empty() {
        println!("  Forks: {}", entry.lineage().forks.join(", "));
    }
    let replay = if entry.replay().authorized {
        "authorized".green()
    } else {
        "not authorized".red()
    };
    println!("  Replay: {replay}");
    if let Some(capsule) = entry.capsule_ref() {
        println!("  Capsule: {capsule}");
    }
    if let Some(notes) = entry.notes() {
        println!("  Notes: {}", notes.dimmed());
    }
    println!("  Leaf hash: {}", entry.leaf_hash().to_hex().cyan());
    Ok(())
}

fn cmd_validate(binder: &SsotBinder, candidate: &Path, json: bool) -> anyhow::Result<()> {
    let outcome = binder.validate_candidate(&read_candidate(candidate)?);
    if json {
        print_json(&outcome)?;
    } else {
        match &outcome {
            CandidateOutcome::Valid { candidate, merkle_preview } => {
                println!(
                    "{} Candidate {} is admissible",
                    "✓".green().bold(),
                    candidate.entry.artifact_id().bold()
                );
                println!("  Leaf hash: {}", candidate.leaf_hash.to_hex().cyan());
                println!("  Current root: {}", display_root(&binder.merkle_root()));
                println!("  Preview root: {}", display_root(merkle_preview));
            }
            CandidateOutcome::Invalid(rejection) => {
                println!("{} Candidate rejected", "✗".red().bold());
                print_issues(&rejection.issues());
            }
        }
    }
    if !outcome.is_valid() {
        bail!("candidate rejected");
    }
    Ok(())
}

fn cmd_prove(binder: &SsotBinder, artifact_id: &str, json: bool) -> anyhow::Result<()> {
    let Some(proof) = binder.prove(artifact_id) else {
        bail!("artifact '{artifact_id}' is not registered");
    };
    let verified = proof.proof.verify();
    if json {
        print_json(&proof)?;
    } else {
        println!("Inclusion proof for {} (leaf #{})", proof.artifact_id.bold(), proof.index);
        println!("  Leaf: {}", proof.leaf_hash.to_hex().cyan());
        for (sibling, side) in &proof.proof.path {
            println!("  {:<5} {}", format!("{side:?}").to_lowercase(), sibling.to_hex());
        }
        println!("  Root: {}", proof.proof.root.to_hex().cyan());
        let status = if verified { "verified".green() } else { "FAILED".red().bold() };
        println!("  Proof: {status}");
    }
    if !verified {
        bail!("inclusion proof for '{artifact_id}' does not verify");
    }
    Ok(())
}

fn cmd_admit(registry: &Path, args: &AdmitArgs, json: bool) -> anyhow::Result<()> {
    let binder = open(registry)?;
    let candidate = read_candidate(&args.candidate)?;
    let next = match binder.admit(&candidate) {
        Ok(next) => next,
        Err(rejection) => {
            if json {
                print_json(&CandidateOutcome::Invalid(rejection))?;
            } else {
                println!("{} Candidate rejected", "✗".red().bold());
                print_issues(&rejection.issues());
            }
            bail!("candidate rejected");
        }
    };

    if !args.dry_run {
        save_envelope(registry, &next.to_envelope())?;
    }

    if json {
        return print_json(&serde_json::json!({
            "previous_root": binder.merkle_root(),
            "merkle_root": next.merkle_root(),
            "entries": next.len(),
            "written": !args.dry_run,
        }));
    }
    let verb = if args.dry_run { "Would admit" } else { "Admitted" };
    println!("{} {verb} entry; registry now holds {} entries", "✓".green().bold(), next.len());
    println!("  Previous root: {}", display_root(&binder.merkle_root()));
    println!("  New root:      {}", display_root(&next.merkle_root()));
    Ok(())
}

fn cmd_serve(registry: Option<std::path::PathBuf>, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(registry) = registry {
        config.registry_path = registry;
    }
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address '{bind}'"))?;
    }

    println!(
        "SSOT server on {} (registry: {})",
        config.bind_addr.to_string().bold(),
        config.registry_path.display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(SsotServer::new(config).serve())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn entry(id: &str) -> Value {
        json!({
            "artifact_id": id,
            "type": "storyboard",
            "author": "ops@studio",
            "created_at": "2024-05-01T12:00:00Z",
            "canonical_sha256": "abc123",
            "council_attestation": {"signatures": [], "quorum_rule": "2-of-3"},
            "lineage": {},
            "replay": {"authorized": false}
        })
    }

    fn setup(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let registry = dir.join("registry.json");
        fs::write(
            &registry,
            json!({
                "capsule_id": "capsule.test",
                "registry": {"name": "n", "version": "1", "maintainer": "m"},
                "entries": [entry("a")],
            })
            .to_string(),
        )
        .unwrap();
        let candidate = dir.join("candidate.json");
        fs::write(&candidate, entry("b").to_string()).unwrap();
        (registry, candidate)
    }

    #[test]
    fn admit_rewrites_registry() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, candidate) = setup(dir.path());
        let args = AdmitArgs { candidate, dry_run: false };
        cmd_admit(&registry, &args, false).unwrap();
        assert_eq!(load_binder(&registry).unwrap().entry_ids(), vec!["a", "b"]);
    }

    #[test]
    fn admit_dry_run_leaves_registry() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, candidate) = setup(dir.path());
        let before = fs::read_to_string(&registry).unwrap();
        let args = AdmitArgs { candidate, dry_run: true };
        cmd_admit(&registry, &args, true).unwrap();
        assert_eq!(fs::read_to_string(&registry).unwrap(), before);
    }

    #[test]
    fn admit_duplicate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = setup(dir.path());
        let dup = dir.path().join("dup.json");
        fs::write(&dup, entry("a").to_string()).unwrap();
        let args = AdmitArgs { candidate: dup, dry_run: false };
        assert!(cmd_admit(&registry, &args, false).is_err());
    }

    #[test]
    fn validate_reports_rejection_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, candidate) = setup(dir.path());
        let binder = open(&registry).unwrap();
        assert!(cmd_validate(&binder, &candidate, true).is_ok());
        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"artifact_id": "z", "type": "movie"}"#).unwrap();
        assert!(cmd_validate(&binder, &bad, false).is_err());
    }

    #[test]
    fn entry_and_prove_miss_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = setup(dir.path());
        let binder = open(&registry).unwrap();
        assert!(cmd_entry(&binder, "a", false).is_ok());
        assert!(cmd_entry(&binder, "missing", false).is_err());
        assert!(cmd_prove(&binder, "a", false).is_ok());
        assert!(cmd_prove(&binder, "missing", true).is_err());
    }
}
